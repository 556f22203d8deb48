use rand::distributions::Alphanumeric;
use rand::Rng;
use shortly_core::Slug;
use typed_builder::TypedBuilder;

use crate::Generator;

pub const DEFAULT_SLUG_LENGTH: usize = 10;

/// Draws `len` characters uniformly from `[a-zA-Z0-9]`.
pub fn random_slug(len: usize) -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(len)
        .map(char::from)
        .collect()
}

/// Fixed-length random alphanumeric slugs.
#[derive(Debug, Clone, TypedBuilder)]
pub struct RandomSlugGenerator {
    #[builder(default = DEFAULT_SLUG_LENGTH)]
    length: usize,
}

impl Default for RandomSlugGenerator {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl Generator for RandomSlugGenerator {
    fn generate(&self) -> Slug {
        Slug::new_unchecked(random_slug(self.length))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn slugs_have_requested_length_and_alphabet() {
        for len in [1, 10, 32] {
            let slug = random_slug(len);
            assert_eq!(slug.len(), len);
            assert!(slug.chars().all(|c| c.is_ascii_alphanumeric()));
        }
        assert_eq!(random_slug(0), "");
    }

    #[test]
    fn default_generator_output_is_a_valid_slug() {
        let generator = RandomSlugGenerator::default();
        let slug = generator.generate();
        assert_eq!(slug.as_str().len(), DEFAULT_SLUG_LENGTH);
        assert!(Slug::new(slug.as_str()).is_ok());
    }

    #[test]
    fn slugs_are_not_repeated() {
        let generator = RandomSlugGenerator::default();
        let seen: HashSet<String> = (0..1000)
            .map(|_| generator.generate().as_str().to_string())
            .collect();
        assert_eq!(seen.len(), 1000);
    }
}
