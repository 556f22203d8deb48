mod health;
mod recent;
mod redirect;
mod url;

pub use health::health_handler;
pub use recent::recent_handler;
pub use redirect::redirect_handler;
pub use url::create_url_handler;
