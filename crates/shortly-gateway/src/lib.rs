//! HTTP front end for Shortly.
//!
//! The binary in `main.rs` parses [`cli::Cli`], builds [`services::Services`]
//! and serves [`app::App::router`] until interrupted.

pub mod app;
pub mod cli;
pub mod error;
pub mod handlers;
pub mod model;
pub mod services;
pub mod state;
pub mod telemetry;
