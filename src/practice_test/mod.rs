//! Practice tests: ordered quiz sets scored per taxonomy strand.

pub mod handlers;
pub mod scoring;
pub mod service;
pub mod templates;
pub mod types;

pub use handlers::configure_test_routes;
