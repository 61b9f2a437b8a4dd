//! Quizzes: a fixed, ordered question set whose engagement ids are bound
//! lazily as the user answers.

pub mod handlers;
pub mod service;
pub mod types;

pub use handlers::configure_quiz_routes;
