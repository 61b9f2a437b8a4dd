pub mod handlers;
pub mod listing;
pub mod types;

pub use handlers::configure_question_routes;
