pub mod error;
pub mod state;
pub mod utils;

pub use error::{ApiError, ApiResult};
pub use state::AppState;
