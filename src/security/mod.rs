pub mod cors;
pub mod identity;
pub mod jwt;
pub mod request_id;

pub use cors::create_cors_layer;
pub use identity::Identity;
pub use jwt::TokenVerifier;
pub use request_id::{request_id_middleware, RequestId, REQUEST_ID_HEADER};
