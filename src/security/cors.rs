use axum::http::{header, HeaderName, HeaderValue, Method};
use log::warn;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tracing::info;

#[derive(Debug, Clone)]
pub struct CorsConfig {
    pub allowed_origins: Vec<String>,
    pub allowed_methods: Vec<Method>,
    pub max_age_secs: u64,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allowed_origins: vec![],
            allowed_methods: vec![
                Method::GET,
                Method::POST,
                Method::PUT,
                Method::DELETE,
                Method::PATCH,
                Method::OPTIONS,
            ],
            max_age_secs: 3600,
        }
    }
}

impl CorsConfig {
    pub fn with_origins(mut self, origins: Vec<String>) -> Self {
        self.allowed_origins = origins;
        self
    }

    pub fn build(self) -> CorsLayer {
        let origins: Vec<HeaderValue> = self
            .allowed_origins
            .iter()
            .filter_map(|o| match HeaderValue::from_str(o) {
                Ok(v) => Some(v),
                Err(_) => {
                    warn!("Skipping invalid CORS origin: {o}");
                    None
                }
            })
            .collect();

        info!("CORS configured with {} allowed origins", origins.len());

        CorsLayer::new()
            .allow_origin(AllowOrigin::list(origins))
            .allow_methods(self.allowed_methods)
            .allow_headers([
                header::CONTENT_TYPE,
                header::AUTHORIZATION,
                header::ACCEPT,
                HeaderName::from_static("x-request-id"),
            ])
            .expose_headers([HeaderName::from_static("x-request-id")])
            .allow_credentials(true)
            .max_age(std::time::Duration::from_secs(self.max_age_secs))
    }
}

pub fn create_cors_layer(origins: Vec<String>) -> CorsLayer {
    CorsConfig::default().with_origins(origins).build()
}
