//! Combines the routers of every module into one.

use axum::Router;
use std::sync::Arc;

use crate::shared::state::AppState;

pub fn configure_api_routes() -> Router<Arc<AppState>> {
    Router::new()
        .merge(crate::statistics::configure_statistics_routes())
        .merge(crate::datacube::configure_datacube_routes())
        .merge(crate::questions::configure_question_routes())
        .merge(crate::engagement::configure_engagement_routes())
        .merge(crate::quiz::configure_quiz_routes())
        .merge(crate::practice_test::configure_test_routes())
        .merge(crate::taxonomy::configure_taxonomy_routes())
}
