use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};
use log::debug;
use std::sync::Arc;

use super::types::{DataCube, DataCubeQuery};
use super::{compute_data_cube, get_data_cube};
use crate::security::Identity;
use crate::shared::error::{ApiError, ApiResult};
use crate::shared::state::AppState;

/// Serves the stored cube, computing it on a miss or when `compute=true`.
pub async fn handle_get_datacube(
    State(state): State<Arc<AppState>>,
    identity: Identity,
    Query(query): Query<DataCubeQuery>,
) -> ApiResult<Json<DataCube>> {
    if query.force_compute() {
        return Ok(Json(compute_data_cube(&state, identity).await?));
    }

    match get_data_cube(&state, identity).await {
        Ok(cube) => Ok(Json(cube)),
        Err(ApiError::NotFound(_)) => {
            debug!("No stored data cube for {:?}, computing", identity);
            Ok(Json(compute_data_cube(&state, identity).await?))
        }
        Err(e) => Err(e),
    }
}

pub fn configure_datacube_routes() -> Router<Arc<AppState>> {
    Router::new().route("/datacube", get(handle_get_datacube))
}
