pub mod builder;
pub mod handlers;
pub mod types;

use log::{debug, info};

use crate::security::Identity;
use crate::shared::error::ApiError;
use crate::shared::state::AppState;
use crate::statistics::StatisticsEngine;

pub use handlers::configure_datacube_routes;
use types::DataCube;

/// Recomputes the caller's cube from scratch and replaces the stored one.
/// Concurrent recomputations for the same user resolve as last write wins.
pub async fn compute_data_cube(state: &AppState, identity: Identity) -> Result<DataCube, ApiError> {
    let topics = StatisticsEngine::new(&state.repos)
        .cube_view(identity)
        .await
        .map_err(|e| e.in_stage("data cube"))?;

    let cube = builder::build_cube(identity.key(), &state.taxonomy, &topics);
    debug!("Built data cube with {} rows", cube.rows.len());

    let stored = state
        .repos
        .datacubes
        .upsert(cube)
        .await
        .map_err(|e| ApiError::from(e).in_stage("data cube persist"))?;
    info!("Data cube recomputed for {:?}", identity);
    Ok(stored)
}

/// Pure read of the stored cube; `NotFound` when none was computed yet.
pub async fn get_data_cube(state: &AppState, identity: Identity) -> Result<DataCube, ApiError> {
    Ok(state.repos.datacubes.get(identity.key()).await?)
}
