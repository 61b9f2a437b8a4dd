//! Statistics engine: joins the question bank against one caller's
//! engagements and projects the result into the four reporting views.

pub mod handlers;
pub mod join;
pub mod types;
pub mod views;

use log::debug;

use crate::questions::types::QuestionQuery;
use crate::security::Identity;
use crate::shared::error::ApiError;
use crate::store::Repositories;

pub use handlers::configure_statistics_routes;
use types::{StatisticsGrid, StatisticsResult, StatisticsView, TopicCube};

pub struct StatisticsEngine<'a> {
    repos: &'a Repositories,
}

impl<'a> StatisticsEngine<'a> {
    pub fn new(repos: &'a Repositories) -> Self {
        Self { repos }
    }

    pub async fn grid(&self, identity: Identity) -> Result<StatisticsGrid, ApiError> {
        let rows = join::load_joined(self.repos, identity, &QuestionQuery::default()).await?;
        let grid = views::build_grid(&rows);
        debug!(
            "Statistics grid for {:?}: {} questions across {} topics",
            identity,
            rows.len(),
            grid.topics.len()
        );
        Ok(grid)
    }

    /// The topic → status → difficulty shape consumed by the data cube.
    pub async fn cube_view(&self, identity: Identity) -> Result<Vec<TopicCube>, ApiError> {
        Ok(views::cube_view(&self.grid(identity).await?))
    }

    pub async fn compute(
        &self,
        identity: Identity,
        view: StatisticsView,
    ) -> Result<StatisticsResult, ApiError> {
        Ok(match view {
            StatisticsView::Difficulty => {
                StatisticsResult::Difficulty(views::difficulty_view(&self.grid(identity).await?))
            }
            StatisticsView::Status => {
                StatisticsResult::Status(views::status_view(&self.grid(identity).await?))
            }
            StatisticsView::Combined => {
                StatisticsResult::Combined(views::combined_view(&self.grid(identity).await?))
            }
            StatisticsView::Time => {
                let rows =
                    join::load_joined(self.repos, identity, &QuestionQuery::default()).await?;
                StatisticsResult::Time(views::time_view(&rows))
            }
        })
    }
}
