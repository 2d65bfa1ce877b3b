//! Analytics handlers: read-only trend and recommendation views

use axum::{
    extract::{Query, State},
    http::StatusCode,
    Json,
};
use chrono::{Duration, Utc};
use mailbatch_core::analytics::{compute_trends, recommendations, Recommendation, TrendReport};
use mailbatch_core::SenderError;
use mailbatch_storage::repository::CampaignRepository;
use serde::Deserialize;
use std::sync::Arc;
use tracing::error;

use crate::state::AppState;

/// Query parameters for the trends view
#[derive(Debug, Deserialize)]
pub struct TrendsQuery {
    #[serde(default = "default_days")]
    pub days: i64,
}

fn default_days() -> i64 {
    7
}

fn clamp_days(days: i64) -> i64 {
    days.clamp(1, 365)
}

/// Campaign trend deltas over a day window
///
/// GET /api/v1/analytics/trends
pub async fn get_trends(
    State(state): State<Arc<AppState>>,
    Query(query): Query<TrendsQuery>,
) -> Result<Json<TrendReport>, StatusCode> {
    let days = clamp_days(query.days);
    let cutoff = Utc::now() - Duration::days(days);

    let repo = CampaignRepository::new(state.db_pool.pool().clone());

    let stats = repo.daily_stats_since(cutoff).await.map_err(|e| {
        error!("Failed to load daily campaign stats: {}", e);
        StatusCode::INTERNAL_SERVER_ERROR
    })?;

    Ok(Json(compute_trends(&stats, days)))
}

/// Advisory recommendations derived from the active configuration
///
/// GET /api/v1/analytics/recommendations
pub async fn get_recommendations(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<Recommendation>>, StatusCode> {
    let config = state.sender.active_config().await.map_err(|e| match e {
        SenderError::ConfigurationMissing => StatusCode::BAD_REQUEST,
        e => {
            error!("Failed to load active configuration: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR
        }
    })?;

    Ok(Json(recommendations(&config)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_clamp_days_bounds() {
        assert_eq!(clamp_days(0), 1);
        assert_eq!(clamp_days(-3), 1);
        assert_eq!(clamp_days(7), 7);
        assert_eq!(clamp_days(10_000), 365);
    }
}
