//! Campaign handlers
//!
//! A campaign submission returns 202 as soon as the record exists;
//! everything after that is observed by polling the campaign record.

use axum::{
    extract::{ConnectInfo, Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Utc};
use mailbatch_common::types::EmailAddress;
use mailbatch_core::engine::{CampaignAccepted, CampaignContent, EngineError};
use mailbatch_storage::models::{BatchLogEntry, Campaign, CampaignStatus, ErrorLogEntry};
use mailbatch_storage::repository::CampaignRepository;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::{error, info};
use uuid::Uuid;

use crate::state::AppState;

/// Error response
#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}

/// Query parameters for listing campaigns
#[derive(Debug, Deserialize)]
pub struct ListCampaignsQuery {
    pub status: Option<String>,
    #[serde(default = "default_limit")]
    pub limit: i64,
    #[serde(default)]
    pub offset: i64,
}

fn default_limit() -> i64 {
    50
}

/// Campaign list response
#[derive(Debug, Serialize)]
pub struct CampaignListResponse {
    pub data: Vec<CampaignSummary>,
    pub total: i64,
    pub limit: i64,
    pub offset: i64,
}

/// List view of a campaign. The error and batch logs can grow large,
/// so they are only returned by the single-campaign lookup.
#[derive(Debug, Serialize)]
pub struct CampaignSummary {
    pub id: Uuid,
    pub title: String,
    pub status: String,
    pub total_recipients: i32,
    pub sent_count: i32,
    pub failed_count: i32,
    pub progress: i32,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub duration_ms: Option<i64>,
    pub average_send_time_ms: Option<f64>,
    pub sender_config_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Campaign> for CampaignSummary {
    fn from(c: Campaign) -> Self {
        Self {
            id: c.id,
            title: c.title,
            status: c.status,
            total_recipients: c.total_recipients,
            sent_count: c.sent_count,
            failed_count: c.failed_count,
            progress: c.progress,
            started_at: c.started_at,
            completed_at: c.completed_at,
            duration_ms: c.duration_ms,
            average_send_time_ms: c.average_send_time_ms,
            sender_config_id: c.sender_config_id,
            created_at: c.created_at,
            updated_at: c.updated_at,
        }
    }
}

/// Full view of a campaign including the error and batch logs
#[derive(Debug, Serialize)]
pub struct CampaignDetail {
    pub id: Uuid,
    pub title: String,
    pub body: String,
    pub cta_text: Option<String>,
    pub cta_link: Option<String>,
    pub contact_email: Option<String>,
    pub contact_phone: Option<String>,
    pub status: String,
    pub total_recipients: i32,
    pub sent_count: i32,
    pub failed_count: i32,
    pub progress: i32,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub duration_ms: Option<i64>,
    pub average_send_time_ms: Option<f64>,
    pub errors: Vec<ErrorLogEntry>,
    pub batches: Vec<BatchLogEntry>,
    pub sender_config_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Campaign> for CampaignDetail {
    fn from(c: Campaign) -> Self {
        let errors = c.error_entries();
        let batches = c.batch_entries();

        Self {
            id: c.id,
            title: c.title,
            body: c.body,
            cta_text: c.cta_text,
            cta_link: c.cta_link,
            contact_email: c.contact_email,
            contact_phone: c.contact_phone,
            status: c.status,
            total_recipients: c.total_recipients,
            sent_count: c.sent_count,
            failed_count: c.failed_count,
            progress: c.progress,
            started_at: c.started_at,
            completed_at: c.completed_at,
            duration_ms: c.duration_ms,
            average_send_time_ms: c.average_send_time_ms,
            errors,
            batches,
            sender_config_id: c.sender_config_id,
            created_at: c.created_at,
            updated_at: c.updated_at,
        }
    }
}

/// Request body for starting a campaign
#[derive(Debug, Deserialize)]
pub struct StartCampaignRequest {
    pub title: String,
    pub body: String,
    pub cta_text: Option<String>,
    pub cta_link: Option<String>,
    pub contact_email: Option<String>,
    pub contact_phone: Option<String>,
}

fn engine_error(context: &str, e: EngineError) -> (StatusCode, Json<ErrorResponse>) {
    let (status, error) = match &e {
        EngineError::ConfigurationMissing => (StatusCode::BAD_REQUEST, "configuration_missing"),
        EngineError::QuotaExceeded { .. } => (StatusCode::TOO_MANY_REQUESTS, "quota_exceeded"),
        EngineError::NoRecipients => (StatusCode::BAD_REQUEST, "no_recipients"),
        EngineError::NotFound => (StatusCode::NOT_FOUND, "not_found"),
        EngineError::NotSending => (StatusCode::CONFLICT, "conflict"),
        EngineError::Database(_) | EngineError::Internal(_) => {
            error!("{}: {}", context, e);
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    error: "internal_error".to_string(),
                    message: context.to_string(),
                }),
            );
        }
    };

    (
        status,
        Json(ErrorResponse {
            error: error.to_string(),
            message: e.to_string(),
        }),
    )
}

/// Start a campaign against the active sender configuration
///
/// POST /api/v1/campaigns
pub async fn start_campaign(
    State(state): State<Arc<AppState>>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    Json(input): Json<StartCampaignRequest>,
) -> Result<(StatusCode, Json<CampaignAccepted>), (StatusCode, Json<ErrorResponse>)> {
    if input.title.trim().is_empty() {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse {
                error: "validation_error".to_string(),
                message: "Campaign title is required".to_string(),
            }),
        ));
    }

    if input.body.trim().is_empty() {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse {
                error: "validation_error".to_string(),
                message: "Campaign body is required".to_string(),
            }),
        ));
    }

    if let Some(contact_email) = &input.contact_email {
        if EmailAddress::parse(contact_email).is_err() {
            return Err((
                StatusCode::BAD_REQUEST,
                Json(ErrorResponse {
                    error: "validation_error".to_string(),
                    message: "Contact email must be a valid address".to_string(),
                }),
            ));
        }
    }

    let content = CampaignContent {
        title: input.title,
        body: input.body,
        cta_text: input.cta_text,
        cta_link: input.cta_link,
        contact_email: input.contact_email,
        contact_phone: input.contact_phone,
    };

    let accepted = state
        .engine
        .start_campaign(content, &addr.ip().to_string())
        .await
        .map_err(|e| engine_error("Failed to start campaign", e))?;

    info!(
        "Campaign {} accepted with {} recipients",
        accepted.campaign_id, accepted.total_recipients
    );

    Ok((StatusCode::ACCEPTED, Json(accepted)))
}

/// List campaigns
///
/// GET /api/v1/campaigns
pub async fn list_campaigns(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListCampaignsQuery>,
) -> Result<Json<CampaignListResponse>, (StatusCode, Json<ErrorResponse>)> {
    let repo = CampaignRepository::new(state.db_pool.pool().clone());

    let status = query.status.and_then(|s| s.parse::<CampaignStatus>().ok());

    let campaigns = repo
        .list(status, query.limit, query.offset)
        .await
        .map_err(|e| {
            error!("Failed to list campaigns: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    error: "internal_error".to_string(),
                    message: "Failed to list campaigns".to_string(),
                }),
            )
        })?;

    let total = repo.count(status).await.unwrap_or(0);

    let data = campaigns.into_iter().map(CampaignSummary::from).collect();

    Ok(Json(CampaignListResponse {
        data,
        total,
        limit: query.limit,
        offset: query.offset,
    }))
}

/// Get a campaign by ID, including its error and batch logs
///
/// GET /api/v1/campaigns/:id
pub async fn get_campaign(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<CampaignDetail>, (StatusCode, Json<ErrorResponse>)> {
    let repo = CampaignRepository::new(state.db_pool.pool().clone());

    let campaign = repo
        .get(id)
        .await
        .map_err(|e| {
            error!("Failed to get campaign: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    error: "internal_error".to_string(),
                    message: "Failed to get campaign".to_string(),
                }),
            )
        })?
        .ok_or_else(|| {
            (
                StatusCode::NOT_FOUND,
                Json(ErrorResponse {
                    error: "not_found".to_string(),
                    message: "Campaign not found".to_string(),
                }),
            )
        })?;

    Ok(Json(CampaignDetail::from(campaign)))
}

/// Cancel a sending campaign
///
/// POST /api/v1/campaigns/:id/cancel
pub async fn cancel_campaign(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<CampaignDetail>, (StatusCode, Json<ErrorResponse>)> {
    let cancelled = state
        .engine
        .cancel_campaign(id)
        .await
        .map_err(|e| engine_error("Failed to cancel campaign", e))?;

    Ok(Json(CampaignDetail::from(cancelled)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn campaign_fixture() -> Campaign {
        Campaign {
            id: Uuid::new_v4(),
            title: "Spring intake".to_string(),
            body: "Applications are open.".to_string(),
            cta_text: Some("Apply now".to_string()),
            cta_link: Some("https://example.com/apply".to_string()),
            contact_email: None,
            contact_phone: None,
            total_recipients: 25,
            sent_count: 10,
            failed_count: 2,
            progress: 40,
            status: "sending".to_string(),
            started_at: Utc::now(),
            completed_at: None,
            duration_ms: None,
            average_send_time_ms: None,
            errors: json!([
                {"recipient": "a@example.com", "error": "mailbox full", "timestamp": Utc::now()}
            ]),
            batches: json!([
                {"batch_number": 1, "sent_in_batch": 10, "failed_in_batch": 2, "average_batch_time_ms": 120.0}
            ]),
            sender_config_id: Uuid::new_v4(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_detail_view_parses_log_entries() {
        let detail = CampaignDetail::from(campaign_fixture());

        assert_eq!(detail.errors.len(), 1);
        assert_eq!(detail.errors[0].recipient, "a@example.com");
        assert_eq!(detail.errors[0].error, "mailbox full");

        assert_eq!(detail.batches.len(), 1);
        assert_eq!(detail.batches[0].batch_number, 1);
        assert_eq!(detail.batches[0].sent_in_batch, 10);
    }

    #[test]
    fn test_summary_view_omits_logs_and_body() {
        let summary = CampaignSummary::from(campaign_fixture());
        let value = serde_json::to_value(&summary).unwrap();

        assert!(value.get("errors").is_none());
        assert!(value.get("batches").is_none());
        assert!(value.get("body").is_none());
        assert_eq!(value["progress"], 40);
        assert_eq!(value["status"], "sending");
    }

    #[test]
    fn test_engine_error_status_mapping() {
        let cases = vec![
            (EngineError::ConfigurationMissing, StatusCode::BAD_REQUEST),
            (
                EngineError::QuotaExceeded {
                    remaining: 5,
                    requested: 10,
                },
                StatusCode::TOO_MANY_REQUESTS,
            ),
            (EngineError::NoRecipients, StatusCode::BAD_REQUEST),
            (EngineError::NotFound, StatusCode::NOT_FOUND),
            (EngineError::NotSending, StatusCode::CONFLICT),
        ];

        for (error, expected) in cases {
            let (status, _) = engine_error("test", error);
            assert_eq!(status, expected);
        }
    }
}
