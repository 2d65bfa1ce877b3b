//! Sender operation handlers: test sends, statistics, health

use axum::{
    extract::{ConnectInfo, State},
    http::StatusCode,
    Json,
};
use mailbatch_common::types::is_deliverable_address;
use mailbatch_core::analytics::{classify_health, SystemHealth};
use mailbatch_core::sender::{SenderError, SenderStats};
use mailbatch_core::SendOutcome;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::{error, info};

use crate::state::AppState;

/// Error response
#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}

/// Request body for sending a test email
#[derive(Debug, Deserialize)]
pub struct TestEmailRequest {
    pub to: String,
}

fn sender_error(context: &str, e: SenderError) -> (StatusCode, Json<ErrorResponse>) {
    let (status, error) = match &e {
        SenderError::ConfigurationMissing => (StatusCode::BAD_REQUEST, "configuration_missing"),
        SenderError::QuotaExceeded { .. } => (StatusCode::TOO_MANY_REQUESTS, "quota_exceeded"),
        SenderError::Database(_) => {
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

/// Send a test email through the active sender configuration. The
/// outcome is returned either way; a failed delivery is a 200 with
/// `success: false`, not an error.
///
/// POST /api/v1/sender/test
pub async fn send_test_email(
    State(state): State<Arc<AppState>>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    Json(input): Json<TestEmailRequest>,
) -> Result<Json<SendOutcome>, (StatusCode, Json<ErrorResponse>)> {
    if !is_deliverable_address(&input.to) {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse {
                error: "validation_error".to_string(),
                message: "A deliverable email address is required".to_string(),
            }),
        ));
    }

    let outcome = state
        .sender
        .send_test_email(&input.to, &addr.ip().to_string())
        .await
        .map_err(|e| sender_error("Failed to send test email", e))?;

    info!(
        "Test email to {} {}",
        input.to,
        if outcome.success { "delivered" } else { "failed" }
    );

    Ok(Json(outcome))
}

/// Lifetime and session sender statistics
///
/// GET /api/v1/sender/stats
pub async fn get_sender_stats(
    State(state): State<Arc<AppState>>,
) -> Result<Json<SenderStats>, (StatusCode, Json<ErrorResponse>)> {
    let stats = state
        .sender
        .stats()
        .await
        .map_err(|e| sender_error("Failed to read sender statistics", e))?;

    Ok(Json(stats))
}

/// Health classification of the active sender configuration
///
/// GET /api/v1/sender/health
pub async fn get_sender_health(
    State(state): State<Arc<AppState>>,
) -> Result<Json<SystemHealth>, (StatusCode, Json<ErrorResponse>)> {
    let config = state
        .sender
        .active_config()
        .await
        .map_err(|e| sender_error("Failed to read sender health", e))?;

    Ok(Json(classify_health(&config)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_sender_error_status_mapping() {
        let (status, Json(body)) =
            sender_error("test", SenderError::ConfigurationMissing);
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body.error, "configuration_missing");

        let (status, Json(body)) = sender_error(
            "test",
            SenderError::QuotaExceeded {
                remaining: 0,
                requested: 1,
            },
        );
        assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(body.error, "quota_exceeded");
    }
}
