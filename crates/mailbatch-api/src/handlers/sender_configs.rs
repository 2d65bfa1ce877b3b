//! Sender configuration handlers
//!
//! Mutations that touch the active configuration tell the sender
//! manager to reinitialize so its cached config and transport are
//! rebuilt from the database.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, NaiveDate, Utc};
use mailbatch_common::types::EmailAddress;
use mailbatch_storage::models::{CreateSenderConfig, SenderConfig, UpdateSenderConfig};
use mailbatch_storage::repository::SenderConfigRepository;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::state::AppState;

/// Error response
#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}

/// Query parameters for listing sender configurations
#[derive(Debug, Deserialize)]
pub struct ListSenderConfigsQuery {
    #[serde(default = "default_limit")]
    pub limit: i64,
    #[serde(default)]
    pub offset: i64,
}

fn default_limit() -> i64 {
    50
}

/// Sender configuration list response
#[derive(Debug, Serialize)]
pub struct SenderConfigListResponse {
    pub data: Vec<SenderConfigResponse>,
    pub total: i64,
    pub limit: i64,
    pub offset: i64,
}

/// Sender configuration as returned by the API. The SMTP credential
/// never leaves the server.
#[derive(Debug, Serialize)]
pub struct SenderConfigResponse {
    pub id: Uuid,
    pub name: String,
    pub from_address: String,
    pub from_name: Option<String>,
    pub smtp_host: String,
    pub smtp_port: i32,
    pub use_tls: bool,
    pub use_starttls: bool,
    pub daily_limit: i32,
    pub emails_sent_today: i32,
    pub last_reset_date: NaiveDate,
    pub monthly_emails_sent: i32,
    pub current_month: String,
    pub total_emails_sent: i64,
    pub total_emails_failed: i64,
    pub success_rate: i32,
    pub average_send_time_ms: f64,
    pub consecutive_failures: i32,
    pub last_successful_send: Option<DateTime<Utc>>,
    pub last_error_message: Option<String>,
    pub last_error_at: Option<DateTime<Utc>>,
    pub error_count: i32,
    pub last_used_ip: Option<String>,
    pub suspicious_activity_count: i32,
    pub last_suspicious_activity: Option<DateTime<Utc>>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<SenderConfig> for SenderConfigResponse {
    fn from(c: SenderConfig) -> Self {
        Self {
            id: c.id,
            name: c.name,
            from_address: c.from_address,
            from_name: c.from_name,
            smtp_host: c.smtp_host,
            smtp_port: c.smtp_port,
            use_tls: c.use_tls,
            use_starttls: c.use_starttls,
            daily_limit: c.daily_limit,
            emails_sent_today: c.emails_sent_today,
            last_reset_date: c.last_reset_date,
            monthly_emails_sent: c.monthly_emails_sent,
            current_month: c.current_month,
            total_emails_sent: c.total_emails_sent,
            total_emails_failed: c.total_emails_failed,
            success_rate: c.success_rate,
            average_send_time_ms: c.average_send_time_ms,
            consecutive_failures: c.consecutive_failures,
            last_successful_send: c.last_successful_send,
            last_error_message: c.last_error_message,
            last_error_at: c.last_error_at,
            error_count: c.error_count,
            last_used_ip: c.last_used_ip,
            suspicious_activity_count: c.suspicious_activity_count,
            last_suspicious_activity: c.last_suspicious_activity,
            is_active: c.is_active,
            created_at: c.created_at,
            updated_at: c.updated_at,
        }
    }
}

/// Request body for creating a sender configuration
#[derive(Debug, Deserialize)]
pub struct CreateSenderConfigRequest {
    pub name: String,
    pub from_address: String,
    pub from_name: Option<String>,
    pub smtp_host: String,
    pub smtp_port: i32,
    pub smtp_password: String,
    pub use_tls: Option<bool>,
    pub use_starttls: Option<bool>,
    pub daily_limit: Option<i32>,
}

/// Request body for updating a sender configuration
#[derive(Debug, Deserialize)]
pub struct UpdateSenderConfigRequest {
    pub name: Option<String>,
    pub from_address: Option<String>,
    pub from_name: Option<String>,
    pub smtp_host: Option<String>,
    pub smtp_port: Option<i32>,
    pub smtp_password: Option<String>,
    pub use_tls: Option<bool>,
    pub use_starttls: Option<bool>,
    pub daily_limit: Option<i32>,
}

fn validation_error(message: &str) -> (StatusCode, Json<ErrorResponse>) {
    (
        StatusCode::BAD_REQUEST,
        Json(ErrorResponse {
            error: "validation_error".to_string(),
            message: message.to_string(),
        }),
    )
}

/// Create a new sender configuration (inactive until activated)
///
/// POST /api/v1/sender-configs
pub async fn create_sender_config(
    State(state): State<Arc<AppState>>,
    Json(input): Json<CreateSenderConfigRequest>,
) -> Result<(StatusCode, Json<SenderConfigResponse>), (StatusCode, Json<ErrorResponse>)> {
    if input.name.trim().is_empty() {
        return Err(validation_error("Name is required"));
    }

    if EmailAddress::parse(&input.from_address).is_err() {
        return Err(validation_error("From address must be a valid email address"));
    }

    if input.smtp_host.trim().is_empty() {
        return Err(validation_error("SMTP host is required"));
    }

    if !(1..=65535).contains(&input.smtp_port) {
        return Err(validation_error("SMTP port must be between 1 and 65535"));
    }

    if let Some(limit) = input.daily_limit {
        if limit < 1 {
            return Err(validation_error("Daily limit must be at least 1"));
        }
    }

    let repo = SenderConfigRepository::new(state.db_pool.pool().clone());

    let config = repo
        .create(CreateSenderConfig {
            name: input.name,
            from_address: input.from_address,
            from_name: input.from_name,
            smtp_host: input.smtp_host,
            smtp_port: input.smtp_port,
            smtp_password: input.smtp_password,
            use_tls: input.use_tls,
            use_starttls: input.use_starttls,
            daily_limit: input.daily_limit,
        })
        .await
        .map_err(|e| {
            error!("Failed to create sender configuration: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    error: "internal_error".to_string(),
                    message: "Failed to create sender configuration".to_string(),
                }),
            )
        })?;

    info!("Created sender configuration {}", config.id);

    Ok((StatusCode::CREATED, Json(SenderConfigResponse::from(config))))
}

/// List sender configurations
///
/// GET /api/v1/sender-configs
pub async fn list_sender_configs(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListSenderConfigsQuery>,
) -> Result<Json<SenderConfigListResponse>, (StatusCode, Json<ErrorResponse>)> {
    let repo = SenderConfigRepository::new(state.db_pool.pool().clone());

    let configs = repo.list(query.limit, query.offset).await.map_err(|e| {
        error!("Failed to list sender configurations: {}", e);
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ErrorResponse {
                error: "internal_error".to_string(),
                message: "Failed to list sender configurations".to_string(),
            }),
        )
    })?;

    let total = repo.count().await.unwrap_or(0);

    let data = configs
        .into_iter()
        .map(SenderConfigResponse::from)
        .collect();

    Ok(Json(SenderConfigListResponse {
        data,
        total,
        limit: query.limit,
        offset: query.offset,
    }))
}

/// Get a sender configuration by ID
///
/// GET /api/v1/sender-configs/:id
pub async fn get_sender_config(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<SenderConfigResponse>, (StatusCode, Json<ErrorResponse>)> {
    let repo = SenderConfigRepository::new(state.db_pool.pool().clone());

    let config = repo
        .get(id)
        .await
        .map_err(|e| {
            error!("Failed to get sender configuration: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    error: "internal_error".to_string(),
                    message: "Failed to get sender configuration".to_string(),
                }),
            )
        })?
        .ok_or_else(|| {
            (
                StatusCode::NOT_FOUND,
                Json(ErrorResponse {
                    error: "not_found".to_string(),
                    message: "Sender configuration not found".to_string(),
                }),
            )
        })?;

    Ok(Json(SenderConfigResponse::from(config)))
}

/// Update a sender configuration's identity fields
///
/// PUT /api/v1/sender-configs/:id
pub async fn update_sender_config(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(input): Json<UpdateSenderConfigRequest>,
) -> Result<Json<SenderConfigResponse>, (StatusCode, Json<ErrorResponse>)> {
    if let Some(from_address) = &input.from_address {
        if EmailAddress::parse(from_address).is_err() {
            return Err(validation_error("From address must be a valid email address"));
        }
    }

    if let Some(port) = input.smtp_port {
        if !(1..=65535).contains(&port) {
            return Err(validation_error("SMTP port must be between 1 and 65535"));
        }
    }

    if let Some(limit) = input.daily_limit {
        if limit < 1 {
            return Err(validation_error("Daily limit must be at least 1"));
        }
    }

    let repo = SenderConfigRepository::new(state.db_pool.pool().clone());

    let config = repo
        .update(
            id,
            UpdateSenderConfig {
                name: input.name,
                from_address: input.from_address,
                from_name: input.from_name,
                smtp_host: input.smtp_host,
                smtp_port: input.smtp_port,
                smtp_password: input.smtp_password,
                use_tls: input.use_tls,
                use_starttls: input.use_starttls,
                daily_limit: input.daily_limit,
            },
        )
        .await
        .map_err(|e| {
            error!("Failed to update sender configuration: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    error: "internal_error".to_string(),
                    message: "Failed to update sender configuration".to_string(),
                }),
            )
        })?
        .ok_or_else(|| {
            (
                StatusCode::NOT_FOUND,
                Json(ErrorResponse {
                    error: "not_found".to_string(),
                    message: "Sender configuration not found".to_string(),
                }),
            )
        })?;

    // The cached transport may now point at stale credentials
    if config.is_active {
        if let Err(e) = state.sender.reinitialize().await {
            warn!("Failed to reinitialize sender manager after update: {}", e);
        }
    }

    info!("Updated sender configuration {}", id);

    Ok(Json(SenderConfigResponse::from(config)))
}

/// Activate a sender configuration, deactivating all others
///
/// POST /api/v1/sender-configs/:id/activate
pub async fn activate_sender_config(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<SenderConfigResponse>, (StatusCode, Json<ErrorResponse>)> {
    let repo = SenderConfigRepository::new(state.db_pool.pool().clone());

    let config = repo
        .activate(id)
        .await
        .map_err(|e| {
            error!("Failed to activate sender configuration: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    error: "internal_error".to_string(),
                    message: "Failed to activate sender configuration".to_string(),
                }),
            )
        })?
        .ok_or_else(|| {
            (
                StatusCode::NOT_FOUND,
                Json(ErrorResponse {
                    error: "not_found".to_string(),
                    message: "Sender configuration not found".to_string(),
                }),
            )
        })?;

    if let Err(e) = state.sender.reinitialize().await {
        warn!("Failed to reinitialize sender manager after activation: {}", e);
    }

    info!("Activated sender configuration {}", id);

    Ok(Json(SenderConfigResponse::from(config)))
}

/// Delete a sender configuration. Refused while campaigns reference it.
///
/// DELETE /api/v1/sender-configs/:id
pub async fn delete_sender_config(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, (StatusCode, Json<ErrorResponse>)> {
    let repo = SenderConfigRepository::new(state.db_pool.pool().clone());

    let config = repo
        .get(id)
        .await
        .map_err(|e| {
            error!("Failed to get sender configuration: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    error: "internal_error".to_string(),
                    message: "Failed to get sender configuration".to_string(),
                }),
            )
        })?
        .ok_or_else(|| {
            (
                StatusCode::NOT_FOUND,
                Json(ErrorResponse {
                    error: "not_found".to_string(),
                    message: "Sender configuration not found".to_string(),
                }),
            )
        })?;

    let deleted = repo.delete(id).await.map_err(|e| {
        error!("Failed to delete sender configuration: {}", e);
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ErrorResponse {
                error: "internal_error".to_string(),
                message: "Failed to delete sender configuration".to_string(),
            }),
        )
    })?;

    if !deleted {
        return Err((
            StatusCode::CONFLICT,
            Json(ErrorResponse {
                error: "conflict".to_string(),
                message: "Sender configuration is referenced by campaigns".to_string(),
            }),
        ));
    }

    // Deleting the active configuration leaves the manager's cache
    // pointing at a row that no longer exists
    if config.is_active {
        if let Err(e) = state.sender.reinitialize().await {
            warn!("No active sender configuration after delete: {}", e);
        }
    }

    info!("Deleted sender configuration {}", id);

    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn config_fixture() -> SenderConfig {
        SenderConfig {
            id: Uuid::new_v4(),
            name: "Primary".to_string(),
            from_address: "noreply@example.com".to_string(),
            from_name: Some("Example".to_string()),
            smtp_host: "smtp.example.com".to_string(),
            smtp_port: 587,
            smtp_password: "super-secret".to_string(),
            use_tls: false,
            use_starttls: true,
            daily_limit: 500,
            emails_sent_today: 12,
            last_reset_date: Utc::now().date_naive(),
            monthly_emails_sent: 340,
            current_month: "2024-06".to_string(),
            total_emails_sent: 4200,
            total_emails_failed: 58,
            success_rate: 99,
            average_send_time_ms: 830.5,
            consecutive_failures: 0,
            last_successful_send: Some(Utc::now()),
            last_error_message: None,
            last_error_at: None,
            error_count: 58,
            last_used_ip: Some("203.0.113.7".to_string()),
            suspicious_activity_count: 1,
            last_suspicious_activity: None,
            is_active: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_response_redacts_smtp_password() {
        let response = SenderConfigResponse::from(config_fixture());
        let value = serde_json::to_value(&response).unwrap();

        assert!(value.get("smtp_password").is_none());
        assert_eq!(value["from_address"], "noreply@example.com");
        assert_eq!(value["daily_limit"], 500);
        assert_eq!(value["suspicious_activity_count"], 1);
    }

    #[test]
    fn test_validation_error_shape() {
        let (status, Json(body)) = validation_error("Name is required");
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body.error, "validation_error");
        assert_eq!(body.message, "Name is required");
    }
}
