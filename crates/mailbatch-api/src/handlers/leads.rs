//! Lead intake handlers
//!
//! Leads are the recipient source for campaigns: every lead with a
//! deliverable address is targeted by the next campaign start.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use mailbatch_common::types::EmailAddress;
use mailbatch_storage::models::{CreateLead, Lead};
use mailbatch_storage::repository::LeadRepository;
use serde::{Deserialize, Serialize};
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

/// Query parameters for listing leads
#[derive(Debug, Deserialize)]
pub struct ListLeadsQuery {
    #[serde(default = "default_limit")]
    pub limit: i64,
    #[serde(default)]
    pub offset: i64,
}

fn default_limit() -> i64 {
    50
}

/// Lead list response
#[derive(Debug, Serialize)]
pub struct LeadListResponse {
    pub data: Vec<Lead>,
    pub total: i64,
    pub limit: i64,
    pub offset: i64,
}

/// Request body for creating a lead
#[derive(Debug, Deserialize)]
pub struct CreateLeadRequest {
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub message: Option<String>,
}

/// Create a new lead
///
/// POST /api/v1/leads
pub async fn create_lead(
    State(state): State<Arc<AppState>>,
    Json(input): Json<CreateLeadRequest>,
) -> Result<(StatusCode, Json<Lead>), (StatusCode, Json<ErrorResponse>)> {
    if input.name.trim().is_empty() {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse {
                error: "validation_error".to_string(),
                message: "Name is required".to_string(),
            }),
        ));
    }

    if EmailAddress::parse(&input.email).is_err() {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse {
                error: "validation_error".to_string(),
                message: "A valid email address is required".to_string(),
            }),
        ));
    }

    let repo = LeadRepository::new(state.db_pool.pool().clone());

    let lead = repo
        .create(CreateLead {
            name: input.name,
            email: input.email,
            phone: input.phone,
            message: input.message,
        })
        .await
        .map_err(|e| {
            error!("Failed to create lead: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    error: "internal_error".to_string(),
                    message: "Failed to create lead".to_string(),
                }),
            )
        })?;

    info!("Created lead {}", lead.id);

    Ok((StatusCode::CREATED, Json(lead)))
}

/// List leads
///
/// GET /api/v1/leads
pub async fn list_leads(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListLeadsQuery>,
) -> Result<Json<LeadListResponse>, (StatusCode, Json<ErrorResponse>)> {
    let repo = LeadRepository::new(state.db_pool.pool().clone());

    let leads = repo.list(query.limit, query.offset).await.map_err(|e| {
        error!("Failed to list leads: {}", e);
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ErrorResponse {
                error: "internal_error".to_string(),
                message: "Failed to list leads".to_string(),
            }),
        )
    })?;

    let total = repo.count().await.unwrap_or(0);

    Ok(Json(LeadListResponse {
        data: leads,
        total,
        limit: query.limit,
        offset: query.offset,
    }))
}

/// Get a lead by ID
///
/// GET /api/v1/leads/:id
pub async fn get_lead(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<Lead>, (StatusCode, Json<ErrorResponse>)> {
    let repo = LeadRepository::new(state.db_pool.pool().clone());

    let lead = repo
        .get(id)
        .await
        .map_err(|e| {
            error!("Failed to get lead: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    error: "internal_error".to_string(),
                    message: "Failed to get lead".to_string(),
                }),
            )
        })?
        .ok_or_else(|| {
            (
                StatusCode::NOT_FOUND,
                Json(ErrorResponse {
                    error: "not_found".to_string(),
                    message: "Lead not found".to_string(),
                }),
            )
        })?;

    Ok(Json(lead))
}
