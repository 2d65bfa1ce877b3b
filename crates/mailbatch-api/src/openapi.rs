//! OpenAPI documentation
//!
//! Provides OpenAPI 3.0 specification and Swagger UI for the Mailbatch API.

use axum::{
    response::{Html, IntoResponse},
    routing::get,
    Json, Router,
};
use serde_json::json;

/// Create OpenAPI routes
pub fn create_openapi_routes() -> Router {
    Router::new()
        .route("/openapi.json", get(openapi_json))
        .route("/docs", get(swagger_ui))
}

/// OpenAPI JSON specification endpoint
async fn openapi_json() -> impl IntoResponse {
    Json(get_openapi_spec())
}

/// Swagger UI HTML endpoint
async fn swagger_ui() -> impl IntoResponse {
    Html(SWAGGER_UI_HTML)
}

/// Get the OpenAPI specification as JSON
fn get_openapi_spec() -> serde_json::Value {
    json!({
        "openapi": "3.0.3",
        "info": {
            "title": "Mailbatch API",
            "description": "REST API for the Mailbatch campaign service: lead intake, batched promotional-email campaigns, sender configuration, and delivery analytics.",
            "version": "1.0.0",
            "contact": {
                "name": "Mailbatch Team",
                "url": "https://github.com/example/mailbatch"
            },
            "license": {
                "name": "Apache-2.0",
                "url": "https://www.apache.org/licenses/LICENSE-2.0"
            }
        },
        "servers": [
            {
                "url": "/",
                "description": "This server"
            }
        ],
        "tags": [
            {"name": "health", "description": "Health check endpoints"},
            {"name": "leads", "description": "Lead intake (campaign recipients)"},
            {"name": "campaigns", "description": "Campaign submission and polling"},
            {"name": "sender-configs", "description": "Sender configuration management"},
            {"name": "sender", "description": "Sender operations and telemetry"},
            {"name": "analytics", "description": "Trend and recommendation views"}
        ],
        "paths": {
            // Health endpoints
            "/health": {
                "get": {
                    "tags": ["health"],
                    "summary": "Basic health check",
                    "operationId": "health",
                    "responses": {
                        "200": {
                            "description": "Service is healthy",
                            "content": {
                                "application/json": {
                                    "schema": {"$ref": "#/components/schemas/HealthResponse"}
                                }
                            }
                        }
                    }
                }
            },
            "/health/live": {
                "get": {
                    "tags": ["health"],
                    "summary": "Liveness probe",
                    "operationId": "liveness",
                    "responses": {
                        "200": {"description": "Service is alive"},
                        "503": {"description": "Service is not alive"}
                    }
                }
            },
            "/health/ready": {
                "get": {
                    "tags": ["health"],
                    "summary": "Readiness probe",
                    "operationId": "readiness",
                    "responses": {
                        "200": {"description": "Service is ready"},
                        "503": {"description": "Service is not ready"}
                    }
                }
            },
            "/health/detailed": {
                "get": {
                    "tags": ["health"],
                    "summary": "Detailed health check",
                    "operationId": "healthDetailed",
                    "responses": {
                        "200": {
                            "description": "Detailed health status",
                            "content": {
                                "application/json": {
                                    "schema": {"$ref": "#/components/schemas/DetailedHealthResponse"}
                                }
                            }
                        }
                    }
                }
            },
            // Lead endpoints
            "/api/v1/leads": {
                "get": {
                    "tags": ["leads"],
                    "summary": "List leads",
                    "operationId": "listLeads",
                    "parameters": [
                        {"name": "limit", "in": "query", "schema": {"type": "integer", "default": 50}},
                        {"name": "offset", "in": "query", "schema": {"type": "integer", "default": 0}}
                    ],
                    "responses": {
                        "200": {
                            "description": "List of leads",
                            "content": {
                                "application/json": {
                                    "schema": {"$ref": "#/components/schemas/LeadListResponse"}
                                }
                            }
                        }
                    }
                },
                "post": {
                    "tags": ["leads"],
                    "summary": "Create a lead",
                    "operationId": "createLead",
                    "requestBody": {
                        "required": true,
                        "content": {
                            "application/json": {
                                "schema": {"$ref": "#/components/schemas/CreateLeadRequest"}
                            }
                        }
                    },
                    "responses": {
                        "201": {
                            "description": "Lead created",
                            "content": {
                                "application/json": {
                                    "schema": {"$ref": "#/components/schemas/Lead"}
                                }
                            }
                        },
                        "400": {
                            "description": "Validation error",
                            "content": {
                                "application/json": {
                                    "schema": {"$ref": "#/components/schemas/ErrorResponse"}
                                }
                            }
                        }
                    }
                }
            },
            "/api/v1/leads/{id}": {
                "get": {
                    "tags": ["leads"],
                    "summary": "Get a lead by ID",
                    "operationId": "getLead",
                    "parameters": [
                        {"name": "id", "in": "path", "required": true, "schema": {"type": "string", "format": "uuid"}}
                    ],
                    "responses": {
                        "200": {
                            "description": "Lead details",
                            "content": {
                                "application/json": {
                                    "schema": {"$ref": "#/components/schemas/Lead"}
                                }
                            }
                        },
                        "404": {"description": "Lead not found"}
                    }
                }
            },
            // Campaign endpoints
            "/api/v1/campaigns": {
                "get": {
                    "tags": ["campaigns"],
                    "summary": "List campaigns",
                    "description": "Error and batch logs are omitted from the list view; fetch a single campaign for them.",
                    "operationId": "listCampaigns",
                    "parameters": [
                        {"name": "status", "in": "query", "schema": {"type": "string", "enum": ["sending", "completed", "failed", "cancelled"]}},
                        {"name": "limit", "in": "query", "schema": {"type": "integer", "default": 50}},
                        {"name": "offset", "in": "query", "schema": {"type": "integer", "default": 0}}
                    ],
                    "responses": {
                        "200": {
                            "description": "List of campaigns",
                            "content": {
                                "application/json": {
                                    "schema": {"$ref": "#/components/schemas/CampaignListResponse"}
                                }
                            }
                        }
                    }
                },
                "post": {
                    "tags": ["campaigns"],
                    "summary": "Start a campaign",
                    "description": "Accepts the campaign and returns immediately; delivery runs in the background and is observed by polling the campaign record.",
                    "operationId": "startCampaign",
                    "requestBody": {
                        "required": true,
                        "content": {
                            "application/json": {
                                "schema": {"$ref": "#/components/schemas/StartCampaignRequest"}
                            }
                        }
                    },
                    "responses": {
                        "202": {
                            "description": "Campaign accepted",
                            "content": {
                                "application/json": {
                                    "schema": {"$ref": "#/components/schemas/CampaignAccepted"}
                                }
                            }
                        },
                        "400": {
                            "description": "Validation error, no active configuration, or no recipients",
                            "content": {
                                "application/json": {
                                    "schema": {"$ref": "#/components/schemas/ErrorResponse"}
                                }
                            }
                        },
                        "429": {
                            "description": "Daily send quota exceeded",
                            "content": {
                                "application/json": {
                                    "schema": {"$ref": "#/components/schemas/ErrorResponse"}
                                }
                            }
                        }
                    }
                }
            },
            "/api/v1/campaigns/{id}": {
                "get": {
                    "tags": ["campaigns"],
                    "summary": "Get a campaign by ID",
                    "operationId": "getCampaign",
                    "parameters": [
                        {"name": "id", "in": "path", "required": true, "schema": {"type": "string", "format": "uuid"}}
                    ],
                    "responses": {
                        "200": {
                            "description": "Campaign details including error and batch logs",
                            "content": {
                                "application/json": {
                                    "schema": {"$ref": "#/components/schemas/CampaignDetail"}
                                }
                            }
                        },
                        "404": {"description": "Campaign not found"}
                    }
                }
            },
            "/api/v1/campaigns/{id}/cancel": {
                "post": {
                    "tags": ["campaigns"],
                    "summary": "Cancel a sending campaign",
                    "description": "Valid only while the campaign is sending. The batch loop stops at the next batch boundary; in-flight sends complete.",
                    "operationId": "cancelCampaign",
                    "parameters": [
                        {"name": "id", "in": "path", "required": true, "schema": {"type": "string", "format": "uuid"}}
                    ],
                    "responses": {
                        "200": {
                            "description": "Campaign cancelled",
                            "content": {
                                "application/json": {
                                    "schema": {"$ref": "#/components/schemas/CampaignDetail"}
                                }
                            }
                        },
                        "404": {"description": "Campaign not found"},
                        "409": {"description": "Campaign is not sending"}
                    }
                }
            },
            // Sender configuration endpoints
            "/api/v1/sender-configs": {
                "get": {
                    "tags": ["sender-configs"],
                    "summary": "List sender configurations",
                    "operationId": "listSenderConfigs",
                    "parameters": [
                        {"name": "limit", "in": "query", "schema": {"type": "integer", "default": 50}},
                        {"name": "offset", "in": "query", "schema": {"type": "integer", "default": 0}}
                    ],
                    "responses": {
                        "200": {
                            "description": "List of sender configurations",
                            "content": {
                                "application/json": {
                                    "schema": {"$ref": "#/components/schemas/SenderConfigListResponse"}
                                }
                            }
                        }
                    }
                },
                "post": {
                    "tags": ["sender-configs"],
                    "summary": "Create a sender configuration",
                    "description": "New configurations are created inactive; activate one to route sends through it.",
                    "operationId": "createSenderConfig",
                    "requestBody": {
                        "required": true,
                        "content": {
                            "application/json": {
                                "schema": {"$ref": "#/components/schemas/CreateSenderConfigRequest"}
                            }
                        }
                    },
                    "responses": {
                        "201": {
                            "description": "Sender configuration created",
                            "content": {
                                "application/json": {
                                    "schema": {"$ref": "#/components/schemas/SenderConfig"}
                                }
                            }
                        },
                        "400": {
                            "description": "Validation error",
                            "content": {
                                "application/json": {
                                    "schema": {"$ref": "#/components/schemas/ErrorResponse"}
                                }
                            }
                        }
                    }
                }
            },
            "/api/v1/sender-configs/{id}": {
                "get": {
                    "tags": ["sender-configs"],
                    "summary": "Get a sender configuration by ID",
                    "operationId": "getSenderConfig",
                    "parameters": [
                        {"name": "id", "in": "path", "required": true, "schema": {"type": "string", "format": "uuid"}}
                    ],
                    "responses": {
                        "200": {
                            "description": "Sender configuration details",
                            "content": {
                                "application/json": {
                                    "schema": {"$ref": "#/components/schemas/SenderConfig"}
                                }
                            }
                        },
                        "404": {"description": "Sender configuration not found"}
                    }
                },
                "put": {
                    "tags": ["sender-configs"],
                    "summary": "Update a sender configuration",
                    "operationId": "updateSenderConfig",
                    "parameters": [
                        {"name": "id", "in": "path", "required": true, "schema": {"type": "string", "format": "uuid"}}
                    ],
                    "requestBody": {
                        "required": true,
                        "content": {
                            "application/json": {
                                "schema": {"$ref": "#/components/schemas/UpdateSenderConfigRequest"}
                            }
                        }
                    },
                    "responses": {
                        "200": {
                            "description": "Sender configuration updated",
                            "content": {
                                "application/json": {
                                    "schema": {"$ref": "#/components/schemas/SenderConfig"}
                                }
                            }
                        },
                        "404": {"description": "Sender configuration not found"}
                    }
                },
                "delete": {
                    "tags": ["sender-configs"],
                    "summary": "Delete a sender configuration",
                    "operationId": "deleteSenderConfig",
                    "parameters": [
                        {"name": "id", "in": "path", "required": true, "schema": {"type": "string", "format": "uuid"}}
                    ],
                    "responses": {
                        "204": {"description": "Sender configuration deleted"},
                        "404": {"description": "Sender configuration not found"},
                        "409": {"description": "Sender configuration is referenced by campaigns"}
                    }
                }
            },
            "/api/v1/sender-configs/{id}/activate": {
                "post": {
                    "tags": ["sender-configs"],
                    "summary": "Activate a sender configuration",
                    "description": "Exactly one configuration is active at a time; activating one deactivates all others.",
                    "operationId": "activateSenderConfig",
                    "parameters": [
                        {"name": "id", "in": "path", "required": true, "schema": {"type": "string", "format": "uuid"}}
                    ],
                    "responses": {
                        "200": {
                            "description": "Sender configuration activated",
                            "content": {
                                "application/json": {
                                    "schema": {"$ref": "#/components/schemas/SenderConfig"}
                                }
                            }
                        },
                        "404": {"description": "Sender configuration not found"}
                    }
                }
            },
            // Sender operation endpoints
            "/api/v1/sender/test": {
                "post": {
                    "tags": ["sender"],
                    "summary": "Send a test email",
                    "description": "Sends through the active configuration and counts against its quota. A failed delivery is a 200 with success=false.",
                    "operationId": "sendTestEmail",
                    "requestBody": {
                        "required": true,
                        "content": {
                            "application/json": {
                                "schema": {"$ref": "#/components/schemas/TestEmailRequest"}
                            }
                        }
                    },
                    "responses": {
                        "200": {
                            "description": "Delivery outcome",
                            "content": {
                                "application/json": {
                                    "schema": {"$ref": "#/components/schemas/SendOutcome"}
                                }
                            }
                        },
                        "400": {
                            "description": "Validation error or no active configuration",
                            "content": {
                                "application/json": {
                                    "schema": {"$ref": "#/components/schemas/ErrorResponse"}
                                }
                            }
                        },
                        "429": {
                            "description": "Daily send quota exceeded",
                            "content": {
                                "application/json": {
                                    "schema": {"$ref": "#/components/schemas/ErrorResponse"}
                                }
                            }
                        }
                    }
                }
            },
            "/api/v1/sender/stats": {
                "get": {
                    "tags": ["sender"],
                    "summary": "Sender statistics",
                    "description": "Lifetime counters from the active configuration plus statistics for the current process session.",
                    "operationId": "getSenderStats",
                    "responses": {
                        "200": {
                            "description": "Sender statistics",
                            "content": {
                                "application/json": {
                                    "schema": {"$ref": "#/components/schemas/SenderStats"}
                                }
                            }
                        },
                        "400": {"description": "No active configuration"}
                    }
                }
            },
            "/api/v1/sender/health": {
                "get": {
                    "tags": ["sender"],
                    "summary": "Sender health classification",
                    "operationId": "getSenderHealth",
                    "responses": {
                        "200": {
                            "description": "Health status with advisory issues",
                            "content": {
                                "application/json": {
                                    "schema": {"$ref": "#/components/schemas/SystemHealth"}
                                }
                            }
                        },
                        "400": {"description": "No active configuration"}
                    }
                }
            },
            // Analytics endpoints
            "/api/v1/analytics/trends": {
                "get": {
                    "tags": ["analytics"],
                    "summary": "Campaign trend deltas",
                    "description": "Compares the first and last data point in the window for sent count, success rate, and average send time.",
                    "operationId": "getTrends",
                    "parameters": [
                        {"name": "days", "in": "query", "schema": {"type": "integer", "default": 7, "minimum": 1, "maximum": 365}}
                    ],
                    "responses": {
                        "200": {
                            "description": "Trend report",
                            "content": {
                                "application/json": {
                                    "schema": {"$ref": "#/components/schemas/TrendReport"}
                                }
                            }
                        }
                    }
                }
            },
            "/api/v1/analytics/recommendations": {
                "get": {
                    "tags": ["analytics"],
                    "summary": "Advisory recommendations",
                    "operationId": "getRecommendations",
                    "responses": {
                        "200": {
                            "description": "Recommendations derived from the active configuration",
                            "content": {
                                "application/json": {
                                    "schema": {
                                        "type": "array",
                                        "items": {"$ref": "#/components/schemas/Recommendation"}
                                    }
                                }
                            }
                        },
                        "400": {"description": "No active configuration"}
                    }
                }
            }
        },
        "components": {
            "schemas": {
                "HealthResponse": {
                    "type": "object",
                    "properties": {
                        "status": {"type": "string", "example": "healthy"}
                    }
                },
                "DetailedHealthResponse": {
                    "type": "object",
                    "properties": {
                        "status": {"type": "string", "enum": ["healthy", "degraded", "unhealthy"]},
                        "checks": {
                            "type": "object",
                            "properties": {
                                "database": {"$ref": "#/components/schemas/ComponentHealth"},
                                "sender_config": {"$ref": "#/components/schemas/ComponentHealth"}
                            }
                        }
                    }
                },
                "ComponentHealth": {
                    "type": "object",
                    "properties": {
                        "status": {"type": "string"},
                        "latency_ms": {"type": "integer"},
                        "error": {"type": "string"}
                    }
                },
                "ErrorResponse": {
                    "type": "object",
                    "properties": {
                        "error": {"type": "string", "example": "validation_error"},
                        "message": {"type": "string"}
                    }
                },
                "Lead": {
                    "type": "object",
                    "properties": {
                        "id": {"type": "string", "format": "uuid"},
                        "name": {"type": "string"},
                        "email": {"type": "string", "format": "email"},
                        "phone": {"type": "string"},
                        "message": {"type": "string"},
                        "created_at": {"type": "string", "format": "date-time"}
                    }
                },
                "CreateLeadRequest": {
                    "type": "object",
                    "required": ["name", "email"],
                    "properties": {
                        "name": {"type": "string"},
                        "email": {"type": "string", "format": "email"},
                        "phone": {"type": "string"},
                        "message": {"type": "string"}
                    }
                },
                "LeadListResponse": {
                    "type": "object",
                    "properties": {
                        "data": {
                            "type": "array",
                            "items": {"$ref": "#/components/schemas/Lead"}
                        },
                        "total": {"type": "integer"},
                        "limit": {"type": "integer"},
                        "offset": {"type": "integer"}
                    }
                },
                "StartCampaignRequest": {
                    "type": "object",
                    "required": ["title", "body"],
                    "properties": {
                        "title": {"type": "string", "description": "Campaign title, also used as the email subject"},
                        "body": {"type": "string"},
                        "cta_text": {"type": "string"},
                        "cta_link": {"type": "string", "format": "uri"},
                        "contact_email": {"type": "string", "format": "email"},
                        "contact_phone": {"type": "string"}
                    }
                },
                "CampaignAccepted": {
                    "type": "object",
                    "properties": {
                        "campaign_id": {"type": "string", "format": "uuid"},
                        "total_recipients": {"type": "integer"},
                        "status": {"type": "string", "example": "sending"},
                        "estimated_time_minutes": {"type": "integer"}
                    }
                },
                "CampaignSummary": {
                    "type": "object",
                    "properties": {
                        "id": {"type": "string", "format": "uuid"},
                        "title": {"type": "string"},
                        "status": {"type": "string", "enum": ["sending", "completed", "failed", "cancelled"]},
                        "total_recipients": {"type": "integer"},
                        "sent_count": {"type": "integer"},
                        "failed_count": {"type": "integer"},
                        "progress": {"type": "integer", "minimum": 0, "maximum": 100},
                        "started_at": {"type": "string", "format": "date-time"},
                        "completed_at": {"type": "string", "format": "date-time"},
                        "duration_ms": {"type": "integer"},
                        "average_send_time_ms": {"type": "number"},
                        "sender_config_id": {"type": "string", "format": "uuid"},
                        "created_at": {"type": "string", "format": "date-time"},
                        "updated_at": {"type": "string", "format": "date-time"}
                    }
                },
                "CampaignDetail": {
                    "allOf": [
                        {"$ref": "#/components/schemas/CampaignSummary"},
                        {
                            "type": "object",
                            "properties": {
                                "body": {"type": "string"},
                                "cta_text": {"type": "string"},
                                "cta_link": {"type": "string"},
                                "contact_email": {"type": "string"},
                                "contact_phone": {"type": "string"},
                                "errors": {
                                    "type": "array",
                                    "items": {"$ref": "#/components/schemas/ErrorLogEntry"}
                                },
                                "batches": {
                                    "type": "array",
                                    "items": {"$ref": "#/components/schemas/BatchLogEntry"}
                                }
                            }
                        }
                    ]
                },
                "CampaignListResponse": {
                    "type": "object",
                    "properties": {
                        "data": {
                            "type": "array",
                            "items": {"$ref": "#/components/schemas/CampaignSummary"}
                        },
                        "total": {"type": "integer"},
                        "limit": {"type": "integer"},
                        "offset": {"type": "integer"}
                    }
                },
                "ErrorLogEntry": {
                    "type": "object",
                    "properties": {
                        "recipient": {"type": "string", "description": "Recipient address, or \"system\" for engine-level errors"},
                        "error": {"type": "string"},
                        "timestamp": {"type": "string", "format": "date-time"}
                    }
                },
                "BatchLogEntry": {
                    "type": "object",
                    "properties": {
                        "batch_number": {"type": "integer"},
                        "sent_in_batch": {"type": "integer"},
                        "failed_in_batch": {"type": "integer"},
                        "average_batch_time_ms": {"type": "number"}
                    }
                },
                "SenderConfig": {
                    "type": "object",
                    "description": "The SMTP credential is never returned.",
                    "properties": {
                        "id": {"type": "string", "format": "uuid"},
                        "name": {"type": "string"},
                        "from_address": {"type": "string", "format": "email"},
                        "from_name": {"type": "string"},
                        "smtp_host": {"type": "string"},
                        "smtp_port": {"type": "integer"},
                        "use_tls": {"type": "boolean"},
                        "use_starttls": {"type": "boolean"},
                        "daily_limit": {"type": "integer"},
                        "emails_sent_today": {"type": "integer"},
                        "last_reset_date": {"type": "string", "format": "date"},
                        "monthly_emails_sent": {"type": "integer"},
                        "current_month": {"type": "string", "example": "2024-06"},
                        "total_emails_sent": {"type": "integer"},
                        "total_emails_failed": {"type": "integer"},
                        "success_rate": {"type": "integer", "minimum": 0, "maximum": 100},
                        "average_send_time_ms": {"type": "number"},
                        "consecutive_failures": {"type": "integer"},
                        "last_successful_send": {"type": "string", "format": "date-time"},
                        "last_error_message": {"type": "string"},
                        "last_error_at": {"type": "string", "format": "date-time"},
                        "error_count": {"type": "integer"},
                        "last_used_ip": {"type": "string"},
                        "suspicious_activity_count": {"type": "integer"},
                        "last_suspicious_activity": {"type": "string", "format": "date-time"},
                        "is_active": {"type": "boolean"},
                        "created_at": {"type": "string", "format": "date-time"},
                        "updated_at": {"type": "string", "format": "date-time"}
                    }
                },
                "CreateSenderConfigRequest": {
                    "type": "object",
                    "required": ["name", "from_address", "smtp_host", "smtp_port", "smtp_password"],
                    "properties": {
                        "name": {"type": "string"},
                        "from_address": {"type": "string", "format": "email"},
                        "from_name": {"type": "string"},
                        "smtp_host": {"type": "string", "example": "smtp.gmail.com"},
                        "smtp_port": {"type": "integer", "example": 587},
                        "smtp_password": {"type": "string"},
                        "use_tls": {"type": "boolean", "default": true},
                        "use_starttls": {"type": "boolean", "default": false},
                        "daily_limit": {"type": "integer", "default": 500}
                    }
                },
                "UpdateSenderConfigRequest": {
                    "type": "object",
                    "properties": {
                        "name": {"type": "string"},
                        "from_address": {"type": "string", "format": "email"},
                        "from_name": {"type": "string"},
                        "smtp_host": {"type": "string"},
                        "smtp_port": {"type": "integer"},
                        "smtp_password": {"type": "string"},
                        "use_tls": {"type": "boolean"},
                        "use_starttls": {"type": "boolean"},
                        "daily_limit": {"type": "integer"}
                    }
                },
                "SenderConfigListResponse": {
                    "type": "object",
                    "properties": {
                        "data": {
                            "type": "array",
                            "items": {"$ref": "#/components/schemas/SenderConfig"}
                        },
                        "total": {"type": "integer"},
                        "limit": {"type": "integer"},
                        "offset": {"type": "integer"}
                    }
                },
                "TestEmailRequest": {
                    "type": "object",
                    "required": ["to"],
                    "properties": {
                        "to": {"type": "string", "format": "email"}
                    }
                },
                "SendOutcome": {
                    "type": "object",
                    "properties": {
                        "success": {"type": "boolean"},
                        "message_id": {"type": "string"},
                        "error": {"type": "string"},
                        "send_time_ms": {"type": "integer"}
                    }
                },
                "SessionStats": {
                    "type": "object",
                    "description": "Attempts made since the current process started",
                    "properties": {
                        "total_sends": {"type": "integer"},
                        "success_count": {"type": "integer"},
                        "error_count": {"type": "integer"},
                        "average_send_time_ms": {"type": "number"}
                    }
                },
                "SenderStats": {
                    "type": "object",
                    "properties": {
                        "config_id": {"type": "string", "format": "uuid"},
                        "config_name": {"type": "string"},
                        "from_address": {"type": "string"},
                        "total_emails_sent": {"type": "integer"},
                        "total_emails_failed": {"type": "integer"},
                        "success_rate": {"type": "integer"},
                        "average_send_time_ms": {"type": "number"},
                        "emails_sent_today": {"type": "integer"},
                        "daily_limit": {"type": "integer"},
                        "remaining_today": {"type": "integer"},
                        "monthly_emails_sent": {"type": "integer"},
                        "consecutive_failures": {"type": "integer"},
                        "last_successful_send": {"type": "string", "format": "date-time"},
                        "session": {"$ref": "#/components/schemas/SessionStats"}
                    }
                },
                "SystemHealth": {
                    "type": "object",
                    "properties": {
                        "status": {"type": "string", "enum": ["healthy", "degraded"]},
                        "issues": {
                            "type": "array",
                            "items": {"type": "string"}
                        },
                        "consecutive_failures": {"type": "integer"},
                        "success_rate": {"type": "integer"},
                        "remaining_today": {"type": "integer"},
                        "suspicious_activity_count": {"type": "integer"}
                    }
                },
                "TrendDelta": {
                    "type": "object",
                    "properties": {
                        "first": {"type": "number"},
                        "last": {"type": "number"},
                        "absolute": {"type": "number"},
                        "percent": {"type": "number", "description": "0 when the baseline is 0"}
                    }
                },
                "TrendReport": {
                    "type": "object",
                    "properties": {
                        "window_days": {"type": "integer"},
                        "data_points": {"type": "integer"},
                        "sent": {"$ref": "#/components/schemas/TrendDelta"},
                        "success_rate": {"$ref": "#/components/schemas/TrendDelta"},
                        "average_send_time_ms": {"$ref": "#/components/schemas/TrendDelta"}
                    }
                },
                "Recommendation": {
                    "type": "object",
                    "properties": {
                        "severity": {"type": "string", "enum": ["info", "warning", "critical"]},
                        "category": {"type": "string", "example": "deliverability"},
                        "message": {"type": "string"}
                    }
                }
            }
        }
    })
}

/// Swagger UI HTML template
const SWAGGER_UI_HTML: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>Mailbatch API Documentation</title>
    <link rel="stylesheet" href="https://unpkg.com/swagger-ui-dist@5.9.0/swagger-ui.css" />
    <style>
        body { margin: 0; padding: 0; }
        .swagger-ui .topbar { display: none; }
    </style>
</head>
<body>
    <div id="swagger-ui"></div>
    <script src="https://unpkg.com/swagger-ui-dist@5.9.0/swagger-ui-bundle.js"></script>
    <script>
        window.onload = function() {
            SwaggerUIBundle({
                url: "/openapi.json",
                dom_id: '#swagger-ui',
                deepLinking: true,
                presets: [
                    SwaggerUIBundle.presets.apis,
                    SwaggerUIBundle.SwaggerUIStandalonePreset
                ],
                layout: "StandaloneLayout"
            });
        };
    </script>
</body>
</html>"#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_spec_covers_core_paths() {
        let spec = get_openapi_spec();
        let paths = spec["paths"].as_object().unwrap();

        for path in [
            "/health",
            "/api/v1/leads",
            "/api/v1/campaigns",
            "/api/v1/campaigns/{id}/cancel",
            "/api/v1/sender-configs/{id}/activate",
            "/api/v1/sender/test",
            "/api/v1/analytics/trends",
        ] {
            assert!(paths.contains_key(path), "missing path {}", path);
        }
    }

    #[test]
    fn test_sender_config_schema_has_no_password() {
        let spec = get_openapi_spec();
        let properties = &spec["components"]["schemas"]["SenderConfig"]["properties"];
        assert!(properties.get("smtp_password").is_none());
    }
}
