//! Mailbatch API - REST API server
//!
//! This crate provides the REST API server for Mailbatch: lead intake,
//! campaign submission and polling, sender configuration management,
//! and the analytics/health views.
#![recursion_limit = "256"]

pub mod handlers;
pub mod openapi;
pub mod routes;
pub mod state;

pub use openapi::create_openapi_routes;
pub use routes::create_router;
pub use state::AppState;
