//! Mailbatch Storage - Database layer
//!
//! PostgreSQL-backed persistence for sender configurations, campaigns,
//! and leads.

pub mod db;
pub mod models;
pub mod repository;

pub use db::DatabasePool;
