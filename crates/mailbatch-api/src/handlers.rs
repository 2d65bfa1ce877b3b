//! API request handlers

pub mod analytics;
pub mod campaigns;
pub mod health;
pub mod leads;
pub mod sender;
pub mod sender_configs;

pub use health::*;
