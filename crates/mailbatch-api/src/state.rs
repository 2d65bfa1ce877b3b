//! Shared API state

use mailbatch_core::{CampaignEngine, SenderManager};
use mailbatch_storage::DatabasePool;
use std::sync::Arc;

/// State shared by every handler. Read paths go straight to the
/// repositories through `db_pool`; anything that sends mail or touches
/// quota counters goes through `engine` and `sender` so the cached
/// transport and session statistics stay coherent.
pub struct AppState {
    pub db_pool: DatabasePool,
    pub engine: Arc<CampaignEngine>,
    pub sender: Arc<SenderManager>,
}
