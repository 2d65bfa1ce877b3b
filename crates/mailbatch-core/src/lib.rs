//! Mailbatch Core - Campaign engine and delivery
//!
//! The campaign engine fans a recipient list into fixed-size batches,
//! delivers each batch concurrently through the active sender
//! configuration, and records progress on the campaign row as it goes.

pub mod analytics;
pub mod delivery;
pub mod engine;
pub mod maintenance;
pub mod sender;
pub mod template;

pub use delivery::{Mailer, SendOutcome, SmtpMailer};
pub use engine::{CampaignEngine, EngineError};
pub use maintenance::MaintenanceWorker;
pub use sender::{SenderError, SenderManager};
pub use template::CampaignRenderer;
