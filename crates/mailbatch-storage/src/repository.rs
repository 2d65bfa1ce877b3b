//! Repository layer for data access

pub mod campaigns;
pub mod leads;
pub mod sender_configs;

pub use campaigns::CampaignRepository;
pub use leads::LeadRepository;
pub use sender_configs::SenderConfigRepository;
