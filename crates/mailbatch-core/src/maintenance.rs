//! Maintenance worker - periodic counter rollovers and startup recovery

use mailbatch_storage::models::{Campaign, ErrorLogEntry};
use mailbatch_storage::repository::CampaignRepository;
use mailbatch_storage::DatabasePool;
use std::sync::Arc;
use tokio::time::{interval, Duration};
use tracing::{error, info, warn};

use crate::sender::{SenderError, SenderManager};

/// Maintenance worker
pub struct MaintenanceWorker {
    sender: Arc<SenderManager>,
    campaign_repo: CampaignRepository,
    reset_check_interval_secs: u64,
}

impl MaintenanceWorker {
    /// Create a new maintenance worker
    pub fn new(
        db_pool: DatabasePool,
        sender: Arc<SenderManager>,
        reset_check_interval_secs: u64,
    ) -> Self {
        Self {
            sender,
            campaign_repo: CampaignRepository::new(db_pool.pool().clone()),
            reset_check_interval_secs,
        }
    }

    /// Run the periodic reset-check loop. Sends themselves also run
    /// the check, so this only matters for the quiet stretches where
    /// nothing is being sent across midnight.
    pub async fn run(&self) {
        let mut ticker = interval(Duration::from_secs(self.reset_check_interval_secs));

        info!(
            interval_secs = self.reset_check_interval_secs,
            "Maintenance worker started"
        );

        loop {
            ticker.tick().await;

            match self.sender.run_reset_check().await {
                Ok(_) => {}
                // No active configuration is a normal state at first boot
                Err(SenderError::ConfigurationMissing) => {}
                Err(e) => error!(error = %e, "Counter reset check failed"),
            }
        }
    }

    /// Fail any campaign stranded in `sending` by a previous process.
    /// The batch loop does not survive a restart, so a sending row at
    /// boot can only be a stray; its counters are reconstructed from
    /// the batch log it wrote before dying. Returns how many were
    /// recovered.
    pub async fn recover_interrupted(&self) -> anyhow::Result<u64> {
        let stranded = self.campaign_repo.list_sending().await?;
        if stranded.is_empty() {
            return Ok(0);
        }

        let mut recovered = 0u64;
        for campaign in stranded {
            let (sent, failed) = reconstructed_counts(&campaign);
            let progress = Campaign::compute_progress(sent, campaign.total_recipients);

            let entry = ErrorLogEntry::system(
                "delivery interrupted by a process restart; progress reconstructed from the batch log",
            );

            match self
                .campaign_repo
                .fail_with_counts(campaign.id, sent, failed, progress, &entry)
                .await
            {
                Ok(Some(_)) => {
                    warn!(
                        campaign_id = %campaign.id,
                        sent,
                        failed,
                        "Recovered interrupted campaign"
                    );
                    recovered += 1;
                }
                // Already terminal, nothing to reconcile
                Ok(None) => {}
                Err(e) => {
                    error!(campaign_id = %campaign.id, error = %e, "Failed to recover campaign")
                }
            }
        }

        Ok(recovered)
    }
}

/// Sum the batch log back into sent/failed totals
fn reconstructed_counts(campaign: &Campaign) -> (i32, i32) {
    let batches = campaign.batch_entries();
    let sent = batches.iter().map(|b| b.sent_in_batch).sum();
    let failed = batches.iter().map(|b| b.failed_in_batch).sum();
    (sent, failed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use mailbatch_storage::models::BatchLogEntry;
    use pretty_assertions::assert_eq;

    fn stranded_campaign(batches: Vec<BatchLogEntry>) -> Campaign {
        Campaign {
            id: uuid::Uuid::new_v4(),
            title: "t".to_string(),
            body: "b".to_string(),
            cta_text: None,
            cta_link: None,
            contact_email: None,
            contact_phone: None,
            total_recipients: 25,
            sent_count: 0,
            failed_count: 0,
            progress: 0,
            status: "sending".to_string(),
            started_at: Utc::now(),
            completed_at: None,
            duration_ms: None,
            average_send_time_ms: None,
            errors: serde_json::json!([]),
            batches: serde_json::to_value(batches).unwrap(),
            sender_config_id: uuid::Uuid::new_v4(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_counts_rebuilt_from_batch_log() {
        let campaign = stranded_campaign(vec![
            BatchLogEntry {
                batch_number: 1,
                sent_in_batch: 10,
                failed_in_batch: 0,
                average_batch_time_ms: 120.0,
            },
            BatchLogEntry {
                batch_number: 2,
                sent_in_batch: 8,
                failed_in_batch: 2,
                average_batch_time_ms: 150.0,
            },
        ]);

        let (sent, failed) = reconstructed_counts(&campaign);
        assert_eq!(sent, 18);
        assert_eq!(failed, 2);
        assert_eq!(Campaign::compute_progress(sent, campaign.total_recipients), 72);
    }

    #[test]
    fn test_counts_zero_when_no_batch_completed() {
        let campaign = stranded_campaign(vec![]);
        let (sent, failed) = reconstructed_counts(&campaign);
        assert_eq!((sent, failed), (0, 0));
    }
}
