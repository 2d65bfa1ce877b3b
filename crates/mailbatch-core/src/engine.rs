//! Campaign engine - batched bulk delivery
//!
//! A campaign is accepted synchronously (pre-flight quota check plus
//! record creation) and delivered by a detached background task. The
//! campaign row is the only handle anyone holds on that task: progress
//! is polled from it and cancellation is a status flip it observes at
//! batch boundaries.

use chrono::Utc;
use mailbatch_storage::models::{
    BatchLogEntry, Campaign, CreateCampaign, ErrorLogEntry, Lead,
};
use mailbatch_storage::repository::{CampaignRepository, LeadRepository};
use mailbatch_storage::DatabasePool;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::time::{sleep, Duration};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::sender::{SenderError, SenderManager};
use crate::template::CampaignRenderer;

/// Recipients per batch. Fixed by design, not configuration: the pair
/// of constants below is the provider-rate contract.
pub const BATCH_SIZE: usize = 10;

/// Pause between batches in milliseconds
pub const BATCH_DELAY_MS: u64 = 2000;

/// Campaign engine errors
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("no active sender configuration")]
    ConfigurationMissing,

    #[error("daily send quota exceeded ({remaining} remaining, {requested} requested)")]
    QuotaExceeded { remaining: i32, requested: i32 },

    #[error("no recipients with a deliverable email address")]
    NoRecipients,

    #[error("campaign not found")]
    NotFound,

    #[error("campaign is not sending")]
    NotSending,

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl From<SenderError> for EngineError {
    fn from(e: SenderError) -> Self {
        match e {
            SenderError::ConfigurationMissing => EngineError::ConfigurationMissing,
            SenderError::QuotaExceeded {
                remaining,
                requested,
            } => EngineError::QuotaExceeded {
                remaining,
                requested,
            },
            SenderError::Database(e) => EngineError::Database(e),
        }
    }
}

/// Campaign content as supplied by the caller; everything else on the
/// campaign row is derived
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CampaignContent {
    pub title: String,
    pub body: String,
    pub cta_text: Option<String>,
    pub cta_link: Option<String>,
    pub contact_email: Option<String>,
    pub contact_phone: Option<String>,
}

/// Returned to the caller at acceptance, before any email is sent
#[derive(Debug, Clone, Serialize)]
pub struct CampaignAccepted {
    pub campaign_id: Uuid,
    pub total_recipients: i32,
    pub status: String,
    pub estimated_time_minutes: u64,
}

/// Campaign engine
#[derive(Clone)]
pub struct CampaignEngine {
    campaign_repo: CampaignRepository,
    lead_repo: LeadRepository,
    sender: Arc<SenderManager>,
    renderer: CampaignRenderer,
    start_lock: Arc<Mutex<()>>,
}

impl CampaignEngine {
    /// Create a new campaign engine
    pub fn new(db_pool: DatabasePool, sender: Arc<SenderManager>) -> Self {
        let pool = db_pool.pool().clone();

        Self {
            campaign_repo: CampaignRepository::new(pool.clone()),
            lead_repo: LeadRepository::new(pool),
            sender,
            renderer: CampaignRenderer::new(),
            start_lock: Arc::new(Mutex::new(())),
        }
    }

    /// Accept a campaign: pre-flight checks, synchronous record
    /// creation, then a detached delivery task. Returns as soon as the
    /// record exists.
    pub async fn start_campaign(
        &self,
        content: CampaignContent,
        origin_ip: &str,
    ) -> Result<CampaignAccepted, EngineError> {
        // Starts are serialized so two concurrent pre-flight checks
        // cannot both pass against the same remaining quota.
        let _guard = self.start_lock.lock().await;

        self.sender.run_reset_check().await?;
        let config = self.sender.active_config().await?;

        let leads = self.lead_repo.list_all().await?;
        let recipients: Vec<Lead> = leads
            .into_iter()
            .filter(|lead| lead.has_deliverable_email())
            .collect();

        if recipients.is_empty() {
            return Err(EngineError::NoRecipients);
        }

        let requested = recipients.len() as i32;
        let remaining = config.remaining_today();
        if remaining < requested {
            return Err(EngineError::QuotaExceeded {
                remaining,
                requested,
            });
        }

        let campaign = self
            .campaign_repo
            .create(CreateCampaign {
                title: content.title.clone(),
                body: content.body.clone(),
                cta_text: content.cta_text.clone(),
                cta_link: content.cta_link.clone(),
                contact_email: content.contact_email.clone(),
                contact_phone: content.contact_phone.clone(),
                total_recipients: requested,
                sender_config_id: config.id,
            })
            .await?;

        info!(
            campaign_id = %campaign.id,
            recipients = requested,
            remaining_quota = remaining,
            "Campaign accepted"
        );

        let engine = self.clone();
        let campaign_id = campaign.id;
        let origin_ip = origin_ip.to_string();
        tokio::spawn(async move {
            engine
                .run_campaign(campaign_id, recipients, content, origin_ip)
                .await;
        });

        Ok(CampaignAccepted {
            campaign_id,
            total_recipients: requested,
            status: campaign.status,
            estimated_time_minutes: estimate_minutes(requested as usize),
        })
    }

    /// Cancel a campaign. Valid only while it is sending; the batch
    /// loop notices at the next batch boundary.
    pub async fn cancel_campaign(&self, id: Uuid) -> Result<Campaign, EngineError> {
        let campaign = self
            .campaign_repo
            .get(id)
            .await?
            .ok_or(EngineError::NotFound)?;

        if campaign.status != "sending" {
            return Err(EngineError::NotSending);
        }

        match self.campaign_repo.cancel(id).await? {
            Some(cancelled) => {
                info!(
                    campaign_id = %id,
                    sent = cancelled.sent_count,
                    failed = cancelled.failed_count,
                    "Campaign cancelled"
                );
                Ok(cancelled)
            }
            // A terminal write raced us between the read and here
            None => Err(EngineError::NotSending),
        }
    }

    /// Background entry point: run the batch loop and convert any
    /// escaped error into a failed campaign with a system-level log
    /// entry. Per-recipient failures never reach this path.
    async fn run_campaign(
        &self,
        campaign_id: Uuid,
        recipients: Vec<Lead>,
        content: CampaignContent,
        origin_ip: String,
    ) {
        if let Err(e) = self
            .process_batches(campaign_id, &recipients, &content, &origin_ip)
            .await
        {
            error!(campaign_id = %campaign_id, error = %e, "Campaign aborted by engine fault");

            let entry = ErrorLogEntry::system(format!("campaign aborted: {}", e));
            if let Err(e) = self.campaign_repo.mark_failed(campaign_id, &entry).await {
                error!(campaign_id = %campaign_id, error = %e, "Failed to record campaign failure");
            }
        }
    }

    async fn process_batches(
        &self,
        campaign_id: Uuid,
        recipients: &[Lead],
        content: &CampaignContent,
        origin_ip: &str,
    ) -> Result<(), EngineError> {
        let started_at = match self.campaign_repo.get(campaign_id).await? {
            Some(campaign) => campaign.started_at,
            None => return Err(EngineError::NotFound),
        };

        let total = recipients.len() as i32;
        let batch_count = recipients.len().div_ceil(BATCH_SIZE);
        let mut sent_total = 0i32;
        let mut failed_total = 0i32;

        for (index, chunk) in recipients.chunks(BATCH_SIZE).enumerate() {
            // Cooperative cancellation: look at the status before
            // dispatching each batch and stop if it is no longer
            // sending.
            match self.campaign_repo.status_of(campaign_id).await? {
                Some(status) if status == "sending" => {}
                Some(status) => {
                    info!(
                        campaign_id = %campaign_id,
                        status = %status,
                        "Campaign no longer sending, stopping batch loop"
                    );
                    return Ok(());
                }
                None => return Err(EngineError::NotFound),
            }

            let batch_number = (index + 1) as i32;

            // All sends in a batch run concurrently; the batch is not
            // done until every one of them resolves.
            let mut handles = Vec::with_capacity(chunk.len());
            for lead in chunk {
                let engine = self.clone();
                let lead = lead.clone();
                let content = content.clone();
                let origin_ip = origin_ip.to_string();
                handles.push(tokio::spawn(async move {
                    engine.send_to_lead(&lead, &content, &origin_ip).await
                }));
            }

            let mut results = Vec::with_capacity(chunk.len());
            for (lead, handle) in chunk.iter().zip(handles) {
                match handle.await {
                    Ok(result) => results.push(result),
                    Err(e) => results.push(RecipientResult {
                        recipient: lead.email.clone(),
                        success: false,
                        error: Some(format!("send task panicked: {}", e)),
                        send_time_ms: 0,
                    }),
                }
            }

            let summary = summarize_batch(batch_number, &results);
            sent_total += summary.batch.sent_in_batch;
            failed_total += summary.batch.failed_in_batch;

            debug!(
                campaign_id = %campaign_id,
                batch = batch_number,
                sent = summary.batch.sent_in_batch,
                failed = summary.batch.failed_in_batch,
                "Batch resolved"
            );

            // One consolidated write per batch; readers polling
            // mid-batch see the previous snapshot, never a partial
            // one. A miss here means the status guard failed, i.e.
            // the campaign was cancelled while the batch was in
            // flight.
            let progress = Campaign::compute_progress(sent_total, total);
            let still_sending = self
                .campaign_repo
                .record_batch_progress(
                    campaign_id,
                    sent_total,
                    failed_total,
                    progress,
                    &summary.batch,
                    &summary.errors,
                )
                .await?;

            if !still_sending {
                info!(
                    campaign_id = %campaign_id,
                    "Campaign cancelled while batch was in flight"
                );
                return Ok(());
            }

            if index + 1 < batch_count {
                sleep(Duration::from_millis(BATCH_DELAY_MS)).await;
            }
        }

        let duration_ms = (Utc::now() - started_at).num_milliseconds().max(0);
        let average_send_time_ms = if sent_total > 0 {
            duration_ms as f64 / sent_total as f64
        } else {
            0.0
        };

        match self
            .campaign_repo
            .complete(campaign_id, duration_ms, average_send_time_ms)
            .await?
        {
            Some(_) => info!(
                campaign_id = %campaign_id,
                sent = sent_total,
                failed = failed_total,
                duration_ms,
                "Campaign completed"
            ),
            None => info!(
                campaign_id = %campaign_id,
                "Campaign reached a terminal status before the completion write"
            ),
        }

        Ok(())
    }

    /// Deliver to one recipient. Every failure mode ends up as a
    /// result, never an error: a recipient that cannot be delivered
    /// to must not take the batch loop down with it.
    async fn send_to_lead(
        &self,
        lead: &Lead,
        content: &CampaignContent,
        origin_ip: &str,
    ) -> RecipientResult {
        if let Err(e) = self.sender.record_send(origin_ip).await {
            // Quota refusal mid-campaign fails this recipient only;
            // remaining batches keep going and hit the same refusal.
            return RecipientResult {
                recipient: lead.email.clone(),
                success: false,
                error: Some(e.to_string()),
                send_time_ms: 0,
            };
        }

        let mailer = match self.sender.mailer().await {
            Ok(mailer) => mailer,
            Err(e) => {
                return RecipientResult {
                    recipient: lead.email.clone(),
                    success: false,
                    error: Some(e.to_string()),
                    send_time_ms: 0,
                };
            }
        };

        let html = self.renderer.render(lead, content);
        let outcome = mailer.send(&lead.email, &content.title, &html).await;

        if outcome.success {
            if let Err(e) = self.sender.record_success(outcome.send_time_ms).await {
                warn!(error = %e, "Failed to persist send counters");
            }
            RecipientResult {
                recipient: lead.email.clone(),
                success: true,
                error: None,
                send_time_ms: outcome.send_time_ms,
            }
        } else {
            let error = outcome
                .error
                .clone()
                .unwrap_or_else(|| "unknown delivery error".to_string());
            if let Err(e) = self.sender.record_failure(&error).await {
                warn!(error = %e, "Failed to persist failure counters");
            }
            RecipientResult {
                recipient: lead.email.clone(),
                success: false,
                error: Some(error),
                send_time_ms: outcome.send_time_ms,
            }
        }
    }
}

/// Result of one recipient's delivery attempt
#[derive(Debug, Clone)]
struct RecipientResult {
    recipient: String,
    success: bool,
    error: Option<String>,
    send_time_ms: u64,
}

struct BatchSummary {
    batch: BatchLogEntry,
    errors: Vec<ErrorLogEntry>,
}

/// Fold a batch's recipient results into the log entry and error
/// entries that get persisted together
fn summarize_batch(batch_number: i32, results: &[RecipientResult]) -> BatchSummary {
    let mut sent = 0;
    let mut failed = 0;
    let mut total_time = 0u64;
    let mut errors = Vec::new();

    for result in results {
        if result.success {
            sent += 1;
        } else {
            failed += 1;
            let error = result
                .error
                .clone()
                .unwrap_or_else(|| "unknown delivery error".to_string());
            errors.push(ErrorLogEntry::new(result.recipient.clone(), error));
        }
        total_time += result.send_time_ms;
    }

    let average_batch_time_ms = if results.is_empty() {
        0.0
    } else {
        total_time as f64 / results.len() as f64
    };

    BatchSummary {
        batch: BatchLogEntry {
            batch_number,
            sent_in_batch: sent,
            failed_in_batch: failed,
            average_batch_time_ms,
        },
        errors,
    }
}

/// Completion estimate shown to the caller at acceptance: roughly one
/// second of sending plus the fixed pause per batch, rounded up to
/// whole minutes
fn estimate_minutes(total_recipients: usize) -> u64 {
    let batches = total_recipients.div_ceil(BATCH_SIZE) as u64;
    let seconds = batches * 3;
    seconds.div_ceil(60).max(1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn ok_result(recipient: &str, ms: u64) -> RecipientResult {
        RecipientResult {
            recipient: recipient.to_string(),
            success: true,
            error: None,
            send_time_ms: ms,
        }
    }

    fn failed_result(recipient: &str, error: &str, ms: u64) -> RecipientResult {
        RecipientResult {
            recipient: recipient.to_string(),
            success: false,
            error: Some(error.to_string()),
            send_time_ms: ms,
        }
    }

    #[test]
    fn test_batch_planning_splits_by_ten() {
        let recipients: Vec<u32> = (0..25).collect();
        let sizes: Vec<usize> = recipients.chunks(BATCH_SIZE).map(|c| c.len()).collect();
        assert_eq!(sizes, vec![10, 10, 5]);
    }

    #[test]
    fn test_summarize_batch_counts_and_mean() {
        let results = vec![
            ok_result("a@example.com", 100),
            failed_result("b@example.com", "mailbox full", 40),
            ok_result("c@example.com", 160),
        ];

        let summary = summarize_batch(2, &results);
        assert_eq!(summary.batch.batch_number, 2);
        assert_eq!(summary.batch.sent_in_batch, 2);
        assert_eq!(summary.batch.failed_in_batch, 1);
        assert_eq!(summary.batch.average_batch_time_ms, 100.0);

        assert_eq!(summary.errors.len(), 1);
        assert_eq!(summary.errors[0].recipient, "b@example.com");
        assert_eq!(summary.errors[0].error, "mailbox full");
    }

    #[test]
    fn test_summarize_empty_batch() {
        let summary = summarize_batch(1, &[]);
        assert_eq!(summary.batch.sent_in_batch, 0);
        assert_eq!(summary.batch.failed_in_batch, 0);
        assert_eq!(summary.batch.average_batch_time_ms, 0.0);
        assert!(summary.errors.is_empty());
    }

    #[test]
    fn test_estimate_minutes() {
        // 1 recipient: 1 batch, ~3s, still reported as a minute
        assert_eq!(estimate_minutes(1), 1);
        // 25 recipients: 3 batches, ~9s
        assert_eq!(estimate_minutes(25), 1);
        // 500 recipients: 50 batches, ~150s
        assert_eq!(estimate_minutes(500), 3);
        // 1200 recipients: 120 batches, ~360s
        assert_eq!(estimate_minutes(1200), 6);
    }
}
