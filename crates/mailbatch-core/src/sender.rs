//! Sender manager - owns the active sender configuration
//!
//! One manager per process. It caches the active configuration and the
//! mailer built from it, funnels every counter mutation through the
//! repository, and keeps process-scoped session statistics on the side.

use chrono::{DateTime, Utc};
use mailbatch_storage::models::SenderConfig;
use mailbatch_storage::repository::SenderConfigRepository;
use mailbatch_storage::DatabasePool;
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{info, warn};
use uuid::Uuid;

use crate::delivery::{Mailer, SendOutcome, SmtpMailer};

/// Sender manager errors
#[derive(Debug, thiserror::Error)]
pub enum SenderError {
    #[error("no active sender configuration")]
    ConfigurationMissing,

    #[error("daily send quota exceeded ({remaining} remaining, {requested} requested)")]
    QuotaExceeded { remaining: i32, requested: i32 },

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Statistics for the current process lifetime, independent of the
/// persisted lifetime counters. Lost on restart.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SessionStats {
    pub total_sends: u64,
    pub success_count: u64,
    pub error_count: u64,
    pub average_send_time_ms: f64,
}

impl SessionStats {
    pub fn record_success(&mut self, send_time_ms: u64) {
        self.total_sends += 1;
        self.success_count += 1;
        // Same asymmetric mean as the lifetime counters: failures
        // widen the denominator without contributing a sample.
        self.average_send_time_ms = (self.average_send_time_ms * (self.total_sends - 1) as f64
            + send_time_ms as f64)
            / self.total_sends as f64;
    }

    pub fn record_failure(&mut self) {
        self.total_sends += 1;
        self.error_count += 1;
    }
}

/// Lifetime + session snapshot returned by `stats()`
#[derive(Debug, Clone, Serialize)]
pub struct SenderStats {
    pub config_id: Uuid,
    pub config_name: String,
    pub from_address: String,
    pub total_emails_sent: i64,
    pub total_emails_failed: i64,
    pub success_rate: i32,
    pub average_send_time_ms: f64,
    pub emails_sent_today: i32,
    pub daily_limit: i32,
    pub remaining_today: i32,
    pub monthly_emails_sent: i32,
    pub consecutive_failures: i32,
    pub last_successful_send: Option<DateTime<Utc>>,
    pub session: SessionStats,
}

struct ManagerState {
    config: Option<SenderConfig>,
    mailer: Option<Arc<dyn Mailer>>,
}

/// Sender manager
pub struct SenderManager {
    repo: SenderConfigRepository,
    state: RwLock<ManagerState>,
    session: RwLock<SessionStats>,
}

impl SenderManager {
    /// Create a new sender manager
    pub fn new(db_pool: DatabasePool) -> Self {
        Self {
            repo: SenderConfigRepository::new(db_pool.pool().clone()),
            state: RwLock::new(ManagerState {
                config: None,
                mailer: None,
            }),
            session: RwLock::new(SessionStats::default()),
        }
    }

    /// The active sender configuration, loading and caching it on
    /// first use
    pub async fn active_config(&self) -> Result<SenderConfig, SenderError> {
        {
            let state = self.state.read().await;
            if let Some(config) = &state.config {
                return Ok(config.clone());
            }
        }

        self.reload().await
    }

    /// The mailer for the active configuration, built lazily and
    /// reused until `reinitialize`
    pub async fn mailer(&self) -> Result<Arc<dyn Mailer>, SenderError> {
        {
            let state = self.state.read().await;
            if let Some(mailer) = &state.mailer {
                return Ok(mailer.clone());
            }
        }

        let config = self.active_config().await?;
        let mailer: Arc<dyn Mailer> = Arc::new(SmtpMailer::from_config(&config));

        let mut state = self.state.write().await;
        state.mailer = Some(mailer.clone());
        Ok(mailer)
    }

    /// Drop the cached configuration and mailer and load fresh from
    /// the database. Called after any configuration mutation.
    pub async fn reinitialize(&self) -> Result<SenderConfig, SenderError> {
        {
            let mut state = self.state.write().await;
            state.config = None;
            state.mailer = None;
        }

        let config = self.reload().await?;
        info!(config_id = %config.id, from = %config.from_address, "Sender manager reinitialized");
        Ok(config)
    }

    /// Record a send attempt before delivery: run the counter reset
    /// check, note the origin IP, then gate on the daily quota. The
    /// attempt itself consumes no quota; only `record_success` does.
    pub async fn record_send(&self, origin_ip: &str) -> Result<(), SenderError> {
        let mut config = self.active_config().await?;
        let now = Utc::now();

        let mut dirty = config.reset_counters_if_needed(now);

        let previous_ip = config.last_used_ip.clone();
        if config.note_origin_ip(origin_ip, now) {
            warn!(
                config_id = %config.id,
                previous = previous_ip.as_deref().unwrap_or("-"),
                current = %origin_ip,
                count = config.suspicious_activity_count,
                "Send attempt from a different origin IP"
            );
        }
        if previous_ip.as_deref() != Some(origin_ip) {
            dirty = true;
        }

        // Persist the IP bookkeeping and any reset even when refusing
        // the send.
        if config.emails_sent_today >= config.daily_limit {
            let remaining = config.remaining_today();
            if dirty {
                let saved = self.repo.save_counters(&config).await?;
                self.cache_config(saved).await;
            }
            return Err(SenderError::QuotaExceeded {
                remaining,
                requested: 1,
            });
        }

        if dirty {
            let saved = self.repo.save_counters(&config).await?;
            self.cache_config(saved).await;
        }
        Ok(())
    }

    /// Record a successful delivery
    pub async fn record_success(&self, send_time_ms: u64) -> Result<(), SenderError> {
        let mut config = self.active_config().await?;
        config.record_success(send_time_ms, Utc::now());

        let saved = self.repo.save_counters(&config).await?;
        self.cache_config(saved).await;

        self.session.write().await.record_success(send_time_ms);
        Ok(())
    }

    /// Record a failed delivery
    pub async fn record_failure(&self, message: &str) -> Result<(), SenderError> {
        let mut config = self.active_config().await?;
        config.record_failure(message, Utc::now());

        let saved = self.repo.save_counters(&config).await?;
        self.cache_config(saved).await;

        self.session.write().await.record_failure();
        Ok(())
    }

    /// Run the daily/monthly counter reset check and persist when a
    /// rollover happened. Returns whether it did.
    pub async fn run_reset_check(&self) -> Result<bool, SenderError> {
        let mut config = self.active_config().await?;

        if config.reset_counters_if_needed(Utc::now()) {
            info!(
                config_id = %config.id,
                date = %config.last_reset_date,
                month = %config.current_month,
                "Send counters rolled over"
            );
            let saved = self.repo.save_counters(&config).await?;
            self.cache_config(saved).await;
            return Ok(true);
        }

        Ok(false)
    }

    /// Lifetime and session statistics for the active configuration
    pub async fn stats(&self) -> Result<SenderStats, SenderError> {
        let config = self.active_config().await?;
        let session = self.session.read().await.clone();

        Ok(SenderStats {
            config_id: config.id,
            config_name: config.name.clone(),
            from_address: config.from_address.clone(),
            total_emails_sent: config.total_emails_sent,
            total_emails_failed: config.total_emails_failed,
            success_rate: config.success_rate,
            average_send_time_ms: config.average_send_time_ms,
            emails_sent_today: config.emails_sent_today,
            daily_limit: config.daily_limit,
            remaining_today: config.remaining_today(),
            monthly_emails_sent: config.monthly_emails_sent,
            consecutive_failures: config.consecutive_failures,
            last_successful_send: config.last_successful_send,
            session,
        })
    }

    /// Send a single test email through the active configuration,
    /// recorded against the counters like any other send
    pub async fn send_test_email(
        &self,
        to: &str,
        origin_ip: &str,
    ) -> Result<SendOutcome, SenderError> {
        self.record_send(origin_ip).await?;

        let config = self.active_config().await?;
        let mailer = self.mailer().await?;

        let subject = format!("Test email from {}", config.name);
        let html = format!(
            "<html><body><p>This is a test email confirming that the \
             sender configuration <strong>{}</strong> ({}) can deliver \
             mail.</p></body></html>",
            config.name, config.from_address
        );

        let outcome = mailer.send(to, &subject, &html).await;

        if outcome.success {
            self.record_success(outcome.send_time_ms).await?;
        } else {
            let error = outcome
                .error
                .clone()
                .unwrap_or_else(|| "unknown delivery error".to_string());
            self.record_failure(&error).await?;
        }

        Ok(outcome)
    }

    async fn reload(&self) -> Result<SenderConfig, SenderError> {
        let mut config = self
            .repo
            .get_active()
            .await?
            .ok_or(SenderError::ConfigurationMissing)?;

        if config.reset_counters_if_needed(Utc::now()) {
            config = self.repo.save_counters(&config).await?;
        }

        let mut state = self.state.write().await;
        state.config = Some(config.clone());
        state.mailer = None;
        Ok(config)
    }

    /// Replace the cached configuration without touching the mailer;
    /// counter changes never alter transport identity.
    async fn cache_config(&self, config: SenderConfig) {
        let mut state = self.state.write().await;
        state.config = Some(config);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_session_stats_success() {
        let mut stats = SessionStats::default();
        stats.record_success(100);

        assert_eq!(stats.total_sends, 1);
        assert_eq!(stats.success_count, 1);
        assert_eq!(stats.error_count, 0);
        assert_eq!(stats.average_send_time_ms, 100.0);
    }

    #[test]
    fn test_session_stats_failure_widens_denominator() {
        let mut stats = SessionStats::default();
        stats.record_success(100);
        stats.record_failure();

        // Failure leaves the mean but counts as an attempt
        assert_eq!(stats.average_send_time_ms, 100.0);
        assert_eq!(stats.total_sends, 2);

        stats.record_success(400);
        assert_eq!(stats.total_sends, 3);
        assert_eq!(stats.average_send_time_ms, (100.0 * 2.0 + 400.0) / 3.0);
    }

    #[test]
    fn test_session_stats_failures_only() {
        let mut stats = SessionStats::default();
        stats.record_failure();
        stats.record_failure();

        assert_eq!(stats.total_sends, 2);
        assert_eq!(stats.error_count, 2);
        assert_eq!(stats.average_send_time_ms, 0.0);
    }
}
