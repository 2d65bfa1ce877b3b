//! Database models

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use mailbatch_common::types::{CampaignId, LeadId, SenderConfigId};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Sender configuration model
///
/// Exactly one row is active at a time. Every send attempt mutates the
/// counters on this row, so most fields here are bookkeeping rather
/// than identity.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct SenderConfig {
    pub id: SenderConfigId,
    pub name: String,
    pub from_address: String,
    pub from_name: Option<String>,
    pub smtp_host: String,
    pub smtp_port: i32,
    pub smtp_password: String,
    pub use_tls: bool,
    pub use_starttls: bool,
    pub daily_limit: i32,
    pub emails_sent_today: i32,
    pub last_reset_date: NaiveDate,
    pub monthly_emails_sent: i32,
    /// Month the monthly counter belongs to, formatted "YYYY-MM"
    pub current_month: String,
    pub total_emails_sent: i64,
    pub total_emails_failed: i64,
    pub success_rate: i32,
    pub average_send_time_ms: f64,
    pub consecutive_failures: i32,
    pub last_successful_send: Option<DateTime<Utc>>,
    pub last_error_message: Option<String>,
    pub last_error_at: Option<DateTime<Utc>>,
    pub error_count: i32,
    pub last_used_ip: Option<String>,
    pub suspicious_activity_count: i32,
    pub last_suspicious_activity: Option<DateTime<Utc>>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl SenderConfig {
    /// Zero the daily counter when the date has rolled over, and the
    /// monthly counter when the month has. Returns whether anything
    /// changed so callers know to persist. Idempotent within the same
    /// day and month.
    pub fn reset_counters_if_needed(&mut self, now: DateTime<Utc>) -> bool {
        let mut changed = false;

        let today = now.date_naive();
        if self.last_reset_date < today {
            self.emails_sent_today = 0;
            self.last_reset_date = today;
            changed = true;
        }

        let month = format!("{:04}-{:02}", now.year(), now.month());
        if self.current_month != month {
            self.monthly_emails_sent = 0;
            self.current_month = month;
            changed = true;
        }

        changed
    }

    /// Emails still sendable today under the daily limit
    pub fn remaining_today(&self) -> i32 {
        (self.daily_limit - self.emails_sent_today).max(0)
    }

    /// Record the origin IP of a send attempt. An IP that differs from
    /// the previously recorded one bumps the suspicious-activity
    /// counter; the signal is advisory and never blocks the send.
    /// Returns whether the attempt was flagged.
    pub fn note_origin_ip(&mut self, ip: &str, now: DateTime<Utc>) -> bool {
        let suspicious = matches!(&self.last_used_ip, Some(prev) if prev != ip);

        if suspicious {
            self.suspicious_activity_count += 1;
            self.last_suspicious_activity = Some(now);
        }

        self.last_used_ip = Some(ip.to_string());
        suspicious
    }

    /// Record a successful send: lifetime, daily, and monthly counters
    /// all advance, the consecutive-failure streak resets, and the
    /// send time folds into the running mean over all attempts.
    pub fn record_success(&mut self, send_time_ms: u64, now: DateTime<Utc>) {
        self.total_emails_sent += 1;
        self.emails_sent_today += 1;
        self.monthly_emails_sent += 1;
        self.last_successful_send = Some(now);
        self.consecutive_failures = 0;

        // The mean is taken over every attempt (sent + failed) even
        // though only successes contribute a sample. Failed attempts
        // widen the denominator on the next success.
        let attempts = (self.total_emails_sent + self.total_emails_failed) as f64;
        self.average_send_time_ms =
            (self.average_send_time_ms * (attempts - 1.0) + send_time_ms as f64) / attempts;

        self.recompute_success_rate();
    }

    /// Record a failed send. Daily and monthly counters are untouched,
    /// as is the average send time.
    pub fn record_failure(&mut self, message: &str, now: DateTime<Utc>) {
        self.total_emails_failed += 1;
        self.error_count += 1;
        self.consecutive_failures += 1;
        self.last_error_message = Some(message.to_string());
        self.last_error_at = Some(now);

        self.recompute_success_rate();
    }

    fn recompute_success_rate(&mut self) {
        let denominator = self.total_emails_sent + self.total_emails_failed;
        self.success_rate = if denominator == 0 {
            0
        } else {
            ((self.total_emails_sent as f64 / denominator as f64) * 100.0).round() as i32
        };
    }
}

/// Create sender configuration input
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateSenderConfig {
    pub name: String,
    pub from_address: String,
    pub from_name: Option<String>,
    pub smtp_host: String,
    pub smtp_port: i32,
    pub smtp_password: String,
    pub use_tls: Option<bool>,
    pub use_starttls: Option<bool>,
    pub daily_limit: Option<i32>,
}

/// Update sender configuration input (identity fields only; counters
/// are owned by the send path)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateSenderConfig {
    pub name: Option<String>,
    pub from_address: Option<String>,
    pub from_name: Option<String>,
    pub smtp_host: Option<String>,
    pub smtp_port: Option<i32>,
    pub smtp_password: Option<String>,
    pub use_tls: Option<bool>,
    pub use_starttls: Option<bool>,
    pub daily_limit: Option<i32>,
}

/// Campaign status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CampaignStatus {
    Sending,
    Completed,
    Failed,
    Cancelled,
}

impl CampaignStatus {
    /// Terminal statuses never change again
    pub fn is_terminal(&self) -> bool {
        !matches!(self, CampaignStatus::Sending)
    }
}

impl std::fmt::Display for CampaignStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CampaignStatus::Sending => write!(f, "sending"),
            CampaignStatus::Completed => write!(f, "completed"),
            CampaignStatus::Failed => write!(f, "failed"),
            CampaignStatus::Cancelled => write!(f, "cancelled"),
        }
    }
}

impl std::str::FromStr for CampaignStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "sending" => Ok(CampaignStatus::Sending),
            "completed" => Ok(CampaignStatus::Completed),
            "failed" => Ok(CampaignStatus::Failed),
            "cancelled" => Ok(CampaignStatus::Cancelled),
            _ => Err(format!("Invalid campaign status: {}", s)),
        }
    }
}

/// Per-recipient error log entry, appended to `Campaign.errors`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorLogEntry {
    pub recipient: String,
    pub error: String,
    pub timestamp: DateTime<Utc>,
}

impl ErrorLogEntry {
    pub fn new(recipient: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            recipient: recipient.into(),
            error: error.into(),
            timestamp: Utc::now(),
        }
    }

    /// Entry for a failure of the batch loop itself rather than of a
    /// single recipient
    pub fn system(error: impl Into<String>) -> Self {
        Self::new("system", error)
    }
}

/// Per-batch performance log entry, appended to `Campaign.batches`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchLogEntry {
    pub batch_number: i32,
    pub sent_in_batch: i32,
    pub failed_in_batch: i32,
    pub average_batch_time_ms: f64,
}

/// Campaign model
///
/// One row per bulk-send invocation. Content fields are immutable once
/// created; progress fields are written once per batch while the
/// status is `sending`.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Campaign {
    pub id: CampaignId,
    pub title: String,
    pub body: String,
    pub cta_text: Option<String>,
    pub cta_link: Option<String>,
    pub contact_email: Option<String>,
    pub contact_phone: Option<String>,
    pub total_recipients: i32,
    pub sent_count: i32,
    pub failed_count: i32,
    pub progress: i32,
    pub status: String,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub duration_ms: Option<i64>,
    pub average_send_time_ms: Option<f64>,
    pub errors: serde_json::Value,
    pub batches: serde_json::Value,
    pub sender_config_id: SenderConfigId,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Campaign {
    /// Get status enum
    pub fn status_enum(&self) -> Option<CampaignStatus> {
        self.status.parse().ok()
    }

    /// Parse the error log
    pub fn error_entries(&self) -> Vec<ErrorLogEntry> {
        serde_json::from_value(self.errors.clone()).unwrap_or_default()
    }

    /// Parse the batch performance log
    pub fn batch_entries(&self) -> Vec<BatchLogEntry> {
        serde_json::from_value(self.batches.clone()).unwrap_or_default()
    }

    /// Progress percentage from a sent count. Failures do not advance
    /// progress; a fully processed campaign with failures lands below
    /// 100.
    pub fn compute_progress(sent_count: i32, total_recipients: i32) -> i32 {
        if total_recipients == 0 {
            0
        } else {
            ((sent_count as f64 / total_recipients as f64) * 100.0).round() as i32
        }
    }
}

/// Create campaign input
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateCampaign {
    pub title: String,
    pub body: String,
    pub cta_text: Option<String>,
    pub cta_link: Option<String>,
    pub contact_email: Option<String>,
    pub contact_phone: Option<String>,
    pub total_recipients: i32,
    pub sender_config_id: SenderConfigId,
}

/// Lead model - a student inquiry captured through the website
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Lead {
    pub id: LeadId,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub message: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Lead {
    /// Whether this lead can be addressed by a campaign
    pub fn has_deliverable_email(&self) -> bool {
        mailbatch_common::types::is_deliverable_address(&self.email)
    }
}

/// Create lead input
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateLead {
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub message: Option<String>,
}

/// One day of campaign activity, aggregated for trend reporting
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct DailyCampaignStat {
    pub day: NaiveDate,
    pub sent: i64,
    pub failed: i64,
    pub average_send_time_ms: f64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;

    fn test_config() -> SenderConfig {
        let now = Utc.with_ymd_and_hms(2024, 3, 15, 12, 0, 0).unwrap();
        SenderConfig {
            id: uuid::Uuid::new_v4(),
            name: "primary".to_string(),
            from_address: "noreply@example.com".to_string(),
            from_name: Some("Example".to_string()),
            smtp_host: "smtp.example.com".to_string(),
            smtp_port: 587,
            smtp_password: "secret".to_string(),
            use_tls: false,
            use_starttls: true,
            daily_limit: 500,
            emails_sent_today: 0,
            last_reset_date: now.date_naive(),
            monthly_emails_sent: 0,
            current_month: "2024-03".to_string(),
            total_emails_sent: 0,
            total_emails_failed: 0,
            success_rate: 0,
            average_send_time_ms: 0.0,
            consecutive_failures: 0,
            last_successful_send: None,
            last_error_message: None,
            last_error_at: None,
            error_count: 0,
            last_used_ip: None,
            suspicious_activity_count: 0,
            last_suspicious_activity: None,
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_daily_reset_rolls_counter() {
        let mut config = test_config();
        config.emails_sent_today = 450;
        config.last_reset_date = NaiveDate::from_ymd_opt(2024, 3, 14).unwrap();

        let now = Utc.with_ymd_and_hms(2024, 3, 15, 8, 0, 0).unwrap();
        assert!(config.reset_counters_if_needed(now));
        assert_eq!(config.emails_sent_today, 0);
        assert_eq!(config.last_reset_date, now.date_naive());

        // Same day again: nothing to do
        assert!(!config.reset_counters_if_needed(now));
        assert_eq!(config.emails_sent_today, 0);
    }

    #[test]
    fn test_monthly_reset_rolls_counter() {
        let mut config = test_config();
        config.monthly_emails_sent = 1200;
        config.current_month = "2024-02".to_string();

        let now = Utc.with_ymd_and_hms(2024, 3, 1, 0, 30, 0).unwrap();
        assert!(config.reset_counters_if_needed(now));
        assert_eq!(config.monthly_emails_sent, 0);
        assert_eq!(config.current_month, "2024-03");
    }

    #[test]
    fn test_remaining_today() {
        let mut config = test_config();
        config.emails_sent_today = 495;
        assert_eq!(config.remaining_today(), 5);

        config.emails_sent_today = 500;
        assert_eq!(config.remaining_today(), 0);

        // Limit lowered below what was already sent
        config.daily_limit = 400;
        assert_eq!(config.remaining_today(), 0);
    }

    #[test]
    fn test_origin_ip_tracking() {
        let mut config = test_config();
        let now = Utc::now();

        // First IP ever seen is not suspicious
        assert!(!config.note_origin_ip("10.0.0.1", now));
        assert_eq!(config.suspicious_activity_count, 0);
        assert_eq!(config.last_used_ip.as_deref(), Some("10.0.0.1"));

        // Same IP again: still fine
        assert!(!config.note_origin_ip("10.0.0.1", now));
        assert_eq!(config.suspicious_activity_count, 0);

        // Different IP: flagged, and the new IP is remembered
        assert!(config.note_origin_ip("10.0.0.2", now));
        assert_eq!(config.suspicious_activity_count, 1);
        assert_eq!(config.last_used_ip.as_deref(), Some("10.0.0.2"));
        assert!(config.last_suspicious_activity.is_some());
    }

    #[test]
    fn test_record_success_counters() {
        let mut config = test_config();
        let now = Utc::now();

        config.record_success(120, now);

        assert_eq!(config.total_emails_sent, 1);
        assert_eq!(config.emails_sent_today, 1);
        assert_eq!(config.monthly_emails_sent, 1);
        assert_eq!(config.consecutive_failures, 0);
        assert_eq!(config.success_rate, 100);
        assert_eq!(config.average_send_time_ms, 120.0);
        assert_eq!(config.last_successful_send, Some(now));
    }

    #[test]
    fn test_record_failure_counters() {
        let mut config = test_config();
        let now = Utc::now();

        config.record_failure("connection refused", now);

        assert_eq!(config.total_emails_failed, 1);
        assert_eq!(config.error_count, 1);
        assert_eq!(config.consecutive_failures, 1);
        assert_eq!(config.success_rate, 0);
        assert_eq!(config.last_error_message.as_deref(), Some("connection refused"));
        // Failures never move the daily/monthly counters or the mean
        assert_eq!(config.emails_sent_today, 0);
        assert_eq!(config.monthly_emails_sent, 0);
        assert_eq!(config.average_send_time_ms, 0.0);
    }

    #[test]
    fn test_success_resets_failure_streak() {
        let mut config = test_config();
        let now = Utc::now();

        config.record_failure("timeout", now);
        config.record_failure("timeout", now);
        assert_eq!(config.consecutive_failures, 2);

        config.record_success(90, now);
        assert_eq!(config.consecutive_failures, 0);
    }

    #[test]
    fn test_average_spans_all_attempts() {
        let mut config = test_config();
        let now = Utc::now();

        config.record_success(100, now);
        assert_eq!(config.average_send_time_ms, 100.0);

        // The failure leaves the mean alone but counts as an attempt
        config.record_failure("bounced", now);
        assert_eq!(config.average_send_time_ms, 100.0);
        assert_eq!(config.success_rate, 50);

        // Next success divides by three attempts, not two
        config.record_success(200, now);
        assert_eq!(config.average_send_time_ms, (100.0 * 2.0 + 200.0) / 3.0);
        assert_eq!(config.success_rate, 67);
    }

    #[test]
    fn test_campaign_status_round_trip() {
        for status in [
            CampaignStatus::Sending,
            CampaignStatus::Completed,
            CampaignStatus::Failed,
            CampaignStatus::Cancelled,
        ] {
            let parsed: CampaignStatus = status.to_string().parse().unwrap();
            assert_eq!(parsed, status);
        }
        assert!("paused".parse::<CampaignStatus>().is_err());
        assert!(!CampaignStatus::Sending.is_terminal());
        assert!(CampaignStatus::Cancelled.is_terminal());
    }

    #[test]
    fn test_compute_progress() {
        assert_eq!(Campaign::compute_progress(0, 0), 0);
        assert_eq!(Campaign::compute_progress(0, 25), 0);
        assert_eq!(Campaign::compute_progress(10, 25), 40);
        assert_eq!(Campaign::compute_progress(25, 25), 100);
        assert_eq!(Campaign::compute_progress(1, 3), 33);
    }

    #[test]
    fn test_log_parsing_preserves_order() {
        let entries = vec![
            ErrorLogEntry::new("a@example.com", "hard bounce"),
            ErrorLogEntry::system("loop aborted"),
        ];
        let json = serde_json::to_value(&entries).unwrap();

        let campaign = Campaign {
            id: uuid::Uuid::new_v4(),
            title: "t".to_string(),
            body: "b".to_string(),
            cta_text: None,
            cta_link: None,
            contact_email: None,
            contact_phone: None,
            total_recipients: 2,
            sent_count: 0,
            failed_count: 2,
            progress: 0,
            status: "failed".to_string(),
            started_at: Utc::now(),
            completed_at: None,
            duration_ms: None,
            average_send_time_ms: None,
            errors: json,
            batches: serde_json::json!([]),
            sender_config_id: uuid::Uuid::new_v4(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };

        let parsed = campaign.error_entries();
        assert_eq!(parsed.len(), 2);
        assert_eq!(parsed[0].recipient, "a@example.com");
        assert_eq!(parsed[1].recipient, "system");
        assert!(campaign.batch_entries().is_empty());
    }

    #[test]
    fn test_lead_deliverable_email() {
        let lead = Lead {
            id: uuid::Uuid::new_v4(),
            name: "Ada".to_string(),
            email: "ada@example.com".to_string(),
            phone: None,
            message: None,
            created_at: Utc::now(),
        };
        assert!(lead.has_deliverable_email());

        let bad = Lead {
            email: "not-an-address".to_string(),
            ..lead
        };
        assert!(!bad.has_deliverable_email());
    }
}
