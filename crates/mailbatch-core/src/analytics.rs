//! Analytics - health classification, trends, recommendations
//!
//! Read-only summarization over the sender configuration and the
//! campaign history. Nothing in here mutates state.

use mailbatch_storage::models::{DailyCampaignStat, SenderConfig};
use serde::Serialize;

/// More consecutive failures than this flips health to degraded
pub const MAX_HEALTHY_CONSECUTIVE_FAILURES: i32 = 5;

/// A success rate below this flips health to degraded
pub const MIN_HEALTHY_SUCCESS_RATE: i32 = 80;

/// Remaining daily quota below this is worth flagging
pub const LOW_QUOTA_THRESHOLD: i32 = 100;

/// Recommendation thresholds
const RECOMMEND_SUCCESS_RATE: i32 = 90;
const RECOMMEND_CONSECUTIVE_FAILURES: i32 = 3;
const RECOMMEND_AVG_SEND_TIME_MS: f64 = 5000.0;

/// Overall health status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthStatus {
    Healthy,
    Degraded,
}

/// Health view over the active sender configuration
#[derive(Debug, Clone, Serialize)]
pub struct SystemHealth {
    pub status: HealthStatus,
    pub issues: Vec<String>,
    pub consecutive_failures: i32,
    pub success_rate: i32,
    pub remaining_today: i32,
    pub suspicious_activity_count: i32,
}

/// Classify the sending health of a configuration. Advisory issues
/// (low quota, suspicious activity) are listed even when the status
/// stays healthy.
pub fn classify_health(config: &SenderConfig) -> SystemHealth {
    let mut issues = Vec::new();
    let mut degraded = false;

    if config.consecutive_failures > MAX_HEALTHY_CONSECUTIVE_FAILURES {
        degraded = true;
        issues.push(format!(
            "{} consecutive delivery failures",
            config.consecutive_failures
        ));
    }

    if config.success_rate < MIN_HEALTHY_SUCCESS_RATE {
        degraded = true;
        issues.push(format!("success rate at {}%", config.success_rate));
    }

    let remaining = config.remaining_today();
    if remaining < LOW_QUOTA_THRESHOLD {
        issues.push(format!("only {} sends left in today's quota", remaining));
    }

    if config.suspicious_activity_count > 0 {
        issues.push(format!(
            "{} send attempts from unexpected IP addresses",
            config.suspicious_activity_count
        ));
    }

    SystemHealth {
        status: if degraded {
            HealthStatus::Degraded
        } else {
            HealthStatus::Healthy
        },
        issues,
        consecutive_failures: config.consecutive_failures,
        success_rate: config.success_rate,
        remaining_today: remaining,
        suspicious_activity_count: config.suspicious_activity_count,
    }
}

/// First-versus-last comparison of one metric over a window
#[derive(Debug, Clone, Serialize)]
pub struct TrendDelta {
    pub first: f64,
    pub last: f64,
    pub absolute: f64,
    pub percent: f64,
}

impl TrendDelta {
    fn between(first: f64, last: f64) -> Self {
        let absolute = last - first;
        // Percentage change is meaningless against a zero baseline
        let percent = if first == 0.0 {
            0.0
        } else {
            (absolute / first) * 100.0
        };
        Self {
            first,
            last,
            absolute,
            percent,
        }
    }

    fn flat() -> Self {
        Self::between(0.0, 0.0)
    }
}

/// Trend report over the daily campaign stats in a window
#[derive(Debug, Clone, Serialize)]
pub struct TrendReport {
    pub window_days: i64,
    pub data_points: usize,
    pub sent: TrendDelta,
    pub success_rate: TrendDelta,
    pub average_send_time_ms: TrendDelta,
}

/// Compare the first and last day in the window for sent count,
/// success rate, and average send time. Fewer than two data points
/// yields a flat report.
pub fn compute_trends(stats: &[DailyCampaignStat], window_days: i64) -> TrendReport {
    if stats.len() < 2 {
        return TrendReport {
            window_days,
            data_points: stats.len(),
            sent: TrendDelta::flat(),
            success_rate: TrendDelta::flat(),
            average_send_time_ms: TrendDelta::flat(),
        };
    }

    let first = &stats[0];
    let last = &stats[stats.len() - 1];

    TrendReport {
        window_days,
        data_points: stats.len(),
        sent: TrendDelta::between(first.sent as f64, last.sent as f64),
        success_rate: TrendDelta::between(day_success_rate(first), day_success_rate(last)),
        average_send_time_ms: TrendDelta::between(
            first.average_send_time_ms,
            last.average_send_time_ms,
        ),
    }
}

fn day_success_rate(stat: &DailyCampaignStat) -> f64 {
    let attempts = stat.sent + stat.failed;
    if attempts == 0 {
        0.0
    } else {
        (stat.sent as f64 / attempts as f64) * 100.0
    }
}

/// Recommendation severity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Info,
    Warning,
    Critical,
}

/// A single advisory
#[derive(Debug, Clone, Serialize)]
pub struct Recommendation {
    pub severity: Severity,
    pub category: String,
    pub message: String,
}

/// Map threshold breaches on the configuration to advisories. Purely
/// informational; callers decide what to do with them.
pub fn recommendations(config: &SenderConfig) -> Vec<Recommendation> {
    let mut out = Vec::new();

    if config.success_rate < RECOMMEND_SUCCESS_RATE {
        out.push(Recommendation {
            severity: Severity::Warning,
            category: "deliverability".to_string(),
            message: format!(
                "Success rate is {}%. Check the sender reputation and the error logs of recent campaigns.",
                config.success_rate
            ),
        });
    }

    let remaining = config.remaining_today();
    if remaining < LOW_QUOTA_THRESHOLD {
        out.push(Recommendation {
            severity: Severity::Warning,
            category: "quota".to_string(),
            message: format!(
                "Only {} sends remain in today's quota. Large campaigns will be refused until tomorrow.",
                remaining
            ),
        });
    }

    if config.consecutive_failures > RECOMMEND_CONSECUTIVE_FAILURES {
        out.push(Recommendation {
            severity: Severity::Critical,
            category: "reliability".to_string(),
            message: format!(
                "{} deliveries failed in a row. Verify the SMTP host and credentials.",
                config.consecutive_failures
            ),
        });
    }

    if config.average_send_time_ms > RECOMMEND_AVG_SEND_TIME_MS {
        out.push(Recommendation {
            severity: Severity::Info,
            category: "performance".to_string(),
            message: format!(
                "Average send time is {:.0} ms. The SMTP host may be throttling connections.",
                config.average_send_time_ms
            ),
        });
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, Utc};
    use pretty_assertions::assert_eq;

    fn test_config() -> SenderConfig {
        SenderConfig {
            id: uuid::Uuid::new_v4(),
            name: "primary".to_string(),
            from_address: "noreply@example.com".to_string(),
            from_name: None,
            smtp_host: "smtp.example.com".to_string(),
            smtp_port: 587,
            smtp_password: "secret".to_string(),
            use_tls: false,
            use_starttls: true,
            daily_limit: 500,
            emails_sent_today: 100,
            last_reset_date: Utc::now().date_naive(),
            monthly_emails_sent: 100,
            current_month: "2024-03".to_string(),
            total_emails_sent: 950,
            total_emails_failed: 50,
            success_rate: 95,
            average_send_time_ms: 250.0,
            consecutive_failures: 0,
            last_successful_send: Some(Utc::now()),
            last_error_message: None,
            last_error_at: None,
            error_count: 50,
            last_used_ip: None,
            suspicious_activity_count: 0,
            last_suspicious_activity: None,
            is_active: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn day(d: u32, sent: i64, failed: i64, avg: f64) -> DailyCampaignStat {
        DailyCampaignStat {
            day: NaiveDate::from_ymd_opt(2024, 3, d).unwrap(),
            sent,
            failed,
            average_send_time_ms: avg,
        }
    }

    #[test]
    fn test_healthy_config() {
        let health = classify_health(&test_config());
        assert_eq!(health.status, HealthStatus::Healthy);
        assert!(health.issues.is_empty());
    }

    #[test]
    fn test_consecutive_failures_boundary() {
        let mut config = test_config();

        config.consecutive_failures = 5;
        assert_eq!(classify_health(&config).status, HealthStatus::Healthy);

        config.consecutive_failures = 6;
        let health = classify_health(&config);
        assert_eq!(health.status, HealthStatus::Degraded);
        assert!(health.issues[0].contains("6 consecutive"));
    }

    #[test]
    fn test_success_rate_boundary() {
        let mut config = test_config();

        config.success_rate = 80;
        assert_eq!(classify_health(&config).status, HealthStatus::Healthy);

        config.success_rate = 79;
        assert_eq!(classify_health(&config).status, HealthStatus::Degraded);
    }

    #[test]
    fn test_advisory_issues_listed_while_healthy() {
        let mut config = test_config();
        config.emails_sent_today = 450;
        config.suspicious_activity_count = 2;

        let health = classify_health(&config);
        assert_eq!(health.status, HealthStatus::Healthy);
        assert_eq!(health.issues.len(), 2);
        assert!(health.issues[0].contains("50 sends left"));
        assert!(health.issues[1].contains("2 send attempts"));
    }

    #[test]
    fn test_trends_first_vs_last() {
        let stats = vec![
            day(1, 100, 0, 200.0),
            day(2, 140, 60, 300.0),
            day(3, 150, 50, 400.0),
        ];

        let report = compute_trends(&stats, 7);
        assert_eq!(report.data_points, 3);
        assert_eq!(report.sent.first, 100.0);
        assert_eq!(report.sent.last, 150.0);
        assert_eq!(report.sent.absolute, 50.0);
        assert_eq!(report.sent.percent, 50.0);

        // Day 1: 100% success; day 3: 75%
        assert_eq!(report.success_rate.first, 100.0);
        assert_eq!(report.success_rate.last, 75.0);
        assert_eq!(report.success_rate.absolute, -25.0);

        assert_eq!(report.average_send_time_ms.absolute, 200.0);
        assert_eq!(report.average_send_time_ms.percent, 100.0);
    }

    #[test]
    fn test_trends_zero_baseline_has_no_percent() {
        let stats = vec![day(1, 0, 0, 0.0), day(2, 50, 0, 100.0)];

        let report = compute_trends(&stats, 7);
        assert_eq!(report.sent.absolute, 50.0);
        assert_eq!(report.sent.percent, 0.0);
    }

    #[test]
    fn test_trends_need_two_points() {
        let report = compute_trends(&[day(1, 10, 0, 100.0)], 7);
        assert_eq!(report.data_points, 1);
        assert_eq!(report.sent.absolute, 0.0);

        let empty = compute_trends(&[], 30);
        assert_eq!(empty.data_points, 0);
        assert_eq!(empty.window_days, 30);
    }

    #[test]
    fn test_no_recommendations_when_all_is_well() {
        assert!(recommendations(&test_config()).is_empty());
    }

    #[test]
    fn test_recommendation_thresholds() {
        let mut config = test_config();
        config.success_rate = 85;
        config.emails_sent_today = 420;
        config.consecutive_failures = 4;
        config.average_send_time_ms = 6000.0;

        let recs = recommendations(&config);
        assert_eq!(recs.len(), 4);
        assert_eq!(recs[0].severity, Severity::Warning);
        assert_eq!(recs[0].category, "deliverability");
        assert_eq!(recs[1].category, "quota");
        assert_eq!(recs[2].severity, Severity::Critical);
        assert_eq!(recs[2].category, "reliability");
        assert_eq!(recs[3].severity, Severity::Info);
        assert_eq!(recs[3].category, "performance");
    }

    #[test]
    fn test_recommendation_boundaries_are_exclusive() {
        let mut config = test_config();
        config.success_rate = 90;
        config.emails_sent_today = 400;
        config.consecutive_failures = 3;
        config.average_send_time_ms = 5000.0;

        assert!(recommendations(&config).is_empty());
    }
}
