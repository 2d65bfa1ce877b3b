//! Delivery channel - sends a single email and reports the outcome

use async_trait::async_trait;
use chrono::Utc;
use lettre::{
    message::{header::ContentType, Mailbox},
    transport::smtp::authentication::Credentials,
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};
use mailbatch_storage::models::SenderConfig;
use serde::Serialize;
use std::time::{Duration as StdDuration, Instant};
use tracing::debug;
use uuid::Uuid;

/// Outcome of a single delivery attempt. A failed attempt is data,
/// not an error: the caller decides what a failure means for the
/// campaign.
#[derive(Debug, Clone, Serialize)]
pub struct SendOutcome {
    pub success: bool,
    pub message_id: Option<String>,
    pub error: Option<String>,
    pub send_time_ms: u64,
}

impl SendOutcome {
    /// Successful delivery
    pub fn sent(message_id: String, send_time_ms: u64) -> Self {
        Self {
            success: true,
            message_id: Some(message_id),
            error: None,
            send_time_ms,
        }
    }

    /// Failed delivery
    pub fn failed(error: impl Into<String>, send_time_ms: u64) -> Self {
        Self {
            success: false,
            message_id: None,
            error: Some(error.into()),
            send_time_ms,
        }
    }
}

/// A channel that can deliver one email at a time
#[async_trait]
pub trait Mailer: Send + Sync {
    /// Deliver a single HTML email
    async fn send(&self, to: &str, subject: &str, html_body: &str) -> SendOutcome;
}

/// SMTP-backed mailer built from the active sender configuration
pub struct SmtpMailer {
    host: String,
    port: u16,
    from_address: String,
    from_name: Option<String>,
    password: String,
    use_tls: bool,
    use_starttls: bool,
}

impl SmtpMailer {
    /// Build a mailer from a sender configuration. The SMTP username
    /// is the from address, which is how consumer SMTP providers
    /// authenticate.
    pub fn from_config(config: &SenderConfig) -> Self {
        Self {
            host: config.smtp_host.clone(),
            port: config.smtp_port as u16,
            from_address: config.from_address.clone(),
            from_name: config.from_name.clone(),
            password: config.smtp_password.clone(),
            use_tls: config.use_tls,
            use_starttls: config.use_starttls,
        }
    }

    fn from_mailbox(&self) -> Result<Mailbox, String> {
        let from = match &self.from_name {
            Some(name) => format!("{} <{}>", name, self.from_address),
            None => self.from_address.clone(),
        };
        from.parse()
            .map_err(|e| format!("Invalid from address: {}", e))
    }

    fn transport(&self) -> Result<AsyncSmtpTransport<Tokio1Executor>, String> {
        let builder = if self.use_tls {
            AsyncSmtpTransport::<Tokio1Executor>::relay(&self.host)
                .map_err(|e| format!("Failed to create SMTP transport: {}", e))?
        } else if self.use_starttls {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&self.host)
                .map_err(|e| format!("Failed to create SMTP transport: {}", e))?
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&self.host)
        };

        Ok(builder
            .port(self.port)
            .credentials(Credentials::new(
                self.from_address.clone(),
                self.password.clone(),
            ))
            .timeout(Some(StdDuration::from_secs(30)))
            .build())
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send(&self, to: &str, subject: &str, html_body: &str) -> SendOutcome {
        let start = Instant::now();

        let from = match self.from_mailbox() {
            Ok(m) => m,
            Err(e) => return SendOutcome::failed(e, start.elapsed().as_millis() as u64),
        };

        let to_mailbox: Mailbox = match to.parse() {
            Ok(m) => m,
            Err(e) => {
                return SendOutcome::failed(
                    format!("Invalid to address: {}", e),
                    start.elapsed().as_millis() as u64,
                );
            }
        };

        let email = match Message::builder()
            .from(from)
            .to(to_mailbox)
            .subject(subject)
            .header(ContentType::TEXT_HTML)
            .body(html_body.to_string())
        {
            Ok(e) => e,
            Err(e) => {
                return SendOutcome::failed(
                    format!("Failed to build email: {}", e),
                    start.elapsed().as_millis() as u64,
                );
            }
        };

        let transport = match self.transport() {
            Ok(t) => t,
            Err(e) => return SendOutcome::failed(e, start.elapsed().as_millis() as u64),
        };

        let message_id = format!("<{}.{}@mailbatch>", Uuid::new_v4(), Utc::now().timestamp());

        match transport.send(email).await {
            Ok(response) => {
                debug!(to = %to, "Email sent: {:?}", response);
                SendOutcome::sent(message_id, start.elapsed().as_millis() as u64)
            }
            Err(e) => SendOutcome::failed(e.to_string(), start.elapsed().as_millis() as u64),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use pretty_assertions::assert_eq;

    fn test_config() -> SenderConfig {
        SenderConfig {
            id: Uuid::new_v4(),
            name: "primary".to_string(),
            from_address: "noreply@example.com".to_string(),
            from_name: Some("Example Team".to_string()),
            smtp_host: "smtp.example.com".to_string(),
            smtp_port: 465,
            smtp_password: "secret".to_string(),
            use_tls: true,
            use_starttls: false,
            daily_limit: 500,
            emails_sent_today: 0,
            last_reset_date: Utc::now().date_naive(),
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
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_outcome_constructors() {
        let ok = SendOutcome::sent("<id@mailbatch>".to_string(), 120);
        assert!(ok.success);
        assert_eq!(ok.message_id.as_deref(), Some("<id@mailbatch>"));
        assert_eq!(ok.error, None);
        assert_eq!(ok.send_time_ms, 120);

        let bad = SendOutcome::failed("connection refused", 45);
        assert!(!bad.success);
        assert_eq!(bad.message_id, None);
        assert_eq!(bad.error.as_deref(), Some("connection refused"));
    }

    struct ScriptedMailer {
        outcomes: std::sync::Mutex<Vec<SendOutcome>>,
    }

    #[async_trait]
    impl Mailer for ScriptedMailer {
        async fn send(&self, _to: &str, _subject: &str, _html_body: &str) -> SendOutcome {
            self.outcomes.lock().unwrap().remove(0)
        }
    }

    #[tokio::test]
    async fn test_scripted_mailer_outcomes() {
        let mailer: std::sync::Arc<dyn Mailer> = std::sync::Arc::new(ScriptedMailer {
            outcomes: std::sync::Mutex::new(vec![
                SendOutcome::sent("<a@mailbatch>".to_string(), 10),
                SendOutcome::failed("mailbox full", 20),
            ]),
        });

        let first = mailer.send("one@example.com", "Hello", "<p>Hi</p>").await;
        assert!(first.success);

        let second = mailer.send("two@example.com", "Hello", "<p>Hi</p>").await;
        assert!(!second.success);
        assert_eq!(second.error.as_deref(), Some("mailbox full"));
    }

    #[test]
    fn test_mailer_from_config() {
        let mailer = SmtpMailer::from_config(&test_config());
        assert_eq!(mailer.host, "smtp.example.com");
        assert_eq!(mailer.port, 465);
        assert!(mailer.use_tls);
        assert!(!mailer.use_starttls);

        let from = mailer.from_mailbox().unwrap();
        assert_eq!(from.email.to_string(), "noreply@example.com");
    }

    #[test]
    fn test_from_mailbox_without_display_name() {
        let mut config = test_config();
        config.from_name = None;
        let mailer = SmtpMailer::from_config(&config);
        assert!(mailer.from_mailbox().is_ok());

        config.from_address = "not an address".to_string();
        let broken = SmtpMailer::from_config(&config);
        assert!(broken.from_mailbox().is_err());
    }
}
