//! Sender configuration repository

use chrono::{Datelike, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::{CreateSenderConfig, SenderConfig, UpdateSenderConfig};

/// Sender configuration repository
#[derive(Clone)]
pub struct SenderConfigRepository {
    pool: PgPool,
}

impl SenderConfigRepository {
    /// Create a new sender configuration repository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create a new sender configuration. New configurations start
    /// inactive; activation is always an explicit call.
    pub async fn create(&self, input: CreateSenderConfig) -> Result<SenderConfig, sqlx::Error> {
        let id = Uuid::new_v4();
        let now = Utc::now();
        let current_month = format!("{:04}-{:02}", now.year(), now.month());

        sqlx::query_as::<_, SenderConfig>(
            r#"
            INSERT INTO sender_configs (
                id, name, from_address, from_name, smtp_host, smtp_port,
                smtp_password, use_tls, use_starttls, daily_limit,
                last_reset_date, current_month
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, CURRENT_DATE, $11)
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(&input.name)
        .bind(&input.from_address)
        .bind(&input.from_name)
        .bind(&input.smtp_host)
        .bind(input.smtp_port)
        .bind(&input.smtp_password)
        .bind(input.use_tls.unwrap_or(true))
        .bind(input.use_starttls.unwrap_or(false))
        .bind(input.daily_limit.unwrap_or(500))
        .bind(&current_month)
        .fetch_one(&self.pool)
        .await
    }

    /// Get a sender configuration by ID
    pub async fn get(&self, id: Uuid) -> Result<Option<SenderConfig>, sqlx::Error> {
        sqlx::query_as::<_, SenderConfig>("SELECT * FROM sender_configs WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
    }

    /// Get the active sender configuration, if one exists
    pub async fn get_active(&self) -> Result<Option<SenderConfig>, sqlx::Error> {
        sqlx::query_as::<_, SenderConfig>("SELECT * FROM sender_configs WHERE is_active")
            .fetch_optional(&self.pool)
            .await
    }

    /// List sender configurations
    pub async fn list(&self, limit: i64, offset: i64) -> Result<Vec<SenderConfig>, sqlx::Error> {
        sqlx::query_as::<_, SenderConfig>(
            r#"
            SELECT * FROM sender_configs
            ORDER BY created_at DESC
            LIMIT $1 OFFSET $2
            "#,
        )
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await
    }

    /// Count sender configurations
    pub async fn count(&self) -> Result<i64, sqlx::Error> {
        let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM sender_configs")
            .fetch_one(&self.pool)
            .await?;
        Ok(count.0)
    }

    /// Update identity fields of a sender configuration. Counter
    /// fields are owned by the send path and go through
    /// `save_counters` instead.
    pub async fn update(
        &self,
        id: Uuid,
        input: UpdateSenderConfig,
    ) -> Result<Option<SenderConfig>, sqlx::Error> {
        sqlx::query_as::<_, SenderConfig>(
            r#"
            UPDATE sender_configs SET
                name = COALESCE($2, name),
                from_address = COALESCE($3, from_address),
                from_name = COALESCE($4, from_name),
                smtp_host = COALESCE($5, smtp_host),
                smtp_port = COALESCE($6, smtp_port),
                smtp_password = COALESCE($7, smtp_password),
                use_tls = COALESCE($8, use_tls),
                use_starttls = COALESCE($9, use_starttls),
                daily_limit = COALESCE($10, daily_limit),
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(&input.name)
        .bind(&input.from_address)
        .bind(&input.from_name)
        .bind(&input.smtp_host)
        .bind(input.smtp_port)
        .bind(&input.smtp_password)
        .bind(input.use_tls)
        .bind(input.use_starttls)
        .bind(input.daily_limit)
        .fetch_optional(&self.pool)
        .await
    }

    /// Persist the counter fields of an in-memory configuration back
    /// to its row. Returns the stored row.
    pub async fn save_counters(
        &self,
        config: &SenderConfig,
    ) -> Result<SenderConfig, sqlx::Error> {
        sqlx::query_as::<_, SenderConfig>(
            r#"
            UPDATE sender_configs SET
                emails_sent_today = $2,
                last_reset_date = $3,
                monthly_emails_sent = $4,
                current_month = $5,
                total_emails_sent = $6,
                total_emails_failed = $7,
                success_rate = $8,
                average_send_time_ms = $9,
                consecutive_failures = $10,
                last_successful_send = $11,
                last_error_message = $12,
                last_error_at = $13,
                error_count = $14,
                last_used_ip = $15,
                suspicious_activity_count = $16,
                last_suspicious_activity = $17,
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(config.id)
        .bind(config.emails_sent_today)
        .bind(config.last_reset_date)
        .bind(config.monthly_emails_sent)
        .bind(&config.current_month)
        .bind(config.total_emails_sent)
        .bind(config.total_emails_failed)
        .bind(config.success_rate)
        .bind(config.average_send_time_ms)
        .bind(config.consecutive_failures)
        .bind(config.last_successful_send)
        .bind(&config.last_error_message)
        .bind(config.last_error_at)
        .bind(config.error_count)
        .bind(&config.last_used_ip)
        .bind(config.suspicious_activity_count)
        .bind(config.last_suspicious_activity)
        .fetch_one(&self.pool)
        .await
    }

    /// Activate a configuration, deactivating all others in the same
    /// transaction so at most one row is ever active.
    pub async fn activate(&self, id: Uuid) -> Result<Option<SenderConfig>, sqlx::Error> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("UPDATE sender_configs SET is_active = FALSE, updated_at = NOW() WHERE is_active")
            .execute(&mut *tx)
            .await?;

        let activated = sqlx::query_as::<_, SenderConfig>(
            r#"
            UPDATE sender_configs SET
                is_active = TRUE,
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?;

        // Unknown id: leave the previously active row untouched
        if activated.is_none() {
            tx.rollback().await?;
            return Ok(None);
        }

        tx.commit().await?;
        Ok(activated)
    }

    /// Delete a configuration. Refused while campaigns reference it.
    pub async fn delete(&self, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            r#"
            DELETE FROM sender_configs
            WHERE id = $1
              AND NOT EXISTS (SELECT 1 FROM campaigns WHERE sender_config_id = $1)
            "#,
        )
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }
}
