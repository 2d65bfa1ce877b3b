//! Campaign repository

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::{
    BatchLogEntry, Campaign, CampaignStatus, CreateCampaign, DailyCampaignStat, ErrorLogEntry,
};

/// Campaign repository
///
/// Every status-changing statement carries a `WHERE status = 'sending'`
/// guard, which is what makes the sending → terminal transition happen
/// exactly once even with the batch loop and a cancel request racing.
#[derive(Clone)]
pub struct CampaignRepository {
    pool: PgPool,
}

impl CampaignRepository {
    /// Create a new campaign repository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create a new campaign. Rows are born in `sending` with the
    /// start time stamped, because acceptance and the start of
    /// delivery are the same moment.
    pub async fn create(&self, input: CreateCampaign) -> Result<Campaign, sqlx::Error> {
        let id = Uuid::new_v4();

        sqlx::query_as::<_, Campaign>(
            r#"
            INSERT INTO campaigns (
                id, title, body, cta_text, cta_link, contact_email,
                contact_phone, total_recipients, status, started_at,
                sender_config_id
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, 'sending', NOW(), $9)
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(&input.title)
        .bind(&input.body)
        .bind(&input.cta_text)
        .bind(&input.cta_link)
        .bind(&input.contact_email)
        .bind(&input.contact_phone)
        .bind(input.total_recipients)
        .bind(input.sender_config_id)
        .fetch_one(&self.pool)
        .await
    }

    /// Get a campaign by ID
    pub async fn get(&self, id: Uuid) -> Result<Option<Campaign>, sqlx::Error> {
        sqlx::query_as::<_, Campaign>("SELECT * FROM campaigns WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
    }

    /// List campaigns
    pub async fn list(
        &self,
        status: Option<CampaignStatus>,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Campaign>, sqlx::Error> {
        if let Some(status) = status {
            sqlx::query_as::<_, Campaign>(
                r#"
                SELECT * FROM campaigns
                WHERE status = $1
                ORDER BY created_at DESC
                LIMIT $2 OFFSET $3
                "#,
            )
            .bind(status.to_string())
            .bind(limit)
            .bind(offset)
            .fetch_all(&self.pool)
            .await
        } else {
            sqlx::query_as::<_, Campaign>(
                r#"
                SELECT * FROM campaigns
                ORDER BY created_at DESC
                LIMIT $1 OFFSET $2
                "#,
            )
            .bind(limit)
            .bind(offset)
            .fetch_all(&self.pool)
            .await
        }
    }

    /// Count campaigns
    pub async fn count(&self, status: Option<CampaignStatus>) -> Result<i64, sqlx::Error> {
        let count: (i64,) = if let Some(status) = status {
            sqlx::query_as("SELECT COUNT(*) FROM campaigns WHERE status = $1")
                .bind(status.to_string())
                .fetch_one(&self.pool)
                .await?
        } else {
            sqlx::query_as("SELECT COUNT(*) FROM campaigns")
                .fetch_one(&self.pool)
                .await?
        };
        Ok(count.0)
    }

    /// Current status string of a campaign. The batch loop polls this
    /// before dispatching each batch.
    pub async fn status_of(&self, id: Uuid) -> Result<Option<String>, sqlx::Error> {
        let row: Option<(String,)> =
            sqlx::query_as("SELECT status FROM campaigns WHERE id = $1")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;
        Ok(row.map(|(status,)| status))
    }

    /// Apply one batch's results as a single write: counters, progress,
    /// a batch-log append, and any error-log appends together. Returns
    /// false when the row is no longer `sending`, which the batch loop
    /// treats as cancellation.
    pub async fn record_batch_progress(
        &self,
        id: Uuid,
        sent_count: i32,
        failed_count: i32,
        progress: i32,
        batch: &BatchLogEntry,
        errors: &[ErrorLogEntry],
    ) -> Result<bool, sqlx::Error> {
        let batch_json = serde_json::to_value(batch).unwrap_or_default();
        let errors_json = serde_json::to_value(errors).unwrap_or_default();

        let result = sqlx::query(
            r#"
            UPDATE campaigns SET
                sent_count = $2,
                failed_count = $3,
                progress = $4,
                batches = batches || $5::jsonb,
                errors = errors || $6::jsonb,
                updated_at = NOW()
            WHERE id = $1 AND status = 'sending'
            "#,
        )
        .bind(id)
        .bind(sent_count)
        .bind(failed_count)
        .bind(progress)
        .bind(&batch_json)
        .bind(&errors_json)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Close out a fully processed campaign
    pub async fn complete(
        &self,
        id: Uuid,
        duration_ms: i64,
        average_send_time_ms: f64,
    ) -> Result<Option<Campaign>, sqlx::Error> {
        sqlx::query_as::<_, Campaign>(
            r#"
            UPDATE campaigns SET
                status = 'completed',
                completed_at = NOW(),
                duration_ms = $2,
                average_send_time_ms = $3,
                updated_at = NOW()
            WHERE id = $1 AND status = 'sending'
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(duration_ms)
        .bind(average_send_time_ms)
        .fetch_optional(&self.pool)
        .await
    }

    /// Mark a campaign failed after the batch loop itself blew up,
    /// appending the system-level error entry
    pub async fn mark_failed(
        &self,
        id: Uuid,
        entry: &ErrorLogEntry,
    ) -> Result<Option<Campaign>, sqlx::Error> {
        let entry_json = serde_json::to_value(entry).unwrap_or_default();

        sqlx::query_as::<_, Campaign>(
            r#"
            UPDATE campaigns SET
                status = 'failed',
                completed_at = NOW(),
                errors = errors || $2::jsonb,
                updated_at = NOW()
            WHERE id = $1 AND status = 'sending'
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(&entry_json)
        .fetch_optional(&self.pool)
        .await
    }

    /// Recovery variant of `mark_failed` that also restores counters
    /// reconstructed from the batch log
    pub async fn fail_with_counts(
        &self,
        id: Uuid,
        sent_count: i32,
        failed_count: i32,
        progress: i32,
        entry: &ErrorLogEntry,
    ) -> Result<Option<Campaign>, sqlx::Error> {
        let entry_json = serde_json::to_value(entry).unwrap_or_default();

        sqlx::query_as::<_, Campaign>(
            r#"
            UPDATE campaigns SET
                status = 'failed',
                completed_at = NOW(),
                sent_count = $2,
                failed_count = $3,
                progress = $4,
                errors = errors || $5::jsonb,
                updated_at = NOW()
            WHERE id = $1 AND status = 'sending'
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(sent_count)
        .bind(failed_count)
        .bind(progress)
        .bind(&entry_json)
        .fetch_optional(&self.pool)
        .await
    }

    /// Cancel a campaign. Returns None when the campaign was not in
    /// `sending`, in which case nothing changed.
    pub async fn cancel(&self, id: Uuid) -> Result<Option<Campaign>, sqlx::Error> {
        sqlx::query_as::<_, Campaign>(
            r#"
            UPDATE campaigns SET
                status = 'cancelled',
                completed_at = NOW(),
                updated_at = NOW()
            WHERE id = $1 AND status = 'sending'
            RETURNING *
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
    }

    /// All campaigns still marked `sending`. At startup these are
    /// strays from a previous process.
    pub async fn list_sending(&self) -> Result<Vec<Campaign>, sqlx::Error> {
        sqlx::query_as::<_, Campaign>(
            "SELECT * FROM campaigns WHERE status = 'sending' ORDER BY started_at ASC",
        )
        .fetch_all(&self.pool)
        .await
    }

    /// Daily sent/failed totals since a cutoff, for trend reporting
    pub async fn daily_stats_since(
        &self,
        cutoff: DateTime<Utc>,
    ) -> Result<Vec<DailyCampaignStat>, sqlx::Error> {
        sqlx::query_as::<_, DailyCampaignStat>(
            r#"
            SELECT
                DATE(started_at) AS day,
                COALESCE(SUM(sent_count), 0)::BIGINT AS sent,
                COALESCE(SUM(failed_count), 0)::BIGINT AS failed,
                COALESCE(AVG(average_send_time_ms), 0)::DOUBLE PRECISION AS average_send_time_ms
            FROM campaigns
            WHERE started_at >= $1
            GROUP BY DATE(started_at)
            ORDER BY day ASC
            "#,
        )
        .bind(cutoff)
        .fetch_all(&self.pool)
        .await
    }
}
