//! Lead repository

use sqlx::PgPool;
use uuid::Uuid;

use crate::models::{CreateLead, Lead};

/// Lead repository
#[derive(Clone)]
pub struct LeadRepository {
    pool: PgPool,
}

impl LeadRepository {
    /// Create a new lead repository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create a new lead
    pub async fn create(&self, input: CreateLead) -> Result<Lead, sqlx::Error> {
        let id = Uuid::new_v4();

        sqlx::query_as::<_, Lead>(
            r#"
            INSERT INTO leads (id, name, email, phone, message)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(&input.name)
        .bind(&input.email)
        .bind(&input.phone)
        .bind(&input.message)
        .fetch_one(&self.pool)
        .await
    }

    /// Get a lead by ID
    pub async fn get(&self, id: Uuid) -> Result<Option<Lead>, sqlx::Error> {
        sqlx::query_as::<_, Lead>("SELECT * FROM leads WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
    }

    /// List leads
    pub async fn list(&self, limit: i64, offset: i64) -> Result<Vec<Lead>, sqlx::Error> {
        sqlx::query_as::<_, Lead>(
            r#"
            SELECT * FROM leads
            ORDER BY created_at DESC
            LIMIT $1 OFFSET $2
            "#,
        )
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await
    }

    /// Count leads
    pub async fn count(&self) -> Result<i64, sqlx::Error> {
        let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM leads")
            .fetch_one(&self.pool)
            .await?;
        Ok(count.0)
    }

    /// Every lead, oldest first. Campaign recipient selection starts
    /// from this and filters for deliverable addresses.
    pub async fn list_all(&self) -> Result<Vec<Lead>, sqlx::Error> {
        sqlx::query_as::<_, Lead>("SELECT * FROM leads ORDER BY created_at ASC")
            .fetch_all(&self.pool)
            .await
    }
}
