//! PostgreSQL implementation of the ad repository.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, QueryBuilder};
use std::sync::Arc;
use uuid::Uuid;

use crate::domain::click_event::ClickEvent;
use crate::domain::entities::{Ad, NewAd};
use crate::domain::repositories::{AdRepository, StoreError};

/// Rows per `INSERT` statement; keeps each statement well under the
/// PostgreSQL bind-parameter limit.
const INSERT_CHUNK_SIZE: usize = 500;

#[derive(sqlx::FromRow)]
struct AdRow {
    id: String,
    image_url: String,
    target_url: String,
    total_clicks: i64,
    created_at: DateTime<Utc>,
}

impl From<AdRow> for Ad {
    fn from(row: AdRow) -> Self {
        Ad::new(
            row.id,
            row.image_url,
            row.target_url,
            row.total_clicks,
            row.created_at,
        )
    }
}

/// PostgreSQL repository for ads and click rows.
///
/// Soft-deleted ads (`deleted_at IS NOT NULL`) are invisible to every query.
pub struct PgAdRepository {
    pool: Arc<PgPool>,
}

impl PgAdRepository {
    /// Creates a new repository with a database connection pool.
    pub fn new(pool: Arc<PgPool>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AdRepository for PgAdRepository {
    async fn exists_ad(&self, ad_id: &str) -> Result<bool, StoreError> {
        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS (SELECT 1 FROM ads WHERE id = $1 AND deleted_at IS NULL)",
        )
        .bind(ad_id)
        .fetch_one(self.pool.as_ref())
        .await?;

        Ok(exists)
    }

    async fn bulk_insert_clicks(&self, clicks: &[ClickEvent]) -> Result<(), StoreError> {
        if clicks.is_empty() {
            return Ok(());
        }

        let mut tx = self.pool.begin().await?;

        for chunk in clicks.chunks(INSERT_CHUNK_SIZE) {
            let mut builder: QueryBuilder<Postgres> =
                QueryBuilder::new("INSERT INTO clicks (id, ad_id, ip, playback_time, clicked_at) ");

            builder.push_values(chunk, |mut row, click| {
                row.push_bind(click.id.unwrap_or_else(Uuid::new_v4))
                    .push_bind(click.ad_id.as_str())
                    .push_bind(click.ip.as_str())
                    .push_bind(click.playback_time)
                    .push_bind(click.timestamp);
            });
            builder.push(" ON CONFLICT (id) DO NOTHING");

            builder.build().execute(&mut *tx).await?;
        }

        tx.commit().await?;

        Ok(())
    }

    async fn increment_ad_total(&self, ad_id: &str, delta: i64) -> Result<(), StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE ads
            SET total_clicks = total_clicks + $2, updated_at = NOW()
            WHERE id = $1 AND deleted_at IS NULL
            "#,
        )
        .bind(ad_id)
        .bind(delta)
        .execute(self.pool.as_ref())
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::AdNotFound(ad_id.to_string()));
        }

        Ok(())
    }

    async fn get_ad_total(&self, ad_id: &str) -> Result<i64, StoreError> {
        sqlx::query_scalar::<_, i64>(
            "SELECT total_clicks FROM ads WHERE id = $1 AND deleted_at IS NULL",
        )
        .bind(ad_id)
        .fetch_optional(self.pool.as_ref())
        .await?
        .ok_or_else(|| StoreError::AdNotFound(ad_id.to_string()))
    }

    async fn count_clicks_in_window(
        &self,
        ad_id: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<i64, StoreError> {
        let count = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(*)
            FROM clicks
            WHERE ad_id = $1 AND clicked_at >= $2 AND clicked_at <= $3
            "#,
        )
        .bind(ad_id)
        .bind(start)
        .bind(end)
        .fetch_one(self.pool.as_ref())
        .await?;

        Ok(count)
    }

    async fn list_ads(&self) -> Result<Vec<Ad>, StoreError> {
        let rows = sqlx::query_as::<_, AdRow>(
            r#"
            SELECT id, image_url, target_url, total_clicks, created_at
            FROM ads
            WHERE deleted_at IS NULL
            ORDER BY created_at DESC, id
            "#,
        )
        .fetch_all(self.pool.as_ref())
        .await?;

        Ok(rows.into_iter().map(Ad::from).collect())
    }

    async fn create_ad(&self, new_ad: NewAd) -> Result<Ad, StoreError> {
        let row = sqlx::query_as::<_, AdRow>(
            r#"
            INSERT INTO ads (id, image_url, target_url)
            VALUES ($1, $2, $3)
            RETURNING id, image_url, target_url, total_clicks, created_at
            "#,
        )
        .bind(&new_ad.id)
        .bind(&new_ad.image_url)
        .bind(&new_ad.target_url)
        .fetch_one(self.pool.as_ref())
        .await?;

        Ok(row.into())
    }

    async fn health_check(&self) -> bool {
        sqlx::query("SELECT 1")
            .execute(self.pool.as_ref())
            .await
            .is_ok()
    }
}
