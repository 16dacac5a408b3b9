use crate::domain::error::DomainError;
use async_trait::async_trait;
use sqlx::PgPool;
use tracing::{error, info};
use uuid::Uuid;

#[async_trait]
pub trait FollowRepository: Send + Sync {
    /// Inserts the `(user, author)` edge unless it already exists.
    /// Returns `true` when a row was created.
    async fn create_if_absent(&self, user_id: Uuid, author_id: Uuid) -> Result<bool, DomainError>;
    /// Returns `true` when a row was removed.
    async fn delete(&self, user_id: Uuid, author_id: Uuid) -> Result<bool, DomainError>;
    async fn exists(&self, user_id: Uuid, author_id: Uuid) -> Result<bool, DomainError>;
    async fn count_followers(&self, author_id: Uuid) -> Result<u64, DomainError>;
    async fn count_following(&self, user_id: Uuid) -> Result<u64, DomainError>;
}

#[derive(Clone)]
pub struct PostgresFollowRepository {
    pool: PgPool,
}

impl PostgresFollowRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn count_where(&self, column: &str, id: Uuid) -> Result<u64, DomainError> {
        let count: i64 =
            sqlx::query_scalar(&format!("SELECT COUNT(*) FROM follows WHERE {column} = $1"))
                .bind(id)
                .fetch_one(&self.pool)
                .await
                .map_err(|e| {
                    error!("db error while counting follows by {}: {}", column, e);
                    DomainError::from(e)
                })?;
        Ok(count.max(0) as u64)
    }
}

#[async_trait]
impl FollowRepository for PostgresFollowRepository {
    async fn create_if_absent(&self, user_id: Uuid, author_id: Uuid) -> Result<bool, DomainError> {
        let inserted = sqlx::query(
            r#"
            INSERT INTO follows (user_id, author_id)
            VALUES ($1, $2)
            ON CONFLICT (user_id, author_id) DO NOTHING
            "#,
        )
        .bind(user_id)
        .bind(author_id)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            error!("failed to follow {} -> {}: {}", user_id, author_id, e);
            DomainError::from(e)
        })?;

        let created = inserted.rows_affected() > 0;
        if created {
            info!(user_id = %user_id, author_id = %author_id, "follow created");
        }
        Ok(created)
    }

    async fn delete(&self, user_id: Uuid, author_id: Uuid) -> Result<bool, DomainError> {
        let deleted = sqlx::query("DELETE FROM follows WHERE user_id = $1 AND author_id = $2")
            .bind(user_id)
            .bind(author_id)
            .execute(&self.pool)
            .await?;

        let removed = deleted.rows_affected() > 0;
        if removed {
            info!(user_id = %user_id, author_id = %author_id, "follow removed");
        }
        Ok(removed)
    }

    async fn exists(&self, user_id: Uuid, author_id: Uuid) -> Result<bool, DomainError> {
        sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM follows WHERE user_id = $1 AND author_id = $2)",
        )
        .bind(user_id)
        .bind(author_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            error!("db error while checking follow {} -> {}: {}", user_id, author_id, e);
            DomainError::from(e)
        })
    }

    async fn count_followers(&self, author_id: Uuid) -> Result<u64, DomainError> {
        self.count_where("author_id", author_id).await
    }

    async fn count_following(&self, user_id: Uuid) -> Result<u64, DomainError> {
        self.count_where("user_id", user_id).await
    }
}
