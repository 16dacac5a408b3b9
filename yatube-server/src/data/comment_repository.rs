use crate::domain::comment::{Comment, CommentEntry, NewComment};
use crate::domain::error::DomainError;
use async_trait::async_trait;
use sqlx::PgPool;
use tracing::{error, info};

#[async_trait]
pub trait CommentRepository: Send + Sync {
    async fn create(&self, comment: NewComment) -> Result<Comment, DomainError>;
    /// Comments of a post in insertion order.
    async fn list_for_post(&self, post_id: i64) -> Result<Vec<CommentEntry>, DomainError>;
}

#[derive(Clone)]
pub struct PostgresCommentRepository {
    pool: PgPool,
}

impl PostgresCommentRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CommentRepository for PostgresCommentRepository {
    async fn create(&self, comment: NewComment) -> Result<Comment, DomainError> {
        let comment = sqlx::query_as::<_, Comment>(
            r#"
            INSERT INTO comments (post_id, author_id, text)
            VALUES ($1, $2, $3)
            RETURNING id, post_id, author_id, text, created
            "#,
        )
        .bind(comment.post_id)
        .bind(comment.author_id)
        .bind(&comment.text)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            error!("failed to create comment on post {}: {}", comment.post_id, e);
            DomainError::from(e)
        })?;

        info!(comment_id = comment.id, post_id = comment.post_id, "comment created");
        Ok(comment)
    }

    async fn list_for_post(&self, post_id: i64) -> Result<Vec<CommentEntry>, DomainError> {
        sqlx::query_as::<_, CommentEntry>(
            r#"
            SELECT c.id, c.post_id, c.author_id, u.username AS author_username, c.text, c.created
            FROM comments c
            JOIN users u ON u.id = c.author_id
            WHERE c.post_id = $1
            ORDER BY c.id
            "#,
        )
        .bind(post_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            error!("db error while fetching comments of post {}: {}", post_id, e);
            DomainError::from(e)
        })
    }
}
