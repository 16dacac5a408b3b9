use crate::domain::error::DomainError;
use crate::domain::post::{NewPost, Post, PostChanges, PostEntry, PostFilter};
use async_trait::async_trait;
use sqlx::{PgPool, Postgres, QueryBuilder};
use tracing::{error, info};

#[async_trait]
pub trait PostRepository: Send + Sync {
    async fn create(&self, post: NewPost) -> Result<Post, DomainError>;
    async fn find_by_id(&self, id: i64) -> Result<Option<PostEntry>, DomainError>;
    /// Looks a post up by id, but only if it was written by `username`.
    async fn find_by_author(
        &self,
        username: &str,
        id: i64,
    ) -> Result<Option<PostEntry>, DomainError>;
    async fn update(&self, id: i64, changes: PostChanges) -> Result<Option<Post>, DomainError>;
    /// Deletes the post together with its comments.
    async fn delete(&self, id: i64) -> Result<bool, DomainError>;
    async fn list(
        &self,
        filter: PostFilter,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<PostEntry>, DomainError>;
    async fn count(&self, filter: PostFilter) -> Result<u64, DomainError>;
}

const ENTRY_SELECT: &str = r#"
    SELECT p.id, p.text, p.pub_date, p.author_id, u.username AS author_username,
           p.group_id, g.slug AS group_slug, g.title AS group_title, p.image
    FROM posts p
    JOIN users u ON u.id = p.author_id
    LEFT JOIN groups g ON g.id = p.group_id
"#;

fn push_filter(builder: &mut QueryBuilder<'_, Postgres>, filter: PostFilter) {
    match filter {
        PostFilter::All => {}
        PostFilter::Group(group_id) => {
            builder.push(" WHERE p.group_id = ").push_bind(group_id);
        }
        PostFilter::Author(author_id) => {
            builder.push(" WHERE p.author_id = ").push_bind(author_id);
        }
        PostFilter::FollowedBy(user_id) => {
            builder
                .push(" WHERE p.author_id IN (SELECT f.author_id FROM follows f WHERE f.user_id = ")
                .push_bind(user_id)
                .push(")");
        }
    }
}

#[derive(Clone)]
pub struct PostgresPostRepository {
    pool: PgPool,
}

impl PostgresPostRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PostRepository for PostgresPostRepository {
    async fn create(&self, post: NewPost) -> Result<Post, DomainError> {
        let post = sqlx::query_as::<_, Post>(
            r#"
            INSERT INTO posts (text, author_id, group_id, image)
            VALUES ($1, $2, $3, $4)
            RETURNING id, text, pub_date, author_id, group_id, image
            "#,
        )
        .bind(&post.text)
        .bind(post.author_id)
        .bind(post.group_id)
        .bind(&post.image)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            error!("failed to create post: {}", e);
            DomainError::from(e)
        })?;

        info!(post_id = post.id, author_id = %post.author_id, "post created");
        Ok(post)
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<PostEntry>, DomainError> {
        let mut builder = QueryBuilder::<Postgres>::new(ENTRY_SELECT);
        builder.push(" WHERE p.id = ").push_bind(id);
        builder
            .build_query_as::<PostEntry>()
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| {
                error!("db error find_by_id {}: {}", id, e);
                DomainError::from(e)
            })
    }

    async fn find_by_author(
        &self,
        username: &str,
        id: i64,
    ) -> Result<Option<PostEntry>, DomainError> {
        let mut builder = QueryBuilder::<Postgres>::new(ENTRY_SELECT);
        builder
            .push(" WHERE p.id = ")
            .push_bind(id)
            .push(" AND u.username = ")
            .push_bind(username);
        builder
            .build_query_as::<PostEntry>()
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| {
                error!("db error find_by_author {}/{}: {}", username, id, e);
                DomainError::from(e)
            })
    }

    async fn update(&self, id: i64, changes: PostChanges) -> Result<Option<Post>, DomainError> {
        let post = sqlx::query_as::<_, Post>(
            r#"
            UPDATE posts
            SET
                text = $1,
                group_id = $2,
                image = COALESCE($3, image)
            WHERE id = $4
            RETURNING id, text, pub_date, author_id, group_id, image
            "#,
        )
        .bind(&changes.text)
        .bind(changes.group_id)
        .bind(&changes.image)
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            error!("failed to update post {}: {}", id, e);
            DomainError::from(e)
        })?;

        if post.is_some() {
            info!(post_id = id, "post updated");
        }

        Ok(post)
    }

    async fn delete(&self, id: i64) -> Result<bool, DomainError> {
        let deleted = sqlx::query("DELETE FROM posts WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                error!("failed to delete post {}: {}", id, e);
                DomainError::from(e)
            })?;

        if deleted.rows_affected() > 0 {
            info!(post_id = id, "post deleted");
        }
        Ok(deleted.rows_affected() > 0)
    }

    async fn list(
        &self,
        filter: PostFilter,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<PostEntry>, DomainError> {
        let mut builder = QueryBuilder::<Postgres>::new(ENTRY_SELECT);
        push_filter(&mut builder, filter);
        builder
            .push(" ORDER BY p.pub_date DESC, p.id DESC LIMIT ")
            .push_bind(limit as i64)
            .push(" OFFSET ")
            .push_bind(offset as i64);

        builder
            .build_query_as::<PostEntry>()
            .fetch_all(&self.pool)
            .await
            .map_err(|e| {
                error!("db error while fetching posts: {}", e);
                DomainError::from(e)
            })
    }

    async fn count(&self, filter: PostFilter) -> Result<u64, DomainError> {
        let mut builder = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM posts p");
        push_filter(&mut builder, filter);

        let count: i64 = builder
            .build_query_scalar()
            .fetch_one(&self.pool)
            .await
            .map_err(|e| {
                error!("db error while counting posts: {}", e);
                DomainError::from(e)
            })?;

        Ok(count.max(0) as u64)
    }
}
