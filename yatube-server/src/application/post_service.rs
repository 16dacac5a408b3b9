use std::sync::Arc;

use tracing::instrument;
use uuid::Uuid;

use crate::application::pagination::{Page, Paginator};
use crate::data::comment_repository::CommentRepository;
use crate::data::group_repository::GroupRepository;
use crate::data::post_repository::PostRepository;
use crate::domain::comment::{Comment, CommentEntry, NewComment};
use crate::domain::error::DomainError;
use crate::domain::group::Group;
use crate::domain::post::{NewPost, Post, PostChanges, PostEntry, PostFilter};
use crate::infrastructure::media::{MediaStorage, UploadedImage};

/// A post submission that already passed form validation.
#[derive(Debug, Clone)]
pub struct PostDraft {
    pub text: String,
    pub group_id: Option<i64>,
    pub image: Option<UploadedImage>,
}

#[derive(Clone)]
pub struct PostService {
    posts: Arc<dyn PostRepository>,
    groups: Arc<dyn GroupRepository>,
    comments: Arc<dyn CommentRepository>,
    media: MediaStorage,
    paginator: Paginator,
}

impl PostService {
    pub fn new(
        posts: Arc<dyn PostRepository>,
        groups: Arc<dyn GroupRepository>,
        comments: Arc<dyn CommentRepository>,
        media: MediaStorage,
        paginator: Paginator,
    ) -> Self {
        Self {
            posts,
            groups,
            comments,
            media,
            paginator,
        }
    }

    /// One page of posts matching `filter`, newest first.
    pub async fn list_posts(
        &self,
        filter: PostFilter,
        page: Option<&str>,
    ) -> Result<Page<PostEntry>, DomainError> {
        let count = self.posts.count(filter).await?;
        let window = self.paginator.window(count, page);
        let posts = self
            .posts
            .list(filter, window.per_page, window.offset)
            .await?;
        Ok(Page::new(window, posts))
    }

    pub async fn count_posts(&self, filter: PostFilter) -> Result<u64, DomainError> {
        self.posts.count(filter).await
    }

    pub async fn get_group(&self, slug: &str) -> Result<Group, DomainError> {
        self.groups
            .find_by_slug(slug)
            .await?
            .ok_or_else(|| DomainError::GroupNotFound(slug.to_string()))
    }

    pub async fn groups(&self) -> Result<Vec<Group>, DomainError> {
        self.groups.list().await
    }

    /// The post `post_id`, provided it was written by `username`.
    pub async fn get_post(&self, username: &str, post_id: i64) -> Result<PostEntry, DomainError> {
        self.posts
            .find_by_author(username, post_id)
            .await?
            .ok_or(DomainError::PostNotFound(post_id))
    }

    pub async fn comments(&self, post_id: i64) -> Result<Vec<CommentEntry>, DomainError> {
        self.comments.list_for_post(post_id).await
    }

    #[instrument(skip(self, draft), fields(text_len = draft.text.len()))]
    pub async fn create_post(&self, author_id: Uuid, draft: PostDraft) -> Result<Post, DomainError> {
        let image = self.store_image(draft.image.as_ref()).await?;
        let created = self
            .posts
            .create(NewPost {
                author_id,
                text: draft.text,
                group_id: draft.group_id,
                image: image.clone(),
            })
            .await;
        if created.is_err() {
            self.discard_image(image.as_deref()).await;
        }
        created
    }

    #[instrument(skip(self, draft))]
    pub async fn update_post(&self, post_id: i64, draft: PostDraft) -> Result<Post, DomainError> {
        let image = self.store_image(draft.image.as_ref()).await?;
        let updated = self
            .posts
            .update(
                post_id,
                PostChanges {
                    text: draft.text,
                    group_id: draft.group_id,
                    image: image.clone(),
                },
            )
            .await;
        if !matches!(updated, Ok(Some(_))) {
            self.discard_image(image.as_deref()).await;
        }
        updated?.ok_or(DomainError::PostNotFound(post_id))
    }

    #[instrument(skip(self))]
    pub async fn delete_post(&self, post_id: i64) -> Result<(), DomainError> {
        if self.posts.delete(post_id).await? {
            Ok(())
        } else {
            Err(DomainError::PostNotFound(post_id))
        }
    }

    #[instrument(skip(self, text))]
    pub async fn add_comment(
        &self,
        post_id: i64,
        author_id: Uuid,
        text: String,
    ) -> Result<Comment, DomainError> {
        self.comments
            .create(NewComment {
                post_id,
                author_id,
                text,
            })
            .await
    }

    async fn store_image(&self, image: Option<&UploadedImage>) -> Result<Option<String>, DomainError> {
        match image {
            Some(image) => self.media.save(image).await.map(Some),
            None => Ok(None),
        }
    }

    async fn discard_image(&self, reference: Option<&str>) {
        if let Some(reference) = reference {
            self.media.remove(reference).await;
        }
    }
}
