//! In-process store implementing every repository trait over plain vectors.
//!
//! Backs local runs without `DATABASE_URL` and the HTTP tests. Relational
//! rules that Postgres enforces through foreign keys are applied by hand:
//! deleting a post removes its comments, deleting a group clears the
//! reference on its posts, and `(user, author)` follow pairs are unique.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use tracing::info;
use uuid::Uuid;

use crate::data::comment_repository::CommentRepository;
use crate::data::follow_repository::FollowRepository;
use crate::data::group_repository::GroupRepository;
use crate::data::post_repository::PostRepository;
use crate::data::user_repository::UserRepository;
use crate::domain::comment::{Comment, CommentEntry, NewComment};
use crate::domain::error::DomainError;
use crate::domain::follow::Follow;
use crate::domain::group::{Group, NewGroup};
use crate::domain::post::{NewPost, Post, PostChanges, PostEntry, PostFilter};
use crate::domain::user::User;

#[derive(Default)]
struct Tables {
    users: Vec<User>,
    groups: Vec<Group>,
    posts: Vec<Post>,
    comments: Vec<Comment>,
    follows: Vec<Follow>,
    next_group_id: i64,
    next_post_id: i64,
    next_comment_id: i64,
    next_follow_id: i64,
}

fn next_id(counter: &mut i64) -> i64 {
    *counter += 1;
    *counter
}

impl Tables {
    fn entry(&self, post: &Post) -> Option<PostEntry> {
        let author = self.users.iter().find(|u| u.id == post.author_id)?;
        let group = post
            .group_id
            .and_then(|id| self.groups.iter().find(|g| g.id == id));

        Some(PostEntry {
            id: post.id,
            text: post.text.clone(),
            pub_date: post.pub_date,
            author_id: post.author_id,
            author_username: author.username.clone(),
            group_id: post.group_id,
            group_slug: group.map(|g| g.slug.clone()),
            group_title: group.map(|g| g.title.clone()),
            image: post.image.clone(),
        })
    }

    fn matches(&self, post: &Post, filter: PostFilter) -> bool {
        match filter {
            PostFilter::All => true,
            PostFilter::Group(group_id) => post.group_id == Some(group_id),
            PostFilter::Author(author_id) => post.author_id == author_id,
            PostFilter::FollowedBy(user_id) => self
                .follows
                .iter()
                .any(|f| f.user_id == user_id && f.author_id == post.author_id),
        }
    }

    /// Newest first; ids break ties between posts created in the same instant.
    fn ordered(&self, filter: PostFilter) -> Vec<&Post> {
        let mut posts: Vec<&Post> = self
            .posts
            .iter()
            .filter(|p| self.matches(p, filter))
            .collect();
        posts.sort_by(|a, b| b.pub_date.cmp(&a.pub_date).then(b.id.cmp(&a.id)));
        posts
    }
}

#[derive(Clone, Default)]
pub struct MemoryStore {
    tables: Arc<RwLock<Tables>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserRepository for MemoryStore {
    async fn create(&self, user: User) -> Result<User, DomainError> {
        let mut tables = self.tables.write().await;
        if tables.users.iter().any(|u| u.username == user.username) {
            return Err(DomainError::UserAlreadyExists(user.username));
        }
        tables.users.push(user.clone());
        info!(user_id = %user.id, username = %user.username, "user created");
        Ok(user)
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<User>, DomainError> {
        let tables = self.tables.read().await;
        Ok(tables.users.iter().find(|u| u.username == username).cloned())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, DomainError> {
        let tables = self.tables.read().await;
        Ok(tables.users.iter().find(|u| u.id == id).cloned())
    }
}

#[async_trait]
impl GroupRepository for MemoryStore {
    async fn create(&self, group: NewGroup) -> Result<Group, DomainError> {
        let mut tables = self.tables.write().await;
        if tables.groups.iter().any(|g| g.slug == group.slug) {
            return Err(DomainError::BadRequest(format!(
                "group slug already taken: {}",
                group.slug
            )));
        }
        let group = Group {
            id: next_id(&mut tables.next_group_id),
            title: group.title,
            slug: group.slug,
            description: group.description,
        };
        tables.groups.push(group.clone());
        Ok(group)
    }

    async fn find_by_slug(&self, slug: &str) -> Result<Option<Group>, DomainError> {
        let tables = self.tables.read().await;
        Ok(tables.groups.iter().find(|g| g.slug == slug).cloned())
    }

    async fn list(&self) -> Result<Vec<Group>, DomainError> {
        let tables = self.tables.read().await;
        let mut groups = tables.groups.clone();
        groups.sort_by(|a, b| a.title.cmp(&b.title).then(a.id.cmp(&b.id)));
        Ok(groups)
    }

    async fn delete(&self, id: i64) -> Result<bool, DomainError> {
        let mut tables = self.tables.write().await;
        let before = tables.groups.len();
        tables.groups.retain(|g| g.id != id);
        if tables.groups.len() == before {
            return Ok(false);
        }
        for post in tables.posts.iter_mut().filter(|p| p.group_id == Some(id)) {
            post.group_id = None;
        }
        Ok(true)
    }
}

#[async_trait]
impl PostRepository for MemoryStore {
    async fn create(&self, post: NewPost) -> Result<Post, DomainError> {
        let mut tables = self.tables.write().await;
        if !tables.users.iter().any(|u| u.id == post.author_id) {
            return Err(DomainError::UserNotFound(post.author_id.to_string()));
        }
        if let Some(group_id) = post.group_id {
            if !tables.groups.iter().any(|g| g.id == group_id) {
                return Err(DomainError::GroupNotFound(group_id.to_string()));
            }
        }
        let post = Post {
            id: next_id(&mut tables.next_post_id),
            text: post.text,
            pub_date: Utc::now(),
            author_id: post.author_id,
            group_id: post.group_id,
            image: post.image,
        };
        tables.posts.push(post.clone());
        info!(post_id = post.id, author_id = %post.author_id, "post created");
        Ok(post)
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<PostEntry>, DomainError> {
        let tables = self.tables.read().await;
        Ok(tables
            .posts
            .iter()
            .find(|p| p.id == id)
            .and_then(|p| tables.entry(p)))
    }

    async fn find_by_author(
        &self,
        username: &str,
        id: i64,
    ) -> Result<Option<PostEntry>, DomainError> {
        let tables = self.tables.read().await;
        Ok(tables
            .posts
            .iter()
            .find(|p| p.id == id)
            .and_then(|p| tables.entry(p))
            .filter(|entry| entry.author_username == username))
    }

    async fn update(&self, id: i64, changes: PostChanges) -> Result<Option<Post>, DomainError> {
        let mut tables = self.tables.write().await;
        if let Some(group_id) = changes.group_id {
            if !tables.groups.iter().any(|g| g.id == group_id) {
                return Err(DomainError::GroupNotFound(group_id.to_string()));
            }
        }
        let Some(post) = tables.posts.iter_mut().find(|p| p.id == id) else {
            return Ok(None);
        };
        post.text = changes.text;
        post.group_id = changes.group_id;
        if changes.image.is_some() {
            post.image = changes.image;
        }
        info!(post_id = id, "post updated");
        Ok(Some(post.clone()))
    }

    async fn delete(&self, id: i64) -> Result<bool, DomainError> {
        let mut tables = self.tables.write().await;
        let before = tables.posts.len();
        tables.posts.retain(|p| p.id != id);
        if tables.posts.len() == before {
            return Ok(false);
        }
        tables.comments.retain(|c| c.post_id != id);
        info!(post_id = id, "post deleted");
        Ok(true)
    }

    async fn list(
        &self,
        filter: PostFilter,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<PostEntry>, DomainError> {
        let tables = self.tables.read().await;
        Ok(tables
            .ordered(filter)
            .into_iter()
            .skip(offset)
            .take(limit)
            .filter_map(|p| tables.entry(p))
            .collect())
    }

    async fn count(&self, filter: PostFilter) -> Result<u64, DomainError> {
        let tables = self.tables.read().await;
        Ok(tables.posts.iter().filter(|p| tables.matches(p, filter)).count() as u64)
    }
}

#[async_trait]
impl CommentRepository for MemoryStore {
    async fn create(&self, comment: NewComment) -> Result<Comment, DomainError> {
        let mut tables = self.tables.write().await;
        if !tables.posts.iter().any(|p| p.id == comment.post_id) {
            return Err(DomainError::PostNotFound(comment.post_id));
        }
        let comment = Comment {
            id: next_id(&mut tables.next_comment_id),
            post_id: comment.post_id,
            author_id: comment.author_id,
            text: comment.text,
            created: Utc::now(),
        };
        tables.comments.push(comment.clone());
        info!(comment_id = comment.id, post_id = comment.post_id, "comment created");
        Ok(comment)
    }

    async fn list_for_post(&self, post_id: i64) -> Result<Vec<CommentEntry>, DomainError> {
        let tables = self.tables.read().await;
        Ok(tables
            .comments
            .iter()
            .filter(|c| c.post_id == post_id)
            .filter_map(|c| {
                let author = tables.users.iter().find(|u| u.id == c.author_id)?;
                Some(CommentEntry {
                    id: c.id,
                    post_id: c.post_id,
                    author_id: c.author_id,
                    author_username: author.username.clone(),
                    text: c.text.clone(),
                    created: c.created,
                })
            })
            .collect())
    }
}

#[async_trait]
impl FollowRepository for MemoryStore {
    async fn create_if_absent(&self, user_id: Uuid, author_id: Uuid) -> Result<bool, DomainError> {
        let mut tables = self.tables.write().await;
        if tables
            .follows
            .iter()
            .any(|f| f.user_id == user_id && f.author_id == author_id)
        {
            return Ok(false);
        }
        let id = next_id(&mut tables.next_follow_id);
        tables.follows.push(Follow {
            id,
            user_id,
            author_id,
        });
        info!(user_id = %user_id, author_id = %author_id, "follow created");
        Ok(true)
    }

    async fn delete(&self, user_id: Uuid, author_id: Uuid) -> Result<bool, DomainError> {
        let mut tables = self.tables.write().await;
        let before = tables.follows.len();
        tables
            .follows
            .retain(|f| !(f.user_id == user_id && f.author_id == author_id));
        Ok(tables.follows.len() < before)
    }

    async fn exists(&self, user_id: Uuid, author_id: Uuid) -> Result<bool, DomainError> {
        let tables = self.tables.read().await;
        Ok(tables
            .follows
            .iter()
            .any(|f| f.user_id == user_id && f.author_id == author_id))
    }

    async fn count_followers(&self, author_id: Uuid) -> Result<u64, DomainError> {
        let tables = self.tables.read().await;
        Ok(tables.follows.iter().filter(|f| f.author_id == author_id).count() as u64)
    }

    async fn count_following(&self, user_id: Uuid) -> Result<u64, DomainError> {
        let tables = self.tables.read().await;
        Ok(tables.follows.iter().filter(|f| f.user_id == user_id).count() as u64)
    }
}
