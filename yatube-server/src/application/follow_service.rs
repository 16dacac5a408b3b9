use std::sync::Arc;

use tracing::{debug, instrument};
use uuid::Uuid;

use crate::data::follow_repository::FollowRepository;
use crate::domain::error::DomainError;
use crate::domain::follow::FollowOutcome;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FollowCounts {
    pub followers: u64,
    pub following: u64,
}

#[derive(Clone)]
pub struct FollowService {
    repo: Arc<dyn FollowRepository>,
}

impl FollowService {
    pub fn new(repo: Arc<dyn FollowRepository>) -> Self {
        Self { repo }
    }

    /// Idempotent: following twice keeps a single edge, and a user can never
    /// follow themselves.
    #[instrument(skip(self))]
    pub async fn follow(&self, user_id: Uuid, author_id: Uuid) -> Result<FollowOutcome, DomainError> {
        if user_id == author_id {
            debug!("self-follow ignored");
            return Ok(FollowOutcome::SelfFollowIgnored);
        }
        if self.repo.create_if_absent(user_id, author_id).await? {
            Ok(FollowOutcome::Created)
        } else {
            Ok(FollowOutcome::AlreadyFollowing)
        }
    }

    /// Returns whether an edge was removed; a missing edge is not an error.
    #[instrument(skip(self))]
    pub async fn unfollow(&self, user_id: Uuid, author_id: Uuid) -> Result<bool, DomainError> {
        self.repo.delete(user_id, author_id).await
    }

    pub async fn is_following(&self, user_id: Uuid, author_id: Uuid) -> Result<bool, DomainError> {
        self.repo.exists(user_id, author_id).await
    }

    pub async fn counts(&self, user_id: Uuid) -> Result<FollowCounts, DomainError> {
        Ok(FollowCounts {
            followers: self.repo.count_followers(user_id).await?,
            following: self.repo.count_following(user_id).await?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::memory::MemoryStore;
    use crate::data::user_repository::UserRepository;
    use crate::domain::user::User;

    async fn service_with_users() -> (FollowService, Uuid, Uuid) {
        let store = MemoryStore::new();
        let follower = store
            .create(User::new("follower".into(), None, "hash".into()))
            .await
            .unwrap();
        let author = store
            .create(User::new("author".into(), None, "hash".into()))
            .await
            .unwrap();
        (FollowService::new(Arc::new(store)), follower.id, author.id)
    }

    #[tokio::test]
    async fn following_twice_keeps_one_edge() {
        let (service, follower, author) = service_with_users().await;

        assert_eq!(service.follow(follower, author).await.unwrap(), FollowOutcome::Created);
        assert_eq!(
            service.follow(follower, author).await.unwrap(),
            FollowOutcome::AlreadyFollowing
        );
        assert_eq!(service.counts(author).await.unwrap().followers, 1);
    }

    #[tokio::test]
    async fn self_follow_creates_nothing() {
        let (service, follower, _) = service_with_users().await;

        assert_eq!(
            service.follow(follower, follower).await.unwrap(),
            FollowOutcome::SelfFollowIgnored
        );
        assert_eq!(service.counts(follower).await.unwrap().followers, 0);
    }

    #[tokio::test]
    async fn unfollow_restores_previous_count() {
        let (service, follower, author) = service_with_users().await;

        service.follow(follower, author).await.unwrap();
        assert!(service.unfollow(follower, author).await.unwrap());
        assert!(!service.unfollow(follower, author).await.unwrap());

        assert!(!service.is_following(follower, author).await.unwrap());
        assert_eq!(service.counts(follower).await.unwrap().following, 0);
    }
}
