use std::time::Duration;

use actix_web::HttpResponse;
use moka::future::Cache;
use tracing::debug;

/// A rendered response body kept for reuse.
#[derive(Debug, Clone)]
pub struct CachedPage {
    pub body: String,
    pub content_type: &'static str,
}

impl CachedPage {
    pub fn into_response(self) -> HttpResponse {
        HttpResponse::Ok()
            .content_type(self.content_type)
            .insert_header(("X-Cache", "HIT"))
            .body(self.body)
    }
}

/// Short-lived page cache for the global feed.
///
/// Entries expire after a fixed TTL. Post writes never touch it, so a page
/// may lag behind the database for up to one TTL; `clear` drops everything.
#[derive(Clone)]
pub struct PageCache {
    pages: Cache<String, CachedPage>,
}

impl PageCache {
    pub fn new(ttl: Duration, capacity: u64) -> Self {
        let pages = Cache::builder()
            .max_capacity(capacity)
            .time_to_live(ttl)
            .build();
        Self { pages }
    }

    /// Key for a route: the route name plus the full request path and query.
    pub fn key(route: &str, path_and_query: &str) -> String {
        format!("page:{route}:{path_and_query}")
    }

    pub async fn get(&self, key: &str) -> Option<CachedPage> {
        let page = self.pages.get(key).await;
        debug!(key, hit = page.is_some(), "page cache lookup");
        page
    }

    pub async fn insert(&self, key: String, page: CachedPage) {
        debug!(key = %key, "page cache write");
        self.pages.insert(key, page).await;
    }

    pub fn clear(&self) {
        debug!("page cache cleared");
        self.pages.invalidate_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page(body: &str) -> CachedPage {
        CachedPage {
            body: body.into(),
            content_type: "application/json",
        }
    }

    #[tokio::test]
    async fn serves_stored_page_until_cleared() {
        let cache = PageCache::new(Duration::from_secs(20), 10);
        let key = PageCache::key("index", "/");

        cache.insert(key.clone(), page("first")).await;
        assert_eq!(cache.get(&key).await.unwrap().body, "first");

        cache.clear();
        assert!(cache.get(&key).await.is_none());
    }

    #[tokio::test]
    async fn entries_expire_after_ttl() {
        let cache = PageCache::new(Duration::from_millis(50), 10);
        let key = PageCache::key("index", "/?page=2");

        cache.insert(key.clone(), page("stale")).await;
        tokio::time::sleep(Duration::from_millis(120)).await;

        assert!(cache.get(&key).await.is_none());
    }

    #[test]
    fn query_string_is_part_of_the_key() {
        assert_ne!(
            PageCache::key("index", "/"),
            PageCache::key("index", "/?page=2")
        );
    }
}
