#![allow(dead_code)]

use std::time::Duration;

use actix_web::body::MessageBody;
use actix_web::cookie::Cookie;
use actix_web::dev::ServiceResponse;
use actix_web::http::header::LOCATION;
use actix_web::test;
use serde_json::Value;
use tempfile::TempDir;

use yatube_server::data::group_repository::GroupRepository;
use yatube_server::data::memory::MemoryStore;
use yatube_server::data::post_repository::PostRepository;
use yatube_server::data::user_repository::UserRepository;
use yatube_server::domain::group::{Group, NewGroup};
use yatube_server::domain::post::{NewPost, Post};
use yatube_server::domain::user::User;
use yatube_server::infrastructure::cache::PageCache;
use yatube_server::infrastructure::config::AppConfig;
use yatube_server::presentation::routes::{AppState, Repositories};

pub const BOUNDARY: &str = "----yatube-test-boundary";

/// A fresh in-memory world with a throwaway media root.
pub struct TestWorld {
    pub store: MemoryStore,
    pub state: AppState,
    pub media: TempDir,
}

impl TestWorld {
    pub fn new() -> Self {
        let media = tempfile::tempdir().expect("media dir");
        let config = AppConfig {
            host: "127.0.0.1".into(),
            port: 0,
            database_url: None,
            database_max_connections: 1,
            jwt_secret: "test-secret".into(),
            session_ttl_hours: 1,
            media_root: media.path().to_path_buf(),
            page_size: 10,
            index_cache_ttl_secs: 20,
            index_cache_capacity: 100,
            login_url: "/auth/login/".into(),
        };
        let store = MemoryStore::new();
        let state = AppState::new(config, Repositories::in_memory(store.clone()));
        Self {
            store,
            state,
            media,
        }
    }

    pub fn with_cache_ttl(mut self, ttl: Duration) -> Self {
        self.state.cache = PageCache::new(ttl, 100);
        self
    }

    pub async fn user(&self, username: &str) -> User {
        UserRepository::create(&self.store, User::new(username.into(), None, "!".into()))
            .await
            .expect("create user")
    }

    pub async fn group(&self, slug: &str) -> Group {
        GroupRepository::create(
            &self.store,
            NewGroup {
                title: format!("Group {slug}"),
                slug: slug.into(),
                description: "test group".into(),
            },
        )
        .await
        .expect("create group")
    }

    pub async fn post(&self, author: &User, text: &str, group: Option<&Group>) -> Post {
        PostRepository::create(
            &self.store,
            NewPost {
                author_id: author.id,
                text: text.into(),
                group_id: group.map(|g| g.id),
                image: None,
            },
        )
        .await
        .expect("create post")
    }

    /// Session cookie for `user`, as issued by the login route.
    pub fn session(&self, user: &User) -> Cookie<'static> {
        let token = self
            .state
            .auth
            .keys()
            .generate_token(user.id)
            .expect("token");
        Cookie::new("access_token", token)
    }
}

pub fn location<B>(resp: &ServiceResponse<B>) -> String {
    resp.headers()
        .get(LOCATION)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string()
}

/// Parses a rendered page into `(template, context)`.
pub async fn page<B: MessageBody>(resp: ServiceResponse<B>) -> (String, Value) {
    let body: Value = test::read_body_json(resp).await;
    (
        body["template"].as_str().unwrap_or_default().to_string(),
        body["context"].clone(),
    )
}

pub fn texts(context: &Value) -> Vec<String> {
    context["page"]["object_list"]
        .as_array()
        .map(|posts| {
            posts
                .iter()
                .filter_map(|p| p["text"].as_str().map(str::to_string))
                .collect()
        })
        .unwrap_or_default()
}

/// Multipart body with plain fields and optionally one file part.
pub fn multipart(fields: &[(&str, &str)], file: Option<(&str, &str, &[u8])>) -> Vec<u8> {
    let mut body = Vec::new();
    for (name, value) in fields {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
            )
            .as_bytes(),
        );
    }
    if let Some((file_name, content_type, bytes)) = file {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"image\"; filename=\"{file_name}\"\r\nContent-Type: {content_type}\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(bytes);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
    body
}

pub fn multipart_content_type() -> String {
    format!("multipart/form-data; boundary={BOUNDARY}")
}

pub const SMALL_GIF: &[u8] = &[
    0x47, 0x49, 0x46, 0x38, 0x39, 0x61, 0x02, 0x00, 0x01, 0x00, 0x80, 0x00, 0x00, 0x00, 0x00,
    0x00, 0xFF, 0xFF, 0xFF, 0x21, 0xF9, 0x04, 0x00, 0x00, 0x00, 0x00, 0x00, 0x2C, 0x00, 0x00,
    0x00, 0x00, 0x02, 0x00, 0x01, 0x00, 0x00, 0x02, 0x02, 0x0C, 0x0A, 0x00, 0x3B,
];
