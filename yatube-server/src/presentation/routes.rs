use std::sync::Arc;
use std::time::Duration;

use actix_web::body::MessageBody;
use actix_web::dev::{ServiceFactory, ServiceRequest, ServiceResponse};
use actix_web::http::StatusCode;
use actix_web::middleware::{DefaultHeaders, ErrorHandlers};
use actix_web::{App, HttpResponse, web};
use sqlx::PgPool;

use crate::application::auth_service::AuthService;
use crate::application::follow_service::FollowService;
use crate::application::pagination::Paginator;
use crate::application::post_service::PostService;
use crate::data::comment_repository::{CommentRepository, PostgresCommentRepository};
use crate::data::follow_repository::{FollowRepository, PostgresFollowRepository};
use crate::data::group_repository::{GroupRepository, PostgresGroupRepository};
use crate::data::memory::MemoryStore;
use crate::data::post_repository::{PostRepository, PostgresPostRepository};
use crate::data::user_repository::{PostgresUserRepository, UserRepository};
use crate::infrastructure::cache::PageCache;
use crate::infrastructure::config::AppConfig;
use crate::infrastructure::media::MediaStorage;
use crate::infrastructure::security::JwtKeys;
use crate::presentation::handlers::{auth, comment, follow, post};
use crate::presentation::middleware::{CurrentUserMiddleware, RequestLogMiddleware, render_not_found};
use crate::presentation::render::{JsonRenderer, Renderer};

const FORM_LIMIT: usize = 1024 * 1024;

#[derive(Clone)]
pub struct Repositories {
    pub users: Arc<dyn UserRepository>,
    pub groups: Arc<dyn GroupRepository>,
    pub posts: Arc<dyn PostRepository>,
    pub comments: Arc<dyn CommentRepository>,
    pub follows: Arc<dyn FollowRepository>,
}

impl Repositories {
    pub fn postgres(pool: PgPool) -> Self {
        Self {
            users: Arc::new(PostgresUserRepository::new(pool.clone())),
            groups: Arc::new(PostgresGroupRepository::new(pool.clone())),
            posts: Arc::new(PostgresPostRepository::new(pool.clone())),
            comments: Arc::new(PostgresCommentRepository::new(pool.clone())),
            follows: Arc::new(PostgresFollowRepository::new(pool)),
        }
    }

    pub fn in_memory(store: MemoryStore) -> Self {
        let store = Arc::new(store);
        Self {
            users: store.clone(),
            groups: store.clone(),
            posts: store.clone(),
            comments: store.clone(),
            follows: store,
        }
    }
}

/// Everything a worker needs; cloned into each `App`.
#[derive(Clone)]
pub struct AppState {
    pub config: AppConfig,
    pub auth: AuthService,
    pub posts: PostService,
    pub follows: FollowService,
    pub cache: PageCache,
    pub renderer: Arc<dyn Renderer>,
}

impl AppState {
    pub fn new(config: AppConfig, repos: Repositories) -> Self {
        let keys = JwtKeys::new(config.jwt_secret.clone(), config.session_ttl_hours);
        let posts = PostService::new(
            repos.posts,
            repos.groups,
            repos.comments,
            MediaStorage::new(config.media_root.clone()),
            Paginator::new(config.page_size),
        );
        let cache = PageCache::new(
            Duration::from_secs(config.index_cache_ttl_secs),
            config.index_cache_capacity,
        );

        Self {
            auth: AuthService::new(repos.users, keys),
            posts,
            follows: FollowService::new(repos.follows),
            cache,
            renderer: Arc::new(JsonRenderer),
            config,
        }
    }
}

pub fn build_app(
    state: AppState,
) -> App<
    impl ServiceFactory<
        ServiceRequest,
        Config = (),
        Response = ServiceResponse<impl MessageBody>,
        Error = actix_web::Error,
        InitError = (),
    >,
> {
    App::new()
        .app_data(web::Data::new(state.config))
        .app_data(web::Data::new(state.auth))
        .app_data(web::Data::new(state.posts))
        .app_data(web::Data::new(state.follows))
        .app_data(web::Data::new(state.cache))
        .app_data(web::Data::from(state.renderer))
        .app_data(web::FormConfig::default().limit(FORM_LIMIT))
        .wrap(CurrentUserMiddleware)
        .wrap(ErrorHandlers::new().handler(StatusCode::NOT_FOUND, render_not_found))
        .wrap(
            DefaultHeaders::new()
                .add(("X-Content-Type-Options", "nosniff"))
                .add(("Referrer-Policy", "same-origin"))
                .add(("Permissions-Policy", "geolocation=()"))
                .add(("Cross-Origin-Opener-Policy", "same-origin")),
        )
        .wrap(RequestLogMiddleware)
        .configure(configure)
        .default_service(web::to(not_found))
}

/// Fixed paths are registered before `/{username}/...` so they are never
/// taken for a profile.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(post::index)
        .service(
            web::resource("/new/")
                .name("new_post")
                .route(web::get().to(post::new_post_form))
                .route(web::post().to(post::create_post)),
        )
        .service(follow::follow_index)
        .service(post::group_posts)
        .service(
            web::scope("/auth")
                .service(
                    web::resource("/login/")
                        .name("login")
                        .route(web::get().to(auth::login_form))
                        .route(web::post().to(auth::login)),
                )
                .service(
                    web::resource("/signup/")
                        .name("signup")
                        .route(web::get().to(auth::signup_form))
                        .route(web::post().to(auth::signup)),
                )
                .service(
                    web::resource("/logout/")
                        .name("logout")
                        .route(web::get().to(auth::logout))
                        .route(web::post().to(auth::logout)),
                ),
        )
        .service(follow::profile_follow)
        .service(follow::profile_unfollow)
        .service(post::post_view)
        .service(
            web::resource("/{username}/{post_id:\\d+}/edit/")
                .name("post_edit")
                .route(web::get().to(post::edit_post_form))
                .route(web::post().to(post::update_post)),
        )
        .service(
            web::resource("/{username}/{post_id:\\d+}/delete/")
                .name("post_delete")
                .route(web::get().to(post::delete_post))
                .route(web::post().to(post::delete_post)),
        )
        .service(
            web::resource("/{username}/{post_id:\\d+}/comment/")
                .name("add_comment")
                .to(comment::add_comment),
        )
        .service(post::profile);
}

async fn not_found() -> HttpResponse {
    HttpResponse::NotFound().finish()
}
