use actix_web::{HttpRequest, HttpResponse, get, web};
use serde_json::json;
use tracing::info;

use crate::application::auth_service::AuthService;
use crate::application::follow_service::FollowService;
use crate::application::post_service::PostService;
use crate::domain::error::DomainError;
use crate::domain::post::PostFilter;
use crate::presentation::dto::PageQuery;
use crate::presentation::render::{Renderer, render};
use crate::presentation::urls::url_path;
use crate::presentation::utils::{AuthenticatedUser, redirect, request_id};

#[get("/follow/", name = "follow_index")]
pub async fn follow_index(
    user: AuthenticatedUser,
    posts: web::Data<PostService>,
    renderer: web::Data<dyn Renderer>,
    query: web::Query<PageQuery>,
) -> Result<HttpResponse, DomainError> {
    let page = posts
        .list_posts(PostFilter::FollowedBy(user.id), query.page.as_deref())
        .await?;
    render(renderer.get_ref(), "follow.html", json!({ "page": page }))
}

#[get("/{username}/follow/", name = "profile_follow")]
pub async fn profile_follow(
    req: HttpRequest,
    user: AuthenticatedUser,
    auth: web::Data<AuthService>,
    follows: web::Data<FollowService>,
    path: web::Path<String>,
) -> Result<HttpResponse, DomainError> {
    let author = auth.get_by_username(&path).await?;
    let outcome = follows.follow(user.id, author.id).await?;

    info!(
        request_id = %request_id(&req),
        username = %user.username,
        author = %author.username,
        outcome = ?outcome,
        "follow requested"
    );

    Ok(redirect(url_path(&req, "profile", [&author.username])?))
}

#[get("/{username}/unfollow/", name = "profile_unfollow")]
pub async fn profile_unfollow(
    req: HttpRequest,
    user: AuthenticatedUser,
    auth: web::Data<AuthService>,
    follows: web::Data<FollowService>,
    path: web::Path<String>,
) -> Result<HttpResponse, DomainError> {
    let author = auth.get_by_username(&path).await?;
    let removed = follows.unfollow(user.id, author.id).await?;

    info!(
        request_id = %request_id(&req),
        username = %user.username,
        author = %author.username,
        removed,
        "unfollow requested"
    );

    Ok(redirect(url_path(&req, "profile", [&author.username])?))
}
