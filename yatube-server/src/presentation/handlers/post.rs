use actix_web::{HttpRequest, HttpResponse, get, web};
use serde_json::{Value, json};
use tracing::info;

use crate::application::auth_service::AuthService;
use crate::application::follow_service::FollowService;
use crate::application::post_service::PostService;
use crate::domain::error::DomainError;
use crate::domain::post::{PostEntry, PostFilter};
use crate::infrastructure::cache::{CachedPage, PageCache};
use crate::presentation::dto::{AuthorView, PageQuery};
use crate::presentation::forms::{CommentFormView, PostForm, PostFormView};
use crate::presentation::render::{Renderer, render};
use crate::presentation::urls::url_path;
use crate::presentation::utils::{AuthenticatedUser, MaybeUser, redirect, request_id};

#[get("/", name = "index")]
pub async fn index(
    req: HttpRequest,
    posts: web::Data<PostService>,
    cache: web::Data<PageCache>,
    renderer: web::Data<dyn Renderer>,
    query: web::Query<PageQuery>,
) -> Result<HttpResponse, DomainError> {
    let path_and_query = req
        .uri()
        .path_and_query()
        .map(|pq| pq.as_str())
        .unwrap_or("/");
    let key = PageCache::key("index", path_and_query);
    if let Some(page) = cache.get(&key).await {
        return Ok(page.into_response());
    }

    let page = posts.list_posts(PostFilter::All, query.page.as_deref()).await?;
    let context = json!({ "page": page });
    let body = renderer.render("index.html", &context)?;

    cache
        .insert(
            key,
            CachedPage {
                body: body.clone(),
                content_type: renderer.content_type(),
            },
        )
        .await;

    Ok(HttpResponse::Ok()
        .content_type(renderer.content_type())
        .body(body))
}

#[get("/group/{slug}/", name = "group")]
pub async fn group_posts(
    posts: web::Data<PostService>,
    renderer: web::Data<dyn Renderer>,
    path: web::Path<String>,
    query: web::Query<PageQuery>,
) -> Result<HttpResponse, DomainError> {
    let group = posts.get_group(&path).await?;
    let page = posts
        .list_posts(PostFilter::Group(group.id), query.page.as_deref())
        .await?;

    render(
        renderer.get_ref(),
        "group.html",
        json!({ "group": group, "page": page }),
    )
}

#[get("/{username}/", name = "profile")]
pub async fn profile(
    user: MaybeUser,
    auth: web::Data<AuthService>,
    posts: web::Data<PostService>,
    follows: web::Data<FollowService>,
    renderer: web::Data<dyn Renderer>,
    path: web::Path<String>,
    query: web::Query<PageQuery>,
) -> Result<HttpResponse, DomainError> {
    let author = auth.get_by_username(&path).await?;
    let page = posts
        .list_posts(PostFilter::Author(author.id), query.page.as_deref())
        .await?;
    let following = match &user.0 {
        Some(viewer) => follows.is_following(viewer.id, author.id).await?,
        None => false,
    };
    let counts = follows.counts(author.id).await?;

    render(
        renderer.get_ref(),
        "profile.html",
        json!({
            "author": AuthorView::from(&author),
            "posts_count": page.count,
            "page": page,
            "following": following,
            "followers_count": counts.followers,
            "following_count": counts.following,
        }),
    )
}

#[get("/{username}/{post_id:\\d+}/", name = "post")]
pub async fn post_view(
    posts: web::Data<PostService>,
    renderer: web::Data<dyn Renderer>,
    path: web::Path<(String, i64)>,
) -> Result<HttpResponse, DomainError> {
    let (username, post_id) = path.into_inner();
    let post = posts.get_post(&username, post_id).await?;
    let context = post_page_context(&posts, post, CommentFormView::default()).await?;
    render(renderer.get_ref(), "post.html", context)
}

/// Context of `post.html`; also used to re-render a rejected comment.
pub(crate) async fn post_page_context(
    posts: &PostService,
    post: PostEntry,
    form: CommentFormView,
) -> Result<Value, DomainError> {
    let comments = posts.comments(post.id).await?;
    let posts_count = posts.count_posts(PostFilter::Author(post.author_id)).await?;
    let author = AuthorView {
        id: post.author_id,
        username: post.author_username.clone(),
    };
    Ok(json!({
        "post": post,
        "author": author,
        "posts_count": posts_count,
        "comments": comments,
        "form": form,
    }))
}

pub async fn new_post_form(
    _user: AuthenticatedUser,
    posts: web::Data<PostService>,
    renderer: web::Data<dyn Renderer>,
) -> Result<HttpResponse, DomainError> {
    let groups = posts.groups().await?;
    render(
        renderer.get_ref(),
        "new_post.html",
        json!({ "form": PostFormView::empty(&groups), "is_edit": false }),
    )
}

pub async fn create_post(
    req: HttpRequest,
    user: AuthenticatedUser,
    posts: web::Data<PostService>,
    renderer: web::Data<dyn Renderer>,
    payload: web::Payload,
) -> Result<HttpResponse, DomainError> {
    let form = PostForm::read(&req, payload).await?;
    let groups = posts.groups().await?;

    let draft = match form.clean(&groups) {
        Ok(draft) => draft,
        Err((form, errors)) => {
            return render(
                renderer.get_ref(),
                "new_post.html",
                json!({ "form": form.bound(&groups, errors), "is_edit": false }),
            );
        }
    };

    let post = posts.create_post(user.id, draft).await?;

    info!(
        request_id = %request_id(&req),
        username = %user.username,
        post_id = post.id,
        "post created"
    );

    Ok(redirect(url_path(&req, "index", [""; 0])?))
}

pub async fn edit_post_form(
    req: HttpRequest,
    user: AuthenticatedUser,
    posts: web::Data<PostService>,
    renderer: web::Data<dyn Renderer>,
    path: web::Path<(String, i64)>,
) -> Result<HttpResponse, DomainError> {
    let (username, post_id) = path.into_inner();
    let post = posts.get_post(&username, post_id).await?;
    if !user.is_author_of(&post) {
        return Ok(redirect(post_url(&req, &post)?));
    }

    let groups = posts.groups().await?;
    render(
        renderer.get_ref(),
        "new_post.html",
        json!({
            "form": PostFormView::initial(&post, &groups),
            "is_edit": true,
            "post": post,
        }),
    )
}

pub async fn update_post(
    req: HttpRequest,
    user: AuthenticatedUser,
    posts: web::Data<PostService>,
    renderer: web::Data<dyn Renderer>,
    path: web::Path<(String, i64)>,
    payload: web::Payload,
) -> Result<HttpResponse, DomainError> {
    let (username, post_id) = path.into_inner();
    let post = posts.get_post(&username, post_id).await?;
    if !user.is_author_of(&post) {
        return Ok(redirect(post_url(&req, &post)?));
    }

    let form = PostForm::read(&req, payload).await?;
    let groups = posts.groups().await?;
    let draft = match form.clean(&groups) {
        Ok(draft) => draft,
        Err((form, errors)) => {
            let mut view = form.bound(&groups, errors);
            view.image = post.image.clone();
            return render(
                renderer.get_ref(),
                "new_post.html",
                json!({ "form": view, "is_edit": true, "post": post }),
            );
        }
    };

    posts.update_post(post.id, draft).await?;

    info!(
        request_id = %request_id(&req),
        username = %user.username,
        post_id = post.id,
        "post updated"
    );

    Ok(redirect(post_url(&req, &post)?))
}

/// Served on GET as well as POST.
pub async fn delete_post(
    req: HttpRequest,
    user: AuthenticatedUser,
    posts: web::Data<PostService>,
    path: web::Path<(String, i64)>,
) -> Result<HttpResponse, DomainError> {
    let (username, post_id) = path.into_inner();
    let post = posts.get_post(&username, post_id).await?;
    if !user.is_author_of(&post) {
        return Ok(redirect(post_url(&req, &post)?));
    }

    posts.delete_post(post.id).await?;

    info!(
        request_id = %request_id(&req),
        username = %user.username,
        post_id = post.id,
        "post deleted"
    );

    Ok(redirect(url_path(&req, "profile", [&user.username])?))
}

pub(crate) fn post_url(req: &HttpRequest, post: &PostEntry) -> Result<String, DomainError> {
    url_path(
        req,
        "post",
        [post.author_username.clone(), post.id.to_string()],
    )
}
