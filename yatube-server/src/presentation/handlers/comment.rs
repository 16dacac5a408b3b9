use actix_web::http::Method;
use actix_web::{HttpRequest, HttpResponse, web};
use tracing::info;

use crate::application::post_service::PostService;
use crate::domain::error::DomainError;
use crate::presentation::forms::{CommentForm, CommentFormView};
use crate::presentation::handlers::post::{post_page_context, post_url};
use crate::presentation::render::{Renderer, render};
use crate::presentation::utils::{AuthenticatedUser, redirect, request_id};

/// Mounted for every method so that the login check runs before the
/// method check: anonymous visitors are sent to log in, signed-in users get
/// 405 for anything but POST.
pub async fn add_comment(
    req: HttpRequest,
    user: AuthenticatedUser,
    posts: web::Data<PostService>,
    renderer: web::Data<dyn Renderer>,
    path: web::Path<(String, i64)>,
    form: Option<web::Form<CommentForm>>,
) -> Result<HttpResponse, DomainError> {
    if *req.method() != Method::POST {
        return Err(DomainError::MethodNotAllowed);
    }

    let (username, post_id) = path.into_inner();
    let post = posts.get_post(&username, post_id).await?;

    let form = form.map(web::Form::into_inner).unwrap_or_default();
    let text = match form.clean() {
        Ok(text) => text,
        Err((form, errors)) => {
            let view = CommentFormView {
                text: form.text,
                errors,
            };
            let context = post_page_context(&posts, post, view).await?;
            return render(renderer.get_ref(), "post.html", context);
        }
    };

    let comment = posts.add_comment(post.id, user.id, text).await?;

    info!(
        request_id = %request_id(&req),
        username = %user.username,
        post_id = post.id,
        comment_id = comment.id,
        "comment added"
    );

    Ok(redirect(post_url(&req, &post)?))
}
