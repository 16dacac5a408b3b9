use actix_web::dev::Payload;
use actix_web::http::header::LOCATION;
use actix_web::{Error, FromRequest, HttpMessage, HttpRequest, HttpResponse, web};
use futures_util::future::{Ready, ready};
use uuid::Uuid;

use crate::domain::error::DomainError;
use crate::domain::post::PostEntry;
use crate::domain::user::User;
use crate::infrastructure::config::AppConfig;

pub const SESSION_COOKIE: &str = "access_token";
const DEFAULT_LOGIN_URL: &str = "/auth/login/";

/// The signed-in user, attached to the request by `CurrentUserMiddleware`.
///
/// Used as an extractor it guards a route: anonymous requests are answered
/// with a redirect to the login page carrying the requested path as `next`.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    pub id: Uuid,
    pub username: String,
}

impl From<User> for AuthenticatedUser {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            username: user.username,
        }
    }
}

impl AuthenticatedUser {
    pub fn is_author_of(&self, post: &PostEntry) -> bool {
        self.id == post.author_id
    }
}

impl FromRequest for AuthenticatedUser {
    type Error = Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        match req.extensions().get::<AuthenticatedUser>() {
            Some(user) => ready(Ok(user.clone())),
            None => ready(Err(login_required(req).into())),
        }
    }
}

/// Same as [`AuthenticatedUser`] but never rejects.
#[derive(Debug, Clone)]
pub struct MaybeUser(pub Option<AuthenticatedUser>);

impl FromRequest for MaybeUser {
    type Error = Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        ready(Ok(MaybeUser(
            req.extensions().get::<AuthenticatedUser>().cloned(),
        )))
    }
}

pub fn login_required(req: &HttpRequest) -> DomainError {
    let login_url = req
        .app_data::<web::Data<AppConfig>>()
        .map(|config| config.login_url.clone())
        .unwrap_or_else(|| DEFAULT_LOGIN_URL.to_string());
    let next = req
        .uri()
        .path_and_query()
        .map(|pq| pq.as_str().to_string())
        .unwrap_or_else(|| req.path().to_string());
    DomainError::LoginRequired { login_url, next }
}

pub fn redirect(location: impl AsRef<str>) -> HttpResponse {
    HttpResponse::Found()
        .insert_header((LOCATION, location.as_ref()))
        .finish()
}

pub fn request_id(req: &HttpRequest) -> String {
    req.extensions()
        .get::<crate::presentation::middleware::RequestId>()
        .map(|rid| rid.0.clone())
        .unwrap_or_else(|| "unknown".into())
}
