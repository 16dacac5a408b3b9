use actix_web::http::header::LOCATION;
use actix_web::{HttpResponse, ResponseError, http::StatusCode};
use serde::Serialize;
use serde_json::json;
use thiserror::Error;

use crate::presentation::urls::login_redirect;

#[derive(Debug, Error)]
pub enum DomainError {
    #[error("user not found: {0}")]
    UserNotFound(String),
    #[error("user already exists: {0}")]
    UserAlreadyExists(String),
    #[error("group not found: {0}")]
    GroupNotFound(String),
    #[error("post not found: {0}")]
    PostNotFound(i64),
    #[error("login required")]
    LoginRequired { login_url: String, next: String },
    #[error("method not allowed")]
    MethodNotAllowed,
    #[error("unauthorized")]
    Unauthorized,
    #[error("bad request: {0}")]
    BadRequest(String),
    #[error("internal error: {0}")]
    Internal(String),
}

impl From<sqlx::Error> for DomainError {
    fn from(err: sqlx::Error) -> Self {
        DomainError::Internal(format!("database error: {err}"))
    }
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    error: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<serde_json::Value>,
}

impl ResponseError for DomainError {
    fn status_code(&self) -> StatusCode {
        match self {
            DomainError::UserNotFound(_)
            | DomainError::GroupNotFound(_)
            | DomainError::PostNotFound(_) => StatusCode::NOT_FOUND,
            DomainError::LoginRequired { .. } => StatusCode::FOUND,
            DomainError::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            DomainError::Unauthorized => StatusCode::UNAUTHORIZED,
            DomainError::UserAlreadyExists(_) => StatusCode::CONFLICT,
            DomainError::BadRequest(_) => StatusCode::BAD_REQUEST,
            DomainError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        match self {
            DomainError::LoginRequired { login_url, next } => {
                return HttpResponse::Found()
                    .insert_header((LOCATION, login_redirect(login_url, next)))
                    .finish();
            }
            DomainError::MethodNotAllowed => {
                return HttpResponse::MethodNotAllowed()
                    .insert_header(("Allow", "POST"))
                    .finish();
            }
            _ => {}
        }

        let message = self.to_string();
        let details = match self {
            DomainError::UserNotFound(resource) | DomainError::GroupNotFound(resource) => {
                Some(json!({ "resource": resource }))
            }
            DomainError::PostNotFound(id) => Some(json!({ "resource": id })),
            _ => None,
        };
        let body = ErrorBody {
            error: message.as_str(),
            details,
        };
        HttpResponse::build(self.status_code()).json(body)
    }
}
