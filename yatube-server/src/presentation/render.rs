use actix_web::HttpResponse;
use actix_web::http::StatusCode;
use serde::Serialize;
use serde_json::Value;

use crate::domain::error::DomainError;

/// Turns a template name and its context into a response body.
pub trait Renderer: Send + Sync {
    fn render(&self, template: &str, context: &Value) -> Result<String, DomainError>;
    fn content_type(&self) -> &'static str;
}

/// Emits `{"template": ..., "context": ...}` so that clients (and tests) see
/// exactly what a template would have been given.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonRenderer;

#[derive(Serialize)]
struct RenderedPage<'a> {
    template: &'a str,
    context: &'a Value,
}

impl Renderer for JsonRenderer {
    fn render(&self, template: &str, context: &Value) -> Result<String, DomainError> {
        serde_json::to_string(&RenderedPage { template, context })
            .map_err(|e| DomainError::Internal(format!("render {template}: {e}")))
    }

    fn content_type(&self) -> &'static str {
        "application/json"
    }
}

pub fn render(
    renderer: &dyn Renderer,
    template: &str,
    context: Value,
) -> Result<HttpResponse, DomainError> {
    render_with_status(renderer, template, context, StatusCode::OK)
}

pub fn render_with_status(
    renderer: &dyn Renderer,
    template: &str,
    context: Value,
    status: StatusCode,
) -> Result<HttpResponse, DomainError> {
    let body = renderer.render(template, &context)?;
    Ok(HttpResponse::build(status)
        .content_type(renderer.content_type())
        .body(body))
}
