use actix_web::cookie::{Cookie, SameSite, time};
use actix_web::{HttpRequest, HttpResponse, web};
use serde_json::json;
use tracing::{info, warn};

use crate::application::auth_service::AuthService;
use crate::domain::error::DomainError;
use crate::presentation::dto::{LoginInput, NextQuery};
use crate::presentation::forms::{FormErrors, SignupForm};
use crate::presentation::render::{Renderer, render};
use crate::presentation::urls::{safe_next, url_path};
use crate::presentation::utils::{SESSION_COOKIE, redirect, request_id};

const INVALID_LOGIN: &str =
    "Please enter a correct username and password. Note that both fields may be case-sensitive.";
const USERNAME_TAKEN: &str = "A user with that username already exists.";

pub async fn login_form(
    renderer: web::Data<dyn Renderer>,
    query: web::Query<NextQuery>,
) -> Result<HttpResponse, DomainError> {
    render(
        renderer.get_ref(),
        "registration/login.html",
        json!({
            "form": { "username": "", "errors": FormErrors::default() },
            "next": query.next,
        }),
    )
}

pub async fn login(
    req: HttpRequest,
    auth: web::Data<AuthService>,
    renderer: web::Data<dyn Renderer>,
    input: web::Form<LoginInput>,
) -> Result<HttpResponse, DomainError> {
    let input = input.into_inner();

    let (user, token) = match auth.login(input.username.trim(), &input.password).await {
        Ok(session) => session,
        Err(DomainError::Unauthorized) => {
            warn!(username = %input.username, "login rejected");
            let mut errors = FormErrors::default();
            errors.add("__all__", INVALID_LOGIN);
            return render(
                renderer.get_ref(),
                "registration/login.html",
                json!({
                    "form": { "username": input.username, "errors": errors },
                    "next": input.next,
                }),
            );
        }
        Err(e) => return Err(e),
    };

    info!(
        request_id = %request_id(&req),
        username = %user.username,
        "user logged in"
    );

    let location = match safe_next(input.next.as_deref()) {
        Some(next) => next.to_string(),
        None => url_path(&req, "index", [""; 0])?,
    };
    let mut response = redirect(location);
    set_session(&mut response, &auth, token)?;
    Ok(response)
}

pub async fn signup_form(renderer: web::Data<dyn Renderer>) -> Result<HttpResponse, DomainError> {
    render(
        renderer.get_ref(),
        "registration/signup.html",
        json!({ "form": { "username": "", "email": "", "errors": FormErrors::default() } }),
    )
}

pub async fn signup(
    req: HttpRequest,
    auth: web::Data<AuthService>,
    renderer: web::Data<dyn Renderer>,
    input: web::Form<SignupForm>,
) -> Result<HttpResponse, DomainError> {
    let rerender = |username: &str, email: &str, errors: FormErrors| {
        render(
            renderer.get_ref(),
            "registration/signup.html",
            json!({ "form": { "username": username, "email": email, "errors": errors } }),
        )
    };

    let form = input.into_inner();
    let (username, email) = (form.username.clone(), form.email.clone().unwrap_or_default());
    let form = match form.clean() {
        Ok(form) => form,
        Err(errors) => return rerender(&username, &email, errors),
    };

    let password = form.password.clone();
    let user = match auth
        .register(form.username.clone(), form.email, form.password)
        .await
    {
        Ok(user) => user,
        Err(DomainError::UserAlreadyExists(_)) => {
            let mut errors = FormErrors::default();
            errors.add("username", USERNAME_TAKEN);
            return rerender(&form.username, &email, errors);
        }
        Err(e) => return Err(e),
    };

    info!(
        request_id = %request_id(&req),
        username = %user.username,
        "user registered"
    );

    let (_, token) = auth.login(&user.username, &password).await?;
    let mut response = redirect(url_path(&req, "index", [""; 0])?);
    set_session(&mut response, &auth, token)?;
    Ok(response)
}

pub async fn logout(req: HttpRequest) -> Result<HttpResponse, DomainError> {
    let mut cookie = Cookie::build(SESSION_COOKIE, "").path("/").finish();
    cookie.make_removal();

    let mut response = redirect(url_path(&req, "index", [""; 0])?);
    response
        .add_cookie(&cookie)
        .map_err(|e| DomainError::Internal(format!("cannot clear session cookie: {e}")))?;
    Ok(response)
}

fn set_session(
    response: &mut HttpResponse,
    auth: &AuthService,
    token: String,
) -> Result<(), DomainError> {
    let cookie = Cookie::build(SESSION_COOKIE, token)
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .max_age(time::Duration::seconds(auth.keys().ttl().num_seconds()))
        .finish();
    response
        .add_cookie(&cookie)
        .map_err(|e| DomainError::Internal(format!("cannot set session cookie: {e}")))
}
