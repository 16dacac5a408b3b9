mod common;

use actix_web::cookie::Cookie;
use actix_web::http::StatusCode;
use actix_web::test;

use common::{TestWorld, location, page};
use yatube_server::presentation::routes::build_app;

fn session_cookie<B>(resp: &actix_web::dev::ServiceResponse<B>) -> Option<Cookie<'static>> {
    resp.response()
        .cookies()
        .find(|c| c.name() == "access_token")
        .map(|c| c.into_owned())
}

#[actix_web::test]
async fn signup_then_login_gives_a_working_session() {
    let world = TestWorld::new();
    let app = test::init_service(build_app(world.state.clone())).await;

    let resp = test::call_service(
        &app,
        test::TestRequest::post()
            .uri("/auth/signup/")
            .set_form([
                ("username", "newbie"),
                ("email", "NewBie@Example.com"),
                ("password", "correct horse battery"),
            ])
            .to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::FOUND);
    assert_eq!(location(&resp), "/");
    assert!(session_cookie(&resp).is_some());

    let resp = test::call_service(
        &app,
        test::TestRequest::post()
            .uri("/auth/login/")
            .set_form([
                ("username", "newbie"),
                ("password", "correct horse battery"),
                ("next", "/new/"),
            ])
            .to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::FOUND);
    assert_eq!(location(&resp), "/new/");
    let cookie = session_cookie(&resp).expect("session cookie");
    assert_eq!(cookie.http_only(), Some(true));

    let resp = test::call_service(
        &app,
        test::TestRequest::get().uri("/new/").cookie(cookie).to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);
}

#[actix_web::test]
async fn wrong_password_shows_the_form_again() {
    let world = TestWorld::new();
    let app = test::init_service(build_app(world.state.clone())).await;

    test::call_service(
        &app,
        test::TestRequest::post()
            .uri("/auth/signup/")
            .set_form([("username", "leo"), ("password", "long enough pw")])
            .to_request(),
    )
    .await;

    let resp = test::call_service(
        &app,
        test::TestRequest::post()
            .uri("/auth/login/")
            .set_form([("username", "leo"), ("password", "nope")])
            .to_request(),
    )
    .await;

    assert_eq!(resp.status(), StatusCode::OK);
    assert!(session_cookie(&resp).is_none());
    let (template, context) = page(resp).await;
    assert_eq!(template, "registration/login.html");
    assert!(context["form"]["errors"]["__all__"].is_array());
}

#[actix_web::test]
async fn login_ignores_offsite_next() {
    let world = TestWorld::new();
    let app = test::init_service(build_app(world.state.clone())).await;

    test::call_service(
        &app,
        test::TestRequest::post()
            .uri("/auth/signup/")
            .set_form([("username", "leo"), ("password", "long enough pw")])
            .to_request(),
    )
    .await;

    let resp = test::call_service(
        &app,
        test::TestRequest::post()
            .uri("/auth/login/")
            .set_form([
                ("username", "leo"),
                ("password", "long enough pw"),
                ("next", "//evil.example/"),
            ])
            .to_request(),
    )
    .await;

    assert_eq!(location(&resp), "/");
}

#[actix_web::test]
async fn duplicate_username_is_a_form_error() {
    let world = TestWorld::new();
    world.user("leo").await;
    let app = test::init_service(build_app(world.state.clone())).await;

    let resp = test::call_service(
        &app,
        test::TestRequest::post()
            .uri("/auth/signup/")
            .set_form([("username", "leo"), ("password", "long enough pw")])
            .to_request(),
    )
    .await;

    assert_eq!(resp.status(), StatusCode::OK);
    let (template, context) = page(resp).await;
    assert_eq!(template, "registration/signup.html");
    assert!(context["form"]["errors"]["username"].is_array());
}

#[actix_web::test]
async fn usernames_taken_by_fixed_routes_are_refused() {
    let world = TestWorld::new();
    let app = test::init_service(build_app(world.state.clone())).await;

    for username in ["auth", "new", "follow", "group"] {
        let resp = test::call_service(
            &app,
            test::TestRequest::post()
                .uri("/auth/signup/")
                .set_form([("username", username), ("password", "long enough pw")])
                .to_request(),
        )
        .await;

        assert_eq!(resp.status(), StatusCode::OK, "{username}");
        assert!(session_cookie(&resp).is_none());
        let (template, context) = page(resp).await;
        assert_eq!(template, "registration/signup.html");
        assert!(context["form"]["errors"]["username"].is_array());
    }
}

#[actix_web::test]
async fn login_page_carries_next() {
    let world = TestWorld::new();
    let app = test::init_service(build_app(world.state.clone())).await;

    let resp = test::call_service(
        &app,
        test::TestRequest::get()
            .uri("/auth/login/?next=/new/")
            .to_request(),
    )
    .await;

    let (template, context) = page(resp).await;
    assert_eq!(template, "registration/login.html");
    assert_eq!(context["next"], "/new/");
}

#[actix_web::test]
async fn logout_clears_the_session() {
    let world = TestWorld::new();
    let leo = world.user("leo").await;
    let app = test::init_service(build_app(world.state.clone())).await;

    let resp = test::call_service(
        &app,
        test::TestRequest::get()
            .uri("/auth/logout/")
            .cookie(world.session(&leo))
            .to_request(),
    )
    .await;

    assert_eq!(resp.status(), StatusCode::FOUND);
    assert_eq!(location(&resp), "/");
    let cookie = session_cookie(&resp).expect("removal cookie");
    assert_eq!(cookie.value(), "");
}

#[actix_web::test]
async fn stale_tokens_are_treated_as_anonymous() {
    let world = TestWorld::new();
    let app = test::init_service(build_app(world.state.clone())).await;

    let resp = test::call_service(
        &app,
        test::TestRequest::get()
            .uri("/new/")
            .cookie(Cookie::new("access_token", "not-a-jwt"))
            .to_request(),
    )
    .await;

    assert_eq!(resp.status(), StatusCode::FOUND);
    assert_eq!(location(&resp), "/auth/login/?next=/new/");
}
