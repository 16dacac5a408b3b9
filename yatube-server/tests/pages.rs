mod common;

use actix_web::http::StatusCode;
use actix_web::test;

use common::{TestWorld, page, texts};
use yatube_server::presentation::routes::build_app;

#[actix_web::test]
async fn public_pages_render_their_templates() {
    let world = TestWorld::new();
    let leo = world.user("leo").await;
    let cats = world.group("cats").await;
    let post = world.post(&leo, "first post", Some(&cats)).await;
    let app = test::init_service(build_app(world.state.clone())).await;

    let cases = [
        ("/".to_string(), "index.html"),
        ("/group/cats/".to_string(), "group.html"),
        ("/leo/".to_string(), "profile.html"),
        (format!("/leo/{}/", post.id), "post.html"),
    ];

    for (uri, template) in cases {
        let resp = test::call_service(&app, test::TestRequest::get().uri(&uri).to_request()).await;
        assert_eq!(resp.status(), StatusCode::OK, "{uri}");
        let (rendered, _) = page(resp).await;
        assert_eq!(rendered, template, "{uri}");
    }
}

#[actix_web::test]
async fn unknown_objects_render_the_not_found_page() {
    let world = TestWorld::new();
    let leo = world.user("leo").await;
    let post = world.post(&leo, "mine", None).await;
    world.user("bob").await;
    let app = test::init_service(build_app(world.state.clone())).await;

    let uris = [
        "/group/missing/".to_string(),
        "/nobody/".to_string(),
        "/leo/9999/".to_string(),
        // existing post under the wrong author
        format!("/bob/{}/", post.id),
        "/no/such/page/at/all/".to_string(),
    ];

    for uri in uris {
        let resp = test::call_service(&app, test::TestRequest::get().uri(&uri).to_request()).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND, "{uri}");
        let (template, context) = page(resp).await;
        assert_eq!(template, "misc/404.html");
        assert_eq!(context["path"], uri.as_str());
    }
}

#[actix_web::test]
async fn listings_are_paginated_by_ten() {
    let world = TestWorld::new();
    let leo = world.user("leo").await;
    let cats = world.group("cats").await;
    for n in 0..13 {
        world.post(&leo, &format!("post {n}"), Some(&cats)).await;
    }
    let app = test::init_service(build_app(world.state.clone())).await;

    for base in ["/", "/group/cats/", "/leo/"] {
        let first = test::call_service(&app, test::TestRequest::get().uri(base).to_request()).await;
        let (_, context) = page(first).await;
        assert_eq!(texts(&context).len(), 10, "{base}");
        assert_eq!(texts(&context)[0], "post 12", "{base} newest first");
        assert_eq!(context["page"]["num_pages"], 2);

        let uri = format!("{base}?page=2");
        let second = test::call_service(&app, test::TestRequest::get().uri(&uri).to_request()).await;
        let (_, context) = page(second).await;
        assert_eq!(texts(&context).len(), 3, "{uri}");
        assert_eq!(context["page"]["has_next"], false);
    }
}

#[actix_web::test]
async fn bad_page_numbers_do_not_fail() {
    let world = TestWorld::new();
    let leo = world.user("leo").await;
    for n in 0..13 {
        world.post(&leo, &format!("post {n}"), None).await;
    }
    let app = test::init_service(build_app(world.state.clone())).await;

    for (query, expected) in [("abc", 1), ("0", 1), ("99", 2)] {
        let uri = format!("/leo/?page={query}");
        let resp = test::call_service(&app, test::TestRequest::get().uri(&uri).to_request()).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let (_, context) = page(resp).await;
        assert_eq!(context["page"]["number"], expected, "{uri}");
    }
}

#[actix_web::test]
async fn post_page_shows_author_and_comments() {
    let world = TestWorld::new();
    let leo = world.user("leo").await;
    world.post(&leo, "older", None).await;
    let post = world.post(&leo, "newer", None).await;
    let app = test::init_service(build_app(world.state.clone())).await;

    let uri = format!("/leo/{}/", post.id);
    let resp = test::call_service(&app, test::TestRequest::get().uri(&uri).to_request()).await;
    let (_, context) = page(resp).await;

    assert_eq!(context["post"]["text"], "newer");
    assert_eq!(context["author"]["username"], "leo");
    assert_eq!(context["posts_count"], 2);
    assert_eq!(context["comments"].as_array().map(Vec::len), Some(0));
}

#[actix_web::test]
async fn index_is_served_from_cache_until_cleared() {
    let world = TestWorld::new();
    let leo = world.user("leo").await;
    world.post(&leo, "before", None).await;
    let cache = world.state.cache.clone();
    let app = test::init_service(build_app(world.state.clone())).await;

    let resp = test::call_service(&app, test::TestRequest::get().uri("/").to_request()).await;
    let (_, context) = page(resp).await;
    assert_eq!(texts(&context), vec!["before"]);

    world.post(&leo, "after", None).await;

    let resp = test::call_service(&app, test::TestRequest::get().uri("/").to_request()).await;
    assert_eq!(
        resp.headers().get("x-cache").and_then(|v| v.to_str().ok()),
        Some("HIT")
    );
    let (_, context) = page(resp).await;
    assert_eq!(texts(&context), vec!["before"]);

    // other pages are never cached
    let resp = test::call_service(&app, test::TestRequest::get().uri("/leo/").to_request()).await;
    let (_, context) = page(resp).await;
    assert_eq!(texts(&context).len(), 2);

    cache.clear();

    let resp = test::call_service(&app, test::TestRequest::get().uri("/").to_request()).await;
    let (_, context) = page(resp).await;
    assert_eq!(texts(&context), vec!["after", "before"]);
}

#[actix_web::test]
async fn cache_key_includes_the_query() {
    let world = TestWorld::new();
    let leo = world.user("leo").await;
    for n in 0..11 {
        world.post(&leo, &format!("post {n}"), None).await;
    }
    let app = test::init_service(build_app(world.state.clone())).await;

    let first = test::call_service(&app, test::TestRequest::get().uri("/").to_request()).await;
    let (_, first) = page(first).await;
    let second =
        test::call_service(&app, test::TestRequest::get().uri("/?page=2").to_request()).await;
    let (_, second) = page(second).await;

    assert_eq!(first["page"]["number"], 1);
    assert_eq!(second["page"]["number"], 2);
}

#[actix_web::test]
async fn responses_carry_security_and_tracing_headers() {
    let world = TestWorld::new();
    let app = test::init_service(build_app(world.state.clone())).await;

    let resp = test::call_service(
        &app,
        test::TestRequest::get()
            .uri("/")
            .insert_header(("x-request-id", "req-42"))
            .to_request(),
    )
    .await;

    let header = |name: &str| {
        resp.headers()
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
    };
    assert_eq!(header("x-request-id").as_deref(), Some("req-42"));
    assert_eq!(header("x-content-type-options").as_deref(), Some("nosniff"));
    assert!(header("server-timing").is_some());
}
