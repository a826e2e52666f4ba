use std::sync::Arc;

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    Router,
};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;

use folio::config::Config;
use folio::AppState;

struct TestApp {
    router: Router,
    pool: folio::DbPool,
    _uploads: tempfile::TempDir,
}

async fn setup() -> TestApp {
    let uploads = tempfile::tempdir().unwrap();
    let mut config = Config::default();
    config.uploads.dir = uploads.path().to_path_buf();

    let pool = folio::db::open_in_memory().await.unwrap();
    folio::api::auth::ensure_admin_user(&pool, "secret", false)
        .await
        .unwrap();

    let state = Arc::new(AppState::new(config, pool.clone()));
    TestApp {
        router: folio::api::create_router(state),
        pool,
        _uploads: uploads,
    }
}

async fn send(
    app: &TestApp,
    method: &str,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }

    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, value)
}

async fn login(app: &TestApp, username: &str, password: &str) -> String {
    let (status, body) = send(
        app,
        "POST",
        "/api/auth/login",
        None,
        Some(json!({ "username": username, "password": password })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "login failed: {}", body);
    body["token"].as_str().unwrap().to_string()
}

fn titles(page: &Value) -> Vec<(String, i64)> {
    page["contents"]
        .as_array()
        .unwrap()
        .iter()
        .map(|c| {
            (
                c["title"].as_str().unwrap_or_default().to_string(),
                c["position"].as_i64().unwrap(),
            )
        })
        .collect()
}

#[tokio::test]
async fn test_health() {
    let app = setup().await;
    let response = app
        .router
        .clone()
        .oneshot(Request::get("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_login_sets_cookie_and_me_works() {
    let app = setup().await;

    let request = Request::post("/api/auth/login")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(
            json!({ "username": "admin", "password": "secret" }).to_string(),
        ))
        .unwrap();
    let response = app.router.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let cookie = response
        .headers()
        .get(header::SET_COOKIE)
        .unwrap()
        .to_str()
        .unwrap()
        .to_string();
    assert!(cookie.starts_with("folio_session="));
    assert!(cookie.contains("HttpOnly"));

    let session = cookie.split(';').next().unwrap().to_string();
    let request = Request::get("/api/auth/me")
        .header(header::COOKIE, session)
        .body(Body::empty())
        .unwrap();
    let response = app.router.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = response.into_body().collect().await.unwrap().to_bytes();
    let me: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(me["username"], "admin");
    assert_eq!(me["is_admin"], true);
}

#[tokio::test]
async fn test_bad_credentials_and_missing_session() {
    let app = setup().await;

    let (status, body) = send(
        &app,
        "POST",
        "/api/auth/login",
        None,
        Some(json!({ "username": "admin", "password": "wrong" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"]["code"], "unauthorized");

    let (status, _) = send(&app, "GET", "/api/auth/me", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = send(
        &app,
        "POST",
        "/api/pages/1/contents",
        None,
        Some(json!({ "type": "text" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = send(&app, "POST", "/api/auth/logout", None, None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn test_logout_ends_session() {
    let app = setup().await;
    let token = login(&app, "admin", "secret").await;

    let (status, _) = send(&app, "POST", "/api/auth/logout", Some(&token), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = send(&app, "GET", "/api/auth/me", Some(&token), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_content_ordering_flow() {
    let app = setup().await;
    let token = login(&app, "admin", "secret").await;

    let (status, page) = send(
        &app,
        "POST",
        "/api/pages",
        Some(&token),
        Some(json!({ "title": "Diensten" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let page_id = page["id"].as_i64().unwrap();

    // A, B, C at the bottom, then title them
    let mut ids = Vec::new();
    for title in ["A", "B", "C"] {
        let (status, content) = send(
            &app,
            "POST",
            &format!("/api/pages/{}/contents", page_id),
            Some(&token),
            Some(json!({ "type": "text" })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        let id = content["id"].as_i64().unwrap();

        let (status, _) = send(
            &app,
            "PUT",
            &format!("/api/pages/{}/contents/{}", page_id, id),
            Some(&token),
            Some(json!({ "title": title })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        ids.push(id);
    }

    let (_, view) = send(&app, "GET", &format!("/api/pages/{}", page_id), None, None).await;
    assert_eq!(
        titles(&view),
        vec![("A".into(), 1), ("B".into(), 2), ("C".into(), 3)]
    );

    // Delete B, then move C up
    let (status, _) = send(
        &app,
        "DELETE",
        &format!("/api/pages/{}/contents/{}", page_id, ids[1]),
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, body) = send(
        &app,
        "POST",
        &format!("/api/pages/{}/contents/{}/move-up", page_id, ids[2]),
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["outcome"], "moved");

    let (_, view) = send(&app, "GET", &format!("/api/pages/{}", page_id), None, None).await;
    assert_eq!(titles(&view), vec![("C".into(), 1), ("A".into(), 2)]);

    // First item up is a no-op
    let (status, body) = send(
        &app,
        "POST",
        &format!("/api/pages/{}/contents/{}/move-up", page_id, ids[2]),
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["outcome"], "unchanged");

    // Insert at the top
    let (status, top) = send(
        &app,
        "POST",
        &format!("/api/pages/{}/contents", page_id),
        Some(&token),
        Some(json!({ "type": "image", "anchor": "top" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(top["position"], 1);
    assert_eq!(top["type"], "image");

    let (_, view) = send(&app, "GET", &format!("/api/pages/{}", page_id), None, None).await;
    let positions: Vec<i64> = titles(&view).into_iter().map(|(_, p)| p).collect();
    assert_eq!(positions, vec![1, 2, 3]);
}

#[tokio::test]
async fn test_content_of_another_page_is_not_found() {
    let app = setup().await;
    let token = login(&app, "admin", "secret").await;

    let (_, home) = send(&app, "POST", "/api/pages", Some(&token), Some(json!({ "title": "Home" }))).await;
    let (_, other) = send(&app, "POST", "/api/pages", Some(&token), Some(json!({ "title": "Other" }))).await;
    let home_id = home["id"].as_i64().unwrap();
    let other_id = other["id"].as_i64().unwrap();

    let (_, content) = send(
        &app,
        "POST",
        &format!("/api/pages/{}/contents", home_id),
        Some(&token),
        Some(json!({ "type": "text" })),
    )
    .await;
    let content_id = content["id"].as_i64().unwrap();

    for (method, suffix) in [("DELETE", ""), ("POST", "/move-down"), ("PUT", "")] {
        let (status, body) = send(
            &app,
            method,
            &format!("/api/pages/{}/contents/{}{}", other_id, content_id, suffix),
            Some(&token),
            (method == "PUT").then(|| json!({ "title": "Hijacked" })),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND, "{} {}", method, suffix);
        assert_eq!(body["error"]["code"], "not_found");
    }

    let (_, view) = send(&app, "GET", &format!("/api/pages/{}", home_id), None, None).await;
    assert_eq!(view["contents"][0]["position"], 1);
    assert_ne!(view["contents"][0]["title"], "Hijacked");
}

#[tokio::test]
async fn test_page_moves_require_admin() {
    let app = setup().await;
    let admin = login(&app, "admin", "secret").await;

    let (status, _) = send(
        &app,
        "POST",
        "/api/users",
        Some(&admin),
        Some(json!({ "username": "editor", "password": "editor-pw" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let editor = login(&app, "editor", "editor-pw").await;

    let (_, first) = send(&app, "POST", "/api/pages", Some(&admin), Some(json!({ "title": "First" }))).await;
    let (_, second) = send(&app, "POST", "/api/pages", Some(&admin), Some(json!({ "title": "Second" }))).await;
    let second_id = second["id"].as_i64().unwrap();

    let (status, body) = send(
        &app,
        "POST",
        &format!("/api/pages/{}/move-up", second_id),
        Some(&editor),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"]["code"], "forbidden");

    let (_, menu) = send(&app, "GET", "/api/pages", None, None).await;
    assert_eq!(menu[0]["id"], first["id"]);

    let (status, body) = send(
        &app,
        "POST",
        &format!("/api/pages/{}/move-up", second_id),
        Some(&admin),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["outcome"], "moved");

    let (_, menu) = send(&app, "GET", "/api/pages", None, None).await;
    assert_eq!(menu[0]["id"], second["id"]);
    assert_eq!(menu[1]["id"], first["id"]);

    // Editors can still work on sections
    let (status, _) = send(
        &app,
        "POST",
        &format!("/api/pages/{}/contents", second_id),
        Some(&editor),
        Some(json!({ "type": "text", "anchor": "bottom" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, _) = send(&app, "POST", "/api/pages", Some(&editor), Some(json!({ "title": "Nope" }))).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_builtin_admin_is_protected() {
    let app = setup().await;
    let admin = login(&app, "admin", "secret").await;

    let (_, created) = send(
        &app,
        "POST",
        "/api/users",
        Some(&admin),
        Some(json!({ "username": "beheer", "password": "beheer-pw", "is_admin": true })),
    )
    .await;
    assert_eq!(created["is_admin"], true);
    let other_admin = login(&app, "beheer", "beheer-pw").await;

    let admin_id: i64 = sqlx::query_scalar("SELECT id FROM users WHERE username = 'admin'")
        .fetch_one(&app.pool)
        .await
        .unwrap();

    let (status, _) = send(
        &app,
        "DELETE",
        &format!("/api/users/{}", admin_id),
        Some(&other_admin),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = send(
        &app,
        "PUT",
        &format!("/api/users/{}", admin_id),
        Some(&other_admin),
        Some(json!({ "password": "taken-over" })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = send(
        &app,
        "PUT",
        &format!("/api/users/{}", admin_id),
        Some(&admin),
        Some(json!({ "username": "root" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "validation_error");

    let (status, _) = send(
        &app,
        "PUT",
        &format!("/api/users/{}", admin_id),
        Some(&admin),
        Some(json!({ "password": "new-secret" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    login(&app, "admin", "new-secret").await;
}

#[tokio::test]
async fn test_settings_are_public_and_validated() {
    let app = setup().await;
    let admin = login(&app, "admin", "secret").await;

    let (status, settings) = send(&app, "GET", "/api/settings", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(settings["menu_alignment"], "center");

    let (status, body) = send(
        &app,
        "PUT",
        "/api/settings",
        Some(&admin),
        Some(json!({ "header_bg": "not-a-color" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"]["details"]["header_bg"].is_array());

    let (status, settings) = send(
        &app,
        "PUT",
        "/api/settings",
        Some(&admin),
        Some(json!({ "header_bg": "#123", "font_page_title": 40 })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(settings["header_bg"], "#123");
    assert_eq!(settings["font_page_title"], 40);
    assert_eq!(settings["site_title"], "My Website");
}

#[tokio::test]
async fn test_banner_upload() {
    let app = setup().await;
    let admin = login(&app, "admin", "secret").await;

    let (_, page) = send(&app, "POST", "/api/pages", Some(&admin), Some(json!({ "title": "Home" }))).await;
    let page_id = page["id"].as_i64().unwrap();

    let upload = |filename: &str| {
        let boundary = "folio-test-boundary";
        let body = format!(
            "--{b}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{f}\"\r\nContent-Type: application/octet-stream\r\n\r\nimage-bytes\r\n--{b}--\r\n",
            b = boundary,
            f = filename
        );
        Request::post(format!("/api/pages/{}/banner", page_id))
            .header(header::AUTHORIZATION, format!("Bearer {}", admin))
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={}", boundary),
            )
            .body(Body::from(body))
            .unwrap()
    };

    let response = app.router.clone().oneshot(upload("evil.exe")).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app.router.clone().oneshot(upload("banner.png")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = response.into_body().collect().await.unwrap().to_bytes();
    let page: Value = serde_json::from_slice(&body).unwrap();
    let path = page["banner_path"].as_str().unwrap().to_string();
    assert!(path.starts_with("/uploads/") && path.ends_with(".png"));

    let response = app
        .router
        .clone()
        .oneshot(Request::get(path.as_str()).body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let served = response.into_body().collect().await.unwrap().to_bytes();
    assert_eq!(&served[..], b"image-bytes");
}

#[tokio::test]
async fn test_bulk_save_never_writes_positions() {
    let app = setup().await;
    let token = login(&app, "admin", "secret").await;

    let (_, home) = send(&app, "POST", "/api/pages", Some(&token), Some(json!({ "title": "Home" }))).await;
    let (_, other) = send(&app, "POST", "/api/pages", Some(&token), Some(json!({ "title": "Other" }))).await;
    let home_id = home["id"].as_i64().unwrap();
    let other_id = other["id"].as_i64().unwrap();

    let mut ids = Vec::new();
    for page_id in [home_id, home_id, other_id] {
        let (_, content) = send(
            &app,
            "POST",
            &format!("/api/pages/{}/contents", page_id),
            Some(&token),
            Some(json!({ "type": "text" })),
        )
        .await;
        ids.push(content["id"].as_i64().unwrap());
    }

    let (status, page) = send(
        &app,
        "PUT",
        &format!("/api/pages/{}/contents", home_id),
        Some(&token),
        Some(json!({
            "title": "Welkom",
            "contents": [
                { "id": ids[0], "title": "First", "position": 9 },
                { "id": ids[1], "title": "Second", "price": 12.5 },
                { "id": ids[2], "title": "Elsewhere" }
            ]
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(page["title"], "Welkom");
    assert_eq!(
        titles(&page),
        vec![("First".into(), 1), ("Second".into(), 2)]
    );
    assert_eq!(page["contents"][1]["price"], 12.5);

    let (_, other_view) = send(&app, "GET", &format!("/api/pages/{}", other_id), None, None).await;
    assert_ne!(other_view["contents"][0]["title"], "Elsewhere");
}

#[tokio::test]
async fn test_unrecognised_anchor_inserts_at_bottom() {
    let app = setup().await;
    let token = login(&app, "admin", "secret").await;

    let (_, page) = send(
        &app,
        "POST",
        "/api/pages",
        Some(&token),
        Some(json!({ "title": "Prijzen" })),
    )
    .await;
    let page_uri = format!("/api/pages/{}", page["id"].as_i64().unwrap());

    let mut inserted = Vec::new();
    for anchor in [json!("top"), json!(1), json!("sideways"), json!({ "at": "top" })] {
        let (status, content) = send(
            &app,
            "POST",
            &format!("{}/contents", page_uri),
            Some(&token),
            Some(json!({ "type": "text", "anchor": anchor })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED, "anchor {}", anchor);
        inserted.push(content["id"].as_i64().unwrap());
    }

    let (_, view) = send(&app, "GET", &page_uri, None, None).await;
    let order: Vec<(i64, i64)> = view["contents"]
        .as_array()
        .unwrap()
        .iter()
        .map(|c| (c["id"].as_i64().unwrap(), c["position"].as_i64().unwrap()))
        .collect();
    let expected: Vec<(i64, i64)> = inserted.iter().copied().zip(1..).collect();
    assert_eq!(order, expected);
}
