//! API behaviour against in-process requests.

use std::sync::Arc;

use axum::http::{header, StatusCode};
use safe_blog::db::MemoryDatabase;
use safe_blog::session::generate_session_id;
use safe_blog::HttpServer;
use serde_json::json;

mod common;

use common::{get, login_as, post_form, post_json, post_multipart, send, Part, Site};

#[tokio::test]
async fn test_register_login_me_logout() {
    let site = Site::new();
    let router = HttpServer::new(site.config()).router();

    let res = send(&router, get("/api/users/me", None)).await;
    assert_eq!(res.status, StatusCode::UNAUTHORIZED);
    assert_eq!(res.message(), "Login required");

    let cookie = login_as(&router, "alice", "pw").await;
    let res = send(&router, get("/api/users/me", Some(cookie.as_str()))).await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.json()["username"], "alice");
    assert!(res.json().get("password").is_none());

    let res = send(&router, post_json("/api/users/logout", json!({}), Some(cookie.as_str()))).await;
    assert_eq!(res.status, StatusCode::OK);
    let cleared = res.headers.get(header::SET_COOKIE).unwrap().to_str().unwrap();
    assert!(cleared.contains("Max-Age=0"));

    let res = send(&router, get("/api/users/me", Some(cookie.as_str()))).await;
    assert_eq!(res.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_login_response_and_cookie_flags() {
    let site = Site::new();
    let router = HttpServer::new(site.config()).router();
    let creds = json!({ "username": "bob", "password": "pw" });
    send(&router, post_json("/api/users/register", creds.clone(), None)).await;

    let res = send(&router, post_json("/api/users/login", creds, None)).await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.json()["message"], "Login successful");
    assert_eq!(res.json()["user"], json!({ "id": 1, "username": "bob" }));

    let set_cookie = res.headers.get(header::SET_COOKIE).unwrap().to_str().unwrap();
    assert!(set_cookie.contains("HttpOnly"));
    assert!(set_cookie.contains("SameSite=Lax"));
    assert!(set_cookie.contains("Path=/"));
}

#[tokio::test]
async fn test_duplicate_and_blank_registration() {
    let site = Site::new();
    let router = HttpServer::new(site.config()).router();
    let creds = json!({ "username": "alice", "password": "pw" });

    let res = send(&router, post_json("/api/users/register", creds.clone(), None)).await;
    assert_eq!(res.status, StatusCode::CREATED);

    let res = send(&router, post_json("/api/users/register", creds, None)).await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);
    assert_eq!(res.message(), "Username already exists");

    let res = send(
        &router,
        post_json("/api/users/register", json!({ "username": "  " }), None),
    )
    .await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);

    let res = send(
        &router,
        post_json("/api/users/register", json!({ "username": "x".repeat(51), "password": "p" }), None),
    )
    .await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_sql_injection_payloads_do_not_log_in() {
    let site = Site::new();
    let router = HttpServer::new(site.config()).router();
    login_as(&router, "admin", "correct horse").await;

    let payloads = [
        json!({ "username": "admin' -- ", "password": "anything" }),
        json!({ "username": "admin'#", "password": "anything" }),
        json!({ "username": "' OR '1'='1", "password": "' OR '1'='1" }),
        json!({ "username": "admin", "password": "x' OR 'x'='x" }),
    ];
    for payload in payloads {
        let res = send(&router, post_json("/api/users/login", payload.clone(), None)).await;
        assert_eq!(res.status, StatusCode::UNAUTHORIZED, "{}", payload);
        assert_eq!(res.message(), "Invalid username or password");
        assert!(res.session_cookie().is_none());
    }

    // The payload is stored verbatim as a username, not executed.
    let stacked = json!({ "username": "x'); DROP TABLE users; --", "password": "pw" });
    let res = send(&router, post_json("/api/users/register", stacked.clone(), None)).await;
    assert_eq!(res.status, StatusCode::CREATED);
    let res = send(&router, post_json("/api/users/login", stacked, None)).await;
    assert_eq!(res.json()["user"]["username"], "x'); DROP TABLE users; --");

    let res = send(
        &router,
        post_json("/api/users/login", json!({ "username": "admin", "password": "correct horse" }), None),
    )
    .await;
    assert_eq!(res.status, StatusCode::OK);
}

#[tokio::test]
async fn test_urlencoded_credentials_are_accepted() {
    let site = Site::new();
    let router = HttpServer::new(site.config()).router();

    let res = send(&router, post_form("/api/users/register", "username=carol&password=pw", None)).await;
    assert_eq!(res.status, StatusCode::CREATED);
    let res = send(&router, post_form("/api/users/login", "username=carol&password=pw", None)).await;
    assert_eq!(res.status, StatusCode::OK);
    assert!(res.session_cookie().is_some());
}

#[tokio::test]
async fn test_malformed_json_is_bad_request() {
    let site = Site::new();
    let router = HttpServer::new(site.config()).router();
    let req = axum::http::Request::builder()
        .method("POST")
        .uri("/api/users/login")
        .header(header::CONTENT_TYPE, "application/json")
        .body(axum::body::Body::from("{\"username\": "))
        .unwrap();

    let res = send(&router, req).await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);
    assert!(!res.message().is_empty());
}

#[tokio::test]
async fn test_login_rotates_presented_session_id() {
    let site = Site::new();
    let router = HttpServer::new(site.config()).router();
    let first = login_as(&router, "alice", "pw").await;

    // Logging in again while holding a live session issues a different id.
    let res = send(
        &router,
        post_json("/api/users/login", json!({ "username": "alice", "password": "pw" }), Some(first.as_str())),
    )
    .await;
    let second = res.session_cookie().unwrap();
    assert_ne!(first, second);
    assert_eq!(send(&router, get("/api/users/me", Some(first.as_str()))).await.status, StatusCode::UNAUTHORIZED);
    assert_eq!(send(&router, get("/api/users/me", Some(second.as_str()))).await.status, StatusCode::OK);

    // A planted, never-issued id is not adopted.
    let planted = format!("sessionId={}", generate_session_id());
    let res = send(
        &router,
        post_json("/api/users/login", json!({ "username": "alice", "password": "pw" }), Some(planted.as_str())),
    )
    .await;
    assert_ne!(res.session_cookie().unwrap(), planted);
    assert_eq!(send(&router, get("/api/users/me", Some(planted.as_str()))).await.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_posts_are_stored_raw_and_escaped_on_output() {
    let site = Site::new();
    let router = HttpServer::new(site.config()).router();
    let cookie = login_as(&router, "<img src=x onerror=alert(1)>", "pw").await;

    let res = send(
        &router,
        post_multipart(
            "/api/posts",
            &[
                Part::Text("title", "<script>alert('t')</script>"),
                Part::Text("content", "Tom & \"Jerry\""),
            ],
            Some(cookie.as_str()),
        ),
    )
    .await;
    assert_eq!(res.status, StatusCode::CREATED, "{:?}", res.body);
    assert_eq!(res.message(), "Post created");
    let post_id = res.json()["postId"].as_i64().unwrap();

    let list = send(&router, get("/api/posts", None)).await;
    assert_eq!(list.status, StatusCode::OK);
    let entry = &list.json()[0];
    assert_eq!(entry["id"], post_id);
    assert_eq!(entry["title"], "&lt;script&gt;alert(&#039;t&#039;)&lt;/script&gt;");
    assert_eq!(entry["username"], "&lt;img src=x onerror=alert(1)&gt;");
    assert!(entry.get("created_at").is_some());

    let detail = send(&router, get(&format!("/api/posts/{}", post_id), None)).await;
    assert_eq!(detail.status, StatusCode::OK);
    let post = detail.json();
    assert_eq!(post["content"], "Tom &amp; &quot;Jerry&quot;");
    assert_eq!(post["user_id"], 1);
    assert!(post["image_path"].is_null());

    // The session user is returned unescaped: it is the caller's own data.
    let me = send(&router, get("/api/users/me", Some(cookie.as_str()))).await;
    assert_eq!(me.json()["username"], "<img src=x onerror=alert(1)>");
}

#[tokio::test]
async fn test_post_listing_is_newest_first() {
    let site = Site::new();
    let router = HttpServer::new(site.config()).router();
    let cookie = login_as(&router, "alice", "pw").await;

    for title in ["first", "second", "third"] {
        let res = send(
            &router,
            post_multipart(
                "/api/posts",
                &[Part::Text("title", title), Part::Text("content", "body")],
                Some(cookie.as_str()),
            ),
        )
        .await;
        assert_eq!(res.status, StatusCode::CREATED);
    }

    let list = send(&router, get("/api/posts", None)).await.json();
    let titles: Vec<_> = list.as_array().unwrap().iter().map(|p| p["title"].clone()).collect();
    assert_eq!(titles, vec![json!("third"), json!("second"), json!("first")]);
}

#[tokio::test]
async fn test_post_lookup_errors() {
    let site = Site::new();
    let router = HttpServer::new(site.config()).router();

    let res = send(&router, get("/api/posts/999", None)).await;
    assert_eq!(res.status, StatusCode::NOT_FOUND);
    assert_eq!(res.message(), "Post not found");

    for bad in ["abc", "0", "-1", "1%20OR%201=1"] {
        let res = send(&router, get(&format!("/api/posts/{}", bad), None)).await;
        assert_eq!(res.status, StatusCode::BAD_REQUEST, "{}", bad);
        assert_eq!(res.message(), "Invalid post id");
    }
}

#[tokio::test]
async fn test_create_post_validation() {
    let site = Site::new();
    let router = HttpServer::new(site.config()).router();

    let anonymous = post_multipart(
        "/api/posts",
        &[Part::Text("title", "t"), Part::Text("content", "c")],
        None,
    );
    assert_eq!(send(&router, anonymous).await.status, StatusCode::UNAUTHORIZED);

    let cookie = login_as(&router, "alice", "pw").await;
    let missing = post_multipart("/api/posts", &[Part::Text("title", "only title")], Some(cookie.as_str()));
    let res = send(&router, missing).await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);
    assert_eq!(res.message(), "Title and content are required");
}

#[tokio::test]
async fn test_image_upload_is_sanitized_and_served() {
    let site = Site::new();
    let router = HttpServer::new(site.config()).router();
    let cookie = login_as(&router, "alice", "pw").await;

    let res = send(
        &router,
        post_multipart(
            "/api/posts",
            &[
                Part::Text("title", "cat"),
                Part::Text("content", "look"),
                Part::File {
                    name: "image",
                    filename: "../../escape me.PNG",
                    bytes: b"\x89PNG fake image",
                },
            ],
            Some(cookie.as_str()),
        ),
    )
    .await;
    assert_eq!(res.status, StatusCode::CREATED, "{:?}", res.body);
    let post_id = res.json()["postId"].as_i64().unwrap();

    let post = send(&router, get(&format!("/api/posts/{}", post_id), None)).await.json();
    let image_path = post["image_path"].as_str().unwrap().to_string();
    assert!(image_path.starts_with("uploads/"));
    assert!(image_path.ends_with("-escape_me.png"));

    let stored: Vec<_> = std::fs::read_dir(site.uploads()).unwrap().collect();
    assert_eq!(stored.len(), 1);
    assert!(!site.dir.path().join("escape me.PNG").exists());

    let res = send(&router, get(&format!("/{}", image_path), None)).await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(&res.body[..], b"\x89PNG fake image");
    assert_eq!(res.headers.get(header::CONTENT_TYPE).unwrap(), "image/png");
}

#[tokio::test]
async fn test_image_upload_rejections() {
    let site = Site::new();
    let mut config = site.config();
    config.security.max_upload_size = 16;
    let router = HttpServer::new(config).router();
    let cookie = login_as(&router, "alice", "pw").await;

    let upload = |filename: &'static str, bytes: &'static [u8]| {
        post_multipart(
            "/api/posts",
            &[
                Part::Text("title", "t"),
                Part::Text("content", "c"),
                Part::File { name: "image", filename, bytes },
            ],
            Some(cookie.as_str()),
        )
    };

    let res = send(&router, upload("shell.php", b"<?php ?>")).await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);
    assert_eq!(res.message(), "Image type 'php' is not allowed");

    let res = send(&router, upload(".hidden.png", b"x")).await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);

    let res = send(&router, upload("big.png", &[0u8; 64])).await;
    assert_eq!(res.status, StatusCode::PAYLOAD_TOO_LARGE);

    // Nothing was written and no post was created.
    assert!(!site.uploads().exists() || std::fs::read_dir(site.uploads()).unwrap().next().is_none());
    let list = send(&router, get("/api/posts", None)).await.json();
    assert_eq!(list.as_array().unwrap().len(), 0);

    // A named part is checked even when it carries no bytes.
    let res = send(&router, upload("shell.php", b"")).await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);
    assert_eq!(res.message(), "Image type 'php' is not allowed");

    let res = send(&router, upload("empty.png", b"")).await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);
    assert_eq!(res.message(), "Image file is empty");

    // An unnamed file part (no file chosen) is ignored.
    let res = send(&router, upload("", b"")).await;
    assert_eq!(res.status, StatusCode::CREATED);
}

#[tokio::test]
async fn test_comments_flow() {
    let site = Site::new();
    let router = HttpServer::new(site.config()).router();
    let cookie = login_as(&router, "alice", "pw").await;

    let res = send(
        &router,
        post_multipart(
            "/api/posts",
            &[Part::Text("title", "t"), Part::Text("content", "c")],
            Some(cookie.as_str()),
        ),
    )
    .await;
    let post_id = res.json()["postId"].as_i64().unwrap();
    let uri = format!("/api/posts/{}/comments", post_id);

    let res = send(&router, post_json(&uri, json!({ "content": "hi" }), None)).await;
    assert_eq!(res.status, StatusCode::UNAUTHORIZED);

    let res = send(&router, post_json(&uri, json!({ "content": "   " }), Some(cookie.as_str()))).await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);

    for content in ["<b>first</b>", "second"] {
        let res = send(&router, post_json(&uri, json!({ "content": content }), Some(cookie.as_str()))).await;
        assert_eq!(res.status, StatusCode::CREATED);
        assert_eq!(res.message(), "Comment created");
    }

    let list = send(&router, get(&uri, None)).await;
    assert_eq!(list.status, StatusCode::OK);
    let comments = list.json();
    assert_eq!(comments[0]["content"], "&lt;b&gt;first&lt;/b&gt;");
    assert_eq!(comments[1]["content"], "second");
    assert_eq!(comments[0]["username"], "alice");

    let res = send(
        &router,
        post_json("/api/posts/4242/comments", json!({ "content": "orphan" }), Some(cookie.as_str())),
    )
    .await;
    assert_eq!(res.status, StatusCode::NOT_FOUND);

    let empty = send(&router, get("/api/posts/4242/comments", None)).await;
    assert_eq!(empty.json(), json!([]));
}

#[tokio::test]
async fn test_comments_accept_urlencoded_bodies() {
    let site = Site::new();
    let router = HttpServer::new(site.config()).router();
    let cookie = login_as(&router, "alice", "pw").await;

    let res = send(
        &router,
        post_multipart(
            "/api/posts",
            &[Part::Text("title", "t"), Part::Text("content", "c")],
            Some(cookie.as_str()),
        ),
    )
    .await;
    let uri = format!("/api/posts/{}/comments", res.json()["postId"]);

    let res = send(&router, post_form(&uri, "content=nice+%3Cpost%3E", Some(cookie.as_str()))).await;
    assert_eq!(res.status, StatusCode::CREATED);

    let res = send(&router, post_form(&uri, "content=", Some(cookie.as_str()))).await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);

    let comments = send(&router, get(&uri, None)).await.json();
    assert_eq!(comments.as_array().unwrap().len(), 1);
    assert_eq!(comments[0]["content"], "nice &lt;post&gt;");
}

#[tokio::test]
async fn test_anonymous_writes_are_401_before_body_parsing() {
    let site = Site::new();
    let router = HttpServer::new(site.config()).router();
    let cookie = login_as(&router, "alice", "pw").await;
    send(
        &router,
        post_multipart(
            "/api/posts",
            &[Part::Text("title", "t"), Part::Text("content", "c")],
            Some(cookie.as_str()),
        ),
    )
    .await;

    let bare_post = |uri: &str| {
        axum::http::Request::builder()
            .method("POST")
            .uri(uri)
            .body(axum::body::Body::empty())
            .unwrap()
    };

    for uri in ["/api/posts/1/comments", "/api/posts"] {
        let res = send(&router, bare_post(uri)).await;
        assert_eq!(res.status, StatusCode::UNAUTHORIZED, "{}", uri);
        assert_eq!(res.message(), "Login required");
    }

    // Signed in, the same bodiless request is a client error.
    let mut req = bare_post("/api/posts/1/comments");
    req.headers_mut()
        .insert(header::COOKIE, cookie.parse().unwrap());
    assert_eq!(send(&router, req).await.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_store_failure_is_generic_500() {
    let site = Site::new();
    let db = Arc::new(MemoryDatabase::new());
    let router = HttpServer::with_database(site.config(), db.clone()).router();

    db.set_offline(true);
    let res = send(&router, get("/api/posts", None)).await;
    assert_eq!(res.status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(res.message(), "Failed to load posts");

    let res = send(
        &router,
        post_json("/api/users/login", json!({ "username": "a", "password": "b" }), None),
    )
    .await;
    assert_eq!(res.status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(res.message(), "Login failed");
}
