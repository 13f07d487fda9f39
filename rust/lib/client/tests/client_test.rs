//! ApiClient against an in-process axum backend.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use axum::extract::{Multipart, Path, Query, State};
use axum::http::{HeaderMap, Method, StatusCode};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};

use rede_client::*;

async fn spawn(app: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}", addr)
}

fn client(base: &str, token: Option<&str>) -> ApiClient {
    let cell = SharedToken::new();
    if let Some(t) = token {
        cell.set(t);
    }
    ApiClient::new(base, Arc::new(cell)).unwrap()
}

fn auth_header(headers: &HeaderMap) -> Option<String> {
    headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

#[tokio::test]
async fn bearer_header_is_attached() {
    let app = Router::new().route(
        "/auth/me",
        get(|headers: HeaderMap| async move {
            Json(json!({"id": 1, "username": auth_header(&headers)}))
        }),
    );
    let base = spawn(app).await;

    let me = client(&base, Some("abc")).me().await.unwrap();
    assert_eq!(me.username.as_deref(), Some("Bearer abc"));

    let me = client(&base, None).me_with_token("explicit").await.unwrap();
    assert_eq!(me.username.as_deref(), Some("Bearer explicit"));
}

#[tokio::test]
async fn login_is_anonymous() {
    let app = Router::new().route(
        "/auth/login",
        post(|headers: HeaderMap, Json(body): Json<Value>| async move {
            assert!(auth_header(&headers).is_none());
            Json(json!({"access_token": format!("tok-{}", body["email"].as_str().unwrap()), "token_type": "bearer"}))
        }),
    );
    let base = spawn(app).await;

    let resp = client(&base, Some("stale")).login("a@b.c", "pw").await.unwrap();
    assert_eq!(resp.access_token, "tok-a@b.c");
}

#[tokio::test]
async fn posts_sends_page_and_limit() {
    let app = Router::new().route(
        "/posts",
        get(|Query(q): Query<HashMap<String, String>>| async move {
            let page: u64 = q["page"].parse().unwrap();
            let limit: u64 = q["limit"].parse().unwrap();
            Json(json!({"items": [{"id": page * 100 + limit, "created_at": "2024-01-01T00:00:00"}]}))
        }),
    );
    let base = spawn(app).await;

    let page = client(&base, Some("t")).posts(3, 10).await.unwrap();
    assert_eq!(page.items.len(), 1);
    assert_eq!(page.items[0].id, 310);
}

#[tokio::test]
async fn error_status_carries_status_and_body() {
    let app = Router::new().route(
        "/posts/:id",
        get(|Path(_id): Path<u64>| async move {
            (StatusCode::NOT_FOUND, Json(json!({"detail": "Post not found"})))
        }),
    );
    let base = spawn(app).await;

    let err = client(&base, Some("t")).post(9).await.unwrap_err();
    assert_eq!(err.status(), Some(404));
    assert_eq!(err.kind(), ErrorKind::Validation);
    assert_eq!(err.server_message().as_deref(), Some("Post not found"));
    match err {
        ApiError::Status { body, .. } => assert!(body.contains("Post not found")),
        other => panic!("unexpected error: {:?}", other),
    }
}

#[tokio::test]
async fn unauthorized_maps_to_authentication() {
    let app = Router::new().route(
        "/notifications",
        get(|| async { (StatusCode::UNAUTHORIZED, "expired") }),
    );
    let base = spawn(app).await;

    let err = client(&base, Some("old")).notifications().await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Authentication);
}

#[tokio::test]
async fn bare_array_is_a_decode_error() {
    let app = Router::new().route(
        "/notifications",
        get(|| async { Json(json!([{"id": 1, "type": "like", "created_at": "x"}])) }),
    );
    let base = spawn(app).await;

    let err = client(&base, Some("t")).notifications().await.unwrap_err();
    assert!(matches!(err, ApiError::Decode(_)), "got {:?}", err);
    assert_eq!(err.kind(), ErrorKind::Server);
}

#[tokio::test]
async fn unreachable_server_is_connectivity() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let err = client(&format!("http://{}", addr), Some("t"))
        .stories()
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::Network(_)), "got {:?}", err);
    assert_eq!(err.kind(), ErrorKind::Connectivity);
    assert!(err.is_retryable());
}

#[tokio::test]
async fn reactions_use_post_and_delete() {
    type Log = Arc<Mutex<Vec<(Method, String)>>>;
    let log: Log = Arc::new(Mutex::new(Vec::new()));

    async fn record(State(log): State<Log>, method: Method, body: String) -> Json<Value> {
        log.lock().unwrap().push((method, body));
        Json(json!({"message": "ok"}))
    }

    let app = Router::new()
        .route("/posts/:id/reactions", post(record).delete(record))
        .with_state(log.clone());
    let base = spawn(app).await;

    let c = client(&base, Some("t"));
    c.react(5, REACTION_LIKE).await.unwrap();
    c.unreact(5).await.unwrap();

    let log = log.lock().unwrap();
    assert_eq!(log.len(), 2);
    assert_eq!(log[0].0, Method::POST);
    let body: Value = serde_json::from_str(&log[0].1).unwrap();
    assert_eq!(body, json!({"reaction_type": "like"}));
    assert_eq!(log[1].0, Method::DELETE);
    assert!(log[1].1.is_empty());
}

#[tokio::test]
async fn upload_media_sends_multipart_file() {
    let app = Router::new().route(
        "/upload/media",
        post(|mut form: Multipart| async move {
            let mut out = String::new();
            while let Some(field) = form.next_field().await.unwrap() {
                let name = field.name().unwrap_or_default().to_string();
                let file_name = field.file_name().unwrap_or_default().to_string();
                let bytes = field.bytes().await.unwrap();
                out = format!("/uploads/{}-{}-{}", name, file_name, bytes.len());
            }
            Json(json!({"file_path": out}))
        }),
    );
    let base = spawn(app).await;

    let file = MediaFile {
        file_name: "pic.jpg".into(),
        mime: "image/jpeg".into(),
        bytes: vec![1, 2, 3, 4],
    };
    let c = client(&base, Some("t"));
    let resp = c.upload_media(&file).await.unwrap();
    assert_eq!(resp.file_path, "/uploads/file-pic.jpg-4");
    assert_eq!(
        c.media_url(&resp.file_path),
        Some(format!("{}/uploads/file-pic.jpg-4", base))
    );
}

#[test]
fn client_rejects_a_bare_host() {
    let err = ApiClient::new("api.example.com", Arc::new(SharedToken::new())).err();
    assert!(matches!(err, Some(ApiError::InvalidUrl(_))), "got {:?}", err);

    let c = client("http://127.0.0.1:8000/", None);
    assert_eq!(c.base_url(), "http://127.0.0.1:8000");
}
