use super::*;
use axum::{body, body::Body, http::Request, response::Response};
use serde_json::json;
use tower::ServiceExt;

async fn test_app(static_dir: Option<&str>) -> (Router, Storage) {
    let storage = Storage::new("sqlite::memory:").await.expect("db");
    let api = ApiContext {
        storage: storage.clone(),
        collection_key: "users".into(),
    };
    (build_router(Arc::new(AppState { api }), static_dir), storage)
}

async fn body_json(response: Response) -> serde_json::Value {
    let bytes = body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body");
    serde_json::from_slice(&bytes).expect("json")
}

fn post_user(name: &str, role: &str) -> Request<Body> {
    Request::post("/api/v1/users")
        .header("content-type", "application/json")
        .body(Body::from(
            json!({
                "name": name,
                "email": format!("{}@example.com", name.to_lowercase()),
                "phone": "555-0100",
                "role": role,
                "status": "active",
            })
            .to_string(),
        ))
        .expect("request")
}

#[test]
fn log_filter_honours_rust_log_and_defaults_to_info() {
    assert_eq!(log_filter(Some("debug".into())).to_string(), "debug");
    assert_eq!(log_filter(None).to_string(), "info");
}

#[tokio::test]
async fn healthz_reports_ok_when_storage_is_ready() {
    let (app, _storage) = test_app(None).await;
    let request = Request::get("/healthz")
        .body(Body::empty())
        .expect("request");
    let response = app.oneshot(request).await.expect("response");
    assert_eq!(response.status(), StatusCode::OK);

    let body = body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body");
    assert_eq!(body.as_ref(), b"ok");
}

#[tokio::test]
async fn empty_collection_lists_as_empty_array() {
    let (app, _storage) = test_app(None).await;
    let response = app
        .oneshot(
            Request::get("/api/v1/users?page=1&limit=5")
                .body(Body::empty())
                .expect("request"),
        )
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[TOTAL_COUNT_HEADER], "0");
    assert_eq!(body_json(response).await, json!([]));
}

#[tokio::test]
async fn list_route_filters_pages_and_reports_total() {
    let (app, _storage) = test_app(None).await;
    for (name, role) in [
        ("Ada", "admin"),
        ("Bob", "viewer"),
        ("Cy", "admin"),
        ("Dee", "admin"),
    ] {
        let response = app
            .clone()
            .oneshot(post_user(name, role))
            .await
            .expect("create");
        assert_eq!(response.status(), StatusCode::CREATED);
    }

    let response = app
        .oneshot(
            Request::get("/api/v1/users?page=2&limit=2&role=admin&sortBy=name&order=desc")
                .body(Body::empty())
                .expect("request"),
        )
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[TOTAL_COUNT_HEADER], "3");
    let body = body_json(response).await;
    let names: Vec<&str> = body
        .as_array()
        .expect("array")
        .iter()
        .filter_map(|user| user["name"].as_str())
        .collect();
    assert_eq!(names, ["Ada"]);
}

#[tokio::test]
async fn item_routes_update_and_delete() {
    let (app, storage) = test_app(None).await;
    let created = body_json(
        app.clone()
            .oneshot(post_user("Ada", "editor"))
            .await
            .expect("create"),
    )
    .await;
    let id = created["id"].as_str().expect("id").to_string();

    let update = Request::put(format!("/api/v1/users/{id}"))
        .header("content-type", "application/json")
        .body(Body::from(json!({ "status": "inactive" }).to_string()))
        .expect("request");
    let response = app.clone().oneshot(update).await.expect("update");
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["status"], "inactive");

    let delete = Request::delete(format!("/api/v1/users/{id}"))
        .body(Body::empty())
        .expect("request");
    let response = app.clone().oneshot(delete).await.expect("delete");
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    assert!(storage.load_users("users").await.expect("load").is_empty());

    let again = Request::delete(format!("/api/v1/users/{id}"))
        .body(Body::empty())
        .expect("request");
    let response = app.oneshot(again).await.expect("delete again");
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_json(response).await["code"], "not_found");
}

#[tokio::test]
async fn create_without_email_is_rejected() {
    let (app, _storage) = test_app(None).await;
    let request = Request::post("/api/v1/users")
        .header("content-type", "application/json")
        .body(Body::from(
            json!({ "name": "Ada", "email": "", "role": "viewer" }).to_string(),
        ))
        .expect("request");
    let response = app.oneshot(request).await.expect("response");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["code"], "validation");
}

#[tokio::test]
async fn static_files_are_served_from_the_dist_directory() {
    let dist = tempfile::tempdir().expect("tempdir");
    std::fs::write(dist.path().join("index.html"), "<h1>Users</h1>").expect("write");
    let dir = dist.path().to_string_lossy().to_string();
    let (app, _storage) = test_app(Some(&dir)).await;

    let response = app
        .oneshot(Request::get("/index.html").body(Body::empty()).expect("request"))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::OK);
    let body = body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body");
    assert_eq!(body.as_ref(), b"<h1>Users</h1>");
}
