//! HTTP surface tests driven through the router without a listener.

use std::sync::Arc;

use axum::body::{to_bytes, Body};
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use serde_json::Value;
use tempfile::TempDir;
use test_utils::{create_data_dir, CountingDrawer, StaticLoader};
use tower::ServiceExt;
use viz_api::build_router;
use viz_api::config::ServiceConfig;
use viz_api::state::AppState;

struct TestApp {
    _dir: TempDir,
    router: Router,
    drawer: Arc<CountingDrawer>,
}

impl TestApp {
    fn new(names: &[&str]) -> Self {
        let dir = create_data_dir(names);
        let config = ServiceConfig {
            data_dir: dir.path().to_path_buf(),
            ..ServiceConfig::default()
        };
        let drawer = Arc::new(CountingDrawer::new());
        let state =
            AppState::with_collaborators(config, Arc::new(StaticLoader::new()), drawer.clone());
        Self {
            _dir: dir,
            router: build_router(Arc::new(state)),
            drawer,
        }
    }

    async fn send(&self, request: Request<Body>) -> (StatusCode, axum::http::HeaderMap, Vec<u8>) {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, headers, body.to_vec())
    }

    async fn get(&self, uri: &str) -> (StatusCode, axum::http::HeaderMap, Vec<u8>) {
        self.send(Request::get(uri).body(Body::empty()).unwrap()).await
    }

    async fn post_json(&self, uri: &str, body: Value) -> (StatusCode, Value) {
        let request = Request::builder()
            .method(Method::POST)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        let (status, _, body) = self.send(request).await;
        (status, json(&body))
    }

    async fn post(&self, uri: &str) -> (StatusCode, Value) {
        let request = Request::builder()
            .method(Method::POST)
            .uri(uri)
            .body(Body::empty())
            .unwrap();
        let (status, _, body) = self.send(request).await;
        (status, json(&body))
    }
}

fn json(body: &[u8]) -> Value {
    serde_json::from_slice(body).unwrap_or(Value::Null)
}

#[tokio::test]
async fn test_health() {
    let app = TestApp::new(&[]);
    let (status, _, body) = app.get("/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json(&body)["status"], "ok");
}

#[tokio::test]
async fn test_list_and_load_datasets() {
    let app = TestApp::new(&["plt00100", "plt00000", "chk00000"]);

    let (status, _, body) = app.get("/api/datasets").await;
    assert_eq!(status, StatusCode::OK);
    let listing = json(&body);
    assert_eq!(listing["datasets"], serde_json::json!(["plt00000", "plt00100"]));
    assert_eq!(listing["current"], Value::Null);

    let (status, loaded) = app.post("/api/load_dataset?filename=plt00100").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(loaded["name"], "plt00100");
    assert!(loaded["field_count"].as_u64().unwrap() > 0);

    let (_, _, body) = app.get("/api/datasets").await;
    assert_eq!(json(&body)["current"], "plt00100");
}

#[tokio::test]
async fn test_load_dataset_errors() {
    let app = TestApp::new(&["plt00000"]);

    let (status, body) = app.post("/api/load_dataset").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "BadRequest");

    let (status, body) = app.post("/api/load_dataset?filename=..").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "LoadError");
}

#[tokio::test]
async fn test_render_reports_cache_status() {
    let app = TestApp::new(&["plt00000"]);
    app.post("/api/load_dataset?filename=plt00000").await;

    let (status, headers, first) = app.get("/api/slice?field=density&axis=x").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(headers["x-cache"], "MISS");
    assert!(headers.contains_key("x-render-key"));

    let (status, headers, second) = app.get("/api/slice?axis=x&field=density").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(headers["x-cache"], "HIT");
    assert_eq!(first, second);
    assert_eq!(app.drawer.calls(), 1);
}

#[tokio::test]
async fn test_render_without_dataset_conflicts() {
    let app = TestApp::new(&["plt00000"]);
    let (status, _, body) = app.get("/api/slice").await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(json(&body)["error"], "NoDataset");
}

#[tokio::test]
async fn test_unknown_field_is_a_client_error() {
    let app = TestApp::new(&["plt00000"]);
    app.post("/api/load_dataset?filename=plt00000").await;

    let (status, headers, body) = app.get("/api/slice?field=foo%3Abar").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(headers[header::CONTENT_TYPE], "application/json");
    let body = json(&body);
    assert_eq!(body["error"], "UnknownField");
    assert!(body["message"].as_str().unwrap().contains("foo:bar"));
    assert_eq!(app.drawer.calls(), 0);
}

#[tokio::test]
async fn test_export_is_an_attachment() {
    let app = TestApp::new(&["plt00000"]);
    app.post("/api/load_dataset?filename=plt00000").await;

    let (status, headers, _) = app.get("/api/export/current_frame?axis=y").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        headers[header::CONTENT_DISPOSITION],
        "attachment; filename=\"plt00000_gas_density_y.png\""
    );
}

#[tokio::test]
async fn test_fields_and_particle_types() {
    let app = TestApp::new(&["plt00000"]);

    let (status, _, _) = app.get("/api/fields").await;
    assert_eq!(status, StatusCode::CONFLICT);

    app.post("/api/load_dataset?filename=plt00000").await;
    let (status, _, body) = app.get("/api/fields").await;
    assert_eq!(status, StatusCode::OK);
    let fields = json(&body);
    assert!(fields
        .as_array()
        .unwrap()
        .iter()
        .any(|f| f == &serde_json::json!(["gas", "density"])));

    let (_, _, body) = app.get("/api/particle_types").await;
    let types = json(&body);
    assert_eq!(types["particle_types"].as_array().unwrap().len(), 5);
    assert_eq!(
        types["available"],
        serde_json::json!(["CIC_particles", "Sink_particles"])
    );
}

#[tokio::test]
async fn test_playback_endpoints() {
    let app = TestApp::new(&["plt00000"]);

    let (status, body) = app
        .post_json("/api/playback", serde_json::json!({ "playing": true, "fps": 0 }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "InvalidPlayback");

    let (status, body) = app
        .post_json("/api/playback", serde_json::json!({ "playing": true, "fps": 5 }))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["state"], "playing");

    let (status, body) = app
        .post_json("/api/playback", serde_json::json!({ "playing": false }))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["state"], "stopped");

    let (_, _, body) = app.get("/api/playback").await;
    assert_eq!(json(&body)["state"], "stopped");
}

#[tokio::test]
async fn test_cache_stats_and_clear() {
    let app = TestApp::new(&["plt00000"]);
    app.post("/api/load_dataset?filename=plt00000").await;
    app.get("/api/slice").await;
    app.get("/api/slice").await;

    let (status, _, body) = app.get("/api/cache/stats").await;
    assert_eq!(status, StatusCode::OK);
    let stats = json(&body);
    assert_eq!(stats["interactive"]["hits"], 1);
    assert_eq!(stats["interactive"]["misses"], 1);
    assert_eq!(stats["interactive"]["entries"], 1);

    let (status, _) = app.post("/api/cache/clear").await;
    assert_eq!(status, StatusCode::OK);
    let (_, headers, _) = app.get("/api/slice").await;
    assert_eq!(headers["x-cache"], "MISS");
}

#[tokio::test]
async fn test_set_data_dir() {
    let app = TestApp::new(&["plt00000"]);
    let other = create_data_dir(&["plt00700"]);
    app.post("/api/load_dataset?filename=plt00000").await;

    let (status, body) = app
        .post_json(
            "/api/set_data_dir",
            serde_json::json!({ "path": other.path() }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["datasets"], serde_json::json!(["plt00700"]));

    let (status, _, _) = app.get("/api/slice").await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _) = app
        .post_json("/api/set_data_dir", serde_json::json!({ "path": "/no/such/dir" }))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
