//! Integration test: boots an in-process axum server that stands in for the
//! REST API and drives a real [`RestPushApi`] against it.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::State;
use axum::http::HeaderMap;
use axum::routing::post;
use axum::{Json, Router};
use serde_json::{json, Value};
use tether_domain::config::{ClientConfig, Installation, PushConfig};
use tether_domain::error::Error;
use tether_rest::{PushApi, RestPushApi, APP_ID_HEADER, APP_KEY_HEADER};
use tokio::net::TcpListener;
use tokio::sync::Mutex;

/// A request captured by the mock server.
#[derive(Debug, Clone)]
struct Captured {
    path: &'static str,
    app_id: Option<String>,
    app_key: Option<String>,
    body: Value,
}

type Log = Arc<Mutex<Vec<Captured>>>;

fn header(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::to_owned)
}

async fn installations(
    State(log): State<Log>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Json<Value> {
    log.lock().await.push(Captured {
        path: "/1.1/installations",
        app_id: header(&headers, APP_ID_HEADER),
        app_key: header(&headers, APP_KEY_HEADER),
        body: body.clone(),
    });
    if body["installationId"] == "rejected" {
        return Json(json!({ "code": 142, "error": "installation rejected" }));
    }
    Json(json!({ "objectId": "obj-1", "createdAt": "2024-01-01T00:00:00Z" }))
}

async fn push(State(log): State<Log>, headers: HeaderMap, Json(body): Json<Value>) -> Json<Value> {
    log.lock().await.push(Captured {
        path: "/1.1/push",
        app_id: header(&headers, APP_ID_HEADER),
        app_key: header(&headers, APP_KEY_HEADER),
        body,
    });
    Json(json!({ "objectId": "push-1" }))
}

async fn start_mock_api() -> (SocketAddr, Log) {
    let log: Log = Arc::new(Mutex::new(Vec::new()));
    let app = Router::new()
        .route("/1.1/installations", post(installations))
        .route("/1.1/push", post(push))
        .with_state(log.clone());

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (addr, log)
}

fn config(addr: SocketAddr, installation_id: &str) -> ClientConfig {
    PushConfig {
        app_id: "test-app".into(),
        app_key: "test-key".into(),
        installation: Installation::new(installation_id),
        secure: false,
        host: Some(addr.to_string()),
        ..Default::default()
    }
    .validate()
    .unwrap()
}

#[tokio::test]
async fn save_installation_posts_descriptor_with_identity_headers() {
    let (addr, log) = start_mock_api().await;
    let cfg = config(addr, "device-1");
    let api = RestPushApi::new(&cfg).unwrap();
    assert_eq!(api.base_url(), format!("http://{addr}/1.1"));

    let body = api.save_installation(cfg.installation()).await.unwrap();
    assert_eq!(body["objectId"], "obj-1");

    let log = log.lock().await;
    assert_eq!(log.len(), 1);
    assert_eq!(log[0].path, "/1.1/installations");
    assert_eq!(log[0].app_id.as_deref(), Some("test-app"));
    assert_eq!(log[0].app_key.as_deref(), Some("test-key"));
    assert_eq!(
        log[0].body,
        json!({ "installationId": "device-1", "deviceType": "web" })
    );
}

#[tokio::test]
async fn error_body_becomes_server_error_with_code() {
    let (addr, _log) = start_mock_api().await;
    let cfg = config(addr, "rejected");
    let api = RestPushApi::new(&cfg).unwrap();

    let err = api.save_installation(cfg.installation()).await.unwrap_err();
    assert_eq!(err.code(), Some(142));
    assert!(
        matches!(err, Error::Server { ref message, .. } if message == "installation rejected"),
        "got {err:?}"
    );
}

#[tokio::test]
async fn send_push_forwards_options_verbatim() {
    let (addr, log) = start_mock_api().await;
    let cfg = config(addr, "device-1");
    let api = RestPushApi::new(&cfg).unwrap();

    let options = json!({ "channels": ["news"], "data": { "alert": "hi" } });
    let body = api.send_push(options.clone()).await.unwrap();
    assert_eq!(body["objectId"], "push-1");

    let log = log.lock().await;
    assert_eq!(log[0].path, "/1.1/push");
    assert_eq!(log[0].body, options);
}

#[tokio::test]
async fn channel_subscription_bodies() {
    let (addr, log) = start_mock_api().await;
    let cfg = config(addr, "device-1");
    let api = RestPushApi::new(&cfg).unwrap();

    api.subscribe_channels(cfg.installation(), vec!["news".into()])
        .await
        .unwrap();
    api.unsubscribe_channels(cfg.installation(), vec!["news".into()])
        .await
        .unwrap();

    let log = log.lock().await;
    assert_eq!(log.len(), 2);
    assert_eq!(
        log[0].body,
        json!({ "installationId": "device-1", "deviceType": "web", "channels": ["news"] })
    );
    assert_eq!(
        log[1].body["channels"],
        json!({ "__op": "Remove", "objects": ["news"] })
    );
}

#[tokio::test]
async fn unreachable_host_is_http_error() {
    // Bind then drop to get a port nobody listens on.
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let cfg = config(addr, "device-1");
    let api = RestPushApi::new(&cfg).unwrap();
    let err = api.send_push(json!({})).await.unwrap_err();
    assert!(matches!(err, Error::Http(_) | Error::Timeout(_)), "got {err:?}");
}
