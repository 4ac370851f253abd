use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    routing::get,
    Json, Router,
};
use serde_json::{json, Value};
use tokio::net::TcpListener;

use proxy_rotator::config::ControllerConfig;
use proxy_rotator::controller::{ClashController, ControllerError, ProxyController};

const SECRET: &str = "s3cret";

#[derive(Clone)]
struct MockClash {
    proxies: Arc<Mutex<HashMap<String, Value>>>,
}

fn authorized(headers: &HeaderMap) -> bool {
    headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .map(|v| v == format!("Bearer {}", SECRET))
        .unwrap_or(false)
}

async fn all_proxies(State(mock): State<MockClash>, headers: HeaderMap) -> Result<Json<Value>, StatusCode> {
    if !authorized(&headers) {
        return Err(StatusCode::UNAUTHORIZED);
    }
    let proxies = mock.proxies.lock().unwrap().clone();
    Ok(Json(json!({ "proxies": proxies })))
}

async fn get_proxy(
    State(mock): State<MockClash>,
    headers: HeaderMap,
    Path(name): Path<String>,
) -> Result<Json<Value>, StatusCode> {
    if !authorized(&headers) {
        return Err(StatusCode::UNAUTHORIZED);
    }
    mock.proxies
        .lock()
        .unwrap()
        .get(&name)
        .cloned()
        .map(Json)
        .ok_or(StatusCode::NOT_FOUND)
}

async fn put_proxy(
    State(mock): State<MockClash>,
    headers: HeaderMap,
    Path(name): Path<String>,
    Json(body): Json<Value>,
) -> StatusCode {
    if !authorized(&headers) {
        return StatusCode::UNAUTHORIZED;
    }
    let mut proxies = mock.proxies.lock().unwrap();
    let Some(group) = proxies.get_mut(&name) else {
        return StatusCode::NOT_FOUND;
    };
    if group["type"] != "Selector" {
        return StatusCode::BAD_REQUEST;
    }
    let node = body["name"].as_str().unwrap_or_default().to_string();
    let members = group["all"].as_array().cloned().unwrap_or_default();
    if !members.iter().any(|m| m == node.as_str()) {
        return StatusCode::BAD_REQUEST;
    }
    group["now"] = Value::String(node);
    StatusCode::NO_CONTENT
}

async fn start_mock() -> (SocketAddr, MockClash) {
    let mut proxies = HashMap::new();
    proxies.insert(
        "🚀 Proxy".to_string(),
        json!({ "type": "Selector", "now": "HK 01", "all": ["HK 01", "JP 02", "US/03"] }),
    );
    proxies.insert(
        "Auto".to_string(),
        json!({ "type": "URLTest", "now": "HK 01", "all": ["HK 01", "JP 02"] }),
    );
    proxies.insert("HK 01".to_string(), json!({ "type": "Shadowsocks", "alive": true }));
    proxies.insert("JP 02".to_string(), json!({ "type": "Vmess", "alive": false }));
    proxies.insert("US/03".to_string(), json!({ "type": "Trojan" }));

    let mock = MockClash {
        proxies: Arc::new(Mutex::new(proxies)),
    };
    let app = Router::new()
        .route("/proxies", get(all_proxies))
        .route("/proxies/{name}", get(get_proxy).put(put_proxy))
        .with_state(mock.clone());

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (addr, mock)
}

fn client(addr: SocketAddr, skip_dead_nodes: bool) -> ClashController {
    ClashController::new(&ControllerConfig {
        address: addr.to_string(),
        secret: Some(SECRET.into()),
        timeout_secs: 5,
        skip_dead_nodes,
    })
    .unwrap()
}

#[tokio::test]
async fn test_current_and_list_nodes() {
    let (addr, _mock) = start_mock().await;

    let all = client(addr, false);
    assert_eq!(all.current_node("🚀 Proxy").await.unwrap(), "HK 01");
    assert_eq!(
        all.list_nodes("🚀 Proxy").await.unwrap(),
        vec!["HK 01", "JP 02", "US/03"]
    );

    let alive_only = client(addr, true);
    assert_eq!(
        alive_only.list_nodes("🚀 Proxy").await.unwrap(),
        vec!["HK 01", "US/03"]
    );
}

#[tokio::test]
async fn test_select_node() {
    let (addr, mock) = start_mock().await;
    let controller = client(addr, true);

    controller.select_node("🚀 Proxy", "US/03").await.unwrap();
    assert_eq!(controller.current_node("🚀 Proxy").await.unwrap(), "US/03");
    assert_eq!(mock.proxies.lock().unwrap()["🚀 Proxy"]["now"], "US/03");
}

#[tokio::test]
async fn test_error_mapping() {
    let (addr, _mock) = start_mock().await;
    let controller = client(addr, false);

    assert_eq!(
        controller.current_node("Missing").await,
        Err(ControllerError::GroupNotFound("Missing".into()))
    );
    assert!(matches!(
        controller.select_node("Auto", "JP 02").await,
        Err(ControllerError::NotSelectable(_))
    ));

    let anonymous = ClashController::new(&ControllerConfig {
        address: format!("http://{}", addr),
        secret: None,
        timeout_secs: 5,
        skip_dead_nodes: false,
    })
    .unwrap();
    assert!(matches!(
        anonymous.current_node("🚀 Proxy").await,
        Err(ControllerError::Status { status: 401, .. })
    ));
}

#[tokio::test]
async fn test_unreachable_controller() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let result = client(addr, false).current_node("🚀 Proxy").await;
    assert!(matches!(result, Err(ControllerError::Transport(_))));
}
