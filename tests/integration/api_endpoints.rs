//! Integration tests for the control plane
//!
//! These tests verify that:
//! - Monitors can be registered, inspected, started, stopped and removed
//! - Supervisor errors map to the right status codes
//! - Authentication middleware functions properly

use std::net::SocketAddr;
use std::sync::Arc;

use reqwest::StatusCode;
use serde_json::{Value, json};
use vigil::api::{
    ApiConfig, ApiState, HealthResponse, MonitorInfo, MonitorsResponse, RegisterResponse,
    spawn_api_server,
};
use vigil::monitor::Status;
use vigil::plugins::Registries;
use vigil::supervisor::Supervisor;

const TOKEN: &str = "test-token";

async fn spawn_test_api() -> (SocketAddr, Arc<Supervisor>) {
    let supervisor = Arc::new(Supervisor::new(Registries::with_builtins().unwrap()));

    let config = ApiConfig {
        bind_addr: "127.0.0.1:0".parse().unwrap(), // Random port
        auth_token: Some(TOKEN.to_string()),
        enable_cors: true,
    };

    let addr = spawn_api_server(config, ApiState::new(Arc::clone(&supervisor)))
        .await
        .unwrap();
    (addr, supervisor)
}

fn definition(name: &str, value: f64) -> Value {
    json!({
        "name": name,
        "probe": {"type": "constant", "params": {"value": value}},
        "actions": [{"type": "log"}],
        "interval": 60,
        "timeout": 5,
        "min": 0.0,
        "max": 10.0,
    })
}

struct Api {
    addr: SocketAddr,
    client: reqwest::Client,
}

impl Api {
    fn new(addr: SocketAddr) -> Self {
        Self {
            addr,
            client: reqwest::Client::new(),
        }
    }

    fn request(&self, method: reqwest::Method, path: &str) -> reqwest::RequestBuilder {
        self.client
            .request(method, format!("http://{}/api/v1{}", self.addr, path))
            .header("Authorization", format!("Bearer {TOKEN}"))
    }

    async fn register(&self, body: Value) -> reqwest::Response {
        self.request(reqwest::Method::POST, "/monitors")
            .json(&body)
            .send()
            .await
            .unwrap()
    }

    async fn monitor(&self, id: u64) -> reqwest::Response {
        self.request(reqwest::Method::GET, &format!("/monitors/{id}"))
            .send()
            .await
            .unwrap()
    }
}

#[tokio::test]
async fn test_health_endpoint_returns_ok() {
    let (addr, _supervisor) = spawn_test_api().await;
    let api = Api::new(addr);

    let response = api
        .request(reqwest::Method::GET, "/health")
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let health: HealthResponse = response.json().await.unwrap();
    assert_eq!(health.status, "ok");
    assert_eq!(health.monitors, 0);
}

#[tokio::test]
async fn test_register_and_inspect_monitor() {
    let (addr, supervisor) = spawn_test_api().await;
    let api = Api::new(addr);

    let response = api.register(definition("web", 1.0)).await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let registered: RegisterResponse = response.json().await.unwrap();
    assert_eq!(
        registered,
        RegisterResponse {
            id: 1,
            name: "web".to_string()
        }
    );

    let response = api.monitor(1).await;
    assert_eq!(response.status(), StatusCode::OK);
    let info: MonitorInfo = response.json().await.unwrap();
    assert_eq!(info.name, "web");
    assert!(info.running);
    assert!(!info.failing);
    assert_eq!(info.probe, "probe:constant:1");
    assert_eq!(info.actions, vec!["action:log"]);

    let list: MonitorsResponse = api
        .request(reqwest::Method::GET, "/monitors")
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(list.count, 1);
    assert_eq!(list.monitors[0].id, 1);

    supervisor.shutdown().await;
}

#[tokio::test]
async fn test_failing_monitor_reports_failed_at() {
    let (addr, supervisor) = spawn_test_api().await;
    let api = Api::new(addr);

    api.register(definition("db", 99.0)).await;

    // the first probe runs right after start
    let mut info: MonitorInfo = api.monitor(1).await.json().await.unwrap();
    for _ in 0..50 {
        if info.failing {
            break;
        }
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        info = api.monitor(1).await.json().await.unwrap();
    }

    assert_eq!(info.status, Status::Failed);
    assert!(info.failing);
    assert!(info.failed_at.is_some());
    assert_eq!(info.times, 1);

    supervisor.shutdown().await;
}

#[tokio::test]
async fn test_stop_and_start_monitor() {
    let (addr, supervisor) = spawn_test_api().await;
    let api = Api::new(addr);
    api.register(definition("web", 1.0)).await;

    let response = api
        .request(reqwest::Method::POST, "/monitors/1/stop")
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let info: MonitorInfo = response.json().await.unwrap();
    assert!(!info.running);
    assert_eq!(info.status, Status::Stopped);

    // stopping twice is fine
    let response = api
        .request(reqwest::Method::POST, "/monitors/1/stop")
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = api
        .request(reqwest::Method::POST, "/monitors/1/start")
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let info: MonitorInfo = response.json().await.unwrap();
    assert!(info.running);

    let response = api
        .request(reqwest::Method::POST, "/monitors/1/start")
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);
    let error: Value = response.json().await.unwrap();
    assert_eq!(error["error"], "monitor is already started");

    supervisor.shutdown().await;
}

#[tokio::test]
async fn test_unregister_monitor() {
    let (addr, supervisor) = spawn_test_api().await;
    let api = Api::new(addr);
    api.register(definition("web", 1.0)).await;

    let response = api
        .request(reqwest::Method::DELETE, "/monitors/1")
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    assert!(supervisor.list().is_empty());

    assert_eq!(api.monitor(1).await.status(), StatusCode::NOT_FOUND);

    // ids are not reused
    let registered: RegisterResponse = api.register(definition("web", 1.0)).await.json().await.unwrap();
    assert_eq!(registered.id, 2);

    supervisor.shutdown().await;
}

#[tokio::test]
async fn test_invalid_definitions_are_bad_requests() {
    let (addr, supervisor) = spawn_test_api().await;
    let api = Api::new(addr);

    let mut unknown_probe = definition("web", 1.0);
    unknown_probe["probe"]["type"] = json!("ping");
    let response = api.register(unknown_probe).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let error: Value = response.json().await.unwrap();
    assert_eq!(error["error"], "probe not found: ping");

    let mut no_actions = definition("web", 1.0);
    no_actions["actions"] = json!([]);
    assert_eq!(api.register(no_actions).await.status(), StatusCode::BAD_REQUEST);

    let response = api.register(json!({"name": "web"})).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    assert!(supervisor.list().is_empty());
}

#[tokio::test]
async fn test_unknown_monitor_is_not_found() {
    let (addr, _supervisor) = spawn_test_api().await;
    let api = Api::new(addr);

    let response = api.monitor(42).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let error: Value = response.json().await.unwrap();
    assert_eq!(error["error"], "monitor not found: 42");
}

#[tokio::test]
async fn test_authentication_is_required() {
    let (addr, _supervisor) = spawn_test_api().await;
    let client = reqwest::Client::new();
    let url = format!("http://{addr}/api/v1/monitors");

    let response = client.get(&url).send().await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = client
        .get(&url)
        .header("Authorization", "Token test-token")
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = client
        .get(&url)
        .header("Authorization", "Bearer wrong-token")
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}
