//! In-process fake of the data API and proxy targets.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use axum::{
    extract::{Path, Query, RawQuery, State},
    http::{HeaderMap, Method, StatusCode},
    response::{IntoResponse, Response},
    routing::{any, get},
    Json, Router,
};
use serde_json::{json, Value};
use tokio::net::TcpListener;

use vos_gateway::GatewayConfig;

/// Serve `router` on an ephemeral port and return its base URL.
pub async fn spawn(router: Router) -> String {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind test listener");
    let addr = listener.local_addr().expect("Listener has no address");

    tokio::spawn(async move {
        axum::serve(listener, router).await.expect("Test server failed");
    });

    format!("http://{}", addr)
}

/// Start the gateway with `config` and return its base URL.
pub async fn spawn_gateway(config: GatewayConfig) -> String {
    spawn(vos_gateway::app(config).expect("Failed to build gateway")).await
}

#[derive(Default)]
pub struct FakeUpstream {
    collections: HashMap<String, Vec<Value>>,
    /// collection -> (first failing zero-based page, status)
    failures: HashMap<String, (usize, u16)>,
    hits: Mutex<HashMap<String, usize>>,
    cache_headers: Mutex<Vec<String>>,
}

impl FakeUpstream {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_collection(mut self, name: &str, rows: Vec<Value>) -> Self {
        self.collections.insert(name.to_string(), rows);
        self
    }

    pub fn failing_from(mut self, name: &str, page: usize, status: u16) -> Self {
        self.failures.insert(name.to_string(), (page, status));
        self
    }

    pub async fn start(self) -> (String, Arc<FakeUpstream>) {
        let fake = Arc::new(self);

        let router = Router::new()
            .route("/items/:collection", get(items))
            .route("/echo/*path", any(echo))
            .route("/status/:code", any(status))
            .route("/text", any(text))
            .with_state(fake.clone());

        (spawn(router).await, fake)
    }

    pub fn hits(&self, collection: &str) -> usize {
        self.hits
            .lock()
            .unwrap()
            .get(collection)
            .copied()
            .unwrap_or(0)
    }

    pub fn cache_headers(&self) -> Vec<String> {
        self.cache_headers.lock().unwrap().clone()
    }
}

async fn items(
    State(fake): State<Arc<FakeUpstream>>,
    Path(collection): Path<String>,
    Query(params): Query<HashMap<String, String>>,
    headers: HeaderMap,
) -> Response {
    *fake.hits.lock().unwrap().entry(collection.clone()).or_insert(0) += 1;
    if let Some(value) = headers.get("cache-control").and_then(|v| v.to_str().ok()) {
        fake.cache_headers.lock().unwrap().push(value.to_string());
    }

    let limit: usize = params.get("limit").and_then(|v| v.parse().ok()).unwrap_or(100);
    let offset: usize = match (params.get("offset"), params.get("page")) {
        (Some(offset), _) => offset.parse().unwrap_or(0),
        (None, Some(page)) => (page.parse::<usize>().unwrap_or(1).max(1) - 1) * limit,
        (None, None) => 0,
    };

    if let Some((failing_page, status)) = fake.failures.get(&collection) {
        if offset / limit.max(1) >= *failing_page {
            let status = StatusCode::from_u16(*status).unwrap();
            return (status, Json(json!({"errors": [{"message": "upstream unavailable"}]})))
                .into_response();
        }
    }

    let Some(rows) = fake.collections.get(&collection) else {
        return (
            StatusCode::FORBIDDEN,
            Json(json!({"errors": [{"message": "You don't have permission to access this."}]})),
        )
            .into_response();
    };

    let page: Vec<Value> = rows.iter().skip(offset).take(limit).cloned().collect();
    Json(json!({ "data": page })).into_response()
}

async fn echo(
    method: Method,
    Path(path): Path<String>,
    RawQuery(query): RawQuery,
    headers: HeaderMap,
    body: String,
) -> Json<Value> {
    let header = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
    };

    Json(json!({
        "method": method.as_str(),
        "path": path,
        "query": query,
        "authorization": header("authorization"),
        "content_type": header("content-type"),
        "x_custom": header("x-custom"),
        "body": body,
    }))
}

async fn status(Path(code): Path<u16>) -> Response {
    let status = StatusCode::from_u16(code).unwrap();
    (status, Json(json!({ "status": code, "nested": { "ok": false } }))).into_response()
}

async fn text() -> Response {
    (StatusCode::BAD_GATEWAY, "upstream says hi").into_response()
}

/// `count` customer rows with sequential ids.
pub fn numbered_rows(count: usize) -> Vec<Value> {
    (1..=count)
        .map(|i| json!({ "id": i, "customer_code": format!("C{}", i), "customer_name": format!("Customer {}", i) }))
        .collect()
}

pub fn config_for(data_api: &str) -> GatewayConfig {
    GatewayConfig {
        data_api_base_url: Some(data_api.to_string()),
        ..GatewayConfig::default()
    }
}
