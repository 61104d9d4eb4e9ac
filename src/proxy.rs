//! Reverse-proxy shim.
//!
//! Forwards a request to a configured base URL and relays the upstream status
//! and body unchanged. Only `authorization` and `content-type` travel
//! upstream. Bodies that are not JSON come back wrapped as `{ "raw": text }`.

use axum::{
    body::Bytes,
    http::{header, HeaderMap, Method},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::{json, Value};

use crate::config::{
    GatewayConfig, SALES_INVOICE_API_BASE_URL, SPRING_API_BASE_URL, UPSTREAM_API_BASE_URL,
};
use crate::error::AppError;

pub const ALLOWED_METHODS: &str = "GET, POST, PUT, PATCH, DELETE, OPTIONS";
pub const ALLOWED_HEADERS: &str = "authorization, content-type";

/// Which configured upstream a proxy route forwards to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProxyTarget {
    Upstream,
    SalesInvoice,
    Spring,
}

impl ProxyTarget {
    pub fn config_key(&self) -> &'static str {
        match self {
            ProxyTarget::Upstream => UPSTREAM_API_BASE_URL,
            ProxyTarget::SalesInvoice => SALES_INVOICE_API_BASE_URL,
            ProxyTarget::Spring => SPRING_API_BASE_URL,
        }
    }

    pub fn base_url<'a>(&self, config: &'a GatewayConfig) -> Result<&'a str, AppError> {
        let url = match self {
            ProxyTarget::Upstream => &config.upstream_api_base_url,
            ProxyTarget::SalesInvoice => &config.sales_invoice_api_base_url,
            ProxyTarget::Spring => &config.spring_api_base_url,
        };
        url.as_deref().ok_or(AppError::MissingConfig(self.config_key()))
    }
}

/// The parts of an incoming request that are forwarded
#[derive(Debug)]
pub struct ProxyRequest {
    pub method: Method,
    pub path: String,
    pub query: Option<String>,
    pub headers: HeaderMap,
    pub body: Bytes,
}

pub fn target_url(base_url: &str, path: &str, query: Option<&str>) -> String {
    let mut url = format!(
        "{}/{}",
        base_url.trim_end_matches('/'),
        path.trim_start_matches('/')
    );
    if let Some(query) = query.filter(|q| !q.is_empty()) {
        url.push('?');
        url.push_str(query);
    }
    url
}

/// Parse an upstream body as JSON, or wrap it as `{ "raw": text }`.
pub fn relay_body(body: &[u8]) -> Value {
    serde_json::from_slice(body)
        .unwrap_or_else(|_| json!({ "raw": String::from_utf8_lossy(body) }))
}

/// Send `request` to `base_url` and relay the answer.
///
/// Any upstream status is relayed as-is; only transport failures become
/// errors.
pub async fn forward(
    http: &reqwest::Client,
    base_url: &str,
    request: ProxyRequest,
) -> Result<Response, AppError> {
    let url = target_url(base_url, &request.path, request.query.as_deref());
    tracing::debug!("Proxy {} {}", request.method, url);

    let mut builder = http.request(request.method, &url);
    for name in [header::AUTHORIZATION, header::CONTENT_TYPE] {
        if let Some(value) = request.headers.get(&name) {
            builder = builder.header(name, value.clone());
        }
    }
    if !request.body.is_empty() {
        builder = builder.body(request.body);
    }

    let upstream = builder.send().await?;
    let status = upstream.status();
    let body = upstream.bytes().await?;

    tracing::debug!("Proxy {} answered {} ({} bytes)", url, status, body.len());

    // Nothing to wrap; 204/304 must stay bodiless
    if body.is_empty() {
        return Ok(status.into_response());
    }

    Ok((status, Json(relay_body(&body))).into_response())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_target_url_joins_path_and_query() {
        assert_eq!(
            target_url("http://api.local/", "/items/customer", Some("limit=5&offset=10")),
            "http://api.local/items/customer?limit=5&offset=10"
        );
        assert_eq!(
            target_url("http://api.local", "sales-invoice/12", Some("")),
            "http://api.local/sales-invoice/12"
        );
    }

    #[test]
    fn test_relay_body_json_and_raw() {
        assert_eq!(relay_body(br#"{"data":[1,2]}"#), json!({"data": [1, 2]}));
        assert_eq!(relay_body(b"Bad Gateway"), json!({"raw": "Bad Gateway"}));
    }

    #[test]
    fn test_missing_target_names_its_variable() {
        let config = GatewayConfig::default();
        let err = ProxyTarget::SalesInvoice.base_url(&config).unwrap_err();
        assert_eq!(err.to_string(), "SALES_INVOICE_API_BASE_URL is not configured");
    }
}
