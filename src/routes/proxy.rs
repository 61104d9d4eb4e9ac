//! Proxy route handlers
//!
//! `OPTIONS` is answered by the CORS layer in front of these handlers, so a
//! preflight succeeds even when the target base URL is not configured.

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{Path, RawQuery, State},
    http::{HeaderMap, Method},
    response::Response,
};

use crate::error::AppError;
use crate::proxy::{forward, ProxyRequest, ProxyTarget};
use crate::state::AppState;

/// ANY /api/proxy/*path
pub async fn upstream(
    State(state): State<Arc<AppState>>,
    method: Method,
    Path(path): Path<String>,
    RawQuery(query): RawQuery,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, AppError> {
    relay(&state, ProxyTarget::Upstream, method, path, query, headers, body).await
}

/// ANY /api/sales-invoice/*path
pub async fn sales_invoice(
    State(state): State<Arc<AppState>>,
    method: Method,
    Path(path): Path<String>,
    RawQuery(query): RawQuery,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, AppError> {
    relay(&state, ProxyTarget::SalesInvoice, method, path, query, headers, body).await
}

/// ANY /spring/*path
pub async fn spring(
    State(state): State<Arc<AppState>>,
    method: Method,
    Path(path): Path<String>,
    RawQuery(query): RawQuery,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, AppError> {
    relay(&state, ProxyTarget::Spring, method, path, query, headers, body).await
}

async fn relay(
    state: &AppState,
    target: ProxyTarget,
    method: Method,
    path: String,
    query: Option<String>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, AppError> {
    let base_url = target.base_url(&state.config)?;

    forward(
        &state.http,
        base_url,
        ProxyRequest {
            method,
            path,
            query,
            headers,
            body,
        },
    )
    .await
}
