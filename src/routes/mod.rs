//! HTTP surface of the gateway
//!
//! Aggregation endpoints, the login check and the proxy shims, wired into a
//! single axum router.

use std::sync::Arc;
use std::time::Duration;

use axum::{
    http::{
        header::{
            ACCESS_CONTROL_ALLOW_HEADERS, ACCESS_CONTROL_ALLOW_METHODS,
            ACCESS_CONTROL_ALLOW_ORIGIN, AUTHORIZATION, CONTENT_TYPE,
        },
        HeaderValue, Method,
    },
    routing::{any, get, post},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    set_header::SetResponseHeaderLayer,
    trace::TraceLayer,
};

use crate::proxy::{ALLOWED_HEADERS, ALLOWED_METHODS};
use crate::state::AppState;

pub mod analysis;
pub mod auth;
pub mod health;
pub mod proxy;

pub fn build_router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([AUTHORIZATION, CONTENT_TYPE])
        .max_age(Duration::from_secs(60 * 60));

    // Proxy responses carry the full CORS set, errors included
    let proxies: Router<Arc<AppState>> = Router::new()
        .route("/api/proxy/*path", any(proxy::upstream))
        .route("/api/sales-invoice/*path", any(proxy::sales_invoice))
        .route("/spring/*path", any(proxy::spring))
        .layer(SetResponseHeaderLayer::overriding(
            ACCESS_CONTROL_ALLOW_ORIGIN,
            HeaderValue::from_static("*"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            ACCESS_CONTROL_ALLOW_METHODS,
            HeaderValue::from_static(ALLOWED_METHODS),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            ACCESS_CONTROL_ALLOW_HEADERS,
            HeaderValue::from_static(ALLOWED_HEADERS),
        ));

    Router::new()
        .route("/health", get(health::health_check))
        .route("/api/customer-analysis", get(analysis::customer_analysis))
        .route(
            "/api/pending-invoices/options",
            get(analysis::pending_invoice_options),
        )
        .route("/api/collections/:name", get(analysis::collection_items))
        .route("/api/auth/login", post(auth::login))
        .merge(proxies)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
