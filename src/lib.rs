//! # VOS Gateway: aggregation and proxy service for the VOS ERP front-end
//!
//! The gateway sits between the UI and two remote sources: a Directus-style
//! data API (`items/*` collections returning `{ "data": [...] }`) and a Spring
//! Boot service. Every request is an independent pipeline:
//!
//! ```text
//! fetch (all pages, N collections concurrently) → filter/join → JSON
//! ```
//!
//! ## Features
//!
//! - **Paginated fetching**: sequential `limit`/`offset` (or `page`) requests
//!   until a short page, with an explicit outcome when upstream fails mid-way
//! - **Join/reshape**: request-scoped lookup maps, cancelled-collection
//!   filtering, default values for unmatched relations
//! - **Proxy shims**: method, path, query, `authorization` and `content-type`
//!   forwarded; status and body relayed; permissive CORS on every response
//!
//! ## Example: customer analysis row
//!
//! ```json
//! {
//!   "detail_id": 10,
//!   "collection_id": 1,
//!   "customer_code": "C-001",
//!   "amount": 1500.0,
//!   "collection_no": "COL-2024-001",
//!   "collection_date": "2024-05-01",
//!   "salesman_id": 4,
//!   "customer_name": "Unspecified Customer",
//!   "customer_id": 0
//! }
//! ```

// Core modules
pub mod config;
pub mod error;
pub mod records;
pub mod join;

// Upstream data API access
pub mod upstream;

// HTTP surface
pub mod proxy;
pub mod routes;
pub mod state;

// Re-export key types
pub use config::GatewayConfig;
pub use error::AppError;
pub use records::{CancellationFlag, RecordKey, UpstreamCollection};
pub use join::{customer_analysis, CustomerAnalysisRow, DuplicateKeyPolicy, LookupMap};
pub use upstream::{FetchOutcome, PageParam, PagedFetch, Paginator, TruncationPolicy, UpstreamClient};
pub use routes::build_router;
pub use state::AppState;

/// Build the application router for `config`.
pub fn app(config: GatewayConfig) -> Result<axum::Router, AppError> {
    Ok(build_router(AppState::new(config)?))
}
