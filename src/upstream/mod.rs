/// Upstream data API access
///
/// Page-at-a-time HTTP client for Directus-style `items/*` collections and the
/// sequential paginator built on top of it

pub mod client;
pub mod pagination;

pub use client::{build_http_client, PageResponse, UpstreamClient};
pub use pagination::{FetchOutcome, PageParam, PagedFetch, Paginator, TruncationPolicy};
