/// HTTP client for the Directus-style data API
///
/// Issues single page requests against `{base}/items/{collection}` with
/// caching disabled and decodes the `{ "data": [...] }` envelope

use std::time::Duration;

use reqwest::{header, Client, StatusCode};
use serde::{de::DeserializeOwned, Deserialize, Deserializer};

use crate::error::AppError;

const USER_AGENT: &str = concat!("vos-gateway/", env!("CARGO_PKG_VERSION"));

/// Build the shared reqwest client.
///
/// No timeout is set unless one is configured; a slow upstream holds the
/// calling request open.
pub fn build_http_client(timeout: Option<Duration>) -> Result<Client, AppError> {
    let mut builder = Client::builder().user_agent(USER_AGENT);
    if let Some(timeout) = timeout {
        builder = builder.timeout(timeout);
    }
    Ok(builder.build()?)
}

#[derive(Debug, Deserialize)]
#[serde(bound(deserialize = "T: DeserializeOwned"))]
struct DataEnvelope<T> {
    #[serde(default = "Vec::new", deserialize_with = "null_as_empty")]
    data: Vec<T>,
}

/// `"data": null` reads as an empty page.
fn null_as_empty<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}

/// Result of a single page request
#[derive(Debug)]
pub enum PageResponse<T> {
    /// 2xx with a decoded `data` array
    Rows(Vec<T>),
    /// Upstream answered with a non-success status
    Rejected(StatusCode),
}

#[derive(Debug, Clone)]
pub struct UpstreamClient {
    http: Client,
    base_url: String,
}

impl UpstreamClient {
    pub fn new(http: Client, base_url: impl Into<String>) -> Self {
        Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn collection_url(&self, collection: &str) -> String {
        format!("{}/items/{}", self.base_url, collection)
    }

    /// Fetch one page of a collection.
    ///
    /// Non-success statuses are returned as [`PageResponse::Rejected`] rather
    /// than as errors so the paginator can keep what it already has. Transport
    /// failures and undecodable bodies are errors.
    pub async fn fetch_page<T: DeserializeOwned>(
        &self,
        collection: &str,
        query: &[(&'static str, String)],
    ) -> Result<PageResponse<T>, AppError> {
        let url = self.collection_url(collection);
        tracing::debug!("GET {} {:?}", url, query);

        let response = self
            .http
            .get(&url)
            .query(query)
            .header(header::CACHE_CONTROL, "no-cache")
            .header(header::PRAGMA, "no-cache")
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Ok(PageResponse::Rejected(status));
        }

        let body = response.bytes().await?;
        let envelope: DataEnvelope<T> =
            serde_json::from_slice(&body).map_err(|e| AppError::Decode {
                source_name: url,
                reason: e.to_string(),
            })?;

        Ok(PageResponse::Rows(envelope.data))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collection_url_strips_trailing_slash() {
        let client = UpstreamClient::new(Client::new(), "https://cms.example.com/");
        assert_eq!(
            client.collection_url("collection_details"),
            "https://cms.example.com/items/collection_details"
        );
    }

    #[test]
    fn test_envelope_without_data_is_empty() {
        let envelope: DataEnvelope<serde_json::Value> = serde_json::from_str("{}").unwrap();
        assert!(envelope.data.is_empty());
    }

    #[test]
    fn test_envelope_with_null_data_is_empty() {
        let envelope: DataEnvelope<serde_json::Value> =
            serde_json::from_str(r#"{"data": null}"#).unwrap();
        assert!(envelope.data.is_empty());

        let envelope: DataEnvelope<u32> = serde_json::from_str(r#"{"data": [1, 2]}"#).unwrap();
        assert_eq!(envelope.data, vec![1, 2]);
    }
}
