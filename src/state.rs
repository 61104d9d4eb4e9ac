use std::sync::Arc;

use crate::config::GatewayConfig;
use crate::error::AppError;
use crate::upstream::{build_http_client, Paginator, UpstreamClient};

/// Shared, read-only handler state
pub struct AppState {
    pub config: GatewayConfig,
    pub http: reqwest::Client,
}

impl AppState {
    pub fn new(config: GatewayConfig) -> Result<Arc<Self>, AppError> {
        let http = build_http_client(config.request_timeout)?;
        Ok(Arc::new(Self { config, http }))
    }

    /// Paginator over the data API, or the missing-configuration error.
    pub fn paginator(&self) -> Result<Paginator, AppError> {
        let base_url = self.config.data_api_base_url()?;

        Ok(Paginator::new(
            UpstreamClient::new(self.http.clone(), base_url),
            self.config.page_size,
            self.config.max_pages,
            self.config.page_param,
        ))
    }
}
