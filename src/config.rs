//! Gateway configuration.
//!
//! Built once at process start from the environment (after `.env` has been
//! loaded), optionally overlaid with a YAML file, and then shared read-only
//! with every handler. Base URLs are only checked for presence.

use std::fmt::Display;
use std::fs;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use serde::Deserialize;
use tracing::{info, warn};

use crate::error::AppError;
use crate::join::DuplicateKeyPolicy;
use crate::upstream::{PageParam, TruncationPolicy};

pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_PAGE_SIZE: u32 = 1000;
pub const DEFAULT_MAX_PAGES: u32 = 50;

pub const DATA_API_BASE_URL: &str = "DATA_API_BASE_URL";
pub const UPSTREAM_API_BASE_URL: &str = "UPSTREAM_API_BASE_URL";
pub const SALES_INVOICE_API_BASE_URL: &str = "SALES_INVOICE_API_BASE_URL";
pub const SPRING_API_BASE_URL: &str = "SPRING_API_BASE_URL";

#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub host: String,
    pub port: u16,
    /// Directus-style data API used by the aggregation and login endpoints
    pub data_api_base_url: Option<String>,
    /// Target of the generic `/api/proxy/*` shim
    pub upstream_api_base_url: Option<String>,
    pub sales_invoice_api_base_url: Option<String>,
    /// Spring Boot service behind the `/spring/*` rewrite
    pub spring_api_base_url: Option<String>,
    pub page_size: u32,
    pub max_pages: u32,
    pub page_param: PageParam,
    pub truncation_policy: TruncationPolicy,
    pub duplicate_key_policy: DuplicateKeyPolicy,
    /// No timeout unless explicitly configured
    pub request_timeout: Option<Duration>,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            data_api_base_url: None,
            upstream_api_base_url: None,
            sales_invoice_api_base_url: None,
            spring_api_base_url: None,
            page_size: DEFAULT_PAGE_SIZE,
            max_pages: DEFAULT_MAX_PAGES,
            page_param: PageParam::default(),
            truncation_policy: TruncationPolicy::default(),
            duplicate_key_policy: DuplicateKeyPolicy::default(),
            request_timeout: None,
        }
    }
}

/// Optional YAML overlay. Any key present replaces the environment value.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigOverlay {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub data_api_base_url: Option<String>,
    pub upstream_api_base_url: Option<String>,
    pub sales_invoice_api_base_url: Option<String>,
    pub spring_api_base_url: Option<String>,
    pub page_size: Option<u32>,
    pub max_pages: Option<u32>,
    pub page_param: Option<PageParam>,
    pub truncation_policy: Option<TruncationPolicy>,
    pub duplicate_key_policy: Option<DuplicateKeyPolicy>,
    pub request_timeout_secs: Option<u64>,
}

impl GatewayConfig {
    /// Read configuration from process environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup.
    ///
    /// Unset keys take their defaults; unparsable values are logged and
    /// replaced by the default as well.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        Self {
            host: lookup("HOST").unwrap_or(defaults.host),
            port: parse_or(&lookup, "PORT", defaults.port),
            data_api_base_url: normalize_base_url(lookup(DATA_API_BASE_URL)),
            upstream_api_base_url: normalize_base_url(lookup(UPSTREAM_API_BASE_URL)),
            sales_invoice_api_base_url: normalize_base_url(lookup(SALES_INVOICE_API_BASE_URL)),
            spring_api_base_url: normalize_base_url(lookup(SPRING_API_BASE_URL)),
            page_size: parse_or(&lookup, "PAGE_SIZE", defaults.page_size).max(1),
            max_pages: parse_or(&lookup, "MAX_PAGES", defaults.max_pages).max(1),
            page_param: parse_or(&lookup, "PAGE_PARAM", defaults.page_param),
            truncation_policy: parse_or(&lookup, "TRUNCATION_POLICY", defaults.truncation_policy),
            duplicate_key_policy: parse_or(
                &lookup,
                "DUPLICATE_KEY_POLICY",
                defaults.duplicate_key_policy,
            ),
            request_timeout: lookup("REQUEST_TIMEOUT_SECS")
                .and_then(|raw| parse_logged::<u64>("REQUEST_TIMEOUT_SECS", &raw))
                .map(Duration::from_secs),
        }
    }

    /// Load a YAML overlay file.
    pub fn load_overlay<P: AsRef<Path>>(path: P) -> Result<ConfigOverlay, String> {
        let path = path.as_ref();

        let contents = fs::read_to_string(path)
            .map_err(|e| format!("Failed to read config file {}: {}", path.display(), e))?;

        serde_yaml::from_str(&contents)
            .map_err(|e| format!("Failed to parse config file {}: {}", path.display(), e))
    }

    pub fn apply_overlay(&mut self, overlay: ConfigOverlay) {
        if let Some(host) = overlay.host {
            self.host = host;
        }
        if let Some(port) = overlay.port {
            self.port = port;
        }
        if overlay.data_api_base_url.is_some() {
            self.data_api_base_url = normalize_base_url(overlay.data_api_base_url);
        }
        if overlay.upstream_api_base_url.is_some() {
            self.upstream_api_base_url = normalize_base_url(overlay.upstream_api_base_url);
        }
        if overlay.sales_invoice_api_base_url.is_some() {
            self.sales_invoice_api_base_url =
                normalize_base_url(overlay.sales_invoice_api_base_url);
        }
        if overlay.spring_api_base_url.is_some() {
            self.spring_api_base_url = normalize_base_url(overlay.spring_api_base_url);
        }
        if let Some(page_size) = overlay.page_size {
            self.page_size = page_size.max(1);
        }
        if let Some(max_pages) = overlay.max_pages {
            self.max_pages = max_pages.max(1);
        }
        if let Some(page_param) = overlay.page_param {
            self.page_param = page_param;
        }
        if let Some(policy) = overlay.truncation_policy {
            self.truncation_policy = policy;
        }
        if let Some(policy) = overlay.duplicate_key_policy {
            self.duplicate_key_policy = policy;
        }
        if let Some(secs) = overlay.request_timeout_secs {
            self.request_timeout = Some(Duration::from_secs(secs));
        }
    }

    /// Base URL of the data API, or the 500-class configuration error.
    pub fn data_api_base_url(&self) -> Result<&str, AppError> {
        self.data_api_base_url
            .as_deref()
            .ok_or(AppError::MissingConfig(DATA_API_BASE_URL))
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Log which upstreams are wired up.
    pub fn log_summary(&self) {
        let upstreams = [
            (DATA_API_BASE_URL, &self.data_api_base_url),
            (UPSTREAM_API_BASE_URL, &self.upstream_api_base_url),
            (SALES_INVOICE_API_BASE_URL, &self.sales_invoice_api_base_url),
            (SPRING_API_BASE_URL, &self.spring_api_base_url),
        ];

        for (key, value) in upstreams {
            match value {
                Some(url) => info!("{key} = {url}"),
                None => warn!("{key} not set, dependent endpoints will answer 500"),
            }
        }

        info!(
            "Pagination: {} rows/page, at most {} pages, {:?} parameter, {:?} on truncation",
            self.page_size, self.max_pages, self.page_param, self.truncation_policy
        );
    }
}

fn normalize_base_url(raw: Option<String>) -> Option<String> {
    raw.map(|url| url.trim().trim_end_matches('/').to_string())
        .filter(|url| !url.is_empty())
}

fn parse_or<T, F>(lookup: &F, key: &str, default: T) -> T
where
    T: FromStr,
    T::Err: Display,
    F: Fn(&str) -> Option<String>,
{
    lookup(key)
        .and_then(|raw| parse_logged(key, &raw))
        .unwrap_or(default)
}

fn parse_logged<T>(key: &str, raw: &str) -> Option<T>
where
    T: FromStr,
    T::Err: Display,
{
    raw.trim()
        .parse()
        .map_err(|e| warn!("Invalid {key} value '{raw}': {e}, using default"))
        .ok()
}
