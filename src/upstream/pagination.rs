/// Sequential paginator over an upstream collection
///
/// Requests fixed-size pages one after another until a short page, the page
/// cap, or a non-success status. What was gathered before a failure is kept
/// and the reason for stopping is reported alongside the records.

use std::fmt;
use std::str::FromStr;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::records::UpstreamCollection;
use crate::upstream::client::{PageResponse, UpstreamClient};

/// Query parameter style used to address pages
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PageParam {
    /// `limit` + zero-based row `offset`
    #[default]
    Offset,
    /// `limit` + one-based `page`
    Page,
}

impl PageParam {
    /// Query pairs for the zero-based `page_index`.
    pub fn query(&self, page_index: u32, page_size: u32) -> Vec<(&'static str, String)> {
        let limit = ("limit", page_size.to_string());
        match self {
            PageParam::Offset => vec![
                limit,
                ("offset", (u64::from(page_index) * u64::from(page_size)).to_string()),
            ],
            PageParam::Page => vec![limit, ("page", (page_index + 1).to_string())],
        }
    }
}

impl FromStr for PageParam {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "offset" => Ok(PageParam::Offset),
            "page" => Ok(PageParam::Page),
            other => Err(format!("expected 'offset' or 'page', got '{}'", other)),
        }
    }
}

/// What a caller does with a fetch that stopped on an upstream error
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TruncationPolicy {
    /// Log and use the partial result
    #[default]
    Proceed,
    /// Turn the truncation into an error response
    Fail,
}

impl FromStr for TruncationPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "proceed" => Ok(TruncationPolicy::Proceed),
            "fail" => Ok(TruncationPolicy::Fail),
            other => Err(format!("expected 'proceed' or 'fail', got '{}'", other)),
        }
    }
}

/// Why pagination stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "reason")]
pub enum FetchOutcome {
    /// The last page was shorter than the page size
    Complete,
    /// `max_pages` full pages were read; more rows may exist
    PageCapReached,
    /// Upstream answered `status` for the zero-based `page`
    Truncated { page: u32, status: u16 },
}

impl fmt::Display for FetchOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FetchOutcome::Complete => write!(f, "complete"),
            FetchOutcome::PageCapReached => write!(f, "page cap reached"),
            FetchOutcome::Truncated { page, status } => {
                write!(f, "truncated at page {} (status {})", page, status)
            }
        }
    }
}

/// All pages of one collection plus the reason the loop ended
#[derive(Debug)]
pub struct PagedFetch<T> {
    pub collection: String,
    pub records: Vec<T>,
    pub outcome: FetchOutcome,
    pub pages_fetched: u32,
}

impl<T> PagedFetch<T> {
    pub fn is_complete(&self) -> bool {
        self.outcome == FetchOutcome::Complete
    }

    /// Resolve the fetch against a truncation policy.
    ///
    /// A page-cap stop is never an error; it is only logged.
    pub fn into_records(self, policy: TruncationPolicy) -> Result<Vec<T>, AppError> {
        match self.outcome {
            FetchOutcome::Complete => {}
            FetchOutcome::PageCapReached => {
                tracing::warn!(
                    "Collection '{}' hit the page cap after {} pages; result may be incomplete",
                    self.collection,
                    self.pages_fetched
                );
            }
            FetchOutcome::Truncated { page, status } => match policy {
                TruncationPolicy::Proceed => {
                    tracing::warn!(
                        "Collection '{}' truncated at page {} (status {}), continuing with {} records",
                        self.collection,
                        page,
                        status,
                        self.records.len()
                    );
                }
                TruncationPolicy::Fail => {
                    return Err(AppError::Truncated {
                        collection: self.collection,
                        page,
                        status,
                    });
                }
            },
        }
        Ok(self.records)
    }
}

#[derive(Debug, Clone)]
pub struct Paginator {
    client: UpstreamClient,
    page_size: u32,
    max_pages: u32,
    param: PageParam,
}

impl Paginator {
    pub fn new(client: UpstreamClient, page_size: u32, max_pages: u32, param: PageParam) -> Self {
        Self {
            client,
            page_size: page_size.max(1),
            max_pages: max_pages.max(1),
            param,
        }
    }

    pub fn client(&self) -> &UpstreamClient {
        &self.client
    }

    /// Fetch every page of a typed collection.
    pub async fn fetch_collection<T: UpstreamCollection>(&self) -> Result<PagedFetch<T>, AppError> {
        self.fetch_all(T::NAME).await
    }

    /// Fetch every page of `collection`, one request at a time.
    pub async fn fetch_all<T: DeserializeOwned>(
        &self,
        collection: &str,
    ) -> Result<PagedFetch<T>, AppError> {
        let mut records = Vec::new();
        let mut pages_fetched = 0;

        let outcome = loop {
            if pages_fetched == self.max_pages {
                break FetchOutcome::PageCapReached;
            }

            let query = self.param.query(pages_fetched, self.page_size);
            let page = self.client.fetch_page::<T>(collection, &query).await?;

            match page {
                PageResponse::Rejected(status) => {
                    break FetchOutcome::Truncated {
                        page: pages_fetched,
                        status: status.as_u16(),
                    };
                }
                PageResponse::Rows(rows) => {
                    pages_fetched += 1;
                    let short = rows.len() < self.page_size as usize;
                    records.extend(rows);
                    if short {
                        break FetchOutcome::Complete;
                    }
                }
            }
        };

        tracing::debug!(
            "Fetched {} records of '{}' in {} pages ({})",
            records.len(),
            collection,
            pages_fetched,
            outcome
        );

        Ok(PagedFetch {
            collection: collection.to_string(),
            records,
            outcome,
            pages_fetched,
        })
    }
}
