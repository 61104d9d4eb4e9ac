//! Join/reshape stage.
//!
//! Builds request-scoped lookup maps from secondary collections and projects
//! the primary collection into flat output rows. Joined fields are
//! best-effort: a missing relation yields defaults, never an error.

use std::collections::HashMap;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::records::{
    CancellationFlag, CollectionDetail, CollectionHeader, Customer, RecordKey, Salesman,
};

pub const UNSPECIFIED_CUSTOMER: &str = "Unspecified Customer";
pub const UNSPECIFIED_SALESMAN: &str = "Unspecified Salesman";

/// Which record wins when upstream returns the same key twice
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DuplicateKeyPolicy {
    /// Later records overwrite earlier ones
    #[default]
    LastSeen,
    /// The first record for a key is kept
    FirstSeen,
}

impl FromStr for DuplicateKeyPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "last_seen" | "last" => Ok(DuplicateKeyPolicy::LastSeen),
            "first_seen" | "first" => Ok(DuplicateKeyPolicy::FirstSeen),
            other => Err(format!("expected 'last_seen' or 'first_seen', got '{}'", other)),
        }
    }
}

/// Key → record index over a borrowed collection
#[derive(Debug)]
pub struct LookupMap<'a, V> {
    entries: HashMap<RecordKey, &'a V>,
    duplicates: usize,
}

impl<'a, V> LookupMap<'a, V> {
    /// Index `records` by `key_fn`. Records without a key are skipped.
    pub fn build<I, F>(records: I, key_fn: F, policy: DuplicateKeyPolicy) -> Self
    where
        I: IntoIterator<Item = &'a V>,
        F: Fn(&V) -> Option<RecordKey>,
    {
        let mut entries = HashMap::new();
        let mut duplicates = 0;

        for record in records {
            let Some(key) = key_fn(record) else {
                continue;
            };

            if entries.contains_key(&key) {
                duplicates += 1;
                tracing::debug!("Duplicate lookup key {} ({:?})", key, policy);
                if policy == DuplicateKeyPolicy::FirstSeen {
                    continue;
                }
            }
            entries.insert(key, record);
        }

        Self { entries, duplicates }
    }

    pub fn get(&self, key: &RecordKey) -> Option<&'a V> {
        self.entries.get(key).copied()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of records whose key was already present
    pub fn duplicates(&self) -> usize {
        self.duplicates
    }
}

/// Resolution of a detail's parent header
#[derive(Debug, Clone, Copy)]
pub enum HeaderStatus<'a> {
    Active(&'a CollectionHeader),
    Missing,
    Cancelled,
    /// Header exists but carries no readable cancellation flag
    Unknown,
}

pub fn header_status<'a>(
    detail: &CollectionDetail,
    headers: &LookupMap<'a, CollectionHeader>,
) -> HeaderStatus<'a> {
    let Some(header) = detail.collection_id.as_ref().and_then(|id| headers.get(id)) else {
        return HeaderStatus::Missing;
    };

    match header.is_cancelled {
        CancellationFlag::Active => HeaderStatus::Active(header),
        CancellationFlag::Cancelled => HeaderStatus::Cancelled,
        CancellationFlag::Unknown => HeaderStatus::Unknown,
    }
}

/// One flattened collection line
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CustomerAnalysisRow {
    /// Null when the upstream detail carried no id
    pub detail_id: Option<RecordKey>,
    pub collection_id: Option<RecordKey>,
    pub customer_code: Option<RecordKey>,
    pub amount: f64,
    pub collection_no: Option<String>,
    pub collection_date: Option<String>,
    pub salesman_id: Option<RecordKey>,
    pub customer_name: String,
    pub customer_id: i64,
}

/// Details dropped by the header filter, per reason
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ExcludedCounts {
    pub missing_header: usize,
    pub cancelled: usize,
    pub unknown_flag: usize,
}

#[derive(Debug, Clone)]
pub struct CustomerAnalysis {
    pub rows: Vec<CustomerAnalysisRow>,
    pub excluded: ExcludedCounts,
}

/// Join details to their collection header and customer.
///
/// Rows come out in detail order and take their keys from the detail. Details
/// whose header is missing, cancelled, or has an unreadable flag are dropped;
/// a detail without an id is kept with a null `detail_id`. An unknown `customer_code` keeps the
/// row with [`UNSPECIFIED_CUSTOMER`] and customer id 0.
pub fn customer_analysis(
    headers: &[CollectionHeader],
    details: &[CollectionDetail],
    customers: &[Customer],
    policy: DuplicateKeyPolicy,
) -> CustomerAnalysis {
    let header_map = LookupMap::build(headers, |h| h.id.clone(), policy);
    let customer_map = LookupMap::build(customers, |c| c.customer_code.clone(), policy);

    let mut excluded = ExcludedCounts::default();
    let mut rows = Vec::with_capacity(details.len());

    for detail in details {
        let header = match header_status(detail, &header_map) {
            HeaderStatus::Active(header) => header,
            HeaderStatus::Missing => {
                excluded.missing_header += 1;
                continue;
            }
            HeaderStatus::Cancelled => {
                excluded.cancelled += 1;
                continue;
            }
            HeaderStatus::Unknown => {
                excluded.unknown_flag += 1;
                continue;
            }
        };

        let customer = detail
            .customer_code
            .as_ref()
            .and_then(|code| customer_map.get(code));

        rows.push(CustomerAnalysisRow {
            detail_id: detail.id.clone(),
            collection_id: detail.collection_id.clone(),
            customer_code: detail.customer_code.clone(),
            amount: detail.amount,
            collection_no: header.collection_no.clone(),
            collection_date: header.collection_date.clone(),
            salesman_id: header.salesman_id.clone(),
            customer_name: customer
                .and_then(|c| c.customer_name.clone())
                .unwrap_or_else(|| UNSPECIFIED_CUSTOMER.to_string()),
            customer_id: customer.map(|c| c.id).unwrap_or(0),
        });
    }

    CustomerAnalysis { rows, excluded }
}

/// Select-box entry for the pending-invoice filters
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OptionRow {
    pub id: i64,
    pub code: Option<String>,
    pub name: String,
}

pub fn salesman_options(salesmen: &[Salesman]) -> Vec<OptionRow> {
    salesmen
        .iter()
        .map(|s| OptionRow {
            id: s.id,
            code: s.salesman_code.clone(),
            name: display_name(s.salesman_name.as_deref(), s.salesman_code.as_deref(), UNSPECIFIED_SALESMAN),
        })
        .collect()
}

pub fn customer_options(customers: &[Customer]) -> Vec<OptionRow> {
    customers
        .iter()
        .map(|c| {
            let code = c.customer_code.as_ref().map(|k| k.to_string());
            OptionRow {
                id: c.id,
                name: display_name(c.customer_name.as_deref(), code.as_deref(), UNSPECIFIED_CUSTOMER),
                code,
            }
        })
        .collect()
}

fn display_name(name: Option<&str>, code: Option<&str>, fallback: &str) -> String {
    name.or(code).unwrap_or(fallback).to_string()
}
