use std::sync::{Arc, LazyLock};

use axum::{
    extract::{Path, State},
    Json,
};
use regex::Regex;
use serde::Serialize;
use serde_json::Value;

use crate::error::AppError;
use crate::join::{self, CustomerAnalysisRow, OptionRow};
use crate::records::{CollectionDetail, CollectionHeader, Customer, Salesman};
use crate::state::AppState;

static COLLECTION_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-z][a-z0-9_]*$").expect("valid collection name pattern"));

#[derive(Debug, Serialize)]
pub struct RowsResponse {
    pub rows: Vec<CustomerAnalysisRow>,
}

#[derive(Debug, Serialize)]
pub struct OptionsResponse {
    pub salesmen: Vec<OptionRow>,
    pub customers: Vec<OptionRow>,
}

#[derive(Debug, Serialize)]
pub struct DataResponse {
    pub data: Vec<Value>,
    pub complete: bool,
}

/// GET /api/customer-analysis
///
/// Collection lines joined to their header and customer, cancelled
/// collections left out
pub async fn customer_analysis(
    State(state): State<Arc<AppState>>,
) -> Result<Json<RowsResponse>, AppError> {
    let paginator = state.paginator()?;
    let policy = state.config.truncation_policy;

    let (headers, details, customers) = tokio::try_join!(
        paginator.fetch_collection::<CollectionHeader>(),
        paginator.fetch_collection::<CollectionDetail>(),
        paginator.fetch_collection::<Customer>(),
    )?;

    let headers = headers.into_records(policy)?;
    let details = details.into_records(policy)?;
    let customers = customers.into_records(policy)?;

    let analysis = join::customer_analysis(
        &headers,
        &details,
        &customers,
        state.config.duplicate_key_policy,
    );

    tracing::info!(
        "Customer analysis: {} rows from {} details ({} missing header, {} cancelled, {} unflagged)",
        analysis.rows.len(),
        details.len(),
        analysis.excluded.missing_header,
        analysis.excluded.cancelled,
        analysis.excluded.unknown_flag
    );

    Ok(Json(RowsResponse {
        rows: analysis.rows,
    }))
}

/// GET /api/pending-invoices/options
pub async fn pending_invoice_options(
    State(state): State<Arc<AppState>>,
) -> Result<Json<OptionsResponse>, AppError> {
    let paginator = state.paginator()?;
    let policy = state.config.truncation_policy;

    let (salesmen, customers) = tokio::try_join!(
        paginator.fetch_collection::<Salesman>(),
        paginator.fetch_collection::<Customer>(),
    )?;

    let salesmen = salesmen.into_records(policy)?;
    let customers = customers.into_records(policy)?;

    Ok(Json(OptionsResponse {
        salesmen: join::salesman_options(&salesmen),
        customers: join::customer_options(&customers),
    }))
}

/// GET /api/collections/:name
///
/// Every page of a raw collection, wrapped as `{ data, complete }`
pub async fn collection_items(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
) -> Result<Json<DataResponse>, AppError> {
    if !COLLECTION_NAME.is_match(&name) {
        return Err(AppError::BadRequest(format!(
            "Invalid collection name '{}'",
            name
        )));
    }

    let fetch = state.paginator()?.fetch_all::<Value>(&name).await?;
    let complete = fetch.is_complete();
    let pages = fetch.pages_fetched;
    let data = fetch.into_records(state.config.truncation_policy)?;

    tracing::info!(
        "Collection '{}': {} records in {} pages",
        name,
        data.len(),
        pages
    );

    Ok(Json(DataResponse { data, complete }))
}
