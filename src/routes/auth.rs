use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};
use serde::Deserialize;
use serde_json::{Map, Value};

use crate::error::AppError;
use crate::records::UserRecord;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

/// POST /api/auth/login
///
/// Plaintext match against `items/user`; the matching record is returned
/// without its password
pub async fn login(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Json<Map<String, Value>>, AppError> {
    let Json(request) = payload.map_err(|e| AppError::BadRequest(e.body_text()))?;

    if request.email.trim().is_empty() || request.password.is_empty() {
        return Err(AppError::BadRequest(
            "Email and password are required".to_string(),
        ));
    }

    let users = state
        .paginator()?
        .fetch_collection::<UserRecord>()
        .await?
        .into_records(state.config.truncation_policy)?;

    let user = users
        .into_iter()
        .find(|user| user.matches(&request.email, &request.password))
        .ok_or(AppError::InvalidCredentials)?;

    tracing::info!("Login succeeded for {}", request.email);

    Ok(Json(user.into_public()))
}
