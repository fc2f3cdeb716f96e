//! Route handlers
//!
//! Each handler is a small adaptor: decode the request, call the
//! store, encode the response. [`StoreError`] is mapped to a status
//! code once, in `IntoResponse`.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::error::StoreError;
use crate::store::Store;

impl IntoResponse for StoreError {
    fn into_response(self) -> Response {
        let status = match self {
            StoreError::NotFound => StatusCode::NOT_FOUND,
            StoreError::NotSequence
            | StoreError::SubSeqType
            | StoreError::UnknownDataType
            | StoreError::NegativeTtl
            | StoreError::InvalidPattern(_) => StatusCode::BAD_REQUEST,
            StoreError::DumpFail(_) | StoreError::Unavailable => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, self.to_string()).into_response()
    }
}

#[derive(Deserialize)]
pub struct SetRequest {
    key: String,
    value: JsonValue,
    ttl: Option<i64>,
}

pub async fn set(
    State(store): State<Store>,
    Json(req): Json<SetRequest>,
) -> Result<String, StoreError> {
    if req.key.is_empty() {
        return Err(StoreError::UnknownDataType);
    }
    if matches!(&req.value, JsonValue::String(s) if s.is_empty()) {
        return Err(StoreError::UnknownDataType);
    }
    store.set(&req.key, req.value, req.ttl)?;
    Ok(format!("/api/v1/get/{}", req.key))
}

pub async fn get(
    State(store): State<Store>,
    Path(key): Path<String>,
) -> Result<Json<JsonValue>, StoreError> {
    if key.is_empty() {
        return Err(StoreError::UnknownDataType);
    }
    let value = store.get(&key)?;
    Ok(Json(value.payload().clone()))
}

#[derive(Deserialize)]
pub struct GetByQuery {
    index: String,
}

pub async fn get_by(
    State(store): State<Store>,
    Path(key): Path<String>,
    Query(params): Query<GetByQuery>,
) -> Result<Json<JsonValue>, StoreError> {
    let value = store.get_by(&key, &params.index)?;
    Ok(Json(value))
}

pub async fn remove(
    State(store): State<Store>,
    Path(key): Path<String>,
) -> Result<StatusCode, StoreError> {
    store.remove(&key)?;
    Ok(StatusCode::OK)
}

#[derive(Serialize)]
pub struct KeysResponse {
    keys: Vec<String>,
}

pub async fn keys(
    State(store): State<Store>,
    Path(pattern): Path<String>,
) -> Result<Json<KeysResponse>, StoreError> {
    let keys = store.keys(&pattern)?;
    if keys.is_empty() {
        return Err(StoreError::NotFound);
    }
    Ok(Json(KeysResponse { keys }))
}
