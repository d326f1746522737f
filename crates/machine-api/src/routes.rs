use std::sync::Arc;

use axum::extract::rejection::{JsonRejection, PathRejection};
use axum::extract::{Path, Query, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use http::StatusCode;
use machine_domain::{
    EnvelopeService, Folder, Page, Record, RecordService, ResponsePayload, TransportPayload,
};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::error::{path_rejection_to_domain, rejection_to_domain, ApiError};

/// Services shared by every handler
#[derive(Clone)]
pub struct MachineApiServices {
    pub envelope_service: Arc<EnvelopeService>,
    pub record_service: Arc<RecordService>,
}

pub fn router(services: MachineApiServices) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/envelope", post(handle_envelope))
        .route("/api/{entity}", get(list_records).post(create_record))
        .route("/api/{entity}/{id}", get(get_record).put(update_record))
        .with_state(services)
}

async fn health() -> &'static str {
    "ok"
}

async fn handle_envelope(
    State(services): State<MachineApiServices>,
    payload: Result<Json<TransportPayload>, JsonRejection>,
) -> Result<Json<ResponsePayload>, ApiError> {
    let Json(payload) = payload.map_err(|e| ApiError::envelope(rejection_to_domain(e)))?;

    let response = services
        .envelope_service
        .handle(payload)
        .await
        .map_err(ApiError::envelope)?;

    Ok(Json(response))
}

#[derive(Debug, Deserialize)]
struct ListParams {
    pageno: Option<String>,
    recordperpage: Option<String>,
}

async fn list_records(
    State(services): State<MachineApiServices>,
    Path(entity): Path<String>,
    Query(params): Query<ListParams>,
) -> Result<Json<Value>, ApiError> {
    let folder: Folder = entity.parse()?;
    let page = Page::parse(params.pageno.as_deref(), params.recordperpage.as_deref())?;

    let records = services.record_service.list(folder, page).await?;
    Ok(Json(json!({ "data": records })))
}

async fn get_record(
    State(services): State<MachineApiServices>,
    path: Result<Path<(String, i64)>, PathRejection>,
) -> Result<Json<Record>, ApiError> {
    let Path((entity, id)) = path.map_err(path_rejection_to_domain)?;
    let folder: Folder = entity.parse()?;
    Ok(Json(services.record_service.get(folder, id).await?))
}

async fn create_record(
    State(services): State<MachineApiServices>,
    Path(entity): Path<String>,
    body: Result<Json<Record>, JsonRejection>,
) -> Result<(StatusCode, Json<Record>), ApiError> {
    let folder: Folder = entity.parse()?;
    let Json(record) = body.map_err(rejection_to_domain)?;

    let created = services.record_service.create(folder, record).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

async fn update_record(
    State(services): State<MachineApiServices>,
    path: Result<Path<(String, i64)>, PathRejection>,
    body: Result<Json<Record>, JsonRejection>,
) -> Result<Json<Record>, ApiError> {
    let Path((entity, id)) = path.map_err(path_rejection_to_domain)?;
    let folder: Folder = entity.parse()?;
    let Json(record) = body.map_err(rejection_to_domain)?;

    Ok(Json(services.record_service.update(folder, id, record).await?))
}
