use std::collections::BTreeMap;

use axum::{
	Json, Router,
	extract::{Path, Query, State},
	http::StatusCode,
	response::{IntoResponse, Response},
	routing::{get, post, put},
};
use serde::Serialize;
use uuid::Uuid;

use crate::state::AppState;
use catalog_domain::{EntityType, SearchableRecord};
use catalog_service::{Error as ServiceError, RebuildReport, ReindexOutcome, SearchRequest};

const PARAM_QUERY: &str = "q";
const PARAM_PAGE: &str = "page";
const PARAM_PAGE_SIZE: &str = "page_size";
const PARAM_SORT: &str = "sort";

pub fn router(state: AppState) -> Router {
	Router::new()
		.route("/health", get(health))
		.route("/api/2/{entity}/search", get(search))
		.route("/api/2/{entity}/{id}", put(put_record).delete(delete_record))
		.with_state(state)
}

pub fn admin_router(state: AppState) -> Router {
	Router::new()
		.route("/v1/admin/reindex/{entity}", post(rebuild_index))
		.route("/v1/admin/reindex/{entity}/{id}", post(reindex_record))
		.with_state(state)
}

#[derive(Debug, Serialize)]
pub struct RecordWriteResponse {
	pub id: Uuid,
	pub revision: u64,
	pub reindex: ReindexStatus,
}

#[derive(Debug, Serialize)]
pub struct ReindexStatus {
	pub action: &'static str,
	pub status: &'static str,
}
impl ReindexStatus {
	fn from_outcome(outcome: Option<ReindexOutcome>) -> Self {
		let Some(outcome) = outcome else {
			return Self { action: "pending", status: "queued" };
		};
		let status = match &outcome {
			ReindexOutcome::Noop => "skipped",
			ReindexOutcome::Applied { .. } => "applied",
			ReindexOutcome::Stale { .. } => "stale",
			ReindexOutcome::Failed { .. } => "failed",
		};

		Self { action: outcome.action().as_str(), status }
	}
}

async fn health() -> StatusCode {
	StatusCode::OK
}

async fn search(
	State(state): State<AppState>,
	Path(entity): Path<String>,
	Query(params): Query<BTreeMap<String, String>>,
) -> Result<Response, ApiError> {
	let entity_type = parse_entity(&entity)?;
	let request = search_request(params)?;
	let page = state.service.search(entity_type, &request).await?;
	let status = if page.available { StatusCode::OK } else { StatusCode::SERVICE_UNAVAILABLE };

	Ok((status, Json(page)).into_response())
}

async fn put_record(
	State(state): State<AppState>,
	Path((entity, id)): Path<(String, Uuid)>,
	Json(record): Json<SearchableRecord>,
) -> Result<Json<RecordWriteResponse>, ApiError> {
	let entity_type = parse_entity(&entity)?;

	if record.id != id || record.entity_type != entity_type {
		return Err(json_error(
			StatusCode::BAD_REQUEST,
			"invalid_request",
			"Record id and entity type must match the path.",
		));
	}

	let (before, after) = state.records.put(record).map_err(ServiceError::from)?;
	let revision = after.revision;
	let outcome = state.reindex(before, Some(after)).await;

	Ok(Json(RecordWriteResponse { id, revision, reindex: ReindexStatus::from_outcome(outcome) }))
}

async fn delete_record(
	State(state): State<AppState>,
	Path((entity, id)): Path<(String, Uuid)>,
) -> Result<Json<RecordWriteResponse>, ApiError> {
	let entity_type = parse_entity(&entity)?;
	let Some(removed) = state.records.remove(entity_type, id).map_err(ServiceError::from)? else {
		return Err(ServiceError::NotFound { message: format!("No {entity_type} with id {id}.") }
			.into());
	};
	let revision = removed.revision;
	let outcome = state.reindex(Some(removed), None).await;

	Ok(Json(RecordWriteResponse { id, revision, reindex: ReindexStatus::from_outcome(outcome) }))
}

async fn rebuild_index(
	State(state): State<AppState>,
	Path(entity): Path<String>,
) -> Result<Json<RebuildReport>, ApiError> {
	let entity_type = parse_entity(&entity)?;
	let response = state.service.rebuild_index(entity_type).await?;

	Ok(Json(response))
}

async fn reindex_record(
	State(state): State<AppState>,
	Path((entity, id)): Path<(String, Uuid)>,
) -> Result<Json<ReindexStatus>, ApiError> {
	let entity_type = parse_entity(&entity)?;
	let outcome = state.service.reindex_record(entity_type, id).await?;

	Ok(Json(ReindexStatus::from_outcome(Some(outcome))))
}

fn parse_entity(raw: &str) -> Result<EntityType, ApiError> {
	EntityType::from_collection(raw).ok_or_else(|| {
		json_error(StatusCode::NOT_FOUND, "unknown_entity", format!("Unknown entity {raw:?}."))
	})
}

/// Every parameter other than `q`, `page`, `page_size` and `sort` is a filter.
fn search_request(mut params: BTreeMap<String, String>) -> Result<SearchRequest, ApiError> {
	let q = params.remove(PARAM_QUERY).unwrap_or_default();
	let page = parse_number(PARAM_PAGE, params.remove(PARAM_PAGE))?;
	let page_size = parse_number(PARAM_PAGE_SIZE, params.remove(PARAM_PAGE_SIZE))?;
	let sort = params.remove(PARAM_SORT);

	Ok(SearchRequest { q, filters: params, sort, page, page_size })
}

fn parse_number(name: &str, raw: Option<String>) -> Result<Option<u32>, ApiError> {
	raw.map(|raw| {
		raw.trim().parse::<u32>().map_err(|_| {
			ApiError::from(ServiceError::InvalidQuery {
				message: format!("{name} must be a positive integer."),
			})
		})
	})
	.transpose()
}

#[derive(Debug, Serialize)]
struct ErrorBody {
	error_code: String,
	message: String,
}

#[derive(Debug)]
pub struct ApiError {
	status: StatusCode,
	error_code: String,
	message: String,
}
impl ApiError {
	fn new(status: StatusCode, error_code: impl Into<String>, message: impl Into<String>) -> Self {
		Self { status, error_code: error_code.into(), message: message.into() }
	}
}

impl From<ServiceError> for ApiError {
	fn from(err: ServiceError) -> Self {
		match err {
			ServiceError::InvalidQuery { message } =>
				json_error(StatusCode::BAD_REQUEST, "invalid_query", message),
			ServiceError::NotFound { message } =>
				json_error(StatusCode::NOT_FOUND, "not_found", message),
			ServiceError::SearchUnavailable { message } =>
				json_error(StatusCode::SERVICE_UNAVAILABLE, "search_unavailable", message),
			ServiceError::IndexWriteFailed { message } =>
				json_error(StatusCode::SERVICE_UNAVAILABLE, "index_write_failed", message),
			ServiceError::Storage { message } =>
				json_error(StatusCode::INTERNAL_SERVER_ERROR, "storage_error", message),
			ServiceError::Configuration { message } =>
				json_error(StatusCode::INTERNAL_SERVER_ERROR, "configuration_error", message),
		}
	}
}

impl IntoResponse for ApiError {
	fn into_response(self) -> Response {
		let body = ErrorBody { error_code: self.error_code, message: self.message };

		(self.status, Json(body)).into_response()
	}
}

pub fn json_error(status: StatusCode, code: &str, message: impl Into<String>) -> ApiError {
	ApiError::new(status, code, message)
}
