use axum::{
	Json, Router,
	body::Body,
	extract::{Query, Request, State},
	http::{HeaderMap, StatusCode, header::AUTHORIZATION},
	middleware::{self, Next},
	response::{IntoResponse, Response},
	routing::{get, post},
};
use serde::Serialize;

use callmatch_service::{
	EnqueueRequest, EnqueueResponse, Error as ServiceError, RunSummary, UnmatchedListRequest,
	UnmatchedListResponse,
};
use callmatch_storage::models::PendingStats;

use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct ReconcileResponse {
	pub ok: bool,
	#[serde(flatten)]
	pub summary: RunSummary,
	/// Absent when the queue statistics could not be read after the run.
	pub stats: Option<PendingStats>,
}

pub fn router(state: AppState) -> Router {
	let protected = Router::new()
		.route("/v1/cron/reconcile", get(reconcile).post(reconcile))
		.route("/v1/pending", post(enqueue))
		.route("/v1/unmatched", get(unmatched))
		.route("/v1/stats", get(stats))
		.layer(middleware::from_fn_with_state(state.clone(), cron_auth_middleware));

	Router::new().route("/health", get(health)).merge(protected).with_state(state)
}

async fn health() -> StatusCode {
	StatusCode::OK
}

async fn reconcile(State(state): State<AppState>) -> Result<Json<ReconcileResponse>, ApiError> {
	let summary = state.service.reconcile().await?;
	let stats = match state.service.stats().await {
		Ok(stats) => Some(stats),
		Err(err) => {
			tracing::warn!(error = %err, "Failed to read pending recording stats.");

			None
		},
	};

	Ok(Json(ReconcileResponse { ok: true, summary, stats }))
}

async fn enqueue(
	State(state): State<AppState>,
	Json(payload): Json<EnqueueRequest>,
) -> Result<Json<EnqueueResponse>, ApiError> {
	let response = state.service.enqueue(payload).await?;

	Ok(Json(response))
}

async fn unmatched(
	State(state): State<AppState>,
	Query(query): Query<UnmatchedListRequest>,
) -> Result<Json<UnmatchedListResponse>, ApiError> {
	let response = state.service.list_unmatched(query).await?;

	Ok(Json(response))
}

async fn stats(State(state): State<AppState>) -> Result<Json<PendingStats>, ApiError> {
	let response = state.service.stats().await?;

	Ok(Json(response))
}

async fn cron_auth_middleware(
	State(state): State<AppState>,
	req: Request<Body>,
	next: Next,
) -> Response {
	let Some(secret) = state.cron_secret() else {
		return json_error(
			StatusCode::INTERNAL_SERVER_ERROR,
			"configuration_error",
			"security.cron_secret is not configured.",
		)
		.into_response();
	};

	if read_bearer_token(req.headers()) != Some(secret) {
		return json_error(StatusCode::UNAUTHORIZED, "unauthorized", "A valid bearer token is required.")
			.into_response();
	}

	next.run(req).await
}

fn read_bearer_token(headers: &HeaderMap) -> Option<&str> {
	let raw = headers.get(AUTHORIZATION)?;
	let value = raw.to_str().ok()?.trim();
	let token = value.strip_prefix("Bearer ")?.trim();

	if token.is_empty() { None } else { Some(token) }
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

pub fn json_error(status: StatusCode, code: &str, message: impl Into<String>) -> ApiError {
	ApiError { status, error_code: code.to_string(), message: message.into() }
}

impl From<ServiceError> for ApiError {
	fn from(err: ServiceError) -> Self {
		match err {
			ServiceError::Configuration { message } =>
				json_error(StatusCode::INTERNAL_SERVER_ERROR, "configuration_error", message),
			ServiceError::InvalidRequest { message } =>
				json_error(StatusCode::BAD_REQUEST, "invalid_request", message),
			ServiceError::Provider { message } => {
				tracing::error!(error = %message, "Provider request failed.");

				json_error(StatusCode::BAD_GATEWAY, "provider_error", "Provider request failed.")
			},
			ServiceError::Storage { message } => {
				tracing::error!(error = %message, "Storage request failed.");

				json_error(StatusCode::INTERNAL_SERVER_ERROR, "storage_error", "Storage request failed.")
			},
		}
	}
}

impl IntoResponse for ApiError {
	fn into_response(self) -> Response {
		let body = ErrorBody { error_code: self.error_code, message: self.message };

		(self.status, Json(body)).into_response()
	}
}
