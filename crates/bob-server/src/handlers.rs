use crate::error::{ApiError, ApiResult};
use crate::state::AppState;
use axum::Json;
use axum::body::Bytes;
use axum::extract::rejection::{FormRejection, JsonRejection};
use axum::extract::{Form, Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use bob_job::webhook::{GITHUB_EVENT_HEADER, github_push, travis_build};
use bob_job::{ExecutionMode, JobError, JobSnapshot, JobSpec, Submission};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// `/jobs/{id}/tail` の既定行数
pub const DEFAULT_TAIL_LINES: usize = 100;

pub async fn health() -> &'static str {
    "200 OK"
}

/// ジョブを投入し、モードに応じて 201 / 202 を返す
async fn submit(state: &AppState, spec: JobSpec) -> ApiResult<Response> {
    let mode = ExecutionMode::resolve(spec.sync, state.config.sync_by_default);
    let submission = state.runner.submit(spec, mode).await?;
    let status = match submission {
        Submission::Accepted(_) => StatusCode::ACCEPTED,
        Submission::Completed(_) => StatusCode::CREATED,
    };
    Ok((status, Json(submission.snapshot().clone())).into_response())
}

pub async fn docker_build(
    State(state): State<AppState>,
    payload: Result<Json<JobSpec>, JsonRejection>,
) -> ApiResult<Response> {
    let Json(spec) = payload.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    submit(&state, spec).await
}

pub async fn github(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> ApiResult<Response> {
    let event = headers
        .get(GITHUB_EVENT_HEADER)
        .and_then(|v| v.to_str().ok());
    let spec = github_push(event, &body)?;
    submit(&state, spec).await
}

#[derive(Debug, Deserialize)]
pub struct TravisForm {
    payload: String,
}

pub async fn travis(
    State(state): State<AppState>,
    form: Result<Form<TravisForm>, FormRejection>,
) -> ApiResult<Response> {
    let Form(form) = form.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    let spec = travis_build(&form.payload)?;
    submit(&state, spec).await
}

pub async fn list_jobs(State(state): State<AppState>) -> Json<Vec<JobSnapshot>> {
    Json(
        state
            .runner
            .registry()
            .all()
            .iter()
            .map(|job| job.snapshot())
            .collect(),
    )
}

fn parse_id(id: &str) -> ApiResult<Uuid> {
    // 不正なIDは存在しないジョブとして扱う
    Uuid::parse_str(id).map_err(|_| ApiError::Job(JobError::NotFound(Uuid::nil())))
}

pub async fn get_job(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<JobSnapshot>> {
    let id = parse_id(&id)?;
    Ok(Json(state.runner.registry().get(&id)?.snapshot()))
}

#[derive(Debug, Deserialize)]
pub struct TailQuery {
    n: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct TailResponse {
    pub lines: Vec<String>,
}

pub async fn tail_job(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<TailQuery>,
) -> ApiResult<Json<TailResponse>> {
    let id = parse_id(&id)?;
    let lines = state
        .runner
        .registry()
        .tail_log(&id, query.n.unwrap_or(DEFAULT_TAIL_LINES))?;
    Ok(Json(TailResponse { lines }))
}
