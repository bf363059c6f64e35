//! Handlers for term endpoints.
//!
//! | Method   | Path | Notes |
//! |----------|------|-------|
//! | `GET`    | `/commitments/:id/terms` | Ordered by version |
//! | `POST`   | `/commitments/:id/terms` | Body: term parameters. `?confirm`, `?last_edited=installments\|end_date` |
//! | `GET`    | `/commitments/:id/terms/suggestion` | Suggested start month |
//! | `GET`    | `/commitments/:id/schedule` | Optional `?horizon=YYYY-MM` |
//! | `PATCH`  | `/terms/:id` | Body: partial term. `?confirm` |
//! | `DELETE` | `/terms/:id` | `?reopen_previous=true` also re-opens the predecessor |
//! | `POST`   | `/terms/:id/pause` | Body: `{"last_active":"YYYY-MM"}`. `?confirm` |
//! | `GET`    | `/terms/:id/resume` | Proposed resume parameters |
//! | `POST`   | `/terms/:id/resume` | `?confirm` |
//! | `POST`   | `/terms/:id/reopen` | Clears the end date of the latest term |

use axum::{
  Json,
  extract::{Path, Query, State},
  http::StatusCode,
  response::Response,
};
use pacto_core::{
  YearMonth,
  balance::{DurationField, rebalance},
  mutation::{DeleteOutcome, StartSuggestion},
  periods::PeriodSchedule,
  term::{Term, TermParams, TermPatch},
};
use serde::Deserialize;
use uuid::Uuid;

use crate::{
  AppState, Backend, ConfirmParams, commitments::require, error::ApiError, mutation_response,
};

// ─── Reads ───────────────────────────────────────────────────────────────────

/// `GET /commitments/:id/terms`
pub async fn list<S: Backend>(
  State(state): State<AppState<S>>,
  Path(id): Path<Uuid>,
) -> Result<Json<Vec<Term>>, ApiError> {
  require(state.store(), id).await?;
  let terms = state.coordinator.terms(id).await?;
  Ok(Json(terms.into_vec()))
}

/// `GET /commitments/:id/terms/suggestion`
pub async fn suggestion<S: Backend>(
  State(state): State<AppState<S>>,
  Path(id): Path<Uuid>,
) -> Result<Json<StartSuggestion>, ApiError> {
  require(state.store(), id).await?;
  Ok(Json(state.coordinator.suggest_start(id).await?))
}

#[derive(Debug, Deserialize)]
pub struct ScheduleParams {
  pub horizon: Option<YearMonth>,
}

/// `GET /commitments/:id/schedule[?horizon=YYYY-MM]`
pub async fn schedule<S: Backend>(
  State(state): State<AppState<S>>,
  Path(id): Path<Uuid>,
  Query(params): Query<ScheduleParams>,
) -> Result<Json<Vec<PeriodSchedule>>, ApiError> {
  require(state.store(), id).await?;
  let horizon = params
    .horizon
    .unwrap_or_else(|| state.coordinator.horizon(state.horizon_months));
  Ok(Json(state.coordinator.schedules(id, horizon).await?))
}

// ─── Create ──────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct CreateParams {
  #[serde(default)]
  pub confirm:     bool,
  /// Rebalance the other duration field before creating.
  pub last_edited: Option<DurationField>,
}

/// `POST /commitments/:id/terms`
pub async fn create<S: Backend>(
  State(state): State<AppState<S>>,
  Path(id): Path<Uuid>,
  Query(query): Query<CreateParams>,
  Json(mut params): Json<TermParams>,
) -> Result<Response, ApiError> {
  require(state.store(), id).await?;
  if let Some(field) = query.last_edited {
    rebalance(&mut params, field);
  }
  let mutation = state
    .coordinator
    .create_term(id, params, query.confirm)
    .await?;
  Ok(mutation_response(StatusCode::CREATED, mutation))
}

// ─── Update / delete ─────────────────────────────────────────────────────────

/// `PATCH /terms/:id`
pub async fn update<S: Backend>(
  State(state): State<AppState<S>>,
  Path(id): Path<Uuid>,
  Query(query): Query<ConfirmParams>,
  Json(patch): Json<TermPatch>,
) -> Result<Response, ApiError> {
  let mutation = state
    .coordinator
    .update_term(id, patch, query.confirm)
    .await?;
  Ok(mutation_response(StatusCode::OK, mutation))
}

#[derive(Debug, Deserialize)]
pub struct DeleteParams {
  #[serde(default)]
  pub reopen_previous: bool,
}

/// `DELETE /terms/:id[?reopen_previous=true]`
pub async fn delete_one<S: Backend>(
  State(state): State<AppState<S>>,
  Path(id): Path<Uuid>,
  Query(query): Query<DeleteParams>,
) -> Result<Json<DeleteOutcome>, ApiError> {
  let outcome = if query.reopen_previous {
    state.coordinator.delete_and_reopen(id).await?
  } else {
    state.coordinator.delete_term(id).await?
  };
  Ok(Json(outcome))
}

// ─── Lifecycle ───────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct PauseBody {
  pub last_active: YearMonth,
}

/// `POST /terms/:id/pause`
pub async fn pause<S: Backend>(
  State(state): State<AppState<S>>,
  Path(id): Path<Uuid>,
  Query(query): Query<ConfirmParams>,
  Json(body): Json<PauseBody>,
) -> Result<Response, ApiError> {
  let mutation = state
    .coordinator
    .pause_term(id, body.last_active, query.confirm)
    .await?;
  Ok(mutation_response(StatusCode::OK, mutation))
}

/// `GET /terms/:id/resume`
pub async fn resume_proposal<S: Backend>(
  State(state): State<AppState<S>>,
  Path(id): Path<Uuid>,
) -> Result<Json<TermParams>, ApiError> {
  Ok(Json(state.coordinator.propose_resume(id).await?))
}

/// `POST /terms/:id/resume`
pub async fn resume<S: Backend>(
  State(state): State<AppState<S>>,
  Path(id): Path<Uuid>,
  Query(query): Query<ConfirmParams>,
) -> Result<Response, ApiError> {
  let mutation = state.coordinator.resume_term(id, query.confirm).await?;
  Ok(mutation_response(StatusCode::CREATED, mutation))
}

/// `POST /terms/:id/reopen`
pub async fn reopen<S: Backend>(
  State(state): State<AppState<S>>,
  Path(id): Path<Uuid>,
) -> Result<Json<Term>, ApiError> {
  Ok(Json(state.coordinator.reopen_term(id).await?))
}
