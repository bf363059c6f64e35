//! Handlers for `/commitments` endpoints.
//!
//! | Method   | Path | Notes |
//! |----------|------|-------|
//! | `GET`    | `/commitments` | |
//! | `POST`   | `/commitments` | Body: `{"name":"Rent","flow":"expense"}` |
//! | `GET`    | `/commitments/:id` | 404 if not found |
//! | `DELETE` | `/commitments/:id` | Also deletes its terms and payments |
//! | `PUT`    | `/commitments/:id/link` | Body: `{"partner":"<uuid>"}` or `{"partner":null}` |

use axum::{
  Json,
  extract::{Path, State},
  http::StatusCode,
  response::IntoResponse,
};
use pacto_core::{
  commitment::{Commitment, NewCommitment},
  store::CommitmentStore,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::{AppState, Backend, error::ApiError};

/// 404 unless the commitment exists.
pub(crate) async fn require<S: Backend>(store: &S, id: Uuid) -> Result<Commitment, ApiError> {
  store
    .get_commitment(id)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::NotFound(format!("commitment {id} not found")))
}

// ─── List ────────────────────────────────────────────────────────────────────

/// `GET /commitments`
pub async fn list<S: Backend>(
  State(state): State<AppState<S>>,
) -> Result<Json<Vec<Commitment>>, ApiError> {
  let commitments = state
    .store()
    .list_commitments()
    .await
    .map_err(ApiError::store)?;
  Ok(Json(commitments))
}

// ─── Create ──────────────────────────────────────────────────────────────────

/// `POST /commitments`
pub async fn create<S: Backend>(
  State(state): State<AppState<S>>,
  Json(body): Json<NewCommitment>,
) -> Result<impl IntoResponse, ApiError> {
  if body.name.trim().is_empty() {
    return Err(ApiError::BadRequest("name must not be empty".into()));
  }
  let commitment = state
    .store()
    .add_commitment(body)
    .await
    .map_err(ApiError::store)?;
  Ok((StatusCode::CREATED, Json(commitment)))
}

// ─── Get / delete ────────────────────────────────────────────────────────────

/// `GET /commitments/:id`
pub async fn get_one<S: Backend>(
  State(state): State<AppState<S>>,
  Path(id): Path<Uuid>,
) -> Result<Json<Commitment>, ApiError> {
  Ok(Json(require(state.store(), id).await?))
}

/// `DELETE /commitments/:id`
pub async fn delete_one<S: Backend>(
  State(state): State<AppState<S>>,
  Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
  require(state.store(), id).await?;
  state
    .store()
    .delete_commitment(id)
    .await
    .map_err(ApiError::store)?;
  tracing::info!(commitment_id = %id, "commitment deleted");
  Ok(StatusCode::NO_CONTENT)
}

// ─── Link ────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct LinkBody {
  pub partner: Option<Uuid>,
}

/// `PUT /commitments/:id/link`
pub async fn set_link<S: Backend>(
  State(state): State<AppState<S>>,
  Path(id): Path<Uuid>,
  Json(body): Json<LinkBody>,
) -> Result<Json<Commitment>, ApiError> {
  if body.partner == Some(id) {
    return Err(ApiError::BadRequest(
      "a commitment cannot be linked to itself".into(),
    ));
  }
  require(state.store(), id).await?;
  if let Some(partner) = body.partner {
    require(state.store(), partner).await?;
  }

  state
    .store()
    .set_link(id, body.partner)
    .await
    .map_err(ApiError::store)?;
  Ok(Json(require(state.store(), id).await?))
}
