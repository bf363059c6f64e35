//! Calculation endpoints: `POST /balance` and `GET /totals`.

use std::collections::HashMap;

use axum::{
  Json,
  extract::{Query, State},
};
use pacto_core::{
  YearMonth,
  balance::{DurationField, rebalance},
  link::{CategoryTotal, net_totals},
  store::CommitmentStore,
  term::{DurationMode, TermParams},
};
use serde::{Deserialize, Serialize};

use crate::{AppState, Backend, error::ApiError};

// ─── Auto-balance ────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct BalanceBody {
  pub params:      TermParams,
  pub last_edited: DurationField,
}

#[derive(Debug, Serialize)]
pub struct Balanced {
  pub params:        TermParams,
  pub duration_mode: DurationMode,
}

/// `POST /balance`: recompute the duration field that was not edited last.
pub async fn balance(Json(body): Json<BalanceBody>) -> Json<Balanced> {
  let mut params = body.params;
  rebalance(&mut params, body.last_edited);
  Json(Balanced {
    duration_mode: params.duration_mode(),
    params,
  })
}

// ─── Totals ──────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct TotalsParams {
  pub period: YearMonth,
}

/// `GET /totals?period=YYYY-MM`: expected amounts per flow and category, with
/// linked commitments netted against each other.
pub async fn totals<S: Backend>(
  State(state): State<AppState<S>>,
  Query(query): Query<TotalsParams>,
) -> Result<Json<Vec<CategoryTotal>>, ApiError> {
  let commitments = state
    .store()
    .list_commitments()
    .await
    .map_err(ApiError::store)?;

  let mut schedules = HashMap::with_capacity(commitments.len());
  for c in &commitments {
    let of_commitment = state
      .coordinator
      .schedules(c.commitment_id, query.period)
      .await?;
    schedules.insert(c.commitment_id, of_commitment);
  }
  Ok(Json(net_totals(&commitments, &schedules, query.period)))
}
