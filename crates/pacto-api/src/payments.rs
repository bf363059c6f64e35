//! Handlers for `/commitments/:id/payments`.
//!
//! Recording payments belongs to the application around the term engine;
//! these endpoints exist so that schedules and orphan checks have something to
//! work with.

use axum::{
  Json,
  extract::{Path, State},
  http::StatusCode,
  response::IntoResponse,
};
use chrono::NaiveDate;
use pacto_core::{
  YearMonth,
  payment::{NewPayment, Payment},
  store::PaymentStore,
};
use rust_decimal::Decimal;
use serde::Deserialize;
use uuid::Uuid;

use crate::{AppState, Backend, commitments::require, error::ApiError};

/// `GET /commitments/:id/payments`
pub async fn list<S: Backend>(
  State(state): State<AppState<S>>,
  Path(id): Path<Uuid>,
) -> Result<Json<Vec<Payment>>, ApiError> {
  require(state.store(), id).await?;
  let mut payments = state
    .store()
    .list_payments(id)
    .await
    .map_err(ApiError::store)?;
  payments.sort_by_key(|p| p.period);
  Ok(Json(payments))
}

#[derive(Debug, Deserialize)]
pub struct RecordBody {
  pub period:            YearMonth,
  /// Omit for a pending row.
  #[serde(default)]
  pub payment_date:      Option<NaiveDate>,
  pub amount_original:   Decimal,
  pub currency_original: String,
  pub amount_in_base:    Decimal,
}

/// `POST /commitments/:id/payments`
pub async fn record<S: Backend>(
  State(state): State<AppState<S>>,
  Path(id): Path<Uuid>,
  Json(body): Json<RecordBody>,
) -> Result<impl IntoResponse, ApiError> {
  require(state.store(), id).await?;
  let payment = state
    .store()
    .record_payment(NewPayment {
      commitment_id:     id,
      period:            body.period,
      payment_date:      body.payment_date,
      amount_original:   body.amount_original,
      currency_original: body.currency_original,
      amount_in_base:    body.amount_in_base,
    })
    .await
    .map_err(ApiError::store)?;
  Ok((StatusCode::CREATED, Json(payment)))
}
