//! JSON REST API for Pacto.
//!
//! Exposes an axum [`Router`] over a [`TermCoordinator`] backed by any store
//! implementing the three `pacto_core::store` traits. Auth, TLS, and transport
//! concerns are the caller's responsibility.
//!
//! # Mounting
//!
//! ```rust,ignore
//! .nest("/api", pacto_api::api_router(state))
//! ```
//!
//! # Mutations
//!
//! Term mutations take `?confirm=true`. Without it, a change that needs
//! acknowledgement answers `409 Conflict` with the reasons and changes
//! nothing; repeating the same request with `confirm=true` applies it.

pub mod balance;
pub mod commitments;
pub mod error;
pub mod payments;
pub mod terms;

use std::sync::Arc;

use axum::{
  Json, Router,
  http::StatusCode,
  response::{IntoResponse, Response},
  routing::{get, patch, post, put},
};
use pacto_core::{
  TermCoordinator,
  mutation::Mutation,
  store::{CommitmentStore, PaymentStore, TermStore},
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tower_http::trace::TraceLayer;

pub use error::ApiError;

/// Everything a handler needs from storage.
pub trait Backend: CommitmentStore + TermStore + PaymentStore + 'static {}

impl<T> Backend for T where T: CommitmentStore + TermStore + PaymentStore + 'static {}

// ─── Application state ───────────────────────────────────────────────────────

pub struct AppState<S> {
  pub coordinator:    Arc<TermCoordinator<S>>,
  /// Months past the current one that open-ended schedules are shown for.
  pub horizon_months: u32,
}

impl<S> Clone for AppState<S> {
  fn clone(&self) -> Self {
    Self {
      coordinator:    self.coordinator.clone(),
      horizon_months: self.horizon_months,
    }
  }
}

impl<S: Backend> AppState<S> {
  pub fn new(store: Arc<S>, horizon_months: u32) -> Self {
    Self {
      coordinator: Arc::new(TermCoordinator::new(store)),
      horizon_months,
    }
  }

  pub(crate) fn store(&self) -> &S { self.coordinator.store() }
}

// ─── Router ──────────────────────────────────────────────────────────────────

/// Build a fully-materialised API router for `state`.
///
/// The returned `Router<()>` can be nested into any parent router regardless
/// of its own state type.
pub fn api_router<S: Backend>(state: AppState<S>) -> Router<()> {
  Router::new()
    // Commitments
    .route(
      "/commitments",
      get(commitments::list::<S>).post(commitments::create::<S>),
    )
    .route(
      "/commitments/{id}",
      get(commitments::get_one::<S>).delete(commitments::delete_one::<S>),
    )
    .route("/commitments/{id}/link", put(commitments::set_link::<S>))
    // Terms of a commitment
    .route(
      "/commitments/{id}/terms",
      get(terms::list::<S>).post(terms::create::<S>),
    )
    .route("/commitments/{id}/terms/suggestion", get(terms::suggestion::<S>))
    .route("/commitments/{id}/schedule", get(terms::schedule::<S>))
    // Payments
    .route(
      "/commitments/{id}/payments",
      get(payments::list::<S>).post(payments::record::<S>),
    )
    // Single terms
    .route(
      "/terms/{id}",
      patch(terms::update::<S>).delete(terms::delete_one::<S>),
    )
    .route("/terms/{id}/pause", post(terms::pause::<S>))
    .route(
      "/terms/{id}/resume",
      get(terms::resume_proposal::<S>).post(terms::resume::<S>),
    )
    .route("/terms/{id}/reopen", post(terms::reopen::<S>))
    // Calculations
    .route("/balance", post(balance::balance))
    .route("/totals", get(balance::totals::<S>))
    .layer(TraceLayer::new_for_http())
    .with_state(state)
}

// ─── Shared extractors and responses ─────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
pub struct ConfirmParams {
  #[serde(default)]
  pub confirm: bool,
}

/// `status` with the outcome when applied; `409` with every reason otherwise.
pub(crate) fn mutation_response<T: Serialize>(status: StatusCode, mutation: Mutation<T>) -> Response {
  match mutation {
    Mutation::Applied(outcome) => (status, Json(outcome)).into_response(),
    Mutation::ConfirmationRequired(request) => {
      let messages: Vec<String> = request.reasons.iter().map(ToString::to_string).collect();
      let body = json!({
        "error":    "confirmation required",
        "reasons":  request.reasons,
        "messages": messages,
      });
      (StatusCode::CONFLICT, Json(body)).into_response()
    }
  }
}

#[cfg(test)]
mod tests;
