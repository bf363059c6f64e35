//! Store traits: the persistence collaborators of the engine.
//!
//! Implemented by storage backends (e.g. `pacto-store-sqlite`). The engine
//! pre-validates every change, but a backend must still reject writes that
//! break the term invariants; it is the final authority.
//!
//! All methods return `Send` futures so the traits can be used in
//! multi-threaded async runtimes.

use std::future::Future;

use uuid::Uuid;

use crate::{
  commitment::{Commitment, NewCommitment},
  payment::{NewPayment, Payment},
  term::{NewTerm, Term, TermPatch},
};

pub trait CommitmentStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  fn add_commitment(
    &self,
    input: NewCommitment,
  ) -> impl Future<Output = Result<Commitment, Self::Error>> + Send + '_;

  /// Returns `None` if not found.
  fn get_commitment(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<Commitment>, Self::Error>> + Send + '_;

  fn list_commitments(
    &self,
  ) -> impl Future<Output = Result<Vec<Commitment>, Self::Error>> + Send + '_;

  /// Link `id` with `partner` on both sides, or unlink it with `None`. Any
  /// previous partner of either side is unlinked.
  fn set_link(
    &self,
    id: Uuid,
    partner: Option<Uuid>,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// Delete a commitment together with its terms and payments.
  fn delete_commitment(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;
}

pub trait TermStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// All versions of a commitment's terms, in any order.
  fn list_terms(
    &self,
    commitment_id: Uuid,
  ) -> impl Future<Output = Result<Vec<Term>, Self::Error>> + Send + '_;

  fn get_term(
    &self,
    term_id: Uuid,
  ) -> impl Future<Output = Result<Option<Term>, Self::Error>> + Send + '_;

  /// Persist a new term. Must fail on a duplicate version or an overlapping
  /// range.
  fn create_term(
    &self,
    commitment_id: Uuid,
    input: NewTerm,
  ) -> impl Future<Output = Result<Term, Self::Error>> + Send + '_;

  fn update_term(
    &self,
    term_id: Uuid,
    patch: TermPatch,
  ) -> impl Future<Output = Result<Term, Self::Error>> + Send + '_;

  /// Must fail while any payment falls inside the term's range.
  fn delete_term(
    &self,
    term_id: Uuid,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;
}

pub trait PaymentStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  fn list_payments(
    &self,
    commitment_id: Uuid,
  ) -> impl Future<Output = Result<Vec<Payment>, Self::Error>> + Send + '_;

  /// Record a payment row for a period. Owned by the surrounding application;
  /// the engine never calls it.
  fn record_payment(
    &self,
    input: NewPayment,
  ) -> impl Future<Output = Result<Payment, Self::Error>> + Send + '_;

  fn delete_payment(
    &self,
    payment_id: Uuid,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;
}
