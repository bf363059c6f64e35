//! Error types for `pacto-core`.

use rust_decimal::Decimal;
use thiserror::Error;
use uuid::Uuid;

use crate::month::{MonthRange, YearMonth};

/// A rule violation detected before anything was persisted. Always
/// recoverable by changing the input.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
  #[error("amount must be greater than zero, got {0}")]
  NonPositiveAmount(Decimal),

  #[error("conversion rate must be greater than zero, got {0}")]
  NonPositiveFxRate(Decimal),

  #[error("currency is required")]
  MissingCurrency,

  #[error("due day must be between 1 and 31, got {0}")]
  InvalidDueDay(u8),

  #[error("installment count must be at least 1")]
  ZeroInstallments,

  #[error("a divided amount requires an installment count")]
  DividedWithoutInstallments,

  #[error("end {until} is before start {from}")]
  EndBeforeStart { from: YearMonth, until: YearMonth },

  #[error("overlaps term v{version} ({range})")]
  Overlap { version: u32, range: MonthRange },

  #[error(
    "term v{version} has paid payments that would fall outside its range: {}",
    list_months(.periods)
  )]
  OrphanedPaidPayments { version: u32, periods: Vec<YearMonth> },

  #[error(
    "term v{version} starts {from}; it cannot be closed at {close_at}"
  )]
  CloseBeforeStart {
    version:  u32,
    from:     YearMonth,
    close_at: YearMonth,
  },

  #[error("term v{version} has {count} recorded payment(s) and cannot be deleted")]
  TermHasPayments { version: u32, count: usize },

  #[error("the only term of a commitment cannot be deleted")]
  LastTerm,

  #[error("term v{version} cannot be changed structurally: {reason}")]
  NotReversionable { version: u32, reason: &'static str },

  #[error("term v{version} cannot be paused: {reason}")]
  NotPausable { version: u32, reason: &'static str },

  #[error("term v{version} cannot be resumed: {reason}")]
  NotResumable { version: u32, reason: &'static str },

  #[error("term v{version} cannot be reopened: {reason}")]
  NotReopenable { version: u32, reason: &'static str },
}

fn list_months(months: &[YearMonth]) -> String {
  months
    .iter()
    .map(YearMonth::to_string)
    .collect::<Vec<_>>()
    .join(", ")
}

#[derive(Debug, Error)]
pub enum Error {
  #[error(transparent)]
  Validation(#[from] ValidationError),

  #[error("term not found: {0}")]
  TermNotFound(Uuid),

  #[error("another change to commitment {0} is still in progress")]
  MutationInProgress(Uuid),

  /// The first step of a multi-step change was committed and the next one
  /// failed. Nothing is rolled back.
  #[error("{completed}, but could not {remaining}: {source}")]
  PartialFailure {
    completed: String,
    remaining: String,
    #[source]
    source:    Box<dyn std::error::Error + Send + Sync>,
  },

  #[error("store error: {0}")]
  Persistence(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl Error {
  pub(crate) fn persistence<E>(err: E) -> Self
  where
    E: std::error::Error + Send + Sync + 'static,
  {
    Self::Persistence(Box::new(err))
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
