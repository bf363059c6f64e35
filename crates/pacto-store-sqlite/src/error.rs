//! Error type for `pacto-store-sqlite`.

use pacto_core::month::{ParseMonthError, YearMonth};
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum Error {
  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  #[error("sqlite error: {0}")]
  Sqlite(#[from] rusqlite::Error),

  #[error("uuid parse error: {0}")]
  Uuid(#[from] uuid::Error),

  #[error("decimal parse error: {0}")]
  Decimal(#[from] rust_decimal::Error),

  #[error(transparent)]
  Month(#[from] ParseMonthError),

  #[error("unknown enum value: {0}")]
  Enum(#[from] strum::ParseError),

  #[error("date/time parse error: {0}")]
  DateParse(String),

  #[error("commitment not found: {0}")]
  CommitmentNotFound(Uuid),

  #[error("term not found: {0}")]
  TermNotFound(Uuid),

  #[error("payment not found: {0}")]
  PaymentNotFound(Uuid),

  #[error("a commitment cannot be linked to itself")]
  SelfLink,

  // Term invariants. The engine checks these first; the store re-checks
  // them on every write.
  #[error("term v{0} already exists for this commitment")]
  DuplicateVersion(u32),

  #[error("range overlaps term v{0}")]
  Overlap(u32),

  #[error("effective_until {until} is before effective_from {from}")]
  EndBeforeStart { from: YearMonth, until: YearMonth },

  #[error("term v{version} still has {count} payment(s) inside its range")]
  TermHasPayments { version: u32, count: usize },

  #[error("a payment for {0} is already recorded")]
  DuplicatePayment(YearMonth),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
