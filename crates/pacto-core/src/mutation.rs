//! Results of term mutations.
//!
//! A mutation either applies or asks for explicit acknowledgement. Asking is
//! not an error: the caller shows the reasons and retries the same call with
//! `confirm = true`.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
  month::YearMonth,
  term::{StructuralField, Term},
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", content = "data", rename_all = "snake_case")]
pub enum Mutation<T> {
  Applied(T),
  ConfirmationRequired(ConfirmationRequest),
}

impl<T> Mutation<T> {
  pub fn applied(self) -> Option<T> {
    match self {
      Self::Applied(v) => Some(v),
      Self::ConfirmationRequired(_) => None,
    }
  }

  pub fn confirmation(&self) -> Option<&ConfirmationRequest> {
    match self {
      Self::Applied(_) => None,
      Self::ConfirmationRequired(req) => Some(req),
    }
  }
}

/// Every reason a mutation needs acknowledgement, gathered at once.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfirmationRequest {
  pub reasons: Vec<ConfirmationReason>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum ConfirmationReason {
  /// A one- or two-month term is often an edit in disguise.
  ShortDuration { months: u32 },
  /// Pending payment rows outside the new range will be deleted.
  PendingPaymentsDropped { periods: Vec<YearMonth> },
  /// An open-ended term gets an end date.
  EndDateDefined { until: YearMonth },
  EndDateShortened { from: YearMonth, to: YearMonth },
  /// Paid history forces the edit into a new version.
  StructuralChange {
    changed:  Vec<StructuralField>,
    close_at: YearMonth,
    new_from: YearMonth,
  },
}

impl fmt::Display for ConfirmationReason {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Self::ShortDuration { months } => write!(
        f,
        "the term lasts only {months} month(s); did you mean to edit an existing term?"
      ),
      Self::PendingPaymentsDropped { periods } => {
        write!(f, "{} pending payment(s) will be removed", periods.len())
      }
      Self::EndDateDefined { until } => write!(f, "the term will end in {until}"),
      Self::EndDateShortened { from, to } => {
        write!(f, "the term end moves from {from} to {to}")
      }
      Self::StructuralChange { changed, close_at, new_from } => {
        let fields: Vec<String> = changed.iter().map(ToString::to_string).collect();
        write!(
          f,
          "changing {} closes the current term at {close_at} and starts a new version in {new_from}",
          fields.join(", ")
        )
      }
    }
  }
}

// ─── Outcomes ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CreateOutcome {
  /// A new version was written; `closed` is the previously open-ended term
  /// that had to end first.
  Created { term: Term, closed: Option<Term> },
  /// The previous term was re-opened instead of adding a version.
  Extended { term: Term },
}

impl CreateOutcome {
  pub fn term(&self) -> &Term {
    match self {
      Self::Created { term, .. } | Self::Extended { term } => term,
    }
  }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum UpdateOutcome {
  Updated {
    term:             Term,
    dropped_payments: Vec<Uuid>,
  },
  Reversioned { closed: Term, created: Term },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeleteOutcome {
  pub deleted:          Term,
  /// The contiguous predecessor that may be re-opened to restore continuity.
  pub reopen_candidate: Option<Term>,
  /// Set when the caller asked for the re-open and it succeeded.
  pub reopened:         Option<Term>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StartScenario {
  WillCloseActive,
  FillingGap,
  Normal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StartSuggestion {
  pub month:    YearMonth,
  pub scenario: StartScenario,
}
