//! Commitment: the envelope that owns a series of terms.
//!
//! A commitment carries only descriptive metadata. Amounts and dates live on
//! its [`Term`](crate::term::Term)s.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use uuid::Uuid;

/// Which way money moves for a commitment.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  PartialOrd,
  Ord,
  Hash,
  Serialize,
  Deserialize,
  Display,
  EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Flow {
  Expense,
  Income,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Commitment {
  pub commitment_id:        Uuid,
  pub name:                 String,
  /// Opaque reference into the category catalogue.
  pub category_id:          Option<Uuid>,
  pub flow:                 Flow,
  pub is_important:         bool,
  /// Reciprocal offset link. Either side may hold the pointer; resolve it
  /// through [`LinkGraph`](crate::link::LinkGraph) rather than trusting one
  /// side alone.
  pub linked_commitment_id: Option<Uuid>,
  pub note:                 Option<String>,
  pub created_at:           DateTime<Utc>,
}

/// Input to [`crate::store::CommitmentStore::add_commitment`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewCommitment {
  pub name:         String,
  #[serde(default)]
  pub category_id:  Option<Uuid>,
  pub flow:         Flow,
  #[serde(default)]
  pub is_important: bool,
  #[serde(default)]
  pub note:         Option<String>,
}

impl NewCommitment {
  pub fn new(name: impl Into<String>, flow: Flow) -> Self {
    Self {
      name: name.into(),
      category_id: None,
      flow,
      is_important: false,
      note: None,
    }
  }
}
