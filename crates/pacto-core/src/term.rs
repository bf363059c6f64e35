//! Terms: versioned, time-bounded configurations of a commitment.
//!
//! A commitment is governed by a series of terms. Each term carries an
//! integer `version`; the highest version is the active one. There is no
//! stored "is active" flag.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};
use strum::{Display, EnumString};
use uuid::Uuid;

use crate::month::{MonthRange, YearMonth};

// ─── Frequency ───────────────────────────────────────────────────────────────

#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Frequency {
  Once,
  Monthly,
  Bimonthly,
  Quarterly,
  Semiannually,
  Annually,
}

impl Frequency {
  /// Months between consecutive occurrences. `Once` never steps.
  pub fn month_step(self) -> u32 {
    match self {
      Self::Once => 0,
      Self::Monthly => 1,
      Self::Bimonthly => 2,
      Self::Quarterly => 3,
      Self::Semiannually => 6,
      Self::Annually => 12,
    }
  }
}

// ─── Parameters ──────────────────────────────────────────────────────────────

/// Everything about a term that the user chooses. Shared by stored terms and
/// by candidates that have not been persisted yet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TermParams {
  /// Inclusive start. Only the month matters for range checks; the day feeds
  /// the due-day roll-over of the first period.
  pub effective_from:     NaiveDate,
  /// Inclusive end, normally the last day of a month. `None` = open-ended.
  #[serde(default)]
  pub effective_until:    Option<NaiveDate>,
  pub frequency:          Frequency,
  pub due_day_of_month:   u8,
  pub amount_original:    Decimal,
  pub currency_original:  String,
  /// Conversion rate to the base currency, frozen when the term was set.
  pub fx_rate_to_base:    Decimal,
  #[serde(default)]
  pub installments_count: Option<u32>,
  /// `true`: `amount_original` is a total split evenly over
  /// `installments_count`. `false`: it is the per-occurrence amount.
  #[serde(default)]
  pub is_divided_amount:  bool,
}

impl TermParams {
  /// Open-ended parameters at a conversion rate of one.
  pub fn new(
    effective_from: NaiveDate,
    frequency: Frequency,
    due_day_of_month: u8,
    amount_original: Decimal,
    currency_original: impl Into<String>,
  ) -> Self {
    Self {
      effective_from,
      effective_until: None,
      frequency,
      due_day_of_month,
      amount_original,
      currency_original: currency_original.into(),
      fx_rate_to_base: Decimal::ONE,
      installments_count: None,
      is_divided_amount: false,
    }
  }

  pub fn range(&self) -> MonthRange {
    MonthRange::from_dates(self.effective_from, self.effective_until)
  }

  pub fn duration_mode(&self) -> DurationMode {
    match (self.installments_count, self.effective_until) {
      (None, None) => DurationMode::Indefinite,
      (Some(n), None) => DurationMode::Installments(n),
      (None, Some(_)) => DurationMode::DateBounded,
      (Some(n), Some(_)) => DurationMode::InstallmentsAndDate(n),
    }
  }

  /// Produce the parameters that result from applying `patch`.
  pub fn apply(&self, patch: &TermPatch) -> TermParams {
    TermParams {
      effective_from:     patch.effective_from.unwrap_or(self.effective_from),
      effective_until:    patch.effective_until.unwrap_or(self.effective_until),
      frequency:          patch.frequency.unwrap_or(self.frequency),
      due_day_of_month:   patch.due_day_of_month.unwrap_or(self.due_day_of_month),
      amount_original:    patch.amount_original.unwrap_or(self.amount_original),
      currency_original:  patch
        .currency_original
        .clone()
        .unwrap_or_else(|| self.currency_original.clone()),
      fx_rate_to_base:    patch.fx_rate_to_base.unwrap_or(self.fx_rate_to_base),
      installments_count: patch
        .installments_count
        .unwrap_or(self.installments_count),
      is_divided_amount:  patch.is_divided_amount.unwrap_or(self.is_divided_amount),
    }
  }

  /// Structural fields whose values differ between `self` and `other`.
  pub fn structural_diff(&self, other: &TermParams) -> Vec<StructuralField> {
    let mut changed = Vec::new();
    if self.amount_original != other.amount_original {
      changed.push(StructuralField::AmountOriginal);
    }
    if self.frequency != other.frequency {
      changed.push(StructuralField::Frequency);
    }
    if self.is_divided_amount != other.is_divided_amount {
      changed.push(StructuralField::IsDividedAmount);
    }
    changed
  }

  /// Same money flow: amount, frequency, due day, currency and frozen rate
  /// all equal.
  pub fn same_schedule_as(&self, other: &TermParams) -> bool {
    self.amount_original == other.amount_original
      && self.frequency == other.frequency
      && self.due_day_of_month == other.due_day_of_month
      && self.currency_original == other.currency_original
      && self.fx_rate_to_base == other.fx_rate_to_base
  }
}

/// How a term's duration is declared.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", content = "installments", rename_all = "snake_case")]
pub enum DurationMode {
  /// No end date, no count.
  Indefinite,
  /// Bounded by occurrence count only.
  Installments(u32),
  /// Bounded by end date only.
  DateBounded,
  /// Both declared; whichever bound is reached first wins.
  InstallmentsAndDate(u32),
}

/// Fields whose change after a paid payment forces a new term version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum StructuralField {
  AmountOriginal,
  Frequency,
  IsDividedAmount,
}

// ─── Term ────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Term {
  pub term_id:       Uuid,
  pub commitment_id: Uuid,
  /// Unique and strictly increasing per commitment.
  pub version:       u32,
  #[serde(flatten)]
  pub params:        TermParams,
  pub created_at:    DateTime<Utc>,
}

impl Term {
  pub fn range(&self) -> MonthRange { self.params.range() }

  pub fn from_month(&self) -> YearMonth { self.params.effective_from.into() }

  pub fn until_month(&self) -> Option<YearMonth> {
    self.params.effective_until.map(YearMonth::from)
  }

  pub fn is_open_ended(&self) -> bool { self.params.effective_until.is_none() }
}

/// Where a term sits relative to "today".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TermState {
  Scheduled,
  Active,
  Historic,
}

/// Input to [`crate::store::TermStore::create_term`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewTerm {
  pub version: u32,
  #[serde(flatten)]
  pub params:  TermParams,
}

// ─── TermPatch ───────────────────────────────────────────────────────────────

/// A partial edit of a term. Absent fields are left untouched. The nullable
/// fields are tri-state: absent keeps, `Some(None)` clears, `Some(Some(v))`
/// sets.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TermPatch {
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub effective_from:     Option<NaiveDate>,
  #[serde(
    default,
    deserialize_with = "double_option",
    skip_serializing_if = "Option::is_none"
  )]
  pub effective_until:    Option<Option<NaiveDate>>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub frequency:          Option<Frequency>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub due_day_of_month:   Option<u8>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub amount_original:    Option<Decimal>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub currency_original:  Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub fx_rate_to_base:    Option<Decimal>,
  #[serde(
    default,
    deserialize_with = "double_option",
    skip_serializing_if = "Option::is_none"
  )]
  pub installments_count: Option<Option<u32>>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub is_divided_amount:  Option<bool>,
}

impl TermPatch {
  /// Set `effective_until` to the last day of `month`.
  pub fn close_at(month: YearMonth) -> Self {
    Self {
      effective_until: Some(Some(month.last_day())),
      ..Self::default()
    }
  }

  /// Clear `effective_until`, making the term open-ended again.
  pub fn reopen() -> Self {
    Self {
      effective_until: Some(None),
      ..Self::default()
    }
  }

  /// The patch that turns `current` into `target`, field by field.
  pub fn between(current: &TermParams, target: &TermParams) -> Self {
    fn changed<T: PartialEq + Clone>(a: &T, b: &T) -> Option<T> {
      (a != b).then(|| b.clone())
    }
    Self {
      effective_from:     changed(&current.effective_from, &target.effective_from),
      effective_until:    changed(&current.effective_until, &target.effective_until),
      frequency:          changed(&current.frequency, &target.frequency),
      due_day_of_month:   changed(&current.due_day_of_month, &target.due_day_of_month),
      amount_original:    changed(&current.amount_original, &target.amount_original),
      currency_original:  changed(&current.currency_original, &target.currency_original),
      fx_rate_to_base:    changed(&current.fx_rate_to_base, &target.fx_rate_to_base),
      installments_count: changed(
        &current.installments_count,
        &target.installments_count,
      ),
      is_divided_amount:  changed(&current.is_divided_amount, &target.is_divided_amount),
    }
  }

  pub fn is_empty(&self) -> bool { *self == Self::default() }
}

/// Distinguish a missing field (outer `None`) from an explicit `null`.
fn double_option<'de, D, T>(de: D) -> Result<Option<Option<T>>, D::Error>
where
  D: Deserializer<'de>,
  T: Deserialize<'de>,
{
  Option::<T>::deserialize(de).map(Some)
}
