//! Payments: recorded occurrences of a term.
//!
//! A payment names the calendar month it settles and nothing else about its
//! term. Which term owns it is looked up from the period against the current
//! term ranges (see [`TermSet::term_for_period`](crate::versions::TermSet::term_for_period)),
//! so editing ranges re-attributes payments without touching them.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::month::YearMonth;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Payment {
  pub payment_id:        Uuid,
  pub commitment_id:     Uuid,
  /// The month this payment represents. Never changes once recorded.
  pub period:            YearMonth,
  /// Present when the period has actually been paid.
  pub payment_date:      Option<NaiveDate>,
  pub amount_original:   Decimal,
  pub currency_original: String,
  pub amount_in_base:    Decimal,
}

impl Payment {
  pub fn is_paid(&self) -> bool { self.payment_date.is_some() }
}

/// Input to [`crate::store::PaymentStore::record_payment`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewPayment {
  pub commitment_id:     Uuid,
  pub period:            YearMonth,
  #[serde(default)]
  pub payment_date:      Option<NaiveDate>,
  pub amount_original:   Decimal,
  pub currency_original: String,
  pub amount_in_base:    Decimal,
}
