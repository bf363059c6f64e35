//! Encoding and decoding helpers between Rust domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! Timestamps are RFC 3339 strings, calendar dates `YYYY-MM-DD`, months
//! `YYYY-MM`. Decimals are stored as their exact string form. UUIDs are
//! stored as hyphenated lowercase strings.

use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use pacto_core::{
  commitment::{Commitment, Flow},
  month::YearMonth,
  payment::Payment,
  term::{Frequency, Term, TermParams},
};
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::{Error, Result};

// ─── Scalars ─────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339() }

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

pub fn encode_date(d: NaiveDate) -> String { d.format("%Y-%m-%d").to_string() }

pub fn decode_date(s: &str) -> Result<NaiveDate> {
  NaiveDate::parse_from_str(s, "%Y-%m-%d").map_err(|e| Error::DateParse(e.to_string()))
}

pub fn encode_month(m: YearMonth) -> String { m.to_string() }

pub fn decode_month(s: &str) -> Result<YearMonth> { Ok(s.parse()?) }

pub fn decode_decimal(s: &str) -> Result<Decimal> { Ok(Decimal::from_str(s)?) }

// ─── Row types ───────────────────────────────────────────────────────────────

pub const COMMITMENT_COLUMNS: &str = "commitment_id, name, category_id, flow, is_important, \
                                      linked_commitment_id, note, created_at";

/// Raw values read directly from a `commitments` row.
pub struct RawCommitment {
  pub commitment_id:        String,
  pub name:                 String,
  pub category_id:          Option<String>,
  pub flow:                 String,
  pub is_important:         bool,
  pub linked_commitment_id: Option<String>,
  pub note:                 Option<String>,
  pub created_at:           String,
}

impl RawCommitment {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      commitment_id:        row.get(0)?,
      name:                 row.get(1)?,
      category_id:          row.get(2)?,
      flow:                 row.get(3)?,
      is_important:         row.get(4)?,
      linked_commitment_id: row.get(5)?,
      note:                 row.get(6)?,
      created_at:           row.get(7)?,
    })
  }

  pub fn into_commitment(self) -> Result<Commitment> {
    Ok(Commitment {
      commitment_id:        decode_uuid(&self.commitment_id)?,
      name:                 self.name,
      category_id:          self.category_id.as_deref().map(decode_uuid).transpose()?,
      flow:                 Flow::from_str(&self.flow)?,
      is_important:         self.is_important,
      linked_commitment_id: self
        .linked_commitment_id
        .as_deref()
        .map(decode_uuid)
        .transpose()?,
      note:                 self.note,
      created_at:           decode_dt(&self.created_at)?,
    })
  }
}

pub const TERM_COLUMNS: &str = "term_id, commitment_id, version, effective_from, \
                                effective_until, frequency, due_day_of_month, amount_original, \
                                currency_original, fx_rate_to_base, installments_count, \
                                is_divided_amount, created_at";

/// Raw values of a `terms` row. Used in both directions: decoded on read,
/// built from a [`Term`] on write.
pub struct RawTerm {
  pub term_id:            String,
  pub commitment_id:      String,
  pub version:            u32,
  pub effective_from:     String,
  pub effective_until:    Option<String>,
  pub frequency:          String,
  pub due_day_of_month:   u8,
  pub amount_original:    String,
  pub currency_original:  String,
  pub fx_rate_to_base:    String,
  pub installments_count: Option<u32>,
  pub is_divided_amount:  bool,
  pub created_at:         String,
}

impl RawTerm {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      term_id:            row.get(0)?,
      commitment_id:      row.get(1)?,
      version:            row.get(2)?,
      effective_from:     row.get(3)?,
      effective_until:    row.get(4)?,
      frequency:          row.get(5)?,
      due_day_of_month:   row.get(6)?,
      amount_original:    row.get(7)?,
      currency_original:  row.get(8)?,
      fx_rate_to_base:    row.get(9)?,
      installments_count: row.get(10)?,
      is_divided_amount:  row.get(11)?,
      created_at:         row.get(12)?,
    })
  }

  pub fn from_term(term: &Term) -> Self {
    let p = &term.params;
    Self {
      term_id:            encode_uuid(term.term_id),
      commitment_id:      encode_uuid(term.commitment_id),
      version:            term.version,
      effective_from:     encode_date(p.effective_from),
      effective_until:    p.effective_until.map(encode_date),
      frequency:          p.frequency.to_string(),
      due_day_of_month:   p.due_day_of_month,
      amount_original:    p.amount_original.to_string(),
      currency_original:  p.currency_original.clone(),
      fx_rate_to_base:    p.fx_rate_to_base.to_string(),
      installments_count: p.installments_count,
      is_divided_amount:  p.is_divided_amount,
      created_at:         encode_dt(term.created_at),
    }
  }

  pub fn into_term(self) -> Result<Term> {
    Ok(Term {
      term_id:       decode_uuid(&self.term_id)?,
      commitment_id: decode_uuid(&self.commitment_id)?,
      version:       self.version,
      params:        TermParams {
        effective_from:     decode_date(&self.effective_from)?,
        effective_until:    self.effective_until.as_deref().map(decode_date).transpose()?,
        frequency:          Frequency::from_str(&self.frequency)?,
        due_day_of_month:   self.due_day_of_month,
        amount_original:    decode_decimal(&self.amount_original)?,
        currency_original:  self.currency_original,
        fx_rate_to_base:    decode_decimal(&self.fx_rate_to_base)?,
        installments_count: self.installments_count,
        is_divided_amount:  self.is_divided_amount,
      },
      created_at:    decode_dt(&self.created_at)?,
    })
  }
}

pub const PAYMENT_COLUMNS: &str = "payment_id, commitment_id, period, payment_date, \
                                   amount_original, currency_original, amount_in_base";

/// Raw values read directly from a `payments` row.
pub struct RawPayment {
  pub payment_id:        String,
  pub commitment_id:     String,
  pub period:            String,
  pub payment_date:      Option<String>,
  pub amount_original:   String,
  pub currency_original: String,
  pub amount_in_base:    String,
}

impl RawPayment {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      payment_id:        row.get(0)?,
      commitment_id:     row.get(1)?,
      period:            row.get(2)?,
      payment_date:      row.get(3)?,
      amount_original:   row.get(4)?,
      currency_original: row.get(5)?,
      amount_in_base:    row.get(6)?,
    })
  }

  pub fn into_payment(self) -> Result<Payment> {
    Ok(Payment {
      payment_id:        decode_uuid(&self.payment_id)?,
      commitment_id:     decode_uuid(&self.commitment_id)?,
      period:            decode_month(&self.period)?,
      payment_date:      self.payment_date.as_deref().map(decode_date).transpose()?,
      amount_original:   decode_decimal(&self.amount_original)?,
      currency_original: self.currency_original,
      amount_in_base:    decode_decimal(&self.amount_in_base)?,
    })
  }
}
