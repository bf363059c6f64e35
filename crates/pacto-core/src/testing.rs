//! Fixtures shared by the unit tests in this crate.

use chrono::{NaiveDate, TimeZone, Utc};
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::{
  month::YearMonth,
  payment::Payment,
  term::{Frequency, Term, TermParams},
};

pub const COMMITMENT: Uuid = Uuid::from_u128(0xc0);

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
  NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

pub fn ym(s: &str) -> YearMonth { s.parse().unwrap() }

pub fn term_with(version: u32, params: TermParams) -> Term {
  Term {
    term_id: Uuid::from_u128(u128::from(version)),
    commitment_id: COMMITMENT,
    version,
    params,
    created_at: Utc.timestamp_opt(1_700_000_000, 0).unwrap(),
  }
}

/// A monthly 1000 CLP term due on the 1st covering `from..=until`.
pub fn term_from(version: u32, from: &str, until: Option<&str>) -> Term {
  let mut params = TermParams::new(
    ym(from).first_day(),
    Frequency::Monthly,
    1,
    Decimal::from(1000),
    "CLP",
  );
  params.effective_until = until.map(|u| ym(u).last_day());
  term_with(version, params)
}

fn payment(commitment_id: Uuid, period: &str, paid_on: Option<NaiveDate>) -> Payment {
  Payment {
    payment_id: Uuid::new_v4(),
    commitment_id,
    period: ym(period),
    payment_date: paid_on,
    amount_original: Decimal::from(1000),
    currency_original: "CLP".into(),
    amount_in_base: Decimal::from(1000),
  }
}

pub fn paid(commitment_id: Uuid, period: &str, on: NaiveDate) -> Payment {
  payment(commitment_id, period, Some(on))
}

pub fn pending(commitment_id: Uuid, period: &str) -> Payment {
  payment(commitment_id, period, None)
}
