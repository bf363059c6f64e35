//! Period Generator. Expands a term into its expected payment periods.
//!
//! Pure functions only. The caller supplies the payments already recorded for
//! the commitment, "today" and a horizon month that bounds terms with neither
//! an end date nor an installment count.

use chrono::{Datelike, NaiveDate};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
  month::YearMonth,
  payment::Payment,
  term::{Term, TermParams},
};

// ─── Output types ────────────────────────────────────────────────────────────

/// Position of an occurrence within a count-bounded term (1-indexed).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Installment {
  pub number: u32,
  pub total:  u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum PeriodStatus {
  Paid { paid_on: NaiveDate },
  Pending,
  /// Unpaid and the period month is already behind us.
  Overdue,
}

impl PeriodStatus {
  pub fn is_paid(&self) -> bool { matches!(self, Self::Paid { .. }) }
}

/// One expected occurrence of a term.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeriodView {
  pub period:         YearMonth,
  pub due_date:       NaiveDate,
  pub amount:         Decimal,
  pub currency:       String,
  /// `amount` converted with the term's frozen rate.
  pub amount_in_base: Decimal,
  pub installment:    Option<Installment>,
  pub status:         PeriodStatus,
  /// The recorded payment row for this period, paid or not.
  pub payment_id:     Option<Uuid>,
}

/// Everything the generator derived for a single term.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeriodSchedule {
  pub term_id:               Uuid,
  pub version:               u32,
  pub periods:               Vec<PeriodView>,
  pub declared_installments: Option<u32>,
  /// An installment count was declared but the end date cut the schedule
  /// short of it.
  pub terminated_early:      bool,
}

// ─── Building blocks ─────────────────────────────────────────────────────────

/// The first month in which the due day can be honoured. A start day past the
/// due day pushes the first occurrence into the following month.
pub fn first_period(effective_from: NaiveDate, due_day_of_month: u8) -> YearMonth {
  let start = YearMonth::from(effective_from);
  if effective_from.day() > u32::from(due_day_of_month) {
    start.succ()
  } else {
    start
  }
}

/// The amount each occurrence carries.
pub fn per_occurrence_amount(params: &TermParams) -> Decimal {
  match params.installments_count {
    Some(n) if params.is_divided_amount && n > 0 => round_money(
      params.amount_original / Decimal::from(n),
    ),
    _ => params.amount_original,
  }
}

fn round_money(value: Decimal) -> Decimal {
  value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// The ordered months a term's parameters imply.
///
/// Emission stops at the installment count or the end month. With neither
/// declared it stops at `horizon`.
pub fn expected_months(params: &TermParams, horizon: YearMonth) -> Vec<YearMonth> {
  let step = params.frequency.month_step() as i32;
  let until = params.effective_until.map(YearMonth::from);
  let cap = match (params.installments_count, until) {
    (None, None) => Some(horizon),
    _ => None,
  };

  let mut months = Vec::new();
  let mut month = first_period(params.effective_from, params.due_day_of_month);
  loop {
    if params
      .installments_count
      .is_some_and(|n| months.len() as u32 >= n)
    {
      break;
    }
    if until.is_some_and(|u| month > u) || cap.is_some_and(|h| month > h) {
      break;
    }
    months.push(month);
    if step == 0 {
      break;
    }
    let next = month.add_months(step);
    if next == month {
      // Clamped at the end of the representable calendar.
      break;
    }
    month = next;
  }
  months
}

// ─── Generator ───────────────────────────────────────────────────────────────

/// Expand `term` into period views, merging in recorded `payments` by period.
pub fn generate_periods(
  term: &Term,
  payments: &[Payment],
  today: NaiveDate,
  horizon: YearMonth,
) -> PeriodSchedule {
  let params = &term.params;
  let current = YearMonth::from(today);
  let amount = per_occurrence_amount(params);
  let amount_in_base = round_money(amount * params.fx_rate_to_base);
  let months = expected_months(params, horizon);

  let periods: Vec<PeriodView> = months
    .iter()
    .enumerate()
    .map(|(i, &period)| {
      let recorded = payments.iter().find(|p| p.period == period);
      let status = match recorded.and_then(|p| p.payment_date) {
        Some(paid_on) => PeriodStatus::Paid { paid_on },
        None if period < current => PeriodStatus::Overdue,
        None => PeriodStatus::Pending,
      };
      PeriodView {
        period,
        due_date: period.day(u32::from(params.due_day_of_month)),
        amount,
        currency: params.currency_original.clone(),
        amount_in_base,
        installment: params.installments_count.map(|total| Installment {
          number: i as u32 + 1,
          total,
        }),
        status,
        payment_id: recorded.map(|p| p.payment_id),
      }
    })
    .collect();

  let terminated_early = params
    .installments_count
    .is_some_and(|n| (periods.len() as u32) < n);

  PeriodSchedule {
    term_id: term.term_id,
    version: term.version,
    periods,
    declared_installments: params.installments_count,
    terminated_early,
  }
}

#[cfg(test)]
mod tests {
  use rust_decimal_macros::dec;

  use super::*;
  use crate::{
    term::Frequency,
    testing::{date, paid, pending, term_with, ym},
  };

  fn months(params: &TermParams) -> Vec<String> {
    expected_months(params, ym("2030-12"))
      .into_iter()
      .map(|m| m.to_string())
      .collect()
  }

  #[test]
  fn start_day_past_due_day_rolls_to_next_month() {
    let mut p = TermParams::new(date(2024, 1, 5), Frequency::Monthly, 1, dec!(100), "CLP");
    p.installments_count = Some(3);
    assert_eq!(months(&p), ["2024-02", "2024-03", "2024-04"]);
  }

  #[test]
  fn start_day_on_due_day_keeps_start_month() {
    let mut p = TermParams::new(date(2024, 1, 5), Frequency::Monthly, 5, dec!(100), "CLP");
    p.installments_count = Some(2);
    assert_eq!(months(&p), ["2024-01", "2024-02"]);
  }

  #[test]
  fn frequencies_step_by_their_month_increment() {
    let mut p = TermParams::new(date(2024, 1, 1), Frequency::Quarterly, 10, dec!(1), "CLP");
    p.effective_until = Some(date(2024, 12, 31));
    assert_eq!(months(&p), ["2024-01", "2024-04", "2024-07", "2024-10"]);

    p.frequency = Frequency::Semiannually;
    assert_eq!(months(&p), ["2024-01", "2024-07"]);

    p.frequency = Frequency::Bimonthly;
    assert_eq!(months(&p).len(), 6);

    p.frequency = Frequency::Annually;
    p.effective_until = Some(date(2026, 12, 31));
    assert_eq!(months(&p), ["2024-01", "2025-01", "2026-01"]);
  }

  #[test]
  fn once_emits_a_single_period() {
    let mut p = TermParams::new(date(2024, 3, 20), Frequency::Once, 15, dec!(50), "CLP");
    assert_eq!(months(&p), ["2024-04"]);
    p.installments_count = Some(4);
    assert_eq!(months(&p), ["2024-04"]);
  }

  #[test]
  fn open_ended_terms_stop_at_the_horizon() {
    let p = TermParams::new(date(2024, 1, 1), Frequency::Monthly, 1, dec!(1), "CLP");
    let got = expected_months(&p, ym("2024-06"));
    assert_eq!(got.len(), 6);
    assert_eq!(got.last().copied(), Some(ym("2024-06")));
  }

  #[test]
  fn end_date_cuts_installments_short() {
    let mut p = TermParams::new(date(2024, 1, 1), Frequency::Monthly, 1, dec!(1200), "CLP");
    p.installments_count = Some(12);
    p.effective_until = Some(date(2024, 4, 30));
    let t = term_with(1, p);
    let schedule = generate_periods(&t, &[], date(2024, 1, 1), ym("2030-01"));
    assert_eq!(schedule.periods.len(), 4);
    assert!(schedule.terminated_early);
    assert_eq!(schedule.declared_installments, Some(12));
  }

  #[test]
  fn end_before_rolled_first_period_is_empty() {
    let mut p = TermParams::new(date(2024, 1, 20), Frequency::Monthly, 10, dec!(1), "CLP");
    p.effective_until = Some(date(2024, 1, 31));
    assert!(months(&p).is_empty());
  }

  #[test]
  fn divided_amount_is_split_evenly() {
    let mut p =
      TermParams::new(date(2024, 1, 1), Frequency::Monthly, 1, dec!(1200000), "CLP");
    p.installments_count = Some(12);
    p.is_divided_amount = true;
    let schedule = generate_periods(&term_with(1, p), &[], date(2024, 1, 1), ym("2030-01"));
    assert_eq!(schedule.periods.len(), 12);
    assert!(schedule.periods.iter().all(|v| v.amount == dec!(100000)));
    assert!(!schedule.terminated_early);
  }

  #[test]
  fn divided_amount_rounds_to_cents() {
    let mut p = TermParams::new(date(2024, 1, 1), Frequency::Monthly, 1, dec!(1000), "USD");
    p.installments_count = Some(3);
    p.is_divided_amount = true;
    assert_eq!(per_occurrence_amount(&p), dec!(333.33));
    p.is_divided_amount = false;
    assert_eq!(per_occurrence_amount(&p), dec!(1000));
  }

  #[test]
  fn sequence_numbers_only_for_installment_terms() {
    let mut p = TermParams::new(date(2024, 1, 1), Frequency::Monthly, 1, dec!(10), "CLP");
    p.effective_until = Some(date(2024, 3, 31));
    let plain = generate_periods(&term_with(1, p.clone()), &[], date(2024, 1, 1), ym("2030-01"));
    assert!(plain.periods.iter().all(|v| v.installment.is_none()));

    p.installments_count = Some(3);
    let numbered = generate_periods(&term_with(1, p), &[], date(2024, 1, 1), ym("2030-01"));
    let seq: Vec<_> = numbered
      .periods
      .iter()
      .map(|v| v.installment.map(|i| (i.number, i.total)))
      .collect();
    assert_eq!(seq, [Some((1, 3)), Some((2, 3)), Some((3, 3))]);
  }

  #[test]
  fn statuses_merge_recorded_payments() {
    let mut p = TermParams::new(date(2024, 1, 1), Frequency::Monthly, 31, dec!(10), "CLP");
    p.effective_until = Some(date(2024, 4, 30));
    p.fx_rate_to_base = dec!(0.5);
    let t = term_with(1, p);
    let payments = vec![
      paid(t.commitment_id, "2024-01", date(2024, 1, 30)),
      pending(t.commitment_id, "2024-02"),
    ];

    let schedule = generate_periods(&t, &payments, date(2024, 3, 10), ym("2030-01"));
    let statuses: Vec<_> = schedule.periods.iter().map(|v| v.status).collect();
    assert_eq!(statuses, [
      PeriodStatus::Paid { paid_on: date(2024, 1, 30) },
      PeriodStatus::Overdue,
      PeriodStatus::Pending,
      PeriodStatus::Pending,
    ]);
    assert!(schedule.periods[1].payment_id.is_some());
    assert_eq!(schedule.periods[1].due_date, date(2024, 2, 29));
    assert_eq!(schedule.periods[3].due_date, date(2024, 4, 30));
    assert_eq!(schedule.periods[0].amount_in_base, dec!(5));
  }

  #[test]
  fn output_is_chronological() {
    let p = TermParams::new(date(2023, 11, 15), Frequency::Bimonthly, 1, dec!(1), "CLP");
    let got = expected_months(&p, ym("2026-01"));
    assert!(got.windows(2).all(|w| w[0] < w[1]));
  }
}
