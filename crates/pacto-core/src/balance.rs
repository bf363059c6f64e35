//! Auto-Balance Calculator. Keeps a term's installment count and end date
//! consistent with each other while it is being edited.
//!
//! The two directions are not exact inverses. Editing the count
//! recomputes the end date exactly; editing the end date re-derives the count
//! with ceiling division. Only the field the user did *not* touch last is ever
//! recomputed.

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::{
  month::YearMonth,
  periods::first_period,
  term::{Frequency, TermParams},
};

/// The duration field the user edited last; its value is authoritative.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DurationField {
  Installments,
  EndDate,
}

/// End date implied by `count` occurrences starting at `start`.
///
/// The first occurrence follows the same due-day roll-over as the period
/// generator. The result keeps the start's day of month, clamped to the end
/// month's length.
pub fn end_date_from_installments(
  start: NaiveDate,
  count: u32,
  frequency: Frequency,
  due_day_of_month: u8,
) -> NaiveDate {
  let first = first_period(start, due_day_of_month);
  let steps = count.max(1) - 1;
  let span = steps.saturating_mul(frequency.month_step());
  let end = first.add_months(i32::try_from(span).unwrap_or(i32::MAX));
  end.day(start.day())
}

/// Occurrence count implied by the inclusive month span `start..=end`,
/// rounded up; never less than one.
pub fn installments_from_end_date(
  start: NaiveDate,
  end: NaiveDate,
  frequency: Frequency,
) -> u32 {
  let months = YearMonth::from(start).months_until(end.into());
  match frequency.month_step() {
    0 => 1,
    step => months.div_ceil(step).max(1),
  }
}

/// Recompute whichever duration field was not edited last.
///
/// With [`DurationField::Installments`] a declared count fixes the end date
/// (normalised to the last day of its month). With
/// [`DurationField::EndDate`] a declared end date re-derives the count, but
/// only when the term already declares one; a purely date-bounded term stays
/// date-bounded.
pub fn rebalance(params: &mut TermParams, last_edited: DurationField) {
  match last_edited {
    DurationField::Installments => {
      if let Some(count) = params.installments_count {
        let end = end_date_from_installments(
          params.effective_from,
          count,
          params.frequency,
          params.due_day_of_month,
        );
        params.effective_until = Some(YearMonth::from(end).last_day());
      }
    }
    DurationField::EndDate => {
      if let (Some(end), Some(_)) = (params.effective_until, params.installments_count) {
        params.installments_count = Some(installments_from_end_date(
          params.effective_from,
          end,
          params.frequency,
        ));
      }
    }
  }
}
