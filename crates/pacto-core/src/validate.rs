//! Overlap/Orphan Validator.
//!
//! Pure checks run before any persistence call: parameter sanity, month-range
//! overlap against sibling terms, and payments that new parameters would no
//! longer schedule.

use rust_decimal::Decimal;

use crate::{
  error::ValidationError,
  month::{MonthRange, YearMonth},
  payment::Payment,
  periods::expected_months,
  term::{Term, TermParams},
};

/// Field-level sanity of a candidate term.
pub fn validate_params(params: &TermParams) -> Result<(), ValidationError> {
  if params.amount_original <= Decimal::ZERO {
    return Err(ValidationError::NonPositiveAmount(params.amount_original));
  }
  if params.fx_rate_to_base <= Decimal::ZERO {
    return Err(ValidationError::NonPositiveFxRate(params.fx_rate_to_base));
  }
  if params.currency_original.trim().is_empty() {
    return Err(ValidationError::MissingCurrency);
  }
  if !(1..=31).contains(&params.due_day_of_month) {
    return Err(ValidationError::InvalidDueDay(params.due_day_of_month));
  }
  if params.installments_count == Some(0) {
    return Err(ValidationError::ZeroInstallments);
  }
  if params.is_divided_amount && params.installments_count.is_none() {
    return Err(ValidationError::DividedWithoutInstallments);
  }
  check_range(&params.range())
}

/// `until` must not precede `from` at month granularity.
pub fn check_range(range: &MonthRange) -> Result<(), ValidationError> {
  match range.until {
    Some(until) if until < range.from => Err(ValidationError::EndBeforeStart {
      from: range.from,
      until,
    }),
    _ => Ok(()),
  }
}

/// The first sibling whose range collides with `candidate`.
pub fn find_overlap<'a>(
  candidate: &MonthRange,
  siblings: impl IntoIterator<Item = &'a Term>,
) -> Option<&'a Term> {
  siblings
    .into_iter()
    .find(|t| t.range().overlaps(candidate))
}

pub fn check_overlap<'a>(
  candidate: &MonthRange,
  siblings: impl IntoIterator<Item = &'a Term>,
) -> Result<(), ValidationError> {
  match find_overlap(candidate, siblings) {
    Some(t) => Err(ValidationError::Overlap {
      version: t.version,
      range:   t.range(),
    }),
    None => Ok(()),
  }
}

/// Payments a term schedules today that its edited parameters would not.
#[derive(Debug, Default)]
pub struct Orphans<'a> {
  pub paid:    Vec<&'a Payment>,
  pub pending: Vec<&'a Payment>,
}

impl Orphans<'_> {
  pub fn is_empty(&self) -> bool { self.paid.is_empty() && self.pending.is_empty() }

  pub fn paid_periods(&self) -> Vec<YearMonth> {
    self.paid.iter().map(|p| p.period).collect()
  }

  pub fn pending_periods(&self) -> Vec<YearMonth> {
    self.pending.iter().map(|p| p.period).collect()
  }
}

/// Whether `params` emit an occurrence for `period`.
///
/// Range containment is not enough: an installment count or a first period
/// rolled past the start day both leave months of the range unscheduled.
pub fn schedules_period(params: &TermParams, period: YearMonth) -> bool {
  params.range().contains(period) && expected_months(params, period).contains(&period)
}

/// Owned payments that `current` schedules and `target` does not.
///
/// Payments `current` never showed are left alone.
pub fn find_orphans<'a>(
  current: &TermParams,
  target: &TermParams,
  owned: &[&'a Payment],
) -> Orphans<'a> {
  let (paid, pending): (Vec<&Payment>, Vec<&Payment>) = owned
    .iter()
    .copied()
    .filter(|p| schedules_period(current, p.period) && !schedules_period(target, p.period))
    .partition(|p| p.is_paid());
  Orphans { paid, pending }
}

/// Hard block: a paid payment may never end up outside its term.
pub fn check_paid_orphans(version: u32, orphans: &Orphans<'_>) -> Result<(), ValidationError> {
  if orphans.paid.is_empty() {
    Ok(())
  } else {
    Err(ValidationError::OrphanedPaidPayments {
      version,
      periods: orphans.paid_periods(),
    })
  }
}
