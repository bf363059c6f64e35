//! [`TermSet`]: the ordered versions of one commitment's terms.
//!
//! The active term is derived (highest version), and so is the owner of each
//! payment (the term whose range contains the payment's period).

use chrono::NaiveDate;
use uuid::Uuid;

use crate::{
  month::YearMonth,
  payment::Payment,
  term::{Term, TermState},
};

#[derive(Debug, Clone, Default)]
pub struct TermSet {
  terms: Vec<Term>,
}

impl TermSet {
  pub fn new(mut terms: Vec<Term>) -> Self {
    terms.sort_by_key(|t| t.version);
    Self { terms }
  }

  pub fn iter(&self) -> impl Iterator<Item = &Term> { self.terms.iter() }

  pub fn len(&self) -> usize { self.terms.len() }

  pub fn is_empty(&self) -> bool { self.terms.is_empty() }

  pub fn get(&self, term_id: Uuid) -> Option<&Term> {
    self.terms.iter().find(|t| t.term_id == term_id)
  }

  /// The highest-version term.
  pub fn active(&self) -> Option<&Term> { self.terms.last() }

  pub fn next_version(&self) -> u32 {
    self.active().map_or(1, |t| t.version + 1)
  }

  pub fn is_latest(&self, term: &Term) -> bool {
    self.active().is_some_and(|a| a.term_id == term.term_id)
  }

  /// The term with the highest version below `term`'s.
  pub fn predecessor(&self, term: &Term) -> Option<&Term> {
    self
      .terms
      .iter()
      .filter(|t| t.version < term.version)
      .max_by_key(|t| t.version)
  }

  /// Terms other than the excluded ids.
  pub fn others<'a>(
    &'a self,
    excluded: &'a [Uuid],
  ) -> impl Iterator<Item = &'a Term> + 'a {
    self.terms.iter().filter(move |t| !excluded.contains(&t.term_id))
  }

  /// The term whose range contains `period`, if any.
  pub fn term_for_period(&self, period: YearMonth) -> Option<&Term> {
    // Ranges never overlap once accepted; prefer the newest if they somehow do.
    self.terms.iter().rev().find(|t| t.range().contains(period))
  }

  /// Payments attributed to `term` through the period lookup.
  pub fn payments_of<'a>(
    &self,
    term: &Term,
    payments: &'a [Payment],
  ) -> Vec<&'a Payment> {
    payments
      .iter()
      .filter(|p| {
        self
          .term_for_period(p.period)
          .is_some_and(|owner| owner.term_id == term.term_id)
      })
      .collect()
  }

  /// Lower versions are historic by construction; the latest is classified
  /// against `today`.
  pub fn state_of(&self, term: &Term, today: NaiveDate) -> TermState {
    let current = YearMonth::from(today);
    if !self.is_latest(term) {
      return TermState::Historic;
    }
    if term.from_month() > current {
      TermState::Scheduled
    } else if term.until_month().is_some_and(|until| until < current) {
      TermState::Historic
    } else {
      TermState::Active
    }
  }

  /// First month at or after `start` not covered by any term. `None` when a
  /// term is open-ended or coverage runs to the last representable month.
  pub fn first_uncovered_from(&self, start: YearMonth) -> Option<YearMonth> {
    if self.terms.iter().any(Term::is_open_ended) {
      return None;
    }
    let mut month = start;
    while let Some(covering) = self.terms.iter().find(|t| t.range().contains(month)) {
      let next = covering.until_month()?.succ();
      if next == month {
        // Covered through the end of the representable calendar.
        return None;
      }
      month = next;
    }
    Some(month)
  }

  pub fn into_vec(self) -> Vec<Term> { self.terms }
}

impl From<Vec<Term>> for TermSet {
  fn from(terms: Vec<Term>) -> Self { Self::new(terms) }
}
