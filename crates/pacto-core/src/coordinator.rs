//! Term Mutation Coordinator.
//!
//! Every create/update/delete of a term goes through here. Each operation
//! runs its validation first, asks for confirmation when a change is legal
//! but surprising, and only then touches the store. Multi-step changes are
//! applied in a fixed order; if a later step fails the earlier ones stay
//! committed and the caller receives [`Error::PartialFailure`].

use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use uuid::Uuid;

use crate::{
  Error, Result,
  balance::end_date_from_installments,
  error::ValidationError,
  guard::CommitmentLocks,
  month::{MonthRange, YearMonth},
  mutation::{
    ConfirmationReason, ConfirmationRequest, CreateOutcome, DeleteOutcome, Mutation,
    StartScenario, StartSuggestion, UpdateOutcome,
  },
  payment::Payment,
  periods::{PeriodSchedule, generate_periods},
  store::{PaymentStore, TermStore},
  term::{Frequency, NewTerm, StructuralField, Term, TermParams, TermPatch, TermState},
  validate::{check_overlap, check_paid_orphans, find_orphans, find_overlap, validate_params},
  versions::TermSet,
};

/// Months shown past the current one for open-ended schedules.
pub const DEFAULT_HORIZON_MONTHS: u32 = 12;

pub struct TermCoordinator<S> {
  store: Arc<S>,
  locks: CommitmentLocks,
  today: Option<NaiveDate>,
}

impl<S> TermCoordinator<S>
where
  S: TermStore + PaymentStore,
{
  pub fn new(store: Arc<S>) -> Self {
    Self {
      store,
      locks: CommitmentLocks::default(),
      today: None,
    }
  }

  /// Pin "today" instead of reading the clock.
  pub fn with_today(mut self, today: NaiveDate) -> Self {
    self.today = Some(today);
    self
  }

  pub fn today(&self) -> NaiveDate {
    self.today.unwrap_or_else(|| Utc::now().date_naive())
  }

  pub fn store(&self) -> &Arc<S> { &self.store }

  // ─── Reads ─────────────────────────────────────────────────────────────────

  /// All term versions of a commitment, ordered by version.
  pub async fn terms(&self, commitment_id: Uuid) -> Result<TermSet> {
    let terms = self
      .store
      .list_terms(commitment_id)
      .await
      .map_err(Error::persistence)?;
    Ok(TermSet::new(terms))
  }

  async fn snapshot(&self, commitment_id: Uuid) -> Result<(TermSet, Vec<Payment>)> {
    let terms = self.terms(commitment_id).await?;
    let payments = self
      .store
      .list_payments(commitment_id)
      .await
      .map_err(Error::persistence)?;
    Ok((terms, payments))
  }

  async fn find_term(&self, term_id: Uuid) -> Result<Term> {
    self
      .store
      .get_term(term_id)
      .await
      .map_err(Error::persistence)?
      .ok_or(Error::TermNotFound(term_id))
  }

  /// `months` past the current month; the default end of open-ended
  /// schedules.
  pub fn horizon(&self, months: u32) -> YearMonth {
    YearMonth::from(self.today()).add_months(i32::try_from(months).unwrap_or(i32::MAX))
  }

  /// Period schedules of every term, oldest version first. Open-ended terms
  /// stop at `horizon`.
  pub async fn schedules(
    &self,
    commitment_id: Uuid,
    horizon: YearMonth,
  ) -> Result<Vec<PeriodSchedule>> {
    let (terms, payments) = self.snapshot(commitment_id).await?;
    let today = self.today();
    Ok(
      terms
        .iter()
        .map(|term| generate_periods(term, &payments, today, horizon))
        .collect(),
    )
  }

  /// Where a new term should most likely start.
  pub async fn suggest_start(&self, commitment_id: Uuid) -> Result<StartSuggestion> {
    let terms = self.terms(commitment_id).await?;
    let current = YearMonth::from(self.today());

    let Some(active) = terms.active() else {
      return Ok(StartSuggestion {
        month:    current,
        scenario: StartScenario::Normal,
      });
    };
    if active.is_open_ended() {
      return Ok(StartSuggestion {
        month:    active.from_month().succ(),
        scenario: StartScenario::WillCloseActive,
      });
    }

    let latest_end = terms.iter().filter_map(Term::until_month).max();
    // The current month itself once every term is in the past.
    let month = terms.first_uncovered_from(current).unwrap_or(current);
    let scenario = if latest_end.is_some_and(|end| month < end) {
      StartScenario::FillingGap
    } else {
      StartScenario::Normal
    };
    Ok(StartSuggestion { month, scenario })
  }

  // ─── Create ────────────────────────────────────────────────────────────────

  /// Add a term to a commitment.
  ///
  /// An open-ended active term is closed the month before the new start. A
  /// new open-ended term that continues a closed predecessor with the same
  /// schedule re-opens that predecessor instead.
  pub async fn create_term(
    &self,
    commitment_id: Uuid,
    params: TermParams,
    confirm: bool,
  ) -> Result<Mutation<CreateOutcome>> {
    let _permit = self.locks.try_acquire(commitment_id)?;
    let (terms, payments) = self.snapshot(commitment_id).await?;
    self
      .create_locked(commitment_id, &terms, &payments, params, confirm)
      .await
      .inspect_err(|err| tracing::debug!(%commitment_id, %err, "term creation rejected"))
  }

  async fn create_locked(
    &self,
    commitment_id: Uuid,
    terms: &TermSet,
    payments: &[Payment],
    params: TermParams,
    confirm: bool,
  ) -> Result<Mutation<CreateOutcome>> {
    validate_params(&params)?;
    let candidate = params.range();

    if let Some(previous) = extension_target(terms, &params) {
      let term = self.apply_patch(previous, TermPatch::reopen()).await?;
      tracing::info!(
        %commitment_id,
        version = term.version,
        "extended previous term instead of adding a version"
      );
      return Ok(Mutation::Applied(CreateOutcome::Extended { term }));
    }

    let mut excluded = Vec::new();
    let mut closing = None;
    if let Some(active) = terms.active().filter(|t| t.is_open_ended()) {
      let close_at = candidate.from.pred();
      if close_at < active.from_month() {
        return Err(
          ValidationError::CloseBeforeStart {
            version: active.version,
            from: active.from_month(),
            close_at,
          }
          .into(),
        );
      }
      let owned = terms.payments_of(active, payments);
      let kept = closed_at(&active.params, close_at);
      check_paid_orphans(active.version, &find_orphans(&active.params, &kept, &owned))?;
      excluded.push(active.term_id);
      closing = Some((active, close_at));
    }
    check_overlap(&candidate, terms.others(&excluded))?;

    let mut reasons = Vec::new();
    if let Some(months) = planned_months(&params).filter(|m| (1..=2).contains(m)) {
      reasons.push(ConfirmationReason::ShortDuration { months });
    }
    if let Some(request) = needs_confirmation(reasons, confirm) {
      return Ok(request);
    }

    let closed = match closing {
      Some((active, close_at)) => {
        Some(self.apply_patch(active, TermPatch::close_at(close_at)).await?)
      }
      None => None,
    };

    let input = NewTerm {
      version: terms.next_version(),
      params,
    };
    let term = match self.store.create_term(commitment_id, input).await {
      Ok(term) => term,
      Err(err) => {
        return Err(match &closed {
          Some(closed) => partial_failure(
            format!("term v{} was closed", closed.version),
            "create the new term",
            err,
          ),
          None => Error::persistence(err),
        });
      }
    };

    tracing::info!(%commitment_id, version = term.version, "term created");
    Ok(Mutation::Applied(CreateOutcome::Created { term, closed }))
  }

  // ─── Update ────────────────────────────────────────────────────────────────

  /// Edit a term in place, or re-version it when a structural field changes
  /// on a term that already has paid payments.
  pub async fn update_term(
    &self,
    term_id: Uuid,
    patch: TermPatch,
    confirm: bool,
  ) -> Result<Mutation<UpdateOutcome>> {
    let found = self.find_term(term_id).await?;
    let _permit = self.locks.try_acquire(found.commitment_id)?;
    self
      .update_locked(found.commitment_id, term_id, patch, confirm)
      .await
      .inspect_err(|err| tracing::debug!(%term_id, %err, "term update rejected"))
  }

  async fn update_locked(
    &self,
    commitment_id: Uuid,
    term_id: Uuid,
    patch: TermPatch,
    confirm: bool,
  ) -> Result<Mutation<UpdateOutcome>> {
    let (terms, payments) = self.snapshot(commitment_id).await?;
    let term = terms.get(term_id).ok_or(Error::TermNotFound(term_id))?;
    let target = term.params.apply(&patch);
    if target == term.params {
      return Ok(Mutation::Applied(UpdateOutcome::Updated {
        term:             term.clone(),
        dropped_payments: Vec::new(),
      }));
    }
    validate_params(&target)?;

    let owned = terms.payments_of(term, &payments);
    let changed = term.params.structural_diff(&target);
    if !changed.is_empty() && owned.iter().any(|p| p.is_paid()) {
      return self
        .reversion(&terms, &owned, term, target, changed, confirm)
        .await;
    }
    self
      .plain_update(&terms, &owned, term, target, confirm, false)
      .await
  }

  /// Apply `target` to `term` without a new version.
  ///
  /// Paid payments may never be left outside the new range. Pending ones are
  /// deleted after confirmation, once the term itself has been updated.
  async fn plain_update(
    &self,
    terms: &TermSet,
    owned: &[&Payment],
    term: &Term,
    target: TermParams,
    confirm: bool,
    end_acknowledged: bool,
  ) -> Result<Mutation<UpdateOutcome>> {
    let range = target.range();
    check_overlap(&range, terms.others(&[term.term_id]))?;
    let orphans = find_orphans(&term.params, &target, owned);
    check_paid_orphans(term.version, &orphans)?;

    let mut reasons = Vec::new();
    if !orphans.pending.is_empty() {
      reasons.push(ConfirmationReason::PendingPaymentsDropped {
        periods: orphans.pending_periods(),
      });
    }
    if !end_acknowledged {
      match (term.until_month(), range.until) {
        (None, Some(until)) => reasons.push(ConfirmationReason::EndDateDefined { until }),
        (Some(from), Some(to)) if to < from => {
          reasons.push(ConfirmationReason::EndDateShortened { from, to });
        }
        _ => {}
      }
    }
    if let Some(request) = needs_confirmation(reasons, confirm) {
      return Ok(request);
    }

    let updated = self
      .apply_patch(term, TermPatch::between(&term.params, &target))
      .await?;

    let mut dropped_payments = Vec::with_capacity(orphans.pending.len());
    for payment in &orphans.pending {
      if let Err(err) = self.store.delete_payment(payment.payment_id).await {
        return Err(partial_failure(
          format!("term v{} was updated", updated.version),
          format!("remove the pending payment for {}", payment.period),
          err,
        ));
      }
      dropped_payments.push(payment.payment_id);
    }

    tracing::info!(
      commitment_id = %term.commitment_id,
      version = updated.version,
      dropped = dropped_payments.len(),
      "term updated"
    );
    Ok(Mutation::Applied(UpdateOutcome::Updated {
      term: updated,
      dropped_payments,
    }))
  }

  /// Close the active term at the end of last month and carry `target` into a
  /// new version starting this month. Paid history stays with the old term.
  async fn reversion(
    &self,
    terms: &TermSet,
    owned: &[&Payment],
    term: &Term,
    mut target: TermParams,
    changed: Vec<StructuralField>,
    confirm: bool,
  ) -> Result<Mutation<UpdateOutcome>> {
    let today = self.today();
    if terms.state_of(term, today) != TermState::Active {
      return Err(
        ValidationError::NotReversionable {
          version: term.version,
          reason:  "only the active term can change amount, frequency or split",
        }
        .into(),
      );
    }

    let new_from = YearMonth::from(today);
    let close_at = new_from.pred();
    if close_at < term.from_month() {
      return Err(
        ValidationError::CloseBeforeStart {
          version: term.version,
          from: term.from_month(),
          close_at,
        }
        .into(),
      );
    }
    let kept = closed_at(&term.params, close_at);
    check_paid_orphans(term.version, &find_orphans(&term.params, &kept, owned))?;

    target.effective_from = new_from.first_day();
    validate_params(&target)?;
    check_overlap(&target.range(), terms.others(&[term.term_id]))?;

    let reasons = vec![ConfirmationReason::StructuralChange {
      changed,
      close_at,
      new_from,
    }];
    if let Some(request) = needs_confirmation(reasons, confirm) {
      return Ok(request);
    }

    let closed = self.apply_patch(term, TermPatch::close_at(close_at)).await?;
    let input = NewTerm {
      version: terms.next_version(),
      params:  target,
    };
    let created = self
      .store
      .create_term(term.commitment_id, input)
      .await
      .map_err(|err| {
        partial_failure(
          format!("term v{} was closed at {close_at}", closed.version),
          "create the new version",
          err,
        )
      })?;

    tracing::info!(
      commitment_id = %term.commitment_id,
      closed = closed.version,
      created = created.version,
      "term re-versioned"
    );
    Ok(Mutation::Applied(UpdateOutcome::Reversioned { closed, created }))
  }

  // ─── Delete / reopen ───────────────────────────────────────────────────────

  /// Delete a term with no recorded payments. The outcome names the
  /// predecessor that [`Self::reopen_term`] could extend to close the gap.
  pub async fn delete_term(&self, term_id: Uuid) -> Result<DeleteOutcome> {
    let found = self.find_term(term_id).await?;
    let _permit = self.locks.try_acquire(found.commitment_id)?;
    self
      .delete_locked(found.commitment_id, term_id)
      .await
      .inspect_err(|err| tracing::debug!(%term_id, %err, "term deletion rejected"))
  }

  /// Delete a term and, if it leaves a contiguous predecessor behind,
  /// re-open that predecessor.
  pub async fn delete_and_reopen(&self, term_id: Uuid) -> Result<DeleteOutcome> {
    let found = self.find_term(term_id).await?;
    let commitment_id = found.commitment_id;
    let _permit = self.locks.try_acquire(commitment_id)?;

    let mut outcome = self
      .delete_locked(commitment_id, term_id)
      .await
      .inspect_err(|err| tracing::debug!(%term_id, %err, "term deletion rejected"))?;
    let Some(candidate) = outcome.reopen_candidate.clone() else {
      return Ok(outcome);
    };

    let terms = match self.terms(commitment_id).await {
      Ok(terms) => terms,
      Err(err) => {
        return Err(partial_failure(
          format!("term v{} was deleted", outcome.deleted.version),
          format!("re-open term v{}", candidate.version),
          err,
        ));
      }
    };
    match self.reopen_locked(&terms, &candidate).await {
      Ok(reopened) => {
        outcome.reopened = Some(reopened);
        Ok(outcome)
      }
      Err(err) => Err(partial_failure(
        format!("term v{} was deleted", outcome.deleted.version),
        format!("re-open term v{}", candidate.version),
        err,
      )),
    }
  }

  async fn delete_locked(&self, commitment_id: Uuid, term_id: Uuid) -> Result<DeleteOutcome> {
    let (terms, payments) = self.snapshot(commitment_id).await?;
    let term = terms.get(term_id).ok_or(Error::TermNotFound(term_id))?;
    if terms.len() <= 1 {
      return Err(ValidationError::LastTerm.into());
    }
    let count = terms.payments_of(term, &payments).len();
    if count > 0 {
      return Err(
        ValidationError::TermHasPayments {
          version: term.version,
          count,
        }
        .into(),
      );
    }

    let reopen_candidate = terms
      .is_latest(term)
      .then(|| terms.predecessor(term))
      .flatten()
      .filter(|prev| {
        prev
          .until_month()
          .is_some_and(|until| until.succ() == term.from_month())
      })
      .cloned();

    self
      .store
      .delete_term(term_id)
      .await
      .map_err(Error::persistence)?;
    tracing::info!(%commitment_id, version = term.version, "term deleted");

    Ok(DeleteOutcome {
      deleted: term.clone(),
      reopen_candidate,
      reopened: None,
    })
  }

  /// Clear the end date of the latest term.
  pub async fn reopen_term(&self, term_id: Uuid) -> Result<Term> {
    let found = self.find_term(term_id).await?;
    let _permit = self.locks.try_acquire(found.commitment_id)?;
    let terms = self.terms(found.commitment_id).await?;
    let term = terms.get(term_id).ok_or(Error::TermNotFound(term_id))?;
    self
      .reopen_locked(&terms, term)
      .await
      .inspect_err(|err| tracing::debug!(%term_id, %err, "term re-open rejected"))
  }

  async fn reopen_locked(&self, terms: &TermSet, term: &Term) -> Result<Term> {
    let reject = |reason| {
      Error::from(ValidationError::NotReopenable {
        version: term.version,
        reason,
      })
    };
    if term.is_open_ended() {
      return Err(reject("it has no end date"));
    }
    if !terms.is_latest(term) {
      return Err(reject("a later version exists"));
    }
    check_overlap(
      &MonthRange::new(term.from_month(), None),
      terms.others(&[term.term_id]),
    )?;

    let reopened = self.apply_patch(term, TermPatch::reopen()).await?;
    tracing::info!(
      commitment_id = %term.commitment_id,
      version = reopened.version,
      "term re-opened"
    );
    Ok(reopened)
  }

  // ─── Pause / resume ────────────────────────────────────────────────────────

  /// Give the open-ended latest term an end date at `last_active`.
  pub async fn pause_term(
    &self,
    term_id: Uuid,
    last_active: YearMonth,
    confirm: bool,
  ) -> Result<Mutation<UpdateOutcome>> {
    let found = self.find_term(term_id).await?;
    let _permit = self.locks.try_acquire(found.commitment_id)?;
    self
      .pause_locked(found.commitment_id, term_id, last_active, confirm)
      .await
      .inspect_err(|err| tracing::debug!(%term_id, %err, "term pause rejected"))
  }

  async fn pause_locked(
    &self,
    commitment_id: Uuid,
    term_id: Uuid,
    last_active: YearMonth,
    confirm: bool,
  ) -> Result<Mutation<UpdateOutcome>> {
    let (terms, payments) = self.snapshot(commitment_id).await?;
    let term = terms.get(term_id).ok_or(Error::TermNotFound(term_id))?;
    let reject = |reason| {
      Error::from(ValidationError::NotPausable {
        version: term.version,
        reason,
      })
    };
    if !terms.is_latest(term) {
      return Err(reject("a later version exists"));
    }
    if !term.is_open_ended() {
      return Err(reject("it already has an end date"));
    }
    if term.params.installments_count.is_some() {
      return Err(reject("installment terms end with their last installment"));
    }
    if last_active < term.from_month() {
      return Err(
        ValidationError::CloseBeforeStart {
          version: term.version,
          from: term.from_month(),
          close_at: last_active,
        }
        .into(),
      );
    }

    let mut target = term.params.clone();
    target.effective_until = Some(last_active.last_day());
    let owned = terms.payments_of(term, &payments);
    self
      .plain_update(&terms, &owned, term, target, confirm, true)
      .await
  }

  /// The term a resume of `term_id` would create: same parameters, open-ended,
  /// starting the month after the pause or this month, whichever is later.
  pub async fn propose_resume(&self, term_id: Uuid) -> Result<TermParams> {
    let term = self.find_term(term_id).await?;
    self.resume_params(&term)
  }

  fn resume_params(&self, term: &Term) -> Result<TermParams> {
    let reject = |reason| {
      Error::from(ValidationError::NotResumable {
        version: term.version,
        reason,
      })
    };
    let Some(until) = term.until_month() else {
      return Err(reject("it is not paused"));
    };
    if term.params.installments_count.is_some() {
      return Err(reject("installment terms cannot be resumed"));
    }

    let from = until.succ().max(YearMonth::from(self.today()));
    let mut params = term.params.clone();
    params.effective_from = from.first_day();
    params.effective_until = None;
    Ok(params)
  }

  /// Create the proposed resume term. Resuming right after the pause with an
  /// unchanged schedule simply re-opens the paused term.
  pub async fn resume_term(&self, term_id: Uuid, confirm: bool) -> Result<Mutation<CreateOutcome>> {
    let found = self.find_term(term_id).await?;
    let _permit = self.locks.try_acquire(found.commitment_id)?;
    self
      .resume_locked(found.commitment_id, term_id, confirm)
      .await
      .inspect_err(|err| tracing::debug!(%term_id, %err, "term resume rejected"))
  }

  async fn resume_locked(
    &self,
    commitment_id: Uuid,
    term_id: Uuid,
    confirm: bool,
  ) -> Result<Mutation<CreateOutcome>> {
    let (terms, payments) = self.snapshot(commitment_id).await?;
    let term = terms.get(term_id).ok_or(Error::TermNotFound(term_id))?;
    if !terms.is_latest(term) {
      return Err(
        ValidationError::NotResumable {
          version: term.version,
          reason:  "a later version exists",
        }
        .into(),
      );
    }
    let params = self.resume_params(term)?;
    self
      .create_locked(commitment_id, &terms, &payments, params, confirm)
      .await
  }

  async fn apply_patch(&self, term: &Term, patch: TermPatch) -> Result<Term> {
    self
      .store
      .update_term(term.term_id, patch)
      .await
      .map_err(Error::persistence)
  }
}

// ─── Helpers ─────────────────────────────────────────────────────────────────

/// The closed, count-free latest term that `params` would simply continue.
fn extension_target<'a>(terms: &'a TermSet, params: &TermParams) -> Option<&'a Term> {
  if params.effective_until.is_some() || params.installments_count.is_some() {
    return None;
  }
  let previous = terms.active()?;
  let until = previous.until_month()?;
  let continues = previous.params.installments_count.is_none()
    && YearMonth::from(params.effective_from) == until.succ()
    && previous.params.same_schedule_as(params)
    && find_overlap(
      &MonthRange::new(previous.from_month(), None),
      terms.others(&[previous.term_id]),
    )
    .is_none();
  continues.then_some(previous)
}

/// `params` ending with the month `close_at`.
fn closed_at(params: &TermParams, close_at: YearMonth) -> TermParams {
  TermParams {
    effective_until: Some(close_at.last_day()),
    ..params.clone()
  }
}

/// Months a bounded term spans, counting the earlier of its two bounds.
/// `None` for open-ended and one-off terms.
fn planned_months(params: &TermParams) -> Option<u32> {
  if params.frequency == Frequency::Once {
    return None;
  }
  let by_date = params.effective_until.map(YearMonth::from);
  let by_count = params.installments_count.map(|n| {
    YearMonth::from(end_date_from_installments(
      params.effective_from,
      n,
      params.frequency,
      params.due_day_of_month,
    ))
  });
  let end = match (by_date, by_count) {
    (Some(a), Some(b)) => a.min(b),
    (a, b) => a.or(b)?,
  };
  Some(YearMonth::from(params.effective_from).months_until(end))
}

fn needs_confirmation<T>(reasons: Vec<ConfirmationReason>, confirm: bool) -> Option<Mutation<T>> {
  (!reasons.is_empty() && !confirm)
    .then(|| Mutation::ConfirmationRequired(ConfirmationRequest { reasons }))
}

fn partial_failure<E>(completed: String, remaining: impl Into<String>, err: E) -> Error
where
  E: std::error::Error + Send + Sync + 'static,
{
  let remaining = remaining.into();
  tracing::warn!(%completed, %remaining, error = %err, "term mutation partially applied");
  Error::PartialFailure {
    completed,
    remaining,
    source: Box::new(err),
  }
}
