//! Linked-Commitment Net Resolver.
//!
//! Two commitments can be marked as offsetting each other (rent paid and
//! rent received for the same flat, say). For aggregation only the larger
//! side counts, and only by the difference.

use std::collections::{BTreeMap, HashMap, HashSet};

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
  commitment::{Commitment, Flow},
  month::YearMonth,
  periods::PeriodSchedule,
};

// ─── Graph ───────────────────────────────────────────────────────────────────

/// Undirected link pairs resolved from the per-commitment pointers.
#[derive(Debug, Clone, Default)]
pub struct LinkGraph {
  /// `(lower id, higher id)`, sorted.
  pairs:   Vec<(Uuid, Uuid)>,
  partner: HashMap<Uuid, Uuid>,
}

impl LinkGraph {
  /// Mutual pointers are paired first; one-sided pointers then pair only
  /// commitments that are still free. Pointers to unknown ids are dropped.
  pub fn build(commitments: &[Commitment]) -> Self {
    let known: HashSet<Uuid> = commitments.iter().map(|c| c.commitment_id).collect();
    let pointers: HashMap<Uuid, Uuid> = commitments
      .iter()
      .filter_map(|c| {
        c.linked_commitment_id
          .filter(|p| *p != c.commitment_id && known.contains(p))
          .map(|p| (c.commitment_id, p))
      })
      .collect();

    let mut ordered: Vec<(Uuid, Uuid)> = pointers.iter().map(|(&a, &b)| (a, b)).collect();
    ordered.sort();
    let (mutual, one_sided): (Vec<_>, Vec<_>) = ordered
      .into_iter()
      .partition(|(a, b)| pointers.get(b) == Some(a));

    let mut graph = Self::default();
    for (a, b) in mutual.into_iter().chain(one_sided) {
      graph.insert(a, b);
    }
    graph.pairs.sort();
    graph
  }

  fn insert(&mut self, a: Uuid, b: Uuid) {
    match (self.partner.get(&a), self.partner.get(&b)) {
      (Some(&pa), _) if pa == b => {}
      (None, None) => {
        self.partner.insert(a, b);
        self.partner.insert(b, a);
        self.pairs.push((a.min(b), a.max(b)));
      }
      _ => tracing::warn!(
        commitment_id = %a,
        linked_commitment_id = %b,
        "ignoring link to a commitment that is already paired"
      ),
    }
  }

  pub fn partner_of(&self, commitment_id: Uuid) -> Option<Uuid> {
    self.partner.get(&commitment_id).copied()
  }

  pub fn pairs(&self) -> &[(Uuid, Uuid)] { &self.pairs }
}

// ─── Net ─────────────────────────────────────────────────────────────────────

/// One side of a link with its per-period amount in base currency.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LinkSide {
  pub commitment_id: Uuid,
  pub amount:        Decimal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetResolution {
  /// Reports `net` under its own flow and category.
  pub keeper:     Uuid,
  /// Contributes nothing to aggregation.
  pub suppressed: Uuid,
  pub net:        Decimal,
}

/// The larger side keeps the difference. A tie goes to the lower id.
pub fn resolve_net(a: LinkSide, b: LinkSide) -> NetResolution {
  let (keeper, suppressed) = match a.amount.cmp(&b.amount) {
    std::cmp::Ordering::Greater => (a, b),
    std::cmp::Ordering::Less => (b, a),
    std::cmp::Ordering::Equal if a.commitment_id <= b.commitment_id => (a, b),
    std::cmp::Ordering::Equal => (b, a),
  };
  NetResolution {
    keeper:     keeper.commitment_id,
    suppressed: suppressed.commitment_id,
    net:        (a.amount - b.amount).abs(),
  }
}

// ─── Totals ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryTotal {
  pub category_id: Option<Uuid>,
  pub flow:        Flow,
  /// Base currency.
  pub total:       Decimal,
}

/// Base-currency amount a commitment's schedules expect for `period`.
pub fn period_amount(schedules: &[PeriodSchedule], period: YearMonth) -> Decimal {
  schedules
    .iter()
    .flat_map(|s| &s.periods)
    .filter(|p| p.period == period)
    .map(|p| p.amount_in_base)
    .sum()
}

/// Per (flow, category) totals for `period` with linked pairs netted.
///
/// `schedules` maps a commitment id to the schedules of its terms; a missing
/// entry counts as zero.
pub fn net_totals(
  commitments: &[Commitment],
  schedules: &HashMap<Uuid, Vec<PeriodSchedule>>,
  period: YearMonth,
) -> Vec<CategoryTotal> {
  let graph = LinkGraph::build(commitments);
  let amount_of = |id: Uuid| {
    schedules
      .get(&id)
      .map_or(Decimal::ZERO, |s| period_amount(s, period))
  };

  let mut net: HashMap<Uuid, Decimal> = commitments
    .iter()
    .map(|c| (c.commitment_id, amount_of(c.commitment_id)))
    .collect();
  for &(a, b) in graph.pairs() {
    let resolved = resolve_net(
      LinkSide {
        commitment_id: a,
        amount:        amount_of(a),
      },
      LinkSide {
        commitment_id: b,
        amount:        amount_of(b),
      },
    );
    net.insert(resolved.keeper, resolved.net);
    net.insert(resolved.suppressed, Decimal::ZERO);
  }

  let mut totals: BTreeMap<(Flow, Option<Uuid>), Decimal> = BTreeMap::new();
  for c in commitments {
    let amount = net.get(&c.commitment_id).copied().unwrap_or_default();
    if !amount.is_zero() {
      *totals.entry((c.flow, c.category_id)).or_default() += amount;
    }
  }
  totals
    .into_iter()
    .map(|((flow, category_id), total)| CategoryTotal {
      category_id,
      flow,
      total,
    })
    .collect()
}
