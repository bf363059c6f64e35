//! [`SqliteStore`]: the SQLite implementation of the Pacto store traits.

use std::path::Path;

use chrono::Utc;
use pacto_core::{
  commitment::{Commitment, NewCommitment},
  payment::{NewPayment, Payment},
  store::{CommitmentStore, PaymentStore, TermStore},
  term::{NewTerm, Term, TermPatch},
};
use rusqlite::{OptionalExtension as _, Transaction};
use uuid::Uuid;

use crate::{
  Error, Result,
  encode::{
    COMMITMENT_COLUMNS, PAYMENT_COLUMNS, RawCommitment, RawPayment, RawTerm, TERM_COLUMNS,
    encode_date, encode_dt, encode_month, encode_uuid,
  },
  schema::SCHEMA,
};

// ─── Store ───────────────────────────────────────────────────────────────────

/// A Pacto store backed by a single SQLite file.
///
/// Cloning is cheap; the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store, useful for testing.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  /// Run `f` inside a transaction. Any error, including a violated invariant,
  /// rolls the whole write back.
  async fn write<T, F>(&self, f: F) -> Result<T>
  where
    T: Send + 'static,
    F: FnOnce(&Transaction<'_>) -> Result<T> + Send + 'static,
  {
    self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let out = f(&tx);
        if out.is_ok() {
          tx.commit()?;
        }
        Ok(out)
      })
      .await?
  }

  async fn read<T, F>(&self, f: F) -> Result<T>
  where
    T: Send + 'static,
    F: FnOnce(&rusqlite::Connection) -> Result<T> + Send + 'static,
  {
    self.conn.call(move |conn| Ok(f(conn))).await?
  }
}

// ─── Row helpers ─────────────────────────────────────────────────────────────

fn load_term(conn: &rusqlite::Connection, term_id: Uuid) -> Result<Option<Term>> {
  let raw = conn
    .query_row(
      &format!("SELECT {TERM_COLUMNS} FROM terms WHERE term_id = ?1"),
      rusqlite::params![encode_uuid(term_id)],
      RawTerm::from_row,
    )
    .optional()?;
  raw.map(RawTerm::into_term).transpose()
}

fn commitment_exists(conn: &rusqlite::Connection, commitment_id: Uuid) -> Result<bool> {
  Ok(
    conn
      .query_row(
        "SELECT 1 FROM commitments WHERE commitment_id = ?1",
        rusqlite::params![encode_uuid(commitment_id)],
        |_| Ok(()),
      )
      .optional()?
      .is_some(),
  )
}

/// The store-side term invariants: ordered range, unique version, no overlap
/// with any other term of the same commitment.
fn check_term(conn: &rusqlite::Connection, term: &Term) -> Result<()> {
  let range = term.range();
  if let Some(until) = range.until.filter(|u| *u < range.from) {
    return Err(Error::EndBeforeStart {
      from: range.from,
      until,
    });
  }

  let commitment_id = encode_uuid(term.commitment_id);
  let term_id = encode_uuid(term.term_id);

  let duplicate = conn
    .query_row(
      "SELECT 1 FROM terms WHERE commitment_id = ?1 AND version = ?2 AND term_id != ?3",
      rusqlite::params![commitment_id, term.version, term_id],
      |_| Ok(()),
    )
    .optional()?;
  if duplicate.is_some() {
    return Err(Error::DuplicateVersion(term.version));
  }

  let overlapping: Option<u32> = conn
    .query_row(
      "SELECT version FROM terms
        WHERE commitment_id = ?1 AND term_id != ?2
          AND (until_month IS NULL OR until_month >= ?3)
          AND (?4 IS NULL OR from_month <= ?4)
        ORDER BY version
        LIMIT 1",
      rusqlite::params![
        commitment_id,
        term_id,
        encode_month(range.from),
        range.until.map(encode_month),
      ],
      |r| r.get(0),
    )
    .optional()?;
  match overlapping {
    Some(version) => Err(Error::Overlap(version)),
    None => Ok(()),
  }
}

fn insert_term(tx: &Transaction<'_>, term: &Term) -> Result<()> {
  check_term(tx, term)?;
  let range = term.range();
  let raw = RawTerm::from_term(term);
  tx.execute(
    &format!(
      "INSERT INTO terms ({TERM_COLUMNS}, from_month, until_month)
       VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)"
    ),
    rusqlite::params![
      raw.term_id,
      raw.commitment_id,
      raw.version,
      raw.effective_from,
      raw.effective_until,
      raw.frequency,
      raw.due_day_of_month,
      raw.amount_original,
      raw.currency_original,
      raw.fx_rate_to_base,
      raw.installments_count,
      raw.is_divided_amount,
      raw.created_at,
      encode_month(range.from),
      range.until.map(encode_month),
    ],
  )?;
  Ok(())
}

/// Rewrite the user-editable columns of an existing term. Identity, version
/// and creation time never change.
fn update_term_row(tx: &Transaction<'_>, term: &Term) -> Result<()> {
  check_term(tx, term)?;
  let range = term.range();
  let raw = RawTerm::from_term(term);
  tx.execute(
    "UPDATE terms SET
       effective_from = ?2, effective_until = ?3, frequency = ?4,
       due_day_of_month = ?5, amount_original = ?6, currency_original = ?7,
       fx_rate_to_base = ?8, installments_count = ?9, is_divided_amount = ?10,
       from_month = ?11, until_month = ?12
     WHERE term_id = ?1",
    rusqlite::params![
      raw.term_id,
      raw.effective_from,
      raw.effective_until,
      raw.frequency,
      raw.due_day_of_month,
      raw.amount_original,
      raw.currency_original,
      raw.fx_rate_to_base,
      raw.installments_count,
      raw.is_divided_amount,
      encode_month(range.from),
      range.until.map(encode_month),
    ],
  )?;
  Ok(())
}

// ─── CommitmentStore impl ────────────────────────────────────────────────────

impl CommitmentStore for SqliteStore {
  type Error = Error;

  async fn add_commitment(&self, input: NewCommitment) -> Result<Commitment> {
    let commitment = Commitment {
      commitment_id:        Uuid::new_v4(),
      name:                 input.name,
      category_id:          input.category_id,
      flow:                 input.flow,
      is_important:         input.is_important,
      linked_commitment_id: None,
      note:                 input.note,
      created_at:           Utc::now(),
    };

    let id_str       = encode_uuid(commitment.commitment_id);
    let name         = commitment.name.clone();
    let category_str = commitment.category_id.map(encode_uuid);
    let flow_str     = commitment.flow.to_string();
    let important    = commitment.is_important;
    let note         = commitment.note.clone();
    let at_str       = encode_dt(commitment.created_at);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO commitments (
             commitment_id, name, category_id, flow, is_important, note, created_at
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
          rusqlite::params![id_str, name, category_str, flow_str, important, note, at_str],
        )?;
        Ok(())
      })
      .await?;

    Ok(commitment)
  }

  async fn get_commitment(&self, id: Uuid) -> Result<Option<Commitment>> {
    let id_str = encode_uuid(id);

    let raw: Option<RawCommitment> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!("SELECT {COMMITMENT_COLUMNS} FROM commitments WHERE commitment_id = ?1"),
              rusqlite::params![id_str],
              RawCommitment::from_row,
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawCommitment::into_commitment).transpose()
  }

  async fn list_commitments(&self) -> Result<Vec<Commitment>> {
    let raws: Vec<RawCommitment> = self
      .conn
      .call(|conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {COMMITMENT_COLUMNS} FROM commitments ORDER BY created_at, commitment_id"
        ))?;
        let rows = stmt
          .query_map([], RawCommitment::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawCommitment::into_commitment).collect()
  }

  async fn set_link(&self, id: Uuid, partner: Option<Uuid>) -> Result<()> {
    if partner == Some(id) {
      return Err(Error::SelfLink);
    }
    self
      .write(move |tx| {
        for c in std::iter::once(id).chain(partner) {
          if !commitment_exists(tx, c)? {
            return Err(Error::CommitmentNotFound(c));
          }
        }

        // Unlink both sides and anything pointing at them before relinking.
        let id_str = encode_uuid(id);
        let partner_str = partner.map(encode_uuid);
        tx.execute(
          "UPDATE commitments SET linked_commitment_id = NULL
            WHERE commitment_id IN (?1, ?2)
               OR linked_commitment_id IN (?1, ?2)",
          rusqlite::params![id_str, partner_str],
        )?;

        if let Some(partner_str) = partner_str {
          tx.execute(
            "UPDATE commitments SET linked_commitment_id = ?2 WHERE commitment_id = ?1",
            rusqlite::params![id_str, partner_str],
          )?;
          tx.execute(
            "UPDATE commitments SET linked_commitment_id = ?1 WHERE commitment_id = ?2",
            rusqlite::params![id_str, partner_str],
          )?;
        }
        Ok(())
      })
      .await
  }

  async fn delete_commitment(&self, id: Uuid) -> Result<()> {
    let id_str = encode_uuid(id);
    let deleted = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "DELETE FROM commitments WHERE commitment_id = ?1",
          rusqlite::params![id_str],
        )?)
      })
      .await?;

    if deleted == 0 {
      return Err(Error::CommitmentNotFound(id));
    }
    Ok(())
  }
}

// ─── TermStore impl ──────────────────────────────────────────────────────────

impl TermStore for SqliteStore {
  type Error = Error;

  async fn list_terms(&self, commitment_id: Uuid) -> Result<Vec<Term>> {
    let id_str = encode_uuid(commitment_id);

    let raws: Vec<RawTerm> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {TERM_COLUMNS} FROM terms WHERE commitment_id = ?1 ORDER BY version"
        ))?;
        let rows = stmt
          .query_map(rusqlite::params![id_str], RawTerm::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawTerm::into_term).collect()
  }

  async fn get_term(&self, term_id: Uuid) -> Result<Option<Term>> {
    self.read(move |conn| load_term(conn, term_id)).await
  }

  async fn create_term(&self, commitment_id: Uuid, input: NewTerm) -> Result<Term> {
    let term = Term {
      term_id: Uuid::new_v4(),
      commitment_id,
      version: input.version,
      params: input.params,
      created_at: Utc::now(),
    };

    self
      .write(move |tx| {
        if !commitment_exists(tx, commitment_id)? {
          return Err(Error::CommitmentNotFound(commitment_id));
        }
        insert_term(tx, &term)?;
        Ok(term)
      })
      .await
  }

  async fn update_term(&self, term_id: Uuid, patch: TermPatch) -> Result<Term> {
    self
      .write(move |tx| {
        let mut term = load_term(tx, term_id)?.ok_or(Error::TermNotFound(term_id))?;
        term.params = term.params.apply(&patch);
        update_term_row(tx, &term)?;
        Ok(term)
      })
      .await
  }

  async fn delete_term(&self, term_id: Uuid) -> Result<()> {
    self
      .write(move |tx| {
        let term = load_term(tx, term_id)?.ok_or(Error::TermNotFound(term_id))?;
        let range = term.range();
        let count: usize = tx.query_row(
          "SELECT COUNT(*) FROM payments
            WHERE commitment_id = ?1
              AND period >= ?2
              AND (?3 IS NULL OR period <= ?3)",
          rusqlite::params![
            encode_uuid(term.commitment_id),
            encode_month(range.from),
            range.until.map(encode_month),
          ],
          |r| r.get(0),
        )?;
        if count > 0 {
          return Err(Error::TermHasPayments {
            version: term.version,
            count,
          });
        }

        tx.execute(
          "DELETE FROM terms WHERE term_id = ?1",
          rusqlite::params![encode_uuid(term_id)],
        )?;
        Ok(())
      })
      .await
  }
}

// ─── PaymentStore impl ───────────────────────────────────────────────────────

impl PaymentStore for SqliteStore {
  type Error = Error;

  async fn list_payments(&self, commitment_id: Uuid) -> Result<Vec<Payment>> {
    let id_str = encode_uuid(commitment_id);

    let raws: Vec<RawPayment> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {PAYMENT_COLUMNS} FROM payments WHERE commitment_id = ?1 ORDER BY period"
        ))?;
        let rows = stmt
          .query_map(rusqlite::params![id_str], RawPayment::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawPayment::into_payment).collect()
  }

  async fn record_payment(&self, input: NewPayment) -> Result<Payment> {
    let payment = Payment {
      payment_id:        Uuid::new_v4(),
      commitment_id:     input.commitment_id,
      period:            input.period,
      payment_date:      input.payment_date,
      amount_original:   input.amount_original,
      currency_original: input.currency_original,
      amount_in_base:    input.amount_in_base,
    };

    self
      .write(move |tx| {
        if !commitment_exists(tx, payment.commitment_id)? {
          return Err(Error::CommitmentNotFound(payment.commitment_id));
        }
        let commitment_id = encode_uuid(payment.commitment_id);
        let period = encode_month(payment.period);
        let taken = tx
          .query_row(
            "SELECT 1 FROM payments WHERE commitment_id = ?1 AND period = ?2",
            rusqlite::params![commitment_id, period],
            |_| Ok(()),
          )
          .optional()?;
        if taken.is_some() {
          return Err(Error::DuplicatePayment(payment.period));
        }

        tx.execute(
          &format!("INSERT INTO payments ({PAYMENT_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)"),
          rusqlite::params![
            encode_uuid(payment.payment_id),
            commitment_id,
            period,
            payment.payment_date.map(encode_date),
            payment.amount_original.to_string(),
            payment.currency_original,
            payment.amount_in_base.to_string(),
          ],
        )?;
        Ok(payment)
      })
      .await
  }

  async fn delete_payment(&self, payment_id: Uuid) -> Result<()> {
    let id_str = encode_uuid(payment_id);
    let deleted = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "DELETE FROM payments WHERE payment_id = ?1",
          rusqlite::params![id_str],
        )?)
      })
      .await?;

    if deleted == 0 {
      return Err(Error::PaymentNotFound(payment_id));
    }
    Ok(())
  }
}
