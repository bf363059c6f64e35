//! SQL schema for the Pacto SQLite store.
//!
//! Executed once at connection startup via `PRAGMA user_version`. Future
//! migrations will be gated on that version number.
//!
//! Months are stored as `YYYY-MM` text, which sorts chronologically, so range
//! checks are plain string comparisons.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS commitments (
    commitment_id        TEXT PRIMARY KEY,
    name                 TEXT NOT NULL,
    category_id          TEXT,
    flow                 TEXT NOT NULL,   -- 'expense' | 'income'
    is_important         INTEGER NOT NULL DEFAULT 0,
    linked_commitment_id TEXT REFERENCES commitments(commitment_id) ON DELETE SET NULL,
    note                 TEXT,
    created_at           TEXT NOT NULL,
    CHECK (linked_commitment_id IS NULL OR linked_commitment_id != commitment_id)
);

-- No is_active column: the active term is always MAX(version).
CREATE TABLE IF NOT EXISTS terms (
    term_id            TEXT PRIMARY KEY,
    commitment_id      TEXT NOT NULL REFERENCES commitments(commitment_id) ON DELETE CASCADE,
    version            INTEGER NOT NULL,
    effective_from     TEXT NOT NULL,   -- YYYY-MM-DD
    effective_until    TEXT,            -- YYYY-MM-DD or NULL (open-ended)
    from_month         TEXT NOT NULL,   -- YYYY-MM, derived from effective_from
    until_month        TEXT,            -- YYYY-MM, derived from effective_until
    frequency          TEXT NOT NULL,
    due_day_of_month   INTEGER NOT NULL,
    amount_original    TEXT NOT NULL,   -- decimal string
    currency_original  TEXT NOT NULL,
    fx_rate_to_base    TEXT NOT NULL,   -- decimal string
    installments_count INTEGER,
    is_divided_amount  INTEGER NOT NULL DEFAULT 0,
    created_at         TEXT NOT NULL,
    UNIQUE (commitment_id, version),
    CHECK  (until_month IS NULL OR until_month >= from_month)
);

-- No term_id column: the owning term is looked up from the period.
CREATE TABLE IF NOT EXISTS payments (
    payment_id        TEXT PRIMARY KEY,
    commitment_id     TEXT NOT NULL REFERENCES commitments(commitment_id) ON DELETE CASCADE,
    period            TEXT NOT NULL,    -- YYYY-MM; never updated
    payment_date      TEXT,             -- YYYY-MM-DD or NULL (pending)
    amount_original   TEXT NOT NULL,
    currency_original TEXT NOT NULL,
    amount_in_base    TEXT NOT NULL,
    UNIQUE (commitment_id, period)
);

CREATE INDEX IF NOT EXISTS terms_commitment_idx    ON terms(commitment_id, from_month);
CREATE INDEX IF NOT EXISTS payments_commitment_idx ON payments(commitment_id, period);

PRAGMA user_version = 1;
";
