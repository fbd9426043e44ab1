//! SQL schema for the parish SQLite store.
//!
//! Executed once at connection startup. Future migrations will be gated on
//! `PRAGMA user_version`.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
///
/// Money columns hold decimal strings and are only ever summed in Rust.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS members (
    member_id         TEXT PRIMARY KEY,
    matricule         TEXT NOT NULL UNIQUE,    -- 'NNN-ll'
    matricule_ordinal INTEGER NOT NULL UNIQUE, -- allocation order
    first_name        TEXT NOT NULL,
    last_name         TEXT NOT NULL,
    gender            TEXT NOT NULL,
    date_of_birth     TEXT,
    place_of_birth    TEXT,
    email             TEXT,
    phone             TEXT,
    address           TEXT,
    neighborhood      TEXT,
    profession        TEXT,
    marital_status    TEXT NOT NULL,
    baptism_date      TEXT,
    baptism_place     TEXT,
    join_date         TEXT NOT NULL,
    category          TEXT NOT NULL,
    situation         TEXT NOT NULL,
    membership_status TEXT NOT NULL,
    notes             TEXT,
    created_at        TEXT NOT NULL
);

-- Highest matricule ordinal ever issued. Survives member deletion so a
-- matricule is never handed out twice.
CREATE TABLE IF NOT EXISTS matricule_counter (
    id           INTEGER PRIMARY KEY CHECK (id = 1),
    last_ordinal INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS associations (
    association_id TEXT PRIMARY KEY,
    name           TEXT NOT NULL UNIQUE,
    description    TEXT,
    created_at     TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS member_associations (
    member_id      TEXT NOT NULL REFERENCES members(member_id) ON DELETE CASCADE,
    association_id TEXT NOT NULL REFERENCES associations(association_id) ON DELETE CASCADE,
    role           TEXT,
    joined_on      TEXT NOT NULL,
    PRIMARY KEY (member_id, association_id)
);

CREATE TABLE IF NOT EXISTS commitments (
    commitment_id TEXT PRIMARY KEY,
    member_id     TEXT NOT NULL REFERENCES members(member_id),
    year          INTEGER NOT NULL,
    tithe         TEXT NOT NULL,
    construction  TEXT NOT NULL,
    debt          TEXT NOT NULL,
    total         TEXT NOT NULL,
    created_at    TEXT NOT NULL,
    updated_at    TEXT NOT NULL,
    UNIQUE (member_id, year)
);

CREATE TABLE IF NOT EXISTS payments (
    payment_id    TEXT PRIMARY KEY,
    member_id     TEXT NOT NULL REFERENCES members(member_id),
    commitment_id TEXT REFERENCES commitments(commitment_id),
    payment_type  TEXT NOT NULL,
    amount        TEXT NOT NULL,
    payment_date  TEXT NOT NULL,   -- YYYY-MM-DD
    reference     TEXT,
    notes         TEXT,
    created_at    TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS commitments_year_idx      ON commitments(year);
CREATE INDEX IF NOT EXISTS payments_member_idx       ON payments(member_id);
CREATE INDEX IF NOT EXISTS payments_commitment_idx   ON payments(commitment_id);
CREATE INDEX IF NOT EXISTS payments_date_idx         ON payments(payment_date);
CREATE INDEX IF NOT EXISTS member_associations_a_idx ON member_associations(association_id);

PRAGMA user_version = 1;
";
