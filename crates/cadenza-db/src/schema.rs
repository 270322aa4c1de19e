//! SQL schema definitions.

/// Complete schema for Cadenza v1 database.
pub const SCHEMA_V1: &str = r#"
-- ============================================================
-- Ledger
-- ============================================================

CREATE TABLE IF NOT EXISTS ledger_accounts (
    creator_id TEXT PRIMARY KEY,
    balance INTEGER NOT NULL DEFAULT 0 CHECK (balance >= 0),
    total_earned INTEGER NOT NULL DEFAULT 0,
    total_paid_out INTEGER NOT NULL DEFAULT 0,
    min_payout_cents INTEGER NOT NULL DEFAULT 5000,
    created_at INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS ledger_transactions (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    creator_id TEXT NOT NULL REFERENCES ledger_accounts(creator_id),
    amount_cents INTEGER NOT NULL,
    source TEXT NOT NULL,
    status TEXT NOT NULL DEFAULT 'credited',
    idempotency_key TEXT NOT NULL,
    reverses_id INTEGER REFERENCES ledger_transactions(id),
    metadata TEXT,
    created_at INTEGER NOT NULL,
    UNIQUE (creator_id, idempotency_key)
);

CREATE INDEX IF NOT EXISTS idx_tx_creator ON ledger_transactions(creator_id, created_at);

-- ============================================================
-- Treasury
-- ============================================================

CREATE TABLE IF NOT EXISTS treasury_funds (
    fund TEXT NOT NULL,
    period_start INTEGER NOT NULL,
    period_end INTEGER NOT NULL,
    balance_cents INTEGER NOT NULL CHECK (balance_cents >= 0),
    PRIMARY KEY (fund, period_start, period_end)
);

CREATE TABLE IF NOT EXISTS period_revenue_reports (
    period_start INTEGER NOT NULL,
    period_end INTEGER NOT NULL,
    source_type TEXT NOT NULL,
    total_revenue_cents INTEGER NOT NULL CHECK (total_revenue_cents >= 0),
    reported_at INTEGER NOT NULL,
    PRIMARY KEY (period_start, period_end, source_type)
);

-- ============================================================
-- Payouts
-- ============================================================

CREATE TABLE IF NOT EXISTS payouts (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    creator_id TEXT NOT NULL,
    method TEXT NOT NULL,
    gross_cents INTEGER NOT NULL,
    tax_cents INTEGER NOT NULL,
    net_cents INTEGER NOT NULL,
    status TEXT NOT NULL DEFAULT 'pending',
    external_reference TEXT UNIQUE,
    failure_reason TEXT,
    created_at INTEGER NOT NULL,
    processed_at INTEGER
);

CREATE INDEX IF NOT EXISTS idx_payouts_creator ON payouts(creator_id, created_at);

-- ============================================================
-- Audit log (append-only, never updated or deleted)
-- ============================================================

CREATE TABLE IF NOT EXISTS audit_log (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    category TEXT NOT NULL,
    creator_id TEXT,
    amount_cents INTEGER,
    detail TEXT NOT NULL,
    created_at INTEGER NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_audit_created ON audit_log(created_at);

-- ============================================================
-- Tiers, priority designations, creator metrics
-- ============================================================

CREATE TABLE IF NOT EXISTS creator_tiers (
    creator_id TEXT PRIMARY KEY,
    tier TEXT NOT NULL DEFAULT 'emerging',
    updated_at INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS priority_designations (
    creator_id TEXT PRIMARY KEY,
    priority_level INTEGER NOT NULL DEFAULT 1,
    active INTEGER NOT NULL DEFAULT 0,
    auto_promoted INTEGER NOT NULL DEFAULT 0,
    manual_override INTEGER NOT NULL DEFAULT 0,
    updated_at INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS creator_metrics (
    creator_id TEXT PRIMARY KEY,
    upload_count INTEGER NOT NULL DEFAULT 0,
    quality_score REAL NOT NULL DEFAULT 0,
    updated_at INTEGER NOT NULL
);

-- ============================================================
-- Stream statistics
-- ============================================================

CREATE TABLE IF NOT EXISTS period_stream_stats (
    creator_id TEXT NOT NULL,
    period_start INTEGER NOT NULL,
    period_end INTEGER NOT NULL,
    qualified_streams INTEGER NOT NULL DEFAULT 0,
    fraud_streams INTEGER NOT NULL DEFAULT 0,
    PRIMARY KEY (creator_id, period_start, period_end)
);

CREATE INDEX IF NOT EXISTS idx_stats_period ON period_stream_stats(period_start, period_end);

-- ============================================================
-- Payout profiles
-- ============================================================

CREATE TABLE IF NOT EXISTS creator_payout_profiles (
    creator_id TEXT PRIMARY KEY,
    connect_account_id TEXT,
    bank_iban TEXT,
    crypto_wallet TEXT,
    crypto_asset_type TEXT,
    country TEXT NOT NULL DEFAULT 'XX',
    updated_at INTEGER NOT NULL
);

-- ============================================================
-- Scheduler job runs
-- ============================================================

CREATE TABLE IF NOT EXISTS job_runs (
    job TEXT NOT NULL,
    period_start INTEGER NOT NULL,
    period_end INTEGER NOT NULL,
    status TEXT NOT NULL,
    detail TEXT,
    started_at INTEGER NOT NULL,
    finished_at INTEGER,
    PRIMARY KEY (job, period_start, period_end)
);
"#;
