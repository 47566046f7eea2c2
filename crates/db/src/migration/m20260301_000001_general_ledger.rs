//! General ledger schema.
//!
//! Creates the enums, the chart of accounts, transactions with their ledger
//! entries, monthly balance rows and the append-only sync log, plus the
//! triggers that keep posted history immutable.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();

        db.execute_unprepared(ENUMS_SQL).await?;

        db.execute_unprepared(CHART_OF_ACCOUNTS_SQL).await?;
        db.execute_unprepared(TRANSACTIONS_SQL).await?;
        db.execute_unprepared(LEDGER_ENTRIES_SQL).await?;
        db.execute_unprepared(ACCOUNT_PERIOD_BALANCES_SQL).await?;
        db.execute_unprepared(SYNC_LOGS_SQL).await?;

        db.execute_unprepared(TRIGGERS_SQL).await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();
        db.execute_unprepared(DROP_ALL_SQL).await?;
        Ok(())
    }
}

// ============================================================
// SQL CONSTANTS
// ============================================================

const ENUMS_SQL: &str = r"
CREATE TYPE account_type AS ENUM (
    'asset',
    'liability',
    'equity',
    'revenue',
    'expense'
);

CREATE TYPE transaction_status AS ENUM ('pending', 'posted', 'reversed');

CREATE TYPE source_module AS ENUM (
    'momo',
    'agency-banking',
    'commissions',
    'expenses',
    'manual'
);

CREATE TYPE sync_status AS ENUM ('success', 'failed', 'partial');
";

const CHART_OF_ACCOUNTS_SQL: &str = r"
CREATE TABLE chart_of_accounts (
    id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    code VARCHAR(20) NOT NULL,
    name VARCHAR(255) NOT NULL,
    account_type account_type NOT NULL,
    parent_id UUID REFERENCES chart_of_accounts(id),
    balance NUMERIC(19, 4) NOT NULL DEFAULT 0,
    is_active BOOLEAN NOT NULL DEFAULT true,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    CONSTRAINT chk_coa_code_not_blank CHECK (btrim(code) <> ''),
    CONSTRAINT chk_coa_not_own_parent CHECK (parent_id IS NULL OR parent_id <> id)
);

-- A code may be reused only after the previous holder was deactivated
CREATE UNIQUE INDEX uq_chart_of_accounts_active_code
    ON chart_of_accounts(code) WHERE is_active = true;
CREATE INDEX idx_coa_code ON chart_of_accounts(code);
CREATE INDEX idx_coa_type ON chart_of_accounts(account_type);
CREATE INDEX idx_coa_parent ON chart_of_accounts(parent_id) WHERE parent_id IS NOT NULL;
";

const TRANSACTIONS_SQL: &str = r"
CREATE TABLE transactions (
    id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    transaction_date DATE NOT NULL,
    source_module source_module NOT NULL,
    source_transaction_id VARCHAR(255) NOT NULL,
    source_transaction_type VARCHAR(100) NOT NULL,
    description TEXT NOT NULL,
    status transaction_status NOT NULL DEFAULT 'pending',
    created_by VARCHAR(255) NOT NULL,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    posted_by VARCHAR(255),
    posted_at TIMESTAMPTZ,
    reversed_by VARCHAR(255),
    reversed_at TIMESTAMPTZ,
    reverses_transaction_id UUID REFERENCES transactions(id),
    reversed_by_transaction_id UUID REFERENCES transactions(id),
    branch_id VARCHAR(100),
    metadata JSONB NOT NULL DEFAULT '{}'::jsonb,
    CONSTRAINT chk_posted_has_poster CHECK (
        status <> 'posted' OR (posted_by IS NOT NULL AND posted_at IS NOT NULL)
    ),
    CONSTRAINT chk_reversed_has_reverser CHECK (
        status <> 'reversed' OR (reversed_by IS NOT NULL AND reversed_at IS NOT NULL)
    )
);

-- Idempotency key: one live transaction per upstream record
CREATE UNIQUE INDEX uq_transactions_active_source
    ON transactions(source_module, source_transaction_id)
    WHERE status <> 'reversed';
CREATE INDEX idx_txn_source_id ON transactions(source_transaction_id);
CREATE INDEX idx_txn_date ON transactions(transaction_date DESC, created_at DESC);
CREATE INDEX idx_txn_status ON transactions(status);
CREATE INDEX idx_txn_branch ON transactions(branch_id) WHERE branch_id IS NOT NULL;
";

const LEDGER_ENTRIES_SQL: &str = r"
CREATE TABLE ledger_entries (
    id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    transaction_id UUID NOT NULL REFERENCES transactions(id),
    line_number INTEGER NOT NULL,
    account_id UUID NOT NULL REFERENCES chart_of_accounts(id),
    account_code VARCHAR(20) NOT NULL,
    debit NUMERIC(19, 4) NOT NULL DEFAULT 0,
    credit NUMERIC(19, 4) NOT NULL DEFAULT 0,
    description TEXT,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    CONSTRAINT chk_entry_non_negative CHECK (debit >= 0 AND credit >= 0),
    CONSTRAINT chk_entry_one_sided CHECK ((debit > 0) <> (credit > 0)),
    UNIQUE (transaction_id, line_number)
);

CREATE INDEX idx_entries_account ON ledger_entries(account_id);
";

const ACCOUNT_PERIOD_BALANCES_SQL: &str = r"
CREATE TABLE account_period_balances (
    account_id UUID NOT NULL REFERENCES chart_of_accounts(id),
    period_start DATE NOT NULL,
    delta NUMERIC(19, 4) NOT NULL DEFAULT 0,
    updated_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    PRIMARY KEY (account_id, period_start),
    CONSTRAINT chk_period_is_month_start CHECK (EXTRACT(DAY FROM period_start) = 1)
);
";

const SYNC_LOGS_SQL: &str = r"
CREATE TABLE sync_logs (
    id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    logged_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    module source_module NOT NULL,
    operation VARCHAR(100) NOT NULL,
    status sync_status NOT NULL,
    details JSONB NOT NULL DEFAULT '{}'::jsonb,
    affected_records BIGINT NOT NULL DEFAULT 0,
    error TEXT
);

CREATE INDEX idx_sync_logs_logged_at ON sync_logs(logged_at DESC);
CREATE INDEX idx_sync_logs_module ON sync_logs(module, logged_at DESC);
";

const TRIGGERS_SQL: &str = r"
-- ============================================================
-- FUNCTION: check_transaction_balance
-- Debits equal credits for every transaction, checked at commit
-- ============================================================
CREATE OR REPLACE FUNCTION check_transaction_balance()
RETURNS TRIGGER AS $$
DECLARE
    total_debit NUMERIC(19, 4);
    total_credit NUMERIC(19, 4);
    entry_count INTEGER;
BEGIN
    SELECT
        COALESCE(SUM(debit), 0),
        COALESCE(SUM(credit), 0),
        COUNT(*)
    INTO total_debit, total_credit, entry_count
    FROM ledger_entries
    WHERE transaction_id = NEW.transaction_id;

    IF entry_count < 2 THEN
        RAISE EXCEPTION 'Transaction % has % entries, at least 2 required',
            NEW.transaction_id, entry_count;
    END IF;

    IF total_debit <> total_credit THEN
        RAISE EXCEPTION 'Transaction is not balanced. Debit: %, Credit: %',
            total_debit, total_credit;
    END IF;

    RETURN NEW;
END;
$$ LANGUAGE plpgsql;

CREATE CONSTRAINT TRIGGER trg_check_balance
AFTER INSERT ON ledger_entries
DEFERRABLE INITIALLY DEFERRED
FOR EACH ROW
EXECUTE FUNCTION check_transaction_balance();

-- ============================================================
-- FUNCTION: prevent_entry_modification
-- Ledger entries are written once with their transaction
-- ============================================================
CREATE OR REPLACE FUNCTION prevent_entry_modification()
RETURNS TRIGGER AS $$
BEGIN
    RAISE EXCEPTION 'Ledger entries cannot be modified or deleted';
END;
$$ LANGUAGE plpgsql;

CREATE TRIGGER trg_prevent_entry_mod
BEFORE UPDATE OR DELETE ON ledger_entries
FOR EACH ROW
EXECUTE FUNCTION prevent_entry_modification();

-- ============================================================
-- FUNCTION: guard_transaction_update
-- Only status transitions pending->posted, pending->reversed and
-- posted->reversed are allowed; the business fields never change
-- ============================================================
CREATE OR REPLACE FUNCTION guard_transaction_update()
RETURNS TRIGGER AS $$
BEGIN
    IF NEW.transaction_date IS DISTINCT FROM OLD.transaction_date
        OR NEW.source_module IS DISTINCT FROM OLD.source_module
        OR NEW.source_transaction_id IS DISTINCT FROM OLD.source_transaction_id
        OR NEW.source_transaction_type IS DISTINCT FROM OLD.source_transaction_type
        OR NEW.description IS DISTINCT FROM OLD.description
        OR NEW.created_by IS DISTINCT FROM OLD.created_by
        OR NEW.created_at IS DISTINCT FROM OLD.created_at
        OR NEW.reverses_transaction_id IS DISTINCT FROM OLD.reverses_transaction_id
        OR NEW.branch_id IS DISTINCT FROM OLD.branch_id
        OR NEW.metadata IS DISTINCT FROM OLD.metadata
    THEN
        RAISE EXCEPTION 'Transaction % fields are immutable', OLD.id;
    END IF;

    IF NEW.status <> OLD.status AND NOT (
        (OLD.status = 'pending' AND NEW.status IN ('posted', 'reversed'))
        OR (OLD.status = 'posted' AND NEW.status = 'reversed')
    ) THEN
        RAISE EXCEPTION 'Invalid status transition % -> % for transaction %',
            OLD.status, NEW.status, OLD.id;
    END IF;

    RETURN NEW;
END;
$$ LANGUAGE plpgsql;

CREATE TRIGGER trg_guard_transaction_update
BEFORE UPDATE ON transactions
FOR EACH ROW
EXECUTE FUNCTION guard_transaction_update();

CREATE OR REPLACE FUNCTION prevent_transaction_delete()
RETURNS TRIGGER AS $$
BEGIN
    RAISE EXCEPTION 'Transactions cannot be deleted, reverse them instead';
END;
$$ LANGUAGE plpgsql;

CREATE TRIGGER trg_prevent_transaction_delete
BEFORE DELETE ON transactions
FOR EACH ROW
EXECUTE FUNCTION prevent_transaction_delete();

-- ============================================================
-- FUNCTION: prevent_sync_log_modification
-- The sync log is append-only
-- ============================================================
CREATE OR REPLACE FUNCTION prevent_sync_log_modification()
RETURNS TRIGGER AS $$
BEGIN
    RAISE EXCEPTION 'Sync log entries cannot be modified or deleted';
END;
$$ LANGUAGE plpgsql;

CREATE TRIGGER trg_prevent_sync_log_mod
BEFORE UPDATE OR DELETE ON sync_logs
FOR EACH ROW
EXECUTE FUNCTION prevent_sync_log_modification();
";

const DROP_ALL_SQL: &str = r"
-- Order matters due to foreign key constraints
DROP TRIGGER IF EXISTS trg_prevent_sync_log_mod ON sync_logs;
DROP TRIGGER IF EXISTS trg_prevent_transaction_delete ON transactions;
DROP TRIGGER IF EXISTS trg_guard_transaction_update ON transactions;
DROP TRIGGER IF EXISTS trg_prevent_entry_mod ON ledger_entries;
DROP TRIGGER IF EXISTS trg_check_balance ON ledger_entries;

DROP FUNCTION IF EXISTS prevent_sync_log_modification();
DROP FUNCTION IF EXISTS prevent_transaction_delete();
DROP FUNCTION IF EXISTS guard_transaction_update();
DROP FUNCTION IF EXISTS prevent_entry_modification();
DROP FUNCTION IF EXISTS check_transaction_balance();

DROP TABLE IF EXISTS sync_logs;
DROP TABLE IF EXISTS account_period_balances;
DROP TABLE IF EXISTS ledger_entries;
DROP TABLE IF EXISTS transactions;
DROP TABLE IF EXISTS chart_of_accounts;

DROP TYPE IF EXISTS sync_status;
DROP TYPE IF EXISTS source_module;
DROP TYPE IF EXISTS transaction_status;
DROP TYPE IF EXISTS account_type;
";
