//! Postgres-backed document store.
//!
//! ## Schema
//!
//! Each table has a surrogate `id`, a `natural_key` column carrying the unique
//! constraint used as the conflict target, and the entity's own columns.
//! `offers` and `receipts` reference `customers(id)`.
//!
//! ## Upsert
//!
//! Rows arrive as JSON and are spread onto columns with
//! `jsonb_populate_record`, so missing keys become NULL. On conflict every
//! column is `COALESCE(EXCLUDED.col, table.col)`: new non-null values win,
//! nulls keep what is stored.
//!
//! ## Error Mapping
//!
//! | SQLx Error | PostgreSQL Error Code | StoreError |
//! |------------|----------------------|------------|
//! | Database (foreign key / not-null / check) | `23503` / `23502` / `23514` | `Constraint` |
//! | Database (other) | Any other | `Query` |
//! | PoolClosed / Io / Tls / PoolTimedOut | N/A | `Unavailable` |
//! | Other | N/A | `Query` |
//!
//! ## Blocking
//!
//! The store is synchronous like the rest of the worker path and drives its
//! pool on a private current-thread runtime. Do not call it from inside an
//! async context.

use std::collections::HashMap;
use std::time::Duration;

use paperflow_core::{EntityKind, NaturalKey, RecordId, Row};
use serde_json::Value;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use tokio::runtime::Runtime;
use tracing::{debug, instrument};

use super::{DocumentStore, StoreError};

pub const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS customers (
    id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    natural_key TEXT NOT NULL UNIQUE,
    name TEXT NOT NULL,
    organization_number TEXT,
    email TEXT,
    phone TEXT,
    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
);

CREATE TABLE IF NOT EXISTS offers (
    id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    natural_key TEXT NOT NULL UNIQUE,
    offer_number TEXT NOT NULL,
    customer_id UUID REFERENCES customers(id),
    total_amount DOUBLE PRECISION,
    currency TEXT NOT NULL DEFAULT 'SEK',
    issued_at TEXT,
    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
);

CREATE TABLE IF NOT EXISTS receipts (
    id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    natural_key TEXT NOT NULL UNIQUE,
    receipt_number TEXT NOT NULL,
    customer_id UUID REFERENCES customers(id),
    total_amount DOUBLE PRECISION,
    vat_amount DOUBLE PRECISION,
    issued_at TEXT,
    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
);

CREATE INDEX IF NOT EXISTS offers_customer_id_idx ON offers (customer_id);
CREATE INDEX IF NOT EXISTS receipts_customer_id_idx ON receipts (customer_id);
"#;

const KINDS: [EntityKind; 3] = [EntityKind::Customer, EntityKind::Offer, EntityKind::Receipt];

/// Builds the upsert statement for one table. Column names come from
/// [`EntityKind::columns`], never from input.
pub fn upsert_sql(kind: EntityKind) -> String {
    let table = kind.table();
    let columns = kind.columns();
    let insert_cols = columns.join(", ");
    let select_cols = columns
        .iter()
        .map(|c| format!("r.{c}"))
        .collect::<Vec<_>>()
        .join(", ");
    let updates = columns
        .iter()
        .map(|c| format!("{c} = COALESCE(EXCLUDED.{c}, {table}.{c})"))
        .collect::<Vec<_>>()
        .join(",\n    ");
    format!(
        "INSERT INTO {table} (natural_key, {insert_cols})\n\
         SELECT $1, {select_cols} FROM jsonb_populate_record(NULL::{table}, $2::jsonb) AS r\n\
         ON CONFLICT (natural_key) DO UPDATE SET\n    {updates},\n    updated_at = NOW()\n\
         RETURNING id"
    )
}

pub struct PostgresDocumentStore {
    runtime: Runtime,
    pool: PgPool,
    statements: HashMap<EntityKind, String>,
}

impl PostgresDocumentStore {
    /// Connects a small pool to `database_url`.
    pub fn connect(database_url: &str) -> Result<Self, StoreError> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| StoreError::Unavailable(format!("failed to start runtime: {e}")))?;
        let pool = runtime
            .block_on(
                PgPoolOptions::new()
                    .max_connections(4)
                    .acquire_timeout(Duration::from_secs(10))
                    .connect(database_url),
            )
            .map_err(|e| map_sqlx_error("connect", e))?;

        let statements = KINDS.iter().map(|&k| (k, upsert_sql(k))).collect();
        Ok(Self {
            runtime,
            pool,
            statements,
        })
    }

    /// Creates the tables if they do not exist.
    pub fn ensure_schema(&self) -> Result<(), StoreError> {
        self.runtime
            .block_on(sqlx::raw_sql(SCHEMA).execute(&self.pool))
            .map_err(|e| map_sqlx_error("ensure_schema", e))?;
        Ok(())
    }
}

impl DocumentStore for PostgresDocumentStore {
    #[instrument(skip(self, row), fields(table = kind.table(), key = %key), err)]
    fn upsert(&self, kind: EntityKind, key: &NaturalKey, row: &Row) -> Result<Option<RecordId>, StoreError> {
        let sql = self
            .statements
            .get(&kind)
            .ok_or_else(|| StoreError::Query(format!("no statement for {kind}")))?;
        let id: Option<uuid::Uuid> = self
            .runtime
            .block_on(
                sqlx::query_scalar(sql)
                    .bind(&key.value)
                    .bind(Value::Object(row.clone()))
                    .fetch_optional(&self.pool),
            )
            .map_err(|e| map_sqlx_error(kind.table(), e))?;
        debug!(found = id.is_some(), "upserted");
        Ok(id.map(RecordId::from_uuid))
    }

    fn ping(&self) -> Result<(), StoreError> {
        self.runtime
            .block_on(sqlx::query("SELECT id FROM customers LIMIT 1").fetch_optional(&self.pool))
            .map_err(|e| map_sqlx_error("ping", e))?;
        Ok(())
    }
}

fn map_sqlx_error(operation: &'static str, err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::Database(db_err) => {
            let message = format!("database error in {}: {}", operation, db_err.message());
            match db_err.code().as_deref() {
                Some("23503") | Some("23502") | Some("23514") => StoreError::Constraint {
                    table: operation,
                    message,
                },
                _ => StoreError::Query(message),
            }
        }
        sqlx::Error::PoolClosed | sqlx::Error::PoolTimedOut | sqlx::Error::Io(_) | sqlx::Error::Tls(_) => {
            StoreError::Unavailable(format!("{operation}: {err}"))
        }
        _ => StoreError::Query(format!("sqlx error in {}: {}", operation, err)),
    }
}
