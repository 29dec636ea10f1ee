//! Record access layer: CRUD over named tables using [`Record`]s.
//!
//! Statements are assembled from validated identifiers and bound values,
//! then handed to the script executor. Every failure has already been
//! logged by the executor by the time it reaches the caller, so callers
//! that only care about a usable result may collapse `Err` into "nothing".
//!
//! | operation        | SQL shape                                               |
//! |------------------|---------------------------------------------------------|
//! | `insert_many`    | `INSERT INTO t (a, b) VALUES (?1, ?2), (?3, ?4)`        |
//! | `upsert`         | `SELECT 1 … WHERE p` then `UPDATE … WHERE p` or `INSERT` |
//! | `select_rows`    | `SELECT * FROM t WHERE p` (or `WHERE true`)             |
//! | `select_scalar`  | `SELECT c FROM t WHERE p LIMIT 1`                       |
//! | `select_column`  | `SELECT * FROM t WHERE p`, projected onto `c`           |
//! | `delete_where`   | `DELETE FROM t WHERE p`                                 |

use rusqlite::TransactionBehavior;
use tracing::{debug, instrument};

use crate::db::Database;
use crate::error::{StoreError, StoreResult};
use crate::record::{Predicate, Record};
use crate::script::{Statement, run_statement_on};
use crate::value::SqlValue;

/// What an upsert ended up doing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    Inserted,
    Updated,
}

/// CRUD operations over the bot's tables.
#[derive(Clone)]
pub struct RecordStore {
    db: Database,
}

impl RecordStore {
    /// Create a record store backed by `db`.
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// The underlying database handle.
    pub fn database(&self) -> &Database {
        &self.db
    }

    /// Insert several records with one multi-row `INSERT`.
    ///
    /// The first record's columns define the column list; every other
    /// record must have exactly the same columns. Returns the number of rows
    /// inserted. An empty slice is a no-op.
    #[instrument(skip(self, records), fields(count = records.len()))]
    pub async fn insert_many(&self, table: &str, records: &[Record]) -> StoreResult<u64> {
        if records.is_empty() {
            return Ok(0);
        }
        let statement = build_insert(table, records)?;
        let changes = self
            .db
            .run_statement(statement)
            .await
            .into_result()
            .map(|_| records.len() as u64)?;
        debug!(table, rows = changes, "records inserted");
        Ok(changes)
    }

    /// Insert a single record.
    pub async fn insert(&self, table: &str, record: &Record) -> StoreResult<u64> {
        self.insert_many(table, std::slice::from_ref(record)).await
    }

    /// Update the rows matching `predicate`, or insert `record` when none
    /// match. Without a predicate this is a plain insert.
    ///
    /// The existence check and the write run in one immediate transaction
    /// while the connection lock is held, so two upserts of the same key
    /// cannot interleave.
    #[instrument(skip(self, record, predicate))]
    pub async fn upsert(
        &self,
        table: &str,
        record: &Record,
        predicate: Option<&Predicate>,
    ) -> StoreResult<UpsertOutcome> {
        let insert = build_insert(table, std::slice::from_ref(record))?;
        let Some(predicate) = predicate else {
            self.db.run_statement(insert).await.into_result()?;
            return Ok(UpsertOutcome::Inserted);
        };

        let exists = build_select(table, Projection::Exists, Some(predicate))?;
        let update = build_update(table, record, predicate)?;

        let outcome = self
            .db
            .execute_mut(move |conn| {
                let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
                let found = !run_statement_on(&tx, &exists).into_rows()?.is_empty();
                let (statement, outcome) = if found {
                    (update, UpsertOutcome::Updated)
                } else {
                    (insert, UpsertOutcome::Inserted)
                };
                run_statement_on(&tx, &statement).into_result()?;
                tx.commit()?;
                Ok(outcome)
            })
            .await?;

        debug!(table, ?outcome, "upsert applied");
        Ok(outcome)
    }

    /// Select every row matching `predicate` (all rows for `None`).
    #[instrument(skip(self, predicate))]
    pub async fn select_rows(
        &self,
        table: &str,
        predicate: Option<&Predicate>,
    ) -> StoreResult<Vec<Record>> {
        let statement = build_select(table, Projection::All, predicate)?;
        self.db.run_statement(statement).await.into_rows()
    }

    /// First row matching `predicate`, or `None`.
    pub async fn select_one_row(
        &self,
        table: &str,
        predicate: &Predicate,
    ) -> StoreResult<Option<Record>> {
        let rows = self.select_rows(table, Some(predicate)).await?;
        Ok(rows.into_iter().next())
    }

    /// Value of `column` in the first matching row, or `None` when there is
    /// no such row or the column is absent from it.
    #[instrument(skip(self, predicate))]
    pub async fn select_scalar(
        &self,
        table: &str,
        column: &str,
        predicate: Option<&Predicate>,
    ) -> StoreResult<Option<SqlValue>> {
        let statement = build_select(table, Projection::Column(column), predicate)?;
        let rows = self.db.run_statement(statement).await.into_rows()?;
        Ok(rows
            .into_iter()
            .next()
            .and_then(|row| row.get(column).cloned()))
    }

    /// `column` projected across every matching row. Rows lacking the column
    /// contribute [`SqlValue::Null`].
    #[instrument(skip(self, predicate))]
    pub async fn select_column(
        &self,
        table: &str,
        column: &str,
        predicate: Option<&Predicate>,
    ) -> StoreResult<Vec<SqlValue>> {
        identifier(column)?;
        let rows = self.select_rows(table, predicate).await?;
        Ok(rows
            .into_iter()
            .map(|row| row.get(column).cloned().unwrap_or(SqlValue::Null))
            .collect())
    }

    /// Delete rows matching every pair of `predicate`. Returns the number of
    /// rows deleted.
    #[instrument(skip(self, predicate))]
    pub async fn delete_where(&self, table: &str, predicate: &Predicate) -> StoreResult<u64> {
        if predicate.is_empty() {
            return Err(StoreError::InvalidArgument(
                "delete requires a non-empty predicate".into(),
            ));
        }
        let mut statement = Statement::mutation(format!("DELETE FROM {}", quoted(table)?));
        push_where(&mut statement, Some(predicate))?;
        let envelope = self.db.run_statement(statement).await;
        let deleted = envelope.changes().unwrap_or(0);
        envelope.into_result()?;
        debug!(table, deleted, "rows deleted");
        Ok(deleted)
    }
}

// ═══════════════════════════════════════════════════════════════════════
//  Statement builders
// ═══════════════════════════════════════════════════════════════════════

/// What a `SELECT` returns.
#[derive(Debug, Clone, Copy)]
enum Projection<'a> {
    All,
    Column(&'a str),
    Exists,
}

/// Validate a plain SQL identifier: `[A-Za-z_][A-Za-z0-9_]*`.
pub fn identifier(name: &str) -> StoreResult<&str> {
    let mut chars = name.chars();
    let valid = matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_');
    if valid {
        Ok(name)
    } else {
        Err(StoreError::InvalidIdentifier(name.to_owned()))
    }
}

fn quoted(name: &str) -> StoreResult<String> {
    identifier(name).map(|n| format!("\"{n}\""))
}

fn push_where(statement: &mut Statement, predicate: Option<&Predicate>) -> StoreResult<()> {
    let predicate = match predicate {
        Some(p) if !p.is_empty() => p,
        _ => {
            statement.push_sql(" WHERE true");
            return Ok(());
        }
    };

    let mut terms = Vec::with_capacity(predicate.len());
    for (column, value) in predicate.iter() {
        value.validate()?;
        let column = quoted(column)?;
        if value.is_null() {
            terms.push(format!("{column} IS NULL"));
        } else {
            let fragment = statement.bind(value);
            terms.push(format!("{column} = {fragment}"));
        }
    }
    statement.push_sql(" WHERE ");
    statement.push_sql(&terms.join(" AND "));
    Ok(())
}

fn build_insert(table: &str, records: &[Record]) -> StoreResult<Statement> {
    let first = records
        .first()
        .ok_or_else(|| StoreError::InvalidArgument("no records to insert".into()))?;
    if first.is_empty() {
        return Err(StoreError::InvalidArgument(
            "cannot insert a record without columns".into(),
        ));
    }
    if let Some(idx) = records.iter().position(|r| !r.same_columns(first)) {
        return Err(StoreError::InvalidArgument(format!(
            "record {idx} has a different column set than record 0"
        )));
    }

    let columns = first
        .columns()
        .map(quoted)
        .collect::<StoreResult<Vec<_>>>()?
        .join(", ");

    let mut statement = Statement::mutation(format!("INSERT INTO {} ({columns}) VALUES ", quoted(table)?));
    let mut tuples = Vec::with_capacity(records.len());
    for record in records {
        let mut fragments = Vec::with_capacity(record.len());
        for value in record.values() {
            value.validate()?;
            fragments.push(statement.bind(value));
        }
        tuples.push(format!("({})", fragments.join(", ")));
    }
    statement.push_sql(&tuples.join(", "));
    Ok(statement)
}

fn build_update(table: &str, record: &Record, predicate: &Predicate) -> StoreResult<Statement> {
    if record.is_empty() {
        return Err(StoreError::InvalidArgument(
            "cannot update with an empty record".into(),
        ));
    }
    let mut statement = Statement::mutation(format!("UPDATE {} SET ", quoted(table)?));
    let mut assignments = Vec::with_capacity(record.len());
    for (column, value) in record.iter() {
        value.validate()?;
        let column = quoted(column)?;
        let fragment = statement.bind(value);
        assignments.push(format!("{column} = {fragment}"));
    }
    statement.push_sql(&assignments.join(", "));
    push_where(&mut statement, Some(predicate))?;
    Ok(statement)
}

fn build_select(
    table: &str,
    projection: Projection<'_>,
    predicate: Option<&Predicate>,
) -> StoreResult<Statement> {
    let (what, limit) = match projection {
        Projection::All => ("*".to_owned(), false),
        Projection::Column(c) => (quoted(c)?, true),
        Projection::Exists => ("1".to_owned(), true),
    };
    let mut statement = Statement::query(format!("SELECT {what} FROM {}", quoted(table)?));
    push_where(&mut statement, predicate)?;
    if limit {
        statement.push_sql(" LIMIT 1");
    }
    Ok(statement)
}

// ── tests ────────────────────────────────────────────────────────────
