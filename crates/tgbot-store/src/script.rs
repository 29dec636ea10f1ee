//! Statement classification and best-effort script execution.
//!
//! A script is one or more `;`-separated statements. Each statement is
//! classified as **mutating** or **query** by keyword, then executed in
//! source order. A failing statement is logged and the script carries on;
//! the caller only sees the [`Envelope`] of the last statement.
//!
//! ```text
//!   "CREATE …; INSERT …; SELECT …"
//!        │         │         │
//!        ▼         ▼         ▼
//!     mutating  mutating   query ──► Envelope::Ok { rows: Some([...]) }
//! ```

use rusqlite::{Connection, params_from_iter};
use tracing::{debug, warn};

use crate::db::Database;
use crate::error::{StoreError, StoreResult};
use crate::record::Record;
use crate::value::{CURRENT_TIMESTAMP, SqlValue};

/// Substrings that mark a statement as mutating (checked lowercase).
const MUTATING_MARKERS: &[&str] = &[
    "insert into",
    "insert or",
    "replace",
    "create",
    "alter",
    "delete",
    "drop",
    "update",
];

/// How a statement is executed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatementKind {
    /// Changes data or schema; produces no rows.
    Mutating,
    /// Produces zero or more rows.
    Query,
}

/// Classify a single statement by keyword.
///
/// The check is a plain substring match, so a query that merely mentions
/// one of the markers (e.g. `SELECT replace(name, 'a', 'b')`) runs as
/// mutating and its rows are discarded.
pub fn classify(sql: &str) -> StatementKind {
    let lower = sql.to_lowercase();
    if MUTATING_MARKERS.iter().any(|m| lower.contains(m)) {
        StatementKind::Mutating
    } else {
        StatementKind::Query
    }
}

/// Split a script into trimmed, non-blank statements.
///
/// `;` inside quoted strings, quoted or `[bracketed]` identifiers and
/// comments does not end a statement. Chunks holding only whitespace and comments are dropped.
pub fn split_statements(script: &str) -> Vec<&str> {
    #[derive(Clone, Copy)]
    enum State {
        Code,
        Quoted(u8),
        LineComment,
        BlockComment,
    }

    let bytes = script.as_bytes();
    let mut out = Vec::new();
    let mut state = State::Code;
    let mut start = 0;
    let mut has_code = false;
    let mut i = 0;

    while i < bytes.len() {
        let b = bytes[i];
        let next = bytes.get(i + 1).copied();
        match state {
            State::Code => match b {
                b'\'' | b'"' | b'`' => {
                    state = State::Quoted(b);
                    has_code = true;
                }
                b'[' => {
                    state = State::Quoted(b']');
                    has_code = true;
                }
                b'-' if next == Some(b'-') => {
                    state = State::LineComment;
                    i += 1;
                }
                b'/' if next == Some(b'*') => {
                    state = State::BlockComment;
                    i += 1;
                }
                b';' => {
                    if has_code {
                        out.push(script[start..i].trim());
                    }
                    start = i + 1;
                    has_code = false;
                }
                _ if !b.is_ascii_whitespace() => has_code = true,
                _ => {}
            },
            State::Quoted(q) => {
                if b == q {
                    state = State::Code;
                }
            }
            State::LineComment => {
                if b == b'\n' {
                    state = State::Code;
                }
            }
            State::BlockComment => {
                if b == b'*' && next == Some(b'/') {
                    state = State::Code;
                    i += 1;
                }
            }
        }
        i += 1;
    }

    if has_code {
        out.push(script[start..].trim());
    }
    out
}

// ═══════════════════════════════════════════════════════════════════════
//  Envelope
// ═══════════════════════════════════════════════════════════════════════

/// Outcome of a script or statement.
#[derive(Debug)]
pub enum Envelope {
    /// The (last) statement succeeded.
    Ok {
        /// Rows for queries; `None` for mutating statements.
        rows: Option<Vec<Record>>,
        /// Rows changed by a mutating statement (0 for queries).
        changes: u64,
    },
    /// The (last) statement failed.
    Error(StoreError),
}

impl Envelope {
    fn empty() -> Self {
        Self::Ok {
            rows: None,
            changes: 0,
        }
    }

    pub fn is_ok(&self) -> bool {
        matches!(self, Self::Ok { .. })
    }

    /// Borrow the rows of a successful query.
    pub fn rows(&self) -> Option<&[Record]> {
        match self {
            Self::Ok { rows: Some(rows), .. } => Some(rows),
            _ => None,
        }
    }

    /// Rows changed by a successful mutating statement.
    pub fn changes(&self) -> Option<u64> {
        match self {
            Self::Ok { changes, .. } => Some(*changes),
            Self::Error(_) => None,
        }
    }

    /// Convert into a `Result`, keeping the optional rows.
    pub fn into_result(self) -> StoreResult<Option<Vec<Record>>> {
        match self {
            Self::Ok { rows, .. } => Ok(rows),
            Self::Error(e) => Err(e),
        }
    }

    /// Convert into a `Result` of rows; mutating outcomes yield no rows.
    pub fn into_rows(self) -> StoreResult<Vec<Record>> {
        self.into_result().map(Option::unwrap_or_default)
    }
}

// ═══════════════════════════════════════════════════════════════════════
//  Statement
// ═══════════════════════════════════════════════════════════════════════

/// One SQL statement with bound parameters.
///
/// Statements built by code that knows what it is building carry an
/// explicit [`StatementKind`]; otherwise the keyword classifier decides.
#[derive(Debug, Clone, Default)]
pub struct Statement {
    sql: String,
    params: Vec<SqlValue>,
    kind: Option<StatementKind>,
}

impl Statement {
    /// A statement classified by keyword at execution time.
    pub fn new(sql: impl Into<String>) -> Self {
        Self {
            sql: sql.into(),
            params: Vec::new(),
            kind: None,
        }
    }

    /// A statement that always runs as a row-producing query.
    pub fn query(sql: impl Into<String>) -> Self {
        Self {
            kind: Some(StatementKind::Query),
            ..Self::new(sql)
        }
    }

    /// A statement that always runs as a mutation.
    pub fn mutation(sql: impl Into<String>) -> Self {
        Self {
            kind: Some(StatementKind::Mutating),
            ..Self::new(sql)
        }
    }

    /// Append raw SQL text.
    pub fn push_sql(&mut self, sql: &str) {
        self.sql.push_str(sql);
    }

    /// Bind `value` and return the fragment to splice into the SQL text:
    /// a numbered placeholder, or the timestamp keyword for
    /// [`SqlValue::CurrentTimestamp`]. Text is always bound, whatever it says.
    pub fn bind(&mut self, value: &SqlValue) -> String {
        if matches!(value, SqlValue::CurrentTimestamp) {
            return CURRENT_TIMESTAMP.to_owned();
        }
        self.params.push(value.clone());
        format!("?{}", self.params.len())
    }

    pub fn sql(&self) -> &str {
        &self.sql
    }

    pub fn params(&self) -> &[SqlValue] {
        &self.params
    }

    pub fn kind(&self) -> StatementKind {
        self.kind.unwrap_or_else(|| classify(&self.sql))
    }
}

// ═══════════════════════════════════════════════════════════════════════
//  Execution
// ═══════════════════════════════════════════════════════════════════════

impl Database {
    /// Run a `;`-separated script and return the last statement's envelope.
    pub async fn run_script(&self, script: impl Into<String>) -> Envelope {
        let script = script.into();
        self.execute(move |conn| Ok(run_script_on(conn, &script)))
            .await
            .unwrap_or_else(|e| {
                warn!(error = %e, "script execution failed");
                Envelope::Error(e)
            })
    }

    /// Run one statement with its bound parameters.
    pub async fn run_statement(&self, statement: Statement) -> Envelope {
        self.execute(move |conn| Ok(run_statement_on(conn, &statement)))
            .await
            .unwrap_or_else(|e| {
                warn!(error = %e, "statement execution failed");
                Envelope::Error(e)
            })
    }
}

/// Synchronous script execution on an already-locked connection.
pub(crate) fn run_script_on(conn: &Connection, script: &str) -> Envelope {
    let mut last = Envelope::empty();
    for sql in split_statements(script) {
        last = execute_logged(conn, sql, &[], classify(sql));
    }
    last
}

/// Synchronous single-statement execution on an already-locked connection.
pub(crate) fn run_statement_on(conn: &Connection, statement: &Statement) -> Envelope {
    execute_logged(conn, &statement.sql, &statement.params, statement.kind())
}

fn execute_logged(
    conn: &Connection,
    sql: &str,
    params: &[SqlValue],
    kind: StatementKind,
) -> Envelope {
    match execute_one(conn, sql, params, kind) {
        Ok((rows, changes)) => Envelope::Ok { rows, changes },
        Err(e) => {
            warn!(sql = %sql, error = %e, "statement failed");
            Envelope::Error(e)
        }
    }
}

fn execute_one(
    conn: &Connection,
    sql: &str,
    params: &[SqlValue],
    kind: StatementKind,
) -> StoreResult<(Option<Vec<Record>>, u64)> {
    debug!(kind = ?kind, sql = %sql, params = params.len(), "executing statement");

    let mut stmt = conn.prepare(sql)?;
    match kind {
        StatementKind::Mutating => {
            let mut rows = stmt.query(params_from_iter(params.iter()))?;
            while rows.next()?.is_some() {}
            drop(rows);
            Ok((None, conn.changes() as u64))
        }
        StatementKind::Query => {
            let columns: Vec<(String, Option<String>)> = stmt
                .columns()
                .iter()
                .map(|c| (c.name().to_owned(), c.decl_type().map(str::to_owned)))
                .collect();

            let mut rows = stmt.query(params_from_iter(params.iter()))?;
            let mut records = Vec::new();
            while let Some(row) = rows.next()? {
                let mut record = Record::new();
                for (idx, (name, decl)) in columns.iter().enumerate() {
                    let value = SqlValue::from_column(row.get_ref(idx)?, decl.as_deref());
                    record.insert(name.clone(), value);
                }
                records.push(record);
            }
            Ok((Some(records), 0))
        }
    }
}

// ── tests ────────────────────────────────────────────────────────────
