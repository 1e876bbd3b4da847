//! Executor over a file-backed SQLite connection.
//!
//! The connection is a single-owner resource: it is opened once and held for
//! the executor's lifetime behind an async mutex. Each call prepares its own
//! statement and drops it before returning, on success and on failure alike.
//!
//! A transaction takes the mutex for its whole lifetime. Other callers on the
//! same executor, clones of the client included, wait until it commits, rolls
//! back or is dropped. A transaction dropped unfinished is rolled back on the
//! spot, so the connection always returns to autocommit.

use crate::error::{ClientError, Result};
use crate::executor::{Atomicity, Backend, Executor, UnitOfWork};
use crate::result::{normalize, LocalRaw, RawResult, ResultSet};
use crate::statement::Statement;
use crate::value::Value;
use async_trait::async_trait;
use futures::lock::{Mutex, OwnedMutexGuard};
use log::{debug, info, warn};
use rusqlite::{params_from_iter, Connection};
use std::path::{Path, PathBuf};
use std::sync::Arc;

pub struct LocalExecutor {
    path: PathBuf,
    connection: Arc<Mutex<Option<Connection>>>,
}

impl LocalExecutor {
    /// Open (creating if needed) the database at `path`. `:memory:` opens a
    /// private in-memory database.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let connection = Connection::open(&path).map_err(ClientError::engine)?;
        connection
            .execute_batch("PRAGMA foreign_keys = ON;")
            .map_err(ClientError::engine)?;
        info!("[SQL_LOCAL] opened database at {}", path.display());
        Ok(Self {
            path,
            connection: Arc::new(Mutex::new(Some(connection))),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn open_connection(slot: &Option<Connection>) -> Result<&Connection> {
    slot.as_ref()
        .ok_or_else(|| ClientError::configuration("connection closed"))
}

fn run_statement(connection: &Connection, statement: &Statement) -> rusqlite::Result<LocalRaw> {
    let mut prepared = connection.prepare(&statement.text)?;
    let columns: Vec<String> = prepared
        .column_names()
        .into_iter()
        .map(str::to_string)
        .collect();

    let rowid_before = connection.last_insert_rowid();
    let mut tuples = Vec::new();
    {
        let mut rows = prepared.query(params_from_iter(statement.params.iter()))?;
        while let Some(row) = rows.next()? {
            let mut tuple = Vec::with_capacity(columns.len());
            for index in 0..columns.len() {
                tuple.push(Value::from(row.get_ref(index)?));
            }
            tuples.push(tuple);
        }
    }
    let rowid_after = connection.last_insert_rowid();

    // `changes()` keeps the count of the last DML statement, so anything else
    // would report a stale number.
    let changes = if statement.is_dml() && !prepared.readonly() {
        connection.changes()
    } else {
        0
    };

    Ok(LocalRaw {
        columns,
        tuples,
        last_insert_rowid: (rowid_after != rowid_before).then_some(rowid_after),
        changes,
    })
}

/// Roll back whatever transaction is open. No-op in autocommit mode.
fn rollback_open(connection: &Connection) -> rusqlite::Result<()> {
    if connection.is_autocommit() {
        return Ok(());
    }
    connection.execute_batch("ROLLBACK")
}

/// Run one statement; any fault rolls back an open transaction first.
fn execute_on(connection: &Connection, statement: &Statement) -> Result<ResultSet> {
    debug!("[SQL_LOCAL] {}", statement.preview());
    match run_statement(connection, statement) {
        Ok(raw) => normalize(RawResult::Local(raw), statement.kind()),
        Err(err) => {
            warn!("[SQL_LOCAL] statement failed, rolling back: {}", err);
            if let Err(rollback_err) = rollback_open(connection) {
                warn!("[SQL_LOCAL] rollback failed: {}", rollback_err);
            }
            Err(ClientError::engine(err))
        }
    }
}

#[async_trait]
impl Executor for LocalExecutor {
    fn backend(&self) -> Backend {
        Backend::Local
    }

    fn atomicity(&self) -> Atomicity {
        Atomicity::AllOrNothing
    }

    async fn execute(&self, statement: &Statement) -> Result<ResultSet> {
        let guard = self.connection.lock().await;
        execute_on(open_connection(&guard)?, statement)
    }

    async fn begin(&self) -> Result<Box<dyn UnitOfWork>> {
        let guard = self.connection.clone().lock_owned().await;
        let connection = open_connection(&guard)?;
        debug!("[SQL_LOCAL] BEGIN");
        connection
            .execute_batch("BEGIN TRANSACTION")
            .map_err(ClientError::engine)?;
        Ok(Box::new(LocalTransaction { guard }))
    }

    async fn close(&self) -> Result<()> {
        let mut guard = self.connection.lock().await;
        if let Some(connection) = guard.take() {
            connection
                .close()
                .map_err(|(_, err)| ClientError::engine(err))?;
            info!("[SQL_LOCAL] closed database at {}", self.path.display());
        }
        Ok(())
    }
}

/// A `BEGIN`..`COMMIT` span holding the connection lock throughout.
struct LocalTransaction {
    guard: OwnedMutexGuard<Option<Connection>>,
}

#[async_trait]
impl UnitOfWork for LocalTransaction {
    async fn execute(&mut self, statement: &Statement) -> Result<ResultSet> {
        execute_on(open_connection(&self.guard)?, statement)
    }

    async fn commit(&mut self) -> Result<()> {
        let connection = open_connection(&self.guard)?;
        if connection.is_autocommit() {
            return Err(ClientError::Query {
                status: None,
                message: "nothing to commit: the transaction was already rolled back".into(),
                source: None,
            });
        }
        debug!("[SQL_LOCAL] COMMIT");
        connection.execute_batch("COMMIT").map_err(|err| {
            if let Err(rollback_err) = rollback_open(connection) {
                warn!("[SQL_LOCAL] rollback after failed commit: {}", rollback_err);
            }
            ClientError::engine(err)
        })
    }

    async fn rollback(&mut self) -> Result<()> {
        debug!("[SQL_LOCAL] ROLLBACK");
        rollback_open(open_connection(&self.guard)?).map_err(ClientError::engine)
    }
}

impl Drop for LocalTransaction {
    fn drop(&mut self) {
        let Some(connection) = self.guard.as_ref() else {
            return;
        };
        if connection.is_autocommit() {
            return;
        }
        warn!("[SQL_LOCAL] transaction released unfinished, rolling back");
        if let Err(err) = connection.execute_batch("ROLLBACK") {
            warn!("[SQL_LOCAL] rollback on release failed: {}", err);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn executor() -> LocalExecutor {
        LocalExecutor::open(":memory:").unwrap()
    }

    async fn count(exec: &LocalExecutor) -> i64 {
        exec.execute(&Statement::new("SELECT COUNT(*) AS n FROM t"))
            .await
            .unwrap()
            .into_rows()
            .unwrap()
            .rows[0]
            .i64("n")
            .unwrap()
    }

    #[tokio::test]
    async fn returning_rows_survive_on_writes() {
        let exec = executor();
        exec.execute(&Statement::new("CREATE TABLE t (id INTEGER PRIMARY KEY, v TEXT)"))
            .await
            .unwrap();
        let outcome = exec
            .execute(&Statement::new("INSERT INTO t (v) VALUES (?) RETURNING id, v").bind("a"))
            .await
            .unwrap()
            .into_write()
            .unwrap();
        assert_eq!(outcome.last_insert_id, Some(1));
        assert_eq!(outcome.rows_affected, 1);
        assert_eq!(outcome.returned[0].text("v").unwrap(), "a");
    }

    #[tokio::test]
    async fn updates_report_no_insert_id() {
        let exec = executor();
        exec.execute(&Statement::new("CREATE TABLE t (id INTEGER PRIMARY KEY, v INTEGER)"))
            .await
            .unwrap();
        exec.execute(&Statement::new("INSERT INTO t (v) VALUES (1), (2)"))
            .await
            .unwrap();
        let result = exec
            .execute(&Statement::new("UPDATE t SET v = v + 1"))
            .await
            .unwrap();
        assert_eq!(result.rows_affected(), 2);
        assert_eq!(result.last_insert_id(), None);
    }

    #[tokio::test]
    async fn ddl_after_insert_reports_no_changes() {
        let exec = executor();
        exec.execute(&Statement::new("CREATE TABLE t (v INTEGER)"))
            .await
            .unwrap();
        exec.execute(&Statement::new("INSERT INTO t VALUES (1)"))
            .await
            .unwrap();
        let created = exec
            .execute(&Statement::new("CREATE TABLE u (v INTEGER)"))
            .await
            .unwrap();
        assert_eq!(created.rows_affected(), 0);
        assert_eq!(created.last_insert_id(), None);
    }

    #[tokio::test]
    async fn booleans_bind_as_integers() {
        let exec = executor();
        let rows = exec
            .execute(&Statement::new("SELECT ? AS flag").bind(true))
            .await
            .unwrap()
            .into_rows()
            .unwrap();
        assert_eq!(rows.rows[0].get("flag"), Some(&Value::Integer(1)));
    }

    #[tokio::test]
    async fn commit_after_fault_is_a_query_error() {
        let exec = executor();
        let mut tx = exec.begin().await.unwrap();
        assert!(tx.execute(&Statement::new("SELECT * FROM missing")).await.is_err());
        match tx.commit().await {
            Err(ClientError::Query { message, .. }) => {
                assert!(message.contains("already rolled back"), "{message}")
            }
            other => panic!("unexpected commit outcome: {other:?}"),
        }
        tx.rollback().await.unwrap();
    }

    #[tokio::test]
    async fn dropped_transaction_is_rolled_back() {
        let exec = executor();
        exec.execute(&Statement::new("CREATE TABLE t (v INTEGER)"))
            .await
            .unwrap();

        let mut tx = exec.begin().await.unwrap();
        tx.execute(&Statement::new("INSERT INTO t VALUES (1)"))
            .await
            .unwrap();
        drop(tx);

        assert_eq!(count(&exec).await, 0);
        // Back in autocommit: a fresh transaction can start and commit.
        let mut tx = exec.begin().await.unwrap();
        tx.execute(&Statement::new("INSERT INTO t VALUES (2)"))
            .await
            .unwrap();
        tx.commit().await.unwrap();
        drop(tx);
        assert_eq!(count(&exec).await, 1);
    }
}
