//! Multi-statement units of work.
//!
//! The same calls behave differently per backend, and the difference is part
//! of the contract:
//!
//! - local: a batch or transaction is all-or-nothing (`BEGIN` .. `COMMIT`, any
//!   fault rolls back everything);
//! - remote: statements are sent one at a time and each commits on arrival.
//!   A fault stops the sequence but statements already sent stay applied, and
//!   nothing compensates for them.
//!
//! Check [`Orchestrator::supports_atomic_batch`] before relying on rollback.

use crate::error::Result;
use crate::executor::{Atomicity, Backend, Executor, UnitOfWork};
use crate::result::ResultSet;
use crate::statement::Statement;
use log::{debug, warn};
use std::sync::Arc;

#[derive(Clone)]
pub struct Orchestrator {
    executor: Arc<dyn Executor>,
}

impl Orchestrator {
    pub fn new(executor: Arc<dyn Executor>) -> Self {
        Self { executor }
    }

    pub fn backend(&self) -> Backend {
        self.executor.backend()
    }

    pub fn atomicity(&self) -> Atomicity {
        self.executor.atomicity()
    }

    /// True when a failed batch leaves no trace.
    pub fn supports_atomic_batch(&self) -> bool {
        self.atomicity() == Atomicity::AllOrNothing
    }

    pub async fn execute(&self, statement: &Statement) -> Result<ResultSet> {
        self.executor.execute(statement).await
    }

    /// Run `statements` in order as one unit. Returns one result per
    /// statement, or the first error; never a partial result list.
    pub async fn execute_batch(&self, statements: &[Statement]) -> Result<Vec<ResultSet>> {
        debug!(
            "[SQL_BATCH] {} statements, atomicity={:?}",
            statements.len(),
            self.atomicity()
        );
        let mut tx = self.begin().await?;
        let mut results = Vec::with_capacity(statements.len());
        for (index, statement) in statements.iter().enumerate() {
            match tx.execute(statement).await {
                Ok(result) => results.push(result),
                Err(err) => {
                    warn!("[SQL_BATCH] statement {} failed: {}", index, err);
                    tx.rollback().await;
                    return Err(err);
                }
            }
        }
        tx.commit().await?;
        Ok(results)
    }

    /// Open a unit of work. Finish it with [`Transaction::commit`] or
    /// [`Transaction::rollback`]; dropping it unfinished rolls back what the
    /// backend can undo.
    ///
    /// On the local backend the transaction holds the connection until it
    /// finishes: other calls through this orchestrator or its clones wait for
    /// it, so do not issue them from the task holding the transaction.
    pub async fn begin(&self) -> Result<Transaction> {
        let unit = self.executor.begin().await?;
        Ok(Transaction {
            unit,
            finished: false,
        })
    }

    pub async fn close(&self) -> Result<()> {
        self.executor.close().await
    }
}

/// An open unit of work. Only all-or-nothing on backends that support it.
pub struct Transaction {
    unit: Box<dyn UnitOfWork>,
    finished: bool,
}

impl Transaction {
    pub async fn execute(&mut self, statement: &Statement) -> Result<ResultSet> {
        self.unit.execute(statement).await
    }

    pub async fn commit(mut self) -> Result<()> {
        self.finished = true;
        self.unit.commit().await
    }

    /// Undo what the backend can undo. Rollback failures are logged, not
    /// returned.
    pub async fn rollback(mut self) {
        self.finished = true;
        if let Err(err) = self.unit.rollback().await {
            warn!("[SQL_BATCH] rollback failed: {}", err);
        }
    }
}

impl Drop for Transaction {
    fn drop(&mut self) {
        if !self.finished {
            warn!("[SQL_BATCH] transaction dropped without commit or rollback");
        }
    }
}
