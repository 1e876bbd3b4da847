//! The execution capability shared by both backends.

use crate::error::Result;
use crate::result::ResultSet;
use crate::statement::Statement;
use async_trait::async_trait;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backend {
    Local,
    Remote,
}

/// What a multi-statement unit guarantees when one of its statements fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Atomicity {
    /// All statements apply or none do.
    AllOrNothing,
    /// Statements apply one by one; those before a failure stay applied.
    Sequential,
}

/// Runs statements against one backend.
#[async_trait]
pub trait Executor: Send + Sync {
    fn backend(&self) -> Backend;

    fn atomicity(&self) -> Atomicity;

    async fn execute(&self, statement: &Statement) -> Result<ResultSet>;

    /// Open a unit of work. The handle holds whatever the backend needs
    /// until the unit finishes. Backends without cross-statement
    /// transactions hand out a plain pass-through and report
    /// [`Atomicity::Sequential`].
    async fn begin(&self) -> Result<Box<dyn UnitOfWork>>;

    /// Release held resources. Later calls fail with a configuration error.
    async fn close(&self) -> Result<()> {
        Ok(())
    }
}

/// An open unit of work on one backend.
///
/// Dropping a unit that was neither committed nor rolled back undoes
/// whatever the backend can undo.
#[async_trait]
pub trait UnitOfWork: Send {
    async fn execute(&mut self, statement: &Statement) -> Result<ResultSet>;

    async fn commit(&mut self) -> Result<()>;

    /// Must succeed when there is nothing left to roll back.
    async fn rollback(&mut self) -> Result<()>;
}
