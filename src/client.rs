//! The entry point: resolve a target once, then run statements against it.

use crate::batch::Orchestrator;
use crate::config::ClientConfig;
use crate::error::Result;
use crate::executor::{Atomicity, Backend};
use crate::remote::DEFAULT_REQUEST_TIMEOUT;
use crate::result::ResultSet;
use crate::router::{resolve, ConnectionTarget};
use crate::shop::ShopStore;
use crate::statement::Statement;
use std::time::Duration;

/// A client bound to one backend for its whole lifetime.
///
/// Clones share the backend. On the local backend an open transaction
/// excludes every other clone until it finishes.
///
/// # Examples
///
/// ```rust,no_run
/// use rust_sqlclient::{ClientConfig, DatabaseClient, Statement};
///
/// # async fn example() -> rust_sqlclient::Result<()> {
/// let client = DatabaseClient::connect(&ClientConfig::from_env())?;
/// let rows = client
///     .execute(&Statement::new("SELECT * FROM products WHERE id = ?").bind(1))
///     .await?
///     .into_rows()?;
/// println!("{} rows", rows.rows.len());
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct DatabaseClient {
    target: ConnectionTarget,
    orchestrator: Orchestrator,
}

impl DatabaseClient {
    pub fn connect(config: &ClientConfig) -> Result<Self> {
        let target = resolve(config)?;
        Self::open_with_timeout(target, config.request_timeout)
    }

    /// Shorthand for `connect(&ClientConfig::from_env())`.
    pub fn from_env() -> Result<Self> {
        Self::connect(&ClientConfig::from_env())
    }

    /// Use an already resolved target, bypassing URL classification.
    pub fn open(target: ConnectionTarget) -> Result<Self> {
        Self::open_with_timeout(target, DEFAULT_REQUEST_TIMEOUT)
    }

    pub fn open_with_timeout(target: ConnectionTarget, request_timeout: Duration) -> Result<Self> {
        let executor = target.connect(request_timeout)?;
        Ok(Self {
            target,
            orchestrator: Orchestrator::new(executor),
        })
    }

    pub fn target(&self) -> &ConnectionTarget {
        &self.target
    }

    pub fn is_remote(&self) -> bool {
        self.orchestrator.backend() == Backend::Remote
    }

    pub fn atomicity(&self) -> Atomicity {
        self.orchestrator.atomicity()
    }

    /// True on the local backend only. See [`crate::batch`].
    pub fn supports_atomic_batch(&self) -> bool {
        self.orchestrator.supports_atomic_batch()
    }

    pub async fn execute(&self, statement: &Statement) -> Result<ResultSet> {
        self.orchestrator.execute(statement).await
    }

    pub async fn execute_batch(&self, statements: &[Statement]) -> Result<Vec<ResultSet>> {
        self.orchestrator.execute_batch(statements).await
    }

    pub fn orchestrator(&self) -> &Orchestrator {
        &self.orchestrator
    }

    pub fn shop(&self) -> ShopStore {
        ShopStore::new(self.orchestrator.clone())
    }

    /// Release the local connection. Clones of this client share it, so they
    /// are closed too.
    pub async fn close(&self) -> Result<()> {
        self.orchestrator.close().await
    }
}
