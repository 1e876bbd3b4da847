//! One query/transaction API over two SQL backends.
//!
//! # Intention
//!
//! - Route every statement either to a hosted database's HTTP `/execute`
//!   endpoint or to a local SQLite file, chosen once from configuration.
//! - Hand callers the same result shape from both backends.
//! - Be explicit about what a multi-statement unit guarantees on each backend.
//!   Locally it is a real transaction. Remotely it is a sequence of independent
//!   calls.
//!
//! # Architectural Boundaries
//!
//! - No SQL parsing, planning or storage: both engines are used as they are.
//! - No retries or background work; the caller owns retry policy.
//! - Shop operations (`shop`) are the only business logic here.
//!
//! # Concurrency
//!
//! The local connection is a single-owner resource behind an async mutex.
//! Plain calls take it per statement; a transaction takes it until it
//! finishes, so clones of a client never see each other's uncommitted work
//! and never write into each other's transactions. A task must not use the
//! client directly while it holds a transaction, or it waits on itself. The
//! remote backend holds no shared mutable state.

pub mod batch;
pub mod client;
pub mod config;
pub mod error;
pub mod executor;
pub mod local;
pub mod remote;
pub mod result;
pub mod router;
pub mod schema;
pub mod shop;
pub mod statement;
pub mod value;

pub use batch::{Orchestrator, Transaction};
pub use client::DatabaseClient;
pub use config::ClientConfig;
pub use error::{ClientError, Result};
pub use executor::{Atomicity, Backend, Executor, UnitOfWork};
pub use result::{ResultSet, Row, Rows, WriteOutcome};
pub use router::ConnectionTarget;
pub use shop::{NewOrderItem, NewProduct, Order, OrderItem, Product, ShopStore};
pub use statement::{Statement, StatementKind};
pub use value::{encode, Value, WireParam, WireType};
