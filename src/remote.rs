//! Executor over the stateless HTTP query endpoint.
//!
//! Every statement is one `POST <endpoint>/execute` round trip. The endpoint
//! keeps no session between calls, so there is no transaction spanning
//! statements: a unit of work is a plain pass-through whose `commit` and
//! `rollback` do nothing, and a failure leaves earlier statements applied.
//! No retries are attempted.

use crate::error::{ClientError, Result};
use crate::executor::{Atomicity, Backend, Executor, UnitOfWork};
use crate::result::{normalize, RawResult, ResultSet};
use crate::statement::Statement;
use crate::value::{encode, WireParam};
use async_trait::async_trait;
use log::{debug, warn};
use serde::Serialize;
use std::fmt::Display;
use std::time::{Duration, Instant};

/// Per-request timeout used when none is configured.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Serialize)]
struct ExecuteRequest<'a> {
    stmt: &'a str,
    params: Vec<WireParam>,
}

#[derive(Clone)]
pub struct RemoteExecutor {
    endpoint: String,
    auth_token: Option<String>,
    http_client: reqwest::Client,
}

impl RemoteExecutor {
    pub fn new(endpoint: &str, auth_token: Option<String>, timeout: Duration) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ClientError::configuration(format!("cannot build http client: {}", e)))?;
        Ok(Self {
            endpoint: http_base(endpoint),
            auth_token,
            http_client,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

/// Body of a rejected call, or a note saying why it could not be read.
fn rejection_body<E: Display>(read: std::result::Result<String, E>) -> String {
    read.unwrap_or_else(|err| format!("<response body unreadable: {}>", err))
}

/// `libsql://` addresses are served over HTTPS; trailing slashes are dropped so
/// the `/execute` suffix joins cleanly.
fn http_base(endpoint: &str) -> String {
    let base = match endpoint.strip_prefix("libsql://") {
        Some(rest) => format!("https://{}", rest),
        None => endpoint.to_string(),
    };
    base.trim_end_matches('/').to_string()
}

#[async_trait]
impl Executor for RemoteExecutor {
    fn backend(&self) -> Backend {
        Backend::Remote
    }

    fn atomicity(&self) -> Atomicity {
        Atomicity::Sequential
    }

    async fn execute(&self, statement: &Statement) -> Result<ResultSet> {
        let request = ExecuteRequest {
            stmt: &statement.text,
            params: statement.params.iter().map(encode).collect(),
        };
        let url = format!("{}/execute", self.endpoint);
        let mut builder = self.http_client.post(&url).json(&request);
        if let Some(token) = &self.auth_token {
            builder = builder.bearer_auth(token);
        }

        debug!("[SQL_REMOTE] POST {} stmt=\"{}\"", url, statement.preview());
        let started = Instant::now();
        let response = builder.send().await.map_err(|e| {
            warn!("[SQL_REMOTE] transport error: {}", e);
            ClientError::transport(e)
        })?;

        let status = response.status();
        debug!(
            "[SQL_REMOTE] status={} duration_ms={}",
            status,
            started.elapsed().as_millis()
        );
        if !status.is_success() {
            let body = rejection_body(response.text().await);
            warn!("[SQL_REMOTE] endpoint rejected statement: {} {}", status, body);
            return Err(ClientError::http_status(status.as_u16(), body));
        }

        let body: serde_json::Value = response
            .json()
            .await
            .map_err(|e| ClientError::protocol(format!("unreadable response body: {}", e)))?;
        normalize(RawResult::Remote(body), statement.kind())
    }

    async fn begin(&self) -> Result<Box<dyn UnitOfWork>> {
        debug!("[SQL_REMOTE] begin: no cross-statement transaction on this backend");
        Ok(Box::new(RemoteSequence {
            executor: self.clone(),
        }))
    }
}

/// Statements sent one by one, each applied on arrival.
struct RemoteSequence {
    executor: RemoteExecutor,
}

#[async_trait]
impl UnitOfWork for RemoteSequence {
    async fn execute(&mut self, statement: &Statement) -> Result<ResultSet> {
        self.executor.execute(statement).await
    }

    async fn commit(&mut self) -> Result<()> {
        Ok(())
    }

    async fn rollback(&mut self) -> Result<()> {
        debug!("[SQL_REMOTE] rollback requested; statements already sent stay applied");
        Ok(())
    }
}
