//! Connection target resolution and executor construction.
//!
//! Resolution runs once per client. Precedence: an explicit URL, then a
//! database name paired with a token, then the local path. A default local
//! path always exists, so resolution only fails on an unclassifiable URL or a
//! blank local path.

use crate::config::ClientConfig;
use crate::error::{ClientError, Result};
use crate::executor::Executor;
use crate::local::LocalExecutor;
use crate::remote::RemoteExecutor;
use log::info;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

/// Substrings that mark a URL as a hosted remote database.
pub const REMOTE_HOST_MARKERS: &[&str] = &["turso.io", "libsql"];

#[derive(Clone, PartialEq, Eq)]
pub enum ConnectionTarget {
    Remote {
        endpoint: String,
        auth_token: Option<String>,
    },
    Local {
        path: PathBuf,
    },
}

impl ConnectionTarget {
    pub fn remote(endpoint: impl Into<String>, auth_token: Option<String>) -> Self {
        Self::Remote {
            endpoint: endpoint.into(),
            auth_token,
        }
    }

    pub fn local(path: impl Into<PathBuf>) -> Self {
        Self::Local { path: path.into() }
    }

    pub fn is_remote(&self) -> bool {
        matches!(self, Self::Remote { .. })
    }

    /// Build the executor for this target. Local targets open their
    /// connection here and hold it until closed.
    pub fn connect(&self, request_timeout: Duration) -> Result<Arc<dyn Executor>> {
        info!("[SQL_ROUTER] connecting to {:?}", self);
        let executor: Arc<dyn Executor> = match self {
            Self::Remote {
                endpoint,
                auth_token,
            } => Arc::new(RemoteExecutor::new(
                endpoint,
                auth_token.clone(),
                request_timeout,
            )?),
            Self::Local { path } => Arc::new(LocalExecutor::open(path)?),
        };
        Ok(executor)
    }
}

impl fmt::Debug for ConnectionTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Remote {
                endpoint,
                auth_token,
            } => f
                .debug_struct("Remote")
                .field("endpoint", endpoint)
                .field("auth_token", &auth_token.as_ref().map(|_| "<redacted>"))
                .finish(),
            Self::Local { path } => f.debug_struct("Local").field("path", path).finish(),
        }
    }
}

pub fn is_remote_url(url: &str) -> bool {
    REMOTE_HOST_MARKERS.iter().any(|marker| url.contains(marker))
}

/// Pick the single target this client will use.
pub fn resolve(config: &ClientConfig) -> Result<ConnectionTarget> {
    if let Some(url) = config.database_url.as_deref() {
        return classify_url(url, config.auth_token.clone());
    }

    if let (Some(name), Some(token)) = (config.db_name.as_deref(), config.auth_token.as_deref()) {
        return Ok(ConnectionTarget::remote(
            format!("https://{}.turso.io", name),
            Some(token.to_string()),
        ));
    }

    if config.local_path.trim().is_empty() {
        return Err(ClientError::configuration(
            "no remote credentials and no local database path",
        ));
    }
    Ok(ConnectionTarget::local(&config.local_path))
}

fn classify_url(url: &str, auth_token: Option<String>) -> Result<ConnectionTarget> {
    if is_remote_url(url) {
        return Ok(ConnectionTarget::remote(url, auth_token));
    }

    let path = match url.strip_prefix("file:") {
        Some(path) => path,
        None if !url.contains("://") => url,
        None => {
            return Err(ClientError::configuration(format!(
                "`{}` is neither a known remote host nor a file path",
                url
            )))
        }
    };
    if path.trim().is_empty() {
        return Err(ClientError::configuration(format!("`{}` names no file", url)));
    }
    Ok(ConnectionTarget::local(path))
}
