//! Client configuration.
//!
//! | Variable       | Meaning                                        |
//! |----------------|------------------------------------------------|
//! | `DATABASE_URL` | Full endpoint URL or `file:` path              |
//! | `AUTH_TOKEN`   | Bearer token for the remote endpoint           |
//! | `DB_NAME`      | Hosted database name, combined with the token  |
//!
//! Explicit builder values win over the environment. Empty variables count as
//! unset.

use crate::remote::DEFAULT_REQUEST_TIMEOUT;
use std::time::Duration;

pub const DEFAULT_LOCAL_PATH: &str = "shop.db";

pub const ENV_DATABASE_URL: &str = "DATABASE_URL";
pub const ENV_AUTH_TOKEN: &str = "AUTH_TOKEN";
pub const ENV_DB_NAME: &str = "DB_NAME";

#[derive(Debug, Clone, PartialEq)]
pub struct ClientConfig {
    pub database_url: Option<String>,
    pub auth_token: Option<String>,
    pub db_name: Option<String>,
    /// Used when no remote target is configured.
    pub local_path: String,
    /// Applied to each remote request separately.
    pub request_timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            database_url: None,
            auth_token: None,
            db_name: None,
            local_path: DEFAULT_LOCAL_PATH.to_string(),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }
}

impl ClientConfig {
    /// Configuration with no environment fallback.
    pub fn new() -> Self {
        Self::default()
    }

    /// Configuration seeded from the process environment.
    pub fn from_env() -> Self {
        Self::from_vars(|key| std::env::var(key).ok())
    }

    /// Configuration seeded from an arbitrary variable lookup.
    pub fn from_vars(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        Self {
            database_url: var(ENV_DATABASE_URL),
            auth_token: var(ENV_AUTH_TOKEN),
            db_name: var(ENV_DB_NAME),
            ..Self::default()
        }
    }

    pub fn with_database_url(mut self, url: impl Into<String>) -> Self {
        self.database_url = Some(url.into());
        self
    }

    pub fn with_auth_token(mut self, token: impl Into<String>) -> Self {
        self.auth_token = Some(token.into());
        self
    }

    pub fn with_db_name(mut self, name: impl Into<String>) -> Self {
        self.db_name = Some(name.into());
        self
    }

    pub fn with_local_path(mut self, path: impl Into<String>) -> Self {
        self.local_path = path.into();
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }
}
