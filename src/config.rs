// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Connection configuration.

use std::fmt;
use std::time::Duration;

use crate::error::ConfigError;

/// Port the ledger listens on when the address omits one.
pub const DEFAULT_PORT: u16 = 3322;
pub const DEFAULT_DATABASE: &str = "defaultdb";
pub const DEFAULT_USERNAME: &str = "immudb";
pub const DEFAULT_PASSWORD: &str = "immudb";
/// Entries requested per scan page. Bounds scan memory.
pub const DEFAULT_PAGE_SIZE: usize = 100;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerAddress {
    pub host: String,
    pub port: u16,
}

impl LedgerAddress {
    /// Accepts `host`, `host:port` or `scheme://host:port`. IPv6 hosts are
    /// bracketed.
    pub fn parse(raw: &str) -> Result<Self, ConfigError> {
        let trimmed = raw.trim();
        let without_scheme = match trimmed.split_once("://") {
            Some((_, rest)) => rest,
            None => trimmed,
        };
        let without_scheme = without_scheme.trim_end_matches('/');

        if without_scheme.is_empty() {
            return Err(ConfigError::InvalidAddress(raw.to_string()));
        }

        let bad = || ConfigError::InvalidAddress(raw.to_string());

        // IPv6 literals must be bracketed: `[::1]` or `[::1]:3322`
        let (host, port) = if let Some(rest) = without_scheme.strip_prefix('[') {
            let (host, after) = rest.split_once(']').ok_or_else(bad)?;
            if host.is_empty() || !host.contains(':') {
                return Err(bad());
            }
            match after {
                "" => (host, None),
                _ => (host, Some(after.strip_prefix(':').ok_or_else(bad)?)),
            }
        } else {
            match without_scheme.split_once(':') {
                Some((host, port)) => (host, Some(port)),
                None => (without_scheme, None),
            }
        };

        if host.is_empty() {
            return Err(bad());
        }
        let port = match port {
            Some(port) => port.parse::<u16>().map_err(|_| bad())?,
            None => DEFAULT_PORT,
        };
        Ok(Self { host: host.to_string(), port })
    }
}

impl fmt::Display for LedgerAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.host.contains(':') {
            write!(f, "[{}]:{}", self.host, self.port)
        } else {
            write!(f, "{}:{}", self.host, self.port)
        }
    }
}

impl Default for LedgerAddress {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: DEFAULT_PORT,
        }
    }
}

#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

impl Default for Credentials {
    fn default() -> Self {
        Self::new(DEFAULT_USERNAME, DEFAULT_PASSWORD)
    }
}

// Password never reaches logs.
impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Bounded exponential backoff for transient transport failures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
}

impl RetryPolicy {
    /// Delay before attempt `attempt + 1`, where `attempt` starts at 1.
    pub fn backoff(&self, attempt: u32) -> Duration {
        let factor = 1u32.checked_shl(attempt.saturating_sub(1)).unwrap_or(u32::MAX);
        self.initial_backoff
            .checked_mul(factor)
            .unwrap_or(self.max_backoff)
            .min(self.max_backoff)
    }

    /// Single attempt, no waiting. Handy in tests.
    pub fn no_retry() -> Self {
        Self {
            max_attempts: 1,
            initial_backoff: Duration::ZERO,
            max_backoff: Duration::ZERO,
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff: Duration::from_millis(100),
            max_backoff: Duration::from_secs(2),
        }
    }
}

/// Everything needed to open a session. Passed explicitly by the caller.
#[derive(Debug, Clone)]
pub struct ConnectionConfig {
    pub address: LedgerAddress,
    pub database: String,
    pub credentials: Credentials,
    /// Deadline applied to every transport call, retries included.
    pub timeout: Duration,
    pub retry: RetryPolicy,
    pub page_size: usize,
}

impl ConnectionConfig {
    pub fn new(address: LedgerAddress, database: impl Into<String>) -> Self {
        Self {
            address,
            database: database.into(),
            ..Default::default()
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.database.is_empty() {
            return Err(ConfigError::Invalid("database name is empty".to_string()));
        }
        if self.timeout.is_zero() {
            return Err(ConfigError::Invalid("timeout must be greater than zero".to_string()));
        }
        if self.page_size == 0 {
            return Err(ConfigError::Invalid("page size must be at least 1".to_string()));
        }
        if self.retry.max_attempts == 0 {
            return Err(ConfigError::Invalid("retry policy needs at least one attempt".to_string()));
        }
        Ok(())
    }
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            address: LedgerAddress::default(),
            database: DEFAULT_DATABASE.to_string(),
            credentials: Credentials::default(),
            timeout: Duration::from_secs(10),
            retry: RetryPolicy::default(),
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}
