// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Transport capability set.
//!
//! Anything that can open a session and answer key, prefix and root requests
//! with proof material can sit under the verified reader. Nothing returned
//! here is trusted; verification happens one layer up.

pub mod memory;
pub mod retry;

use crate::config::ConnectionConfig;
use crate::error::LedgerError;
use crate::types::{ProvenEntry, Root};

pub use memory::MemoryLedger;
pub use retry::with_retry;

/// Opens sessions against a ledger.
pub trait Connector {
    type Session: LedgerSession;

    /// Authenticates and selects `config.database`. Transient failures are
    /// retried per `config.retry` within `config.timeout`.
    fn open(&self, config: &ConnectionConfig) -> Result<Self::Session, LedgerError>;
}

/// An authenticated session. Performs network I/O only, no caching.
pub trait LedgerSession {
    /// Lazy, finite, non-restartable sequence of scan results in ascending
    /// key order. Pages are fetched on demand.
    type Scan: Iterator<Item = Result<ProvenEntry, LedgerError>>;

    /// Latest value of `key` with its proof. Absent keys yield
    /// `LedgerError::NotFound`.
    fn fetch_by_key(&mut self, key: &[u8]) -> Result<ProvenEntry, LedgerError>;

    /// Latest value of every key starting with `prefix` (empty = all keys).
    fn fetch_by_prefix(&mut self, prefix: &[u8]) -> Result<Self::Scan, LedgerError>;

    fn fetch_current_root(&mut self) -> Result<Root, LedgerError>;
}
