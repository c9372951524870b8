// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Error types.

use thiserror::Error;

/// Failures raised by a ledger transport.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    /// Transient failure (unreachable, timed out, 5xx). Retried by the transport.
    #[error("ledger unavailable: {0}")]
    Unavailable(String),

    /// Connection could not be established or was rejected.
    #[error("connection failed after {attempts} attempt(s): {reason}")]
    Connection { attempts: u32, reason: String },

    /// The server answered with something we cannot decode. Never retried.
    #[error("malformed ledger response: {0}")]
    Protocol(String),

    #[error("key not found: {0}")]
    NotFound(String),
}

impl LedgerError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, LedgerError::Unavailable(_))
    }
}

/// Failures raised by the verified read path.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ReadError {
    #[error(transparent)]
    Transport(#[from] LedgerError),

    #[error("inclusion proof for key {key} (tx {transaction_id}) does not reconstruct the claimed root")]
    VerificationFailed { key: String, transaction_id: u64 },

    #[error("rollback detected: server reported tx {observed} after tx {stored} was verified")]
    RollbackDetected { stored: u64, observed: u64 },

    #[error("fork detected: two different roots reported for tx {transaction_id}")]
    ForkDetected { transaction_id: u64 },

    #[error("read cancelled")]
    Cancelled,
}

impl ReadError {
    /// True when the failure points at a compromised or misbehaving ledger
    /// rather than plain unavailability.
    pub fn is_integrity_violation(&self) -> bool {
        matches!(
            self,
            ReadError::VerificationFailed { .. }
                | ReadError::RollbackDetected { .. }
                | ReadError::ForkDetected { .. }
        )
    }

    /// Terminal errors poison the reader; the caller must reconnect.
    pub fn is_terminal(&self) -> bool {
        matches!(self, ReadError::RollbackDetected { .. } | ReadError::ForkDetected { .. })
    }
}

/// Failure while streaming entries into an export sink.
///
/// `exported` is the number of records that reached the sink before the
/// failure, i.e. the resumption point.
#[derive(Error, Debug)]
pub enum ExportError {
    #[error("export sink failed after {exported} record(s): {source}")]
    Sink {
        exported: u64,
        #[source]
        source: std::io::Error,
    },

    #[error("export aborted after {exported} record(s): {source}")]
    Read {
        exported: u64,
        #[source]
        source: ReadError,
    },
}

impl ExportError {
    pub fn exported(&self) -> u64 {
        match self {
            ExportError::Sink { exported, .. } | ExportError::Read { exported, .. } => *exported,
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid ledger address {0:?}")]
    InvalidAddress(String),
    #[error("invalid setting: {0}")]
    Invalid(String),
}
