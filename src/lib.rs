// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.

//! ledgerscope: a verified read path over a tamper-evident key-value ledger.
//!
//! Entries are fetched together with Merkle inclusion proofs, every proof is
//! checked locally, and the last verified root is tracked so that a server
//! rolling back or forking its history is caught instead of trusted.

pub mod config;
pub mod error;
pub mod types;
pub mod hash;
pub mod merkle;
pub mod proof;
pub mod state;
pub mod transport;
pub mod reader;
pub mod filter;
pub mod export;
pub mod stats;
pub mod worker;

pub use config::{ConnectionConfig, Credentials, LedgerAddress, RetryPolicy};
pub use error::{ExportError, LedgerError, ReadError};
pub use reader::{CancelToken, VerifiedReader};
pub use transport::{Connector, LedgerSession};
pub use types::{Entry, InclusionProof, ProvenEntry, Root};

#[cfg(test)]
pub mod tests;
