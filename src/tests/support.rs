// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Shared fixtures.

use std::collections::VecDeque;

use crate::config::ConnectionConfig;
use crate::error::LedgerError;
use crate::reader::VerifiedReader;
use crate::transport::memory::MemorySession;
use crate::transport::{Connector, LedgerSession, MemoryLedger};
use crate::types::{ProvenEntry, Root};

pub fn ledger_with(pairs: &[(&str, &str)]) -> MemoryLedger {
    let ledger = MemoryLedger::new("defaultdb");
    for (k, v) in pairs {
        ledger.set(*k, *v);
    }
    ledger
}

pub fn reader_for(ledger: &MemoryLedger) -> VerifiedReader<MemorySession> {
    VerifiedReader::open(ledger.open(&ConnectionConfig::default()).unwrap())
}

/// Session that replays canned answers, for server behavior a real ledger
/// would never produce.
#[derive(Default)]
pub struct ScriptedSession {
    pub scans: VecDeque<Vec<Result<ProvenEntry, LedgerError>>>,
    pub keys: VecDeque<Result<ProvenEntry, LedgerError>>,
    pub roots: VecDeque<Root>,
}

impl LedgerSession for ScriptedSession {
    type Scan = std::vec::IntoIter<Result<ProvenEntry, LedgerError>>;

    fn fetch_by_key(&mut self, _key: &[u8]) -> Result<ProvenEntry, LedgerError> {
        self.keys
            .pop_front()
            .unwrap_or_else(|| Err(LedgerError::Protocol("script exhausted".into())))
    }

    fn fetch_by_prefix(&mut self, _prefix: &[u8]) -> Result<Self::Scan, LedgerError> {
        Ok(self.scans.pop_front().unwrap_or_default().into_iter())
    }

    fn fetch_current_root(&mut self) -> Result<Root, LedgerError> {
        self.roots
            .pop_front()
            .ok_or_else(|| LedgerError::Protocol("script exhausted".into()))
    }
}
