// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! In-process ledger.
//!
//! Commits every write as one transaction into a `MerkleLog` and answers the
//! transport capability set with real proofs. Fault injection covers the
//! failure modes the verified reader has to catch: serving an older state
//! (rollback), serving a value that no longer matches its leaf (tampering),
//! and refusing connections.

use std::collections::{BTreeMap, VecDeque};
use std::ops::Bound;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::config::{ConnectionConfig, Credentials, RetryPolicy};
use crate::error::LedgerError;
use crate::hash::leaf_digest;
use crate::merkle::MerkleLog;
use crate::transport::{with_retry, Connector, LedgerSession};
use crate::types::{render_bytes, Entry, ProvenEntry, Root};

#[derive(Debug, Clone)]
pub struct MemoryLedger {
    inner: Arc<RwLock<LedgerInner>>,
}

#[derive(Debug)]
struct LedgerInner {
    database: String,
    credentials: Credentials,
    log: MerkleLog,
    /// Leaf index -> entry as stored. Tampering edits this, never the log.
    writes: Vec<Entry>,
    /// Key -> leaf indices of its writes, ascending.
    versions: BTreeMap<Vec<u8>, Vec<u64>>,
    /// Serve the ledger as of this transaction instead of the head.
    pinned: Option<u64>,
    failing_connects: u32,
    failing_fetches: u32,
    connect_attempts: u32,
    page_fetches: u32,
}

impl LedgerInner {
    fn served_size(&self) -> u64 {
        self.pinned.unwrap_or(self.log.len())
    }

    fn served_root(&self) -> Root {
        let size = self.served_size();
        Root::new(size, self.log.root_at(size).unwrap_or_else(|| self.log.root()))
    }

    /// Latest write of `key` inside the served tree, with its proof.
    fn prove(&self, key: &[u8]) -> Option<ProvenEntry> {
        let size = self.served_size();
        let index = *self
            .versions
            .get(key)?
            .iter()
            .rev()
            .find(|&&index| index < size)?;

        Some(ProvenEntry {
            entry: self.writes[index as usize].clone(),
            proof: self.log.inclusion_proof(index, size)?,
            root: self.served_root(),
        })
    }

    fn take_fetch_failure(&mut self) -> Result<(), LedgerError> {
        if self.failing_fetches > 0 {
            self.failing_fetches -= 1;
            return Err(LedgerError::Unavailable("connection reset by peer".to_string()));
        }
        Ok(())
    }
}

impl MemoryLedger {
    /// Empty ledger serving `database` with the default credentials.
    pub fn new(database: impl Into<String>) -> Self {
        Self {
            inner: Arc::new(RwLock::new(LedgerInner {
                database: database.into(),
                credentials: Credentials::default(),
                log: MerkleLog::new(),
                writes: Vec::new(),
                versions: BTreeMap::new(),
                pinned: None,
                failing_connects: 0,
                failing_fetches: 0,
                connect_attempts: 0,
                page_fetches: 0,
            })),
        }
    }

    pub fn with_credentials(self, credentials: Credentials) -> Self {
        self.write().credentials = credentials;
        self
    }

    // A panicked writer cannot leave the ledger half-updated (appends are
    // the last step), so poisoning is recovered from.
    fn read(&self) -> RwLockReadGuard<'_, LedgerInner> {
        self.inner.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, LedgerInner> {
        self.inner.write().unwrap_or_else(|e| e.into_inner())
    }

    /// Commits one write as a new transaction and returns its id.
    pub fn set(&self, key: impl Into<Vec<u8>>, value: impl Into<Vec<u8>>) -> u64 {
        let mut inner = self.write();
        let key = key.into();
        let transaction_id = inner.log.len() + 1;
        let entry = Entry::new(key.clone(), value, transaction_id);

        let index = inner.log.append(leaf_digest(&entry));
        inner.writes.push(entry);
        inner.versions.entry(key).or_default().push(index);
        transaction_id
    }

    /// Root at the head of the log, ignoring any pin.
    pub fn head_root(&self) -> Root {
        let inner = self.read();
        Root::new(inner.log.len(), inner.log.root())
    }

    /// Serve the ledger as it was at `transaction_id` (rollback simulation).
    pub fn pin(&self, transaction_id: u64) {
        let mut inner = self.write();
        inner.pinned = Some(transaction_id.min(inner.log.len()));
    }

    pub fn unpin(&self) {
        self.write().pinned = None;
    }

    /// Replaces the stored value of the latest write of `key` without
    /// touching the Merkle log. Returns false if the key was never written.
    pub fn tamper(&self, key: &[u8], value: impl Into<Vec<u8>>) -> bool {
        let mut inner = self.write();
        let Some(index) = inner.versions.get(key).and_then(|v| v.last().copied()) else {
            return false;
        };
        inner.writes[index as usize].value = value.into();
        true
    }

    /// The next `n` connection attempts fail as unreachable.
    pub fn fail_next_connects(&self, n: u32) {
        self.write().failing_connects = n;
    }

    /// The next `n` fetches (key, root or scan page) fail as unreachable.
    pub fn fail_next_fetches(&self, n: u32) {
        self.write().failing_fetches = n;
    }

    pub fn connect_attempts(&self) -> u32 {
        self.read().connect_attempts
    }

    /// Number of scan pages served so far.
    pub fn page_fetches(&self) -> u32 {
        self.read().page_fetches
    }

    /// Serves one scan page: up to `limit` proven entries with keys starting
    /// with `prefix` and strictly after `after`. The second value is the
    /// cursor for the next page, `None` once the range is exhausted.
    ///
    /// Public so that gateways (and test servers) can front the ledger.
    pub fn scan_page(
        &self,
        prefix: &[u8],
        after: Option<&[u8]>,
        limit: usize,
    ) -> Result<(Vec<ProvenEntry>, Option<Vec<u8>>), LedgerError> {
        let mut inner = self.write();
        inner.take_fetch_failure()?;
        inner.page_fetches += 1;

        let lower = match after {
            Some(after) if after >= prefix => Bound::Excluded(after.to_vec()),
            _ => Bound::Included(prefix.to_vec()),
        };

        let mut page = Vec::new();
        let mut more = false;
        for (key, _) in inner
            .versions
            .range::<Vec<u8>, _>((lower, Bound::Unbounded))
            .take_while(|(key, _)| key.starts_with(prefix))
        {
            if page.len() == limit {
                more = true;
                break;
            }
            if let Some(proven) = inner.prove(key) {
                page.push(proven);
            }
        }

        let cursor = if more {
            page.last().map(|p: &ProvenEntry| p.entry.key.clone())
        } else {
            None
        };
        Ok((page, cursor))
    }

    pub fn fetch_key(&self, key: &[u8]) -> Result<ProvenEntry, LedgerError> {
        let mut inner = self.write();
        inner.take_fetch_failure()?;
        inner
            .prove(key)
            .ok_or_else(|| LedgerError::NotFound(render_bytes(key)))
    }

    pub fn fetch_root(&self) -> Result<Root, LedgerError> {
        let mut inner = self.write();
        inner.take_fetch_failure()?;
        Ok(inner.served_root())
    }

    /// Login check shared with gateways: counts the attempt, then applies
    /// injected failures, database selection and credentials.
    pub fn authenticate(&self, database: &str, credentials: &Credentials) -> Result<(), LedgerError> {
        let mut inner = self.write();
        inner.connect_attempts += 1;

        if inner.failing_connects > 0 {
            inner.failing_connects -= 1;
            return Err(LedgerError::Unavailable("connection refused".to_string()));
        }
        if inner.database != database {
            return Err(LedgerError::Connection {
                attempts: 1,
                reason: format!("database {:?} does not exist", database),
            });
        }
        if inner.credentials != *credentials {
            return Err(LedgerError::Connection {
                attempts: 1,
                reason: "authentication rejected".to_string(),
            });
        }
        Ok(())
    }
}

impl Connector for MemoryLedger {
    type Session = MemorySession;

    fn open(&self, config: &ConnectionConfig) -> Result<MemorySession, LedgerError> {
        with_retry(&config.retry, config.timeout, "open session", |_| {
            self.authenticate(&config.database, &config.credentials)
        })?;

        tracing::debug!("Opened in-memory session on {:?}", config.database);
        Ok(MemorySession {
            ledger: self.clone(),
            retry: config.retry.clone(),
            timeout: config.timeout,
            page_size: config.page_size.max(1),
        })
    }
}

#[derive(Debug)]
pub struct MemorySession {
    ledger: MemoryLedger,
    retry: RetryPolicy,
    timeout: std::time::Duration,
    page_size: usize,
}

impl LedgerSession for MemorySession {
    type Scan = MemoryScan;

    fn fetch_by_key(&mut self, key: &[u8]) -> Result<ProvenEntry, LedgerError> {
        with_retry(&self.retry, self.timeout, "fetch key", |_| self.ledger.fetch_key(key))
    }

    fn fetch_by_prefix(&mut self, prefix: &[u8]) -> Result<MemoryScan, LedgerError> {
        Ok(MemoryScan {
            ledger: self.ledger.clone(),
            retry: self.retry.clone(),
            timeout: self.timeout,
            page_size: self.page_size,
            prefix: prefix.to_vec(),
            cursor: None,
            buffered: VecDeque::new(),
            exhausted: false,
        })
    }

    fn fetch_current_root(&mut self) -> Result<Root, LedgerError> {
        with_retry(&self.retry, self.timeout, "fetch root", |_| self.ledger.fetch_root())
    }
}

/// Paged scan over a `MemoryLedger`. Holds at most one page in memory.
#[derive(Debug)]
pub struct MemoryScan {
    ledger: MemoryLedger,
    retry: RetryPolicy,
    timeout: std::time::Duration,
    page_size: usize,
    prefix: Vec<u8>,
    cursor: Option<Vec<u8>>,
    buffered: VecDeque<ProvenEntry>,
    exhausted: bool,
}

impl Iterator for MemoryScan {
    type Item = Result<ProvenEntry, LedgerError>;

    fn next(&mut self) -> Option<Self::Item> {
        if let Some(next) = self.buffered.pop_front() {
            return Some(Ok(next));
        }
        if self.exhausted {
            return None;
        }

        let page = with_retry(&self.retry, self.timeout, "fetch scan page", |_| {
            self.ledger
                .scan_page(&self.prefix, self.cursor.as_deref(), self.page_size)
        });

        match page {
            Ok((entries, cursor)) => {
                tracing::debug!("Scan page: {} entries, more: {}", entries.len(), cursor.is_some());
                self.exhausted = cursor.is_none();
                self.cursor = cursor;
                self.buffered = entries.into();
                self.buffered.pop_front().map(Ok)
            }
            Err(e) => {
                self.exhausted = true;
                Some(Err(e))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::proof::verify;

    fn open(ledger: &MemoryLedger) -> MemorySession {
        ledger.open(&ConnectionConfig::default()).unwrap()
    }

    #[test]
    fn test_writes_are_transactions() {
        let ledger = MemoryLedger::new("defaultdb");
        assert_eq!(ledger.set("a", "1"), 1);
        assert_eq!(ledger.set("b", "2"), 2);
        assert_eq!(ledger.set("a", "3"), 3);
        assert_eq!(ledger.head_root().transaction_id, 3);
    }

    #[test]
    fn test_fetch_by_key_returns_latest_version() {
        let ledger = MemoryLedger::new("defaultdb");
        ledger.set("a", "1");
        ledger.set("a", "2");
        let mut session = open(&ledger);

        let proven = session.fetch_by_key(b"a").unwrap();
        assert_eq!(proven.entry.value, b"2");
        assert!(verify(&proven.entry, &proven.proof, &proven.root));

        assert_eq!(
            session.fetch_by_key(b"missing"),
            Err(LedgerError::NotFound("missing".into()))
        );
    }

    #[test]
    fn test_scan_is_paged_and_ordered() {
        let ledger = MemoryLedger::new("defaultdb");
        for i in (0..25).rev() {
            ledger.set(format!("k{:02}", i), "v");
        }
        let config = ConnectionConfig { page_size: 10, ..Default::default() };
        let mut session = ledger.open(&config).unwrap();

        let keys: Vec<Vec<u8>> = session
            .fetch_by_prefix(b"")
            .unwrap()
            .map(|r| r.unwrap().entry.key)
            .collect();

        assert_eq!(keys.len(), 25);
        assert!(keys.windows(2).all(|w| w[0] < w[1]));
        assert_eq!(ledger.page_fetches(), 3);
    }

    #[test]
    fn test_scan_is_lazy() {
        let ledger = MemoryLedger::new("defaultdb");
        for i in 0..50 {
            ledger.set(format!("k{:02}", i), "v");
        }
        let config = ConnectionConfig { page_size: 10, ..Default::default() };
        let mut session = ledger.open(&config).unwrap();

        let mut scan = session.fetch_by_prefix(b"").unwrap();
        assert_eq!(ledger.page_fetches(), 0);
        scan.next().unwrap().unwrap();
        assert_eq!(ledger.page_fetches(), 1);
    }

    #[test]
    fn test_pinned_ledger_serves_old_state() {
        let ledger = MemoryLedger::new("defaultdb");
        ledger.set("a", "1");
        ledger.set("b", "2");
        ledger.set("a", "3");
        ledger.pin(2);
        let mut session = open(&ledger);

        assert_eq!(session.fetch_current_root().unwrap().transaction_id, 2);
        let proven = session.fetch_by_key(b"a").unwrap();
        assert_eq!(proven.entry.value, b"1");
        assert!(verify(&proven.entry, &proven.proof, &proven.root));
    }

    #[test]
    fn test_tampered_value_fails_verification() {
        let ledger = MemoryLedger::new("defaultdb");
        ledger.set("a", "1");
        assert!(ledger.tamper(b"a", "forged"));
        let mut session = open(&ledger);

        let proven = session.fetch_by_key(b"a").unwrap();
        assert_eq!(proven.entry.value, b"forged");
        assert!(!verify(&proven.entry, &proven.proof, &proven.root));
    }

    #[test]
    fn test_bad_credentials_not_retried() {
        let ledger = MemoryLedger::new("defaultdb");
        let config = ConnectionConfig {
            credentials: Credentials::new("immudb", "wrong"),
            ..Default::default()
        };
        let err = ledger.open(&config).unwrap_err();
        assert!(matches!(err, LedgerError::Connection { attempts: 1, .. }));
        assert_eq!(ledger.connect_attempts(), 1);
    }
}
