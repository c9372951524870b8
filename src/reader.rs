// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Verified Reader
//!
//! Wraps a transport session and only ever hands out entries whose inclusion
//! proof reconstructs the root the server claimed, where that root is not
//! older than (or a different history from) the last verified one.
//!
//! # Flow per fetched entry
//! 1. root check against `VerificationState` (rollback / fork, terminal)
//! 2. proof verification (failure aborts the read)
//! 3. accept entry, advance the stored root
//!
//! The root check runs first, so a regressed root is reported as a rollback
//! whether or not its proof happens to be valid.

use std::iter::FusedIterator;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::error::{LedgerError, ReadError};
use crate::filter::KeyFilter;
use crate::proof;
use crate::state::VerificationState;
use crate::transport::LedgerSession;
use crate::types::{render_bytes, Entry, ProvenEntry, Root};

/// Coarse cancellation, checked between entries.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// One session, one verification state. Not shared across threads; parallel
/// scans each open their own reader (see `worker`).
pub struct VerifiedReader<S> {
    session: S,
    state: VerificationState,
    cancel: CancelToken,
}

impl<S: LedgerSession> VerifiedReader<S> {
    pub fn open(session: S) -> Self {
        Self {
            session,
            state: VerificationState::new(),
            cancel: CancelToken::new(),
        }
    }

    pub fn with_cancel(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    pub fn state(&self) -> &VerificationState {
        &self.state
    }

    pub fn last_verified_root(&self) -> Option<Root> {
        self.state.last_root().copied()
    }

    pub fn read_all(&mut self) -> VerifiedEntries<'_, S::Scan> {
        self.read(KeyFilter::All)
    }

    pub fn read_by_prefix(&mut self, prefix: impl Into<Vec<u8>>) -> VerifiedEntries<'_, S::Scan> {
        self.read(KeyFilter::Prefix(prefix.into()))
    }

    /// Full scan; the suffix is applied after verification.
    pub fn read_by_suffix(&mut self, suffix: impl Into<Vec<u8>>) -> VerifiedEntries<'_, S::Scan> {
        self.read(KeyFilter::Suffix(suffix.into()))
    }

    /// Lazy, finite, non-restartable sequence of verified entries matching
    /// `keys`, in ascending key order. Fused after the first error.
    pub fn read(&mut self, keys: KeyFilter) -> VerifiedEntries<'_, S::Scan> {
        let opened = self
            .state
            .ensure_usable()
            .and_then(|_| Ok(self.session.fetch_by_prefix(keys.scan_prefix())?));

        let (scan, pending) = match opened {
            Ok(scan) => (Some(scan), None),
            Err(e) => (None, Some(e)),
        };

        VerifiedEntries {
            scan,
            pending,
            state: &mut self.state,
            cancel: self.cancel.clone(),
            keys,
            last_key: None,
            verified: 0,
            done: false,
        }
    }

    /// Verified single-key read. An absent key is `Ok(None)`, not an error.
    pub fn get(&mut self, key: &[u8]) -> Result<Option<Entry>, ReadError> {
        self.state.ensure_usable()?;

        let proven = match self.session.fetch_by_key(key) {
            Ok(proven) => proven,
            Err(LedgerError::NotFound(_)) => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        if proven.entry.key != key {
            return Err(LedgerError::Protocol(format!(
                "asked for key {}, got {}",
                render_bytes(key),
                proven.entry.display_key()
            ))
            .into());
        }

        accept(&mut self.state, proven).map(Some)
    }

    /// The server's current root, checked for rollback/fork against the last
    /// verified root. Not stored: no proof backs it.
    pub fn current_root(&mut self) -> Result<Root, ReadError> {
        self.state.ensure_usable()?;
        let root = self.session.fetch_current_root()?;
        self.state.check(&root)?;
        Ok(root)
    }

    pub fn into_session(self) -> S {
        self.session
    }
}

/// Steps 1-3 of the module flow for a single transport answer.
fn accept(state: &mut VerificationState, proven: ProvenEntry) -> Result<Entry, ReadError> {
    state.check(&proven.root)?;

    if !proof::verify(&proven.entry, &proven.proof, &proven.root) {
        tracing::error!(
            "Proof rejected for key {} at {}",
            proven.entry.display_key(),
            proven.root
        );
        metrics::increment_counter!("ledgerscope_verification_failures_total");
        return Err(ReadError::VerificationFailed {
            key: proven.entry.display_key(),
            transaction_id: proven.entry.transaction_id,
        });
    }

    state.accept(proven.root);
    metrics::increment_counter!("ledgerscope_entries_verified_total");
    Ok(proven.entry)
}

/// Verified entries from one scan. Borrows the reader's state, so only one
/// scan per reader runs at a time.
pub struct VerifiedEntries<'r, I> {
    scan: Option<I>,
    pending: Option<ReadError>,
    state: &'r mut VerificationState,
    cancel: CancelToken,
    keys: KeyFilter,
    last_key: Option<Vec<u8>>,
    verified: u64,
    done: bool,
}

impl<'r, I> VerifiedEntries<'r, I> {
    /// Entries verified so far, including ones the key filter dropped.
    pub fn verified(&self) -> u64 {
        self.verified
    }

    fn fail(&mut self, err: ReadError) -> Option<Result<Entry, ReadError>> {
        self.done = true;
        Some(Err(err))
    }
}

impl<'r, I> Iterator for VerifiedEntries<'r, I>
where
    I: Iterator<Item = Result<ProvenEntry, LedgerError>>,
{
    type Item = Result<Entry, ReadError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        if let Some(err) = self.pending.take() {
            return self.fail(err);
        }

        loop {
            if self.cancel.is_cancelled() {
                tracing::debug!("Scan cancelled after {} verified entries", self.verified);
                return self.fail(ReadError::Cancelled);
            }

            let next = match self.scan.as_mut() {
                Some(scan) => scan.next(),
                None => None,
            };
            let proven = match next {
                None => {
                    self.done = true;
                    tracing::debug!("Scan complete: {} verified entries", self.verified);
                    return None;
                }
                Some(Err(e)) => return self.fail(e.into()),
                Some(Ok(proven)) => proven,
            };

            if let Some(prev) = &self.last_key {
                if proven.entry.key <= *prev {
                    let err = LedgerError::Protocol(format!(
                        "scan out of order: {} after {}",
                        proven.entry.display_key(),
                        render_bytes(prev)
                    ));
                    return self.fail(err.into());
                }
            }
            self.last_key = Some(proven.entry.key.clone());

            let entry = match accept(self.state, proven) {
                Ok(entry) => entry,
                Err(e) => return self.fail(e),
            };
            self.verified += 1;

            if !self.keys.matches(&entry.key) {
                if let KeyFilter::Prefix(_) = self.keys {
                    tracing::warn!(
                        "Dropping verified entry {} outside the requested prefix",
                        entry.display_key()
                    );
                }
                continue;
            }
            return Some(Ok(entry));
        }
    }
}

impl<'r, I> FusedIterator for VerifiedEntries<'r, I> where
    I: Iterator<Item = Result<ProvenEntry, LedgerError>>
{
}
