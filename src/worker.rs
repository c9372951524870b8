// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Scan workers.
//!
//! Root monotonicity is tracked per session, so parallel scans never share a
//! reader: each worker opens its own session and verification state on its
//! own thread and hands entries back over a bounded channel.

use std::sync::mpsc::{self, Receiver};
use std::thread::{self, JoinHandle};

use crate::config::ConnectionConfig;
use crate::error::ReadError;
use crate::filter::KeyFilter;
use crate::reader::{CancelToken, VerifiedReader};
use crate::transport::Connector;
use crate::types::{Entry, Root};

/// Entries buffered between a worker and its consumer.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 100;

pub struct ScanWorker {
    entries: Receiver<Result<Entry, ReadError>>,
    handle: JoinHandle<Result<Option<Root>, ReadError>>,
    cancel: CancelToken,
}

/// Runs a verified scan of `keys` on a dedicated thread.
///
/// Errors (including failing to open the session) are delivered in-stream
/// and also returned from `join`.
pub fn spawn_scan<C>(
    connector: C,
    config: ConnectionConfig,
    keys: KeyFilter,
    capacity: usize,
) -> ScanWorker
where
    C: Connector + Send + 'static,
{
    let (tx, rx) = mpsc::sync_channel(capacity.max(1));
    let cancel = CancelToken::new();
    let worker_cancel = cancel.clone();

    let handle = thread::spawn(move || {
        let session = match connector.open(&config) {
            Ok(session) => session,
            Err(e) => {
                let err = ReadError::from(e);
                let _ = tx.send(Err(err.clone()));
                return Err(err);
            }
        };

        let mut reader = VerifiedReader::open(session).with_cancel(worker_cancel);
        let mut failure = None;

        for item in reader.read(keys) {
            if let Err(e) = &item {
                failure = Some(e.clone());
            }
            if tx.send(item).is_err() {
                tracing::debug!("Scan worker: consumer hung up, stopping");
                break;
            }
        }

        match failure {
            Some(err) => Err(err),
            None => Ok(reader.last_verified_root()),
        }
    });

    ScanWorker {
        entries: rx,
        handle,
        cancel,
    }
}

impl ScanWorker {
    /// Asks the worker to stop at the next entry boundary.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Stops consuming and waits for the worker. Returns the last root the
    /// worker verified.
    pub fn join(self) -> Result<Option<Root>, ReadError> {
        // Unblock a worker stuck on a full channel
        drop(self.entries);
        match self.handle.join() {
            Ok(result) => result,
            Err(panic) => std::panic::resume_unwind(panic),
        }
    }
}

impl Iterator for ScanWorker {
    type Item = Result<Entry, ReadError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.entries.recv().ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::MemoryLedger;

    #[test]
    fn test_parallel_prefix_scans() {
        let ledger = MemoryLedger::new("defaultdb");
        for i in 0..30 {
            ledger.set(format!("block:{:02}", i), "b");
            ledger.set(format!("tx:{:02}", i), "t");
        }
        let config = ConnectionConfig { page_size: 7, ..Default::default() };

        let mut blocks = spawn_scan(ledger.clone(), config.clone(), KeyFilter::prefix("block:"), 4);
        let mut txs = spawn_scan(ledger.clone(), config, KeyFilter::prefix("tx:"), 4);

        let block_keys: Vec<_> = blocks.by_ref().map(|r| r.unwrap().key).collect();
        let tx_count = txs.by_ref().filter(|r| r.is_ok()).count();

        assert_eq!(block_keys.len(), 30);
        assert!(block_keys.iter().all(|k| k.starts_with(b"block:")));
        assert_eq!(tx_count, 30);

        assert_eq!(blocks.join().unwrap().unwrap().transaction_id, 60);
        assert!(txs.join().is_ok());
    }

    #[test]
    fn test_open_failure_is_delivered() {
        let ledger = MemoryLedger::new("defaultdb");
        let config = ConnectionConfig {
            database: "missing".into(),
            ..Default::default()
        };

        let mut worker = spawn_scan(ledger, config, KeyFilter::All, 4);
        let first = worker.next().unwrap();
        assert!(matches!(first, Err(ReadError::Transport(_))));
        assert!(worker.next().is_none());
        assert!(worker.join().is_err());
    }

    #[test]
    fn test_join_without_draining() {
        let ledger = MemoryLedger::new("defaultdb");
        for i in 0..500 {
            ledger.set(format!("k{:03}", i), "v");
        }
        let worker = spawn_scan(ledger, ConnectionConfig::default(), KeyFilter::All, 2);
        // Worker blocks on the full channel until join drops the receiver
        assert!(worker.join().is_ok());
    }
}
