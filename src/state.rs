// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Per-session verification state.
//!
//! Holds the last root that backed a successfully verified entry. It only
//! moves forward; the first regression poisons it for good.

use crate::error::ReadError;
use crate::hash::digests_equal;
use crate::types::Root;

#[derive(Debug, Clone, Default)]
pub struct VerificationState {
    last_root: Option<Root>,
    poisoned: Option<ReadError>,
}

impl VerificationState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn last_root(&self) -> Option<&Root> {
        self.last_root.as_ref()
    }

    /// The terminal error that poisoned this state, if any.
    pub fn poisoned(&self) -> Option<&ReadError> {
        self.poisoned.as_ref()
    }

    /// Fails if this state is already poisoned.
    pub fn ensure_usable(&self) -> Result<(), ReadError> {
        match &self.poisoned {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }

    /// Compares an observed root with the stored one without storing it.
    ///
    /// - lower transaction id: rollback
    /// - same transaction id, different digest: fork
    ///
    /// Either one poisons the state.
    pub fn check(&mut self, observed: &Root) -> Result<(), ReadError> {
        self.ensure_usable()?;

        let Some(stored) = self.last_root else {
            return Ok(());
        };

        let violation = if observed.transaction_id < stored.transaction_id {
            Some(ReadError::RollbackDetected {
                stored: stored.transaction_id,
                observed: observed.transaction_id,
            })
        } else if observed.transaction_id == stored.transaction_id
            && !digests_equal(&observed.digest, &stored.digest)
        {
            Some(ReadError::ForkDetected {
                transaction_id: observed.transaction_id,
            })
        } else {
            None
        };

        match violation {
            Some(err) => {
                tracing::error!("Integrity violation against {}: {}", stored, err);
                metrics::increment_counter!(violation_counter(&err));
                self.poisoned = Some(err.clone());
                Err(err)
            }
            None => Ok(()),
        }
    }

    /// Records a root that backed a verified entry. Call only after `check`
    /// and a successful proof verification.
    pub fn accept(&mut self, root: Root) {
        let advance = match self.last_root {
            None => true,
            Some(stored) => root.transaction_id > stored.transaction_id,
        };
        if advance {
            tracing::debug!("Verified root advanced to {}", root);
            metrics::gauge!("ledgerscope_verified_transaction_id", root.transaction_id as f64);
            self.last_root = Some(root);
        }
    }
}

/// Counter bumped for a root check violation.
fn violation_counter(err: &ReadError) -> &'static str {
    match err {
        ReadError::ForkDetected { .. } => "ledgerscope_forks_detected_total",
        _ => "ledgerscope_rollbacks_detected_total",
    }
}
