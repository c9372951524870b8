// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
pub mod args;
pub mod commands;
pub mod telemetry;

use ledgerscope::ReadError;

/// Exit code for proof failures, rollbacks and forks.
pub const EXIT_INTEGRITY: u8 = 3;
pub const EXIT_FAILURE: u8 = 1;

/// The integrity violation behind `err`, if any.
pub fn integrity_violation(err: &anyhow::Error) -> Option<&ReadError> {
    err.chain()
        .filter_map(|cause| cause.downcast_ref::<ReadError>())
        .find(|read| read.is_integrity_violation())
}

pub fn exit_code(err: &anyhow::Error) -> u8 {
    if integrity_violation(err).is_some() {
        EXIT_INTEGRITY
    } else {
        EXIT_FAILURE
    }
}
