// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! One module per subcommand. Each `run` is generic over the connector so the
//! same code drives the gateway client and the in-memory ledger.

pub mod export;
pub mod get;
pub mod root;
pub mod scan;
pub mod stats;

use anyhow::Context;
use ledgerscope::{ConnectionConfig, Connector, VerifiedReader};

pub(crate) fn open_reader<C: Connector>(
    connector: &C,
    config: &ConnectionConfig,
) -> anyhow::Result<VerifiedReader<C::Session>> {
    let session = connector
        .open(config)
        .with_context(|| format!("Failed to open session on {}/{}", config.address, config.database))?;
    Ok(VerifiedReader::open(session))
}

pub(crate) fn verified_at(reader_root: Option<ledgerscope::Root>) -> String {
    let now = chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Secs, true);
    match reader_root {
        Some(root) => format!("verified against {} at {}", root, now),
        None => format!("nothing to verify at {}", now),
    }
}
