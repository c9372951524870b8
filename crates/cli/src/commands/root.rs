// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
use std::io::Write;

use ledgerscope::{ConnectionConfig, Connector};

use super::open_reader;

/// Prints `{"transactionId": .., "merkleRoot": ..}`.
pub fn run<C: Connector>(connector: &C, config: &ConnectionConfig, out: &mut impl Write) -> anyhow::Result<()> {
    let mut reader = open_reader(connector, config)?;
    let root = reader.current_root()?;
    writeln!(out, "{}", serde_json::to_string_pretty(&root)?)?;
    Ok(())
}
