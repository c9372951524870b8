// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
use std::io::Write;

use comfy_table::presets::UTF8_FULL;
use comfy_table::{ContentArrangement, Table};
use ledgerscope::types::render_bytes;
use ledgerscope::{ConnectionConfig, Connector};

use super::{open_reader, verified_at};

pub fn run<C: Connector>(
    connector: &C,
    config: &ConnectionConfig,
    key: &str,
    out: &mut impl Write,
) -> anyhow::Result<()> {
    let mut reader = open_reader(connector, config)?;

    let Some(entry) = reader.get(key.as_bytes())? else {
        writeln!(out, "Key {:?} not found", key)?;
        return Ok(());
    };

    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec!["Key", "Value", "Tx"]);
    table.add_row(vec![
        entry.display_key(),
        render_bytes(&entry.value),
        entry.transaction_id.to_string(),
    ]);

    writeln!(out, "{table}")?;
    writeln!(out, "{}", verified_at(reader.last_verified_root()))?;
    Ok(())
}
