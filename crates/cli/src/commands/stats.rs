// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
use std::io::Write;

use comfy_table::presets::UTF8_FULL;
use comfy_table::{ContentArrangement, Table};
use ledgerscope::stats::{collect_stats, LedgerStats};
use ledgerscope::{ConnectionConfig, Connector};

use super::{open_reader, verified_at};

pub fn run<C: Connector>(
    connector: &C,
    config: &ConnectionConfig,
    out: &mut impl Write,
) -> anyhow::Result<LedgerStats> {
    let mut reader = open_reader(connector, config)?;
    let stats = collect_stats(reader.read_all())?;

    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec!["Metric", "Value"]);
    table.add_row(vec!["Entries".to_string(), stats.count.to_string()]);
    table.add_row(vec!["Avg key length".to_string(), format!("{:.2}", stats.avg_key_length)]);
    table.add_row(vec!["Avg value length".to_string(), format!("{:.2}", stats.avg_value_length)]);
    table.add_row(vec![
        "Largest value".to_string(),
        match &stats.largest_value {
            Some(largest) => format!("{} ({} chars)", largest.key, largest.size),
            None => "-".to_string(),
        },
    ]);

    let mut prefixes = Table::new();
    prefixes
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec!["Prefix", "Keys"]);
    for (prefix, count) in &stats.common_prefixes {
        prefixes.add_row(vec![prefix.clone(), count.to_string()]);
    }

    writeln!(out, "{table}")?;
    writeln!(out, "\nMost common key prefixes\n{prefixes}")?;
    writeln!(out, "{}", verified_at(reader.last_verified_root()))?;
    Ok(stats)
}
