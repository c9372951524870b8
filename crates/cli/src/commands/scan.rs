// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
use std::io::Write;

use anyhow::Context;
use comfy_table::presets::UTF8_FULL;
use comfy_table::{ContentArrangement, Table};
use ledgerscope::filter::{filter_keys, KeyFilter};
use ledgerscope::types::render_bytes;
use ledgerscope::worker::{spawn_scan, DEFAULT_CHANNEL_CAPACITY};
use ledgerscope::{ConnectionConfig, Connector, Entry, ReadError, Root};

use super::verified_at;

/// Scans every prefix on its own worker (all keys when none are given),
/// keeps keys ending in `suffix`, and prints up to `limit` entries in prefix
/// order.
pub fn run<C>(
    connector: &C,
    config: &ConnectionConfig,
    prefixes: &[String],
    suffix: Option<&str>,
    limit: Option<usize>,
    out: &mut impl Write,
) -> anyhow::Result<()>
where
    C: Connector + Clone + Send + 'static,
{
    let scopes: Vec<KeyFilter> = if prefixes.is_empty() {
        vec![KeyFilter::All]
    } else {
        prefixes.iter().map(|p| KeyFilter::prefix(p.as_str())).collect()
    };
    let keep = suffix.map(KeyFilter::suffix).unwrap_or_default();
    let is_full = |n: usize| limit.is_some_and(|limit| n >= limit);

    let workers: Vec<_> = scopes
        .into_iter()
        .map(|scope| spawn_scan(connector.clone(), config.clone(), scope, DEFAULT_CHANNEL_CAPACITY))
        .collect();
    tracing::debug!("Started {} scan worker(s)", workers.len());

    let mut entries: Vec<Entry> = Vec::new();
    let mut failure: Option<ReadError> = None;
    let mut last_root: Option<Root> = None;

    for mut worker in workers {
        let mut full = is_full(entries.len());
        if failure.is_some() || full {
            worker.cancel();
            let _ = worker.join();
            continue;
        }

        for item in filter_keys(worker.by_ref(), keep.clone()) {
            match item {
                Ok(entry) => {
                    entries.push(entry);
                    if is_full(entries.len()) {
                        full = true;
                        break;
                    }
                }
                Err(e) => {
                    failure = Some(e);
                    break;
                }
            }
        }

        if full {
            worker.cancel();
        }
        match worker.join() {
            Ok(root) => last_root = newest(last_root, root),
            Err(ReadError::Cancelled) if full => {}
            Err(e) => {
                failure.get_or_insert(e);
            }
        }
    }

    if let Some(err) = failure {
        return Err(err).context("Scan aborted");
    }

    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec!["Key", "Value", "Tx"]);
    for entry in &entries {
        table.add_row(vec![
            entry.display_key(),
            render_bytes(&entry.value),
            entry.transaction_id.to_string(),
        ]);
    }

    writeln!(out, "{table}")?;
    writeln!(out, "{} entries, {}", entries.len(), verified_at(last_root))?;
    Ok(())
}

fn newest(a: Option<Root>, b: Option<Root>) -> Option<Root> {
    match (a, b) {
        (Some(a), Some(b)) if b.transaction_id > a.transaction_id => Some(b),
        (Some(a), _) => Some(a),
        (None, b) => b,
    }
}
