// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use anyhow::Context;
use ledgerscope::export::{export_to, ExportFormat, ExportSummary};
use ledgerscope::filter::KeyFilter;
use ledgerscope::{ConnectionConfig, Connector};

use super::open_reader;

/// Streams verified entries to `out_path`, or to `out` when no path is given.
pub fn run<C: Connector>(
    connector: &C,
    config: &ConnectionConfig,
    scope: KeyFilter,
    format: ExportFormat,
    out_path: Option<&Path>,
    out: &mut impl Write,
) -> anyhow::Result<ExportSummary> {
    let mut reader = open_reader(connector, config)?;

    let summary = match out_path {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("Failed to create {}", path.display()))?;
            let mut sink = format.sink(BufWriter::new(file));
            let summary = export_to(reader.read(scope), &mut sink)
                .with_context(|| format!("Export to {} failed", path.display()))?;
            eprintln!("Exported {} records to {}", summary.exported, path.display());
            summary
        }
        None => {
            let mut sink = format.sink(out);
            export_to(reader.read(scope), &mut sink).context("Export failed")?
        }
    };

    Ok(summary)
}
