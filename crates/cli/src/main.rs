// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
use std::io;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use ledgerscope::filter::KeyFilter;
use ledgerscope_cli::args::{ConnectionArgs, FormatArg};
use ledgerscope_cli::commands::{export, get, root, scan, stats};
use ledgerscope_cli::{exit_code, integrity_violation, telemetry};
use ledgerscope_http::HttpConnector;

#[derive(Parser)]
#[command(name = "ledgerscope")]
#[command(about = "Verified reads from a tamper-evident key-value ledger", long_about = None)]
struct Cli {
    #[command(flatten)]
    connection: ConnectionArgs,

    /// Print Prometheus metrics to stderr on exit
    #[arg(long, global = true)]
    emit_metrics: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch the ledger's current root, checked but not proven
    Root,
    /// Verified read of a single key
    Get { key: String },
    /// Table of verified entries
    Scan {
        /// Repeat to scan several prefixes concurrently
        #[arg(long)]
        prefix: Vec<String>,

        #[arg(long)]
        suffix: Option<String>,

        /// Stop after this many entries
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Stream verified entries as JSON
    Export {
        #[arg(long, conflicts_with = "suffix")]
        prefix: Option<String>,

        #[arg(long)]
        suffix: Option<String>,

        #[arg(long, value_enum, default_value_t = FormatArg::Json)]
        format: FormatArg,

        /// Output file (stdout when omitted)
        #[arg(long, short)]
        out: Option<PathBuf>,
    },
    /// Key and value statistics over the whole ledger
    Stats,
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let config = cli.connection.to_config()?;
    let connector = HttpConnector::new();
    let mut stdout = io::stdout().lock();

    match cli.command {
        Commands::Root => root::run(&connector, &config, &mut stdout),
        Commands::Get { key } => get::run(&connector, &config, &key, &mut stdout),
        Commands::Scan { prefix, suffix, limit } => {
            scan::run(&connector, &config, &prefix, suffix.as_deref(), limit, &mut stdout)
        }
        Commands::Export { prefix, suffix, format, out } => {
            let scope = match (prefix, suffix) {
                (Some(p), _) => KeyFilter::prefix(p),
                (None, Some(s)) => KeyFilter::suffix(s),
                (None, None) => KeyFilter::All,
            };
            export::run(&connector, &config, scope, format.into(), out.as_deref(), &mut stdout).map(|_| ())
        }
        Commands::Stats => stats::run(&connector, &config, &mut stdout).map(|_| ()),
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let emit_metrics = cli.emit_metrics;

    if let Err(e) = telemetry::init_telemetry(emit_metrics) {
        eprintln!("Error: {:#}", e);
        return ExitCode::from(ledgerscope_cli::EXIT_FAILURE);
    }

    let result = run(cli);

    if emit_metrics {
        if let Some(rendered) = telemetry::render_metrics() {
            eprintln!("{}", rendered);
        }
    }

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            if let Some(violation) = integrity_violation(&e) {
                eprintln!("\nINTEGRITY VIOLATION: {}", violation);
                eprintln!("The ledger served data that does not match what was verified before.");
                eprintln!("Do not trust this server until the cause is understood.\n");
            }
            eprintln!("Error: {:#}", e);
            ExitCode::from(exit_code(&e))
        }
    }
}
