// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
use std::time::Duration;

use anyhow::Context;
use clap::{Args, ValueEnum};

use ledgerscope::config::{DEFAULT_DATABASE, DEFAULT_PAGE_SIZE, DEFAULT_PASSWORD, DEFAULT_USERNAME};
use ledgerscope::export::ExportFormat;
use ledgerscope::{ConnectionConfig, Credentials, LedgerAddress};

/// Connection flags shared by every command.
#[derive(Args, Debug, Clone)]
pub struct ConnectionArgs {
    /// Ledger gateway address: host, host:port or scheme://host:port
    #[arg(long, global = true, default_value = "localhost:3322")]
    pub address: String,

    #[arg(long, global = true, default_value = DEFAULT_DATABASE)]
    pub database: String,

    #[arg(long, global = true, default_value = DEFAULT_USERNAME)]
    pub username: String,

    #[arg(long, global = true, default_value = DEFAULT_PASSWORD, hide_default_value = true)]
    pub password: String,

    /// Deadline per ledger call, retries included
    #[arg(long, global = true, default_value_t = 10)]
    pub timeout_secs: u64,

    /// Entries requested per scan page
    #[arg(long, global = true, default_value_t = DEFAULT_PAGE_SIZE)]
    pub page_size: usize,
}

impl ConnectionArgs {
    pub fn to_config(&self) -> anyhow::Result<ConnectionConfig> {
        let address = LedgerAddress::parse(&self.address)
            .with_context(|| format!("Bad --address {:?}", self.address))?;
        let config = ConnectionConfig {
            address,
            database: self.database.clone(),
            credentials: Credentials::new(&self.username, &self.password),
            timeout: Duration::from_secs(self.timeout_secs),
            page_size: self.page_size,
            ..Default::default()
        };
        config.validate()?;
        Ok(config)
    }
}

#[derive(ValueEnum, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FormatArg {
    #[default]
    Json,
    Ndjson,
}

impl From<FormatArg> for ExportFormat {
    fn from(format: FormatArg) -> Self {
        match format {
            FormatArg::Json => ExportFormat::Json,
            FormatArg::Ndjson => ExportFormat::Ndjson,
        }
    }
}
