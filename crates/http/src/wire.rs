// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Gateway request and response bodies. Public so that gateways and test
//! servers share them with the client.

use serde::{Deserialize, Serialize};

use ledgerscope::ProvenEntry;

#[derive(Debug, Serialize)]
pub struct LoginRequest<'a> {
    pub username: &'a str,
    pub password: &'a str,
    pub database: &'a str,
}

/// Server-side view of a login body.
#[derive(Debug, Deserialize)]
pub struct LoginBody {
    pub username: String,
    pub password: String,
    pub database: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LoginResponse {
    pub token: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ScanPage {
    pub entries: Vec<ProvenEntry>,
    /// Hex key to resume after, absent once the range is exhausted.
    #[serde(rename = "nextAfter")]
    pub next_after: Option<String>,
}

/// Query string of a scan request (hex-encoded keys).
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct ScanQuery {
    #[serde(default)]
    pub prefix: String,
    pub after: Option<String>,
    pub limit: Option<usize>,
}
