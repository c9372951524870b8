// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Gateway transport.
//!
//! Speaks the ledger's JSON gateway over blocking HTTP. Every call after
//! login carries the session's bearer token.

pub mod wire;

use std::collections::VecDeque;
use std::time::Duration;

use reqwest::blocking::{Client, RequestBuilder, Response};
use reqwest::{StatusCode, Url};
use serde::de::DeserializeOwned;

use ledgerscope::config::RetryPolicy;
use ledgerscope::transport::{with_retry, Connector, LedgerSession};
use ledgerscope::types::render_bytes;
use ledgerscope::{ConnectionConfig, LedgerError, ProvenEntry, Root};

use wire::{LoginRequest, LoginResponse, ScanPage};

/// Opens `HttpSession`s. One `Client` is shared by every session it opens.
#[derive(Debug, Clone, Default)]
pub struct HttpConnector {
    client: Client,
}

impl HttpConnector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_client(client: Client) -> Self {
        Self { client }
    }
}

impl Connector for HttpConnector {
    type Session = HttpSession;

    fn open(&self, config: &ConnectionConfig) -> Result<HttpSession, LedgerError> {
        let base_url = Url::parse(&format!("http://{}/", config.address)).map_err(|e| {
            LedgerError::Connection {
                attempts: 0,
                reason: format!("invalid gateway address {}: {}", config.address, e),
            }
        })?;
        let url = endpoint(&base_url, &["v1", "login"]);
        let body = LoginRequest {
            username: &config.credentials.username,
            password: &config.credentials.password,
            database: &config.database,
        };

        let login: LoginResponse = with_retry(&config.retry, config.timeout, "login", |remaining| {
            let resp = send(self.client.post(url.clone()).json(&body).timeout(remaining))?;
            decode(resp, None)
        })?;

        tracing::debug!("Logged in to {} as {:?}", base_url, config.credentials.username);
        Ok(HttpSession {
            client: self.client.clone(),
            db_url: endpoint(&base_url, &["v1", "db", &config.database]),
            token: login.token,
            retry: config.retry.clone(),
            timeout: config.timeout,
            page_size: config.page_size.max(1),
        })
    }
}

#[derive(Debug, Clone)]
pub struct HttpSession {
    client: Client,
    db_url: Url,
    token: String,
    retry: RetryPolicy,
    timeout: Duration,
    page_size: usize,
}

impl HttpSession {
    fn get<T: DeserializeOwned>(&self, url: &Url, what: &str, key: Option<&[u8]>) -> Result<T, LedgerError> {
        with_retry(&self.retry, self.timeout, what, |remaining| {
            let resp = send(
                self.client
                    .get(url.clone())
                    .bearer_auth(&self.token)
                    .timeout(remaining),
            )?;
            decode(resp, key)
        })
    }
}

impl LedgerSession for HttpSession {
    type Scan = HttpScan;

    fn fetch_by_key(&mut self, key: &[u8]) -> Result<ProvenEntry, LedgerError> {
        let url = endpoint(&self.db_url, &["entry", &hex::encode(key)]);
        self.get(&url, "fetch key", Some(key))
    }

    fn fetch_by_prefix(&mut self, prefix: &[u8]) -> Result<HttpScan, LedgerError> {
        Ok(HttpScan {
            session: self.clone(),
            prefix: prefix.to_vec(),
            after: None,
            buffered: VecDeque::new(),
            exhausted: false,
        })
    }

    fn fetch_current_root(&mut self) -> Result<Root, LedgerError> {
        let url = endpoint(&self.db_url, &["state"]);
        self.get(&url, "fetch root", None)
    }
}

/// Paged scan; requests the next page only once the buffered one is drained.
#[derive(Debug)]
pub struct HttpScan {
    session: HttpSession,
    prefix: Vec<u8>,
    after: Option<Vec<u8>>,
    buffered: VecDeque<ProvenEntry>,
    exhausted: bool,
}

impl HttpScan {
    fn fetch_page(&self) -> Result<ScanPage, LedgerError> {
        let mut url = endpoint(&self.session.db_url, &["scan"]);
        {
            let mut query = url.query_pairs_mut();
            query
                .append_pair("prefix", &hex::encode(&self.prefix))
                .append_pair("limit", &self.session.page_size.to_string());
            if let Some(after) = &self.after {
                query.append_pair("after", &hex::encode(after));
            }
        }
        self.session.get(&url, "fetch scan page", None)
    }
}

impl Iterator for HttpScan {
    type Item = Result<ProvenEntry, LedgerError>;

    fn next(&mut self) -> Option<Self::Item> {
        if let Some(next) = self.buffered.pop_front() {
            return Some(Ok(next));
        }
        if self.exhausted {
            return None;
        }

        let page = self.fetch_page().and_then(|page| {
            let cursor = match page.next_after {
                Some(hex_key) => Some(hex::decode(&hex_key).map_err(|e| {
                    LedgerError::Protocol(format!("bad scan cursor {:?}: {}", hex_key, e))
                })?),
                None => None,
            };
            Ok((page.entries, cursor))
        });

        match page {
            Ok((entries, cursor)) => {
                tracing::debug!("Scan page: {} entries, more: {}", entries.len(), cursor.is_some());
                // A cursor with an empty page would loop forever
                self.exhausted = cursor.is_none() || entries.is_empty();
                self.after = cursor;
                self.buffered = entries.into();
                self.buffered.pop_front().map(Ok)
            }
            Err(e) => {
                self.exhausted = true;
                Some(Err(e))
            }
        }
    }
}

/// `base` with `segments` appended, each percent-encoded as one path segment.
fn endpoint(base: &Url, segments: &[&str]) -> Url {
    let mut url = base.clone();
    // http URLs always have a path, so this never fails
    if let Ok(mut path) = url.path_segments_mut() {
        path.pop_if_empty().extend(segments);
    }
    url
}

fn send(request: RequestBuilder) -> Result<Response, LedgerError> {
    request.send().map_err(|e| {
        if e.is_builder() {
            LedgerError::Protocol(e.to_string())
        } else {
            LedgerError::Unavailable(e.to_string())
        }
    })
}

/// Maps the response status onto `LedgerError` and decodes a success body.
/// `key` marks requests where a 404 means the key is absent.
fn decode<T: DeserializeOwned>(resp: Response, key: Option<&[u8]>) -> Result<T, LedgerError> {
    let status = resp.status();
    if status.is_success() {
        return resp
            .json()
            .map_err(|e| LedgerError::Protocol(format!("undecodable response: {}", e)));
    }

    let url = resp.url().path().to_string();
    Err(match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => LedgerError::Connection {
            attempts: 1,
            reason: format!("gateway rejected credentials ({})", status),
        },
        StatusCode::NOT_FOUND if key.is_some() => {
            LedgerError::NotFound(key.map(render_bytes).unwrap_or_default())
        }
        s if s.is_server_error() => LedgerError::Unavailable(format!("{} from {}", s, url)),
        s => LedgerError::Protocol(format!("unexpected {} from {}", s, url)),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_encodes_segments() {
        let base = Url::parse("http://ledger.local:3322/").unwrap();
        assert_eq!(
            endpoint(&base, &["v1", "db", "defaultdb", "state"]).as_str(),
            "http://ledger.local:3322/v1/db/defaultdb/state"
        );
        assert_eq!(
            endpoint(&base, &["v1", "db", "a/b?c#d"]).path(),
            "/v1/db/a%2Fb%3Fc%23d"
        );

        let nested = endpoint(&base, &["v1", "db", "x"]);
        assert_eq!(endpoint(&nested, &["entry", "6b"]).path(), "/v1/db/x/entry/6b");
    }

    #[test]
    fn test_ipv6_base_url() {
        let address = ledgerscope::LedgerAddress::parse("[::1]:9000").unwrap();
        let base = Url::parse(&format!("http://{}/", address)).unwrap();
        assert_eq!(endpoint(&base, &["v1", "login"]).as_str(), "http://[::1]:9000/v1/login");
    }
}
