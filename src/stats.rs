// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Streaming statistics over verified entries.

use rustc_hash::FxHashMap;
use serde::Serialize;

use crate::error::ReadError;
use crate::types::Entry;

/// Longest key prefix (in characters, exclusive) counted per key.
const PREFIX_SPAN: usize = 5;
const TOP_PREFIXES: usize = 5;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LargestValue {
    pub key: String,
    pub size: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LedgerStats {
    pub count: u64,
    pub avg_key_length: f64,
    pub avg_value_length: f64,
    pub largest_value: Option<LargestValue>,
    /// Most common key prefixes, most frequent first.
    pub common_prefixes: Vec<(String, u64)>,
}

/// Lengths are counted in characters of the lossy UTF-8 rendering.
#[derive(Debug, Default)]
pub struct StatsCollector {
    count: u64,
    key_chars: u64,
    value_chars: u64,
    largest: Option<LargestValue>,
    prefixes: FxHashMap<String, u64>,
}

impl StatsCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn observe(&mut self, entry: &Entry) {
        let key = String::from_utf8_lossy(&entry.key);
        let key_len = key.chars().count();
        let value_len = String::from_utf8_lossy(&entry.value).chars().count();

        self.count += 1;
        self.key_chars += key_len as u64;
        self.value_chars += value_len as u64;

        // Prefixes of 1..min(PREFIX_SPAN, len) characters
        let span = PREFIX_SPAN.min(key_len).saturating_sub(1);
        for (end, _) in key.char_indices().skip(1).take(span) {
            *self.prefixes.entry(key[..end].to_string()).or_insert(0) += 1;
        }

        // First key wins on ties
        let bigger = match &self.largest {
            Some(current) => value_len > current.size,
            None => value_len > 0,
        };
        if bigger {
            self.largest = Some(LargestValue {
                key: key.into_owned(),
                size: value_len,
            });
        }
    }

    pub fn finish(&self) -> LedgerStats {
        let avg = |total: u64| {
            if self.count == 0 {
                0.0
            } else {
                total as f64 / self.count as f64
            }
        };

        let mut common: Vec<(String, u64)> = self
            .prefixes
            .iter()
            .map(|(p, c)| (p.clone(), *c))
            .collect();
        common.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        common.truncate(TOP_PREFIXES);

        LedgerStats {
            count: self.count,
            avg_key_length: avg(self.key_chars),
            avg_value_length: avg(self.value_chars),
            largest_value: self.largest.clone(),
            common_prefixes: common,
        }
    }
}

/// Drains a verified sequence into statistics. Stops at the first error.
pub fn collect_stats<I>(entries: I) -> Result<LedgerStats, ReadError>
where
    I: IntoIterator<Item = Result<Entry, ReadError>>,
{
    let mut collector = StatsCollector::new();
    for entry in entries {
        collector.observe(&entry?);
    }
    Ok(collector.finish())
}
