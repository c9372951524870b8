// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Lazy key predicates over entry sequences.

use crate::types::Entry;

/// Which keys a read is interested in.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum KeyFilter {
    #[default]
    All,
    Prefix(Vec<u8>),
    /// Suffixes have no index support: the whole ledger is scanned and
    /// filtered after verification.
    Suffix(Vec<u8>),
}

impl KeyFilter {
    pub fn prefix(prefix: impl Into<Vec<u8>>) -> Self {
        KeyFilter::Prefix(prefix.into())
    }

    pub fn suffix(suffix: impl Into<Vec<u8>>) -> Self {
        KeyFilter::Suffix(suffix.into())
    }

    pub fn matches(&self, key: &[u8]) -> bool {
        match self {
            KeyFilter::All => true,
            KeyFilter::Prefix(p) => key.starts_with(p),
            KeyFilter::Suffix(s) => key.ends_with(s),
        }
    }

    /// Prefix to hand to the transport for this filter.
    pub fn scan_prefix(&self) -> &[u8] {
        match self {
            KeyFilter::Prefix(p) => p.as_slice(),
            KeyFilter::All | KeyFilter::Suffix(_) => &[],
        }
    }
}

/// Keeps the `Ok` entries matching `predicate`; errors pass through in
/// place so that callers still see where the sequence broke.
pub fn filter<I, E, P>(entries: I, predicate: P) -> Filter<I::IntoIter, P>
where
    I: IntoIterator<Item = Result<Entry, E>>,
    P: FnMut(&Entry) -> bool,
{
    Filter {
        inner: entries.into_iter(),
        predicate,
    }
}

/// `filter` with a `KeyFilter`.
pub fn filter_keys<I, E>(entries: I, keys: KeyFilter) -> Filter<I::IntoIter, impl FnMut(&Entry) -> bool>
where
    I: IntoIterator<Item = Result<Entry, E>>,
{
    filter(entries, move |entry: &Entry| keys.matches(&entry.key))
}

pub struct Filter<I, P> {
    inner: I,
    predicate: P,
}

impl<I, E, P> Iterator for Filter<I, P>
where
    I: Iterator<Item = Result<Entry, E>>,
    P: FnMut(&Entry) -> bool,
{
    type Item = Result<Entry, E>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            match self.inner.next()? {
                Ok(entry) if !(self.predicate)(&entry) => continue,
                other => return Some(other),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entries() -> Vec<Result<Entry, String>> {
        vec![
            Ok(Entry::new("block:1", "v1", 1)),
            Ok(Entry::new("block:2hash", "v2", 2)),
            Err("boom".to_string()),
            Ok(Entry::new("other", "v3", 3)),
        ]
    }

    #[test]
    fn test_prefix_keeps_order_and_errors() {
        let out: Vec<_> = filter_keys(entries(), KeyFilter::prefix("block:")).collect();
        assert_eq!(out.len(), 3);
        assert_eq!(out[0].as_ref().unwrap().key, b"block:1");
        assert_eq!(out[1].as_ref().unwrap().key, b"block:2hash");
        assert!(out[2].is_err());
    }

    #[test]
    fn test_suffix() {
        let out: Vec<_> = filter_keys(entries(), KeyFilter::suffix("hash"))
            .filter_map(Result::ok)
            .collect();
        assert_eq!(out, vec![Entry::new("block:2hash", "v2", 2)]);
    }

    #[test]
    fn test_closure_predicate() {
        let out: Vec<_> = filter(entries(), |e| e.transaction_id > 2)
            .filter_map(Result::ok)
            .collect();
        assert_eq!(out, vec![Entry::new("other", "v3", 3)]);
    }

    #[test]
    fn test_scan_prefix() {
        assert_eq!(KeyFilter::prefix("a:").scan_prefix(), b"a:");
        assert!(KeyFilter::suffix("x").scan_prefix().is_empty());
        assert!(KeyFilter::All.matches(b"anything"));
    }
}
