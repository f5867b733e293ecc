//! Case-preserving multimap for headers and query parameters.
//!
//! Keys keep their original case on the wire while lookups are
//! case-insensitive. Values keep insertion order within a key. The
//! canonicalization methods produce the exact strings SigV4 signs over.

use std::fmt::Write as _;

/// Collapses runs of spaces into a single space.
fn collapse_spaces(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut prev_space = false;
    for ch in value.chars() {
        if ch == ' ' {
            if !prev_space {
                out.push(' ');
            }
            prev_space = true;
        } else {
            out.push(ch);
            prev_space = false;
        }
    }
    out
}

#[derive(Debug, Default, Clone)]
pub struct Multimap {
    entries: Vec<(String, String)>,
}

impl Multimap {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.entries.push((key.into(), value.into()));
    }

    pub fn add_all(&mut self, other: &Multimap) {
        for (k, v) in &other.entries {
            self.entries.push((k.clone(), v.clone()));
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Case-insensitive key lookup.
    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.entries.iter().any(|(k, _)| k.eq_ignore_ascii_case(key))
    }

    /// All values for `key` in insertion order.
    #[must_use]
    pub fn get(&self, key: &str) -> Vec<&str> {
        self.entries
            .iter()
            .filter(|(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, v)| v.as_str())
            .collect()
    }

    /// First inserted value for `key`.
    #[must_use]
    pub fn get_front(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, v)| v.as_str())
    }

    /// Lowercased keys, deduplicated, in first-insertion order.
    #[must_use]
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = Vec::new();
        for (k, _) in &self.entries {
            let lower = k.to_ascii_lowercase();
            if !keys.contains(&lower) {
                keys.push(lower);
            }
        }
        keys
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> + '_ {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Percent-encoded `k=v&…` in canonical (sorted) order.
    #[must_use]
    pub fn to_query_string(&self) -> String {
        self.canonical_query_string()
    }

    /// Returns `(signed_headers, canonical_headers)` per SigV4.
    ///
    /// `signed_headers` is the sorted `;`-joined list of lowercased names,
    /// excluding `authorization` and `user-agent`. `canonical_headers` is
    /// one `name:value` entry per name, values with the same name joined by
    /// `,` in insertion order, entries sorted and joined with `\n`.
    #[must_use]
    pub fn canonical_headers(&self) -> (String, String) {
        let mut merged: Vec<(String, String)> = Vec::new();
        for (k, v) in &self.entries {
            let key = k.to_ascii_lowercase();
            if key == "authorization" || key == "user-agent" {
                continue;
            }
            let value = collapse_spaces(v);
            if let Some((_, existing)) = merged.iter_mut().find(|(name, _)| *name == key) {
                existing.push(',');
                existing.push_str(&value);
            } else {
                merged.push((key, value));
            }
        }
        merged.sort_by(|a, b| a.0.cmp(&b.0));

        let signed_headers = merged.iter().map(|(k, _)| k.as_str()).collect::<Vec<_>>().join(";");
        let canonical_headers = merged
            .iter()
            .map(|(k, v)| format!("{k}:{v}"))
            .collect::<Vec<_>>()
            .join("\n");
        (signed_headers, canonical_headers)
    }

    /// Percent-encoded pairs sorted by raw key; repeated keys keep insertion
    /// order.
    #[must_use]
    pub fn canonical_query_string(&self) -> String {
        let mut indexed: Vec<(usize, &(String, String))> = self.entries.iter().enumerate().collect();
        indexed.sort_by(|(ai, a), (bi, b)| a.0.cmp(&b.0).then(ai.cmp(bi)));

        let mut out = String::new();
        for (_, (k, v)) in indexed {
            if !out.is_empty() {
                out.push('&');
            }
            let _ = write!(out, "{}={}", urlencoding::encode(k), urlencoding::encode(v));
        }
        out
    }
}

impl<'a> IntoIterator for &'a Multimap {
    type Item = (&'a str, &'a str);
    type IntoIter = Box<dyn Iterator<Item = (&'a str, &'a str)> + 'a>;

    fn into_iter(self) -> Self::IntoIter {
        Box::new(self.iter())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn case_insensitive_lookup() {
        let mut map = Multimap::new();
        map.add("Content-Type", "application/xml");
        assert!(map.contains("content-type"));
        assert_eq!(map.get_front("CONTENT-TYPE"), Some("application/xml"));
        assert_eq!(map.get("unknown"), Vec::<&str>::new());
    }

    #[test]
    fn values_keep_insertion_order() {
        let mut map = Multimap::new();
        map.add("events", "s3:ObjectCreated:*");
        map.add("events", "s3:ObjectRemoved:*");
        assert_eq!(map.get("events"), vec!["s3:ObjectCreated:*", "s3:ObjectRemoved:*"]);
    }

    #[test]
    fn canonical_headers_sorted_and_filtered() {
        let mut map = Multimap::new();
        map.add("Host", "play.min.io");
        map.add("Authorization", "skipped");
        map.add("User-Agent", "skipped");
        map.add("x-amz-date", "20130524T000000Z");
        map.add("X-Amz-Meta-K", "a  b   c");

        let (signed, canonical) = map.canonical_headers();
        assert_eq!(signed, "host;x-amz-date;x-amz-meta-k");
        assert_eq!(
            canonical,
            "host:play.min.io\nx-amz-date:20130524T000000Z\nx-amz-meta-k:a b c"
        );
    }

    #[test]
    fn canonical_headers_joins_repeated_names() {
        let mut map = Multimap::new();
        map.add("X-Amz-Meta-K", "one");
        map.add("x-amz-meta-k", "two");
        let (signed, canonical) = map.canonical_headers();
        assert_eq!(signed, "x-amz-meta-k");
        assert_eq!(canonical, "x-amz-meta-k:one,two");
    }

    #[test]
    fn canonical_query_string_sorted_and_encoded() {
        let mut map = Multimap::new();
        map.add("prefix", "a/b c");
        map.add("list-type", "2");
        map.add("delimiter", "/");
        assert_eq!(
            map.canonical_query_string(),
            "delimiter=%2F&list-type=2&prefix=a%2Fb%20c"
        );
    }

    #[test]
    fn canonical_query_string_repeated_key_insertion_order() {
        let mut map = Multimap::new();
        map.add("events", "b");
        map.add("events", "a");
        assert_eq!(map.canonical_query_string(), "events=b&events=a");
    }

    #[test]
    fn empty_value_query() {
        let mut map = Multimap::new();
        map.add("uploads", "");
        assert_eq!(map.canonical_query_string(), "uploads=");
    }
}
