//! Ordered, case-insensitive, multi-valued header collection.
//!
//! # Design
//! Headers are kept exactly as the host sends them: a flat list of
//! `"Name: Value"` lines. Keeping the joined line (instead of a parsed pair)
//! means untouched entries serialize back byte-for-byte, including the
//! original casing of the name. Lookups compare names ASCII
//! case-insensitively; the first match wins for `get`/`set`, every match is
//! affected by `remove`.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::ModelError;

const SEPARATOR: &str = ": ";
const CONTENT_TYPE: &str = "content-type";

/// An ordered list of `"Name: Value"` header lines.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HttpHeaders {
    entries: Vec<String>,
}

impl HttpHeaders {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from pre-formed `"Name: Value"` lines, taken verbatim.
    pub fn from_lines<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            entries: lines.into_iter().map(Into::into).collect(),
        }
    }

    /// Build from name/value pairs, in iteration order.
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        Self {
            entries: pairs
                .into_iter()
                .map(|(k, v)| join(k.as_ref(), v.as_ref()))
                .collect(),
        }
    }

    /// Parse a raw header block. Lines may end in `\r\n` or `\n`; blank
    /// lines are skipped.
    pub fn parse(raw: &str) -> Self {
        Self {
            entries: raw
                .lines()
                .map(|line| line.trim_end_matches('\r'))
                .filter(|line| !line.is_empty())
                .map(str::to_string)
                .collect(),
        }
    }

    /// Build from a loosely-typed JSON value: an array of lines, an array of
    /// `[name, value]` pairs, or an object of string values.
    pub fn from_value(value: &Value) -> Result<Self, ModelError> {
        match value {
            Value::Array(items) if items.iter().all(Value::is_string) => Ok(Self::from_lines(
                items.iter().filter_map(Value::as_str),
            )),
            other => {
                let pairs = pairs_from_value(other).ok_or(ModelError::UnsupportedShape("headers"))?;
                Ok(Self::from_pairs(pairs))
            }
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(String::as_str)
    }

    /// All header lines, in order.
    pub fn entries(&self) -> &[String] {
        &self.entries
    }

    /// The header line at `index`.
    pub fn entry(&self, index: usize) -> Option<&str> {
        self.entries.get(index).map(String::as_str)
    }

    /// Value of the first header named `name`, compared case-insensitively.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.index_of(name)
            .map(|i| &self.entries[i][name.len() + SEPARATOR.len()..])
    }

    /// Values of every header named `name`, in order.
    pub fn get_all(&self, name: &str) -> Vec<&str> {
        self.indexes_of(name)
            .into_iter()
            .map(|i| &self.entries[i][name.len() + SEPARATOR.len()..])
            .collect()
    }

    /// Replace the first header named `name` in place, or append one.
    /// An empty name is ignored.
    pub fn set(&mut self, name: &str, value: &str) {
        if name.is_empty() {
            return;
        }
        let line = join(name, value);
        match self.index_of(name) {
            Some(i) => self.entries[i] = line,
            None => self.entries.push(line),
        }
    }

    /// Append a header, keeping any existing ones with the same name.
    /// An empty name is ignored.
    pub fn add(&mut self, name: &str, value: &str) {
        if name.is_empty() {
            return;
        }
        self.entries.push(join(name, value));
    }

    /// Remove every header named `name`.
    pub fn remove(&mut self, name: &str) {
        self.entries.retain(|entry| !matches_name(entry, name));
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.entries.iter().position(|entry| matches_name(entry, name))
    }

    pub fn indexes_of(&self, name: &str) -> Vec<usize> {
        self.entries
            .iter()
            .enumerate()
            .filter(|(_, entry)| matches_name(entry, name))
            .map(|(i, _)| i)
            .collect()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Name to value map. Later duplicates overwrite earlier ones.
    pub fn to_map(&self) -> Map<String, Value> {
        let mut map = Map::new();
        for entry in &self.entries {
            let (name, value) = entry.split_once(SEPARATOR).unwrap_or((entry.as_str(), ""));
            map.insert(name.to_string(), Value::String(value.to_string()));
        }
        map
    }

    pub fn to_json(&self) -> String {
        Value::Object(self.to_map()).to_string()
    }

    /// Raw value of the `content-type` header.
    pub fn content_type(&self) -> Option<&str> {
        self.get(CONTENT_TYPE)
    }

    /// Base media type of the `content-type` header, parameters stripped and
    /// lowercased.
    pub fn mime(&self) -> Option<String> {
        self.content_type().map(|value| {
            value
                .split(';')
                .next()
                .unwrap_or_default()
                .trim()
                .to_ascii_lowercase()
        })
    }
}

impl fmt::Display for HttpHeaders {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for entry in &self.entries {
            writeln!(f, "{entry}")?;
        }
        Ok(())
    }
}

impl<'a> IntoIterator for &'a HttpHeaders {
    type Item = &'a String;
    type IntoIter = std::slice::Iter<'a, String>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

fn join(name: &str, value: &str) -> String {
    format!("{name}{SEPARATOR}{value}")
}

fn matches_name(entry: &str, name: &str) -> bool {
    entry
        .get(..name.len())
        .is_some_and(|head| head.eq_ignore_ascii_case(name))
        && entry[name.len()..].starts_with(SEPARATOR)
}

/// Interpret a JSON array of `[name, value]` string pairs or an object of
/// string values as an ordered list of pairs.
pub(crate) fn pairs_from_value(value: &Value) -> Option<Vec<(String, String)>> {
    match value {
        Value::Array(items) => items
            .iter()
            .map(|item| match item.as_array().map(Vec::as_slice) {
                Some([Value::String(k), Value::String(v)]) => Some((k.clone(), v.clone())),
                _ => None,
            })
            .collect(),
        Value::Object(map) => map
            .iter()
            .map(|(k, v)| v.as_str().map(|v| (k.clone(), v.to_string())))
            .collect(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> HttpHeaders {
        HttpHeaders::from_lines(["foo: bar", "abc: 123", "hello: world"])
    }

    #[test]
    fn get_is_case_insensitive() {
        let headers = sample();
        assert_eq!(headers.get("foo"), Some("bar"));
        assert_eq!(headers.get("FOO"), Some("bar"));
        assert_eq!(headers.get("Hello"), Some("world"));
        assert_eq!(headers.get("python"), None);
    }

    #[test]
    fn get_does_not_match_name_prefixes() {
        let headers = HttpHeaders::from_lines(["content-type: text/plain"]);
        assert_eq!(headers.get("content"), None);
        assert_eq!(headers.get("content-type"), Some("text/plain"));
    }

    #[test]
    fn set_replaces_first_match_in_place() {
        let mut headers = sample();
        headers.set("ABC", "456");
        assert_eq!(headers.entries(), ["foo: bar", "ABC: 456", "hello: world"]);
        assert_eq!(headers.get("abc"), Some("456"));
    }

    #[test]
    fn set_appends_when_absent() {
        let mut headers = sample();
        headers.set("python", "good");
        assert_eq!(headers.len(), 4);
        assert_eq!(headers.entry(3), Some("python: good"));
    }

    #[test]
    fn set_and_add_ignore_empty_names() {
        let mut headers = HttpHeaders::new();
        headers.set("", "x");
        headers.add("", "y");
        assert!(headers.is_empty());
    }

    #[test]
    fn add_keeps_duplicates() {
        let mut headers = sample();
        headers.add("foo", "good");
        assert_eq!(headers.get("foo"), Some("bar"));
        assert_eq!(headers.get_all("foo"), ["bar", "good"]);
        assert_eq!(headers.indexes_of("foo"), [0, 3]);
    }

    #[test]
    fn remove_deletes_every_match() {
        let mut headers = HttpHeaders::from_lines(["foo: bar", "abc: 123", "foo: good"]);
        headers.remove("foo");
        assert_eq!(headers.entries(), ["abc: 123"]);
    }

    #[test]
    fn index_of_reports_first_position() {
        let headers = sample();
        assert_eq!(headers.index_of("foo"), Some(0));
        assert_eq!(headers.index_of("hello"), Some(2));
        assert_eq!(headers.index_of("missing"), None);
    }

    #[test]
    fn clear_empties_collection() {
        let mut headers = sample();
        headers.clear();
        assert!(headers.is_empty());
    }

    #[test]
    fn from_pairs_joins_name_and_value() {
        let headers = HttpHeaders::from_pairs([("foo", "bar"), ("abc", "123")]);
        assert_eq!(headers.entries(), ["foo: bar", "abc: 123"]);
    }

    #[test]
    fn parse_splits_raw_block() {
        let headers = HttpHeaders::parse("foo: bar\r\nabc: 123\r\n\r\n");
        assert_eq!(headers.entries(), ["foo: bar", "abc: 123"]);
    }

    #[test]
    fn from_value_accepts_every_supported_shape() {
        let lines = HttpHeaders::from_value(&json!(["foo: bar", "abc: 123"])).unwrap();
        let pairs = HttpHeaders::from_value(&json!([["foo", "bar"], ["abc", "123"]])).unwrap();
        let map = HttpHeaders::from_value(&json!({"foo": "bar", "abc": "123"})).unwrap();
        assert_eq!(lines, pairs);
        assert_eq!(pairs, map);
    }

    #[test]
    fn from_value_rejects_unsupported_shapes() {
        for value in [json!({"foo": 1}), json!([["foo", 1]]), json!("foo: bar"), json!(null)] {
            let err = HttpHeaders::from_value(&value).unwrap_err();
            assert!(matches!(err, ModelError::UnsupportedShape("headers")));
        }
    }

    #[test]
    fn to_json_maps_names_to_values() {
        assert_eq!(
            sample().to_json(),
            r#"{"foo":"bar","abc":"123","hello":"world"}"#
        );
    }

    #[test]
    fn mime_strips_parameters() {
        let headers = HttpHeaders::from_lines(["Content-Type: Text/Plain; charset=utf-8"]);
        assert_eq!(headers.content_type(), Some("Text/Plain; charset=utf-8"));
        assert_eq!(headers.mime().as_deref(), Some("text/plain"));
        assert_eq!(HttpHeaders::new().mime(), None);
    }

    #[test]
    fn serializes_as_plain_lines() {
        let value = serde_json::to_value(sample()).unwrap();
        assert_eq!(value, json!(["foo: bar", "abc: 123", "hello: world"]));
    }
}
