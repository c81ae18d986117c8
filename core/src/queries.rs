//! Ordered, case-sensitive, multi-valued query parameter collection.
//!
//! # Design
//! Parameters are decoded once with `application/x-www-form-urlencoded`
//! rules (blank values kept, `+` read as a space). The raw query string they
//! came from is remembered: as long as nothing mutates the collection,
//! serialization echoes that string byte-for-byte, so untouched requests are
//! never re-encoded. After the first mutation the entries are re-encoded:
//! alphanumerics and `- . _ ~ * =` stay literal, a space becomes `+`,
//! everything else is percent-encoded. Hosts that sign the query string
//! compare these exact bytes.

use std::fmt;

use serde_json::{Map, Value};
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use url::form_urlencoded;

use crate::error::ModelError;
use crate::headers::pairs_from_value;

/// Bytes left unescaped when a mutated query is re-encoded.
const QUERY_SAFE: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~')
    .remove(b'*')
    .remove(b'=');

/// An ordered list of decoded `(name, value)` query parameters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HttpQueries {
    entries: Vec<(String, String)>,
    origin: Option<String>,
    modified: bool,
}

impl HttpQueries {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a raw query string (without the leading `?`).
    pub fn parse(query: &str) -> Self {
        let entries = form_urlencoded::parse(query.as_bytes())
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();
        Self {
            entries,
            origin: Some(query.to_string()),
            modified: false,
        }
    }

    /// Build from decoded name/value pairs, in iteration order.
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            entries: pairs.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
            origin: None,
            modified: false,
        }
    }

    /// Build from a loosely-typed JSON value: a raw query string, an array
    /// of `[name, value]` pairs, or an object of string values.
    pub fn from_value(value: &Value) -> Result<Self, ModelError> {
        if let Value::String(raw) = value {
            return Ok(Self::parse(raw));
        }
        pairs_from_value(value)
            .map(Self::from_pairs)
            .ok_or(ModelError::UnsupportedShape("query parameters"))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn entries(&self) -> &[(String, String)] {
        &self.entries
    }

    pub fn entry(&self, index: usize) -> Option<(&str, &str)> {
        self.entries.get(index).map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Value of the first parameter named exactly `name`.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.index_of(name).map(|i| self.entries[i].1.as_str())
    }

    pub fn get_all(&self, name: &str) -> Vec<&str> {
        self.entries
            .iter()
            .filter(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
            .collect()
    }

    /// Replace the first parameter named `name` in place, or append one.
    /// An empty name is ignored.
    pub fn set(&mut self, name: &str, value: &str) {
        if name.is_empty() {
            return;
        }
        let entry = (name.to_string(), value.to_string());
        match self.index_of(name) {
            Some(i) => self.entries[i] = entry,
            None => self.entries.push(entry),
        }
        self.modified = true;
    }

    /// Append a parameter, keeping existing ones with the same name.
    /// An empty name is ignored.
    pub fn add(&mut self, name: &str, value: &str) {
        if name.is_empty() {
            return;
        }
        self.entries.push((name.to_string(), value.to_string()));
        self.modified = true;
    }

    /// Remove every parameter named `name`.
    pub fn remove(&mut self, name: &str) {
        let before = self.entries.len();
        self.entries.retain(|(k, _)| k != name);
        if self.entries.len() != before {
            self.modified = true;
        }
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.entries.iter().position(|(k, _)| k == name)
    }

    pub fn indexes_of(&self, name: &str) -> Vec<usize> {
        self.entries
            .iter()
            .enumerate()
            .filter(|(_, (k, _))| k == name)
            .map(|(i, _)| i)
            .collect()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.modified = true;
    }

    /// Join every parameter into a query string. With `encode`, names and
    /// values are percent-encoded; without, they are joined raw.
    pub fn concat(&self, encode: bool) -> String {
        if encode {
            self.entries
                .iter()
                .map(|(k, v)| format!("{}={}", encode_component(k), encode_component(v)))
                .collect::<Vec<_>>()
                .join("&")
        } else {
            self.entries
                .iter()
                .map(|(k, v)| format!("{k}={v}"))
                .collect::<Vec<_>>()
                .join("&")
        }
    }

    /// The query string to put back on the wire: the original string when
    /// nothing changed since parsing, a fresh encoding otherwise.
    pub fn serialize(&self) -> String {
        match (&self.origin, self.modified) {
            (Some(origin), false) => origin.clone(),
            _ => self.concat(true),
        }
    }

    /// Name to value map. Later duplicates overwrite earlier ones.
    pub fn to_map(&self) -> Map<String, Value> {
        self.entries
            .iter()
            .map(|(k, v)| (k.clone(), Value::String(v.clone())))
            .collect()
    }

    pub fn to_json(&self) -> String {
        Value::Object(self.to_map()).to_string()
    }
}

/// Percent-encode one name or value, writing spaces as `+`.
fn encode_component(raw: &str) -> String {
    utf8_percent_encode(raw, QUERY_SAFE)
        .to_string()
        .replace("%20", "+")
}

impl fmt::Display for HttpQueries {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.serialize())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const RAW: &str = "foo=bar&abc=123&hello=world";

    #[test]
    fn parse_decodes_entries_in_order() {
        let queries = HttpQueries::parse(RAW);
        assert_eq!(queries.len(), 3);
        assert_eq!(queries.get("foo"), Some("bar"));
        assert_eq!(queries.get("abc"), Some("123"));
        assert_eq!(queries.get("hello"), Some("world"));
        assert_eq!(queries.get("python"), None);
        assert_eq!(queries.entry(1), Some(("abc", "123")));
    }

    #[test]
    fn parse_percent_decodes_values() {
        let queries = HttpQueries::parse("url=https%3A%2F%2Fexample.com");
        assert_eq!(queries.get("url"), Some("https://example.com"));
    }

    #[test]
    fn parse_keeps_blank_values() {
        let queries = HttpQueries::parse("foo");
        assert_eq!(queries.len(), 1);
        assert_eq!(queries.get("foo"), Some(""));
        assert!(HttpQueries::parse("").is_empty());
    }

    #[test]
    fn get_is_case_sensitive() {
        let queries = HttpQueries::parse(RAW);
        assert_eq!(queries.get("FOO"), None);
    }

    #[test]
    fn duplicates_resolve_to_first_match() {
        let queries = HttpQueries::parse("foo=bar&abc=123&hello=world&foo=good");
        assert_eq!(queries.index_of("foo"), Some(0));
        assert_eq!(queries.indexes_of("foo"), [0, 3]);
        assert_eq!(queries.get("foo"), Some("bar"));
        assert_eq!(queries.get_all("foo"), ["bar", "good"]);
    }

    #[test]
    fn set_updates_or_appends() {
        let mut queries = HttpQueries::parse(RAW);
        queries.set("foo", "example");
        assert_eq!(queries.get("foo"), Some("example"));
        assert_eq!(queries.len(), 3);
        queries.set("python", "good");
        assert_eq!(queries.len(), 4);
        assert_eq!(queries.entry(3), Some(("python", "good")));
    }

    #[test]
    fn add_and_remove() {
        let mut queries = HttpQueries::parse(RAW);
        queries.add("foo", "again");
        assert_eq!(queries.len(), 4);
        queries.remove("foo");
        assert_eq!(queries.get("foo"), None);
        assert_eq!(queries.len(), 2);
    }

    #[test]
    fn unmodified_queries_echo_original_string() {
        let raw = "b=%7e&a=x+y";
        assert_eq!(HttpQueries::parse(raw).serialize(), raw);
    }

    #[test]
    fn concat_encodes_unless_asked_not_to() {
        let queries = HttpQueries::parse("foo=bar&abc=123&url=https%3A%2F%2Fexample.com");
        assert_eq!(
            queries.concat(true),
            "foo=bar&abc=123&url=https%3A%2F%2Fexample.com"
        );
        assert_eq!(queries.concat(false), "foo=bar&abc=123&url=https://example.com");
    }

    #[test]
    fn mutation_switches_serialization_to_encoding() {
        let mut queries = HttpQueries::parse(RAW);
        queries.set("url", "https://example.com");
        assert_eq!(
            queries.serialize(),
            "foo=bar&abc=123&hello=world&url=https%3A%2F%2Fexample.com"
        );
    }

    #[test]
    fn encoding_keeps_asterisk_literal() {
        let queries = HttpQueries::from_pairs([("q", "a*b c")]);
        assert_eq!(queries.serialize(), "q=a*b+c");
    }

    #[test]
    fn encoding_keeps_equals_and_tilde_literal() {
        let mut queries = HttpQueries::parse("a=1");
        queries.set("sig", "k=v~x");
        assert_eq!(queries.serialize(), "a=1&sig=k=v~x");
    }

    #[test]
    fn encoding_escapes_reserved_and_non_ascii() {
        let queries = HttpQueries::from_pairs([("q", "a&b/c?d#e%f"), ("name", "é-._")]);
        assert_eq!(queries.concat(true), "q=a%26b%2Fc%3Fd%23e%25f&name=%C3%A9-._");
    }

    #[test]
    fn literal_percent_twenty_is_not_read_as_space() {
        let queries = HttpQueries::from_pairs([("q", "%20 x")]);
        assert_eq!(queries.concat(true), "q=%2520+x");
    }

    #[test]
    fn removing_missing_name_keeps_original_string() {
        let mut queries = HttpQueries::parse("a=%20");
        queries.remove("missing");
        assert_eq!(queries.serialize(), "a=%20");
    }

    #[test]
    fn clear_counts_as_mutation() {
        let mut queries = HttpQueries::parse(RAW);
        queries.clear();
        assert!(queries.is_empty());
        assert_eq!(queries.serialize(), "");
    }

    #[test]
    fn from_value_accepts_every_supported_shape() {
        let raw = HttpQueries::from_value(&json!("foo=bar&abc=123")).unwrap();
        let pairs = HttpQueries::from_value(&json!([["foo", "bar"], ["abc", "123"]])).unwrap();
        let map = HttpQueries::from_value(&json!({"foo": "bar", "abc": "123"})).unwrap();
        assert_eq!(raw.entries(), pairs.entries());
        assert_eq!(pairs.entries(), map.entries());
    }

    #[test]
    fn from_value_rejects_non_string_values() {
        let err = HttpQueries::from_value(&json!({"foo": "bar", "abc": 123})).unwrap_err();
        assert!(matches!(err, ModelError::UnsupportedShape(_)));
        let err = HttpQueries::from_value(&json!([["foo", "bar"], ["abc", 123]])).unwrap_err();
        assert!(matches!(err, ModelError::UnsupportedShape(_)));
    }

    #[test]
    fn to_json_maps_names_to_values() {
        assert_eq!(
            HttpQueries::parse(RAW).to_json(),
            r#"{"foo":"bar","abc":"123","hello":"world"}"#
        );
    }
}
