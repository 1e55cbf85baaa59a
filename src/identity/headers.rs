//! Reading server-issued identifiers out of response headers.

use std::collections::HashMap;

use reqwest::header::HeaderMap;

use crate::ports::FetchResponse;

/// Guest id header names, preferred first.
pub const GUEST_ID_HEADERS: [&str; 2] = ["x-eco-guest-id", "x-guest-id"];
/// Session id header names, preferred first.
pub const SESSION_ID_HEADERS: [&str; 2] = ["x-eco-session-id", "x-session-id"];

/// Where headers can be read from.
#[derive(Debug, Clone, Copy)]
pub enum HeaderSource<'a> {
    /// A header map.
    Headers(&'a HeaderMap),
    /// The headers of a buffered response.
    Response(&'a FetchResponse),
    /// A plain name/value record with arbitrary key casing.
    Record(&'a HashMap<String, String>),
}

impl<'a> HeaderSource<'a> {
    /// Case-insensitive lookup of a single header.
    #[must_use]
    pub fn get(self, name: &str) -> Option<&'a str> {
        match self {
            Self::Headers(map) => from_header_map(map, name),
            Self::Response(response) => from_header_map(&response.headers, name),
            Self::Record(record) => from_record(record, name),
        }
    }

    /// First non-blank value among `aliases`, tried in order.
    #[must_use]
    pub fn first_of(self, aliases: &[&str]) -> Option<&'a str> {
        aliases
            .iter()
            .filter_map(|alias| self.get(alias))
            .map(str::trim)
            .find(|value| !value.is_empty())
    }
}

fn from_header_map<'a>(map: &'a HeaderMap, name: &str) -> Option<&'a str> {
    map.get(name.to_ascii_lowercase().as_str()).and_then(|value| value.to_str().ok())
}

fn from_record<'a>(record: &'a HashMap<String, String>, name: &str) -> Option<&'a str> {
    record
        .iter()
        .find(|(key, _)| key.eq_ignore_ascii_case(name))
        .map(|(_, value)| value.as_str())
}

impl<'a> From<&'a HeaderMap> for HeaderSource<'a> {
    fn from(map: &'a HeaderMap) -> Self {
        Self::Headers(map)
    }
}

impl<'a> From<&'a FetchResponse> for HeaderSource<'a> {
    fn from(response: &'a FetchResponse) -> Self {
        Self::Response(response)
    }
}

impl<'a> From<&'a HashMap<String, String>> for HeaderSource<'a> {
    fn from(record: &'a HashMap<String, String>) -> Self {
        Self::Record(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::HeaderValue;

    #[test]
    fn header_map_lookup_ignores_case() {
        let mut map = HeaderMap::new();
        map.insert("x-guest-id", HeaderValue::from_static("abc"));
        let source = HeaderSource::from(&map);
        assert_eq!(source.get("X-Guest-Id"), Some("abc"));
        assert_eq!(source.first_of(&GUEST_ID_HEADERS), Some("abc"));
    }

    #[test]
    fn preferred_alias_wins() {
        let mut response = FetchResponse::new(200, "");
        response.headers.insert("x-session-id", HeaderValue::from_static("legacy"));
        response.headers.insert("x-eco-session-id", HeaderValue::from_static("current"));
        assert_eq!(HeaderSource::from(&response).first_of(&SESSION_ID_HEADERS), Some("current"));
    }

    #[test]
    fn blank_values_fall_through_to_next_alias() {
        let record = HashMap::from([
            ("X-ECO-GUEST-ID".to_string(), "   ".to_string()),
            ("x-Guest-Id".to_string(), "fallback".to_string()),
        ]);
        assert_eq!(HeaderSource::from(&record).first_of(&GUEST_ID_HEADERS), Some("fallback"));
    }

    #[test]
    fn missing_headers_yield_none() {
        let record = HashMap::new();
        assert_eq!(HeaderSource::Record(&record).first_of(&GUEST_ID_HEADERS), None);
    }
}
