//! Identifier validation and canonicalization.

use std::fmt;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use serde_json::Value;
use uuid::Uuid;

static UUID_V4: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^[0-9a-f]{8}-[0-9a-f]{4}-4[0-9a-f]{3}-[89ab][0-9a-f]{3}-[0-9a-f]{12}$")
        .expect("uuid v4 pattern is valid")
});

/// A canonical, lowercase UUID v4 string.
///
/// Only obtainable through [`normalize`], [`normalize_value`] or
/// [`Identifier::random`], so holding one means it is valid.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct Identifier(String);

impl Identifier {
    /// A fresh random identifier from the `uuid` crate.
    #[must_use]
    pub fn random() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// The canonical string form.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Identifier {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<Identifier> for String {
    fn from(id: Identifier) -> Self {
        id.0
    }
}

/// Trims `candidate` and accepts it if it is a UUID v4 in any letter case.
#[must_use]
pub fn normalize(candidate: &str) -> Option<Identifier> {
    let trimmed = candidate.trim();
    UUID_V4.is_match(trimmed).then(|| Identifier(trimmed.to_ascii_lowercase()))
}

/// [`normalize`] for untyped input: anything but a JSON string is rejected.
#[must_use]
pub fn normalize_value(candidate: &Value) -> Option<Identifier> {
    candidate.as_str().and_then(normalize)
}
