use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

/// Stock-keeping unit identifier.
///
/// Ordering is "natural": identifiers that are plain unsigned integers sort
/// numerically (`"2" < "10"`) and before any non-numeric identifier, which
/// sort lexically. Equal numeric values with different spellings (`"7"`,
/// `"007"`) fall back to the string so the order stays total.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SkuId(pub String);

impl SkuId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    fn numeric(&self) -> Option<u64> {
        self.0.parse().ok()
    }
}

impl Ord for SkuId {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self.numeric(), other.numeric()) {
            (Some(a), Some(b)) => a.cmp(&b).then_with(|| self.0.cmp(&other.0)),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => self.0.cmp(&other.0),
        }
    }
}

impl PartialOrd for SkuId {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for SkuId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for SkuId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for SkuId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl From<u64> for SkuId {
    fn from(id: u64) -> Self {
        Self(id.to_string())
    }
}
