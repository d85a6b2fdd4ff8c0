//! Recognized polling organizations.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// The fixed set of pollsters whose polls are accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum PollsterName {
    /// FOX News.
    #[serde(rename = "FOX News")]
    FoxNews,
    /// The Economist / YouGov.
    #[serde(rename = "Economist/YouGov")]
    EconomistYouGov,
    /// The New York Times / Siena College.
    #[serde(rename = "NY Times/Siena")]
    NyTimesSiena,
}

impl PollsterName {
    /// Every recognized pollster.
    pub const ALL: [Self; 3] = [Self::FoxNews, Self::EconomistYouGov, Self::NyTimesSiena];

    /// Name as it appears in raw poll records.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::FoxNews => "FOX News",
            Self::EconomistYouGov => "Economist/YouGov",
            Self::NyTimesSiena => "NY Times/Siena",
        }
    }
}

impl fmt::Display for PollsterName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Raised when a raw pollster name is not in the recognized set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownPollster(pub String);

impl FromStr for PollsterName {
    type Err = UnknownPollster;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|name| name.as_str() == s.trim())
            .ok_or_else(|| UnknownPollster(s.to_string()))
    }
}

/// A polling organization.
///
/// Only identity for now; per-pollster house effects would hang off this type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Pollster {
    /// Which organization.
    pub name: PollsterName,
}

impl Pollster {
    /// Creates a pollster.
    #[must_use]
    pub const fn new(name: PollsterName) -> Self {
        Self { name }
    }
}

impl From<PollsterName> for Pollster {
    fn from(name: PollsterName) -> Self {
        Self::new(name)
    }
}
