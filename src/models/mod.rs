use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub mod availability;
pub mod product;

// Re-exports for convenience
pub use availability::*;
pub use product::*;

/// Vendor a provider URL belongs to. Each variant maps to exactly one extractor.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    Nike,
    Zalando,
}

impl ProviderKind {
    pub const ALL: [ProviderKind; 2] = [ProviderKind::Nike, ProviderKind::Zalando];

    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderKind::Nike => "nike",
            ProviderKind::Zalando => "zalando",
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unknown provider '{}'", s))
    }
}

/// What the tracker does with the very first observation of a watch.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum FirstPollPolicy {
    /// Initial state is "assumed unavailable": sizes already in stock alert immediately.
    #[default]
    Notify,
    /// The first observation only seeds state.
    Suppress,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TransitionKind {
    Restock,
    Sellout,
}

impl TransitionKind {
    pub fn from_edge(previously: bool, currently: bool) -> Option<Self> {
        match (previously, currently) {
            (false, true) => Some(TransitionKind::Restock),
            (true, false) => Some(TransitionKind::Sellout),
            _ => None,
        }
    }
}
