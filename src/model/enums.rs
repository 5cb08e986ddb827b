use serde::{Deserialize, Serialize};
use std::fmt;

/// Boolean operator applied uniformly to a whole condition list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BoolOp {
    And,
    Or,
}

impl BoolOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::And => "&",
            Self::Or => "|",
        }
    }
}

impl fmt::Display for BoolOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Case-sensitivity × literal-vs-regex combination for string criteria.
///
/// Without the `%` marker matching is case-insensitive, so the bare
/// keywords map to the `NoCase` variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MatchMode {
    LiteralNoCase,
    LiteralCase,
    RegexNoCase,
    RegexCase,
}

impl MatchMode {
    /// Keyword text without the `%` case marker.
    pub fn keyword(&self) -> &'static str {
        match self {
            Self::LiteralNoCase | Self::LiteralCase => "match",
            Self::RegexNoCase | Self::RegexCase => "regexp",
        }
    }

    pub fn from_keyword(kw: &str, case_sensitive: bool) -> Option<Self> {
        match (kw, case_sensitive) {
            ("match", false) => Some(Self::LiteralNoCase),
            ("match", true) => Some(Self::LiteralCase),
            ("regexp", false) => Some(Self::RegexNoCase),
            ("regexp", true) => Some(Self::RegexCase),
            _ => None,
        }
    }

    pub fn is_regex(&self) -> bool {
        matches!(self, Self::RegexNoCase | Self::RegexCase)
    }

    pub fn is_case_sensitive(&self) -> bool {
        matches!(self, Self::LiteralCase | Self::RegexCase)
    }
}

impl Default for MatchMode {
    fn default() -> Self {
        Self::LiteralNoCase
    }
}

impl fmt::Display for MatchMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_case_sensitive() {
            f.write_str("%")?;
        }
        f.write_str(self.keyword())
    }
}
