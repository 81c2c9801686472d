/// Vulnerability taxonomy and the ordered rule table that assigns it.
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Closed vulnerability taxonomy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Category {
    Injection,
    #[serde(rename = "XSS")]
    Xss,
    Authentication,
    #[serde(rename = "File_Handling")]
    FileHandling,
    Configuration,
    Other,
}

impl Category {
    /// All categories in taxonomy order.
    pub const ALL: [Self; 6] = [
        Self::Injection,
        Self::Xss,
        Self::Authentication,
        Self::FileHandling,
        Self::Configuration,
        Self::Other,
    ];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Injection => "Injection",
            Self::Xss => "XSS",
            Self::Authentication => "Authentication",
            Self::FileHandling => "File_Handling",
            Self::Configuration => "Configuration",
            Self::Other => "Other",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| format!("unknown category: {s}"))
    }
}

/// Rules are evaluated top to bottom; the first term set with a hit wins.
/// The order is part of the contract: reordering reclassifies ambiguous labels.
const RULES: &[(&[&str], Category)] = &[
    (&["sql", "injection", "command"], Category::Injection),
    (&["xss", "cross-site"], Category::Xss),
    (&["auth", "session", "token"], Category::Authentication),
    (&["file", "upload", "path"], Category::FileHandling),
    (&["config", "cord", "cors", "header"], Category::Configuration),
];

/// Map a free-text vulnerability label to its category.
#[must_use]
pub fn categorize(label: &str) -> Category {
    let label = label.to_lowercase();
    RULES
        .iter()
        .find(|(terms, _)| terms.iter().any(|t| label.contains(t)))
        .map_or(Category::Other, |&(_, category)| category)
}

/// Like [`categorize`], but for untyped input: non-strings map to `Other`.
#[must_use]
pub fn categorize_value(label: &serde_json::Value) -> Category {
    label.as_str().map_or(Category::Other, categorize)
}
