//! Whether a work session is currently open

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Activity {
    Active,
    #[default]
    Inactive,
}

impl Activity {
    /// Decide a backend punch-state label once, at the boundary.
    ///
    /// Matching is case-insensitive and ignores surrounding whitespace and
    /// repeated inner spaces. Unknown labels yield `None`.
    pub fn from_label(label: &str) -> Option<Self> {
        let normalized = label
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ")
            .to_ascii_uppercase();

        match normalized.as_str() {
            "PUNCHED IN" | "CHECKED IN" | "IN" | "ACTIVE" => Some(Self::Active),
            "PUNCHED OUT" | "CHECKED OUT" | "OUT" | "INACTIVE" => Some(Self::Inactive),
            _ => None,
        }
    }

    pub fn is_active(&self) -> bool {
        matches!(self, Self::Active)
    }
}

impl From<bool> for Activity {
    fn from(active: bool) -> Self {
        if active { Self::Active } else { Self::Inactive }
    }
}
