//! Identifier case-sensitivity policy

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CaseSensitivity {
    Sensitive,
    Insensitive,
}

impl CaseSensitivity {
    #[inline]
    pub fn is_sensitive(self) -> bool {
        self == CaseSensitivity::Sensitive
    }
}

/// Case policy per identifier class, read whenever an entry compiles its
/// patterns. Defaults follow MySQL on a case-sensitive filesystem.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PrivConfig {
    pub host: CaseSensitivity,
    pub database: CaseSensitivity,
    pub table: CaseSensitivity,
}

impl Default for PrivConfig {
    fn default() -> Self {
        PrivConfig {
            host: CaseSensitivity::Insensitive,
            database: CaseSensitivity::Sensitive,
            table: CaseSensitivity::Sensitive,
        }
    }
}

impl PrivConfig {
    /// Every identifier class compared case-insensitively
    pub fn case_insensitive() -> Self {
        PrivConfig {
            host: CaseSensitivity::Insensitive,
            database: CaseSensitivity::Insensitive,
            table: CaseSensitivity::Insensitive,
        }
    }
}
