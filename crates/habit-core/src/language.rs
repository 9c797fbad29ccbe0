//! Supported user languages.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A user's language preference. Stored as its lowercase name.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    English,
    Arabic,
}

impl Language {
    /// All supported languages, English first.
    pub const ALL: [Language; 2] = [Language::English, Language::Arabic];

    /// Lowercase name used in storage, bundle file names, and callback data.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::English => "english",
            Self::Arabic => "arabic",
        }
    }

    /// Parse a stored or user-supplied code, falling back to English.
    pub fn from_code_or_default(code: &str) -> Self {
        code.parse().unwrap_or_default()
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Language {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "english" | "en" => Ok(Self::English),
            "arabic" | "ar" => Ok(Self::Arabic),
            other => Err(format!("unsupported language '{other}'")),
        }
    }
}
