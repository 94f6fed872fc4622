//! Salutation extraction and title categories

use crate::error::{PipelineError, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Pattern locating the salutation: a non-space character, one space, then a word.
/// For "Braund, Mr. Owen Harris" the first match is ", Mr".
const SALUTATION_PATTERN: &str = r"(?:\S )(?P<title>\w*)";

/// Social category derived from a passenger's salutation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Title {
    Adult,
    Child,
    Gentry,
    Military,
    Miss,
    Other,
}

impl Title {
    /// Every category, in the order the fixed encoder vocabulary is declared
    pub const VOCABULARY: [Title; 6] = [
        Title::Adult,
        Title::Gentry,
        Title::Miss,
        Title::Military,
        Title::Other,
        Title::Child,
    ];

    /// Map a salutation token to its category; unknown tokens are `Other`
    pub fn from_salutation(token: &str) -> Self {
        match token {
            "Mr" | "Mme" | "Mrs" => Title::Adult,
            "Don" | "Dona" | "Lady" | "Sir" | "Jonkheer" | "the Countess" => Title::Gentry,
            "Miss" | "Mlle" | "Ms" => Title::Miss,
            "Col" | "Captain" | "Major" => Title::Military,
            "Master" => Title::Child,
            "Rev" | "Dr" => Title::Other,
            _ => Title::Other,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Title::Adult => "adult",
            Title::Child => "child",
            Title::Gentry => "gentry",
            Title::Military => "military",
            Title::Miss => "miss",
            Title::Other => "other",
        }
    }
}

impl fmt::Display for Title {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Extracts salutation tokens from passenger names
#[derive(Debug, Clone)]
pub struct TitleExtractor {
    pattern: Regex,
}

impl Default for TitleExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl TitleExtractor {
    pub fn new() -> Self {
        Self {
            pattern: Regex::new(SALUTATION_PATTERN).unwrap(),
        }
    }

    /// The raw salutation token, e.g. "Mr" for "Braund, Mr. Owen Harris"
    pub fn salutation<'a>(&self, name: &'a str) -> Result<&'a str> {
        self.pattern
            .captures(name)
            .and_then(|caps| caps.name("title"))
            .map(|m| m.as_str())
            .ok_or_else(|| PipelineError::TitleNotFound(name.to_string()))
    }

    /// Derive the title category for a full name
    pub fn derive_title(&self, name: &str) -> Result<Title> {
        self.salutation(name).map(Title::from_salutation)
    }
}
