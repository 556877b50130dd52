use std::fmt;
use std::fmt::{Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Languages the site is published in. Italian is the implicit default:
/// its files carry no suffix and its URLs carry no prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    It,
    En,
    Fr,
    De,
    Es,
}

pub const DEFAULT_LANGUAGE: Language = Language::It;

impl Language {
    pub const ALL: [Language; 5] = [Language::It, Language::En, Language::Fr, Language::De, Language::Es];

    pub fn code(&self) -> &'static str {
        match self {
            Language::It => "it",
            Language::En => "en",
            Language::Fr => "fr",
            Language::De => "de",
            Language::Es => "es",
        }
    }

    pub fn is_default(&self) -> bool {
        *self == DEFAULT_LANGUAGE
    }

    /// Case-insensitive lookup, `None` for anything outside the supported set.
    pub fn from_code(code: &str) -> Option<Language> {
        let code = code.trim().to_ascii_lowercase();
        Language::ALL.into_iter().find(|lang| lang.code() == code)
    }
}

impl Default for Language {
    fn default() -> Self {
        DEFAULT_LANGUAGE
    }
}

impl Display for Language {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

impl FromStr for Language {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Language::from_code(s).ok_or_else(|| format!("Unsupported language: {}", s))
    }
}
