use std::collections::HashMap;

use crate::language::{Language, DEFAULT_LANGUAGE};

#[derive(PartialEq, Debug)]
pub struct QueryString {
    items: HashMap<String, String>,
}

impl QueryString {
    pub fn from(buf: &str) -> Self {
        let vs: Vec<(String, String)> = serde_urlencoded::from_str(buf).unwrap_or_else(|_| vec![]);
        let items: HashMap<String, String> = vs.into_iter().collect();

        QueryString {
            items,
        }
    }

    /// `lang` parameter; absent or empty means the default language.
    pub fn get_lang(&self) -> Result<Language, String> {
        match self.items.get("lang").map(|s| s.trim()) {
            None | Some("") => Ok(DEFAULT_LANGUAGE),
            Some(code) => Language::from_code(code).ok_or_else(|| format!("Unsupported language: {}", code)),
        }
    }

    pub fn get_slug(&self) -> Option<&str> {
        self.items.get("slug").map(|s| s.trim()).filter(|s| !s.is_empty())
    }
}
