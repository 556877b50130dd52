use crate::language::Language;

pub const MDX_EXTENSION: &str = ".mdx";

/// A content file name decoded into its base slug and language.
///
/// `<base>.mdx` is Italian, `<base>.<lang>.mdx` is any other supported
/// language. Every place that maps between file names and posts goes
/// through this type.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ContentFileName {
    pub base: String,
    pub language: Language,
}

impl ContentFileName {
    pub fn new(base: &str, language: Language) -> Self {
        ContentFileName {
            base: base.to_string(),
            language,
        }
    }

    /// Decodes a file name. Returns `None` for hidden and backup files, for
    /// anything that is not `.mdx`, and for a two-letter suffix outside the
    /// supported languages (such a file belongs to no language).
    pub fn parse(file_name: &str) -> Option<ContentFileName> {
        if is_hidden(file_name) {
            return None;
        }

        let stem = file_name.strip_suffix(MDX_EXTENSION)?;
        let (base, language) = match split_language_suffix(stem) {
            Some((base, code)) => (base, Language::from_code(code)?),
            None => (stem, Language::It),
        };

        if base.is_empty() {
            return None;
        }

        Some(ContentFileName::new(base, language))
    }

    pub fn file_name(&self) -> String {
        if self.language.is_default() {
            format!("{}{}", self.base, MDX_EXTENSION)
        } else {
            format!("{}.{}{}", self.base, self.language.code(), MDX_EXTENSION)
        }
    }
}

pub fn is_hidden(file_name: &str) -> bool {
    file_name.starts_with('.') || file_name.starts_with('~')
}

/// A slug that can be turned into a file name without escaping the
/// content directory.
pub fn is_safe_slug(slug: &str) -> bool {
    !slug.is_empty()
        && !is_hidden(slug)
        && !slug.contains("..")
        && !slug.chars().any(|c| c == '/' || c == '\\' || c.is_control())
}

// `.xx` at the end of the stem, lowercase ASCII letters only
fn split_language_suffix(stem: &str) -> Option<(&str, &str)> {
    let dot = stem.len().checked_sub(3)?;
    if !stem.is_char_boundary(dot) || stem.as_bytes()[dot] != b'.' {
        return None;
    }
    let code = &stem[dot + 1..];
    if code.bytes().all(|b| b.is_ascii_lowercase()) {
        Some((&stem[..dot], code))
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_default_language() {
        let name = ContentFileName::parse("hello.mdx").unwrap();
        assert_eq!(name, ContentFileName::new("hello", Language::It));
    }

    #[test]
    fn test_parse_language_suffix() {
        let name = ContentFileName::parse("hello.en.mdx").unwrap();
        assert_eq!(name, ContentFileName::new("hello", Language::En));

        let name = ContentFileName::parse("aprire-partita-iva.de.mdx").unwrap();
        assert_eq!(name, ContentFileName::new("aprire-partita-iva", Language::De));
    }

    #[test]
    fn test_parse_skips_unwanted_files() {
        assert_eq!(ContentFileName::parse(".draft.mdx"), None);
        assert_eq!(ContentFileName::parse("~hello.mdx"), None);
        assert_eq!(ContentFileName::parse("hello.md"), None);
        assert_eq!(ContentFileName::parse("hello.mdx.bak"), None);
        assert_eq!(ContentFileName::parse(".mdx"), None);
        assert_eq!(ContentFileName::parse(".en.mdx"), None);
    }

    #[test]
    fn test_parse_unsupported_suffix() {
        assert_eq!(ContentFileName::parse("hello.pt.mdx"), None);
    }

    #[test]
    fn test_parse_non_language_dots() {
        // uppercase and one-letter segments are part of the slug
        let name = ContentFileName::parse("v1.2.mdx").unwrap();
        assert_eq!(name, ContentFileName::new("v1.2", Language::It));

        let name = ContentFileName::parse("guide.EN.mdx").unwrap();
        assert_eq!(name, ContentFileName::new("guide.EN", Language::It));
    }

    #[test]
    fn test_round_trip() {
        for lang in Language::ALL {
            let name = ContentFileName::new("regime-forfettario", lang);
            let file_name = name.file_name();
            assert_eq!(ContentFileName::parse(&file_name), Some(name));
        }
        assert_eq!(ContentFileName::new("x", Language::It).file_name(), "x.mdx");
        assert_eq!(ContentFileName::new("x", Language::Fr).file_name(), "x.fr.mdx");
    }

    #[test]
    fn test_is_safe_slug() {
        assert!(is_safe_slug("hello-world"));
        assert!(!is_safe_slug(""));
        assert!(!is_safe_slug("../etc/passwd"));
        assert!(!is_safe_slug("a/b"));
        assert!(!is_safe_slug(".hidden"));
    }
}
