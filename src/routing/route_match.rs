use lazy_static::lazy_static;
use regex::Regex;

use crate::language::{Language, DEFAULT_LANGUAGE};
use crate::routing::lang_path::{build_localized_path, normalize_path, strip_language_prefix};

/// Clean (unprefixed) paths of the fixed application pages.
pub const STATIC_ROUTES: [&str; 13] = [
    "/",
    "/services",
    "/services/open-company-italy",
    "/services/open-vat-number-italy",
    "/services/tax-accounting-expats",
    "/pillar/how-to-start-business-in-italy-2025",
    "/about",
    "/blog",
    "/contact",
    "/media",
    "/social",
    "/privacy-policy",
    "/cookie-policy",
];

const BLOG_PREFIX: &str = "/blog/";
const SERVICES_PREFIX: &str = "/services/";

/// Answers whether a post with this exact slug exists in a language.
pub trait PostLookup {
    fn post_exists(&self, slug: &str, language: Language) -> bool;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteMatch {
    Static { language: Language, path: String },
    BlogPost { language: Language, slug: String },
    /// Unprefixed `/blog/<slug>` or bare `/<slug>` whose post lives at `redirect_to`.
    LegacyBlog { slug: String, language: Language, redirect_to: String },
    /// Old `/services/<slug>` links, kept alive for backward compatibility.
    LegacyService { slug: String },
    NotFound,
}

impl RouteMatch {
    pub fn is_valid(&self) -> bool {
        !matches!(self, RouteMatch::NotFound)
    }

    pub fn status_code(&self) -> u16 {
        match self {
            RouteMatch::NotFound => 404,
            RouteMatch::LegacyBlog { .. } => 301,
            _ => 200,
        }
    }

    pub fn language(&self) -> Language {
        match self {
            RouteMatch::Static { language, .. } | RouteMatch::BlogPost { language, .. } => *language,
            _ => DEFAULT_LANGUAGE,
        }
    }
}

fn single_segment(path: &str) -> Option<&str> {
    Some(path).filter(|s| !s.is_empty() && !s.contains('/'))
}

fn find_language(slug: &str, posts: &dyn PostLookup) -> Option<Language> {
    Language::ALL.into_iter().find(|lang| posts.post_exists(slug, *lang))
}

fn legacy_redirect(slug: &str, posts: &dyn PostLookup) -> RouteMatch {
    match find_language(slug, posts) {
        Some(language) => RouteMatch::LegacyBlog {
            slug: slug.to_string(),
            language,
            redirect_to: build_localized_path(&format!("{}{}", BLOG_PREFIX, slug), language),
        },
        None => RouteMatch::NotFound,
    }
}

/// Classifies a request path. Content lookups go through `posts`, so an
/// unreadable content source simply makes blog paths invalid.
pub fn classify(raw_path: &str, posts: &dyn PostLookup) -> RouteMatch {
    let (prefix, clean) = strip_language_prefix(raw_path);
    let language = prefix.unwrap_or(DEFAULT_LANGUAGE);

    if STATIC_ROUTES.contains(&clean.as_str()) {
        return RouteMatch::Static { language, path: clean };
    }

    if let Some(slug) = clean.strip_prefix(BLOG_PREFIX).and_then(single_segment) {
        if posts.post_exists(slug, language) {
            return RouteMatch::BlogPost { language, slug: slug.to_string() };
        }
        return match prefix {
            Some(_) => RouteMatch::NotFound,
            None => legacy_redirect(slug, posts),
        };
    }

    if prefix.is_some() {
        return RouteMatch::NotFound;
    }

    if let Some(slug) = clean.strip_prefix(SERVICES_PREFIX).and_then(single_segment) {
        return RouteMatch::LegacyService { slug: slug.to_string() };
    }

    match clean.strip_prefix('/').and_then(single_segment) {
        Some(slug) => legacy_redirect(slug, posts),
        None => RouteMatch::NotFound,
    }
}

/// Blog paths ending in a doubled language tag such as `.en-en` or `.en.en`
/// are repaired by dropping the tag. Returns `None` for anything else.
pub fn repair_malformed_path(raw_path: &str) -> Option<String> {
    lazy_static! {
        static ref MALFORMED_REGEX: Regex = Regex::new(
            r"(?i)(/blog/.*?)(\.[a-z]{2}-[a-z]{2}|\.[a-z]{2}\.[a-z]{2})$"
        ).unwrap();
    }

    let path = normalize_path(raw_path);
    let caps = MALFORMED_REGEX.captures(&path)?;
    let suffix = caps.get(2)?;
    Some(path[..suffix.start()].to_string())
}
