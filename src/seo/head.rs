use std::io;
use std::io::ErrorKind;

use lazy_static::lazy_static;
use ramhorns::Template;
use regex::{Captures, Regex};

use crate::language::{Language, DEFAULT_LANGUAGE};
use crate::routing::lang_path::{build_localized_path, strip_language_prefix};
use crate::seo::translations::{TranslationGroup, TranslationIndex};

pub const X_DEFAULT: &str = "x-default";

const HEAD_TEMPLATE: &str = r#"<link rel="canonical" href="{{canonical}}" />
{{#alternates}}<link rel="alternate" hreflang="{{hreflang}}" href="{{href}}" />
{{/alternates}}"#;

#[derive(Debug, Clone, PartialEq, ramhorns::Content)]
pub struct AlternateLink {
    pub hreflang: String,
    pub href: String,
}

#[derive(Debug, Clone, PartialEq, ramhorns::Content)]
pub struct HeadTags {
    pub canonical: String,
    pub alternates: Vec<AlternateLink>,
}

impl HeadTags {
    pub fn alternate(&self, hreflang: &str) -> Option<&str> {
        self.alternates.iter().find(|a| a.hreflang == hreflang).map(|a| a.href.as_str())
    }
}

fn absolute(base_url: &str, path: &str) -> String {
    format!("{}{}", base_url, path)
}

fn blog_path(slug: &str, language: Language) -> String {
    build_localized_path(&format!("/blog/{}", slug), language)
}

fn page_tags(base_url: &str, clean_path: &str) -> HeadTags {
    let canonical = absolute(base_url, clean_path);
    let mut alternates: Vec<AlternateLink> = Language::ALL
        .into_iter()
        .map(|lang| AlternateLink {
            hreflang: lang.code().to_string(),
            href: absolute(base_url, &build_localized_path(clean_path, lang)),
        })
        .collect();
    alternates.push(AlternateLink {
        hreflang: X_DEFAULT.to_string(),
        href: canonical.clone(),
    });

    HeadTags { canonical, alternates }
}

fn post_tags(base_url: &str, slug: &str, language: Language, group: Option<&TranslationGroup>) -> HeadTags {
    let mut alternates = vec![];
    let default_target = match group {
        Some(group) => {
            for variant in group.variants.values() {
                alternates.push(AlternateLink {
                    hreflang: variant.language.code().to_string(),
                    href: absolute(base_url, &blog_path(&variant.slug, variant.language)),
                });
            }
            match group.default_slug() {
                Some(default_slug) => blog_path(default_slug, DEFAULT_LANGUAGE),
                None => blog_path(slug, language),
            }
        }
        None => {
            alternates.push(AlternateLink {
                hreflang: language.code().to_string(),
                href: absolute(base_url, &blog_path(slug, language)),
            });
            blog_path(slug, language)
        }
    };

    let canonical = absolute(base_url, &default_target);
    alternates.push(AlternateLink {
        hreflang: X_DEFAULT.to_string(),
        href: canonical.clone(),
    });

    HeadTags { canonical, alternates }
}

/// Canonical and hreflang links for a request path.
///
/// Pages get one alternate per language for the same logical path. Blog
/// posts get one alternate per translation that exists, each with its own
/// slug, and point `x-default` and the canonical at the Italian variant.
/// Without one they point at the requested post itself.
pub fn head_tags(base_url: &str, path: &str, index: &TranslationIndex) -> HeadTags {
    let (prefix, clean) = strip_language_prefix(path);
    let language = prefix.unwrap_or(DEFAULT_LANGUAGE);

    let slug = clean.strip_prefix("/blog/").filter(|s| !s.is_empty() && !s.contains('/'));
    match slug {
        Some(slug) => {
            let group = index
                .find(slug, language)
                .or_else(|| index.find_any(slug).map(|(group, _)| group));
            post_tags(base_url, slug, language, group)
        }
        None => page_tags(base_url, &clean),
    }
}

pub fn render_head_tags(tags: &HeadTags) -> io::Result<String> {
    let template = match Template::new(HEAD_TEMPLATE) {
        Ok(x) => x,
        Err(e) => return Err(io::Error::new(ErrorKind::InvalidInput, format!("Error parsing head template: {}", e))),
    };
    Ok(template.render(tags))
}

/// Drops the shell's own canonical and hreflang links and inserts `rendered`
/// right before `</head>`. Other `<link>` tags are kept.
pub fn inject_head(html: &str, rendered: &str) -> String {
    lazy_static! {
        static ref LINK_REGEX: Regex = Regex::new(r"(?is)<link\b[^>]*>\s*").unwrap();
        static ref REL_REGEX: Regex = Regex::new(r#"(?i)\brel\s*=\s*["']?(canonical|alternate)\b"#).unwrap();
    }

    let cleaned = LINK_REGEX.replace_all(html, |caps: &Captures| {
        let tag = &caps[0];
        let seo_link = match REL_REGEX.captures(tag) {
            Some(rel) if rel[1].eq_ignore_ascii_case("canonical") => true,
            Some(_) => tag.to_ascii_lowercase().contains("hreflang"),
            None => false,
        };
        if seo_link { String::new() } else { tag.to_string() }
    });

    match cleaned.rfind("</head>") {
        Some(pos) => format!("{}{}{}", &cleaned[..pos], rendered, &cleaned[pos..]),
        None => cleaned.into_owned(),
    }
}
