use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDateTime, Utc};
use spdlog::{debug, warn};

use crate::content::file_name::ContentFileName;
use crate::content::front_matter::get_text;
use crate::content::local_store::{LocalEntry, LocalStore};
use crate::content::BlogPostMeta;
use crate::language::{Language, DEFAULT_LANGUAGE};
use crate::routing::route_match::PostLookup;
use crate::text_utils::parse_post_date;

/// One language version of an article.
#[derive(Debug, Clone, PartialEq)]
pub struct TranslationVariant {
    pub language: Language,
    /// Slug used in this language's URL.
    pub slug: String,
    pub lastmod: Option<NaiveDateTime>,
}

/// All language versions of one logical article, keyed by the base file name
/// they share.
#[derive(Debug, Clone, PartialEq)]
pub struct TranslationGroup {
    pub base: String,
    pub variants: BTreeMap<Language, TranslationVariant>,
}

impl TranslationGroup {
    pub fn variant(&self, language: Language) -> Option<&TranslationVariant> {
        self.variants.get(&language)
    }

    /// Slug the `x-default` alternate points at.
    pub fn default_slug(&self) -> Option<&str> {
        self.variant(DEFAULT_LANGUAGE).map(|v| v.slug.as_str())
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TranslationIndex {
    groups: BTreeMap<String, TranslationGroup>,
}

fn variant_from_entry(entry: &LocalEntry) -> Option<TranslationVariant> {
    let title = get_text(&entry.front_matter, "title");
    let date = get_text(&entry.front_matter, "date");
    let (Some(_), Some(date)) = (title, date) else {
        warn!("Skipping {} from translations: missing title or date", entry.path.display());
        return None;
    };

    let lastmod = parse_post_date(&date)
        .ok()
        .or_else(|| entry.modified.map(|t| DateTime::<Utc>::from(t).naive_utc()));

    Some(TranslationVariant {
        language: entry.name.language,
        slug: entry.slug(),
        lastmod,
    })
}

impl TranslationIndex {
    /// Reads the frontmatter of every content file and groups the variants
    /// by base name. Unreadable files are left out.
    pub fn build(store: &LocalStore) -> TranslationIndex {
        let mut index = TranslationIndex::default();
        for entry in store.scan(None) {
            if let Some(variant) = variant_from_entry(&entry) {
                index.insert(&entry.name.base, variant);
            }
        }
        debug!("Translation index built with {} groups", index.groups.len());
        index
    }

    pub fn insert(&mut self, base: &str, variant: TranslationVariant) {
        let group = self.groups.entry(base.to_string()).or_insert_with(|| TranslationGroup {
            base: base.to_string(),
            variants: BTreeMap::new(),
        });
        group.variants.insert(variant.language, variant);
    }

    /// Adds a post read from another source. It replaces any variant with
    /// the same base name and language.
    pub fn insert_post(&mut self, name: &ContentFileName, meta: &BlogPostMeta) {
        self.insert(&name.base, TranslationVariant {
            language: name.language,
            slug: meta.slug.clone(),
            lastmod: Some(meta.published_at),
        });
    }

    pub fn groups(&self) -> impl Iterator<Item = &TranslationGroup> {
        self.groups.values()
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Group whose `language` variant is published under `slug`.
    pub fn find(&self, slug: &str, language: Language) -> Option<&TranslationGroup> {
        self.groups()
            .find(|group| group.variant(language).is_some_and(|v| v.slug == slug))
    }

    /// First group publishing `slug` in any language, Italian first.
    pub fn find_any(&self, slug: &str) -> Option<(&TranslationGroup, Language)> {
        Language::ALL.into_iter().find_map(|lang| self.find(slug, lang).map(|group| (group, lang)))
    }

    /// Every variant published in `language`, ordered by base name.
    pub fn variants_in(&self, language: Language) -> impl Iterator<Item = (&TranslationGroup, &TranslationVariant)> {
        self.groups()
            .filter_map(move |group| group.variant(language).map(|variant| (group, variant)))
    }
}

impl PostLookup for TranslationIndex {
    fn post_exists(&self, slug: &str, language: Language) -> bool {
        self.find(slug, language).is_some()
    }
}
