use std::io::{Cursor, ErrorKind};
use std::path::{Path, PathBuf};
use std::{fs, io};

use chrono::NaiveDate;
use quick_xml::escape::escape;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;
use spdlog::{info, warn};

use crate::language::{Language, DEFAULT_LANGUAGE};
use crate::routing::lang_path::build_localized_path;
use crate::routing::route_match::STATIC_ROUTES;
use crate::seo::head::{AlternateLink, X_DEFAULT};
use crate::seo::translations::{TranslationGroup, TranslationIndex};
use crate::text_utils::format_sitemap_date;

const SITEMAP_NS: &str = "http://www.sitemaps.org/schemas/sitemap/0.9";
const XHTML_NS: &str = "http://www.w3.org/1999/xhtml";
const URLSET_END: &str = "</urlset>";

pub const POST_CHANGEFREQ: &str = "weekly";
pub const POST_PRIORITY: &str = "0.8";

#[derive(Debug, Clone, PartialEq)]
pub struct SitemapEntry {
    pub loc: String,
    pub lastmod: String,
    pub changefreq: &'static str,
    pub priority: &'static str,
    pub alternates: Vec<AlternateLink>,
}

/// Change frequency and priority of a static route.
pub fn route_policy(clean_path: &str) -> (&'static str, &'static str) {
    match clean_path {
        "/" => ("weekly", "1.0"),
        "/blog" => ("daily", "0.9"),
        "/privacy-policy" | "/cookie-policy" => ("yearly", "0.3"),
        p if p == "/services" || p.starts_with("/services/") || p.starts_with("/pillar/") => ("monthly", "0.8"),
        _ => ("monthly", "0.7"),
    }
}

fn post_path(slug: &str, language: Language) -> String {
    build_localized_path(&format!("/blog/{}", slug), language)
}

fn static_alternates(base_url: &str, clean_path: &str) -> Vec<AlternateLink> {
    let mut alternates: Vec<AlternateLink> = Language::ALL
        .into_iter()
        .map(|lang| AlternateLink {
            hreflang: lang.code().to_string(),
            href: format!("{}{}", base_url, build_localized_path(clean_path, lang)),
        })
        .collect();
    alternates.push(AlternateLink {
        hreflang: X_DEFAULT.to_string(),
        href: format!("{}{}", base_url, clean_path),
    });
    alternates
}

fn group_alternates(base_url: &str, group: &TranslationGroup, default_slug: &str) -> Vec<AlternateLink> {
    let mut alternates: Vec<AlternateLink> = group
        .variants
        .values()
        .map(|variant| AlternateLink {
            hreflang: variant.language.code().to_string(),
            href: format!("{}{}", base_url, post_path(&variant.slug, variant.language)),
        })
        .collect();
    alternates.push(AlternateLink {
        hreflang: X_DEFAULT.to_string(),
        href: format!("{}{}", base_url, post_path(default_slug, DEFAULT_LANGUAGE)),
    });
    alternates
}

/// Static routes and posts of one language, without alternates.
pub fn language_sitemap_entries(base_url: &str, language: Language, index: &TranslationIndex, today: NaiveDate) -> Vec<SitemapEntry> {
    let today = today.format("%Y-%m-%d").to_string();
    let mut entries = vec![];

    for route in STATIC_ROUTES {
        let (changefreq, priority) = route_policy(route);
        entries.push(SitemapEntry {
            loc: format!("{}{}", base_url, build_localized_path(route, language)),
            lastmod: today.clone(),
            changefreq,
            priority,
            alternates: vec![],
        });
    }

    for (_, variant) in index.variants_in(language) {
        entries.push(SitemapEntry {
            loc: format!("{}{}", base_url, post_path(&variant.slug, language)),
            lastmod: variant.lastmod.as_ref().map(format_sitemap_date).unwrap_or_else(|| today.clone()),
            changefreq: POST_CHANGEFREQ,
            priority: POST_PRIORITY,
            alternates: vec![],
        });
    }

    entries
}

/// Italian URLs only, each carrying its hreflang alternates.
pub fn master_sitemap_entries(base_url: &str, index: &TranslationIndex, today: NaiveDate) -> Vec<SitemapEntry> {
    let today = today.format("%Y-%m-%d").to_string();
    let mut entries = vec![];

    for route in STATIC_ROUTES {
        let (changefreq, priority) = route_policy(route);
        entries.push(SitemapEntry {
            loc: format!("{}{}", base_url, route),
            lastmod: today.clone(),
            changefreq,
            priority,
            alternates: static_alternates(base_url, route),
        });
    }

    for (group, variant) in index.variants_in(DEFAULT_LANGUAGE) {
        entries.push(SitemapEntry {
            loc: format!("{}{}", base_url, post_path(&variant.slug, DEFAULT_LANGUAGE)),
            lastmod: variant.lastmod.as_ref().map(format_sitemap_date).unwrap_or_else(|| today.clone()),
            changefreq: POST_CHANGEFREQ,
            priority: POST_PRIORITY,
            alternates: group_alternates(base_url, group, &variant.slug),
        });
    }

    entries
}

pub fn render_sitemap(entries: &[SitemapEntry], with_xhtml: bool) -> quick_xml::Result<Vec<u8>> {
    let mut writer = Writer::new_with_indent(Cursor::new(Vec::new()), b' ', 2);

    let decl = Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None));
    writer.write_event(decl)?;

    let mut urlset = BytesStart::new("urlset");
    urlset.push_attribute(("xmlns", SITEMAP_NS));
    if with_xhtml {
        urlset.push_attribute(("xmlns:xhtml", XHTML_NS));
    }
    writer.write_event(Event::Start(urlset))?;

    for entry in entries {
        writer.write_event(Event::Start(BytesStart::new("url")))?;
        push_text(&mut writer, "loc", &entry.loc)?;
        push_text(&mut writer, "lastmod", &entry.lastmod)?;
        push_text(&mut writer, "changefreq", entry.changefreq)?;
        push_text(&mut writer, "priority", entry.priority)?;

        if with_xhtml {
            for alternate in entry.alternates.iter() {
                let mut link = BytesStart::new("xhtml:link");
                link.push_attribute(("rel", "alternate"));
                link.push_attribute(("hreflang", alternate.hreflang.as_str()));
                link.push_attribute(("href", alternate.href.as_str()));
                writer.write_event(Event::Empty(link))?;
            }
        }

        writer.write_event(Event::End(BytesEnd::new("url")))?;
    }

    writer.write_event(Event::End(BytesEnd::new("urlset")))?;

    Ok(writer.into_inner().into_inner())
}

fn push_text(writer: &mut Writer<Cursor<Vec<u8>>>, tag: &str, text: &str) -> quick_xml::Result<()> {
    writer.write_event(Event::Start(BytesStart::new(tag)))?;
    writer.write_event(Event::Text(BytesText::new(text)))?;
    writer.write_event(Event::End(BytesEnd::new(tag)))?;
    Ok(())
}

/// `sitemap.xml` for the master file, `sitemap-<lang>.xml` otherwise.
pub fn sitemap_file_name(language: Option<Language>) -> String {
    match language {
        Some(lang) => format!("sitemap-{}.xml", lang.code()),
        None => "sitemap.xml".to_string(),
    }
}

fn write_sitemap(path: &Path, entries: &[SitemapEntry], with_xhtml: bool) -> io::Result<()> {
    let xml = match render_sitemap(entries, with_xhtml) {
        Ok(xml) => xml,
        Err(e) => return Err(io::Error::new(ErrorKind::InvalidData, format!("Error rendering sitemap: {}", e))),
    };
    fs::write(path, xml)
}

/// Writes the master sitemap and one per language into `out_dir`.
pub fn write_all_sitemaps(out_dir: &Path, base_url: &str, index: &TranslationIndex, today: NaiveDate) -> io::Result<Vec<PathBuf>> {
    fs::create_dir_all(out_dir)?;
    let mut written = vec![];

    let master = out_dir.join(sitemap_file_name(None));
    write_sitemap(&master, &master_sitemap_entries(base_url, index, today), true)?;
    written.push(master);

    for lang in Language::ALL {
        let path = out_dir.join(sitemap_file_name(Some(lang)));
        write_sitemap(&path, &language_sitemap_entries(base_url, lang, index, today), false)?;
        written.push(path);
    }

    info!("Wrote {} sitemaps to {}", written.len(), out_dir.display());
    Ok(written)
}

/// Adds one post URL to an existing sitemap. Returns `Ok(false)` without
/// touching anything when the file is missing or already lists `loc`.
pub fn append_post(sitemap: &Path, loc: &str, lastmod: &str) -> io::Result<bool> {
    let content = match fs::read_to_string(sitemap) {
        Ok(content) => content,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            warn!("Sitemap {} not found, skipping update", sitemap.display());
            return Ok(false);
        }
        Err(e) => return Err(e),
    };

    let loc = escape(loc);
    if content.contains(&format!("<loc>{}</loc>", loc)) {
        return Ok(false);
    }

    let Some(pos) = content.rfind(URLSET_END) else {
        return Err(io::Error::new(ErrorKind::InvalidData, format!("{} has no closing urlset", sitemap.display())));
    };

    let entry = format!(
        "  <url>\n    <loc>{}</loc>\n    <lastmod>{}</lastmod>\n    <changefreq>{}</changefreq>\n    <priority>{}</priority>\n  </url>\n",
        loc, lastmod, POST_CHANGEFREQ, POST_PRIORITY
    );
    let updated = format!("{}{}{}", &content[..pos], entry, &content[pos..]);
    fs::write(sitemap, updated)?;
    Ok(true)
}

#[cfg(test)]
mod tests {
    use std::str;

    use crate::seo::translations::tests::promo_index;

    use super::*;

    const BASE: &str = "https://example.com";

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 7, 1).unwrap()
    }

    #[test]
    fn test_route_policy() {
        assert_eq!(route_policy("/"), ("weekly", "1.0"));
        assert_eq!(route_policy("/blog"), ("daily", "0.9"));
        assert_eq!(route_policy("/services/open-company-italy"), ("monthly", "0.8"));
        assert_eq!(route_policy("/pillar/how-to-start-business-in-italy-2025"), ("monthly", "0.8"));
        assert_eq!(route_policy("/contact"), ("monthly", "0.7"));
        assert_eq!(route_policy("/cookie-policy"), ("yearly", "0.3"));
    }

    #[test]
    fn test_language_entries() {
        let (_dir, index) = promo_index();
        let entries = language_sitemap_entries(BASE, Language::En, &index, today());

        assert_eq!(entries.len(), STATIC_ROUTES.len() + 2);
        assert_eq!(entries[0].loc, "https://example.com/en");
        assert!(entries.iter().any(|e| e.loc == "https://example.com/en/services"));

        let promo = entries.iter().find(|e| e.loc == "https://example.com/en/blog/special-promo").unwrap();
        assert_eq!(promo.lastmod, "2024-04-11");
        assert_eq!(promo.changefreq, POST_CHANGEFREQ);
    }

    #[test]
    fn test_master_entries_carry_alternates() {
        let (_dir, index) = promo_index();
        let entries = master_sitemap_entries(BASE, &index, today());

        assert!(entries.iter().all(|e| !e.loc.contains("/en/")));
        let promo = entries.iter().find(|e| e.loc == "https://example.com/blog/promo").unwrap();
        let hreflangs: Vec<&str> = promo.alternates.iter().map(|a| a.hreflang.as_str()).collect();
        assert_eq!(hreflangs, vec!["it", "en", X_DEFAULT]);
        assert_eq!(promo.alternates[1].href, "https://example.com/en/blog/special-promo");

        assert!(!entries.iter().any(|e| e.loc.ends_with("/solo")));
        assert_eq!(entries[0].alternates.len(), Language::ALL.len() + 1);
    }

    #[test]
    fn test_render_sitemap() {
        let entries = vec![SitemapEntry {
            loc: "https://example.com/blog/a&b".to_string(),
            lastmod: "2024-01-01".to_string(),
            changefreq: "weekly",
            priority: "0.8",
            alternates: vec![AlternateLink { hreflang: "en".to_string(), href: "https://example.com/en/blog/a".to_string() }],
        }];

        let xml = render_sitemap(&entries, true).unwrap();
        let xml = str::from_utf8(&xml).unwrap();
        assert!(xml.starts_with(r#"<?xml version="1.0" encoding="UTF-8"?>"#));
        assert!(xml.contains(r#"xmlns:xhtml="http://www.w3.org/1999/xhtml""#));
        assert!(xml.contains("<loc>https://example.com/blog/a&amp;b</loc>"));
        assert!(xml.contains(r#"<xhtml:link rel="alternate" hreflang="en" href="https://example.com/en/blog/a"/>"#));

        let plain = render_sitemap(&entries, false).unwrap();
        assert!(!str::from_utf8(&plain).unwrap().contains("xhtml"));
    }

    #[test]
    fn test_empty_index_still_lists_static_routes() {
        let dir = tempfile::tempdir().unwrap();
        let written = write_all_sitemaps(dir.path(), BASE, &TranslationIndex::default(), today()).unwrap();
        assert_eq!(written.len(), 6);

        let master = fs::read_to_string(dir.path().join("sitemap.xml")).unwrap();
        assert_eq!(master.matches("<url>").count(), STATIC_ROUTES.len());
        assert!(dir.path().join("sitemap-it.xml").is_file());
        assert!(dir.path().join("sitemap-es.xml").is_file());
    }

    #[test]
    fn test_append_post_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        write_all_sitemaps(dir.path(), BASE, &TranslationIndex::default(), today()).unwrap();
        let path = dir.path().join("sitemap-en.xml");
        let loc = "https://example.com/en/blog/new-post";

        assert!(append_post(&path, loc, "2024-07-02").unwrap());
        let once = fs::read_to_string(&path).unwrap();
        assert!(once.contains("<loc>https://example.com/en/blog/new-post</loc>"));
        assert!(once.trim_end().ends_with(URLSET_END));

        assert!(!append_post(&path, loc, "2024-07-03").unwrap());
        assert_eq!(fs::read_to_string(&path).unwrap(), once);
    }

    #[test]
    fn test_append_post_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        assert!(!append_post(&dir.path().join("sitemap-fr.xml"), "https://example.com/fr/blog/x", "2024-01-01").unwrap());
        assert!(!dir.path().join("sitemap-fr.xml").exists());
    }
}
