use serde::Serialize;
use serde_yaml::{Mapping, Value};

use crate::content::{BlogPostMeta, LeadMagnet};
use crate::text_utils::{format_iso_date, parse_post_date};

pub const DEFAULT_CATEGORY: &str = "Generale";
pub const DEFAULT_AUTHOR: &str = "Redazione";

const LEAD_MAGNET_KEYS: [&str; 2] = ["leadmagnet", "lead_magnet"];

/// Splits an MDX document into its YAML frontmatter and body.
/// Returns `None` when the document does not open with a `---` fence or
/// the fence is never closed.
pub fn split_front_matter(raw: &str) -> Option<(&str, &str)> {
    let raw = raw.strip_prefix('\u{feff}').unwrap_or(raw);
    let mut lines = raw.split_inclusive('\n');

    let first = lines.next()?;
    if first.trim_end() != "---" {
        return None;
    }

    let start = first.len();
    let mut offset = start;
    for line in lines {
        if line.trim_end() == "---" {
            return Some((&raw[start..offset], &raw[offset + line.len()..]));
        }
        offset += line.len();
    }
    None
}

/// Parses the frontmatter into a YAML mapping and returns it with the body.
/// A document without frontmatter yields an empty mapping and the whole
/// text as body.
pub fn parse_document(raw: &str) -> Result<(Mapping, &str), String> {
    let Some((yaml, body)) = split_front_matter(raw) else {
        return Ok((Mapping::new(), raw));
    };

    if yaml.trim().is_empty() {
        return Ok((Mapping::new(), body));
    }

    match serde_yaml::from_str::<Value>(yaml) {
        Ok(Value::Mapping(map)) => Ok((map, body)),
        Ok(Value::Null) => Ok((Mapping::new(), body)),
        Ok(_) => Err("Frontmatter is not a key/value mapping".to_string()),
        Err(e) => Err(format!("Invalid frontmatter: {}", e)),
    }
}

/// Scalar value of `key` as a trimmed string, `None` if absent or blank.
pub fn get_text(map: &Mapping, key: &str) -> Option<String> {
    map.get(key).and_then(scalar_to_string).filter(|s| !s.is_empty())
}

fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Tagged(tagged) => scalar_to_string(&tagged.value),
        _ => None,
    }
}

/// The frontmatter `slug` override, if any.
pub fn slug_override(map: &Mapping) -> Option<String> {
    get_text(map, "slug")
}

/// Builds typed metadata from raw frontmatter, applying the documented
/// defaults. Fails when `title` is blank or `date` is blank or unparseable.
pub fn meta_from_front_matter(map: &Mapping, file_slug: &str) -> Result<BlogPostMeta, String> {
    let title = get_text(map, "title").ok_or_else(|| "Missing title".to_string())?;
    let date_str = get_text(map, "date").ok_or_else(|| "Missing date".to_string())?;
    let published_at = parse_post_date(&date_str)?;

    Ok(BlogPostMeta {
        slug: slug_override(map).unwrap_or_else(|| file_slug.to_string()),
        title,
        date: format_iso_date(&published_at),
        category: get_text(map, "category").unwrap_or_else(|| DEFAULT_CATEGORY.to_string()),
        excerpt: get_text(map, "excerpt").unwrap_or_default(),
        cover_image: get_text(map, "coverImage").unwrap_or_default(),
        author: get_text(map, "author").unwrap_or_else(|| DEFAULT_AUTHOR.to_string()),
        lead_magnet: lead_magnet(map),
        published_at,
    })
}

fn lead_magnet(map: &Mapping) -> Option<LeadMagnet> {
    let value = map.iter().find_map(|(key, value)| {
        let key = key.as_str()?.to_ascii_lowercase();
        if LEAD_MAGNET_KEYS.contains(&key.as_str()) {
            Some(value)
        } else {
            None
        }
    })?;

    let fields = value.as_mapping()?;
    let magnet = LeadMagnet {
        title: get_text(fields, "title").unwrap_or_default(),
        description: get_text(fields, "description").unwrap_or_default(),
        kind: get_text(fields, "type").unwrap_or_default(),
    };

    if magnet.title.is_empty() && magnet.description.is_empty() && magnet.kind.is_empty() {
        None
    } else {
        Some(magnet)
    }
}

/// Frontmatter written for posts created through the API.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FrontMatterBlock<'a> {
    pub title: &'a str,
    pub date: &'a str,
    pub category: &'a str,
    pub excerpt: &'a str,
    pub cover_image: &'a str,
    pub author: &'a str,
}

pub fn render_document(block: &FrontMatterBlock, body: &str) -> Result<String, serde_yaml::Error> {
    let yaml = serde_yaml::to_string(block)?;
    Ok(format!("---\n{}---\n\n{}", yaml, body))
}
