use chrono::NaiveDateTime;
use serde::Serialize;

pub mod file_name;
pub mod front_matter;
pub mod local_store;
pub mod remote_store;
pub mod resolver;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LeadMagnet {
    pub title: String,
    pub description: String,
    #[serde(rename = "type")]
    pub kind: String,
}

/// Metadata of one localized article, as returned by the blog API.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BlogPostMeta {
    pub slug: String,
    pub title: String,
    /// Normalized to `YYYY-MM-DDTHH:MM:SS.sssZ`.
    pub date: String,
    pub category: String,
    pub excerpt: String,
    pub cover_image: String,
    pub author: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lead_magnet: Option<LeadMagnet>,
    #[serde(skip)]
    pub published_at: NaiveDateTime,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BlogPostContent {
    pub meta: BlogPostMeta,
    pub content: String,
}

/// Newest first. Stable, so equal dates keep their input order.
pub fn sort_newest_first(posts: &mut [BlogPostMeta]) {
    posts.sort_by(|a, b| b.published_at.cmp(&a.published_at));
}
