use std::sync::Arc;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use reqwest::StatusCode;
use serde::Deserialize;
use spdlog::{debug, info, warn};

use crate::content::file_name::{ContentFileName, MDX_EXTENSION};
use crate::content::front_matter::{meta_from_front_matter, parse_document};
use crate::content::{sort_newest_first, BlogPostContent, BlogPostMeta};
use crate::error::{BlogError, Result};
use crate::language::Language;

/// Upper bound on objects requested from the store in one listing.
pub const LIST_LIMIT: usize = 1000;

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct BlobObject {
    pub pathname: String,
    pub url: String,
}

/// Minimal object-store surface the blog needs.
#[async_trait]
pub trait BlobStore: Send + Sync {
    async fn list(&self, prefix: &str, limit: usize) -> Result<Vec<BlobObject>>;

    async fn fetch(&self, object: &BlobObject) -> Result<String>;

    /// Stores `content` under exactly `pathname`. Fails with
    /// `BlogError::Conflict` if an object already lives there.
    async fn put(&self, pathname: &str, content: String) -> Result<String>;
}

#[derive(Debug, Deserialize)]
struct ListResponse {
    blobs: Vec<BlobObject>,
}

#[derive(Debug, Deserialize)]
struct PutResponse {
    url: String,
}

/// Object store spoken to over HTTP with a bearer token.
pub struct HttpBlobStore {
    client: reqwest::Client,
    api_url: String,
}

impl HttpBlobStore {
    pub fn new(api_url: &str, token: &str) -> Result<Self> {
        let mut headers = HeaderMap::new();
        let auth = HeaderValue::from_str(&format!("Bearer {}", token))
            .map_err(|_| BlogError::Configuration("blob token contains invalid characters".to_string()))?;
        headers.insert(AUTHORIZATION, auth);
        headers.insert("x-api-version", HeaderValue::from_static("7"));

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .build()?;

        Ok(Self {
            client,
            api_url: api_url.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl BlobStore for HttpBlobStore {
    async fn list(&self, prefix: &str, limit: usize) -> Result<Vec<BlobObject>> {
        let limit = limit.to_string();
        let response = self
            .client
            .get(&self.api_url)
            .query(&[("prefix", prefix), ("limit", limit.as_str())])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(BlogError::Upstream(format!("listing failed with status {}", status)));
        }

        let listing: ListResponse = response.json().await?;
        Ok(listing.blobs)
    }

    async fn fetch(&self, object: &BlobObject) -> Result<String> {
        let response = self.client.get(&object.url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(BlogError::Upstream(format!("fetching {} failed with status {}", object.pathname, status)));
        }
        Ok(response.text().await?)
    }

    async fn put(&self, pathname: &str, content: String) -> Result<String> {
        let url = format!("{}/{}", self.api_url, pathname);
        let response = self
            .client
            .put(&url)
            .header("x-add-random-suffix", "0")
            .header("x-allow-overwrite", "0")
            .header("x-content-type", "text/markdown; charset=utf-8")
            .body(content)
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::CONFLICT {
            return Err(BlogError::Conflict);
        }

        let response_text = response.text().await?;
        if !status.is_success() {
            if response_text.contains("already exists") {
                return Err(BlogError::Conflict);
            }
            return Err(BlogError::Upstream(format!("upload failed ({}): {}", status, response_text)));
        }

        let put: PutResponse = serde_json::from_str(&response_text)
            .map_err(|e| BlogError::Upstream(format!("unexpected upload response: {}", e)))?;
        Ok(put.url)
    }
}

/// Mirrors the local reader against a `BlobStore`. Read failures never
/// reach the caller: listings skip the item, lookups report "not found".
#[derive(Clone)]
pub struct RemoteStore {
    store: Arc<dyn BlobStore>,
    prefix: String,
}

impl RemoteStore {
    pub fn new(store: Arc<dyn BlobStore>, prefix: &str) -> Self {
        RemoteStore {
            store,
            prefix: prefix.to_string(),
        }
    }

    pub fn pathname(&self, slug: &str, language: Language) -> String {
        format!("{}{}", self.prefix, ContentFileName::new(slug, language).file_name())
    }

    async fn mdx_objects(&self, prefix: &str, limit: usize) -> Result<Vec<(ContentFileName, BlobObject)>> {
        let objects = self.store.list(prefix, limit).await?;
        let decoded = objects
            .into_iter()
            .filter(|object| object.pathname.ends_with(MDX_EXTENSION))
            .filter_map(|object| {
                let file_name = object.pathname.rsplit('/').next()?;
                let name = ContentFileName::parse(file_name)?;
                Some((name, object))
            })
            .collect();
        Ok(decoded)
    }

    async fn read_object(&self, name: &ContentFileName, object: &BlobObject) -> std::result::Result<BlogPostContent, String> {
        let raw = self.store.fetch(object).await.map_err(|e| e.to_string())?;
        let (front_matter, body) = parse_document(&raw)?;
        let meta = meta_from_front_matter(&front_matter, &name.base)?;
        Ok(BlogPostContent {
            meta,
            content: body.to_string(),
        })
    }

    /// Reads every usable `.mdx` object, optionally only those of one
    /// language. Failing objects are logged and left out.
    pub async fn scan(&self, language: Option<Language>) -> Vec<(ContentFileName, BlogPostMeta)> {
        let objects = match self.mdx_objects(&self.prefix, LIST_LIMIT).await {
            Ok(objects) => objects,
            Err(e) => {
                warn!("Remote listing failed: {}", e);
                return vec![];
            }
        };

        let mut posts = vec![];
        for (name, object) in objects.into_iter().filter(|(name, _)| language.map_or(true, |lang| name.language == lang)) {
            match self.read_object(&name, &object).await {
                Ok(post) => posts.push((name, post.meta)),
                Err(e) => warn!("Skipping remote object {}: {}", object.pathname, e),
            }
        }
        posts
    }

    pub async fn list(&self, language: Language) -> Vec<BlogPostMeta> {
        let mut posts: Vec<BlogPostMeta> = self.scan(Some(language)).await.into_iter().map(|(_, meta)| meta).collect();
        debug!("Remote store returned {} posts for {}", posts.len(), language);
        sort_newest_first(&mut posts);
        posts
    }

    /// Looks the object up by its exact pathname first. On a miss, the
    /// language's objects are read and matched on their frontmatter slug,
    /// so every slug `list` reports can be fetched.
    pub async fn get(&self, slug: &str, language: Language) -> Option<BlogPostContent> {
        let pathname = self.pathname(slug, language);
        let exact = match self.mdx_objects(&pathname, LIST_LIMIT).await {
            Ok(objects) => objects,
            Err(e) => {
                warn!("Remote lookup of {} failed: {}", pathname, e);
                return None;
            }
        };

        if let Some((name, object)) = exact.iter().find(|(_, object)| object.pathname == pathname) {
            return match self.read_object(name, object).await {
                Ok(post) => Some(post),
                Err(e) => {
                    warn!("Remote object {} is unusable: {}", pathname, e);
                    None
                }
            };
        }

        let objects = match self.mdx_objects(&self.prefix, LIST_LIMIT).await {
            Ok(objects) => objects,
            Err(e) => {
                warn!("Remote lookup of {} failed: {}", pathname, e);
                return None;
            }
        };

        for (name, object) in objects.iter().filter(|(name, _)| name.language == language && name.base != slug) {
            match self.read_object(name, object).await {
                Ok(post) if post.meta.slug == slug => return Some(post),
                Ok(_) => {}
                Err(e) => debug!("Skipping remote object {}: {}", object.pathname, e),
            }
        }
        None
    }

    /// Unlike `get`, a listing failure is an error here: callers must not
    /// treat "could not check" as "does not exist".
    pub async fn exists(&self, slug: &str, language: Language) -> Result<bool> {
        let pathname = self.pathname(slug, language);
        let objects = self.store.list(&pathname, LIST_LIMIT).await?;
        Ok(objects.iter().any(|object| object.pathname == pathname))
    }

    pub async fn put(&self, slug: &str, language: Language, document: String) -> Result<String> {
        let pathname = self.pathname(slug, language);
        let url = self.store.put(&pathname, document).await?;
        info!("Uploaded {} to remote store", pathname);
        Ok(url)
    }
}
