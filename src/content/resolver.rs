use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use spdlog::{debug, error, info, warn};

use crate::config::StorageConfig;
use crate::content::file_name::is_safe_slug;
use crate::content::front_matter::{render_document, FrontMatterBlock, DEFAULT_AUTHOR, DEFAULT_CATEGORY};
use crate::content::local_store::LocalStore;
use crate::content::remote_store::{HttpBlobStore, RemoteStore};
use crate::content::{sort_newest_first, BlogPostContent, BlogPostMeta};
use crate::error::{BlogError, Result};
use crate::language::Language;
use crate::seo::translations::TranslationIndex;
use crate::text_utils::parse_post_date;

/// Fields accepted by `PostResolver::create`.
#[derive(Debug, Clone, Default)]
pub struct NewPost {
    pub slug: String,
    pub language: Language,
    pub title: String,
    pub date: String,
    pub category: String,
    pub excerpt: String,
    pub cover_image: String,
    pub author: String,
    pub content: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CreatedPost {
    pub slug: String,
    pub language: Language,
    /// Location reported by the remote store.
    pub url: String,
}

/// Single entry point for blog reads and the create operation.
///
/// Lists merge local and remote posts with remote winning on a slug
/// collision. Single lookups try local first. Remote reads need a token and
/// the production runtime; writing needs the token only.
#[derive(Clone)]
pub struct PostResolver {
    local: LocalStore,
    remote: Option<RemoteStore>,
    remote_reads: bool,
}

impl PostResolver {
    pub fn new(local: LocalStore, remote: Option<RemoteStore>, remote_reads: bool) -> Self {
        PostResolver {
            local,
            remote,
            remote_reads,
        }
    }

    pub fn from_config(content_dir: PathBuf, storage: &StorageConfig) -> Result<Self> {
        let local = LocalStore::new(content_dir);
        let remote = match storage.blob_token.as_deref().filter(|_| storage.remote_writes_enabled()) {
            Some(token) => {
                let store = HttpBlobStore::new(&storage.blob_api_url, token)?;
                Some(RemoteStore::new(Arc::new(store), &storage.blob_prefix))
            }
            None => None,
        };

        info!("Remote storage: writes={} reads={}", remote.is_some(), storage.remote_reads_enabled());
        Ok(Self::new(local, remote, storage.remote_reads_enabled()))
    }

    pub fn local(&self) -> &LocalStore {
        &self.local
    }

    fn remote_reader(&self) -> Option<&RemoteStore> {
        self.remote.as_ref().filter(|_| self.remote_reads)
    }

    pub async fn list(&self, language: Language) -> Vec<BlogPostMeta> {
        let Some(remote) = self.remote_reader() else {
            return self.local.list(language);
        };

        let local = async { self.local.list(language) };
        let (local_posts, remote_posts) = tokio::join!(local, remote.list(language));

        let mut merged = BTreeMap::new();
        for post in local_posts.into_iter().chain(remote_posts) {
            merged.insert(post.slug.clone(), post);
        }

        let mut posts: Vec<BlogPostMeta> = merged.into_values().collect();
        sort_newest_first(&mut posts);
        posts
    }

    pub async fn get(&self, slug: &str, language: Language) -> Result<BlogPostContent> {
        if let Some(post) = self.local.get(slug, language) {
            return Ok(post);
        }

        if let Some(remote) = self.remote_reader() {
            if let Some(post) = remote.get(slug, language).await {
                return Ok(post);
            }
        }

        debug!("Post {} ({}) not found", slug, language);
        Err(BlogError::NotFound)
    }

    /// Translation groups of the local content, plus the remote posts when
    /// remote reads are on. Remote variants win, as they do in `list`.
    pub async fn translation_index(&self) -> TranslationIndex {
        let mut index = TranslationIndex::build(&self.local);
        if let Some(remote) = self.remote_reader() {
            for (name, meta) in remote.scan(None).await {
                index.insert_post(&name, &meta);
            }
            debug!("Translation index holds {} groups with remote posts", index.len());
        }
        index
    }

    /// Stores a new post in the remote store. Rejects a slug and language
    /// pair that already exists locally or remotely.
    pub async fn create(&self, post: NewPost) -> Result<CreatedPost> {
        validate(&post)?;

        if self.local.exists(&post.slug, post.language) {
            return Err(BlogError::Conflict);
        }

        let Some(remote) = self.remote.as_ref() else {
            self.log_missing_writer();
            return Err(BlogError::Configuration("remote storage token is not configured".to_string()));
        };

        if remote.exists(&post.slug, post.language).await? {
            return Err(BlogError::Conflict);
        }

        if let Err(e) = fs::create_dir_all(self.local.root_dir()) {
            warn!("Could not create content directory {}: {}", self.local.root_dir().display(), e);
        }

        let block = FrontMatterBlock {
            title: post.title.trim(),
            date: post.date.trim(),
            category: non_blank_or(&post.category, DEFAULT_CATEGORY),
            excerpt: post.excerpt.trim(),
            cover_image: post.cover_image.trim(),
            author: non_blank_or(&post.author, DEFAULT_AUTHOR),
        };
        let document = render_document(&block, &post.content)
            .map_err(|e| BlogError::Validation(format!("Cannot serialize frontmatter: {}", e)))?;

        let url = remote.put(&post.slug, post.language, document).await?;
        info!("Created post {} ({})", post.slug, post.language);

        Ok(CreatedPost {
            slug: post.slug,
            language: post.language,
            url,
        })
    }

    fn log_missing_writer(&self) {
        let dir = self.local.root_dir();
        let exists = dir.is_dir();
        let writable = fs::metadata(dir).map(|m| !m.permissions().readonly()).unwrap_or(false);
        error!(
            "Cannot create post: no remote storage token. Content dir {} exists={} writable={}",
            dir.display(), exists, writable
        );
    }
}

fn non_blank_or<'a>(value: &'a str, default: &'a str) -> &'a str {
    let value = value.trim();
    if value.is_empty() { default } else { value }
}

fn validate(post: &NewPost) -> Result<()> {
    let required = [&post.slug, &post.title, &post.date, &post.content];
    if required.iter().any(|field| field.trim().is_empty()) {
        return Err(BlogError::Validation("Missing required fields: slug, title, date and content".to_string()));
    }

    if !is_safe_slug(post.slug.trim()) || post.slug.trim() != post.slug {
        return Err(BlogError::Validation("Invalid slug".to_string()));
    }

    if let Err(e) = parse_post_date(&post.date) {
        return Err(BlogError::Validation(e));
    }

    Ok(())
}
