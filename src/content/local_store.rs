use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use std::{fs, io};

use serde_yaml::Mapping;
use spdlog::{debug, warn};

use crate::content::file_name::{is_safe_slug, ContentFileName};
use crate::content::front_matter::{meta_from_front_matter, parse_document, slug_override};
use crate::content::{sort_newest_first, BlogPostContent, BlogPostMeta};
use crate::language::Language;

/// One MDX file read from the content directory.
pub struct LocalEntry {
    pub name: ContentFileName,
    pub path: PathBuf,
    pub front_matter: Mapping,
    pub body: String,
    pub modified: Option<SystemTime>,
}

impl LocalEntry {
    /// Slug used in URLs: the frontmatter override, else the file base.
    pub fn slug(&self) -> String {
        slug_override(&self.front_matter).unwrap_or_else(|| self.name.base.clone())
    }

    pub fn meta(&self) -> Result<BlogPostMeta, String> {
        meta_from_front_matter(&self.front_matter, &self.name.base)
    }
}

/// Reads posts from the local content directory. Nothing is cached: every
/// call reflects what is on disk right now.
#[derive(Clone)]
pub struct LocalStore {
    root_dir: PathBuf,
}

impl LocalStore {
    pub fn new(root_dir: PathBuf) -> Self {
        LocalStore { root_dir }
    }

    pub fn root_dir(&self) -> &Path {
        self.root_dir.as_path()
    }

    pub fn post_path(&self, slug: &str, language: Language) -> PathBuf {
        self.root_dir.join(ContentFileName::new(slug, language).file_name())
    }

    /// True when `<slug><suffix>.mdx` is on disk.
    pub fn exists(&self, slug: &str, language: Language) -> bool {
        is_safe_slug(slug) && self.post_path(slug, language).is_file()
    }

    /// Content files with a decodable name, optionally restricted to one
    /// language. The name check happens before anything is read.
    fn retrieve_files(&self, language: Option<Language>) -> io::Result<Vec<(ContentFileName, PathBuf)>> {
        let mut files = vec![];
        let entries = fs::read_dir(self.root_dir.as_path())?;
        for entry in entries.flatten() {
            let Ok(file_type) = entry.file_type() else {
                continue;
            };
            if !file_type.is_file() {
                continue;
            }
            let file_name = entry.file_name();
            let Some(name) = file_name.to_str().and_then(ContentFileName::parse) else {
                continue;
            };
            if language.is_some_and(|lang| lang != name.language) {
                continue;
            }
            files.push((name, entry.path()));
        }
        Ok(files)
    }

    pub fn read_entry(name: ContentFileName, path: PathBuf) -> io::Result<LocalEntry> {
        let raw = fs::read_to_string(&path)?;
        let (front_matter, body) = match parse_document(&raw) {
            Ok((front_matter, body)) => (front_matter, body.to_string()),
            Err(e) => return Err(io::Error::new(ErrorKind::InvalidData, e)),
        };
        let modified = fs::metadata(&path).and_then(|m| m.modified()).ok();

        Ok(LocalEntry {
            name,
            path,
            front_matter,
            body,
            modified,
        })
    }

    /// Every readable entry, optionally restricted to one language. Files that
    /// fail to read or parse are logged and skipped; a missing directory
    /// yields nothing.
    pub fn scan(&self, language: Option<Language>) -> Vec<LocalEntry> {
        if !self.root_dir.is_dir() {
            debug!("Content directory {} not found", self.root_dir.display());
            return vec![];
        }

        let files = match self.retrieve_files(language) {
            Ok(files) => files,
            Err(e) => {
                warn!("Error listing content directory {}: {}", self.root_dir.display(), e);
                return vec![];
            }
        };

        let mut entries = Vec::with_capacity(files.len());
        for (name, path) in files {
            match Self::read_entry(name, path.clone()) {
                Ok(entry) => entries.push(entry),
                Err(e) => warn!("Skipping {}: {}", path.display(), e),
            }
        }
        entries
    }

    /// Valid posts of one language, newest first.
    pub fn list(&self, language: Language) -> Vec<BlogPostMeta> {
        let mut posts: Vec<BlogPostMeta> = self
            .scan(Some(language))
            .into_iter()
            .filter_map(|entry| match entry.meta() {
                Ok(meta) => Some(meta),
                Err(e) => {
                    warn!("Skipping {}: {}", entry.path.display(), e);
                    None
                }
            })
            .collect();

        sort_newest_first(&mut posts);
        posts
    }

    /// Looks up `<slug><suffix>.mdx` first, then any file of that language
    /// whose frontmatter slug equals `slug`.
    pub fn get(&self, slug: &str, language: Language) -> Option<BlogPostContent> {
        if !is_safe_slug(slug) {
            return None;
        }

        let path = self.post_path(slug, language);
        let entry = if path.is_file() {
            let name = ContentFileName::new(slug, language);
            match Self::read_entry(name, path) {
                Ok(entry) => entry,
                Err(e) => {
                    warn!("Error reading post {} ({}): {}", slug, language, e);
                    return None;
                }
            }
        } else {
            self.scan(Some(language))
                .into_iter()
                .find(|entry| slug_override(&entry.front_matter).as_deref() == Some(slug))?
        };

        match entry.meta() {
            Ok(meta) => Some(BlogPostContent {
                meta,
                content: entry.body,
            }),
            Err(e) => {
                warn!("Post {} ({}) has invalid metadata: {}", slug, language, e);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::test_data::*;

    use super::*;

    fn titles(posts: &[BlogPostMeta]) -> Vec<&str> {
        posts.iter().map(|p| p.title.as_str()).collect()
    }

    #[test]
    fn test_list_by_language() {
        let dir = content_dir(&[("hello.mdx", POST_HELLO_IT), ("hello.en.mdx", POST_HELLO_EN)]);
        let store = LocalStore::new(dir.path().to_path_buf());

        assert_eq!(titles(&store.list(Language::It)), vec!["Hello"]);
        assert_eq!(titles(&store.list(Language::En)), vec!["Hi"]);
        assert!(store.list(Language::Fr).is_empty());
    }

    #[test]
    fn test_get_returns_body() {
        let dir = content_dir(&[("hello.mdx", POST_HELLO_IT), ("hello.en.mdx", POST_HELLO_EN)]);
        let store = LocalStore::new(dir.path().to_path_buf());

        let post = store.get("hello", Language::It).unwrap();
        assert_eq!(post.meta.title, "Hello");
        assert!(post.content.starts_with("Ciao mondo."));
        assert!(!post.content.contains("title:"));

        let post = store.get("hello", Language::En).unwrap();
        assert_eq!(post.meta.title, "Hi");
    }

    #[test]
    fn test_list_sorted_newest_first() {
        let dir = content_dir(&[("a.mdx", &post("A", "2024-02-01")), ("b.mdx", &post("B", "2024-03-01"))]);
        let store = LocalStore::new(dir.path().to_path_buf());

        let posts = store.list(Language::It);
        let slugs: Vec<&str> = posts.iter().map(|p| p.slug.as_str()).collect();
        assert_eq!(slugs, vec!["b", "a"]);
    }

    #[test]
    fn test_invalid_posts_are_skipped() {
        let dir = content_dir(&[
            ("c.mdx", POST_MISSING_DATE),
            ("broken.mdx", POST_BROKEN_YAML),
            ("ok.mdx", &post("Ok", "2024-01-01")),
            (".hidden.mdx", &post("Hidden", "2024-01-01")),
            ("~backup.mdx", &post("Backup", "2024-01-01")),
            ("notes.txt", "not a post"),
        ]);
        let store = LocalStore::new(dir.path().to_path_buf());

        assert_eq!(titles(&store.list(Language::It)), vec!["Ok"]);
        assert!(store.get("c", Language::It).is_none());
        assert!(store.get("broken", Language::It).is_none());
    }

    #[test]
    fn test_missing_directory() {
        let store = LocalStore::new(PathBuf::from("/definitely/not/here/blog"));
        assert!(store.list(Language::It).is_empty());
        assert!(store.get("hello", Language::It).is_none());
        assert!(!store.exists("hello", Language::It));
    }

    #[test]
    fn test_get_by_front_matter_slug() {
        let dir = content_dir(&[("promo.mdx", POST_PROMO_IT), ("promo.en.mdx", POST_PROMO_EN)]);
        let store = LocalStore::new(dir.path().to_path_buf());

        let listed = store.list(Language::En);
        assert_eq!(listed[0].slug, "special-promo");

        let post = store.get("special-promo", Language::En).unwrap();
        assert_eq!(post.meta.title, "Special promo");
        assert!(store.get("special-promo", Language::It).is_none());
    }

    #[test]
    fn test_get_rejects_unsafe_slug() {
        let dir = content_dir(&[("hello.mdx", POST_HELLO_IT)]);
        let store = LocalStore::new(dir.path().join("sub"));
        assert!(store.get("../hello", Language::It).is_none());
    }

    #[test]
    fn test_exists() {
        let dir = content_dir(&[("hello.en.mdx", POST_HELLO_EN)]);
        let store = LocalStore::new(dir.path().to_path_buf());
        assert!(store.exists("hello", Language::En));
        assert!(!store.exists("hello", Language::It));
    }

    #[test]
    fn test_language_filter_property() {
        let dir = content_dir(&[
            ("x.mdx", &post("X-it", "2024-01-01")),
            ("x.en.mdx", &post("X-en", "2024-01-01")),
            ("x.fr.mdx", &post("X-fr", "2024-01-01")),
            ("x.de.mdx", &post("X-de", "2024-01-01")),
            ("x.es.mdx", &post("X-es", "2024-01-01")),
            ("x.pt.mdx", &post("X-pt", "2024-01-01")),
        ]);
        let store = LocalStore::new(dir.path().to_path_buf());

        for lang in Language::ALL {
            let posts = store.list(lang);
            assert_eq!(posts.len(), 1, "language {}", lang);
            assert_eq!(posts[0].title, format!("X-{}", lang.code()));
        }
    }
}
