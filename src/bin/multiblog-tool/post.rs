use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use chrono::{Local, NaiveDate};

use multiblog::content::file_name::{is_safe_slug, ContentFileName};
use multiblog::content::front_matter::{render_document, FrontMatterBlock, DEFAULT_AUTHOR, DEFAULT_CATEGORY};
use multiblog::language::Language;
use multiblog::text_utils::slugify;

use crate::PostArgs;

const BODY_SAMPLE: &str = "Replace this paragraph with the introduction of the article.

## First section

And this is the rest of your post.
";

fn render_post(args: &PostArgs, date: &NaiveDate) -> Result<String> {
    let date = date.format("%Y-%m-%d").to_string();
    let block = FrontMatterBlock {
        title: args.title.trim(),
        date: &date,
        category: args.category.as_deref().unwrap_or(DEFAULT_CATEGORY),
        excerpt: "",
        cover_image: "",
        author: args.author.as_deref().unwrap_or(DEFAULT_AUTHOR),
    };
    Ok(render_document(&block, BODY_SAMPLE)?)
}

fn target_path(args: &PostArgs) -> Result<PathBuf> {
    let language: Language = args.language.parse().map_err(anyhow::Error::msg)?;
    let slug = match args.slug.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        Some(slug) => slug.to_string(),
        None => slugify(&args.title),
    };

    if !is_safe_slug(&slug) {
        bail!("Cannot derive a valid slug from {:?}", args.title);
    }

    Ok(args.dir.join(ContentFileName::new(&slug, language).file_name()))
}

fn write_new(path: &Path, content: &str) -> Result<()> {
    let mut file = OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(path)
        .with_context(|| format!("Creating {}", path.display()))?;
    file.write_all(content.as_bytes())?;
    Ok(())
}

pub fn post_cmd(args: PostArgs) -> Result<()> {
    let path = target_path(&args)?;
    let content = render_post(&args, &Local::now().date_naive())?;
    write_new(&path, &content)?;
    println!("Created {}", path.display());
    Ok(())
}
