use std::env;

use anyhow::{Context, Result};
use chrono::Local;

use multiblog::config::read_config;
use multiblog::content::resolver::PostResolver;
use multiblog::seo::sitemap::write_all_sitemaps;

use crate::SitemapArgs;

/// Rebuilds every sitemap. In production with a blob token, remote posts
/// are listed too, the same way the server sees them.
pub async fn sitemaps_cmd(args: SitemapArgs) -> Result<()> {
    let mut config = read_config(&args.config_path)
        .with_context(|| format!("Reading {}", args.config_path.display()))?;
    config.apply_env_overrides(|key| env::var(key).ok());

    let resolver = PostResolver::from_config(config.paths.content_dir.clone(), &config.storage)
        .context("Creating post resolver")?;
    let index = resolver.translation_index().await;
    println!("Found {} articles in {}", index.len(), config.paths.content_dir.display());

    let out_dir = args.out_dir.unwrap_or(config.paths.public_dir);
    let today = Local::now().date_naive();
    let written = write_all_sitemaps(&out_dir, &config.site.base_url, &index, today)
        .with_context(|| format!("Writing sitemaps to {}", out_dir.display()))?;

    for path in written {
        println!("Wrote {}", path.display());
    }
    Ok(())
}
