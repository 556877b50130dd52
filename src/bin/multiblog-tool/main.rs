use std::path::PathBuf;

use anyhow::Result;
use clap::{Args, Parser};

use crate::check::check_cmd;
use crate::post::post_cmd;
use crate::sitemap::sitemaps_cmd;

mod check;
mod post;
mod sitemap;

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
enum Command {
    /// Regenerates the master and per-language sitemaps
    Sitemaps(SitemapArgs),
    /// Creates a new post skeleton
    Post(PostArgs),
    /// Audits the frontmatter of every content file
    Check(CheckArgs),
}

#[derive(Args, Debug)]
struct SitemapArgs {
    /// Config path
    #[arg(short, long)]
    config_path: PathBuf,

    /// Output directory. Defaults to the configured public_dir
    #[arg(short, long)]
    out_dir: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct PostArgs {
    /// Title of the post
    #[arg(short, long)]
    title: String,

    /// Language code (it, en, fr, de, es)
    #[arg(short, long, default_value = "it")]
    language: String,

    /// URL slug. Derived from the title when empty
    #[arg(short, long)]
    slug: Option<String>,

    /// Name of the author
    #[arg(short, long)]
    author: Option<String>,

    /// Category of the post
    #[arg(long)]
    category: Option<String>,

    /// Content directory the file is written to
    #[arg(short, long, default_value = ".")]
    dir: PathBuf,
}

#[derive(Args, Debug)]
struct CheckArgs {
    /// Content directory to audit
    #[arg(short, long, default_value = ".")]
    dir: PathBuf,
}

#[ntex::main]
async fn main() -> Result<()> {
    match Command::parse() {
        Command::Sitemaps(args) => sitemaps_cmd(args).await,
        Command::Post(args) => post_cmd(args),
        Command::Check(args) => {
            if !check_cmd(args)? {
                std::process::exit(1);
            }
            Ok(())
        }
    }
}
