use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::{env, fs, io};

use serde::Deserialize;

pub const DEFAULT_BLOB_API_URL: &str = "https://blob.vercel-storage.com";
pub const DEFAULT_BLOB_PREFIX: &str = "blog/";
pub const DEFAULT_INDEX_TTL_SECS: u64 = 30;

#[derive(Deserialize, Clone)]
pub struct Site {
    /// Origin prepended to canonical, alternate and sitemap URLs, e.g. `https://example.com`
    pub base_url: String,
}

#[derive(Deserialize, Clone)]
pub struct Paths {
    pub content_dir: PathBuf,
    pub public_dir: PathBuf,
    /// HTML shell served for every application route
    pub shell_file: PathBuf,
}

#[derive(Deserialize, Clone)]
pub struct Server {
    pub address: String,
    pub port: u16,
}

#[derive(Deserialize, Copy, Clone, Debug, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Runtime {
    Production,
    #[default]
    Development,
}

impl Runtime {
    pub fn from_env_value(value: &str) -> Runtime {
        match value.trim().to_ascii_lowercase().as_str() {
            "production" | "prod" => Runtime::Production,
            _ => Runtime::Development,
        }
    }
}

#[derive(Deserialize, Clone)]
pub struct StorageConfig {
    #[serde(default)]
    pub runtime: Runtime,
    pub blob_token: Option<String>,
    #[serde(default = "default_blob_api_url")]
    pub blob_api_url: String,
    #[serde(default = "default_blob_prefix")]
    pub blob_prefix: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        StorageConfig {
            runtime: Runtime::default(),
            blob_token: None,
            blob_api_url: default_blob_api_url(),
            blob_prefix: default_blob_prefix(),
        }
    }
}

impl StorageConfig {
    fn token(&self) -> Option<&str> {
        self.blob_token.as_deref().filter(|t| !t.trim().is_empty())
    }

    /// Remote reads happen only with a token and in production.
    pub fn remote_reads_enabled(&self) -> bool {
        self.token().is_some() && self.runtime == Runtime::Production
    }

    /// Writing needs the token alone.
    pub fn remote_writes_enabled(&self) -> bool {
        self.token().is_some()
    }
}

fn default_blob_api_url() -> String {
    DEFAULT_BLOB_API_URL.to_string()
}

fn default_blob_prefix() -> String {
    DEFAULT_BLOB_PREFIX.to_string()
}

#[derive(Deserialize, Clone)]
pub struct Cache {
    #[serde(default = "default_index_ttl_secs")]
    pub index_ttl_secs: u64,
}

impl Default for Cache {
    fn default() -> Self {
        Cache {
            index_ttl_secs: DEFAULT_INDEX_TTL_SECS,
        }
    }
}

fn default_index_ttl_secs() -> u64 {
    DEFAULT_INDEX_TTL_SECS
}

#[derive(Deserialize, Clone)]
pub struct Log {
    pub level: LogLevel,
    pub log_to_console: bool,
    pub location: Option<PathBuf>,
}

#[derive(Deserialize, Copy, Clone)]
pub enum LogLevel {
    Critical = 0,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

#[derive(Deserialize, Clone)]
pub struct Config {
    pub site: Site,
    pub paths: Paths,
    pub server: Server,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub cache: Cache,
    pub log: Option<Log>,
}

impl Config {
    /// Applies `BLOB_READ_WRITE_TOKEN` and `APP_ENV`/`NODE_ENV` from `lookup`.
    /// Called once by the binaries; the library never reads the environment.
    pub fn apply_env_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(token) = lookup("BLOB_READ_WRITE_TOKEN").filter(|t| !t.trim().is_empty()) {
            self.storage.blob_token = Some(token);
        }

        if let Some(runtime) = lookup("APP_ENV").or_else(|| lookup("NODE_ENV")) {
            self.storage.runtime = Runtime::from_env_value(&runtime);
        }
    }
}

fn parse_path(path: PathBuf) -> PathBuf {
    if !path.starts_with("${exe_dir}") {
        return path;
    }

    let exe_dir = env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(Path::to_path_buf))
        .unwrap_or_else(|| PathBuf::from("."));
    let str_path = path.to_string_lossy();
    PathBuf::from(str_path.replace("${exe_dir}", &exe_dir.to_string_lossy()))
}

pub fn parse_config(cfg_content: &str) -> io::Result<Config> {
    let mut cfg: Config = match toml::from_str::<Config>(cfg_content) {
        Ok(cfg) => cfg,
        Err(e) => return Err(io::Error::new(
            ErrorKind::InvalidData, format!("Error parsing configuration file: {}", e))),
    };

    cfg.site.base_url = cfg.site.base_url.trim_end_matches('/').to_string();
    cfg.paths = Paths {
        content_dir: parse_path(cfg.paths.content_dir),
        public_dir: parse_path(cfg.paths.public_dir),
        shell_file: parse_path(cfg.paths.shell_file),
    };

    Ok(cfg)
}

pub fn read_config(cfg_path: &Path) -> io::Result<Config> {
    let cfg_content = match fs::read_to_string(cfg_path) {
        Ok(content) => content,
        Err(e) => return Err(io::Error::new(e.kind(), format!("Error opening configuration file {}: {}", cfg_path.display(), e))),
    };

    parse_config(&cfg_content)
}
