use std::fs;
use std::io;
use std::path::Path;

const CONFIG_SAMPLE: &str = r#"# For the file locations, if you want them relative to the executable directory
# use ${exe_dir}/location
[site]
base_url = "https://example.com"

[paths]
content_dir = "content/blog"
public_dir = "dist/public"
shell_file = "dist/public/index.html"

[server]
address = "0.0.0.0"
port = 8001

# BLOB_READ_WRITE_TOKEN and APP_ENV (or NODE_ENV) override these at startup
[storage]
runtime = "development"
blob_prefix = "blog/"

[cache]
index_ttl_secs = 30

[log]
level = "Info"
log_to_console = true
"#;

pub(crate) fn write_sample_cfg(file_path: &Path) -> io::Result<()> {
    if file_path.exists() {
        return Err(io::Error::new(io::ErrorKind::AlreadyExists, format!("{} already exists", file_path.display())));
    }
    fs::write(file_path, CONFIG_SAMPLE)
}

#[cfg(test)]
mod tests {
    use multiblog::config::parse_config;

    use super::*;

    #[test]
    fn test_sample_parses() {
        let cfg = parse_config(CONFIG_SAMPLE).unwrap();
        assert_eq!(cfg.server.port, 8001);
        assert_eq!(cfg.cache.index_ttl_secs, 30);
        assert!(cfg.log.is_some());
    }

    #[test]
    fn test_refuses_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("multiblog.toml");
        write_sample_cfg(&path).unwrap();
        assert!(write_sample_cfg(&path).is_err());
    }
}
