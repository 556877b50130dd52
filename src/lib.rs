pub mod config;
pub mod content;
pub mod content_cache;
pub mod error;
pub mod language;
pub mod logger;
pub mod query_string;
pub mod routing;
pub mod seo;
pub mod server;
pub mod text_utils;

#[cfg(test)]
mod test_data;
