pub mod lang_path;
pub mod route_match;
