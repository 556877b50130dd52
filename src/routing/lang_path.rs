use crate::language::Language;

/// Drops query and fragment, collapses trailing slashes and guarantees a
/// leading one. The root stays `/`.
pub fn normalize_path(raw: &str) -> String {
    let end = raw.find(['?', '#']).unwrap_or(raw.len());
    let path = raw[..end].trim().trim_end_matches('/');

    if path.is_empty() {
        "/".to_string()
    } else if path.starts_with('/') {
        path.to_string()
    } else {
        format!("/{}", path)
    }
}

/// Splits a leading `/<lang>` segment off a path. Only the exact lowercase
/// codes count: `/en/blog` is English, `/english` and `/EN` are not.
pub fn strip_language_prefix(raw: &str) -> (Option<Language>, String) {
    let path = normalize_path(raw);
    let rest = &path[1..];
    let (first, remainder) = match rest.find('/') {
        Some(idx) => (&rest[..idx], &rest[idx..]),
        None => (rest, ""),
    };

    match Language::from_code(first).filter(|lang| lang.code() == first) {
        Some(lang) => (Some(lang), normalize_path(remainder)),
        None => (None, path),
    }
}

/// Localized form of `path` in `language`. Any prefix already on the path is
/// removed first, so the result never carries two.
pub fn build_localized_path(path: &str, language: Language) -> String {
    let (_, clean) = strip_language_prefix(path);
    if language.is_default() {
        clean
    } else if clean == "/" {
        format!("/{}", language.code())
    } else {
        format!("/{}{}", language.code(), clean)
    }
}
