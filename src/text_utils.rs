use chrono::{DateTime, NaiveDate, NaiveDateTime};

const DATE_TIME_FORMATS: [&str; 2] = ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"];

/// Parses the `date` field of a post. Accepts RFC 3339, date-time with a
/// space or `T` separator and a bare `YYYY-MM-DD`.
pub fn parse_post_date(buf: &str) -> Result<NaiveDateTime, String> {
    let buf = buf.trim();
    if buf.is_empty() {
        return Err("Empty date".to_string());
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(buf) {
        return Ok(dt.naive_utc());
    }

    for fmt in DATE_TIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(buf, fmt) {
            return Ok(dt);
        }
    }

    match NaiveDate::parse_from_str(buf, "%Y-%m-%d") {
        Ok(date) => Ok(date.and_hms_opt(0, 0, 0).unwrap_or_default()),
        Err(_) => Err(format!("Unable to parse date {}", buf)),
    }
}

/// ISO 8601 in UTC with millisecond precision, e.g. `2024-01-02T00:00:00.000Z`.
pub fn format_iso_date(date_time: &NaiveDateTime) -> String {
    date_time.format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string()
}

pub fn format_sitemap_date(date_time: &NaiveDateTime) -> String {
    date_time.format("%Y-%m-%d").to_string()
}

/// URL slug from a free-form title: transliterated to ASCII, lowercased,
/// runs of anything that is not alphanumeric collapsed into one `-`.
pub fn slugify(title: &str) -> String {
    let ascii = unidecode::unidecode(title).to_ascii_lowercase();

    let mut slug = String::with_capacity(ascii.len());
    let mut prev_dash = true;
    for c in ascii.chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c);
            prev_dash = false;
        } else if !prev_dash {
            slug.push('-');
            prev_dash = true;
        }
    }

    while slug.ends_with('-') {
        slug.pop();
    }
    slug
}
