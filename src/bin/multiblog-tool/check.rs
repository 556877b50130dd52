use std::fs;
use std::path::Path;

use anyhow::{bail, Context, Result};

use multiblog::content::file_name::{is_hidden, ContentFileName, MDX_EXTENSION};
use multiblog::content::front_matter::{get_text, parse_document, split_front_matter};
use multiblog::text_utils::parse_post_date;

use crate::CheckArgs;

#[derive(Debug, Default, PartialEq)]
struct FileReport {
    errors: Vec<String>,
    warnings: Vec<String>,
}

fn check_document(file_name: &str, raw: &str) -> FileReport {
    let mut report = FileReport::default();

    if ContentFileName::parse(file_name).is_none() {
        report.warnings.push("unsupported language suffix, file is ignored".to_string());
    }

    if split_front_matter(raw).is_none() {
        report.errors.push("no frontmatter found".to_string());
        return report;
    }

    let map = match parse_document(raw) {
        Ok((map, _)) => map,
        Err(e) => {
            report.errors.push(e);
            return report;
        }
    };

    if get_text(&map, "title").is_none() {
        report.errors.push("missing title".to_string());
    }
    match get_text(&map, "date") {
        None => report.errors.push("missing date".to_string()),
        Some(date) => {
            if let Err(e) = parse_post_date(&date) {
                report.errors.push(e);
            }
        }
    }

    if get_text(&map, "excerpt").is_none() {
        report.warnings.push("missing excerpt".to_string());
    }
    if get_text(&map, "coverImage").is_none() {
        report.warnings.push("missing coverImage".to_string());
    }

    report
}

fn check_dir(dir: &Path) -> Result<Vec<(String, FileReport)>> {
    if !dir.is_dir() {
        bail!("Content directory not found: {}", dir.display());
    }

    let mut reports = vec![];
    for entry in fs::read_dir(dir).with_context(|| format!("Listing {}", dir.display()))? {
        let entry = entry?;
        let file_name = entry.file_name().to_string_lossy().to_string();
        if !file_name.ends_with(MDX_EXTENSION) || is_hidden(&file_name) {
            continue;
        }

        let report = match fs::read_to_string(entry.path()) {
            Ok(raw) => check_document(&file_name, &raw),
            Err(e) => FileReport {
                errors: vec![format!("unreadable: {}", e)],
                warnings: vec![],
            },
        };
        reports.push((file_name, report));
    }

    reports.sort_by(|a, b| a.0.cmp(&b.0));
    Ok(reports)
}

/// Prints one line per problem and a summary. Returns false when any file
/// has errors.
pub fn check_cmd(args: CheckArgs) -> Result<bool> {
    let reports = check_dir(&args.dir)?;

    let mut invalid = 0;
    for (file_name, report) in reports.iter() {
        if !report.errors.is_empty() {
            invalid += 1;
            println!("ERROR {}: {}", file_name, report.errors.join(", "));
        }
        if !report.warnings.is_empty() {
            println!("WARN  {}: {}", file_name, report.warnings.join(", "));
        }
    }

    println!();
    println!("Checked {} files: {} valid, {} invalid", reports.len(), reports.len() - invalid, invalid);
    Ok(invalid == 0)
}
