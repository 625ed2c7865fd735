use crate::commands::Format;
use colored::*;
use dry_core::DuplicateGroup;
use serde::Serialize;
use std::collections::BTreeMap;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

#[derive(Debug, Serialize)]
struct GroupReport<'a> {
    path: &'a str,
    size: u64,
    members: &'a [String],
    total_size: u64,
}

/// Where the report goes: a folder target gets a timestamped file name.
pub fn resolve_target(target: &Path, format: Format, now_ms: i64) -> PathBuf {
    if target.as_os_str().is_empty() {
        return resolve_target(Path::new("."), format, now_ms);
    }
    if target.is_dir() {
        target.join(format!("duplicatesReport.{}{}", now_ms, format.extension()))
    } else {
        target.to_path_buf()
    }
}

/// Groups keyed by hash (sorted), pretty printed with 2-space indent.
pub fn to_json(groups: &[DuplicateGroup]) -> serde_json::Result<String> {
    let report: BTreeMap<&str, GroupReport<'_>> = groups
        .iter()
        .map(|g| {
            (
                g.hash.as_str(),
                GroupReport {
                    path: &g.representative_path,
                    size: g.representative_size,
                    members: &g.member_paths,
                    total_size: g.total_size,
                },
            )
        })
        .collect();
    serde_json::to_string_pretty(&report)
}

/// The JSON report followed by a newline.
pub fn write_json<W: Write>(out: &mut W, groups: &[DuplicateGroup]) -> io::Result<()> {
    let json = to_json(groups)?;
    writeln!(out, "{}", json)
}

pub fn write_text<W: Write>(out: &mut W, groups: &[DuplicateGroup]) -> io::Result<()> {
    let duplicates: Vec<&DuplicateGroup> = groups.iter().filter(|g| g.is_duplicate()).collect();
    if duplicates.is_empty() {
        writeln!(out, "{}", "No duplicates found".green())?;
        return Ok(());
    }

    for group in &duplicates {
        writeln!(
            out,
            "{} {} ({} files, {} bytes each)",
            "■".cyan(),
            short_hash(&group.hash).bold(),
            group.member_count(),
            group.representative_size,
        )?;
        for path in &group.member_paths {
            if *path == group.representative_path {
                writeln!(out, "    {} {}", "keep".green(), path)?;
            } else {
                writeln!(out, "    {} {}", "dupe".red(), path)?;
            }
        }
    }

    let wasted: u64 = duplicates.iter().map(|g| g.reclaimable_bytes()).sum();
    writeln!(
        out,
        "{} duplicate groups, {} bytes reclaimable",
        format!("{}", duplicates.len()).red(),
        format!("{}", wasted).red(),
    )?;
    Ok(())
}

fn short_hash(hash: &str) -> &str {
    hash.get(..16).unwrap_or(hash)
}
