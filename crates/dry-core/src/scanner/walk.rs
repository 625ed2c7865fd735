use crate::error::{Error, Result};
use crate::hasher;
use crate::progress::ProgressReporter;
use crate::storage::Index;
use glob::Pattern;
use std::io;
use std::path::Path;
use tracing::{debug, error, warn};
use walkdir::{DirEntry, WalkDir};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WalkStats {
    pub files_indexed: u64,
    pub bytes_indexed: u64,
    pub links_skipped: u64,
    /// Files that could not be represented in the index (non UTF-8 names).
    pub skipped: u64,
}

/// Compile glob ignore patterns, dropping (and logging) invalid ones.
pub fn compile_patterns(ignore_globs: &[String]) -> Vec<Pattern> {
    ignore_globs
        .iter()
        .filter_map(|glob| match Pattern::new(glob) {
            Ok(p) => Some(p),
            Err(e) => {
                error!("Invalid glob pattern '{}': {}", glob, e);
                None
            }
        })
        .collect()
}

pub fn ensure_root(root: &Path) -> Result<()> {
    if root.is_dir() {
        Ok(())
    } else {
        Err(Error::InvalidRoot(root.to_path_buf()))
    }
}

/// Walk `root`, hash every regular file and write it to `index`.
///
/// Symbolic links are never followed nor hashed. The first read error or
/// uniqueness violation aborts the walk; records written so far stay.
pub fn walk(
    root: &Path,
    index: &mut dyn Index,
    ignore_patterns: &[Pattern],
    reporter: &dyn ProgressReporter,
) -> Result<WalkStats> {
    ensure_root(root)?;
    index.check_open()?;

    let mut stats = WalkStats::default();
    let on_hash = |message: &str| reporter.on_hash_progress(message);

    for entry in entries(root, ignore_patterns) {
        let entry = entry.map_err(walk_error)?;
        if entry.path_is_symlink() {
            debug!("ignore link {}", entry.path().display());
            stats.links_skipped += 1;
            continue;
        }
        if !entry.file_type().is_file() {
            continue;
        }

        let Some(path) = entry.path().to_str() else {
            warn!("Skipping non UTF-8 path {}", entry.path().display());
            stats.skipped += 1;
            continue;
        };

        debug!("read file {}", path);
        // Size is what the digest covered, not an earlier stat.
        let (hash, size) = hasher::hash_file(entry.path(), Some(&on_hash))?;
        debug!("hash: {} size: {}", hash, size);
        index.write_file_info(path, &hash, size)?;

        stats.files_indexed += 1;
        stats.bytes_indexed += size;
        reporter.on_file_indexed(stats.files_indexed, path);
    }

    Ok(stats)
}

/// Count the regular files `walk` would visit, for progress totals.
pub fn count_files(root: &Path, ignore_patterns: &[Pattern]) -> Result<u64> {
    ensure_root(root)?;
    let mut count = 0;
    for entry in entries(root, ignore_patterns) {
        let entry = entry.map_err(walk_error)?;
        if !entry.path_is_symlink() && entry.file_type().is_file() {
            count += 1;
        }
    }
    Ok(count)
}

fn entries<'a>(
    root: &Path,
    ignore_patterns: &'a [Pattern],
) -> impl Iterator<Item = walkdir::Result<DirEntry>> + 'a {
    WalkDir::new(root)
        .follow_links(false)
        .into_iter()
        .filter_entry(move |entry| !is_ignored(entry, ignore_patterns))
}

fn is_ignored(entry: &DirEntry, ignore_patterns: &[Pattern]) -> bool {
    entry.depth() > 0
        && ignore_patterns
            .iter()
            .any(|pattern| pattern.matches_path(entry.path()))
}

fn walk_error(err: walkdir::Error) -> Error {
    let path = err.path().map(Path::to_path_buf).unwrap_or_default();
    let source = err
        .into_io_error()
        .unwrap_or_else(|| io::Error::new(io::ErrorKind::Other, "filesystem loop detected"));
    Error::read_failure(path, source)
}
