use crate::comparator;
use crate::error::Result;
use crate::progress::ProgressReporter;
use crate::storage::Index;
use serde::Serialize;
use std::path::Path;
use tracing::{debug, warn};

/// A confirmed duplicate group as presented to report writers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DuplicateGroup {
    pub hash: String,
    /// Summary path. Starts at the first indexed member and advances to the
    /// last member confirmed equal to it.
    pub representative_path: String,
    pub representative_size: u64,
    /// Every persisted member, first indexed member first.
    pub member_paths: Vec<String>,
    pub total_size: u64,
}

impl DuplicateGroup {
    fn seed(hash: &str, path: &str, size: u64) -> Self {
        Self {
            hash: hash.to_string(),
            representative_path: path.to_string(),
            representative_size: size,
            member_paths: vec![path.to_string()],
            total_size: size,
        }
    }

    fn confirm(&mut self, path: &str, size: u64) {
        self.representative_path = path.to_string();
        self.representative_size = size;
        self.member_paths.push(path.to_string());
        self.total_size += size;
    }

    pub fn member_count(&self) -> usize {
        self.member_paths.len()
    }

    pub fn is_duplicate(&self) -> bool {
        self.member_paths.len() > 1
    }

    /// Members a user could remove while keeping the representative.
    pub fn removal_candidates(&self) -> impl Iterator<Item = &str> {
        self.member_paths
            .iter()
            .map(String::as_str)
            .filter(move |path| *path != self.representative_path)
    }

    /// Bytes freed by keeping only one copy.
    pub fn reclaimable_bytes(&self) -> u64 {
        self.total_size.saturating_sub(self.representative_size)
    }
}

/// Derive duplicate groups from the index and persist the confirmed members.
///
/// Hashes are processed in sorted order. The first record of each hash is
/// written unconditionally; every other record is written only when it is
/// byte-identical to that first record. A record that repeats the first
/// record's path is never a member. A member that is no longer a regular
/// file aborts grouping with [`Error::NotAFile`](crate::Error::NotAFile).
pub fn group_records(
    index: &mut dyn Index,
    reporter: &dyn ProgressReporter,
) -> Result<Vec<DuplicateGroup>> {
    let mut hashes = index.not_unique_hashes()?;
    hashes.sort();
    hashes.dedup();

    let total = hashes.len();
    reporter.on_group_start(total);
    let mut groups = Vec::with_capacity(total);

    for (i, hash) in hashes.iter().enumerate() {
        reporter.on_group_progress(&format!("[{} of {}] {}", i + 1, total, hash));

        let files = index.files_by_hash(hash)?;
        debug!("{} :: {:?}", hash, files);
        if files.len() < 2 {
            continue;
        }

        let (original_path, original_size) = &files[0];
        index.write_group_record(hash, original_path, *original_size)?;
        let mut group = DuplicateGroup::seed(hash, original_path, *original_size);

        for (path, size) in &files[1..] {
            if group.member_paths.contains(path) {
                warn!("{} is listed twice under {}", path, hash);
                continue;
            }
            if comparator::files_equal(Path::new(original_path), Path::new(path))? {
                index.write_group_record(hash, path, *size)?;
                group.confirm(path, *size);
            }
        }

        groups.push(group);
    }

    Ok(groups)
}
