use crate::config::AppConfig;
use crate::error::Result;
use crate::grouper::{self, DuplicateGroup};
use crate::progress::ProgressReporter;
use crate::scanner::{self, WalkStats};
use crate::storage::Storage;
use std::path::Path;
use std::time::{Duration, Instant};
use tracing::{debug, info};

pub struct DryEngine {
    config: AppConfig,
}

#[derive(Debug)]
pub struct IndexOutcome {
    pub duration: Duration,
    pub prescan_total: Option<u64>,
    pub stats: WalkStats,
}

#[derive(Debug)]
pub struct GroupOutcome {
    pub duration: Duration,
    pub groups: Vec<DuplicateGroup>,
}

impl GroupOutcome {
    /// Groups with at least two confirmed members.
    pub fn duplicate_groups(&self) -> impl Iterator<Item = &DuplicateGroup> {
        self.groups.iter().filter(|g| g.is_duplicate())
    }

    pub fn duplicate_files(&self) -> usize {
        self.duplicate_groups().map(|g| g.member_count()).sum()
    }

    pub fn wasted_bytes(&self) -> u64 {
        self.duplicate_groups().map(|g| g.reclaimable_bytes()).sum()
    }
}

#[derive(Debug)]
pub struct RunResult {
    pub index: IndexOutcome,
    pub group: GroupOutcome,
}

impl DryEngine {
    pub fn new(config: AppConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Open the backend named by the configuration.
    pub fn open_storage(&self) -> Result<Storage> {
        let locator = self.config.storage_locator()?;
        Storage::open(&locator, self.config.scope, self.config.failure_policy)
    }

    /// Run the full pipeline against the configured storage:
    /// 1. Validate the root and open storage
    /// 2. Walk and index every regular file
    /// 3. Group and confirm duplicates
    pub fn scan(&self, root: &Path, reporter: &dyn ProgressReporter) -> Result<RunResult> {
        scanner::ensure_root(root)?;
        let mut storage = self.open_storage()?;
        let result = self.scan_into(&mut storage, root, reporter);
        storage.close();
        result
    }

    /// Same as [`scan`](Self::scan) on an already opened storage.
    pub fn scan_into(
        &self,
        storage: &mut Storage,
        root: &Path,
        reporter: &dyn ProgressReporter,
    ) -> Result<RunResult> {
        let index = self.index(storage, root, reporter)?;
        let group = self.group(storage, reporter)?;
        Ok(RunResult { index, group })
    }

    /// Indexing stage: prescan (optional) and walk.
    pub fn index(
        &self,
        storage: &mut Storage,
        root: &Path,
        reporter: &dyn ProgressReporter,
    ) -> Result<IndexOutcome> {
        scanner::ensure_root(root)?;
        let start = Instant::now();
        let patterns = scanner::compile_patterns(&self.config.ignore_patterns);

        let prescan_total = if self.config.prescan {
            reporter.on_prescan_start();
            let total = scanner::count_files(root, &patterns)?;
            debug!("Prescan found {} files", total);
            reporter.on_prescan_complete(total);
            Some(total)
        } else {
            None
        };

        info!("---- indexing stage ----");
        storage.log_event(
            start.elapsed(),
            "info",
            &format!("indexing {}", root.display()),
        )?;
        reporter.on_index_start();
        let stats = scanner::walk(root, storage.index(), &patterns, reporter)?;
        let duration = start.elapsed();
        reporter.on_index_complete(stats.files_indexed, duration.as_secs_f64());
        storage.log_event(
            duration,
            "info",
            &format!(
                "indexed {} files, {} bytes",
                stats.files_indexed, stats.bytes_indexed
            ),
        )?;
        debug!(
            "Indexing completed in {:.2}s: {} files, {} links skipped",
            duration.as_secs_f64(),
            stats.files_indexed,
            stats.links_skipped,
        );

        Ok(IndexOutcome {
            duration,
            prescan_total,
            stats,
        })
    }

    /// Grouping stage. Must run after every producer of the scope finished.
    pub fn group(
        &self,
        storage: &mut Storage,
        reporter: &dyn ProgressReporter,
    ) -> Result<GroupOutcome> {
        info!("---- comparison stage ----");
        let start = Instant::now();
        let groups = grouper::group_records(storage.index(), reporter)?;
        let duration = start.elapsed();
        reporter.on_group_complete(groups.len(), duration.as_secs_f64());
        storage.log_event(
            duration,
            "info",
            &format!("grouped {} hashes", groups.len()),
        )?;

        Ok(GroupOutcome { duration, groups })
    }
}
