/// Trait for reporting run progress.
///
/// The CLI implements it with indicatif bars. All methods have default
/// no-op implementations.
pub trait ProgressReporter: Send + Sync {
    fn on_prescan_start(&self) {}
    fn on_prescan_complete(&self, _total_files: u64) {}
    fn on_index_start(&self) {}
    /// Per-chunk hashing message, `"processing <path> at <percent>%"`.
    fn on_hash_progress(&self, _message: &str) {}
    fn on_file_indexed(&self, _files_indexed: u64, _path: &str) {}
    fn on_index_complete(&self, _files_indexed: u64, _duration_secs: f64) {}
    fn on_group_start(&self, _candidate_hashes: usize) {}
    /// Emitted before each hash group, `"[i of total] <hash>"`.
    fn on_group_progress(&self, _message: &str) {}
    fn on_group_complete(&self, _groups: usize, _duration_secs: f64) {}
}

/// No-op progress reporter for silent operation.
pub struct SilentReporter;

impl ProgressReporter for SilentReporter {}
