use dry_core::ProgressReporter;
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

const TICK_CHARS: &str = "⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏";

/// CLI progress reporter using indicatif progress bars.
///
/// - Prescan: spinner
/// - Indexing: bar when the prescan total is known, spinner otherwise
/// - Grouping: bar over the candidate hashes
pub struct CliReporter {
    bar: Mutex<Option<ProgressBar>>,
    total_files: Mutex<Option<u64>>,
    hidden: bool,
}

impl CliReporter {
    pub fn new(hidden: bool) -> Self {
        Self {
            bar: Mutex::new(None),
            total_files: Mutex::new(None),
            hidden,
        }
    }

    fn lock_bar(&self) -> MutexGuard<'_, Option<ProgressBar>> {
        self.bar.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn set_bar(&self, pb: ProgressBar) {
        if self.hidden {
            pb.set_draw_target(ProgressDrawTarget::hidden());
        }
        let mut guard = self.lock_bar();
        if let Some(old) = guard.take() {
            old.finish_and_clear();
        }
        *guard = Some(pb);
    }

    fn finish_bar(&self) {
        if let Some(pb) = self.lock_bar().take() {
            pb.finish_and_clear();
        }
    }

    fn spinner(&self, message: &'static str) {
        let pb = ProgressBar::new_spinner();
        pb.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner())
                .tick_chars(TICK_CHARS),
        );
        pb.set_message(message);
        pb.enable_steady_tick(Duration::from_millis(80));
        self.set_bar(pb);
    }

    fn bar(&self, len: u64, template: &str) {
        let pb = ProgressBar::new(len);
        pb.set_style(
            ProgressStyle::with_template(template)
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("━╸─")
                .tick_chars(TICK_CHARS),
        );
        pb.enable_steady_tick(Duration::from_millis(80));
        self.set_bar(pb);
    }

    fn done(&self, line: String) {
        self.finish_bar();
        if !self.hidden {
            eprintln!("  \x1b[32m✓\x1b[0m {}", line);
        }
    }
}

impl ProgressReporter for CliReporter {
    fn on_prescan_start(&self) {
        self.spinner("Counting files...");
    }

    fn on_prescan_complete(&self, total_files: u64) {
        *self
            .total_files
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = Some(total_files);
        self.done(format!("Prescan complete: {} files", total_files));
    }

    fn on_index_start(&self) {
        let total = *self
            .total_files
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        match total {
            Some(total) => self.bar(
                total,
                "  {spinner:.cyan} Indexing [{bar:30.cyan/dim}] {pos}/{len} files ({eta} remaining) {msg}",
            ),
            None => self.spinner("Indexing files..."),
        }
    }

    fn on_hash_progress(&self, message: &str) {
        if let Some(pb) = self.lock_bar().as_ref() {
            pb.set_message(message.to_string());
        }
    }

    fn on_file_indexed(&self, files_indexed: u64, _path: &str) {
        if let Some(pb) = self.lock_bar().as_ref() {
            pb.set_position(files_indexed);
        }
    }

    fn on_index_complete(&self, files_indexed: u64, duration_secs: f64) {
        self.done(format!(
            "Indexing complete: {} files in {:.2}s",
            files_indexed, duration_secs
        ));
    }

    fn on_group_start(&self, candidate_hashes: usize) {
        self.bar(
            candidate_hashes as u64,
            "  {spinner:.cyan} Comparing [{bar:30.cyan/dim}] {pos}/{len} hashes {msg}",
        );
    }

    fn on_group_progress(&self, message: &str) {
        if let Some(pb) = self.lock_bar().as_ref() {
            pb.inc(1);
            pb.set_message(message.to_string());
        }
    }

    fn on_group_complete(&self, groups: usize, duration_secs: f64) {
        self.done(format!(
            "Comparison complete: {} groups in {:.2}s",
            groups, duration_secs
        ));
    }
}
