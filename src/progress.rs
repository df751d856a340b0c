//! Progress reporting and display
//!
//! The job reports through a trait so the coordinator stays decoupled from
//! how (or whether) progress is drawn.

use std::sync::Arc;

/// Status of a single fan-out unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntryStatus {
    /// Queued, waiting for a worker
    Pending,
    /// Transfer in progress
    Running,
    /// Successfully completed
    Done,
    /// Failed with error
    Failed(String),
}

/// Phase of the overall run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Phase {
    /// Removing the previous export directory
    Cleaning,
    /// Listing objects and enumerating tables
    Listing,
    /// Downloads and exports running
    Transferring,
    /// Every unit finished
    Completed,
    /// Failed with error
    Failed(String),
}

/// Progress reporter trait - implement this for different display backends.
pub trait ProgressReporter: Send + Sync {
    /// Set the overall phase.
    fn set_phase(&self, phase: Phase);

    /// Register units to track. May be called once per branch.
    fn register_entries(&self, entries: Vec<String>);

    /// Update the status of a specific unit.
    fn update_entry(&self, entry: &str, status: EntryStatus);

    /// Log an informational message.
    fn log_info(&self, message: &str);

    /// Log an error message.
    fn log_error(&self, message: &str);

    /// Finish and clean up the display.
    fn finish(&self);
}

/// A no-op reporter for when progress display is disabled.
pub struct NullReporter;

impl ProgressReporter for NullReporter {
    fn set_phase(&self, _phase: Phase) {}
    fn register_entries(&self, _entries: Vec<String>) {}
    fn update_entry(&self, _entry: &str, _status: EntryStatus) {}
    fn log_info(&self, _message: &str) {}
    fn log_error(&self, _message: &str) {}
    fn finish(&self) {}
}

/// Statistics collected during the run.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
struct Stats {
    total_entries: usize,
    successful_entries: usize,
    failed_entries: usize,
}

fn print_summary(stats: &Stats, started: std::time::Instant) {
    eprintln!();
    eprintln!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    eprintln!("📊 Summary");
    eprintln!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    eprintln!("   📄 Units:      {} total", stats.total_entries);
    eprintln!("   ✅ Successful: {}", stats.successful_entries);
    if stats.failed_entries > 0 {
        eprintln!("   ❌ Failed:     {}", stats.failed_entries);
    }
    eprintln!("   ⏱️  Duration:   {:.2}s", started.elapsed().as_secs_f64());
    eprintln!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
}

fn phase_message(phase: &Phase) -> Option<&'static str> {
    match phase {
        Phase::Cleaning => Some("🧹 Cleaning previous export..."),
        Phase::Listing => Some("📋 Listing objects and tables..."),
        Phase::Transferring => Some("☁️  Downloading objects and exporting tables..."),
        Phase::Completed => Some("✅ Completed!"),
        Phase::Failed(_) => None,
    }
}

/// A simple reporter that just prints to stderr (for non-TTY).
pub struct SimpleReporter {
    stats: std::sync::Mutex<Stats>,
    started: std::time::Instant,
}

impl SimpleReporter {
    pub fn new() -> Self {
        Self {
            stats: Default::default(),
            started: std::time::Instant::now(),
        }
    }

    fn stats(&self) -> std::sync::MutexGuard<'_, Stats> {
        self.stats.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Default for SimpleReporter {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressReporter for SimpleReporter {
    fn set_phase(&self, phase: Phase) {
        match phase_message(&phase) {
            Some(msg) => eprintln!("{msg}"),
            None => {
                if let Phase::Failed(e) = phase {
                    eprintln!("❌ Failed: {e}");
                }
            }
        }
    }

    fn register_entries(&self, entries: Vec<String>) {
        self.stats().total_entries += entries.len();
        eprintln!("   Found {} units", entries.len());
    }

    fn update_entry(&self, entry: &str, status: EntryStatus) {
        match status {
            EntryStatus::Done => {
                self.stats().successful_entries += 1;
                eprintln!("   ✓ {entry}");
            }
            EntryStatus::Failed(ref e) => {
                self.stats().failed_entries += 1;
                eprintln!("   ✗ {entry}: {e}");
            }
            EntryStatus::Pending | EntryStatus::Running => {}
        }
    }

    fn log_info(&self, message: &str) {
        eprintln!("ℹ️  {message}");
    }

    fn log_error(&self, message: &str) {
        eprintln!("❌ {message}");
    }

    fn finish(&self) {
        let stats = self.stats().clone();
        print_summary(&stats, self.started);
    }
}

/// Interactive reporter with progress bars (for TTY).
pub struct FancyReporter {
    multi: indicatif::MultiProgress,
    phase_bar: indicatif::ProgressBar,
    main_progress: indicatif::ProgressBar,
    entries: std::sync::Mutex<std::collections::HashMap<String, Option<indicatif::ProgressBar>>>,
    stats: std::sync::Mutex<Stats>,
    started: std::time::Instant,
}

impl FancyReporter {
    pub fn new() -> Self {
        let multi = indicatif::MultiProgress::new();
        let phase_bar = multi.add(indicatif::ProgressBar::new_spinner());
        if let Ok(style) = indicatif::ProgressStyle::default_spinner().template("{spinner:.cyan} {msg}") {
            phase_bar.set_style(style);
        }
        phase_bar.enable_steady_tick(std::time::Duration::from_millis(100));

        let main_progress = multi.add(indicatif::ProgressBar::new(0));
        if let Ok(style) = indicatif::ProgressStyle::default_bar()
            .template("   {bar:40.cyan/blue} {pos}/{len} units")
        {
            main_progress.set_style(style.progress_chars("█▓▒░  "));
        }

        Self {
            multi,
            phase_bar,
            main_progress,
            entries: Default::default(),
            stats: Default::default(),
            started: std::time::Instant::now(),
        }
    }

    fn status_emoji(status: &EntryStatus) -> &'static str {
        match status {
            EntryStatus::Pending => "⏳",
            EntryStatus::Running => "⚙️ ",
            EntryStatus::Done => "✅",
            EntryStatus::Failed(_) => "❌",
        }
    }

    fn stats(&self) -> std::sync::MutexGuard<'_, Stats> {
        self.stats.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Default for FancyReporter {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressReporter for FancyReporter {
    fn set_phase(&self, phase: Phase) {
        let Some(msg) = phase_message(&phase) else {
            if let Phase::Failed(e) = phase {
                self.phase_bar
                    .finish_with_message(format!("❌ Failed: {e}"));
            }
            return;
        };
        if matches!(phase, Phase::Completed) {
            self.phase_bar.finish_with_message(msg);
        } else {
            self.phase_bar.set_message(msg);
        }
    }

    fn register_entries(&self, entries: Vec<String>) {
        self.stats().total_entries += entries.len();
        self.main_progress.inc_length(entries.len() as u64);

        // Bars are created lazily once a unit starts running
        let mut map = self.entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        for entry in entries {
            map.insert(entry, None);
        }
    }

    fn update_entry(&self, entry: &str, status: EntryStatus) {
        let mut map = self.entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner());

        if matches!(status, EntryStatus::Done | EntryStatus::Failed(_)) {
            if let Some(Some(pb)) = map.remove(entry) {
                pb.finish_and_clear();
            }
            self.main_progress.inc(1);

            let mut stats = self.stats();
            match status {
                EntryStatus::Done => stats.successful_entries += 1,
                EntryStatus::Failed(ref e) => {
                    stats.failed_entries += 1;
                    self.multi.println(format!("❌ {entry}: {e}")).ok();
                }
                _ => {}
            }
            return;
        }

        if let Some(slot) = map.get_mut(entry) {
            let msg = format!("{} {entry}", Self::status_emoji(&status));
            match slot {
                Some(pb) => pb.set_message(msg),
                None => {
                    let pb = self.multi.add(indicatif::ProgressBar::new_spinner());
                    if let Ok(style) = indicatif::ProgressStyle::default_spinner().template("   {msg}") {
                        pb.set_style(style);
                    }
                    pb.set_message(msg);
                    pb.enable_steady_tick(std::time::Duration::from_millis(100));
                    *slot = Some(pb);
                }
            }
        }
    }

    fn log_info(&self, message: &str) {
        self.multi.println(format!("ℹ️  {message}")).ok();
    }

    fn log_error(&self, message: &str) {
        self.multi.println(format!("❌ {message}")).ok();
    }

    fn finish(&self) {
        let map = self.entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        for pb in map.values().flatten() {
            pb.finish_and_clear();
        }
        self.main_progress.finish_and_clear();
        self.phase_bar.finish_and_clear();

        let stats = self.stats().clone();
        print_summary(&stats, self.started);
    }
}

/// Create an appropriate reporter based on terminal capabilities.
pub fn create_reporter() -> Arc<dyn ProgressReporter> {
    if console::Term::stderr().is_term() {
        Arc::new(FancyReporter::new())
    } else {
        Arc::new(SimpleReporter::new())
    }
}
