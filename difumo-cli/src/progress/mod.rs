//! Progress reporting module

use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

const TEMPLATE: &str = "[{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} {prefix} {msg}";

/// Progress reporter for per-dimension work
pub struct ProgressReporter {
    progress_bar: Option<ProgressBar>,
    quiet: bool,
}

impl ProgressReporter {
    /// Create a new progress reporter
    pub fn new(quiet: bool) -> Self {
        Self {
            progress_bar: None,
            quiet,
        }
    }

    /// Initialize the bar for `total` steps counted in `unit`
    pub fn init(&mut self, total: u64, unit: &'static str) {
        if self.quiet {
            return;
        }

        let style = ProgressStyle::default_bar()
            .template(TEMPLATE)
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("##-");

        let pb = ProgressBar::new(total);
        pb.set_style(style);
        pb.set_prefix(unit);
        pb.enable_steady_tick(Duration::from_millis(100));

        self.progress_bar = Some(pb);
    }

    /// Show what is being worked on
    pub fn started(&self, what: &str) {
        if let Some(pb) = &self.progress_bar {
            pb.set_message(what.to_string());
        }
    }

    /// Count one finished step
    pub fn completed(&self, what: &str) {
        if let Some(pb) = &self.progress_bar {
            pb.set_message(format!("Done: {what}"));
            pb.inc(1);
        }
    }

    /// Finish progress reporting
    pub fn finish(&self) {
        if let Some(pb) = &self.progress_bar {
            pb.finish_with_message("Complete");
        }
    }

    /// Whether a bar is being drawn
    pub fn is_active(&self) -> bool {
        self.progress_bar.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quiet_reporter_draws_nothing() {
        let mut reporter = ProgressReporter::new(true);
        reporter.init(5, "dimensions");
        assert!(!reporter.is_active());
        reporter.completed("64");
        reporter.finish();
    }

    #[test]
    fn test_reporter_counts_steps() {
        let mut reporter = ProgressReporter::new(false);
        reporter.init(2, "dimensions");
        assert!(reporter.is_active());
        reporter.started("64");
        reporter.completed("64");
        if let Some(pb) = &reporter.progress_bar {
            assert_eq!(pb.position(), 1);
        }
        reporter.finish();
    }
}
