//! Terminal progress for batch checks
//!
//! Wraps an optional indicatif bar; every method is a no-op when progress is
//! disabled (quiet mode, JSON output or tests).

use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

const SPINNER_TEMPLATE: &str = "{spinner:.cyan} {msg}";
const BAR_TEMPLATE: &str = "{spinner:.cyan} {msg} [{bar:30.cyan/blue}] {pos}/{len} ({eta})";

/// Progress reporter backed by indicatif
pub struct Progress {
    enabled: bool,
    bar: Option<ProgressBar>,
}

impl Progress {
    /// Create a reporter; nothing is drawn unless `enabled`
    pub fn new(enabled: bool) -> Self {
        Self { enabled, bar: None }
    }

    /// Create a reporter that never draws
    pub fn disabled() -> Self {
        Self::new(false)
    }

    /// Returns true if the reporter draws anything
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Show a spinner for work of unknown length
    pub fn spinner(&mut self, message: &str) {
        if !self.enabled {
            return;
        }

        let style = ProgressStyle::default_spinner()
            .template(SPINNER_TEMPLATE)
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏");
        self.replace(ProgressBar::new_spinner(), style, message, 80);
    }

    /// Show a bar for `total` items
    pub fn start(&mut self, total: u64, message: &str) {
        if !self.enabled {
            return;
        }

        let style = ProgressStyle::default_bar()
            .template(BAR_TEMPLATE)
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("█▓▒░");
        self.replace(ProgressBar::new(total), style, message, 100);
    }

    fn replace(&mut self, bar: ProgressBar, style: ProgressStyle, message: &str, tick_ms: u64) {
        if let Some(old) = self.bar.take() {
            old.finish_and_clear();
        }
        bar.set_style(style);
        bar.set_message(message.to_string());
        bar.enable_steady_tick(Duration::from_millis(tick_ms));
        self.bar = Some(bar);
    }

    /// Advance by one item
    pub fn inc(&self) {
        if let Some(bar) = &self.bar {
            bar.inc(1);
        }
    }

    /// Replace the message next to the bar
    pub fn set_message(&self, message: &str) {
        if let Some(bar) = &self.bar {
            bar.set_message(message.to_string());
        }
    }

    /// Remove the bar from the terminal
    pub fn finish_and_clear(&mut self) {
        if let Some(bar) = self.bar.take() {
            bar.finish_and_clear();
        }
    }
}

impl Default for Progress {
    fn default() -> Self {
        Self::new(true)
    }
}
