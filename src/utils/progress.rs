//! Progress indicators for long-running operations

use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

/// Create a spinner for indeterminate operations
pub fn create_spinner(message: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.cyan} {msg}") {
        pb.set_style(style.tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]));
    }
    pb.set_message(message.to_string());
    pb.enable_steady_tick(Duration::from_millis(80));
    pb
}

/// Spinner for a single named step (a helm call, a registry login)
pub struct StepProgress {
    pb: ProgressBar,
    step: String,
}

impl StepProgress {
    pub fn new(step: &str) -> Self {
        Self {
            pb: create_spinner(step),
            step: step.to_string(),
        }
    }

    pub fn update(&self, status: &str) {
        self.pb.set_message(format!("{}: {}", self.step, status));
    }

    pub fn finish_success(&self) {
        self.pb.finish_with_message(format!("✓ {}", self.step));
    }

    pub fn finish_error(&self, error: &str) {
        self.pb
            .finish_with_message(format!("✗ {} failed: {}", self.step, error));
    }

    pub fn finish(&self) {
        self.pb.finish_and_clear();
    }
}

/// Run `f` under a spinner, reporting success or failure on completion
pub fn with_spinner<T, F>(step: &str, f: F) -> anyhow::Result<T>
where
    F: FnOnce() -> anyhow::Result<T>,
{
    let progress = StepProgress::new(step);
    match f() {
        Ok(value) => {
            progress.finish_success();
            Ok(value)
        }
        Err(e) => {
            progress.finish_error(&e.to_string());
            Err(e)
        }
    }
}
