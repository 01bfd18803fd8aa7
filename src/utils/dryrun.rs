//! Dry-run mode utilities

use colored::Colorize;
use std::sync::atomic::{AtomicBool, Ordering};

static DRY_RUN: AtomicBool = AtomicBool::new(false);

/// Enable or disable dry-run mode for the rest of the process
pub fn set_dry_run(enabled: bool) {
    DRY_RUN.store(enabled, Ordering::SeqCst);
}

/// Check if dry-run mode is enabled
pub fn is_dry_run() -> bool {
    DRY_RUN.load(Ordering::SeqCst)
}

/// Log a dry-run action
pub fn log_action(action: &str) {
    if is_dry_run() {
        print_action(action);
    }
}

fn print_action(action: &str) {
    eprintln!("  {} {}", "[DRY RUN]".cyan().bold(), action);
}

/// Execute function and return value only if not in dry-run mode
/// Returns default value in dry-run mode
pub fn exec_unless_dry_run_with_default<F, T>(
    action_desc: &str,
    default: T,
    f: F,
) -> anyhow::Result<T>
where
    F: FnOnce() -> anyhow::Result<T>,
{
    exec_or_default(is_dry_run(), action_desc, default, f)
}

fn exec_or_default<F, T>(dry_run: bool, action_desc: &str, default: T, f: F) -> anyhow::Result<T>
where
    F: FnOnce() -> anyhow::Result<T>,
{
    if dry_run {
        print_action(action_desc);
        Ok(default)
    } else {
        f()
    }
}
