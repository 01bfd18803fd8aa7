//! Utility modules for appco

pub mod dryrun;
pub mod errors;
pub mod logger;
pub mod prereqs;
pub mod process;
pub mod progress;
pub mod prompt;

// Re-export commonly used items
pub use errors::{AppcoError, enhance_error};
pub use logger::{log_error, log_info, log_warn};
pub use prereqs::{CommonPrereqs, Prerequisite};
pub use process::{CommandError, CommandOutput, HostCommand};
pub use prompt::confirm;
