//! Helm operations: registry auth, releases and chart values

pub mod cli;
pub mod registry;
pub mod release;
pub mod values;

pub use cli::HelmCli;
pub use release::{ChartArtifact, Release, ReleaseDetails, ValueOverride, WorkloadStatus};
pub use values::LocalValue;
