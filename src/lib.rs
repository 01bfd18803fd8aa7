//! appco: backend service and host CLI for the SUSE Application Collection extension

pub mod backend;
pub mod commands;
pub mod config;
pub mod credentials;
pub mod docker;
pub mod helm;
pub mod k8s;
pub mod server;
pub mod store;
pub mod utils;
