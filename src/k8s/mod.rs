//! Kubernetes operations

pub mod kubectl;
pub mod secret;
pub mod services;

pub use secret::PullSecret;
