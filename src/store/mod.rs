//! Persistent extension state

pub mod notifications;

pub use notifications::{
    Notification, NotificationKind, NotificationStore, NotificationUpdate, StoreError,
};
