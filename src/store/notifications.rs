//! Flat-file notification store

use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Notification does not exist [notificationId={id}]")]
    NotFound { id: String },

    #[error("Notification with the same id already exists [notificationId={id}]")]
    AlreadyExists { id: String },

    #[error("Failed to access notification store {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Notification store {} is corrupt: {source}", path.display())]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationKind {
    Info,
    Success,
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    /// Empty until the store assigns one
    #[serde(default)]
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(rename = "type")]
    pub kind: NotificationKind,
    #[serde(default)]
    pub dismissed: bool,
    /// Milliseconds since the epoch
    pub timestamp: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub href: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action_text: Option<String>,
}

fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

impl Notification {
    pub fn new(kind: NotificationKind, title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            id: new_id(),
            title: title.into(),
            description: description.into(),
            kind,
            dismissed: false,
            timestamp: chrono::Utc::now().timestamp_millis(),
            href: None,
            action_text: None,
        }
    }
}

/// Partial update; absent fields are left untouched
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<NotificationKind>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dismissed: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub href: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action_text: Option<String>,
}

impl NotificationUpdate {
    pub fn dismiss() -> Self {
        Self {
            dismissed: Some(true),
            ..Default::default()
        }
    }

    fn apply(self, target: &mut Notification) {
        if let Some(title) = self.title {
            target.title = title;
        }
        if let Some(description) = self.description {
            target.description = description;
        }
        if let Some(kind) = self.kind {
            target.kind = kind;
        }
        if let Some(dismissed) = self.dismissed {
            target.dismissed = dismissed;
        }
        if let Some(timestamp) = self.timestamp {
            target.timestamp = timestamp;
        }
        if self.href.is_some() {
            target.href = self.href;
        }
        if self.action_text.is_some() {
            target.action_text = self.action_text;
        }
    }
}

fn assign_missing_ids(notifications: &mut [Notification]) -> bool {
    let mut assigned = false;
    for n in notifications.iter_mut().filter(|n| n.id.is_empty()) {
        n.id = new_id();
        assigned = true;
    }
    assigned
}

/// Newest first; ties keep their stored order
pub fn sort_newest_first(notifications: &mut [Notification]) {
    notifications.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
}

/// JSON array on disk. Every operation rereads the file and holds the store
/// lock for its whole read-modify-write.
#[derive(Debug)]
pub struct NotificationStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl NotificationStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn guard(&self) -> std::sync::MutexGuard<'_, ()> {
        // The guarded data is (), a panic mid-operation leaves nothing to repair
        self.lock.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn read_unlocked(&self) -> Result<Vec<Notification>, StoreError> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }

        let raw = std::fs::read_to_string(&self.path).map_err(|source| StoreError::Io {
            path: self.path.clone(),
            source,
        })?;

        if raw.trim().is_empty() {
            return Ok(Vec::new());
        }

        let mut notifications: Vec<Notification> =
            serde_json::from_str(&raw).map_err(|source| StoreError::Corrupt {
                path: self.path.clone(),
                source,
            })?;

        // Entries written without an id get one, persisted so it stays stable
        if assign_missing_ids(&mut notifications) {
            self.write_unlocked(&notifications)?;
        }
        Ok(notifications)
    }

    fn write_unlocked(&self, notifications: &[Notification]) -> Result<(), StoreError> {
        let io_err = |source| StoreError::Io {
            path: self.path.clone(),
            source,
        };

        let parent = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        std::fs::create_dir_all(&parent).map_err(io_err)?;

        let json = serde_json::to_vec(notifications).map_err(|source| StoreError::Corrupt {
            path: self.path.clone(),
            source,
        })?;

        // Write beside the target and rename so readers never see a partial file
        let mut temp = tempfile::NamedTempFile::new_in(&parent).map_err(io_err)?;
        temp.write_all(&json).map_err(io_err)?;
        temp.persist(&self.path).map_err(|e| io_err(e.error))?;
        Ok(())
    }

    /// Stored notifications in file order
    pub fn read(&self) -> Result<Vec<Notification>, StoreError> {
        let _guard = self.guard();
        self.read_unlocked()
    }

    /// Stored notifications, newest first
    pub fn list(&self) -> Result<Vec<Notification>, StoreError> {
        let mut notifications = self.read()?;
        sort_newest_first(&mut notifications);
        Ok(notifications)
    }

    /// Store a new notification, assigning an id when it has none.
    /// Returns what was stored.
    pub fn save(&self, mut notification: Notification) -> Result<Notification, StoreError> {
        let _guard = self.guard();
        let mut notifications = self.read_unlocked()?;

        if notification.id.is_empty() {
            notification.id = new_id();
        }

        if notifications.iter().any(|n| n.id == notification.id) {
            return Err(StoreError::AlreadyExists {
                id: notification.id,
            });
        }

        notifications.push(notification.clone());
        sort_newest_first(&mut notifications);
        self.write_unlocked(&notifications)?;
        Ok(notification)
    }

    pub fn update(&self, id: &str, update: NotificationUpdate) -> Result<Notification, StoreError> {
        let _guard = self.guard();
        let mut notifications = self.read_unlocked()?;

        let target = notifications
            .iter_mut()
            .find(|n| n.id == id)
            .ok_or_else(|| StoreError::NotFound { id: id.to_string() })?;
        update.apply(target);
        let updated = target.clone();

        self.write_unlocked(&notifications)?;
        Ok(updated)
    }

    pub fn delete(&self, id: &str) -> Result<(), StoreError> {
        let _guard = self.guard();
        let mut notifications = self.read_unlocked()?;

        let before = notifications.len();
        notifications.retain(|n| n.id != id);
        if notifications.len() == before {
            return Err(StoreError::NotFound { id: id.to_string() });
        }

        self.write_unlocked(&notifications)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn notification(id: &str, timestamp: i64) -> Notification {
        Notification {
            id: id.to_string(),
            title: format!("title {}", id),
            description: String::new(),
            kind: NotificationKind::Info,
            dismissed: false,
            timestamp,
            href: None,
            action_text: None,
        }
    }

    fn store() -> (tempfile::TempDir, NotificationStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = NotificationStore::new(dir.path().join("data").join(".notifications.json"));
        (dir, store)
    }

    #[test]
    fn test_missing_file_reads_empty() {
        let (_dir, store) = store();
        assert!(store.read().unwrap().is_empty());
    }

    #[test]
    fn test_save_sorts_newest_first() {
        let (_dir, store) = store();
        store.save(notification("a", 100)).unwrap();
        store.save(notification("b", 300)).unwrap();
        store.save(notification("c", 200)).unwrap();

        let ids: Vec<String> = store.read().unwrap().into_iter().map(|n| n.id).collect();
        assert_eq!(ids, vec!["b", "c", "a"]);
    }

    #[test]
    fn test_duplicate_id_rejected() {
        let (_dir, store) = store();
        store.save(notification("a", 100)).unwrap();
        let err = store.save(notification("a", 200)).unwrap_err();
        assert!(matches!(err, StoreError::AlreadyExists { .. }));
        assert_eq!(store.read().unwrap().len(), 1);
    }

    #[test]
    fn test_update_merges_fields() {
        let (_dir, store) = store();
        store.save(notification("a", 100)).unwrap();

        let updated = store
            .update(
                "a",
                NotificationUpdate {
                    href: Some("/workloads".to_string()),
                    ..NotificationUpdate::dismiss()
                },
            )
            .unwrap();
        assert!(updated.dismissed);
        assert_eq!(updated.title, "title a");
        assert_eq!(updated.href.as_deref(), Some("/workloads"));
        assert_eq!(store.read().unwrap()[0], updated);
    }

    #[test]
    fn test_update_and_delete_unknown() {
        let (_dir, store) = store();
        assert!(matches!(
            store.update("missing", NotificationUpdate::dismiss()),
            Err(StoreError::NotFound { .. })
        ));
        assert!(matches!(store.delete("missing"), Err(StoreError::NotFound { .. })));
    }

    #[test]
    fn test_delete() {
        let (_dir, store) = store();
        store.save(notification("a", 100)).unwrap();
        store.save(notification("b", 200)).unwrap();
        store.delete("a").unwrap();

        let ids: Vec<String> = store.read().unwrap().into_iter().map(|n| n.id).collect();
        assert_eq!(ids, vec!["b"]);
    }

    #[test]
    fn test_list_sorts_hand_edited_file() {
        let (_dir, store) = store();
        std::fs::create_dir_all(store.path().parent().unwrap()).unwrap();
        std::fs::write(
            store.path(),
            r#"[{"id":"old","title":"t","type":"warning","timestamp":1},{"id":"new","title":"t","type":"error","timestamp":5}]"#,
        )
        .unwrap();

        let list = store.list().unwrap();
        assert_eq!(list[0].id, "new");
        assert_eq!(list[1].kind, NotificationKind::Warning);
        assert!(!list[1].dismissed);
    }

    #[test]
    fn test_corrupt_file() {
        let (_dir, store) = store();
        std::fs::create_dir_all(store.path().parent().unwrap()).unwrap();
        std::fs::write(store.path(), "{not json").unwrap();
        assert!(matches!(store.read(), Err(StoreError::Corrupt { .. })));
    }

    #[test]
    fn test_wire_format_is_camel_case() {
        let mut n = notification("a", 1);
        n.action_text = Some("View details".to_string());
        let value = serde_json::to_value(&n).unwrap();
        assert_eq!(value["type"], "info");
        assert_eq!(value["actionText"], "View details");
        assert!(value.get("href").is_none());
    }

    #[test]
    fn test_stored_entry_without_id_keeps_assigned_id() {
        let (_dir, store) = store();
        std::fs::create_dir_all(store.path().parent().unwrap()).unwrap();
        std::fs::write(store.path(), r#"[{"title":"t","type":"info","timestamp":1}]"#).unwrap();

        let first = store.list().unwrap()[0].id.clone();
        assert!(!first.is_empty());
        assert_eq!(store.list().unwrap()[0].id, first);

        store.delete(&first).unwrap();
        assert!(store.list().unwrap().is_empty());
    }

    #[test]
    fn test_save_assigns_id_when_missing() {
        let (_dir, store) = store();
        let n: Notification =
            serde_json::from_str(r#"{"title":"t","type":"success","timestamp":1}"#).unwrap();
        assert!(n.id.is_empty());

        let stored = store.save(n).unwrap();
        assert!(!stored.id.is_empty());
        assert_eq!(store.read().unwrap(), vec![stored]);
    }
}
