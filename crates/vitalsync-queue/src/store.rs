//! Action persistence store.

use async_trait::async_trait;
use std::path::PathBuf;
use tokio::fs;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::action::{ActionStatus, QueuedAction};
use crate::error::QueueError;

/// Action store trait for persistence.
///
/// The store is the sole owner of the persisted representation; all
/// mutation is funneled through [`crate::queue::ActionQueue`].
#[async_trait]
pub trait ActionStore: Send + Sync {
    /// Save an action. A successful return guarantees the action is
    /// recoverable after a process restart.
    async fn save(&self, action: &QueuedAction) -> Result<(), QueueError>;

    /// Load an action by ID.
    async fn load(&self, id: &Uuid) -> Result<Option<QueuedAction>, QueueError>;

    /// Load all persisted actions in insertion order.
    async fn load_all(&self) -> Result<Vec<QueuedAction>, QueueError>;

    /// Delete an action.
    async fn delete(&self, id: &Uuid) -> Result<(), QueueError>;

    /// Update an existing action.
    async fn update(&self, action: &QueuedAction) -> Result<(), QueueError>;

    /// Approximate serialized size of the persisted queue in bytes.
    async fn footprint(&self) -> Result<u64, QueueError>;
}

/// In-memory action store for tests and ephemeral hosts.
pub struct MemoryActionStore {
    actions: tokio::sync::RwLock<std::collections::HashMap<Uuid, QueuedAction>>,
}

impl MemoryActionStore {
    /// Create a new memory store.
    pub fn new() -> Self {
        Self {
            actions: tokio::sync::RwLock::new(std::collections::HashMap::new()),
        }
    }
}

impl Default for MemoryActionStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ActionStore for MemoryActionStore {
    async fn save(&self, action: &QueuedAction) -> Result<(), QueueError> {
        let mut actions = self.actions.write().await;
        actions.insert(action.id, action.clone());
        Ok(())
    }

    async fn load(&self, id: &Uuid) -> Result<Option<QueuedAction>, QueueError> {
        let actions = self.actions.read().await;
        Ok(actions.get(id).cloned())
    }

    async fn load_all(&self) -> Result<Vec<QueuedAction>, QueueError> {
        let actions = self.actions.read().await;
        let mut all: Vec<_> = actions.values().cloned().collect();
        all.sort_by(|a, b| {
            a.created_at
                .cmp(&b.created_at)
                .then_with(|| a.id.cmp(&b.id))
        });
        Ok(all)
    }

    async fn delete(&self, id: &Uuid) -> Result<(), QueueError> {
        let mut actions = self.actions.write().await;
        actions.remove(id);
        Ok(())
    }

    async fn update(&self, action: &QueuedAction) -> Result<(), QueueError> {
        self.save(action).await
    }

    async fn footprint(&self) -> Result<u64, QueueError> {
        let actions = self.actions.read().await;
        let mut total = 0u64;
        for action in actions.values() {
            let bytes = serde_json::to_vec(action)
                .map_err(|e| QueueError::Serialization(e.to_string()))?;
            total += bytes.len() as u64;
        }
        Ok(total)
    }
}

/// File system based action store for persistence.
///
/// Actions are stored as individual JSON files organized by status:
/// ```text
/// {storage_path}/
/// └── actions/
///     ├── pending/
///     │   └── {uuid}.json
///     ├── in_flight/
///     │   └── {uuid}.json
///     └── failed/
///         └── {uuid}.json
/// ```
///
/// Succeeded actions are deleted rather than archived. Writes go through
/// a temp file and rename so a half-written file never shadows an action.
pub struct FileActionStore {
    /// Base storage path.
    storage_path: PathBuf,
}

impl FileActionStore {
    /// Create a new file-based action store.
    ///
    /// # Arguments
    /// * `storage_path` - Base directory for storing action files
    pub async fn new(storage_path: impl Into<PathBuf>) -> Result<Self, QueueError> {
        let storage_path = storage_path.into();
        let actions_dir = storage_path.join("actions");

        for status_dir in &["pending", "in_flight", "failed"] {
            let dir = actions_dir.join(status_dir);
            fs::create_dir_all(&dir).await.map_err(|e| {
                QueueError::Storage(format!("Failed to create {} directory: {}", status_dir, e))
            })?;
        }

        debug!("FileActionStore initialized at {:?}", storage_path);

        Ok(Self { storage_path })
    }

    /// Get the actions directory path.
    fn actions_dir(&self) -> PathBuf {
        self.storage_path.join("actions")
    }

    /// Get the directory for a specific status.
    fn status_dir(&self, status: ActionStatus) -> PathBuf {
        let status_name = match status {
            ActionStatus::Pending => "pending",
            ActionStatus::InFlight => "in_flight",
            // Succeeded actions are never written; route them to failed
            // so a stray save stays visible instead of vanishing.
            ActionStatus::Failed | ActionStatus::Succeeded => "failed",
        };
        self.actions_dir().join(status_name)
    }

    /// Get the file path for an action in a specific status directory.
    fn action_path(&self, id: &Uuid, status: ActionStatus) -> PathBuf {
        self.status_dir(status).join(format!("{}.json", id))
    }

    /// Find the current location of an action file.
    async fn find_action_file(&self, id: &Uuid) -> Option<(PathBuf, ActionStatus)> {
        let statuses = [
            ActionStatus::Pending,
            ActionStatus::InFlight,
            ActionStatus::Failed,
        ];

        for status in statuses {
            let path = self.action_path(id, status);
            if path.exists() {
                return Some((path, status));
            }
        }
        None
    }

    /// Read all actions from one status directory.
    async fn load_dir(
        &self,
        status: ActionStatus,
        out: &mut Vec<QueuedAction>,
    ) -> Result<(), QueueError> {
        let dir = self.status_dir(status);
        if !dir.exists() {
            return Ok(());
        }

        let mut entries = fs::read_dir(&dir)
            .await
            .map_err(|e| QueueError::Storage(format!("Failed to read {:?}: {}", dir, e)))?;

        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| QueueError::Storage(format!("Failed to read directory entry: {}", e)))?
        {
            let path = entry.path();

            if path.extension().map_or(false, |ext| ext == "json") {
                match fs::read_to_string(&path).await {
                    Ok(content) => match serde_json::from_str::<QueuedAction>(&content) {
                        Ok(action) => out.push(action),
                        Err(e) => {
                            warn!("Failed to deserialize action from {:?}: {}", path, e);
                        }
                    },
                    Err(e) => {
                        warn!("Failed to read action file {:?}: {}", path, e);
                    }
                }
            }
        }

        Ok(())
    }
}

#[async_trait]
impl ActionStore for FileActionStore {
    async fn save(&self, action: &QueuedAction) -> Result<(), QueueError> {
        // Remove any existing file for this action if its status moved
        if let Some((old_path, old_status)) = self.find_action_file(&action.id).await {
            if old_status != action.status {
                fs::remove_file(&old_path).await.ok(); // Ignore errors on cleanup
            }
        }

        let path = self.action_path(&action.id, action.status);
        let tmp_path = path.with_extension("json.tmp");

        let content = serde_json::to_string_pretty(action)
            .map_err(|e| QueueError::Serialization(format!("Failed to serialize action: {}", e)))?;

        fs::write(&tmp_path, content)
            .await
            .map_err(|e| QueueError::Storage(format!("Failed to write action file: {}", e)))?;

        fs::rename(&tmp_path, &path)
            .await
            .map_err(|e| QueueError::Storage(format!("Failed to commit action file: {}", e)))?;

        debug!("Saved action '{}' to {:?}", action.id, path);
        Ok(())
    }

    async fn load(&self, id: &Uuid) -> Result<Option<QueuedAction>, QueueError> {
        let Some((path, _)) = self.find_action_file(id).await else {
            return Ok(None);
        };

        let content = fs::read_to_string(&path)
            .await
            .map_err(|e| QueueError::Storage(format!("Failed to read action file: {}", e)))?;

        let action: QueuedAction = serde_json::from_str(&content).map_err(|e| {
            QueueError::Serialization(format!("Failed to deserialize action: {}", e))
        })?;

        Ok(Some(action))
    }

    async fn load_all(&self) -> Result<Vec<QueuedAction>, QueueError> {
        let mut actions = Vec::new();

        for status in [
            ActionStatus::Pending,
            ActionStatus::InFlight,
            ActionStatus::Failed,
        ] {
            self.load_dir(status, &mut actions).await?;
        }

        // Replay order is enqueue order
        actions.sort_by(|a, b| {
            a.created_at
                .cmp(&b.created_at)
                .then_with(|| a.id.cmp(&b.id))
        });

        debug!("Loaded {} persisted actions", actions.len());
        Ok(actions)
    }

    async fn delete(&self, id: &Uuid) -> Result<(), QueueError> {
        if let Some((path, _)) = self.find_action_file(id).await {
            fs::remove_file(&path)
                .await
                .map_err(|e| QueueError::Storage(format!("Failed to delete action file: {}", e)))?;
            debug!("Deleted action '{}'", id);
        }

        Ok(())
    }

    async fn update(&self, action: &QueuedAction) -> Result<(), QueueError> {
        self.save(action).await
    }

    async fn footprint(&self) -> Result<u64, QueueError> {
        let mut total = 0u64;

        for status in [
            ActionStatus::Pending,
            ActionStatus::InFlight,
            ActionStatus::Failed,
        ] {
            let dir = self.status_dir(status);
            if !dir.exists() {
                continue;
            }

            let mut entries = fs::read_dir(&dir)
                .await
                .map_err(|e| QueueError::Storage(format!("Failed to read {:?}: {}", dir, e)))?;

            while let Some(entry) = entries.next_entry().await.map_err(|e| {
                QueueError::Storage(format!("Failed to read directory entry: {}", e))
            })? {
                if entry.path().extension().map_or(false, |ext| ext == "json") {
                    let meta = entry.metadata().await.map_err(|e| {
                        QueueError::Storage(format!("Failed to read file metadata: {}", e))
                    })?;
                    total += meta.len();
                }
            }
        }

        Ok(total)
    }
}
