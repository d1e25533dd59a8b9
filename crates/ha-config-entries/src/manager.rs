//! Config Entries Manager
//!
//! Manages the lifecycle of configuration entries.

use std::sync::Arc;

use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::entry::{ConfigEntry, ConfigEntryState};
use crate::storage::{Storage, StorageError, StorageFile, StorageResult};

/// Storage key for config entries
pub const STORAGE_KEY: &str = "core.config_entries";
pub const STORAGE_VERSION: u32 = 1;
pub const STORAGE_MINOR_VERSION: u32 = 5;

#[derive(Debug, Error)]
pub enum ConfigEntriesError {
    #[error("Entry not found: {0}")]
    NotFound(String),

    #[error("Entry already exists for domain {domain} with unique_id {unique_id}")]
    AlreadyExists { domain: String, unique_id: String },

    #[error("Setup failed: {0}")]
    SetupFailed(String),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

pub type ConfigEntriesResult<T> = Result<T, ConfigEntriesError>;

/// Config entries data for storage
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConfigEntriesData {
    pub entries: Vec<ConfigEntry>,
}

/// Setup handler function type
pub type SetupHandler = Arc<dyn Fn(&ConfigEntry) -> Result<(), String> + Send + Sync + 'static>;

/// Config Entries Manager
///
/// Entries of a domain are returned in the order they were added, so
/// "the first entry of a domain" is stable across calls and restarts.
pub struct ConfigEntries {
    /// `None` keeps entries in memory only
    storage: Option<Storage>,

    /// Primary index: entry_id -> ConfigEntry
    entries: DashMap<String, ConfigEntry>,

    /// Index: domain -> entry_ids in insertion order
    by_domain: DashMap<String, Vec<String>>,

    /// Serializes setup runs
    setup_lock: Mutex<()>,

    setup_handlers: DashMap<String, SetupHandler>,
}

impl ConfigEntries {
    /// Create a manager persisting to `storage`
    pub fn new(storage: Storage) -> Self {
        Self::with_storage(Some(storage))
    }

    /// Create a manager that never touches disk
    pub fn in_memory() -> Self {
        Self::with_storage(None)
    }

    fn with_storage(storage: Option<Storage>) -> Self {
        Self {
            storage,
            entries: DashMap::new(),
            by_domain: DashMap::new(),
            setup_lock: Mutex::new(()),
            setup_handlers: DashMap::new(),
        }
    }

    /// Load entries from storage
    pub async fn load(&self) -> StorageResult<()> {
        let Some(storage) = &self.storage else {
            return Ok(());
        };

        if let Some(storage_file) = storage.load::<ConfigEntriesData>(STORAGE_KEY).await? {
            info!(
                "Loading {} config entries from storage (v{}.{})",
                storage_file.data.entries.len(),
                storage_file.version,
                storage_file.minor_version
            );

            for entry in storage_file.data.entries {
                self.index_entry(entry);
            }
        }
        Ok(())
    }

    /// Save entries to storage, in insertion order per domain
    pub async fn save(&self) -> StorageResult<()> {
        let Some(storage) = &self.storage else {
            return Ok(());
        };

        let mut domains: Vec<String> = self.by_domain.iter().map(|r| r.key().clone()).collect();
        domains.sort();
        let entries = domains
            .iter()
            .flat_map(|domain| self.get_by_domain(domain))
            .collect();

        let storage_file = StorageFile::new(
            STORAGE_KEY,
            ConfigEntriesData { entries },
            STORAGE_VERSION,
            STORAGE_MINOR_VERSION,
        );

        storage.save(&storage_file).await?;
        debug!("Saved {} config entries to storage", self.entries.len());
        Ok(())
    }

    fn index_entry(&self, entry: ConfigEntry) {
        self.by_domain
            .entry(entry.domain.clone())
            .or_default()
            .push(entry.entry_id.clone());
        self.entries.insert(entry.entry_id.clone(), entry);
    }

    pub fn get(&self, entry_id: &str) -> Option<ConfigEntry> {
        self.entries.get(entry_id).map(|r| r.value().clone())
    }

    /// All entries for a domain, oldest first
    pub fn get_by_domain(&self, domain: &str) -> Vec<ConfigEntry> {
        let ids = self
            .by_domain
            .get(domain)
            .map(|ids| ids.value().clone())
            .unwrap_or_default();
        ids.iter().filter_map(|id| self.get(id)).collect()
    }

    pub fn get_by_unique_id(&self, domain: &str, unique_id: &str) -> Option<ConfigEntry> {
        self.get_by_domain(domain)
            .into_iter()
            .find(|e| e.unique_id.as_deref() == Some(unique_id))
    }

    /// Add a new config entry and persist
    pub async fn add(&self, entry: ConfigEntry) -> ConfigEntriesResult<ConfigEntry> {
        if let Some(ref unique_id) = entry.unique_id {
            if self.get_by_unique_id(&entry.domain, unique_id).is_some() {
                return Err(ConfigEntriesError::AlreadyExists {
                    domain: entry.domain.clone(),
                    unique_id: unique_id.clone(),
                });
            }
        }

        self.index_entry(entry.clone());
        self.save().await?;

        info!(
            "Added config entry: {} ({}) [{}]",
            entry.title, entry.domain, entry.entry_id
        );
        Ok(entry)
    }

    /// Remove an entry and persist
    pub async fn remove(&self, entry_id: &str) -> ConfigEntriesResult<ConfigEntry> {
        let (_, entry) = self
            .entries
            .remove(entry_id)
            .ok_or_else(|| ConfigEntriesError::NotFound(entry_id.to_string()))?;

        if let Some(mut ids) = self.by_domain.get_mut(&entry.domain) {
            ids.retain(|id| id != entry_id);
        }
        self.by_domain.remove_if(&entry.domain, |_, ids| ids.is_empty());
        self.save().await?;

        info!(
            "Removed config entry: {} ({}) [{}]",
            entry.title, entry.domain, entry_id
        );
        Ok(entry)
    }

    pub fn set_state(&self, entry_id: &str, state: ConfigEntryState, reason: Option<String>) {
        if let Some(mut entry) = self.entries.get_mut(entry_id) {
            entry.state = state;
            entry.reason = reason;
            debug!("Entry {} state changed to {:?}", entry_id, state);
        }
    }

    /// Register a setup handler for a domain, replacing any previous one
    pub fn register_setup_handler(&self, domain: &str, handler: SetupHandler) {
        self.setup_handlers.insert(domain.to_string(), handler);
        debug!("Registered setup handler for domain: {}", domain);
    }

    pub fn has_setup_handler(&self, domain: &str) -> bool {
        self.setup_handlers.contains_key(domain)
    }

    /// Set up an entry by running its domain's setup handler
    pub async fn setup(&self, entry_id: &str) -> ConfigEntriesResult<()> {
        let _lock = self.setup_lock.lock().await;

        let entry = self
            .get(entry_id)
            .ok_or_else(|| ConfigEntriesError::NotFound(entry_id.to_string()))?;

        if entry.is_disabled() {
            debug!("Skipping setup for disabled entry: {}", entry_id);
            return Ok(());
        }

        self.set_state(entry_id, ConfigEntryState::SetupInProgress, None);

        let handler = self
            .setup_handlers
            .get(&entry.domain)
            .map(|h| Arc::clone(h.value()));

        match handler {
            Some(handler) => match handler(&entry) {
                Ok(()) => {
                    self.set_state(entry_id, ConfigEntryState::Loaded, None);
                    info!("Setup completed for entry: {} ({})", entry.title, entry_id);
                }
                Err(reason) => {
                    warn!("Setup failed for entry {}: {}", entry_id, reason);
                    self.set_state(entry_id, ConfigEntryState::SetupError, Some(reason.clone()));
                    return Err(ConfigEntriesError::SetupFailed(reason));
                }
            },
            None => {
                self.set_state(entry_id, ConfigEntryState::Loaded, None);
                debug!(
                    "No setup handler for domain {}, marking as loaded",
                    entry.domain
                );
            }
        }

        Ok(())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entry::ConfigEntrySource;
    use tempfile::TempDir;
    use tokio_test::{assert_err, assert_ok};

    fn create_test_manager() -> (TempDir, ConfigEntries) {
        let temp_dir = TempDir::new().unwrap();
        let manager = ConfigEntries::new(Storage::new(temp_dir.path()));
        (temp_dir, manager)
    }

    #[tokio::test]
    async fn test_add_entry() {
        let (_dir, manager) = create_test_manager();

        let entry = ConfigEntry::new("duofern", "Stick")
            .with_unique_id("6f3a")
            .with_source(ConfigEntrySource::Import);

        let added = manager.add(entry).await.unwrap();
        assert_eq!(added.domain, "duofern");
        assert_eq!(manager.len(), 1);
    }

    #[tokio::test]
    async fn test_duplicate_unique_id_rejected() {
        let (_dir, manager) = create_test_manager();

        let entry1 = ConfigEntry::new("duofern", "Stick 1").with_unique_id("same-id");
        let entry2 = ConfigEntry::new("duofern", "Stick 2").with_unique_id("same-id");

        assert_ok!(manager.add(entry1).await);
        let result = manager.add(entry2).await;

        assert!(matches!(
            result,
            Err(ConfigEntriesError::AlreadyExists { .. })
        ));
    }

    #[tokio::test]
    async fn test_get_by_domain_keeps_insertion_order() {
        let manager = ConfigEntries::in_memory();

        for title in ["first", "second", "third"] {
            manager
                .add(ConfigEntry::new("duofern", title))
                .await
                .unwrap();
        }
        manager.add(ConfigEntry::new("mqtt", "MQTT")).await.unwrap();

        let titles: Vec<_> = manager
            .get_by_domain("duofern")
            .into_iter()
            .map(|e| e.title)
            .collect();
        assert_eq!(titles, vec!["first", "second", "third"]);
        assert_eq!(manager.get_by_domain("mqtt").len(), 1);
        assert!(manager.get_by_domain("hue").is_empty());
    }

    #[tokio::test]
    async fn test_remove_entry() {
        let (_dir, manager) = create_test_manager();

        let first = manager
            .add(ConfigEntry::new("duofern", "first"))
            .await
            .unwrap();
        manager
            .add(ConfigEntry::new("duofern", "second"))
            .await
            .unwrap();

        manager.remove(&first.entry_id).await.unwrap();
        assert_eq!(manager.len(), 1);
        assert_eq!(manager.get_by_domain("duofern")[0].title, "second");

        assert!(matches!(
            manager.remove(&first.entry_id).await,
            Err(ConfigEntriesError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_setup_without_handler_marks_loaded() {
        let manager = ConfigEntries::in_memory();

        let entry = manager
            .add(ConfigEntry::new("duofern", "Stick"))
            .await
            .unwrap();
        assert_eq!(
            manager.get(&entry.entry_id).unwrap().state,
            ConfigEntryState::NotLoaded
        );

        manager.setup(&entry.entry_id).await.unwrap();
        assert!(manager.get(&entry.entry_id).unwrap().is_loaded());
    }

    #[tokio::test]
    async fn test_setup_handler() {
        let manager = ConfigEntries::in_memory();

        manager.register_setup_handler("duofern", Arc::new(|_entry| Ok(())));
        assert!(manager.has_setup_handler("duofern"));

        let entry = manager
            .add(ConfigEntry::new("duofern", "Stick"))
            .await
            .unwrap();
        assert_ok!(manager.setup(&entry.entry_id).await);

        assert!(manager.get(&entry.entry_id).unwrap().is_loaded());
    }

    #[tokio::test]
    async fn test_setup_handler_failure() {
        let manager = ConfigEntries::in_memory();

        manager.register_setup_handler(
            "duofern",
            Arc::new(|_entry| Err("Stick not found".to_string())),
        );

        let entry = manager
            .add(ConfigEntry::new("duofern", "Stick"))
            .await
            .unwrap();
        let result = manager.setup(&entry.entry_id).await;

        assert!(matches!(result, Err(ConfigEntriesError::SetupFailed(_))));
        let stored = manager.get(&entry.entry_id).unwrap();
        assert_eq!(stored.state, ConfigEntryState::SetupError);
        assert_eq!(stored.reason.as_deref(), Some("Stick not found"));
    }

    #[tokio::test]
    async fn test_setup_unknown_entry() {
        let manager = ConfigEntries::in_memory();
        assert_err!(manager.setup("missing").await);
    }

    #[tokio::test]
    async fn test_save_and_load() {
        let temp_dir = TempDir::new().unwrap();

        {
            let manager = ConfigEntries::new(Storage::new(temp_dir.path()));
            manager
                .add(
                    ConfigEntry::new("duofern", "first")
                        .with_data_value("code", "6f3a")
                        .with_unique_id("6f3a")
                        .with_source(ConfigEntrySource::Import),
                )
                .await
                .unwrap();
            manager
                .add(ConfigEntry::new("duofern", "second"))
                .await
                .unwrap();
        }

        assert!(temp_dir.path().join(".storage").join(STORAGE_KEY).exists());

        {
            let manager = ConfigEntries::new(Storage::new(temp_dir.path()));
            manager.load().await.unwrap();

            assert_eq!(manager.len(), 2);
            let entries = manager.get_by_domain("duofern");
            assert_eq!(entries[0].title, "first");
            assert_eq!(entries[1].title, "second");

            let entry = manager.get_by_unique_id("duofern", "6f3a").unwrap();
            assert_eq!(entry.source, ConfigEntrySource::Import);
            assert_eq!(entry.data.get("code"), Some(&serde_json::json!("6f3a")));
        }
    }

    #[tokio::test]
    async fn test_in_memory_load_and_save_are_noops() {
        let manager = ConfigEntries::in_memory();
        manager
            .add(ConfigEntry::new("duofern", "Stick"))
            .await
            .unwrap();
        assert_ok!(manager.save().await);
        assert_ok!(manager.load().await);
        assert_eq!(manager.len(), 1);
    }
}
