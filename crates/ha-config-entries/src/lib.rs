//! Config Entries
//!
//! This crate provides the configuration entry system for Home Assistant.
//! Config entries represent individual integration instances; integrations
//! look up their entries by domain and register a setup handler that runs
//! when an entry is set up.
//!
//! # Key Types
//!
//! - [`ConfigEntry`] - A single integration configuration
//! - [`ConfigEntryState`] - Lifecycle state of an entry
//! - [`ConfigEntries`] - Manager for all config entries
//!
//! # Storage
//!
//! Config entries are persisted in `.storage/core.config_entries` with
//! version tracking for migrations.

pub mod entry;
pub mod manager;
pub mod storage;

// Re-export main types
pub use entry::{ConfigEntry, ConfigEntryDisabledBy, ConfigEntrySource, ConfigEntryState};

pub use manager::{
    ConfigEntries, ConfigEntriesData, ConfigEntriesError, ConfigEntriesResult, SetupHandler,
    STORAGE_KEY, STORAGE_MINOR_VERSION, STORAGE_VERSION,
};

pub use storage::{Storage, StorageError, StorageFile, StorageResult};
