//! Atlas registry: current atlas and its exclusively-owned connection.
//!
//! # Responsibility
//! - Track the current atlas (root path + store file) and hold the single
//!   live store connection.
//! - Switch atlases atomically: open-new-then-swap, all-or-nothing.
//!
//! # Invariants
//! - At most one live connection exists; it is never shared across two
//!   atlas configurations.
//! - Store operations and atlas switches are mutually exclusive: every
//!   operation observes exactly one atlas, fully.
//! - A failed switch leaves the previous atlas active and usable.

use crate::db::{open_db, DbError, DbResult};
use crate::repo::node_repo::{RepoResult, StoreError};
use log::{error, info, warn};
use rusqlite::Connection;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

/// One atlas: a root directory plus the store file name inside it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AtlasConfig {
    pub root_path: PathBuf,
    pub store_file_name: String,
}

impl AtlasConfig {
    pub fn new(root_path: impl Into<PathBuf>, store_file_name: impl Into<String>) -> Self {
        Self {
            root_path: root_path.into(),
            store_file_name: store_file_name.into(),
        }
    }

    /// Resolved path of the persisted store for this atlas.
    pub fn store_path(&self) -> PathBuf {
        self.root_path.join(&self.store_file_name)
    }
}

/// Atlas switching errors.
#[derive(Debug)]
pub enum AtlasError {
    /// The switch target could not be opened or created. The previous
    /// atlas, if any, remains active.
    StorageUnavailable { path: PathBuf, message: String },
}

impl Display for AtlasError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::StorageUnavailable { path, message } => {
                write!(f, "atlas store unavailable at {}: {message}", path.display())
            }
        }
    }
}

impl Error for AtlasError {}

struct ActiveAtlas {
    config: AtlasConfig,
    store_path: PathBuf,
    conn: Connection,
}

/// Owner of the current atlas selection and its store connection.
///
/// Constructed explicitly and passed by reference; multiple independent
/// registries can coexist (one per test, for instance).
#[derive(Default)]
pub struct AtlasRegistry {
    state: Mutex<Option<ActiveAtlas>>,
}

impl AtlasRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Switches the active atlas, creating the store if absent.
    ///
    /// The new store is opened and migrated before the previous
    /// connection is replaced, so a failure keeps the previous atlas
    /// fully usable. Transient open failures are retried once.
    pub fn set_atlas(&self, config: AtlasConfig) -> Result<(), AtlasError> {
        let store_path = config.store_path();
        info!(
            "event=atlas_switch module=atlas status=start root={} store={}",
            config.root_path.display(),
            store_path.display()
        );

        if let Err(err) = std::fs::create_dir_all(&config.root_path) {
            error!(
                "event=atlas_switch module=atlas status=error error_code=root_unwritable root={} error={err}",
                config.root_path.display()
            );
            return Err(AtlasError::StorageUnavailable {
                path: store_path,
                message: err.to_string(),
            });
        }

        let conn = match open_store_with_retry(&store_path) {
            Ok(conn) => conn,
            Err(err) => {
                error!(
                    "event=atlas_switch module=atlas status=error error_code=store_unopenable store={} error={err}",
                    store_path.display()
                );
                return Err(AtlasError::StorageUnavailable {
                    path: store_path,
                    message: err.to_string(),
                });
            }
        };

        // Critical section: swapping drops the previous connection, and
        // no store operation can interleave with the swap.
        let mut state = self.lock_state();
        *state = Some(ActiveAtlas {
            config: config.clone(),
            store_path: store_path.clone(),
            conn,
        });
        drop(state);

        info!(
            "event=atlas_switch module=atlas status=ok root={} store={}",
            config.root_path.display(),
            store_path.display()
        );
        Ok(())
    }

    /// Returns the current atlas configuration, if one is selected.
    pub fn current(&self) -> Option<AtlasConfig> {
        self.lock_state()
            .as_ref()
            .map(|active| active.config.clone())
    }

    /// Returns the resolved store path of the current atlas.
    pub fn current_store_path(&self) -> Option<PathBuf> {
        self.lock_state()
            .as_ref()
            .map(|active| active.store_path.clone())
    }

    /// Closes the current store connection and clears the selection.
    pub fn shutdown(&self) {
        let mut state = self.lock_state();
        if let Some(active) = state.take() {
            info!(
                "event=atlas_shutdown module=atlas status=ok store={}",
                active.store_path.display()
            );
        }
    }

    /// Runs one store operation against the live connection, under the
    /// same lock that guards atlas switches.
    pub(crate) fn with_conn<T>(
        &self,
        operation: impl FnOnce(&Connection) -> RepoResult<T>,
    ) -> RepoResult<T> {
        let state = self.lock_state();
        match state.as_ref() {
            Some(active) => operation(&active.conn),
            None => Err(StoreError::NoAtlasSelected),
        }
    }

    fn lock_state(&self) -> MutexGuard<'_, Option<ActiveAtlas>> {
        // A poisoned lock means a panic mid-operation; the connection is
        // still structurally valid, so keep serving.
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn open_store_with_retry(store_path: &Path) -> DbResult<Connection> {
    match open_db(store_path) {
        Ok(conn) => Ok(conn),
        Err(err @ DbError::UnsupportedSchemaVersion { .. }) => Err(err),
        Err(first) => {
            warn!(
                "event=atlas_switch module=atlas status=retry store={} error={first}",
                store_path.display()
            );
            open_db(store_path)
        }
    }
}
