//! Datastore Manager
//!
//! Process-wide registry of collection datastores.
//!
//! ## Responsibilities
//! - Hand out the datastore for a collection name, opening it on first use
//! - Guarantee at most one datastore (and one bootstrap) per name, even
//!   when many threads ask for the same new name at once
//! - Keep datastores for the lifetime of the manager (no eviction)

use std::collections::HashMap;
use std::sync::Arc;

use once_cell::sync::OnceCell;
use parking_lot::RwLock;

use crate::backend::Backend;
use crate::config::Config;
use crate::datastore::Datastore;
use crate::error::Result;
use crate::query::validate_name;

/// One slot per name; the cell is filled by whichever caller wins the race
/// and stays empty if bootstrap fails
type Slot = Arc<OnceCell<Arc<Datastore>>>;

/// Registry of datastores by collection name
///
/// ## Concurrency:
/// - `stores`: RwLock over the slot map, held only to find or insert a slot
/// - Bootstrap runs inside the slot's `OnceCell`, outside the map lock, so
///   opening one collection never blocks lookups of another
pub struct Manager {
    /// Backend shared by every datastore
    backend: Arc<dyn Backend>,

    /// Configuration handed to each datastore
    config: Config,

    /// Slots by collection name
    stores: RwLock<HashMap<String, Slot>>,
}

impl Manager {
    /// Create a manager over `backend` with default configuration
    pub fn new(backend: Arc<dyn Backend>) -> Self {
        Self::with_config(backend, Config::default())
    }

    /// Create a manager with explicit configuration
    pub fn with_config(backend: Arc<dyn Backend>, config: Config) -> Self {
        Self {
            backend,
            config,
            stores: RwLock::new(HashMap::new()),
        }
    }

    /// Connect to PostgreSQL as described by `config`
    #[cfg(feature = "postgres")]
    pub fn connect(config: Config) -> Result<Self> {
        let backend = crate::backend::PgBackend::connect(&config)?;
        Ok(Self::with_config(Arc::new(backend), config))
    }

    /// Get the datastore for `name`, opening it on first use
    ///
    /// Concurrent first calls for the same name all receive the same
    /// instance; bootstrap runs once. If bootstrap fails the error is
    /// returned and nothing is cached, so a later call tries again.
    pub fn get(&self, name: &str) -> Result<Arc<Datastore>> {
        validate_name(name)?;

        // Fast path: already open
        if let Some(store) = self.stores.read().get(name).and_then(|slot| slot.get()) {
            return Ok(Arc::clone(store));
        }

        // Find or insert the slot, then initialize it outside the map lock
        let slot = {
            let mut stores = self.stores.write();
            Arc::clone(
                stores
                    .entry(name.to_string())
                    .or_insert_with(|| Arc::new(OnceCell::new())),
            )
        };

        let store = slot.get_or_try_init(|| {
            tracing::info!("Opening datastore {}", name);
            Datastore::open_with_config(name, Arc::clone(&self.backend), &self.config)
                .map(Arc::new)
                .map_err(|e| {
                    tracing::warn!("Failed to open datastore {}: {}", name, e);
                    e
                })
        })?;

        Ok(Arc::clone(store))
    }

    /// Whether a datastore for `name` has been opened
    pub fn contains(&self, name: &str) -> bool {
        self.stores
            .read()
            .get(name)
            .map_or(false, |slot| slot.get().is_some())
    }

    /// Number of open datastores
    pub fn len(&self) -> usize {
        self.stores
            .read()
            .values()
            .filter(|slot| slot.get().is_some())
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Names of the open datastores, sorted
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .stores
            .read()
            .iter()
            .filter(|(_, slot)| slot.get().is_some())
            .map(|(name, _)| name.clone())
            .collect();
        names.sort();
        names
    }

    pub fn backend(&self) -> &Arc<dyn Backend> {
        &self.backend
    }

    pub fn config(&self) -> &Config {
        &self.config
    }
}
