use crate::catalog::VersionCatalog;
use crate::error::PassageError;
use crate::passage::{PassageState, PassageUpdate};
use crate::resolver::PassageResolver;
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info};

/// Persistence for passage columns, keyed by passage id.
pub trait PassageStore: Send + Sync {
    fn fetch(&self, passage_id: u32) -> Option<PassageState>;

    /// Validates and normalizes `update` before storing it, returning the
    /// state as persisted.
    fn save(&self, passage_id: u32, update: PassageUpdate) -> Result<PassageState, PassageError>;

    fn passage_ids(&self) -> Vec<u32>;
}

/// In-memory store with an optional JSON snapshot on disk.
pub struct MemoryPassageStore {
    catalog: Arc<VersionCatalog>,
    states: RwLock<BTreeMap<u32, PassageState>>,
    path: Option<PathBuf>,
}

impl MemoryPassageStore {
    pub fn ephemeral(catalog: Arc<VersionCatalog>) -> Self {
        Self {
            catalog,
            states: RwLock::new(BTreeMap::new()),
            path: None,
        }
    }

    /// Opens a store backed by `path`, restoring any snapshot already there.
    pub fn persistent(
        path: impl Into<PathBuf>,
        catalog: Arc<VersionCatalog>,
    ) -> Result<Self, PassageError> {
        let path = path.into();
        let states = if path.exists() {
            let bytes = fs::read(&path)?;
            let stored: Vec<PassageState> = serde_json::from_slice(&bytes)?;
            info!(path = %path.display(), passages = stored.len(), "restored passage snapshot");
            stored
                .into_iter()
                .map(|state| (state.passage_id, state))
                .collect()
        } else {
            BTreeMap::new()
        };
        Ok(Self {
            catalog,
            states: RwLock::new(states),
            path: Some(path),
        })
    }

    /// Creates default columns `0..count` that do not exist yet.
    pub fn ensure_columns(&self, count: u32) -> Result<(), PassageError> {
        let mut guard = self.states.write();
        let created: Vec<u32> = (0..count)
            .filter(|passage_id| !guard.contains_key(passage_id))
            .collect();
        if created.is_empty() {
            return Ok(());
        }
        for &passage_id in &created {
            guard.insert(passage_id, PassageState::new(passage_id));
        }
        if let Err(err) = self.write_snapshot(&guard) {
            for passage_id in &created {
                guard.remove(passage_id);
            }
            return Err(err);
        }
        Ok(())
    }

    fn write_snapshot(&self, states: &BTreeMap<u32, PassageState>) -> Result<(), PassageError> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let snapshot: Vec<&PassageState> = states.values().collect();
        let bytes = serde_json::to_vec_pretty(&snapshot)?;
        fs::write(path, bytes)?;
        Ok(())
    }
}

impl PassageStore for MemoryPassageStore {
    fn fetch(&self, passage_id: u32) -> Option<PassageState> {
        self.states.read().get(&passage_id).cloned()
    }

    fn save(&self, passage_id: u32, update: PassageUpdate) -> Result<PassageState, PassageError> {
        let resolver = PassageResolver::new(&self.catalog);
        let mut guard = self.states.write();
        let mut state = guard
            .get(&passage_id)
            .cloned()
            .ok_or(PassageError::UnknownPassage(passage_id))?;
        resolver.apply_update(&mut state, update)?;

        let previous = guard.insert(passage_id, state.clone());
        if let Err(err) = self.write_snapshot(&guard) {
            if let Some(previous) = previous {
                guard.insert(passage_id, previous);
            }
            return Err(err);
        }
        debug!(passage_id, "persisted passage");
        Ok(state)
    }

    fn passage_ids(&self) -> Vec<u32> {
        self.states.read().keys().copied().collect()
    }
}
