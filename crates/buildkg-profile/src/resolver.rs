//! Active-profile resolution
//!
//! One resolver is owned by the entry point and handed to whatever needs the
//! active profile. It loads lazily on first use and caches the result.

use std::sync::Arc;

use crate::error::ProfileError;
use crate::model::DomainProfile;
use crate::store::ProfileStore;

/// Lazily loads and caches the active domain profile
#[derive(Debug, Clone)]
pub struct ProfileResolver {
    store: ProfileStore,
    selected: String,
    active: Option<Arc<DomainProfile>>,
}

impl ProfileResolver {
    /// Create a resolver that will load `selected` (a name or path) from `store`
    pub fn new(store: ProfileStore, selected: impl Into<String>) -> Self {
        Self {
            store,
            selected: selected.into(),
            active: None,
        }
    }

    /// The profile store backing this resolver
    pub fn store(&self) -> &ProfileStore {
        &self.store
    }

    /// Name or path of the profile that `get` loads
    pub fn selected(&self) -> &str {
        &self.selected
    }

    /// The active profile, loading it on first call
    pub fn get(&mut self) -> Result<Arc<DomainProfile>, ProfileError> {
        if let Some(profile) = &self.active {
            return Ok(Arc::clone(profile));
        }
        let profile = Arc::new(self.store.load_profile(&self.selected)?);
        self.active = Some(Arc::clone(&profile));
        Ok(profile)
    }

    /// Replace the active profile
    pub fn set(&mut self, profile: DomainProfile) {
        self.active = Some(Arc::new(profile));
    }

    /// Drop the cached profile so the next `get` reloads it
    pub fn reset(&mut self) {
        self.active = None;
    }
}
