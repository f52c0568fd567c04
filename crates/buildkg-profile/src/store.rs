//! Profile discovery and loading

use std::fs;
use std::path::{Path, PathBuf};

use serde_yaml::{Mapping, Value};
use tracing::{debug, info};

use crate::error::ProfileError;
use crate::merge::deep_merge;
use crate::model::{DomainProfile, OntologyConfig};

/// Profile used when nothing else is selected
pub const DEFAULT_PROFILE_NAME: &str = "default";

/// A directory of `<name>.yaml` profiles
#[derive(Debug, Clone)]
pub struct ProfileStore {
    dir: PathBuf,
}

impl ProfileStore {
    /// Create a store rooted at `dir`
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Profile directory
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Sorted names of the profiles in the directory.
    ///
    /// A missing directory yields an empty list.
    pub fn list_profiles(&self) -> Vec<String> {
        let Ok(entries) = fs::read_dir(&self.dir) else {
            return Vec::new();
        };
        let mut names: Vec<String> = entries
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| path.extension().is_some_and(|ext| ext == "yaml"))
            .filter_map(|path| path.file_stem().map(|s| s.to_string_lossy().into_owned()))
            .collect();
        names.sort();
        names
    }

    /// Map a profile name or file path to the file it refers to.
    ///
    /// Anything ending in `.yaml`/`.yml` is a path; anything else is a name
    /// looked up in the profile directory.
    pub fn resolve_path(&self, name_or_path: &str) -> PathBuf {
        let path = Path::new(name_or_path);
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("yaml") | Some("yml") => path.to_path_buf(),
            _ => self.dir.join(format!("{}.yaml", name_or_path)),
        }
    }

    /// Load a profile by name or path, resolving `extends` eagerly.
    pub fn load_profile(&self, name_or_path: &str) -> Result<DomainProfile, ProfileError> {
        let path = self.resolve_path(name_or_path);
        let mut chain = Vec::new();
        let merged = self.load_resolved(&path, name_or_path, &mut chain)?;

        let profile: DomainProfile =
            serde_yaml::from_value(Value::Mapping(merged)).map_err(|e| ProfileError::Yaml {
                path: path.clone(),
                message: e.to_string(),
            })?;

        info!(
            "Loaded domain profile '{}' v{} from {}",
            profile.name,
            profile.version,
            path.display()
        );
        Ok(profile)
    }

    /// Raw mapping for `path` with its whole `extends` chain merged in.
    fn load_resolved(
        &self,
        path: &Path,
        name: &str,
        chain: &mut Vec<String>,
    ) -> Result<Mapping, ProfileError> {
        if chain.iter().any(|seen| seen == name) {
            chain.push(name.to_string());
            return Err(ProfileError::CyclicExtends {
                chain: std::mem::take(chain),
            });
        }
        chain.push(name.to_string());

        let raw = self.read_raw(path)?;
        let base_name = match raw.get("extends") {
            Some(Value::String(base)) if !base.is_empty() => base.clone(),
            _ => return Ok(raw),
        };

        debug!("Profile '{}' extends '{}'", name, base_name);
        let base_path = self.dir.join(format!("{}.yaml", base_name));
        let base = self.load_resolved(&base_path, &base_name, chain)?;
        Ok(deep_merge(&base, &raw))
    }

    fn read_raw(&self, path: &Path) -> Result<Mapping, ProfileError> {
        if !path.exists() {
            return Err(ProfileError::NotFound {
                path: path.to_path_buf(),
                available: self.list_profiles(),
            });
        }
        read_mapping(path)
    }
}

/// Load a standalone ontology file.
pub fn load_ontology(path: impl AsRef<Path>) -> Result<OntologyConfig, ProfileError> {
    let path = path.as_ref();
    if !path.exists() {
        return Err(ProfileError::OntologyNotFound(path.to_path_buf()));
    }
    let raw = read_mapping(path)?;
    let ontology: OntologyConfig =
        serde_yaml::from_value(Value::Mapping(raw)).map_err(|e| ProfileError::Yaml {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
    debug!(
        "Loaded ontology from {}: {} nodes, {} edges",
        path.display(),
        ontology.nodes.len(),
        ontology.edges.len()
    );
    Ok(ontology)
}

/// Read a YAML file whose top level is a mapping. An empty file is an empty mapping.
fn read_mapping(path: &Path) -> Result<Mapping, ProfileError> {
    let text = fs::read_to_string(path).map_err(|e| ProfileError::Io {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;
    let value: Value = serde_yaml::from_str(&text).map_err(|e| ProfileError::Yaml {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;
    match value {
        Value::Mapping(map) => Ok(map),
        Value::Null => Ok(Mapping::new()),
        _ => Err(ProfileError::Yaml {
            path: path.to_path_buf(),
            message: "top level must be a mapping".to_string(),
        }),
    }
}
