//! Resource state persisted between runs.
//!
//! Stored as JSON (default `dockerless.state.json`) and written atomically:
//! the new content goes to `<file>.json.tmp` which is then renamed over the
//! old file. A state file that cannot be parsed is an error, never reset.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use dockerless_core::error::{DockerlessError, Result};
use dockerless_runtime::RemoteImageModel;
use serde::{Deserialize, Serialize};

/// Default state file name.
pub const DEFAULT_STATE_FILE: &str = "dockerless.state.json";

/// State format version written by this build.
pub const STATE_VERSION: u32 = 1;

/// One recorded `dockerless_remote_image`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceRecord {
    #[serde(flatten)]
    pub model: RemoteImageModel,
    /// Last time this record was written
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct StateData {
    version: u32,
    /// Identifies this state across serials
    lineage: String,
    /// Incremented on every save
    serial: u64,
    #[serde(default)]
    resources: BTreeMap<String, ResourceRecord>,
}

/// Persistent state file backed by JSON.
pub struct StateFile {
    path: PathBuf,
    data: StateData,
}

impl StateFile {
    /// Load state from disk. Returns an empty state if the file doesn't exist.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self {
                path: path.to_path_buf(),
                data: StateData {
                    version: STATE_VERSION,
                    lineage: uuid::Uuid::new_v4().to_string(),
                    serial: 0,
                    resources: BTreeMap::new(),
                },
            });
        }

        let content = std::fs::read_to_string(path)?;
        let data: StateData = serde_json::from_str(&content).map_err(|e| {
            DockerlessError::StateError(format!("Failed to parse {}: {}", path.display(), e))
        })?;
        if data.version != STATE_VERSION {
            return Err(DockerlessError::StateError(format!(
                "unsupported state version {} in {} (expected {})",
                data.version,
                path.display(),
                STATE_VERSION
            )));
        }

        tracing::debug!(
            path = %path.display(),
            serial = data.serial,
            resources = data.resources.len(),
            "Loaded state"
        );

        Ok(Self {
            path: path.to_path_buf(),
            data,
        })
    }

    /// Save state to disk atomically (write to .tmp, then rename).
    pub fn save(&mut self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        self.data.serial += 1;
        let data = serde_json::to_string_pretty(&self.data)?;
        let tmp_path = self.path.with_extension("json.tmp");
        std::fs::write(&tmp_path, &data)?;
        std::fs::rename(&tmp_path, &self.path)?;
        Ok(())
    }

    /// Record a resource and persist.
    pub fn upsert(&mut self, name: &str, model: RemoteImageModel) -> Result<()> {
        self.data.resources.insert(
            name.to_string(),
            ResourceRecord {
                model,
                updated_at: Utc::now(),
            },
        );
        self.save()
    }

    /// Remove a resource and persist. Returns the removed record, if any.
    pub fn remove(&mut self, name: &str) -> Result<Option<ResourceRecord>> {
        let removed = self.data.resources.remove(name);
        if removed.is_some() {
            self.save()?;
        }
        Ok(removed)
    }

    pub fn get(&self, name: &str) -> Option<&ResourceRecord> {
        self.data.resources.get(name)
    }

    /// All records, ordered by name.
    pub fn list(&self) -> impl Iterator<Item = (&String, &ResourceRecord)> {
        self.data.resources.iter()
    }

    /// Resource models keyed by name, as input for planning.
    pub fn models(&self) -> BTreeMap<String, RemoteImageModel> {
        self.data
            .resources
            .iter()
            .map(|(name, record)| (name.clone(), record.model.clone()))
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.data.resources.is_empty()
    }

    pub fn lineage(&self) -> &str {
        &self.data.lineage
    }

    pub fn serial(&self) -> u64 {
        self.data.serial
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}
