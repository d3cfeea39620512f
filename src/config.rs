use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::infrastructure::discovery::ResourceKind;
use crate::infrastructure::error::{ImportError, ImportResult};
use crate::traits::FileSystem;

/// Name of the per-repository settings file
pub const CONFIG_FILE_NAME: &str = ".tfimport.yaml";

/// Settings loaded from `.tfimport.yaml` in the target repository
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectConfig {
    /// Executor name, `terraform` or `opentofu`
    #[serde(default = "default_executor")]
    pub executor: String,

    /// Rule table replacing the built-in one
    #[serde(default)]
    pub rules_file: Option<PathBuf>,

    /// Subscription name -> resource kinds that must never be imported from it
    #[serde(default)]
    pub skip_resources: BTreeMap<String, Vec<ResourceKind>>,

    #[serde(default)]
    pub provider: ProviderSettings,
}

/// Values written into `providers.tf`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProviderSettings {
    #[serde(default)]
    pub subscription_id: Option<String>,
    #[serde(default)]
    pub region: Option<String>,
}

fn default_executor() -> String {
    "terraform".to_string()
}

impl Default for ProjectConfig {
    fn default() -> Self {
        Self {
            executor: default_executor(),
            rules_file: None,
            skip_resources: BTreeMap::new(),
            provider: ProviderSettings::default(),
        }
    }
}

impl ProjectConfig {
    /// Load settings from `repo_path`, falling back to defaults when the file is absent
    pub fn load(fs: &dyn FileSystem, repo_path: &Path) -> ImportResult<Self> {
        let path = repo_path.join(CONFIG_FILE_NAME);
        if !fs.exists(&path) {
            return Ok(Self::default());
        }

        let content = fs
            .read_to_string(&path)
            .map_err(|e| ImportError::FileSystem(format!("{:#}", e)))?;

        // An empty file deserializes to null
        if content.trim().is_empty() {
            return Ok(Self::default());
        }

        Ok(serde_yaml::from_str(&content)?)
    }

    /// Whether importing `kind` from `subscription` is disabled
    pub fn is_skipped(&self, subscription: &str, kind: ResourceKind) -> bool {
        self.skip_resources
            .get(subscription)
            .is_some_and(|kinds| kinds.contains(&kind))
    }
}
