use std::collections::HashMap;
use std::io::Read;
use std::path::Path;

use serde_json::{Map, Value};

use crate::config::{CatalogConfig, EngineConfig};
use crate::dispatcher::validate;
use crate::error::{CatalogError, EngineError};
use crate::files::FileSource;
use crate::registry::RuleRegistry;
use crate::requirements::Requirements;

const DESCRIPTION_SUFFIX: &str = ".requirements.json";

/// Endpoint-keyed collection of requirements descriptions.
#[derive(Debug, Clone, Default)]
pub struct RequirementsCatalog {
    descriptions: HashMap<String, Requirements>,
    config: CatalogConfig,
}

impl RequirementsCatalog {
    /// Create an empty catalog with default config.
    pub fn new() -> Self {
        Self::with_config(CatalogConfig::default())
    }

    /// Create an empty catalog with explicit config.
    pub fn with_config(config: CatalogConfig) -> Self {
        Self {
            descriptions: HashMap::new(),
            config,
        }
    }

    /// Register the description for an endpoint from a JSON string.
    pub fn register(&mut self, endpoint: &str, json: &str) -> Result<(), CatalogError> {
        let requirements =
            Requirements::from_json_str(json).map_err(|source| CatalogError::Requirements {
                endpoint: endpoint.to_string(),
                source,
            })?;
        self.insert(endpoint, requirements);
        Ok(())
    }

    /// Register an already parsed description.
    pub fn insert(&mut self, endpoint: impl Into<String>, requirements: Requirements) {
        self.descriptions.insert(endpoint.into(), requirements);
    }

    /// Load descriptions from a directory of `<endpoint>.requirements.json`
    /// files.
    pub fn from_directory(path: &Path) -> Result<Self, CatalogError> {
        Self::from_directory_with_config(path, CatalogConfig::default())
    }

    /// Load descriptions from a directory with explicit config.
    pub fn from_directory_with_config(
        path: &Path,
        config: CatalogConfig,
    ) -> Result<Self, CatalogError> {
        let mut catalog = Self::with_config(config);
        let mut loaded = 0usize;

        let entries = std::fs::read_dir(path)
            .map_err(|err| CatalogError::LoadFailed(format!("{}: {err}", path.display())))?;

        for entry in entries {
            let entry = entry.map_err(|err| CatalogError::LoadFailed(err.to_string()))?;
            let file_name = entry.file_name();
            let file_name = file_name.to_string_lossy();
            let Some(endpoint) = endpoint_from_file_name(&file_name) else {
                continue;
            };

            let entry_path = entry.path();
            let path_metadata = std::fs::symlink_metadata(&entry_path)
                .map_err(|err| CatalogError::LoadFailed(err.to_string()))?;
            let file_type = path_metadata.file_type();
            if file_type.is_symlink() {
                return Err(CatalogError::LoadFailed(format!(
                    "refusing to load requirements symlink: {file_name}"
                )));
            }
            if !file_type.is_file() {
                continue;
            }

            loaded = loaded.saturating_add(1);
            if loaded > catalog.config.max_descriptions {
                return Err(CatalogError::LoadFailed(format!(
                    "description count exceeds configured max ({}): {loaded}",
                    catalog.config.max_descriptions
                )));
            }

            let file = std::fs::File::open(&entry_path).map_err(|err| {
                CatalogError::LoadFailed(format!(
                    "failed opening requirements {}: {err}",
                    entry_path.display()
                ))
            })?;
            let opened_metadata = file
                .metadata()
                .map_err(|err| CatalogError::LoadFailed(err.to_string()))?;

            #[cfg(unix)]
            {
                if !same_file_identity(&path_metadata, &opened_metadata) {
                    return Err(CatalogError::LoadFailed(format!(
                        "requirements file changed during load: {file_name}"
                    )));
                }
            }

            if opened_metadata.len() > catalog.config.max_file_size as u64 {
                return Err(CatalogError::LoadFailed(format!(
                    "requirements file too large ({} bytes): {file_name}",
                    opened_metadata.len()
                )));
            }

            let max_bytes = catalog.config.max_file_size;
            let read_limit = u64::try_from(max_bytes.saturating_add(1)).unwrap_or(u64::MAX);
            let mut content = String::new();
            file.take(read_limit)
                .read_to_string(&mut content)
                .map_err(|err| {
                    CatalogError::LoadFailed(format!(
                        "failed reading requirements {}: {err}",
                        entry_path.display()
                    ))
                })?;
            if content.len() > max_bytes {
                return Err(CatalogError::LoadFailed(format!(
                    "requirements file too large while reading: {file_name}"
                )));
            }

            catalog.register(endpoint, &content)?;
        }

        tracing::info!(
            path = %path.display(),
            endpoints = catalog.descriptions.len(),
            "loaded requirements catalog"
        );
        Ok(catalog)
    }

    /// Load from embedded `(endpoint, json)` pairs.
    pub fn from_embedded(descriptions: &[(&str, &str)]) -> Result<Self, CatalogError> {
        let mut catalog = Self::new();
        for (endpoint, json) in descriptions {
            catalog.register(endpoint, json)?;
        }
        Ok(catalog)
    }

    pub fn get(&self, endpoint: &str) -> Option<&Requirements> {
        self.descriptions.get(endpoint)
    }

    /// Validate an endpoint's input against its description.
    ///
    /// An endpoint without a description is reported as
    /// [`CatalogError::UnknownEndpoint`] in the outer result; the inner result
    /// is the dispatcher's verdict.
    pub fn validate(
        &self,
        endpoint: &str,
        registry: &RuleRegistry,
        engine: &EngineConfig,
        input: &Map<String, Value>,
        files: Option<&dyn FileSource>,
    ) -> Result<Result<(), EngineError>, CatalogError> {
        let requirements = self
            .get(endpoint)
            .ok_or_else(|| CatalogError::UnknownEndpoint(endpoint.to_string()))?;
        Ok(validate(registry, engine, requirements, input, files))
    }

    /// Endpoints with a registered description, sorted.
    pub fn endpoints(&self) -> Vec<&str> {
        let mut endpoints: Vec<&str> = self.descriptions.keys().map(String::as_str).collect();
        endpoints.sort_unstable();
        endpoints
    }

    pub fn len(&self) -> usize {
        self.descriptions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.descriptions.is_empty()
    }

    pub fn config(&self) -> &CatalogConfig {
        &self.config
    }
}

/// True when both metadata records describe the same inode.
#[cfg(unix)]
fn same_file_identity(path_metadata: &std::fs::Metadata, opened_metadata: &std::fs::Metadata) -> bool {
    use std::os::unix::fs::MetadataExt;
    path_metadata.dev() == opened_metadata.dev() && path_metadata.ino() == opened_metadata.ino()
}

fn endpoint_from_file_name(file_name: &str) -> Option<&str> {
    let endpoint = file_name.strip_suffix(DESCRIPTION_SUFFIX)?;
    if endpoint.is_empty() {
        None
    } else {
        Some(endpoint)
    }
}
