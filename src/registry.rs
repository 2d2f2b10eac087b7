// src/registry.rs
use std::collections::HashSet;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::drivers::AcquisitionError;
use crate::types::SourceDescriptor;

/// Suffix of the rolling log written by each server.
pub const LOG_FILE_SUFFIX: &str = "-log-dynamic.dat";

#[derive(Deserialize)]
struct RegistryDocument {
    #[serde(default)]
    log_dir: PathBuf,
    sources: Vec<SourceDescriptor>,
}

/// Static table of known sources, kept in document order.
#[derive(Clone, Debug, Default)]
pub struct SensorRegistry {
    log_dir: PathBuf,
    sources: Vec<SourceDescriptor>,
}

impl SensorRegistry {
    /// Builds the registry and fills in each source's log path.
    ///
    /// Servers sharing a port write a single log named after the first of
    /// them, so every source on that port reads the same file.
    pub fn new(
        log_dir: impl Into<PathBuf>,
        sources: Vec<SourceDescriptor>,
    ) -> Result<Self, AcquisitionError> {
        {
            let mut seen = HashSet::new();
            for source in &sources {
                if source.name.trim().is_empty() {
                    return Err(AcquisitionError::Registry("source with empty name".into()));
                }
                if !seen.insert(source.name.as_str()) {
                    return Err(AcquisitionError::Registry(format!(
                        "duplicate source `{}`",
                        source.name
                    )));
                }
            }
        }
        let mut registry = Self {
            log_dir: log_dir.into(),
            sources,
        };
        let resolved: Vec<PathBuf> = registry
            .sources
            .iter()
            .map(|s| {
                if s.log_path.as_os_str().is_empty() {
                    registry.shared_log_path(s.port)
                } else {
                    s.log_path.clone()
                }
            })
            .collect();
        for (source, path) in registry.sources.iter_mut().zip(resolved) {
            source.log_path = path;
        }
        Ok(registry)
    }

    pub fn from_json_str(json: &str) -> Result<Self, AcquisitionError> {
        let doc: RegistryDocument =
            serde_json::from_str(json).map_err(|e| AcquisitionError::Registry(e.to_string()))?;
        Self::new(doc.log_dir, doc.sources)
    }

    pub fn load(path: &Path) -> Result<Self, AcquisitionError> {
        let json = std::fs::read_to_string(path)
            .map_err(|e| AcquisitionError::file_unavailable(path, e))?;
        Self::from_json_str(&json)
    }

    pub fn lookup(&self, name: &str) -> Result<&SourceDescriptor, AcquisitionError> {
        self.sources
            .iter()
            .find(|s| s.name == name)
            .ok_or_else(|| AcquisitionError::UnknownSource(name.to_owned()))
    }

    pub fn sources_with_port(&self, port: u16) -> Vec<&SourceDescriptor> {
        self.sources.iter().filter(|s| s.port == port).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &SourceDescriptor> {
        self.sources.iter()
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    fn shared_log_path(&self, port: u16) -> PathBuf {
        let owner = self
            .sources_with_port(port)
            .first()
            .map(|s| s.name.clone())
            .unwrap_or_default();
        self.log_dir.join(format!("{owner}{LOG_FILE_SUFFIX}"))
    }
}
