//! Storage resolution for source media and rendered output.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use montage_common::{MontageError, MontageResult};
use serde::{Deserialize, Serialize};

/// Maps stored-asset references to local files and publishes results.
pub trait StorageResolver {
    /// Local, readable path for a stored reference.
    fn resolve_for_processing(&self, reference: &str) -> MontageResult<PathBuf>;

    /// Publish a rendered file to `destination`. Returns the final location.
    fn finalize(&self, rendered: &Path, destination: &Path) -> MontageResult<PathBuf>;
}

/// Filesystem storage. Relative references resolve against `root`.
#[derive(Debug, Clone)]
pub struct LocalStorage {
    root: PathBuf,
}

impl LocalStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl StorageResolver for LocalStorage {
    fn resolve_for_processing(&self, reference: &str) -> MontageResult<PathBuf> {
        let path = self.root.join(reference);
        if !path.is_file() {
            return Err(MontageError::resource(format!(
                "Stored media not found: {}",
                path.display()
            )));
        }
        Ok(path)
    }

    fn finalize(&self, rendered: &Path, destination: &Path) -> MontageResult<PathBuf> {
        if let Some(parent) = destination.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| {
                MontageError::resource(format!(
                    "Failed to create output directory {}: {e}",
                    parent.display()
                ))
            })?;
        }
        std::fs::copy(rendered, destination).map_err(|e| {
            MontageError::resource(format!(
                "Failed to write output {}: {e}",
                destination.display()
            ))
        })?;
        tracing::info!(output = %destination.display(), "Render output finalized");
        Ok(destination.to_path_buf())
    }
}

/// Caller-supplied id maps: video sources and user assets (images, audio),
/// each mapping an id to a stored reference.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MediaSources {
    pub sources: BTreeMap<String, String>,
    pub assets: BTreeMap<String, String>,
}

impl MediaSources {
    /// Load a `{ "sources": {..}, "assets": {..} }` manifest.
    pub fn load(path: impl AsRef<Path>) -> MontageResult<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Ok(serde_json::from_str(&content)?)
    }

    pub fn is_video_source(&self, id: &str) -> bool {
        self.sources.contains_key(id)
    }

    /// Resolve a video source id to a local path.
    pub fn source_path(&self, storage: &dyn StorageResolver, id: &str) -> MontageResult<PathBuf> {
        let reference = self
            .sources
            .get(id)
            .ok_or_else(|| MontageError::missing_source(id))?;
        storage.resolve_for_processing(reference)
    }

    /// Resolve an asset id to a local path.
    pub fn asset_path(&self, storage: &dyn StorageResolver, id: &str) -> MontageResult<PathBuf> {
        let reference = self
            .assets
            .get(id)
            .ok_or_else(|| MontageError::missing_asset(id))?;
        storage.resolve_for_processing(reference)
    }
}
