use anyhow::{Context, Result};
use log::{debug, warn};
use serde::Serialize;
use serde_json::ser::{PrettyFormatter, Serializer};
use std::path::PathBuf;

use super::PackageIndex;
use crate::runtime::Runtime;

/// Loads and persists the index file.
pub struct IndexStore<'a, R: Runtime> {
    runtime: &'a R,
    path: PathBuf,
}

impl<'a, R: Runtime> IndexStore<'a, R> {
    pub fn new(runtime: &'a R, path: impl Into<PathBuf>) -> Self {
        Self {
            runtime,
            path: path.into(),
        }
    }

    /// Reads the index, or starts an empty one if the file does not exist.
    #[tracing::instrument(skip(self))]
    pub fn load(&self) -> Result<PackageIndex> {
        if !self.runtime.exists(&self.path) {
            debug!("No index at {:?}, starting empty", self.path);
            return Ok(PackageIndex::default());
        }

        let content = self.runtime.read_to_string(&self.path)?;
        let index: PackageIndex = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse index {:?}", self.path))?;
        debug!(
            "Loaded {} indexed versions from {:?}",
            index.indexed_count(),
            self.path
        );
        Ok(index)
    }

    /// Writes the whole index to a sibling temp file, then renames it into place.
    #[tracing::instrument(skip(self, index))]
    pub fn save(&self, index: &PackageIndex) -> Result<()> {
        let json = to_json_pretty(index)?;

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() && !self.runtime.exists(parent) {
                self.runtime.create_dir_all(parent)?;
            }
        }

        let tmp_path = self.path.with_extension("json.tmp");
        self.runtime.write(&tmp_path, json.as_bytes())?;
        if let Err(e) = self.runtime.rename(&tmp_path, &self.path) {
            if let Err(cleanup) = self.runtime.remove_file(&tmp_path) {
                warn!("Failed to remove {:?}: {}", tmp_path, cleanup);
            }
            return Err(e);
        }
        debug!("Saved index to {:?}", self.path);
        Ok(())
    }
}

/// Pretty JSON with four-space indentation.
fn to_json_pretty<T: Serialize>(value: &T) -> Result<String> {
    let mut buf = Vec::new();
    let mut serializer = Serializer::with_formatter(&mut buf, PrettyFormatter::with_indent(b"    "));
    value.serialize(&mut serializer)?;
    Ok(String::from_utf8(buf)?)
}
