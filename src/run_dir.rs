use std::collections::HashSet;
use std::fs;

use camino::{Utf8Path, Utf8PathBuf};

use crate::domain::Artifact;
use crate::error::EtdbError;
use crate::manifest::{Manifest, MANIFEST_FILE_NAME};

/// Filename of the artifact-metadata snapshot inside a run directory.
pub const SNAPSHOT_FILE_NAME: &str = "metadata.json";

/// Filesystem root for one download session: the manifest, the metadata
/// snapshot, and one subdirectory per artifact all live underneath it.
#[derive(Debug, Clone)]
pub struct RunDir {
    root: Utf8PathBuf,
}

impl RunDir {
    /// Resumes an existing directory, or synthesizes a fresh timestamped one.
    /// Two runs started in the same millisecond would pick the same name;
    /// accepted, callers wanting determinism pass an explicit directory.
    pub fn resolve(resume: Option<Utf8PathBuf>) -> Self {
        let root = resume.unwrap_or_else(|| {
            Utf8PathBuf::from(format!("etdb-download-{}", chrono::Utc::now().timestamp_millis()))
        });
        Self { root }
    }

    pub fn root(&self) -> &Utf8Path {
        &self.root
    }

    pub fn manifest_path(&self) -> Utf8PathBuf {
        self.root.join(MANIFEST_FILE_NAME)
    }

    pub fn snapshot_path(&self) -> Utf8PathBuf {
        self.root.join(SNAPSHOT_FILE_NAME)
    }

    pub fn artifact_dir(&self, location: &str) -> Utf8PathBuf {
        self.root.join(location)
    }

    /// Creates the directory and manifest as needed and returns the set of
    /// already-completed manifest keys (empty for a fresh run).
    pub fn prepare(&self) -> Result<HashSet<String>, EtdbError> {
        let manifest_path = self.manifest_path();
        if !self.root.as_std_path().exists() {
            fs::create_dir_all(self.root.as_std_path()).map_err(|err| {
                EtdbError::Filesystem(format!("create run directory {}: {err}", self.root))
            })?;
            Manifest::create(&manifest_path)?;
            return Ok(HashSet::new());
        }
        if Manifest::exists(&manifest_path) {
            return Manifest::load(&manifest_path);
        }
        Manifest::create(&manifest_path)?;
        Ok(HashSet::new())
    }

    /// Persists the full selected-artifact metadata for later inspection,
    /// overwriting any prior snapshot. Resume logic never reads this.
    pub fn write_snapshot(&self, artifacts: &[Artifact]) -> Result<(), EtdbError> {
        let content = serde_json::to_vec_pretty(artifacts)
            .map_err(|err| EtdbError::Filesystem(err.to_string()))?;
        fs::write(self.snapshot_path().as_std_path(), &content).map_err(|err| {
            EtdbError::Filesystem(format!("write snapshot {}: {err}", self.snapshot_path()))
        })
    }

    /// Ensures the per-artifact subdirectory exists and returns the
    /// destination path for one file. Runs inside concurrent transfer tasks,
    /// hence `tokio::fs`.
    pub async fn destination(
        &self,
        location: &str,
        display_name: &str,
    ) -> Result<Utf8PathBuf, EtdbError> {
        let dir = self.artifact_dir(location);
        tokio::fs::create_dir_all(dir.as_std_path())
            .await
            .map_err(|err| EtdbError::Filesystem(format!("create artifact dir {dir}: {err}")))?;
        Ok(dir.join(display_name))
    }
}
