use std::collections::HashSet;
use std::fs::{self, File, OpenOptions};

use camino::Utf8Path;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

use crate::error::EtdbError;

/// Canonical manifest filename inside a run directory.
pub const MANIFEST_FILE_NAME: &str = ".etdb-downloads.manifest.txt";

/// Manifest key for one completed download. The selector tests membership
/// against this exact string, so writer and reader must agree byte-for-byte.
pub fn manifest_key(location: &str, filename: &str) -> String {
    format!("{location} : {filename}")
}

pub struct Manifest;

impl Manifest {
    pub fn exists(path: &Utf8Path) -> bool {
        path.as_std_path().exists()
    }

    /// Creates an empty manifest file if none is present.
    pub fn create(path: &Utf8Path) -> Result<(), EtdbError> {
        if Self::exists(path) {
            return Ok(());
        }
        File::create(path.as_std_path())
            .map(|_| ())
            .map_err(|err| EtdbError::Filesystem(format!("create manifest {path}: {err}")))
    }

    /// Loads the set of completed-download keys, one per non-empty line.
    pub fn load(path: &Utf8Path) -> Result<HashSet<String>, EtdbError> {
        let content = fs::read_to_string(path.as_std_path())
            .map_err(|err| EtdbError::Filesystem(format!("read manifest {path}: {err}")))?;
        Ok(content
            .split('\n')
            .filter(|line| !line.is_empty())
            .map(|line| line.to_string())
            .collect())
    }
}

/// Append handle for the run's manifest. Concurrent transfer completions all
/// funnel through the internal mutex so lines never interleave, and the
/// writes themselves go through `tokio::fs` so they never block a transfer
/// task.
pub struct ManifestWriter {
    file: Mutex<tokio::fs::File>,
}

impl ManifestWriter {
    pub fn open(path: &Utf8Path) -> Result<Self, EtdbError> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path.as_std_path())
            .map_err(|err| EtdbError::Filesystem(format!("open manifest {path}: {err}")))?;
        Ok(Self {
            file: Mutex::new(tokio::fs::File::from_std(file)),
        })
    }

    pub async fn append(&self, location: &str, filename: &str) -> Result<(), EtdbError> {
        let line = format!("{}\n", manifest_key(location, filename));
        let mut file = self.file.lock().await;
        file.write_all(line.as_bytes())
            .await
            .map_err(|err| EtdbError::Filesystem(format!("append manifest entry: {err}")))?;
        file.flush()
            .await
            .map_err(|err| EtdbError::Filesystem(format!("flush manifest entry: {err}")))
    }
}

#[cfg(test)]
mod tests {
    use camino::Utf8PathBuf;

    use super::*;

    fn temp_manifest() -> (tempfile::TempDir, Utf8PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let path = Utf8PathBuf::from_path_buf(dir.path().join(MANIFEST_FILE_NAME)).unwrap();
        (dir, path)
    }

    #[test]
    fn key_format() {
        assert_eq!(manifest_key("qj8969", "qj8969.mrc"), "qj8969 : qj8969.mrc");
    }

    #[test]
    fn create_is_idempotent() {
        let (_dir, path) = temp_manifest();
        Manifest::create(&path).unwrap();
        Manifest::create(&path).unwrap();
        assert!(Manifest::exists(&path));
        assert!(Manifest::load(&path).unwrap().is_empty());
    }

    #[tokio::test]
    async fn append_then_load_round_trips() {
        let (_dir, path) = temp_manifest();
        Manifest::create(&path).unwrap();

        let writer = ManifestWriter::open(&path).unwrap();
        writer.append("rec1", "a.mrc").await.unwrap();
        writer.append("rec1", "b.png").await.unwrap();
        writer.append("rec2", "c.mp4").await.unwrap();

        let keys = Manifest::load(&path).unwrap();
        assert_eq!(keys.len(), 3);
        assert!(keys.contains("rec1 : a.mrc"));
        assert!(keys.contains("rec1 : b.png"));
        assert!(keys.contains("rec2 : c.mp4"));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_appends_do_not_corrupt_lines() {
        let (_dir, path) = temp_manifest();
        Manifest::create(&path).unwrap();

        let writer = std::sync::Arc::new(ManifestWriter::open(&path).unwrap());
        let mut handles = Vec::new();
        for task in 0..8 {
            let writer = writer.clone();
            handles.push(tokio::spawn(async move {
                for item in 0..25 {
                    writer
                        .append(&format!("rec{task}"), &format!("file{item}.mrc"))
                        .await
                        .unwrap();
                }
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        let keys = Manifest::load(&path).unwrap();
        assert_eq!(keys.len(), 8 * 25);
        for key in keys {
            let (location, filename) = key.split_once(" : ").unwrap();
            assert!(location.starts_with("rec"));
            assert!(filename.ends_with(".mrc"));
        }
    }
}
