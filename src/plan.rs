use std::collections::HashSet;

use crate::domain::{Artifact, CategoryFilter, FileEntry};
use crate::manifest::manifest_key;

/// One file slated for download, paired with the location of its artifact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedFile {
    pub location: String,
    pub file: FileEntry,
}

impl PlannedFile {
    pub fn manifest_key(&self) -> String {
        manifest_key(&self.location, &self.file.filename)
    }

    /// Remote identifier the byte-stream source is keyed by.
    pub fn remote_id(&self) -> String {
        format!("{}/{}", self.location, self.file.filename)
    }
}

/// Flattens the artifacts into `(location, file)` pairs, keeping only files
/// whose category passes the filter and whose manifest key is not already
/// recorded. Pure; preserves artifact order and within-artifact file order.
pub fn select_files(
    artifacts: &[Artifact],
    filter: &CategoryFilter,
    manifest_keys: &HashSet<String>,
) -> Vec<PlannedFile> {
    let mut selected = Vec::new();
    for artifact in artifacts {
        for file in &artifact.files {
            if !filter.matches(file.subtype) {
                continue;
            }
            if manifest_keys.contains(&manifest_key(&artifact.location, &file.filename)) {
                continue;
            }
            selected.push(PlannedFile {
                location: artifact.location.clone(),
                file: file.clone(),
            });
        }
    }
    selected
}

/// Aggregate summary of a run's pending work, recomputed each invocation and
/// never persisted. The confirmation decision itself belongs to the caller.
#[derive(Debug, Clone)]
pub struct DownloadPlan {
    pub files: Vec<PlannedFile>,
    pub total_bytes: u64,
    /// Number of artifacts matched by the query, before any file-level
    /// filtering or manifest dedup.
    pub selected_artifact_count: usize,
}

impl DownloadPlan {
    pub fn build(
        artifacts: &[Artifact],
        filter: &CategoryFilter,
        manifest_keys: &HashSet<String>,
    ) -> Self {
        let files = select_files(artifacts, filter, manifest_keys);
        let total_bytes = files.iter().map(|planned| planned.file.size_bytes).sum();
        Self {
            files,
            total_bytes,
            selected_artifact_count: artifacts.len(),
        }
    }

    pub fn file_count(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use crate::domain::{Category, FileKind};

    use super::*;

    fn file(filename: &str, subtype: FileKind, size_bytes: u64) -> FileEntry {
        FileEntry {
            filename: filename.to_string(),
            display_name: filename.to_string(),
            subtype,
            size_bytes,
        }
    }

    fn artifact(location: &str, files: Vec<FileEntry>) -> Artifact {
        Artifact {
            location: location.to_string(),
            files,
        }
    }

    #[test]
    fn selection_preserves_order() {
        let artifacts = vec![
            artifact(
                "rec1",
                vec![
                    file("a.mrc", FileKind::Tiltseries, 10),
                    file("b.mp4", FileKind::Keymov, 20),
                ],
            ),
            artifact("rec2", vec![file("c.mrc", FileKind::Tiltseries, 30)]),
        ];

        let selected = select_files(&artifacts, &CategoryFilter::All, &HashSet::new());
        let names: Vec<&str> = selected
            .iter()
            .map(|planned| planned.file.filename.as_str())
            .collect();
        assert_eq!(names, vec!["a.mrc", "b.mp4", "c.mrc"]);
    }

    #[test]
    fn filter_drops_non_matching_categories() {
        let artifacts = vec![artifact(
            "rec1",
            vec![
                file("a.mrc", FileKind::Tiltseries, 10),
                file("b.png", FileKind::Snapshot, 20),
                file("c.jpg", FileKind::Keyimg, 30),
            ],
        )];
        let filter = CategoryFilter::Only([Category::Images].into_iter().collect());

        let selected = select_files(&artifacts, &filter, &HashSet::new());
        assert_eq!(selected.len(), 2);
        assert!(selected.iter().all(|p| p.file.filename != "a.mrc"));
    }

    #[test]
    fn manifest_keys_dedup_completed_files() {
        let artifacts = vec![artifact(
            "rec1",
            vec![
                file("a.mrc", FileKind::Tiltseries, 10),
                file("b.mrc", FileKind::Tiltseries, 20),
            ],
        )];
        let manifest_keys: HashSet<String> = ["rec1 : a.mrc".to_string()].into_iter().collect();

        let selected = select_files(&artifacts, &CategoryFilter::All, &manifest_keys);
        assert_eq!(selected.len(), 1);
        assert_eq!(selected[0].file.filename, "b.mrc");
    }

    #[test]
    fn artifact_with_no_matching_files_is_not_an_error() {
        let artifacts = vec![artifact("rec1", vec![file("a.mrc", FileKind::Tiltseries, 10)])];
        let filter = CategoryFilter::Only([Category::Videos].into_iter().collect());

        let plan = DownloadPlan::build(&artifacts, &filter, &HashSet::new());
        assert!(plan.is_empty());
        assert_eq!(plan.total_bytes, 0);
        assert_eq!(plan.selected_artifact_count, 1);
    }

    #[test]
    fn plan_size_accounting() {
        let artifacts = vec![
            artifact(
                "rec1",
                vec![
                    file("a.mrc", FileKind::Tiltseries, 1000),
                    file("b.png", FileKind::Snapshot, 200),
                ],
            ),
            artifact("rec2", vec![file("c.mp4", FileKind::Keymov, 4000)]),
        ];
        let manifest_keys: HashSet<String> = ["rec2 : c.mp4".to_string()].into_iter().collect();

        let plan = DownloadPlan::build(&artifacts, &CategoryFilter::All, &manifest_keys);
        assert_eq!(plan.file_count(), 2);
        assert_eq!(plan.total_bytes, 1200);
        // Pre-filter count: artifacts matched by the query, not survivors.
        assert_eq!(plan.selected_artifact_count, 2);
    }

    #[test]
    fn remote_id_joins_location_and_filename() {
        let planned = PlannedFile {
            location: "qj8969".to_string(),
            file: file("qj8969.rec", FileKind::Reconstruction, 1),
        };
        assert_eq!(planned.remote_id(), "qj8969/qj8969.rec");
        assert_eq!(planned.manifest_key(), "qj8969 : qj8969.rec");
    }
}
