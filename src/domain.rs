use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::EtdbError;

/// One remote record as returned by the catalog. Immutable once fetched;
/// the downloader only reads it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Artifact {
    pub location: String,
    #[serde(default)]
    pub files: Vec<FileEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileEntry {
    /// Identifier used for manifest dedup and remote retrieval.
    pub filename: String,
    /// Name the file is written under locally; may differ from `filename`.
    pub display_name: String,
    pub subtype: FileKind,
    pub size_bytes: u64,
}

/// Raw file subtype as published by the catalog. Subtypes the catalog adds
/// later deserialize as `Other` instead of failing the whole run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FileKind {
    Tiltseries,
    Reconstruction,
    Subvolume,
    Keymov,
    Keyimg,
    Snapshot,
    #[serde(other)]
    Other,
}

/// User-facing grouping of file subtypes, used only for filtering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Category {
    TiltSeries,
    Reconstructions,
    Subvolumes,
    Videos,
    Images,
    Others,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::TiltSeries => "TiltSeries",
            Category::Reconstructions => "Reconstructions",
            Category::Subvolumes => "Subvolumes",
            Category::Videos => "Videos",
            Category::Images => "Images",
            Category::Others => "Others",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = EtdbError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "tiltseries" => Ok(Category::TiltSeries),
            "reconstructions" => Ok(Category::Reconstructions),
            "subvolumes" => Ok(Category::Subvolumes),
            "videos" => Ok(Category::Videos),
            "images" => Ok(Category::Images),
            "others" => Ok(Category::Others),
            _ => Err(EtdbError::InvalidCategory(value.to_string())),
        }
    }
}

/// Fixed subtype-to-category mapping. Both `Keyimg` and `Snapshot` are
/// surfaced to users as images.
pub fn category_of(kind: FileKind) -> Category {
    match kind {
        FileKind::Tiltseries => Category::TiltSeries,
        FileKind::Reconstruction => Category::Reconstructions,
        FileKind::Subvolume => Category::Subvolumes,
        FileKind::Keymov => Category::Videos,
        FileKind::Keyimg | FileKind::Snapshot => Category::Images,
        FileKind::Other => Category::Others,
    }
}

/// Requested file-category filter: either everything or a non-empty set of
/// categories.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CategoryFilter {
    All,
    Only(BTreeSet<Category>),
}

impl CategoryFilter {
    pub fn matches(&self, kind: FileKind) -> bool {
        match self {
            CategoryFilter::All => true,
            CategoryFilter::Only(set) => set.contains(&category_of(kind)),
        }
    }
}

impl FromStr for CategoryFilter {
    type Err = EtdbError;

    /// Parses `all` or a comma-separated list of category names.
    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let trimmed = value.trim();
        if trimmed.eq_ignore_ascii_case("all") {
            return Ok(CategoryFilter::All);
        }
        let mut set = BTreeSet::new();
        for part in trimmed.split(',') {
            if part.trim().is_empty() {
                return Err(EtdbError::InvalidCategory(value.to_string()));
            }
            set.insert(part.parse::<Category>()?);
        }
        if set.is_empty() {
            return Err(EtdbError::InvalidCategory(value.to_string()));
        }
        Ok(CategoryFilter::Only(set))
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[test]
    fn subtype_category_mapping() {
        assert_eq!(category_of(FileKind::Tiltseries), Category::TiltSeries);
        assert_eq!(category_of(FileKind::Reconstruction), Category::Reconstructions);
        assert_eq!(category_of(FileKind::Subvolume), Category::Subvolumes);
        assert_eq!(category_of(FileKind::Keymov), Category::Videos);
        assert_eq!(category_of(FileKind::Keyimg), Category::Images);
        assert_eq!(category_of(FileKind::Snapshot), Category::Images);
        assert_eq!(category_of(FileKind::Other), Category::Others);
    }

    #[test]
    fn parse_filter_all_sentinel() {
        let filter: CategoryFilter = "All".parse().unwrap();
        assert_eq!(filter, CategoryFilter::All);
        assert!(filter.matches(FileKind::Keymov));
    }

    #[test]
    fn parse_filter_list() {
        let filter: CategoryFilter = "Images,Videos".parse().unwrap();
        assert!(filter.matches(FileKind::Snapshot));
        assert!(filter.matches(FileKind::Keymov));
        assert!(!filter.matches(FileKind::Tiltseries));
    }

    #[test]
    fn parse_filter_invalid() {
        let err = "Holograms".parse::<CategoryFilter>().unwrap_err();
        assert_matches!(err, EtdbError::InvalidCategory(_));

        let err = "".parse::<CategoryFilter>().unwrap_err();
        assert_matches!(err, EtdbError::InvalidCategory(_));
    }

    #[test]
    fn unknown_subtype_deserializes_as_other() {
        let entry: FileEntry = serde_json::from_str(
            r#"{"filename":"x.dat","displayName":"x.dat","subtype":"Hologram","sizeBytes":10}"#,
        )
        .unwrap();
        assert_eq!(entry.subtype, FileKind::Other);
    }
}
