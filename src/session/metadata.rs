use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::errors::{HarnessError, HarnessResult};
use crate::util::{read_json, write_json_atomic};

/// A document uploaded to the project collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentRecord {
    pub file_id: String,
    pub name: String,
}

/// Collection metadata written when a project is initialized.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectMetadata {
    pub template_collection_id: String,
    pub project_collection_id: String,
    #[serde(default)]
    pub documents: Vec<DocumentRecord>,
}

impl ProjectMetadata {
    pub fn new(
        template_collection_id: impl Into<String>,
        project_collection_id: impl Into<String>,
    ) -> Self {
        Self {
            template_collection_id: template_collection_id.into(),
            project_collection_id: project_collection_id.into(),
            documents: Vec::new(),
        }
    }

    /// Load metadata; a missing file means the project was never initialized.
    pub fn load(path: &Path) -> HarnessResult<Self> {
        match read_json::<Self>(path) {
            Ok(Some(metadata)) => Ok(metadata),
            Ok(None) => Err(HarnessError::Configuration(format!(
                "'{}' not found. Please initialize the project first.",
                path.display()
            ))),
            Err(e) => Err(HarnessError::Operational(e)),
        }
    }

    /// Collection ids in the order every turn searches them.
    pub fn collection_ids(&self) -> Vec<String> {
        vec![
            self.template_collection_id.clone(),
            self.project_collection_id.clone(),
        ]
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        write_json_atomic(path, self)
            .with_context(|| format!("Failed to write metadata: {}", path.display()))
    }

    /// Write fresh metadata for a project. Refuses to clobber existing
    /// metadata unless `force` is set.
    pub fn initialize(path: &Path, metadata: &Self, force: bool) -> Result<()> {
        if path.exists() && !force {
            anyhow::bail!(
                "'{}' already exists. Use --force to overwrite it.",
                path.display()
            );
        }
        metadata.save(path)
    }

    /// Append document records, keeping everything already recorded.
    pub fn append_documents(path: &Path, documents: &[DocumentRecord]) -> HarnessResult<Self> {
        let mut metadata = Self::load(path)?;
        metadata.documents.extend(documents.iter().cloned());
        metadata.save(path)?;
        Ok(metadata)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_load_without_documents_field() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(".collections_metadata.json");
        std::fs::write(
            &path,
            r#"{"template_collection_id": "t_id", "project_collection_id": "p_id"}"#,
        )
        .unwrap();
        let metadata = ProjectMetadata::load(&path).unwrap();
        assert_eq!(metadata.collection_ids(), vec!["t_id", "p_id"]);
        assert!(metadata.documents.is_empty());
    }

    #[test]
    fn test_missing_metadata_is_configuration_error() {
        let dir = tempdir().unwrap();
        let err =
            ProjectMetadata::load(&dir.path().join(".collections_metadata.json")).unwrap_err();
        assert!(matches!(err, HarnessError::Configuration(_)));
        assert!(err.to_string().contains("initialize the project first"));
    }

    #[test]
    fn test_initialize_refuses_overwrite_without_force() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(".collections_metadata.json");
        ProjectMetadata::initialize(&path, &ProjectMetadata::new("T1", "P1"), false).unwrap();

        let err = ProjectMetadata::initialize(&path, &ProjectMetadata::new("T2", "P2"), false)
            .unwrap_err();
        assert!(err.to_string().contains("--force"));
        assert_eq!(ProjectMetadata::load(&path).unwrap().template_collection_id, "T1");

        ProjectMetadata::initialize(&path, &ProjectMetadata::new("T2", "P2"), true).unwrap();
        assert_eq!(ProjectMetadata::load(&path).unwrap().template_collection_id, "T2");
    }

    #[test]
    fn test_append_documents_preserves_existing() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(".collections_metadata.json");
        ProjectMetadata::new("T1", "P1").save(&path).unwrap();

        ProjectMetadata::append_documents(
            &path,
            &[DocumentRecord {
                file_id: "file_1".into(),
                name: "scene_01_intro.py".into(),
            }],
        )
        .unwrap();
        let metadata = ProjectMetadata::append_documents(
            &path,
            &[DocumentRecord {
                file_id: "file_2".into(),
                name: "qc_scene_01_intro.md".into(),
            }],
        )
        .unwrap();

        assert_eq!(metadata.documents.len(), 2);
        assert_eq!(metadata.documents[0].file_id, "file_1");
        assert_eq!(metadata.project_collection_id, "P1");
        assert_eq!(ProjectMetadata::load(&path).unwrap(), metadata);
    }
}
