use super::TurnAudit;
use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

use crate::util::write_json_atomic;

pub struct AuditLogger {
    audit_dir: PathBuf,
}

impl AuditLogger {
    pub fn new(audit_dir: &Path) -> Self {
        Self {
            audit_dir: audit_dir.to_path_buf(),
        }
    }

    /// Persist one record as `<timestamp>_<phase>_<run>.json`.
    pub fn write(&self, audit: &TurnAudit) -> Result<PathBuf> {
        fs::create_dir_all(&self.audit_dir).with_context(|| {
            format!("Failed to create audit directory {}", self.audit_dir.display())
        })?;

        let filename = format!(
            "{}_{}_{}.json",
            audit.started_at.format("%Y-%m-%dT%H-%M-%S"),
            audit.phase,
            &audit.run_id.to_string()[..8]
        );
        let path = self.audit_dir.join(filename);
        write_json_atomic(&path, audit).context("Failed to write audit record")?;
        Ok(path)
    }

    /// All records, oldest first.
    pub fn load_all(&self) -> Result<Vec<TurnAudit>> {
        if !self.audit_dir.exists() {
            return Ok(Vec::new());
        }

        let mut paths: Vec<PathBuf> = fs::read_dir(&self.audit_dir)
            .with_context(|| format!("Failed to read {}", self.audit_dir.display()))?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|p| p.extension().is_some_and(|ext| ext == "json"))
            .collect();
        paths.sort();

        paths
            .iter()
            .map(|path| {
                let content = fs::read_to_string(path)
                    .with_context(|| format!("Failed to read {}", path.display()))?;
                serde_json::from_str(&content)
                    .with_context(|| format!("Failed to parse audit record {}", path.display()))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::TurnOutcome;
    use crate::phase::Phase;
    use tempfile::tempdir;

    #[test]
    fn test_write_and_load() {
        let dir = tempdir().unwrap();
        let logger = AuditLogger::new(&dir.path().join(".harness").join("audit"));

        let mut audit = TurnAudit::new(Phase::Plan, "grok", None);
        audit.finish(
            Some("R1".into()),
            TurnOutcome::SemanticRejected {
                message: "nope".into(),
            },
        );
        let path = logger.write(&audit).unwrap();
        assert!(path.file_name().unwrap().to_string_lossy().contains("_plan_"));

        let records = logger.load_all().unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].run_id, audit.run_id);
        assert_eq!(records[0].response_id.as_deref(), Some("R1"));
    }

    #[test]
    fn test_load_all_without_directory() {
        let dir = tempdir().unwrap();
        let logger = AuditLogger::new(&dir.path().join("missing"));
        assert!(logger.load_all().unwrap().is_empty());
    }
}
