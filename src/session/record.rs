use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::errors::{HarnessError, HarnessResult};
use crate::util::{read_json, write_json_atomic};

/// On-disk form of a conversation session.
///
/// ```json
/// {"response_id": "resp_abc", "collection_ids": ["T1", "P1"], "updated_at": "2026-02-24T10:00:00Z"}
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionRecord {
    pub response_id: Option<String>,
    pub collection_ids: Vec<String>,
    /// Older records may lack a timestamp
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl SessionRecord {
    /// Load the record at `path`; `Ok(None)` when no session has been saved yet.
    pub fn load(path: &Path) -> HarnessResult<Option<Self>> {
        read_json(path).map_err(HarnessError::Operational)
    }

    /// Overwrite the record at `path` in one atomic step.
    pub fn save(&self, path: &Path) -> HarnessResult<()> {
        write_json_atomic(path, self).map_err(HarnessError::Operational)
    }
}
