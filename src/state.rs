//! Durable project state: a flat JSON object of named slots.
//!
//! Every write is read-merge-write, so a phase only ever replaces the slot it
//! owns and the rest of the document survives.

use anyhow::{Context, Result, bail};
use serde_json::{Map, Value};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::util::write_json_atomic;

pub type StateDocument = Map<String, Value>;

pub struct ProjectStateStore {
    path: PathBuf,
}

impl ProjectStateStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the whole document. A missing file is an empty document.
    pub fn load(&self) -> Result<StateDocument> {
        if !self.path.exists() {
            return Ok(StateDocument::new());
        }
        let content = fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read {}", self.path.display()))?;
        match serde_json::from_str::<Value>(&content)
            .with_context(|| format!("Failed to parse JSON in {}", self.path.display()))?
        {
            Value::Object(map) => Ok(map),
            _ => bail!("{} is not a JSON object", self.path.display()),
        }
    }

    pub fn get(&self, key: &str) -> Result<Option<Value>> {
        Ok(self.load()?.remove(key))
    }

    /// Replace the slot `key`, keeping every other slot.
    pub fn merge(&self, key: &str, value: Value) -> Result<()> {
        let mut doc = self.load()?;
        doc.insert(key.to_string(), value);
        self.save(&doc)?;
        debug!(key, path = %self.path.display(), "Project state updated");
        Ok(())
    }

    /// Replace `key.sub_key`, keeping the other entries under `key`.
    ///
    /// A non-object value already stored at `key` is replaced by an object.
    pub fn merge_nested(&self, key: &str, sub_key: &str, value: Value) -> Result<()> {
        let mut doc = self.load()?;
        let slot = doc
            .entry(key.to_string())
            .or_insert_with(|| Value::Object(Map::new()));
        if !slot.is_object() {
            warn!(key, "Replacing non-object project state slot");
            *slot = Value::Object(Map::new());
        }
        if let Value::Object(entries) = slot {
            entries.insert(sub_key.to_string(), value);
        }
        self.save(&doc)
    }

    /// Merge for manual edits: an unreadable document is started over
    /// instead of blocking the edit.
    pub fn set_lenient(&self, key: &str, value: Value) -> Result<()> {
        let mut doc = match self.load() {
            Ok(doc) => doc,
            Err(e) => {
                warn!(error = %e, "Project state unreadable, starting from an empty document");
                StateDocument::new()
            }
        };
        doc.insert(key.to_string(), value);
        self.save(&doc)
    }

    fn save(&self, doc: &StateDocument) -> Result<()> {
        write_json_atomic(&self.path, doc)
    }
}

/// Interpret a command-line value: JSON when it parses, a plain string otherwise.
pub fn parse_state_value(raw: &str) -> Value {
    serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
}

/// Render a slot for printing: strings raw, everything else as compact JSON.
pub fn render_state_value(value: &Value) -> Result<String> {
    match value {
        Value::String(s) => Ok(s.clone()),
        other => serde_json::to_string(other).context("Failed to render state value"),
    }
}
