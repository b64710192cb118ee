//! Slot injection into scene scaffolds.
//!
//! A scaffold carries a region delimited by
//! `# SLOT_START:scene_body` and `# SLOT_END:scene_body`. Injection replaces
//! everything strictly between the markers and leaves every other byte of the
//! file alone.

use std::fs;
use std::io::ErrorKind as IoErrorKind;
use std::path::Path;

use anyhow::Context;
use tracing::info;

use crate::errors::{HarnessError, HarnessResult};
use crate::util::write_atomic;

pub const SLOT_START: &str = "# SLOT_START:scene_body";
pub const SLOT_END: &str = "# SLOT_END:scene_body";

/// Indentation re-applied in front of the end marker.
const END_MARKER_INDENT: &str = "    ";

const MISSING_MARKERS: &str = "Scene file does not contain scene_body SLOT markers.";

/// Byte range strictly between the markers. The end marker only counts
/// when it follows the start marker.
fn slot_range(content: &str) -> Option<(usize, usize)> {
    let start = content.find(SLOT_START)? + SLOT_START.len();
    let end = start + content[start..].find(SLOT_END)?;
    Some((start, end))
}

/// Replace the slot region of `content` with `body`.
pub fn splice_slot(content: &str, body: &str) -> Option<String> {
    let (start, end) = slot_range(content)?;
    let mut out = String::with_capacity(content.len() + body.len() + 8);
    out.push_str(&content[..start]);
    out.push('\n');
    out.push_str(body);
    out.push('\n');
    out.push_str(END_MARKER_INDENT);
    out.push_str(&content[end..]);
    Some(out)
}

/// Body currently held in the slot, as it was passed to [`splice_slot`].
///
/// Drops the newline that follows the start marker and the final newline
/// plus indentation before the end marker.
pub fn extract_slot(content: &str) -> Option<&str> {
    let (start, end) = slot_range(content)?;
    let region = &content[start..end];
    let region = region.strip_prefix('\n').unwrap_or(region);
    match region.rfind('\n') {
        Some(pos) if region[pos + 1..].chars().all(|c| c == ' ' || c == '\t') => {
            Some(&region[..pos])
        }
        _ => Some(region),
    }
}

fn read_scaffold(path: &Path) -> HarnessResult<String> {
    match fs::read_to_string(path) {
        Ok(content) => Ok(content),
        Err(e) if e.kind() == IoErrorKind::NotFound => {
            Err(HarnessError::structural(path, "Scene file not found"))
        }
        Err(e) => Err(HarnessError::Operational(
            anyhow::Error::new(e).context(format!("Failed to read {}", path.display())),
        )),
    }
}

/// Inject `body` into the scaffold at `path`.
///
/// The new content is computed in full before the file is replaced
/// atomically; on any error the file is left as it was.
pub fn inject_scene_body(path: &Path, body: &str) -> HarnessResult<()> {
    let content = read_scaffold(path)?;
    let updated =
        splice_slot(&content, body).ok_or_else(|| HarnessError::structural(path, MISSING_MARKERS))?;
    write_atomic(path, updated.as_bytes())
        .with_context(|| format!("Failed to write scene file {}", path.display()))?;
    info!(path = %path.display(), bytes = body.len(), "Scene body injected");
    Ok(())
}

/// Read the scaffold at `path` and return the body in its slot.
pub fn read_scene_body(path: &Path) -> HarnessResult<String> {
    let content = read_scaffold(path)?;
    extract_slot(&content)
        .map(str::to_string)
        .ok_or_else(|| HarnessError::structural(path, MISSING_MARKERS))
}
