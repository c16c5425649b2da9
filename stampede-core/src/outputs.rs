use std::path::{Component, Path, PathBuf};

use crate::error::{Error, Result};
use crate::report::snapshot_json;
use crate::summary::RunResult;

fn sanitize_relative_output_path(rel: &str) -> Result<PathBuf> {
    if Path::new(rel).is_absolute() {
        return Err(Error::InvalidOutputPath(rel.to_string()));
    }

    let mut clean = PathBuf::new();
    for c in Path::new(rel).components() {
        match c {
            Component::CurDir => {}
            Component::Normal(p) => clean.push(p),
            // Forbid parent traversal and any absolute/prefix/root components.
            _ => return Err(Error::InvalidOutputPath(rel.to_string())),
        }
    }

    if clean.as_os_str().is_empty() {
        return Err(Error::InvalidOutputPath(rel.to_string()));
    }

    Ok(clean)
}

/// Checks an output path without touching the filesystem.
pub fn validate_output_path(rel: &str) -> Result<()> {
    sanitize_relative_output_path(rel).map(|_| ())
}

/// Writes `contents` to `base_dir/rel`, creating parent directories.
///
/// `rel` must be relative and must not contain parent traversal (`..`).
pub fn write_output_file(base_dir: &Path, rel: &str, contents: &[u8]) -> Result<PathBuf> {
    let path = base_dir.join(sanitize_relative_output_path(rel)?);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(&path, contents)?;
    Ok(path)
}

/// Writes the pretty-printed archival JSON snapshot of `result`.
pub fn write_summary_json(base_dir: &Path, rel: &str, result: &RunResult) -> Result<PathBuf> {
    let mut json = serde_json::to_vec_pretty(&snapshot_json(result))?;
    json.push(b'\n');
    write_output_file(base_dir, rel, &json)
}
