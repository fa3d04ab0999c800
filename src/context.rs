//! Source concatenation for sharing a project as one text file.
//!
//! Walks `<root>/src` then `<root>/scripts`, entries sorted by name, and
//! appends every readable UTF-8 file as
//! `"\n\n ---\n\n{relative path}\n{content}"`. The output directory and the
//! local PocketBase binary and data are never included.

use std::path::{Path, PathBuf};

pub const SOURCE_ROOTS: [&str; 2] = ["src", "scripts"];
pub const DEFAULT_OUTPUT: &str = "scripts/utils/context.txt";

const EXCLUDED_DIRS: [&str; 2] = ["scripts/utils", "scripts/pocketbase/pb_data"];
const EXCLUDED_FILES: [&str; 1] = ["scripts/pocketbase/pocketbase.exe"];

#[derive(Debug, thiserror::Error)]
pub enum ContextError {
    #[error("failed to list {path}: {source}")]
    ReadDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Result of one run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContextReport {
    pub files: Vec<PathBuf>,
    pub skipped: Vec<PathBuf>,
    pub output: Option<PathBuf>,
    pub bytes: usize,
}

/// Concatenate the project under `root` into one string.
///
/// # Errors
///
/// Returns [`ContextError::ReadDir`] if a directory cannot be listed.
/// Unreadable files are skipped and reported instead.
pub fn collect(root: &Path) -> Result<(String, ContextReport), ContextError> {
    let mut out = String::new();
    let mut report = ContextReport::default();
    for name in SOURCE_ROOTS {
        let dir = root.join(name);
        if !dir.is_dir() {
            tracing::debug!(path = %dir.display(), "source root missing; skipping");
            continue;
        }
        walk(root, &dir, &mut out, &mut report)?;
    }
    report.bytes = out.len();
    Ok((out, report))
}

/// Write the concatenation to `output`, or [`DEFAULT_OUTPUT`] under `root`.
///
/// # Errors
///
/// Propagates [`collect`] errors and fails if the output cannot be written.
pub fn write_context(root: &Path, output: Option<&Path>) -> Result<ContextReport, ContextError> {
    let (content, mut report) = collect(root)?;
    let target = output.map_or_else(|| root.join(DEFAULT_OUTPUT), Path::to_path_buf);
    let write_err = |source| ContextError::Write { path: target.clone(), source };
    if let Some(parent) = target.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(write_err)?;
    }
    std::fs::write(&target, content).map_err(write_err)?;
    tracing::info!(
        path = %target.display(),
        files = report.files.len(),
        bytes = report.bytes,
        "context written"
    );
    report.output = Some(target);
    Ok(report)
}

fn walk(root: &Path, dir: &Path, out: &mut String, report: &mut ContextReport) -> Result<(), ContextError> {
    let listing = std::fs::read_dir(dir).map_err(|source| ContextError::ReadDir { path: dir.to_path_buf(), source })?;
    let mut entries: Vec<PathBuf> = listing.filter_map(Result::ok).map(|e| e.path()).collect();
    entries.sort();

    for path in entries {
        let relative = path.strip_prefix(root).unwrap_or(&path).to_path_buf();
        let Ok(file_type) = std::fs::symlink_metadata(&path).map(|m| m.file_type()) else {
            continue;
        };
        // Linked directories are not followed.
        if file_type.is_symlink() && path.is_dir() {
            tracing::debug!(path = %relative.display(), "skipping linked directory");
            continue;
        }
        if file_type.is_dir() {
            if is_excluded(&relative, &EXCLUDED_DIRS) {
                tracing::debug!(path = %relative.display(), "excluding directory");
                continue;
            }
            walk(root, &path, out, report)?;
            continue;
        }
        if is_excluded(&relative, &EXCLUDED_FILES) {
            tracing::debug!(path = %relative.display(), "excluding file");
            continue;
        }
        match std::fs::read_to_string(&path) {
            Ok(content) => {
                out.push_str("\n\n ---\n\n");
                out.push_str(&display_path(&relative));
                out.push('\n');
                out.push_str(&content);
                tracing::debug!(path = %relative.display(), "collected");
                report.files.push(relative);
            }
            Err(e) => {
                tracing::warn!(path = %relative.display(), error = %e, "skipping unreadable file");
                report.skipped.push(relative);
            }
        }
    }
    Ok(())
}

/// Component-wise suffix match, so `scripts/utils` also matches
/// `src/scripts/utils` but not `scripts/utilities`.
fn is_excluded(relative: &Path, patterns: &[&str]) -> bool {
    patterns.iter().any(|p| relative.ends_with(p))
}

fn display_path(relative: &Path) -> String {
    relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

#[cfg(test)]
#[path = "context_test.rs"]
mod tests;
