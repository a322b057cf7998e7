use std::path::{Path, PathBuf};

use anyhow::Context;

/// Expand files, directories and glob patterns into the sorted list of assemblies to process.
///
/// An argument containing `*`, `?` or `[` is a pattern (`bin/**/*.dll`). Everything it
/// matches is treated as if named directly. Directories contribute their `.dll` and `.exe` files,
/// recursively with `recursive`. Paths named in `exclude` are dropped; they match by canonical
/// path when both sides exist.
pub fn collect(
    paths: &[PathBuf],
    recursive: bool,
    exclude: &[PathBuf],
) -> anyhow::Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for path in paths {
        if is_pattern(path) {
            for matched in expand(path)? {
                collect_path(&matched, recursive, &mut files)?;
            }
        } else if path.exists() {
            collect_path(path, recursive, &mut files)?;
        } else {
            anyhow::bail!("input does not exist: {}", path.display());
        }
    }

    let excluded: Vec<PathBuf> = exclude.iter().map(|path| canonical(path)).collect();
    files.retain(|file| !excluded.contains(&canonical(file)));
    files.sort();
    files.dedup();
    Ok(files)
}

fn is_pattern(path: &Path) -> bool {
    path.to_string_lossy().contains(['*', '?', '['])
}

fn expand(pattern: &Path) -> anyhow::Result<Vec<PathBuf>> {
    let text = pattern.to_string_lossy();
    let entries = glob::glob(&text).with_context(|| format!("invalid input pattern: {text}"))?;

    let mut matched = Vec::new();
    for entry in entries {
        matched.push(entry.with_context(|| format!("failed to expand pattern: {text}"))?);
    }
    Ok(matched)
}

fn collect_path(path: &Path, recursive: bool, files: &mut Vec<PathBuf>) -> anyhow::Result<()> {
    if path.is_dir() {
        collect_dir(path, recursive, files)
    } else {
        files.push(path.to_path_buf());
        Ok(())
    }
}

fn collect_dir(dir: &Path, recursive: bool, files: &mut Vec<PathBuf>) -> anyhow::Result<()> {
    let entries = std::fs::read_dir(dir)
        .with_context(|| format!("failed to read directory: {}", dir.display()))?;

    for entry in entries {
        let path = entry?.path();
        if path.is_dir() {
            if recursive {
                collect_dir(&path, recursive, files)?;
            }
        } else if is_assembly_file(&path) {
            files.push(path);
        }
    }
    Ok(())
}

/// Returns true if the path has an `.exe` or `.dll` extension.
fn is_assembly_file(path: &Path) -> bool {
    matches!(
        path.extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase)
            .as_deref(),
        Some("exe" | "dll")
    )
}

fn canonical(path: &Path) -> PathBuf {
    path.canonicalize().unwrap_or_else(|_| path.to_path_buf())
}
