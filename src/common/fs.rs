use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use super::compress::{compress, decompress, Compression};

/// Create the parent directory of `path` if it doesn't exist; error if a non-directory exists there.
pub fn ensure_parent_exists(path: &Path) -> Result<()> {
    let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) else { return Ok(()) };
    if parent.exists() {
        if !parent.is_dir() {
            anyhow::bail!("Path exists but is not a directory: {}", parent.display());
        }
    } else {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory {}", parent.display()))?;
    }
    Ok(())
}

/// Read a whole file, decompressing it according to its extension.
pub fn read_decompressed(path: &Path) -> Result<Vec<u8>> {
    let bytes = fs::read(path)
        .with_context(|| format!("[common::fs] Failed to read {}", path.display()))?;
    decompress(&bytes, Compression::from_path(path))
        .with_context(|| format!("[common::fs] Failed to decompress {}", path.display()))
}

/// Write `data` to `path` with the given compression, creating parent directories.
pub fn write_compressed(path: &Path, data: &[u8], compression: Compression) -> Result<()> {
    ensure_parent_exists(path)?;
    let bytes = compress(data, compression)?;
    fs::write(path, bytes)
        .with_context(|| format!("[common::fs] Failed to write {}", path.display()))
}

/// `dir/matrix.tsv` + `_misses.geojson` -> `dir/matrix_misses.geojson`.
pub fn sibling_with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or("output");
    path.with_file_name(format!("{stem}{suffix}"))
}
