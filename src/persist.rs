// src/persist.rs
//! Whole-file replacement on disk: write a sibling temp file, fsync, rename.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

/// Temp file that is removed on drop unless it was renamed into place.
struct TempGuard {
    path: PathBuf,
    committed: bool,
}

impl Drop for TempGuard {
    fn drop(&mut self) {
        if !self.committed {
            let _ = fs::remove_file(&self.path);
        }
    }
}

/// `seen.json` stages through `seen.json.tmp`, `digest.prom` through
/// `digest.prom.tmp`.
pub fn temp_path(path: &Path) -> PathBuf {
    let ext = path
        .extension()
        .map(|e| format!("{}.tmp", e.to_string_lossy()))
        .unwrap_or_else(|| "tmp".to_string());
    path.with_extension(ext)
}

/// Replace `path` with `bytes`. Readers see the old file or the new one,
/// never a partial write. Parent directories are created as needed.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> io::Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    let mut guard = TempGuard {
        path: temp_path(path),
        committed: false,
    };
    {
        let mut f = fs::File::create(&guard.path)?;
        f.write_all(bytes)?;
        f.sync_all()?;
    }
    fs::rename(&guard.path, path)?;
    guard.committed = true;
    Ok(())
}
