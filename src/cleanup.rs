use std::fs;
use std::io::ErrorKind;
use std::path::Path;
use std::time::{Duration, SystemTime};

/// Delete a file if it exists. Failures are logged, never returned.
pub fn remove_file(path: impl AsRef<Path>) {
    let path = path.as_ref();
    match fs::remove_file(path) {
        Ok(()) => tracing::info!("Removed file: {}", path.display()),
        Err(e) if e.kind() == ErrorKind::NotFound => {
            tracing::debug!("File already gone: {}", path.display())
        }
        Err(e) => tracing::error!("Failed to remove {}: {}", path.display(), e),
    }
}

/// Delete regular files in `dir` last modified more than `max_age_hours` ago.
/// Returns how many were removed.
pub fn sweep_older_than(dir: impl AsRef<Path>, max_age_hours: u64) -> usize {
    let dir = dir.as_ref();
    let max_age = Duration::from_secs(max_age_hours.saturating_mul(3600));

    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == ErrorKind::NotFound => return 0,
        Err(e) => {
            tracing::error!("Failed to scan {}: {}", dir.display(), e);
            return 0;
        }
    };

    let now = SystemTime::now();
    let mut deleted = 0;

    for entry in entries.filter_map(Result::ok) {
        let Ok(meta) = entry.metadata() else { continue };
        if !meta.is_file() {
            continue;
        }

        let age = meta
            .modified()
            .ok()
            .and_then(|modified| now.duration_since(modified).ok())
            .unwrap_or_default();

        if age > max_age {
            let path = entry.path();
            match fs::remove_file(&path) {
                Ok(()) => deleted += 1,
                Err(e) => tracing::warn!("Failed to remove {}: {}", path.display(), e),
            }
        }
    }

    if deleted > 0 {
        tracing::info!("Removed {} old file(s) from {}", deleted, dir.display());
    }
    deleted
}
