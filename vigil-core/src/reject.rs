//! Policy enforcement for files whose verdict came back invalid.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{info, warn};
use vigil_model::{RecordedEventKind, RejectHandling, VideoMetadataConfig};

/// Apply the configured reject handling to `path`.
///
/// Only called for invalid verdicts. Whatever happens on disk, the event for
/// this file records as `Rejected`: a delete that fails leaves the file in
/// place while the record still says rejected, an acknowledged inconsistency.
pub fn enforce(path: &Path, config: &VideoMetadataConfig) -> RecordedEventKind {
    if !path.exists() {
        warn!(path = %path.display(), "rejected file no longer exists");
        return RecordedEventKind::Rejected;
    }

    match config.reject_handling {
        RejectHandling::Move => match config.reject_move_to_dir.as_deref() {
            Some(target_dir) => {
                if let Err(error) = move_rejected(path, target_dir) {
                    warn!(
                        path = %path.display(),
                        %error,
                        "failed to move rejected file, falling back to delete"
                    );
                    delete_rejected(path);
                }
            }
            None => {
                warn!(path = %path.display(), "no move target configured, deleting instead");
                delete_rejected(path);
            }
        },
        RejectHandling::Delete => delete_rejected(path),
    }

    RecordedEventKind::Rejected
}

fn delete_rejected(path: &Path) {
    match fs::remove_file(path) {
        Ok(()) => info!(path = %path.display(), "rejected file deleted"),
        Err(error) => warn!(path = %path.display(), %error, "failed to delete rejected file"),
    }
}

fn move_rejected(path: &Path, target_dir: &Path) -> std::io::Result<()> {
    fs::create_dir_all(target_dir)?;

    let base = path
        .file_name()
        .ok_or_else(|| std::io::Error::other("rejected path has no file name"))?;
    let mut destination = target_dir.join(base);
    if destination.exists() {
        destination = timestamped_destination(target_dir, Path::new(base));
    }

    fs::rename(path, &destination)?;
    info!(
        path = %path.display(),
        destination = %destination.display(),
        "rejected file moved"
    );
    Ok(())
}

/// Disambiguate a colliding destination by inserting `_<unix-timestamp>`
/// before the extension; the existing file is never overwritten.
fn timestamped_destination(target_dir: &Path, base: &Path) -> PathBuf {
    let stem = base
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let timestamp = chrono::Utc::now().timestamp();
    match base.extension() {
        Some(ext) => target_dir.join(format!("{stem}_{timestamp}.{}", ext.to_string_lossy())),
        None => target_dir.join(format!("{stem}_{timestamp}")),
    }
}
