//! Native filesystem subscription for one watch root.
//!
//! A thin wrapper around `notify` that converts raw backend notifications
//! into [`RawFsEvent`]s and feeds them over a bounded channel into the watch
//! worker. Directory events are discarded here, as are access, rename and
//! other notification kinds outside the created/modified/deleted contract.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use notify::event::{CreateKind, EventKind, ModifyKind, RemoveKind};
use notify::{Config as NotifyConfig, Event, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tracing::warn;
use vigil_model::FsEventKind;

use crate::error::Result;

/// One file-level filesystem notification, before classification.
#[derive(Debug, Clone, PartialEq)]
pub struct RawFsEvent {
    pub kind: FsEventKind,
    pub path: PathBuf,
    pub occurred_at: DateTime<Utc>,
}

/// Live subscription to change notifications under a root path.
///
/// Dropping the monitor unsubscribes the OS watch; the worker keeps it alive
/// for exactly as long as the watch runs, so no handles are abandoned.
pub struct PathMonitor {
    _watcher: RecommendedWatcher,
}

impl std::fmt::Debug for PathMonitor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PathMonitor").finish_non_exhaustive()
    }
}

impl PathMonitor {
    /// Subscribe to notifications under `root`.
    ///
    /// Fails when the OS subscription cannot be established; once running,
    /// backend errors are logged and the subscription is assumed healthy
    /// until the monitor is dropped.
    pub fn subscribe(
        root: &Path,
        recursive: bool,
        tx: mpsc::Sender<RawFsEvent>,
    ) -> Result<Self> {
        let mut watcher = RecommendedWatcher::new(
            move |result: std::result::Result<Event, notify::Error>| match result {
                Ok(event) => {
                    if let Some(raw) = convert_event(event) {
                        // Send failure means the worker is shutting down.
                        let _ = tx.blocking_send(raw);
                    }
                }
                Err(error) => warn!(%error, "watch backend error"),
            },
            NotifyConfig::default(),
        )?;

        let mode = if recursive {
            RecursiveMode::Recursive
        } else {
            RecursiveMode::NonRecursive
        };
        watcher.watch(root, mode)?;

        Ok(Self { _watcher: watcher })
    }
}

/// Map a backend notification onto the created/modified/deleted contract.
///
/// Returns `None` for directory events, access/other noise, and rename
/// notifications.
fn convert_event(event: Event) -> Option<RawFsEvent> {
    let path = event.paths.first()?.clone();

    let kind = match event.kind {
        EventKind::Create(CreateKind::Folder) | EventKind::Remove(RemoveKind::Folder) => {
            return None;
        }
        EventKind::Create(_) => FsEventKind::Created,
        EventKind::Modify(ModifyKind::Name(_)) => return None,
        EventKind::Modify(_) => FsEventKind::Modified,
        EventKind::Remove(_) => FsEventKind::Deleted,
        EventKind::Access(_) | EventKind::Any | EventKind::Other => return None,
    };

    // Backends that only report Create(Any)/Modify(Any) need the path probed
    // to keep directory events out. Deletions cannot be probed; the kind
    // match above already dropped the folder-specific ones.
    if kind != FsEventKind::Deleted && path.is_dir() {
        return None;
    }

    Some(RawFsEvent {
        kind,
        path,
        occurred_at: Utc::now(),
    })
}
