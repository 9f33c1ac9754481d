//! Lifecycle management for watch workers.
//!
//! The supervisor owns the registry of running workers, one isolated tokio
//! task per watch id. Registry mutations are serialized through its lock;
//! the bounded termination waits happen outside it so a slow teardown never
//! stalls control calls for other watches.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use tokio::sync::{RwLock, mpsc, watch};
use tokio::task::{JoinHandle, spawn_blocking};
use tokio::time::{Duration, timeout};
use tracing::{debug, error, info, warn};
use vigil_model::{VideoMetadataConfig, WatchId, WatcherConfig};

use crate::classify::EventClassifier;
use crate::extract::MetadataExtractor;
use crate::fs_watch::PathMonitor;
use crate::pipeline::{self, WorkerContext};
use crate::probe::MediaProbe;
use crate::recorder::EventRecorder;

/// Bound on raw events buffered between the OS subscription and the worker.
const EVENT_CHANNEL_CAPACITY: usize = 1024;

/// How long a worker gets to wind down after the graceful stop signal.
const GRACEFUL_STOP_TIMEOUT: Duration = Duration::from_secs(5);
/// How long a forced abort is given before the stop is fire-and-forgotten.
const FORCED_STOP_TIMEOUT: Duration = Duration::from_secs(2);

struct WorkerHandle {
    shutdown: watch::Sender<bool>,
    task: JoinHandle<()>,
}

/// Starts, stops and tracks one monitoring worker per watch id.
///
/// At most one live worker exists per id at any instant; a dead worker whose
/// handle is still registered neither blocks a restart nor counts as alive
/// in [`status`](WatcherSupervisor::status).
pub struct WatcherSupervisor {
    recorder: Arc<dyn EventRecorder>,
    probe: Arc<dyn MediaProbe>,
    watchers: Arc<RwLock<HashMap<WatchId, WorkerHandle>>>,
}

impl std::fmt::Debug for WatcherSupervisor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WatcherSupervisor").finish_non_exhaustive()
    }
}

impl WatcherSupervisor {
    pub fn new(recorder: Arc<dyn EventRecorder>, probe: Arc<dyn MediaProbe>) -> Self {
        Self {
            recorder,
            probe,
            watchers: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Start a worker for `id` watching `root`.
    ///
    /// Returns `false` without side effects when a live worker for `id` is
    /// already registered, when `root` does not exist, or when the OS
    /// subscription cannot be established.
    pub async fn start(
        &self,
        id: WatchId,
        root: impl AsRef<Path>,
        config: WatcherConfig,
        video_config: Option<VideoMetadataConfig>,
    ) -> bool {
        let root = root.as_ref().to_path_buf();

        {
            let guard = self.watchers.read().await;
            if let Some(handle) = guard.get(&id) {
                if !handle.task.is_finished() {
                    debug!(%id, "watch already running");
                    return false;
                }
            }
        }

        if !root.exists() {
            warn!(%id, path = %root.display(), "watch path does not exist");
            return false;
        }

        let classifier = match EventClassifier::new(&config) {
            Ok(classifier) => classifier,
            Err(error) => {
                error!(%id, %error, "invalid watch patterns");
                return false;
            }
        };

        let (raw_tx, raw_rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
        let monitor_root = root.clone();
        let recursive = config.recursive;
        let subscription =
            spawn_blocking(move || PathMonitor::subscribe(&monitor_root, recursive, raw_tx)).await;
        let monitor = match subscription {
            Ok(Ok(monitor)) => monitor,
            Ok(Err(error)) => {
                error!(%id, path = %root.display(), %error, "failed to subscribe watch");
                return false;
            }
            Err(join_error) => {
                error!(%id, %join_error, "watch subscription panicked");
                return false;
            }
        };

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let context = WorkerContext {
            watcher_id: id,
            classifier,
            extractor: MetadataExtractor::new(Arc::clone(&self.probe)),
            video_config,
            recorder: Arc::clone(&self.recorder),
        };
        let task = pipeline::spawn_worker(context, monitor, raw_rx, shutdown_rx);

        let mut guard = self.watchers.write().await;
        if let Some(existing) = guard.get(&id) {
            if !existing.task.is_finished() {
                // Lost the race against a concurrent start for the same id.
                task.abort();
                debug!(%id, "watch already running");
                return false;
            }
        }
        guard.insert(
            id,
            WorkerHandle {
                shutdown: shutdown_tx,
                task,
            },
        );

        info!(%id, path = %root.display(), "watch started");
        true
    }

    /// Stop the worker for `id`: graceful shutdown signal first, forced
    /// abort once the bounded wait expires.
    ///
    /// Returns `true` whenever a handle existed, whether or not the forced
    /// kill was confirmed; the handle is deregistered unconditionally.
    pub async fn stop(&self, id: WatchId) -> bool {
        let handle = self.watchers.write().await.remove(&id);
        let Some(handle) = handle else {
            debug!(%id, "stop requested for unknown watch");
            return false;
        };

        terminate(id, handle).await;
        true
    }

    /// Liveness snapshot over every registered handle, including workers
    /// that have exited without being reaped yet.
    pub async fn status(&self) -> HashMap<WatchId, bool> {
        self.watchers
            .read()
            .await
            .iter()
            .map(|(id, handle)| (*id, !handle.task.is_finished()))
            .collect()
    }

    /// Stop and deregister every watch; used at process shutdown.
    pub async fn shutdown_all(&self) {
        let handles: Vec<(WatchId, WorkerHandle)> =
            self.watchers.write().await.drain().collect();
        for (id, handle) in handles {
            terminate(id, handle).await;
        }
    }
}

async fn terminate(id: WatchId, handle: WorkerHandle) {
    let WorkerHandle { shutdown, mut task } = handle;

    // Graceful first: the worker breaks out of its event loop and drops the
    // monitor, unsubscribing the OS watch.
    let _ = shutdown.send(true);
    if timeout(GRACEFUL_STOP_TIMEOUT, &mut task).await.is_err() {
        warn!(%id, "watch did not stop gracefully, aborting");
        task.abort();
        // Fire-and-forget: the handle is already gone from the registry.
        let _ = timeout(FORCED_STOP_TIMEOUT, &mut task).await;
    }
    info!(%id, "watch stopped");
}
