//! Per-watch worker: the wired-together pipeline.
//!
//! One tokio task per watch, looping over the raw-event channel until the
//! shutdown signal fires or the monitor goes away. Events for a watch are
//! processed strictly in arrival order, one at a time; every stage fault is
//! contained and logged so one bad file never halts the watch.

use std::path::Path;
use std::sync::Arc;

use tokio::sync::{mpsc, watch};
use tokio::task::{JoinHandle, spawn_blocking};
use tracing::{debug, info, warn};
use vigil_model::{
    AutoDeleteNotice, EventDetail, EventRecord, FsEventKind, MetadataMap, RecordedEventKind,
    VideoMetadataConfig, WatchId,
};

use crate::classify::{EventClassifier, GateDecision};
use crate::extract::MetadataExtractor;
use crate::fs_watch::{PathMonitor, RawFsEvent};
use crate::recorder::EventRecorder;
use crate::{reject, validate};

/// Everything a worker needs besides its channels.
pub(crate) struct WorkerContext {
    pub watcher_id: WatchId,
    pub classifier: EventClassifier,
    pub extractor: MetadataExtractor,
    pub video_config: Option<VideoMetadataConfig>,
    pub recorder: Arc<dyn EventRecorder>,
}

/// Spawn the worker task for one watch.
///
/// The task owns the monitor: dropping it on exit is what unsubscribes the
/// OS watch.
pub(crate) fn spawn_worker(
    ctx: WorkerContext,
    monitor: PathMonitor,
    mut rx: mpsc::Receiver<RawFsEvent>,
    mut shutdown: watch::Receiver<bool>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let _monitor = monitor;
        loop {
            tokio::select! {
                _ = shutdown.changed() => break,
                raw = rx.recv() => {
                    let Some(raw) = raw else { break };
                    process_event(&ctx, raw).await;
                }
            }
        }
        debug!(watcher_id = %ctx.watcher_id, "watch worker exited");
    })
}

async fn process_event(ctx: &WorkerContext, raw: RawFsEvent) {
    match ctx.classifier.gate(raw.kind, &raw.path) {
        GateDecision::Ignore => {}
        GateDecision::AutoDelete => auto_delete(ctx, raw).await,
        GateDecision::Track => track(ctx, raw).await,
    }
}

/// Purge a newly created excluded file and record the synthetic deletion.
/// The original created event is never itself recorded.
async fn auto_delete(ctx: &WorkerContext, raw: RawFsEvent) {
    if let Err(error) = std::fs::remove_file(&raw.path) {
        warn!(
            watcher_id = %ctx.watcher_id,
            path = %raw.path.display(),
            %error,
            "failed to delete excluded file"
        );
        return;
    }
    info!(
        watcher_id = %ctx.watcher_id,
        path = %raw.path.display(),
        "excluded file deleted"
    );

    let mut record = EventRecord::new(ctx.watcher_id, RecordedEventKind::Deleted, raw.path);
    record.occurred_at = raw.occurred_at;
    record.detail = Some(EventDetail::AutoDelete(AutoDeleteNotice::excluded()));
    append(ctx, record).await;
}

async fn track(ctx: &WorkerContext, raw: RawFsEvent) {
    let mut kind = RecordedEventKind::from(raw.kind);
    let mut metadata = None;
    let mut detail = None;

    if matches!(raw.kind, FsEventKind::Created | FsEventKind::Modified) {
        if let Some(config) = &ctx.video_config {
            metadata = extract_contained(ctx, &raw.path, config).await;

            if let Some(map) = &metadata {
                if config.enable_validation && !config.validation_rules.is_empty() {
                    let verdict = validate::evaluate(map, &config.validation_rules);
                    if !verdict.valid {
                        warn!(
                            watcher_id = %ctx.watcher_id,
                            path = %raw.path.display(),
                            failed = verdict.failed_rules.len(),
                            "validation failed"
                        );
                        kind = reject::enforce(&raw.path, config);
                    }
                    detail = Some(EventDetail::Validation(verdict));
                }
            }
        }
    }

    let mut record = EventRecord::new(ctx.watcher_id, kind, raw.path);
    record.occurred_at = raw.occurred_at;
    record.metadata = metadata;
    record.detail = detail;
    append(ctx, record).await;
}

/// Run extraction off the worker thread and contain panics: a probe that
/// blows up costs this event its metadata, nothing more.
async fn extract_contained(
    ctx: &WorkerContext,
    path: &Path,
    config: &VideoMetadataConfig,
) -> Option<MetadataMap> {
    let extractor = ctx.extractor.clone();
    let config = config.clone();
    let path = path.to_path_buf();
    match spawn_blocking(move || extractor.extract(&path, &config)).await {
        Ok(metadata) => metadata,
        Err(error) => {
            warn!(watcher_id = %ctx.watcher_id, %error, "metadata extraction panicked");
            None
        }
    }
}

/// Best-effort append: a sink failure is logged and the record dropped.
async fn append(ctx: &WorkerContext, record: EventRecord) {
    if let Err(error) = ctx.recorder.append(record).await {
        warn!(watcher_id = %ctx.watcher_id, %error, "failed to record event");
    }
}
