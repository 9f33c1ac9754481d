//! End-to-end pipeline behaviour through the public supervisor API, with the
//! media probe stubbed out.

use std::fs::File;
use std::io::Write;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use tempfile::tempdir;
use tokio::time::{sleep, timeout};

use vigil_core::error::Result;
use vigil_core::probe::{GeneralTrack, MediaProbe, MediaTracks, VideoTrack};
use vigil_core::recorder::MemoryEventRecorder;
use vigil_core::supervisor::WatcherSupervisor;
use vigil_model::{
    EventDetail, EventRecord, FieldValue, RecordedEventKind, RuleAction, RuleOperator, RuleValue,
    ValidationRule, VideoMetadataConfig, WatchId, WatcherConfig,
};

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_test_writer()
        .try_init();
}

/// Probe that reports no track information for any file.
struct NoTracksProbe;

impl MediaProbe for NoTracksProbe {
    fn probe(&self, _path: &Path) -> Result<Option<MediaTracks>> {
        Ok(None)
    }
}

/// Probe that reports a fixed 480p video track for every file.
struct LowResProbe;

impl MediaProbe for LowResProbe {
    fn probe(&self, _path: &Path) -> Result<Option<MediaTracks>> {
        Ok(Some(MediaTracks {
            general: GeneralTrack {
                format_name: Some("matroska".to_string()),
                duration: Some(45000.0),
                ..GeneralTrack::default()
            },
            video: vec![VideoTrack {
                width: Some(640),
                height: Some(480),
                codec_name: Some("h264".to_string()),
                ..VideoTrack::default()
            }],
            audio: Vec::new(),
        }))
    }
}

fn supervisor_with(
    probe: Arc<dyn MediaProbe>,
) -> (WatcherSupervisor, Arc<MemoryEventRecorder>) {
    init_tracing();
    let recorder = Arc::new(MemoryEventRecorder::new());
    let supervisor = WatcherSupervisor::new(recorder.clone(), probe);
    (supervisor, recorder)
}

async fn wait_for_record(
    recorder: &MemoryEventRecorder,
    predicate: impl Fn(&EventRecord) -> bool,
) -> EventRecord {
    timeout(Duration::from_secs(10), async {
        loop {
            if let Some(record) = recorder.records().await.into_iter().find(&predicate) {
                return record;
            }
            sleep(Duration::from_millis(50)).await;
        }
    })
    .await
    .expect("expected record within timeout")
}

#[tokio::test(flavor = "multi_thread")]
async fn start_is_idempotent_while_worker_is_alive() {
    let tmp = tempdir().unwrap();
    let (supervisor, _recorder) = supervisor_with(Arc::new(NoTracksProbe));
    let id = WatchId(1);

    assert!(
        supervisor
            .start(id, tmp.path(), WatcherConfig::default(), None)
            .await
    );
    assert!(
        !supervisor
            .start(id, tmp.path(), WatcherConfig::default(), None)
            .await
    );

    let status = supervisor.status().await;
    assert_eq!(status.get(&id), Some(&true));

    supervisor.shutdown_all().await;
}

#[tokio::test(flavor = "multi_thread")]
async fn start_refuses_a_missing_path() {
    let (supervisor, _recorder) = supervisor_with(Arc::new(NoTracksProbe));
    assert!(
        !supervisor
            .start(
                WatchId(1),
                "/no/such/directory",
                WatcherConfig::default(),
                None
            )
            .await
    );
    assert!(supervisor.status().await.is_empty());
}

#[tokio::test(flavor = "multi_thread")]
async fn stop_unknown_id_returns_false() {
    let tmp = tempdir().unwrap();
    let (supervisor, _recorder) = supervisor_with(Arc::new(NoTracksProbe));

    assert!(
        supervisor
            .start(WatchId(1), tmp.path(), WatcherConfig::default(), None)
            .await
    );
    assert!(!supervisor.stop(WatchId(99)).await);

    // The running watch is unaffected.
    let status = supervisor.status().await;
    assert_eq!(status.get(&WatchId(1)), Some(&true));

    supervisor.shutdown_all().await;
}

#[tokio::test(flavor = "multi_thread")]
async fn stop_deregisters_and_allows_restart() {
    let tmp = tempdir().unwrap();
    let (supervisor, _recorder) = supervisor_with(Arc::new(NoTracksProbe));
    let id = WatchId(7);

    assert!(
        supervisor
            .start(id, tmp.path(), WatcherConfig::default(), None)
            .await
    );
    assert!(supervisor.stop(id).await);
    assert!(supervisor.status().await.is_empty());

    assert!(
        supervisor
            .start(id, tmp.path(), WatcherConfig::default(), None)
            .await
    );
    supervisor.shutdown_all().await;
    assert!(supervisor.status().await.is_empty());
}

#[tokio::test(flavor = "multi_thread")]
async fn excluded_creation_is_auto_deleted_with_one_synthetic_record() {
    let tmp = tempdir().unwrap();
    let (supervisor, recorder) = supervisor_with(Arc::new(NoTracksProbe));
    let id = WatchId(2);

    let config = WatcherConfig {
        include_patterns: vec!["*.mkv".to_string()],
        ..WatcherConfig::default()
    };
    assert!(supervisor.start(id, tmp.path(), config, None).await);
    sleep(Duration::from_millis(250)).await;

    let excluded = tmp.path().join("junk.tmp");
    File::create(&excluded).unwrap();

    let record = wait_for_record(&recorder, |record| {
        record.kind == RecordedEventKind::Deleted && record.path.ends_with("junk.tmp")
    })
    .await;

    assert!(!excluded.exists());
    assert!(record.metadata.is_none());
    let Some(EventDetail::AutoDelete(notice)) = record.detail else {
        panic!("expected auto-delete detail");
    };
    assert_eq!(notice.reason, "excluded_auto_delete");
    assert!(notice.auto_deleted);

    supervisor.shutdown_all().await;

    // No created record was ever emitted for the purged file.
    let created = recorder
        .records()
        .await
        .into_iter()
        .any(|record| record.kind == RecordedEventKind::Created);
    assert!(!created);
}

#[tokio::test(flavor = "multi_thread")]
async fn invalid_media_file_is_rejected_and_deleted() {
    let tmp = tempdir().unwrap();
    let (supervisor, recorder) = supervisor_with(Arc::new(LowResProbe));
    let id = WatchId(3);

    let video_config = VideoMetadataConfig {
        extract_video_metadata: true,
        enable_validation: true,
        validation_rules: vec![ValidationRule {
            field: "video_height".to_string(),
            operator: RuleOperator::Lt,
            value: RuleValue::Number(720.0),
            action: RuleAction::Reject,
            description: Some("reject sub-720p files".to_string()),
        }],
        ..VideoMetadataConfig::default()
    };
    assert!(
        supervisor
            .start(id, tmp.path(), WatcherConfig::default(), Some(video_config))
            .await
    );
    sleep(Duration::from_millis(250)).await;

    let clip = tmp.path().join("clip.mp4");
    let mut file = File::create(&clip).unwrap();
    file.write_all(b"not really a video").unwrap();
    drop(file);

    let record = wait_for_record(&recorder, |record| {
        record.kind == RecordedEventKind::Rejected
    })
    .await;

    assert!(!clip.exists());
    let metadata = record.metadata.expect("metadata on rejected record");
    assert_eq!(
        metadata.get("video_height"),
        Some(&FieldValue::Number(480.0))
    );
    let Some(EventDetail::Validation(verdict)) = record.detail else {
        panic!("expected validation detail");
    };
    assert!(!verdict.valid);
    assert_eq!(verdict.failed_rules.len(), 1);
    assert_eq!(verdict.failed_rules[0].field, "video_height");

    supervisor.shutdown_all().await;
}

#[tokio::test(flavor = "multi_thread")]
async fn tracked_file_without_validation_records_plain_created() {
    let tmp = tempdir().unwrap();
    let (supervisor, recorder) = supervisor_with(Arc::new(LowResProbe));
    let id = WatchId(4);

    // Extraction on, validation off: metadata is recorded, nothing enforced.
    let video_config = VideoMetadataConfig {
        extract_video_metadata: true,
        ..VideoMetadataConfig::default()
    };
    assert!(
        supervisor
            .start(id, tmp.path(), WatcherConfig::default(), Some(video_config))
            .await
    );
    sleep(Duration::from_millis(250)).await;

    let clip = tmp.path().join("keeper.mkv");
    File::create(&clip).unwrap();

    let record = wait_for_record(&recorder, |record| {
        record.kind == RecordedEventKind::Created && record.path.ends_with("keeper.mkv")
    })
    .await;

    assert!(clip.exists());
    assert!(record.metadata.is_some());
    assert!(record.detail.is_none());

    supervisor.shutdown_all().await;
}
