//! # Vigil Core
//!
//! Watch supervision and media validation pipeline. The supervisor runs one
//! isolated worker per configured directory watch; each worker classifies
//! raw filesystem notifications against include/exclude globs, probes media
//! metadata for tracked files, evaluates the configured accept/reject rules,
//! enforces policy on rejected files (delete or relocate), and appends every
//! decision to the event sink.
//!
//! ## Architecture
//!
//! - [`fs_watch`]: native change notifications for one watch root
//! - [`classify`]: include/exclude gating and auto-purge routing
//! - [`probe`] / [`extract`]: media probing behind a narrow trait, flat
//!   metadata maps built from per-category field allow-lists
//! - [`validate`]: ordered rule evaluation with reject polarity
//! - [`reject`]: policy enforcement with collision-safe relocation
//! - [`supervisor`]: worker lifecycle, graceful-then-forced shutdown
//! - [`recorder`]: the append-only event sink seam
//!
//! ## Feature Flags
//!
//! - `ffmpeg` (default): enables the FFmpeg-backed [`probe::FfmpegProbe`];
//!   without it, supply your own [`probe::MediaProbe`] implementation.
//!
//! ## Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use vigil_core::probe::FfmpegProbe;
//! use vigil_core::recorder::JsonlEventRecorder;
//! use vigil_core::supervisor::WatcherSupervisor;
//! use vigil_model::{WatchId, WatcherConfig};
//!
//! # async fn run() -> vigil_core::Result<()> {
//! let recorder = Arc::new(JsonlEventRecorder::new("/var/log/vigil/events.jsonl"));
//! let probe = Arc::new(FfmpegProbe::new()?);
//! let supervisor = WatcherSupervisor::new(recorder, probe);
//!
//! let started = supervisor
//!     .start(WatchId(1), "/srv/incoming", WatcherConfig::default(), None)
//!     .await;
//! assert!(started);
//!
//! supervisor.shutdown_all().await;
//! # Ok(())
//! # }
//! ```

#![cfg_attr(docsrs, feature(doc_cfg))]

/// Include/exclude classification and event gating
pub mod classify;
/// Crate error type and `Result` alias
pub mod error;
/// Metadata map construction from probe results
pub mod extract;
/// Native filesystem subscription per watch root
pub mod fs_watch;
/// Media probing seam and the FFmpeg-backed implementation
pub mod probe;
/// Append-only event sink contract and bundled implementations
pub mod recorder;
/// Enforcement of delete/move policy on rejected files
pub mod reject;
/// Worker lifecycle: start, stop, status, bulk shutdown
pub mod supervisor;
/// Ordered rule evaluation against extracted metadata
pub mod validate;

mod pipeline;

pub use error::{Result, WatchError};
pub use recorder::EventRecorder;
pub use supervisor::WatcherSupervisor;
