//! # Vigil Model
//!
//! Shared data types for the Vigil watch supervisor: per-watch filesystem
//! configuration, media validation rules, extracted metadata values, and the
//! event records appended to the external event sink.
//!
//! Everything here is plain data with `serde` derives. Field names and enum
//! spellings are wire-compatible with the JSON the configuration collaborator
//! stores, so configs and records round-trip without adapter glue.

/// Watch and validation configuration supplied by the configuration source.
pub mod config;
/// Event kinds, metadata values, verdicts, and the recorded event envelope.
pub mod event;

pub use config::{
    RejectHandling, RuleAction, RuleOperator, ValidationRule, VideoMetadataConfig, WatcherConfig,
};
pub use event::{
    AutoDeleteNotice, EventDetail, EventRecord, FailedRule, FieldValue, FsEventKind, MetadataMap,
    RecordedEventKind, RuleValue, ValidationVerdict, WatchId,
};
