use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identifier of a watch definition, assigned by the configuration source.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct WatchId(pub i64);

impl fmt::Display for WatchId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<i64> for WatchId {
    fn from(id: i64) -> Self {
        WatchId(id)
    }
}

/// Kind of a raw filesystem notification, before classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FsEventKind {
    Created,
    Modified,
    Deleted,
}

/// Kind stamped on a recorded event. `Rejected` only ever appears after the
/// rejection handler has run; it is never produced by the monitor itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordedEventKind {
    Created,
    Modified,
    Deleted,
    Rejected,
}

impl From<FsEventKind> for RecordedEventKind {
    fn from(kind: FsEventKind) -> Self {
        match kind {
            FsEventKind::Created => RecordedEventKind::Created,
            FsEventKind::Modified => RecordedEventKind::Modified,
            FsEventKind::Deleted => RecordedEventKind::Deleted,
        }
    }
}

/// Scalar value of one extracted metadata field.
///
/// Numeric track properties all surface as `f64`; the probing layer does not
/// distinguish integer widths.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Number(f64),
    Text(String),
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Number(n) => n.fmt(f),
            FieldValue::Text(s) => s.fmt(f),
        }
    }
}

impl From<f64> for FieldValue {
    fn from(n: f64) -> Self {
        FieldValue::Number(n)
    }
}

impl From<&str> for FieldValue {
    fn from(s: &str) -> Self {
        FieldValue::Text(s.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(s: String) -> Self {
        FieldValue::Text(s)
    }
}

/// Right-hand side of a validation rule: a scalar threshold or, for the
/// membership operators, a sequence of scalars.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RuleValue {
    Number(f64),
    Text(String),
    Many(Vec<FieldValue>),
}

/// Flat map of extracted metadata, keyed `category_field`
/// (e.g. `video_height`, `general_duration`, `custom_writing_library`).
pub type MetadataMap = BTreeMap<String, FieldValue>;

/// Diagnostic entry for a rule that did not pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FailedRule {
    pub field: String,
    pub operator: crate::config::RuleOperator,
    pub expected_value: RuleValue,
    /// Field value after duration normalization and type alignment.
    pub actual_value: FieldValue,
    pub action: crate::config::RuleAction,
    pub description: Option<String>,
}

/// Outcome of evaluating the configured rule list against one metadata map.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationVerdict {
    pub valid: bool,
    /// Fields of every rule whose field was present in the metadata, in
    /// evaluation order. A rule skipped later (failed type alignment) still
    /// appears here.
    pub rules_checked: Vec<String>,
    pub failed_rules: Vec<FailedRule>,
}

/// Side-channel payload on the synthetic record emitted when a newly created
/// excluded file is purged before entering the pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AutoDeleteNotice {
    pub reason: String,
    pub auto_deleted: bool,
}

impl AutoDeleteNotice {
    /// The one reason the classifier currently emits.
    pub fn excluded() -> Self {
        Self {
            reason: "excluded_auto_delete".to_string(),
            auto_deleted: true,
        }
    }
}

/// Structured detail attached to a record: either the validation verdict for
/// a tracked media file, or the auto-delete notice for a purged one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EventDetail {
    Validation(ValidationVerdict),
    AutoDelete(AutoDeleteNotice),
}

/// Finished event envelope appended to the external event sink. Owned by the
/// sink once appended; the pipeline never mutates or deletes records.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventRecord {
    pub id: Uuid,
    pub watcher_id: WatchId,
    pub kind: RecordedEventKind,
    pub path: PathBuf,
    pub metadata: Option<MetadataMap>,
    pub detail: Option<EventDetail>,
    pub occurred_at: DateTime<Utc>,
}

impl EventRecord {
    /// Build a record with a fresh id, stamped now.
    pub fn new(watcher_id: WatchId, kind: RecordedEventKind, path: PathBuf) -> Self {
        Self {
            id: Uuid::new_v4(),
            watcher_id,
            kind,
            path,
            metadata: None,
            detail: None,
            occurred_at: Utc::now(),
        }
    }
}
