use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::event::{FsEventKind, RuleValue};

/// Filesystem-side configuration of a single watch.
///
/// Immutable for the life of a running worker; applying a changed config
/// requires stopping and restarting the watch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WatcherConfig {
    /// Watch the whole subtree rather than just the root directory.
    #[serde(default = "WatcherConfig::default_recursive")]
    pub recursive: bool,
    /// Glob patterns matched against file base names. A file is tracked only
    /// if at least one include pattern matches.
    #[serde(default = "WatcherConfig::default_include_patterns")]
    pub include_patterns: Vec<String>,
    /// Exclude patterns take precedence over includes.
    #[serde(default)]
    pub exclude_patterns: Vec<String>,
    /// Raw event kinds this watch reacts to. Everything else is dropped
    /// before classification.
    #[serde(default = "WatcherConfig::default_event_types")]
    pub event_types: Vec<FsEventKind>,
    /// Purge newly created files that fail the include/exclude filter.
    #[serde(default = "WatcherConfig::default_auto_delete_excluded")]
    pub auto_delete_excluded: bool,
}

impl WatcherConfig {
    fn default_recursive() -> bool {
        true
    }

    fn default_include_patterns() -> Vec<String> {
        vec!["*".to_string()]
    }

    fn default_event_types() -> Vec<FsEventKind> {
        vec![
            FsEventKind::Created,
            FsEventKind::Modified,
            FsEventKind::Deleted,
        ]
    }

    fn default_auto_delete_excluded() -> bool {
        true
    }
}

impl Default for WatcherConfig {
    fn default() -> Self {
        Self {
            recursive: Self::default_recursive(),
            include_patterns: Self::default_include_patterns(),
            exclude_patterns: Vec::new(),
            event_types: Self::default_event_types(),
            auto_delete_excluded: Self::default_auto_delete_excluded(),
        }
    }
}

/// Comparison applied between an extracted field value and a rule threshold.
///
/// Serialized with the operator spellings the configuration source stores.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RuleOperator {
    #[serde(rename = ">")]
    Gt,
    #[serde(rename = "<")]
    Lt,
    #[serde(rename = ">=")]
    Ge,
    #[serde(rename = "<=")]
    Le,
    #[serde(rename = "==")]
    Eq,
    #[serde(rename = "!=")]
    Ne,
    #[serde(rename = "in")]
    In,
    #[serde(rename = "not_in")]
    NotIn,
}

/// Polarity of a rule: `Reject` rules fail when their condition holds,
/// `Accept` rules fail when it does not.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleAction {
    Accept,
    Reject,
}

impl Default for RuleAction {
    fn default() -> Self {
        RuleAction::Reject
    }
}

/// One entry of the ordered rule list. List order is evaluation order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationRule {
    /// Metadata key the rule applies to, e.g. `video_height`.
    pub field: String,
    pub operator: RuleOperator,
    pub value: RuleValue,
    #[serde(default)]
    pub action: RuleAction,
    #[serde(default)]
    pub description: Option<String>,
}

/// What to do with a file whose verdict came back invalid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectHandling {
    Delete,
    Move,
}

impl Default for RejectHandling {
    fn default() -> Self {
        RejectHandling::Delete
    }
}

/// Metadata extraction and validation configuration of a watch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoMetadataConfig {
    #[serde(default)]
    pub extract_video_metadata: bool,
    /// General-track fields to extract, keyed `general_<field>` in the map.
    #[serde(default = "VideoMetadataConfig::default_general_fields")]
    pub general_fields: Vec<String>,
    #[serde(default = "VideoMetadataConfig::default_video_fields")]
    pub video_fields: Vec<String>,
    #[serde(default = "VideoMetadataConfig::default_audio_fields")]
    pub audio_fields: Vec<String>,
    /// Fields looked up across all tracks, first non-null value wins,
    /// keyed `custom_<field>`.
    #[serde(default)]
    pub custom_fields: Vec<String>,
    #[serde(default)]
    pub enable_validation: bool,
    /// Evaluated in order; order is significant.
    #[serde(default)]
    pub validation_rules: Vec<ValidationRule>,
    #[serde(default)]
    pub reject_handling: RejectHandling,
    /// Target directory for `RejectHandling::Move`. Without one, a move
    /// request degrades to deletion.
    #[serde(default)]
    pub reject_move_to_dir: Option<PathBuf>,
}

impl VideoMetadataConfig {
    fn default_general_fields() -> Vec<String> {
        ["format_name", "file_size", "duration", "overall_bit_rate"]
            .map(String::from)
            .to_vec()
    }

    fn default_video_fields() -> Vec<String> {
        [
            "width",
            "height",
            "codec_name",
            "bit_rate",
            "frame_rate",
            "duration",
            "display_aspect_ratio",
            "pixel_aspect_ratio",
        ]
        .map(String::from)
        .to_vec()
    }

    fn default_audio_fields() -> Vec<String> {
        ["codec_name", "channels", "sample_rate", "bit_rate"]
            .map(String::from)
            .to_vec()
    }
}

impl Default for VideoMetadataConfig {
    fn default() -> Self {
        Self {
            extract_video_metadata: false,
            general_fields: Self::default_general_fields(),
            video_fields: Self::default_video_fields(),
            audio_fields: Self::default_audio_fields(),
            custom_fields: Vec::new(),
            enable_validation: false,
            validation_rules: Vec::new(),
            reject_handling: RejectHandling::default(),
            reject_move_to_dir: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn watcher_config_defaults_from_empty_object() {
        let config: WatcherConfig = serde_json::from_str("{}").unwrap();
        assert!(config.recursive);
        assert_eq!(config.include_patterns, vec!["*".to_string()]);
        assert!(config.exclude_patterns.is_empty());
        assert_eq!(config.event_types.len(), 3);
        assert!(config.auto_delete_excluded);
    }

    #[test]
    fn rule_operators_use_wire_spellings() {
        let json = r#"{
            "field": "video_height",
            "operator": "<",
            "value": 720,
            "action": "reject",
            "description": "reject sub-720p files"
        }"#;
        let rule: ValidationRule = serde_json::from_str(json).unwrap();
        assert_eq!(rule.operator, RuleOperator::Lt);
        assert_eq!(rule.value, RuleValue::Number(720.0));
        assert_eq!(rule.action, RuleAction::Reject);

        let not_in: RuleOperator = serde_json::from_str("\"not_in\"").unwrap();
        assert_eq!(not_in, RuleOperator::NotIn);
    }

    #[test]
    fn rule_action_defaults_to_reject() {
        let json = r#"{"field": "video_width", "operator": ">=", "value": 1280}"#;
        let rule: ValidationRule = serde_json::from_str(json).unwrap();
        assert_eq!(rule.action, RuleAction::Reject);
    }

    #[test]
    fn unknown_operator_is_rejected_at_the_boundary() {
        let json = r#"{"field": "video_width", "operator": "~=", "value": 1}"#;
        assert!(serde_json::from_str::<ValidationRule>(json).is_err());
    }

    #[test]
    fn video_config_carries_default_allow_lists() {
        let config: VideoMetadataConfig = serde_json::from_str("{}").unwrap();
        assert!(!config.extract_video_metadata);
        assert!(config.general_fields.contains(&"file_size".to_string()));
        assert!(config.video_fields.contains(&"height".to_string()));
        assert!(config.audio_fields.contains(&"channels".to_string()));
        assert!(config.custom_fields.is_empty());
        assert_eq!(config.reject_handling, RejectHandling::Delete);
    }
}
