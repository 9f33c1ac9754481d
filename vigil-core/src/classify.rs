//! Include/exclude classification of raw filesystem events.
//!
//! Patterns are globs matched against the file's base name only, never the
//! full path. Excludes win over includes, and a file matching neither list is
//! not tracked.

use std::path::Path;

use globset::{Glob, GlobSet, GlobSetBuilder};
use vigil_model::{FsEventKind, WatcherConfig};

use crate::error::Result;

/// What the pipeline should do with one raw event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateDecision {
    /// Drop silently; nothing is recorded.
    Ignore,
    /// Newly created file failed the filter and auto-purge is on: delete it
    /// and record a synthetic deletion.
    AutoDelete,
    /// Continue into extraction and validation.
    Track,
}

/// Compiled per-watch filter, built once at worker start.
#[derive(Debug)]
pub struct EventClassifier {
    includes: GlobSet,
    excludes: GlobSet,
    event_types: Vec<FsEventKind>,
    auto_delete_excluded: bool,
}

impl EventClassifier {
    pub fn new(config: &WatcherConfig) -> Result<Self> {
        Ok(Self {
            includes: compile_patterns(&config.include_patterns)?,
            excludes: compile_patterns(&config.exclude_patterns)?,
            event_types: config.event_types.clone(),
            auto_delete_excluded: config.auto_delete_excluded,
        })
    }

    /// Whether the file at `path` should be tracked at all.
    ///
    /// Any exclude match wins immediately; otherwise at least one include
    /// pattern must match. Default is deny.
    pub fn classify(&self, path: &Path) -> bool {
        let Some(name) = path.file_name() else {
            return false;
        };
        if self.excludes.is_match(name) {
            return false;
        }
        self.includes.is_match(name)
    }

    /// Gate one raw event: drop unconfigured kinds, route excluded creations
    /// to auto-deletion when enabled, pass tracked files through.
    pub fn gate(&self, kind: FsEventKind, path: &Path) -> GateDecision {
        if !self.event_types.contains(&kind) {
            return GateDecision::Ignore;
        }
        if self.classify(path) {
            return GateDecision::Track;
        }
        if kind == FsEventKind::Created && self.auto_delete_excluded && path.exists() {
            return GateDecision::AutoDelete;
        }
        GateDecision::Ignore
    }
}

fn compile_patterns(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        builder.add(Glob::new(pattern)?);
    }
    Ok(builder.build()?)
}
