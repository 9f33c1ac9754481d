//! Metadata extraction for tracked media files.

use std::path::Path;
use std::sync::Arc;

use tracing::{debug, warn};
use vigil_model::{FieldValue, MetadataMap, VideoMetadataConfig};

use crate::probe::MediaProbe;

/// Extensions that mark a file as media. Extraction is never attempted for
/// anything else, even when enabled.
pub const MEDIA_EXTENSIONS: &[&str] = &[
    "mp4", "avi", "mkv", "mov", "wmv", "flv", "webm", "m4v", "3gp", "ts",
];

/// Whether `path` carries one of the supported media extensions
/// (case-insensitive).
pub fn has_media_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| MEDIA_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
}

/// Builds flat metadata maps from probe results, honoring the configured
/// per-category field allow-lists.
#[derive(Clone)]
pub struct MetadataExtractor {
    probe: Arc<dyn MediaProbe>,
}

impl std::fmt::Debug for MetadataExtractor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MetadataExtractor").finish_non_exhaustive()
    }
}

impl MetadataExtractor {
    pub fn new(probe: Arc<dyn MediaProbe>) -> Self {
        Self { probe }
    }

    /// Probe `path` and build its metadata map.
    ///
    /// Returns `None` when extraction is disabled, the extension is not a
    /// supported media extension, the probe yields no tracks, or the
    /// resulting map is empty. Probe failures are logged and contained; they
    /// never abort the pipeline.
    pub fn extract(&self, path: &Path, config: &VideoMetadataConfig) -> Option<MetadataMap> {
        if !config.extract_video_metadata {
            return None;
        }
        if !has_media_extension(path) {
            return None;
        }

        let tracks = match self.probe.probe(path) {
            Ok(Some(tracks)) => tracks,
            Ok(None) => {
                debug!(path = %path.display(), "no track information");
                return None;
            }
            Err(error) => {
                warn!(path = %path.display(), %error, "metadata probe failed");
                return None;
            }
        };

        let mut metadata = MetadataMap::new();

        insert_fields(&mut metadata, "general", &config.general_fields, |name| {
            tracks.general.field(name)
        });
        for track in &tracks.video {
            insert_fields(&mut metadata, "video", &config.video_fields, |name| {
                track.field(name)
            });
        }
        for track in &tracks.audio {
            insert_fields(&mut metadata, "audio", &config.audio_fields, |name| {
                track.field(name)
            });
        }
        insert_fields(&mut metadata, "custom", &config.custom_fields, |name| {
            tracks.first_field(name)
        });

        if metadata.is_empty() {
            return None;
        }
        debug!(path = %path.display(), fields = metadata.len(), "metadata extracted");
        Some(metadata)
    }
}

fn insert_fields(
    metadata: &mut MetadataMap,
    category: &str,
    fields: &[String],
    lookup: impl Fn(&str) -> Option<FieldValue>,
) {
    for field in fields {
        if let Some(value) = lookup(field) {
            metadata.insert(format!("{category}_{field}"), value);
        }
    }
}
