//! Media probing seam.
//!
//! The pipeline only ever sees [`MediaTracks`]: an explicit, typed field
//! table per track category. Which probing library fills it in is hidden
//! behind [`MediaProbe`], so the pipeline is testable without FFmpeg and the
//! probing dependency stays feature-gated.
//!
//! All durations are reported in **milliseconds**; the validation engine
//! normalizes them to seconds for comparisons.

use std::path::Path;

use vigil_model::FieldValue;

use crate::error::Result;

/// Narrow interface to the external media-inspection capability.
///
/// Returns `Ok(None)` when the file yields no track information at all;
/// errors are contained by the extractor and never abort the pipeline.
pub trait MediaProbe: Send + Sync {
    fn probe(&self, path: &Path) -> Result<Option<MediaTracks>>;
}

/// Container-level track fields.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct GeneralTrack {
    pub format_name: Option<String>,
    pub file_size: Option<u64>,
    /// Milliseconds.
    pub duration: Option<f64>,
    pub overall_bit_rate: Option<u64>,
}

impl GeneralTrack {
    /// Typed lookup of a configured field name.
    pub fn field(&self, name: &str) -> Option<FieldValue> {
        match name {
            "format_name" => self.format_name.clone().map(FieldValue::Text),
            "file_size" => self.file_size.map(|v| FieldValue::Number(v as f64)),
            "duration" => self.duration.map(FieldValue::Number),
            "overall_bit_rate" => self.overall_bit_rate.map(|v| FieldValue::Number(v as f64)),
            _ => None,
        }
    }
}

/// Per-video-stream track fields.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct VideoTrack {
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub codec_name: Option<String>,
    pub bit_rate: Option<u64>,
    pub frame_rate: Option<f64>,
    /// Milliseconds.
    pub duration: Option<f64>,
    pub display_aspect_ratio: Option<f64>,
    pub pixel_aspect_ratio: Option<f64>,
}

impl VideoTrack {
    pub fn field(&self, name: &str) -> Option<FieldValue> {
        match name {
            "width" => self.width.map(|v| FieldValue::Number(v as f64)),
            "height" => self.height.map(|v| FieldValue::Number(v as f64)),
            "codec_name" => self.codec_name.clone().map(FieldValue::Text),
            "bit_rate" => self.bit_rate.map(|v| FieldValue::Number(v as f64)),
            "frame_rate" => self.frame_rate.map(FieldValue::Number),
            "duration" => self.duration.map(FieldValue::Number),
            "display_aspect_ratio" => self.display_aspect_ratio.map(FieldValue::Number),
            "pixel_aspect_ratio" => self.pixel_aspect_ratio.map(FieldValue::Number),
            _ => None,
        }
    }
}

/// Per-audio-stream track fields.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct AudioTrack {
    pub codec_name: Option<String>,
    pub channels: Option<u16>,
    pub sample_rate: Option<u32>,
    pub bit_rate: Option<u64>,
}

impl AudioTrack {
    pub fn field(&self, name: &str) -> Option<FieldValue> {
        match name {
            "codec_name" => self.codec_name.clone().map(FieldValue::Text),
            "channels" => self.channels.map(|v| FieldValue::Number(v as f64)),
            "sample_rate" => self.sample_rate.map(|v| FieldValue::Number(v as f64)),
            "bit_rate" => self.bit_rate.map(|v| FieldValue::Number(v as f64)),
            _ => None,
        }
    }
}

/// Everything a probe learned about one file.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct MediaTracks {
    pub general: GeneralTrack,
    pub video: Vec<VideoTrack>,
    pub audio: Vec<AudioTrack>,
}

impl MediaTracks {
    /// First non-null value for `name`, scanning tracks in fixed order:
    /// general, then video streams, then audio streams.
    pub fn first_field(&self, name: &str) -> Option<FieldValue> {
        self.general
            .field(name)
            .or_else(|| self.video.iter().find_map(|track| track.field(name)))
            .or_else(|| self.audio.iter().find_map(|track| track.field(name)))
    }
}

#[cfg(feature = "ffmpeg")]
pub use ffmpeg_probe::FfmpegProbe;

#[cfg(feature = "ffmpeg")]
mod ffmpeg_probe {
    use std::path::Path;

    use ffmpeg_next as ffmpeg;
    use tracing::debug;

    use crate::error::Result;

    use super::{AudioTrack, GeneralTrack, MediaProbe, MediaTracks, VideoTrack};

    /// [`MediaProbe`](super::MediaProbe) backed by FFmpeg stream inspection.
    #[derive(Debug, Default, Clone, Copy)]
    pub struct FfmpegProbe;

    impl FfmpegProbe {
        /// Initializes FFmpeg; safe to call more than once per process.
        pub fn new() -> Result<Self> {
            ffmpeg::init()?;
            Ok(Self)
        }
    }

    impl MediaProbe for FfmpegProbe {
        fn probe(&self, path: &Path) -> Result<Option<MediaTracks>> {
            let input = ffmpeg::format::input(path)?;
            if input.streams().count() == 0 {
                return Ok(None);
            }

            let mut tracks = MediaTracks::default();

            tracks.general = GeneralTrack {
                format_name: Some(input.format().name().to_string()),
                file_size: std::fs::metadata(path).ok().map(|m| m.len()),
                duration: container_duration_ms(&input),
                overall_bit_rate: (input.bit_rate() > 0).then(|| input.bit_rate() as u64),
            };

            for (index, stream) in input.streams().enumerate() {
                let codec =
                    ffmpeg::codec::context::Context::from_parameters(stream.parameters())?;
                match codec.medium() {
                    ffmpeg::media::Type::Video => {
                        // Cover art shows up as an attached-picture stream.
                        if stream
                            .disposition()
                            .contains(ffmpeg::format::stream::Disposition::ATTACHED_PIC)
                        {
                            debug!(index, "skipping attached picture stream");
                            continue;
                        }
                        if let Ok(video) = codec.decoder().video() {
                            tracks.video.push(video_track(&stream, &video));
                        }
                    }
                    ffmpeg::media::Type::Audio => {
                        if let Ok(audio) = codec.decoder().audio() {
                            tracks.audio.push(AudioTrack {
                                codec_name: audio.codec().map(|c| c.name().to_string()),
                                channels: Some(audio.channels()),
                                sample_rate: Some(audio.rate()),
                                bit_rate: (audio.bit_rate() > 0)
                                    .then(|| audio.bit_rate() as u64),
                            });
                        }
                    }
                    other => {
                        debug!(index, kind = ?other, "skipping stream");
                    }
                }
            }

            Ok(Some(tracks))
        }
    }

    fn container_duration_ms(input: &ffmpeg::format::context::Input) -> Option<f64> {
        (input.duration() != ffmpeg::ffi::AV_NOPTS_VALUE).then(|| {
            input.duration() as f64 / ffmpeg::ffi::AV_TIME_BASE as f64 * 1000.0
        })
    }

    fn video_track(
        stream: &ffmpeg::format::stream::Stream<'_>,
        video: &ffmpeg::codec::decoder::Video,
    ) -> VideoTrack {
        let width = video.width();
        let height = video.height();

        let frame_rate = {
            let rate = stream.avg_frame_rate();
            (rate.denominator() != 0)
                .then(|| rate.numerator() as f64 / rate.denominator() as f64)
        };

        let duration = {
            let time_base = stream.time_base();
            (stream.duration() > 0 && time_base.denominator() != 0).then(|| {
                stream.duration() as f64 * time_base.numerator() as f64
                    / time_base.denominator() as f64
                    * 1000.0
            })
        };

        let sample_aspect = video.aspect_ratio();
        let pixel_aspect_ratio = (sample_aspect.numerator() > 0
            && sample_aspect.denominator() > 0)
            .then(|| sample_aspect.numerator() as f64 / sample_aspect.denominator() as f64);
        let display_aspect_ratio = (height > 0).then(|| {
            width as f64 / height as f64 * pixel_aspect_ratio.unwrap_or(1.0)
        });

        VideoTrack {
            width: Some(width),
            height: Some(height),
            codec_name: video.codec().map(|c| c.name().to_string()),
            bit_rate: (video.bit_rate() > 0).then(|| video.bit_rate() as u64),
            frame_rate,
            duration,
            display_aspect_ratio,
            pixel_aspect_ratio,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn typed_lookup_only_exposes_known_fields() {
        let track = GeneralTrack {
            format_name: Some("matroska".to_string()),
            file_size: Some(1024),
            duration: Some(45000.0),
            overall_bit_rate: None,
        };
        assert_eq!(
            track.field("format_name"),
            Some(FieldValue::Text("matroska".to_string()))
        );
        assert_eq!(track.field("duration"), Some(FieldValue::Number(45000.0)));
        // Null values and unknown names are both absent.
        assert_eq!(track.field("overall_bit_rate"), None);
        assert_eq!(track.field("no_such_field"), None);
    }

    #[test]
    fn first_field_scans_general_then_video_then_audio() {
        let tracks = MediaTracks {
            general: GeneralTrack {
                duration: Some(60000.0),
                ..GeneralTrack::default()
            },
            video: vec![VideoTrack {
                duration: Some(59000.0),
                codec_name: Some("h264".to_string()),
                ..VideoTrack::default()
            }],
            audio: vec![AudioTrack {
                codec_name: Some("aac".to_string()),
                ..AudioTrack::default()
            }],
        };

        // General wins for duration.
        assert_eq!(
            tracks.first_field("duration"),
            Some(FieldValue::Number(60000.0))
        );
        // Video track wins over audio for codec_name.
        assert_eq!(
            tracks.first_field("codec_name"),
            Some(FieldValue::Text("h264".to_string()))
        );
        assert_eq!(tracks.first_field("channels"), None);
    }
}
