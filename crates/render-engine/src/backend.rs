//! Media backend abstraction.
//!
//! The engine never shells out directly. Every processing step is described
//! as a typed [`BackendJob`] and handed to a [`MediaBackend`]; facts about
//! media files come from a [`MediaProbe`]. [`crate::ffmpeg::FfmpegBackend`]
//! implements both on top of the ffmpeg command-line tools.

use std::path::{Path, PathBuf};

use montage_common::MontageResult;
use montage_project_model::{FitMode, KeyframeTrack, PixelRect};
use serde::Serialize;

use crate::canvas::Canvas;
use crate::filters::BlendMode;
use crate::transitions::TransitionStyle;

/// Facts about one media file.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct MediaInfo {
    /// Container duration in seconds (0 when unknown).
    pub duration: f64,
    /// First video stream width (0 when there is no video stream).
    pub width: u32,
    pub height: u32,
    /// First video stream frame rate (0 when unknown).
    pub fps: f64,
    pub has_audio: bool,
}

/// Inspects media files.
pub trait MediaProbe {
    fn probe(&self, path: &Path) -> MontageResult<MediaInfo>;

    /// Whether the file carries at least one audio stream.
    fn has_audio(&self, path: &Path) -> MontageResult<bool> {
        Ok(self.probe(path)?.has_audio)
    }
}

/// Executes processing jobs. Each call maps to one external command.
pub trait MediaBackend {
    fn run(&self, job: &BackendJob) -> MontageResult<()>;

    /// Check if this backend is available on the system.
    fn is_available(&self) -> bool;

    /// Backend name.
    fn name(&self) -> &str;
}

/// Output encoding shared by every video-producing job.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Encoding {
    pub fps: f64,
    pub bitrate: Option<String>,
}

impl From<&Canvas> for Encoding {
    fn from(canvas: &Canvas) -> Self {
        Self {
            fps: canvas.fps,
            bitrate: canvas.bitrate.clone(),
        }
    }
}

/// One unit of backend work.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "job", rename_all = "snake_case")]
pub enum BackendJob {
    Blank(BlankJob),
    Segment(SegmentJob),
    Transition(TransitionJob),
    Concat(ConcatJob),
    Overlay(OverlayJob),
    Text(TextJob),
    AudioTrim(AudioTrimJob),
    AudioMix(AudioMixJob),
}

impl BackendJob {
    /// Short operation name used in logs and error messages.
    pub fn operation(&self) -> &'static str {
        match self {
            BackendJob::Blank(_) => "blank",
            BackendJob::Segment(_) => "segment",
            BackendJob::Transition(_) => "transition",
            BackendJob::Concat(_) => "concat",
            BackendJob::Overlay(_) => "overlay",
            BackendJob::Text(_) => "text",
            BackendJob::AudioTrim(_) => "audio_trim",
            BackendJob::AudioMix(_) => "audio_mix",
        }
    }

    /// The artifact this job writes.
    pub fn output(&self) -> &Path {
        match self {
            BackendJob::Blank(j) => &j.output,
            BackendJob::Segment(j) => &j.output,
            BackendJob::Transition(j) => &j.output,
            BackendJob::Concat(j) => &j.output,
            BackendJob::Overlay(j) => &j.output,
            BackendJob::Text(j) => &j.output,
            BackendJob::AudioTrim(j) => &j.output,
            BackendJob::AudioMix(j) => &j.output,
        }
    }
}

/// Black video with silent stereo audio.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BlankJob {
    pub width: u32,
    pub height: u32,
    pub duration: f64,
    pub encoding: Encoding,
    pub output: PathBuf,
}

/// Color adjustments applied through the `eq` filter.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ColorAdjust {
    pub brightness: f64,
    pub contrast: f64,
    pub saturation: f64,
    pub gamma: f64,
}

impl ColorAdjust {
    /// Whether every component is within 0.001 of neutral.
    pub fn is_identity(&self) -> bool {
        [
            self.brightness,
            self.contrast - 1.0,
            self.saturation - 1.0,
            self.gamma - 1.0,
        ]
        .iter()
        .all(|delta| delta.abs() <= 0.001)
    }
}

/// Video/audio fade lengths in seconds; zero disables a fade.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct Fades {
    pub video_in: f64,
    pub video_out: f64,
    pub audio_in: f64,
    pub audio_out: f64,
}

/// Render one clip's trimmed source window onto the canvas.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SegmentJob {
    pub input: PathBuf,
    /// Seek offset into the source.
    pub seek: f64,
    /// Source seconds to read.
    pub source_duration: f64,
    /// Seconds the segment lasts after the speed warp.
    pub output_duration: f64,
    /// Whether the source has audio; silence is synthesized otherwise.
    pub has_audio: bool,
    pub crop: Option<PixelRect>,
    pub fit: FitMode,
    pub width: u32,
    pub height: u32,
    pub rotation: f64,
    pub color: ColorAdjust,
    pub hue: f64,
    pub blur: f64,
    pub opacity: f64,
    pub speed: f64,
    pub volume: f64,
    pub fades: Fades,
    pub encoding: Encoding,
    pub output: PathBuf,
}

/// Blend two clips across an overlapping window.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TransitionJob {
    pub first: PathBuf,
    pub second: PathBuf,
    pub style: TransitionStyle,
    pub duration: f64,
    /// Start of the blend on the first input's timeline.
    pub offset: f64,
    pub encoding: Encoding,
    pub output: PathBuf,
}

/// Hard-cut concatenation. Stream copy is tried first, then a re-encode.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConcatJob {
    pub inputs: Vec<PathBuf>,
    /// Scratch file for the concat demuxer list.
    pub list_path: PathBuf,
    pub output: PathBuf,
}

/// Visual layer drawn by an overlay job.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "path", rename_all = "snake_case")]
pub enum OverlaySource {
    /// A rendered video segment, shifted to the overlay start.
    Video(PathBuf),
    /// A still image looped for the overlay window.
    Image(PathBuf),
}

/// Composite a video or still onto the running base.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OverlayJob {
    pub base: PathBuf,
    pub source: OverlaySource,
    /// Visible window `[start, end)` on the base timeline.
    pub start: f64,
    pub end: f64,
    /// Pixel position over clip-relative time.
    pub x: KeyframeTrack,
    pub y: KeyframeTrack,
    pub width: u32,
    pub height: u32,
    /// Opacity in `[0, 1]` over clip-relative time.
    pub opacity: KeyframeTrack,
    pub fit: FitMode,
    pub rotation: f64,
    pub blend: BlendMode,
    pub canvas_width: u32,
    pub canvas_height: u32,
    pub encoding: Encoding,
    pub output: PathBuf,
}

/// Burn text into the running base.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TextJob {
    pub base: PathBuf,
    pub text: String,
    pub start: f64,
    pub end: f64,
    /// Pixel position over clip-relative time.
    pub x: KeyframeTrack,
    pub y: KeyframeTrack,
    /// Opacity over clip-relative time. A constant track is folded into
    /// `color` instead.
    pub opacity: KeyframeTrack,
    pub font_size: u32,
    /// ffmpeg color with alpha (`0xrrggbb@a`).
    pub color: String,
    pub encoding: Encoding,
    pub output: PathBuf,
}

/// Cut, scale and fade a standalone audio asset.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AudioTrimJob {
    pub input: PathBuf,
    pub start: f64,
    pub duration: f64,
    pub volume: f64,
    pub fade_in: f64,
    pub fade_out: f64,
    pub output: PathBuf,
}

/// Mix an audio track into the running base at an offset. Video is copied.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AudioMixJob {
    pub base: PathBuf,
    pub audio: PathBuf,
    /// Offset on the base timeline, in seconds.
    pub at: f64,
    pub volume: f64,
    /// When false, the delayed audio becomes the base's only audio.
    pub base_has_audio: bool,
    /// Base duration; the mix never runs past it.
    pub max_duration: f64,
    pub output: PathBuf,
}
