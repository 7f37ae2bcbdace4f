//! Segment rendering: one video clip's trimmed source window, normalized to
//! the canvas.

use std::path::{Path, PathBuf};

use montage_common::MontageResult;
use montage_project_model::{Clip, MediaClip, PixelRect};

use crate::backend::{BackendJob, BlankJob, ColorAdjust, Fades, SegmentJob};
use crate::context::RenderContext;
use crate::plan::EdgeOverrides;

/// A rendered intermediate with its exact duration.
#[derive(Debug, Clone, PartialEq)]
pub struct Rendered {
    pub path: PathBuf,
    pub duration: f64,
}

/// Build the segment job for `clip` read from `input`.
///
/// `overrides` zeroes the edge fades (video and audio) on each side that an
/// accepted transition will blend instead.
pub fn segment_job(
    ctx: &RenderContext<'_>,
    clip: &Clip,
    media: &MediaClip,
    input: &Path,
    overrides: EdgeOverrides,
    output: PathBuf,
) -> SegmentJob {
    let window = media.source_window(clip.duration);
    let visual = &media.visual;
    let effects = &visual.effects;

    let has_audio = match ctx.probe.has_audio(input) {
        Ok(has_audio) => has_audio,
        Err(err) => {
            tracing::warn!(
                clip = %clip.id,
                error = %err,
                "Audio probe failed, substituting silence"
            );
            false
        }
    };

    let mut fades = Fades {
        video_in: effects.fade_in(),
        video_out: effects.fade_out(),
        audio_in: effects.audio_fade_in(),
        audio_out: effects.audio_fade_out(),
    };
    if overrides.incoming {
        fades.video_in = 0.0;
        fades.audio_in = 0.0;
    }
    if overrides.outgoing {
        fades.video_out = 0.0;
        fades.audio_out = 0.0;
    }

    SegmentJob {
        input: input.to_path_buf(),
        seek: window.start,
        source_duration: window.source_duration,
        output_duration: window.output_duration,
        has_audio,
        crop: visual
            .crop
            .as_ref()
            .and_then(|crop| crop_rect(ctx, clip, input, crop)),
        fit: visual.fit_mode,
        width: ctx.canvas.width,
        height: ctx.canvas.height,
        rotation: visual.rotation,
        color: ColorAdjust {
            brightness: effects.brightness(),
            contrast: effects.contrast(),
            saturation: effects.saturation(),
            gamma: effects.gamma(),
        },
        hue: effects.hue(),
        blur: effects.blur(),
        opacity: effects.opacity(),
        speed: window.speed,
        volume: effects.volume(),
        fades,
        encoding: ctx.encoding(),
        output,
    }
}

/// Pixel crop for `crop`, or `None` when it covers the whole frame or the
/// source dimensions are unknown.
fn crop_rect(
    ctx: &RenderContext<'_>,
    clip: &Clip,
    input: &Path,
    crop: &montage_project_model::CropBox,
) -> Option<PixelRect> {
    match ctx.probe.probe(input) {
        Ok(info) => crop.clamped().to_pixels(info.width, info.height),
        Err(err) => {
            tracing::warn!(
                clip = %clip.id,
                error = %err,
                "Could not read source dimensions, crop skipped"
            );
            None
        }
    }
}

/// Render a video clip. Returns the artifact and its post-speed duration.
pub fn render_segment(
    ctx: &RenderContext<'_>,
    clip: &Clip,
    media: &MediaClip,
    input: &Path,
    overrides: EdgeOverrides,
) -> MontageResult<Rendered> {
    let output = ctx.artifact(&format!("segment_{}", sanitize(&clip.id)), "mp4");
    let job = segment_job(ctx, clip, media, input, overrides, output);
    let duration = job.output_duration;
    tracing::info!(
        clip = %clip.id,
        seek = job.seek,
        source_duration = job.source_duration,
        duration,
        speed = job.speed,
        has_audio = job.has_audio,
        "Rendering segment"
    );
    let path = ctx.run(BackendJob::Segment(job))?;
    Ok(Rendered { path, duration })
}

/// Render a black, silent filler of exactly `duration` seconds.
pub fn render_blank(ctx: &RenderContext<'_>, label: &str, duration: f64) -> MontageResult<Rendered> {
    let output = ctx.artifact(label, "mp4");
    let job = BlankJob {
        width: ctx.canvas.width,
        height: ctx.canvas.height,
        duration,
        encoding: ctx.encoding(),
        output,
    };
    tracing::info!(kind = label, duration, "Rendering blank filler");
    let path = ctx.run(BackendJob::Blank(job))?;
    Ok(Rendered { path, duration })
}

/// File-name-safe form of a clip id.
pub(crate) fn sanitize(id: &str) -> String {
    let cleaned: String = id
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' { c } else { '_' })
        .take(40)
        .collect();
    if cleaned.is_empty() {
        "clip".to_string()
    } else {
        cleaned
    }
}
