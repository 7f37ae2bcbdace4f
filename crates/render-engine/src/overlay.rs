//! Overlay pass: paint videos, images, text and shapes over the base
//! composite, one backend job per item, in paint order.

use montage_common::MontageResult;
use montage_project_model::{
    Clip, ClipKind, FitMode, KeyframeTrack, MediaClip, PixelRect, Positioned, ShapeClip,
    TextClip, MIN_SEGMENT_DURATION,
};

use crate::audio::mix_into;
use crate::backend::{BackendJob, OverlayJob, OverlaySource, TextJob};
use crate::color::ffmpeg_color;
use crate::context::RenderContext;
use crate::filters::BlendMode;
use crate::plan::EdgeOverrides;
use crate::segment::{render_segment, sanitize, Rendered};
use crate::shapes::{write_png, ShapeKind, ShapeSprite};
use crate::storage::{MediaSources, StorageResolver};

/// Default text color.
const TEXT_COLOR: &str = "#ffffff";
const MIN_FONT_SIZE: u32 = 14;

/// Pixel placement of one overlay, resolved against the canvas.
#[derive(Debug, Clone, PartialEq)]
pub struct Placement {
    pub rect: PixelRect,
    pub x: KeyframeTrack,
    pub y: KeyframeTrack,
    pub opacity: KeyframeTrack,
}

impl Placement {
    /// Resolve the rect and keyframe tracks of a visual clip.
    pub fn resolve<P: Positioned + ?Sized>(item: &P, clip_start: f64, width: u32, height: u32) -> Self {
        let visual = item.visual();
        let rect = PixelRect::from_percent(visual.position, visual.size, width, height);
        let (w, h) = (width as f64, height as f64);
        let keyframes = item.keyframes();
        let base_opacity = item.effects().opacity();
        Self {
            x: KeyframeTrack::from_keyframes(keyframes, clip_start, rect.x as f64, |kf| {
                kf.position.and_then(|p| p.x).map(|x| w * x / 100.0)
            }),
            y: KeyframeTrack::from_keyframes(keyframes, clip_start, rect.y as f64, |kf| {
                kf.position.and_then(|p| p.y).map(|y| h * y / 100.0)
            }),
            opacity: KeyframeTrack::from_keyframes(keyframes, clip_start, base_opacity, |kf| {
                kf.opacity.filter(|o| o.is_finite()).map(|o| o.clamp(0.0, 1.0))
            }),
            rect,
        }
    }
}

/// Overlay items only composite during `[start, end)`; `end` never precedes
/// `start` by less than the minimum segment length.
fn window(clip: &Clip) -> (f64, f64) {
    (
        clip.start_time,
        clip.start_time + clip.duration.max(MIN_SEGMENT_DURATION),
    )
}

/// Paint every overlay onto `base` in order.
pub fn composite_overlays(
    ctx: &RenderContext<'_>,
    overlays: &[&Clip],
    base: Rendered,
    media: &MediaSources,
    storage: &dyn StorageResolver,
) -> MontageResult<Rendered> {
    let mut current = base;
    for clip in overlays {
        tracing::info!(
            clip = %clip.id,
            kind = clip.kind_name(),
            layer = clip.layer,
            start = clip.start_time,
            "Compositing overlay"
        );
        current = match &clip.kind {
            ClipKind::Video(video) => overlay_video(ctx, clip, video, current, media, storage)?,
            ClipKind::Image(image) => overlay_image(ctx, clip, image, current, media, storage)?,
            ClipKind::Text(text) => overlay_text(ctx, clip, text, current)?,
            ClipKind::Shape(shape) => overlay_shape(ctx, clip, shape, current)?,
            ClipKind::Audio(_) => current,
        };
    }
    Ok(current)
}

#[allow(clippy::too_many_arguments)]
fn overlay_job(
    ctx: &RenderContext<'_>,
    clip: &Clip,
    base: &Rendered,
    source: OverlaySource,
    placement: Placement,
    end: f64,
    fit: FitMode,
    rotation: f64,
) -> OverlayJob {
    OverlayJob {
        base: base.path.clone(),
        source,
        start: clip.start_time,
        end,
        x: placement.x,
        y: placement.y,
        width: placement.rect.width,
        height: placement.rect.height,
        opacity: placement.opacity,
        fit,
        rotation,
        blend: BlendMode::parse(clip.effects().blend_mode.as_deref().unwrap_or("normal")),
        canvas_width: ctx.canvas.width,
        canvas_height: ctx.canvas.height,
        encoding: ctx.encoding(),
        output: ctx.artifact(&format!("overlay_{}", sanitize(&clip.id)), "mp4"),
    }
}

/// Render the clip as a segment, overlay it for its rendered length, then mix
/// its audio in at the clip start when its volume is positive.
fn overlay_video(
    ctx: &RenderContext<'_>,
    clip: &Clip,
    video: &MediaClip,
    base: Rendered,
    media: &MediaSources,
    storage: &dyn StorageResolver,
) -> MontageResult<Rendered> {
    let input = media.source_path(storage, &video.source_id)?;
    let segment = render_segment(ctx, clip, video, &input, EdgeOverrides::default())?;
    let placement = Placement::resolve(video, clip.start_time, ctx.canvas.width, ctx.canvas.height);
    let job = overlay_job(
        ctx,
        clip,
        &base,
        OverlaySource::Video(segment.path.clone()),
        placement,
        clip.start_time + segment.duration,
        video.visual.fit_mode,
        video.visual.rotation,
    );
    let composited = Rendered {
        path: ctx.run(BackendJob::Overlay(job))?,
        duration: base.duration,
    };

    // segment audio already carries the clip volume
    if clip.effects().volume() > 0.0 {
        mix_into(ctx, composited, &segment.path, clip.start_time, &clip.id)
    } else {
        Ok(composited)
    }
}

fn overlay_image(
    ctx: &RenderContext<'_>,
    clip: &Clip,
    image: &MediaClip,
    base: Rendered,
    media: &MediaSources,
    storage: &dyn StorageResolver,
) -> MontageResult<Rendered> {
    let path = media.asset_path(storage, &image.source_id)?;
    let placement = Placement::resolve(image, clip.start_time, ctx.canvas.width, ctx.canvas.height);
    let (_, end) = window(clip);
    let job = overlay_job(
        ctx,
        clip,
        &base,
        OverlaySource::Image(path),
        placement,
        end,
        image.visual.fit_mode,
        image.visual.rotation,
    );
    Ok(Rendered {
        path: ctx.run(BackendJob::Overlay(job))?,
        duration: base.duration,
    })
}

/// Font size derived from the text box height.
pub fn font_size(box_height: u32) -> u32 {
    ((box_height as f64 * 0.6).floor() as u32).max(MIN_FONT_SIZE)
}

fn overlay_text(
    ctx: &RenderContext<'_>,
    clip: &Clip,
    text: &TextClip,
    base: Rendered,
) -> MontageResult<Rendered> {
    let placement = Placement::resolve(text, clip.start_time, ctx.canvas.width, ctx.canvas.height);
    let (start, end) = window(clip);
    // a constant opacity is folded into the color alpha
    let alpha = if placement.opacity.is_constant() {
        placement.opacity.value_at(0.0)
    } else {
        1.0
    };
    let color = ffmpeg_color(text.style.color.as_deref().unwrap_or(TEXT_COLOR), alpha);
    let job = TextJob {
        base: base.path.clone(),
        text: text.display_text().to_string(),
        start,
        end,
        x: placement.x,
        y: placement.y,
        opacity: placement.opacity,
        font_size: font_size(placement.rect.height),
        color,
        encoding: ctx.encoding(),
        output: ctx.artifact(&format!("text_{}", sanitize(&clip.id)), "mp4"),
    };
    Ok(Rendered {
        path: ctx.run(BackendJob::Text(job))?,
        duration: base.duration,
    })
}

/// Rasterize the shape at its rect size and composite it as a stretched image.
fn overlay_shape(
    ctx: &RenderContext<'_>,
    clip: &Clip,
    shape: &ShapeClip,
    base: Rendered,
) -> MontageResult<Rendered> {
    let placement = Placement::resolve(shape, clip.start_time, ctx.canvas.width, ctx.canvas.height);
    let sprite = ShapeSprite::new(
        ShapeKind::parse(&shape.shape_name()),
        placement.rect.width,
        placement.rect.height,
        shape.style.color.as_deref(),
        shape.style.outline,
    );
    let png = ctx.artifact(&format!("shape_{}", sanitize(&clip.id)), "png");
    write_png(&sprite, &png)?;

    let (_, end) = window(clip);
    let job = overlay_job(
        ctx,
        clip,
        &base,
        OverlaySource::Image(png),
        placement,
        end,
        FitMode::Stretch,
        shape.visual.rotation,
    );
    Ok(Rendered {
        path: ctx.run(BackendJob::Overlay(job))?,
        duration: base.duration,
    })
}
