//! ffmpeg filter-graph builders.
//!
//! Everything here is pure string construction from typed jobs, so the exact
//! graphs can be unit-tested without ffmpeg installed.

use montage_project_model::{format_number, FitMode, PixelRect};
use serde::Serialize;

use crate::backend::{AudioMixJob, AudioTrimJob, OverlayJob, OverlaySource, SegmentJob, TextJob};
use crate::transitions::TransitionStyle;

/// Compositing mode for overlays. Everything except `Normal` uses the
/// `blend` filter over a canvas-sized padded layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BlendMode {
    #[default]
    Normal,
    Multiply,
    Screen,
    Overlay,
    Darken,
    Lighten,
    HardLight,
    SoftLight,
    Difference,
    Exclusion,
}

impl BlendMode {
    /// Parse a blend mode name. Unknown names fall back to `Normal`.
    pub fn parse(name: &str) -> Self {
        match name.trim().to_ascii_lowercase().as_str() {
            "multiply" => BlendMode::Multiply,
            "screen" => BlendMode::Screen,
            "overlay" => BlendMode::Overlay,
            "darken" => BlendMode::Darken,
            "lighten" => BlendMode::Lighten,
            "hardlight" | "hard-light" | "hard_light" => BlendMode::HardLight,
            "softlight" | "soft-light" | "soft_light" => BlendMode::SoftLight,
            "difference" => BlendMode::Difference,
            "exclusion" => BlendMode::Exclusion,
            _ => BlendMode::Normal,
        }
    }

    /// Name understood by ffmpeg's `blend=all_mode=`.
    pub fn as_str(self) -> &'static str {
        match self {
            BlendMode::Normal => "normal",
            BlendMode::Multiply => "multiply",
            BlendMode::Screen => "screen",
            BlendMode::Overlay => "overlay",
            BlendMode::Darken => "darken",
            BlendMode::Lighten => "lighten",
            BlendMode::HardLight => "hardlight",
            BlendMode::SoftLight => "softlight",
            BlendMode::Difference => "difference",
            BlendMode::Exclusion => "exclusion",
        }
    }
}

/// Scale (and pad or crop) into a `width` x `height` box per fit mode.
pub fn scale_filter(fit: FitMode, width: u32, height: u32) -> String {
    match fit {
        FitMode::Fill => format!(
            "scale={width}:{height}:force_original_aspect_ratio=increase,crop={width}:{height}"
        ),
        FitMode::Stretch => format!("scale={width}:{height}"),
        FitMode::Fit => format!(
            "scale={width}:{height}:force_original_aspect_ratio=decrease,pad={width}:{height}:(ow-iw)/2:(oh-ih)/2"
        ),
    }
}

pub fn crop_filter(rect: &PixelRect) -> String {
    format!("crop={}:{}:{}:{}", rect.width, rect.height, rect.x, rect.y)
}

/// Chain of `atempo` steps realizing `speed`. Each step stays within the
/// single-filter range `[0.5, 2.0]`.
pub fn atempo_chain(speed: f64) -> String {
    let mut remaining = speed.clamp(0.25, 4.0);
    let mut parts = Vec::new();
    while remaining > 2.0 {
        parts.push("atempo=2.0".to_string());
        remaining /= 2.0;
    }
    while remaining < 0.5 {
        parts.push("atempo=0.5".to_string());
        remaining /= 0.5;
    }
    parts.push(format!("atempo={remaining:.3}"));
    parts.join(",")
}

/// Time gate for `[start, end)`.
pub fn enable_expr(start: f64, end: f64) -> String {
    format!(
        "gte(t,{})*lt(t,{})",
        format_number(start),
        format_number(end)
    )
}

pub fn quote(expr: &str) -> String {
    format!("'{expr}'")
}

/// Escape text for a single-quoted drawtext value.
pub fn escape_drawtext(text: &str) -> String {
    text.replace('\\', "\\\\")
        .replace(':', "\\:")
        .replace('\'', "\\'")
        .replace('%', "\\%")
}

fn has_speed_change(speed: f64) -> bool {
    (speed - 1.0).abs() > 0.001
}

/// Video filter chain for a segment, in processing order.
pub fn segment_video_filters(job: &SegmentJob) -> Vec<String> {
    let mut vf = Vec::new();
    if let Some(rect) = &job.crop {
        vf.push(crop_filter(rect));
    }
    vf.push(scale_filter(job.fit, job.width, job.height));
    if job.rotation.abs() > 0.01 {
        vf.push(format!("rotate={}*PI/180", format_number(job.rotation)));
    }
    if !job.color.is_identity() {
        vf.push(format!(
            "eq=brightness={}:contrast={}:saturation={}:gamma={}",
            format_number(job.color.brightness),
            format_number(job.color.contrast),
            format_number(job.color.saturation),
            format_number(job.color.gamma)
        ));
    }
    if job.hue.abs() > 0.001 {
        vf.push(format!("hue=h={}", format_number(job.hue)));
    }
    if job.blur > 0.1 {
        vf.push(format!("boxblur=luma_radius={}", format_number(job.blur)));
    }
    if job.opacity < 1.0 {
        vf.push(format!(
            "format=rgba,colorchannelmixer=aa={}",
            format_number(job.opacity)
        ));
    }
    if has_speed_change(job.speed) {
        vf.push(format!("setpts={}*PTS", format_number(1.0 / job.speed)));
    }
    if job.fades.video_in > 0.0 {
        vf.push(format!("fade=t=in:st=0:d={}", format_number(job.fades.video_in)));
    }
    if job.fades.video_out > 0.0 {
        let start = (job.output_duration - job.fades.video_out).max(0.0);
        vf.push(format!(
            "fade=t=out:st={}:d={}",
            format_number(start),
            format_number(job.fades.video_out)
        ));
    }
    vf
}

/// Audio filter chain for a segment. Empty when the source has no audio;
/// the synthesized silence needs no processing.
pub fn segment_audio_filters(job: &SegmentJob) -> Vec<String> {
    let mut af = Vec::new();
    if !job.has_audio {
        return af;
    }
    if has_speed_change(job.speed) {
        af.push(atempo_chain(job.speed));
    }
    if (job.volume - 1.0).abs() > 0.001 {
        af.push(format!("volume={}", format_number(job.volume)));
    }
    if job.fades.audio_in > 0.0 {
        af.push(format!("afade=t=in:st=0:d={}", format_number(job.fades.audio_in)));
    }
    if job.fades.audio_out > 0.0 {
        let start = (job.output_duration - job.fades.audio_out).max(0.0);
        af.push(format!(
            "afade=t=out:st={}:d={}",
            format_number(start),
            format_number(job.fades.audio_out)
        ));
    }
    af
}

/// `anullsrc` source for synthesized silence.
pub fn silence_source(sample_rate: u32, duration: f64) -> String {
    format!(
        "anullsrc=channel_layout=stereo:sample_rate={sample_rate}:d={}",
        format_number(duration)
    )
}

/// Black `lavfi` color source.
pub fn blank_video_source(width: u32, height: u32, fps: f64, duration: f64) -> String {
    format!(
        "color=c=black:s={width}x{height}:r={}:d={}",
        format_number(fps),
        format_number(duration)
    )
}

/// Two-input blend of video and cross-fade of audio.
pub fn transition_graph(style: TransitionStyle, duration: f64, offset: f64) -> String {
    let d = format_number(duration);
    format!(
        "[0:v][1:v]xfade=transition={}:duration={d}:offset={}[v];[0:a][1:a]acrossfade=d={d}:c1=tri:c2=tri[a]",
        style.as_str(),
        format_number(offset)
    )
}

/// Overlay graph: input 0 is the base, input 1 the layer.
pub fn overlay_graph(job: &OverlayJob) -> String {
    let enable = enable_expr(job.start, job.end);
    let x = quote(&job.x.to_expr("t", job.start));
    let y = quote(&job.y.to_expr("t", job.start));

    let mut chain = format!(
        "[1:v]setpts=PTS-STARTPTS+{}/TB,{},format=rgba",
        format_number(job.start),
        scale_filter(job.fit, job.width, job.height)
    );
    if job.rotation.abs() > 0.01 {
        chain.push_str(&format!(
            ",rotate={}*PI/180:c=none",
            format_number(job.rotation)
        ));
    }
    if job.opacity.is_constant() {
        let alpha = job.opacity.value_at(0.0).clamp(0.0, 1.0);
        if alpha < 1.0 {
            chain.push_str(&format!(",colorchannelmixer=aa={}", format_number(alpha)));
        }
    } else {
        // geq exposes the frame time as T
        let alpha = job.opacity.to_expr("T", job.start);
        chain.push_str(&format!(
            ",geq=r='r(X,Y)':g='g(X,Y)':b='b(X,Y)':a='alpha(X,Y)*clip({alpha},0,1)'"
        ));
    }

    if job.blend != BlendMode::Normal {
        // pad has no frame time, so the layer sits where its tracks start
        let pad_x = job.x.value_at(0.0).floor().max(0.0);
        let pad_y = job.y.value_at(0.0).floor().max(0.0);
        format!(
            "{chain},pad={}:{}:{}:{}:color=0x00000000[ov];[0:v][ov]blend=all_mode={}:all_opacity=1:enable='{enable}'[v]",
            job.canvas_width,
            job.canvas_height,
            format_number(pad_x),
            format_number(pad_y),
            job.blend.as_str()
        )
    } else {
        format!("{chain}[ov];[0:v][ov]overlay={x}:{y}:enable='{enable}'[v]")
    }
}

/// Whether the overlay layer input must be looped (still images).
pub fn overlay_needs_loop(job: &OverlayJob) -> bool {
    matches!(job.source, OverlaySource::Image(_))
}

/// `drawtext` filter for a text job.
pub fn drawtext_filter(job: &TextJob) -> String {
    let enable = enable_expr(job.start, job.end);
    let x = quote(&job.x.to_expr("t", job.start));
    let y = quote(&job.y.to_expr("t", job.start));
    let mut filter = format!(
        "drawtext=text='{}':fontcolor={}:fontsize={}:box=1:boxcolor=black@0.35:boxborderw=10:x={x}:y={y}",
        escape_drawtext(&job.text),
        job.color,
        job.font_size
    );
    if !job.opacity.is_constant() {
        filter.push_str(&format!(
            ":alpha={}",
            quote(&job.opacity.to_expr("t", job.start))
        ));
    }
    filter.push_str(&format!(":enable='{enable}'"));
    filter
}

/// Audio filters for a standalone audio trim.
pub fn audio_trim_filters(job: &AudioTrimJob) -> Vec<String> {
    let mut filters = Vec::new();
    if (job.volume - 1.0).abs() > 0.001 {
        filters.push(format!("volume={}", format_number(job.volume)));
    }
    if job.fade_in > 0.0 {
        filters.push(format!("afade=t=in:st=0:d={}", format_number(job.fade_in)));
    }
    if job.fade_out > 0.0 {
        let start = (job.duration - job.fade_out).max(0.0);
        filters.push(format!(
            "afade=t=out:st={}:d={}",
            format_number(start),
            format_number(job.fade_out)
        ));
    }
    filters
}

/// Mix graph: input 0 is the base, input 1 the delayed audio.
pub fn audio_mix_graph(job: &AudioMixJob) -> String {
    let delay_ms = (job.at.max(0.0) * 1000.0) as u64;
    let gain = format_number(job.volume.max(0.0));
    if job.base_has_audio {
        format!(
            "[1:a]volume={gain},adelay={delay_ms}:all=1[a1];[0:a][a1]amix=inputs=2:duration=first:dropout_transition=2:normalize=0[a]"
        )
    } else {
        format!(
            "[1:a]volume={gain},adelay={delay_ms}:all=1,atrim=end={}[a]",
            format_number(job.max_duration)
        )
    }
}
