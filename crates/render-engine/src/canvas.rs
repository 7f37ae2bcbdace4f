//! Output canvas resolution.
//!
//! Each field is resolved independently in priority order: explicit output
//! settings, the named platform preset, the probed first video source, then
//! the 1920x1080@30 default. Bitrate has no probe or default level.

use std::path::Path;

use montage_project_model::OutputSettings;
use serde::Serialize;

use crate::backend::{MediaInfo, MediaProbe};

pub const DEFAULT_WIDTH: u32 = 1920;
pub const DEFAULT_HEIGHT: u32 = 1080;
pub const DEFAULT_FPS: f64 = 30.0;

/// Resolved output format for one render.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Canvas {
    pub width: u32,
    pub height: u32,
    pub fps: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bitrate: Option<String>,
}

impl Default for Canvas {
    fn default() -> Self {
        Self {
            width: DEFAULT_WIDTH,
            height: DEFAULT_HEIGHT,
            fps: DEFAULT_FPS,
            bitrate: None,
        }
    }
}

impl Canvas {
    /// Round a duration to a whole number of frames (half away from zero).
    pub fn frames(&self, seconds: f64) -> i64 {
        (seconds * self.fps).round() as i64
    }
}

/// Resolve the canvas.
///
/// `first_video` is the probe and local path of the first video clip's
/// source, when there is one. It is only probed when the settings and preset
/// leave a field open; a probe failure is logged and skipped.
pub fn resolve_canvas(
    settings: &OutputSettings,
    first_video: Option<(&dyn MediaProbe, &Path)>,
) -> Canvas {
    let preset = settings.platform_preset();
    if settings.preset.is_some() && preset.is_none() {
        tracing::warn!(preset = ?settings.preset, "Unknown platform preset ignored");
    }

    let width = settings.width.filter(|w| *w > 0).or(preset.map(|p| p.width));
    let height = settings.height.filter(|h| *h > 0).or(preset.map(|p| p.height));
    let fps = settings
        .fps
        .filter(|f| f.is_finite() && *f > 0.0)
        .or(preset.map(|p| p.fps));
    let bitrate = settings
        .bitrate
        .clone()
        .filter(|b| !b.trim().is_empty())
        .or_else(|| preset.map(|p| p.bitrate.to_string()));

    let probed = if width.is_none() || height.is_none() || fps.is_none() {
        first_video.and_then(|(probe, path)| probe_source(probe, path))
    } else {
        None
    };

    let canvas = Canvas {
        width: width
            .or(probed.as_ref().map(|i| i.width).filter(|w| *w > 0))
            .unwrap_or(DEFAULT_WIDTH),
        height: height
            .or(probed.as_ref().map(|i| i.height).filter(|h| *h > 0))
            .unwrap_or(DEFAULT_HEIGHT),
        fps: fps
            .or(probed
                .as_ref()
                .map(|i| i.fps)
                .filter(|f| f.is_finite() && *f > 0.0))
            .unwrap_or(DEFAULT_FPS),
        bitrate,
    };
    tracing::info!(
        width = canvas.width,
        height = canvas.height,
        fps = canvas.fps,
        bitrate = ?canvas.bitrate,
        "Canvas resolved"
    );
    canvas
}

fn probe_source(probe: &dyn MediaProbe, path: &Path) -> Option<MediaInfo> {
    match probe.probe(path) {
        Ok(info) => Some(info),
        Err(err) => {
            tracing::warn!(
                path = %path.display(),
                error = %err,
                "Probe of first video source failed, using defaults"
            );
            None
        }
    }
}
