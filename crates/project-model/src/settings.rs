//! Output settings and platform presets.

use serde::{Deserialize, Serialize};

/// Requested output format. Every field is optional; unset fields are
/// resolved from the preset, the first video source, or defaults.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct OutputSettings {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fps: Option<f64>,
    /// Encoder bitrate, e.g. `"6M"`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bitrate: Option<String>,
    /// Platform preset name (case-insensitive).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preset: Option<String>,
}

impl OutputSettings {
    /// Field-wise merge: values set on `self` win over `other`.
    pub fn or(&self, other: &OutputSettings) -> OutputSettings {
        OutputSettings {
            width: self.width.or(other.width),
            height: self.height.or(other.height),
            fps: self.fps.or(other.fps),
            bitrate: self.bitrate.clone().or_else(|| other.bitrate.clone()),
            preset: self.preset.clone().or_else(|| other.preset.clone()),
        }
    }

    /// Problems with explicitly set values.
    pub fn validation_issues(&self) -> Vec<String> {
        let mut issues = Vec::new();
        if self.width == Some(0) {
            issues.push("output width must be positive".to_string());
        }
        if self.height == Some(0) {
            issues.push("output height must be positive".to_string());
        }
        if let Some(fps) = self.fps {
            if !fps.is_finite() || fps <= 0.0 {
                issues.push(format!("output fps must be positive, got {fps}"));
            }
        }
        issues
    }

    /// Look up the configured preset, if any.
    pub fn platform_preset(&self) -> Option<PlatformPreset> {
        self.preset.as_deref().and_then(PlatformPreset::lookup)
    }
}

/// Canvas and bitrate for a publishing platform.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlatformPreset {
    pub name: &'static str,
    pub width: u32,
    pub height: u32,
    pub fps: f64,
    pub bitrate: &'static str,
}

const fn vertical(name: &'static str, bitrate: &'static str) -> PlatformPreset {
    PlatformPreset {
        name,
        width: 1080,
        height: 1920,
        fps: 30.0,
        bitrate,
    }
}

/// Known platform presets.
pub const PLATFORM_PRESETS: &[PlatformPreset] = &[
    vertical("tiktok", "4M"),
    vertical("instagram", "4M"),
    vertical("reels", "4M"),
    vertical("facebook", "4M"),
    vertical("youtube_shorts", "6M"),
    PlatformPreset {
        name: "youtube",
        width: 1920,
        height: 1080,
        fps: 30.0,
        bitrate: "8M",
    },
];

impl PlatformPreset {
    pub fn lookup(name: &str) -> Option<PlatformPreset> {
        let key = name.trim().to_ascii_lowercase().replace([' ', '-'], "_");
        PLATFORM_PRESETS.iter().copied().find(|p| p.name == key)
    }
}
