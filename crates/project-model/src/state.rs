//! Timeline state: the persisted project document handed to the renderer.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::clip::{Clip, ClipKind, Keyframe};
use crate::settings::OutputSettings;

/// Top-level editor state (`state.json`).
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimelineState {
    #[serde(default)]
    pub tracks: Vec<Track>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_settings: Option<OutputSettings>,
}

/// An ordered container of clips. Track order carries no compositing meaning.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Track {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    #[serde(default)]
    pub clips: Vec<Clip>,
}

impl TimelineState {
    /// Load and parse a state file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, TimelineError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| TimelineError::IoError {
            path: path.to_path_buf(),
            source: e,
        })?;
        serde_json::from_str(&content).map_err(|e| TimelineError::ParseError {
            path: path.to_path_buf(),
            source: e,
        })
    }

    /// Write the state as pretty JSON.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), TimelineError> {
        let path = path.as_ref();
        let json = serde_json::to_string_pretty(self).map_err(|e| TimelineError::ParseError {
            path: path.to_path_buf(),
            source: e,
        })?;
        std::fs::write(path, json).map_err(|e| TimelineError::IoError {
            path: path.to_path_buf(),
            source: e,
        })
    }

    /// All clips in document order (track order, then clip order).
    pub fn clips(&self) -> impl Iterator<Item = &Clip> {
        self.tracks.iter().flat_map(|track| track.clips.iter())
    }

    pub fn clip_count(&self) -> usize {
        self.tracks.iter().map(|t| t.clips.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.clip_count() == 0
    }

    /// Latest `start + duration` over every clip, or 0 for an empty timeline.
    pub fn timeline_end(&self) -> f64 {
        self.clips().map(Clip::end).fold(0.0, f64::max)
    }

    pub fn output_settings(&self) -> OutputSettings {
        self.output_settings.clone().unwrap_or_default()
    }

    /// Collect every structural problem in the document.
    pub fn validation_issues(&self) -> Vec<String> {
        let mut issues = Vec::new();
        let mut seen = HashSet::new();

        for clip in self.clips() {
            let id = clip.id.as_str();
            if !id.is_empty() && !seen.insert(id) {
                issues.push(format!("duplicate clip id {id:?}"));
            }
            check_clip(clip, &mut issues);
        }

        if let Some(settings) = &self.output_settings {
            issues.extend(settings.validation_issues());
        }
        issues
    }

    /// Fail with every problem joined into one message.
    pub fn validate(&self) -> Result<(), TimelineError> {
        let issues = self.validation_issues();
        if issues.is_empty() {
            Ok(())
        } else {
            Err(TimelineError::ValidationError {
                message: issues.join("; "),
            })
        }
    }
}

fn check_clip(clip: &Clip, issues: &mut Vec<String>) {
    let id = &clip.id;
    if !clip.duration.is_finite() || clip.duration <= 0.0 {
        issues.push(format!("clip {id:?}: duration must be positive"));
    }
    if !clip.start_time.is_finite() || clip.start_time < 0.0 {
        issues.push(format!("clip {id:?}: startTime must be a non-negative number"));
    }

    match &clip.kind {
        ClipKind::Video(media) | ClipKind::Image(media) => {
            if media.source_id.trim().is_empty() {
                issues.push(format!("clip {id:?}: missing sourceId"));
            }
            if !media.trim_start.is_finite() || media.trim_start < 0.0 {
                issues.push(format!("clip {id:?}: trimStart must be a non-negative number"));
            }
            if let Some(end) = media.trim_end {
                if !end.is_finite() {
                    issues.push(format!("clip {id:?}: trimEnd must be finite"));
                }
            }
        }
        ClipKind::Audio(audio) => {
            if audio.source_id.trim().is_empty() {
                issues.push(format!("clip {id:?}: missing sourceId"));
            }
        }
        ClipKind::Text(_) | ClipKind::Shape(_) => {}
    }

    let Some(visual) = clip.visual() else {
        return;
    };

    let pos = visual.position;
    if !in_percent_range(pos.x) || !in_percent_range(pos.y) {
        issues.push(format!(
            "clip {id:?}: position ({}, {}) outside 0-100",
            pos.x, pos.y
        ));
    }
    let size = visual.size;
    if !(size.width.is_finite() && size.height.is_finite())
        || size.width <= 0.0
        || size.height <= 0.0
    {
        issues.push(format!("clip {id:?}: size must be positive"));
    }
    if let Some(crop) = visual.crop {
        let fields = [crop.x, crop.y, crop.width, crop.height];
        if fields.iter().any(|v| !v.is_finite() || !(0.0..=1.0).contains(v)) {
            issues.push(format!("clip {id:?}: crop outside 0-1"));
        } else if crop.width <= 0.0 || crop.height <= 0.0 {
            issues.push(format!("clip {id:?}: crop has zero size"));
        }
    }
    if visual.keyframes.iter().any(|kf| !keyframe_is_finite(kf)) {
        issues.push(format!("clip {id:?}: keyframes must be finite"));
    }
}

fn in_percent_range(value: f64) -> bool {
    value.is_finite() && (0.0..=100.0).contains(&value)
}

fn keyframe_is_finite(kf: &Keyframe) -> bool {
    let position_ok = kf.position.map_or(true, |p| {
        p.x.map_or(true, f64::is_finite) && p.y.map_or(true, f64::is_finite)
    });
    kf.time.is_finite() && kf.opacity.map_or(true, f64::is_finite) && position_ok
}

/// Errors that can occur when loading or validating a timeline.
#[derive(Debug, thiserror::Error)]
pub enum TimelineError {
    #[error("I/O error at {path}: {source}")]
    IoError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Parse error in {path}: {source}")]
    ParseError {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("Invalid timeline: {message}")]
    ValidationError { message: String },
}
