//! Parity trace: a deterministic record of every planning decision and
//! merge step of one render.
//!
//! The trace carries no wall-clock data, so two renders of the same project
//! produce byte-identical trace files.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use montage_common::MontageResult;
use montage_project_model::{Clip, LayerGroup};
use serde::Serialize;

use crate::canvas::Canvas;
use crate::gaps::Filler;
use crate::layers::Demotion;
use crate::transitions::{TransitionDecision, TransitionStyle};

/// Suffix appended to the output path for the trace file.
pub const TRACE_SUFFIX: &str = ".parity.trace.json";

/// Normalized view of one clip as the planner saw it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClipSnapshot {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub start: f64,
    pub duration: f64,
    pub effective_duration: f64,
    pub layer: i32,
    pub group: LayerGroup,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transition: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transition_with: Option<String>,
    pub transition_duration: f64,
}

impl ClipSnapshot {
    pub fn of(clip: &Clip) -> Self {
        let effects = clip.effects();
        Self {
            id: clip.id.clone(),
            kind: clip.kind_name(),
            start: clip.start_time,
            duration: clip.duration,
            effective_duration: clip.effective_duration(),
            layer: clip.layer,
            group: clip.group(),
            source_id: clip.source_id().map(str::to_string),
            transition: effects.transition.clone(),
            transition_with: effects.transition_with().map(str::to_string),
            transition_duration: effects.transition_duration(),
        }
    }
}

/// One step of the base-sequence assembly.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MergeStep {
    Gap {
        start: f64,
        duration: f64,
    },
    GapTail {
        start: f64,
        duration: f64,
    },
    Blank {
        duration: f64,
    },
    Clip {
        clip_id: String,
        duration: f64,
    },
    TransitionMerge {
        from_clip_id: String,
        to_clip_id: String,
        style: TransitionStyle,
        duration: f64,
        left_duration: f64,
        right_duration: f64,
        result_duration: f64,
        fallback_used: bool,
    },
    Concat {
        left_duration: f64,
        right_duration: f64,
        result_duration: f64,
    },
}

impl MergeStep {
    pub fn filler(filler: &Filler) -> Self {
        use crate::gaps::FillerKind;
        match filler.kind {
            FillerKind::Gap => MergeStep::Gap {
                start: filler.start,
                duration: filler.duration,
            },
            FillerKind::GapTail => MergeStep::GapTail {
                start: filler.start,
                duration: filler.duration,
            },
            FillerKind::Blank => MergeStep::Blank {
                duration: filler.duration,
            },
        }
    }
}

/// An audio clip left out of the mix.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SkippedAudio {
    pub clip_id: String,
    pub source_id: String,
    pub reason: &'static str,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TraceSummary {
    pub clip_count: usize,
    pub base_clip_count: usize,
    pub overlay_count: usize,
    pub audio_clip_count: usize,
    pub filler_count: usize,
    pub demoted_count: usize,
    pub accepted_transitions: usize,
    pub rejected_transitions: usize,
    pub fallback_transitions: usize,
    pub final_duration: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RenderTrace {
    pub canvas: Canvas,
    pub timeline_end: f64,
    pub base_layer: Option<i32>,
    pub clips: Vec<ClipSnapshot>,
    pub base_clip_ids: Vec<String>,
    pub overlay_clip_ids: Vec<String>,
    pub demotions: Vec<Demotion>,
    pub transition_decisions: Vec<TransitionDecision>,
    pub merge_steps: Vec<MergeStep>,
    pub skipped_audio: Vec<SkippedAudio>,
    pub summary: TraceSummary,
}

impl RenderTrace {
    /// Fill in summary counts derived from the recorded steps.
    pub fn summarize(&mut self, final_duration: f64) {
        let mut summary = TraceSummary {
            clip_count: self.clips.len(),
            base_clip_count: self.base_clip_ids.len(),
            overlay_count: self.overlay_clip_ids.len(),
            audio_clip_count: self.clips.iter().filter(|c| c.kind == "audio").count(),
            demoted_count: self.demotions.len(),
            final_duration,
            ..TraceSummary::default()
        };
        for decision in &self.transition_decisions {
            if decision.accepted {
                summary.accepted_transitions += 1;
            } else {
                summary.rejected_transitions += 1;
            }
        }
        for step in &self.merge_steps {
            match step {
                MergeStep::Gap { .. } | MergeStep::GapTail { .. } | MergeStep::Blank { .. } => {
                    summary.filler_count += 1
                }
                MergeStep::TransitionMerge {
                    fallback_used: true,
                    ..
                } => summary.fallback_transitions += 1,
                _ => {}
            }
        }
        self.summary = summary;
    }

    /// Write the trace as pretty JSON next to `output`.
    pub fn write_beside(&self, output: &Path) -> MontageResult<PathBuf> {
        let path = trace_path(output);
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(&path, json)?;
        tracing::info!(trace = %path.display(), "Parity trace written");
        Ok(path)
    }
}

/// `<output>.parity.trace.json`
pub fn trace_path(output: &Path) -> PathBuf {
    let mut name = OsString::from(output.as_os_str());
    name.push(TRACE_SUFFIX);
    PathBuf::from(name)
}
