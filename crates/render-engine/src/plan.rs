//! The deterministic composition plan: everything decided before the first
//! backend command runs.

use montage_project_model::{Clip, TimelineState};
use serde::Serialize;

use crate::canvas::Canvas;
use crate::gaps::{fill_gaps, BaseEntry, Filler};
use crate::layers::{resolve_layers, Demotion, LayerPlan};
use crate::trace::ClipSnapshot;
use crate::transitions::{plan_transitions, TransitionDecision, TransitionStyle};

/// Edge-fade suppression for one base clip.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EdgeOverrides {
    /// An accepted transition blends into this clip.
    pub incoming: bool,
    /// An accepted transition blends out of this clip.
    pub outgoing: bool,
}

#[derive(Debug, Clone)]
pub struct CompositionPlan<'a> {
    pub canvas: Canvas,
    pub timeline_end: f64,
    pub layers: LayerPlan<'a>,
    pub entries: Vec<BaseEntry<'a>>,
    pub decisions: Vec<TransitionDecision>,
}

impl<'a> CompositionPlan<'a> {
    /// Resolve layers, fill gaps and decide transitions for `state` on an
    /// already resolved canvas.
    pub fn build(state: &'a TimelineState, canvas: Canvas) -> Self {
        let timeline_end = state.timeline_end();
        let layers = resolve_layers(state.clips(), canvas.fps);
        let entries = fill_gaps(&layers.base, timeline_end, canvas.fps);
        let decisions = plan_transitions(&layers.base, canvas.fps);
        tracing::info!(
            timeline_end,
            base = layers.base.len(),
            overlays = layers.overlays.len(),
            audio = layers.audio.len(),
            entries = entries.len(),
            accepted = decisions.iter().filter(|d| d.accepted).count(),
            "Composition planned"
        );
        Self {
            canvas,
            timeline_end,
            layers,
            entries,
            decisions,
        }
    }

    /// Accepted transition from base clip `index` into `index + 1`.
    pub fn transition_after(&self, index: usize) -> Option<(TransitionStyle, f64)> {
        self.decisions.get(index)?.accepted_style()
    }

    pub fn edge_overrides(&self, index: usize) -> EdgeOverrides {
        EdgeOverrides {
            incoming: index
                .checked_sub(1)
                .and_then(|prev| self.transition_after(prev))
                .is_some(),
            outgoing: self.transition_after(index).is_some(),
        }
    }

    pub fn summary(&self) -> PlanSummary {
        PlanSummary {
            canvas: self.canvas.clone(),
            timeline_end: self.timeline_end,
            base_layer: self.layers.base_layer,
            base: self.entries.iter().map(PlannedEntry::from).collect(),
            overlays: snapshots(&self.layers.overlays),
            audio: snapshots(&self.layers.audio),
            demotions: self.layers.demotions.clone(),
            transition_decisions: self.decisions.clone(),
        }
    }
}

fn snapshots(clips: &[&Clip]) -> Vec<ClipSnapshot> {
    clips.iter().map(|c| ClipSnapshot::of(c)).collect()
}

/// Serializable view of a plan, printed by `montage plan`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlanSummary {
    pub canvas: Canvas,
    pub timeline_end: f64,
    pub base_layer: Option<i32>,
    pub base: Vec<PlannedEntry>,
    pub overlays: Vec<ClipSnapshot>,
    pub audio: Vec<ClipSnapshot>,
    pub demotions: Vec<Demotion>,
    pub transition_decisions: Vec<TransitionDecision>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "entry", rename_all = "snake_case")]
pub enum PlannedEntry {
    Clip { clip_id: String, start: f64, duration: f64 },
    Filler(Filler),
}

impl From<&BaseEntry<'_>> for PlannedEntry {
    fn from(entry: &BaseEntry<'_>) -> Self {
        match entry {
            BaseEntry::Clip { clip, .. } => PlannedEntry::Clip {
                clip_id: clip.id.clone(),
                start: clip.start_time,
                duration: clip.effective_duration(),
            },
            BaseEntry::Filler(filler) => PlannedEntry::Filler(*filler),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn state(clips: serde_json::Value) -> TimelineState {
        serde_json::from_value(json!({"tracks": [{"clips": clips}]})).unwrap()
    }

    #[test]
    fn test_edge_overrides_follow_accepted_transitions() {
        let state = state(json!([
            {"id": "a", "type": "video", "sourceId": "s", "duration": 4,
             "effects": {"transition": "fade", "transitionDuration": 1}},
            {"id": "b", "type": "video", "sourceId": "s", "startTime": 4, "duration": 4,
             "effects": {"transition": "fade", "transitionDuration": 1}},
            {"id": "c", "type": "video", "sourceId": "s", "startTime": 9, "duration": 4}
        ]));
        let plan = CompositionPlan::build(&state, Canvas::default());
        assert_eq!(
            plan.edge_overrides(0),
            EdgeOverrides { incoming: false, outgoing: true }
        );
        // b -> c crosses a 1s gap
        assert_eq!(
            plan.edge_overrides(1),
            EdgeOverrides { incoming: true, outgoing: false }
        );
        assert_eq!(plan.edge_overrides(2), EdgeOverrides::default());
    }

    #[test]
    fn test_accepted_transition_has_no_filler_between_partners() {
        let state = state(json!([
            {"id": "a", "type": "video", "sourceId": "s", "duration": 2},
            {"id": "b", "type": "video", "sourceId": "s", "startTime": 2.012, "duration": 2,
             "effects": {"transition": "fade", "transitionDuration": 0.5}},
            {"id": "c", "type": "video", "sourceId": "s", "startTime": 4.024, "duration": 2}
        ]));
        let plan = CompositionPlan::build(&state, Canvas::default());
        assert!(plan.decisions[1].accepted);
        assert!(plan
            .entries
            .iter()
            .all(|e| matches!(e, BaseEntry::Clip { .. })));
        assert!(plan.edge_overrides(2).incoming);
    }

    #[test]
    fn test_summary_serializes_entries() {
        let state = state(json!([
            {"id": "a", "type": "video", "sourceId": "s", "startTime": 1, "duration": 2},
            {"id": "t", "type": "text", "text": "hi", "duration": 5}
        ]));
        let plan = CompositionPlan::build(&state, Canvas::default());
        let value = serde_json::to_value(plan.summary()).unwrap();
        let base = value["base"].as_array().unwrap();
        assert_eq!(base.len(), 3);
        assert_eq!(base[0]["entry"], "filler");
        assert_eq!(base[0]["kind"], "gap");
        assert_eq!(base[0]["start"], 0.0);
        assert_eq!(base[1]["clip_id"], "a");
        assert_eq!(base[2]["duration"], 2.0);
        assert_eq!(value["overlays"][0]["id"], "t");
    }
}
