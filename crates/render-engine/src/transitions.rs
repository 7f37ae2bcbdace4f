//! Transition planning between adjacent base clips.
//!
//! A transition is only honoured when the two clips are frame-exact
//! neighbours, the author did not target a different neighbour, and the
//! requested style and duration are usable. Every pair yields a
//! [`TransitionDecision`], accepted or not, so the plan can be traced.

use montage_project_model::Clip;
use serde::Serialize;

/// Blend styles the compositor can render.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum TransitionStyle {
    #[serde(rename = "fade")]
    Fade,
    #[serde(rename = "wipeleft")]
    WipeLeft,
}

impl TransitionStyle {
    /// Style used when a requested style fails at the backend.
    pub const FALLBACK: TransitionStyle = TransitionStyle::Fade;

    /// Name understood by ffmpeg's `xfade=transition=`.
    pub fn as_str(self) -> &'static str {
        match self {
            TransitionStyle::Fade => "fade",
            TransitionStyle::WipeLeft => "wipeleft",
        }
    }
}

/// Map an author-supplied transition name onto a supported style.
pub fn normalize_transition(name: Option<&str>) -> Option<TransitionStyle> {
    let lowered = name?.trim().to_lowercase().replace(['_', '-'], " ");
    let key = lowered.split_whitespace().collect::<Vec<_>>().join(" ");
    match key.as_str() {
        "fade" | "cross fade" | "crossfade" => Some(TransitionStyle::Fade),
        k if k.contains("wipe") => Some(TransitionStyle::WipeLeft),
        _ => None,
    }
}

/// Why a transition was accepted or rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DecisionReason {
    Ok,
    GapNotAdjacentFrames,
    TransitionWithMismatch,
    MissingOrInvalidTransition,
}

impl DecisionReason {
    pub fn as_str(self) -> &'static str {
        match self {
            DecisionReason::Ok => "ok",
            DecisionReason::GapNotAdjacentFrames => "gap_not_adjacent_frames",
            DecisionReason::TransitionWithMismatch => "transition_with_mismatch",
            DecisionReason::MissingOrInvalidTransition => "missing_or_invalid_transition",
        }
    }
}

/// Decision for the edge between base clips `index` and `index + 1`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TransitionDecision {
    pub index: usize,
    pub from_clip_id: String,
    pub to_clip_id: String,
    pub gap_seconds: f64,
    pub gap_frames: i64,
    pub accepted: bool,
    pub reason: DecisionReason,
    pub normalized_transition: Option<TransitionStyle>,
    pub requested_duration: f64,
    /// Clamped duration, present when the request was otherwise usable.
    pub duration: Option<f64>,
    pub max_duration: Option<f64>,
}

impl TransitionDecision {
    /// Style and clamped duration when accepted.
    pub fn accepted_style(&self) -> Option<(TransitionStyle, f64)> {
        if !self.accepted {
            return None;
        }
        Some((self.normalized_transition?, self.duration?))
    }
}

/// Decide the transition from `prev` into `next`.
pub fn decide(index: usize, prev: &Clip, next: &Clip, fps: f64) -> TransitionDecision {
    let effects = prev.effects();
    let gap_seconds = next.start_time - prev.effective_end();
    let gap_frames = (gap_seconds * fps).round() as i64;
    let normalized = normalize_transition(effects.transition.as_deref());
    let requested_duration = effects.transition_duration();
    let usable = normalized.is_some() && requested_duration > 0.0;

    let reason = if gap_frames != 0 {
        DecisionReason::GapNotAdjacentFrames
    } else if !next.id.is_empty()
        && effects
            .transition_with()
            .is_some_and(|target| target != next.id)
    {
        DecisionReason::TransitionWithMismatch
    } else if !usable {
        DecisionReason::MissingOrInvalidTransition
    } else {
        DecisionReason::Ok
    };

    let max_duration = prev.effective_duration().min(next.effective_duration());
    let (duration, max_duration) = if usable {
        (
            Some(requested_duration.min(max_duration)),
            Some(max_duration),
        )
    } else {
        (None, None)
    };

    TransitionDecision {
        index,
        from_clip_id: prev.id.clone(),
        to_clip_id: next.id.clone(),
        gap_seconds,
        gap_frames,
        accepted: reason == DecisionReason::Ok,
        reason,
        normalized_transition: normalized,
        requested_duration,
        duration,
        max_duration,
    }
}

/// Decide every adjacent edge of the base sequence.
pub fn plan_transitions(base: &[&Clip], fps: f64) -> Vec<TransitionDecision> {
    base.windows(2)
        .enumerate()
        .map(|(index, pair)| {
            let decision = decide(index, pair[0], pair[1], fps);
            tracing::debug!(
                from = %decision.from_clip_id,
                to = %decision.to_clip_id,
                gap_frames = decision.gap_frames,
                reason = decision.reason.as_str(),
                "Transition decision"
            );
            decision
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    fn clip(id: &str, start: f64, duration: f64, effects: serde_json::Value) -> Clip {
        serde_json::from_value(json!({
            "id": id,
            "type": "video",
            "sourceId": "src",
            "startTime": start,
            "duration": duration,
            "effects": effects,
        }))
        .unwrap()
    }

    #[test]
    fn test_normalize_synonyms() {
        for name in ["fade", "Cross Fade", "cross-fade", "CROSS_FADE", "crossfade", " cross   fade "] {
            assert_eq!(normalize_transition(Some(name)), Some(TransitionStyle::Fade), "{name}");
        }
        for name in ["wipe", "Wipe Left", "wipe_right", "swipe"] {
            assert_eq!(normalize_transition(Some(name)), Some(TransitionStyle::WipeLeft), "{name}");
        }
        assert_eq!(normalize_transition(Some("zoom")), None);
        assert_eq!(normalize_transition(Some("dissolve")), None);
        assert_eq!(normalize_transition(Some("Cross Dissolve")), None);
        assert_eq!(normalize_transition(Some("")), None);
        assert_eq!(normalize_transition(None), None);
    }

    #[test]
    fn test_adjacent_fade_is_accepted() {
        let a = clip("a", 0.0, 4.0, json!({"transition": "fade", "transitionDuration": 1.0}));
        let b = clip("b", 4.0, 4.0, json!({}));
        let d = decide(0, &a, &b, 30.0);
        assert!(d.accepted);
        assert_eq!(d.reason, DecisionReason::Ok);
        assert_eq!(d.accepted_style(), Some((TransitionStyle::Fade, 1.0)));
    }

    #[test]
    fn test_one_frame_gap_is_rejected() {
        let a = clip("a", 0.0, 4.0, json!({"transition": "fade", "transitionDuration": 1.0}));
        let b = clip("b", 4.0 + 1.0 / 30.0, 4.0, json!({}));
        let d = decide(0, &a, &b, 30.0);
        assert!(!d.accepted);
        assert_eq!(d.reason, DecisionReason::GapNotAdjacentFrames);
        assert_eq!(d.gap_frames, 1);
        assert_eq!(d.accepted_style(), None);
    }

    #[test]
    fn test_gap_check_runs_before_target_check() {
        let a = clip(
            "a",
            0.0,
            4.0,
            json!({"transition": "fade", "transitionDuration": 1.0, "transitionWith": "zzz"}),
        );
        let b = clip("b", 5.0, 4.0, json!({}));
        assert_eq!(decide(0, &a, &b, 30.0).reason, DecisionReason::GapNotAdjacentFrames);
    }

    #[test]
    fn test_transition_with_must_match_neighbor() {
        let effects = json!({"transition": "wipe", "transitionDuration": 0.5, "transitionWith": "c"});
        let a = clip("a", 0.0, 2.0, effects);
        let b = clip("b", 2.0, 2.0, json!({}));
        let d = decide(0, &a, &b, 30.0);
        assert_eq!(d.reason, DecisionReason::TransitionWithMismatch);

        let c = clip("c", 2.0, 2.0, json!({}));
        let d = decide(0, &a, &c, 30.0);
        assert_eq!(d.accepted_style(), Some((TransitionStyle::WipeLeft, 0.5)));
    }

    #[test]
    fn test_transition_with_ignored_for_unnamed_neighbor() {
        let effects = json!({"transition": "fade", "transitionDuration": 0.5, "transitionWith": "c"});
        let a = clip("a", 0.0, 2.0, effects);
        let unnamed = clip("", 2.0, 2.0, json!({}));
        let d = decide(0, &a, &unnamed, 30.0);
        assert!(d.accepted);
        assert_eq!(d.reason, DecisionReason::Ok);
    }

    #[test]
    fn test_duration_is_clamped_to_shorter_clip() {
        let a = clip("a", 0.0, 4.0, json!({"transition": "fade", "transitionDuration": 3.0}));
        let b = clip("b", 4.0, 1.5, json!({}));
        let d = decide(0, &a, &b, 30.0);
        assert_eq!(d.duration, Some(1.5));
        assert_eq!(d.max_duration, Some(1.5));
        assert_eq!(d.requested_duration, 3.0);
    }

    #[test]
    fn test_missing_or_zero_duration_rejected() {
        let b = clip("b", 4.0, 4.0, json!({}));
        let unnamed = clip("a", 0.0, 4.0, json!({"transitionDuration": 1.0}));
        let zero = clip("a", 0.0, 4.0, json!({"transition": "fade", "transitionDuration": 0.0}));
        let unknown = clip("a", 0.0, 4.0, json!({"transition": "spin", "transitionDuration": 1.0}));
        for prev in [&unnamed, &zero, &unknown] {
            let d = decide(0, prev, &b, 30.0);
            assert_eq!(d.reason, DecisionReason::MissingOrInvalidTransition);
            assert_eq!(d.duration, None);
        }
    }

    #[test]
    fn test_plan_covers_every_edge() {
        let a = clip("a", 0.0, 2.0, json!({"transition": "fade", "transitionDuration": 0.5}));
        let b = clip("b", 2.0, 2.0, json!({}));
        let c = clip("c", 4.0, 2.0, json!({}));
        let plan = plan_transitions(&[&a, &b, &c], 30.0);
        assert_eq!(plan.len(), 2);
        assert_eq!(plan[0].index, 0);
        assert!(plan[0].accepted);
        assert_eq!(plan[1].to_clip_id, "c");
        assert_eq!(plan[1].reason, DecisionReason::MissingOrInvalidTransition);
        assert!(plan_transitions(&[&a], 30.0).is_empty());
    }

    proptest! {
        #[test]
        fn prop_acceptance_law(
            gap_frames in -3i64..4,
            named in any::<bool>(),
            duration in -1.0f64..3.0,
            targeted in prop::option::of(any::<bool>()),
        ) {
            let fps = 30.0;
            let mut effects = json!({"transitionDuration": duration});
            if named {
                effects["transition"] = json!("cross fade");
            }
            match targeted {
                Some(true) => effects["transitionWith"] = json!("b"),
                Some(false) => effects["transitionWith"] = json!("other"),
                None => {}
            }
            let a = clip("a", 0.0, 4.0, effects);
            let b = clip("b", 4.0 + gap_frames as f64 / fps, 4.0, json!({}));
            let d = decide(0, &a, &b, fps);

            let expected = gap_frames == 0 && targeted != Some(false) && named && duration > 0.0;
            prop_assert_eq!(d.accepted, expected);
            if gap_frames != 0 {
                prop_assert_eq!(d.reason, DecisionReason::GapNotAdjacentFrames);
            } else if targeted == Some(false) {
                prop_assert_eq!(d.reason, DecisionReason::TransitionWithMismatch);
            } else if !(named && duration > 0.0) {
                prop_assert_eq!(d.reason, DecisionReason::MissingOrInvalidTransition);
            }
            if let Some((_, clamped)) = d.accepted_style() {
                prop_assert!(clamped <= 4.0 && clamped > 0.0);
            }
        }
    }
}
