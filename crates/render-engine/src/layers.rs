//! Layer resolution: split clips into the base video sequence, the overlay
//! paint list and the audio mix list.

use std::cmp::Ordering;

use montage_project_model::{Clip, ClipKind};
use serde::Serialize;

use crate::gaps::BaseCursor;

/// A base-layer clip moved to the overlay pass because it starts before the
/// base sequence has reached it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Demotion {
    pub clip_id: String,
    pub start: f64,
    pub cursor: f64,
    pub reason: &'static str,
}

/// Result of layer resolution. Clips are borrowed from the timeline state.
#[derive(Debug, Clone, Default)]
pub struct LayerPlan<'a> {
    /// Lowest layer among video clips; `None` without video.
    pub base_layer: Option<i32>,
    /// Base sequence, sorted by start time, overlap-free.
    pub base: Vec<&'a Clip>,
    /// Overlay items in paint order (first painted first).
    pub overlays: Vec<&'a Clip>,
    /// Audio clips sorted by start time.
    pub audio: Vec<&'a Clip>,
    pub demotions: Vec<Demotion>,
}

fn by_start(a: &&Clip, b: &&Clip) -> Ordering {
    a.start_time.total_cmp(&b.start_time)
}

/// Paint order: group rank, then layer, then start. Stable for ties.
fn paint_order(a: &&Clip, b: &&Clip) -> Ordering {
    a.group()
        .rank()
        .cmp(&b.group().rank())
        .then(a.layer.cmp(&b.layer))
        .then(a.start_time.total_cmp(&b.start_time))
}

/// Resolve layers for clips given in document order.
pub fn resolve_layers<'a, I>(clips: I, fps: f64) -> LayerPlan<'a>
where
    I: IntoIterator<Item = &'a Clip>,
{
    let mut videos = Vec::new();
    let mut graphics = Vec::new();
    let mut audio = Vec::new();
    for clip in clips {
        match clip.kind {
            ClipKind::Video(_) => videos.push(clip),
            ClipKind::Image(_) | ClipKind::Text(_) | ClipKind::Shape(_) => graphics.push(clip),
            ClipKind::Audio(_) => audio.push(clip),
        }
    }

    let base_layer = videos.iter().map(|c| c.layer).min();
    let (mut candidates, mut overlays): (Vec<&Clip>, Vec<&Clip>) = videos
        .into_iter()
        .partition(|c| Some(c.layer) == base_layer);
    candidates.sort_by(by_start);

    let mut base = Vec::with_capacity(candidates.len());
    let mut demotions = Vec::new();
    let mut cursor = BaseCursor::new(fps);
    for clip in candidates {
        if cursor.overlaps(clip.start_time) {
            tracing::debug!(
                clip = %clip.id,
                start = clip.start_time,
                cursor = cursor.position(),
                "Overlapping base clip demoted to overlay"
            );
            demotions.push(Demotion {
                clip_id: clip.id.clone(),
                start: clip.start_time,
                cursor: cursor.position(),
                reason: "start_before_cursor",
            });
            overlays.push(clip);
            continue;
        }
        cursor.place(clip.start_time, clip.effective_duration());
        base.push(clip);
    }

    overlays.extend(graphics);
    overlays.sort_by(paint_order);
    audio.sort_by(by_start);

    LayerPlan {
        base_layer,
        base,
        overlays,
        audio,
        demotions,
    }
}
