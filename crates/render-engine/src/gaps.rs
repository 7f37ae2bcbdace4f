//! Base-sequence cursor and gap fillers.
//!
//! Gaps between base clips are covered by black, silent filler segments so
//! the concatenated base always spans the whole timeline.

use montage_project_model::Clip;
use serde::Serialize;

/// Timing slack, in seconds, for overlap and gap detection.
pub const GAP_TOLERANCE: f64 = 0.01;

/// Length of the blank base when a project has no base video at all.
pub const MIN_BLANK_DURATION: f64 = 1.0;

/// Running end of the base sequence.
///
/// A gap only counts when it exceeds [`GAP_TOLERANCE`] and rounds to at least
/// one frame; smaller gaps are treated as frame-exact adjacency. Placing a
/// clip always snaps the cursor to its start, so gaps are measured from the
/// previous clip's end the same way transition decisions measure them.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BaseCursor {
    position: f64,
    fps: f64,
}

impl BaseCursor {
    pub fn new(fps: f64) -> Self {
        Self { position: 0.0, fps }
    }

    pub fn position(&self) -> f64 {
        self.position
    }

    /// Whether a clip starting at `start` would overlap the placed sequence.
    pub fn overlaps(&self, start: f64) -> bool {
        start < self.position - GAP_TOLERANCE
    }

    /// Gap before `until` that needs a filler, if any.
    pub fn fillable_gap(&self, until: f64) -> Option<f64> {
        let gap = until - self.position;
        let frames = (gap * self.fps).round();
        (gap > GAP_TOLERANCE && frames >= 1.0).then_some(gap)
    }

    /// Place a clip. Returns the gap jumped over to reach its start.
    pub fn place(&mut self, start: f64, duration: f64) -> Option<f64> {
        let gap = self.fillable_gap(start);
        if !self.overlaps(start) {
            self.position = start;
        }
        self.position += duration;
        gap
    }
}

/// Why a filler exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FillerKind {
    /// Between two base clips.
    Gap,
    /// After the last base clip, up to the timeline end.
    GapTail,
    /// The whole base, when there is no base video.
    Blank,
}

impl FillerKind {
    pub fn as_str(self) -> &'static str {
        match self {
            FillerKind::Gap => "gap",
            FillerKind::GapTail => "gap_tail",
            FillerKind::Blank => "blank",
        }
    }
}

/// A synthetic black/silent segment.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Filler {
    pub kind: FillerKind,
    pub start: f64,
    pub duration: f64,
}

impl Filler {
    pub fn end(&self) -> f64 {
        self.start + self.duration
    }
}

/// One entry of the base sequence, in playback order.
#[derive(Debug, Clone, PartialEq)]
pub enum BaseEntry<'a> {
    /// A base clip and its index in the base clip list.
    Clip { index: usize, clip: &'a Clip },
    Filler(Filler),
}

impl BaseEntry<'_> {
    /// Planned duration before rendering.
    pub fn planned_duration(&self) -> f64 {
        match self {
            BaseEntry::Clip { clip, .. } => clip.effective_duration(),
            BaseEntry::Filler(filler) => filler.duration,
        }
    }
}

/// Interleave fillers with the base clips.
pub fn fill_gaps<'a>(base: &[&'a Clip], timeline_end: f64, fps: f64) -> Vec<BaseEntry<'a>> {
    if base.is_empty() {
        let duration = timeline_end.max(MIN_BLANK_DURATION);
        tracing::debug!(duration, "No base video, using a blank base");
        return vec![BaseEntry::Filler(Filler {
            kind: FillerKind::Blank,
            start: 0.0,
            duration,
        })];
    }

    let mut entries = Vec::with_capacity(base.len() * 2);
    let mut cursor = BaseCursor::new(fps);
    for (index, clip) in base.iter().copied().enumerate() {
        let from = cursor.position();
        if let Some(gap) = cursor.place(clip.start_time, clip.effective_duration()) {
            entries.push(BaseEntry::Filler(Filler {
                kind: FillerKind::Gap,
                start: from,
                duration: gap,
            }));
        }
        entries.push(BaseEntry::Clip { index, clip });
    }

    if let Some(tail) = cursor.fillable_gap(timeline_end) {
        entries.push(BaseEntry::Filler(Filler {
            kind: FillerKind::GapTail,
            start: cursor.position(),
            duration: tail,
        }));
    }
    entries
}

#[cfg(test)]
mod tests {
    use super::*;

    fn video(id: &str, start: f64, duration: f64) -> Clip {
        serde_json::from_value(serde_json::json!({
            "id": id, "type": "video", "sourceId": "s", "startTime": start, "duration": duration
        }))
        .unwrap()
    }

    fn kinds(entries: &[BaseEntry<'_>]) -> Vec<String> {
        entries
            .iter()
            .map(|e| match e {
                BaseEntry::Clip { clip, .. } => clip.id.clone(),
                BaseEntry::Filler(f) => f.kind.as_str().to_string(),
            })
            .collect()
    }

    #[test]
    fn test_no_base_video_yields_one_blank() {
        let entries = fill_gaps(&[], 0.4, 30.0);
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].planned_duration(), MIN_BLANK_DURATION);

        let entries = fill_gaps(&[], 7.5, 30.0);
        assert_eq!(entries[0].planned_duration(), 7.5);
    }

    #[test]
    fn test_leading_interior_and_tail_gaps() {
        let a = video("a", 1.0, 2.0);
        let b = video("b", 4.0, 2.0);
        let entries = fill_gaps(&[&a, &b], 8.0, 30.0);
        assert_eq!(kinds(&entries), vec!["gap", "a", "gap", "b", "gap_tail"]);

        let durations: Vec<f64> = entries.iter().map(BaseEntry::planned_duration).collect();
        assert_eq!(durations, vec![1.0, 2.0, 1.0, 2.0, 2.0]);
    }

    #[test]
    fn test_sub_frame_gap_is_adjacent() {
        let a = video("a", 0.0, 2.0);
        let b = video("b", 2.012, 2.0);
        let entries = fill_gaps(&[&a, &b], 4.012, 30.0);
        assert_eq!(kinds(&entries), vec!["a", "b"]);
    }

    #[test]
    fn test_sub_frame_offsets_do_not_accumulate() {
        let a = video("a", 0.0, 2.0);
        let b = video("b", 2.012, 2.0);
        let c = video("c", 4.024, 2.0);
        let entries = fill_gaps(&[&a, &b, &c], c.end(), 30.0);
        assert_eq!(kinds(&entries), vec!["a", "b", "c"]);

        let mut cursor = BaseCursor::new(30.0);
        cursor.place(0.0, 2.0);
        cursor.place(2.012, 2.0);
        assert!((cursor.position() - 4.012).abs() < 1e-9);
    }

    #[test]
    fn test_one_frame_gap_gets_filler() {
        let a = video("a", 0.0, 4.0);
        let b = video("b", 4.0 + 1.0 / 30.0, 4.0);
        let entries = fill_gaps(&[&a, &b], b.end(), 30.0);
        assert_eq!(kinds(&entries), vec!["a", "gap", "b"]);
        assert!((entries[1].planned_duration() - 1.0 / 30.0).abs() < 1e-9);
    }

    #[test]
    fn test_cursor_overlap_tolerance() {
        let mut cursor = BaseCursor::new(30.0);
        cursor.place(0.0, 5.0);
        assert!(!cursor.overlaps(4.995));
        assert!(cursor.overlaps(4.9));
    }
}
