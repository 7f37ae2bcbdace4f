//! Piecewise-linear keyframe interpolation.
//!
//! A [`KeyframeTrack`] holds `(time, value)` samples for one animated
//! property. Between samples the value is linearly interpolated; before the
//! first sample it holds the first value and after the last it holds the last.
//! The same law can be lowered to an ffmpeg expression in `t`.

use serde::Serialize;

use crate::clip::Keyframe;

/// Samples closer together than this are treated as the same time.
const TIME_EPSILON: f64 = 1e-4;

/// A sorted, deduplicated set of samples for one property.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct KeyframeTrack {
    points: Vec<(f64, f64)>,
}

impl KeyframeTrack {
    /// Build a track from unordered samples.
    ///
    /// Non-finite samples are dropped. Samples are sorted by time; when two
    /// share a time the later one in input order wins. An empty input yields
    /// a constant track at `fallback`.
    pub fn new(samples: impl IntoIterator<Item = (f64, f64)>, fallback: f64) -> Self {
        let mut points: Vec<(f64, f64)> = samples
            .into_iter()
            .filter(|(t, v)| t.is_finite() && v.is_finite())
            .collect();
        points.sort_by(|a, b| a.0.total_cmp(&b.0));

        let mut deduped: Vec<(f64, f64)> = Vec::with_capacity(points.len());
        for point in points {
            match deduped.last_mut() {
                Some(last) if (point.0 - last.0).abs() < TIME_EPSILON => *last = point,
                _ => deduped.push(point),
            }
        }

        if deduped.is_empty() {
            deduped.push((0.0, fallback));
        }
        Self { points: deduped }
    }

    /// A track that holds `value` for all time.
    pub fn constant(value: f64) -> Self {
        Self {
            points: vec![(0.0, value)],
        }
    }

    /// Build the track for one property of a clip's keyframes.
    ///
    /// `pick` extracts the property from a keyframe (`None` when the keyframe
    /// does not animate it). Absolute keyframe times are shifted by
    /// `-clip_start` so every sample lands on the clip-relative axis.
    pub fn from_keyframes<F>(keyframes: &[Keyframe], clip_start: f64, fallback: f64, pick: F) -> Self
    where
        F: Fn(&Keyframe) -> Option<f64>,
    {
        let samples = keyframes.iter().filter_map(|kf| {
            let value = pick(kf)?;
            let time = if kf.absolute {
                kf.time - clip_start
            } else {
                kf.time
            };
            Some((time, value))
        });
        Self::new(samples, fallback)
    }

    pub fn points(&self) -> &[(f64, f64)] {
        &self.points
    }

    /// Whether the track takes the same value everywhere.
    pub fn is_constant(&self) -> bool {
        let first = self.points[0].1;
        self.points.iter().all(|(_, v)| (v - first).abs() < 1e-9)
    }

    /// Evaluate the interpolation law at time `t`.
    pub fn value_at(&self, t: f64) -> f64 {
        let (first_t, first_v) = self.points[0];
        if t <= first_t {
            return first_v;
        }
        for pair in self.points.windows(2) {
            let (t0, v0) = pair[0];
            let (t1, v1) = pair[1];
            if t < t1 {
                let ratio = (t - t0) / (t1 - t0);
                return v0 + (v1 - v0) * ratio;
            }
        }
        self.points[self.points.len() - 1].1
    }

    /// Lower the law to an ffmpeg expression over the time variable `var`.
    ///
    /// `offset` is subtracted from `var` first, so an overlay evaluated on the
    /// composite timeline can use clip-relative samples.
    pub fn to_expr(&self, var: &str, offset: f64) -> String {
        if self.is_constant() {
            return format_number(self.points[0].1);
        }
        let local = if offset.abs() < 1e-9 {
            var.to_string()
        } else {
            format!("({var}-{})", format_number(offset))
        };

        let last = self.points[self.points.len() - 1].1;
        let mut expr = format_number(last);
        for pair in self.points.windows(2).rev() {
            let (t0, v0) = pair[0];
            let (t1, v1) = pair[1];
            let slope = (v1 - v0) / (t1 - t0);
            let segment = format!(
                "{}+({})*({local}-{})",
                format_number(v0),
                format_number(slope),
                format_number(t0)
            );
            expr = format!("if(lt({local},{}),{segment},{expr})", format_number(t1));
        }

        let (first_t, first_v) = self.points[0];
        format!(
            "if(lt({local},{}),{},{expr})",
            format_number(first_t),
            format_number(first_v)
        )
    }
}

/// Fixed-precision number formatting for filter expressions.
pub fn format_number(value: f64) -> String {
    let formatted = format!("{value:.6}");
    let trimmed = formatted.trim_end_matches('0').trim_end_matches('.');
    match trimmed {
        "" | "-" | "-0" => "0".to_string(),
        other => other.to_string(),
    }
}
