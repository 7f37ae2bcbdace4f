//! Sequence compositing: fold the rendered base entries into one clip,
//! blending across accepted transitions and hard-cutting elsewhere.

use montage_common::MontageResult;

use crate::backend::{BackendJob, ConcatJob, TransitionJob};
use crate::context::RenderContext;
use crate::segment::Rendered;
use crate::trace::MergeStep;
use crate::transitions::TransitionStyle;

/// A rendered base entry awaiting merge.
#[derive(Debug, Clone)]
pub struct Piece {
    pub rendered: Rendered,
    /// Base clip index and id; `None` for fillers.
    pub clip: Option<(usize, String)>,
}

/// Shortest duration a transition merge may report.
const MIN_MERGED_DURATION: f64 = 0.01;

/// Left-fold `pieces` into a single composite. `transition_after(i)` yields
/// the accepted transition from base clip `i` into `i + 1`.
pub fn compose_sequence<F>(
    ctx: &RenderContext<'_>,
    pieces: Vec<Piece>,
    transition_after: F,
    steps: &mut Vec<MergeStep>,
) -> MontageResult<Rendered>
where
    F: Fn(usize) -> Option<(TransitionStyle, f64)>,
{
    let mut pieces = pieces.into_iter();
    let Some(first) = pieces.next() else {
        return Err(montage_common::MontageError::validation(
            "Base sequence is empty",
        ));
    };

    let mut running = first.rendered;
    let mut last_clip = first.clip;
    for next in pieces {
        let transition = match (&last_clip, &next.clip) {
            (Some((prev, _)), Some((index, _))) if *prev + 1 == *index => transition_after(*prev),
            _ => None,
        };
        running = match transition {
            Some((style, duration)) => {
                let from = last_clip.as_ref().map(|(_, id)| id.clone()).unwrap_or_default();
                let to = next.clip.as_ref().map(|(_, id)| id.clone()).unwrap_or_default();
                merge_with_transition(ctx, &running, &next.rendered, style, duration, (from, to), steps)?
            }
            None => concat(ctx, &running, &next.rendered, steps)?,
        };
        last_clip = next.clip;
    }
    Ok(running)
}

fn transition_job(
    ctx: &RenderContext<'_>,
    a: &Rendered,
    b: &Rendered,
    style: TransitionStyle,
    duration: f64,
) -> BackendJob {
    BackendJob::Transition(TransitionJob {
        first: a.path.clone(),
        second: b.path.clone(),
        style,
        duration,
        offset: (a.duration - duration).max(0.0),
        encoding: ctx.encoding(),
        output: ctx.artifact(&format!("xfade_{}", style.as_str()), "mp4"),
    })
}

/// Blend `a` into `b`. A backend failure of a non-default style is retried
/// once with [`TransitionStyle::FALLBACK`].
pub fn merge_with_transition(
    ctx: &RenderContext<'_>,
    a: &Rendered,
    b: &Rendered,
    style: TransitionStyle,
    duration: f64,
    (from_clip_id, to_clip_id): (String, String),
    steps: &mut Vec<MergeStep>,
) -> MontageResult<Rendered> {
    tracing::info!(
        from = %from_clip_id,
        to = %to_clip_id,
        style = style.as_str(),
        duration,
        "Merging with transition"
    );
    let (path, used, fallback_used) = match ctx.run(transition_job(ctx, a, b, style, duration)) {
        Ok(path) => (path, style, false),
        Err(err) if err.is_backend_failure() && style != TransitionStyle::FALLBACK => {
            tracing::warn!(
                style = style.as_str(),
                error = %err,
                "Transition style failed, retrying with fade"
            );
            let fallback = TransitionStyle::FALLBACK;
            let path = ctx.run(transition_job(ctx, a, b, fallback, duration))?;
            (path, fallback, true)
        }
        Err(err) => return Err(err),
    };

    let result = (a.duration + b.duration - duration).max(MIN_MERGED_DURATION);
    steps.push(MergeStep::TransitionMerge {
        from_clip_id,
        to_clip_id,
        style: used,
        duration,
        left_duration: a.duration,
        right_duration: b.duration,
        result_duration: result,
        fallback_used,
    });
    Ok(Rendered {
        path,
        duration: result,
    })
}

/// Hard-cut `a` then `b`.
pub fn concat(
    ctx: &RenderContext<'_>,
    a: &Rendered,
    b: &Rendered,
    steps: &mut Vec<MergeStep>,
) -> MontageResult<Rendered> {
    let job = ConcatJob {
        inputs: vec![a.path.clone(), b.path.clone()],
        list_path: ctx.artifact("concat_list", "txt"),
        output: ctx.artifact("concat", "mp4"),
    };
    let path = ctx.run(BackendJob::Concat(job))?;
    let result = a.duration + b.duration;
    tracing::debug!(left = a.duration, right = b.duration, result, "Concatenated");
    steps.push(MergeStep::Concat {
        left_duration: a.duration,
        right_duration: b.duration,
        result_duration: result,
    });
    Ok(Rendered {
        path,
        duration: result,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{MediaBackend, MediaInfo, MediaProbe};
    use crate::canvas::Canvas;
    use montage_common::MontageError;
    use std::cell::RefCell;
    use std::path::{Path, PathBuf};

    /// Fails every transition job whose style is in `failing`.
    #[derive(Default)]
    struct Backend {
        failing: Vec<TransitionStyle>,
        jobs: RefCell<Vec<BackendJob>>,
    }

    impl MediaBackend for Backend {
        fn run(&self, job: &BackendJob) -> MontageResult<()> {
            self.jobs.borrow_mut().push(job.clone());
            match job {
                BackendJob::Transition(t) if self.failing.contains(&t.style) => {
                    Err(MontageError::backend("transition", "No such filter"))
                }
                _ => Ok(()),
            }
        }
        fn is_available(&self) -> bool {
            true
        }
        fn name(&self) -> &str {
            "test"
        }
    }

    struct NoProbe;

    impl MediaProbe for NoProbe {
        fn probe(&self, _path: &Path) -> MontageResult<MediaInfo> {
            Ok(MediaInfo::default())
        }
    }

    fn piece(name: &str, duration: f64, clip: Option<usize>) -> Piece {
        Piece {
            rendered: Rendered {
                path: PathBuf::from(name),
                duration,
            },
            clip: clip.map(|i| (i, name.to_string())),
        }
    }

    fn run(
        backend: &Backend,
        pieces: Vec<Piece>,
        transition: Option<(TransitionStyle, f64)>,
    ) -> (MontageResult<Rendered>, Vec<MergeStep>) {
        let canvas = Canvas::default();
        let dir = PathBuf::from("work");
        let ctx = RenderContext::new(backend, &NoProbe, &canvas, &dir);
        let mut steps = Vec::new();
        let result = compose_sequence(&ctx, pieces, |i| if i == 0 { transition } else { None }, &mut steps);
        (result, steps)
    }

    #[test]
    fn test_concat_sums_durations() {
        let backend = Backend::default();
        let pieces = vec![
            piece("a", 4.0, Some(0)),
            piece("gap", 1.0 / 30.0, None),
            piece("b", 4.0, Some(1)),
        ];
        let (result, steps) = run(&backend, pieces, Some((TransitionStyle::Fade, 1.0)));
        let rendered = result.unwrap();
        // the filler separates the clips, so no transition is applied
        assert!((rendered.duration - (8.0 + 1.0 / 30.0)).abs() < 1e-9);
        assert_eq!(steps.len(), 2);
        assert!(steps.iter().all(|s| matches!(s, MergeStep::Concat { .. })));
    }

    #[test]
    fn test_transition_reduces_duration() {
        let backend = Backend::default();
        let pieces = vec![piece("a", 4.0, Some(0)), piece("b", 4.0, Some(1))];
        let (result, steps) = run(&backend, pieces, Some((TransitionStyle::Fade, 1.0)));
        assert_eq!(result.unwrap().duration, 7.0);
        match &backend.jobs.borrow()[0] {
            BackendJob::Transition(job) => {
                assert_eq!(job.offset, 3.0);
                assert_eq!(job.duration, 1.0);
            }
            other => panic!("unexpected job {other:?}"),
        }
        assert!(matches!(
            steps[0],
            MergeStep::TransitionMerge { fallback_used: false, .. }
        ));
    }

    #[test]
    fn test_failed_wipe_retries_with_fade() {
        let backend = Backend {
            failing: vec![TransitionStyle::WipeLeft],
            ..Backend::default()
        };
        let pieces = vec![piece("a", 2.0, Some(0)), piece("b", 2.0, Some(1))];
        let (result, steps) = run(&backend, pieces, Some((TransitionStyle::WipeLeft, 0.5)));
        assert_eq!(result.unwrap().duration, 3.5);
        assert_eq!(backend.jobs.borrow().len(), 2);
        match &steps[0] {
            MergeStep::TransitionMerge { style, fallback_used, .. } => {
                assert_eq!(*style, TransitionStyle::Fade);
                assert!(*fallback_used);
            }
            other => panic!("unexpected step {other:?}"),
        }
    }

    #[test]
    fn test_failed_fade_is_not_retried() {
        let backend = Backend {
            failing: vec![TransitionStyle::Fade],
            ..Backend::default()
        };
        let pieces = vec![piece("a", 2.0, Some(0)), piece("b", 2.0, Some(1))];
        let (result, steps) = run(&backend, pieces, Some((TransitionStyle::Fade, 0.5)));
        assert!(result.unwrap_err().is_backend_failure());
        assert_eq!(backend.jobs.borrow().len(), 1);
        assert!(steps.is_empty());
    }

    #[test]
    fn test_single_piece_passes_through() {
        let backend = Backend::default();
        let (result, steps) = run(&backend, vec![piece("a", 5.0, Some(0))], None);
        assert_eq!(result.unwrap().path, PathBuf::from("a"));
        assert!(steps.is_empty());
        assert!(backend.jobs.borrow().is_empty());
    }
}
