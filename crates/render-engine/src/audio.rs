//! Audio pass: trim standalone audio clips and mix them into the composite.

use std::path::Path;

use montage_common::{MontageError, MontageResult};
use montage_project_model::{Clip, ClipKind, MIN_SEGMENT_DURATION};

use crate::backend::{AudioMixJob, AudioTrimJob, BackendJob};
use crate::context::RenderContext;
use crate::segment::{sanitize, Rendered};
use crate::storage::{MediaSources, StorageResolver};
use crate::trace::SkippedAudio;

/// Mix `audio` into `base` starting at `at` seconds. The composite keeps
/// its video and its duration.
pub fn mix_into(
    ctx: &RenderContext<'_>,
    base: Rendered,
    audio: &Path,
    at: f64,
    label: &str,
) -> MontageResult<Rendered> {
    if !probe_audio(ctx, audio) {
        return Err(MontageError::backend(
            "audio_mix",
            "Provided audio file has no audio stream",
        ));
    }
    let base_has_audio = probe_audio(ctx, &base.path);
    let job = AudioMixJob {
        base: base.path.clone(),
        audio: audio.to_path_buf(),
        at,
        volume: 1.0,
        base_has_audio,
        max_duration: base.duration,
        output: ctx.artifact(&format!("mix_{}", sanitize(label)), "mp4"),
    };
    tracing::info!(clip = label, at, base_has_audio, "Mixing audio");
    Ok(Rendered {
        path: ctx.run(BackendJob::AudioMix(job))?,
        duration: base.duration,
    })
}

fn probe_audio(ctx: &RenderContext<'_>, path: &Path) -> bool {
    ctx.probe.has_audio(path).unwrap_or_else(|err| {
        tracing::warn!(path = %path.display(), error = %err, "Audio probe failed");
        false
    })
}

/// Trim, scale and fade each standalone audio clip, then mix it in at its
/// start time. Clips whose source is a video source are skipped and recorded
/// in `skipped`; clips with a non-positive volume are skipped silently.
pub fn mix_audio_clips(
    ctx: &RenderContext<'_>,
    clips: &[&Clip],
    base: Rendered,
    media: &MediaSources,
    storage: &dyn StorageResolver,
    skipped: &mut Vec<SkippedAudio>,
) -> MontageResult<Rendered> {
    let mut current = base;
    for clip in clips {
        let ClipKind::Audio(audio) = &clip.kind else {
            continue;
        };
        if media.is_video_source(&audio.source_id) {
            tracing::debug!(
                clip = %clip.id,
                source = %audio.source_id,
                "Audio clip references a video source, already in the base"
            );
            skipped.push(SkippedAudio {
                clip_id: clip.id.clone(),
                source_id: audio.source_id.clone(),
                reason: "video_source_audio_in_base",
            });
            continue;
        }
        let volume = audio.effects.volume();
        if volume <= 0.0 {
            tracing::debug!(clip = %clip.id, volume, "Muted audio clip skipped");
            continue;
        }

        let input = media.asset_path(storage, &audio.source_id)?;
        let duration = clip.duration.max(MIN_SEGMENT_DURATION);
        let trim = AudioTrimJob {
            input,
            start: audio.trim_start.max(0.0),
            duration,
            volume,
            fade_in: audio.effects.audio_fade_in(),
            fade_out: audio.effects.audio_fade_out(),
            output: ctx.artifact(&format!("audio_{}", sanitize(&clip.id)), "m4a"),
        };
        tracing::info!(
            clip = %clip.id,
            start = clip.start_time,
            duration,
            volume,
            "Trimming audio clip"
        );
        let trimmed = ctx.run(BackendJob::AudioTrim(trim))?;
        current = mix_into(ctx, current, &trimmed, clip.start_time, &clip.id)?;
    }
    Ok(current)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{MediaBackend, MediaInfo, MediaProbe};
    use crate::canvas::Canvas;
    use crate::storage::LocalStorage;
    use std::cell::RefCell;
    use std::collections::BTreeMap;
    use std::path::PathBuf;

    #[derive(Default)]
    struct Recorder {
        jobs: RefCell<Vec<BackendJob>>,
    }

    impl MediaBackend for Recorder {
        fn run(&self, job: &BackendJob) -> MontageResult<()> {
            self.jobs.borrow_mut().push(job.clone());
            Ok(())
        }
        fn is_available(&self) -> bool {
            true
        }
        fn name(&self) -> &str {
            "recorder"
        }
    }

    /// Reports audio for every path except those ending in `silent.mp4`.
    struct Probe;

    impl MediaProbe for Probe {
        fn probe(&self, path: &Path) -> MontageResult<MediaInfo> {
            Ok(MediaInfo {
                has_audio: !path.ends_with("silent.mp4"),
                ..MediaInfo::default()
            })
        }
    }

    fn audio_clip(id: &str, source: &str, effects: serde_json::Value) -> Clip {
        serde_json::from_value(serde_json::json!({
            "id": id, "type": "audio", "sourceId": source,
            "startTime": 1.5, "duration": 3, "trimStart": 2, "effects": effects
        }))
        .unwrap()
    }

    #[test]
    fn test_audio_pass_skips_and_mixes() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("music.mp3"), b"x").unwrap();
        let storage = LocalStorage::new(dir.path());
        let media = MediaSources {
            sources: BTreeMap::from([("v".to_string(), "video.mp4".to_string())]),
            assets: BTreeMap::from([("m".to_string(), "music.mp3".to_string())]),
        };
        let clips = [
            audio_clip("from-video", "v", serde_json::json!({})),
            audio_clip("muted", "m", serde_json::json!({"volume": 0})),
            audio_clip("music", "m", serde_json::json!({"volume": 0.5, "fadeOut": 1})),
        ];
        let refs: Vec<&Clip> = clips.iter().collect();

        let backend = Recorder::default();
        let canvas = Canvas::default();
        let ctx = RenderContext::new(&backend, &Probe, &canvas, dir.path());
        let base = Rendered {
            path: PathBuf::from("base.mp4"),
            duration: 8.0,
        };
        let mut skipped = Vec::new();
        let out = mix_audio_clips(&ctx, &refs, base, &media, &storage, &mut skipped).unwrap();
        assert_eq!(out.duration, 8.0);
        assert_eq!(skipped.len(), 1);
        assert_eq!(skipped[0].clip_id, "from-video");

        let jobs = backend.jobs.borrow();
        assert_eq!(jobs.len(), 2);
        match (&jobs[0], &jobs[1]) {
            (BackendJob::AudioTrim(trim), BackendJob::AudioMix(mix)) => {
                assert_eq!(trim.start, 2.0);
                assert_eq!(trim.duration, 3.0);
                assert_eq!(trim.volume, 0.5);
                assert_eq!(trim.fade_out, 1.0);
                assert_eq!(mix.at, 1.5);
                assert_eq!(mix.volume, 1.0);
                assert_eq!(mix.max_duration, 8.0);
                assert!(mix.base_has_audio);
            }
            other => panic!("unexpected jobs {other:?}"),
        }
    }

    #[test]
    fn test_mix_without_audio_stream_fails() {
        let backend = Recorder::default();
        let canvas = Canvas::default();
        let dir = PathBuf::from("work");
        let ctx = RenderContext::new(&backend, &Probe, &canvas, &dir);
        let base = Rendered {
            path: PathBuf::from("base.mp4"),
            duration: 2.0,
        };
        let err = mix_into(&ctx, base, Path::new("silent.mp4"), 0.0, "x").unwrap_err();
        assert!(err.is_backend_failure());
        assert!(backend.jobs.borrow().is_empty());
    }

    #[test]
    fn test_missing_asset_fails() {
        let clips = [audio_clip("a", "nope", serde_json::json!({}))];
        let refs: Vec<&Clip> = clips.iter().collect();
        let backend = Recorder::default();
        let canvas = Canvas::default();
        let dir = PathBuf::from("work");
        let ctx = RenderContext::new(&backend, &Probe, &canvas, &dir);
        let base = Rendered {
            path: PathBuf::from("base.mp4"),
            duration: 2.0,
        };
        let result = mix_audio_clips(
            &ctx,
            &refs,
            base,
            &MediaSources::default(),
            &LocalStorage::new("."),
            &mut Vec::new(),
        );
        assert!(matches!(
            result,
            Err(MontageError::UnresolvedReference { .. })
        ));
    }
}
