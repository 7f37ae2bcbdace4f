//! Render driver: runs the planning and execution stages in order and
//! publishes the result.

use std::path::{Path, PathBuf};

use montage_common::{MontageError, MontageResult};
use montage_project_model::{Clip, OutputSettings, TimelineState};
use serde::Serialize;

use crate::audio::mix_audio_clips;
use crate::backend::{MediaBackend, MediaProbe};
use crate::canvas::{resolve_canvas, Canvas};
use crate::context::RenderContext;
use crate::gaps::BaseEntry;
use crate::overlay::composite_overlays;
use crate::plan::CompositionPlan;
use crate::segment::{render_blank, render_segment};
use crate::sequence::{compose_sequence, Piece};
use crate::storage::{MediaSources, StorageResolver};
use crate::trace::{ClipSnapshot, MergeStep, RenderTrace};

/// Progress callback, invoked at each stage boundary.
pub type ProgressCallback = Box<dyn Fn(RenderStage) + Send>;

/// Stages of one render, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RenderStage {
    Validating,
    ResolvingCanvas,
    Planning,
    RenderingSegments,
    CompositingSequence,
    CompositingOverlays,
    MixingAudio,
    Finalizing,
    Complete,
}

#[derive(Default)]
pub struct RenderOptions {
    /// Record the parity trace, return it and write it beside the output.
    pub trace: bool,
    /// Parent of the per-render working directory. `None` uses the system
    /// temp dir.
    pub temp_root: Option<PathBuf>,
    pub progress: Option<ProgressCallback>,
}

impl RenderOptions {
    fn report(&self, stage: RenderStage) {
        tracing::info!(stage = ?stage, "Render stage");
        if let Some(cb) = &self.progress {
            cb(stage);
        }
    }
}

/// Outcome of a successful render.
#[derive(Debug, Clone, Serialize)]
pub struct RenderReport {
    pub output: PathBuf,
    /// Duration of the composite, in seconds.
    pub duration: f64,
    pub canvas: Canvas,
    pub clip_count: usize,
    pub base_clip_count: usize,
    pub overlay_count: usize,
    pub audio_clip_count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trace_path: Option<PathBuf>,
    #[serde(skip)]
    pub trace: Option<RenderTrace>,
}

/// Timeline renderer over pluggable collaborators.
pub struct Renderer<'a> {
    backend: &'a dyn MediaBackend,
    probe: &'a dyn MediaProbe,
    storage: &'a dyn StorageResolver,
}

impl<'a> Renderer<'a> {
    pub fn new(
        backend: &'a dyn MediaBackend,
        probe: &'a dyn MediaProbe,
        storage: &'a dyn StorageResolver,
    ) -> Self {
        Self {
            backend,
            probe,
            storage,
        }
    }

    /// Check the project and settings before any backend work.
    pub fn validate(&self, state: &TimelineState, settings: &OutputSettings) -> MontageResult<()> {
        if state.is_empty() {
            return Err(MontageError::EmptyProject);
        }
        let mut issues = state.validation_issues();
        for issue in settings.validation_issues() {
            if !issues.contains(&issue) {
                issues.push(issue);
            }
        }
        if !issues.is_empty() {
            return Err(MontageError::validation(issues.join("; ")));
        }
        Ok(())
    }

    /// Resolve the canvas, probing the first video clip's source only when
    /// the settings leave a field open.
    pub fn resolve_canvas(
        &self,
        state: &TimelineState,
        media: &MediaSources,
        settings: &OutputSettings,
    ) -> MontageResult<Canvas> {
        let first_video = state
            .clips()
            .find_map(Clip::as_video)
            .map(|video| media.source_path(self.storage, &video.source_id))
            .transpose()?;
        Ok(resolve_canvas(
            settings,
            first_video.as_deref().map(|path| (self.probe, path)),
        ))
    }

    /// Validate and plan without running any backend job.
    pub fn plan<'s>(
        &self,
        state: &'s TimelineState,
        media: &MediaSources,
        settings: &OutputSettings,
    ) -> MontageResult<CompositionPlan<'s>> {
        let settings = settings.or(&state.output_settings());
        self.validate(state, &settings)?;
        let canvas = self.resolve_canvas(state, media, &settings)?;
        Ok(CompositionPlan::build(state, canvas))
    }

    /// Render `state` to `output`.
    ///
    /// `settings` override the project's own output settings field by field.
    pub fn render(
        &self,
        state: &TimelineState,
        media: &MediaSources,
        output: &Path,
        settings: &OutputSettings,
        options: &RenderOptions,
    ) -> MontageResult<RenderReport> {
        let settings = settings.or(&state.output_settings());
        tracing::info!(
            clips = state.clip_count(),
            output = %output.display(),
            backend = self.backend.name(),
            "Starting render"
        );

        options.report(RenderStage::Validating);
        self.validate(state, &settings)?;

        options.report(RenderStage::ResolvingCanvas);
        let canvas = self.resolve_canvas(state, media, &settings)?;

        options.report(RenderStage::Planning);
        let plan = CompositionPlan::build(state, canvas);

        // Removed when dropped at the end of the render.
        let workdir = create_workdir(options.temp_root.as_deref())?;
        let ctx = RenderContext::new(self.backend, self.probe, &plan.canvas, workdir.path());
        let mut steps = Vec::new();

        options.report(RenderStage::RenderingSegments);
        let mut pieces = Vec::with_capacity(plan.entries.len());
        for entry in &plan.entries {
            let piece = match entry {
                BaseEntry::Clip { index, clip } => {
                    let video = clip.as_video().ok_or_else(|| {
                        MontageError::validation(format!("Base clip {} is not a video", clip.id))
                    })?;
                    let input = media.source_path(self.storage, &video.source_id)?;
                    let rendered =
                        render_segment(&ctx, clip, video, &input, plan.edge_overrides(*index))?;
                    steps.push(MergeStep::Clip {
                        clip_id: clip.id.clone(),
                        duration: rendered.duration,
                    });
                    Piece {
                        rendered,
                        clip: Some((*index, clip.id.clone())),
                    }
                }
                BaseEntry::Filler(filler) => {
                    let rendered = render_blank(&ctx, filler.kind.as_str(), filler.duration)?;
                    steps.push(MergeStep::filler(filler));
                    Piece {
                        rendered,
                        clip: None,
                    }
                }
            };
            pieces.push(piece);
        }

        options.report(RenderStage::CompositingSequence);
        let base = compose_sequence(&ctx, pieces, |i| plan.transition_after(i), &mut steps)?;
        tracing::info!(duration = base.duration, "Base sequence composed");

        options.report(RenderStage::CompositingOverlays);
        let composite = composite_overlays(&ctx, &plan.layers.overlays, base, media, self.storage)?;

        options.report(RenderStage::MixingAudio);
        let mut skipped_audio = Vec::new();
        let composite = mix_audio_clips(
            &ctx,
            &plan.layers.audio,
            composite,
            media,
            self.storage,
            &mut skipped_audio,
        )?;

        options.report(RenderStage::Finalizing);
        let output = self.storage.finalize(&composite.path, output)?;

        let mut report = RenderReport {
            output: output.clone(),
            duration: composite.duration,
            canvas: plan.canvas.clone(),
            clip_count: state.clip_count(),
            base_clip_count: plan.layers.base.len(),
            overlay_count: plan.layers.overlays.len(),
            audio_clip_count: plan.layers.audio.len(),
            trace_path: None,
            trace: None,
        };
        if options.trace {
            let mut trace = RenderTrace {
                canvas: plan.canvas.clone(),
                timeline_end: plan.timeline_end,
                base_layer: plan.layers.base_layer,
                clips: state.clips().map(ClipSnapshot::of).collect(),
                base_clip_ids: plan.layers.base.iter().map(|c| c.id.clone()).collect(),
                overlay_clip_ids: plan.layers.overlays.iter().map(|c| c.id.clone()).collect(),
                demotions: plan.layers.demotions.clone(),
                transition_decisions: plan.decisions.clone(),
                merge_steps: steps,
                skipped_audio,
                summary: Default::default(),
            };
            trace.summarize(composite.duration);
            report.trace_path = Some(trace.write_beside(&output)?);
            report.trace = Some(trace);
        }

        options.report(RenderStage::Complete);
        tracing::info!(
            output = %report.output.display(),
            duration = report.duration,
            "Render complete"
        );
        Ok(report)
    }
}

fn create_workdir(temp_root: Option<&Path>) -> MontageResult<tempfile::TempDir> {
    let root = temp_root
        .map(Path::to_path_buf)
        .unwrap_or_else(std::env::temp_dir);
    std::fs::create_dir_all(&root).map_err(|e| {
        MontageError::resource(format!("Failed to create temp root {}: {e}", root.display()))
    })?;
    tempfile::Builder::new()
        .prefix("montage-render-")
        .tempdir_in(&root)
        .map_err(|e| MontageError::resource(format!("Failed to create working directory: {e}")))
}
