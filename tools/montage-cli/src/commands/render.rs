//! Render a project to video.

use std::io::Write;
use std::path::PathBuf;

use montage_common::AppConfig;
use montage_render_engine::{FfmpegBackend, MediaBackend, RenderOptions, RenderStage, Renderer};

use super::ProjectInputs;
use crate::{OutputArgs, ProjectArgs};

pub async fn run(
    project: ProjectArgs,
    output: PathBuf,
    settings: OutputArgs,
    trace: bool,
    temp_root: Option<PathBuf>,
    config: AppConfig,
) -> anyhow::Result<()> {
    println!("Rendering project: {}", project.state.display());
    let inputs = ProjectInputs::load(&project)?;
    println!("  Clips: {}", inputs.state.clip_count());
    println!("  Output: {}", output.display());

    let settings = settings.settings();
    let trace = trace || config.render.trace_enabled();
    let temp_root = temp_root.or_else(|| config.render.temp_root.clone());

    let report = tokio::task::spawn_blocking(move || {
        let backend = FfmpegBackend::new(config.backend);
        if !backend.is_available() {
            anyhow::bail!("ffmpeg/ffprobe not found. Install ffmpeg or set the backend paths in the config file.");
        }
        let renderer = Renderer::new(&backend, &backend, &inputs.storage);
        let options = RenderOptions {
            trace,
            temp_root,
            progress: Some(Box::new(|stage: RenderStage| {
                print!("\r  Stage: {stage:?}                    ");
                std::io::stdout().flush().ok();
            })),
        };
        Ok(renderer.render(&inputs.state, &inputs.media, &output, &settings, &options)?)
    })
    .await??;

    println!();
    println!("Render complete: {}", report.output.display());
    println!(
        "  Canvas: {}x{} @ {} fps",
        report.canvas.width, report.canvas.height, report.canvas.fps
    );
    println!("  Duration: {:.3}s", report.duration);
    println!(
        "  Base clips: {}, overlays: {}, audio clips: {}",
        report.base_clip_count, report.overlay_count, report.audio_clip_count
    );
    if let Some(path) = &report.trace_path {
        println!("  Trace: {}", path.display());
    }
    Ok(())
}
