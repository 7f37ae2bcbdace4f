//! Print the composition plan.

use montage_common::AppConfig;
use montage_render_engine::{FfmpegBackend, Renderer};

use super::ProjectInputs;
use crate::{OutputArgs, ProjectArgs};

pub fn run(project: ProjectArgs, settings: OutputArgs, config: AppConfig) -> anyhow::Result<()> {
    let inputs = ProjectInputs::load(&project)?;
    // only probes when the settings leave the canvas open
    let backend = FfmpegBackend::new(config.backend);
    let renderer = Renderer::new(&backend, &backend, &inputs.storage);
    let plan = renderer.plan(&inputs.state, &inputs.media, &settings.settings())?;
    println!("{}", serde_json::to_string_pretty(&plan.summary())?);
    Ok(())
}
