//! Validate a project and its media references.

use montage_render_engine::{MediaSources, StorageResolver};

use super::ProjectInputs;
use crate::ProjectArgs;

pub fn run(project: ProjectArgs) -> anyhow::Result<()> {
    println!("Validating project: {}", project.state.display());
    let inputs = ProjectInputs::load(&project)?;
    let state = &inputs.state;

    println!("  Tracks: {}", state.tracks.len());
    println!("  Clips: {}", state.clip_count());
    println!("  Timeline end: {:.3}s", state.timeline_end());

    let mut issues = state.validation_issues();
    if state.is_empty() {
        issues.push("project has no clips".to_string());
    }
    if project.media.is_some() {
        issues.extend(reference_issues(&inputs.media, &inputs.storage, state));
    }

    if issues.is_empty() {
        println!("\nProject is valid.");
    } else {
        println!("\nValidation issues:");
        for issue in &issues {
            println!("  - {issue}");
        }
        anyhow::bail!("{} issue(s) found", issues.len());
    }
    Ok(())
}

fn reference_issues(
    media: &MediaSources,
    storage: &dyn StorageResolver,
    state: &montage_project_model::TimelineState,
) -> Vec<String> {
    use montage_project_model::ClipKind;

    state
        .clips()
        .filter_map(|clip| {
            let result = match &clip.kind {
                ClipKind::Video(video) => media.source_path(storage, &video.source_id),
                ClipKind::Image(image) => media.asset_path(storage, &image.source_id),
                ClipKind::Audio(audio) if media.is_video_source(&audio.source_id) => {
                    media.source_path(storage, &audio.source_id)
                }
                ClipKind::Audio(audio) => media.asset_path(storage, &audio.source_id),
                ClipKind::Text(_) | ClipKind::Shape(_) => return None,
            };
            result.err().map(|e| format!("clip {:?}: {e}", clip.id))
        })
        .collect()
}
