pub mod check;
pub mod config;
pub mod plan;
pub mod render;
pub mod validate;

use std::path::{Path, PathBuf};

use anyhow::Context;
use montage_project_model::TimelineState;
use montage_render_engine::{LocalStorage, MediaSources};

use crate::ProjectArgs;

/// A loaded project with its id maps and storage root.
pub struct ProjectInputs {
    pub state: TimelineState,
    pub media: MediaSources,
    pub storage: LocalStorage,
}

impl ProjectInputs {
    pub fn load(args: &ProjectArgs) -> anyhow::Result<Self> {
        let state = TimelineState::load(&args.state)
            .map_err(|e| anyhow::anyhow!("Failed to load project: {e}"))?;
        let media = match &args.media {
            Some(path) => MediaSources::load(path)
                .with_context(|| format!("Failed to load media manifest {}", path.display()))?,
            None => MediaSources::default(),
        };
        let root = args
            .media_root
            .clone()
            .or_else(|| args.media.as_deref().map(parent_dir))
            .unwrap_or_else(|| parent_dir(&args.state));
        Ok(Self {
            state,
            media,
            storage: LocalStorage::new(root),
        })
    }
}

fn parent_dir(path: &Path) -> PathBuf {
    path.parent()
        .filter(|p| !p.as_os_str().is_empty())
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."))
}
