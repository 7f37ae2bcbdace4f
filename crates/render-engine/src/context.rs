//! Per-render execution context shared by the segment, sequence, overlay and
//! audio stages.

use std::cell::Cell;
use std::path::{Path, PathBuf};

use montage_common::MontageResult;

use crate::backend::{BackendJob, Encoding, MediaBackend, MediaProbe};
use crate::canvas::Canvas;

pub struct RenderContext<'a> {
    pub backend: &'a dyn MediaBackend,
    pub probe: &'a dyn MediaProbe,
    pub canvas: &'a Canvas,
    workdir: &'a Path,
    artifacts: Cell<usize>,
}

impl<'a> RenderContext<'a> {
    pub fn new(
        backend: &'a dyn MediaBackend,
        probe: &'a dyn MediaProbe,
        canvas: &'a Canvas,
        workdir: &'a Path,
    ) -> Self {
        Self {
            backend,
            probe,
            canvas,
            workdir,
            artifacts: Cell::new(0),
        }
    }

    pub fn workdir(&self) -> &Path {
        self.workdir
    }

    /// Fresh path for an intermediate artifact. Names are numbered in
    /// creation order so the working directory reads like a log.
    pub fn artifact(&self, stem: &str, extension: &str) -> PathBuf {
        let n = self.artifacts.get();
        self.artifacts.set(n + 1);
        self.workdir.join(format!("{n:03}_{stem}.{extension}"))
    }

    pub fn encoding(&self) -> Encoding {
        Encoding::from(self.canvas)
    }

    /// Run one backend job and return the artifact it wrote.
    pub fn run(&self, job: BackendJob) -> MontageResult<PathBuf> {
        tracing::debug!(
            operation = job.operation(),
            output = %job.output().display(),
            "Dispatching backend job"
        );
        self.backend.run(&job)?;
        Ok(job.output().to_path_buf())
    }
}
