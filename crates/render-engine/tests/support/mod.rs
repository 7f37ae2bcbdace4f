//! Shared fixtures for pipeline tests: a backend that records jobs and
//! touches their outputs, and a probe with fixed answers.

#![allow(dead_code)]

use std::cell::RefCell;
use std::path::{Path, PathBuf};

use montage_common::{MontageError, MontageResult};
use montage_project_model::TimelineState;
use montage_render_engine::{BackendJob, LocalStorage, MediaBackend, MediaInfo, MediaProbe, MediaSources};
use serde_json::Value;

/// Records every job and writes an empty file at its output path.
#[derive(Default)]
pub struct RecordingBackend {
    jobs: RefCell<Vec<BackendJob>>,
    /// Operations that fail instead of running.
    pub failing: Vec<&'static str>,
}

impl RecordingBackend {
    pub fn failing_on(operations: &[&'static str]) -> Self {
        Self {
            failing: operations.to_vec(),
            ..Self::default()
        }
    }

    pub fn jobs(&self) -> Vec<BackendJob> {
        self.jobs.borrow().clone()
    }

    pub fn count(&self, operation: &str) -> usize {
        self.jobs
            .borrow()
            .iter()
            .filter(|job| job.operation() == operation)
            .count()
    }
}

impl MediaBackend for RecordingBackend {
    fn run(&self, job: &BackendJob) -> MontageResult<()> {
        self.jobs.borrow_mut().push(job.clone());
        if self.failing.contains(&job.operation()) {
            return Err(MontageError::backend(job.operation(), "simulated failure"));
        }
        std::fs::write(job.output(), b"")?;
        Ok(())
    }

    fn is_available(&self) -> bool {
        true
    }

    fn name(&self) -> &str {
        "recording"
    }
}

/// Every file is a 1280x720 @ 30 fps clip with audio.
pub struct FixedProbe;

impl MediaProbe for FixedProbe {
    fn probe(&self, _path: &Path) -> MontageResult<MediaInfo> {
        Ok(MediaInfo {
            duration: 60.0,
            width: 1280,
            height: 720,
            fps: 30.0,
            has_audio: true,
        })
    }
}

/// A scratch media root holding placeholder source and asset files.
pub struct Workspace {
    pub dir: tempfile::TempDir,
    pub media: MediaSources,
}

impl Workspace {
    pub fn new(sources: &[&str], assets: &[&str]) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let mut media = MediaSources::default();
        for id in sources {
            let name = format!("{id}.mp4");
            std::fs::write(dir.path().join(&name), b"").unwrap();
            media.sources.insert(id.to_string(), name);
        }
        for id in assets {
            let name = format!("{id}.bin");
            std::fs::write(dir.path().join(&name), b"").unwrap();
            media.assets.insert(id.to_string(), name);
        }
        Self { dir, media }
    }

    pub fn storage(&self) -> LocalStorage {
        LocalStorage::new(self.dir.path())
    }

    pub fn output(&self) -> PathBuf {
        self.dir.path().join("out").join("render.mp4")
    }

    pub fn temp_root(&self) -> PathBuf {
        self.dir.path().join("tmp")
    }
}

/// A single-track project from clip JSON values.
pub fn project(clips: Vec<Value>) -> TimelineState {
    serde_json::from_value(serde_json::json!({ "tracks": [{ "id": "t1", "clips": clips }] })).unwrap()
}

pub fn video(id: &str, source: &str, start: f64, duration: f64) -> Value {
    serde_json::json!({
        "id": id, "type": "video", "sourceId": source,
        "startTime": start, "duration": duration, "layer": 0
    })
}

pub fn approx(a: f64, b: f64) -> bool {
    (a - b).abs() < 1e-6
}
