//! Montage Render Engine
//!
//! Turns a timeline project into a single encoded video by planning the
//! composition and driving a media backend through it.
//!
//! # Pipeline Architecture
//!
//! ```text
//! project.json ──┐
//!                ├── Canvas (settings → preset → probe → default)
//! sources ───────┘        │
//!                         ├── Layers (base track, demotions, overlays, audio)
//!                         ├── Gaps (leading/between/tail blanks)
//!                         ├── Transitions (accept/reject per adjacent pair)
//!                         ▼
//!                  Segments + Blanks
//!                         │
//!                         ├── Sequence (fold: xfade or concat)
//!                         ├── Overlays (video/image/text/shape, paint order)
//!                         ├── Audio (trim + mix)
//!                         ▼
//!                     output.mp4  (+ .parity.trace.json)
//! ```
//!
//! Planning is pure and deterministic; every media operation goes through
//! [`MediaBackend`], so the whole pipeline runs against a recording backend
//! in tests.

pub mod audio;
pub mod backend;
pub mod canvas;
pub mod color;
pub mod context;
pub mod driver;
pub mod ffmpeg;
pub mod filters;
pub mod gaps;
pub mod layers;
pub mod overlay;
pub mod plan;
pub mod probe;
pub mod segment;
pub mod sequence;
pub mod shapes;
pub mod storage;
pub mod trace;
pub mod transitions;

pub use backend::{BackendJob, MediaBackend, MediaInfo, MediaProbe};
pub use canvas::{resolve_canvas, Canvas};
pub use driver::{ProgressCallback, RenderOptions, RenderReport, RenderStage, Renderer};
pub use ffmpeg::FfmpegBackend;
pub use plan::{CompositionPlan, PlanSummary};
pub use storage::{LocalStorage, MediaSources, StorageResolver};
pub use trace::{trace_path, RenderTrace};
pub use transitions::{normalize_transition, TransitionDecision, TransitionStyle};
