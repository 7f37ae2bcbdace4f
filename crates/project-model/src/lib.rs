//! Montage Project Model
//!
//! Defines the data contracts for editor projects:
//! - **Clips:** Tagged video/image/text/shape/audio variants with shared placement fields
//! - **Keyframes:** Piecewise-linear interpolation law for animated properties
//! - **State:** Tracks, output settings, and load/validate entry points
//!
//! Positions and sizes are percentages of the output canvas; crop boxes are
//! fractions `[0.0, 1.0]` of the source frame.

pub mod clip;
pub mod geometry;
pub mod keyframe;
pub mod settings;
pub mod state;

pub use clip::*;
pub use geometry::*;
pub use keyframe::*;
pub use settings::*;
pub use state::*;
