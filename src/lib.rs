// THEORY:
// This file is the main entry point for the `texture_recolor` library crate.
// It exposes the recoloring workflow as a clean, front-end independent API: a
// CLI wizard, an editor plug-in or a batch job all drive the same calls.
//
// The high-level interface is the `RecolorSession` (see `pipeline`), which walks a
// texture through analyze -> select -> simulate -> transform -> sync. The free
// functions behind each step are re-exported here for callers that want a single
// stage without the session bookkeeping, and `parallel_pipeline` offers the two
// full-resolution passes split across worker threads.

pub mod core_modules;
pub mod error;
pub mod parallel_pipeline;
pub mod pipeline;

pub use crate::core_modules::color_clusterer::AnalysisConfig;
pub use crate::core_modules::color_clusterer::color_clusterer::{analyze, analyze_with_config};
pub use crate::core_modules::color_group::ColorGroup;
pub use crate::core_modules::material::{AssetDocument, sync_material};
pub use crate::core_modules::pixel::pixel::Pixel;
pub use crate::core_modules::selection::{BrightnessRange, SelectionCriteria, Tolerance};
pub use crate::core_modules::simulator::{SimulationReport, simulate};
pub use crate::core_modules::texture::TextureBuffer;
pub use crate::core_modules::tolerance::recommend_tolerance;
pub use crate::core_modules::transformer::{TransformationMode, transform};
pub use crate::error::{RecolorError, Result};
pub use crate::pipeline::{CommitReport, PipelineConfig, RecolorSession};
