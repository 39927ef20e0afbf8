// THEORY:
// The `pipeline` module is the top-level API of the recoloring engine. A
// `RecolorSession` owns one texture and walks it through the operator workflow:
//
//   analyze -> pick groups / criteria -> recommend tolerance -> simulate (any number
//   of times) -> commit -> sync materials
//
// The stage functions are stateless; the session only adds the bookkeeping a
// front-end would otherwise repeat: the cached color groups, the dimensions they
// were computed on, and the swap of the committed texture.
//
// Key architectural principles:
// 1.  **Cheap Iteration**: Analysis runs once. Recommendations and simulations read the
//     cached groups and the borrowed texture, so an operator can try many criteria.
// 2.  **Guarded Commit**: A transform is refused with `DimensionMismatch` when the
//     texture it would touch is not the shape the analysis ran on.
// 3.  **Explicit Replacement**: `preview` returns a new buffer and leaves the session
//     alone; only `commit` replaces the session's texture.

use crate::core_modules::color_clusterer::AnalysisConfig;
use crate::core_modules::color_clusterer::color_clusterer;
use crate::core_modules::color_group::ColorGroup;
use crate::core_modules::material::{self, AssetDocument};
use crate::core_modules::pixel::pixel::Pixel;
use crate::core_modules::selection::SelectionCriteria;
use crate::core_modules::smart_pixel::smart_pixel::TolerancePercent;
use crate::core_modules::simulator::{self, SimulationReport};
use crate::core_modules::texture::TextureBuffer;
use crate::core_modules::tolerance;
use crate::core_modules::transformer::{self, TransformationMode};
use crate::error::{RecolorError, Result};
use crate::parallel_pipeline::ParallelRecolorer;
use serde::Serialize;
use std::sync::Arc;

/// Configuration for a `RecolorSession`.
#[derive(Debug, Clone, Default)]
pub struct PipelineConfig {
    pub analysis: AnalysisConfig,
    /// Mode used by `commit_default`.
    pub default_mode: TransformationMode,
}

/// What a committed transformation did.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CommitReport {
    pub simulation: SimulationReport,
    pub mode: TransformationMode,
    pub target: Pixel,
    /// Whether the additive light-target blend was used.
    pub light_blend: bool,
}

pub struct RecolorSession {
    texture: TextureBuffer,
    config: PipelineConfig,
    groups: Vec<ColorGroup>,
    analyzed_dimensions: Option<(u32, u32)>,
}

impl RecolorSession {
    pub fn new(texture: TextureBuffer, config: PipelineConfig) -> Self {
        Self {
            texture,
            config,
            groups: Vec::new(),
            analyzed_dimensions: None,
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn texture(&self) -> &TextureBuffer {
        &self.texture
    }

    /// Clusters the current texture and caches the groups, largest first.
    pub fn analyze(&mut self) -> &[ColorGroup] {
        self.groups = color_clusterer::analyze_with_config(&self.texture, &self.config.analysis);
        self.analyzed_dimensions = Some(self.texture.dimensions());
        &self.groups
    }

    /// Groups from the last `analyze`, empty before the first one.
    pub fn groups(&self) -> &[ColorGroup] {
        &self.groups
    }

    pub fn is_analyzed(&self) -> bool {
        self.analyzed_dimensions.is_some()
    }

    pub fn group(&self, id: usize) -> Result<&ColorGroup> {
        self.groups
            .iter()
            .find(|g| g.id == id)
            .ok_or(RecolorError::UnknownGroup(id))
    }

    fn split_groups(&self, selected_ids: &[usize]) -> Result<(Vec<ColorGroup>, Vec<ColorGroup>)> {
        for &id in selected_ids {
            self.group(id)?;
        }
        Ok(self
            .groups
            .iter()
            .cloned()
            .partition(|g| selected_ids.contains(&g.id)))
    }

    /// Suggested tolerance for matching the groups in `selected_ids`.
    pub fn recommend_tolerance(&self, selected_ids: &[usize]) -> Result<u8> {
        let (selected, unselected) = self.split_groups(selected_ids)?;
        let recommended = tolerance::recommend_tolerance(&selected, &unselected);
        log::debug!("recommended tolerance {recommended}% for groups {selected_ids:?}");
        Ok(recommended)
    }

    /// Cluster criteria for the given group ids.
    pub fn criteria_for_groups(&self, selected_ids: &[usize], tolerance: TolerancePercent) -> Result<SelectionCriteria> {
        let (selected, _) = self.split_groups(selected_ids)?;
        SelectionCriteria::for_groups(&selected, tolerance)
    }

    pub fn simulate(&self, criteria: &SelectionCriteria) -> SimulationReport {
        let report = simulator::simulate(&self.texture, criteria);
        log::info!("simulated {criteria}: {report}");
        report
    }

    /// Transforms `texture` after checking it against the analyzed dimensions.
    pub fn transform(
        &self,
        texture: &TextureBuffer,
        criteria: &SelectionCriteria,
        target: Pixel,
        mode: TransformationMode,
    ) -> Result<TextureBuffer> {
        self.check_dimensions(texture)?;
        Ok(transformer::transform(texture, criteria, target, mode))
    }

    /// The session texture as it would look after `commit`, without committing.
    pub fn preview(&self, criteria: &SelectionCriteria, target: Pixel, mode: TransformationMode) -> Result<TextureBuffer> {
        self.transform(&self.texture, criteria, target, mode)
    }

    /// Replaces the session texture with its transformed version.
    ///
    /// The cached groups keep describing the texture as it was analyzed.
    pub fn commit(&mut self, criteria: &SelectionCriteria, target: Pixel, mode: TransformationMode) -> Result<CommitReport> {
        let simulation = simulator::simulate(&self.texture, criteria);
        self.texture = self.preview(criteria, target, mode)?;
        Ok(Self::committed(simulation, target, mode))
    }

    /// `commit` with both full-resolution passes split across `recolorer`'s workers.
    pub async fn commit_parallel(
        &mut self,
        criteria: &SelectionCriteria,
        target: Pixel,
        mode: TransformationMode,
        recolorer: &ParallelRecolorer,
    ) -> Result<CommitReport> {
        self.check_dimensions(&self.texture)?;
        let texture = Arc::new(self.texture.clone());
        let criteria = Arc::new(criteria.clone());
        let simulation = recolorer.simulate(Arc::clone(&texture), Arc::clone(&criteria)).await?;
        self.texture = recolorer.transform(texture, criteria, target, mode).await?;
        Ok(Self::committed(simulation, target, mode))
    }

    fn committed(simulation: SimulationReport, target: Pixel, mode: TransformationMode) -> CommitReport {
        let report = CommitReport {
            simulation,
            mode,
            target,
            light_blend: transformer::blend_for(target, mode) == transformer::Blend::Additive,
        };
        log::info!(
            "committed {mode} toward {target}: {} pixels changed",
            report.simulation.matched_pixels
        );
        report
    }

    pub fn commit_default(&mut self, criteria: &SelectionCriteria, target: Pixel) -> Result<CommitReport> {
        self.commit(criteria, target, self.config.default_mode)
    }

    /// Propagates `target` to the materials drawing `image_index`.
    pub fn sync_material(&self, document: &mut AssetDocument, image_index: usize, target: Pixel) -> Result<usize> {
        material::sync_material(document, image_index, target)
    }

    fn check_dimensions(&self, texture: &TextureBuffer) -> Result<()> {
        match self.analyzed_dimensions {
            Some((expected_width, expected_height)) if (expected_width, expected_height) != texture.dimensions() => {
                Err(RecolorError::DimensionMismatch {
                    expected_width,
                    expected_height,
                    actual_width: texture.width(),
                    actual_height: texture.height(),
                })
            }
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn halves() -> TextureBuffer {
        let dark = Pixel::new(0x20, 0x20, 0x20);
        let light = Pixel::new(0xD0, 0xD0, 0xD0);
        let pixels: Vec<Pixel> = (0..16).map(|i| if i < 8 { dark } else { light }).collect();
        TextureBuffer::from_pixels(4, 4, &pixels).unwrap()
    }

    fn session() -> RecolorSession {
        let config = PipelineConfig {
            analysis: AnalysisConfig {
                cluster_count: 2,
                sample_stride: 1,
                seed: Some(7),
                ..AnalysisConfig::default()
            },
            ..PipelineConfig::default()
        };
        RecolorSession::new(halves(), config)
    }

    #[test]
    fn analyze_caches_groups() {
        let mut session = session();
        assert!(!session.is_analyzed());
        assert_eq!(session.analyze().len(), 2);
        assert!(session.is_analyzed());
        let coverage: Vec<f64> = session.groups().iter().map(|g| g.coverage_percent).collect();
        assert_eq!(coverage, vec![50.0, 50.0]);
    }

    #[test]
    fn unknown_group_ids_are_rejected() {
        let mut session = session();
        session.analyze();
        assert!(matches!(session.recommend_tolerance(&[5]), Err(RecolorError::UnknownGroup(5))));
        assert!(matches!(session.criteria_for_groups(&[0, 9], 20.0), Err(RecolorError::UnknownGroup(9))));
    }

    #[test]
    fn recommendation_and_cluster_criteria_select_one_half() {
        let mut session = session();
        session.analyze();
        let dark_id = session.groups().iter().find(|g| g.brightness == 32).unwrap().id;

        // 176 * sqrt(3) = 304.8 apart, 69.0% of the maximum, 0.4 * 69.0 -> 28
        let tolerance = session.recommend_tolerance(&[dark_id]).unwrap();
        assert_eq!(tolerance, 28);

        let criteria = session.criteria_for_groups(&[dark_id], tolerance as f64).unwrap();
        assert!(matches!(criteria, SelectionCriteria::ClusterMatch { .. }));
        assert_eq!(session.simulate(&criteria).matched_pixels, 8);
    }

    #[test]
    fn preview_leaves_the_session_untouched_and_commit_replaces_it() {
        let mut session = session();
        session.analyze();
        let criteria = SelectionCriteria::brightness_below(100).unwrap();
        let red = Pixel::new(255, 0, 0);

        let preview = session.preview(&criteria, red, TransformationMode::Tint).unwrap();
        assert_eq!(session.texture(), &halves());

        let report = session.commit(&criteria, red, TransformationMode::Tint).unwrap();
        assert_eq!(report.simulation.matched_pixels, 8);
        assert!(!report.light_blend);
        assert_eq!(session.texture(), &preview);
        assert_eq!(session.texture().pixel(0), Pixel::new(32, 0, 0));
    }

    #[test]
    fn light_target_commit_reports_additive_blend() {
        let mut session = session();
        let criteria = SelectionCriteria::brightness_above(200).unwrap();
        let report = session.commit_default(&criteria, Pixel::WHITE).unwrap();
        assert_eq!(report.mode, TransformationMode::SmartReplace);
        assert!(report.light_blend);
    }

    #[tokio::test]
    async fn parallel_commit_agrees_with_the_serial_one() {
        let criteria = SelectionCriteria::brightness_below(100).unwrap();
        let target = Pixel::new(30, 140, 90);

        let mut serial = session();
        serial.analyze();
        let expected = serial.commit(&criteria, target, TransformationMode::SmartReplace).unwrap();

        for workers in [1, 3, 8] {
            let mut parallel = session();
            parallel.analyze();
            let report = parallel
                .commit_parallel(&criteria, target, TransformationMode::SmartReplace, &ParallelRecolorer::new(workers))
                .await
                .unwrap();
            assert_eq!(report, expected, "workers = {workers}");
            assert_eq!(parallel.texture(), serial.texture(), "workers = {workers}");
        }
    }

    #[test]
    fn transform_rejects_textures_of_another_shape() {
        let mut session = session();
        session.analyze();
        let other = TextureBuffer::from_pixels(2, 2, &[Pixel::BLACK; 4]).unwrap();
        let criteria = SelectionCriteria::brightness_above(0).unwrap();
        let err = session
            .transform(&other, &criteria, Pixel::WHITE, TransformationMode::Tint)
            .unwrap_err();
        assert!(matches!(
            err,
            RecolorError::DimensionMismatch {
                expected_width: 4,
                expected_height: 4,
                actual_width: 2,
                actual_height: 2
            }
        ));
    }
}
