// THEORY:
// A `ColorGroup` is one dominant color region discovered by the clustering engine.
// It is a "dumb" data container summarizing a cluster: its centroid, how bright it
// is, and how much of the sampled texture it covers. Groups are produced once per
// analysis and never mutated afterwards; a fresh analysis yields fresh groups.

use crate::core_modules::pixel::pixel::{Brightness, Pixel};
use serde::Serialize;

/// A dominant color region of a texture.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColorGroup {
    /// Position in the coverage-sorted list of the analysis that produced it.
    pub id: usize,
    /// Mean color of the cluster's samples, rounded per channel.
    pub centroid: Pixel,
    /// `round((r + g + b) / 3)` of the centroid.
    pub brightness: Brightness,
    /// Uppercase `#RRGGBB` of the centroid.
    pub hex: String,
    /// Share of samples assigned to this cluster, 0.0..=100.0.
    pub coverage_percent: f64,
    /// Number of samples assigned to this cluster.
    pub sample_count: usize,
}

impl ColorGroup {
    pub fn new(id: usize, centroid: Pixel, sample_count: usize, total_samples: usize) -> Self {
        let coverage_percent = if total_samples == 0 {
            0.0
        } else {
            100.0 * sample_count as f64 / total_samples as f64
        };
        Self {
            id,
            centroid,
            brightness: centroid.brightness(),
            hex: centroid.hex(),
            coverage_percent,
            sample_count,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.sample_count == 0
    }
}
