// THEORY:
// Simulation and transformation are pure per-pixel passes over a texture that can be
// tens of megapixels, so they split cleanly into horizontal bands. Each band is handed
// to tokio's blocking pool (the work is CPU bound, not I/O) and the band results are
// joined in submission order.
//
// Counting is order independent and the bands are concatenated in row order, so the
// results are identical to the synchronous passes for any worker count. Clustering is
// not parallelized: it only touches a sample and must stay reproducible for a seed.

use crate::core_modules::pixel::pixel::Pixel;
use crate::core_modules::selection::SelectionCriteria;
use crate::core_modules::simulator::{SimulationReport, count_matches};
use crate::core_modules::texture::TextureBuffer;
use crate::core_modules::transformer::{TransformationMode, blend_for, transform_bytes};
use crate::error::{RecolorError, Result};
use futures::future::join_all;
use std::sync::Arc;
use tokio::task::JoinHandle;

/// Runs the full-resolution passes across `worker_count` row bands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParallelRecolorer {
    worker_count: usize,
}

impl Default for ParallelRecolorer {
    fn default() -> Self {
        Self::new(num_cpus::get())
    }
}

impl ParallelRecolorer {
    /// A worker count of 0 is treated as 1.
    pub fn new(worker_count: usize) -> Self {
        Self {
            worker_count: worker_count.max(1),
        }
    }

    pub fn worker_count(&self) -> usize {
        self.worker_count
    }

    /// Contiguous `start_row..end_row` ranges covering `height`, at most one per worker.
    fn bands(&self, height: u32) -> Vec<(u32, u32)> {
        if height == 0 {
            return Vec::new();
        }
        let rows_per_band = (height as usize).div_ceil(self.worker_count) as u32;
        (0..height)
            .step_by(rows_per_band as usize)
            .map(|start| (start, (start + rows_per_band).min(height)))
            .collect()
    }

    async fn join_bands<T: Send + 'static>(handles: Vec<JoinHandle<T>>) -> Result<Vec<T>> {
        join_all(handles)
            .await
            .into_iter()
            .map(|joined| joined.map_err(|e| RecolorError::Worker(e.to_string())))
            .collect()
    }

    pub async fn simulate(
        &self,
        texture: Arc<TextureBuffer>,
        criteria: Arc<SelectionCriteria>,
    ) -> Result<SimulationReport> {
        let handles: Vec<JoinHandle<usize>> = self
            .bands(texture.height())
            .into_iter()
            .map(|(start, end)| {
                let texture = Arc::clone(&texture);
                let criteria = Arc::clone(&criteria);
                tokio::task::spawn_blocking(move || {
                    count_matches(texture.row_bytes(start, end), texture.channels(), &criteria.matcher())
                })
            })
            .collect();

        let matched = Self::join_bands(handles).await?.into_iter().sum();
        Ok(SimulationReport::from_counts(matched, texture.pixel_count()))
    }

    pub async fn transform(
        &self,
        texture: Arc<TextureBuffer>,
        criteria: Arc<SelectionCriteria>,
        target: Pixel,
        mode: TransformationMode,
    ) -> Result<TextureBuffer> {
        let blend = blend_for(target, mode);
        let bands = self.bands(texture.height());
        log::debug!(
            "transforming {}x{} in {} band(s) with {blend:?} blend",
            texture.width(),
            texture.height(),
            bands.len()
        );

        let handles: Vec<JoinHandle<Vec<u8>>> = bands
            .into_iter()
            .map(|(start, end)| {
                let texture = Arc::clone(&texture);
                let criteria = Arc::clone(&criteria);
                tokio::task::spawn_blocking(move || {
                    transform_bytes(
                        texture.row_bytes(start, end),
                        texture.channels(),
                        &criteria.matcher(),
                        target,
                        blend,
                    )
                })
            })
            .collect();

        let mut data = Vec::with_capacity(texture.as_bytes().len());
        for band in Self::join_bands(handles).await? {
            data.extend_from_slice(&band);
        }
        Ok(texture.with_bytes(data))
    }
}
