// THEORY:
// The `ColorClusterer` is the engine of the analysis layer. It runs an unsupervised
// k-means pass over a sample of the texture and reports the dominant colors as
// `ColorGroup`s, most prevalent first.
//
// Key architectural principles & algorithm steps:
// 1.  **Strided Sampling**: Only every `sample_stride`-th pixel in raster order is
//     clustered. The stride is part of `AnalysisConfig`, so callers that need exact
//     coverage numbers lower it explicitly.
// 2.  **Seeded Initialization**: `k` centroids are drawn from the samples in a random
//     order produced by `StdRng`. A seed makes the run reproducible; without one the
//     generator is seeded from entropy. Distinct colors are preferred while the
//     shuffled order still offers them; when a texture has fewer distinct colors than
//     `k`, the remaining centroids repeat a color and end up as empty groups.
// 3.  **Lloyd Iterations**: Each round assigns every sample to its nearest centroid
//     (ties go to the lower index), then moves every non-empty centroid to the mean of
//     its members. The loop stops after `max_iterations` rounds or as soon as no
//     centroid moved farther than `convergence_distance`.
// 4.  **Final Assignment**: One more assignment pass against the last centroids makes
//     the reported sample counts consistent with the reported centroids.
// 5.  **Stateless Utility**: Like the rest of the analysis layer it keeps no memory
//     between calls. An empty texture yields an empty group list, not an error.

use crate::core_modules::color_group::ColorGroup;
use crate::core_modules::pixel::pixel::Pixel;
use crate::core_modules::texture::TextureBuffer;

pub const DEFAULT_CLUSTER_COUNT: usize = 3;
pub const DEFAULT_SAMPLE_STRIDE: usize = 200;
pub const DEFAULT_MAX_ITERATIONS: usize = 10;
pub const DEFAULT_CONVERGENCE_DISTANCE: f64 = 1.0;

/// Tunables for one clustering run.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisConfig {
    /// Number of clusters `k`.
    pub cluster_count: usize,
    /// Cluster every n-th pixel in raster order. 1 clusters every pixel.
    pub sample_stride: usize,
    /// Upper bound on Lloyd iterations before the final assignment.
    pub max_iterations: usize,
    /// Stop early once no centroid moves farther than this (RGB units).
    pub convergence_distance: f64,
    /// Fixed seed for reproducible initialization; `None` seeds from entropy.
    pub seed: Option<u64>,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            cluster_count: DEFAULT_CLUSTER_COUNT,
            sample_stride: DEFAULT_SAMPLE_STRIDE,
            max_iterations: DEFAULT_MAX_ITERATIONS,
            convergence_distance: DEFAULT_CONVERGENCE_DISTANCE,
            seed: None,
        }
    }
}

pub mod color_clusterer {
    use super::*;
    use log::{debug, info};
    use rand::rngs::StdRng;
    use rand::seq::SliceRandom;
    use rand::{Rng, SeedableRng};

    /// Clusters `texture` into `k` groups with the default sampling and iteration limits.
    pub fn analyze(texture: &TextureBuffer, k: usize, seed: Option<u64>) -> Vec<ColorGroup> {
        let config = AnalysisConfig {
            cluster_count: k,
            seed,
            ..AnalysisConfig::default()
        };
        analyze_with_config(texture, &config)
    }

    pub fn analyze_with_config(texture: &TextureBuffer, config: &AnalysisConfig) -> Vec<ColorGroup> {
        let samples = texture.sample(config.sample_stride);
        if samples.is_empty() || config.cluster_count == 0 {
            info!(
                "no color groups: {} samples, k = {}",
                samples.len(),
                config.cluster_count
            );
            return Vec::new();
        }

        let mut rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let mut centroids = initial_centroids(&samples, config.cluster_count, &mut rng);

        for iteration in 0..config.max_iterations {
            let assignment = assign(&samples, &centroids);
            let mut max_shift = 0.0f64;
            for (centroid, (sum, count)) in centroids.iter_mut().zip(assignment.iter()) {
                if *count == 0 {
                    continue;
                }
                let moved = Centroid::mean(sum, *count);
                max_shift = max_shift.max(centroid.distance(&moved));
                *centroid = moved;
            }
            debug!("k-means iteration {}: max centroid shift {:.3}", iteration + 1, max_shift);
            if max_shift <= config.convergence_distance {
                break;
            }
        }

        // --- Final Assignment ---
        let assignment = assign(&samples, &centroids);
        let total = samples.len();
        let mut groups: Vec<ColorGroup> = centroids
            .iter()
            .zip(assignment.iter())
            .map(|(centroid, (_, count))| ColorGroup::new(0, centroid.to_pixel(), *count, total))
            .collect();

        // Stable, so equally sized clusters keep their centroid order.
        groups.sort_by(|a, b| b.sample_count.cmp(&a.sample_count));
        for (id, group) in groups.iter_mut().enumerate() {
            group.id = id;
        }

        info!(
            "clustered {} samples (stride {}) into {} groups: {}",
            total,
            config.sample_stride.max(1),
            groups.len(),
            groups
                .iter()
                .map(|g| format!("{} {:.1}%", g.hex, g.coverage_percent))
                .collect::<Vec<_>>()
                .join(", ")
        );
        groups
    }

    /// Picks `k` starting centroids from a shuffled sample order, preferring colors
    /// not already chosen.
    fn initial_centroids(samples: &[Pixel], k: usize, rng: &mut StdRng) -> Vec<Centroid> {
        let mut order: Vec<usize> = (0..samples.len()).collect();
        order.shuffle(rng);

        let mut chosen: Vec<Pixel> = Vec::with_capacity(k);
        for &index in &order {
            if chosen.len() == k {
                break;
            }
            if !chosen.contains(&samples[index]) {
                chosen.push(samples[index]);
            }
        }
        while chosen.len() < k {
            chosen.push(samples[rng.gen_range(0..samples.len())]);
        }

        chosen.into_iter().map(Centroid::from).collect()
    }

    /// Per-centroid channel sums and member counts for the nearest-centroid assignment.
    fn assign(samples: &[Pixel], centroids: &[Centroid]) -> Vec<([f64; 3], usize)> {
        let mut totals = vec![([0.0f64; 3], 0usize); centroids.len()];
        for sample in samples {
            let nearest = nearest_centroid(*sample, centroids);
            let (sum, count) = &mut totals[nearest];
            sum[0] += sample.red as f64;
            sum[1] += sample.green as f64;
            sum[2] += sample.blue as f64;
            *count += 1;
        }
        totals
    }

    fn nearest_centroid(sample: Pixel, centroids: &[Centroid]) -> usize {
        let mut best_index = 0;
        let mut best_distance = f64::INFINITY;
        for (index, centroid) in centroids.iter().enumerate() {
            let d = centroid.squared_distance_to(sample);
            if d < best_distance {
                best_distance = d;
                best_index = index;
            }
        }
        best_index
    }

    /// A centroid kept in floating point between iterations.
    #[derive(Debug, Clone, Copy, PartialEq)]
    struct Centroid {
        red: f64,
        green: f64,
        blue: f64,
    }

    impl Centroid {
        fn mean(sum: &[f64; 3], count: usize) -> Self {
            let n = count as f64;
            Self {
                red: sum[0] / n,
                green: sum[1] / n,
                blue: sum[2] / n,
            }
        }

        fn squared_distance_to(&self, pixel: Pixel) -> f64 {
            let dr = self.red - pixel.red as f64;
            let dg = self.green - pixel.green as f64;
            let db = self.blue - pixel.blue as f64;
            dr * dr + dg * dg + db * db
        }

        fn distance(&self, other: &Centroid) -> f64 {
            let dr = self.red - other.red;
            let dg = self.green - other.green;
            let db = self.blue - other.blue;
            (dr * dr + dg * dg + db * db).sqrt()
        }

        fn to_pixel(self) -> Pixel {
            let channel = |v: f64| v.round().clamp(0.0, 255.0) as u8;
            Pixel::new(channel(self.red), channel(self.green), channel(self.blue))
        }
    }

    impl From<Pixel> for Centroid {
        fn from(pixel: Pixel) -> Self {
            Self {
                red: pixel.red as f64,
                green: pixel.green as f64,
                blue: pixel.blue as f64,
            }
        }
    }

}
