// THEORY:
// The `SmartPixel` module is the comparative half of the pixel layer. Where `Pixel`
// answers questions about one color, this module quantifies the relationship
// between two: how far apart they are in RGB space and whether one lies within a
// tolerance of the other.
//
// Key architectural principles:
// 1.  **One Metric**: Plain Euclidean distance in RGB. Every color-based selection
//     criterion funnels through `matches`, so there is exactly one definition of
//     "similar" in the engine.
// 2.  **Normalized Tolerance**: Operators never see raw distances. Tolerances are a
//     percentage of the largest possible RGB distance (black to white), which keeps
//     thresholds comparable between textures.
// 3.  **Bundled Targets**: `SmartPixel` pairs a target color with its tolerance so the
//     per-pixel loops in the simulator and transformation engine carry one value per
//     target instead of threading the tolerance separately.

pub mod smart_pixel {
    use crate::core_modules::pixel::pixel::Pixel;

    pub type ColorDistance = f64;
    pub type TolerancePercent = f64;

    /// `sqrt(255^2 * 3)`, the distance between black and white.
    pub const MAX_RGB_DISTANCE: ColorDistance = 441.672_955_930_063_7;

    /// Euclidean distance in RGB space.
    pub fn distance(a: Pixel, b: Pixel) -> ColorDistance {
        squared_distance(a, b).sqrt()
    }

    pub fn squared_distance(a: Pixel, b: Pixel) -> ColorDistance {
        let dr = a.red as f64 - b.red as f64;
        let dg = a.green as f64 - b.green as f64;
        let db = a.blue as f64 - b.blue as f64;
        dr * dr + dg * dg + db * db
    }

    /// Distance as a percentage of `MAX_RGB_DISTANCE`. Left unclamped.
    pub fn normalized_distance_percent(a: Pixel, b: Pixel) -> TolerancePercent {
        distance(a, b) / MAX_RGB_DISTANCE * 100.0
    }

    /// True when `pixel` lies within `tolerance_percent` of `target`.
    pub fn matches(pixel: Pixel, target: Pixel, tolerance_percent: TolerancePercent) -> bool {
        normalized_distance_percent(pixel, target) <= tolerance_percent
    }

    /// A target color prepared for one-to-many matching against a whole texture.
    #[derive(Debug, Clone, Copy)]
    pub struct SmartPixel {
        /// The color every candidate is compared against.
        pub pixel: Pixel,
        tolerance: TolerancePercent,
    }

    impl SmartPixel {
        pub fn new(pixel: Pixel, tolerance: TolerancePercent) -> Self {
            Self { pixel, tolerance }
        }

        /// Equivalent to `matches(candidate, self.pixel, tolerance)`, including float
        /// rounding at the boundary.
        #[inline]
        pub fn matches(&self, candidate: Pixel) -> bool {
            matches(candidate, self.pixel, self.tolerance)
        }
    }

}
