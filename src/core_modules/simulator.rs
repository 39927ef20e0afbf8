// THEORY:
// The simulator is the dry run the operator sees before an irreversible edit. It
// evaluates a `SelectionCriteria` against every pixel of the texture at full
// resolution (no sampling) and reports how much of the image would change.
//
// Key architectural principles:
// 1.  **Read-Only**: It borrows the texture and allocates no second image. Calling it
//     again with different criteria needs no re-analysis and has no side effects.
// 2.  **Same Predicate as the Commit**: It uses the exact `PixelMatcher` the
//     transformation engine uses, so `matched_pixels` always equals the number of
//     pixels a subsequent transform will touch.
// 3.  **Order-Independent Counting**: The report is built from two counts. Splitting
//     the work into bands and summing gives the same report (see `parallel_pipeline`).

use crate::core_modules::selection::{PixelMatcher, SelectionCriteria};
use crate::core_modules::texture::{TextureBuffer, pixels_of};
use serde::Serialize;
use std::fmt;

/// Match statistics for one criteria over one texture. Always computed fresh.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SimulationReport {
    pub matched_pixels: usize,
    pub unmatched_pixels: usize,
    pub total_pixels: usize,
    pub matched_percent: f64,
    pub unmatched_percent: f64,
}

impl SimulationReport {
    /// `matched_pixels` is capped at `total_pixels`.
    pub(crate) fn from_counts(matched_pixels: usize, total_pixels: usize) -> Self {
        let matched_pixels = matched_pixels.min(total_pixels);
        let unmatched_pixels = total_pixels - matched_pixels;
        let percent = |count: usize| {
            if total_pixels == 0 {
                0.0
            } else {
                100.0 * count as f64 / total_pixels as f64
            }
        };
        Self {
            matched_pixels,
            unmatched_pixels,
            total_pixels,
            matched_percent: percent(matched_pixels),
            unmatched_percent: percent(unmatched_pixels),
        }
    }

    pub fn is_empty_selection(&self) -> bool {
        self.matched_pixels == 0
    }
}

impl fmt::Display for SimulationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} of {} pixels selected ({:.2}%), {} unchanged ({:.2}%)",
            self.matched_pixels,
            self.total_pixels,
            self.matched_percent,
            self.unmatched_pixels,
            self.unmatched_percent
        )
    }
}

/// Evaluates `criteria` on every pixel of `texture` without modifying it.
pub fn simulate(texture: &TextureBuffer, criteria: &SelectionCriteria) -> SimulationReport {
    let matched = count_matches(texture.as_bytes(), texture.channels(), &criteria.matcher());
    SimulationReport::from_counts(matched, texture.pixel_count())
}

/// Number of selected pixels in an interleaved byte range.
pub(crate) fn count_matches(bytes: &[u8], channels: u8, matcher: &PixelMatcher<'_>) -> usize {
    pixels_of(bytes, channels)
        .filter(|pixel| matcher.is_selected(*pixel))
        .count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core_modules::pixel::pixel::Pixel;

    fn halves() -> TextureBuffer {
        let dark = Pixel::new(0x20, 0x20, 0x20);
        let light = Pixel::new(0xD0, 0xD0, 0xD0);
        let pixels: Vec<Pixel> = (0..16).map(|i| if i < 8 { dark } else { light }).collect();
        TextureBuffer::from_pixels(4, 4, &pixels).unwrap()
    }

    #[test]
    fn brightness_below_selects_the_dark_half() {
        let criteria = SelectionCriteria::brightness_below(100).unwrap();
        let report = simulate(&halves(), &criteria);
        assert_eq!(report.matched_pixels, 8);
        assert_eq!(report.unmatched_pixels, 8);
        assert_eq!(report.total_pixels, 16);
        assert_eq!(report.matched_percent, 50.0);
        assert_eq!(report.unmatched_percent, 50.0);
    }

    #[test]
    fn repeated_calls_do_not_touch_the_texture() {
        let texture = halves();
        let before = texture.clone();
        let above = SelectionCriteria::brightness_above(200).unwrap();
        let color = SelectionCriteria::color_match(Pixel::new(0x20, 0x20, 0x20), 1.0).unwrap();
        let first = simulate(&texture, &above);
        let _ = simulate(&texture, &color);
        assert_eq!(simulate(&texture, &above), first);
        assert_eq!(texture, before);
    }

    #[test]
    fn empty_texture_reports_zero_percent() {
        let texture = TextureBuffer::from_raw(0, 3, 3, Vec::new()).unwrap();
        let report = simulate(&texture, &SelectionCriteria::brightness_above(0).unwrap());
        assert_eq!(report.total_pixels, 0);
        assert_eq!(report.matched_percent, 0.0);
        assert_eq!(report.unmatched_percent, 0.0);
    }

    #[test]
    fn counts_never_exceed_the_total() {
        let report = SimulationReport::from_counts(5, 3);
        assert_eq!(report.matched_pixels, 3);
        assert_eq!(report.unmatched_pixels, 0);
        assert_eq!(report.matched_percent, 100.0);
    }

    #[test]
    fn display_summarizes_counts() {
        let report = SimulationReport::from_counts(1, 4);
        assert_eq!(
            report.to_string(),
            "1 of 4 pixels selected (25.00%), 3 unchanged (75.00%)"
        );
    }
}
