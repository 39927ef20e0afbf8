// THEORY:
// The tolerance recommender answers one advisory question: how loose can a color
// match be before it starts eating clusters the operator did not pick? It measures
// the narrowest gap between any selected and any unselected centroid and suggests
// a tolerance comfortably inside it, bounded to a range that is useful in practice.
// It never mutates anything and the operator is free to ignore it.

use crate::core_modules::color_group::ColorGroup;
use crate::core_modules::smart_pixel::smart_pixel::normalized_distance_percent;

pub const DEFAULT_RECOMMENDED_TOLERANCE: u8 = 20;
pub const MIN_RECOMMENDED_TOLERANCE: u8 = 10;
pub const MAX_RECOMMENDED_TOLERANCE: u8 = 30;
/// Share of the closest selected/unselected gap handed out as tolerance.
pub const GAP_FRACTION: f64 = 0.4;

/// Suggests a tolerance (percent) separating `selected` from `unselected` groups.
///
/// Returns `DEFAULT_RECOMMENDED_TOLERANCE` when either side is empty.
pub fn recommend_tolerance(selected: &[ColorGroup], unselected: &[ColorGroup]) -> u8 {
    let closest_gap = selected
        .iter()
        .flat_map(|s| {
            unselected
                .iter()
                .map(move |u| normalized_distance_percent(s.centroid, u.centroid))
        })
        .min_by(|a, b| a.total_cmp(b));

    match closest_gap {
        Some(gap) => {
            let suggested = (GAP_FRACTION * gap).round();
            suggested.clamp(MIN_RECOMMENDED_TOLERANCE as f64, MAX_RECOMMENDED_TOLERANCE as f64) as u8
        }
        None => DEFAULT_RECOMMENDED_TOLERANCE,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core_modules::pixel::pixel::Pixel;

    fn group(id: usize, centroid: Pixel) -> ColorGroup {
        ColorGroup::new(id, centroid, 1, 3)
    }

    #[test]
    fn opposite_corners_clamp_to_maximum() {
        let selected = [group(0, Pixel::BLACK)];
        let unselected = [group(1, Pixel::WHITE)];
        assert_eq!(recommend_tolerance(&selected, &unselected), 30);
    }

    #[test]
    fn close_neighbours_clamp_to_minimum() {
        let selected = [group(0, Pixel::new(100, 100, 100))];
        let unselected = [group(1, Pixel::new(110, 100, 100))];
        assert_eq!(recommend_tolerance(&selected, &unselected), 10);
    }

    #[test]
    fn uses_the_closest_pair() {
        // (0,0,0) vs (150,0,0): 150 / 441.67 = 33.96%, 0.4 * 33.96 = 13.6 -> 14
        let selected = [group(0, Pixel::BLACK), group(1, Pixel::new(0, 255, 0))];
        let unselected = [group(2, Pixel::new(150, 0, 0)), group(3, Pixel::WHITE)];
        assert_eq!(recommend_tolerance(&selected, &unselected), 14);
    }

    #[test]
    fn nothing_left_unselected_falls_back_to_default() {
        let selected = [group(0, Pixel::BLACK), group(1, Pixel::WHITE)];
        assert_eq!(recommend_tolerance(&selected, &[]), 20);
        assert_eq!(recommend_tolerance(&[], &selected), 20);
    }
}
