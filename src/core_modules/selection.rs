// THEORY:
// The `Selection` module decides, per pixel, whether the operator's recolor applies.
// It is the contract shared by the simulator and the transformation engine: both
// evaluate pixels through the same `PixelMatcher`, so a preview can never disagree
// with the commit that follows it.
//
// Key architectural principles:
// 1.  **Closed Set of Predicates**: The six ways an operator can point at a region are
//     variants of one enum with their data attached. Dispatch is a `match`, never a
//     string comparison.
// 2.  **Validated at Construction**: Brightness thresholds are `u8` so they cannot leave
//     0..255; tolerances are a `Tolerance` newtype that only exists inside 0..100;
//     brightness ranges are a `BrightnessRange` that only exists when `min <= max`.
//     Nothing is clamped silently, an out-of-range input is an error.
// 3.  **Provenance Is Kept**: `ColorMatch` (typed hex) and `ClusterMatch` (picked group)
//     evaluate identically. They stay separate variants so front-ends can describe
//     where the target came from.

use crate::core_modules::color_group::ColorGroup;
use crate::core_modules::pixel::pixel::{Brightness, Pixel};
use crate::core_modules::smart_pixel::smart_pixel::{SmartPixel, TolerancePercent};
use crate::error::{RecolorError, Result};
use std::fmt;

pub const MAX_TOLERANCE: TolerancePercent = 100.0;

/// A color similarity threshold in percent of the maximum RGB distance.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct Tolerance(TolerancePercent);

impl Tolerance {
    pub fn new(percent: TolerancePercent) -> Result<Self> {
        if !percent.is_finite() || !(0.0..=MAX_TOLERANCE).contains(&percent) {
            return Err(RecolorError::OutOfRange {
                field: "tolerance",
                value: percent,
                min: 0.0,
                max: MAX_TOLERANCE,
            });
        }
        Ok(Self(percent))
    }

    pub fn percent(self) -> TolerancePercent {
        self.0
    }
}

impl TryFrom<u8> for Tolerance {
    type Error = RecolorError;

    fn try_from(percent: u8) -> Result<Self> {
        Self::new(percent as TolerancePercent)
    }
}

/// An inclusive brightness window with `min <= max`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BrightnessRange {
    min: Brightness,
    max: Brightness,
}

impl BrightnessRange {
    pub fn new(min: Brightness, max: Brightness) -> Result<Self> {
        if min > max {
            return Err(RecolorError::InvalidRange { min, max });
        }
        Ok(Self { min, max })
    }

    pub fn min(&self) -> Brightness {
        self.min
    }

    pub fn max(&self) -> Brightness {
        self.max
    }

    pub fn contains(&self, brightness: Brightness) -> bool {
        (self.min..=self.max).contains(&brightness)
    }
}

/// Which pixels a recolor operation affects.
#[derive(Debug, Clone, PartialEq)]
pub enum SelectionCriteria {
    /// Pixels with `brightness >= threshold`.
    BrightnessAbove(Brightness),
    /// Pixels with `brightness <= threshold`.
    BrightnessBelow(Brightness),
    /// Pixels with `min <= brightness <= max`.
    BrightnessBetween(BrightnessRange),
    /// Pixels within tolerance of a manually entered color.
    ColorMatch { target: Pixel, tolerance: Tolerance },
    /// Pixels within tolerance of a detected color group's centroid.
    ClusterMatch { target: Pixel, tolerance: Tolerance },
    /// Pixels within tolerance of any of several group centroids.
    MultiClusterMatch {
        targets: Vec<Pixel>,
        tolerance: Tolerance,
    },
}

/// Checks raw operator input for the 0..255 brightness scale.
pub fn brightness_threshold(field: &'static str, value: i64) -> Result<Brightness> {
    Brightness::try_from(value).map_err(|_| RecolorError::OutOfRange {
        field,
        value: value as f64,
        min: 0.0,
        max: Brightness::MAX as f64,
    })
}

impl SelectionCriteria {
    pub fn brightness_above(threshold: i64) -> Result<Self> {
        Ok(Self::BrightnessAbove(brightness_threshold("threshold", threshold)?))
    }

    pub fn brightness_below(threshold: i64) -> Result<Self> {
        Ok(Self::BrightnessBelow(brightness_threshold("threshold", threshold)?))
    }

    pub fn brightness_between(min: i64, max: i64) -> Result<Self> {
        let range = BrightnessRange::new(
            brightness_threshold("min", min)?,
            brightness_threshold("max", max)?,
        )?;
        Ok(Self::BrightnessBetween(range))
    }

    pub fn color_match(target: Pixel, tolerance: TolerancePercent) -> Result<Self> {
        Ok(Self::ColorMatch {
            target,
            tolerance: Tolerance::new(tolerance)?,
        })
    }

    pub fn cluster_match(group: &ColorGroup, tolerance: TolerancePercent) -> Result<Self> {
        Ok(Self::ClusterMatch {
            target: group.centroid,
            tolerance: Tolerance::new(tolerance)?,
        })
    }

    pub fn multi_cluster_match(groups: &[ColorGroup], tolerance: TolerancePercent) -> Result<Self> {
        if groups.is_empty() {
            return Err(RecolorError::NoTargets);
        }
        Ok(Self::MultiClusterMatch {
            targets: groups.iter().map(|g| g.centroid).collect(),
            tolerance: Tolerance::new(tolerance)?,
        })
    }

    /// One group becomes a `ClusterMatch`, several a `MultiClusterMatch`.
    pub fn for_groups(groups: &[ColorGroup], tolerance: TolerancePercent) -> Result<Self> {
        match groups {
            [] => Err(RecolorError::NoTargets),
            [single] => Self::cluster_match(single, tolerance),
            many => Self::multi_cluster_match(many, tolerance),
        }
    }

    /// Prepares the criteria for a full-texture pass.
    pub fn matcher(&self) -> PixelMatcher<'_> {
        let targets = match self {
            Self::ColorMatch { target, tolerance } | Self::ClusterMatch { target, tolerance } => {
                vec![SmartPixel::new(*target, tolerance.percent())]
            }
            Self::MultiClusterMatch { targets, tolerance } => targets
                .iter()
                .map(|t| SmartPixel::new(*t, tolerance.percent()))
                .collect(),
            _ => Vec::new(),
        };
        PixelMatcher {
            criteria: self,
            targets,
        }
    }

    /// The per-pixel predicate. Prefer `matcher()` inside loops.
    pub fn is_selected(&self, pixel: Pixel) -> bool {
        self.matcher().is_selected(pixel)
    }
}

/// Criteria bound to their prepared targets, reused across every pixel of a pass.
pub struct PixelMatcher<'a> {
    criteria: &'a SelectionCriteria,
    targets: Vec<SmartPixel>,
}

impl PixelMatcher<'_> {
    #[inline]
    pub fn is_selected(&self, pixel: Pixel) -> bool {
        match self.criteria {
            SelectionCriteria::BrightnessAbove(t) => pixel.brightness() >= *t,
            SelectionCriteria::BrightnessBelow(t) => pixel.brightness() <= *t,
            SelectionCriteria::BrightnessBetween(range) => range.contains(pixel.brightness()),
            SelectionCriteria::ColorMatch { .. }
            | SelectionCriteria::ClusterMatch { .. }
            | SelectionCriteria::MultiClusterMatch { .. } => {
                self.targets.iter().any(|t| t.matches(pixel))
            }
        }
    }
}

impl fmt::Display for SelectionCriteria {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BrightnessAbove(t) => write!(f, "brightness >= {t}"),
            Self::BrightnessBelow(t) => write!(f, "brightness <= {t}"),
            Self::BrightnessBetween(r) => write!(f, "brightness {}..={}", r.min, r.max),
            Self::ColorMatch { target, tolerance } => {
                write!(f, "color {target} within {}%", tolerance.percent())
            }
            Self::ClusterMatch { target, tolerance } => {
                write!(f, "cluster {target} within {}%", tolerance.percent())
            }
            Self::MultiClusterMatch { targets, tolerance } => {
                let hexes: Vec<String> = targets.iter().map(Pixel::hex).collect();
                write!(f, "clusters [{}] within {}%", hexes.join(", "), tolerance.percent())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn group(centroid: Pixel) -> ColorGroup {
        ColorGroup::new(0, centroid, 1, 1)
    }

    #[test]
    fn brightness_predicates_are_inclusive() {
        let pixel = Pixel::new(100, 100, 100);
        assert!(SelectionCriteria::brightness_above(100).unwrap().is_selected(pixel));
        assert!(!SelectionCriteria::brightness_above(101).unwrap().is_selected(pixel));
        assert!(SelectionCriteria::brightness_below(100).unwrap().is_selected(pixel));
        assert!(!SelectionCriteria::brightness_below(99).unwrap().is_selected(pixel));
        assert!(SelectionCriteria::brightness_between(100, 100).unwrap().is_selected(pixel));
        assert!(!SelectionCriteria::brightness_between(0, 99).unwrap().is_selected(pixel));
    }

    #[test]
    fn out_of_range_inputs_are_rejected_not_clamped() {
        assert!(matches!(
            SelectionCriteria::brightness_above(256),
            Err(RecolorError::OutOfRange { field: "threshold", .. })
        ));
        assert!(SelectionCriteria::brightness_below(-1).is_err());
        assert!(SelectionCriteria::color_match(Pixel::BLACK, 100.5).is_err());
        assert!(SelectionCriteria::color_match(Pixel::BLACK, -0.1).is_err());
        assert!(SelectionCriteria::color_match(Pixel::BLACK, f64::NAN).is_err());
        assert!(SelectionCriteria::color_match(Pixel::BLACK, 100.0).is_ok());
    }

    #[test]
    fn integer_tolerances_are_validated_too() {
        assert_eq!(Tolerance::try_from(30u8).unwrap().percent(), 30.0);
        assert_eq!(Tolerance::try_from(100u8).unwrap().percent(), 100.0);
        assert!(matches!(
            Tolerance::try_from(150u8),
            Err(RecolorError::OutOfRange { field: "tolerance", value, .. }) if value == 150.0
        ));
    }

    #[test]
    fn inverted_range_is_invalid() {
        assert!(matches!(
            SelectionCriteria::brightness_between(200, 100),
            Err(RecolorError::InvalidRange { min: 200, max: 100 })
        ));
    }

    #[test]
    fn color_and_cluster_match_agree() {
        let target = Pixel::new(200, 40, 40);
        let color = SelectionCriteria::color_match(target, 10.0).unwrap();
        let cluster = SelectionCriteria::cluster_match(&group(target), 10.0).unwrap();
        for pixel in [target, Pixel::new(210, 50, 30), Pixel::new(100, 40, 40), Pixel::WHITE] {
            assert_eq!(color.is_selected(pixel), cluster.is_selected(pixel));
        }
    }

    #[test]
    fn multi_cluster_is_a_logical_or() {
        let criteria = SelectionCriteria::multi_cluster_match(
            &[group(Pixel::BLACK), group(Pixel::WHITE)],
            5.0,
        )
        .unwrap();
        assert!(criteria.is_selected(Pixel::new(3, 3, 3)));
        assert!(criteria.is_selected(Pixel::new(250, 250, 250)));
        assert!(!criteria.is_selected(Pixel::new(128, 128, 128)));
    }

    #[test]
    fn group_selection_picks_variant_by_count() {
        let one = SelectionCriteria::for_groups(&[group(Pixel::BLACK)], 20.0).unwrap();
        assert!(matches!(one, SelectionCriteria::ClusterMatch { .. }));
        let two =
            SelectionCriteria::for_groups(&[group(Pixel::BLACK), group(Pixel::WHITE)], 20.0).unwrap();
        assert!(matches!(two, SelectionCriteria::MultiClusterMatch { .. }));
        assert!(matches!(
            SelectionCriteria::for_groups(&[], 20.0),
            Err(RecolorError::NoTargets)
        ));
    }

    #[test]
    fn display_names_the_predicate() {
        let criteria = SelectionCriteria::color_match(Pixel::new(255, 0, 0), 12.5).unwrap();
        assert_eq!(criteria.to_string(), "color #FF0000 within 12.5%");
    }
}
