// THEORY (Pixel):
// The `Pixel` module is the most fundamental unit of the recoloring engine. It is a
// "dumb" value type for a single RGB color plus the handful of single-pixel
// heuristics every higher layer agrees on. Anything that needs two pixels
// (distances, matching) lives in `smart_pixel`.
//
// What lives here:
// - Raw channels (RGB, 0..255). Alpha never enters a `Pixel`: the texture keeps it
//   on the side and copies it through untouched.
// - Brightness: the rounded channel mean, `round((r + g + b) / 3)`. Clustering,
//   selection and the transformation engine all read brightness through this one
//   function so that displayed values and predicate results can never disagree.
// - Hex parsing and formatting. A target color only exists once `#RRGGBB` has been
//   parsed, so an invalid color never reaches the pipeline.
//
// Key principles:
// 1) Single-pixel scope: nothing here reads neighbors or other pixels.
// 2) `Copy` semantics: pixels are read out of buffers by value and never aliased.

pub mod pixel {
    use crate::error::RecolorError;
    use serde::{Deserialize, Serialize};
    use std::fmt;
    use std::str::FromStr;

    pub type Channel = u8;
    pub type Brightness = u8;
    pub type Sum = u16;

    pub const CHANNELS: usize = 3;

    /// A single RGB color.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    pub struct Pixel {
        /// The red channel value (0-255).
        pub red: Channel,
        /// The green channel value (0-255).
        pub green: Channel,
        /// The blue channel value (0-255).
        pub blue: Channel,
    }

    impl Pixel {
        pub const BLACK: Pixel = Pixel::new(0, 0, 0);
        pub const WHITE: Pixel = Pixel::new(255, 255, 255);

        pub const fn new(red: Channel, green: Channel, blue: Channel) -> Self {
            Self { red, green, blue }
        }

        /// Raw channel sum (0..765).
        pub fn sum(&self) -> Sum {
            self.red as Sum + self.green as Sum + self.blue as Sum
        }

        /// Rounded channel mean, `round((r + g + b) / 3)`.
        ///
        /// Integer form of the rounding: for `s = 3q + r`, adding one before the
        /// division rounds up exactly when the remainder is 2.
        pub fn brightness(&self) -> Brightness {
            ((self.sum() + 1) / 3) as Brightness
        }

        pub fn to_array(self) -> [Channel; CHANNELS] {
            [self.red, self.green, self.blue]
        }

        /// Uppercase `#RRGGBB`.
        pub fn hex(&self) -> String {
            format!("#{:02X}{:02X}{:02X}", self.red, self.green, self.blue)
        }

        /// Parses `#RRGGBB` (either case). The leading `#` is required.
        pub fn from_hex(input: &str) -> Result<Self, RecolorError> {
            let trimmed = input.trim();
            let digits = trimmed
                .strip_prefix('#')
                .ok_or_else(|| RecolorError::InvalidHex(input.to_string()))?;
            if digits.len() != 6 || !digits.chars().all(|c| c.is_ascii_hexdigit()) {
                return Err(RecolorError::InvalidHex(input.to_string()));
            }
            let channel = |range: std::ops::Range<usize>| {
                u8::from_str_radix(&digits[range], 16)
                    .map_err(|_| RecolorError::InvalidHex(input.to_string()))
            };
            Ok(Self::new(channel(0..2)?, channel(2..4)?, channel(4..6)?))
        }

        /// Normalized `[r, g, b, 1.0]`, the form glTF stores as a base color factor.
        pub fn to_base_color_factor(self) -> [f64; 4] {
            [
                self.red as f64 / 255.0,
                self.green as f64 / 255.0,
                self.blue as f64 / 255.0,
                1.0,
            ]
        }
    }

    impl fmt::Display for Pixel {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str(&self.hex())
        }
    }

    impl FromStr for Pixel {
        type Err = RecolorError;

        fn from_str(s: &str) -> Result<Self, Self::Err> {
            Self::from_hex(s)
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn brightness_rounds_the_channel_mean() {
            assert_eq!(Pixel::new(0x20, 0x20, 0x20).brightness(), 32);
            assert_eq!(Pixel::new(0xD0, 0xD0, 0xD0).brightness(), 208);
            assert_eq!(Pixel::new(255, 0, 0).brightness(), 85);
            // 1 / 3 = 0.33 rounds down, 2 / 3 = 0.67 rounds up
            assert_eq!(Pixel::new(1, 0, 0).brightness(), 0);
            assert_eq!(Pixel::new(1, 1, 0).brightness(), 1);
            assert_eq!(Pixel::WHITE.brightness(), 255);
        }

        #[test]
        fn hex_parses_both_cases() {
            assert_eq!(Pixel::from_hex("#ff8000").unwrap(), Pixel::new(255, 128, 0));
            assert_eq!("#FF8000".parse::<Pixel>().unwrap(), Pixel::new(255, 128, 0));
            assert_eq!(Pixel::new(171, 205, 239).hex(), "#ABCDEF");
        }

        #[test]
        fn malformed_hex_is_rejected() {
            for bad in ["FF8000", "#FF80", "#FF800000", "#GG8000", "", "#"] {
                assert!(
                    matches!(Pixel::from_hex(bad), Err(RecolorError::InvalidHex(_))),
                    "{bad:?} should not parse"
                );
            }
        }

        #[test]
        fn base_color_factor_is_opaque() {
            let factor = Pixel::new(255, 0, 51).to_base_color_factor();
            assert_eq!(factor, [1.0, 0.0, 0.2, 1.0]);
        }
    }
}

// -----------------------------------------------------------------------------
// Glossary: Single-Pixel Color Terms
//
// - Brightness: rounded arithmetic mean of R, G and B (not a perceptual luma).
//   Operator thresholds are compared against the same value the groups display.
//
// - Base Color Factor: the flat RGBA multiplier of a glTF PBR material, stored as
//   normalized floats.
// -----------------------------------------------------------------------------
