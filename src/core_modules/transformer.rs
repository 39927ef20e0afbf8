// THEORY:
// The transformer is the committing pass. For every pixel it asks the same
// `PixelMatcher` the simulator asked; unmatched pixels are copied bit-for-bit and
// matched pixels are blended toward the target color. The result is a new buffer of
// the same shape; the source is only borrowed.
//
// Two blends exist and the choice depends on the mode and on how light the target is:
//
// - Additive (Smart Replace, target brightness > 180):
//     out = round(src * 0.2 + target * m), m = (0.92, 0.90, 0.88) for (R, G, B)
//   A light target painted multiplicatively would wash highlights flat, so a fifth
//   of the source shading is kept and the target is scaled slightly unevenly per
//   channel to avoid a plastic look. The constants are empirically tuned.
//
// - Multiplicative (Smart Replace with a dark target, or Tint always):
//     out = round(src * target / 255)
//   The source acts as a shading mask over the target hue.
//
// Alpha, when present, is never read and is copied through.

use crate::core_modules::pixel::pixel::{Brightness, Pixel};
use crate::core_modules::selection::{PixelMatcher, SelectionCriteria};
use crate::core_modules::texture::TextureBuffer;
use serde::Serialize;
use std::fmt;
use std::str::FromStr;

/// Targets brighter than this use the additive blend in Smart Replace mode.
pub const LIGHT_TARGET_THRESHOLD: Brightness = 180;
/// Share of the source kept by the additive blend.
pub const SOURCE_RETENTION: f64 = 0.2;
/// Per-channel (R, G, B) target weights of the additive blend.
pub const LIGHT_TARGET_MULTIPLIERS: [f64; 3] = [0.92, 0.90, 0.88];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum TransformationMode {
    /// Additive blend for light targets, multiplicative tint for dark ones.
    #[default]
    SmartReplace,
    /// Multiplicative tint regardless of target lightness.
    Tint,
}

impl fmt::Display for TransformationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SmartReplace => f.write_str("smart-replace"),
            Self::Tint => f.write_str("tint"),
        }
    }
}

impl FromStr for TransformationMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "smart" | "smart-replace" | "smart_replace" | "replace" => Ok(Self::SmartReplace),
            "tint" => Ok(Self::Tint),
            other => Err(format!("unknown transformation mode {other:?}, expected smart or tint")),
        }
    }
}

/// The per-pixel formula applied to selected pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Blend {
    Additive,
    Multiplicative,
}

pub fn is_light(target: Pixel) -> bool {
    target.brightness() > LIGHT_TARGET_THRESHOLD
}

pub fn blend_for(target: Pixel, mode: TransformationMode) -> Blend {
    match mode {
        TransformationMode::SmartReplace if is_light(target) => Blend::Additive,
        _ => Blend::Multiplicative,
    }
}

#[inline]
pub fn blend_pixel(source: Pixel, target: Pixel, blend: Blend) -> Pixel {
    let src = source.to_array();
    let tgt = target.to_array();
    let channel = |i: usize| -> u8 {
        let s = src[i] as f64;
        let t = tgt[i] as f64;
        let value = match blend {
            Blend::Additive => s * SOURCE_RETENTION + t * LIGHT_TARGET_MULTIPLIERS[i],
            Blend::Multiplicative => s * (t / 255.0),
        };
        value.round().clamp(0.0, 255.0) as u8
    };
    Pixel::new(channel(0), channel(1), channel(2))
}

/// Recolors the pixels selected by `criteria` and returns a new buffer.
pub fn transform(
    texture: &TextureBuffer,
    criteria: &SelectionCriteria,
    target: Pixel,
    mode: TransformationMode,
) -> TextureBuffer {
    let blend = blend_for(target, mode);
    log::debug!("transforming {} pixels toward {target} with {blend:?} blend ({mode})", texture.pixel_count());
    let data = transform_bytes(
        texture.as_bytes(),
        texture.channels(),
        &criteria.matcher(),
        target,
        blend,
    );
    texture.with_bytes(data)
}

/// Interleaved-byte core of `transform`, shared with the parallel pipeline.
pub(crate) fn transform_bytes(
    bytes: &[u8],
    channels: u8,
    matcher: &PixelMatcher<'_>,
    target: Pixel,
    blend: Blend,
) -> Vec<u8> {
    let mut out = bytes.to_vec();
    for px in out.chunks_exact_mut(channels as usize) {
        let source = Pixel::new(px[0], px[1], px[2]);
        if matcher.is_selected(source) {
            let blended = blend_pixel(source, target, blend);
            px[0] = blended.red;
            px[1] = blended.green;
            px[2] = blended.blue;
        }
    }
    out
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

    #[test]
    fn red_tint_on_dark_half() {
        let criteria = SelectionCriteria::brightness_below(100).unwrap();
        let red = Pixel::new(255, 0, 0);
        let out = transform(&halves(), &criteria, red, TransformationMode::Tint);
        for i in 0..8 {
            assert_eq!(out.pixel(i), Pixel::new(32, 0, 0));
        }
        for i in 8..16 {
            assert_eq!(out.pixel(i), Pixel::new(0xD0, 0xD0, 0xD0));
        }
    }

    #[test]
    fn smart_replace_picks_blend_by_target_lightness() {
        assert_eq!(blend_for(Pixel::new(255, 0, 0), TransformationMode::SmartReplace), Blend::Multiplicative);
        assert_eq!(blend_for(Pixel::new(181, 181, 181), TransformationMode::SmartReplace), Blend::Additive);
        assert_eq!(blend_for(Pixel::new(180, 180, 180), TransformationMode::SmartReplace), Blend::Multiplicative);
        assert_eq!(blend_for(Pixel::WHITE, TransformationMode::Tint), Blend::Multiplicative);
    }

    #[test]
    fn additive_blend_uses_per_channel_weights() {
        let out = blend_pixel(Pixel::new(50, 50, 50), Pixel::new(200, 200, 200), Blend::Additive);
        assert_eq!(out, Pixel::new(194, 190, 186));
        let saturated = blend_pixel(Pixel::WHITE, Pixel::WHITE, Blend::Additive);
        assert_eq!(saturated, Pixel::new(255, 255, 255));
    }

    #[test]
    fn multiplicative_blend_masks_the_target() {
        let out = blend_pixel(Pixel::new(50, 100, 255), Pixel::new(200, 200, 200), Blend::Multiplicative);
        assert_eq!(out, Pixel::new(39, 78, 200));
    }

    #[test]
    fn alpha_and_unmatched_pixels_survive_bit_exact() {
        let bytes: Vec<u8> = (0..16u8)
            .flat_map(|i| {
                let v: u8 = if i % 2 == 0 { 20 } else { 230 };
                [v, v.wrapping_add(i), v, 255 - i * 7]
            })
            .collect();
        let texture = TextureBuffer::from_raw(4, 4, 4, bytes).unwrap();
        let criteria = SelectionCriteria::brightness_above(128).unwrap();
        let out = transform(&texture, &criteria, Pixel::new(0, 90, 200), TransformationMode::SmartReplace);

        assert_eq!(out.dimensions(), texture.dimensions());
        assert_eq!(out.channels(), 4);
        for i in 0..texture.pixel_count() {
            assert_eq!(out.alpha(i), texture.alpha(i));
            if !criteria.is_selected(texture.pixel(i)) {
                assert_eq!(out.pixel(i), texture.pixel(i));
            }
        }
        assert_ne!(out, texture);
    }

    #[test]
    fn tint_is_not_idempotent_for_non_white_targets() {
        let everything = SelectionCriteria::brightness_above(0).unwrap();
        let texture = halves();
        let grey = Pixel::new(128, 128, 128);
        let once = transform(&texture, &everything, grey, TransformationMode::Tint);
        let twice = transform(&once, &everything, grey, TransformationMode::Tint);
        assert_ne!(once, twice);

        // A white target is the only multiplicative identity.
        let white_once = transform(&texture, &everything, Pixel::WHITE, TransformationMode::Tint);
        assert_eq!(white_once, texture);

        // Smart Replace with white takes the additive branch and keeps drifting.
        let smart_once = transform(&texture, &everything, Pixel::WHITE, TransformationMode::SmartReplace);
        let smart_twice = transform(&smart_once, &everything, Pixel::WHITE, TransformationMode::SmartReplace);
        assert_ne!(smart_once, smart_twice);
    }

    #[test]
    fn mode_parses_from_operator_input() {
        assert_eq!("Smart".parse::<TransformationMode>().unwrap(), TransformationMode::SmartReplace);
        assert_eq!("tint".parse::<TransformationMode>().unwrap(), TransformationMode::Tint);
        assert!("paint".parse::<TransformationMode>().is_err());
    }
}
