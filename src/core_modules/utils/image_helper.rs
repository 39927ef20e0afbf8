pub mod image_helper {
    use crate::core_modules::texture::TextureBuffer;
    use crate::error::{RecolorError, Result};
    use base64::Engine;
    use base64::engine::general_purpose::STANDARD as B64;
    use image::{ImageEncoder, ImageFormat};
    use std::io::Cursor;
    use std::path::Path;

    /// Decodes any format `image` understands into a `TextureBuffer`.
    pub fn load_texture(path: impl AsRef<Path>) -> Result<TextureBuffer> {
        let path = path.as_ref();
        let decoded = image::open(path)?;
        let texture = TextureBuffer::from_dynamic_image(&decoded);
        log::info!(
            "loaded {} ({}x{}, {} channels)",
            path.display(),
            texture.width(),
            texture.height(),
            texture.channels()
        );
        Ok(texture)
    }

    /// Writes the buffer as a PNG, RGBA when it carries alpha.
    pub fn save_texture(path: impl AsRef<Path>, texture: &TextureBuffer) -> Result<()> {
        let output = std::fs::File::create(path.as_ref())?;
        let encoder = image::codecs::png::PngEncoder::new(std::io::BufWriter::new(output));
        let color = if texture.has_alpha() {
            image::ExtendedColorType::Rgba8
        } else {
            image::ExtendedColorType::Rgb8
        };

        encoder.write_image(texture.as_bytes(), texture.width(), texture.height(), color)?;

        log::info!("saved {}", path.as_ref().display());
        Ok(())
    }

    /// Decodes a `data:image/<type>;base64,<payload>` URI.
    pub fn decode_data_uri(uri: &str) -> Result<TextureBuffer> {
        let (header, payload) = uri
            .split_once(',')
            .ok_or(RecolorError::UnsupportedDataUri)?;
        if !header.starts_with("data:image/") || !header.ends_with(";base64") {
            return Err(RecolorError::UnsupportedDataUri);
        }
        let bytes = B64
            .decode(payload.trim())
            .map_err(|_| RecolorError::UnsupportedDataUri)?;
        let decoded = image::load_from_memory(&bytes)?;
        Ok(TextureBuffer::from_dynamic_image(&decoded))
    }

    /// Encodes the buffer as a PNG `data:` URI.
    pub fn encode_png_data_uri(texture: &TextureBuffer) -> Result<String> {
        let mut buf = Cursor::new(Vec::new());
        texture.to_dynamic_image()?.write_to(&mut buf, ImageFormat::Png)?;
        Ok(format!("data:image/png;base64,{}", B64.encode(buf.into_inner())))
    }
}
