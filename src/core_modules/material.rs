// THEORY:
// A recolored texture is only half of the edit. Renderers multiply the sampled texture
// by the material's base color factor, and exporters often read the factor alone, so
// the materials that draw the recolored image must be told about the new color too.
//
// Key architectural principles:
// 1.  **Narrow Model, Lossless Round-Trip**: `AssetDocument` types only the glTF fields
//     this crate touches (materials, textures, images). Every other key, at every
//     level, lands in a flattened `extra` map and is written back unchanged.
// 2.  **Reference Chasing**: A material uses an image through
//     `pbrMetallicRoughness.baseColorTexture.index -> textures[i].source -> images[j]`.
//     Materials without a base color texture are never touched.
// 3.  **Opaque Factor**: The factor written is the target normalized to 0..1 with an
//     alpha of 1.0.

use crate::core_modules::pixel::pixel::Pixel;
use crate::core_modules::texture::TextureBuffer;
use crate::core_modules::utils::image_helper::image_helper;
use crate::error::{RecolorError, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::{Component, Path, PathBuf};

type Extras = Map<String, Value>;

const PNG_MIME_TYPE: &str = "image/png";

/// The storage behind a glTF image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageSource {
    /// A file resolved against the document's directory.
    File(PathBuf),
    /// An inline `data:` URI.
    Embedded(String),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetDocument {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub materials: Vec<Material>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub textures: Vec<TextureRef>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub images: Vec<ImageRef>,
    #[serde(flatten)]
    pub extra: Extras,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Material {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pbr_metallic_roughness: Option<PbrMetallicRoughness>,
    #[serde(flatten)]
    pub extra: Extras,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PbrMetallicRoughness {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_color_factor: Option<[f64; 4]>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_color_texture: Option<TextureInfo>,
    #[serde(flatten)]
    pub extra: Extras,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TextureInfo {
    pub index: usize,
    #[serde(flatten)]
    pub extra: Extras,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TextureRef {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<usize>,
    #[serde(flatten)]
    pub extra: Extras,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageRef {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uri: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
    #[serde(flatten)]
    pub extra: Extras,
}

impl Material {
    /// Index into `AssetDocument::textures` of the base color texture, if any.
    pub fn base_color_texture(&self) -> Option<usize> {
        self.pbr_metallic_roughness
            .as_ref()
            .and_then(|pbr| pbr.base_color_texture.as_ref())
            .map(|info| info.index)
    }

    pub fn base_color_factor(&self) -> Option<[f64; 4]> {
        self.pbr_metallic_roughness
            .as_ref()
            .and_then(|pbr| pbr.base_color_factor)
    }
}

impl AssetDocument {
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        std::fs::write(path, self.to_json_pretty()?)?;
        Ok(())
    }

    pub fn image(&self, index: usize) -> Result<&ImageRef> {
        self.images.get(index).ok_or(RecolorError::MissingImage(index))
    }

    pub fn image_mut(&mut self, index: usize) -> Result<&mut ImageRef> {
        self.images
            .get_mut(index)
            .ok_or(RecolorError::MissingImage(index))
    }

    /// Where the pixels of image `index` live.
    pub fn image_source(&self, document_path: &Path, index: usize) -> Result<ImageSource> {
        let uri = self
            .image(index)?
            .uri
            .as_deref()
            .ok_or(RecolorError::MissingImageUri(index))?;
        Ok(if uri.starts_with("data:") {
            ImageSource::Embedded(uri.to_string())
        } else {
            ImageSource::File(document_dir(document_path).join(uri))
        })
    }

    /// Decodes image `index`, from disk next to the document or from its `data:` URI.
    pub fn load_image(&self, document_path: &Path, index: usize) -> Result<TextureBuffer> {
        match self.image_source(document_path, index)? {
            ImageSource::File(path) => image_helper::load_texture(path),
            ImageSource::Embedded(uri) => image_helper::decode_data_uri(&uri),
        }
    }

    /// Stores `texture` inline as a PNG `data:` URI.
    pub fn embed_image(&mut self, index: usize, texture: &TextureBuffer) -> Result<()> {
        let uri = image_helper::encode_png_data_uri(texture)?;
        let image = self.image_mut(index)?;
        image.uri = Some(uri);
        image.mime_type = Some(PNG_MIME_TYPE.to_string());
        Ok(())
    }

    /// Points image `index` at a PNG on disk, relative to where the document is saved.
    pub fn link_image(&mut self, index: usize, document_path: &Path, image_path: &Path) -> Result<()> {
        let uri = relative_uri(document_path, image_path)?;
        let image = self.image_mut(index)?;
        image.uri = Some(uri);
        image.mime_type = Some(PNG_MIME_TYPE.to_string());
        Ok(())
    }

    /// Indices of materials whose base color texture sources `image_index`.
    pub fn materials_using_image(&self, image_index: usize) -> Vec<usize> {
        self.materials
            .iter()
            .enumerate()
            .filter(|(_, material)| {
                material
                    .base_color_texture()
                    .and_then(|texture| self.textures.get(texture))
                    .and_then(|texture| texture.source)
                    == Some(image_index)
            })
            .map(|(i, _)| i)
            .collect()
    }
}

fn document_dir(document_path: &Path) -> &Path {
    document_path.parent().unwrap_or_else(|| Path::new(""))
}

/// Absolute, with `.` and `..` folded away. The filesystem is not consulted.
fn normalized(path: &Path) -> Result<PathBuf> {
    let absolute = if path.as_os_str().is_empty() {
        std::env::current_dir()?
    } else {
        std::path::absolute(path)?
    };
    let mut out = PathBuf::new();
    for component in absolute.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other),
        }
    }
    Ok(out)
}

/// `image_path` as a `/`-separated URI relative to the directory of `document_path`.
pub fn relative_uri(document_path: &Path, image_path: &Path) -> Result<String> {
    let base = normalized(document_dir(document_path))?;
    let target = normalized(image_path)?;

    let base_parts: Vec<Component> = base.components().collect();
    let target_parts: Vec<Component> = target.components().collect();
    let shared = base_parts
        .iter()
        .zip(&target_parts)
        .take_while(|(a, b)| a == b)
        .count();
    if shared == 0 {
        // Different roots (another drive), so only an absolute reference works.
        return Ok(target.to_string_lossy().replace('\\', "/"));
    }

    let parts: Vec<String> = std::iter::repeat_n("..".to_string(), base_parts.len() - shared)
        .chain(
            target_parts[shared..]
                .iter()
                .map(|c| c.as_os_str().to_string_lossy().into_owned()),
        )
        .collect();
    Ok(parts.join("/"))
}

/// Writes the target color into every material drawing `image_index`.
///
/// Returns the number of materials updated. Zero is not an error but is logged.
pub fn sync_material(document: &mut AssetDocument, image_index: usize, target: Pixel) -> Result<usize> {
    document.image(image_index)?;
    let factor = target.to_base_color_factor();
    let users = document.materials_using_image(image_index);

    for &i in &users {
        let material = &mut document.materials[i];
        if let Some(pbr) = material.pbr_metallic_roughness.as_mut() {
            pbr.base_color_factor = Some(factor);
        }
        log::debug!(
            "material {} ({}) base color factor set to {factor:?}",
            i,
            material.name.as_deref().unwrap_or("unnamed")
        );
    }

    if users.is_empty() {
        log::warn!("no material references image {image_index}; base color factors unchanged");
    } else {
        log::info!("synchronized {} material(s) to {target}", users.len());
    }
    Ok(users.len())
}
