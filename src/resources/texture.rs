use std::path::Path;

use crate::{
    data_structures::material::{Material, MaterialChannel},
    error::{MaterialError, TextureLoadError},
    gpu::{Backend, PixelFormat, TextureSpec},
    import::{SourceMaterial, TextureRef},
};

/**
 * Resolves every channel of a source material to at most one texture.
 *
 * The layout of all channels is checked before anything is loaded, so a
 * material with several textures in one channel fails without creating any GPU
 * resource. A texture that cannot be loaded only drops its own channel.
 */
pub fn resolve_material<B: Backend>(
    backend: &B,
    base_dir: &Path,
    source: &SourceMaterial,
) -> Result<Material<B::Texture>, MaterialError> {
    for channel in MaterialChannel::ALL {
        let count = source.textures(channel).len();
        if count > 1 {
            return Err(MaterialError::UnsupportedLayout {
                material: source.name.clone(),
                channel,
                count,
            });
        }
    }

    let mut material = Material::empty(source.name.clone());
    for channel in MaterialChannel::ALL {
        let Some(reference) = source.textures(channel).first() else {
            continue;
        };
        match load_texture(backend, base_dir, reference, channel) {
            Ok(texture) => material.set_channel(channel, Some(texture)),
            Err(e) => log::warn!(
                "Material {:?} has no {} texture, {}",
                source.name,
                channel,
                load_failure(reference, e)
            ),
        }
    }
    Ok(material)
}

/// Loads and decodes one texture and uploads it for the given channel.
pub fn load_texture<B: Backend>(
    backend: &B,
    base_dir: &Path,
    reference: &TextureRef,
    channel: MaterialChannel,
) -> Result<B::Texture, TextureLoadError> {
    let (label, image) = match reference {
        TextureRef::Path(relative) => {
            if relative.starts_with("data:") {
                return Err(TextureLoadError::UnsupportedSource(truncated(relative)));
            }
            let path = base_dir.join(relative);
            let bytes = std::fs::read(&path).map_err(|source| match source.kind() {
                std::io::ErrorKind::NotFound => TextureLoadError::NotFound { path: path.clone() },
                _ => TextureLoadError::Io {
                    path: path.clone(),
                    source,
                },
            })?;
            let image = image::load_from_memory(&bytes).map_err(|source| {
                TextureLoadError::Decode {
                    label: relative.clone(),
                    source,
                }
            })?;
            (relative.clone(), image)
        }
        TextureRef::Embedded {
            label,
            bytes,
            mime_type,
        } => {
            let format = mime_type
                .as_deref()
                .and_then(image::ImageFormat::from_mime_type);
            let decoded = match format {
                Some(format) => image::load_from_memory_with_format(bytes, format),
                None => image::load_from_memory(bytes),
            };
            let image = decoded.map_err(|source| TextureLoadError::Decode {
                label: label.clone(),
                source,
            })?;
            (label.clone(), image)
        }
    };

    let channels = image.color().channel_count();
    let format = PixelFormat::from_channel_count(channels).ok_or_else(|| {
        TextureLoadError::UnsupportedChannelCount {
            label: label.clone(),
            channels,
        }
    })?;
    // 16 bit and float images are narrowed to 8 bit per channel
    let pixels = match format {
        PixelFormat::Rgb8 => image.to_rgb8().into_raw(),
        PixelFormat::Rgba8 => image.to_rgba8().into_raw(),
    };
    let spec = TextureSpec {
        format,
        srgb: channel.is_srgb(),
    };
    Ok(backend.create_texture(&label, image.width(), image.height(), &pixels, spec)?)
}

fn load_failure(reference: &TextureRef, error: TextureLoadError) -> String {
    format!(
        "{} could not be loaded: {:#}",
        reference,
        anyhow::Error::from(error)
    )
}

fn truncated(uri: &str) -> String {
    match uri.char_indices().nth(32) {
        Some((end, _)) => format!("{}...", &uri[..end]),
        None => uri.to_string(),
    }
}
