//! GPU resource abstraction.
//!
//! Scene building only needs two things from a graphics API: turn interleaved
//! vertex data into a drawable mesh and turn decoded pixels into a texture.
//! [`Backend`] captures exactly that. The wgpu implementation lives in
//! [`crate::context`], the CPU-side one in [`headless`].

pub mod headless;

use crate::{data_structures::vertex::VertexAttribute, error::GpuError};

/// Pixel layout of decoded image data.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PixelFormat {
    Rgb8,
    Rgba8,
}

impl PixelFormat {
    /// Maps an image channel count to a format. Only 3 and 4 channels are supported.
    pub fn from_channel_count(channels: u8) -> Option<Self> {
        match channels {
            3 => Some(PixelFormat::Rgb8),
            4 => Some(PixelFormat::Rgba8),
            _ => None,
        }
    }

    pub const fn bytes_per_pixel(self) -> usize {
        match self {
            PixelFormat::Rgb8 => 3,
            PixelFormat::Rgba8 => 4,
        }
    }
}

/// How pixel bytes handed to [`Backend::create_texture`] are to be interpreted.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TextureSpec {
    pub format: PixelFormat,
    pub srgb: bool,
}

/// Creates the GPU resources a scene owns.
///
/// Resources are released when dropped. A scene holds each one exactly once,
/// so dropping the scene releases everything it created.
pub trait Backend {
    type Mesh;
    type Texture;

    /// Create a mesh from an interleaved vertex buffer laid out as `attributes`.
    fn create_mesh(
        &self,
        label: &str,
        vertices: &[f32],
        attributes: &[VertexAttribute],
        indices: &[u32],
    ) -> Result<Self::Mesh, GpuError>;

    /// Create a 2D texture from tightly packed rows of `spec.format` pixels.
    fn create_texture(
        &self,
        label: &str,
        width: u32,
        height: u32,
        pixels: &[u8],
        spec: TextureSpec,
    ) -> Result<Self::Texture, GpuError>;
}

/// Checks shared by every backend before uploading vertex data.
pub(crate) fn validate_mesh(
    label: &str,
    vertices: &[f32],
    attributes: &[VertexAttribute],
    indices: &[u32],
) -> Result<usize, GpuError> {
    let invalid = |reason: String| GpuError::InvalidMesh {
        label: label.to_string(),
        reason,
    };
    let stride = crate::data_structures::vertex::stride(attributes);
    if stride == 0 {
        return if vertices.is_empty() && indices.is_empty() {
            Ok(0)
        } else {
            Err(invalid("vertex data without attributes".to_string()))
        };
    }
    if vertices.len() % stride != 0 {
        return Err(invalid(format!(
            "{} floats is not a multiple of the vertex stride {}",
            vertices.len(),
            stride
        )));
    }
    let vertex_count = vertices.len() / stride;
    if let Some(index) = indices.iter().find(|&&i| i as usize >= vertex_count) {
        return Err(invalid(format!(
            "index {index} out of range for {vertex_count} vertices"
        )));
    }
    Ok(vertex_count)
}

pub(crate) fn validate_texture(
    label: &str,
    width: u32,
    height: u32,
    pixels: &[u8],
    spec: TextureSpec,
) -> Result<(), GpuError> {
    let expected = width as usize * height as usize * spec.format.bytes_per_pixel();
    if width == 0 || height == 0 {
        return Err(GpuError::InvalidTexture {
            label: label.to_string(),
            reason: format!("empty extent {width}x{height}"),
        });
    }
    if pixels.len() != expected {
        return Err(GpuError::InvalidTexture {
            label: label.to_string(),
            reason: format!("expected {expected} bytes, got {}", pixels.len()),
        });
    }
    Ok(())
}

/// Rejects extents the device cannot allocate as a 2D texture.
pub(crate) fn validate_texture_extent(
    label: &str,
    width: u32,
    height: u32,
    max_dimension: u32,
) -> Result<(), GpuError> {
    if width > max_dimension || height > max_dimension {
        return Err(GpuError::InvalidTexture {
            label: label.to_string(),
            reason: format!("extent {width}x{height} exceeds the device limit of {max_dimension}"),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_three_and_four_channels_map_to_formats() {
        assert_eq!(PixelFormat::from_channel_count(3), Some(PixelFormat::Rgb8));
        assert_eq!(PixelFormat::from_channel_count(4), Some(PixelFormat::Rgba8));
        assert_eq!(PixelFormat::from_channel_count(1), None);
        assert_eq!(PixelFormat::from_channel_count(2), None);
    }

    #[test]
    fn rejects_out_of_range_indices() {
        let attributes = [VertexAttribute::position()];
        let vertices = [0.0; 9];

        assert_eq!(
            validate_mesh("tri", &vertices, &attributes, &[0, 1, 2]),
            Ok(3)
        );
        assert!(validate_mesh("tri", &vertices, &attributes, &[0, 1, 3]).is_err());
        assert!(validate_mesh("tri", &vertices[..8], &attributes, &[]).is_err());
    }

    #[test]
    fn rejects_extents_above_the_device_limit() {
        assert!(validate_texture_extent("big", 8192, 8192, 8192).is_ok());
        assert!(matches!(
            validate_texture_extent("wide", 16384, 1, 8192),
            Err(GpuError::InvalidTexture { label, .. }) if label == "wide"
        ));
        assert!(validate_texture_extent("tall", 1, 8193, 8192).is_err());
    }
}
