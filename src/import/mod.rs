//! Importers and the neutral source model they produce.
//!
//! Each importer reads one interchange format and describes it as a
//! [`SourceScene`]: a node tree with local transforms, a flat table of meshes
//! and a flat table of materials. Nothing here touches the GPU; converting the
//! source model into owned resources is the job of [`crate::resources`].

pub mod gltf;
pub mod obj;

use std::{fmt, path::Path};

use cgmath::{Matrix4, SquareMatrix};

use crate::{
    data_structures::{material::MaterialChannel, vertex::MAX_TEX_COORD_CHANNELS},
    error::BuildError,
};

/// Where the pixels of a texture come from.
#[derive(Clone, PartialEq, Eq)]
pub enum TextureRef {
    /// A file path relative to the directory of the asset file.
    Path(String),
    /// Encoded image bytes stored inside the asset itself.
    Embedded {
        label: String,
        bytes: Vec<u8>,
        mime_type: Option<String>,
    },
}

impl fmt::Debug for TextureRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TextureRef::Path(path) => f.debug_tuple("Path").field(path).finish(),
            TextureRef::Embedded {
                label,
                bytes,
                mime_type,
            } => f
                .debug_struct("Embedded")
                .field("label", label)
                .field("bytes", &bytes.len())
                .field("mime_type", mime_type)
                .finish(),
        }
    }
}

impl fmt::Display for TextureRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TextureRef::Path(path) => f.write_str(path),
            TextureRef::Embedded { label, .. } => write!(f, "<embedded {label}>"),
        }
    }
}

/// Texture references of a material, listed per channel.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SourceMaterial {
    pub name: String,
    pub diffuse: Vec<TextureRef>,
    pub normal: Vec<TextureRef>,
    pub roughness: Vec<TextureRef>,
    pub metallic: Vec<TextureRef>,
}

impl SourceMaterial {
    pub fn textures(&self, channel: MaterialChannel) -> &[TextureRef] {
        match channel {
            MaterialChannel::Diffuse => &self.diffuse,
            MaterialChannel::Normal => &self.normal,
            MaterialChannel::Roughness => &self.roughness,
            MaterialChannel::Metallic => &self.metallic,
        }
    }

    pub fn textures_mut(&mut self, channel: MaterialChannel) -> &mut Vec<TextureRef> {
        match channel {
            MaterialChannel::Diffuse => &mut self.diffuse,
            MaterialChannel::Normal => &mut self.normal,
            MaterialChannel::Roughness => &mut self.roughness,
            MaterialChannel::Metallic => &mut self.metallic,
        }
    }
}

/// One triangulated mesh as stored in the asset.
///
/// Attribute streams are optional per mesh. When present, a stream holds one
/// entry per vertex.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SourceMesh {
    pub name: String,
    pub vertex_count: usize,
    pub positions: Option<Vec<[f32; 3]>>,
    pub normals: Option<Vec<[f32; 3]>>,
    pub tex_coords: [Option<Vec<[f32; 2]>>; MAX_TEX_COORD_CHANNELS],
    /// Index lists of the faces, in face order.
    pub faces: Vec<Vec<u32>>,
    /// Index into [`SourceScene::materials`].
    pub material: Option<usize>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct SourceNode {
    pub name: String,
    pub transform: Matrix4<f32>,
    /// Indices into [`SourceScene::meshes`].
    pub meshes: Vec<usize>,
    pub children: Vec<SourceNode>,
}

impl SourceNode {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            transform: Matrix4::identity(),
            meshes: Vec::new(),
            children: Vec::new(),
        }
    }

    pub fn with_transform(mut self, transform: Matrix4<f32>) -> Self {
        self.transform = transform;
        self
    }

    pub fn with_meshes(mut self, meshes: Vec<usize>) -> Self {
        self.meshes = meshes;
        self
    }

    pub fn with_child(mut self, child: SourceNode) -> Self {
        self.children.push(child);
        self
    }
}

/// Everything an importer extracted from one asset file.
#[derive(Clone, Debug, PartialEq)]
pub struct SourceScene {
    pub name: String,
    pub root: Option<SourceNode>,
    pub meshes: Vec<SourceMesh>,
    pub materials: Vec<SourceMaterial>,
    /// Set when the importer could not read the whole file.
    pub incomplete: bool,
}

/// Read the asset at `path` with the importer matching its extension.
pub fn import(path: &Path) -> Result<SourceScene, BuildError> {
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();
    match extension.as_str() {
        "gltf" | "glb" => gltf::import(path),
        "obj" => obj::import(path),
        _ => Err(BuildError::UnsupportedFormat {
            path: path.to_path_buf(),
            extension,
        }),
    }
}

/// Reads the whole asset file, telling a missing file apart from other I/O errors.
pub(crate) fn read_asset(path: &Path) -> Result<Vec<u8>, BuildError> {
    std::fs::read(path).map_err(|source| match source.kind() {
        std::io::ErrorKind::NotFound => BuildError::FileNotFound {
            path: path.to_path_buf(),
        },
        _ => BuildError::Io {
            path: path.to_path_buf(),
            source,
        },
    })
}

/// Splits a flat triangle list into faces of three indices.
pub(crate) fn triangle_faces(indices: &[u32]) -> Vec<Vec<u32>> {
    indices.chunks_exact(3).map(<[u32]>::to_vec).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_extension_is_unsupported() {
        let err = import(Path::new("scene.fbx")).unwrap_err();
        assert!(matches!(
            err,
            BuildError::UnsupportedFormat { ref extension, .. } if extension == "fbx"
        ));
    }

    #[test]
    fn missing_file_is_reported_as_not_found() {
        let err = import(Path::new("definitely/not/here.gltf")).unwrap_err();
        assert!(matches!(err, BuildError::FileNotFound { .. }));
    }

    #[test]
    fn triangle_faces_drop_trailing_partial_face() {
        let faces = triangle_faces(&[0, 1, 2, 2, 1, 3, 4]);
        assert_eq!(faces, vec![vec![0, 1, 2], vec![2, 1, 3]]);
    }
}
