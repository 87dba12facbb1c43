//! glTF 2.0 importer (`.gltf` with external or embedded buffers, `.glb`).
//!
//! Every primitive of a glTF mesh becomes one [`SourceMesh`]. Nodes that share
//! a glTF mesh reference the same source meshes; the builder still creates
//! separate GPU resources for each of them.

use std::{collections::HashMap, path::Path};

use ::gltf::{buffer, image::Source, mesh::Mode, texture};
use base64::{Engine as _, engine::general_purpose::STANDARD};
use cgmath::Matrix4;

use crate::{
    data_structures::vertex::MAX_TEX_COORD_CHANNELS,
    error::BuildError,
    import::{
        SourceMaterial, SourceMesh, SourceNode, SourceScene, TextureRef, read_asset,
        triangle_faces,
    },
};

/// Name given to the node that gathers several top-level nodes.
pub const SYNTHETIC_ROOT_NAME: &str = "ROOT";

pub fn import(path: &Path) -> Result<SourceScene, BuildError> {
    let bytes = read_asset(path)?;
    let parse_error = |e: ::gltf::Error| BuildError::Parse {
        path: path.to_path_buf(),
        message: e.to_string(),
    };
    let ::gltf::Gltf { document, blob } = ::gltf::Gltf::from_slice(&bytes).map_err(parse_error)?;
    let base_dir = path.parent().unwrap_or_else(|| Path::new("."));
    let buffers = ::gltf::import_buffers(&document, Some(base_dir), blob).map_err(parse_error)?;

    let materials = document
        .materials()
        .map(|material| convert_material(&material, &buffers))
        .collect();

    let mut meshes = Vec::new();
    let mut primitives_of_mesh: HashMap<usize, Vec<usize>> = HashMap::new();
    for mesh in document.meshes() {
        let mesh_name = mesh
            .name()
            .map(str::to_string)
            .unwrap_or_else(|| format!("mesh_{}", mesh.index()));
        let primitive_count = mesh.primitives().len();
        let mut indices = Vec::with_capacity(primitive_count);
        for primitive in mesh.primitives() {
            let name = if primitive_count > 1 {
                format!("{}.{}", mesh_name, primitive.index())
            } else {
                mesh_name.clone()
            };
            match convert_primitive(&primitive, name, &buffers) {
                Some(source_mesh) => {
                    indices.push(meshes.len());
                    meshes.push(source_mesh);
                }
                None => log::warn!(
                    "Skipping primitive {} of mesh {:?}: {:?} primitives are not drawn as triangles.",
                    primitive.index(),
                    mesh_name,
                    primitive.mode()
                ),
            }
        }
        primitives_of_mesh.insert(mesh.index(), indices);
    }

    let scene = document.default_scene().or_else(|| document.scenes().next());
    let name = scene
        .as_ref()
        .and_then(|scene| scene.name())
        .map(str::to_string)
        .unwrap_or_else(|| file_stem(path));
    let root = scene.and_then(|scene| {
        let mut top_level: Vec<SourceNode> = scene
            .nodes()
            .map(|node| convert_node(&node, &primitives_of_mesh))
            .collect();
        match top_level.len() {
            0 => None,
            1 => top_level.pop(),
            _ => Some(SourceNode {
                children: top_level,
                ..SourceNode::new(SYNTHETIC_ROOT_NAME)
            }),
        }
    });

    Ok(SourceScene {
        name,
        root,
        meshes,
        materials,
        incomplete: false,
    })
}

fn file_stem(path: &Path) -> String {
    path.file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default()
}

fn convert_node(node: &::gltf::Node, primitives_of_mesh: &HashMap<usize, Vec<usize>>) -> SourceNode {
    let meshes = node
        .mesh()
        .and_then(|mesh| primitives_of_mesh.get(&mesh.index()))
        .cloned()
        .unwrap_or_default();
    SourceNode {
        name: node.name().unwrap_or_default().to_string(),
        // glTF matrices are column-major, as are cgmath's
        transform: Matrix4::from(node.transform().matrix()),
        meshes,
        children: node
            .children()
            .map(|child| convert_node(&child, primitives_of_mesh))
            .collect(),
    }
}

fn convert_primitive(
    primitive: &::gltf::Primitive,
    name: String,
    buffers: &[buffer::Data],
) -> Option<SourceMesh> {
    let mode = primitive.mode();
    if !matches!(mode, Mode::Triangles | Mode::TriangleStrip | Mode::TriangleFan) {
        return None;
    }
    let reader = primitive.reader(|buffer| Some(&buffers[buffer.index()]));

    let positions: Option<Vec<[f32; 3]>> = reader.read_positions().map(|it| it.collect());
    let normals: Option<Vec<[f32; 3]>> = reader.read_normals().map(|it| it.collect());
    let mut tex_coords: [Option<Vec<[f32; 2]>>; MAX_TEX_COORD_CHANNELS] = Default::default();
    for (set, slot) in tex_coords.iter_mut().enumerate() {
        *slot = reader
            .read_tex_coords(set as u32)
            .map(|it| it.into_f32().collect());
    }

    let vertex_count = positions
        .as_ref()
        .map(Vec::len)
        .or_else(|| normals.as_ref().map(Vec::len))
        .or_else(|| tex_coords.iter().flatten().map(Vec::len).next())
        .unwrap_or(0);
    let indices: Vec<u32> = match reader.read_indices() {
        Some(indices) => indices.into_u32().collect(),
        None => (0..vertex_count as u32).collect(),
    };
    let faces = match mode {
        Mode::TriangleStrip => strip_faces(&indices),
        Mode::TriangleFan => fan_faces(&indices),
        _ => triangle_faces(&indices),
    };

    Some(SourceMesh {
        name,
        vertex_count,
        positions,
        normals,
        tex_coords,
        faces,
        material: primitive.material().index(),
    })
}

/// Every other strip triangle is flipped to keep a consistent winding.
fn strip_faces(indices: &[u32]) -> Vec<Vec<u32>> {
    indices
        .windows(3)
        .enumerate()
        .map(|(i, w)| {
            if i % 2 == 0 {
                vec![w[0], w[1], w[2]]
            } else {
                vec![w[1], w[0], w[2]]
            }
        })
        .collect()
}

fn fan_faces(indices: &[u32]) -> Vec<Vec<u32>> {
    match indices.split_first() {
        Some((&center, rest)) => rest
            .windows(2)
            .map(|w| vec![center, w[0], w[1]])
            .collect(),
        None => Vec::new(),
    }
}

fn convert_material(material: &::gltf::Material, buffers: &[buffer::Data]) -> SourceMaterial {
    let name = material
        .name()
        .map(str::to_string)
        .or_else(|| material.index().map(|i| format!("material_{i}")))
        .unwrap_or_else(|| "default".to_string());
    let pbr = material.pbr_metallic_roughness();
    let reference = |texture: texture::Texture| texture_ref(&texture, buffers);

    // roughness and metallic share one glTF image; each channel gets its own copy
    let metallic_roughness: Vec<TextureRef> = pbr
        .metallic_roughness_texture()
        .and_then(|info| reference(info.texture()))
        .into_iter()
        .collect();

    SourceMaterial {
        name,
        diffuse: pbr
            .base_color_texture()
            .and_then(|info| reference(info.texture()))
            .into_iter()
            .collect(),
        normal: material
            .normal_texture()
            .and_then(|normal| reference(normal.texture()))
            .into_iter()
            .collect(),
        roughness: metallic_roughness.clone(),
        metallic: metallic_roughness,
    }
}

fn texture_ref(texture: &texture::Texture, buffers: &[buffer::Data]) -> Option<TextureRef> {
    let image = texture.source();
    let label = image
        .name()
        .map(str::to_string)
        .unwrap_or_else(|| format!("image_{}", image.index()));
    match image.source() {
        Source::View { view, mime_type } => {
            let Some(bytes) = view_bytes(buffers, view.buffer().index(), view.offset(), view.length())
            else {
                log::warn!(
                    "Image {:?} points past the end of buffer {} and is ignored.",
                    label,
                    view.buffer().index()
                );
                return None;
            };
            Some(TextureRef::Embedded {
                label,
                bytes: bytes.to_vec(),
                mime_type: Some(mime_type.to_string()),
            })
        }
        Source::Uri { uri, mime_type } if uri.starts_with("data:") => {
            match decode_data_uri(uri) {
                Some((media_type, bytes)) => Some(TextureRef::Embedded {
                    label,
                    bytes,
                    mime_type: media_type.or_else(|| mime_type.map(str::to_string)),
                }),
                None => {
                    log::warn!("Image {:?} has a data URI that is not base64 and is ignored.", label);
                    None
                }
            }
        }
        Source::Uri { uri, .. } => Some(TextureRef::Path(file_path(uri))),
    }
}

/// URIs in glTF are percent-encoded, file names on disk are not.
fn file_path(uri: &str) -> String {
    urlencoding::decode(uri)
        .map(|decoded| decoded.into_owned())
        .unwrap_or_else(|_| uri.to_string())
}

fn view_bytes(buffers: &[buffer::Data], buffer: usize, offset: usize, length: usize) -> Option<&[u8]> {
    let end = offset.checked_add(length)?;
    buffers.get(buffer)?.get(offset..end)
}

/// Splits `data:[<media type>][;base64],<payload>` into media type and decoded bytes.
fn decode_data_uri(uri: &str) -> Option<(Option<String>, Vec<u8>)> {
    let (header, payload) = uri.strip_prefix("data:")?.split_once(',')?;
    let media_type = header.strip_suffix(";base64")?;
    let bytes = STANDARD.decode(payload).ok()?;
    let media_type = (!media_type.is_empty()).then(|| media_type.to_string());
    Some((media_type, bytes))
}
