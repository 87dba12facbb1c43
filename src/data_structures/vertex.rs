//! Vertex attribute layouts and interleaving.
//!
//! A mesh declares at mesh level which attributes it carries. [`derive_layout`]
//! turns that declaration into an ordered [`VertexAttribute`] sequence and one
//! interleaved, vertex-major float buffer in exactly that order:
//! position, normal, then one texture coordinate set per present channel.

use crate::{error::BuildError, import::SourceMesh};

/// Fixed number of texture coordinate channels a source mesh can expose.
pub const MAX_TEX_COORD_CHANNELS: usize = 8;

/// Semantic meaning of one attribute in an interleaved vertex.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum AttributeKind {
    Position,
    Normal,
    /// Texture coordinates read from the given source channel.
    TexCoord(u8),
}

/// One fixed-size float group within an interleaved vertex.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct VertexAttribute {
    pub kind: AttributeKind,
    pub components: u32,
}

impl VertexAttribute {
    pub const fn position() -> Self {
        Self {
            kind: AttributeKind::Position,
            components: 3,
        }
    }

    pub const fn normal() -> Self {
        Self {
            kind: AttributeKind::Normal,
            components: 3,
        }
    }

    pub const fn tex_coord(channel: u8) -> Self {
        Self {
            kind: AttributeKind::TexCoord(channel),
            components: 2,
        }
    }
}

/// Number of floats per vertex for a layout.
pub fn stride(attributes: &[VertexAttribute]) -> usize {
    attributes.iter().map(|a| a.components as usize).sum()
}

/// Float offset of every attribute inside one vertex.
pub fn offsets(attributes: &[VertexAttribute]) -> Vec<usize> {
    attributes
        .iter()
        .scan(0, |offset, attribute| {
            let current = *offset;
            *offset += attribute.components as usize;
            Some(current)
        })
        .collect()
}

/// The per-attribute component counts handed to mesh creation.
pub fn component_counts(attributes: &[VertexAttribute]) -> Vec<u32> {
    attributes.iter().map(|a| a.components).collect()
}

/// An attribute layout together with the vertex data interleaved according to it.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct VertexLayout {
    pub attributes: Vec<VertexAttribute>,
    pub vertices: Vec<f32>,
}

impl VertexLayout {
    pub fn vertex_count(&self) -> usize {
        match stride(&self.attributes) {
            0 => 0,
            stride => self.vertices.len() / stride,
        }
    }
}

/// Derive the attribute sequence and interleaved buffer of a source mesh.
///
/// Presence is decided per mesh, never per vertex. A texture coordinate channel
/// without data is skipped rather than filled with zeros. A present stream
/// whose length differs from the mesh's vertex count is rejected.
pub fn derive_layout(mesh: &SourceMesh) -> Result<VertexLayout, BuildError> {
    let vertex_count = mesh.vertex_count;
    let check = |what: &str, len: usize| {
        if len == vertex_count {
            Ok(())
        } else {
            Err(BuildError::MalformedMesh {
                mesh: mesh.name.clone(),
                reason: format!("{what} has {len} entries for {vertex_count} vertices"),
            })
        }
    };

    let mut attributes = Vec::new();
    if let Some(positions) = &mesh.positions {
        check("position stream", positions.len())?;
        attributes.push(VertexAttribute::position());
    }
    if let Some(normals) = &mesh.normals {
        check("normal stream", normals.len())?;
        attributes.push(VertexAttribute::normal());
    }
    let tex_coords: Vec<&Vec<[f32; 2]>> = mesh
        .tex_coords
        .iter()
        .enumerate()
        .filter_map(|(channel, set)| set.as_ref().map(|set| (channel, set)))
        .map(|(channel, set)| {
            check(&format!("texture coordinate set {channel}"), set.len())?;
            attributes.push(VertexAttribute::tex_coord(channel as u8));
            Ok(set)
        })
        .collect::<Result<_, BuildError>>()?;

    let mut vertices = Vec::with_capacity(vertex_count * stride(&attributes));
    for i in 0..vertex_count {
        if let Some(positions) = &mesh.positions {
            vertices.extend_from_slice(&positions[i]);
        }
        if let Some(normals) = &mesh.normals {
            vertices.extend_from_slice(&normals[i]);
        }
        for set in &tex_coords {
            vertices.extend_from_slice(&set[i]);
        }
    }

    Ok(VertexLayout {
        attributes,
        vertices,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mesh(vertex_count: usize) -> SourceMesh {
        SourceMesh {
            name: "test".to_string(),
            vertex_count,
            ..Default::default()
        }
    }

    #[test]
    fn interleaves_position_normal_tex_coord_per_vertex() {
        let mut source = mesh(2);
        // streams are filled in reverse order to show input order is irrelevant
        source.tex_coords[0] = Some(vec![[0.1, 0.2], [0.3, 0.4]]);
        source.normals = Some(vec![[0.0, 1.0, 0.0], [0.0, 0.0, 1.0]]);
        source.positions = Some(vec![[1.0, 2.0, 3.0], [4.0, 5.0, 6.0]]);

        let layout = derive_layout(&source).unwrap();

        assert_eq!(
            layout.attributes,
            vec![
                VertexAttribute::position(),
                VertexAttribute::normal(),
                VertexAttribute::tex_coord(0)
            ]
        );
        assert_eq!(
            layout.vertices,
            vec![
                1.0, 2.0, 3.0, 0.0, 1.0, 0.0, 0.1, 0.2, //
                4.0, 5.0, 6.0, 0.0, 0.0, 1.0, 0.3, 0.4,
            ]
        );
        assert_eq!(layout.vertex_count(), 2);
    }

    #[test]
    fn buffer_length_is_vertex_count_times_stride() {
        let mut source = mesh(5);
        source.positions = Some(vec![[0.0; 3]; 5]);
        source.tex_coords[1] = Some(vec![[0.0; 2]; 5]);
        source.tex_coords[3] = Some(vec![[0.0; 2]; 5]);

        let layout = derive_layout(&source).unwrap();

        assert_eq!(stride(&layout.attributes), 7);
        assert_eq!(layout.vertices.len(), 5 * 7);
        assert_eq!(
            layout.attributes[1..],
            [VertexAttribute::tex_coord(1), VertexAttribute::tex_coord(3)]
        );
    }

    #[test]
    fn empty_mesh_keeps_declared_attributes() {
        let mut source = mesh(0);
        source.positions = Some(Vec::new());
        source.normals = Some(Vec::new());

        let layout = derive_layout(&source).unwrap();

        assert!(layout.vertices.is_empty());
        assert_eq!(
            layout.attributes,
            vec![VertexAttribute::position(), VertexAttribute::normal()]
        );
        assert_eq!(layout.vertex_count(), 0);
    }

    #[test]
    fn short_stream_is_malformed() {
        let mut source = mesh(3);
        source.positions = Some(vec![[0.0; 3]; 3]);
        source.normals = Some(vec![[0.0; 3]; 2]);

        let err = derive_layout(&source).unwrap_err();

        assert!(matches!(err, BuildError::MalformedMesh { .. }));
    }

    #[test]
    fn offsets_accumulate_component_counts() {
        let attributes = [
            VertexAttribute::position(),
            VertexAttribute::normal(),
            VertexAttribute::tex_coord(0),
        ];
        assert_eq!(offsets(&attributes), vec![0, 3, 6]);
        assert_eq!(component_counts(&attributes), vec![3, 3, 2]);
        assert_eq!(stride(&attributes), 8);
    }
}
