use std::fmt;

use crate::{
    data_structures::{material::Material, vertex::VertexAttribute},
    gpu::Backend,
};

/// A drawable mesh and its material.
///
/// `attributes` is exactly the layout the GPU mesh was created with, so vertex
/// offsets can be derived from it without touching the GPU resource. A mesh
/// unit is created once while building a scene and never changes afterwards.
pub struct MeshUnit<B: Backend> {
    pub name: String,
    pub mesh: B::Mesh,
    pub attributes: Vec<VertexAttribute>,
    pub material: Material<B::Texture>,
    pub vertex_count: usize,
    pub index_count: usize,
}

impl<B: Backend> fmt::Debug for MeshUnit<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MeshUnit")
            .field("name", &self.name)
            .field("attributes", &self.attributes)
            .field("material", &self.material.name)
            .field(
                "channels",
                &self.material.present().map(|(c, _)| c).collect::<Vec<_>>(),
            )
            .field("vertex_count", &self.vertex_count)
            .field("index_count", &self.index_count)
            .finish()
    }
}
