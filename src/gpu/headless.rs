//! A backend that keeps every resource in CPU memory.
//!
//! Useful for inspecting assets without a GPU and for tests. Each resource
//! gets a unique id and the backend counts how many are alive, so releasing a
//! scene can be checked.

use std::{cell::Cell, rc::Rc};

use crate::{
    data_structures::vertex::VertexAttribute,
    error::GpuError,
    gpu::{Backend, TextureSpec, validate_mesh, validate_texture},
};

#[derive(Debug, Default)]
struct Counters {
    next_id: Cell<u64>,
    live: Cell<usize>,
}

impl Counters {
    fn acquire(&self) -> u64 {
        let id = self.next_id.get();
        self.next_id.set(id + 1);
        self.live.set(self.live.get() + 1);
        id
    }
}

/// Releases its slot in the live counter when dropped.
#[derive(Debug)]
struct Allocation {
    id: u64,
    counters: Rc<Counters>,
}

impl Drop for Allocation {
    fn drop(&mut self) {
        self.counters.live.set(self.counters.live.get() - 1);
    }
}

/// CPU-side copy of a mesh.
#[derive(Debug)]
pub struct HeadlessMesh {
    pub label: String,
    pub vertices: Vec<f32>,
    pub attributes: Vec<VertexAttribute>,
    pub indices: Vec<u32>,
    allocation: Allocation,
}

impl HeadlessMesh {
    pub fn id(&self) -> u64 {
        self.allocation.id
    }
}

/// CPU-side copy of a texture.
#[derive(Debug)]
pub struct HeadlessTexture {
    pub label: String,
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
    pub spec: TextureSpec,
    allocation: Allocation,
}

impl HeadlessTexture {
    pub fn id(&self) -> u64 {
        self.allocation.id
    }
}

#[derive(Clone, Debug, Default)]
pub struct HeadlessBackend {
    counters: Rc<Counters>,
}

impl HeadlessBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of meshes and textures created by this backend that are still alive.
    pub fn live_resources(&self) -> usize {
        self.counters.live.get()
    }

    fn allocate(&self) -> Allocation {
        Allocation {
            id: self.counters.acquire(),
            counters: self.counters.clone(),
        }
    }
}

impl Backend for HeadlessBackend {
    type Mesh = HeadlessMesh;
    type Texture = HeadlessTexture;

    fn create_mesh(
        &self,
        label: &str,
        vertices: &[f32],
        attributes: &[VertexAttribute],
        indices: &[u32],
    ) -> Result<HeadlessMesh, GpuError> {
        validate_mesh(label, vertices, attributes, indices)?;
        Ok(HeadlessMesh {
            label: label.to_string(),
            vertices: vertices.to_vec(),
            attributes: attributes.to_vec(),
            indices: indices.to_vec(),
            allocation: self.allocate(),
        })
    }

    fn create_texture(
        &self,
        label: &str,
        width: u32,
        height: u32,
        pixels: &[u8],
        spec: TextureSpec,
    ) -> Result<HeadlessTexture, GpuError> {
        validate_texture(label, width, height, pixels, spec)?;
        Ok(HeadlessTexture {
            label: label.to_string(),
            width,
            height,
            pixels: pixels.to_vec(),
            spec,
            allocation: self.allocate(),
        })
    }
}
