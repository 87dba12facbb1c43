//! Scene traversal and draw-call composition.
//!
//! [`draw_scene`] walks a [`Scene`] every frame and talks to a [`ShaderProgram`]:
//! one transform uniform per node, then for every mesh of the node its present
//! material textures followed by the draw. Anything that can bind uniforms and
//! textures and draw a mesh can sit behind the trait.
//!
//! # Key types
//!
//! - [`ShaderProgram`] is the consumer of the traversal
//! - [`FrameRecorder`] records one frame and folds it into [`DrawCommand`]s,
//!   which the wgpu pipeline replays in a render pass
//!

use std::collections::HashMap;

use cgmath::{Matrix4, SquareMatrix};

use crate::{camera::Camera, data_structures::scene_graph::Scene, gpu::Backend};

/// Uniform receiving `projection * view * global` for every node.
pub const TRANSFORM_UNIFORM: &str = "uMat";

/// Receives the uniforms, texture bindings and draws of a traversal.
///
/// `'a` is the lifetime of the scene being drawn, so an implementation may keep
/// references to meshes and textures until the frame is submitted.
pub trait ShaderProgram<'a, B: Backend> {
    fn set_uniform(&mut self, name: &str, value: &Matrix4<f32>);
    fn set_texture(&mut self, name: &str, texture: &'a B::Texture, slot: u32);
    fn draw(&mut self, mesh: &'a B::Mesh);
}

/// Draws every mesh of `scene` as seen from `camera`.
///
/// Nodes are visited depth-first in pre-order. A node's transform uniform is
/// set before any of its meshes is drawn, and an absent material channel is
/// simply not bound.
pub fn draw_scene<'a, B, S>(camera: &Camera, scene: &'a Scene<B>, shader: &mut S)
where
    B: Backend,
    S: ShaderProgram<'a, B> + ?Sized,
{
    let view_projection = camera.view_projection();
    scene.walk(|node, global| {
        shader.set_uniform(TRANSFORM_UNIFORM, &(view_projection * *global));
        for unit in &node.meshes {
            for (channel, texture) in unit.material.present() {
                shader.set_texture(channel.uniform_name(), texture, channel.slot());
            }
            shader.draw(&unit.mesh);
        }
    });
}

/// A texture bound for one draw.
pub struct TextureBinding<'a, B: Backend> {
    pub name: String,
    pub slot: u32,
    pub texture: &'a B::Texture,
}

/// Everything needed to replay one draw call.
pub struct DrawCommand<'a, B: Backend> {
    /// Value of [`TRANSFORM_UNIFORM`] at the time of the draw.
    pub transform: Matrix4<f32>,
    /// Textures bound since the previous draw, in binding order.
    pub textures: Vec<TextureBinding<'a, B>>,
    pub mesh: &'a B::Mesh,
}

impl<B: Backend> DrawCommand<'_, B> {
    pub fn texture_in_slot(&self, slot: u32) -> Option<&B::Texture> {
        self.textures
            .iter()
            .rev()
            .find(|binding| binding.slot == slot)
            .map(|binding| binding.texture)
    }
}

/// Call stream of a traversal without the resources, for checking order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RecordedCall {
    Uniform(String),
    Texture { name: String, slot: u32 },
    Draw,
}

/// A [`ShaderProgram`] that records one frame.
pub struct FrameRecorder<'a, B: Backend> {
    uniforms: HashMap<String, Matrix4<f32>>,
    pending: Vec<TextureBinding<'a, B>>,
    commands: Vec<DrawCommand<'a, B>>,
    calls: Vec<RecordedCall>,
}

impl<B: Backend> Default for FrameRecorder<'_, B> {
    fn default() -> Self {
        Self {
            uniforms: HashMap::new(),
            pending: Vec::new(),
            commands: Vec::new(),
            calls: Vec::new(),
        }
    }
}

impl<'a, B: Backend> FrameRecorder<'a, B> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn commands(&self) -> &[DrawCommand<'a, B>] {
        &self.commands
    }

    pub fn calls(&self) -> &[RecordedCall] {
        &self.calls
    }

    pub fn uniform(&self, name: &str) -> Option<&Matrix4<f32>> {
        self.uniforms.get(name)
    }

    pub fn into_commands(self) -> Vec<DrawCommand<'a, B>> {
        self.commands
    }
}

impl<'a, B: Backend> ShaderProgram<'a, B> for FrameRecorder<'a, B> {
    fn set_uniform(&mut self, name: &str, value: &Matrix4<f32>) {
        self.uniforms.insert(name.to_string(), *value);
        self.calls.push(RecordedCall::Uniform(name.to_string()));
    }

    fn set_texture(&mut self, name: &str, texture: &'a B::Texture, slot: u32) {
        self.pending.push(TextureBinding {
            name: name.to_string(),
            slot,
            texture,
        });
        self.calls.push(RecordedCall::Texture {
            name: name.to_string(),
            slot,
        });
    }

    fn draw(&mut self, mesh: &'a B::Mesh) {
        let transform = self
            .uniforms
            .get(TRANSFORM_UNIFORM)
            .copied()
            .unwrap_or_else(Matrix4::identity);
        self.commands.push(DrawCommand {
            transform,
            textures: std::mem::take(&mut self.pending),
            mesh,
        });
        self.calls.push(RecordedCall::Draw);
    }
}
