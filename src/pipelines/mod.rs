//! Render pipelines that replay recorded scene draws with wgpu.
//!
//! - `shader` generates the vertex layout and WGSL for an attribute layout
//! - `scene` owns the pipelines, uniforms and texture bindings of a frame

pub mod scene;
pub mod shader;
