//! Scene data structures: scene graph, mesh units, materials and vertex layouts.
//!
//! - `scene_graph` holds the node arena and the traversal helpers
//! - `mesh` is a drawable mesh with its attribute layout and material
//! - `material` models the four optional texture channels
//! - `vertex` derives attribute layouts and interleaves vertex data
//! - `texture` is the wgpu texture wrapper used by the wgpu backend

pub mod material;
pub mod mesh;
pub mod scene_graph;
pub mod texture;
pub mod vertex;
