//! flow-scene
//!
//! Loads a hierarchical 3D asset (meshes, materials, node transforms) from an
//! interchange format into an owned scene graph, then walks that graph every
//! frame to issue draw calls with composed transforms and bound material
//! textures. The scene graph is generic over a [`gpu::Backend`], so the same
//! build and traversal code drives the wgpu renderer and the headless backend
//! used for inspection and tests.
//!
//! High-level modules
//! - `camera`: fly camera, its controller and view/projection matrices
//! - `context`: wgpu device/queue/surface context and the wgpu backend
//! - `data_structures`: scene graph, mesh units, materials, vertex layouts
//! - `error`: typed errors for building scenes and loading textures
//! - `flow`: the viewer event loop and loop-local frame timing
//! - `gpu`: backend abstraction and the headless backend
//! - `import`: glTF and OBJ importers producing the neutral source model
//! - `pipelines`: wgpu pipelines that replay recorded draw commands
//! - `render`: scene traversal, shader program trait and frame recorder
//! - `resources`: scene building, mesh conversion and material resolution
//!

pub mod camera;
pub mod context;
pub mod data_structures;
pub mod error;
pub mod flow;
pub mod gpu;
pub mod import;
pub mod pipelines;
pub mod render;
pub mod resources;

// Re-exports commonly used types for convenience in downstream code.
pub use cgmath;
pub use data_structures::scene_graph::{Node, NodeId, Scene};
pub use error::{BuildError, BuildErrorKind, TextureLoadError};
pub use render::draw_scene;
pub use resources::{build, build_from_source};
