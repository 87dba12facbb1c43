use std::path::{Path, PathBuf};

use crate::{
    data_structures::{
        mesh::MeshUnit,
        scene_graph::{NodeId, Scene},
    },
    error::BuildError,
    gpu::Backend,
    import::{self, SourceNode, SourceScene},
};

/**
 * This module turns imported assets into owned scenes: meshes are converted
 * with their vertex layouts, materials are resolved to textures and the node
 * tree is rebuilt with parent back-references.
 */
pub mod mesh;
pub mod texture;

/**
 * Loads the asset at `path` and builds a scene whose GPU resources are created
 * by `backend`.
 *
 * Texture paths are resolved against the directory containing `path`. On error
 * nothing is returned and every resource created so far has already been
 * released.
 */
pub fn build<B: Backend>(path: impl AsRef<Path>, backend: &B) -> Result<Scene<B>, BuildError> {
    let path = path.as_ref();
    log::info!("Building scene from {}", path.display());
    let source = import::import(path)?;
    let base_dir = path.parent().unwrap_or_else(|| Path::new("."));
    convert_scene(&source, path, base_dir, backend)
}

/// Builds a scene from an already imported asset. Texture paths are resolved against `base_dir`.
pub fn build_from_source<B: Backend>(
    source: &SourceScene,
    base_dir: impl AsRef<Path>,
    backend: &B,
) -> Result<Scene<B>, BuildError> {
    let base_dir = base_dir.as_ref();
    convert_scene(source, &base_dir.join(&source.name), base_dir, backend)
}

struct Converter<'a, B: Backend> {
    backend: &'a B,
    base_dir: &'a Path,
    source: &'a SourceScene,
}

fn convert_scene<B: Backend>(
    source: &SourceScene,
    path: &Path,
    base_dir: &Path,
    backend: &B,
) -> Result<Scene<B>, BuildError> {
    if source.incomplete {
        return Err(BuildError::Incomplete {
            path: PathBuf::from(path),
        });
    }
    let root = source.root.as_ref().ok_or_else(|| BuildError::NoRootNode {
        path: PathBuf::from(path),
    })?;

    let converter = Converter {
        backend,
        base_dir,
        source,
    };
    let meshes = converter.meshes_of(root)?;
    log::debug!("Converted root node {:?} with {} meshes", root.name, meshes.len());
    let mut scene = Scene::new(source.name.clone(), root.name.clone(), root.transform, meshes);
    converter.append_children(&mut scene, NodeId::ROOT, root)?;

    log::info!(
        "Built scene {:?}: {} nodes, {} meshes",
        scene.name,
        scene.len(),
        scene.mesh_count()
    );
    Ok(scene)
}

impl<B: Backend> Converter<'_, B> {
    /// Pre-order: a child and its meshes exist before any of its own children is converted.
    fn append_children(
        &self,
        scene: &mut Scene<B>,
        parent: NodeId,
        source_parent: &SourceNode,
    ) -> Result<(), BuildError> {
        for child in &source_parent.children {
            let meshes = self.meshes_of(child)?;
            log::debug!("Converted node {:?} with {} meshes", child.name, meshes.len());
            if let Some(id) = scene.add_child(parent, child.name.clone(), child.transform, meshes) {
                self.append_children(scene, id, child)?;
            }
        }
        Ok(())
    }

    fn meshes_of(&self, node: &SourceNode) -> Result<Vec<MeshUnit<B>>, BuildError> {
        node.meshes
            .iter()
            .map(|&index| {
                let source_mesh =
                    self.source
                        .meshes
                        .get(index)
                        .ok_or_else(|| BuildError::MalformedMesh {
                            mesh: format!("#{index}"),
                            reason: format!("node {:?} references a mesh that does not exist", node.name),
                        })?;
                mesh::convert_mesh(
                    self.backend,
                    self.base_dir,
                    source_mesh,
                    &self.source.materials,
                )
            })
            .collect()
    }
}
