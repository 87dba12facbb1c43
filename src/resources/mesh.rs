use std::path::Path;

use crate::{
    data_structures::{material::Material, mesh::MeshUnit, vertex::derive_layout},
    error::BuildError,
    gpu::Backend,
    import::{SourceMaterial, SourceMesh},
    resources::texture::resolve_material,
};

/// Concatenates face index lists, keeping face order and the order within each face.
pub fn flatten_faces(faces: &[Vec<u32>]) -> Vec<u32> {
    faces.iter().flatten().copied().collect()
}

/**
 * Turns one source mesh into a drawable mesh unit.
 *
 * The attribute layout stored on the unit is the one the GPU mesh was created
 * with. A mesh without a usable material reference gets a material with every
 * channel absent.
 */
pub fn convert_mesh<B: Backend>(
    backend: &B,
    base_dir: &Path,
    source: &SourceMesh,
    materials: &[SourceMaterial],
) -> Result<MeshUnit<B>, BuildError> {
    let layout = derive_layout(source)?;
    let indices = flatten_faces(&source.faces);

    let material = match source.material.map(|index| (index, materials.get(index))) {
        Some((_, Some(material))) => resolve_material(backend, base_dir, material)?,
        Some((index, None)) => {
            log::warn!(
                "Mesh {:?} references material {} but only {} exist, drawing it untextured.",
                source.name,
                index,
                materials.len()
            );
            Material::empty(String::new())
        }
        None => {
            log::debug!("Mesh {:?} has no material.", source.name);
            Material::empty(String::new())
        }
    };

    let mesh = backend.create_mesh(&source.name, &layout.vertices, &layout.attributes, &indices)?;

    Ok(MeshUnit {
        name: source.name.clone(),
        mesh,
        attributes: layout.attributes,
        material,
        vertex_count: source.vertex_count,
        index_count: indices.len(),
    })
}
