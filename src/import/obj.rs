use std::{
    io::{BufReader, Cursor},
    path::Path,
};

use crate::{
    data_structures::vertex::MAX_TEX_COORD_CHANNELS,
    error::BuildError,
    import::{
        SourceMaterial, SourceMesh, SourceNode, SourceScene, TextureRef, read_asset,
        triangle_faces,
    },
};

/**
 * Wavefront OBJ has no node hierarchy: the file becomes a root node named after
 * the file and every OBJ model one child node holding one mesh.
 *
 * Texture paths in the MTL file are resolved later against the OBJ's directory,
 * which is also where referenced MTL files are looked up.
 */
pub fn import(path: &Path) -> Result<SourceScene, BuildError> {
    let bytes = read_asset(path)?;
    let base_dir = path.parent().unwrap_or_else(|| Path::new(".")).to_path_buf();
    let mut reader = BufReader::new(Cursor::new(bytes));

    let (models, obj_materials) = tobj::load_obj_buf(
        &mut reader,
        &tobj::LoadOptions {
            triangulate: true,
            single_index: true,
            ..Default::default()
        },
        |mtl_path| tobj::load_mtl(base_dir.join(mtl_path)),
    )
    .map_err(|e| BuildError::Parse {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;

    let materials = match obj_materials {
        Ok(materials) => materials.iter().map(convert_material).collect(),
        Err(e) => {
            log::warn!("Materials of {} could not be loaded: {}", path.display(), e);
            Vec::new()
        }
    };

    let name = path
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default();
    let mut root = SourceNode::new(name.clone());
    let mut meshes = Vec::with_capacity(models.len());
    for model in &models {
        root.children
            .push(SourceNode::new(model.name.clone()).with_meshes(vec![meshes.len()]));
        meshes.push(convert_mesh(model));
    }

    Ok(SourceScene {
        name,
        root: Some(root),
        meshes,
        materials,
        incomplete: false,
    })
}

fn convert_mesh(model: &tobj::Model) -> SourceMesh {
    let mesh = &model.mesh;
    let vertex_count = mesh.positions.len() / 3;
    let positions = mesh
        .positions
        .chunks_exact(3)
        .map(|p| [p[0], p[1], p[2]])
        .collect();
    let normals = (!mesh.normals.is_empty()).then(|| {
        mesh.normals
            .chunks_exact(3)
            .map(|n| [n[0], n[1], n[2]])
            .collect()
    });
    let mut tex_coords: [Option<Vec<[f32; 2]>>; MAX_TEX_COORD_CHANNELS] = Default::default();
    // OBJ puts the texture origin bottom-left
    tex_coords[0] = (!mesh.texcoords.is_empty()).then(|| {
        mesh.texcoords
            .chunks_exact(2)
            .map(|t| [t[0], 1.0 - t[1]])
            .collect()
    });

    let faces = if mesh.face_arities.is_empty() {
        triangle_faces(&mesh.indices)
    } else {
        let mut start = 0;
        mesh.face_arities
            .iter()
            .map(|&arity| {
                let face = mesh.indices[start..start + arity as usize].to_vec();
                start += arity as usize;
                face
            })
            .collect()
    };

    SourceMesh {
        name: model.name.clone(),
        vertex_count,
        positions: Some(positions),
        normals,
        tex_coords,
        faces,
        material: mesh.material_id,
    }
}

fn convert_material(material: &tobj::Material) -> SourceMaterial {
    let path = |texture: &Option<String>| {
        texture
            .iter()
            .map(|p| TextureRef::Path(p.clone()))
            .collect::<Vec<_>>()
    };
    let unknown = |key: &str| {
        material
            .unknown_param
            .get(key)
            .map(|p| TextureRef::Path(p.clone()))
            .into_iter()
            .collect::<Vec<_>>()
    };
    SourceMaterial {
        name: material.name.clone(),
        diffuse: path(&material.diffuse_texture),
        normal: path(&material.normal_texture),
        roughness: unknown("map_Pr"),
        metallic: unknown("map_Pm"),
    }
}
