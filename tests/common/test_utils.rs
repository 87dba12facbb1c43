use std::{
    fs,
    io::Cursor,
    path::{Path, PathBuf},
};

use base64::{Engine as _, engine::general_purpose::STANDARD};

/// A directory under the system temp dir that is removed again on drop.
pub struct Fixture {
    dir: PathBuf,
}

impl Fixture {
    pub fn new(name: &str) -> Self {
        let dir = std::env::temp_dir().join(format!("flow-scene-{}-{}", name, std::process::id()));
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).unwrap();
        Self { dir }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path(&self, file: &str) -> PathBuf {
        self.dir.join(file)
    }

    pub fn write(&self, file: &str, contents: impl AsRef<[u8]>) -> PathBuf {
        let path = self.path(file);
        fs::write(&path, contents).unwrap();
        path
    }

    /// A 2x2 image of one colour with 3 or 4 channels.
    pub fn write_png(&self, file: &str, rgba: [u8; 4], channels: u8) -> PathBuf {
        let path = self.path(file);
        match channels {
            3 => image::RgbImage::from_pixel(2, 2, image::Rgb([rgba[0], rgba[1], rgba[2]]))
                .save(&path)
                .unwrap(),
            4 => image::RgbaImage::from_pixel(2, 2, image::Rgba(rgba))
                .save(&path)
                .unwrap(),
            other => panic!("unsupported channel count {other}"),
        }
        path
    }
}

impl Drop for Fixture {
    fn drop(&mut self) {
        let _ = fs::remove_dir_all(&self.dir);
    }
}

/// A 1x1 RGBA PNG as a base64 `data:` URI.
pub fn png_data_uri(rgba: [u8; 4]) -> String {
    let mut png = Vec::new();
    image::RgbaImage::from_pixel(1, 1, image::Rgba(rgba))
        .write_to(&mut Cursor::new(&mut png), image::ImageFormat::Png)
        .unwrap();
    format!("data:image/png;base64,{}", STANDARD.encode(png))
}

/// Texture files referenced by the single material of a glTF fixture.
#[derive(Clone, Copy, Debug, Default)]
pub struct MaterialFiles<'a> {
    pub diffuse: Option<&'a str>,
    pub normal: Option<&'a str>,
    pub metallic_roughness: Option<&'a str>,
    /// Diffuse image read from `(byteOffset, byteLength)` of the fixture's
    /// buffer instead of a URI.
    pub diffuse_view: Option<(usize, usize)>,
}

/// root (translated by x=1) -> [a (y=2) -> [c (z=3)], b (scaled by 2)].
/// Every node but the root draws mesh 0.
pub const HIERARCHY_NODES: &str = r#"[
    {"name": "root", "translation": [1.0, 0.0, 0.0], "children": [1, 3]},
    {"name": "a", "translation": [0.0, 2.0, 0.0], "mesh": 0, "children": [2]},
    {"name": "c", "translation": [0.0, 0.0, 3.0], "mesh": 0},
    {"name": "b", "scale": [2.0, 2.0, 2.0], "mesh": 0}
]"#;

/// Two top-level nodes without a common parent.
pub const TWO_ROOT_NODES: &str = r#"[
    {"name": "left", "translation": [-1.0, 0.0, 0.0], "mesh": 0},
    {"name": "right", "translation": [1.0, 0.0, 0.0], "mesh": 0}
]"#;

pub const TRIANGLE_POSITIONS: [[f32; 3]; 3] = [[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]];
pub const TRIANGLE_NORMALS: [[f32; 3]; 3] = [[0.0, 0.0, 1.0]; 3];
pub const TRIANGLE_TEX_COORDS: [[f32; 2]; 3] = [[0.0, 0.0], [1.0, 0.0], [0.0, 1.0]];
pub const TRIANGLE_INDICES: [u32; 3] = [0, 1, 2];

fn push_image(images: &mut Vec<String>, image: String) -> usize {
    images.push(image);
    images.len() - 1
}

/**
 * Writes `<stem>.gltf` and `<stem>.bin`: one triangle mesh with positions,
 * normals and one texture coordinate set, one material using `material` and
 * the given node list. `scene_nodes` are the top-level node indices.
 */
pub fn write_gltf(
    fixture: &Fixture,
    stem: &str,
    nodes: &str,
    scene_nodes: &[usize],
    material: MaterialFiles<'_>,
) -> PathBuf {
    let mut buffer: Vec<u8> = Vec::new();
    buffer.extend_from_slice(bytemuck::cast_slice(&TRIANGLE_POSITIONS));
    buffer.extend_from_slice(bytemuck::cast_slice(&TRIANGLE_NORMALS));
    buffer.extend_from_slice(bytemuck::cast_slice(&TRIANGLE_TEX_COORDS));
    buffer.extend_from_slice(bytemuck::cast_slice(&TRIANGLE_INDICES));
    let bin_name = format!("{stem}.bin");
    fixture.write(&bin_name, &buffer);

    let mut images = Vec::new();
    let uri = |file: &str| format!(r#"{{"uri": "{file}"}}"#);
    let diffuse = match material.diffuse_view {
        Some(_) => Some(push_image(
            &mut images,
            r#"{"bufferView": 4, "mimeType": "image/png"}"#.to_string(),
        )),
        None => material.diffuse.map(|file| push_image(&mut images, uri(file))),
    };
    let normal = material.normal.map(|file| push_image(&mut images, uri(file)));
    let metallic_roughness = material
        .metallic_roughness
        .map(|file| push_image(&mut images, uri(file)));

    let mut pbr = vec![r#""metallicFactor": 0.0"#.to_string()];
    if let Some(index) = diffuse {
        pbr.push(format!(r#""baseColorTexture": {{"index": {index}}}"#));
    }
    if let Some(index) = metallic_roughness {
        pbr.push(format!(r#""metallicRoughnessTexture": {{"index": {index}}}"#));
    }
    let normal_texture = normal
        .map(|index| format!(r#", "normalTexture": {{"index": {index}}}"#))
        .unwrap_or_default();
    let textures: Vec<String> = (0..images.len())
        .map(|i| format!(r#"{{"source": {i}}}"#))
        .collect();

    let image_view = material
        .diffuse_view
        .map(|(offset, length)| {
            format!(r#",
        {{"buffer": 0, "byteOffset": {offset}, "byteLength": {length}}}"#)
        })
        .unwrap_or_default();

    let scene_nodes: Vec<String> = scene_nodes.iter().map(usize::to_string).collect();
    let json = format!(
        r#"{{
    "asset": {{"version": "2.0"}},
    "scene": 0,
    "scenes": [{{"name": "{stem}", "nodes": [{scene_nodes}]}}],
    "nodes": {nodes},
    "meshes": [{{
        "name": "triangle",
        "primitives": [{{
            "attributes": {{"POSITION": 0, "NORMAL": 1, "TEXCOORD_0": 2}},
            "indices": 3,
            "material": 0
        }}]
    }}],
    "materials": [{{
        "name": "painted",
        "pbrMetallicRoughness": {{{pbr}}}{normal_texture}
    }}],
    "textures": [{textures}],
    "images": [{images}],
    "buffers": [{{"uri": "{bin_name}", "byteLength": {length}}}],
    "bufferViews": [
        {{"buffer": 0, "byteOffset": 0, "byteLength": 36, "target": 34962}},
        {{"buffer": 0, "byteOffset": 36, "byteLength": 36, "target": 34962}},
        {{"buffer": 0, "byteOffset": 72, "byteLength": 24, "target": 34962}},
        {{"buffer": 0, "byteOffset": 96, "byteLength": 12, "target": 34963}}{image_view}
    ],
    "accessors": [
        {{"bufferView": 0, "componentType": 5126, "count": 3, "type": "VEC3", "min": [0.0, 0.0, 0.0], "max": [1.0, 1.0, 0.0]}},
        {{"bufferView": 1, "componentType": 5126, "count": 3, "type": "VEC3"}},
        {{"bufferView": 2, "componentType": 5126, "count": 3, "type": "VEC2"}},
        {{"bufferView": 3, "componentType": 5125, "count": 3, "type": "SCALAR"}}
    ]
}}"#,
        scene_nodes = scene_nodes.join(", "),
        pbr = pbr.join(", "),
        textures = textures.join(", "),
        images = images.join(", "),
        length = buffer.len(),
    );
    fixture.write(&format!("{stem}.gltf"), json)
}

/// A textured unit quad as `<stem>.obj` with its material library `<stem>.mtl`.
pub fn write_obj_quad(fixture: &Fixture, stem: &str, diffuse: &str) -> PathBuf {
    fixture.write(
        &format!("{stem}.mtl"),
        format!("newmtl painted\nKd 1.0 1.0 1.0\nmap_Kd {diffuse}\n"),
    );
    fixture.write(
        &format!("{stem}.obj"),
        format!(
            "mtllib {stem}.mtl\n\
             o quad\n\
             v 0.0 0.0 0.0\n\
             v 1.0 0.0 0.0\n\
             v 1.0 1.0 0.0\n\
             v 0.0 1.0 0.0\n\
             vt 0.0 0.0\n\
             vt 1.0 0.0\n\
             vt 1.0 1.0\n\
             vt 0.0 1.0\n\
             vn 0.0 0.0 1.0\n\
             usemtl painted\n\
             f 1/1/1 2/2/1 3/3/1 4/4/1\n"
        ),
    )
}
