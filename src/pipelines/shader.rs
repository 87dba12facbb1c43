use std::fmt::Write;

use crate::data_structures::{
    material::MaterialChannel,
    vertex::{AttributeKind, VertexAttribute, offsets, stride},
};

/// Binding of the texture view of a material channel in the texture bind group.
/// The sampler sits in the binding right after it.
pub const fn texture_binding(channel: MaterialChannel) -> u32 {
    channel.slot() * 2
}

pub const fn sampler_binding(channel: MaterialChannel) -> u32 {
    channel.slot() * 2 + 1
}

fn vertex_format(components: u32) -> wgpu::VertexFormat {
    match components {
        1 => wgpu::VertexFormat::Float32,
        2 => wgpu::VertexFormat::Float32x2,
        3 => wgpu::VertexFormat::Float32x3,
        _ => wgpu::VertexFormat::Float32x4,
    }
}

fn wgsl_type(components: u32) -> &'static str {
    match components {
        1 => "f32",
        2 => "vec2<f32>",
        3 => "vec3<f32>",
        _ => "vec4<f32>",
    }
}

fn field_name(kind: AttributeKind) -> String {
    match kind {
        AttributeKind::Position => "position".to_string(),
        AttributeKind::Normal => "normal".to_string(),
        AttributeKind::TexCoord(channel) => format!("tex_coord{channel}"),
    }
}

/// Shader locations follow the attribute order, one location per attribute.
pub fn vertex_attributes(attributes: &[VertexAttribute]) -> Vec<wgpu::VertexAttribute> {
    attributes
        .iter()
        .zip(offsets(attributes))
        .enumerate()
        .map(|(location, (attribute, offset))| wgpu::VertexAttribute {
            format: vertex_format(attribute.components),
            offset: (offset * std::mem::size_of::<f32>()) as wgpu::BufferAddress,
            shader_location: location as u32,
        })
        .collect()
}

pub fn array_stride(attributes: &[VertexAttribute]) -> wgpu::BufferAddress {
    (stride(attributes) * std::mem::size_of::<f32>()) as wgpu::BufferAddress
}

/// Only layouts with a position can be rasterized.
pub fn is_drawable(attributes: &[VertexAttribute]) -> bool {
    attributes
        .iter()
        .any(|a| a.kind == AttributeKind::Position && a.components == 3)
}

/**
 * WGSL for one vertex layout.
 *
 * The vertex stage reads the layout as declared and multiplies the position by
 * the node's transform. The transform follows the OpenGL clip convention, so
 * depth is remapped from [-w, w] to [0, w]. The first texture coordinate set
 * samples the diffuse channel; meshes without one sample the texel at the origin.
 */
pub fn shader_source(attributes: &[VertexAttribute]) -> String {
    let mut source = String::new();
    let has_normal = attributes.iter().any(|a| a.kind == AttributeKind::Normal);
    let tex_coord = attributes
        .iter()
        .find(|a| matches!(a.kind, AttributeKind::TexCoord(_)) && a.components == 2)
        .map(|a| field_name(a.kind));

    let _ = writeln!(source, "struct Transform {{\n    mat: mat4x4<f32>,\n}}");
    let _ = writeln!(source, "@group(0) @binding(0)\nvar<uniform> u_mat: Transform;\n");
    for channel in MaterialChannel::ALL {
        let name = channel.to_string();
        let _ = writeln!(
            source,
            "@group(1) @binding({})\nvar t_{name}: texture_2d<f32>;\n@group(1) @binding({})\nvar s_{name}: sampler;",
            texture_binding(channel),
            sampler_binding(channel),
        );
    }

    let _ = writeln!(source, "\nstruct VertexInput {{");
    for (location, attribute) in attributes.iter().enumerate() {
        let _ = writeln!(
            source,
            "    @location({location}) {}: {},",
            field_name(attribute.kind),
            wgsl_type(attribute.components)
        );
    }
    let _ = writeln!(source, "}}\n");

    let _ = writeln!(
        source,
        "struct VertexOutput {{\n    @builtin(position) clip_position: vec4<f32>,\n    @location(0) normal: vec3<f32>,\n    @location(1) tex_coords: vec2<f32>,\n}}\n"
    );

    let _ = writeln!(source, "@vertex\nfn vs_main(model: VertexInput) -> VertexOutput {{");
    let _ = writeln!(source, "    var out: VertexOutput;");
    let _ = writeln!(source, "    var clip = u_mat.mat * vec4<f32>(model.position, 1.0);");
    let _ = writeln!(source, "    clip.z = (clip.z + clip.w) * 0.5;");
    let _ = writeln!(source, "    out.clip_position = clip;");
    if has_normal {
        let _ = writeln!(source, "    out.normal = model.normal;");
    } else {
        let _ = writeln!(source, "    out.normal = vec3<f32>(0.0, 0.0, 1.0);");
    }
    match &tex_coord {
        Some(field) => {
            let _ = writeln!(source, "    out.tex_coords = model.{field};");
        }
        None => {
            let _ = writeln!(source, "    out.tex_coords = vec2<f32>(0.0, 0.0);");
        }
    }
    let _ = writeln!(source, "    return out;\n}}\n");

    let _ = writeln!(source, "@fragment\nfn fs_main(in: VertexOutput) -> @location(0) vec4<f32> {{");
    let _ = writeln!(
        source,
        "    let diffuse = textureSample(t_diffuse, s_diffuse, in.tex_coords);"
    );
    let _ = writeln!(source, "    return vec4<f32>(diffuse.rgb, 1.0);\n}}");
    source
}
