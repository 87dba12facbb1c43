//! The scene pipeline: replays [`DrawCommand`]s recorded by a traversal.
//!
//! Every draw gets its own slot in one dynamic-offset uniform buffer and its
//! own texture bind group. Absent material channels are filled with 1x1
//! default textures so one bind group layout serves every material. Render
//! pipelines are created lazily, one per distinct vertex layout.

use std::{collections::HashMap, num::NonZeroU64};

use crate::{
    context::InitContext,
    data_structures::{
        material::MaterialChannel,
        texture::{Texture, create_default_sampler},
        vertex::VertexAttribute,
    },
    pipelines::shader::{
        array_stride, is_drawable, sampler_binding, shader_source, texture_binding,
        vertex_attributes,
    },
    render::DrawCommand,
};

const MATRIX_SIZE: u64 = std::mem::size_of::<[[f32; 4]; 4]>() as u64;

/// Per-frame resources produced by [`ScenePipeline::prepare`].
#[derive(Debug, Default)]
pub struct PreparedFrame {
    texture_groups: Vec<wgpu::BindGroup>,
}

impl PreparedFrame {
    pub fn len(&self) -> usize {
        self.texture_groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.texture_groups.is_empty()
    }
}

#[derive(Debug)]
pub struct ScenePipeline {
    color_format: wgpu::TextureFormat,
    depth_format: Option<wgpu::TextureFormat>,
    uniform_layout: wgpu::BindGroupLayout,
    texture_layout: wgpu::BindGroupLayout,
    pipeline_layout: wgpu::PipelineLayout,
    pipelines: HashMap<Vec<VertexAttribute>, wgpu::RenderPipeline>,
    defaults: [Texture; 4],
    sampler: wgpu::Sampler,
    uniform_stride: u64,
    uniform_capacity: usize,
    uniform_buffer: wgpu::Buffer,
    uniform_group: wgpu::BindGroup,
}

impl ScenePipeline {
    pub fn new(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        color_format: wgpu::TextureFormat,
        depth_format: Option<wgpu::TextureFormat>,
    ) -> Self {
        let uniform_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: true,
                    min_binding_size: NonZeroU64::new(MATRIX_SIZE),
                },
                count: None,
            }],
            label: Some("transform_bind_group_layout"),
        });
        let texture_layout = material_layout(device);
        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Scene Pipeline Layout"),
            bind_group_layouts: &[&uniform_layout, &texture_layout],
            push_constant_ranges: &[],
        });

        let defaults = MaterialChannel::ALL.map(|channel| {
            let (rgba, label) = match channel {
                MaterialChannel::Diffuse => ([255, 255, 255, 255], "default diffuse"),
                // The blue/purple-ish colour that represents an undisturbed normal
                MaterialChannel::Normal => ([127, 127, 255, 255], "default normal map"),
                MaterialChannel::Roughness => ([255, 255, 255, 255], "default roughness"),
                MaterialChannel::Metallic => ([0, 0, 0, 255], "default metallic"),
            };
            Texture::solid(device, queue, label, rgba, channel.is_srgb())
        });
        let sampler = create_default_sampler(device);

        let alignment = device.limits().min_uniform_buffer_offset_alignment as u64;
        let uniform_stride = MATRIX_SIZE.div_ceil(alignment) * alignment;
        let uniform_capacity = 64;
        let (uniform_buffer, uniform_group) =
            create_uniforms(device, &uniform_layout, uniform_stride, uniform_capacity);

        Self {
            color_format,
            depth_format,
            uniform_layout,
            texture_layout,
            pipeline_layout,
            pipelines: HashMap::new(),
            defaults,
            sampler,
            uniform_stride,
            uniform_capacity,
            uniform_buffer,
            uniform_group,
        }
    }

    /// Number of vertex layouts a render pipeline was created for.
    pub fn pipeline_count(&self) -> usize {
        self.pipelines.len()
    }

    /**
     * Uploads the transforms of all commands, creates their texture bind groups
     * and any render pipeline a new vertex layout needs.
     */
    pub fn prepare(
        &mut self,
        ctx: &InitContext,
        commands: &[DrawCommand<'_, InitContext>],
    ) -> PreparedFrame {
        let device = &ctx.device;
        if commands.len() > self.uniform_capacity {
            self.uniform_capacity = commands.len().next_power_of_two();
            log::debug!("Growing transform buffer to {} draws", self.uniform_capacity);
            let (buffer, group) = create_uniforms(
                device,
                &self.uniform_layout,
                self.uniform_stride,
                self.uniform_capacity,
            );
            self.uniform_buffer = buffer;
            self.uniform_group = group;
        }

        let mut uniforms = vec![0u8; commands.len() * self.uniform_stride as usize];
        let mut texture_groups = Vec::with_capacity(commands.len());
        for (i, command) in commands.iter().enumerate() {
            let matrix: [[f32; 4]; 4] = command.transform.into();
            let start = i * self.uniform_stride as usize;
            uniforms[start..start + MATRIX_SIZE as usize].copy_from_slice(bytemuck::bytes_of(&matrix));

            let attributes = &command.mesh.attributes;
            if is_drawable(attributes) && !self.pipelines.contains_key(attributes) {
                log::debug!("Creating render pipeline for vertex layout {:?}", attributes);
                let pipeline = self.create_pipeline(device, attributes);
                self.pipelines.insert(attributes.clone(), pipeline);
            }
            texture_groups.push(self.texture_group(device, command));
        }
        if !uniforms.is_empty() {
            ctx.queue.write_buffer(&self.uniform_buffer, 0, &uniforms);
        }
        PreparedFrame { texture_groups }
    }

    /// Records the draws of a prepared frame into `render_pass`.
    pub fn encode(
        &self,
        render_pass: &mut wgpu::RenderPass<'_>,
        commands: &[DrawCommand<'_, InitContext>],
        frame: &PreparedFrame,
    ) {
        for (i, (command, texture_group)) in commands.iter().zip(&frame.texture_groups).enumerate() {
            let mesh = command.mesh;
            if mesh.num_elements == 0 {
                continue;
            }
            let Some(pipeline) = self.pipelines.get(&mesh.attributes) else {
                log::trace!("Mesh {:?} has no position attribute and is not drawn", mesh.label);
                continue;
            };
            let offset = (i as u64 * self.uniform_stride) as wgpu::DynamicOffset;
            render_pass.set_pipeline(pipeline);
            render_pass.set_bind_group(0, &self.uniform_group, &[offset]);
            render_pass.set_bind_group(1, texture_group, &[]);
            render_pass.set_vertex_buffer(0, mesh.vertex_buffer.slice(..));
            render_pass.set_index_buffer(mesh.index_buffer.slice(..), wgpu::IndexFormat::Uint32);
            render_pass.draw_indexed(0..mesh.num_elements, 0, 0..1);
        }
    }

    fn texture_group(
        &self,
        device: &wgpu::Device,
        command: &DrawCommand<'_, InitContext>,
    ) -> wgpu::BindGroup {
        let textures = MaterialChannel::ALL.map(|channel| {
            command
                .texture_in_slot(channel.slot())
                .unwrap_or(&self.defaults[channel.slot() as usize])
        });
        let mut entries = Vec::with_capacity(8);
        for (channel, texture) in MaterialChannel::ALL.into_iter().zip(textures) {
            entries.push(wgpu::BindGroupEntry {
                binding: texture_binding(channel),
                resource: wgpu::BindingResource::TextureView(&texture.view),
            });
            entries.push(wgpu::BindGroupEntry {
                binding: sampler_binding(channel),
                resource: wgpu::BindingResource::Sampler(
                    texture.sampler.as_ref().unwrap_or(&self.sampler),
                ),
            });
        }
        device.create_bind_group(&wgpu::BindGroupDescriptor {
            layout: &self.texture_layout,
            entries: &entries,
            label: Some("material_bind_group"),
        })
    }

    fn create_pipeline(
        &self,
        device: &wgpu::Device,
        attributes: &[VertexAttribute],
    ) -> wgpu::RenderPipeline {
        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Scene Shader"),
            source: wgpu::ShaderSource::Wgsl(shader_source(attributes).into()),
        });
        let vertex_attributes = vertex_attributes(attributes);
        let vertex_layout = wgpu::VertexBufferLayout {
            array_stride: array_stride(attributes),
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &vertex_attributes,
        };

        device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            cache: None,
            label: Some("Scene Pipeline"),
            layout: Some(&self.pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: Some("vs_main"),
                buffers: &[vertex_layout],
                compilation_options: Default::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: Some("fs_main"),
                targets: &[Some(wgpu::ColorTargetState {
                    format: self.color_format,
                    blend: Some(wgpu::BlendState::REPLACE),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: Default::default(),
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                strip_index_format: None,
                front_face: wgpu::FrontFace::Ccw,
                // asset winding is not reliable enough to cull
                cull_mode: None,
                polygon_mode: wgpu::PolygonMode::Fill,
                unclipped_depth: false,
                conservative: false,
            },
            depth_stencil: self.depth_format.map(|format| wgpu::DepthStencilState {
                format,
                depth_write_enabled: true,
                depth_compare: wgpu::CompareFunction::Less,
                stencil: wgpu::StencilState::default(),
                bias: wgpu::DepthBiasState::default(),
            }),
            multisample: wgpu::MultisampleState {
                count: 1,
                mask: !0,
                alpha_to_coverage_enabled: false,
            },
            multiview: None,
        })
    }
}

fn material_layout(device: &wgpu::Device) -> wgpu::BindGroupLayout {
    let mut entries = Vec::with_capacity(8);
    for channel in MaterialChannel::ALL {
        entries.push(wgpu::BindGroupLayoutEntry {
            binding: texture_binding(channel),
            visibility: wgpu::ShaderStages::FRAGMENT,
            ty: wgpu::BindingType::Texture {
                multisampled: false,
                view_dimension: wgpu::TextureViewDimension::D2,
                sample_type: wgpu::TextureSampleType::Float { filterable: true },
            },
            count: None,
        });
        entries.push(wgpu::BindGroupLayoutEntry {
            binding: sampler_binding(channel),
            visibility: wgpu::ShaderStages::FRAGMENT,
            ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
            count: None,
        });
    }
    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        entries: &entries,
        label: Some("material_bind_group_layout"),
    })
}

fn create_uniforms(
    device: &wgpu::Device,
    layout: &wgpu::BindGroupLayout,
    stride: u64,
    capacity: usize,
) -> (wgpu::Buffer, wgpu::BindGroup) {
    let buffer = device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("Transform Buffer"),
        size: stride * capacity as u64,
        usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        mapped_at_creation: false,
    });
    let group = device.create_bind_group(&wgpu::BindGroupDescriptor {
        layout,
        entries: &[wgpu::BindGroupEntry {
            binding: 0,
            resource: wgpu::BindingResource::Buffer(wgpu::BufferBinding {
                buffer: &buffer,
                offset: 0,
                size: NonZeroU64::new(MATRIX_SIZE),
            }),
        }],
        label: Some("transform_bind_group"),
    });
    (buffer, group)
}
