#![cfg(feature = "integration-tests")]

use std::{sync::mpsc, time::Duration};

use flow_scene::{
    build, draw_scene,
    camera::Camera,
    context::InitContext,
    data_structures::texture::Texture,
    error::GpuError,
    gpu::{Backend, PixelFormat, TextureSpec},
    pipelines::scene::ScenePipeline,
    render::FrameRecorder,
};

use crate::common::test_utils::{Fixture, MaterialFiles, write_gltf};

mod common;

const SIZE: u32 = 64;
const FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8UnormSrgb;

/// Renders `scene.gltf` of the fixture from the default camera and reads the frame back.
fn render_offscreen(ctx: &InitContext, path: &std::path::Path) -> Vec<u8> {
    let scene = build(path, ctx).unwrap();
    let mut pipeline = ScenePipeline::new(&ctx.device, &ctx.queue, FORMAT, Some(Texture::DEPTH_FORMAT));
    let mut recorder = FrameRecorder::new();
    draw_scene(&Camera::default(), &scene, &mut recorder);
    let commands = recorder.into_commands();
    let frame = pipeline.prepare(ctx, &commands);
    assert_eq!(frame.len(), 1);
    assert_eq!(pipeline.pipeline_count(), 1);

    let extent = wgpu::Extent3d {
        width: SIZE,
        height: SIZE,
        depth_or_array_layers: 1,
    };
    let target = ctx.device.create_texture(&wgpu::TextureDescriptor {
        label: Some("Offscreen Target"),
        size: extent,
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: FORMAT,
        usage: wgpu::TextureUsages::COPY_SRC | wgpu::TextureUsages::RENDER_ATTACHMENT,
        view_formats: &[],
    });
    let view = target.create_view(&wgpu::TextureViewDescriptor::default());
    let depth = Texture::create_depth_texture(&ctx.device, [SIZE, SIZE], "offscreen_depth");
    assert!(depth.sampler.is_none());

    let mut encoder = ctx
        .device
        .create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("Offscreen Encoder"),
        });
    {
        let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("Offscreen Pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: &view,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                    store: wgpu::StoreOp::Store,
                },
                depth_slice: None,
            })],
            depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                view: &depth.view,
                depth_ops: Some(wgpu::Operations {
                    load: wgpu::LoadOp::Clear(1.0),
                    store: wgpu::StoreOp::Store,
                }),
                stencil_ops: None,
            }),
            occlusion_query_set: None,
            timestamp_writes: None,
        });
        pipeline.encode(&mut render_pass, &commands, &frame);
    }

    let bytes_per_row = SIZE * 4;
    let output = ctx.device.create_buffer(&wgpu::BufferDescriptor {
        label: None,
        size: (bytes_per_row * SIZE) as wgpu::BufferAddress,
        usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
        mapped_at_creation: false,
    });
    encoder.copy_texture_to_buffer(
        wgpu::TexelCopyTextureInfo {
            aspect: wgpu::TextureAspect::All,
            texture: &target,
            mip_level: 0,
            origin: wgpu::Origin3d::ZERO,
        },
        wgpu::TexelCopyBufferInfo {
            buffer: &output,
            layout: wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(bytes_per_row),
                rows_per_image: Some(SIZE),
            },
        },
        extent,
    );
    ctx.queue.submit(std::iter::once(encoder.finish()));

    let (tx, rx) = mpsc::channel();
    let slice = output.slice(..);
    slice.map_async(wgpu::MapMode::Read, move |result| {
        tx.send(result).unwrap();
    });
    ctx.device
        .poll(wgpu::PollType::Wait {
            submission_index: None,
            timeout: Some(Duration::from_secs(3)),
        })
        .unwrap();
    rx.recv().unwrap().unwrap();
    let pixels = slice.get_mapped_range().to_vec();
    pixels
}

fn pixel(pixels: &[u8], x: u32, y: u32) -> [u8; 4] {
    let start = ((y * SIZE + x) * 4) as usize;
    [pixels[start], pixels[start + 1], pixels[start + 2], pixels[start + 3]]
}

#[test]
fn should_draw_diffuse_texture_at_screen_centre() {
    let fixture = Fixture::new("gpu-centre");
    fixture.write_png("red.png", [255, 0, 0, 255], 4);
    let nodes = r#"[{"name": "tri", "translation": [-0.25, -0.25, 0.0], "mesh": 0}]"#;
    let material = MaterialFiles {
        diffuse: Some("red.png"),
        ..Default::default()
    };
    let path = write_gltf(&fixture, "scene", nodes, &[0], material);
    let runtime = tokio::runtime::Runtime::new().unwrap();
    let ctx = runtime.block_on(InitContext::new_headless()).unwrap();

    let pixels = render_offscreen(&ctx, &path);

    assert_eq!(pixel(&pixels, SIZE / 2, SIZE / 2), [255, 0, 0, 255]);
    assert_eq!(pixel(&pixels, 0, 0), [0, 0, 0, 255]);
}

#[test]
fn should_sample_uploaded_textures_but_not_depth_targets() {
    let runtime = tokio::runtime::Runtime::new().unwrap();
    let ctx = runtime.block_on(InitContext::new_headless()).unwrap();

    let depth = Texture::create_depth_texture(&ctx.device, [SIZE, SIZE], "depth");
    let solid = Texture::solid(&ctx.device, &ctx.queue, "solid", [1, 2, 3, 255], true);

    assert!(depth.sampler.is_none());
    assert!(solid.sampler.is_some());
}

#[test]
fn should_reject_textures_beyond_the_device_limit() {
    let runtime = tokio::runtime::Runtime::new().unwrap();
    let ctx = runtime.block_on(InitContext::new_headless()).unwrap();
    let side = ctx.device.limits().max_texture_dimension_2d + 1;
    let spec = TextureSpec {
        format: PixelFormat::Rgba8,
        srgb: false,
    };

    let result = ctx.create_texture("huge", side, 1, &vec![0; side as usize * 4], spec);

    assert!(matches!(result, Err(GpuError::InvalidTexture { .. })));
}
