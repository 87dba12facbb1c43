use cgmath::{Matrix4, Vector3};
use flow_scene::{
    build, draw_scene,
    camera::{Camera, CameraController},
    gpu::headless::HeadlessBackend,
    render::{FrameRecorder, RecordedCall, TRANSFORM_UNIFORM},
};
use winit::keyboard::KeyCode;

use crate::common::test_utils::{Fixture, HIERARCHY_NODES, MaterialFiles, write_gltf};

mod common;

fn texture(name: &str, slot: u32) -> RecordedCall {
    RecordedCall::Texture {
        name: name.to_string(),
        slot,
    }
}

#[test]
fn should_skip_absent_diffuse_while_drawing() {
    let fixture = Fixture::new("traverse-missing");
    fixture.write_png("normal.png", [127, 127, 255, 255], 3);
    let material = MaterialFiles {
        diffuse: Some("not-there.png"),
        normal: Some("normal.png"),
        ..Default::default()
    };
    let path = write_gltf(&fixture, "traverse", HIERARCHY_NODES, &[0], material);
    let backend = HeadlessBackend::new();
    let scene = build(&path, &backend).unwrap();
    let camera = Camera::default();
    let mut recorder = FrameRecorder::new();

    draw_scene(&camera, &scene, &mut recorder);

    let uniform = RecordedCall::Uniform(TRANSFORM_UNIFORM.to_string());
    let textured_draw = [uniform.clone(), texture("uNormal", 1), RecordedCall::Draw];
    let mut expected = vec![uniform];
    for _ in 0..3 {
        expected.extend(textured_draw.iter().cloned());
    }
    assert_eq!(recorder.calls(), expected.as_slice());
    assert!(
        recorder
            .commands()
            .iter()
            .all(|command| command.texture_in_slot(0).is_none())
    );
}

#[test]
fn should_compose_camera_with_global_transforms() {
    let fixture = Fixture::new("traverse-transforms");
    let path = write_gltf(&fixture, "transforms", HIERARCHY_NODES, &[0], MaterialFiles::default());
    let backend = HeadlessBackend::new();
    let scene = build(&path, &backend).unwrap();
    let camera = Camera {
        position: (0.0, 1.0, -5.0).into(),
        ..Default::default()
    };
    let mut recorder = FrameRecorder::new();

    draw_scene(&camera, &scene, &mut recorder);

    // draws follow pre-order: a, c, b
    let view_projection = camera.view_projection();
    let expected = [
        Matrix4::from_translation(Vector3::new(1.0, 2.0, 0.0)),
        Matrix4::from_translation(Vector3::new(1.0, 2.0, 3.0)),
        Matrix4::from_translation(Vector3::new(1.0, 0.0, 0.0)) * Matrix4::from_scale(2.0),
    ];
    let commands = recorder.commands();
    assert_eq!(commands.len(), 3);
    for (command, global) in commands.iter().zip(expected) {
        assert_eq!(command.transform, view_projection * global);
        assert!(command.textures.is_empty());
    }
    let meshes: Vec<_> = commands.iter().map(|command| command.mesh.id()).collect();
    let owned: Vec<_> = ["a", "c", "b"]
        .iter()
        .map(|name| scene.find(name).unwrap().meshes[0].mesh.id())
        .collect();
    assert_eq!(meshes, owned);
}

#[test]
fn should_move_captured_camera_between_frames() {
    let mut camera = Camera::default();
    let mut controller = CameraController::new(2.0, 0.005);

    controller.handle_key(KeyCode::KeyW, true);
    controller.update(&mut camera, std::time::Duration::from_millis(500));
    assert_eq!(camera.position, (0.0, 0.0, -1.0).into());

    controller.set_captured(true);
    controller.handle_key(KeyCode::KeyW, true);
    controller.update(&mut camera, std::time::Duration::from_millis(500));
    assert!((camera.position.z - 0.0).abs() < 1e-5);
}
