//! Fly camera and its input controller.
//!
//! The camera looks along the third column of its orientation frame. Matrices
//! follow the OpenGL clip convention (depth in [-1, 1]); the wgpu shader
//! remaps depth when it consumes them.

use std::time::Duration;

use cgmath::{Basis3, Deg, EuclideanSpace, InnerSpace, Matrix4, Point3, Rad, Rotation, Rotation3, Vector3};
use winit::keyboard::KeyCode;

/// Perspective camera with a position and a rotation frame.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Camera {
    pub position: Point3<f32>,
    /// Columns are the sideways, up and viewing direction of the camera.
    pub orientation: Basis3<f32>,
    pub fovy: Deg<f32>,
    pub znear: f32,
    pub zfar: f32,
    pub aspect: f32,
}

impl Default for Camera {
    fn default() -> Self {
        Self {
            position: Point3::new(0.0, 0.0, -1.0),
            orientation: Basis3::from_angle_y(Rad(0.0)),
            fovy: Deg(45.0),
            znear: 0.1,
            zfar: 100.0,
            aspect: 1.0,
        }
    }
}

impl Camera {
    pub fn forward(&self) -> Vector3<f32> {
        self.orientation.rotate_vector(Vector3::unit_z())
    }

    pub fn up(&self) -> Vector3<f32> {
        self.orientation.rotate_vector(Vector3::unit_y())
    }

    /// Screen right. Looking down +z with +y up, that is the -x axis of the frame.
    pub fn right(&self) -> Vector3<f32> {
        self.orientation.rotate_vector(-Vector3::unit_x())
    }

    pub fn view_matrix(&self) -> Matrix4<f32> {
        Matrix4::look_at_rh(self.position, self.position + self.forward(), self.up())
    }

    pub fn projection_matrix(&self) -> Matrix4<f32> {
        cgmath::perspective(self.fovy, self.aspect, self.znear, self.zfar)
    }

    pub fn view_projection(&self) -> Matrix4<f32> {
        self.projection_matrix() * self.view_matrix()
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        if width > 0 && height > 0 {
            self.aspect = width as f32 / height as f32;
        }
    }

    /// Distance from the camera to a point, handy for framing a scene.
    pub fn distance_to(&self, point: Point3<f32>) -> f32 {
        (point.to_vec() - self.position.to_vec()).magnitude()
    }
}

/// Turns mouse motion and WASD/QE keys into camera movement.
///
/// Look and movement only apply while the cursor is captured.
#[derive(Debug)]
pub struct CameraController {
    /// Units per second.
    pub speed: f32,
    /// Radians per pixel of mouse motion.
    pub sensitivity: f32,
    yaw: f32,
    pitch: f32,
    captured: bool,
    forward: f32,
    backward: f32,
    left: f32,
    right: f32,
    up: f32,
    down: f32,
}

const PITCH_LIMIT: Deg<f32> = Deg(89.0);

impl CameraController {
    pub fn new(speed: f32, sensitivity: f32) -> Self {
        Self {
            speed,
            sensitivity,
            yaw: 0.0,
            pitch: 0.0,
            captured: false,
            forward: 0.0,
            backward: 0.0,
            left: 0.0,
            right: 0.0,
            up: 0.0,
            down: 0.0,
        }
    }

    pub fn is_captured(&self) -> bool {
        self.captured
    }

    /// Releasing the cursor also stops any movement in progress.
    pub fn set_captured(&mut self, captured: bool) {
        self.captured = captured;
        if !captured {
            self.forward = 0.0;
            self.backward = 0.0;
            self.left = 0.0;
            self.right = 0.0;
            self.up = 0.0;
            self.down = 0.0;
        }
    }

    /// Returns whether the key is one of the movement keys.
    pub fn handle_key(&mut self, key: KeyCode, pressed: bool) -> bool {
        let amount = if pressed && self.captured { 1.0 } else { 0.0 };
        match key {
            KeyCode::KeyW => self.forward = amount,
            KeyCode::KeyS => self.backward = amount,
            KeyCode::KeyA => self.left = amount,
            KeyCode::KeyD => self.right = amount,
            KeyCode::KeyE => self.up = amount,
            KeyCode::KeyQ => self.down = amount,
            _ => return false,
        }
        true
    }

    /// Mouse motion in pixels. Moving right turns right, moving down looks down.
    pub fn handle_mouse(&mut self, dx: f64, dy: f64) {
        if !self.captured {
            return;
        }
        let limit = Rad::from(PITCH_LIMIT).0;
        self.yaw -= dx as f32 * self.sensitivity;
        self.pitch = (self.pitch + dy as f32 * self.sensitivity).clamp(-limit, limit);
    }

    pub fn yaw(&self) -> Rad<f32> {
        Rad(self.yaw)
    }

    pub fn pitch(&self) -> Rad<f32> {
        Rad(self.pitch)
    }

    /// Yaw about the world up axis, then pitch about the camera's own sideways axis.
    pub fn orientation(&self) -> Basis3<f32> {
        Basis3::from_angle_y(Rad(self.yaw)) * Basis3::from_angle_x(Rad(self.pitch))
    }

    pub fn update(&self, camera: &mut Camera, dt: Duration) {
        camera.orientation = self.orientation();
        let step = self.speed * dt.as_secs_f32();
        camera.position += camera.forward() * (self.forward - self.backward) * step;
        camera.position += camera.right() * (self.right - self.left) * step;
        camera.position += camera.up() * (self.up - self.down) * step;
    }
}
