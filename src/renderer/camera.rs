use glam::{Vec2, Vec3};
use serde::{Deserialize, Serialize};

use crate::renderer::frame::CameraView;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum CameraMode {
    #[default]
    Free,
    Orbital,
}

/// Fly camera. Free mode moves with WASD and looks with the mouse; orbital
/// mode circles `target` at `orbital_distance`.
pub struct Camera {
    pub position: Vec3,
    pub yaw: f32,
    pub pitch: f32,
    pub up: Vec3,

    pub target: Vec3,
    pub orbital_distance: f32,

    pub mode: CameraMode,

    pub fov: f32,

    pub move_speed: f32,
    pub mouse_sensitivity: f32,
    pub zoom_speed: f32,
}

impl Default for Camera {
    fn default() -> Self {
        Self {
            position: Vec3::new(0.0, 40.0, 100.0),
            yaw: -90.0_f32.to_radians(),
            pitch: -20.0_f32.to_radians(),
            up: Vec3::Y,

            target: Vec3::ZERO,
            orbital_distance: 110.0,

            mode: CameraMode::Free,

            fov: 45.0_f32.to_radians(),

            move_speed: 30.0,
            mouse_sensitivity: 0.002,
            zoom_speed: 5.0,
        }
    }
}

impl Camera {
    pub fn front(&self) -> Vec3 {
        Vec3::new(
            self.yaw.cos() * self.pitch.cos(),
            self.pitch.sin(),
            self.yaw.sin() * self.pitch.cos(),
        )
        .normalize()
    }

    pub fn right(&self) -> Vec3 {
        self.front().cross(self.up).normalize()
    }

    /// Snapshot handed to the renderer each frame.
    pub fn view(&self) -> CameraView {
        let forward = match self.mode {
            CameraMode::Free => self.front(),
            CameraMode::Orbital => (self.target - self.position).normalize_or(self.front()),
        };
        CameraView {
            position: self.position,
            forward,
            up: self.up,
            fov_radians: self.fov,
        }
    }

    /// Points the free camera at `target` from `position`.
    pub fn look_at(&mut self, position: Vec3, target: Vec3) {
        self.position = position;
        self.target = target;
        let dir = (target - position).normalize_or(Vec3::NEG_Z);
        self.yaw = dir.z.atan2(dir.x);
        self.pitch = dir.y.clamp(-1.0, 1.0).asin();
    }

    pub fn process_keyboard(&mut self, forward: f32, right: f32, up: f32, dt: f32) {
        if self.mode != CameraMode::Free {
            return;
        }

        let speed = self.move_speed * dt;
        let front = self.front();
        let right_vec = self.right();

        self.position += front * forward * speed;
        self.position += right_vec * right * speed;
        self.position += self.up * up * speed;
    }

    pub fn process_mouse_movement(&mut self, delta: Vec2) {
        self.yaw += delta.x * self.mouse_sensitivity;
        self.pitch -= delta.y * self.mouse_sensitivity;

        let max_pitch = 89.0_f32.to_radians();
        self.pitch = self.pitch.clamp(-max_pitch, max_pitch);

        if self.mode == CameraMode::Orbital {
            self.update_orbital_position();
        }
    }

    pub fn process_scroll(&mut self, delta: f32) {
        match self.mode {
            CameraMode::Free => {
                self.move_speed = (self.move_speed + delta * self.zoom_speed).clamp(1.0, 500.0);
            }
            CameraMode::Orbital => {
                self.orbital_distance =
                    (self.orbital_distance - delta * self.zoom_speed).clamp(1.0, 1500.0);
                self.update_orbital_position();
            }
        }
    }

    pub fn set_mode(&mut self, mode: CameraMode) {
        if self.mode == mode {
            return;
        }

        match mode {
            CameraMode::Free => {
                let dir = (self.target - self.position).normalize_or(self.front());
                self.yaw = dir.z.atan2(dir.x);
                self.pitch = dir.y.clamp(-1.0, 1.0).asin();
                self.mode = CameraMode::Free;
            }
            CameraMode::Orbital => {
                self.mode = CameraMode::Orbital;
                self.orbital_distance = self.position.distance(self.target).max(1.0);

                let dir = (self.position - self.target).normalize_or(Vec3::Z);
                self.yaw = dir.z.atan2(dir.x);
                self.pitch = dir.y.clamp(-1.0, 1.0).asin();

                self.update_orbital_position();
            }
        }
    }

    fn update_orbital_position(&mut self) {
        self.position = self.target
            + Vec3::new(
                self.orbital_distance * self.yaw.cos() * self.pitch.cos(),
                self.orbital_distance * self.pitch.sin(),
                self.orbital_distance * self.yaw.sin() * self.pitch.cos(),
            );
    }
}
