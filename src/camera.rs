//! Free-fly camera driven by WASD and the mouse.
//!
//! Orientation is stored as yaw/pitch in degrees. Every mutation recomputes
//! the `front`, `right` and `up` basis immediately, so the three vectors are
//! always unit length and mutually orthogonal.

use glam::{Mat4, Vec3};

/// Initial yaw in degrees; -90 looks down -Z.
pub const YAW: f32 = -90.0;
/// Initial pitch in degrees.
pub const PITCH: f32 = 0.0;
/// Movement speed in world units per second.
pub const SPEED: f32 = 30.0;
/// Degrees of rotation per pixel of cursor travel.
pub const SENSITIVITY: f32 = 0.1;
/// Vertical field of view in degrees.
pub const FOV_DEGREES: f32 = 45.0;
/// Projection aspect ratio. Fixed, independent of the window size.
pub const ASPECT_RATIO: f32 = 16.0 / 9.0;
/// Near clip plane.
pub const NEAR: f32 = 0.1;
/// Far clip plane.
pub const FAR: f32 = 5000.0;
/// Pitch limit in degrees when constrained.
pub const PITCH_LIMIT: f32 = 89.0;

/// Fly directions for [`Camera::process_keyboard`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CameraMovement {
    Forward,
    Backward,
    Left,
    Right,
}

/// Euler-angle free-fly camera.
#[derive(Clone, Debug)]
pub struct Camera {
    pub position: Vec3,
    world_up: Vec3,
    yaw: f32,
    pitch: f32,
    front: Vec3,
    right: Vec3,
    up: Vec3,
    pub movement_speed: f32,
    pub mouse_sensitivity: f32,
    last_x: f32,
    last_y: f32,
}

impl Default for Camera {
    fn default() -> Self {
        Self::new(Vec3::ZERO, Vec3::Y, YAW, PITCH)
    }
}

impl Camera {
    pub fn new(position: Vec3, world_up: Vec3, yaw: f32, pitch: f32) -> Self {
        let mut camera = Self {
            position,
            world_up,
            yaw,
            pitch,
            front: Vec3::NEG_Z,
            right: Vec3::X,
            up: Vec3::Y,
            movement_speed: SPEED,
            mouse_sensitivity: SENSITIVITY,
            last_x: 0.0,
            last_y: 0.0,
        };
        camera.update_vectors();
        camera
    }

    /// Builder-style position override.
    pub fn at(mut self, position: Vec3) -> Self {
        self.position = position;
        self
    }

    /// Builder-style orientation override, in degrees.
    pub fn facing(mut self, yaw: f32, pitch: f32) -> Self {
        self.yaw = yaw;
        self.pitch = pitch.clamp(-PITCH_LIMIT, PITCH_LIMIT);
        self.update_vectors();
        self
    }

    pub fn yaw(&self) -> f32 {
        self.yaw
    }

    pub fn pitch(&self) -> f32 {
        self.pitch
    }

    pub fn front(&self) -> Vec3 {
        self.front
    }

    pub fn right(&self) -> Vec3 {
        self.right
    }

    pub fn up(&self) -> Vec3 {
        self.up
    }

    /// Move along the front or right axis by `speed * dt`.
    pub fn process_keyboard(&mut self, direction: CameraMovement, dt: f32) {
        let velocity = self.movement_speed * dt;
        match direction {
            CameraMovement::Forward => self.position += self.front * velocity,
            CameraMovement::Backward => self.position -= self.front * velocity,
            CameraMovement::Left => self.position -= self.right * velocity,
            CameraMovement::Right => self.position += self.right * velocity,
        }
    }

    /// Record `(x, y)` as the last cursor position without rotating.
    pub fn sync_cursor(&mut self, x: f32, y: f32) {
        self.last_x = x;
        self.last_y = y;
    }

    /// Rotate by the cursor travel since the last recorded position.
    ///
    /// Screen y grows downwards, so moving the cursor up pitches the camera up.
    pub fn process_mouse_movement(&mut self, x: f32, y: f32, constrain_pitch: bool) {
        let x_offset = (x - self.last_x) * self.mouse_sensitivity;
        let y_offset = (self.last_y - y) * self.mouse_sensitivity;
        self.sync_cursor(x, y);

        self.yaw += x_offset;
        self.pitch += y_offset;
        if constrain_pitch {
            self.pitch = self.pitch.clamp(-PITCH_LIMIT, PITCH_LIMIT);
        }

        self.update_vectors();
    }

    /// Right-handed look-at from `position` towards `position + front`.
    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at_rh(self.position, self.position + self.front, self.up)
    }

    /// 45° perspective with the fixed 16:9 aspect and [0, 1] depth.
    pub fn projection_matrix(&self) -> Mat4 {
        Mat4::perspective_rh(FOV_DEGREES.to_radians(), ASPECT_RATIO, NEAR, FAR)
    }

    /// `projection * view`, the matrix shaders receive as `camera`.
    pub fn camera_matrix(&self) -> Mat4 {
        self.projection_matrix() * self.view_matrix()
    }

    fn update_vectors(&mut self) {
        let (yaw, pitch) = (self.yaw.to_radians(), self.pitch.to_radians());
        self.front = Vec3::new(
            yaw.cos() * pitch.cos(),
            pitch.sin(),
            yaw.sin() * pitch.cos(),
        )
        .normalize();
        self.right = self.front.cross(self.world_up).normalize();
        self.up = self.right.cross(self.front).normalize();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn assert_orthonormal(camera: &Camera) {
        let (f, r, u) = (camera.front(), camera.right(), camera.up());
        assert!(f.dot(r).abs() < 1e-5, "front·right = {}", f.dot(r));
        assert!(f.dot(u).abs() < 1e-5, "front·up = {}", f.dot(u));
        assert!(r.dot(u).abs() < 1e-5, "right·up = {}", r.dot(u));
        assert_relative_eq!(f.length(), 1.0, epsilon = 1e-5);
        assert_relative_eq!(r.length(), 1.0, epsilon = 1e-5);
        assert_relative_eq!(u.length(), 1.0, epsilon = 1e-5);
    }

    #[test]
    fn default_camera_looks_down_negative_z() {
        let camera = Camera::default();
        assert!(camera.front().abs_diff_eq(Vec3::NEG_Z, 1e-6));
        assert!(camera.right().abs_diff_eq(Vec3::X, 1e-6));
        assert!(camera.up().abs_diff_eq(Vec3::Y, 1e-6));
    }

    #[test]
    fn basis_is_orthonormal_for_any_orientation() {
        for yaw_step in -36..=36 {
            for pitch_step in -17..=17 {
                let camera = Camera::default().facing(yaw_step as f32 * 10.0, pitch_step as f32 * 5.2);
                assert_orthonormal(&camera);
            }
        }
    }

    #[test]
    fn basis_stays_orthonormal_after_mouse_movement() {
        let mut camera = Camera::default();
        let path = [(120.0, -40.0), (-3000.0, 900.0), (15.5, 7.25), (80000.0, -80000.0)];
        for (x, y) in path {
            camera.process_mouse_movement(x, y, true);
            assert_orthonormal(&camera);
        }
    }

    #[test]
    fn pitch_is_clamped_for_huge_deltas() {
        let mut camera = Camera::default();
        camera.process_mouse_movement(0.0, -1.0e6, true);
        assert_eq!(camera.pitch(), PITCH_LIMIT);
        camera.process_mouse_movement(0.0, 1.0e6, true);
        assert_eq!(camera.pitch(), -PITCH_LIMIT);
        camera.process_mouse_movement(0.0, 1.0e9, true);
        assert!((-PITCH_LIMIT..=PITCH_LIMIT).contains(&camera.pitch()));
    }

    #[test]
    fn unconstrained_pitch_is_not_clamped() {
        let mut camera = Camera::default();
        camera.process_mouse_movement(0.0, -1000.0, false);
        assert_relative_eq!(camera.pitch(), 100.0, epsilon = 1e-4);
    }

    #[test]
    fn mouse_offsets_use_last_position_and_sensitivity() {
        let mut camera = Camera::default();
        camera.sync_cursor(400.0, 300.0);
        camera.process_mouse_movement(420.0, 290.0, true);
        assert_relative_eq!(camera.yaw(), YAW + 2.0, epsilon = 1e-5);
        assert_relative_eq!(camera.pitch(), 1.0, epsilon = 1e-5);

        // Same position again: no further rotation.
        camera.process_mouse_movement(420.0, 290.0, true);
        assert_relative_eq!(camera.yaw(), YAW + 2.0, epsilon = 1e-5);
    }

    #[test]
    fn view_matrix_times_inverse_is_identity() {
        let mut camera = Camera::default().at(Vec3::new(3.0, -7.5, 12.0));
        camera.process_mouse_movement(250.0, -130.0, true);
        let view = camera.view_matrix();
        assert!((view * view.inverse()).abs_diff_eq(Mat4::IDENTITY, 1e-5));
    }

    #[test]
    fn keyboard_moves_along_basis_scaled_by_dt() {
        let mut camera = Camera::default();
        camera.process_keyboard(CameraMovement::Forward, 0.5);
        assert!(camera.position.abs_diff_eq(Vec3::new(0.0, 0.0, -15.0), 1e-4));
        camera.process_keyboard(CameraMovement::Right, 0.1);
        assert!(camera.position.abs_diff_eq(Vec3::new(3.0, 0.0, -15.0), 1e-4));
        camera.process_keyboard(CameraMovement::Backward, 0.5);
        camera.process_keyboard(CameraMovement::Left, 0.1);
        assert!(camera.position.abs_diff_eq(Vec3::ZERO, 1e-4));
    }

    #[test]
    fn projection_ignores_window_aspect() {
        let proj = Camera::default().projection_matrix();
        assert_relative_eq!(proj.x_axis.x / proj.y_axis.y, 9.0 / 16.0, epsilon = 1e-5);
    }

    #[test]
    fn camera_matrix_projects_point_ahead_to_screen_centre() {
        let camera = Camera::default().at(Vec3::new(0.0, 2.0, 10.0));
        let clip = camera.camera_matrix() * Vec3::new(0.0, 2.0, 0.0).extend(1.0);
        let ndc = clip / clip.w;
        assert_relative_eq!(ndc.x, 0.0, epsilon = 1e-5);
        assert_relative_eq!(ndc.y, 0.0, epsilon = 1e-5);
        assert!(ndc.z > 0.0 && ndc.z < 1.0);
    }
}
