use std::collections::HashSet;

use glam::Vec2;
use winit::event::{DeviceEvent, ElementState, WindowEvent};
use winit::keyboard::{KeyCode, PhysicalKey};

use crate::camera::CameraMovement;

/// Tracks keyboard and cursor state between frames.
#[derive(Default)]
pub struct Input {
    keys_down: HashSet<KeyCode>,
    keys_pressed: HashSet<KeyCode>,
    keys_released: HashSet<KeyCode>,
    cursor_position: Option<Vec2>,
    cursor_moved: bool,
    /// Unbounded position accumulated from raw mouse motion, for when the
    /// cursor is grabbed and window coordinates stop at the edges.
    pointer: Vec2,
    pointer_moved: bool,
}

/// WASD fly controls.
pub fn movement_for_key(key: KeyCode) -> Option<CameraMovement> {
    match key {
        KeyCode::KeyW => Some(CameraMovement::Forward),
        KeyCode::KeyS => Some(CameraMovement::Backward),
        KeyCode::KeyA => Some(CameraMovement::Left),
        KeyCode::KeyD => Some(CameraMovement::Right),
        _ => None,
    }
}

impl Input {
    pub fn new() -> Self {
        Self::default()
    }

    /// Call after each frame to reset per-frame state.
    pub fn begin_frame(&mut self) {
        self.keys_pressed.clear();
        self.keys_released.clear();
        self.cursor_moved = false;
        self.pointer_moved = false;
    }

    /// Process a window event and update input state.
    pub fn handle_event(&mut self, event: &WindowEvent) {
        match event {
            WindowEvent::KeyboardInput { event, .. } => {
                if let PhysicalKey::Code(key) = event.physical_key {
                    match event.state {
                        ElementState::Pressed => self.press(key),
                        ElementState::Released => self.release(key),
                    }
                }
            }
            WindowEvent::CursorMoved { position, .. } => {
                self.move_cursor(Vec2::new(position.x as f32, position.y as f32));
            }
            WindowEvent::Focused(false) => self.keys_down.clear(),
            _ => {}
        }
    }

    /// Process a raw device event. Only mouse motion is tracked.
    pub fn handle_device_event(&mut self, event: &DeviceEvent) {
        if let DeviceEvent::MouseMotion { delta: (dx, dy) } = *event {
            self.move_pointer(Vec2::new(dx as f32, dy as f32));
        }
    }

    fn move_pointer(&mut self, delta: Vec2) {
        self.pointer += delta;
        self.pointer_moved = true;
    }

    fn press(&mut self, key: KeyCode) {
        if self.keys_down.insert(key) {
            self.keys_pressed.insert(key);
        }
    }

    fn release(&mut self, key: KeyCode) {
        if self.keys_down.remove(&key) {
            self.keys_released.insert(key);
        }
    }

    fn move_cursor(&mut self, position: Vec2) {
        self.cursor_position = Some(position);
        self.cursor_moved = true;
    }

    /// Returns true if the key is currently held down.
    pub fn key_down(&self, key: KeyCode) -> bool {
        self.keys_down.contains(&key)
    }

    /// Returns true if the key was pressed this frame.
    pub fn key_pressed(&self, key: KeyCode) -> bool {
        self.keys_pressed.contains(&key)
    }

    /// Returns true if the key was released this frame.
    pub fn key_released(&self, key: KeyCode) -> bool {
        self.keys_released.contains(&key)
    }

    /// Camera movements for every fly key currently held.
    pub fn held_movements(&self) -> impl Iterator<Item = CameraMovement> + '_ {
        self.keys_down.iter().copied().filter_map(movement_for_key)
    }

    /// Last reported cursor position in window coordinates, if any.
    pub fn cursor_position(&self) -> Option<Vec2> {
        self.cursor_position
    }

    /// True when the cursor reported a new position this frame.
    pub fn cursor_moved(&self) -> bool {
        self.cursor_moved
    }

    /// Sum of all raw mouse motion so far. Starts at the origin.
    pub fn pointer(&self) -> Vec2 {
        self.pointer
    }

    pub fn pointer_moved(&self) -> bool {
        self.pointer_moved
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn press_is_reported_once_until_release() {
        let mut input = Input::new();
        input.press(KeyCode::KeyW);
        assert!(input.key_pressed(KeyCode::KeyW));
        input.begin_frame();
        input.press(KeyCode::KeyW); // key repeat
        assert!(!input.key_pressed(KeyCode::KeyW));
        assert!(input.key_down(KeyCode::KeyW));
        input.release(KeyCode::KeyW);
        assert!(input.key_released(KeyCode::KeyW));
        assert!(!input.key_down(KeyCode::KeyW));
    }

    #[test]
    fn held_keys_map_to_fly_directions() {
        let mut input = Input::new();
        input.press(KeyCode::KeyW);
        input.press(KeyCode::KeyD);
        input.press(KeyCode::Space);
        let mut moves: Vec<_> = input.held_movements().collect();
        moves.sort_by_key(|m| *m as u8);
        assert_eq!(moves, vec![CameraMovement::Forward, CameraMovement::Right]);
    }

    #[test]
    fn cursor_movement_is_per_frame() {
        let mut input = Input::new();
        assert_eq!(input.cursor_position(), None);
        input.move_cursor(Vec2::new(10.0, 20.0));
        assert!(input.cursor_moved());
        input.begin_frame();
        assert!(!input.cursor_moved());
        assert_eq!(input.cursor_position(), Some(Vec2::new(10.0, 20.0)));
    }

    #[test]
    fn raw_motion_accumulates_past_window_edges() {
        let mut input = Input::new();
        for _ in 0..100 {
            input.handle_device_event(&DeviceEvent::MouseMotion { delta: (25.0, -3.0) });
        }
        assert!(input.pointer_moved());
        assert_eq!(input.pointer(), Vec2::new(2500.0, -300.0));
        input.begin_frame();
        assert!(!input.pointer_moved());
    }
}
