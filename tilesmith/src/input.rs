use std::collections::HashSet;

use winit::event::{ElementState, KeyEvent};
use winit::keyboard::PhysicalKey;

pub use winit::event::MouseButton;
pub use winit::keyboard::KeyCode;

use crate::math::Vec2;

/// Short aliases for the keys games usually bind.
pub mod keys {
    use super::KeyCode;

    pub const A: KeyCode = KeyCode::KeyA;
    pub const B: KeyCode = KeyCode::KeyB;
    pub const C: KeyCode = KeyCode::KeyC;
    pub const D: KeyCode = KeyCode::KeyD;
    pub const E: KeyCode = KeyCode::KeyE;
    pub const F: KeyCode = KeyCode::KeyF;
    pub const G: KeyCode = KeyCode::KeyG;
    pub const H: KeyCode = KeyCode::KeyH;
    pub const I: KeyCode = KeyCode::KeyI;
    pub const J: KeyCode = KeyCode::KeyJ;
    pub const K: KeyCode = KeyCode::KeyK;
    pub const L: KeyCode = KeyCode::KeyL;
    pub const M: KeyCode = KeyCode::KeyM;
    pub const N: KeyCode = KeyCode::KeyN;
    pub const O: KeyCode = KeyCode::KeyO;
    pub const P: KeyCode = KeyCode::KeyP;
    pub const Q: KeyCode = KeyCode::KeyQ;
    pub const R: KeyCode = KeyCode::KeyR;
    pub const S: KeyCode = KeyCode::KeyS;
    pub const T: KeyCode = KeyCode::KeyT;
    pub const U: KeyCode = KeyCode::KeyU;
    pub const V: KeyCode = KeyCode::KeyV;
    pub const W: KeyCode = KeyCode::KeyW;
    pub const X: KeyCode = KeyCode::KeyX;
    pub const Y: KeyCode = KeyCode::KeyY;
    pub const Z: KeyCode = KeyCode::KeyZ;

    pub const LEFT: KeyCode = KeyCode::ArrowLeft;
    pub const RIGHT: KeyCode = KeyCode::ArrowRight;
    pub const UP: KeyCode = KeyCode::ArrowUp;
    pub const DOWN: KeyCode = KeyCode::ArrowDown;
    pub const SPACE: KeyCode = KeyCode::Space;
    pub const ENTER: KeyCode = KeyCode::Enter;
    pub const TAB: KeyCode = KeyCode::Tab;
    pub const SHIFT: KeyCode = KeyCode::ShiftLeft;
    pub const CTRL: KeyCode = KeyCode::ControlLeft;
    pub const ESCAPE: KeyCode = KeyCode::Escape;
    pub const DELETE: KeyCode = KeyCode::Delete;
}

/// Tracks keyboard and mouse state across frames.
#[derive(Debug, Default)]
pub struct InputState {
    keys_down: HashSet<KeyCode>,
    keys_pressed: HashSet<KeyCode>,
    keys_released: HashSet<KeyCode>,

    mouse: Vec2,
    mouse_down: [bool; 3],
    mouse_pressed: [bool; 3],
    mouse_released: [bool; 3],
}

impl InputState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Clear per-frame pressed/released flags.
    pub fn begin_frame(&mut self) {
        self.keys_pressed.clear();
        self.keys_released.clear();
        self.mouse_pressed.fill(false);
        self.mouse_released.fill(false);
    }

    /// Translate a winit keyboard event. Returns the key code when the event
    /// carried one.
    pub fn handle_key(&mut self, event: &KeyEvent) -> Option<KeyCode> {
        let PhysicalKey::Code(key) = event.physical_key else {
            return None;
        };
        self.set_key(key, event.state == ElementState::Pressed);
        Some(key)
    }

    pub fn set_key(&mut self, key: KeyCode, pressed: bool) {
        if pressed {
            if self.keys_down.insert(key) {
                self.keys_pressed.insert(key);
            }
        } else if self.keys_down.remove(&key) {
            self.keys_released.insert(key);
        }
    }

    pub fn set_mouse_button(&mut self, button: MouseButton, pressed: bool) {
        let Some(idx) = mouse_button_index(button) else {
            return;
        };
        if pressed {
            if !self.mouse_down[idx] {
                self.mouse_pressed[idx] = true;
            }
            self.mouse_down[idx] = true;
        } else {
            self.mouse_down[idx] = false;
            self.mouse_released[idx] = true;
        }
    }

    /// Record the absolute cursor position in window coordinates.
    pub fn set_cursor(&mut self, x: f64, y: f64) {
        self.mouse = Vec2::new(x as f32, y as f32);
    }

    pub fn is_key_down(&self, key: KeyCode) -> bool {
        self.keys_down.contains(&key)
    }

    /// Returns true if the key went down this frame.
    pub fn is_key_pressed(&self, key: KeyCode) -> bool {
        self.keys_pressed.contains(&key)
    }

    pub fn is_key_released(&self, key: KeyCode) -> bool {
        self.keys_released.contains(&key)
    }

    /// Either shift key.
    pub fn is_shift_down(&self) -> bool {
        self.is_key_down(KeyCode::ShiftLeft) || self.is_key_down(KeyCode::ShiftRight)
    }

    /// Either control key.
    pub fn is_ctrl_down(&self) -> bool {
        self.is_key_down(KeyCode::ControlLeft) || self.is_key_down(KeyCode::ControlRight)
    }

    pub fn is_mouse_down(&self, button: MouseButton) -> bool {
        mouse_button_index(button).is_some_and(|idx| self.mouse_down[idx])
    }

    pub fn is_mouse_pressed(&self, button: MouseButton) -> bool {
        mouse_button_index(button).is_some_and(|idx| self.mouse_pressed[idx])
    }

    pub fn is_mouse_released(&self, button: MouseButton) -> bool {
        mouse_button_index(button).is_some_and(|idx| self.mouse_released[idx])
    }

    /// Cursor position in window pixels.
    pub fn mouse_position(&self) -> Vec2 {
        self.mouse
    }

    /// -1, 0 or 1 depending on which of the two keys are held.
    pub fn axis(&self, negative: KeyCode, positive: KeyCode) -> f32 {
        let mut value = 0.0;
        if self.is_key_down(negative) {
            value -= 1.0;
        }
        if self.is_key_down(positive) {
            value += 1.0;
        }
        value
    }
}

// Only the primary, secondary and middle buttons are tracked.
fn mouse_button_index(button: MouseButton) -> Option<usize> {
    match button {
        MouseButton::Left => Some(0),
        MouseButton::Right => Some(1),
        MouseButton::Middle => Some(2),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pressed_is_edge_triggered_until_next_frame() {
        let mut input = InputState::new();
        input.set_key(keys::SPACE, true);
        assert!(input.is_key_pressed(keys::SPACE));
        input.begin_frame();
        input.set_key(keys::SPACE, true);
        assert!(input.is_key_down(keys::SPACE));
        assert!(!input.is_key_pressed(keys::SPACE));

        input.set_key(keys::SPACE, false);
        assert!(input.is_key_released(keys::SPACE));
        assert!(!input.is_key_down(keys::SPACE));
    }

    #[test]
    fn axis_cancels_when_both_keys_are_held() {
        let mut input = InputState::new();
        input.set_key(keys::LEFT, true);
        assert_eq!(input.axis(keys::LEFT, keys::RIGHT), -1.0);
        input.set_key(keys::RIGHT, true);
        assert_eq!(input.axis(keys::LEFT, keys::RIGHT), 0.0);
    }

    #[test]
    fn mouse_buttons_track_down_and_release() {
        let mut input = InputState::new();
        input.set_cursor(12.5, 40.0);
        input.set_mouse_button(MouseButton::Left, true);
        assert!(input.is_mouse_down(MouseButton::Left));
        assert!(input.is_mouse_pressed(MouseButton::Left));
        input.set_mouse_button(MouseButton::Left, false);
        assert!(!input.is_mouse_down(MouseButton::Left));
        assert_eq!(input.mouse_position(), Vec2::new(12.5, 40.0));
        assert!(!input.is_mouse_down(MouseButton::Back));
    }
}
