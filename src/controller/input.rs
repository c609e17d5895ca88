//! Platform-agnostic input handling
//!
//! Keys are identified by physical key code strings (`KeyboardEvent.code`
//! on the web, the matching winit `KeyCode` name on native), so a binding
//! means the same key position regardless of keyboard layout.

/// Platform-independent input events
#[derive(Debug, Clone, PartialEq)]
pub enum InputEvent {
    KeyDown(String),
    KeyUp(String),

    MouseMove { dx: f32, dy: f32 },
    MouseButton { button: MouseButton, is_down: bool },
    MouseWheel { delta_y: f32 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MouseButton {
    Left,
    Right,
    Middle,
}

impl MouseButton {
    pub fn from_web_button(button: i16) -> Self {
        match button {
            1 => MouseButton::Middle,
            2 => MouseButton::Right,
            _ => MouseButton::Left,
        }
    }
}

/// What a bound key asks the player to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyIntent {
    Forward,
    Backward,
    Left,
    Right,
}

/// Two physical keys per intent. Fixed; there is no remapping.
#[derive(Debug, Clone)]
pub struct KeyBindings {
    pub forward: [&'static str; 2],
    pub backward: [&'static str; 2],
    pub left: [&'static str; 2],
    pub right: [&'static str; 2],
}

impl Default for KeyBindings {
    fn default() -> Self {
        Self {
            forward: ["ArrowUp", "KeyW"],
            backward: ["ArrowDown", "KeyS"],
            left: ["ArrowLeft", "KeyA"],
            right: ["ArrowRight", "KeyD"],
        }
    }
}

impl KeyBindings {
    pub fn intent(&self, code: &str) -> Option<KeyIntent> {
        if matches(&self.forward, code) {
            Some(KeyIntent::Forward)
        } else if matches(&self.backward, code) {
            Some(KeyIntent::Backward)
        } else if matches(&self.left, code) {
            Some(KeyIntent::Left)
        } else if matches(&self.right, code) {
            Some(KeyIntent::Right)
        } else {
            None
        }
    }

    /// Keys whose browser default (page scrolling) should be suppressed.
    pub fn is_bound(&self, code: &str) -> bool {
        self.intent(code).is_some()
    }
}

fn matches(keys: &[&'static str; 2], code: &str) -> bool {
    keys.iter().any(|k| *k == code)
}

#[cfg(target_arch = "wasm32")]
pub mod wasm {
    use super::*;
    use web_sys::{KeyboardEvent, MouseEvent, WheelEvent};

    pub fn keyboard_event_to_input(e: &KeyboardEvent, is_down: bool) -> InputEvent {
        let code = e.code();
        if is_down {
            InputEvent::KeyDown(code)
        } else {
            InputEvent::KeyUp(code)
        }
    }

    pub fn mouse_move_to_input(e: &MouseEvent) -> InputEvent {
        InputEvent::MouseMove { dx: e.movement_x() as f32, dy: e.movement_y() as f32 }
    }

    pub fn mouse_button_to_input(e: &MouseEvent, is_down: bool) -> InputEvent {
        InputEvent::MouseButton { button: MouseButton::from_web_button(e.button()), is_down }
    }

    pub fn wheel_to_input(e: &WheelEvent) -> InputEvent {
        InputEvent::MouseWheel { delta_y: e.delta_y() as f32 }
    }
}
