//! Keyboard input tracking.

use std::collections::HashSet;

pub use winit::keyboard::KeyCode;

/// Tracks held keys plus the keys that changed since the last frame.
#[derive(Debug, Default)]
pub struct InputState {
    pressed_keys: HashSet<KeyCode>,
    just_pressed_keys: HashSet<KeyCode>,
    just_released_keys: HashSet<KeyCode>,
}

impl InputState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Clear the per-frame edge sets. Call once per frame before polling.
    pub fn begin_frame(&mut self) {
        self.just_pressed_keys.clear();
        self.just_released_keys.clear();
    }

    pub fn on_key_pressed(&mut self, key: KeyCode) {
        if self.pressed_keys.insert(key) {
            self.just_pressed_keys.insert(key);
        }
    }

    pub fn on_key_released(&mut self, key: KeyCode) {
        if self.pressed_keys.remove(&key) {
            self.just_released_keys.insert(key);
        }
    }

    /// Drop every held key, e.g. when the window loses focus and release
    /// events will never arrive.
    pub fn release_all(&mut self) {
        let held: Vec<KeyCode> = self.pressed_keys.drain().collect();
        self.just_released_keys.extend(held);
    }

    /// Check if a key is currently held.
    pub fn is_key_pressed(&self, key: KeyCode) -> bool {
        self.pressed_keys.contains(&key)
    }

    /// Check if a key went down this frame.
    pub fn is_key_just_pressed(&self, key: KeyCode) -> bool {
        self.just_pressed_keys.contains(&key)
    }

    /// Check if a key went up this frame.
    pub fn is_key_just_released(&self, key: KeyCode) -> bool {
        self.just_released_keys.contains(&key)
    }

    /// +1 when only `positive` is held, -1 when only `negative` is held, 0 otherwise.
    pub fn axis(&self, positive: KeyCode, negative: KeyCode) -> f32 {
        let mut value = 0.0;
        if self.is_key_pressed(positive) {
            value += 1.0;
        }
        if self.is_key_pressed(negative) {
            value -= 1.0;
        }
        value
    }
}
