// Copyright 2026 the Gyre Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Back-key press classification.
//!
//! The hardware back key is overloaded: a short press is "back", a long
//! press opens the system menu, and a double tap is reserved for apps. Raw
//! down/up edges are fed in as they arrive on the command queue
//! ([`BackKeyState::feed`]); the scheduler polls [`BackKeyState::update`]
//! once per frame and acts on the classified event.
//!
//! Classification can only be decided after a window elapses: a release is
//! not a short press until the double-tap window has passed without a second
//! press, and a long press fires while the key is still held.

/// Android key code for the hardware back key.
pub const BACK_KEY_CODE: i32 = 4;

/// Window after a release in which a second press becomes a double tap, in
/// seconds.
pub const DOUBLE_TAP_SECONDS: f64 = 0.25;

/// Hold duration at which a press becomes a long press, in seconds.
pub const LONG_PRESS_SECONDS: f64 = 0.75;

/// A classified back-key event.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BackKeyEvent {
    /// Nothing to report this frame.
    None,
    /// The key just went down (classification pending).
    Down,
    /// Press and release, with no retap inside the double-tap window.
    ShortPress,
    /// Two quick taps.
    DoubleTap,
    /// Key held past [`LONG_PRESS_SECONDS`]; reported while still held.
    LongPress,
}

/// Tracks raw back-key edges and classifies them over time.
#[derive(Clone, Copy, Debug, Default)]
pub struct BackKeyState {
    is_down: bool,
    down_seconds: f64,
    up_seconds: f64,
    awaiting_retap: bool,
    long_press_fired: bool,
    pending: Option<BackKeyEvent>,
}

impl BackKeyState {
    /// Creates an idle tracker.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Feeds a raw down/up edge at `now_seconds`.
    pub fn feed(&mut self, down: bool, now_seconds: f64) {
        if down && !self.is_down {
            if self.awaiting_retap && now_seconds - self.up_seconds <= DOUBLE_TAP_SECONDS {
                self.awaiting_retap = false;
                self.pending = Some(BackKeyEvent::DoubleTap);
            } else {
                self.pending = Some(BackKeyEvent::Down);
            }
            self.is_down = true;
            self.down_seconds = now_seconds;
            self.long_press_fired = false;
        } else if !down && self.is_down {
            self.is_down = false;
            if !self.long_press_fired {
                self.awaiting_retap = true;
                self.up_seconds = now_seconds;
            }
        }
    }

    /// Polls for a classified event; called once per frame.
    ///
    /// Returns at most one event per call, in arrival order: edge events
    /// first, then window-expiry classifications.
    pub fn update(&mut self, now_seconds: f64) -> BackKeyEvent {
        if let Some(event) = self.pending.take() {
            return event;
        }
        if self.is_down
            && !self.long_press_fired
            && now_seconds - self.down_seconds >= LONG_PRESS_SECONDS
        {
            self.long_press_fired = true;
            return BackKeyEvent::LongPress;
        }
        if self.awaiting_retap && now_seconds - self.up_seconds > DOUBLE_TAP_SECONDS {
            self.awaiting_retap = false;
            return BackKeyEvent::ShortPress;
        }
        BackKeyEvent::None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_press_after_window() {
        let mut key = BackKeyState::new();
        key.feed(true, 0.0);
        assert_eq!(key.update(0.0), BackKeyEvent::Down);
        key.feed(false, 0.1);
        // Still inside the double-tap window: undecided.
        assert_eq!(key.update(0.2), BackKeyEvent::None);
        // Window expired: short press, exactly once.
        assert_eq!(key.update(0.4), BackKeyEvent::ShortPress);
        assert_eq!(key.update(0.5), BackKeyEvent::None);
    }

    #[test]
    fn double_tap_inside_window() {
        let mut key = BackKeyState::new();
        key.feed(true, 0.0);
        assert_eq!(key.update(0.0), BackKeyEvent::Down);
        key.feed(false, 0.1);
        key.feed(true, 0.2);
        assert_eq!(key.update(0.2), BackKeyEvent::DoubleTap);
        key.feed(false, 0.3);
        // The second release must not also produce a short press.
        assert_eq!(key.update(0.7), BackKeyEvent::None);
    }

    #[test]
    fn long_press_fires_while_held() {
        let mut key = BackKeyState::new();
        key.feed(true, 0.0);
        assert_eq!(key.update(0.0), BackKeyEvent::Down);
        assert_eq!(key.update(0.5), BackKeyEvent::None);
        assert_eq!(key.update(0.8), BackKeyEvent::LongPress);
        // Release after a long press is not a short press.
        key.feed(false, 1.0);
        assert_eq!(key.update(1.5), BackKeyEvent::None);
    }

    #[test]
    fn long_press_reported_once() {
        let mut key = BackKeyState::new();
        key.feed(true, 0.0);
        let _ = key.update(0.0);
        assert_eq!(key.update(1.0), BackKeyEvent::LongPress);
        assert_eq!(key.update(2.0), BackKeyEvent::None);
    }
}
