// Copyright 2026 the Gyre Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Touchpad gesture recognition.
//!
//! [`TouchpadRecognizer`] runs once per frame over the latched
//! [`InputSnapshot`] and synthesizes single-tap, double-tap, and swipe
//! button bits. The state machine distinguishes four sequences:
//!
//! 1. Down → Up with motion = swipe
//! 2. Down → Up without motion → timeout = single tap
//! 3. Down → Up without motion → Down → timeout = nothing
//! 4. Down → Up without motion → Down → Up = double tap
//!
//! A tap is therefore only reported after the retap window has expired,
//! which is what makes the double tap unambiguous. A swipe fires as soon as
//! the finger has covered [`SWIPE_DISTANCE`] touchpad units, direction taken
//! from the dominant axis, and marks the sequence with
//! [`ButtonFlags::TOUCH_WAS_SWIPE`] so the trailing release is not misread
//! (see [`InputSnapshot::latch`]).

#[cfg(not(feature = "std"))]
use kurbo::common::FloatFuncs as _;
use kurbo::Point;

use crate::input::{ButtonFlags, InputSnapshot};

/// Minimum touchpad travel, in touchpad units, for a swipe.
pub const SWIPE_DISTANCE: f64 = 100.0;

/// How long a finger may rest before an up stops counting as a tap, and the
/// window in which a second down begins a double tap, in seconds.
pub const FINGER_DOWN_SECONDS: f64 = 0.3;

/// How long after a clean up the recognizer waits for a retap before
/// reporting a single tap, in seconds.
pub const FINGER_UP_SECONDS: f64 = 0.3;

/// Where the recognizer is in a touch sequence.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TouchGestureState {
    /// No touch sequence in progress.
    Idle,
    /// Finger down, watching for motion or release.
    Down,
    /// Finger released without motion; waiting out the retap window.
    UpAwaitingRetap,
    /// Finger down a second time inside the retap window.
    DownAgain,
}

/// Synthesizes tap/swipe button bits from per-frame touch state.
///
/// Mutated only by the frame scheduler, once per iteration.
#[derive(Clone, Copy, Debug)]
pub struct TouchpadRecognizer {
    state: TouchGestureState,
    timer_seconds: f64,
    last_update_seconds: f64,
    origin: Point,
    last_touch_down: bool,
}

impl TouchpadRecognizer {
    /// Creates a recognizer; `start_seconds` anchors the internal timer.
    #[must_use]
    pub const fn new(start_seconds: f64) -> Self {
        Self {
            state: TouchGestureState::Idle,
            timer_seconds: 0.0,
            last_update_seconds: start_seconds,
            origin: Point::ZERO,
            last_touch_down: false,
        }
    }

    /// Returns the current gesture state.
    #[must_use]
    pub const fn state(&self) -> TouchGestureState {
        self.state
    }

    /// Advances the recognizer by one frame, writing any synthesized button
    /// bits into `input`.
    ///
    /// Fills in [`InputSnapshot::touch_relative`] and
    /// [`InputSnapshot::swipe_fraction`] as a side effect so applications
    /// can render swipe progress.
    pub fn update(&mut self, input: &mut InputSnapshot, now_seconds: f64) {
        let delta = now_seconds - self.last_update_seconds;
        self.last_update_seconds = now_seconds;
        self.timer_seconds += delta;

        let touch_down = input.button_state.contains(ButtonFlags::TOUCH);
        let down = touch_down && !self.last_touch_down;
        let up = !touch_down && self.last_touch_down;
        self.last_touch_down = touch_down;

        if down {
            self.origin = input.touch;
        }

        input.touch_relative = input.touch - self.origin;
        let magnitude = input.touch_relative.hypot();
        #[expect(
            clippy::cast_possible_truncation,
            reason = "swipe fractions are small; f32 is plenty for UI feedback"
        )]
        {
            input.swipe_fraction = (magnitude / SWIPE_DISTANCE) as f32;
        }

        match self.state {
            TouchGestureState::Idle => {
                if down {
                    self.enter(TouchGestureState::Down);
                }
            }
            TouchGestureState::Down => {
                if magnitude >= SWIPE_DISTANCE {
                    let direction = if input.touch_relative.x.abs() > input.touch_relative.y.abs() {
                        if input.touch_relative.x < 0.0 {
                            ButtonFlags::SWIPE_FORWARD
                        } else {
                            ButtonFlags::SWIPE_BACK
                        }
                    } else if input.touch_relative.y > 0.0 {
                        ButtonFlags::SWIPE_DOWN
                    } else {
                        ButtonFlags::SWIPE_UP
                    };
                    input.button_pressed |= direction | ButtonFlags::TOUCH_WAS_SWIPE;
                    input.button_released |= direction;
                    input.button_state |= direction | ButtonFlags::TOUCH_WAS_SWIPE;
                    self.enter(TouchGestureState::Idle);
                } else if up {
                    if self.timer_seconds < FINGER_DOWN_SECONDS {
                        self.enter(TouchGestureState::UpAwaitingRetap);
                    } else {
                        emit(input, ButtonFlags::TOUCH_SINGLE);
                        self.enter(TouchGestureState::Idle);
                    }
                }
            }
            TouchGestureState::UpAwaitingRetap => {
                if self.timer_seconds >= FINGER_UP_SECONDS {
                    emit(input, ButtonFlags::TOUCH_SINGLE);
                    self.enter(TouchGestureState::Idle);
                } else if down {
                    self.enter(TouchGestureState::DownAgain);
                }
            }
            TouchGestureState::DownAgain => {
                if self.timer_seconds >= FINGER_DOWN_SECONDS {
                    // Held too long for a double tap; sequence is abandoned.
                    self.enter(TouchGestureState::Idle);
                } else if up {
                    emit(input, ButtonFlags::TOUCH_DOUBLE);
                    self.enter(TouchGestureState::Idle);
                }
            }
        }
    }

    fn enter(&mut self, state: TouchGestureState) {
        self.state = state;
        self.timer_seconds = 0.0;
    }
}

fn emit(input: &mut InputSnapshot, bits: ButtonFlags) {
    input.button_pressed |= bits;
    input.button_released |= bits;
    input.button_state |= bits;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::ControlState;

    /// Drives one frame: latches `controls` against `previous`, runs the
    /// recognizer, and returns the finished snapshot.
    fn step(
        recognizer: &mut TouchpadRecognizer,
        previous: &InputSnapshot,
        controls: &ControlState,
        now: f64,
    ) -> InputSnapshot {
        let mut input = InputSnapshot::latch(controls, previous);
        recognizer.update(&mut input, now);
        input
    }

    fn touch_at(x: f64, y: f64) -> ControlState {
        ControlState {
            touch: Point::new(x, y),
            buttons: ButtonFlags::TOUCH,
            ..ControlState::default()
        }
    }

    fn touch_up_at(x: f64, y: f64) -> ControlState {
        ControlState {
            touch: Point::new(x, y),
            ..ControlState::default()
        }
    }

    #[test]
    fn tap_fires_once_after_retap_window() {
        let mut rec = TouchpadRecognizer::new(0.0);
        let mut prev = InputSnapshot::default();

        // Down at t=0, up at t=0.1, no motion.
        prev = step(&mut rec, &prev, &touch_at(50.0, 50.0), 0.0);
        assert_eq!(rec.state(), TouchGestureState::Down);
        prev = step(&mut rec, &prev, &touch_up_at(50.0, 50.0), 0.1);
        assert_eq!(rec.state(), TouchGestureState::UpAwaitingRetap);
        assert!(!prev.button_pressed.intersects(ButtonFlags::TOUCH_SINGLE));

        // Nothing yet inside the retap window.
        prev = step(&mut rec, &prev, &touch_up_at(50.0, 50.0), 0.25);
        assert!(!prev.button_pressed.intersects(ButtonFlags::TOUCH_SINGLE));

        // Window expires: exactly one single tap, no swipe, back to Idle.
        prev = step(&mut rec, &prev, &touch_up_at(50.0, 50.0), 0.45);
        assert!(prev.button_pressed.contains(ButtonFlags::TOUCH_SINGLE));
        assert!(!prev.button_pressed.intersects(ButtonFlags::ANY_SWIPE));
        assert_eq!(rec.state(), TouchGestureState::Idle);

        // And never again.
        let after = step(&mut rec, &prev, &touch_up_at(50.0, 50.0), 0.6);
        assert!(!after.button_pressed.intersects(ButtonFlags::TOUCH_SINGLE));
    }

    #[test]
    fn slow_release_still_taps_immediately() {
        let mut rec = TouchpadRecognizer::new(0.0);
        let mut prev = InputSnapshot::default();

        // Finger rests past the tap window before lifting: a deliberate
        // press, reported without the retap wait.
        prev = step(&mut rec, &prev, &touch_at(10.0, 10.0), 0.0);
        prev = step(&mut rec, &prev, &touch_at(10.0, 10.0), 0.2);
        prev = step(&mut rec, &prev, &touch_up_at(10.0, 10.0), 0.4);
        assert!(prev.button_pressed.contains(ButtonFlags::TOUCH_SINGLE));
        assert_eq!(rec.state(), TouchGestureState::Idle);
    }

    #[test]
    fn double_tap() {
        let mut rec = TouchpadRecognizer::new(0.0);
        let mut prev = InputSnapshot::default();

        prev = step(&mut rec, &prev, &touch_at(10.0, 10.0), 0.0);
        prev = step(&mut rec, &prev, &touch_up_at(10.0, 10.0), 0.1);
        prev = step(&mut rec, &prev, &touch_at(10.0, 10.0), 0.2);
        assert_eq!(rec.state(), TouchGestureState::DownAgain);
        prev = step(&mut rec, &prev, &touch_up_at(10.0, 10.0), 0.3);

        assert!(prev.button_pressed.contains(ButtonFlags::TOUCH_DOUBLE));
        assert!(!prev.button_pressed.intersects(ButtonFlags::TOUCH_SINGLE));
        assert_eq!(rec.state(), TouchGestureState::Idle);
    }

    #[test]
    fn retap_held_too_long_is_nothing() {
        let mut rec = TouchpadRecognizer::new(0.0);
        let mut prev = InputSnapshot::default();

        prev = step(&mut rec, &prev, &touch_at(10.0, 10.0), 0.0);
        prev = step(&mut rec, &prev, &touch_up_at(10.0, 10.0), 0.1);
        prev = step(&mut rec, &prev, &touch_at(10.0, 10.0), 0.2);
        // Second press held past the window, then released: no gesture.
        prev = step(&mut rec, &prev, &touch_at(10.0, 10.0), 0.6);
        assert_eq!(rec.state(), TouchGestureState::Idle);
        prev = step(&mut rec, &prev, &touch_up_at(10.0, 10.0), 0.7);
        assert!(!prev.button_pressed.intersects(
            ButtonFlags::TOUCH_SINGLE | ButtonFlags::TOUCH_DOUBLE | ButtonFlags::ANY_SWIPE
        ));
    }

    #[test]
    fn horizontal_swipe_matches_dominant_axis_sign() {
        let mut rec = TouchpadRecognizer::new(0.0);
        let mut prev = InputSnapshot::default();

        prev = step(&mut rec, &prev, &touch_at(200.0, 100.0), 0.0);
        // 120 units of rightward travel while down.
        prev = step(&mut rec, &prev, &touch_at(320.0, 110.0), 0.05);

        assert!(prev.button_pressed.contains(ButtonFlags::SWIPE_BACK));
        assert!(prev.button_pressed.contains(ButtonFlags::TOUCH_WAS_SWIPE));
        assert!(prev.button_released.contains(ButtonFlags::SWIPE_BACK));
        assert!(!prev.button_released.intersects(ButtonFlags::TOUCH_WAS_SWIPE));
        assert!(!prev.button_pressed.intersects(ButtonFlags::TOUCH_SINGLE));
        assert_eq!(rec.state(), TouchGestureState::Idle);
        assert!(prev.swipe_fraction >= 1.0);

        // The trailing release produces no tap.
        prev = step(&mut rec, &prev, &touch_up_at(320.0, 110.0), 0.1);
        let after = step(&mut rec, &prev, &touch_up_at(320.0, 110.0), 0.5);
        assert!(!after.button_pressed.intersects(
            ButtonFlags::TOUCH_SINGLE | ButtonFlags::TOUCH_DOUBLE | ButtonFlags::ANY_SWIPE
        ));
    }

    #[test]
    fn leftward_swipe_is_forward() {
        let mut rec = TouchpadRecognizer::new(0.0);
        let mut prev = InputSnapshot::default();

        prev = step(&mut rec, &prev, &touch_at(300.0, 100.0), 0.0);
        prev = step(&mut rec, &prev, &touch_at(150.0, 100.0), 0.05);
        assert!(prev.button_pressed.contains(ButtonFlags::SWIPE_FORWARD));
    }

    #[test]
    fn vertical_swipe_directions() {
        let mut rec = TouchpadRecognizer::new(0.0);
        let mut prev = InputSnapshot::default();
        prev = step(&mut rec, &prev, &touch_at(100.0, 100.0), 0.0);
        prev = step(&mut rec, &prev, &touch_at(110.0, 250.0), 0.05);
        assert!(prev.button_pressed.contains(ButtonFlags::SWIPE_DOWN));

        let mut rec = TouchpadRecognizer::new(0.0);
        let mut prev = InputSnapshot::default();
        prev = step(&mut rec, &prev, &touch_at(100.0, 300.0), 0.0);
        prev = step(&mut rec, &prev, &touch_at(110.0, 150.0), 0.05);
        assert!(prev.button_pressed.contains(ButtonFlags::SWIPE_UP));
    }

    #[test]
    fn sub_threshold_motion_is_not_a_swipe() {
        let mut rec = TouchpadRecognizer::new(0.0);
        let mut prev = InputSnapshot::default();

        prev = step(&mut rec, &prev, &touch_at(100.0, 100.0), 0.0);
        prev = step(&mut rec, &prev, &touch_at(180.0, 100.0), 0.05);
        assert!(!prev.button_pressed.intersects(ButtonFlags::ANY_SWIPE));
        assert!(prev.swipe_fraction > 0.0 && prev.swipe_fraction < 1.0);
        assert_eq!(rec.state(), TouchGestureState::Down);
    }
}
