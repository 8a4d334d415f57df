// Copyright 2026 the Gyre Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Button bitsets and per-frame input snapshots.
//!
//! The producer thread feeds raw key/touch/stick events through the command
//! queue into a persistent [`ControlState`]. Once per frame the scheduler
//! *latches* that state into an [`InputSnapshot`], deriving the one-frame
//! pressed/released edge masks by comparing against the previous snapshot.
//! The edge masks are never persisted beyond the frame they were derived
//! for.
//!
//! The [`ButtonFlags::TOUCH_WAS_SWIPE`] bit is special: it is set by the
//! gesture recognizer together with a swipe and deliberately survives until
//! the frame *after* the trailing touch release, so the release cannot be
//! misread as a tap. See [`InputSnapshot::latch`].

use core::fmt;
use core::ops::{BitAnd, BitOr, BitOrAssign, Not};

use kurbo::{Point, Vec2};

/// A set of controller/touchpad buttons, one bit per button.
#[derive(Clone, Copy, PartialEq, Eq, Default)]
pub struct ButtonFlags(pub u32);

impl ButtonFlags {
    /// No buttons.
    pub const NONE: Self = Self(0);
    /// Gamepad A.
    pub const A: Self = Self(1 << 0);
    /// Gamepad B.
    pub const B: Self = Self(1 << 1);
    /// Gamepad X.
    pub const X: Self = Self(1 << 2);
    /// Gamepad Y.
    pub const Y: Self = Self(1 << 3);
    /// Start.
    pub const START: Self = Self(1 << 4);
    /// Hardware back key.
    pub const BACK: Self = Self(1 << 5);
    /// Select.
    pub const SELECT: Self = Self(1 << 6);
    /// Menu.
    pub const MENU: Self = Self(1 << 7);
    /// Right shoulder trigger.
    pub const RIGHT_TRIGGER: Self = Self(1 << 8);
    /// Left shoulder trigger.
    pub const LEFT_TRIGGER: Self = Self(1 << 9);
    /// D-pad up.
    pub const DPAD_UP: Self = Self(1 << 10);
    /// D-pad down.
    pub const DPAD_DOWN: Self = Self(1 << 11);
    /// D-pad left.
    pub const DPAD_LEFT: Self = Self(1 << 12);
    /// D-pad right.
    pub const DPAD_RIGHT: Self = Self(1 << 13);
    /// Left stick pushed up past the binary threshold.
    pub const LSTICK_UP: Self = Self(1 << 14);
    /// Left stick pushed down.
    pub const LSTICK_DOWN: Self = Self(1 << 15);
    /// Left stick pushed left.
    pub const LSTICK_LEFT: Self = Self(1 << 16);
    /// Left stick pushed right.
    pub const LSTICK_RIGHT: Self = Self(1 << 17);
    /// Right stick pushed up.
    pub const RSTICK_UP: Self = Self(1 << 18);
    /// Right stick pushed down.
    pub const RSTICK_DOWN: Self = Self(1 << 19);
    /// Right stick pushed left.
    pub const RSTICK_LEFT: Self = Self(1 << 20);
    /// Right stick pushed right.
    pub const RSTICK_RIGHT: Self = Self(1 << 21);
    /// Finger resting on the touchpad.
    pub const TOUCH: Self = Self(1 << 22);
    /// Synthesized: swipe up.
    pub const SWIPE_UP: Self = Self(1 << 23);
    /// Synthesized: swipe down.
    pub const SWIPE_DOWN: Self = Self(1 << 24);
    /// Synthesized: swipe forward (toward the face).
    pub const SWIPE_FORWARD: Self = Self(1 << 25);
    /// Synthesized: swipe back.
    pub const SWIPE_BACK: Self = Self(1 << 26);
    /// Sticky marker: the current touch sequence produced a swipe, and the
    /// trailing touch release is still pending. Held one extra frame past
    /// the release.
    pub const TOUCH_WAS_SWIPE: Self = Self(1 << 27);
    /// Synthesized: single tap.
    pub const TOUCH_SINGLE: Self = Self(1 << 28);
    /// Synthesized: double tap.
    pub const TOUCH_DOUBLE: Self = Self(1 << 29);

    /// All four synthesized swipe bits.
    pub const ANY_SWIPE: Self =
        Self(Self::SWIPE_UP.0 | Self::SWIPE_DOWN.0 | Self::SWIPE_FORWARD.0 | Self::SWIPE_BACK.0);

    /// Whether every bit of `other` is set in `self`.
    #[inline]
    #[must_use]
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    /// Whether any bit of `other` is set in `self`.
    #[inline]
    #[must_use]
    pub const fn intersects(self, other: Self) -> bool {
        self.0 & other.0 != 0
    }

    /// Whether no bits are set.
    #[inline]
    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Removes the bits of `other` from `self`.
    #[inline]
    pub fn remove(&mut self, other: Self) {
        self.0 &= !other.0;
    }
}

impl BitOr for ButtonFlags {
    type Output = Self;

    #[inline]
    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl BitOrAssign for ButtonFlags {
    #[inline]
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

impl BitAnd for ButtonFlags {
    type Output = Self;

    #[inline]
    fn bitand(self, rhs: Self) -> Self {
        Self(self.0 & rhs.0)
    }
}

impl Not for ButtonFlags {
    type Output = Self;

    #[inline]
    fn not(self) -> Self {
        Self(!self.0)
    }
}

impl fmt::Debug for ButtonFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ButtonFlags({:#010x})", self.0)
    }
}

/// Persistent input state owned by the render thread and mutated only by
/// decoded commands.
///
/// This is the accumulation side; [`InputSnapshot::latch`] turns it into the
/// immutable per-frame view.
#[derive(Clone, Copy, Debug, Default)]
pub struct ControlState {
    /// Analog stick axes: `[pad][axis]`, pad 0 = left, axis 0 = x.
    pub sticks: [[f32; 2]; 2],
    /// Last reported touchpad position, in touchpad units.
    pub touch: Point,
    /// Currently held buttons.
    pub buttons: ButtonFlags,
}

/// The input view for a single frame.
///
/// Created once per scheduler iteration; becomes the previous-frame
/// reference for the next iteration's edge detection; never mutated after
/// the gesture recognizer has run.
#[derive(Clone, Copy, Debug, Default)]
pub struct InputSnapshot {
    /// Analog stick axes, copied from [`ControlState`].
    pub sticks: [[f32; 2]; 2],
    /// Touchpad position, in touchpad units.
    pub touch: Point,
    /// Touch position relative to the gesture origin, filled in by the
    /// gesture recognizer.
    pub touch_relative: Vec2,
    /// Fraction of the swipe distance threshold covered so far (may exceed
    /// 1.0 on the frame a swipe fires).
    pub swipe_fraction: f32,
    /// Buttons currently held.
    pub button_state: ButtonFlags,
    /// Buttons that went down this frame.
    pub button_pressed: ButtonFlags,
    /// Buttons that went up this frame.
    pub button_released: ButtonFlags,
}

impl InputSnapshot {
    /// Latches the persistent control state into this frame's snapshot,
    /// deriving edge masks against the previous frame's snapshot.
    ///
    /// `pressed = current & !previous` and
    /// `released = !current & (previous & !TOUCH_WAS_SWIPE)`; the was-swipe
    /// bit is excluded from release detection and instead carried forward
    /// explicitly: while the previous frame was marked was-swipe, the bit
    /// stays in `button_state` until the touch release has been observed,
    /// and is released together with it.
    #[must_use]
    pub fn latch(controls: &ControlState, previous: &Self) -> Self {
        let current = controls.buttons;
        let mut snapshot = Self {
            sticks: controls.sticks,
            touch: controls.touch,
            touch_relative: Vec2::ZERO,
            swipe_fraction: 0.0,
            button_state: current,
            button_pressed: current & !previous.button_state,
            button_released: !current & (previous.button_state & !ButtonFlags::TOUCH_WAS_SWIPE),
        };

        if previous.button_state.contains(ButtonFlags::TOUCH_WAS_SWIPE) {
            if previous.button_released.contains(ButtonFlags::TOUCH) {
                snapshot.button_released |= ButtonFlags::TOUCH_WAS_SWIPE;
            } else {
                // The touch release has not happened yet; keep the marker.
                snapshot.button_state |= ButtonFlags::TOUCH_WAS_SWIPE;
            }
        }

        snapshot
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn held(buttons: ButtonFlags) -> ControlState {
        ControlState {
            buttons,
            ..ControlState::default()
        }
    }

    #[test]
    fn press_edge_fires_once() {
        let prev = InputSnapshot::default();
        let first = InputSnapshot::latch(&held(ButtonFlags::A), &prev);
        assert!(first.button_pressed.contains(ButtonFlags::A));
        assert!(first.button_released.is_empty());

        let second = InputSnapshot::latch(&held(ButtonFlags::A), &first);
        assert!(
            second.button_pressed.is_empty(),
            "held button must not re-fire the press edge"
        );
        assert!(second.button_state.contains(ButtonFlags::A));
    }

    #[test]
    fn release_edge_fires_once() {
        let prev = InputSnapshot::latch(&held(ButtonFlags::A), &InputSnapshot::default());
        let released = InputSnapshot::latch(&held(ButtonFlags::NONE), &prev);
        assert!(released.button_released.contains(ButtonFlags::A));
        assert!(released.button_pressed.is_empty());

        let after = InputSnapshot::latch(&held(ButtonFlags::NONE), &released);
        assert!(after.button_released.is_empty());
    }

    #[test]
    fn was_swipe_survives_until_touch_release() {
        // Frame N: swipe fired while the finger is still down. The recognizer
        // left TOUCH_WAS_SWIPE in the frame's state.
        let mut swiped = InputSnapshot::latch(&held(ButtonFlags::TOUCH), &InputSnapshot::default());
        swiped.button_state |= ButtonFlags::TOUCH_WAS_SWIPE;

        // Frame N+1: finger still down; marker is carried.
        let carried = InputSnapshot::latch(&held(ButtonFlags::TOUCH), &swiped);
        assert!(carried.button_state.contains(ButtonFlags::TOUCH_WAS_SWIPE));
        assert!(!carried.button_released.contains(ButtonFlags::TOUCH_WAS_SWIPE));

        // Frame N+2: finger lifts. TOUCH releases, the marker is excluded
        // from XOR release detection and still reported as state.
        let lifting = InputSnapshot::latch(&held(ButtonFlags::NONE), &carried);
        assert!(lifting.button_released.contains(ButtonFlags::TOUCH));
        assert!(lifting.button_state.contains(ButtonFlags::TOUCH_WAS_SWIPE));

        // Frame N+3: marker finally releases.
        let done = InputSnapshot::latch(&held(ButtonFlags::NONE), &lifting);
        assert!(done.button_released.contains(ButtonFlags::TOUCH_WAS_SWIPE));
        assert!(!done.button_state.contains(ButtonFlags::TOUCH_WAS_SWIPE));
    }

    #[test]
    fn flag_set_operations() {
        let set = ButtonFlags::A | ButtonFlags::TOUCH;
        assert!(set.contains(ButtonFlags::A));
        assert!(set.intersects(ButtonFlags::TOUCH | ButtonFlags::B));
        assert!(!set.contains(ButtonFlags::A | ButtonFlags::B));

        let mut set = set;
        set.remove(ButtonFlags::A);
        assert!(!set.intersects(ButtonFlags::A));
        assert!(set.contains(ButtonFlags::TOUCH));
    }
}
