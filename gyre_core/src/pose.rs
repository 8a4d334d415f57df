// Copyright 2026 the Gyre Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Minimal quaternion/vector math and the predicted head-pose sample.
//!
//! [`PredictedPose`] is the unit of data handed from sensor fusion to the
//! frame scheduler and on to the compositor: an orientation extrapolated
//! forward to the expected display instant, plus the angular and linear
//! velocities the extrapolation was based on.
//!
//! [`Quat`] and [`Vec3`] cover only what the pipeline needs (construction,
//! normalization, finiteness checks) without pulling in a linear-algebra
//! crate.

use core::fmt;
#[cfg(not(feature = "std"))]
use kurbo::common::FloatFuncs as _;

/// A 3-component `f32` vector.
#[derive(Clone, Copy, Debug, PartialEq, Default)]
pub struct Vec3 {
    /// X component.
    pub x: f32,
    /// Y component.
    pub y: f32,
    /// Z component.
    pub z: f32,
}

impl Vec3 {
    /// The zero vector.
    pub const ZERO: Self = Self {
        x: 0.0,
        y: 0.0,
        z: 0.0,
    };

    /// Creates a vector from components.
    #[inline]
    #[must_use]
    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    /// Returns the Euclidean length.
    #[inline]
    #[must_use]
    pub fn length(self) -> f32 {
        (self.x * self.x + self.y * self.y + self.z * self.z).sqrt()
    }
}

/// A rotation quaternion `(x, y, z, w)`.
///
/// Orientations handed to the display subsystem must be unit-length;
/// [`normalized`](Self::normalized) re-establishes that invariant after
/// accumulation error.
#[derive(Clone, Copy, PartialEq)]
pub struct Quat {
    /// X (i) component.
    pub x: f32,
    /// Y (j) component.
    pub y: f32,
    /// Z (k) component.
    pub z: f32,
    /// Scalar component.
    pub w: f32,
}

impl Quat {
    /// The identity rotation.
    pub const IDENTITY: Self = Self {
        x: 0.0,
        y: 0.0,
        z: 0.0,
        w: 1.0,
    };

    /// Creates a quaternion from components.
    #[inline]
    #[must_use]
    pub const fn new(x: f32, y: f32, z: f32, w: f32) -> Self {
        Self { x, y, z, w }
    }

    /// Creates a rotation of `angle_radians` around the given axis.
    ///
    /// The axis does not need to be unit length; a zero axis yields the
    /// identity rotation.
    #[must_use]
    pub fn from_axis_angle(axis: Vec3, angle_radians: f32) -> Self {
        let len = axis.length();
        if len <= f32::EPSILON {
            return Self::IDENTITY;
        }
        let half = 0.5 * angle_radians;
        #[cfg(feature = "std")]
        let (s, c) = half.sin_cos();
        #[cfg(not(feature = "std"))]
        let (s, c) = (half.sin(), half.cos());
        let k = s / len;
        Self {
            x: axis.x * k,
            y: axis.y * k,
            z: axis.z * k,
            w: c,
        }
    }

    /// Returns the quaternion's length.
    #[inline]
    #[must_use]
    pub fn length(self) -> f32 {
        (self.x * self.x + self.y * self.y + self.z * self.z + self.w * self.w).sqrt()
    }

    /// Returns a unit-length copy.
    ///
    /// A degenerate (near-zero) quaternion normalizes to the identity rather
    /// than producing NaNs.
    #[must_use]
    pub fn normalized(self) -> Self {
        let len = self.length();
        if len <= f32::EPSILON {
            return Self::IDENTITY;
        }
        let inv = 1.0 / len;
        Self {
            x: self.x * inv,
            y: self.y * inv,
            z: self.z * inv,
            w: self.w * inv,
        }
    }

    /// Whether this quaternion is unit length within `eps`.
    #[inline]
    #[must_use]
    pub fn is_normalized(self, eps: f32) -> bool {
        (self.length() - 1.0).abs() <= eps
    }
}

impl fmt::Debug for Quat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Quat({}, {}, {}, {})", self.x, self.y, self.z, self.w)
    }
}

/// A head-pose sample extrapolated to a requested future timestamp.
///
/// Produced by a pose source (sensor fusion) on demand, immutable once
/// returned, and consumed read-only by the scheduler and compositor.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PredictedPose {
    /// Head orientation. Always unit length.
    pub orientation: Quat,
    /// Angular velocity in radians per second, body frame.
    pub angular_velocity: Vec3,
    /// Linear velocity in meters per second.
    pub linear_velocity: Vec3,
    /// The timestamp the sample was extrapolated to, in seconds.
    pub timestamp_seconds: f64,
}

impl PredictedPose {
    /// An at-rest identity pose for the given timestamp.
    ///
    /// Used before the first sensor sample arrives and by test doubles.
    #[inline]
    #[must_use]
    pub const fn identity_at(timestamp_seconds: f64) -> Self {
        Self {
            orientation: Quat::IDENTITY,
            angular_velocity: Vec3::ZERO,
            linear_velocity: Vec3::ZERO,
            timestamp_seconds,
        }
    }
}

impl Default for PredictedPose {
    /// An identity pose at timestamp zero.
    fn default() -> Self {
        Self::identity_at(0.0)
    }
}
