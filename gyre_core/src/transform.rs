// Copyright 2026 the Gyre Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Minimal column-major 4×4 matrix and tan-angle transform construction.
//!
//! This type covers the subset of 4×4 matrix operations the frame pipeline
//! actually needs (identity, multiply, column access, tan-angle construction)
//! without pulling in a full linear-algebra crate.
//!
//! A *tan-angle transform* maps a direction expressed in
//! tangent-of-view-angle space to texture coordinates. Both the eye
//! projection and the lens distortion compose as angle-space operations, so
//! the display subsystem consumes this matrix directly when re-projecting an
//! eye image at warp time.

use core::ops::Mul;
#[cfg(not(feature = "std"))]
use kurbo::common::FloatFuncs as _;

/// A column-major 4×4 matrix stored as `[[f32; 4]; 4]`.
///
/// Each inner array is one *column* of the matrix, matching the memory layout
/// used by GPU APIs.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Matrix4 {
    /// Four columns, each a 4-element array `[x, y, z, w]`.
    pub cols: [[f32; 4]; 4],
}

impl Matrix4 {
    /// The 4×4 identity matrix.
    pub const IDENTITY: Self = Self {
        cols: [
            [1.0, 0.0, 0.0, 0.0],
            [0.0, 1.0, 0.0, 0.0],
            [0.0, 0.0, 1.0, 0.0],
            [0.0, 0.0, 0.0, 1.0],
        ],
    };

    /// Creates a matrix from a column-major 2-D array.
    #[inline]
    #[must_use]
    pub const fn from_cols_array_2d(cols: [[f32; 4]; 4]) -> Self {
        Self { cols }
    }

    /// Returns column `i` (0-based).
    ///
    /// # Panics
    ///
    /// Panics if `i >= 4`.
    #[inline]
    #[must_use]
    pub const fn col(self, i: usize) -> [f32; 4] {
        self.cols[i]
    }

    /// Creates the tan-angle transform for a symmetric field of view.
    ///
    /// Maps a tan-angle direction to 0–1 texture coordinates:
    /// `u = 0.5/tan(fov/2) · x/(-z) + 0.5`, and likewise for `v`. The third
    /// and fourth rows carry `-z` through so projective division recovers the
    /// perspective-correct coordinate.
    #[must_use]
    pub fn tan_angle_from_fov(fov_degrees: f32) -> Self {
        let half = 0.5 * fov_degrees * (core::f32::consts::PI / 180.0);
        let tan_half_fov = half.sin() / half.cos();
        let s = 0.5 / tan_half_fov;
        // Rows (s, 0, -0.5, 0), (0, s, -0.5, 0), (0, 0, -1, 0), (0, 0, -1, 0)
        // written out as columns.
        Self {
            cols: [
                [s, 0.0, 0.0, 0.0],
                [0.0, s, 0.0, 0.0],
                [-0.5, -0.5, -1.0, -1.0],
                [0.0, 0.0, 0.0, 0.0],
            ],
        }
    }

    /// Is every element of this matrix [finite]?
    ///
    /// [finite]: f32::is_finite
    #[inline]
    #[must_use]
    pub fn is_finite(&self) -> bool {
        self.cols
            .iter()
            .all(|col| col.iter().all(|v| v.is_finite()))
    }
}

impl Default for Matrix4 {
    #[inline]
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Mul for Matrix4 {
    type Output = Self;

    #[inline]
    fn mul(self, rhs: Self) -> Self {
        let a = &self.cols;
        let b = &rhs.cols;
        let mut out = [[0.0_f32; 4]; 4];
        let mut j = 0;
        while j < 4 {
            let mut i = 0;
            while i < 4 {
                out[j][i] =
                    a[0][i] * b[j][0] + a[1][i] * b[j][1] + a[2][i] * b[j][2] + a[3][i] * b[j][3];
                i += 1;
            }
            j += 1;
        }
        Self { cols: out }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_identity() {
        assert_eq!(Matrix4::default(), Matrix4::IDENTITY);
    }

    #[test]
    fn identity_multiply() {
        let t = Matrix4::tan_angle_from_fov(90.0);
        assert_eq!(Matrix4::IDENTITY * t, t);
        assert_eq!(t * Matrix4::IDENTITY, t);
    }

    #[test]
    fn tan_angle_ninety_degrees() {
        // tan(45°) = 1, so the diagonal scale is exactly 0.5.
        let m = Matrix4::tan_angle_from_fov(90.0);
        let eps = 1e-6;
        assert!((m.col(0)[0] - 0.5).abs() < eps);
        assert!((m.col(1)[1] - 0.5).abs() < eps);
        assert_eq!(m.col(2), [-0.5, -0.5, -1.0, -1.0]);
        assert_eq!(m.col(3), [0.0, 0.0, 0.0, 0.0]);
    }

    #[test]
    fn tan_angle_maps_view_center_to_texture_center() {
        let m = Matrix4::tan_angle_from_fov(90.0);
        // A straight-ahead direction in tan-angle space: (0, 0, -1).
        let dir = [0.0_f32, 0.0, -1.0, 1.0];
        let mut out = [0.0_f32; 4];
        for (i, o) in out.iter_mut().enumerate() {
            *o = m.cols[0][i] * dir[0]
                + m.cols[1][i] * dir[1]
                + m.cols[2][i] * dir[2]
                + m.cols[3][i] * dir[3];
        }
        // After projective division by w = 1 (from -z), the center lands at
        // (0.5, 0.5).
        assert!((out[0] / out[3] - 0.5).abs() < 1e-6);
        assert!((out[1] / out[3] - 0.5).abs() < 1e-6);
    }

    #[test]
    fn wider_fov_shrinks_scale() {
        let narrow = Matrix4::tan_angle_from_fov(90.0);
        let wide = Matrix4::tan_angle_from_fov(100.0);
        assert!(
            wide.col(0)[0] < narrow.col(0)[0],
            "wider fov must map the same angle nearer the texture center"
        );
    }

    #[test]
    fn finite_detection() {
        assert!(Matrix4::IDENTITY.is_finite());
        let mut m = Matrix4::IDENTITY;
        m.cols[2][1] = f32::NAN;
        assert!(!m.is_finite());
    }
}
