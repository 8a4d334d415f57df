// Copyright 2026 the Gyre Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Distortion-mesh construction.
//!
//! [`build_mesh`] converts a [`DeviceOpticalProfile`] into a tessellated
//! correction mesh the display pass draws to undo lens distortion. Each
//! vertex carries three texture-coordinate pairs, one per color channel, so
//! chromatic aberration is corrected in the same draw.
//!
//! The mesh is built once per device profile at startup and cached for the
//! session; it depends on nothing but the profile and the tessellation
//! parameters.
//!
//! # Geometry
//!
//! Vertex positions are normalized device coordinates covering both eyes
//! side by side (left eye x ∈ \[-1, 0\], right eye x ∈ \[0, 1\]). Texture
//! coordinates are produced by pushing each vertex through the physical
//! chain *screen position → meters → tangent angle*, evaluating the radial
//! correction at `r² = θx² + θy²`, and scaling the tangent-angle pair per
//! channel.
//!
//! # Ordering
//!
//! Triangles are emitted in display scan order (per slice, column-outer),
//! not row-major order: the physical display scans out in portrait columns,
//! and slice-by-slice low-latency submission (`num_slices > 1`) draws
//! partial meshes in exactly the order the scanline consumes them. Within
//! each quad the diagonal flips by screen quadrant
//! (`(col < half) XOR (row < half)`) so no single seam direction dominates
//! the mesh.

use alloc::vec;
use alloc::vec::Vec;

use bytemuck::{Pod, Zeroable};
#[cfg(not(feature = "std"))]
use kurbo::common::FloatFuncs as _;

use crate::profile::DeviceOpticalProfile;

/// Tan-angle half-height of the cursor-only region (≈1°).
const CURSOR_TAN_HALF_HEIGHT: f32 = 0.017;

/// Tan-angle half-width of the cursor-only region (≈4°).
const CURSOR_TAN_HALF_WIDTH: f32 = 0.070;

/// One distortion-mesh vertex, laid out for direct GPU upload.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct DistortionVertex {
    /// Position in normalized device coordinates, both eyes side by side.
    pub ndc: [f32; 2],
    /// Red-channel texture coordinates, in tan-angle space.
    pub red_uv: [f32; 2],
    /// Green-channel texture coordinates, in tan-angle space.
    pub green_uv: [f32; 2],
    /// Blue-channel texture coordinates, in tan-angle space.
    pub blue_uv: [f32; 2],
    /// Multiplier for slice-edge fading; 1.0 in the interior.
    pub slice_fade: f32,
}

/// A GPU-ready correction mesh for both eyes.
#[derive(Clone, Debug, Default)]
pub struct DistortionMesh {
    /// Vertex data, grouped per eye and per slice.
    pub vertices: Vec<DistortionVertex>,
    /// Triangle list indices into [`Self::vertices`], in scan order.
    pub indices: Vec<u16>,
}

impl DistortionMesh {
    /// Number of vertices.
    #[must_use]
    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    /// Number of indices.
    #[must_use]
    pub fn index_count(&self) -> usize {
        self.indices.len()
    }

    /// Whether the mesh draws nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }
}

/// Converts a normalized eye-buffer position into three per-channel
/// tan-angle texture coordinate pairs.
fn warp_tex_coord_chroma(profile: &DeviceOpticalProfile, unit: [f32; 2]) -> [[f32; 2]; 3] {
    let screen = &profile.screen;
    let mut theta = [0.0_f32; 2];
    for (axis, t) in theta.iter_mut().enumerate() {
        let ndc = 2.0 * (unit[axis] - 0.5);
        #[expect(
            clippy::cast_precision_loss,
            reason = "screen dimensions are a few thousand pixels"
        )]
        let pixels = ndc * screen.height_pixels as f32 * 0.5;
        #[expect(
            clippy::cast_precision_loss,
            reason = "screen dimensions are a few thousand pixels"
        )]
        let meters = pixels * screen.width_meters / screen.width_pixels as f32;
        *t = meters / profile.lens.meters_per_tan_angle;
    }

    let rsq = theta[0] * theta[0] + theta[1] * theta[1];
    let chroma = profile.lens.chroma_scale_at(rsq);

    [
        [chroma[0] * theta[0], chroma[0] * theta[1]],
        [chroma[1] * theta[0], chroma[1] * theta[1]],
        [chroma[2] * theta[0], chroma[2] * theta[1]],
    ]
}

/// Whether a red-channel tan-angle vector lands inside the cursor region.
fn hits_cursor(uv: [f32; 2]) -> bool {
    uv[1].abs() <= CURSOR_TAN_HALF_HEIGHT && uv[0].abs() <= CURSOR_TAN_HALF_WIDTH
}

/// Computes the per-channel warp grid for both eyes at `(tess_x + 1) × 2`
/// columns by `(tess_y + 1)` rows.
fn warp_grid(
    profile: &DeviceOpticalProfile,
    tess_x: usize,
    tess_y: usize,
) -> Vec<[[f32; 2]; 3]> {
    let screen = &profile.screen;
    #[expect(
        clippy::cast_precision_loss,
        reason = "screen dimensions are a few thousand pixels"
    )]
    let aspect = screen.width_pixels as f32 * 0.5 / screen.height_pixels as f32;

    let half_offset = screen.lens_separation_meters / 2.0 - screen.width_meters / 4.0;
    let shift_left_meters = -half_offset + screen.horizontal_offset_meters;
    let shift_right_meters = half_offset + screen.horizontal_offset_meters;
    let shift_view_left = 2.0 * aspect * shift_left_meters / screen.width_meters;
    let shift_view_right = 2.0 * aspect * shift_right_meters / screen.width_meters;

    let columns = (tess_x + 1) * 2;
    let mut grid = vec![[[0.0_f32; 2]; 3]; columns * (tess_y + 1)];

    #[expect(
        clippy::cast_precision_loss,
        reason = "tessellation counts are small"
    )]
    for eye in 0..2 {
        let shift = if eye == 1 {
            shift_view_left
        } else {
            shift_view_right
        };
        for y in 0..=tess_y {
            let yf = y as f32 / tess_y as f32;
            for x in 0..=tess_x {
                let xf = x as f32 / tess_x as f32;
                let unit = [shift + xf * aspect + (1.0 - aspect) * 0.5, yf];
                grid[y * columns + eye * (tess_x + 1) + x] =
                    warp_tex_coord_chroma(profile, unit);
            }
        }
    }
    grid
}

/// Builds the correction mesh for a device profile.
///
/// `tess_x` and `tess_y` are quads per eye along each axis; `num_slices`
/// splits each eye into vertical slices for low-latency partial submission
/// and must divide `tess_x`. With `cursor_only`, quads entirely outside the
/// small status-cursor region around the eye center are dropped, producing
/// a mesh cheap enough to redraw for a cursor update alone.
///
/// Degenerate tessellations (`tess_x < 1`, `tess_y < 1`, or more slices
/// than columns) return an empty mesh, never panic.
///
/// # Panics
///
/// Panics if the tessellation needs more than 16-bit indices (far beyond
/// any sensible display mesh).
#[must_use]
pub fn build_mesh(
    profile: &DeviceOpticalProfile,
    tess_x: usize,
    tess_y: usize,
    num_slices: usize,
    cursor_only: bool,
) -> DistortionMesh {
    if tess_x < 1 || tess_y < 1 {
        return DistortionMesh::default();
    }
    let num_slices = num_slices.max(1);
    let slice_tess = tess_x / num_slices;
    if slice_tess < 1 {
        return DistortionMesh::default();
    }

    let columns = (tess_x + 1) * 2;
    let grid = warp_grid(profile, tess_x, tess_y);

    // Identify which grid vertices fall inside the cursor region.
    let in_cursor: Option<Vec<bool>> = cursor_only.then(|| {
        grid.iter().map(|channels| hits_cursor(channels[0])).collect()
    });

    let vertex_count = 2 * num_slices * (slice_tess + 1) * (tess_y + 1);
    assert!(
        vertex_count <= usize::from(u16::MAX) + 1,
        "tessellation too fine for 16-bit indices"
    );
    let mut vertices = Vec::with_capacity(vertex_count);
    let mut indices = Vec::with_capacity(2 * tess_x * tess_y * 6);

    for eye in 0..2 {
        for slice in 0..num_slices {
            let vert_base = vertices.len();

            #[expect(
                clippy::cast_precision_loss,
                reason = "tessellation counts are small"
            )]
            for y in 0..=tess_y {
                let yf = y as f32 / tess_y as f32;
                for x in 0..=slice_tess {
                    let sx = slice * slice_tess + x;
                    let xf = sx as f32 / tess_x as f32;
                    let channels = grid[y * columns + eye * (tess_x + 1) + sx];
                    // Edge fading is handled by the vignette pass, so the
                    // whole mesh keeps full weight.
                    vertices.push(DistortionVertex {
                        ndc: [-1.0 + eye as f32 + xf, yf * 2.0 - 1.0],
                        red_uv: channels[0],
                        green_uv: channels[1],
                        blue_uv: channels[2],
                        slice_fade: 1.0,
                    });
                }
            }

            // Quads in scan order: column-outer, matching portrait scan-out.
            for x in 0..slice_tess {
                for y in 0..tess_y {
                    if let Some(mask) = &in_cursor {
                        // Skip this quad if none of its corners are in the
                        // cursor region.
                        let xx = x + eye * (tess_x + 1) + slice * slice_tess;
                        if !mask[y * columns + xx]
                            && !mask[y * columns + xx + 1]
                            && !mask[(y + 1) * columns + xx]
                            && !mask[(y + 1) * columns + xx + 1]
                        {
                            continue;
                        }
                    }

                    let corner = |row: usize, col: usize| -> u16 {
                        #[expect(
                            clippy::cast_possible_truncation,
                            reason = "vertex_count is asserted to fit u16 above"
                        )]
                        let index = (vert_base + row * (slice_tess + 1) + col) as u16;
                        index
                    };
                    let v00 = corner(y, x);
                    let v10 = corner(y, x + 1);
                    let v01 = corner(y + 1, x);
                    let v11 = corner(y + 1, x + 1);

                    if (slice * slice_tess + x < tess_x / 2) ^ (y < tess_y / 2) {
                        indices.extend_from_slice(&[v00, v10, v11, v00, v11, v01]);
                    } else {
                        indices.extend_from_slice(&[v00, v10, v01, v01, v10, v11]);
                    }
                }
            }
        }
    }

    DistortionMesh { vertices, indices }
}
