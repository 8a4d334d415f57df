// Copyright 2026 the Gyre Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Composition request assembly.
//!
//! A [`CompositionRequest`] is the per-frame bundle handed to the display
//! subsystem for the final warp-and-present: for each eye, a texture, the
//! tan-angle transform that maps warped view directions into it, and the
//! pose the frame was rendered with. The display driver re-projects with
//! the *current* head pose at scan-out, so the closer the carried pose is
//! to reality, the smaller the correction.
//!
//! Requests are always built from [`CompositionRequest::init`] (or one of
//! the fallback constructors) rather than mutated incrementally, so no
//! per-layer state can leak from a previous frame into the next.

use core::fmt;

use crate::pose::PredictedPose;
use crate::transform::Matrix4;

/// Seconds before the ideal warp point at which the display pass should be
/// scheduled.
pub const PRE_SCHEDULE_SECONDS: f32 = 0.014;

/// A GPU texture handle, as understood by the display subsystem.
///
/// Texture 0 is replaced with solid black by the display pass.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct TextureId(pub u32);

impl fmt::Debug for TextureId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TextureId({})", self.0)
    }
}

/// Which display-pass program composes a layer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum LayerProgram {
    /// Plain distorted eye buffer.
    #[default]
    Simple,
    /// Spinning icon (or static message) over black, sized and rotated by
    /// [`CompositionRequest::program_params`].
    LoadingIcon,
}

/// Which mutually exclusive presentation mode produced a submission.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PresentationKind {
    /// Application eye buffers.
    Normal,
    /// Spinning loading icon before the first application frame is ready.
    LoadingIcon,
    /// Time-limited fatal-error message.
    ErrorMessage,
}

/// Per-eye composition record.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct EyeComposition {
    /// The eye buffer (or fallback icon) to sample.
    pub texture: TextureId,
    /// Maps tan-angle view directions to texture coordinates.
    pub tan_angle_transform: Matrix4,
    /// The pose this eye's content was rendered with.
    pub pose: PredictedPose,
    /// Program used to compose this eye.
    pub program: LayerProgram,
}

/// The full per-frame display submission.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CompositionRequest {
    /// Left and right eye records.
    pub eyes: [EyeComposition; 2],
    /// Program parameters: rotation in radians per second, and an icon
    /// size divisor relative to fullscreen.
    pub program_params: [f32; 2],
    /// How many display vsyncs each frame is held; 1 at native rate.
    pub min_vsyncs: u32,
    /// Scheduling lead time for the display pass, in seconds.
    pub pre_schedule_seconds: f32,
}

impl CompositionRequest {
    /// A fresh request with defaults: identity poses, black textures, the
    /// [`LayerProgram::Simple`] program, and a tan-angle transform for the
    /// given field of view.
    ///
    /// Every presentation mode starts from this and overrides what it
    /// needs, which is what guarantees stale per-layer state cannot carry
    /// over between frames.
    #[must_use]
    pub fn init(fov_degrees: f32) -> Self {
        let eye = EyeComposition {
            texture: TextureId(0),
            tan_angle_transform: Matrix4::tan_angle_from_fov(fov_degrees),
            pose: PredictedPose::identity_at(0.0),
            program: LayerProgram::Simple,
        };
        Self {
            eyes: [eye, eye],
            program_params: [0.0, 0.0],
            min_vsyncs: 1,
            pre_schedule_seconds: PRE_SCHEDULE_SECONDS,
        }
    }

    /// A request showing the spinning loading icon instead of eye content.
    #[must_use]
    pub fn loading_icon(fov_degrees: f32, icon: TextureId) -> Self {
        let mut request = Self::init(fov_degrees);
        for eye in &mut request.eyes {
            eye.texture = icon;
            eye.program = LayerProgram::LoadingIcon;
        }
        // One radian per second, 1/16th of the screen.
        request.program_params = [1.0, 16.0];
        request
    }

    /// A request showing a static fullscreen-relative message texture.
    ///
    /// `size_factor` scales the message relative to fullscreen; callers
    /// typically pass `1024 / texture_size`.
    #[must_use]
    pub fn error_message(fov_degrees: f32, message: TextureId, size_factor: f32) -> Self {
        let mut request = Self::init(fov_degrees);
        for eye in &mut request.eyes {
            eye.texture = message;
            eye.program = LayerProgram::LoadingIcon;
        }
        request.program_params = [0.0, size_factor];
        request
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn init_is_fully_defaulted() {
        let request = CompositionRequest::init(90.0);
        for eye in &request.eyes {
            assert_eq!(eye.texture, TextureId(0));
            assert_eq!(eye.program, LayerProgram::Simple);
            assert_eq!(eye.pose.orientation, crate::pose::Quat::IDENTITY);
        }
        assert_eq!(request.min_vsyncs, 1);
        assert_eq!(request.pre_schedule_seconds, PRE_SCHEDULE_SECONDS);
        assert_eq!(request.program_params, [0.0, 0.0]);
    }

    #[test]
    fn init_discards_previous_state() {
        let mut request = CompositionRequest::init(90.0);
        request.eyes[1].texture = TextureId(42);
        request.program_params = [3.0, 4.0];
        request.min_vsyncs = 3;

        let fresh = CompositionRequest::init(90.0);
        assert_ne!(request, fresh);
        request = CompositionRequest::init(90.0);
        assert_eq!(request, fresh, "re-init must reset every field");
    }

    #[test]
    fn loading_icon_rotates() {
        let request = CompositionRequest::loading_icon(90.0, TextureId(7));
        assert_eq!(request.program_params[0], 1.0, "icon spins");
        assert_eq!(request.program_params[1], 16.0);
        for eye in &request.eyes {
            assert_eq!(eye.texture, TextureId(7));
            assert_eq!(eye.program, LayerProgram::LoadingIcon);
        }
    }

    #[test]
    fn error_message_is_static() {
        let request = CompositionRequest::error_message(90.0, TextureId(9), 2.0);
        assert_eq!(request.program_params, [0.0, 2.0], "messages do not spin");
        assert_eq!(request.eyes[0].texture, TextureId(9));
    }
}
