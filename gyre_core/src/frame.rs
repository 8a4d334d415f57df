// Copyright 2026 the Gyre Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Per-iteration frame state and pacing.
//!
//! [`FramePacer`] owns the scheduler's clock arithmetic: clamping the
//! frame-to-frame delta, choosing the pose-prediction horizon, and keeping
//! the once-a-second frame-count window. [`FrameState`] is the immutable
//! product of one scheduler iteration and the previous-frame reference for
//! the next iteration's edge detection.
//!
//! The prediction horizon is twice the last frame delta: when frame time
//! grows, the pose is predicted further ahead, which shrinks the correction
//! the time-warp pass must perform at display time. Both the delta and the
//! horizon are clamped to [`MAX_DELTA_SECONDS`] so a debugger stop or a
//! scheduler hiccup cannot inject a huge simulation step.

#[cfg(not(feature = "std"))]
use kurbo::common::FloatFuncs as _;

use crate::input::InputSnapshot;
use crate::pose::PredictedPose;

/// Upper clamp for the frame delta and the prediction horizon, in seconds.
pub const MAX_DELTA_SECONDS: f64 = 0.1;

/// The immutable product of one scheduler iteration.
#[derive(Clone, Copy, Debug, Default)]
pub struct FrameState {
    /// Monotonically increasing frame counter.
    pub frame_id: u64,
    /// Clamped seconds since the previous frame, in `[0, 0.1]`.
    pub delta_seconds: f32,
    /// Head pose predicted to the expected display instant.
    pub pose: PredictedPose,
    /// This frame's input view.
    pub input: InputSnapshot,
}

/// Timing values for one frame, produced by [`FramePacer::begin_frame`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FrameTiming {
    /// The wall-clock sample the frame started from, in seconds.
    pub now_seconds: f64,
    /// Clamped delta since the previous frame.
    pub delta_seconds: f32,
    /// The timestamp pose prediction should target, in seconds.
    pub predict_seconds: f64,
}

/// Frame-rate report for one whole second of wall-clock time.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FrameRateReport {
    /// Frames completed during the elapsed second.
    pub frames: u32,
}

/// Clock arithmetic for the render loop.
#[derive(Clone, Copy, Debug)]
pub struct FramePacer {
    previous_seconds: Option<f64>,
    last_report_second: f64,
    frames_since_report: u32,
}

impl FramePacer {
    /// Creates a pacer; `start_seconds` anchors the report window.
    #[must_use]
    pub fn new(start_seconds: f64) -> Self {
        Self {
            previous_seconds: None,
            last_report_second: start_seconds.floor(),
            frames_since_report: 0,
        }
    }

    /// Starts a frame at `now_seconds`, returning the clamped delta and the
    /// pose-prediction target.
    ///
    /// The first frame (and any backwards clock step) reports a delta of
    /// zero rather than something enormous.
    #[expect(
        clippy::cast_possible_truncation,
        reason = "the delta is clamped to 0.1 before narrowing to f32"
    )]
    pub fn begin_frame(&mut self, now_seconds: f64) -> FrameTiming {
        let raw_delta = match self.previous_seconds {
            Some(previous) => now_seconds - previous,
            None => 0.0,
        };
        self.previous_seconds = Some(now_seconds);

        let delta = raw_delta.clamp(0.0, MAX_DELTA_SECONDS);
        let horizon = (2.0 * delta).clamp(0.0, MAX_DELTA_SECONDS);

        FrameTiming {
            now_seconds,
            delta_seconds: delta as f32,
            predict_seconds: now_seconds + horizon,
        }
    }

    /// Ends a frame; returns a report when a whole second has elapsed.
    pub fn end_frame(&mut self, now_seconds: f64) -> Option<FrameRateReport> {
        self.frames_since_report += 1;
        let whole_second = now_seconds.floor();
        if whole_second > self.last_report_second {
            let report = FrameRateReport {
                frames: self.frames_since_report,
            };
            self.last_report_second = whole_second;
            self.frames_since_report = 0;
            return Some(report);
        }
        None
    }
}
