// Copyright 2026 the Gyre Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Tracing and diagnostics for the frame loop.
//!
//! This module provides a [`TraceSink`] trait with per-event methods that
//! frame-loop instrumentation calls at each stage. All method bodies default
//! to no-ops, so implementing only the events you care about is fine.
//!
//! [`Tracer`] wraps an optional `&mut dyn TraceSink`. When the `trace`
//! feature is **off**, every `Tracer` method compiles to nothing (zero
//! overhead). When **on**, each method performs a single `Option` branch
//! before dispatching.
//!
//! # Crate features
//!
//! - `trace` — enables the `Tracer` method bodies (one branch per call).

use crate::input::ButtonFlags;
use crate::time::HostTime;
use crate::warp::PresentationKind;

// ---------------------------------------------------------------------------
// Event structs
// ---------------------------------------------------------------------------

/// Emitted for each command drained from the queue.
#[derive(Clone, Copy, Debug)]
pub struct CommandEvent {
    /// Wire name of the command.
    pub name: &'static str,
    /// Host time when the command was drained.
    pub drained_at: HostTime,
}

/// Emitted at the start of each frame, after the queue drain.
#[derive(Clone, Copy, Debug)]
pub struct FrameBeginEvent {
    /// Monotonic frame counter.
    pub frame_id: u64,
    /// Host time the frame started from.
    pub now: HostTime,
    /// Clamped delta since the previous frame, in seconds.
    pub delta_seconds: f32,
    /// The timestamp pose prediction targeted, in seconds.
    pub predict_seconds: f64,
}

/// Emitted when the gesture recognizer synthesizes button bits.
#[derive(Clone, Copy, Debug)]
pub struct GestureEvent {
    /// Frame counter.
    pub frame_id: u64,
    /// The synthesized bits (taps and swipes).
    pub synthesized: ButtonFlags,
}

/// Emitted when a composition request is handed to the display driver.
#[derive(Clone, Copy, Debug)]
pub struct SubmitEvent {
    /// Frame counter.
    pub frame_id: u64,
    /// Host time of submission.
    pub submitted_at: HostTime,
    /// Which presentation mode produced the request.
    pub kind: PresentationKind,
}

/// Why a frame was dropped instead of presented.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DropReason {
    /// The display driver rejected the submission.
    DriverRejected,
    /// Every composition slot was still awaiting driver confirmation.
    RingFull,
}

/// Emitted when a frame is dropped.
#[derive(Clone, Copy, Debug)]
pub struct FrameDropEvent {
    /// Frame counter.
    pub frame_id: u64,
    /// Why the frame was dropped.
    pub reason: DropReason,
}

/// Emitted once per wall-clock second with the completed frame count.
#[derive(Clone, Copy, Debug)]
pub struct FrameRateEvent {
    /// Frames completed during the elapsed second.
    pub frames: u32,
}

// ---------------------------------------------------------------------------
// TraceSink trait
// ---------------------------------------------------------------------------

/// Receives trace events from the frame loop.
///
/// All methods have default no-op implementations, so you only need to
/// override the events you care about.
pub trait TraceSink {
    /// Called for each command drained from the queue.
    fn on_command(&mut self, e: &CommandEvent) {
        _ = e;
    }

    /// Called at the start of each frame.
    fn on_frame_begin(&mut self, e: &FrameBeginEvent) {
        _ = e;
    }

    /// Called when gesture bits are synthesized.
    fn on_gesture(&mut self, e: &GestureEvent) {
        _ = e;
    }

    /// Called when a composition request is submitted.
    fn on_submit(&mut self, e: &SubmitEvent) {
        _ = e;
    }

    /// Called when a frame is dropped.
    fn on_frame_drop(&mut self, e: &FrameDropEvent) {
        _ = e;
    }

    /// Called once per wall-clock second.
    fn on_frame_rate(&mut self, e: &FrameRateEvent) {
        _ = e;
    }
}

/// A [`TraceSink`] that discards all events.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopSink;

impl TraceSink for NoopSink {}

// ---------------------------------------------------------------------------
// Tracer wrapper
// ---------------------------------------------------------------------------

/// Thin wrapper around an optional [`TraceSink`].
///
/// When the `trace` feature is **off**, every method compiles to nothing.
/// When **on**, each method checks the inner `Option` (one branch) before
/// dispatching to the sink.
pub struct Tracer<'a> {
    #[cfg(feature = "trace")]
    sink: Option<&'a mut dyn TraceSink>,
    #[cfg(not(feature = "trace"))]
    _marker: core::marker::PhantomData<&'a mut dyn TraceSink>,
}

impl core::fmt::Debug for Tracer<'_> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Tracer").finish_non_exhaustive()
    }
}

impl<'a> Tracer<'a> {
    /// Creates a tracer that dispatches to the given sink.
    #[inline]
    #[must_use]
    pub fn new(sink: &'a mut dyn TraceSink) -> Self {
        #[cfg(feature = "trace")]
        {
            Self { sink: Some(sink) }
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = sink;
            Self {
                _marker: core::marker::PhantomData,
            }
        }
    }

    /// Creates a tracer that discards all events.
    #[inline]
    #[must_use]
    pub fn none() -> Self {
        #[cfg(feature = "trace")]
        {
            Self { sink: None }
        }
        #[cfg(not(feature = "trace"))]
        {
            Self {
                _marker: core::marker::PhantomData,
            }
        }
    }

    /// Emits a [`CommandEvent`].
    #[inline]
    pub fn command(&mut self, e: &CommandEvent) {
        #[cfg(feature = "trace")]
        if let Some(s) = &mut self.sink {
            s.on_command(e);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = e;
        }
    }

    /// Emits a [`FrameBeginEvent`].
    #[inline]
    pub fn frame_begin(&mut self, e: &FrameBeginEvent) {
        #[cfg(feature = "trace")]
        if let Some(s) = &mut self.sink {
            s.on_frame_begin(e);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = e;
        }
    }

    /// Emits a [`GestureEvent`].
    #[inline]
    pub fn gesture(&mut self, e: &GestureEvent) {
        #[cfg(feature = "trace")]
        if let Some(s) = &mut self.sink {
            s.on_gesture(e);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = e;
        }
    }

    /// Emits a [`SubmitEvent`].
    #[inline]
    pub fn submit(&mut self, e: &SubmitEvent) {
        #[cfg(feature = "trace")]
        if let Some(s) = &mut self.sink {
            s.on_submit(e);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = e;
        }
    }

    /// Emits a [`FrameDropEvent`].
    #[inline]
    pub fn frame_drop(&mut self, e: &FrameDropEvent) {
        #[cfg(feature = "trace")]
        if let Some(s) = &mut self.sink {
            s.on_frame_drop(e);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = e;
        }
    }

    /// Emits a [`FrameRateEvent`].
    #[inline]
    pub fn frame_rate(&mut self, e: &FrameRateEvent) {
        #[cfg(feature = "trace")]
        if let Some(s) = &mut self.sink {
            s.on_frame_rate(e);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = e;
        }
    }
}
