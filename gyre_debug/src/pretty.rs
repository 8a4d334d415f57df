// Copyright 2026 the Gyre Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Human-readable trace output.
//!
//! [`PrettyPrintSink`] implements [`TraceSink`] and writes one line per
//! event to a [`Write`](std::io::Write) destination (default: stderr).
//! Timestamps are converted to microseconds using a [`Timebase`].

use std::io::Write;

use gyre_core::time::{HostTime, Timebase};
use gyre_core::trace::{
    CommandEvent, FrameBeginEvent, FrameDropEvent, FrameRateEvent, GestureEvent, SubmitEvent,
    TraceSink,
};

/// Writes human-readable trace lines to a [`Write`](std::io::Write)
/// destination.
pub struct PrettyPrintSink<W: Write = Box<dyn Write>> {
    writer: W,
    timebase: Timebase,
}

impl<W: Write> std::fmt::Debug for PrettyPrintSink<W> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PrettyPrintSink")
            .field("timebase", &self.timebase)
            .finish_non_exhaustive()
    }
}

impl PrettyPrintSink {
    /// Creates a sink that writes to stderr.
    #[must_use]
    pub fn stderr(timebase: Timebase) -> Self {
        Self {
            writer: Box::new(std::io::stderr()),
            timebase,
        }
    }
}

impl<W: Write> PrettyPrintSink<W> {
    /// Creates a sink that writes to the given destination.
    #[must_use]
    pub fn with_writer(writer: W, timebase: Timebase) -> Self {
        Self { writer, timebase }
    }

    #[expect(
        clippy::cast_precision_loss,
        reason = "microsecond display values only need a few significant digits"
    )]
    fn host_us(&self, t: HostTime) -> f64 {
        self.timebase.ticks_to_nanos(t.ticks()) as f64 / 1000.0
    }
}

impl<W: Write> TraceSink for PrettyPrintSink<W> {
    fn on_command(&mut self, e: &CommandEvent) {
        let _ = writeln!(
            self.writer,
            "[cmd] {} at={:.1}µs",
            e.name,
            self.host_us(e.drained_at)
        );
    }

    fn on_frame_begin(&mut self, e: &FrameBeginEvent) {
        let _ = writeln!(
            self.writer,
            "[frame] id={} now={:.1}µs delta={:.4}s predict={:.4}s",
            e.frame_id,
            self.host_us(e.now),
            e.delta_seconds,
            e.predict_seconds
        );
    }

    fn on_gesture(&mut self, e: &GestureEvent) {
        let _ = writeln!(
            self.writer,
            "[gesture] frame={} bits={:?}",
            e.frame_id, e.synthesized
        );
    }

    fn on_submit(&mut self, e: &SubmitEvent) {
        let _ = writeln!(
            self.writer,
            "[submit] frame={} at={:.1}µs kind={:?}",
            e.frame_id,
            self.host_us(e.submitted_at),
            e.kind
        );
    }

    fn on_frame_drop(&mut self, e: &FrameDropEvent) {
        let _ = writeln!(
            self.writer,
            "[drop] frame={} reason={:?}",
            e.frame_id, e.reason
        );
    }

    fn on_frame_rate(&mut self, e: &FrameRateEvent) {
        let _ = writeln!(self.writer, "[rate] {} fps", e.frames);
    }
}
