// Copyright 2026 the Gyre Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Chrome Trace Event Format exporter.
//!
//! [`export`] reads recorded bytes from a
//! [`RecorderSink`](super::recorder::RecorderSink) and writes
//! [Chrome Trace Event Format][spec] JSON to the given writer.
//!
//! [spec]: https://docs.google.com/document/d/1CvAClvFfyA5R-PhYUmn5OOQtYMH4h6I0nSsKchNAySU

use std::io::{self, Write};

use gyre_core::time::Timebase;
use serde_json::{Value, json};

use crate::recorder::{RecordedEvent, decode};

/// Exports recorded events as Chrome Trace Event Format JSON.
///
/// The output is a complete JSON array of trace event objects, suitable for
/// loading into `chrome://tracing` or [Perfetto](https://ui.perfetto.dev/).
///
/// Timestamps are converted to microseconds using the provided [`Timebase`].
pub fn export(bytes: &[u8], timebase: Timebase, writer: &mut dyn Write) -> io::Result<()> {
    let mut events: Vec<Value> = Vec::new();

    for recorded in decode(bytes) {
        match recorded {
            RecordedEvent::Command { name, drained_at } => {
                events.push(json!({
                    "ph": "i",
                    "name": "Command",
                    "cat": "Queue",
                    "ts": ticks_to_us(drained_at.ticks(), timebase),
                    "pid": 0,
                    "tid": 0,
                    "s": "t",
                    "args": {
                        "command": name,
                    }
                }));
            }
            RecordedEvent::FrameBegin(e) => {
                events.push(json!({
                    "ph": "i",
                    "name": "FrameBegin",
                    "cat": "Scheduler",
                    "ts": ticks_to_us(e.now.ticks(), timebase),
                    "pid": 0,
                    "tid": 0,
                    "s": "g",
                    "args": {
                        "frame_id": e.frame_id,
                        "delta_seconds": e.delta_seconds,
                        "predict_seconds": e.predict_seconds,
                    }
                }));
            }
            RecordedEvent::Gesture(e) => {
                events.push(json!({
                    "ph": "i",
                    "name": "Gesture",
                    "cat": "Input",
                    "ts": 0,
                    "pid": 0,
                    "tid": 0,
                    "s": "t",
                    "args": {
                        "frame_id": e.frame_id,
                        "bits": format!("{:?}", e.synthesized),
                    }
                }));
            }
            RecordedEvent::Submit(e) => {
                events.push(json!({
                    "ph": "i",
                    "name": "Submit",
                    "cat": "Compositor",
                    "ts": ticks_to_us(e.submitted_at.ticks(), timebase),
                    "pid": 0,
                    "tid": 0,
                    "s": "t",
                    "args": {
                        "frame_id": e.frame_id,
                        "kind": format!("{:?}", e.kind),
                    }
                }));
            }
            RecordedEvent::FrameDrop(e) => {
                events.push(json!({
                    "ph": "i",
                    "name": "FrameDrop",
                    "cat": "Compositor",
                    "ts": 0,
                    "pid": 0,
                    "tid": 0,
                    "s": "p",
                    "args": {
                        "frame_id": e.frame_id,
                        "reason": format!("{:?}", e.reason),
                    }
                }));
            }
            RecordedEvent::FrameRate(e) => {
                events.push(json!({
                    "ph": "C",
                    "name": "FrameRate",
                    "cat": "Scheduler",
                    "ts": 0,
                    "pid": 0,
                    "tid": 0,
                    "args": {
                        "fps": e.frames,
                    }
                }));
            }
        }
    }

    serde_json::to_writer_pretty(writer, &events)?;
    Ok(())
}

#[expect(
    clippy::cast_precision_loss,
    reason = "microsecond display values only need a few significant digits"
)]
fn ticks_to_us(ticks: u64, timebase: Timebase) -> f64 {
    timebase.ticks_to_nanos(ticks) as f64 / 1000.0
}

#[cfg(test)]
mod tests {
    use gyre_core::time::HostTime;
    use gyre_core::trace::{CommandEvent, FrameBeginEvent, SubmitEvent, TraceSink};
    use gyre_core::warp::PresentationKind;

    use super::*;
    use crate::recorder::RecorderSink;

    #[test]
    fn export_produces_valid_json() {
        let mut rec = RecorderSink::new();
        rec.on_command(&CommandEvent {
            name: "resume",
            drained_at: HostTime(500_000),
        });
        rec.on_frame_begin(&FrameBeginEvent {
            frame_id: 1,
            now: HostTime(1_000_000),
            delta_seconds: 0.016,
            predict_seconds: 0.032,
        });
        rec.on_submit(&SubmitEvent {
            frame_id: 1,
            submitted_at: HostTime(2_000_000),
            kind: PresentationKind::Normal,
        });

        let mut out = Vec::new();
        export(rec.as_bytes(), Timebase::NANOS, &mut out).unwrap();
        let json_str = String::from_utf8(out).unwrap();

        // Should parse as a JSON array.
        let parsed: Vec<Value> = serde_json::from_str(&json_str).unwrap();
        assert_eq!(parsed.len(), 3);

        assert_eq!(parsed[0]["name"], "Command");
        assert_eq!(parsed[0]["args"]["command"], "resume");
        assert_eq!(parsed[1]["name"], "FrameBegin");
        assert_eq!(parsed[2]["name"], "Submit");
        assert_eq!(parsed[2]["args"]["kind"], "Normal");
    }

    #[test]
    fn export_empty_recording() {
        let mut out = Vec::new();
        export(&[], Timebase::NANOS, &mut out).unwrap();
        let json_str = String::from_utf8(out).unwrap();
        let parsed: Vec<Value> = serde_json::from_str(&json_str).unwrap();
        assert!(parsed.is_empty());
    }
}
