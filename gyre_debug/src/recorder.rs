// Copyright 2026 the Gyre Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Compact binary event recording and decoding.
//!
//! [`RecorderSink`] implements [`TraceSink`] and encodes events into a
//! `Vec<u8>` as little-endian records. [`decode`] reads them back as an
//! iterator of [`RecordedEvent`].

use gyre_core::input::ButtonFlags;
use gyre_core::time::HostTime;
use gyre_core::trace::{
    CommandEvent, DropReason, FrameBeginEvent, FrameDropEvent, FrameRateEvent, GestureEvent,
    SubmitEvent, TraceSink,
};
use gyre_core::warp::PresentationKind;

// ---------------------------------------------------------------------------
// Event type discriminants
// ---------------------------------------------------------------------------

const TAG_COMMAND: u8 = 1;
const TAG_FRAME_BEGIN: u8 = 2;
const TAG_GESTURE: u8 = 3;
const TAG_SUBMIT: u8 = 4;
const TAG_FRAME_DROP: u8 = 5;
const TAG_FRAME_RATE: u8 = 6;

// ---------------------------------------------------------------------------
// RecorderSink
// ---------------------------------------------------------------------------

/// A [`TraceSink`] that encodes events into a compact binary buffer.
#[derive(Debug, Default)]
pub struct RecorderSink {
    buf: Vec<u8>,
}

impl RecorderSink {
    /// Creates an empty recorder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a view of the recorded bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    /// Consumes the recorder and returns the recorded bytes.
    #[must_use]
    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }

    // -- encoding helpers --------------------------------------------------

    fn write_u8(&mut self, v: u8) {
        self.buf.push(v);
    }

    fn write_u32(&mut self, v: u32) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    fn write_u64(&mut self, v: u64) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    fn write_f32(&mut self, v: f32) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    fn write_f64(&mut self, v: f64) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    fn write_name(&mut self, name: &str) {
        #[expect(
            clippy::cast_possible_truncation,
            reason = "command names are short wire identifiers"
        )]
        let len = name.len().min(255) as u8;
        self.write_u8(len);
        self.buf.extend_from_slice(&name.as_bytes()[..usize::from(len)]);
    }

    fn write_kind(&mut self, kind: PresentationKind) {
        self.write_u8(match kind {
            PresentationKind::Normal => 0,
            PresentationKind::LoadingIcon => 1,
            PresentationKind::ErrorMessage => 2,
        });
    }
}

impl TraceSink for RecorderSink {
    fn on_command(&mut self, e: &CommandEvent) {
        self.write_u8(TAG_COMMAND);
        self.write_name(e.name);
        self.write_u64(e.drained_at.ticks());
    }

    fn on_frame_begin(&mut self, e: &FrameBeginEvent) {
        self.write_u8(TAG_FRAME_BEGIN);
        self.write_u64(e.frame_id);
        self.write_u64(e.now.ticks());
        self.write_f32(e.delta_seconds);
        self.write_f64(e.predict_seconds);
    }

    fn on_gesture(&mut self, e: &GestureEvent) {
        self.write_u8(TAG_GESTURE);
        self.write_u64(e.frame_id);
        self.write_u32(e.synthesized.0);
    }

    fn on_submit(&mut self, e: &SubmitEvent) {
        self.write_u8(TAG_SUBMIT);
        self.write_u64(e.frame_id);
        self.write_u64(e.submitted_at.ticks());
        self.write_kind(e.kind);
    }

    fn on_frame_drop(&mut self, e: &FrameDropEvent) {
        self.write_u8(TAG_FRAME_DROP);
        self.write_u64(e.frame_id);
        self.write_u8(match e.reason {
            DropReason::DriverRejected => 0,
            DropReason::RingFull => 1,
        });
    }

    fn on_frame_rate(&mut self, e: &FrameRateEvent) {
        self.write_u8(TAG_FRAME_RATE);
        self.write_u32(e.frames);
    }
}

// ---------------------------------------------------------------------------
// Decoder
// ---------------------------------------------------------------------------

/// A decoded event from a binary recording.
#[derive(Clone, Debug)]
pub enum RecordedEvent {
    /// A drained command.
    Command {
        /// Wire name of the command.
        name: String,
        /// Host time when the command was drained.
        drained_at: HostTime,
    },
    /// A [`FrameBeginEvent`].
    FrameBegin(FrameBeginEvent),
    /// A [`GestureEvent`].
    Gesture(GestureEvent),
    /// A [`SubmitEvent`].
    Submit(SubmitEvent),
    /// A [`FrameDropEvent`].
    FrameDrop(FrameDropEvent),
    /// A [`FrameRateEvent`].
    FrameRate(FrameRateEvent),
}

/// Decodes a byte slice produced by [`RecorderSink`] into an iterator of
/// [`RecordedEvent`].
pub fn decode(bytes: &[u8]) -> DecodeIter<'_> {
    DecodeIter {
        data: bytes,
        pos: 0,
    }
}

/// Iterator over decoded events.
#[derive(Debug)]
pub struct DecodeIter<'a> {
    data: &'a [u8],
    pos: usize,
}

impl DecodeIter<'_> {
    fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    fn read_u8(&mut self) -> Option<u8> {
        if self.remaining() < 1 {
            return None;
        }
        let v = self.data[self.pos];
        self.pos += 1;
        Some(v)
    }

    fn read_u32(&mut self) -> Option<u32> {
        if self.remaining() < 4 {
            return None;
        }
        let v = u32::from_le_bytes(self.data[self.pos..self.pos + 4].try_into().ok()?);
        self.pos += 4;
        Some(v)
    }

    fn read_u64(&mut self) -> Option<u64> {
        if self.remaining() < 8 {
            return None;
        }
        let v = u64::from_le_bytes(self.data[self.pos..self.pos + 8].try_into().ok()?);
        self.pos += 8;
        Some(v)
    }

    fn read_f32(&mut self) -> Option<f32> {
        if self.remaining() < 4 {
            return None;
        }
        let v = f32::from_le_bytes(self.data[self.pos..self.pos + 4].try_into().ok()?);
        self.pos += 4;
        Some(v)
    }

    fn read_f64(&mut self) -> Option<f64> {
        if self.remaining() < 8 {
            return None;
        }
        let v = f64::from_le_bytes(self.data[self.pos..self.pos + 8].try_into().ok()?);
        self.pos += 8;
        Some(v)
    }

    fn read_name(&mut self) -> Option<String> {
        let len = usize::from(self.read_u8()?);
        if self.remaining() < len {
            return None;
        }
        let name = String::from_utf8(self.data[self.pos..self.pos + len].to_vec()).ok()?;
        self.pos += len;
        Some(name)
    }

    fn read_kind(&mut self) -> Option<PresentationKind> {
        Some(match self.read_u8()? {
            0 => PresentationKind::Normal,
            1 => PresentationKind::LoadingIcon,
            _ => PresentationKind::ErrorMessage,
        })
    }

    fn decode_command(&mut self) -> Option<RecordedEvent> {
        Some(RecordedEvent::Command {
            name: self.read_name()?,
            drained_at: HostTime(self.read_u64()?),
        })
    }

    fn decode_frame_begin(&mut self) -> Option<RecordedEvent> {
        Some(RecordedEvent::FrameBegin(FrameBeginEvent {
            frame_id: self.read_u64()?,
            now: HostTime(self.read_u64()?),
            delta_seconds: self.read_f32()?,
            predict_seconds: self.read_f64()?,
        }))
    }

    fn decode_gesture(&mut self) -> Option<RecordedEvent> {
        Some(RecordedEvent::Gesture(GestureEvent {
            frame_id: self.read_u64()?,
            synthesized: ButtonFlags(self.read_u32()?),
        }))
    }

    fn decode_submit(&mut self) -> Option<RecordedEvent> {
        Some(RecordedEvent::Submit(SubmitEvent {
            frame_id: self.read_u64()?,
            submitted_at: HostTime(self.read_u64()?),
            kind: self.read_kind()?,
        }))
    }

    fn decode_frame_drop(&mut self) -> Option<RecordedEvent> {
        Some(RecordedEvent::FrameDrop(FrameDropEvent {
            frame_id: self.read_u64()?,
            reason: match self.read_u8()? {
                0 => DropReason::DriverRejected,
                _ => DropReason::RingFull,
            },
        }))
    }

    fn decode_frame_rate(&mut self) -> Option<RecordedEvent> {
        Some(RecordedEvent::FrameRate(FrameRateEvent {
            frames: self.read_u32()?,
        }))
    }
}

impl Iterator for DecodeIter<'_> {
    type Item = RecordedEvent;

    fn next(&mut self) -> Option<Self::Item> {
        let tag = self.read_u8()?;
        match tag {
            TAG_COMMAND => self.decode_command(),
            TAG_FRAME_BEGIN => self.decode_frame_begin(),
            TAG_GESTURE => self.decode_gesture(),
            TAG_SUBMIT => self.decode_submit(),
            TAG_FRAME_DROP => self.decode_frame_drop(),
            TAG_FRAME_RATE => self.decode_frame_rate(),
            _ => None, // unknown tag → stop iteration
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_begin() -> FrameBeginEvent {
        FrameBeginEvent {
            frame_id: 7,
            now: HostTime(1_000_000),
            delta_seconds: 0.016,
            predict_seconds: 1.032,
        }
    }

    #[test]
    fn round_trip_command() {
        let mut rec = RecorderSink::new();
        rec.on_command(&CommandEvent {
            name: "surfaceChanged",
            drained_at: HostTime(555),
        });

        let events: Vec<_> = decode(rec.as_bytes()).collect();
        assert_eq!(events.len(), 1);
        match &events[0] {
            RecordedEvent::Command { name, drained_at } => {
                assert_eq!(name, "surfaceChanged");
                assert_eq!(*drained_at, HostTime(555));
            }
            other => panic!("expected Command, got {other:?}"),
        }
    }

    #[test]
    fn round_trip_frame_begin() {
        let mut rec = RecorderSink::new();
        rec.on_frame_begin(&sample_begin());

        let events: Vec<_> = decode(rec.as_bytes()).collect();
        assert_eq!(events.len(), 1);
        match &events[0] {
            RecordedEvent::FrameBegin(e) => {
                assert_eq!(e.frame_id, 7);
                assert_eq!(e.now, HostTime(1_000_000));
                assert_eq!(e.delta_seconds, 0.016);
                assert_eq!(e.predict_seconds, 1.032);
            }
            other => panic!("expected FrameBegin, got {other:?}"),
        }
    }

    #[test]
    fn round_trip_gesture_and_submit() {
        let mut rec = RecorderSink::new();
        rec.on_gesture(&GestureEvent {
            frame_id: 9,
            synthesized: ButtonFlags::TOUCH_SINGLE,
        });
        rec.on_submit(&SubmitEvent {
            frame_id: 9,
            submitted_at: HostTime(2_000),
            kind: PresentationKind::LoadingIcon,
        });

        let events: Vec<_> = decode(rec.as_bytes()).collect();
        assert_eq!(events.len(), 2);
        match &events[0] {
            RecordedEvent::Gesture(e) => {
                assert_eq!(e.synthesized, ButtonFlags::TOUCH_SINGLE);
            }
            other => panic!("expected Gesture, got {other:?}"),
        }
        match &events[1] {
            RecordedEvent::Submit(e) => {
                assert_eq!(e.kind, PresentationKind::LoadingIcon);
                assert_eq!(e.submitted_at, HostTime(2_000));
            }
            other => panic!("expected Submit, got {other:?}"),
        }
    }

    #[test]
    fn round_trip_drop_and_rate() {
        let mut rec = RecorderSink::new();
        rec.on_frame_drop(&FrameDropEvent {
            frame_id: 3,
            reason: DropReason::RingFull,
        });
        rec.on_frame_rate(&FrameRateEvent { frames: 60 });

        let events: Vec<_> = decode(rec.as_bytes()).collect();
        assert_eq!(events.len(), 2);
        assert!(matches!(
            &events[0],
            RecordedEvent::FrameDrop(FrameDropEvent {
                reason: DropReason::RingFull,
                ..
            })
        ));
        assert!(matches!(
            &events[1],
            RecordedEvent::FrameRate(FrameRateEvent { frames: 60 })
        ));
    }

    #[test]
    fn empty_buffer_decodes_to_nothing() {
        let events: Vec<_> = decode(&[]).collect();
        assert!(events.is_empty());
    }

    #[test]
    fn truncated_record_stops_cleanly() {
        let mut rec = RecorderSink::new();
        rec.on_frame_begin(&sample_begin());
        let bytes = rec.as_bytes();
        // Chop the record mid-field.
        let events: Vec<_> = decode(&bytes[..bytes.len() - 3]).collect();
        assert!(events.is_empty());
    }
}
