// Copyright 2026 the Gyre Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Core types and frame-pipeline algorithms for pose-predicted mobile VR
//! compositing.
//!
//! `gyre_core` provides the data model and the pure (side-effect free)
//! algorithms of the Gyre frame pipeline. It is `no_std` compatible (with
//! `alloc`); everything that touches threads, clocks, or a display driver
//! lives in `gyre_runtime`.
//!
//! # Architecture
//!
//! The crate is organized around one render-loop iteration that turns queued
//! commands and a predicted head pose into a composition request:
//!
//! ```text
//!   Command (decoded at the queue boundary)
//!       │
//!       ▼
//!   ControlState ──► InputSnapshot (edge masks) ──► TouchpadRecognizer
//!                                                        │
//!   FramePacer ──► FrameState { frame_id, delta, pose, input }
//!                                                        │
//!                        ┌───────────────────────────────┘
//!                        ▼
//!   CompositionRequest (per eye: texture, tan-angle transform, pose)
//!       │
//!       ▼
//!   DistortionMesh (static per device profile)
//! ```
//!
//! **[`command`]** — The closed command union carried by the cross-thread
//! queue, plus the wire-level payload type and the single fail-closed decode
//! step.
//!
//! **[`input`]** — Button bitsets, per-frame input snapshots, and the XOR
//! edge derivation for pressed/released masks.
//!
//! **[`gesture`]** — The touchpad recognizer synthesizing single-tap,
//! double-tap, and swipe button bits.
//!
//! **[`key`]** — Short-press / long-press / double-tap recognition for the
//! hardware back key.
//!
//! **[`frame`]** — Per-iteration frame state, delta clamping, the pose
//! prediction horizon, and the once-a-second frame-rate window.
//!
//! **[`pose`]** — Minimal quaternion/vector math and the predicted head
//! pose sample.
//!
//! **[`transform`]** — Column-major 4×4 matrix and tan-angle transform
//! construction.
//!
//! **[`profile`]** — Device optical profiles (lens polynomials, chromatic
//! terms, screen geometry) selected by hardware model string.
//!
//! **[`mesh`]** — The distortion-mesh builder: profile → tessellated,
//! chromatic-aberration-corrected correction mesh in scan order.
//!
//! **[`warp`]** — Composition request assembly and the layer programs used
//! by the loading-icon and error-message presentation modes.
//!
//! **[`time`]** — Monotonic host time, timebase conversion, and the
//! seconds bridge used by pose timestamps.
//!
//! **[`trace`]** — [`TraceSink`](trace::TraceSink) trait and event types
//! for frame-loop instrumentation, with zero-overhead
//! [`Tracer`](trace::Tracer) wrapper.
//!
//! # Crate features
//!
//! - `std` (disabled by default): Enables `std` support in dependencies.
//! - `trace` (disabled by default): Enables `Tracer` method bodies (one
//!   branch per call site).

#![no_std]
#![cfg_attr(docsrs, feature(doc_auto_cfg))]

extern crate alloc;
#[cfg(feature = "std")]
extern crate std;

pub mod command;
pub mod frame;
pub mod gesture;
pub mod input;
pub mod key;
pub mod mesh;
pub mod pose;
pub mod profile;
pub mod time;
pub mod trace;
pub mod transform;
pub mod warp;
