// Copyright 2026 the Gyre Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Render-thread engine for the Gyre frame pipeline.
//!
//! `gyre_runtime` owns everything that involves threads, clocks, or the
//! display driver. Two long-lived threads participate:
//!
//! - The **producer thread** (platform/input callbacks) posts typed
//!   commands through the [`queue`] module's [`CommandSender`].
//! - The **render thread** runs [`FrameScheduler::run`], draining the
//!   queue, pacing frames, and driving the [`TimeWarpCompositor`].
//!
//! The command queue is the *only* channel between the two; the GPU
//! context, surface handle, and composition state are exclusively owned by
//! the render thread. Because all state changes funnel through one
//! single-consumer queue, a resource-creation command is always fully
//! processed before any later command that references the resource.
//!
//! # Seams
//!
//! The engine calls out through three interfaces, each implemented once per
//! host:
//!
//! - [`PoseSource`] — sensor fusion, queried for a time-extrapolated pose.
//! - [`DisplaySink`] — the display driver consuming composition requests.
//! - [`VrAppHandler`] — the application: one capability trait with a
//!   per-frame hook, lifecycle notifications, and input hooks, instead of
//!   a wide vtable of rarely-overridden virtuals.
//!
//! # Frame loop pseudocode
//!
//! ```rust,ignore
//! let (sender, receiver) = queue::command_queue(queue::QUEUE_CAPACITY);
//! // UI thread:
//! sender.post(Command::SurfaceChanged(handle))?;
//! sender.post(Command::Resume)?;
//! // Render thread:
//! FrameScheduler::new(receiver, app, pose_source, compositor, clock).run();
//! ```

use std::time::Instant;

use gyre_core::frame::FrameState;
use gyre_core::key::BackKeyEvent;
use gyre_core::pose::PredictedPose;
use gyre_core::time::{HostTime, Timebase};
use gyre_core::transform::Matrix4;
use gyre_core::warp::{CompositionRequest, TextureId};
use thiserror::Error;

pub mod compositor;
pub mod queue;
pub mod ring;
pub mod scheduler;

pub use compositor::{CompositorConfig, SubmitOutcome, TimeWarpCompositor};
pub use queue::{CommandReceiver, CommandSender, PostError, command_queue};
pub use scheduler::{FrameScheduler, SchedulerState};

/// Sensor-fusion collaborator queried once per frame.
pub trait PoseSource {
    /// Returns the head pose extrapolated to `at_seconds`.
    ///
    /// The returned orientation must be unit length; the scheduler passes
    /// it through unmodified.
    fn predict(&mut self, at_seconds: f64) -> PredictedPose;
}

/// A pose source that always reports an at-rest head.
///
/// Useful before sensor fusion is up, and in tests.
#[derive(Clone, Copy, Debug, Default)]
pub struct StaticPoseSource;

impl PoseSource for StaticPoseSource {
    fn predict(&mut self, at_seconds: f64) -> PredictedPose {
        PredictedPose::identity_at(at_seconds)
    }
}

/// Why a display submission failed.
#[derive(Debug, Error)]
pub enum SubmitError {
    /// The output surface disappeared between frames.
    #[error("display surface is gone")]
    SurfaceLost,
    /// The driver refused the frame.
    #[error("display driver rejected the frame: {reason}")]
    Rejected {
        /// Driver-reported reason.
        reason: String,
    },
}

/// Display-driver collaborator consuming composition requests.
///
/// Submission must not block on the previous frame being scanned out; the
/// composition slot ring ([`ring::SlotRing`]) provides the buffering that
/// makes that safe. The driver confirms consumption of each submission via
/// the [`ring::RetireHandle`] it was given at startup.
pub trait DisplaySink {
    /// Receives the retire handle for the compositor's slot ring, once,
    /// before the first submission. Drivers call
    /// [`RetireHandle::retire`](ring::RetireHandle::retire) as each
    /// submission finishes scan-out.
    fn attach_retire(&mut self, retire: ring::RetireHandle) {
        _ = retire;
    }

    /// Hands one frame's composition to the driver.
    ///
    /// # Errors
    ///
    /// On error the frame is dropped and logged; the pipeline never
    /// retries, because re-submitting a stale pose is worse than skipping
    /// a frame.
    fn submit(&mut self, request: &CompositionRequest) -> Result<(), SubmitError>;
}

/// Lifecycle notifications delivered to the application.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LifecycleEvent {
    /// The host activity regained foreground.
    Resumed,
    /// The host activity lost foreground.
    Paused,
    /// A window surface is available.
    SurfaceCreated,
    /// The window surface is gone.
    SurfaceDestroyed,
    /// The render thread is about to exit; all queued work has drained.
    ShuttingDown,
}

/// The application-side capability interface.
///
/// Implemented once per host application and stored by the scheduler. Only
/// [`on_frame`](Self::on_frame) is mandatory; everything else defaults to
/// "not handled".
pub trait VrAppHandler {
    /// Called once per frame with the new frame state. The returned matrix
    /// is the center view transform the frame was rendered with; shells
    /// use it to place overlay content.
    fn on_frame(&mut self, frame: &FrameState) -> Matrix4;

    /// Lifecycle notification.
    fn on_lifecycle(&mut self, event: LifecycleEvent) {
        _ = event;
    }

    /// Called after a composition request has been accepted by the display
    /// driver.
    fn on_composition_ready(&mut self, request: &CompositionRequest) {
        _ = request;
    }

    /// The most recent completed eye-buffer textures, copied into normal
    /// composition requests.
    fn eye_buffers(&mut self) -> [TextureId; 2] {
        [TextureId(0); 2]
    }

    /// Whether first-frame content is ready. While this reports `false`
    /// the compositor keeps showing the loading icon.
    fn is_content_ready(&self) -> bool {
        true
    }

    /// A raw key event; return `true` to consume it before button mapping.
    fn on_key(&mut self, code: i32, down: bool, repeat: i32) -> bool {
        _ = (code, down, repeat);
        false
    }

    /// A classified back-key event; return `true` to consume it. An
    /// unconsumed short press exits the session.
    fn on_back_key(&mut self, event: BackKeyEvent) -> bool {
        _ = event;
        false
    }
}

/// A monotonic clock readable from the render thread.
///
/// Abstracted so scheduler tests can drive time by hand.
pub trait Clock {
    /// Current monotonic time.
    fn now(&mut self) -> HostTime;

    /// Tick-to-nanosecond conversion for this clock.
    fn timebase(&self) -> Timebase;
}

/// The process monotonic clock, in nanosecond ticks.
#[derive(Clone, Copy, Debug)]
pub struct MonotonicClock {
    origin: Instant,
}

impl MonotonicClock {
    /// Creates a clock anchored at the moment of the call.
    #[must_use]
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MonotonicClock {
    fn now(&mut self) -> HostTime {
        #[expect(
            clippy::cast_possible_truncation,
            reason = "u64 nanoseconds cover centuries of process uptime"
        )]
        let nanos = self.origin.elapsed().as_nanos() as u64;
        HostTime(nanos)
    }

    fn timebase(&self) -> Timebase {
        Timebase::NANOS
    }
}

/// A running render thread plus the producer-side queue handle.
///
/// This is the piece the platform shell owns: commands go in through
/// [`sender`](Self::sender), and [`quit_and_join`](Self::quit_and_join)
/// performs the drain-then-exit shutdown.
#[derive(Debug)]
pub struct RenderThread {
    sender: CommandSender,
    join: Option<std::thread::JoinHandle<()>>,
}

impl RenderThread {
    /// Spawns the render thread.
    ///
    /// The compositor (and with it the display's retire handle) is
    /// constructed on the render thread, so the display driver's
    /// [`DisplaySink::attach_retire`] runs there before the first frame.
    #[must_use]
    pub fn spawn(
        config: CompositorConfig,
        app: Box<dyn VrAppHandler + Send>,
        pose_source: Box<dyn PoseSource + Send>,
        display: Box<dyn DisplaySink + Send>,
    ) -> Self {
        let (sender, receiver) = command_queue(queue::QUEUE_CAPACITY);
        let join = std::thread::spawn(move || {
            let compositor = TimeWarpCompositor::new(config, display);
            let clock = Box::new(MonotonicClock::new());
            FrameScheduler::new(receiver, app, pose_source, compositor, clock).run();
        });
        Self {
            sender,
            join: Some(join),
        }
    }

    /// The producer-side handle for posting commands.
    #[must_use]
    pub fn sender(&self) -> &CommandSender {
        &self.sender
    }

    /// Drains the queue, stops the render loop, and joins the thread.
    pub fn quit_and_join(mut self) {
        let _ = self.sender.quit();
        if let Some(join) = self.join.take() {
            let _ = join.join();
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};

    use gyre_core::command::Command;

    use super::*;

    struct CountingApp {
        frames: Arc<AtomicU32>,
    }

    impl VrAppHandler for CountingApp {
        fn on_frame(&mut self, _frame: &FrameState) -> Matrix4 {
            self.frames.fetch_add(1, Ordering::SeqCst);
            Matrix4::IDENTITY
        }
    }

    struct CountingDisplay {
        retire: Option<ring::RetireHandle>,
        submissions: Arc<AtomicU32>,
    }

    impl DisplaySink for CountingDisplay {
        fn attach_retire(&mut self, retire: ring::RetireHandle) {
            self.retire = Some(retire);
        }

        fn submit(&mut self, _request: &CompositionRequest) -> Result<(), SubmitError> {
            self.submissions.fetch_add(1, Ordering::SeqCst);
            if let Some(retire) = &self.retire {
                retire.retire();
            }
            Ok(())
        }
    }

    /// Whole-pipeline smoke test across real threads: UI-thread commands in,
    /// composition submissions out, synchronized send, drain-then-quit.
    #[test]
    fn render_thread_end_to_end() {
        let frames = Arc::new(AtomicU32::new(0));
        let submissions = Arc::new(AtomicU32::new(0));

        let config = CompositorConfig {
            eye_fov_degrees: 90.0,
            min_vsyncs: 1,
            slot_depth: 3,
            loading_icon: None,
        };
        let thread = RenderThread::spawn(
            config,
            Box::new(CountingApp {
                frames: Arc::clone(&frames),
            }),
            Box::new(StaticPoseSource),
            Box::new(CountingDisplay {
                retire: None,
                submissions: Arc::clone(&submissions),
            }),
        );

        thread
            .sender()
            .post(Command::SurfaceChanged(
                gyre_core::command::SurfaceHandle(0x1000),
            ))
            .unwrap();
        thread.sender().post(Command::Resume).unwrap();
        // send() proves the render thread is alive and has executed
        // everything ahead of the sync point.
        thread.sender().send(Command::Sync).unwrap();

        // Let a few frames through, then shut down.
        while frames.load(Ordering::SeqCst) < 3 {
            std::thread::yield_now();
        }
        thread.quit_and_join();

        let rendered = frames.load(Ordering::SeqCst);
        let presented = submissions.load(Ordering::SeqCst);
        assert!(rendered >= 3);
        assert!(presented >= 3, "each frame reached the display driver");
    }
}
