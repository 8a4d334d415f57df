// Copyright 2026 the Gyre Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The time-warp compositor.
//!
//! Each frame, [`TimeWarpCompositor::submit`] decides which of three
//! mutually exclusive presentation modes is active and assembles the
//! matching [`CompositionRequest`]:
//!
//! - **Normal** — the application's eye buffers, with the predicted pose
//!   and a tan-angle transform derived from the configured field of view.
//! - **Loading icon** — a spinning icon before the application's first
//!   frame is ready.
//! - **Error message** — a static message texture after a fatal startup
//!   error, shown for [`ERROR_MESSAGE_SECONDS`] and then converted into a
//!   session exit. This is the only path that ends the whole session
//!   rather than the current frame.
//!
//! The request is rebuilt from [`CompositionRequest::init`] on every call,
//! so per-layer state never leaks across frames. Submission failures drop
//! the frame and keep the loop running; a retried submission would carry a
//! stale pose, which looks worse than a skipped frame.

use gyre_core::frame::FrameState;
use gyre_core::profile::DeviceOpticalProfile;
use gyre_core::time::HostTime;
use gyre_core::trace::{DropReason, FrameDropEvent, SubmitEvent, Tracer};
use gyre_core::warp::{CompositionRequest, PresentationKind, TextureId};

use crate::DisplaySink;
use crate::ring::{DEFAULT_SLOT_DEPTH, RetireHandle, SlotRing};

/// What happened to one frame's submission.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// The display driver accepted the request.
    Presented,
    /// The frame was dropped; the loop continues.
    Dropped,
    /// The error-message window elapsed; the session must exit.
    ExitRequested,
}

/// How long a fatal-error message stays on screen before the session exits.
pub const ERROR_MESSAGE_SECONDS: f64 = 7.5;

/// Extra field of view when frames are held for multiple vsyncs.
///
/// Below the display's native rate the time-warp correction grows, pulling
/// black in at the edges; widening the fov hides it. Tied to the vsync
/// setting rather than measured frame time because a time-based switch
/// flickers visibly at the periphery.
pub const LOW_RATE_FOV_BIAS_DEGREES: f32 = 10.0;

/// Compositor configuration, fixed for a session.
#[derive(Clone, Copy, Debug)]
pub struct CompositorConfig {
    /// Base per-eye field of view in degrees.
    pub eye_fov_degrees: f32,
    /// Display vsyncs per frame; above 1 the fov bias kicks in.
    pub min_vsyncs: u32,
    /// Composition slot count (≥ 2).
    pub slot_depth: usize,
    /// Loading-icon texture; when set, the session starts in loading-icon
    /// mode until the application reports content ready.
    pub loading_icon: Option<TextureId>,
}

impl CompositorConfig {
    /// Configuration matching a device profile, with no loading icon.
    #[must_use]
    pub fn for_profile(profile: &DeviceOpticalProfile) -> Self {
        Self {
            eye_fov_degrees: profile.eye_fov_degrees[0],
            min_vsyncs: 1,
            slot_depth: DEFAULT_SLOT_DEPTH,
            loading_icon: None,
        }
    }
}

#[derive(Clone, Copy, Debug)]
enum Mode {
    LoadingIcon,
    Normal,
    ErrorMessage {
        message: TextureId,
        size_factor: f32,
        end_seconds: f64,
    },
}

/// Assembles and submits per-eye composition requests.
pub struct TimeWarpCompositor {
    config: CompositorConfig,
    display: Box<dyn DisplaySink>,
    ring: SlotRing,
    mode: Mode,
}

impl std::fmt::Debug for TimeWarpCompositor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TimeWarpCompositor")
            .field("config", &self.config)
            .field("mode", &self.mode)
            .finish_non_exhaustive()
    }
}

impl TimeWarpCompositor {
    /// Creates a compositor submitting to the given display driver.
    ///
    /// The driver receives the slot ring's retire handle via
    /// [`DisplaySink::attach_retire`] before any submission.
    #[must_use]
    pub fn new(config: CompositorConfig, mut display: Box<dyn DisplaySink>) -> Self {
        let mode = if config.loading_icon.is_some() {
            Mode::LoadingIcon
        } else {
            Mode::Normal
        };
        let ring = SlotRing::new(config.slot_depth);
        display.attach_retire(ring.retire_handle());
        Self {
            ring,
            config,
            display,
            mode,
        }
    }

    /// Returns the handle the display driver uses to confirm consumption
    /// of submissions.
    #[must_use]
    pub fn retire_handle(&self) -> RetireHandle {
        self.ring.retire_handle()
    }

    /// Which presentation mode the next submission will use.
    #[must_use]
    pub fn kind(&self) -> PresentationKind {
        match self.mode {
            Mode::LoadingIcon => PresentationKind::LoadingIcon,
            Mode::Normal => PresentationKind::Normal,
            Mode::ErrorMessage { .. } => PresentationKind::ErrorMessage,
        }
    }

    /// Leaves loading-icon mode once the application's first frame is
    /// ready. No effect in other modes.
    pub fn content_ready(&mut self) {
        if matches!(self.mode, Mode::LoadingIcon) {
            self.mode = Mode::Normal;
        }
    }

    /// Enters error-message mode: `message` is shown for
    /// [`ERROR_MESSAGE_SECONDS`] from `now_seconds`, after which
    /// [`Self::submit`] reports [`SubmitOutcome::ExitRequested`].
    pub fn show_error_message(&mut self, message: TextureId, texture_size: u32, now_seconds: f64) {
        #[expect(
            clippy::cast_precision_loss,
            reason = "error textures are at most a few thousand pixels"
        )]
        let size_factor = 1024.0 / texture_size.max(1) as f32;
        self.mode = Mode::ErrorMessage {
            message,
            size_factor,
            end_seconds: now_seconds + ERROR_MESSAGE_SECONDS,
        };
    }

    /// Updates the vsyncs-per-frame setting (1 at native rate).
    pub fn set_min_vsyncs(&mut self, min_vsyncs: u32) {
        self.config.min_vsyncs = min_vsyncs.max(1);
    }

    /// The most recently submitted request, for
    /// [`VrAppHandler::on_composition_ready`](crate::VrAppHandler::on_composition_ready).
    #[must_use]
    pub fn last_request(&self) -> Option<&CompositionRequest> {
        self.ring.last()
    }

    fn fov_degrees(&self) -> f32 {
        self.config.eye_fov_degrees
            + if self.config.min_vsyncs > 1 {
                LOW_RATE_FOV_BIAS_DEGREES
            } else {
                0.0
            }
    }

    /// Assembles this frame's composition request and submits it.
    ///
    /// Never blocks on the display driver; when no slot is free or the
    /// driver rejects the frame, the frame is dropped (logged and traced)
    /// and the loop continues.
    pub fn submit(
        &mut self,
        frame: &FrameState,
        eye_textures: [TextureId; 2],
        now_seconds: f64,
        now_host: HostTime,
        tracer: &mut Tracer<'_>,
    ) -> SubmitOutcome {
        let fov = self.fov_degrees();
        let request = match self.mode {
            Mode::ErrorMessage {
                message,
                size_factor,
                end_seconds,
            } => {
                if now_seconds >= end_seconds {
                    return SubmitOutcome::ExitRequested;
                }
                CompositionRequest::error_message(fov, message, size_factor)
            }
            Mode::LoadingIcon => {
                let icon = self.config.loading_icon.unwrap_or_default();
                CompositionRequest::loading_icon(fov, icon)
            }
            Mode::Normal => {
                let mut request = CompositionRequest::init(fov);
                for (eye, texture) in request.eyes.iter_mut().zip(eye_textures) {
                    eye.texture = texture;
                    eye.pose = frame.pose;
                }
                request
            }
        };
        let kind = self.kind();

        let mut request = request;
        request.min_vsyncs = self.config.min_vsyncs;

        let depth = self.ring.depth();
        let Some(slot) = self.ring.begin(request) else {
            log::warn!(
                "dropping frame {}: all {depth} composition slots in flight",
                frame.frame_id
            );
            tracer.frame_drop(&FrameDropEvent {
                frame_id: frame.frame_id,
                reason: DropReason::RingFull,
            });
            return SubmitOutcome::Dropped;
        };

        match self.display.submit(slot) {
            Ok(()) => {
                tracer.submit(&SubmitEvent {
                    frame_id: frame.frame_id,
                    submitted_at: now_host,
                    kind,
                });
                SubmitOutcome::Presented
            }
            Err(error) => {
                log::warn!("dropping frame {}: {error}", frame.frame_id);
                tracer.frame_drop(&FrameDropEvent {
                    frame_id: frame.frame_id,
                    reason: DropReason::DriverRejected,
                });
                SubmitOutcome::Dropped
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};

    use gyre_core::warp::LayerProgram;

    use super::*;
    use crate::SubmitError;

    /// Display double that records submissions and can be told to fail.
    struct TestDisplay {
        submitted: Arc<AtomicU32>,
        fail: bool,
        auto_retire: bool,
        retire: Option<RetireHandle>,
        last_program: Arc<AtomicU32>,
    }

    impl DisplaySink for TestDisplay {
        fn attach_retire(&mut self, retire: RetireHandle) {
            self.retire = Some(retire);
        }

        fn submit(&mut self, request: &CompositionRequest) -> Result<(), SubmitError> {
            if self.fail {
                return Err(SubmitError::Rejected {
                    reason: "test".into(),
                });
            }
            self.submitted.fetch_add(1, Ordering::SeqCst);
            self.last_program.store(
                match request.eyes[0].program {
                    LayerProgram::Simple => 0,
                    LayerProgram::LoadingIcon => 1,
                },
                Ordering::SeqCst,
            );
            if self.auto_retire
                && let Some(retire) = &self.retire
            {
                retire.retire();
            }
            Ok(())
        }
    }

    struct Harness {
        compositor: TimeWarpCompositor,
        submitted: Arc<AtomicU32>,
        last_program: Arc<AtomicU32>,
    }

    fn harness_with(config: CompositorConfig, fail: bool, auto_retire: bool) -> Harness {
        let submitted = Arc::new(AtomicU32::new(0));
        let last_program = Arc::new(AtomicU32::new(0));
        let compositor = TimeWarpCompositor::new(
            config,
            Box::new(TestDisplay {
                submitted: Arc::clone(&submitted),
                fail,
                auto_retire,
                retire: None,
                last_program: Arc::clone(&last_program),
            }),
        );
        Harness {
            compositor,
            submitted,
            last_program,
        }
    }

    fn config() -> CompositorConfig {
        CompositorConfig {
            eye_fov_degrees: 90.0,
            min_vsyncs: 1,
            slot_depth: 3,
            loading_icon: None,
        }
    }

    fn submit(harness: &mut Harness, frame_id: u64, now: f64) -> SubmitOutcome {
        let frame = FrameState {
            frame_id,
            ..FrameState::default()
        };
        let mut tracer = Tracer::none();
        harness.compositor.submit(
            &frame,
            [TextureId(10), TextureId(11)],
            now,
            HostTime(0),
            &mut tracer,
        )
    }

    #[test]
    fn normal_mode_submits_eye_textures() {
        let mut harness = harness_with(config(), false, true);
        assert_eq!(harness.compositor.kind(), PresentationKind::Normal);
        assert!(matches!(
            submit(&mut harness, 1, 0.0),
            SubmitOutcome::Presented
        ));
        assert_eq!(harness.submitted.load(Ordering::SeqCst), 1);
        let request = harness.compositor.last_request().unwrap();
        assert_eq!(request.eyes[0].texture, TextureId(10));
        assert_eq!(request.eyes[1].texture, TextureId(11));
        assert_eq!(request.eyes[0].program, LayerProgram::Simple);
    }

    #[test]
    fn loading_icon_until_content_ready() {
        let mut cfg = config();
        cfg.loading_icon = Some(TextureId(5));
        let mut harness = harness_with(cfg, false, true);

        assert_eq!(harness.compositor.kind(), PresentationKind::LoadingIcon);
        let _ = submit(&mut harness, 1, 0.0);
        assert_eq!(harness.last_program.load(Ordering::SeqCst), 1, "icon program");

        harness.compositor.content_ready();
        assert_eq!(harness.compositor.kind(), PresentationKind::Normal);
        let _ = submit(&mut harness, 2, 0.016);
        assert_eq!(harness.last_program.load(Ordering::SeqCst), 0, "eye program");
    }

    #[test]
    fn error_message_times_out_into_exit() {
        let mut harness = harness_with(config(), false, true);
        harness
            .compositor
            .show_error_message(TextureId(9), 512, 100.0);
        assert_eq!(harness.compositor.kind(), PresentationKind::ErrorMessage);

        assert!(matches!(
            submit(&mut harness, 1, 100.0),
            SubmitOutcome::Presented
        ));
        let request = *harness.compositor.last_request().unwrap();
        assert_eq!(request.eyes[0].texture, TextureId(9));
        assert_eq!(request.program_params, [0.0, 2.0], "1024/512 size factor");

        // Inside the window the message keeps showing.
        assert!(matches!(
            submit(&mut harness, 2, 107.0),
            SubmitOutcome::Presented
        ));
        // Past the window the session exits.
        assert!(matches!(
            submit(&mut harness, 3, 107.6),
            SubmitOutcome::ExitRequested
        ));
    }

    #[test]
    fn driver_rejection_drops_and_continues() {
        let mut harness = harness_with(config(), true, true);
        assert!(matches!(
            submit(&mut harness, 1, 0.0),
            SubmitOutcome::Dropped
        ));
        assert_eq!(harness.submitted.load(Ordering::SeqCst), 0);
        // The loop keeps going; a later frame is attempted normally.
        assert!(matches!(
            submit(&mut harness, 2, 0.016),
            SubmitOutcome::Dropped
        ));
    }

    #[test]
    fn unconfirmed_slots_exhaust_the_ring() {
        // Driver never retires: after slot_depth submissions the ring is
        // full and frames drop instead of overwriting in-flight slots.
        let mut harness = harness_with(config(), false, false);
        for frame in 1..=3 {
            assert!(matches!(
                submit(&mut harness, frame, 0.0),
                SubmitOutcome::Presented
            ));
        }
        assert!(matches!(
            submit(&mut harness, 4, 0.1),
            SubmitOutcome::Dropped
        ));
        assert_eq!(harness.submitted.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn low_rate_bias_widens_fov() {
        let mut harness = harness_with(config(), false, true);
        let _ = submit(&mut harness, 1, 0.0);
        let native = harness.compositor.last_request().unwrap().eyes[0]
            .tan_angle_transform
            .col(0)[0];

        harness.compositor.set_min_vsyncs(2);
        let _ = submit(&mut harness, 2, 0.016);
        let held = harness.compositor.last_request().unwrap().eyes[0]
            .tan_angle_transform
            .col(0)[0];

        assert!(
            held < native,
            "wider fov must shrink the tan-angle scale ({held} vs {native})"
        );
        assert_eq!(
            harness.compositor.last_request().unwrap().min_vsyncs,
            2,
            "vsync setting rides along in the request"
        );
    }
}
