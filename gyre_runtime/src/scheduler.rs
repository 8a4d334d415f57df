// Copyright 2026 the Gyre Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The render-thread main loop.
//!
//! [`FrameScheduler::run`] owns the render thread:
//!
//! 1. Drain every queued command (surface lifecycle, pause/resume, input,
//!    quit). Each command mutates local state or is forwarded to the
//!    application handler; a malformed command never gets this far, the
//!    queue boundary already rejected it.
//! 2. With no surface, or while paused, block on
//!    [`CommandReceiver::wait`] and restart. This is the loop's only
//!    steady-state blocking point.
//! 3. Otherwise run one frame: clamp the delta, predict the head pose
//!    ahead by twice the delta, latch input edges, recognize gestures,
//!    classify the back key, call the application's frame hook, and hand
//!    the result to the [`TimeWarpCompositor`].
//!
//! Because every state change arrives through the single-consumer queue,
//! the UI thread's view of the surface lifecycle is always serialized with
//! respect to render-thread consumption: a surface is never rendered to
//! before its creation command has been fully processed.

use gyre_core::command::{Command, SurfaceHandle};
use gyre_core::frame::{FramePacer, FrameState};
use gyre_core::gesture::TouchpadRecognizer;
use gyre_core::input::{ButtonFlags, ControlState, InputSnapshot};
use gyre_core::key::{BACK_KEY_CODE, BackKeyEvent, BackKeyState};
use gyre_core::trace::{
    CommandEvent, FrameBeginEvent, FrameRateEvent, GestureEvent, TraceSink, Tracer,
};
use gyre_core::transform::Matrix4;
use gyre_core::warp::{PresentationKind, TextureId};
use kurbo::Point;

use crate::compositor::{SubmitOutcome, TimeWarpCompositor};
use crate::queue::{CommandReceiver, Incoming};
use crate::{Clock, LifecycleEvent, PoseSource, VrAppHandler};

/// Where the render loop is in its lifecycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SchedulerState {
    /// No surface has ever been attached.
    Unsynced,
    /// Actively producing frames.
    Active,
    /// Surface lost or host paused; waiting on the queue.
    Paused,
    /// Quit processed (or fatal error elapsed); the loop is done.
    Exiting,
}

/// The render-thread frame scheduler.
pub struct FrameScheduler {
    receiver: CommandReceiver,
    app: Box<dyn VrAppHandler>,
    pose_source: Box<dyn PoseSource>,
    compositor: TimeWarpCompositor,
    clock: Box<dyn Clock>,
    trace_sink: Option<Box<dyn TraceSink>>,

    surface: Option<SurfaceHandle>,
    seen_surface: bool,
    paused: bool,
    exiting: bool,

    controls: ControlState,
    last_frame: FrameState,
    pacer: FramePacer,
    recognizer: TouchpadRecognizer,
    back_key: BackKeyState,
    last_view: Matrix4,
}

impl std::fmt::Debug for FrameScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrameScheduler")
            .field("state", &self.state())
            .field("frame_id", &self.last_frame.frame_id)
            .finish_non_exhaustive()
    }
}

impl FrameScheduler {
    /// Creates a scheduler. The host activity starts paused; a `Resume`
    /// command and a surface are both required before frames flow.
    #[must_use]
    pub fn new(
        receiver: CommandReceiver,
        app: Box<dyn VrAppHandler>,
        pose_source: Box<dyn PoseSource>,
        compositor: TimeWarpCompositor,
        mut clock: Box<dyn Clock>,
    ) -> Self {
        let timebase = clock.timebase();
        let start_seconds = clock.now().to_seconds(timebase);
        Self {
            receiver,
            app,
            pose_source,
            compositor,
            clock,
            trace_sink: None,
            surface: None,
            seen_surface: false,
            paused: true,
            exiting: false,
            controls: ControlState::default(),
            last_frame: FrameState::default(),
            pacer: FramePacer::new(start_seconds),
            recognizer: TouchpadRecognizer::new(start_seconds),
            back_key: BackKeyState::new(),
            last_view: Matrix4::IDENTITY,
        }
    }

    /// Attaches a trace sink receiving frame-loop instrumentation.
    #[must_use]
    pub fn with_trace_sink(mut self, sink: Box<dyn TraceSink>) -> Self {
        self.trace_sink = Some(sink);
        self
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> SchedulerState {
        if self.exiting {
            SchedulerState::Exiting
        } else if !self.seen_surface {
            SchedulerState::Unsynced
        } else if self.paused || self.surface.is_none() {
            SchedulerState::Paused
        } else {
            SchedulerState::Active
        }
    }

    /// The compositor, e.g. to enter error-message mode before running.
    pub fn compositor_mut(&mut self) -> &mut TimeWarpCompositor {
        &mut self.compositor
    }

    /// The view transform returned by the application's last frame hook.
    ///
    /// Shells use it to place overlay content near the user's view.
    #[must_use]
    pub fn last_view(&self) -> Matrix4 {
        self.last_view
    }

    /// Runs the render loop until a quit command drains or a fatal error
    /// window elapses.
    pub fn run(&mut self) {
        log::info!("render loop starting");
        loop {
            self.drain_commands();
            if self.exiting {
                break;
            }

            // No surface, or paused: sleep until the queue has news.
            if self.surface.is_none() || self.paused {
                self.receiver.wait();
                continue;
            }

            self.step();
            if self.exiting {
                break;
            }
        }
        self.app.on_lifecycle(LifecycleEvent::ShuttingDown);
        log::info!(
            "render loop exiting after {} frames",
            self.last_frame.frame_id
        );
    }

    fn drain_commands(&mut self) {
        while let Some(incoming) = self.receiver.next() {
            let drained_at = self.clock.now();
            let event = CommandEvent {
                name: incoming.command().name(),
                drained_at,
            };
            if let Some(sink) = &mut self.trace_sink {
                Tracer::new(sink.as_mut()).command(&event);
            }
            self.handle_command(incoming);
        }
    }

    fn handle_command(&mut self, incoming: Incoming) {
        match *incoming.command() {
            Command::SurfaceChanged(handle) => {
                if self.surface.is_some() {
                    // Android reports surfaces multiple times; only the
                    // handle needs refreshing.
                    log::warn!("surface changed while one exists; replacing handle");
                    self.surface = Some(handle);
                } else {
                    self.surface = Some(handle);
                    self.seen_surface = true;
                    self.app.on_lifecycle(LifecycleEvent::SurfaceCreated);
                }
            }
            Command::SurfaceDestroyed => {
                if self.surface.take().is_some() {
                    self.app.on_lifecycle(LifecycleEvent::SurfaceDestroyed);
                }
            }
            Command::Pause => {
                if !self.paused {
                    self.paused = true;
                    self.app.on_lifecycle(LifecycleEvent::Paused);
                }
            }
            Command::Resume => {
                if self.paused {
                    self.paused = false;
                    self.app.on_lifecycle(LifecycleEvent::Resumed);
                }
            }
            Command::Key { code, down, repeat } => self.handle_key(code, down, repeat),
            Command::Touch { action, x, y } => {
                self.controls.touch = Point::new(f64::from(x), f64::from(y));
                if action == 0 {
                    self.controls.buttons |= ButtonFlags::TOUCH;
                }
                if action == 1 {
                    self.controls.buttons.remove(ButtonFlags::TOUCH);
                }
            }
            Command::Joy {
                left_x,
                left_y,
                right_x,
                right_y,
            } => {
                self.controls.sticks = [[left_x, left_y], [right_x, right_y]];
            }
            Command::Sync => {}
            Command::Quit => {
                log::info!("quit drained; leaving render loop");
                self.exiting = true;
            }
        }
        // `incoming` drops here, which is what releases a blocked send().
    }

    fn handle_key(&mut self, code: i32, down: bool, repeat: i32) {
        if code == BACK_KEY_CODE {
            let timebase = self.clock.timebase();
            let now_seconds = self.clock.now().to_seconds(timebase);
            self.back_key.feed(down, now_seconds);
            return;
        }
        if self.app.on_key(code, down, repeat) {
            return;
        }
        if let Some(button) = button_for_key(code) {
            if down {
                self.controls.buttons |= button;
            } else {
                self.controls.buttons.remove(button);
            }
        }
    }

    /// One frame: pace, predict, latch, recognize, call the app, compose.
    fn step(&mut self) {
        let timebase = self.clock.timebase();
        let now_host = self.clock.now();
        let now_seconds = now_host.to_seconds(timebase);

        let mut tracer = match &mut self.trace_sink {
            Some(sink) => Tracer::new(sink.as_mut()),
            None => Tracer::none(),
        };

        // A fatal error preempts all frame work: warp the message and
        // nothing else until its window elapses.
        if self.compositor.kind() == PresentationKind::ErrorMessage {
            let outcome = self.compositor.submit(
                &self.last_frame,
                [TextureId(0); 2],
                now_seconds,
                now_host,
                &mut tracer,
            );
            if outcome == SubmitOutcome::ExitRequested {
                log::error!("error message window elapsed; exiting session");
                self.exiting = true;
            }
            return;
        }

        let timing = self.pacer.begin_frame(now_seconds);

        // Predicted ahead to roughly the midpoint of the display interval;
        // time warp corrects the rest, and the closer we get, the less
        // black is pulled in at the edges.
        let pose = self.pose_source.predict(timing.predict_seconds);

        let mut input = InputSnapshot::latch(&self.controls, &self.last_frame.input);
        let before = input.button_pressed;
        self.recognizer.update(&mut input, now_seconds);
        let synthesized = input.button_pressed & !before;

        let frame_id = self.last_frame.frame_id + 1;
        tracer.frame_begin(&FrameBeginEvent {
            frame_id,
            now: now_host,
            delta_seconds: timing.delta_seconds,
            predict_seconds: timing.predict_seconds,
        });
        if !synthesized.is_empty() {
            tracer.gesture(&GestureEvent {
                frame_id,
                synthesized,
            });
        }

        let frame = FrameState {
            frame_id,
            delta_seconds: timing.delta_seconds,
            pose,
            input,
        };
        self.last_frame = frame;

        let key_event = self.back_key.update(now_seconds);
        if key_event != BackKeyEvent::None {
            let consumed = self.app.on_back_key(key_event);
            if !consumed
                && matches!(key_event, BackKeyEvent::ShortPress | BackKeyEvent::LongPress)
            {
                log::info!("unconsumed back key {key_event:?}; exiting session");
                self.exiting = true;
                return;
            }
        }

        self.last_view = self.app.on_frame(&frame);
        let eye_textures = self.app.eye_buffers();

        if self.compositor.kind() == PresentationKind::LoadingIcon && self.app.is_content_ready()
        {
            self.compositor.content_ready();
        }

        let outcome =
            self.compositor
                .submit(&frame, eye_textures, now_seconds, now_host, &mut tracer);
        match outcome {
            SubmitOutcome::Presented => {
                if let Some(request) = self.compositor.last_request() {
                    self.app.on_composition_ready(request);
                }
            }
            SubmitOutcome::ExitRequested => self.exiting = true,
            SubmitOutcome::Dropped => {}
        }

        if let Some(report) = self.pacer.end_frame(now_seconds) {
            tracer.frame_rate(&FrameRateEvent {
                frames: report.frames,
            });
        }
    }
}

/// Maps a platform key code to its gamepad button bit.
fn button_for_key(code: i32) -> Option<ButtonFlags> {
    Some(match code {
        96 => ButtonFlags::A,
        97 => ButtonFlags::B,
        99 => ButtonFlags::X,
        100 => ButtonFlags::Y,
        108 => ButtonFlags::START,
        109 => ButtonFlags::SELECT,
        82 => ButtonFlags::MENU,
        103 => ButtonFlags::RIGHT_TRIGGER,
        102 => ButtonFlags::LEFT_TRIGGER,
        19 => ButtonFlags::DPAD_UP,
        20 => ButtonFlags::DPAD_DOWN,
        21 => ButtonFlags::DPAD_LEFT,
        22 => ButtonFlags::DPAD_RIGHT,
        200 => ButtonFlags::LSTICK_UP,
        201 => ButtonFlags::LSTICK_DOWN,
        202 => ButtonFlags::LSTICK_LEFT,
        203 => ButtonFlags::LSTICK_RIGHT,
        204 => ButtonFlags::RSTICK_UP,
        205 => ButtonFlags::RSTICK_DOWN,
        206 => ButtonFlags::RSTICK_LEFT,
        207 => ButtonFlags::RSTICK_RIGHT,
        _ => return None,
    })
}
