// Copyright 2026 the Gyre Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The bounded multi-producer, single-consumer command queue.
//!
//! [`command_queue`] returns a cloneable [`CommandSender`] for producer
//! threads and a unique [`CommandReceiver`] for the render thread. Commands
//! are delivered in strict FIFO order, exactly once.
//!
//! Capacity is sized generously; overflow means producer and consumer have
//! structurally diverged (the render thread stopped draining), which no
//! amount of backpressure can fix. [`CommandSender::post`] therefore fails
//! with a dump of the pending command names so the caller can abort with a
//! useful diagnostic instead of silently desynchronizing.
//!
//! [`CommandSender::send`] is the synchronous variant: it blocks the
//! calling producer until the consumer has finished executing that
//! specific command. Completion is tied to the [`Incoming`] guard the
//! consumer holds while processing, so "executed" means executed, not
//! merely dequeued.

use std::collections::VecDeque;
use std::sync::Arc;

use gyre_core::command::{Command, Payload};
use parking_lot::{Condvar, Mutex};
use thiserror::Error;

/// Queue capacity used by [`FrameScheduler`](crate::FrameScheduler) hosts.
///
/// A frame at 60 Hz drains the whole backlog, so this is roughly two
/// seconds of sustained input events.
pub const QUEUE_CAPACITY: usize = 128;

/// Why a command could not be enqueued.
#[derive(Debug, Error)]
pub enum PostError {
    /// The queue is full. Fatal by contract: the pending dump is for the
    /// abort diagnostic.
    #[error("command queue full ({capacity} pending): {pending:?}")]
    Full {
        /// Configured capacity.
        capacity: usize,
        /// Wire names of every pending command, oldest first.
        pending: Vec<&'static str>,
    },
    /// The queue is draining after a quit; only `Quit` is still accepted.
    #[error("command queue is draining")]
    Draining,
}

struct Completion {
    executed: Mutex<bool>,
    signal: Condvar,
}

impl Completion {
    fn wait(&self) {
        let mut executed = self.executed.lock();
        while !*executed {
            self.signal.wait(&mut executed);
        }
    }

    fn notify(&self) {
        let mut executed = self.executed.lock();
        *executed = true;
        self.signal.notify_all();
    }
}

struct Entry {
    command: Command,
    completion: Option<Arc<Completion>>,
}

struct State {
    entries: VecDeque<Entry>,
    draining: bool,
}

struct Shared {
    capacity: usize,
    state: Mutex<State>,
    posted: Condvar,
}

impl Shared {
    fn enqueue(&self, command: Command, completion: Option<Arc<Completion>>) -> Result<(), PostError> {
        {
            let mut state = self.state.lock();
            if state.draining && !matches!(command, Command::Quit) {
                return Err(PostError::Draining);
            }
            if state.entries.len() >= self.capacity {
                let pending = state.entries.iter().map(|e| e.command.name()).collect();
                return Err(PostError::Full {
                    capacity: self.capacity,
                    pending,
                });
            }
            state.entries.push_back(Entry {
                command,
                completion,
            });
        }
        self.posted.notify_one();
        Ok(())
    }
}

/// Creates a command queue with the given capacity.
///
/// The receiver is the single consumer; senders may be cloned freely across
/// producer threads.
#[must_use]
pub fn command_queue(capacity: usize) -> (CommandSender, CommandReceiver) {
    let shared = Arc::new(Shared {
        capacity: capacity.max(1),
        state: Mutex::new(State {
            entries: VecDeque::with_capacity(capacity.max(1)),
            draining: false,
        }),
        posted: Condvar::new(),
    });
    (
        CommandSender {
            shared: Arc::clone(&shared),
        },
        CommandReceiver { shared },
    )
}

/// Producer handle; cloneable and thread safe.
#[derive(Clone)]
pub struct CommandSender {
    shared: Arc<Shared>,
}

impl std::fmt::Debug for CommandSender {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandSender").finish_non_exhaustive()
    }
}

impl CommandSender {
    /// Enqueues a command without blocking.
    ///
    /// # Errors
    ///
    /// [`PostError::Full`] when the queue is out of space (fatal by
    /// contract) and [`PostError::Draining`] after [`Self::quit`].
    pub fn post(&self, command: Command) -> Result<(), PostError> {
        self.shared.enqueue(command, None)
    }

    /// Enqueues a command and blocks until the consumer has finished
    /// executing it.
    ///
    /// Used when the producer needs a synchronous result, e.g. creating a
    /// named GPU resource before continuing.
    ///
    /// # Errors
    ///
    /// Same as [`Self::post`]; on error the command was never enqueued and
    /// this returns without blocking.
    pub fn send(&self, command: Command) -> Result<(), PostError> {
        let completion = Arc::new(Completion {
            executed: Mutex::new(false),
            signal: Condvar::new(),
        });
        self.shared
            .enqueue(command, Some(Arc::clone(&completion)))?;
        completion.wait();
        Ok(())
    }

    /// Decodes a wire-level `(name, payload)` pair and posts the result.
    ///
    /// This is the decode boundary for platform glue that still works in
    /// wire terms. Malformed payloads fail closed in every build profile:
    /// the error is logged at warn level and the command is dropped, never
    /// partially read.
    ///
    /// # Errors
    ///
    /// Same as [`Self::post`]. A decode failure is a drop, not an error.
    pub fn post_wire(&self, name: &str, payload: &Payload) -> Result<(), PostError> {
        match Command::decode(name, payload) {
            Ok(command) => self.post(command),
            Err(error) => {
                log::warn!("dropping malformed {name:?} command: {error}");
                Ok(())
            }
        }
    }

    /// Marks the queue as draining and enqueues [`Command::Quit`].
    ///
    /// Already-queued commands still execute; any later non-quit post is
    /// rejected with [`PostError::Draining`].
    ///
    /// # Errors
    ///
    /// [`PostError::Full`] if even the quit command cannot be queued.
    pub fn quit(&self) -> Result<(), PostError> {
        self.shared.state.lock().draining = true;
        self.shared.enqueue(Command::Quit, None)
    }
}

/// A dequeued command, held by the consumer while processing.
///
/// If the producer used [`CommandSender::send`], dropping this guard is
/// what signals completion, so keep it alive until the command's effects
/// are in place.
pub struct Incoming {
    command: Command,
    completion: Option<Arc<Completion>>,
}

impl std::fmt::Debug for Incoming {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Incoming")
            .field("command", &self.command)
            .field("synchronized", &self.completion.is_some())
            .finish()
    }
}

impl Incoming {
    /// The decoded command.
    #[must_use]
    pub fn command(&self) -> &Command {
        &self.command
    }
}

impl Drop for Incoming {
    fn drop(&mut self) {
        if let Some(completion) = self.completion.take() {
            completion.notify();
        }
    }
}

/// Consumer handle; owned by the render thread alone.
pub struct CommandReceiver {
    shared: Arc<Shared>,
}

impl std::fmt::Debug for CommandReceiver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandReceiver").finish_non_exhaustive()
    }
}

impl CommandReceiver {
    /// Dequeues the next command without blocking; `None` when the queue is
    /// empty, so the consumer can drain the whole backlog before deciding
    /// whether to idle.
    #[must_use]
    pub fn next(&mut self) -> Option<Incoming> {
        let entry = self.shared.state.lock().entries.pop_front()?;
        Some(Incoming {
            command: entry.command,
            completion: entry.completion,
        })
    }

    /// Blocks until at least one command is available.
    ///
    /// The only blocking point of the render loop's steady state; call it
    /// only when there is nothing else useful to do (no surface, or
    /// paused).
    pub fn wait(&mut self) {
        let mut state = self.shared.state.lock();
        while state.entries.is_empty() {
            self.shared.posted.wait(&mut state);
        }
    }
}
