// Copyright 2026 the Gyre Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The closed command union carried by the cross-thread queue.
//!
//! Producer threads describe work as a wire-level `(name, payload)` pair;
//! [`Command::decode`] converts that pair into the typed [`Command`] union
//! exactly once, at the queue boundary. Everything past the boundary matches
//! on typed fields, so a malformed payload is rejected in one place with a
//! [`DecodeError`] instead of being re-interpreted ad hoc at each call
//! site. Decoding always fails closed, in every build profile.

use alloc::string::String;
use alloc::vec::Vec;
use core::fmt;

/// An opaque native window/surface handle.
///
/// The render thread treats this as a token to hand back to the display
/// driver; it is never dereferenced by the pipeline.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct SurfaceHandle(pub usize);

impl fmt::Debug for SurfaceHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SurfaceHandle({:#x})", self.0)
    }
}

/// A wire-level command payload, as assembled by platform glue.
#[derive(Clone, Debug, PartialEq)]
pub enum Payload {
    /// No payload.
    None,
    /// A single integer.
    Int(i32),
    /// A single float.
    Float(f32),
    /// A string.
    Str(String),
    /// A list of values.
    Array(Vec<Payload>),
    /// An opaque pointer-sized handle.
    Pointer(usize),
}

impl Payload {
    /// Reads this value as a float, coercing integers the way the wire
    /// format always has.
    fn as_number(&self) -> Option<f32> {
        match *self {
            Self::Float(f) => Some(f),
            #[expect(
                clippy::cast_precision_loss,
                reason = "wire integers are small event codes and coordinates"
            )]
            Self::Int(i) => Some(i as f32),
            _ => None,
        }
    }

    /// Reads this value as an integer.
    fn as_int(&self) -> Option<i32> {
        match *self {
            Self::Int(i) => Some(i),
            _ => None,
        }
    }
}

/// A decoded, fully typed command.
///
/// Owned by the queue from post until dequeue; dropped after the consumer
/// finishes processing it.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Command {
    /// A native window surface was created or resized.
    SurfaceChanged(SurfaceHandle),
    /// The native window surface is gone.
    SurfaceDestroyed,
    /// The host activity lost foreground.
    Pause,
    /// The host activity regained foreground.
    Resume,
    /// A key event.
    Key {
        /// Platform key code.
        code: i32,
        /// Down (`true`) or up (`false`).
        down: bool,
        /// Auto-repeat count reported by the platform.
        repeat: i32,
    },
    /// A touchpad event.
    Touch {
        /// Platform motion action (0 = down, 1 = up, 2 = move).
        action: i32,
        /// Touchpad x, in touchpad units.
        x: f32,
        /// Touchpad y, in touchpad units.
        y: f32,
    },
    /// Analog stick axes.
    Joy {
        /// Left stick x.
        left_x: f32,
        /// Left stick y.
        left_y: f32,
        /// Right stick x.
        right_x: f32,
        /// Right stick y.
        right_y: f32,
    },
    /// No-op used by producers to rendezvous with the consumer via a
    /// synchronous send.
    Sync,
    /// Drain the queue and shut the render thread down.
    Quit,
}

impl Command {
    /// Returns the command's wire name.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::SurfaceChanged(_) => "surfaceChanged",
            Self::SurfaceDestroyed => "surfaceDestroyed",
            Self::Pause => "pause",
            Self::Resume => "resume",
            Self::Key { .. } => "key",
            Self::Touch { .. } => "touch",
            Self::Joy { .. } => "joy",
            Self::Sync => "sync",
            Self::Quit => "quit",
        }
    }

    /// Decodes a wire-level `(name, payload)` pair into a typed command.
    ///
    /// # Errors
    ///
    /// Returns a [`DecodeError`] for unknown names and for payloads of the
    /// wrong shape. No partial reads: a short array never decodes.
    pub fn decode(name: &str, payload: &Payload) -> Result<Self, DecodeError> {
        match name {
            "surfaceChanged" => match *payload {
                Payload::Pointer(handle) => Ok(Self::SurfaceChanged(SurfaceHandle(handle))),
                _ => Err(DecodeError::WrongType { index: 0 }),
            },
            "surfaceDestroyed" => expect_empty(payload, Self::SurfaceDestroyed),
            "pause" => expect_empty(payload, Self::Pause),
            "resume" => expect_empty(payload, Self::Resume),
            "sync" => expect_empty(payload, Self::Sync),
            "quit" => expect_empty(payload, Self::Quit),
            "key" => {
                let args = expect_array(payload, 3)?;
                Ok(Self::Key {
                    code: args[0].as_int().ok_or(DecodeError::WrongType { index: 0 })?,
                    down: args[1].as_int().ok_or(DecodeError::WrongType { index: 1 })? != 0,
                    repeat: args[2].as_int().ok_or(DecodeError::WrongType { index: 2 })?,
                })
            }
            "touch" => {
                let args = expect_array(payload, 3)?;
                Ok(Self::Touch {
                    action: args[0].as_int().ok_or(DecodeError::WrongType { index: 0 })?,
                    x: args[1]
                        .as_number()
                        .ok_or(DecodeError::WrongType { index: 1 })?,
                    y: args[2]
                        .as_number()
                        .ok_or(DecodeError::WrongType { index: 2 })?,
                })
            }
            "joy" => {
                let args = expect_array(payload, 4)?;
                let mut axes = [0.0_f32; 4];
                for (i, axis) in axes.iter_mut().enumerate() {
                    *axis = args[i]
                        .as_number()
                        .ok_or(DecodeError::WrongType { index: i })?;
                }
                Ok(Self::Joy {
                    left_x: axes[0],
                    left_y: axes[1],
                    right_x: axes[2],
                    right_y: axes[3],
                })
            }
            _ => Err(DecodeError::UnknownName),
        }
    }
}

fn expect_empty(payload: &Payload, command: Command) -> Result<Command, DecodeError> {
    match payload {
        Payload::None => Ok(command),
        _ => Err(DecodeError::WrongArity {
            expected: 0,
            found: 1,
        }),
    }
}

fn expect_array(payload: &Payload, expected: usize) -> Result<&[Payload], DecodeError> {
    match payload {
        Payload::Array(args) if args.len() == expected => Ok(args),
        Payload::Array(args) => Err(DecodeError::WrongArity {
            expected,
            found: args.len(),
        }),
        _ => Err(DecodeError::WrongArity { expected, found: 0 }),
    }
}

/// Why a wire-level payload failed to decode.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DecodeError {
    /// The command name is not part of the wire protocol.
    UnknownName,
    /// The payload had the wrong number of arguments.
    WrongArity {
        /// Arguments the command requires.
        expected: usize,
        /// Arguments actually present.
        found: usize,
    },
    /// An argument had the wrong type.
    WrongType {
        /// Index of the offending argument.
        index: usize,
    },
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownName => write!(f, "unknown command name"),
            Self::WrongArity { expected, found } => {
                write!(f, "wrong payload arity: expected {expected}, found {found}")
            }
            Self::WrongType { index } => write!(f, "wrong payload type at index {index}"),
        }
    }
}

impl core::error::Error for DecodeError {}
