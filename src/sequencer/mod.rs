// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Sequencer core for scheduling and playing MIDI events.
//!
//! This module provides the core sequencing infrastructure:
//! - Event model with stable ids and deterministic ordering
//! - Part state machine with variants and boundary-deferred actions
//! - One-shot future-event scheduler for note releases
//! - Clip/scene containers
//! - The transport coordinator driving everything once per frame

pub mod clip;
pub mod engine;
pub mod event;
pub mod part;
pub mod scheduler;

pub use clip::{Clip, ClipEditor, Scene};
pub use engine::{MidiClockMode, Sequencer, UpdateSummary};
pub use event::{Event, EventAction, EventId, EventKind};
pub use part::{Part, PartUpdate, VARIANT_COUNT};
pub use scheduler::{FutureAction, FutureEvent, Scheduler};

use thiserror::Error;

/// Errors reported by the sequencer core.
///
/// Everything except `Midi` indicates a caller bug or an unsatisfied
/// precondition; none of these crash the frame loop.
#[derive(Debug, Error)]
pub enum SequencerError {
    /// `start` requires a MIDI output to be attached first
    #[error("no MIDI output attached")]
    NotReady,

    /// Delete of an event id not present in the active variant
    #[error("event {0:?} not present in the active variant")]
    UnknownEvent(EventId),

    #[error("variant index {0} out of range (0-9)")]
    InvalidVariant(usize),

    #[error("scene index {0} out of range")]
    InvalidScene(usize),

    #[error("clip index {0} out of range in the current scene")]
    InvalidClip(usize),

    #[error("MIDI channel {0} out of range (0-15)")]
    InvalidChannel(u8),

    #[error("part length must be at least one sixteenth step")]
    InvalidLength,

    /// The MIDI output failed to accept a message
    #[error(transparent)]
    Midi(#[from] anyhow::Error),
}
