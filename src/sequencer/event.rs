// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Event model for part playback.
//!
//! Timestamps are measured in sixteenth notes, relative to the owning
//! part's loop. Events are ordered by timestamp with the insertion id as
//! the deterministic tie-break, so simultaneous events (chords) fire in
//! the order they were recorded.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

/// Stable identifier for an event within its part.
///
/// Ids are handed out in insertion order and never reused, so editors can
/// delete by id instead of matching positions in a list that may have been
/// re-sorted underneath them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EventId(pub u64);

/// What an event does when it fires.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EventAction {
    /// Sound a note and schedule its release `length` sixteenths later
    NoteOn { note: u8, velocity: u8, length: f64 },
    /// Release a note
    NoteOff { note: u8 },
    /// Send a control change
    ControlChange { controller: u8, value: u8 },
}

/// Discriminant of an [`EventAction`], for filtered queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    NoteOn,
    NoteOff,
    ControlChange,
}

impl EventAction {
    pub fn kind(&self) -> EventKind {
        match self {
            EventAction::NoteOn { .. } => EventKind::NoteOn,
            EventAction::NoteOff { .. } => EventKind::NoteOff,
            EventAction::ControlChange { .. } => EventKind::ControlChange,
        }
    }
}

/// A scheduled action within a part's loop.
#[derive(Debug, Clone)]
pub struct Event {
    /// Identity within the owning part
    pub id: EventId,
    /// Position in the loop, in sixteenth notes, within `[0, part.length)`
    pub timestamp: f64,
    /// Action fired when the play cursor passes `timestamp`
    pub action: EventAction,
}

impl Event {
    pub fn new(id: EventId, timestamp: f64, action: EventAction) -> Self {
        Self {
            id,
            timestamp,
            action,
        }
    }

    /// Note number for note events, `None` for anything else.
    pub fn note(&self) -> Option<u8> {
        match self.action {
            EventAction::NoteOn { note, .. } | EventAction::NoteOff { note } => Some(note),
            EventAction::ControlChange { .. } => None,
        }
    }
}

impl PartialEq for Event {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id && self.timestamp == other.timestamp
    }
}

impl Eq for Event {}

impl Ord for Event {
    fn cmp(&self, other: &Self) -> Ordering {
        self.timestamp
            .total_cmp(&other.timestamp)
            .then(self.id.cmp(&other.id))
    }
}

impl PartialOrd for Event {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
