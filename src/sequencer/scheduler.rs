// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! One-shot future-event scheduler.
//!
//! Holds absolute-time callbacks independent of a part's repeating loop,
//! primarily the note-off completing a fired note. Entries are kept in
//! ascending due order via binary-search insertion and consumed exactly
//! once.

/// Action fired when a future event comes due.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FutureAction {
    /// Release a sounding note
    NoteOff { note: u8 },
    /// Send a control change (used by CC sweeps)
    ControlChange { controller: u8, value: u8 },
}

/// A one-shot event at an absolute running-time timestamp (unwrapped
/// sixteenths).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FutureEvent {
    pub due: f64,
    pub action: FutureAction,
}

/// Ascending queue of one-shot events.
#[derive(Debug, Default)]
pub struct Scheduler {
    entries: Vec<FutureEvent>,
}

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an event, keeping the queue sorted by due time. Entries with
    /// equal due times fire in insertion order.
    pub fn schedule(&mut self, due: f64, action: FutureAction) {
        let index = self.entries.partition_point(|e| e.due <= due);
        self.entries.insert(index, FutureEvent { due, action });
    }

    /// Remove and return every entry due at or before `now`, in due order.
    ///
    /// A frame-rate hiccup may make several entries due at once; all of
    /// them are returned, none dropped.
    pub fn drain_due(&mut self, now: f64) -> Vec<FutureEvent> {
        let count = self.entries.partition_point(|e| e.due <= now);
        self.entries.drain(..count).collect()
    }

    /// Remove every entry, returning the notes of pending note-offs.
    ///
    /// Used on stop: the returned notes must be silenced immediately, other
    /// pending actions are discarded unfired.
    pub fn flush_note_offs(&mut self) -> Vec<u8> {
        let notes = self
            .entries
            .iter()
            .filter_map(|e| match e.action {
                FutureAction::NoteOff { note } => Some(note),
                FutureAction::ControlChange { .. } => None,
            })
            .collect();
        self.entries.clear();
        notes
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Peek at the queue without consuming it.
    pub fn entries(&self) -> &[FutureEvent] {
        &self.entries
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schedule_keeps_ascending_order() {
        let mut scheduler = Scheduler::new();
        scheduler.schedule(4.0, FutureAction::NoteOff { note: 62 });
        scheduler.schedule(1.0, FutureAction::NoteOff { note: 60 });
        scheduler.schedule(2.5, FutureAction::NoteOff { note: 61 });

        let dues: Vec<f64> = scheduler.entries().iter().map(|e| e.due).collect();
        assert_eq!(dues, vec![1.0, 2.5, 4.0]);
    }

    #[test]
    fn test_drain_due_returns_all_due_entries() {
        let mut scheduler = Scheduler::new();
        scheduler.schedule(1.0, FutureAction::NoteOff { note: 60 });
        scheduler.schedule(2.0, FutureAction::NoteOff { note: 61 });
        scheduler.schedule(3.0, FutureAction::NoteOff { note: 62 });

        // Nothing due yet
        assert!(scheduler.drain_due(0.5).is_empty());
        assert_eq!(scheduler.len(), 3);

        // A large jump makes two entries due in the same call
        let due = scheduler.drain_due(2.5);
        assert_eq!(due.len(), 2);
        assert_eq!(due[0].action, FutureAction::NoteOff { note: 60 });
        assert_eq!(due[1].action, FutureAction::NoteOff { note: 61 });
        assert_eq!(scheduler.len(), 1);
    }

    #[test]
    fn test_drain_due_inclusive_boundary() {
        let mut scheduler = Scheduler::new();
        scheduler.schedule(2.0, FutureAction::NoteOff { note: 60 });

        let due = scheduler.drain_due(2.0);
        assert_eq!(due.len(), 1);
        assert!(scheduler.is_empty());
    }

    #[test]
    fn test_equal_due_times_fire_in_insertion_order() {
        let mut scheduler = Scheduler::new();
        scheduler.schedule(1.0, FutureAction::NoteOff { note: 60 });
        scheduler.schedule(1.0, FutureAction::NoteOff { note: 64 });
        scheduler.schedule(1.0, FutureAction::NoteOff { note: 67 });

        let due = scheduler.drain_due(1.0);
        let notes: Vec<u8> = due
            .iter()
            .map(|e| match e.action {
                FutureAction::NoteOff { note } => note,
                _ => unreachable!(),
            })
            .collect();
        assert_eq!(notes, vec![60, 64, 67]);
    }

    #[test]
    fn test_flush_note_offs() {
        let mut scheduler = Scheduler::new();
        scheduler.schedule(1.0, FutureAction::NoteOff { note: 60 });
        scheduler.schedule(
            2.0,
            FutureAction::ControlChange {
                controller: 1,
                value: 50,
            },
        );
        scheduler.schedule(3.0, FutureAction::NoteOff { note: 64 });

        let notes = scheduler.flush_note_offs();
        assert_eq!(notes, vec![60, 64]);
        assert!(scheduler.is_empty());
    }
}
