// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Part playback state machine.
//!
//! A part is a named, channel-bound, fixed-length loop of MIDI events with
//! up to ten switchable variants. Each update tick it fires due events,
//! drains its one-shot future queue (note releases, CC sweeps), and detects
//! loop-boundary crossings. Structural changes requested mid-loop - mute
//! flips, variant switches, scene switches - are deferred to the next
//! boundary crossing so playback never tears mid-measure.

use tracing::warn;

use super::event::{Event, EventAction, EventId, EventKind};
use super::scheduler::{FutureAction, FutureEvent, Scheduler};
use super::SequencerError;
use crate::midi::{messages, MidiOutput};

/// Number of variants every part carries
pub const VARIANT_COUNT: usize = 10;

/// Outcome of a part update tick.
#[derive(Debug, Clone, Copy, Default)]
pub struct PartUpdate {
    /// The part crossed its loop boundary this tick
    pub crossed_boundary: bool,
    /// The part crossed its boundary while a scene switch was pending;
    /// the coordinator should perform the switch now
    pub take_scene_switch: bool,
}

/// A fixed-length, multi-variant loop of scheduled MIDI events.
///
/// Timestamps are measured in sixteenth notes within `[0, length)`.
#[derive(Debug)]
pub struct Part {
    name: String,
    /// Loop period in sixteenth-note slots
    length: u32,
    /// MIDI channel 0-15
    channel: u8,
    /// Bank select, 0 = none, else bank - 1 is sent on CC 32
    bank: u8,
    /// Program select, 0 = none, else program - 1 is sent
    program: u8,
    variants: [Vec<Event>; VARIANT_COUNT],
    /// Active variant index
    variant: usize,
    /// Next event id to hand out
    next_id: u64,
    /// One-shot events at absolute running-time stamps
    future: Scheduler,
    mute: bool,
    /// Mute flip armed, applied at the next boundary crossing
    toggle_armed: bool,
    /// Variant switch armed, applied at the next boundary crossing
    pending_variant: Option<usize>,
    /// Index of the last fired event, `None` before the first
    cursor: Option<usize>,
    /// Timestamp of the event after the cursor (wrapping)
    next_timestamp: f64,
    /// The last event in the loop has fired and the cursor has not wrapped
    finished: bool,
    /// Measure counter at the previous tick, for edge-triggered boundary
    /// detection
    last_measure: i64,
}

impl Part {
    /// Create a new empty part.
    pub fn new(name: impl Into<String>, length: u32, channel: u8) -> Self {
        Self {
            name: name.into(),
            length: length.max(1),
            channel: channel.min(15),
            bank: 0,
            program: 0,
            variants: Default::default(),
            variant: 0,
            next_id: 0,
            future: Scheduler::new(),
            mute: false,
            toggle_armed: false,
            pending_variant: None,
            cursor: None,
            next_timestamp: 0.0,
            // empty active variant: permanently finished until events arrive
            finished: true,
            last_measure: -1,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    /// Loop period in sixteenth-note slots
    pub fn length(&self) -> u32 {
        self.length
    }

    pub fn channel(&self) -> u8 {
        self.channel
    }

    pub fn bank(&self) -> u8 {
        self.bank
    }

    /// Set the bank select state. 0 disables the bank-select message.
    pub fn set_bank(&mut self, bank: u8) {
        self.bank = bank.min(128);
    }

    pub fn program(&self) -> u8 {
        self.program
    }

    /// Set the program select state. 0 disables the program-change message.
    pub fn set_program(&mut self, program: u8) {
        self.program = program.min(128);
    }

    /// Active variant index
    pub fn variant(&self) -> usize {
        self.variant
    }

    pub fn pending_variant(&self) -> Option<usize> {
        self.pending_variant
    }

    pub fn is_muted(&self) -> bool {
        self.mute
    }

    pub fn is_toggle_armed(&self) -> bool {
        self.toggle_armed
    }

    /// True once the last event in the loop has fired and the cursor has
    /// not wrapped yet. A part with an empty active variant is permanently
    /// finished.
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Events of the active variant, sorted by timestamp.
    pub fn events(&self) -> &[Event] {
        &self.variants[self.variant]
    }

    /// Events of the active variant matching `kind`.
    pub fn events_of_kind(&self, kind: EventKind) -> impl Iterator<Item = &Event> {
        self.events().iter().filter(move |e| e.action.kind() == kind)
    }

    /// Events of an arbitrary variant, for serialization and editors.
    pub fn variant_events(&self, variant: usize) -> Option<&[Event]> {
        self.variants.get(variant).map(|v| v.as_slice())
    }

    /// Pending one-shot events, ascending by due time.
    pub fn future_events(&self) -> &[FutureEvent] {
        self.future.entries()
    }

    /// Position of the playhead within the loop for a given running time.
    pub fn loop_position(&self, running_time: f64) -> f64 {
        running_time % self.length as f64
    }

    /// Start playback from the loop beginning.
    ///
    /// With `program_change` set, the part's bank/program select state is
    /// sent first. Variant switches restart with `program_change = false`
    /// since the patch is already configured.
    pub fn start(
        &mut self,
        program_change: bool,
        out: &mut dyn MidiOutput,
    ) -> Result<(), SequencerError> {
        self.finished = false;
        self.last_measure = -1;
        self.cursor = None;

        if program_change {
            if self.bank > 0 {
                out.send_short(
                    messages::CONTROL_CHANGE | self.channel,
                    messages::CC_BANK_SELECT_LSB,
                    self.bank - 1,
                )?;
            }
            if self.program > 0 {
                out.send(&[messages::PROGRAM_CHANGE | self.channel, self.program - 1])?;
            }
        }

        match self.events().first() {
            Some(event) => self.next_timestamp = event.timestamp,
            None => self.finished = true,
        }
        Ok(())
    }

    /// Stop all output: silence every note implied by pending future
    /// events, then kill anything still sounding on the channel.
    ///
    /// This is the only path that guarantees no hung notes. Send failures
    /// here are logged and swallowed so shutdown is never blocked.
    pub fn stop(&mut self, out: &mut dyn MidiOutput) {
        self.halt(true, out);
    }

    /// Stop output without the channel-wide kill. Used for variant and
    /// scene handoffs where the channel keeps playing.
    pub(crate) fn halt(&mut self, kill_all: bool, out: &mut dyn MidiOutput) {
        for note in self.future.flush_note_offs() {
            if let Err(e) = out.send_short(messages::NOTE_OFF | self.channel, note, 0) {
                warn!("note-off failed during stop cleanup: {e:#}");
            }
        }
        if kill_all {
            if let Err(e) = out.send_short(
                messages::CONTROL_CHANGE | self.channel,
                messages::CC_ALL_SOUND_OFF,
                127,
            ) {
                warn!("all-sound-off failed during stop cleanup: {e:#}");
            }
        }
    }

    /// Mute or unmute immediately. Muting stops output at once so nothing
    /// keeps sounding under the mute.
    pub fn set_mute(&mut self, mute: bool, out: &mut dyn MidiOutput) {
        if mute {
            self.halt(true, out);
        }
        self.mute = mute;
    }

    /// Arm a mute flip to be applied at the next boundary crossing.
    pub fn arm_toggle(&mut self) {
        self.toggle_armed = true;
    }

    /// Request a variant switch, applied at the next boundary crossing.
    pub fn switch_variant(&mut self, target: usize) -> Result<(), SequencerError> {
        if target >= VARIANT_COUNT {
            return Err(SequencerError::InvalidVariant(target));
        }
        self.pending_variant = Some(target);
        Ok(())
    }

    /// Switch the active variant immediately, recomputing the cursor
    /// against the given running time. Intended for project loading and
    /// editors while the transport is stopped; live switching goes through
    /// [`Part::switch_variant`].
    pub fn set_variant(&mut self, target: usize, running_time: f64) -> Result<(), SequencerError> {
        if target >= VARIANT_COUNT {
            return Err(SequencerError::InvalidVariant(target));
        }
        self.variant = target;
        self.resort(running_time);
        Ok(())
    }

    /// Change the MIDI channel, silencing the old channel first.
    pub fn set_channel(
        &mut self,
        channel: u8,
        out: &mut dyn MidiOutput,
    ) -> Result<(), SequencerError> {
        if channel > 15 {
            return Err(SequencerError::InvalidChannel(channel));
        }
        self.halt(true, out);
        self.channel = channel;
        Ok(())
    }

    /// Change the loop period. Events at or beyond the new length are
    /// dropped from every variant.
    pub fn set_length(&mut self, length: u32, running_time: f64) -> Result<(), SequencerError> {
        if length == 0 {
            return Err(SequencerError::InvalidLength);
        }
        for events in self.variants.iter_mut() {
            events.retain(|e| e.timestamp < length as f64);
        }
        self.length = length;
        self.resort(running_time);
        Ok(())
    }

    /// Append an event to the active variant. The timestamp is normalized
    /// modulo the part length; out-of-range values are never rejected.
    pub fn append(&mut self, timestamp: f64, action: EventAction, running_time: f64) -> EventId {
        self.push_event(self.variant, timestamp, action, running_time)
    }

    /// Insert an event into any variant, normalizing its timestamp.
    pub fn insert_event(
        &mut self,
        variant: usize,
        timestamp: f64,
        action: EventAction,
        running_time: f64,
    ) -> Result<EventId, SequencerError> {
        if variant >= VARIANT_COUNT {
            return Err(SequencerError::InvalidVariant(variant));
        }
        Ok(self.push_event(variant, timestamp, action, running_time))
    }

    fn push_event(
        &mut self,
        variant: usize,
        timestamp: f64,
        action: EventAction,
        running_time: f64,
    ) -> EventId {
        let id = EventId(self.next_id);
        self.next_id += 1;
        let timestamp = timestamp.rem_euclid(self.length as f64);
        self.variants[variant].push(Event::new(id, timestamp, action));
        if variant == self.variant {
            self.resort(running_time);
        } else {
            self.variants[variant].sort();
        }
        id
    }

    /// Delete an event from the active variant by id.
    ///
    /// Deleting an id that is not present is a caller bug and reported as
    /// an error, never silently ignored.
    pub fn delete(&mut self, id: EventId, running_time: f64) -> Result<Event, SequencerError> {
        let events = &mut self.variants[self.variant];
        let index = events
            .iter()
            .position(|e| e.id == id)
            .ok_or(SequencerError::UnknownEvent(id))?;
        let removed = events.remove(index);
        self.resort(running_time);
        Ok(removed)
    }

    /// Transpose all note events of the active variant, clamping to the
    /// MIDI note range.
    pub fn transpose(&mut self, semitones: i8) {
        for event in self.variants[self.variant].iter_mut() {
            match &mut event.action {
                EventAction::NoteOn { note, .. } | EventAction::NoteOff { note } => {
                    *note = (*note as i16 + semitones as i16).clamp(0, 127) as u8;
                }
                EventAction::ControlChange { .. } => {}
            }
        }
    }

    /// Schedule a linear controller ramp from `from` towards `to` (end
    /// value exclusive) spread over `duration` sixteenths, starting now.
    pub fn sweep_cc(&mut self, controller: u8, from: u8, to: u8, duration: f64, running_time: f64) {
        let steps = from.abs_diff(to) as u32;
        if steps == 0 || duration <= 0.0 {
            return;
        }
        let interval = duration / steps as f64;
        for k in 0..steps {
            let value = if to > from {
                from + k as u8
            } else {
                from - k as u8
            };
            self.future.schedule(
                running_time + k as f64 * interval,
                FutureAction::ControlChange { controller, value },
            );
        }
    }

    /// Update the part for one tick of a running transport: drain due
    /// future events, handle a loop-boundary crossing, then fire due loop
    /// events.
    ///
    /// At most one deferred structural change is applied per crossing, in
    /// fixed priority order: mute flip, scene switch (reported to the
    /// coordinator via the returned [`PartUpdate`]), variant switch. A part
    /// with no events still performs deferred actions on every rollover.
    pub fn update(
        &mut self,
        running_time: f64,
        scene_pending: bool,
        out: &mut dyn MidiOutput,
    ) -> Result<PartUpdate, SequencerError> {
        let position = self.loop_position(running_time);
        let measure = (running_time / self.length as f64) as i64;
        let mut update = PartUpdate::default();

        for entry in self.future.drain_due(running_time) {
            self.fire_future(entry.action, out)?;
        }

        if self.finished && measure != self.last_measure {
            update.crossed_boundary = true;
            if self.toggle_armed {
                self.toggle_armed = false;
                let mute = !self.mute;
                self.set_mute(mute, out);
            } else if scene_pending {
                update.take_scene_switch = true;
            } else if let Some(target) = self.pending_variant.take() {
                self.change_variant(target, out)?;
            }
            self.finished = self.events().is_empty();
        }
        self.last_measure = measure;

        // A frame-rate hiccup can make several timestamps due at once;
        // every due group fires, none are skipped.
        while !self.finished && position >= self.next_timestamp {
            self.trigger_due(running_time, out)?;
        }
        Ok(update)
    }

    /// Apply an armed variant switch: stop output without killing the
    /// channel, swap variants, restart without re-sending the patch.
    fn change_variant(
        &mut self,
        target: usize,
        out: &mut dyn MidiOutput,
    ) -> Result<(), SequencerError> {
        self.halt(false, out);
        self.variant = target;
        self.start(false, out)
    }

    /// Fire every event sharing the due timestamp, advancing the cursor.
    fn trigger_due(
        &mut self,
        running_time: f64,
        out: &mut dyn MidiOutput,
    ) -> Result<(), SequencerError> {
        let count = self.events().len();
        let mut play = self.cursor.map_or(0, |c| (c + 1) % count);

        while self.variants[self.variant][play].timestamp == self.next_timestamp && !self.finished {
            if !self.mute {
                let action = self.variants[self.variant][play].action;
                self.fire(action, running_time, out)?;
            }
            self.cursor = Some(play);
            if play == count - 1 {
                self.finished = true;
            }
            play = (play + 1) % count;
        }
        self.next_timestamp = self.variants[self.variant][play].timestamp;
        Ok(())
    }

    fn fire(
        &mut self,
        action: EventAction,
        running_time: f64,
        out: &mut dyn MidiOutput,
    ) -> Result<(), SequencerError> {
        match action {
            EventAction::NoteOn {
                note,
                velocity,
                length,
            } => {
                out.send_short(messages::NOTE_ON | self.channel, note, velocity)?;
                self.future
                    .schedule(running_time + length, FutureAction::NoteOff { note });
            }
            EventAction::NoteOff { note } => {
                out.send_short(messages::NOTE_OFF | self.channel, note, 0)?;
            }
            EventAction::ControlChange { controller, value } => {
                out.send_short(messages::CONTROL_CHANGE | self.channel, controller, value)?;
            }
        }
        Ok(())
    }

    fn fire_future(
        &mut self,
        action: FutureAction,
        out: &mut dyn MidiOutput,
    ) -> Result<(), SequencerError> {
        match action {
            FutureAction::NoteOff { note } => {
                out.send_short(messages::NOTE_OFF | self.channel, note, 0)?;
            }
            FutureAction::ControlChange { controller, value } => {
                out.send_short(messages::CONTROL_CHANGE | self.channel, controller, value)?;
            }
        }
        Ok(())
    }

    /// Re-sort the active variant and recompute the cursor against the
    /// current transport position, so playback resumes without re-firing
    /// or skipping events already passed this loop.
    fn resort(&mut self, running_time: f64) {
        self.variants[self.variant].sort();

        let events = &self.variants[self.variant];
        if events.is_empty() {
            self.cursor = None;
            self.next_timestamp = 0.0;
            self.finished = true;
            return;
        }

        let position = running_time % self.length as f64;
        let mut cursor = None;
        for (i, event) in events.iter().enumerate() {
            if event.timestamp < position {
                cursor = Some(i);
            }
        }
        let next = cursor.map_or(0, |c| (c + 1) % events.len());

        self.next_timestamp = events[next].timestamp;
        self.cursor = cursor;
        self.finished = events.last().map_or(true, |e| position > e.timestamp);
    }
}
