// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Transport clock.
//!
//! Maps wall-clock time onto musical "running time" measured in sixteenth
//! notes, and derives a 24 PPQN MIDI clock pulse train for external sync.

use crate::midi::messages;

/// Pulses Per Quarter Note - MIDI standard is 24
pub const PPQN: u32 = 24;

const MIN_BPM: f64 = 20.0;
const MAX_BPM: f64 = 300.0;

/// Wall-clock to musical-time transport clock.
///
/// `advance` is the single place real elapsed time enters the sequencer;
/// everything downstream is a pure function of the running time it produces.
/// The pulse train keeps counting while the transport is stopped, as MIDI
/// clock consumers expect a continuous tick.
#[derive(Debug)]
pub struct Clock {
    /// Current tempo in BPM
    bpm: f64,
    /// Whether musical time is advancing
    running: bool,
    /// Accumulated wall-clock seconds since transport start
    wall_clock: f64,
    /// Elapsed sixteenth notes since transport start
    running_time: f64,
    /// Whether `floor(running_time)` changed on the last `advance`
    new_step: bool,
    /// Accumulated seconds driving the pulse train
    pulse_accum: f64,
    /// Absolute time (seconds) the next clock pulse is due
    next_pulse_due: f64,
    /// Reset running time to zero on `stop` (no resume-from-pause)
    reset_on_stop: bool,
}

impl Clock {
    /// Create a new clock at the specified tempo
    pub fn new(bpm: f64) -> Self {
        Self {
            bpm: bpm.clamp(MIN_BPM, MAX_BPM),
            running: false,
            wall_clock: 0.0,
            running_time: 0.0,
            new_step: false,
            pulse_accum: 0.0,
            next_pulse_due: 0.0,
            reset_on_stop: true,
        }
    }

    /// Get the current tempo in BPM
    pub fn bpm(&self) -> f64 {
        self.bpm
    }

    /// Set the tempo. Takes effect from the next pulse period onward; the
    /// pulse already scheduled keeps its absolute due time.
    pub fn set_bpm(&mut self, bpm: f64) {
        self.bpm = bpm.clamp(MIN_BPM, MAX_BPM);
    }

    /// Whether `stop` rewinds running time to zero.
    pub fn reset_on_stop(&self) -> bool {
        self.reset_on_stop
    }

    /// Configure the stop policy: `true` rewinds to zero (the default),
    /// `false` holds the position so a later `start` resumes from it.
    pub fn set_reset_on_stop(&mut self, reset: bool) {
        self.reset_on_stop = reset;
    }

    /// Whether musical time is advancing
    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Elapsed sixteenth notes since transport start
    pub fn running_time(&self) -> f64 {
        self.running_time
    }

    /// Current whole sixteenth-note step
    pub fn step(&self) -> u64 {
        self.running_time as u64
    }

    /// True iff the last `advance` crossed a sixteenth-note boundary.
    ///
    /// Computed once per `advance` and cached so every consumer within a
    /// frame sees the same answer.
    pub fn step_changed(&self) -> bool {
        self.new_step
    }

    /// Duration of one sixteenth note in seconds at the current tempo
    pub fn sixteenth_secs(&self) -> f64 {
        (60.0 / self.bpm) / 4.0
    }

    /// Interval between MIDI clock pulses in seconds at the current tempo
    pub fn pulse_interval(&self) -> f64 {
        (60.0 / self.bpm) / PPQN as f64
    }

    /// Start the transport - returns the MIDI Start message
    pub fn start(&mut self) -> [u8; 1] {
        self.running = true;
        [messages::START]
    }

    /// Stop the transport - returns the MIDI Stop message
    ///
    /// With the default stop policy the musical clock rewinds to zero, so a
    /// subsequent `start` plays from the loop beginning.
    pub fn stop(&mut self) -> [u8; 1] {
        self.running = false;
        self.new_step = false;
        if self.reset_on_stop {
            self.wall_clock = 0.0;
            self.running_time = 0.0;
        }
        [messages::STOP]
    }

    /// Advance the clock by `delta` wall-clock seconds.
    ///
    /// Musical time only moves while running; the pulse accumulator always
    /// moves. Returns the number of MIDI clock pulses that came due, which
    /// can be zero or several (a frame-rate hiccup must not drop pulses).
    /// Each pulse advances the schedule by exactly one period rather than
    /// resetting it to "now", so timing error never accumulates.
    pub fn advance(&mut self, delta: f64) -> u32 {
        if self.running {
            self.wall_clock += delta;
            let old_step = self.running_time as u64;
            self.running_time = self.wall_clock / self.sixteenth_secs();
            self.new_step = old_step != self.running_time as u64;
        } else {
            self.new_step = false;
        }

        self.pulse_accum += delta;
        let mut pulses = 0;
        while self.pulse_accum >= self.next_pulse_due {
            pulses += 1;
            self.next_pulse_due += self.pulse_interval();
        }
        pulses
    }
}

impl Default for Clock {
    fn default() -> Self {
        Self::new(120.0)
    }
}
