// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! MIDI output abstraction layer.
//!
//! This module provides a trait-based abstraction for MIDI output, allowing
//! different backends (midir, in-memory buffers for tests) to be used
//! interchangeably. The sequencer core only ever talks to the `MidiOutput`
//! trait; device enumeration and selection live in the backend module and
//! the CLI.

pub mod midir_backend;

use std::sync::{Arc, Mutex};

use anyhow::Result;

pub use midir_backend::{list_ports, print_ports, MidirOutput};

/// Trait for MIDI output implementations.
///
/// Backends accept raw MIDI bytes; the caller is responsible for producing
/// well-formed messages (see the [`messages`] constants).
pub trait MidiOutput: Send {
    /// Send a MIDI message immediately.
    ///
    /// # Arguments
    /// * `message` - Raw MIDI bytes (e.g., `[0x90, 60, 127]` for Note On)
    fn send(&mut self, message: &[u8]) -> Result<()>;

    /// Send a three-byte channel voice message.
    fn send_short(&mut self, status: u8, data1: u8, data2: u8) -> Result<()> {
        self.send(&[status, data1, data2])
    }

    /// Send a single-byte system realtime message (clock, start, stop).
    fn send_realtime(&mut self, message: u8) -> Result<()> {
        self.send(&[message])
    }
}

/// MIDI message constants
pub mod messages {
    // Channel Voice Messages (upper nibble, lower nibble is channel 0-15)
    pub const NOTE_OFF: u8 = 0x80;
    pub const NOTE_ON: u8 = 0x90;
    pub const POLY_AFTERTOUCH: u8 = 0xA0;
    pub const CONTROL_CHANGE: u8 = 0xB0;
    pub const PROGRAM_CHANGE: u8 = 0xC0;
    pub const CHANNEL_AFTERTOUCH: u8 = 0xD0;
    pub const PITCH_BEND: u8 = 0xE0;

    // System Real-Time Messages
    pub const TIMING_CLOCK: u8 = 0xF8;
    pub const START: u8 = 0xFA;
    pub const CONTINUE: u8 = 0xFB;
    pub const STOP: u8 = 0xFC;

    // Controller numbers with dedicated roles
    pub const CC_BANK_SELECT_LSB: u8 = 32;
    pub const CC_ALL_SOUND_OFF: u8 = 120;
}

/// In-memory MIDI output that records every message it receives.
///
/// Cloning shares the underlying buffer, so a clone kept by a test can
/// inspect messages after the original has been boxed into the sequencer.
#[derive(Clone, Default)]
pub struct BufferOutput {
    messages: Arc<Mutex<Vec<Vec<u8>>>>,
}

impl BufferOutput {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of all messages sent so far.
    pub fn messages(&self) -> Vec<Vec<u8>> {
        self.messages.lock().unwrap().clone()
    }

    /// Discard recorded messages.
    pub fn clear(&self) {
        self.messages.lock().unwrap().clear();
    }
}

impl MidiOutput for BufferOutput {
    fn send(&mut self, message: &[u8]) -> Result<()> {
        self.messages.lock().unwrap().push(message.to_vec());
        Ok(())
    }
}
