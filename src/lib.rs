// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! stepseq - a screen-based MIDI step sequencer engine.
//!
//! The crate provides the sequencer timing and event core: parts (fixed
//! length loops of MIDI events with switchable variants), a wall-clock to
//! musical-time transport, a one-shot future-event scheduler for note
//! releases, and the coordinator that drives everything once per frame and
//! emits MIDI clock for external gear. A view layer renders by querying
//! read-only state; the core never draws anything.

pub mod midi;
pub mod project;
pub mod sequencer;
pub mod timing;
