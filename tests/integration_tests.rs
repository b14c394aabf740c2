// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Integration tests for stepseq
//!
//! These tests drive the whole engine - coordinator, clock, parts, future
//! events - through the public API against an in-memory MIDI output.

use stepseq::midi::{BufferOutput, MidiOutput};
use stepseq::project::Project;
use stepseq::sequencer::{
    Clip, EventAction, MidiClockMode, Part, Scene, Sequencer, SequencerError,
};

fn note_on(note: u8, length: f64) -> EventAction {
    EventAction::NoteOn {
        note,
        velocity: 100,
        length,
    }
}

/// Sequencer with one scene holding the given part, clock mode Off so note
/// assertions are not interleaved with pulse bytes. 120 BPM: one sixteenth
/// is 0.125s.
fn sequencer_with(part: Part, buffer: &BufferOutput) -> Sequencer {
    let scene = Scene::new("A").with_clip(Clip::grid(part));
    let mut seq = Sequencer::with_scenes(120.0, MidiClockMode::Off, vec![scene]);
    seq.set_output(Box::new(buffer.clone()));
    seq
}

fn note_on_bytes(buffer: &BufferOutput) -> Vec<u8> {
    buffer
        .messages()
        .iter()
        .filter(|m| m[0] & 0xF0 == 0x90)
        .map(|m| m[1])
        .collect()
}

/// Loop consistency: one full loop period fires every event exactly once,
/// in ascending timestamp order.
#[test]
fn test_full_loop_fires_every_event_once() {
    let buffer = BufferOutput::new();
    let mut part = Part::new("Lead", 8, 0);
    for (step, note) in [(0.0, 60), (2.0, 62), (4.0, 64), (6.0, 65)] {
        part.append(step, note_on(note, 1.0), 0.0);
    }
    let mut seq = sequencer_with(part, &buffer);

    seq.start().unwrap();
    // Drive one loop of 8 sixteenths (stopping short of the wrap) in 10ms
    // frames
    for _ in 0..95 {
        seq.update(0.01).unwrap();
    }

    assert_eq!(note_on_bytes(&buffer), vec![60, 62, 64, 65]);
}

/// Driving the same pattern for three loop periods fires it three times.
#[test]
fn test_loop_repeats_across_measures() {
    let buffer = BufferOutput::new();
    let mut part = Part::new("Lead", 4, 0);
    part.append(0.0, note_on(60, 0.5), 0.0);
    part.append(2.0, note_on(64, 0.5), 0.0);
    let mut seq = sequencer_with(part, &buffer);

    seq.start().unwrap();
    for _ in 0..145 {
        seq.update(0.01).unwrap(); // 1.45s = 11.6 sixteenths, three loops in
    }

    assert_eq!(note_on_bytes(&buffer), vec![60, 64, 60, 64, 60, 64]);
}

/// Reference scenario: length 4, NoteOn@0 and NoteOff@2.
#[test]
fn test_note_on_off_scenario() {
    let buffer = BufferOutput::new();
    let mut part = Part::new("Lead", 4, 0);
    part.append(0.0, note_on(60, 1.0), 0.0);
    part.append(2.0, EventAction::NoteOff { note: 60 }, 0.0);
    let mut seq = sequencer_with(part, &buffer);

    seq.start().unwrap();
    // Advance past timestamp 2 in one large frame; nothing may be skipped
    seq.update(0.3).unwrap(); // rt = 2.4
    {
        let part = &seq.current().clips()[0].part;
        assert!(part.is_finished());
    }
    let messages = buffer.messages();
    assert_eq!(messages[0], vec![0x90, 60, 100]);
    assert_eq!(messages[1], vec![0x80, 60, 0]);

    // Past the loop wrap the pattern starts over
    seq.update(0.3).unwrap(); // rt = 4.8
    assert_eq!(note_on_bytes(&buffer), vec![60, 60]);
}

/// Stop must immediately release notes whose note-off is still pending.
#[test]
fn test_stop_releases_hung_notes() {
    let buffer = BufferOutput::new();
    let mut part = Part::new("Pad", 16, 5);
    part.append(0.0, note_on(48, 4.0), 0.0);
    let mut seq = sequencer_with(part, &buffer);

    seq.start().unwrap();
    seq.update(0.01).unwrap();
    assert_eq!(note_on_bytes(&buffer), vec![48]);
    buffer.clear();

    // Stop well before the release at step 4 comes due
    seq.stop();

    let messages = buffer.messages();
    assert_eq!(messages[0], vec![0x80 | 5, 48, 0]);
    assert_eq!(messages[1], vec![0xB0 | 5, 120, 127]);
    assert!(!seq.is_running());
    assert_eq!(seq.running_time(), 0.0);
}

/// Boundary deferral: a mute requested mid-loop leaves the rest of the
/// loop audible and silences from the next loop start.
#[test]
fn test_mute_request_defers_to_boundary() {
    let buffer = BufferOutput::new();
    let mut part = Part::new("Lead", 4, 0);
    part.append(1.0, note_on(60, 0.5), 0.0);
    part.append(3.0, note_on(62, 0.5), 0.0);
    let mut seq = sequencer_with(part, &buffer);

    seq.start().unwrap();
    seq.update(0.01).unwrap();
    seq.request_mute(0).unwrap();

    // Finish this loop and play the next one
    for _ in 0..100 {
        seq.update(0.01).unwrap();
    }

    // Only the first loop's two notes made it out
    assert_eq!(note_on_bytes(&buffer), vec![60, 62]);
    assert!(seq.current().clips()[0].part.is_muted());
}

/// MIDI clock: 120 BPM for one quarter note is 24 pulses; the pulse train
/// stays phase-locked over repeated frames.
#[test]
fn test_midi_clock_pulse_rate() {
    let buffer = BufferOutput::new();
    let scene = Scene::new("A");
    let mut seq = Sequencer::with_scenes(120.0, MidiClockMode::Send, vec![scene]);
    seq.set_output(Box::new(buffer.clone()));

    // 2.05 seconds in uneven frame sizes; at 120 BPM the pulse rate is
    // 48/s, so pulses are due at k/48 for k = 0..=98
    for _ in 0..100 {
        seq.update(0.013).unwrap();
    }
    for _ in 0..75 {
        seq.update(0.01).unwrap();
    }

    let pulses = buffer
        .messages()
        .iter()
        .filter(|m| m[0] == 0xF8)
        .count();
    assert_eq!(pulses, 99);
}

/// Scene switching is executed by the first part reaching its boundary,
/// and the old scene's pending releases are not leaked.
#[test]
fn test_scene_switch_hands_over_cleanly() {
    let buffer = BufferOutput::new();

    let mut bass = Part::new("Bass", 4, 0);
    bass.append(0.0, note_on(36, 8.0), 0.0); // release far in the future
    let mut pad = Part::new("Pad", 4, 1);
    pad.append(0.0, note_on(72, 1.0), 0.0);

    let scene_a = Scene::new("A").with_clip(Clip::grid(bass));
    let scene_b = Scene::new("B").with_clip(Clip::grid(pad));
    let mut seq = Sequencer::with_scenes(120.0, MidiClockMode::Off, vec![scene_a, scene_b]);
    seq.set_output(Box::new(buffer.clone()));

    seq.start().unwrap();
    seq.update(0.01).unwrap();
    seq.request_scene_change(1).unwrap();

    let mut switched = false;
    for _ in 0..100 {
        if seq.update(0.01).unwrap().scene_switched.is_some() {
            switched = true;
            break;
        }
    }
    assert!(switched);
    assert_eq!(seq.current_scene(), 1);

    // The bass release scheduled 8 steps out was flushed at the handover
    assert!(buffer.messages().contains(&vec![0x80, 36, 0]));

    // And the new scene is sounding on channel 1
    seq.update(0.01).unwrap();
    assert!(buffer.messages().contains(&vec![0x91, 72, 100]));
}

/// A project saved to disk and loaded back reproduces identical playback.
#[test]
fn test_project_round_trip_playback() {
    let mut part = Part::new("Keys", 8, 3);
    part.set_program(12);
    part.append(0.0, note_on(60, 1.0), 0.0);
    part.append(0.0, note_on(64, 1.0), 0.0); // chord partner
    part.append(4.0, note_on(67, 2.0), 0.0);
    part.insert_event(1, 2.0, note_on(55, 1.0), 0.0).unwrap();

    let scene = Scene::new("Main").with_clip(Clip::grid(part));
    let seq = Sequencer::with_scenes(120.0, MidiClockMode::Off, vec![scene]);
    let project = Project::from_sequencer(&seq, "RoundTrip");

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("roundtrip.yaml");
    project.save(&path).unwrap();
    let reloaded = Project::load(&path).unwrap();
    assert_eq!(project, reloaded);

    let run = |mut seq: Sequencer| -> Vec<Vec<u8>> {
        let buffer = BufferOutput::new();
        seq.set_output(Box::new(buffer.clone()));
        seq.start().unwrap();
        for _ in 0..110 {
            seq.update(0.01).unwrap();
        }
        buffer.messages()
    };

    let original = run(seq);
    let restored = run(reloaded.into_sequencer().unwrap());
    assert_eq!(original, restored);

    // Chord fired in insertion order after the program select
    let ons: Vec<u8> = original
        .iter()
        .filter(|m| m[0] & 0xF0 == 0x90)
        .map(|m| m[1])
        .collect();
    assert_eq!(ons[..2], [60, 64]);
}

/// Quit-path behavior: a host shutting down mid-note calls stop and the
/// output can then be detached without hung notes.
#[test]
fn test_shutdown_sequence() {
    let buffer = BufferOutput::new();
    let mut part = Part::new("Lead", 16, 0);
    part.append(0.0, note_on(60, 8.0), 0.0);
    let mut seq = sequencer_with(part, &buffer);

    seq.start().unwrap();
    seq.update(0.01).unwrap();
    seq.stop();
    let out = seq.clear_output();
    assert!(out.is_some());
    assert!(!seq.has_output());

    // The release went out before the output was detached
    assert!(buffer.messages().contains(&vec![0x80, 60, 0]));

    // Restarting without an output is a reported precondition failure
    assert!(matches!(seq.start(), Err(SequencerError::NotReady)));
}

/// BufferOutput is itself a MidiOutput; sanity-check the trait helpers the
/// engine relies on.
#[test]
fn test_output_trait_helpers() {
    let mut buffer = BufferOutput::new();
    buffer.send_short(0x93, 60, 100).unwrap();
    buffer.send_realtime(0xFA).unwrap();

    let messages = buffer.messages();
    assert_eq!(messages[0], vec![0x93, 60, 100]);
    assert_eq!(messages[1], vec![0xFA]);
}
