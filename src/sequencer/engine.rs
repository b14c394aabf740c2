// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Transport coordinator.
//!
//! The single per-process transport authority: owns the clock, the scene
//! list and the MIDI output, and drives every part once per frame. The
//! host calls [`Sequencer::update`] unconditionally every frame; musical
//! time only advances while running.

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::clip::Scene;
use super::SequencerError;
use crate::midi::{messages, MidiOutput};
use crate::timing::Clock;

/// Whether the transport drives external gear with MIDI clock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MidiClockMode {
    /// No realtime messages are sent
    Off,
    /// Send Start/Stop and a 24 PPQN pulse train
    #[default]
    Send,
}

/// What happened during one [`Sequencer::update`] call.
#[derive(Debug, Clone, Copy, Default)]
pub struct UpdateSummary {
    /// The clock crossed a sixteenth-note boundary this frame
    pub step_changed: bool,
    /// A pending scene switch was executed, to this scene index
    pub scene_switched: Option<usize>,
}

/// The per-process transport coordinator.
pub struct Sequencer {
    clock: Clock,
    clock_mode: MidiClockMode,
    scenes: Vec<Scene>,
    current_scene: usize,
    pending_scene: Option<usize>,
    out: Option<Box<dyn MidiOutput>>,
}

impl Sequencer {
    /// Create an empty sequencer: one empty scene, default tempo.
    pub fn new() -> Self {
        Self::with_scenes(135.0, MidiClockMode::default(), vec![Scene::new("Scene 1")])
    }

    /// Create a sequencer from existing scenes. An empty scene list is
    /// replaced with a single empty scene so there is always a current one.
    pub fn with_scenes(bpm: f64, clock_mode: MidiClockMode, mut scenes: Vec<Scene>) -> Self {
        if scenes.is_empty() {
            scenes.push(Scene::new("Scene 1"));
        }
        Self {
            clock: Clock::new(bpm),
            clock_mode,
            scenes,
            current_scene: 0,
            pending_scene: None,
            out: None,
        }
    }

    /// Attach the MIDI output the engine writes to.
    pub fn set_output(&mut self, out: Box<dyn MidiOutput>) {
        self.out = Some(out);
    }

    /// Detach and return the MIDI output, if any.
    pub fn clear_output(&mut self) -> Option<Box<dyn MidiOutput>> {
        self.out.take()
    }

    pub fn has_output(&self) -> bool {
        self.out.is_some()
    }

    pub fn is_running(&self) -> bool {
        self.clock.is_running()
    }

    /// Elapsed sixteenth notes since transport start
    pub fn running_time(&self) -> f64 {
        self.clock.running_time()
    }

    /// True iff the last `update` crossed a sixteenth-note boundary
    pub fn step_changed(&self) -> bool {
        self.clock.step_changed()
    }

    pub fn bpm(&self) -> f64 {
        self.clock.bpm()
    }

    pub fn set_bpm(&mut self, bpm: f64) {
        self.clock.set_bpm(bpm);
    }

    pub fn clock_mode(&self) -> MidiClockMode {
        self.clock_mode
    }

    pub fn set_clock_mode(&mut self, mode: MidiClockMode) {
        self.clock_mode = mode;
    }

    pub fn clock(&self) -> &Clock {
        &self.clock
    }

    pub fn clock_mut(&mut self) -> &mut Clock {
        &mut self.clock
    }

    pub fn current_scene(&self) -> usize {
        self.current_scene
    }

    pub fn pending_scene(&self) -> Option<usize> {
        self.pending_scene
    }

    pub fn scene_count(&self) -> usize {
        self.scenes.len()
    }

    pub fn scenes(&self) -> &[Scene] {
        &self.scenes
    }

    pub fn scene(&self, index: usize) -> Option<&Scene> {
        self.scenes.get(index)
    }

    pub fn scene_mut(&mut self, index: usize) -> Option<&mut Scene> {
        self.scenes.get_mut(index)
    }

    /// The scene currently playing (or armed to play).
    pub fn current(&self) -> &Scene {
        &self.scenes[self.current_scene]
    }

    pub fn current_mut(&mut self) -> &mut Scene {
        &mut self.scenes[self.current_scene]
    }

    /// Append a scene, returning its index.
    pub fn add_scene(&mut self, scene: Scene) -> usize {
        self.scenes.push(scene);
        self.scenes.len() - 1
    }

    /// Start the transport: emit Start (in Send mode), then start every
    /// part of the current scene from its loop beginning.
    ///
    /// Starting without an attached MIDI output is a reported precondition
    /// failure, never a crash.
    pub fn start(&mut self) -> Result<(), SequencerError> {
        let out = self.out.as_deref_mut().ok_or(SequencerError::NotReady)?;

        let msg = self.clock.start();
        if self.clock_mode == MidiClockMode::Send {
            out.send(&msg)?;
        }
        for clip in self.scenes[self.current_scene].clips_mut() {
            clip.part.start(true, out)?;
        }
        info!(scene = self.current_scene, bpm = self.clock.bpm(), "transport started");
        Ok(())
    }

    /// Stop the transport: stop every part (silencing pending notes), emit
    /// Stop, and rewind running time per the clock's stop policy.
    ///
    /// Stopping never fails; output errors during the safety cleanup are
    /// logged and swallowed so shutdown is not blocked.
    pub fn stop(&mut self) {
        let msg = self.clock.stop();
        if let Some(out) = self.out.as_deref_mut() {
            for clip in self.scenes[self.current_scene].clips_mut() {
                clip.part.stop(out);
            }
            if self.clock_mode == MidiClockMode::Send {
                if let Err(e) = out.send(&msg) {
                    warn!("failed to send MIDI stop: {e:#}");
                }
            }
        }
        info!("transport stopped");
    }

    /// Start if stopped, stop if running.
    pub fn toggle(&mut self) -> Result<(), SequencerError> {
        if self.is_running() {
            self.stop();
            Ok(())
        } else {
            self.start()
        }
    }

    /// Request a switch to another scene.
    ///
    /// While running the switch is deferred: the first part that reaches
    /// its loop boundary afterwards executes it, so nothing is cut off
    /// mid-measure. While stopped it applies immediately.
    pub fn request_scene_change(&mut self, index: usize) -> Result<(), SequencerError> {
        if index >= self.scenes.len() {
            return Err(SequencerError::InvalidScene(index));
        }
        if self.is_running() {
            self.pending_scene = Some(index);
            debug!(from = self.current_scene, to = index, "scene switch armed");
        } else {
            self.current_scene = index;
        }
        Ok(())
    }

    /// Arm a mute flip on a clip of the current scene, applied at that
    /// part's next loop boundary.
    pub fn request_mute(&mut self, clip_index: usize) -> Result<(), SequencerError> {
        let scene = &mut self.scenes[self.current_scene];
        let clip = scene
            .clips_mut()
            .get_mut(clip_index)
            .ok_or(SequencerError::InvalidClip(clip_index))?;
        clip.part.arm_toggle();
        Ok(())
    }

    /// Arm a variant switch on a clip of the current scene, applied at
    /// that part's next loop boundary.
    pub fn request_variant_switch(
        &mut self,
        clip_index: usize,
        variant: usize,
    ) -> Result<(), SequencerError> {
        let scene = &mut self.scenes[self.current_scene];
        let clip = scene
            .clips_mut()
            .get_mut(clip_index)
            .ok_or(SequencerError::InvalidClip(clip_index))?;
        clip.part.switch_variant(variant)
    }

    /// Advance the engine by `delta` wall-clock seconds.
    ///
    /// Called every frame, running or not, so the clock pulse train and
    /// the view stay live. While running, parts are updated in clip-list
    /// order; a part crossing its boundary with a scene switch pending
    /// hands control back here, and the swap happens after the part loop
    /// rather than underneath it.
    pub fn update(&mut self, delta: f64) -> Result<UpdateSummary, SequencerError> {
        let pulses = self.clock.advance(delta);
        let mut summary = UpdateSummary {
            step_changed: self.clock.step_changed(),
            scene_switched: None,
        };

        let Some(out) = self.out.as_deref_mut() else {
            return Ok(summary);
        };

        if self.clock_mode == MidiClockMode::Send {
            for _ in 0..pulses {
                out.send_realtime(messages::TIMING_CLOCK)?;
            }
        }

        if self.clock.is_running() {
            let running_time = self.clock.running_time();
            let scene_pending = self.pending_scene.is_some();

            let mut take_switch = false;
            for clip in self.scenes[self.current_scene].clips_mut() {
                let tick = clip.part.update(running_time, scene_pending, out)?;
                if tick.take_scene_switch {
                    take_switch = true;
                    break;
                }
            }

            // Swap the active scene after the part loop, never underneath
            // it: silence the old parts without the channel kill, then
            // start the new scene's parts.
            if take_switch {
                if let Some(target) = self.pending_scene.take() {
                    for clip in self.scenes[self.current_scene].clips_mut() {
                        clip.part.halt(false, out);
                    }
                    self.current_scene = target;
                    for clip in self.scenes[self.current_scene].clips_mut() {
                        clip.part.start(true, out)?;
                    }
                    info!(scene = target, "scene switched");
                    summary.scene_switched = Some(target);
                }
            }
        }

        Ok(summary)
    }
}

impl Default for Sequencer {
    fn default() -> Self {
        Self::new()
    }
}
