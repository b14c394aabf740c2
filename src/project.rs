// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Project persistence.
//!
//! Data structures for loading and saving a whole project - scenes, clips,
//! parts, events - as YAML. The serialized shape mirrors the live
//! structures; the only repair applied on load is the documented
//! timestamp-modulo normalization, everything else out of range is
//! rejected with a descriptive error.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::sequencer::{
    Clip, ClipEditor, EventAction, MidiClockMode, Part, Scene, Sequencer, SequencerError,
    VARIANT_COUNT,
};

/// Errors raised while loading or saving a project.
#[derive(Debug, Error)]
pub enum ProjectError {
    #[error("failed to read project file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse project YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("invalid tempo {0} (expected 20-300 BPM)")]
    InvalidTempo(f64),

    #[error("part '{part}': length must be at least one sixteenth step")]
    InvalidLength { part: String },

    #[error("part '{part}': MIDI channel {channel} out of range (0-15)")]
    InvalidChannel { part: String, channel: u8 },

    #[error("part '{part}': {field} {value} out of range (0-{max})")]
    DataRange {
        part: String,
        field: &'static str,
        value: u8,
        max: u8,
    },

    #[error("part '{part}': note length must be a finite, non-negative number")]
    InvalidNoteLength { part: String },

    #[error("part '{part}': {count} variants exceeds the limit of 10")]
    TooManyVariants { part: String, count: usize },

    #[error("part '{part}': active variant {index} out of range (0-9)")]
    VariantIndex { part: String, index: usize },

    #[error("project data rejected by the engine: {0}")]
    Engine(#[from] SequencerError),
}

/// Root of a serialized project.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Project {
    /// Project name
    pub name: String,
    /// Tempo in BPM
    #[serde(default = "default_bpm")]
    pub bpm: f64,
    /// MIDI clock mode
    #[serde(default)]
    pub midi_clock: MidiClockMode,
    /// Scenes in trigger order
    #[serde(default)]
    pub scenes: Vec<SceneData>,
}

fn default_bpm() -> f64 {
    135.0
}

impl Default for Project {
    fn default() -> Self {
        Self {
            name: "Unnamed".to_string(),
            bpm: default_bpm(),
            midi_clock: MidiClockMode::default(),
            scenes: vec![SceneData::default()],
        }
    }
}

/// A serialized scene
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SceneData {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub clips: Vec<ClipData>,
}

impl Default for SceneData {
    fn default() -> Self {
        Self {
            name: "Scene 1".to_string(),
            clips: Vec::new(),
        }
    }
}

/// A serialized clip: editor metadata plus its part
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ClipData {
    #[serde(default)]
    pub editor: ClipEditor,
    pub part: PartData,
}

/// A serialized part
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PartData {
    pub name: String,
    pub length: u32,
    #[serde(default)]
    pub channel: u8,
    #[serde(default)]
    pub bank: u8,
    #[serde(default)]
    pub program: u8,
    /// Active variant index
    #[serde(default)]
    pub variant: usize,
    /// Event lists, one per variant; trailing empty variants may be omitted
    #[serde(default)]
    pub variants: Vec<Vec<EventData>>,
}

/// A serialized event
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EventData {
    pub timestamp: f64,
    #[serde(flatten)]
    pub action: EventAction,
}

impl Project {
    /// Load a project from a YAML file, rejecting out-of-range data.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ProjectError> {
        let contents = fs::read_to_string(path.as_ref())?;
        Self::from_yaml(&contents)
    }

    /// Parse and validate a project from a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self, ProjectError> {
        let project: Project = serde_yaml::from_str(yaml)?;
        project.validate()?;
        Ok(project)
    }

    /// Serialize to a YAML string.
    pub fn to_yaml(&self) -> Result<String, ProjectError> {
        Ok(serde_yaml::to_string(self)?)
    }

    /// Save the project to a YAML file.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), ProjectError> {
        fs::write(path.as_ref(), self.to_yaml()?)?;
        Ok(())
    }

    /// Check every range constraint the engine relies on.
    pub fn validate(&self) -> Result<(), ProjectError> {
        if !(20.0..=300.0).contains(&self.bpm) {
            return Err(ProjectError::InvalidTempo(self.bpm));
        }
        for scene in &self.scenes {
            for clip in &scene.clips {
                clip.part.validate()?;
            }
        }
        Ok(())
    }

    /// Build a live sequencer from this project. The sequencer has no MIDI
    /// output attached yet.
    pub fn into_sequencer(self) -> Result<Sequencer, ProjectError> {
        self.validate()?;

        let mut scenes = Vec::with_capacity(self.scenes.len());
        for scene_data in self.scenes {
            let mut scene = Scene::new(scene_data.name);
            for clip_data in scene_data.clips {
                let part = clip_data.part.into_part()?;
                scene.add_clip(Clip::new(part, clip_data.editor));
            }
            scenes.push(scene);
        }
        Ok(Sequencer::with_scenes(self.bpm, self.midi_clock, scenes))
    }

    /// Capture a live sequencer as a serializable project.
    pub fn from_sequencer(sequencer: &Sequencer, name: impl Into<String>) -> Self {
        let scenes = sequencer
            .scenes()
            .iter()
            .map(|scene| SceneData {
                name: scene.name().to_string(),
                clips: scene
                    .clips()
                    .iter()
                    .map(|clip| ClipData {
                        editor: clip.editor,
                        part: PartData::from_part(&clip.part),
                    })
                    .collect(),
            })
            .collect();

        Self {
            name: name.into(),
            bpm: sequencer.bpm(),
            midi_clock: sequencer.clock_mode(),
            scenes,
        }
    }
}

impl PartData {
    fn validate(&self) -> Result<(), ProjectError> {
        let part = &self.name;
        if self.length == 0 {
            return Err(ProjectError::InvalidLength { part: part.clone() });
        }
        if self.channel > 15 {
            return Err(ProjectError::InvalidChannel {
                part: part.clone(),
                channel: self.channel,
            });
        }
        for (field, value, max) in [("bank", self.bank, 128), ("program", self.program, 128)] {
            if value > max {
                return Err(ProjectError::DataRange {
                    part: part.clone(),
                    field,
                    value,
                    max,
                });
            }
        }
        if self.variants.len() > VARIANT_COUNT {
            return Err(ProjectError::TooManyVariants {
                part: part.clone(),
                count: self.variants.len(),
            });
        }
        if self.variant >= VARIANT_COUNT {
            return Err(ProjectError::VariantIndex {
                part: part.clone(),
                index: self.variant,
            });
        }
        for event in self.variants.iter().flatten() {
            event.validate(part)?;
        }
        Ok(())
    }

    fn into_part(self) -> Result<Part, ProjectError> {
        let mut part = Part::new(self.name, self.length, self.channel);
        part.set_bank(self.bank);
        part.set_program(self.program);
        for (variant, events) in self.variants.into_iter().enumerate() {
            for event in events {
                part.insert_event(variant, event.timestamp, event.action, 0.0)?;
            }
        }
        part.set_variant(self.variant, 0.0)?;
        Ok(part)
    }

    fn from_part(part: &Part) -> Self {
        let variants = (0..VARIANT_COUNT)
            .map(|v| {
                part.variant_events(v)
                    .unwrap_or_default()
                    .iter()
                    .map(|e| EventData {
                        timestamp: e.timestamp,
                        action: e.action,
                    })
                    .collect()
            })
            .collect();

        Self {
            name: part.name().to_string(),
            length: part.length(),
            channel: part.channel(),
            bank: part.bank(),
            program: part.program(),
            variant: part.variant(),
            variants,
        }
    }
}

impl EventData {
    fn validate(&self, part: &str) -> Result<(), ProjectError> {
        let check = |field: &'static str, value: u8| -> Result<(), ProjectError> {
            if value > 127 {
                Err(ProjectError::DataRange {
                    part: part.to_string(),
                    field,
                    value,
                    max: 127,
                })
            } else {
                Ok(())
            }
        };

        match self.action {
            EventAction::NoteOn {
                note,
                velocity,
                length,
            } => {
                check("note", note)?;
                check("velocity", velocity)?;
                if !length.is_finite() || length < 0.0 {
                    return Err(ProjectError::InvalidNoteLength {
                        part: part.to_string(),
                    });
                }
            }
            EventAction::NoteOff { note } => check("note", note)?,
            EventAction::ControlChange { controller, value } => {
                check("controller", controller)?;
                check("value", value)?;
            }
        }
        Ok(())
    }
}
