// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Clips and scenes.
//!
//! A clip couples a part with the editor shape it is displayed in, so a
//! reloaded project reopens each part in the same editor. A scene is a
//! named list of clips played together; the coordinator plays exactly one
//! scene at a time.

use serde::{Deserialize, Serialize};

use super::part::Part;

/// Editor shape a clip's part is edited in.
///
/// The core never renders these; they are round-tripped for the view layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ClipEditor {
    /// Melodic grid editor, the part split into `rows` x `cols` steps
    Grid { rows: u8, cols: u8 },
    /// Drum-machine editor with one lane per `rows` note
    Drum { rows: u8 },
}

impl Default for ClipEditor {
    fn default() -> Self {
        ClipEditor::Grid { rows: 4, cols: 4 }
    }
}

/// A part plus the editor metadata it was created with.
#[derive(Debug)]
pub struct Clip {
    pub part: Part,
    pub editor: ClipEditor,
}

impl Clip {
    pub fn new(part: Part, editor: ClipEditor) -> Self {
        Self { part, editor }
    }

    /// A clip in the default grid editor shape.
    pub fn grid(part: Part) -> Self {
        Self::new(part, ClipEditor::default())
    }
}

/// A named collection of clips active together.
#[derive(Debug, Default)]
pub struct Scene {
    name: String,
    clips: Vec<Clip>,
}

impl Scene {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            clips: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    pub fn add_clip(&mut self, clip: Clip) -> usize {
        self.clips.push(clip);
        self.clips.len() - 1
    }

    pub fn remove_clip(&mut self, index: usize) -> Option<Clip> {
        if index < self.clips.len() {
            Some(self.clips.remove(index))
        } else {
            None
        }
    }

    pub fn clips(&self) -> &[Clip] {
        &self.clips
    }

    pub fn clips_mut(&mut self) -> &mut [Clip] {
        &mut self.clips
    }

    pub fn len(&self) -> usize {
        self.clips.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clips.is_empty()
    }

    /// Builder: add a clip
    pub fn with_clip(mut self, clip: Clip) -> Self {
        self.add_clip(clip);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scene_add_remove() {
        let mut scene = Scene::new("Intro");
        assert!(scene.is_empty());

        scene.add_clip(Clip::grid(Part::new("Bass", 16, 0)));
        scene.add_clip(Clip::new(
            Part::new("Drums", 16, 9),
            ClipEditor::Drum { rows: 8 },
        ));
        assert_eq!(scene.len(), 2);

        let removed = scene.remove_clip(0).unwrap();
        assert_eq!(removed.part.name(), "Bass");
        assert_eq!(scene.len(), 1);
        assert!(scene.remove_clip(5).is_none());
    }

    #[test]
    fn test_default_editor_is_four_by_four_grid() {
        let clip = Clip::grid(Part::new("Lead", 16, 0));
        assert_eq!(clip.editor, ClipEditor::Grid { rows: 4, cols: 4 });
    }
}
