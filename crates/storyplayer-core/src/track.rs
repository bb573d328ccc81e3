//! The track: an immutable ordered script plus its label index.

use std::collections::HashMap;

use tracing::warn;

use crate::error::PlaybackError;
use crate::script::{MusicCue, ScriptEvent};

/// An ordered, immutable script.
#[derive(Debug, Clone, Default)]
pub struct Track {
    events: Vec<ScriptEvent>,
    labels: HashMap<String, usize>,
}

impl Track {
    /// Builds a track from decoded records, assigning positions and
    /// indexing labels. On duplicate labels the first occurrence wins.
    #[must_use]
    pub fn new(mut events: Vec<ScriptEvent>) -> Self {
        let mut labels = HashMap::new();
        for (index, event) in events.iter_mut().enumerate() {
            event.index = index;
            if let Some(label) = &event.label {
                labels.entry(label.clone()).or_insert(index);
            }
        }
        Self { events, labels }
    }

    /// Decodes a track from a JSON array of records.
    ///
    /// Records that would render a message but carry no text are demoted to
    /// non-message records so the interpreter only sees well-formed messages.
    ///
    /// # Errors
    ///
    /// Returns `PlaybackError::Decode` if the JSON is not an array of records.
    pub fn from_json(bytes: &[u8]) -> Result<Self, PlaybackError> {
        let mut events: Vec<ScriptEvent> = serde_json::from_slice(bytes)
            .map_err(|e| PlaybackError::Decode(format!("script is not a record array: {e}")))?;

        for (position, event) in events.iter_mut().enumerate() {
            if event.is_message() && event.text.is_none() {
                warn!(position, "message record without text, rendering suppressed");
                event.text_frame = None;
            }
        }

        Ok(Self::new(events))
    }

    /// Returns the number of records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// Returns `true` if the track has no records.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Returns the last valid position (0 for an empty track).
    #[must_use]
    pub fn last_index(&self) -> usize {
        self.events.len().saturating_sub(1)
    }

    /// Returns the record at `index`.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&ScriptEvent> {
        self.events.get(index)
    }

    /// Returns all records in order.
    #[must_use]
    pub fn events(&self) -> &[ScriptEvent] {
        &self.events
    }

    /// Resolves a label to the position of its first occurrence.
    #[must_use]
    pub fn find_label(&self, label: &str) -> Option<usize> {
        self.labels.get(label).copied()
    }

    /// Returns the effect-stripped projection of this track.
    #[must_use]
    pub fn stripped(&self) -> Self {
        Self {
            events: self.events.iter().map(ScriptEvent::stripped).collect(),
            labels: self.labels.clone(),
        }
    }

    /// Returns the music track that sequential playback has looping just
    /// before `position`, or `None` if nothing was started or it was faded out.
    #[must_use]
    pub fn music_in_effect(&self, position: usize) -> Option<&str> {
        let end = position.min(self.events.len());
        self.events[..end]
            .iter()
            .rev()
            .find_map(|event| event.music.as_ref())
            .and_then(|cue| match cue {
                MusicCue::Play(id) => Some(id.as_str()),
                MusicCue::FadeOut => None,
            })
    }
}
