//! Script event records.
//!
//! One `ScriptEvent` is one step of a recorded script. The JSON keys follow
//! the extracted game data (`bg`, `bgm`, `se`, `textFrame`, `textCtrl`,
//! `select`, ...); every field except the position is optional.

use serde::{Deserialize, Deserializer, Serialize};

/// A loop-music cue.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(from = "String")]
pub enum MusicCue {
    /// Start looping the given track.
    Play(String),
    /// Fade the music channel out.
    FadeOut,
}

impl From<String> for MusicCue {
    fn from(value: String) -> Self {
        match value.as_str() {
            "fade_out" | "fade-out" => Self::FadeOut,
            _ => Self::Play(value),
        }
    }
}

/// A one-shot sound-effect cue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EffectCue {
    /// Play the given effect.
    Play(String),
    /// Stop whatever the effect channel is playing.
    Stop,
}

/// Presentation style of a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", rename_all = "snake_case")]
pub enum TextFrameMode {
    /// An idol speaking.
    Idol,
    /// The player (producer) speaking.
    Player,
    /// The CEO speaking.
    Ceo,
    /// Any other speaker.
    Sub,
    /// No message is rendered.
    Off,
}

impl From<String> for TextFrameMode {
    fn from(value: String) -> Self {
        match value.as_str() {
            "001" | "idol" => Self::Idol,
            "002" | "player" => Self::Player,
            "004" | "ceo" => Self::Ceo,
            "off" => Self::Off,
            _ => Self::Sub,
        }
    }
}

/// Flow-control marker of a record.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Option<String>", rename_all = "snake_case")]
pub enum ControlMode {
    /// Sequential flow.
    #[default]
    None,
    /// Halt until external input.
    Pause,
    /// Start a branch set and wait for a choice.
    BranchOpen,
    /// Explicit end of a branch set.
    BranchClose,
}

impl From<Option<String>> for ControlMode {
    fn from(value: Option<String>) -> Self {
        match value.as_deref() {
            Some("p" | "pause") => Self::Pause,
            Some("l" | "branchOpen") => Self::BranchOpen,
            Some("cm" | "branchClose") => Self::BranchClose,
            _ => Self::None,
        }
    }
}

/// A visual overlay effect that lingers until cleared.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScreenEffect {
    /// Effect name.
    pub label: String,
    /// Effect target, as recorded.
    pub target: Option<serde_json::Value>,
    /// Effect parameter, as recorded.
    pub value: Option<serde_json::Value>,
}

/// One step of a script.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScriptEvent {
    /// Position in the track, assigned at load.
    #[serde(skip)]
    pub index: usize,
    /// Background to show.
    #[serde(rename = "bg")]
    pub background: Option<String>,
    /// Loop-music cue.
    #[serde(rename = "bgm")]
    pub music: Option<MusicCue>,
    /// Sound-effect cue; an explicit `null` stops the channel.
    #[serde(rename = "se", default, deserialize_with = "deserialize_effect_cue")]
    pub sound_effect: Option<EffectCue>,
    /// Voice line accompanying the message.
    pub voice: Option<String>,
    /// Message style; absent or `Off` means no message.
    pub text_frame: Option<TextFrameMode>,
    /// Speaker display name.
    pub speaker: Option<String>,
    /// Message text.
    pub text: Option<String>,
    /// Named anchor usable as a jump target.
    pub label: Option<String>,
    /// Jump target (or the option's target on option records).
    pub next_label: Option<String>,
    /// Flow-control marker.
    #[serde(rename = "textCtrl", default)]
    pub control: ControlMode,
    /// Option text, on records that belong to a branch set.
    #[serde(rename = "select")]
    pub option: Option<String>,
    /// Timed wait, as recorded.
    #[serde(rename = "waitTime")]
    pub wait: Option<serde_json::Value>,
    /// Wait kind, as recorded.
    pub wait_type: Option<serde_json::Value>,
    /// Overlay effect name.
    pub effect_label: Option<String>,
    /// Overlay effect target.
    pub effect_target: Option<serde_json::Value>,
    /// Overlay effect parameter.
    pub effect_value: Option<serde_json::Value>,
}

fn deserialize_effect_cue<'de, D>(deserializer: D) -> Result<Option<EffectCue>, D::Error>
where
    D: Deserializer<'de>,
{
    // Only called when the key is present: `null` and "none" both stop.
    let raw = Option::<String>::deserialize(deserializer)?;
    Ok(Some(match raw {
        None => EffectCue::Stop,
        Some(id) if id == "none" => EffectCue::Stop,
        Some(id) => EffectCue::Play(id),
    }))
}

impl ScriptEvent {
    /// Returns `true` if this record renders a message.
    #[must_use]
    pub fn is_message(&self) -> bool {
        matches!(self.text_frame, Some(mode) if mode != TextFrameMode::Off)
    }

    /// Returns `true` if this record halts flow: an explicit pause marker or
    /// a timed wait. A paused record does not fire its sound effect.
    #[must_use]
    pub fn has_pause(&self) -> bool {
        self.control == ControlMode::Pause || self.wait.is_some()
    }

    /// Returns `true` if this record opens a branch set.
    #[must_use]
    pub fn opens_branch(&self) -> bool {
        self.control == ControlMode::BranchOpen
    }

    /// Returns the unconditional jump target of this record, if any.
    ///
    /// Option records carry their option's target in `next_label`; that is
    /// not a jump, and neither is a label on a record that opens a branch.
    #[must_use]
    pub fn jump_target(&self) -> Option<&str> {
        if self.option.is_some() || self.opens_branch() {
            return None;
        }
        self.next_label.as_deref()
    }

    /// Returns the overlay effect this record applies, if any.
    #[must_use]
    pub fn screen_effect(&self) -> Option<ScreenEffect> {
        self.effect_label.as_ref().map(|label| ScreenEffect {
            label: label.clone(),
            target: self.effect_target.clone(),
            value: self.effect_value.clone(),
        })
    }

    /// Returns a copy without the side-effect-only fields.
    #[must_use]
    pub fn stripped(&self) -> Self {
        Self {
            music: None,
            sound_effect: None,
            text_frame: None,
            voice: None,
            wait: None,
            wait_type: None,
            effect_label: None,
            effect_target: None,
            effect_value: None,
            ..self.clone()
        }
    }
}
