//! Branch sets: collecting options and resolving the player's choice.

use serde::Serialize;
use storyplayer_core::error::PlaybackError;
use storyplayer_core::presentation::BranchPrompt;
use storyplayer_core::script::ControlMode;
use storyplayer_core::track::Track;

/// One selectable option of a branch set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BranchOption {
    /// Displayed option text.
    pub text: String,
    /// Label the option leads to.
    pub next_label: Option<String>,
}

/// Outcome of a choice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ChoiceOutcome {
    /// The branch was unresolved and is now resolved.
    Resolved {
        /// Chosen option.
        chosen: usize,
        /// Position playback resumes from.
        target: usize,
        /// `true` if the option's label was missing and playback resumes at
        /// the branch start instead.
        fell_back: bool,
    },
    /// The branch was already resolved; the earlier choice stands.
    Ignored {
        /// The option chosen earlier.
        chosen: usize,
    },
}

/// A branch set opened at a position of the track.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BranchState {
    start_index: usize,
    options: Vec<BranchOption>,
    chosen: Option<usize>,
}

/// Collects the option records that follow a branch opening at
/// `start_index`, stopping at an explicit branch close or the end of track.
#[must_use]
pub fn open_branch(track: &Track, start_index: usize) -> BranchState {
    let options = track
        .events()
        .iter()
        .skip(start_index)
        .take_while(|event| event.control != ControlMode::BranchClose)
        .filter_map(|event| {
            event.option.as_ref().map(|text| BranchOption {
                text: text.clone(),
                next_label: event.next_label.clone(),
            })
        })
        .collect();

    BranchState {
        start_index,
        options,
        chosen: None,
    }
}

impl BranchState {
    /// Position of the record that opened the branch.
    #[must_use]
    pub fn start_index(&self) -> usize {
        self.start_index
    }

    /// Options in display order.
    #[must_use]
    pub fn options(&self) -> &[BranchOption] {
        &self.options
    }

    /// The chosen option, once resolved.
    #[must_use]
    pub fn chosen(&self) -> Option<usize> {
        self.chosen
    }

    #[must_use]
    pub fn is_resolved(&self) -> bool {
        self.chosen.is_some()
    }

    /// Returns what the presentation shows for this branch.
    #[must_use]
    pub fn prompt(&self) -> BranchPrompt {
        BranchPrompt {
            start_index: self.start_index,
            options: self.options.iter().map(|o| o.text.clone()).collect(),
        }
    }

    /// Resolves the branch with option `option`.
    ///
    /// The first choice wins: choosing again on a resolved branch is a no-op
    /// reported as `ChoiceOutcome::Ignored`.
    ///
    /// # Errors
    ///
    /// Returns `PlaybackError::Validation` if `option` is out of range on an
    /// unresolved branch.
    pub fn choose(&mut self, track: &Track, option: usize) -> Result<ChoiceOutcome, PlaybackError> {
        if let Some(chosen) = self.chosen {
            return Ok(ChoiceOutcome::Ignored { chosen });
        }

        let Some(selected) = self.options.get(option) else {
            return Err(PlaybackError::Validation(format!(
                "option {option} is out of range for a branch of {} options",
                self.options.len()
            )));
        };

        let resolved = selected
            .next_label
            .as_deref()
            .and_then(|label| track.find_label(label));
        self.chosen = Some(option);

        Ok(ChoiceOutcome::Resolved {
            chosen: option,
            target: resolved.unwrap_or(self.start_index),
            fell_back: resolved.is_none(),
        })
    }
}
