//! Asset addressing.
//!
//! Scripts and cues refer to assets by bare identifiers. The loader
//! collaborators resolve them under a local base path first and a remote
//! base URL second, using the same relative layout for both.

use std::fmt;

use serde::Serialize;

/// The category of a playback asset, which determines its relative path.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum AssetKind {
    /// A recorded script, grouped by category (e.g. `produce_events`).
    Script {
        /// Script category directory.
        category: String,
    },
    /// A looping music track.
    Music,
    /// A one-shot sound effect.
    SoundEffect,
    /// A one-shot voice line.
    Voice,
    /// A background image.
    Background,
    /// The speaker name-alias list.
    NameList,
}

impl AssetKind {
    /// Returns the path of asset `id` relative to an asset base.
    #[must_use]
    pub fn relative_path(&self, id: &str) -> String {
        match self {
            Self::Script { category } => format!("json/{category}/{id}.json"),
            Self::Music => format!("sounds/bgm/{id}.m4a"),
            Self::SoundEffect => format!("sounds/se/event/{id}.m4a"),
            Self::Voice => format!("sounds/voice/events/{id}.m4a"),
            Self::Background => format!("images/event/bg/{id}.jpg"),
            Self::NameList => "json/name_list.json".to_owned(),
        }
    }
}

impl fmt::Display for AssetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Script { category } => write!(f, "script ({category})"),
            Self::Music => f.write_str("music"),
            Self::SoundEffect => f.write_str("sound effect"),
            Self::Voice => f.write_str("voice"),
            Self::Background => f.write_str("background"),
            Self::NameList => f.write_str("name list"),
        }
    }
}

/// Which source satisfied an asset request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AssetOrigin {
    /// The local asset directory.
    Local,
    /// The remote asset host.
    Remote,
}
