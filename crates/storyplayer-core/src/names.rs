//! Speaker name aliases and icon lookup.
//!
//! The alias list maps a canonical speaker name to the spellings that appear
//! in scripts. It is inverted once at load so each message resolves its
//! speaker with a single map lookup.

use std::collections::HashMap;
use std::fmt;

use serde::de::{Deserialize, Deserializer, MapAccess, Visitor};

use crate::error::PlaybackError;

/// Icon shown for speakers that do not resolve to a known character.
pub const DEFAULT_ICON: &str = "images/content/sub_characters/icon_circle_l/801.png";

/// Canonical name of the CEO, whose icon lives in the sub-character folder.
const CEO: &str = "社長";

/// Alias → canonical speaker name index.
#[derive(Debug, Clone, Default)]
pub struct NameAliasIndex {
    canonical_by_alias: HashMap<String, String>,
}

impl NameAliasIndex {
    /// Builds the index from canonical → aliases entries. When two canonical
    /// names list the same alias, the first one in iteration order wins.
    pub fn new<I, A>(entries: I) -> Self
    where
        I: IntoIterator<Item = (String, A)>,
        A: IntoIterator<Item = String>,
    {
        let mut canonical_by_alias = HashMap::new();
        for (canonical, aliases) in entries {
            for alias in aliases {
                canonical_by_alias
                    .entry(alias)
                    .or_insert_with(|| canonical.clone());
            }
        }
        Self { canonical_by_alias }
    }

    /// Decodes the index from the JSON alias list. Canonical names are
    /// visited in the order the file lists them.
    ///
    /// # Errors
    ///
    /// Returns `PlaybackError::Decode` if the JSON is not a name → list map.
    pub fn from_json(bytes: &[u8]) -> Result<Self, PlaybackError> {
        let AliasEntries(entries) = serde_json::from_slice::<AliasEntries>(bytes)
            .map_err(|e| PlaybackError::Decode(format!("name alias list is malformed: {e}")))?;
        Ok(Self::new(entries))
    }

    /// Returns the number of indexed aliases.
    #[must_use]
    pub fn len(&self) -> usize {
        self.canonical_by_alias.len()
    }

    /// Returns `true` if no aliases are indexed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.canonical_by_alias.is_empty()
    }

    /// Resolves a displayed speaker name to its canonical name.
    #[must_use]
    pub fn canonical(&self, speaker: &str) -> Option<&str> {
        self.canonical_by_alias.get(speaker).map(String::as_str)
    }

    /// Returns the icon path for a displayed speaker name, falling back to
    /// [`DEFAULT_ICON`] when the speaker or its icon is unknown.
    #[must_use]
    pub fn icon_for(&self, speaker: Option<&str>) -> String {
        speaker
            .and_then(|name| self.canonical(name))
            .and_then(|canonical| {
                icon_number(canonical).map(|number| {
                    let folder = if canonical == CEO {
                        "sub_characters"
                    } else {
                        "characters"
                    };
                    format!("images/content/{folder}/icon_circle_l/{number}.png")
                })
            })
            .unwrap_or_else(|| DEFAULT_ICON.to_owned())
    }
}

/// Canonical → aliases entries in document order.
struct AliasEntries(Vec<(String, Vec<String>)>);

impl<'de> Deserialize<'de> for AliasEntries {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct EntriesVisitor;

        impl<'de> Visitor<'de> for EntriesVisitor {
            type Value = AliasEntries;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map of canonical name to alias list")
            }

            fn visit_map<M: MapAccess<'de>>(self, mut map: M) -> Result<AliasEntries, M::Error> {
                let mut entries = Vec::with_capacity(map.size_hint().unwrap_or(0));
                while let Some(entry) = map.next_entry::<String, Vec<String>>()? {
                    entries.push(entry);
                }
                Ok(AliasEntries(entries))
            }
        }

        deserializer.deserialize_map(EntriesVisitor)
    }
}

fn icon_number(canonical: &str) -> Option<&'static str> {
    let number = match canonical {
        "真乃" => "001",
        "灯織" => "002",
        "めぐる" => "003",
        "恋鐘" => "004",
        "摩美々" => "005",
        "咲耶" => "006",
        "結華" => "007",
        "霧子" => "008",
        "果穂" => "009",
        "智代子" => "010",
        "樹里" => "011",
        "凛世" => "012",
        "夏葉" => "013",
        "甘奈" => "014",
        "甜花" => "015",
        "千雪" => "016",
        "あさひ" => "017",
        "冬優子" => "018",
        "愛依" => "019",
        "透" => "020",
        "円香" => "021",
        "小糸" => "022",
        "雛菜" => "023",
        "にちか" => "024",
        "美琴" => "025",
        "ルカ" => "026",
        "羽那" => "027",
        "はるき" => "028",
        "はづき" => "091",
        // Collaboration characters.
        "ルビー" => "801",
        "かな" => "802",
        "MEMちょ" => "803",
        "あかね" => "804",
        CEO => "902",
        _ => return None,
    };
    Some(number)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn index() -> NameAliasIndex {
        NameAliasIndex::from_json(
            r#"{"真乃": ["真乃", "まの"], "社長": ["社長", "天井"], "誰か": ["???"]}"#.as_bytes(),
        )
        .unwrap()
    }

    #[test]
    fn test_alias_resolves_to_canonical() {
        let index = index();

        assert_eq!(index.canonical("まの"), Some("真乃"));
        assert_eq!(index.canonical("天井"), Some("社長"));
        assert_eq!(index.canonical("nobody"), None);
    }

    #[test]
    fn test_icon_for_character_uses_character_folder() {
        assert_eq!(
            index().icon_for(Some("まの")),
            "images/content/characters/icon_circle_l/001.png"
        );
    }

    #[test]
    fn test_icon_for_ceo_uses_sub_character_folder() {
        assert_eq!(
            index().icon_for(Some("天井")),
            "images/content/sub_characters/icon_circle_l/902.png"
        );
    }

    #[test]
    fn test_unresolved_speaker_gets_default_icon() {
        let index = index();

        assert_eq!(index.icon_for(Some("nobody")), DEFAULT_ICON);
        assert_eq!(index.icon_for(Some("???")), DEFAULT_ICON);
        assert_eq!(index.icon_for(None), DEFAULT_ICON);
    }

    #[test]
    fn test_first_canonical_wins_on_shared_alias() {
        let index = NameAliasIndex::new(vec![
            ("a".to_owned(), vec!["x".to_owned()]),
            ("b".to_owned(), vec!["x".to_owned()]),
        ]);

        assert_eq!(index.canonical("x"), Some("a"));
    }

    #[test]
    fn test_from_json_keeps_document_order_on_shared_alias() {
        let index = NameAliasIndex::from_json(r#"{"b": ["x"], "a": ["x", "y"]}"#.as_bytes()).unwrap();

        assert_eq!(index.canonical("x"), Some("b"));
        assert_eq!(index.canonical("y"), Some("a"));
    }

    #[test]
    fn test_from_json_rejects_non_map() {
        let result = NameAliasIndex::from_json(br#"["x"]"#);

        assert!(matches!(result, Err(PlaybackError::Decode(_))));
    }
}
