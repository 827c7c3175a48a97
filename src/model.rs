use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::Result;

pub const CARD_ID_KEY: &str = "cardId";

/// Key holding an audio reference, wherever it appears on a card.
pub const AUDIO_KEY: &str = "audioSrc";
/// Single nested object that may carry an audio reference.
pub const NESTED_AUDIO_FIELD: &str = "sideA";
/// List of objects, each of which may carry an audio reference.
pub const LISTED_AUDIO_FIELD: &str = "sideB";

pub const QUESTION_AUDIO_KEY: &str = "questionAudioSrc";
pub const ANSWER_AUDIO_KEY: &str = "answerAudioSrc";

/// A deck document. Keys other than `name`, `deckType` and `cards` are kept
/// in `extra` so they survive a load/save round trip.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Deck {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(
        rename = "deckType",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub deck_type: Option<String>,
    #[serde(default)]
    pub cards: Vec<Card>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A card, kept as the raw object it was read from. `cardId` lives in
/// `fields` like every other key, whatever its JSON type.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(transparent)]
pub struct Card {
    pub fields: Map<String, Value>,
}

/// Where on a card an audio reference lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "shape", rename_all = "snake_case")]
pub enum AudioSlot {
    /// `audioSrc` directly on the card.
    TopLevel,
    /// `audioSrc` inside a single nested object.
    Nested { field: &'static str },
    /// `audioSrc` inside one element of a list of objects.
    Listed { field: &'static str, index: usize },
}

impl fmt::Display for AudioSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TopLevel => write!(f, "{AUDIO_KEY}"),
            Self::Nested { field } => write!(f, "{field}.{AUDIO_KEY}"),
            Self::Listed { field, index } => write!(f, "{field}[{index}].{AUDIO_KEY}"),
        }
    }
}

impl Card {
    /// The card's ID. Missing, empty and non-string values all count as none.
    pub fn id(&self) -> Option<&str> {
        self.fields
            .get(CARD_ID_KEY)
            .and_then(Value::as_str)
            .filter(|id| !id.is_empty())
    }

    /// Set `cardId`, keeping its position if present and putting it first
    /// otherwise.
    pub fn set_id(&mut self, id: &str) {
        let value = Value::String(id.to_string());
        if let Some(slot) = self.fields.get_mut(CARD_ID_KEY) {
            *slot = value;
            return;
        }
        let rest = std::mem::take(&mut self.fields);
        self.fields.insert(CARD_ID_KEY.to_string(), value);
        self.fields.extend(rest);
    }

    /// Every audio reference on the card, in slot order: top level, nested
    /// object, then list items.
    pub fn audio_refs(&self) -> Vec<(AudioSlot, &str)> {
        let mut refs = Vec::new();

        if let Some(path) = self.fields.get(AUDIO_KEY).and_then(Value::as_str) {
            refs.push((AudioSlot::TopLevel, path));
        }

        if let Some(path) = self
            .fields
            .get(NESTED_AUDIO_FIELD)
            .and_then(Value::as_object)
            .and_then(|obj| obj.get(AUDIO_KEY))
            .and_then(Value::as_str)
        {
            refs.push((
                AudioSlot::Nested {
                    field: NESTED_AUDIO_FIELD,
                },
                path,
            ));
        }

        if let Some(items) = self.fields.get(LISTED_AUDIO_FIELD).and_then(Value::as_array) {
            for (index, item) in items.iter().enumerate() {
                if let Some(path) = item
                    .as_object()
                    .and_then(|obj| obj.get(AUDIO_KEY))
                    .and_then(Value::as_str)
                {
                    refs.push((
                        AudioSlot::Listed {
                            field: LISTED_AUDIO_FIELD,
                            index,
                        },
                        path,
                    ));
                }
            }
        }

        refs
    }

    /// Replace every audio reference with the value returned by `rewrite`.
    /// Slots are visited in the same order as [`Card::audio_refs`]; the first
    /// error stops the walk.
    pub fn rewrite_audio<F>(&mut self, mut rewrite: F) -> Result<usize>
    where
        F: FnMut(AudioSlot, &str) -> Result<String>,
    {
        let mut rewritten = 0;

        if let Some(Value::String(path)) = self.fields.get_mut(AUDIO_KEY) {
            let updated = rewrite(AudioSlot::TopLevel, path.as_str())?;
            *path = updated;
            rewritten += 1;
        }

        if let Some(Value::Object(obj)) = self.fields.get_mut(NESTED_AUDIO_FIELD)
            && let Some(Value::String(path)) = obj.get_mut(AUDIO_KEY)
        {
            let slot = AudioSlot::Nested {
                field: NESTED_AUDIO_FIELD,
            };
            let updated = rewrite(slot, path.as_str())?;
            *path = updated;
            rewritten += 1;
        }

        if let Some(Value::Array(items)) = self.fields.get_mut(LISTED_AUDIO_FIELD) {
            for (index, item) in items.iter_mut().enumerate() {
                if let Value::Object(obj) = item
                    && let Some(Value::String(path)) = obj.get_mut(AUDIO_KEY)
                {
                    let slot = AudioSlot::Listed {
                        field: LISTED_AUDIO_FIELD,
                        index,
                    };
                    let updated = rewrite(slot, path.as_str())?;
                    *path = updated;
                    rewritten += 1;
                }
            }
        }

        Ok(rewritten)
    }

    /// Look up a dotted path such as `content.value`.
    pub fn get_path(&self, path: &str) -> Option<&Value> {
        let mut segments = path.split('.');
        let mut current = self.fields.get(segments.next()?)?;
        for segment in segments {
            current = current.as_object()?.get(segment)?;
        }
        Some(current)
    }

    /// Set a dotted path, creating (or replacing non-object) intermediate
    /// values with empty objects.
    pub fn set_path(&mut self, path: &str, value: Value) {
        let segments: Vec<&str> = path.split('.').collect();
        let Some((last, parents)) = segments.split_last() else {
            return;
        };

        let mut current = &mut self.fields;
        for segment in parents {
            let entry = current
                .entry(segment.to_string())
                .or_insert_with(|| Value::Object(Map::new()));
            if !entry.is_object() {
                *entry = Value::Object(Map::new());
            }
            let Value::Object(next) = entry else {
                unreachable!("entry was just made an object");
            };
            current = next;
        }

        current.insert(last.to_string(), value);
    }
}

/// Replacement values for one glossary rule.
#[derive(Debug, Clone, Deserialize)]
pub struct GlossaryPatch {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
}

/// A glossary document keyed by rule ID.
pub type Glossary = Map<String, Value>;
