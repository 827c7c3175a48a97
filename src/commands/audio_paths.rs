use std::path::Path;

use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::error::{DeckError, Result};
use crate::model::{ANSWER_AUDIO_KEY, QUESTION_AUDIO_KEY};
use crate::output::{self, Format, SchemaWarning};
use crate::store::deck;

#[derive(Debug, Serialize)]
pub struct AudioPathsReport {
    pub deck: String,
    pub deck_id: String,
    pub total_cards: usize,
    pub modified: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub backup: Option<String>,
    pub warnings: Vec<SchemaWarning>,
}

pub fn run(deck_path: &Path, audio_root: &str, format: Format) -> Result<()> {
    let report = normalize_audio_paths(deck_path, audio_root)?;
    match format {
        Format::Json => output::print_json(&report)?,
        Format::Pretty => {
            output::print_heading("audio-paths", &report.deck_id);
            output::print_field("deck", &report.deck);
            if let Some(backup) = &report.backup {
                output::print_field("backup", backup);
            }
            output::print_field(
                "modified",
                format!("{} of {} cards", report.modified, report.total_cards),
            );
            output::print_warnings(&report.warnings);
        }
        Format::Minimal => println!(
            "modified={} total={} warnings={}",
            report.modified,
            report.total_cards,
            report.warnings.len()
        ),
    }
    Ok(())
}

/// Point every card's question/answer audio at
/// `{audio_root}/{deckId}/{cardId}_q.mp3` and `_a.mp3`.
pub fn normalize_audio_paths(deck_path: &Path, audio_root: &str) -> Result<AudioPathsReport> {
    let mut deck = deck::load(deck_path)?;

    let Some(deck_id) = deck
        .extra
        .get("id")
        .and_then(Value::as_str)
        .filter(|id| !id.is_empty())
        .map(str::to_string)
    else {
        return Err(DeckError::InvalidDeck {
            path: deck_path.to_path_buf(),
            reason: "missing string 'id'".into(),
        });
    };
    if deck.cards.is_empty() {
        return Err(DeckError::InvalidDeck {
            path: deck_path.to_path_buf(),
            reason: "no cards".into(),
        });
    }

    let root = audio_root.trim_end_matches('/');
    let mut report = AudioPathsReport {
        deck: deck_path.display().to_string(),
        deck_id: deck_id.clone(),
        total_cards: deck.cards.len(),
        modified: 0,
        backup: None,
        warnings: Vec::new(),
    };

    for (index, card) in deck.cards.iter_mut().enumerate() {
        let Some(card_id) = card.id().map(str::to_string) else {
            warn!(index, "card has no cardId; skipped");
            report.warnings.push(SchemaWarning::new(
                None,
                format!("card at index {index} has no cardId; skipped"),
            ));
            continue;
        };

        let mut changed = false;
        for (key, suffix) in [(QUESTION_AUDIO_KEY, "q"), (ANSWER_AUDIO_KEY, "a")] {
            let wanted = format!("{root}/{deck_id}/{card_id}_{suffix}.mp3");
            match card.fields.get(key).and_then(Value::as_str) {
                Some(current) if current == wanted => {
                    debug!(card = %card_id, key, "already correct");
                }
                current => {
                    info!(card = %card_id, key, old = ?current, new = %wanted, "audio path updated");
                    card.fields.insert(key.to_string(), Value::String(wanted));
                    changed = true;
                }
            }
        }

        if changed {
            report.modified += 1;
        }
    }

    if report.modified > 0 {
        report.backup = Some(deck::backup(deck_path)?.display().to_string());
        deck::save(deck_path, &deck)?;
    }

    Ok(report)
}
