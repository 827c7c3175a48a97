use std::path::Path;

use serde::Serialize;
use tracing::info;

use crate::error::{DeckError, Result};
use crate::model::CARD_ID_KEY;
use crate::output::{self, Format};
use crate::store::deck;

#[derive(Debug, Serialize)]
pub struct StripReport {
    pub deck: String,
    pub field: String,
    pub removed: usize,
    pub total_cards: usize,
    pub backup: String,
}

pub fn run(deck_path: &Path, field: &str, format: Format) -> Result<()> {
    let report = strip_field(deck_path, field)?;
    match format {
        Format::Json => output::print_json(&report)?,
        Format::Pretty => {
            output::print_heading("strip-field", &report.field);
            output::print_field("deck", &report.deck);
            output::print_field("backup", &report.backup);
            output::print_field(
                "removed",
                format!("{} of {} cards", report.removed, report.total_cards),
            );
        }
        Format::Minimal => println!(
            "removed={} total={}",
            report.removed, report.total_cards
        ),
    }
    Ok(())
}

/// Remove a top-level key from every card of the deck.
pub fn strip_field(deck_path: &Path, field: &str) -> Result<StripReport> {
    if field.is_empty() || field == CARD_ID_KEY {
        return Err(DeckError::InvalidConfig(format!(
            "'{field}' cannot be stripped from cards"
        )));
    }

    let mut deck = deck::load(deck_path)?;
    let backup = deck::backup(deck_path)?;

    let mut removed = 0;
    for card in &mut deck.cards {
        if card.fields.shift_remove(field).is_some() {
            removed += 1;
        }
    }

    deck::save(deck_path, &deck)?;
    info!(field, removed, "field stripped");

    Ok(StripReport {
        deck: deck_path.display().to_string(),
        field: field.to_string(),
        removed,
        total_cards: deck.cards.len(),
        backup: backup.display().to_string(),
    })
}
