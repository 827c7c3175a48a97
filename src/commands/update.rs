use std::collections::HashMap;
use std::path::Path;

use serde::Serialize;
use tracing::{info, warn};

use crate::error::Result;
use crate::model::Card;
use crate::output::{self, Format, SchemaWarning};
use crate::store::deck;

/// Review metadata attached to improved cards; never written back to a deck.
pub const REVIEW_REQUEST_KEY: &str = "review_request";

/// Directory, beside the deck, that receives timestamped backups.
pub const BACKUP_DIR: &str = "backups";

#[derive(Debug, Serialize)]
pub struct UpdateReport {
    pub deck: String,
    pub input_cards: usize,
    pub updated: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub backup: Option<String>,
    pub saved: bool,
    pub warnings: Vec<SchemaWarning>,
}

pub fn run(deck_path: &Path, input_path: &Path, format: Format) -> Result<()> {
    let report = update(deck_path, input_path)?;
    print_report(&report, format)
}

/// Replace deck cards in place with improved versions matched by `cardId`.
pub fn update(deck_path: &Path, input_path: &Path) -> Result<UpdateReport> {
    let mut deck = deck::load(deck_path)?;
    let improved: Vec<Card> = deck::load_json(input_path)?;

    let mut report = UpdateReport {
        deck: deck_path.display().to_string(),
        input_cards: improved.len(),
        updated: Vec::new(),
        backup: None,
        saved: false,
        warnings: Vec::new(),
    };

    if deck.cards.is_empty() {
        warn!(deck = %deck_path.display(), "deck has no cards");
        report
            .warnings
            .push(SchemaWarning::new(None, "deck has no cards; nothing to update"));
        return Ok(report);
    }

    let backup_dir = deck_path
        .parent()
        .unwrap_or_else(|| Path::new("."))
        .join(BACKUP_DIR);
    report.backup = Some(
        deck::backup_timestamped(deck_path, &backup_dir)?
            .display()
            .to_string(),
    );

    let positions: HashMap<String, usize> = deck
        .cards
        .iter()
        .enumerate()
        .filter_map(|(i, card)| card.id().map(|id| (id.to_string(), i)))
        .collect();

    for mut card in improved {
        let Some(id) = card.id().map(str::to_string) else {
            warn!("skipping improved card without cardId");
            report
                .warnings
                .push(SchemaWarning::new(None, "improved card has no cardId; skipped"));
            continue;
        };

        let Some(&index) = positions.get(&id) else {
            warn!(card = %id, "card not found in deck; skipped");
            report.warnings.push(SchemaWarning::new(
                Some(&id),
                "not found in the deck; skipped",
            ));
            continue;
        };

        card.fields.shift_remove(REVIEW_REQUEST_KEY);
        deck.cards[index] = card;
        info!(card = %id, "updated card");
        report.updated.push(id);
    }

    if report.updated.is_empty() {
        info!("no cards were updated");
    } else {
        deck::save(deck_path, &deck)?;
        report.saved = true;
    }

    Ok(report)
}

fn print_report(report: &UpdateReport, format: Format) -> Result<()> {
    match format {
        Format::Json => output::print_json(report)?,
        Format::Pretty => {
            output::print_heading("update", &report.deck);
            output::print_field("input cards", report.input_cards);
            if let Some(backup) = &report.backup {
                output::print_field("backup", backup);
            }
            for id in &report.updated {
                println!("  updated {id}");
            }
            output::print_warnings(&report.warnings);
            output::print_field("updated", report.updated.len());
        }
        Format::Minimal => println!(
            "updated={} input={} saved={} warnings={}",
            report.updated.len(),
            report.input_cards,
            report.saved,
            report.warnings.len()
        ),
    }
    Ok(())
}
