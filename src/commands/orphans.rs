use std::path::Path;

use colored::Colorize;
use serde::Serialize;
use serde_json::Value;
use tracing::warn;

use crate::error::Result;
use crate::model::{ANSWER_AUDIO_KEY, QUESTION_AUDIO_KEY};
use crate::output::{self, Format};
use crate::store::deck;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrphanRef {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub card_id: Option<String>,
    pub field: String,
    pub reference: String,
}

#[derive(Debug, Serialize)]
pub struct OrphanReport {
    pub deck: String,
    pub checked: usize,
    pub orphans: Vec<OrphanRef>,
}

pub fn run(deck_path: &Path, root: &Path, format: Format) -> Result<()> {
    let report = find_orphans(deck_path, root)?;
    match format {
        Format::Json => output::print_json(&report)?,
        Format::Pretty => {
            output::print_heading("orphans", &report.deck);
            output::print_field("references checked", report.checked);
            if report.orphans.is_empty() {
                println!("\n{}", "Every audio reference has a file.".green());
            } else {
                println!("\n{}", "Missing files".yellow().bold());
                for orphan in &report.orphans {
                    println!(
                        "  {} {} {}",
                        orphan.card_id.as_deref().unwrap_or("-"),
                        orphan.field.dimmed(),
                        orphan.reference.yellow()
                    );
                }
            }
        }
        Format::Minimal => println!(
            "checked={} orphans={}",
            report.checked,
            report.orphans.len()
        ),
    }
    Ok(())
}

/// List audio references in a deck that no file under `root` backs. Read-only.
pub fn find_orphans(deck_path: &Path, root: &Path) -> Result<OrphanReport> {
    let deck = deck::load(deck_path)?;
    let mut checked = 0;
    let mut orphans = Vec::new();

    for card in &deck.cards {
        let mut refs: Vec<(String, &str)> = card
            .audio_refs()
            .into_iter()
            .map(|(slot, reference)| (slot.to_string(), reference))
            .collect();
        for key in [QUESTION_AUDIO_KEY, ANSWER_AUDIO_KEY] {
            if let Some(reference) = card.fields.get(key).and_then(Value::as_str) {
                refs.push((key.to_string(), reference));
            }
        }

        for (field, reference) in refs {
            if reference.is_empty() {
                continue;
            }
            checked += 1;
            if !root.join(reference).exists() {
                warn!(card = card.id().unwrap_or("-"), %field, reference, "orphaned audio reference");
                orphans.push(OrphanRef {
                    card_id: card.id().map(str::to_string),
                    field,
                    reference: reference.to_string(),
                });
            }
        }
    }

    Ok(OrphanReport {
        deck: deck_path.display().to_string(),
        checked,
        orphans,
    })
}
