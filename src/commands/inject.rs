use std::collections::BTreeMap;
use std::path::Path;

use clap::ValueEnum;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::error::{DeckError, Result};
use crate::model::CARD_ID_KEY;
use crate::output::{self, Format, SchemaWarning};
use crate::store::deck;

/// Key written beside an injected value by `--set-type`.
pub const TYPE_KEY: &str = "type";

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum InjectMode {
    /// Overwrite the field with the mapped value.
    #[default]
    Set,
    /// Prepend a `**[id]**` glossary-rule link to the existing text.
    RuleLink,
}

#[derive(Debug, Serialize)]
pub struct InjectReport {
    pub deck: String,
    pub field: String,
    pub mode: InjectMode,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub set_type: Option<String>,
    pub total_cards: usize,
    pub updated: usize,
    pub already_linked: usize,
    pub unmapped: usize,
    pub backup: String,
    pub warnings: Vec<SchemaWarning>,
}

pub fn run(
    deck_path: &Path,
    map_path: &Path,
    field: &str,
    mode: InjectMode,
    set_type: Option<&str>,
    format: Format,
) -> Result<()> {
    let report = inject(deck_path, map_path, field, mode, set_type)?;
    print_report(&report, format)
}

/// Whether `text` already opens with a `**[digits]**` rule link.
pub fn has_rule_link(text: &str) -> bool {
    let Some(rest) = text.trim_start().strip_prefix("**[") else {
        return false;
    };
    let digits = rest.chars().take_while(char::is_ascii_digit).count();
    digits > 0 && rest[digits..].starts_with("]**")
}

/// `text` with a rule link for `rule_id` in front. Non-breaking spaces are
/// normalized to plain spaces first.
pub fn link_rule(text: &str, rule_id: &str) -> String {
    let text = text.replace('\u{00A0}', " ");
    format!("**[{rule_id}]**\n\n{text}")
}

/// Dotted path of the `type` key beside `field`: `content.value` ->
/// `content.type`.
pub fn type_path(field: &str) -> String {
    match field.rsplit_once('.') {
        Some((parent, _)) => format!("{parent}.{TYPE_KEY}"),
        None => TYPE_KEY.to_string(),
    }
}

/// Write lookup-table values into `field` (a dotted path) of every mapped card.
/// In `set` mode, `set_type` also writes the sibling `type` key.
pub fn inject(
    deck_path: &Path,
    map_path: &Path,
    field: &str,
    mode: InjectMode,
    set_type: Option<&str>,
) -> Result<InjectReport> {
    if field.is_empty()
        || field.split('.').next() == Some(CARD_ID_KEY)
        || field.split('.').any(str::is_empty)
    {
        return Err(DeckError::InvalidConfig(format!(
            "'{field}' is not an injectable field path"
        )));
    }
    if set_type.is_some() && mode != InjectMode::Set {
        return Err(DeckError::InvalidConfig(
            "--set-type only applies to --mode set".into(),
        ));
    }
    let type_field = type_path(field);
    if set_type.is_some() && type_field == field {
        return Err(DeckError::InvalidConfig(format!(
            "'{field}' is its own type key"
        )));
    }

    let mut deck = deck::load(deck_path)?;
    let lookup: BTreeMap<String, String> = deck::load_json(map_path)?;
    let backup = deck::backup(deck_path)?;

    let mut report = InjectReport {
        deck: deck_path.display().to_string(),
        field: field.to_string(),
        mode,
        set_type: set_type.map(str::to_string),
        total_cards: deck.cards.len(),
        updated: 0,
        already_linked: 0,
        unmapped: 0,
        backup: backup.display().to_string(),
        warnings: Vec::new(),
    };

    for (index, card) in deck.cards.iter_mut().enumerate() {
        let Some(id) = card.id().map(str::to_string) else {
            warn!(index, "card has no cardId; skipped");
            report.unmapped += 1;
            report.warnings.push(SchemaWarning::new(
                None,
                format!("card at index {index} has no cardId; skipped"),
            ));
            continue;
        };

        let Some(value) = lookup.get(&id) else {
            warn!(card = %id, "no entry in lookup table; skipped");
            report.unmapped += 1;
            report
                .warnings
                .push(SchemaWarning::new(Some(&id), "no entry in lookup table"));
            continue;
        };

        match mode {
            InjectMode::Set => {
                let old = card.get_path(field).cloned();
                card.set_path(field, Value::String(value.clone()));
                debug!(card = %id, field, ?old, new = %value, "field set");
                if let Some(kind) = set_type {
                    card.set_path(&type_field, Value::String(kind.to_string()));
                }
            }
            InjectMode::RuleLink => {
                let current = card.get_path(field).and_then(Value::as_str).unwrap_or("");
                if has_rule_link(current) {
                    info!(card = %id, "already has a rule link; skipped");
                    report.already_linked += 1;
                    continue;
                }
                let linked = link_rule(current, value);
                card.set_path(field, Value::String(linked));
                info!(card = %id, field, rule = %value, "rule link injected");
            }
        }
        report.updated += 1;
    }

    deck::save(deck_path, &deck)?;
    info!(
        updated = report.updated,
        total = report.total_cards,
        unmapped = report.unmapped,
        "injection complete"
    );
    Ok(report)
}

fn print_report(report: &InjectReport, format: Format) -> Result<()> {
    match format {
        Format::Json => output::print_json(report)?,
        Format::Pretty => {
            output::print_heading("inject", &report.field);
            output::print_field("deck", &report.deck);
            output::print_field("backup", &report.backup);
            output::print_field(
                "updated",
                format!("{} of {}", report.updated, report.total_cards),
            );
            output::print_field("already linked", report.already_linked);
            output::print_field("unmapped", report.unmapped);
            output::print_warnings(&report.warnings);
        }
        Format::Minimal => println!(
            "updated={} total={} already_linked={} unmapped={}",
            report.updated, report.total_cards, report.already_linked, report.unmapped
        ),
    }
    Ok(())
}
