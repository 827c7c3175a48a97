use std::path::{Path, PathBuf};

use colored::Colorize;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::card_id::IdAllocator;
use crate::config::MergeConfig;
use crate::error::Result;
use crate::model::AudioSlot;
use crate::output::{self, Format, SchemaWarning};
use crate::store::assets::{AssetRelocator, RelocationOutcome};
use crate::store::deck;

/// Stand-in old ID for cards that arrive without one. Asset filenames are
/// matched against it, so such cards keep their filenames.
pub const UNKNOWN_ID: &str = "unknown";

#[derive(Debug, Serialize)]
pub struct MergeReport {
    pub dry_run: bool,
    pub source_deck: String,
    pub target_deck: String,
    pub migrated: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_id: Option<String>,
    pub target_cards_before: usize,
    pub target_cards_after: usize,
    pub backups: Vec<String>,
    pub id_map: Vec<IdMapEntry>,
    pub assets: Vec<AssetEntry>,
    pub warnings: Vec<SchemaWarning>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IdMapEntry {
    pub old_id: String,
    pub new_id: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct AssetEntry {
    pub card_id: String,
    pub slot: AudioSlot,
    pub field: String,
    pub old_ref: String,
    pub new_ref: String,
    pub outcome: RelocationOutcome,
}

pub fn run(config: &MergeConfig, dry_run: bool, format: Format) -> Result<()> {
    let report = merge(config, dry_run)?;
    print_report(&report, format)
}

/// Move every card of the source deck into the target deck under fresh IDs,
/// relocating their audio files, then drain the source deck.
///
/// Both decks are loaded before anything is touched, so an unreadable deck
/// aborts the run with no backup, move or write. An empty source deck is a
/// successful no-op.
pub fn merge(config: &MergeConfig, dry_run: bool) -> Result<MergeReport> {
    info!(
        source = %config.source_deck.display(),
        target = %config.target_deck.display(),
        dry_run,
        "starting deck merge"
    );

    let mut target = deck::load(&config.target_deck)?;
    let mut source = deck::load(&config.source_deck)?;
    let target_cards_before = target.cards.len();

    let mut report = MergeReport {
        dry_run,
        source_deck: config.source_deck.display().to_string(),
        target_deck: config.target_deck.display().to_string(),
        migrated: 0,
        first_id: None,
        last_id: None,
        target_cards_before,
        target_cards_after: target_cards_before,
        backups: Vec::new(),
        id_map: Vec::new(),
        assets: Vec::new(),
        warnings: Vec::new(),
    };

    if source.cards.is_empty() {
        info!("source deck is empty; nothing to migrate");
        return Ok(report);
    }

    let mut allocator = IdAllocator::seeded(&config.target_prefix, &target.cards);
    let new_ids = allocator.allocate_many(source.cards.len())?;
    info!("new ids {} to {}", new_ids[0], new_ids[new_ids.len() - 1]);

    if !dry_run {
        report.backups = backup_all(&[config.target_deck.as_path(), config.source_deck.as_path()])?
            .into_iter()
            .map(|p| p.display().to_string())
            .collect();
    }

    let relocator = AssetRelocator::new(
        &config.source_audio_dir,
        &config.target_audio_dir,
        &config.public_audio_root,
        &config.namespace,
    )
    .dry_run(dry_run);

    let cards = std::mem::take(&mut source.cards);
    for (index, (mut card, new_id)) in cards.into_iter().zip(new_ids).enumerate() {
        let old_id = match card.id() {
            Some(id) => id.to_string(),
            None => {
                warn!(index, "card without a string cardId; using '{UNKNOWN_ID}' for asset renaming");
                report.warnings.push(SchemaWarning::new(
                    None,
                    format!("card at source index {index} has no string cardId"),
                ));
                UNKNOWN_ID.to_string()
            }
        };

        debug!("processing card {old_id} -> {new_id}");
        card.set_id(&new_id);

        let assets = &mut report.assets;
        let warnings = &mut report.warnings;
        card.rewrite_audio(|slot, old_ref| {
            let relocation = relocator.relocate(old_ref, &old_id, &new_id)?;
            if relocation.outcome == RelocationOutcome::Skipped && !old_ref.is_empty() {
                warn!(card = %new_id, field = %slot, reference = old_ref, "audio reference names no file; left as is");
                warnings.push(SchemaWarning::new(
                    Some(new_id.as_str()),
                    format!("{slot} '{old_ref}' names no file; left as is"),
                ));
            } else {
                info!(
                    card = %new_id,
                    field = %slot,
                    old = old_ref,
                    new = %relocation.reference,
                    "audio reference rewritten"
                );
            }
            assets.push(AssetEntry {
                card_id: new_id.clone(),
                slot,
                field: slot.to_string(),
                old_ref: old_ref.to_string(),
                new_ref: relocation.reference.clone(),
                outcome: relocation.outcome,
            });
            Ok(relocation.reference)
        })?;

        report.id_map.push(IdMapEntry {
            old_id,
            new_id,
        });
        target.cards.push(card);
        report.migrated += 1;
    }

    report.first_id = report.id_map.first().map(|e| e.new_id.clone());
    report.last_id = allocator.last().map(str::to_string);
    report.target_cards_after = target.cards.len();

    if dry_run {
        info!(migrated = report.migrated, "dry run; decks left unchanged");
    } else {
        deck::save(&config.target_deck, &target)?;
        deck::save(&config.source_deck, &source)?;
        info!(
            migrated = report.migrated,
            last_id = report.last_id.as_deref().unwrap_or("-"),
            "merge complete"
        );
    }

    Ok(report)
}

/// Back up every deck before either is mutated; the first failure aborts.
fn backup_all(paths: &[&Path]) -> Result<Vec<PathBuf>> {
    paths.iter().map(|path| deck::backup(path)).collect()
}

fn print_report(report: &MergeReport, format: Format) -> Result<()> {
    match format {
        Format::Json => output::print_json(report)?,
        Format::Pretty => {
            let mode = if report.dry_run { "dry-run" } else { "apply" };
            output::print_heading("merge", mode);
            output::print_field("source", &report.source_deck);
            output::print_field("target", &report.target_deck);

            if report.migrated == 0 {
                println!("\n{}", "Source deck is empty. Nothing to migrate.".green());
                return Ok(());
            }

            output::print_field(
                "target cards",
                format!(
                    "{} -> {}",
                    report.target_cards_before, report.target_cards_after
                ),
            );
            for backup in &report.backups {
                output::print_field("backup", backup);
            }

            println!("\n{}", "Cards".bold());
            for entry in &report.id_map {
                println!("  {} -> {}", entry.old_id.dimmed(), entry.new_id);
            }

            if !report.assets.is_empty() {
                println!("\n{}", "Audio".bold());
                for asset in &report.assets {
                    let outcome = match asset.outcome {
                        RelocationOutcome::Missing => "missing".yellow(),
                        RelocationOutcome::Moved => "moved".green(),
                        RelocationOutcome::Planned => "planned".cyan(),
                        RelocationOutcome::AlreadyMigrated => "already migrated".normal(),
                        RelocationOutcome::Skipped => "skipped".dimmed(),
                    };
                    println!(
                        "  {} {} {} -> {} ({})",
                        asset.card_id,
                        asset.field.dimmed(),
                        asset.old_ref,
                        asset.new_ref,
                        outcome
                    );
                }
            }

            output::print_warnings(&report.warnings);

            let verb = if report.dry_run { "Would migrate" } else { "Migrated" };
            println!(
                "\n{}",
                format!(
                    "{verb} {} cards; last id {}",
                    report.migrated,
                    report.last_id.as_deref().unwrap_or("-")
                )
                .green()
                .bold()
            );
        }
        Format::Minimal => {
            let missing = report
                .assets
                .iter()
                .filter(|a| a.outcome == RelocationOutcome::Missing)
                .count();
            println!(
                "dry_run={} migrated={} first_id={} last_id={} target_cards={} assets={} missing_assets={} warnings={}",
                report.dry_run,
                report.migrated,
                report.first_id.as_deref().unwrap_or("-"),
                report.last_id.as_deref().unwrap_or("-"),
                report.target_cards_after,
                report.assets.len(),
                missing,
                report.warnings.len()
            );
        }
    }

    Ok(())
}
