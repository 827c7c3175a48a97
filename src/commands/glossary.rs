use std::collections::BTreeMap;
use std::path::Path;

use serde::Serialize;
use serde_json::Value;
use tracing::{info, warn};

use crate::error::{DeckError, Result};
use crate::model::{Glossary, GlossaryPatch};
use crate::output::{self, Format, SchemaWarning};
use crate::store::deck;

#[derive(Debug, Serialize)]
pub struct GlossaryReport {
    pub glossary: String,
    pub patched: Vec<String>,
    pub backup: String,
    pub warnings: Vec<SchemaWarning>,
}

pub fn run(glossary_path: &Path, patch_path: &Path, format: Format) -> Result<()> {
    let report = patch_glossary(glossary_path, patch_path)?;
    match format {
        Format::Json => output::print_json(&report)?,
        Format::Pretty => {
            output::print_heading("patch-glossary", &report.glossary);
            output::print_field("backup", &report.backup);
            for id in &report.patched {
                println!("  fixed rule {id}");
            }
            output::print_warnings(&report.warnings);
        }
        Format::Minimal => println!(
            "patched={} warnings={}",
            report.patched.len(),
            report.warnings.len()
        ),
    }
    Ok(())
}

/// Overwrite `title`/`content` of existing glossary rules. Rule IDs absent
/// from the glossary are reported, never added.
pub fn patch_glossary(glossary_path: &Path, patch_path: &Path) -> Result<GlossaryReport> {
    let mut glossary: Glossary = deck::load_json(glossary_path)?;
    let patches: BTreeMap<String, GlossaryPatch> = deck::load_json(patch_path)?;
    let backup = deck::backup(glossary_path)?;

    let mut report = GlossaryReport {
        glossary: glossary_path.display().to_string(),
        patched: Vec::new(),
        backup: backup.display().to_string(),
        warnings: Vec::new(),
    };

    for (id, patch) in patches {
        let Some(entry) = glossary.get_mut(&id) else {
            warn!(rule = %id, "rule not in glossary; skipped");
            report
                .warnings
                .push(SchemaWarning::new(Some(&id), "rule not in glossary; skipped"));
            continue;
        };
        let Some(entry) = entry.as_object_mut() else {
            return Err(DeckError::InvalidDeck {
                path: glossary_path.to_path_buf(),
                reason: format!("rule '{id}' is not an object"),
            });
        };

        if let Some(title) = patch.title {
            entry.insert("title".into(), Value::String(title));
        }
        if let Some(content) = patch.content {
            entry.insert("content".into(), Value::String(content));
        }
        info!(rule = %id, "rule patched");
        report.patched.push(id);
    }

    deck::save_json(glossary_path, &glossary)?;
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn patches_existing_rules_only() {
        let dir = tempdir().unwrap();
        let glossary = dir.path().join("english_rules.json");
        let patch = dir.path().join("patch.json");
        fs::write(
            &glossary,
            serde_json::to_string(&json!({
                "85": {"title": "Old", "content": "<p>old</p>", "level": "B1"},
                "86": {"title": "Like", "content": "<p>like</p>"}
            }))
            .unwrap(),
        )
        .unwrap();
        fs::write(
            &patch,
            serde_json::to_string(&json!({
                "85": {"title": "'Don't have to' vs. 'Mustn't'", "content": "<p>new</p>"},
                "86": {"content": "<p>What... like?</p>"},
                "999": {"content": "nowhere"}
            }))
            .unwrap(),
        )
        .unwrap();

        let report = patch_glossary(&glossary, &patch).unwrap();

        assert_eq!(report.patched, vec!["85".to_string(), "86".to_string()]);
        assert_eq!(report.warnings.len(), 1);

        let saved: Value = serde_json::from_str(&fs::read_to_string(&glossary).unwrap()).unwrap();
        assert_eq!(
            saved["85"],
            json!({"title": "'Don't have to' vs. 'Mustn't'", "content": "<p>new</p>", "level": "B1"})
        );
        assert_eq!(saved["86"]["title"], "Like");
        assert_eq!(saved["86"]["content"], "<p>What... like?</p>");
        assert!(saved.get("999").is_none());
    }
}
