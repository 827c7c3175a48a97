use std::fs;
use std::path::{Path, PathBuf};

use chrono::Local;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{DeckError, Result};
use crate::model::Deck;

/// Read and parse a JSON document, distinguishing a missing file from a
/// malformed one.
pub fn load_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    if !path.exists() {
        return Err(DeckError::NotFound(path.to_path_buf()));
    }
    debug!(path = %path.display(), "loading");
    let data = fs::read(path)?;
    serde_json::from_slice(&data).map_err(|source| DeckError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

/// Pretty-print `value` to `path` with non-ASCII text left unescaped.
///
/// The document is written to a sibling temp file and renamed over `path`, so
/// a failed write never leaves a truncated file behind.
pub fn save_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value)?;
    let write_err = |source| DeckError::Write {
        path: path.to_path_buf(),
        source,
    };

    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let staging = path.with_file_name(format!(".{file_name}.{}.tmp", Uuid::new_v4()));

    if let Err(err) = fs::write(&staging, json) {
        let _ = fs::remove_file(&staging);
        return Err(write_err(err));
    }
    if let Err(err) = fs::rename(&staging, path) {
        let _ = fs::remove_file(&staging);
        return Err(write_err(err));
    }

    info!(path = %path.display(), "saved");
    Ok(())
}

pub fn load(path: &Path) -> Result<Deck> {
    load_json(path)
}

pub fn save(path: &Path, deck: &Deck) -> Result<()> {
    save_json(path, deck)
}

/// `deck.json` -> `deck.json.bak`.
pub fn backup_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".bak");
    PathBuf::from(name)
}

/// Copy the on-disk file to `{path}.bak`, overwriting an older backup.
pub fn backup(path: &Path) -> Result<PathBuf> {
    let dest = backup_path(path);
    fs::copy(path, &dest).map_err(|source| DeckError::Backup {
        path: path.to_path_buf(),
        source,
    })?;
    info!(backup = %dest.display(), "backup created");
    Ok(dest)
}

/// Copy the on-disk file to `{dir}/{YYYYMMDD_HHMMSS}_{filename}`, creating
/// `dir` if needed.
pub fn backup_timestamped(path: &Path, dir: &Path) -> Result<PathBuf> {
    let backup_err = |source| DeckError::Backup {
        path: path.to_path_buf(),
        source,
    };

    fs::create_dir_all(dir).map_err(backup_err)?;
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "deck.json".to_string());
    let stamp = Local::now().format("%Y%m%d_%H%M%S");
    let dest = dir.join(format!("{stamp}_{file_name}"));

    fs::copy(path, &dest).map_err(backup_err)?;
    info!(backup = %dest.display(), "backup created");
    Ok(dest)
}
