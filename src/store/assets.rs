use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::error::{DeckError, Result};

/// What happened to the file behind one audio reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RelocationOutcome {
    /// File moved from the source directory to the target directory.
    Moved,
    /// Dry run: the file exists and would have been moved.
    Planned,
    /// Source file gone but the renamed file is already in place.
    AlreadyMigrated,
    /// No file on either side; the reference was rewritten anyway.
    Missing,
    /// Reference with no usable filename (empty, `.`, `..` or ending in a
    /// separator), left as it was.
    Skipped,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Relocation {
    pub reference: String,
    pub outcome: RelocationOutcome,
}

/// Moves audio files between two namespace directories, renaming them to the
/// card's new ID, and computes the reference the deck should store.
///
/// References are always `{public_root}/{namespace}/{filename}` with forward
/// slashes, whatever the host separator.
#[derive(Debug, Clone)]
pub struct AssetRelocator {
    source_dir: PathBuf,
    target_dir: PathBuf,
    public_root: String,
    namespace: String,
    dry_run: bool,
}

impl AssetRelocator {
    pub fn new(
        source_dir: impl Into<PathBuf>,
        target_dir: impl Into<PathBuf>,
        public_root: &str,
        namespace: &str,
    ) -> Self {
        Self {
            source_dir: source_dir.into(),
            target_dir: target_dir.into(),
            public_root: public_root.trim_end_matches(['/', '\\']).replace('\\', "/"),
            namespace: namespace.to_string(),
            dry_run: false,
        }
    }

    /// Compute references and report outcomes without touching the disk.
    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Reference a deck should store for `filename` in the target namespace.
    pub fn reference_for(&self, filename: &str) -> String {
        if self.public_root.is_empty() {
            format!("{}/{filename}", self.namespace)
        } else {
            format!("{}/{}/{filename}", self.public_root, self.namespace)
        }
    }

    /// Move the file behind `old_ref` into the target namespace under its new
    /// name and return the rewritten reference.
    ///
    /// A missing source file is not an error: if the renamed file is already
    /// in the target directory the call is a no-op, otherwise a warning is
    /// logged and the reference is still rewritten.
    pub fn relocate(&self, old_ref: &str, old_id: &str, new_id: &str) -> Result<Relocation> {
        let filename = file_name(old_ref);
        if matches!(filename, "" | "." | "..") {
            return Ok(Relocation {
                reference: old_ref.to_string(),
                outcome: RelocationOutcome::Skipped,
            });
        }

        let new_filename = renamed(filename, old_id, new_id);
        let old_fs = self.source_dir.join(filename);
        let new_fs = self.target_dir.join(&new_filename);
        let reference = self.reference_for(&new_filename);

        let outcome = if old_fs.is_file() {
            if self.dry_run {
                debug!(from = %old_fs.display(), to = %new_fs.display(), "would move audio");
                RelocationOutcome::Planned
            } else {
                self.move_file(&old_fs, &new_fs)?;
                info!("moved audio: {filename} -> {new_filename}");
                RelocationOutcome::Moved
            }
        } else if new_fs.is_file() {
            debug!("audio already at target: {new_filename}");
            RelocationOutcome::AlreadyMigrated
        } else {
            warn!(
                missing = %old_fs.display(),
                reference = %reference,
                "audio file not found on disk; reference rewritten without a move"
            );
            RelocationOutcome::Missing
        };

        Ok(Relocation { reference, outcome })
    }

    fn move_file(&self, from: &Path, to: &Path) -> Result<()> {
        let move_err = |source| DeckError::AssetMove {
            from: from.to_path_buf(),
            to: to.to_path_buf(),
            source,
        };

        if !self.target_dir.exists() {
            fs::create_dir_all(&self.target_dir).map_err(move_err)?;
            debug!(dir = %self.target_dir.display(), "created target audio directory");
        }
        if to.exists() {
            warn!(path = %to.display(), "overwriting existing audio file");
        }
        fs::rename(from, to).map_err(move_err)
    }
}

/// Last path component of a reference, accepting either separator.
pub fn file_name(reference: &str) -> &str {
    reference.rsplit(['/', '\\']).next().unwrap_or(reference)
}

/// `filename` with every occurrence of `old_id` swapped for `new_id`.
pub fn renamed(filename: &str, old_id: &str, new_id: &str) -> String {
    if old_id.is_empty() {
        return filename.to_string();
    }
    filename.replace(old_id, new_id)
}
