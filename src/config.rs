use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::{DeckError, Result};

pub const DEFAULT_PUBLIC_AUDIO_ROOT: &str = "public/data/audio";

/// Merge settings as written in a YAML file or given on the command line.
/// Every field is optional here; [`MergeSettings::resolve`] checks that the
/// required ones end up set.
///
/// ```yaml
/// target_deck: public/data/common_meeting.json
/// target_audio_dir: public/data/audio/common_meeting
/// target_prefix: mi
/// source_deck: public/data/dummy.json
/// source_audio_dir: public/data/audio/dummy
/// ```
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct MergeSettings {
    pub source_deck: Option<PathBuf>,
    pub target_deck: Option<PathBuf>,
    pub source_audio_dir: Option<PathBuf>,
    pub target_audio_dir: Option<PathBuf>,
    pub target_prefix: Option<String>,
    pub public_audio_root: Option<String>,
    pub namespace: Option<String>,
}

/// Fully resolved merge configuration: absolute-or-root-relative paths and a
/// validated prefix.
#[derive(Debug, Clone, PartialEq)]
pub struct MergeConfig {
    pub source_deck: PathBuf,
    pub target_deck: PathBuf,
    pub source_audio_dir: PathBuf,
    pub target_audio_dir: PathBuf,
    pub target_prefix: String,
    pub public_audio_root: String,
    /// Directory name used in rewritten references: `{root}/{namespace}/...`.
    pub namespace: String,
}

impl MergeSettings {
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(DeckError::NotFound(path.to_path_buf()));
        }
        let data = fs::read_to_string(path)?;
        Ok(serde_yaml::from_str(&data)?)
    }

    /// Values set in `other` win.
    pub fn overlay(self, other: MergeSettings) -> Self {
        Self {
            source_deck: other.source_deck.or(self.source_deck),
            target_deck: other.target_deck.or(self.target_deck),
            source_audio_dir: other.source_audio_dir.or(self.source_audio_dir),
            target_audio_dir: other.target_audio_dir.or(self.target_audio_dir),
            target_prefix: other.target_prefix.or(self.target_prefix),
            public_audio_root: other.public_audio_root.or(self.public_audio_root),
            namespace: other.namespace.or(self.namespace),
        }
    }

    /// Check required fields and anchor relative paths at `root`.
    pub fn resolve(self, root: &Path) -> Result<MergeConfig> {
        let source_deck = root.join(required(self.source_deck, "source_deck")?);
        let target_deck = root.join(required(self.target_deck, "target_deck")?);
        let source_audio_dir = root.join(required(self.source_audio_dir, "source_audio_dir")?);
        let target_audio_dir = root.join(required(self.target_audio_dir, "target_audio_dir")?);
        let target_prefix = required(self.target_prefix, "target_prefix")?;

        if target_prefix.is_empty()
            || !target_prefix
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-')
        {
            return Err(DeckError::InvalidConfig(format!(
                "target_prefix '{target_prefix}' must be non-empty ASCII alphanumeric/hyphen"
            )));
        }

        if source_deck == target_deck {
            return Err(DeckError::InvalidConfig(
                "source_deck and target_deck must be different files".into(),
            ));
        }

        let namespace = match self.namespace {
            Some(ns) => ns,
            None => target_audio_dir
                .file_name()
                .and_then(|n| n.to_str())
                .map(str::to_string)
                .ok_or_else(|| {
                    DeckError::InvalidConfig(format!(
                        "cannot derive namespace from target_audio_dir '{}'",
                        target_audio_dir.display()
                    ))
                })?,
        };

        Ok(MergeConfig {
            source_deck,
            target_deck,
            source_audio_dir,
            target_audio_dir,
            target_prefix,
            public_audio_root: self
                .public_audio_root
                .unwrap_or_else(|| DEFAULT_PUBLIC_AUDIO_ROOT.to_string()),
            namespace,
        })
    }
}

fn required<T>(value: Option<T>, name: &str) -> Result<T> {
    value.ok_or_else(|| DeckError::InvalidConfig(format!("missing required setting '{name}'")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn complete() -> MergeSettings {
        MergeSettings {
            source_deck: Some("public/data/dummy.json".into()),
            target_deck: Some("public/data/common_meeting.json".into()),
            source_audio_dir: Some("public/data/audio/dummy".into()),
            target_audio_dir: Some("public/data/audio/common_meeting".into()),
            target_prefix: Some("mi".into()),
            public_audio_root: None,
            namespace: None,
        }
    }

    #[test]
    fn resolve_anchors_paths_and_derives_namespace() {
        let config = complete().resolve(Path::new("/srv/app")).unwrap();
        assert_eq!(
            config.target_deck,
            PathBuf::from("/srv/app/public/data/common_meeting.json")
        );
        assert_eq!(config.namespace, "common_meeting");
        assert_eq!(config.public_audio_root, DEFAULT_PUBLIC_AUDIO_ROOT);
    }

    #[test]
    fn resolve_reports_first_missing_setting() {
        let settings = MergeSettings {
            target_prefix: None,
            ..complete()
        };
        let err = settings.resolve(Path::new(".")).unwrap_err();
        assert!(err.to_string().contains("target_prefix"));
        assert_eq!(err.code(), "invalid_config");
    }

    #[test]
    fn resolve_rejects_bad_prefix_and_same_deck() {
        let bad_prefix = MergeSettings {
            target_prefix: Some("m i".into()),
            ..complete()
        };
        assert!(bad_prefix.resolve(Path::new(".")).is_err());

        let same = MergeSettings {
            source_deck: Some("public/data/common_meeting.json".into()),
            ..complete()
        };
        assert!(same.resolve(Path::new(".")).is_err());
    }

    #[test]
    fn overlay_prefers_later_values() {
        let base = complete();
        let flags = MergeSettings {
            target_prefix: Some("cm".into()),
            ..MergeSettings::default()
        };
        let merged = base.overlay(flags);
        assert_eq!(merged.target_prefix.as_deref(), Some("cm"));
        assert!(merged.source_deck.is_some());
    }

    #[test]
    fn load_yaml_rejects_unknown_keys() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("merge.yaml");
        fs::write(&path, "target_prefix: mi\nsource_deck: a.json\n").unwrap();
        let settings = MergeSettings::load(&path).unwrap();
        assert_eq!(settings.target_prefix.as_deref(), Some("mi"));

        fs::write(&path, "target_prefx: mi\n").unwrap();
        let err = MergeSettings::load(&path).unwrap_err();
        assert_eq!(err.code(), "yaml_error");
    }
}
