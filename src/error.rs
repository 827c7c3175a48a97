use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum DeckError {
    #[error("file not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("failed to parse '{}': {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to write '{}': {source}", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to back up '{}': {source}", .path.display())]
    Backup {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to move asset '{}' -> '{}': {source}", .from.display(), .to.display())]
    AssetMove {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("invalid deck '{}': {reason}", .path.display())]
    InvalidDeck { path: PathBuf, reason: String },

    #[error("no card ids left under prefix '{prefix}'")]
    IdsExhausted { prefix: String },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("yaml error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl DeckError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "not_found",
            Self::Parse { .. } => "parse_error",
            Self::Write { .. } => "write_error",
            Self::Backup { .. } => "backup_failure",
            Self::AssetMove { .. } => "asset_move_error",
            Self::InvalidConfig(_) => "invalid_config",
            Self::InvalidDeck { .. } => "invalid_deck",
            Self::IdsExhausted { .. } => "ids_exhausted",
            Self::Io(_) => "io_error",
            Self::Json(_) => "json_error",
            Self::Yaml(_) => "yaml_error",
        }
    }
}

pub type Result<T> = std::result::Result<T, DeckError>;
