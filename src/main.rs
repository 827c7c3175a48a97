use std::path::PathBuf;

use clap::{Parser, Subcommand};
use deckops::commands::inject::InjectMode;
use deckops::config::{DEFAULT_PUBLIC_AUDIO_ROOT, MergeSettings};
use deckops::output::Format;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "deckops",
    version,
    about = "Maintenance tool for flashcard deck JSON files and their audio assets"
)]
struct Cli {
    /// Output format
    #[arg(long, global = true, value_enum, default_value = "json")]
    format: Format,
    /// Shorthand for --format pretty
    #[arg(long, global = true, hide = true)]
    pretty: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Move every card of a source deck into a target deck under fresh IDs
    Merge {
        /// YAML file with merge settings; flags override its values
        #[arg(long)]
        config: Option<PathBuf>,
        /// Directory relative paths are resolved against
        #[arg(long, default_value = ".")]
        root: PathBuf,
        /// Source deck JSON (drained after the merge)
        #[arg(long)]
        source: Option<PathBuf>,
        /// Target deck JSON
        #[arg(long)]
        target: Option<PathBuf>,
        /// Audio directory of the source deck
        #[arg(long)]
        source_audio: Option<PathBuf>,
        /// Audio directory of the target deck
        #[arg(long)]
        target_audio: Option<PathBuf>,
        /// ID prefix of the target deck (e.g. `mi`)
        #[arg(long)]
        prefix: Option<String>,
        /// Public prefix stored in audio references
        #[arg(long)]
        audio_root: Option<String>,
        /// Directory name used in rewritten references (defaults to the target audio dir name)
        #[arg(long)]
        namespace: Option<String>,
        /// Report what would happen without touching any file
        #[arg(long)]
        dry_run: bool,
    },
    /// Replace cards in a deck with edited copies from a JSON array
    Update {
        /// Deck JSON to update
        deck: PathBuf,
        /// JSON array of replacement cards
        #[arg(long)]
        input: PathBuf,
    },
    /// Write lookup-table values into a field of every mapped card
    Inject {
        /// Deck JSON to modify
        deck: PathBuf,
        /// JSON object mapping cardId to value
        #[arg(long)]
        map: PathBuf,
        /// Dotted path of the field to write (e.g. `content.value`)
        #[arg(long)]
        field: String,
        /// How the value is written
        #[arg(long, value_enum, default_value = "set")]
        mode: InjectMode,
        /// Also write this value to the `type` key beside the field (set mode only)
        #[arg(long)]
        set_type: Option<String>,
    },
    /// Remove a top-level key from every card
    StripField {
        /// Deck JSON to modify
        deck: PathBuf,
        /// Key to remove
        #[arg(long)]
        field: String,
    },
    /// Point question/answer audio at `{root}/{deckId}/{cardId}_q|a.mp3`
    AudioPaths {
        /// Deck JSON to modify
        deck: PathBuf,
        /// Public audio prefix
        #[arg(long, default_value = DEFAULT_PUBLIC_AUDIO_ROOT)]
        audio_root: String,
    },
    /// Overwrite title/content of existing glossary rules
    PatchGlossary {
        /// Glossary JSON keyed by rule ID
        glossary: PathBuf,
        /// Patch JSON keyed by rule ID
        #[arg(long)]
        patch: PathBuf,
    },
    /// List audio references whose file does not exist
    Orphans {
        /// Deck JSON to check
        deck: PathBuf,
        /// Directory audio references are relative to
        #[arg(long, default_value = ".")]
        root: PathBuf,
    },
}

fn run(cli: Cli, format: Format) -> deckops::error::Result<()> {
    match cli.command {
        Commands::Merge {
            config,
            root,
            source,
            target,
            source_audio,
            target_audio,
            prefix,
            audio_root,
            namespace,
            dry_run,
        } => {
            let base = match config {
                Some(path) => MergeSettings::load(&path)?,
                None => MergeSettings::default(),
            };
            let flags = MergeSettings {
                source_deck: source,
                target_deck: target,
                source_audio_dir: source_audio,
                target_audio_dir: target_audio,
                target_prefix: prefix,
                public_audio_root: audio_root,
                namespace,
            };
            let config = base.overlay(flags).resolve(&root)?;
            deckops::commands::merge::run(&config, dry_run, format)
        }
        Commands::Update { deck, input } => {
            deckops::commands::update::run(&deck, &input, format)
        }
        Commands::Inject {
            deck,
            map,
            field,
            mode,
            set_type,
        } => deckops::commands::inject::run(
            &deck,
            &map,
            &field,
            mode,
            set_type.as_deref(),
            format,
        ),
        Commands::StripField { deck, field } => {
            deckops::commands::strip_field::run(&deck, &field, format)
        }
        Commands::AudioPaths { deck, audio_root } => {
            deckops::commands::audio_paths::run(&deck, &audio_root, format)
        }
        Commands::PatchGlossary { glossary, patch } => {
            deckops::commands::glossary::run(&glossary, &patch, format)
        }
        Commands::Orphans { deck, root } => deckops::commands::orphans::run(&deck, &root, format),
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env("DECKOPS_LOG").unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() {
    let cli = Cli::parse();
    let format = if cli.pretty {
        Format::Pretty
    } else {
        cli.format
    };
    init_tracing();
    if let Err(e) = run(cli, format) {
        match format {
            Format::Json => {
                eprintln!(
                    "{}",
                    serde_json::json!({
                        "error": e.code(),
                        "message": e.to_string()
                    })
                );
            }
            _ => eprintln!("error: {e}"),
        }
        std::process::exit(1);
    }
}
