pub mod audio_paths;
pub mod glossary;
pub mod inject;
pub mod merge;
pub mod orphans;
pub mod strip_field;
pub mod update;
