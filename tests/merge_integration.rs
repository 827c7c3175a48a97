use std::fs;
use std::path::Path;
use std::process::{Command, Output};

use predicates::prelude::*;
use serde_json::{Value, json};
use tempfile::tempdir;

fn run_deckops(root: &Path, args: &[&str]) -> Output {
    let binary = assert_cmd::cargo::cargo_bin!("deckops");
    let mut cmd = Command::new(binary);
    cmd.current_dir(root);
    cmd.env("NO_COLOR", "1");
    cmd.env("DECKOPS_LOG", "off");
    cmd.args(args);
    cmd.output().expect("deckops command executes")
}

fn run_deckops_json(root: &Path, args: &[&str]) -> Value {
    let output = run_deckops(root, args);
    assert!(
        output.status.success(),
        "deckops {:?} failed:\nstdout:\n{}\nstderr:\n{}",
        args,
        String::from_utf8_lossy(&output.stdout),
        String::from_utf8_lossy(&output.stderr)
    );
    serde_json::from_slice(&output.stdout).expect("valid json stdout")
}

fn run_deckops_err_json(root: &Path, args: &[&str]) -> Value {
    let output = run_deckops(root, args);
    assert_eq!(output.status.code(), Some(1), "expected exit code 1");
    let stderr = String::from_utf8_lossy(&output.stderr);
    let json_line = stderr
        .lines()
        .rev()
        .find(|line| !line.trim().is_empty())
        .unwrap_or("");
    serde_json::from_str(json_line).expect("valid json error line in stderr")
}

fn write_json(path: &Path, value: &Value) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, serde_json::to_string_pretty(value).unwrap()).unwrap();
}

fn read_json(path: &Path) -> Value {
    serde_json::from_str(&fs::read_to_string(path).unwrap()).unwrap()
}

const MERGE_FLAGS: &[&str] = &[
    "merge",
    "--source",
    "public/data/dummy.json",
    "--target",
    "public/data/common_meeting.json",
    "--source-audio",
    "public/data/audio/dummy",
    "--target-audio",
    "public/data/audio/common_meeting",
    "--prefix",
    "mi",
];

fn seed(root: &Path) {
    write_json(
        &root.join("public/data/common_meeting.json"),
        &json!({"name": "Common meeting", "deckType": "phrases", "cards": [
            {"cardId": "mi_003", "sideA": "¿Empezamos?", "audioSrc": "public/data/audio/common_meeting/mi_003.mp3"}
        ]}),
    );
    write_json(
        &root.join("public/data/dummy.json"),
        &json!({"name": "Dummy", "cards": [
            {
                "cardId": "ti_010",
                "audioSrc": "public/data/audio/dummy/ti_010.mp3",
                "sideA": {"text": "Vale", "audioSrc": "public/data/audio/dummy/ti_010_sideA.mp3"},
                "sideB": [
                    {"text": "OK", "audioSrc": "public/data/audio/dummy/ti_010_sideB_0.mp3"},
                    {"text": "Fine"}
                ]
            },
            {"cardId": "ti_011", "sideA": "Sin audio", "notes": ["kept", 1, null]}
        ]}),
    );
    let audio = root.join("public/data/audio/dummy");
    fs::create_dir_all(&audio).unwrap();
    for name in ["ti_010.mp3", "ti_010_sideA.mp3", "ti_010_sideB_0.mp3"] {
        fs::write(audio.join(name), name.as_bytes()).unwrap();
    }
}

#[test]
fn merge_moves_cards_and_audio_into_target_namespace() {
    let dir = tempdir().unwrap();
    let root = dir.path();
    seed(root);

    let report = run_deckops_json(root, MERGE_FLAGS);

    assert_eq!(report["migrated"], 2);
    assert_eq!(report["first_id"], "mi_004");
    assert_eq!(report["last_id"], "mi_005");
    assert_eq!(report["target_cards_before"], 1);
    assert_eq!(report["target_cards_after"], 3);
    assert_eq!(
        report["id_map"],
        json!([
            {"old_id": "ti_010", "new_id": "mi_004"},
            {"old_id": "ti_011", "new_id": "mi_005"}
        ])
    );

    let target = read_json(&root.join("public/data/common_meeting.json"));
    assert_eq!(target["name"], "Common meeting");
    assert_eq!(target["deckType"], "phrases");
    let cards = target["cards"].as_array().unwrap();
    assert_eq!(cards.len(), 3);
    assert_eq!(cards[1]["cardId"], "mi_004");
    assert_eq!(
        cards[1]["audioSrc"],
        "public/data/audio/common_meeting/mi_004.mp3"
    );
    assert_eq!(
        cards[1]["sideA"]["audioSrc"],
        "public/data/audio/common_meeting/mi_004_sideA.mp3"
    );
    assert_eq!(
        cards[1]["sideB"][0]["audioSrc"],
        "public/data/audio/common_meeting/mi_004_sideB_0.mp3"
    );
    assert_eq!(cards[1]["sideB"][1], json!({"text": "Fine"}));
    assert_eq!(
        cards[2],
        json!({"cardId": "mi_005", "sideA": "Sin audio", "notes": ["kept", 1, null]})
    );

    let target_audio = root.join("public/data/audio/common_meeting");
    assert_eq!(
        fs::read(target_audio.join("mi_004_sideB_0.mp3")).unwrap(),
        b"ti_010_sideB_0.mp3"
    );
    assert!(target_audio.join("mi_004.mp3").exists());
    assert!(target_audio.join("mi_004_sideA.mp3").exists());
    assert!(
        fs::read_dir(root.join("public/data/audio/dummy"))
            .unwrap()
            .next()
            .is_none()
    );

    let source = read_json(&root.join("public/data/dummy.json"));
    assert_eq!(source["cards"], json!([]));
    assert_eq!(source["name"], "Dummy");

    assert!(root.join("public/data/common_meeting.json.bak").exists());
    assert!(root.join("public/data/dummy.json.bak").exists());
}

#[test]
fn merge_reads_yaml_config_and_flags_override_it() {
    let dir = tempdir().unwrap();
    let root = dir.path();
    seed(root);
    fs::write(
        root.join("merge.yaml"),
        "source_deck: public/data/dummy.json\n\
         target_deck: public/data/common_meeting.json\n\
         source_audio_dir: public/data/audio/dummy\n\
         target_audio_dir: public/data/audio/common_meeting\n\
         target_prefix: zz\n",
    )
    .unwrap();

    let report = run_deckops_json(
        root,
        &["merge", "--config", "merge.yaml", "--prefix", "mi", "--dry-run"],
    );

    assert_eq!(report["dry_run"], true);
    assert_eq!(report["first_id"], "mi_004");
    assert_eq!(report["last_id"], "mi_005");
    assert!(root.join("public/data/audio/dummy/ti_010.mp3").exists());
    assert!(!root.join("public/data/common_meeting.json.bak").exists());
    assert_eq!(
        read_json(&root.join("public/data/dummy.json"))["cards"]
            .as_array()
            .unwrap()
            .len(),
        2
    );
}

#[test]
fn merge_aborts_on_unparsable_target_without_side_effects() {
    let dir = tempdir().unwrap();
    let root = dir.path();
    seed(root);
    let broken = "{\"cards\": [";
    fs::write(root.join("public/data/common_meeting.json"), broken).unwrap();

    let err = run_deckops_err_json(root, MERGE_FLAGS);

    assert_eq!(err["error"], "parse_error");
    assert_eq!(
        fs::read_to_string(root.join("public/data/common_meeting.json")).unwrap(),
        broken
    );
    assert!(!root.join("public/data/common_meeting.json.bak").exists());
    assert!(!root.join("public/data/dummy.json.bak").exists());
    assert!(root.join("public/data/audio/dummy/ti_010.mp3").exists());
    assert!(!root.join("public/data/audio/common_meeting").exists());
}

#[test]
fn merge_missing_setting_is_invalid_config() {
    let dir = tempdir().unwrap();
    let root = dir.path();
    seed(root);

    let err = run_deckops_err_json(
        root,
        &["merge", "--source", "public/data/dummy.json", "--prefix", "mi"],
    );

    assert_eq!(err["error"], "invalid_config");
    assert!(
        err["message"]
            .as_str()
            .unwrap()
            .contains("target_deck")
    );
}

#[test]
fn pretty_errors_are_plain_text() {
    let dir = tempdir().unwrap();
    let root = dir.path();

    let mut args = vec!["--format", "pretty"];
    args.extend_from_slice(MERGE_FLAGS);
    let output = run_deckops(root, &args);

    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(predicate::str::starts_with("error: ").eval(stderr.trim_start()));
    assert!(predicate::str::contains("not found").eval(&stderr));
}

#[test]
fn merging_an_empty_source_changes_nothing() {
    let dir = tempdir().unwrap();
    let root = dir.path();
    seed(root);
    write_json(&root.join("public/data/dummy.json"), &json!({"cards": []}));
    let before = fs::read_to_string(root.join("public/data/common_meeting.json")).unwrap();

    let report = run_deckops_json(root, MERGE_FLAGS);

    assert_eq!(report["migrated"], 0);
    assert_eq!(
        fs::read_to_string(root.join("public/data/common_meeting.json")).unwrap(),
        before
    );
    assert!(!root.join("public/data/common_meeting.json.bak").exists());
}
