use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use serde_json::Value;

const PLAYER_ID: u64 = 41188;

fn run_cli(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_pes-edit"))
        .args(args)
        .env_remove("RUST_LOG")
        .output()
        .expect("failed to run pes-edit CLI")
}

fn path_arg(path: &Path) -> String {
    path.to_string_lossy().to_string()
}

/// Two 64-byte player blocks; the second carries `PLAYER_ID` at 0xE.
fn write_player_data(dir: &Path) -> PathBuf {
    let mut bytes = vec![0u8; 128];
    bytes[64 + 0xE..64 + 0x10].copy_from_slice(&(PLAYER_ID as u16).to_le_bytes());
    bytes[64 + 0x10..64 + 0x15].copy_from_slice(&[88, 45, 80, 70, 60]);
    let path = dir.join("unnamed_0075.bin");
    fs::write(&path, bytes).expect("write player data fixture");
    path
}

fn write_abc_layout(dir: &Path) -> PathBuf {
    let path = dir.join("abc.json");
    fs::write(
        &path,
        r#"{"name":"abc","block_size":2,"fields":{"bits":[
            {"name":"A","bits":7},{"name":"B","bits":4},{"name":"C","bits":5}]}}"#,
    )
    .expect("write layout");
    path
}

#[test]
fn set_then_show_with_json_layout() {
    let dir = tempfile::tempdir().expect("tempdir");
    let data = dir.path().join("EDIT.bin");
    fs::write(&data, [0u8; 4]).expect("write fixture");
    let layout = path_arg(&write_abc_layout(dir.path()));
    let data_arg = path_arg(&data);

    let output = run_cli(&[
        "set", &data_arg, "--index", "1", "--layout", &layout, "--attr", "A=99", "--attr",
        "B=9", "--attr", "C=17",
    ]);
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    assert_eq!(fs::read(&data).expect("reread"), vec![0, 0, 0xE3, 0x8C]);

    let output = run_cli(&["show", &data_arg, "--index", "1", "--layout", &layout]);
    assert!(output.status.success());
    assert_eq!(String::from_utf8_lossy(&output.stdout), "A=99\nB=9\nC=17\n");

    let output = run_cli(&[
        "show", &data_arg, "--index", "1", "--layout", &layout, "--field", "B", "--json",
    ]);
    assert!(output.status.success());
    let json: Value = serde_json::from_slice(&output.stdout).expect("valid json");
    assert_eq!(json["index"], 1);
    assert_eq!(json["attributes"]["B"], 9);
    assert!(json["attributes"].get("A").is_none());
}

#[test]
fn show_out_of_range_block_fails() {
    let dir = tempfile::tempdir().expect("tempdir");
    let data = dir.path().join("EDIT.bin");
    fs::write(&data, [0u8; 4]).expect("write fixture");
    let layout = path_arg(&write_abc_layout(dir.path()));

    let output = run_cli(&["show", &path_arg(&data), "--index", "2", "--layout", &layout]);
    assert_eq!(output.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&output.stderr).contains("out of range"));
}

#[test]
fn out_of_range_value_is_skipped_with_warning() {
    let dir = tempfile::tempdir().expect("tempdir");
    let data = dir.path().join("EDIT.bin");
    fs::write(&data, [0u8; 2]).expect("write fixture");
    let layout = path_arg(&write_abc_layout(dir.path()));

    let output = run_cli(&[
        "set", &path_arg(&data), "--index", "0", "--layout", &layout, "--attr", "A=128",
        "--attr", "B=5",
    ]);
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("set B=5"));
    assert!(stdout.contains("skipped A=128 (allowed range 0-127)"));
    assert!(String::from_utf8_lossy(&output.stderr).contains("value outside field range"));
    // B occupies bits 7..11
    assert_eq!(fs::read(&data).expect("reread"), vec![0x80, 0x02]);
}

#[test]
fn strict_set_leaves_file_untouched() {
    let dir = tempfile::tempdir().expect("tempdir");
    let data = dir.path().join("EDIT.bin");
    fs::write(&data, [0u8; 2]).expect("write fixture");
    let layout = path_arg(&write_abc_layout(dir.path()));

    let output = run_cli(&[
        "set", &path_arg(&data), "--index", "0", "--layout", &layout, "--strict", "--attr",
        "A=1", "--attr", "Z=1",
    ]);
    assert_eq!(output.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&output.stdout).contains("update rejected"));
    assert_eq!(fs::read(&data).expect("reread"), vec![0, 0]);
}

#[test]
fn malformed_assignment_is_a_usage_error() {
    let dir = tempfile::tempdir().expect("tempdir");
    let data = write_player_data(dir.path());

    let output = run_cli(&["set", &path_arg(&data), "--index", "0", "--attr", "attack"]);
    assert_eq!(output.status.code(), Some(2));
    assert!(String::from_utf8_lossy(&output.stderr).contains("NAME=VALUE"));
}

#[test]
fn lookup_prints_sheet_and_json() {
    let dir = tempfile::tempdir().expect("tempdir");
    let data = path_arg(&write_player_data(dir.path()));
    let names = dir.path().join("players.csv");
    fs::write(&names, "id,Name\n41188,Julio Cesar\n").expect("write csv");
    let names = path_arg(&names);

    let output = run_cli(&["lookup", &data, "--id", "41188", "--names", &names]);
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Name: Julio Cesar"));
    assert!(stdout.contains("Offset: 0x40"));

    let output = run_cli(&["lookup", &data, "--id", "41188", "--json"]);
    assert!(output.status.success());
    let json: Value = serde_json::from_slice(&output.stdout).expect("valid json");
    assert_eq!(json["name"], "Unknown");
    assert_eq!(json["block_index"], 1);
    assert_eq!(json["id_offset"], 14);
    assert_eq!(json["attributes"]["top_speed"], 70);
}

#[test]
fn lookup_of_absent_id_fails() {
    let dir = tempfile::tempdir().expect("tempdir");
    let data = path_arg(&write_player_data(dir.path()));

    let output = run_cli(&["lookup", &data, "--id", "12345"]);
    assert_eq!(output.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&output.stderr).contains("12345 not found"));
}

#[test]
fn edit_by_id_backs_up_and_overwrites_in_place() {
    let dir = tempfile::tempdir().expect("tempdir");
    let data = write_player_data(dir.path());
    let original = fs::read(&data).expect("read fixture");
    let backups = dir.path().join("backups");

    let output = run_cli(&[
        "edit",
        &path_arg(&data),
        "--id",
        "41188",
        "--attr",
        "attack=99",
        "--attr",
        "stamina=99",
        "--backup-dir",
        &path_arg(&backups),
    ]);
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));

    let edited = fs::read(&data).expect("reread");
    assert_eq!(edited[64 + 0x10], 99);
    assert_eq!(edited[64 + 0x11], 45);
    assert_eq!(edited[64 + 0x12], 99);
    assert_eq!(&edited[..64], &original[..64]);

    let copies: Vec<_> = fs::read_dir(&backups)
        .expect("backup dir created")
        .map(|entry| entry.expect("dir entry").path())
        .collect();
    assert_eq!(copies.len(), 1);
    assert_eq!(fs::read(&copies[0]).expect("read backup"), original);
}

#[test]
fn edit_with_output_keeps_input() {
    let dir = tempfile::tempdir().expect("tempdir");
    let data = write_player_data(dir.path());
    let original = fs::read(&data).expect("read fixture");
    let out = dir.path().join("edited.bin");

    let output = run_cli(&[
        "edit",
        &path_arg(&data),
        "--id",
        "41188",
        "--attr",
        "defense=255",
        "--output",
        &path_arg(&out),
        "--json",
    ]);
    assert!(output.status.success());
    let json: Value = serde_json::from_slice(&output.stdout).expect("valid json");
    assert_eq!(json["committed"], true);
    assert_eq!(json["applied"]["defense"], 255);

    assert_eq!(fs::read(&data).expect("reread input"), original);
    assert_eq!(fs::read(&out).expect("read output")[64 + 0x11], 255);
}

#[test]
fn scan_lists_every_candidate_match() {
    let dir = tempfile::tempdir().expect("tempdir");
    let data = write_player_data(dir.path());
    let mut bytes = fs::read(&data).expect("read fixture");
    bytes[0x6..0x8].copy_from_slice(&(PLAYER_ID as u16).to_le_bytes());
    // keeps the 4-byte candidate at 0x6 from matching as well
    bytes[0x8] = 1;
    fs::write(&data, bytes).expect("rewrite fixture");

    let output = run_cli(&["scan", &path_arg(&data), "--id", "41188", "--json"]);
    assert!(output.status.success());
    let json: Value = serde_json::from_slice(&output.stdout).expect("valid json");
    let hits = json["hits"].as_array().expect("hits array");
    assert_eq!(hits.len(), 2);
    assert_eq!(hits[0]["block_index"], 0);
    assert_eq!(hits[0]["id_offset"], 6);
    assert_eq!(hits[1]["block_index"], 1);
    assert_eq!(hits[1]["id_offset"], 14);

    let output = run_cli(&["scan", &path_arg(&data), "--id", "7"]);
    assert_eq!(output.status.code(), Some(1));
    assert_eq!(String::from_utf8_lossy(&output.stdout), "id 7 not found\n");
}

#[test]
fn unknown_layout_file_is_a_usage_error() {
    let dir = tempfile::tempdir().expect("tempdir");
    let data = path_arg(&write_player_data(dir.path()));

    let output = run_cli(&["show", &data, "--index", "0", "--layout", "no-such-layout.json"]);
    assert_eq!(output.status.code(), Some(2));
}
