//! CLI integration tests

use assert_cmd::cargo::cargo_bin_cmd;
use assert_cmd::Command;
use predicates::prelude::*;
use std::path::PathBuf;

/// Build command for the kle2netlist binary.
fn kle2netlist_cli() -> Command {
    cargo_bin_cmd!("kle2netlist")
}

/// Path to library test fixtures (relative to workspace).
fn fixtures_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("..")
        .join("kle2netlist")
        .join("tests")
        .join("fixtures")
}

#[test]
fn test_cli_help() {
    let mut cmd = kle2netlist_cli();

    cmd.arg("--help");
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("KiCad netlist generator"))
        .stdout(predicate::str::contains("--switch-library"))
        .stdout(predicate::str::contains("swl"));
}

#[test]
fn test_cli_version() {
    let mut cmd = kle2netlist_cli();

    cmd.arg("-v");
    cmd.assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn test_cli_convert_2x2() {
    let dir = tempfile::tempdir().unwrap();
    let mut cmd = kle2netlist_cli();

    cmd.arg("--layout")
        .arg(fixtures_dir().join("2x2.json"))
        .arg("--output-dir")
        .arg(dir.path());

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("keyboard.net"))
        .stdout(predicate::str::contains("4 switches"));

    let netlist = std::fs::read_to_string(dir.path().join("keyboard.net")).unwrap();
    assert!(netlist.starts_with("(export"));
    assert!(netlist.contains("PCM_Switch_Keyboard_Cherry_MX:SW_Cherry_MX_PCB_1.00u"));
    assert!(dir.path().join("keyboard.xml").exists());
}

#[test]
fn test_cli_no_xml_and_name() {
    let dir = tempfile::tempdir().unwrap();
    let mut cmd = kle2netlist_cli();

    cmd.arg("--layout")
        .arg(fixtures_dir().join("2x2.json"))
        .arg("--output-dir")
        .arg(dir.path())
        .arg("--name")
        .arg("pad")
        .arg("--no-xml");

    cmd.assert().success();
    assert!(dir.path().join("pad.net").exists());
    assert!(!dir.path().join("pad.xml").exists());
}

#[test]
fn test_cli_creates_output_dir() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("nested").join("out");
    let mut cmd = kle2netlist_cli();

    cmd.arg("--layout")
        .arg(fixtures_dir().join("2x2.json"))
        .arg("--output-dir")
        .arg(&out);

    cmd.assert().success();
    assert!(out.join("keyboard.net").exists());
}

#[test]
fn test_cli_switch_library_alias() {
    let dir = tempfile::tempdir().unwrap();
    let mut cmd = kle2netlist_cli();

    cmd.arg("--layout")
        .arg(fixtures_dir().join("wide-keys.json"))
        .arg("--output-dir")
        .arg(dir.path())
        .arg("--swl")
        .arg("ai03-2725/MX_Alps_Hybrid")
        .arg("--swf")
        .arg("Alps")
        .arg("--no-xml");

    cmd.assert().success();
    let netlist = std::fs::read_to_string(dir.path().join("keyboard.net")).unwrap();
    assert!(netlist.contains("Alps_Only:ALPS-6.25U"));
    assert!(!netlist.contains("(ref \"ST"));
}

#[test]
fn test_cli_json_summary() {
    let dir = tempfile::tempdir().unwrap();
    let mut cmd = kle2netlist_cli();

    cmd.arg("--layout")
        .arg(fixtures_dir().join("iso-enter.json"))
        .arg("--output-dir")
        .arg(dir.path())
        .arg("--format")
        .arg("json");

    let output = cmd.assert().success().get_output().stdout.clone();
    let json: serde_json::Value = serde_json::from_slice(&output).unwrap();
    assert_eq!(json["stats"]["switch_count"], 1);
    assert_eq!(json["stats"]["stabilizer_count"], 1);
    assert_eq!(json["netlists"].as_array().unwrap().len(), 2);
}

#[test]
fn test_cli_controller_circuit() {
    let dir = tempfile::tempdir().unwrap();
    let mut cmd = kle2netlist_cli();

    cmd.arg("--layout")
        .arg(fixtures_dir().join("2x2.json"))
        .arg("--output-dir")
        .arg(dir.path())
        .arg("--controller-circuit")
        .arg("--no-xml");

    cmd.assert().success();
    let netlist = std::fs::read_to_string(dir.path().join("keyboard.net")).unwrap();
    assert!(netlist.contains("ATmega32U4-A"));
    assert!(netlist.contains("(ref \"RST\")"));
}

#[test]
fn test_cli_controller_too_many_pins() {
    let dir = tempfile::tempdir().unwrap();
    let mut cmd = kle2netlist_cli();

    cmd.arg("--layout")
        .arg(fixtures_dir().join("5x20.json"))
        .arg("--output-dir")
        .arg(dir.path())
        .arg("--controller-circuit");

    cmd.assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("available pins: 24"));
}

#[test]
fn test_cli_missing_layout_file() {
    let dir = tempfile::tempdir().unwrap();
    let mut cmd = kle2netlist_cli();

    cmd.arg("--layout")
        .arg(fixtures_dir().join("nonexistent.json"))
        .arg("--output-dir")
        .arg(dir.path());

    cmd.assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("error: invalid --layout option"))
        .stderr(predicate::str::contains("file not found"));
}

#[test]
fn test_cli_layout_required() {
    let mut cmd = kle2netlist_cli();

    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("--layout"));
}

#[test]
fn test_cli_output_dir_is_file() {
    let file = tempfile::NamedTempFile::new().unwrap();
    let mut cmd = kle2netlist_cli();

    cmd.arg("--layout")
        .arg(fixtures_dir().join("2x2.json"))
        .arg("--output-dir")
        .arg(file.path());

    cmd.assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("pointing to an existing file"));
}

#[test]
fn test_cli_wrong_labels() {
    let dir = tempfile::tempdir().unwrap();
    let mut cmd = kle2netlist_cli();

    cmd.arg("--layout")
        .arg(fixtures_dir().join("wrong-labels.json"))
        .arg("--output-dir")
        .arg(dir.path());

    cmd.assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("Key label invalid: 'x,1'"));
}

#[test]
fn test_cli_unknown_switch_library() {
    let dir = tempfile::tempdir().unwrap();
    let mut cmd = kle2netlist_cli();

    cmd.arg("--layout")
        .arg(fixtures_dir().join("2x2.json"))
        .arg("--output-dir")
        .arg(dir.path())
        .arg("--switch-library")
        .arg("unknown/library");

    cmd.assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("Unsupported switch library 'unknown/library'"));
}

#[test]
fn test_cli_list_libraries() {
    let mut cmd = kle2netlist_cli();

    cmd.arg("--list-libraries");
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("perigoso/keyswitch-kicad-library"))
        .stdout(predicate::str::contains("ai03-2725/MX_Alps_Hybrid"))
        .stdout(predicate::str::contains("MX-Hotswap"));
}

#[test]
fn test_cli_controller_circuit_named_variant() {
    let dir = tempfile::tempdir().unwrap();
    let mut cmd = kle2netlist_cli();

    cmd.arg("--layout")
        .arg(fixtures_dir().join("2x2.json"))
        .arg("--output-dir")
        .arg(dir.path())
        .arg("--controller-circuit")
        .arg("atmega32u4_au_v1")
        .arg("--no-xml");

    cmd.assert().success();
    let netlist = std::fs::read_to_string(dir.path().join("keyboard.net")).unwrap();
    assert!(netlist.contains("ATmega32U4-A"));
}

#[test]
fn test_cli_controller_circuit_unknown_variant() {
    let dir = tempfile::tempdir().unwrap();
    let mut cmd = kle2netlist_cli();

    cmd.arg("--layout")
        .arg(fixtures_dir().join("2x2.json"))
        .arg("--output-dir")
        .arg(dir.path())
        .arg("--controller-circuit")
        .arg("rp2040_v1");

    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("Unsupported controller circuit 'rp2040_v1'"));
    assert!(!dir.path().join("keyboard.net").exists());
}

#[test]
fn test_cli_diode_footprint() {
    let dir = tempfile::tempdir().unwrap();
    let mut cmd = kle2netlist_cli();

    cmd.arg("--layout")
        .arg(fixtures_dir().join("2x2.json"))
        .arg("--output-dir")
        .arg(dir.path())
        .arg("--diode-footprint")
        .arg("Diode_THT:D_DO-35_SOD27_P7.62mm_Horizontal")
        .arg("--no-xml");

    cmd.assert().success();
    let netlist = std::fs::read_to_string(dir.path().join("keyboard.net")).unwrap();
    assert_eq!(
        netlist
            .matches("Diode_THT:D_DO-35_SOD27_P7.62mm_Horizontal")
            .count(),
        4
    );
    assert!(!netlist.contains("Diode_SMD:D_SOD-323F"));
}

#[test]
fn test_cli_no_stabilizers() {
    let with = tempfile::tempdir().unwrap();
    let without = tempfile::tempdir().unwrap();

    kle2netlist_cli()
        .arg("--layout")
        .arg(fixtures_dir().join("wide-keys.json"))
        .arg("--output-dir")
        .arg(with.path())
        .arg("--no-xml")
        .assert()
        .success();
    kle2netlist_cli()
        .arg("--layout")
        .arg(fixtures_dir().join("wide-keys.json"))
        .arg("--output-dir")
        .arg(without.path())
        .arg("--no-stabilizers")
        .arg("--no-xml")
        .assert()
        .success()
        .stdout(predicate::str::contains("0 stabilizers"));

    let netlist = std::fs::read_to_string(with.path().join("keyboard.net")).unwrap();
    assert!(netlist.contains("(ref \"ST"));
    let netlist = std::fs::read_to_string(without.path().join("keyboard.net")).unwrap();
    assert!(!netlist.contains("(ref \"ST"));
    assert!(!netlist.contains("MountingHole"));
}

#[test]
fn test_cli_lib_path() {
    let libs = tempfile::tempdir().unwrap();
    std::fs::write(
        libs.path().join("Switch.kicad_sym"),
        r#"(kicad_symbol_lib (version 20211014) (generator test)
  (symbol "SW_Push" (in_bom yes) (on_board yes)
    (property "Reference" "SW" (id 0) (at 0 0 0))
    (property "Value" "Custom_Push" (id 1) (at 0 0 0))
    (symbol "SW_Push_1_1"
      (pin passive line (at -5.08 0 0) (length 2.54) (name "1" (effects (font (size 1.27 1.27)))) (number "1" (effects (font (size 1.27 1.27)))))
      (pin passive line (at 5.08 0 180) (length 2.54) (name "2" (effects (font (size 1.27 1.27)))) (number "2" (effects (font (size 1.27 1.27)))))
    )
  )
)
"#,
    )
    .unwrap();
    let dir = tempfile::tempdir().unwrap();
    let mut cmd = kle2netlist_cli();

    cmd.arg("--layout")
        .arg(fixtures_dir().join("2x2.json"))
        .arg("--output-dir")
        .arg(dir.path())
        .arg("-l")
        .arg(libs.path())
        .arg("--no-xml");

    cmd.assert().success();
    let netlist = std::fs::read_to_string(dir.path().join("keyboard.net")).unwrap();
    assert!(netlist.contains("Custom_Push"));
}

#[test]
fn test_cli_verbose_logs_without_ansi() {
    let dir = tempfile::tempdir().unwrap();
    let mut cmd = kle2netlist_cli();

    cmd.env_remove("RUST_LOG")
        .arg("--layout")
        .arg(fixtures_dir().join("2x2.json"))
        .arg("--output-dir")
        .arg(dir.path())
        .arg("--verbose");

    cmd.assert()
        .success()
        .stderr(predicate::str::contains("Built switch matrix: 4 keys, 2 rows, 2 columns"))
        .stderr(predicate::str::contains("\x1b[").not());
}

#[test]
fn test_cli_quiet_by_default() {
    let dir = tempfile::tempdir().unwrap();
    let mut cmd = kle2netlist_cli();

    cmd.env_remove("RUST_LOG")
        .arg("--layout")
        .arg(fixtures_dir().join("2x2.json"))
        .arg("--output-dir")
        .arg(dir.path());

    cmd.assert()
        .success()
        .stderr(predicate::str::contains("Built switch matrix").not());
}

#[test]
fn test_cli_list_libraries_json() {
    let mut cmd = kle2netlist_cli();

    cmd.arg("--list-libraries").arg("--format").arg("json");

    let output = cmd.assert().success().get_output().stdout.clone();
    let json: serde_json::Value = serde_json::from_slice(&output).unwrap();
    let entries = json.as_array().unwrap();
    assert!(entries.iter().any(|e| {
        e["library"] == "perigoso/keyswitch-kicad-library" && e["module"] == "MX-Hotswap"
    }));
    assert!(entries
        .iter()
        .any(|e| e["library"] == "ai03-2725/MX_Alps_Hybrid" && e["stabilizer"].is_null()));
}
