//! Integration tests for the kle2netlist library

use kle2netlist::controller::ControllerError;
use kle2netlist::matrix::MatrixError;
use kle2netlist::parser::sexp::{SExp, SExpParser};
use kle2netlist::prelude::*;
use std::path::PathBuf;

fn fixture_path(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

fn build(name: &str, options: &BuildOptions) -> kle2netlist::Result<Circuit> {
    let layout = kle2netlist::parse_layout(&fixture_path(name))?;
    Kle2NetlistCore::build_circuit(&layout, options)
}

fn test_options() -> BuildOptions {
    BuildOptions {
        switch_footprint: "PCM_lib1:SW_{:.2f}u".to_string(),
        stabilizer_footprint: Some("PCM_lib2:ST_{:.2f}u".to_string()),
        ..BuildOptions::default()
    }
}

#[test]
fn test_2x2_matrix() {
    let circuit = build("2x2.json", &test_options()).unwrap();
    let stats = circuit.stats();
    assert_eq!(stats.switch_count, 4);
    assert_eq!(stats.diode_count, 4);
    assert_eq!(stats.stabilizer_count, 0);

    let sw1 = circuit.get_part("SW1").unwrap();
    assert_eq!(sw1.footprint.as_deref(), Some("PCM_lib1:SW_1.00u"));
    let d1 = circuit.get_part("D1").unwrap();
    assert_eq!(d1.footprint.as_deref(), Some("Diode_SMD:D_SOD-323F"));

    assert_eq!(circuit.net_of_pin("D1", "1").unwrap().name, "ROW0");
    assert_eq!(circuit.net_of_pin("D3", "1").unwrap().name, "ROW1");
    assert_eq!(circuit.net_of_pin("SW2", "1").unwrap().name, "COL1");
    assert_eq!(circuit.net_of_pin("SW4", "1").unwrap().name, "COL1");

    // switch pin 2 and diode pin 2 share an unnamed net
    let sw_net = circuit.net_of_pin("SW3", "2").unwrap();
    let d_net = circuit.net_of_pin("D3", "2").unwrap();
    assert_eq!(sw_net.name, d_net.name);
    assert!(sw_net.implicit);
}

#[test]
fn test_iso_enter_uses_1u_switch_and_2u_stabilizer() {
    let circuit = build("iso-enter.json", &test_options()).unwrap();
    let sw1 = circuit.get_part("SW1").unwrap();
    assert_eq!(sw1.footprint.as_deref(), Some("PCM_lib1:SW_1.00u"));

    let st1 = circuit.get_part("ST1").unwrap();
    assert_eq!(st1.footprint.as_deref(), Some("PCM_lib2:ST_2.00u"));
    assert_eq!(st1.symbol, "MountingHole");
}

#[test]
fn test_wide_keys() {
    let circuit = build("wide-keys.json", &test_options()).unwrap();
    let footprint = |reference: &str| {
        circuit
            .get_part(reference)
            .and_then(|p| p.footprint.clone())
    };

    assert_eq!(footprint("SW1").as_deref(), Some("PCM_lib1:SW_2.00u"));
    assert_eq!(footprint("ST1").as_deref(), Some("PCM_lib2:ST_2.00u"));
    assert_eq!(footprint("SW2").as_deref(), Some("PCM_lib1:SW_2.25u"));
    assert_eq!(footprint("ST2").as_deref(), Some("PCM_lib2:ST_2.00u"));
    assert_eq!(footprint("SW3").as_deref(), Some("PCM_lib1:SW_6.25u"));
    assert_eq!(footprint("ST3").as_deref(), Some("PCM_lib2:ST_6.25u"));
    assert_eq!(footprint("SW4").as_deref(), Some("PCM_lib1:SW_1.50u"));
    assert!(circuit.get_part("ST4").is_none());
    // unsupported width falls back to 1u
    assert_eq!(footprint("SW5").as_deref(), Some("PCM_lib1:SW_1.00u"));
    assert!(circuit.get_part("ST5").is_none());

    assert_eq!(circuit.stats().stabilizer_count, 3);
}

#[test]
fn test_ai03_library_has_no_stabilizers() {
    let options = BuildOptions::for_switch_library("ai03-2725/MX_Alps_Hybrid", "MX").unwrap();
    let circuit = build("wide-keys.json", &options).unwrap();
    assert_eq!(
        circuit.get_part("SW3").unwrap().footprint.as_deref(),
        Some("MX_Only:MXOnly-6.25U-NoLED")
    );
    assert_eq!(circuit.stats().stabilizer_count, 0);
}

#[test]
fn test_raw_kle_layout() {
    let circuit = build("raw-kle.json", &test_options()).unwrap();
    assert_eq!(circuit.stats().switch_count, 3);
    assert_eq!(
        circuit.get_part("SW3").unwrap().footprint.as_deref(),
        Some("PCM_lib1:SW_2.00u")
    );
    assert!(circuit.get_part("ST3").is_some());
    assert_eq!(circuit.net_of_pin("D3", "1").unwrap().name, "ROW1");
}

#[test]
fn test_wrong_labels() {
    let err = build("wrong-labels.json", &test_options()).unwrap_err();
    assert!(matches!(
        err,
        Kle2NetlistError::Matrix(MatrixError::InvalidLabel(ref label)) if label == "x,1"
    ));
    assert!(err.to_string().starts_with("Key label invalid: 'x,1'"));
}

#[test]
fn test_controller_circuit_wires_matrix() {
    let options = BuildOptions {
        controller_circuit: Some(ControllerCircuit::Atmega32u4AuV1),
        ..test_options()
    };
    let circuit = build("2x2.json", &options).unwrap();

    let mcu = circuit.get_part("U1").unwrap();
    assert_eq!(mcu.symbol, "ATmega32U4-A");
    // rows take the first pins, columns follow
    assert_eq!(circuit.net_of_pin("U1", "8").unwrap().name, "ROW0");
    assert_eq!(circuit.net_of_pin("U1", "9").unwrap().name, "ROW1");
    assert_eq!(circuit.net_of_pin("U1", "10").unwrap().name, "COL0");
    assert_eq!(circuit.net_of_pin("U1", "11").unwrap().name, "COL1");

    assert!(circuit.get_part("RST").is_some());
    assert!(circuit.get_part("J1").is_some());
    assert!(circuit.get_net("VCC").is_some());
    assert!(circuit.get_net("GND").is_some());
}

#[test]
fn test_controller_circuit_on_empty_layout() {
    let options = BuildOptions {
        controller_circuit: Some(ControllerCircuit::Atmega32u4AuV1),
        ..test_options()
    };
    let circuit = build("empty.json", &options).unwrap();
    assert_eq!(circuit.stats().switch_count, 0);
    assert!(circuit.get_part("U1").is_some());
}

#[test]
fn test_controller_rejects_large_matrix() {
    let options = BuildOptions {
        controller_circuit: Some(ControllerCircuit::Atmega32u4AuV1),
        ..test_options()
    };
    let err = build("5x20.json", &options).unwrap_err();
    assert!(matches!(
        err,
        Kle2NetlistError::Controller(ControllerError::InsufficientPins { .. })
    ));
    assert_eq!(
        err.to_string(),
        "Controller circuit 'atmega32u4_au_v1' can't handle requested matrix, \
         available pins: 24, required: 5 (rows) + 20 (columns)"
    );
}

#[test]
fn test_convert_writes_netlists() {
    let dir = tempfile::tempdir().unwrap();
    let output = OutputOptions {
        dir: dir.path().join("out"),
        xml: true,
    };
    let result =
        Kle2NetlistCore::convert(&fixture_path("2x2.json"), &test_options(), &output).unwrap();

    assert_eq!(
        result.netlists,
        vec![
            dir.path().join("out").join("keyboard.net"),
            dir.path().join("out").join("keyboard.xml"),
        ]
    );
    assert_eq!(result.stats.switch_count, 4);

    let text = std::fs::read_to_string(&result.netlists[0]).unwrap();
    let export = SExpParser::new(&text).parse().unwrap();
    assert_eq!(export.head(), Some("export"));
    let nets: Vec<&str> = export
        .child("nets")
        .unwrap()
        .children("net")
        .filter_map(|n| n.first_arg("name"))
        .filter(|name| !name.starts_with("Net-"))
        .collect();
    assert_eq!(nets, vec!["COL0", "COL1", "ROW0", "ROW1"]);

    let codes: Vec<&str> = export
        .child("nets")
        .unwrap()
        .children("net")
        .filter_map(|n: &SExp| n.first_arg("code"))
        .collect();
    assert_eq!(codes.first(), Some(&"1"));
    assert_eq!(codes.len(), 8);

    let xml = std::fs::read_to_string(&result.netlists[1]).unwrap();
    assert!(xml.contains("<comp ref=\"SW4\">"));
}

#[test]
fn test_convert_without_xml() {
    let dir = tempfile::tempdir().unwrap();
    let options = BuildOptions {
        name: "macropad".to_string(),
        ..test_options()
    };
    let output = OutputOptions {
        dir: dir.path().to_path_buf(),
        xml: false,
    };
    let result = Kle2NetlistCore::convert(&fixture_path("2x2.json"), &options, &output).unwrap();
    assert_eq!(result.netlists, vec![dir.path().join("macropad.net")]);
    assert!(!dir.path().join("macropad.xml").exists());
}

#[test]
fn test_convert_missing_layout() {
    let dir = tempfile::tempdir().unwrap();
    let output = OutputOptions {
        dir: dir.path().to_path_buf(),
        xml: true,
    };
    let err = Kle2NetlistCore::convert(
        &fixture_path("missing.json"),
        &test_options(),
        &output,
    )
    .unwrap_err();
    assert!(matches!(err, Kle2NetlistError::LayoutNotFound(_)));
    assert!(err.to_string().ends_with("missing.json file not found"));
}

#[test]
fn test_convert_output_dir_is_file() {
    let file = tempfile::NamedTempFile::new().unwrap();
    let output = OutputOptions {
        dir: file.path().to_path_buf(),
        xml: true,
    };
    let err = Kle2NetlistCore::convert(&fixture_path("2x2.json"), &test_options(), &output)
        .unwrap_err();
    assert!(matches!(err, Kle2NetlistError::OutputIsFile(_)));
}

#[test]
fn test_symbols_from_lib_path_override_bundled() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
        dir.path().join("Switch.kicad_sym"),
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

    let options = BuildOptions {
        lib_paths: vec![dir.path().to_path_buf()],
        ..test_options()
    };
    let circuit = build("2x2.json", &options).unwrap();
    assert_eq!(circuit.get_part("SW1").unwrap().value, "Custom_Push");
    // libraries not found on the path still come from the bundled set
    assert_eq!(circuit.get_part("D1").unwrap().lib, "Device");
}
