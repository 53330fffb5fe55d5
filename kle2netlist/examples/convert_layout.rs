//! Convert a layout and print the parts of the resulting circuit.

use kle2netlist::prelude::*;
use std::path::Path;

fn main() -> Result<(), Kle2NetlistError> {
    let path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "tests/fixtures/2x2.json".to_string());
    let path = Path::new(&path);

    if !path.exists() {
        eprintln!("File not found: {}", path.display());
        eprintln!("Usage: cargo run --example convert_layout [path/to/layout.json]");
        std::process::exit(1);
    }

    let layout = kle2netlist::parse_layout(path)?;
    let options = BuildOptions {
        controller_circuit: Some(ControllerCircuit::Atmega32u4AuV1),
        ..BuildOptions::default()
    };
    let circuit = Kle2NetlistCore::build_circuit(&layout, &options)?;

    println!("Layout: {} ({} keys)", path.display(), layout.keys.len());
    for part in circuit.parts() {
        println!(
            "  {:<6} {:<24} {}",
            part.reference,
            part.value,
            part.footprint.as_deref().unwrap_or("-")
        );
    }

    let stats = circuit.stats();
    println!(
        "\n{} parts, {} nets, {} connections",
        stats.part_count, stats.net_count, stats.connection_count
    );

    let mut netlist = Vec::new();
    kle2netlist::netlist::write_netlist(&circuit, NetlistFormat::Kicad, &mut netlist)?;
    println!("Netlist size: {} bytes", netlist.len());
    Ok(())
}
