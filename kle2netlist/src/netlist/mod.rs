//! Netlist Generation
//!
//! Serializes a [`Circuit`] as a KiCad netlist, either in the s-expression
//! format read by Pcbnew or in the equivalent XML format. Both writers work
//! from the same [`NetlistData`] snapshot so they always agree on content
//! and order.

pub mod kicad;
pub mod xml;

use std::cmp::Ordering;
use std::fmt;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use std::str::FromStr;

use serde::Serialize;
use thiserror::Error;
use tracing::info;
use uuid::Uuid;

use crate::circuit::{Circuit, ComponentType, Part, Pin};

/// Netlist format version written in the `export` header
pub const NETLIST_VERSION: &str = "E";

#[derive(Debug, Error)]
pub enum NetlistError {
    #[error("Unsupported netlist type: {0}")]
    UnsupportedType(String),

    #[error("Failed to write netlist: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to write XML netlist: {0}")]
    Xml(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum NetlistFormat {
    /// KiCad s-expression netlist (`.net`)
    Kicad,
    /// KiCad XML netlist (`.xml`)
    Xml,
}

impl NetlistFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            NetlistFormat::Kicad => "net",
            NetlistFormat::Xml => "xml",
        }
    }
}

impl FromStr for NetlistFormat {
    type Err = NetlistError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "net" | "kicad" => Ok(NetlistFormat::Kicad),
            "xml" => Ok(NetlistFormat::Xml),
            other => Err(NetlistError::UnsupportedType(other.to_string())),
        }
    }
}

impl fmt::Display for NetlistFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.extension())
    }
}

/// A component entry (`comp`)
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComponentEntry {
    pub reference: String,
    pub value: String,
    pub footprint: Option<String>,
    pub lib: String,
    pub part: String,
    pub description: Option<String>,
    pub tstamp: String,
}

/// A library part entry (`libpart`), one per distinct symbol
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LibPartEntry {
    pub lib: String,
    pub part: String,
    pub description: Option<String>,
    pub reference_prefix: String,
    pub value: String,
    pub pins: Vec<Pin>,
}

/// A pin attached to a net (`node`)
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NodeEntry {
    pub reference: String,
    pub pin: String,
    pub pin_function: Option<String>,
    pub pin_type: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NetEntry {
    pub code: usize,
    pub name: String,
    pub nodes: Vec<NodeEntry>,
}

/// Everything a netlist file contains, in output order
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NetlistData {
    pub source: String,
    pub date: String,
    pub tool: String,
    pub components: Vec<ComponentEntry>,
    pub libparts: Vec<LibPartEntry>,
    pub nets: Vec<NetEntry>,
}

fn natural(a: &str, b: &str) -> Ordering {
    natord::compare(a, b)
}

/// Deterministic timestamp for a component, stable across runs.
fn component_tstamp(source: &str, reference: &str) -> String {
    Uuid::new_v5(&Uuid::NAMESPACE_OID, format!("{}/{}", source, reference).as_bytes()).to_string()
}

fn reference_prefix(part: &Part) -> String {
    part.reference
        .chars()
        .take_while(|c| c.is_ascii_alphabetic())
        .collect()
}

impl NetlistData {
    pub fn from_circuit(circuit: &Circuit) -> Self {
        let source = circuit.metadata.name.clone();

        let mut parts: Vec<&Part> = circuit.parts().collect();
        parts.sort_by(|a, b| natural(&a.reference, &b.reference));

        let components = parts
            .iter()
            .map(|p| ComponentEntry {
                reference: p.reference.clone(),
                value: p.value.clone(),
                footprint: p.footprint.clone(),
                lib: p.lib.clone(),
                part: p.symbol.clone(),
                description: p.description.clone(),
                tstamp: component_tstamp(&source, &p.reference),
            })
            .collect();

        let mut libparts: Vec<LibPartEntry> = Vec::new();
        for p in &parts {
            if libparts.iter().any(|l| l.lib == p.lib && l.part == p.symbol) {
                continue;
            }
            let prefix = match p.component_type() {
                // Explicit references such as RST or ST1 do not carry the symbol prefix
                ComponentType::Switch | ComponentType::Button => "SW".to_string(),
                ComponentType::Stabilizer => "H".to_string(),
                _ => reference_prefix(p),
            };
            libparts.push(LibPartEntry {
                lib: p.lib.clone(),
                part: p.symbol.clone(),
                description: p.description.clone(),
                reference_prefix: prefix,
                value: p.symbol.clone(),
                pins: p.pins.clone(),
            });
        }
        libparts.sort_by(|a, b| (&a.lib, &a.part).cmp(&(&b.lib, &b.part)));

        let mut net_names: Vec<String> = circuit
            .nets()
            .map(|n| n.name.clone())
            .filter(|name| !circuit.connections(name).is_empty())
            .collect();
        net_names.sort_by(|a, b| natural(a, b));

        let nets = net_names
            .into_iter()
            .enumerate()
            .map(|(i, name)| {
                let mut nodes: Vec<NodeEntry> = circuit
                    .pins_on_net(&name)
                    .into_iter()
                    .map(|(part, pin)| NodeEntry {
                        reference: part.reference.clone(),
                        pin: pin.number.clone(),
                        pin_function: pin
                            .name
                            .as_deref()
                            .filter(|n| !n.is_empty() && *n != "~")
                            .map(str::to_string),
                        pin_type: pin.electrical_type.as_kicad().to_string(),
                    })
                    .collect();
                nodes.sort_by(|a, b| {
                    natural(&a.reference, &b.reference).then_with(|| natural(&a.pin, &b.pin))
                });
                NetEntry {
                    code: i + 1,
                    name,
                    nodes,
                }
            })
            .collect();

        Self {
            source,
            date: circuit.metadata.created.format("%m/%d/%Y %I:%M %p").to_string(),
            tool: circuit.metadata.tool.clone(),
            components,
            libparts,
            nets,
        }
    }
}

/// Serialize `circuit` in `format` to `writer`.
pub fn write_netlist<W: Write>(
    circuit: &Circuit,
    format: NetlistFormat,
    writer: W,
) -> Result<(), NetlistError> {
    let data = NetlistData::from_circuit(circuit);
    match format {
        NetlistFormat::Kicad => kicad::write(&data, writer),
        NetlistFormat::Xml => xml::write(&data, writer),
    }
}

/// Serialize `circuit` in `format` to the file at `path`.
pub fn generate_netlist(
    circuit: &Circuit,
    path: &Path,
    format: NetlistFormat,
) -> Result<(), NetlistError> {
    let mut writer = BufWriter::new(File::create(path)?);
    write_netlist(circuit, format, &mut writer)?;
    writer.flush()?;
    info!("Wrote {} netlist to {}", format, path.display());
    Ok(())
}
