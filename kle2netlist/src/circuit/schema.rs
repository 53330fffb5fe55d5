//! Circuit Data Types
//!
//! Parts, pins and nets as they appear in a generated netlist. Parts are
//! instantiated from library symbols and carry the footprint chosen for the
//! board; nets are identified by name.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::symbols::Symbol;

/// Electrical type of a pin, using KiCad's vocabulary
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ElectricalType {
    Input,
    Output,
    Bidirectional,
    TriState,
    Passive,
    Free,
    PowerIn,
    PowerOut,
    OpenCollector,
    OpenEmitter,
    NoConnect,
    #[default]
    Unspecified,
}

impl ElectricalType {
    /// Parse the pin type token used in `.kicad_sym` files.
    pub fn from_kicad(token: &str) -> Self {
        match token {
            "input" => ElectricalType::Input,
            "output" => ElectricalType::Output,
            "bidirectional" => ElectricalType::Bidirectional,
            "tri_state" => ElectricalType::TriState,
            "passive" => ElectricalType::Passive,
            "free" => ElectricalType::Free,
            "power_in" => ElectricalType::PowerIn,
            "power_out" => ElectricalType::PowerOut,
            "open_collector" => ElectricalType::OpenCollector,
            "open_emitter" => ElectricalType::OpenEmitter,
            "no_connect" => ElectricalType::NoConnect,
            _ => ElectricalType::Unspecified,
        }
    }

    /// Token written to netlists (`pintype` / `type`).
    pub fn as_kicad(&self) -> &'static str {
        match self {
            ElectricalType::Input => "input",
            ElectricalType::Output => "output",
            ElectricalType::Bidirectional => "bidirectional",
            ElectricalType::TriState => "tri_state",
            ElectricalType::Passive => "passive",
            ElectricalType::Free => "free",
            ElectricalType::PowerIn => "power_in",
            ElectricalType::PowerOut => "power_out",
            ElectricalType::OpenCollector => "open_collector",
            ElectricalType::OpenEmitter => "open_emitter",
            ElectricalType::NoConnect => "no_connect",
            ElectricalType::Unspecified => "unspecified",
        }
    }
}

/// A pin on a part
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pin {
    /// Pin number (e.g., "1", "A4", "S1")
    pub number: String,

    /// Pin name (e.g., "K", "VBUS", "~{RESET}")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Electrical type of the pin
    #[serde(default)]
    pub electrical_type: ElectricalType,
}

impl Pin {
    pub fn new(number: impl Into<String>) -> Self {
        Self {
            number: number.into(),
            name: None,
            electrical_type: ElectricalType::Unspecified,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_type(mut self, electrical_type: ElectricalType) -> Self {
        self.electrical_type = electrical_type;
        self
    }

    /// Pin function as written to netlists: the name, or the number for
    /// unnamed pins.
    pub fn function(&self) -> &str {
        match self.name.as_deref() {
            Some(name) if !name.is_empty() && name != "~" => name,
            _ => &self.number,
        }
    }
}

/// A part instantiated from a library symbol
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Part {
    /// Reference designator (e.g., "SW1", "D1", "ST3")
    pub reference: String,

    /// Symbol library nickname (e.g., "Device")
    pub lib: String,

    /// Symbol name inside the library (e.g., "SW_Push")
    pub symbol: String,

    /// Part value (e.g., "22p", "10k"); defaults to the symbol's value
    pub value: String,

    /// Footprint identifier (`Library:Footprint`)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub footprint: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default)]
    pub pins: Vec<Pin>,
}

impl Part {
    pub fn from_symbol(symbol: &Symbol, reference: impl Into<String>) -> Self {
        Self {
            reference: reference.into(),
            lib: symbol.lib.clone(),
            symbol: symbol.name.clone(),
            value: symbol.value.clone(),
            footprint: None,
            description: symbol.description.clone(),
            pins: symbol.pins.clone(),
        }
    }

    /// Get the component type from reference designator
    pub fn component_type(&self) -> ComponentType {
        ComponentType::from_reference(&self.reference)
    }

    /// Get pin by number
    pub fn get_pin(&self, number: &str) -> Option<&Pin> {
        self.pins.iter().find(|p| p.number == number)
    }

    /// Resolve a pin selector: an exact pin number wins, otherwise every pin
    /// whose name matches is returned.
    pub fn resolve_pins(&self, selector: &str) -> Vec<&Pin> {
        if let Some(pin) = self.get_pin(selector) {
            return vec![pin];
        }
        self.pins
            .iter()
            .filter(|p| p.name.as_deref() == Some(selector))
            .collect()
    }
}

/// Component type inferred from reference designator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ComponentType {
    Switch,       // SW
    Button,       // RST
    Diode,        // D
    Stabilizer,   // ST
    Unknown,
}

impl ComponentType {
    pub fn from_reference(reference: &str) -> Self {
        let upper = reference.to_uppercase();
        let prefix: String = upper.chars().take_while(|c| c.is_alphabetic()).collect();

        match prefix.as_str() {
            "SW" => ComponentType::Switch,
            "RST" => ComponentType::Button,
            "D" => ComponentType::Diode,
            "ST" => ComponentType::Stabilizer,
            _ => ComponentType::Unknown,
        }
    }
}

/// A net (electrical connection) in the circuit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Net {
    /// Net name
    pub name: String,

    /// Whether the name was generated from a pin rather than given explicitly
    #[serde(default)]
    pub implicit: bool,
}

impl Net {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            implicit: false,
        }
    }

    pub fn implicit(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            implicit: true,
        }
    }
}

/// A connection point in a net
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NetConnection {
    /// Reference designator of the part
    pub reference: String,

    /// Pin number on the part
    pub pin_number: String,
}

impl NetConnection {
    pub fn new(reference: impl Into<String>, pin_number: impl Into<String>) -> Self {
        Self {
            reference: reference.into(),
            pin_number: pin_number.into(),
        }
    }
}

/// Metadata written to the netlist design header
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CircuitMetadata {
    /// Design name (netlist `source`)
    pub name: String,

    /// Generator identification (netlist `tool`)
    pub tool: String,

    /// Timestamp written as the netlist `date`
    pub created: DateTime<Utc>,
}

impl Default for CircuitMetadata {
    fn default() -> Self {
        Self {
            name: "keyboard".to_string(),
            tool: format!("kle2netlist {}", env!("CARGO_PKG_VERSION")),
            created: Utc::now(),
        }
    }
}
