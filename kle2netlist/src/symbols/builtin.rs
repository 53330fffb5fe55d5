//! Bundled Symbol Libraries
//!
//! Subsets of the KiCad standard symbol libraries, compiled into the binary
//! so a netlist can be generated without a KiCad installation. Libraries
//! found on a user search path always take precedence over these.

const EMBEDDED_DEVICE: &str = include_str!("../../data/symbols/Device.kicad_sym");
const EMBEDDED_SWITCH: &str = include_str!("../../data/symbols/Switch.kicad_sym");
const EMBEDDED_MECHANICAL: &str = include_str!("../../data/symbols/Mechanical.kicad_sym");
const EMBEDDED_MCU_ATMEGA: &str = include_str!("../../data/symbols/MCU_Microchip_ATmega.kicad_sym");
const EMBEDDED_CONNECTOR: &str = include_str!("../../data/symbols/Connector.kicad_sym");
const EMBEDDED_POWER_PROTECTION: &str =
    include_str!("../../data/symbols/Power_Protection.kicad_sym");

const EMBEDDED_LIBRARIES: [(&str, &str); 6] = [
    ("Device", EMBEDDED_DEVICE),
    ("Switch", EMBEDDED_SWITCH),
    ("Mechanical", EMBEDDED_MECHANICAL),
    ("MCU_Microchip_ATmega", EMBEDDED_MCU_ATMEGA),
    ("Connector", EMBEDDED_CONNECTOR),
    ("Power_Protection", EMBEDDED_POWER_PROTECTION),
];

/// Source text of a bundled library, by nickname.
pub fn embedded_library(name: &str) -> Option<&'static str> {
    EMBEDDED_LIBRARIES
        .iter()
        .find(|(lib, _)| *lib == name)
        .map(|(_, source)| *source)
}

/// Nicknames of all bundled libraries
pub fn embedded_library_names() -> impl Iterator<Item = &'static str> {
    EMBEDDED_LIBRARIES.iter().map(|(lib, _)| *lib)
}
