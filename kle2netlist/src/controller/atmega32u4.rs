//! ATmega32U4-AU reference circuit
//!
//! Crystal oscillator, decoupling, USB-C with ESD protection, boot (HWB)
//! pulldown and a reset button around an ATmega32U4 in TQFP-44.

use tracing::debug;

use super::ControllerError;
use crate::circuit::{Circuit, PartId};
use crate::symbols::{Symbol, SymbolLibrary};

pub const VARIANT_NAME: &str = "atmega32u4_au_v1";

/// MCU pins free for the switch matrix, in assignment order.
pub const PIN_ASSIGN_ORDER: [&str; 24] = [
    "PB0", "PB1", "PB2", "PB3", "PB4", "PB5", "PB6", "PB7", "PC6", "PC7", "PD0", "PD1", "PD2",
    "PD3", "PD4", "PD5", "PD6", "PD7", "PF0", "PF1", "PF4", "PF5", "PF6", "PF7",
];

const MCU_FOOTPRINT: &str = "Package_QFP:TQFP-44_10x10mm_P0.8mm";
const CRYSTAL_FOOTPRINT: &str = "Crystal:Crystal_SMD_3225-4Pin_3.2x2.5mm";
const CAPACITOR_FOOTPRINT: &str = "Capacitor_SMD:C_0603_1608Metric";
const RESISTOR_FOOTPRINT: &str = "Resistor_SMD:R_0603_1608Metric";
const USB_FOOTPRINT: &str = "Connector_USB:USB_C_Receptacle_XKB_U262-16XN-4BVC11";
const ESD_FOOTPRINT: &str = "Package_TO_SOT_SMD:SOT-23-6";
const RESET_BUTTON_FOOTPRINT: &str = "Button_Switch_SMD:SW_SPST_TL3342";

/// Adds capacitors and resistors with the shared 0603 footprints.
struct Passives {
    capacitor: Symbol,
    resistor: Symbol,
}

impl Passives {
    fn capacitor(&self, circuit: &mut Circuit, value: &str) -> PartId {
        let id = circuit.add_part(&self.capacitor, Some(CAPACITOR_FOOTPRINT));
        circuit.set_value(id, value);
        id
    }

    fn resistor(&self, circuit: &mut Circuit, value: &str) -> PartId {
        let id = circuit.add_part(&self.resistor, Some(RESISTOR_FOOTPRINT));
        circuit.set_value(id, value);
        id
    }
}

/// Add the reference circuit and return the MCU part.
pub fn add_reference_circuit(
    circuit: &mut Circuit,
    library: &mut SymbolLibrary,
) -> Result<PartId, ControllerError> {
    let passives = Passives {
        capacitor: library.symbol("Device", "C")?,
        resistor: library.symbol("Device", "R")?,
    };

    let mcu = circuit.add_part(
        &library.symbol("MCU_Microchip_ATmega", "ATmega32U4-A")?,
        Some(MCU_FOOTPRINT),
    );
    let vcc = circuit.net("VCC");
    let gnd = circuit.net("GND");

    circuit.connect_all(vcc, mcu, &["UVCC", "VCC", "AVCC", "VBUS"])?;
    circuit.connect_all(gnd, mcu, &["UGND", "GND"])?;

    // Crystal oscillator
    let crystal = circuit.add_part(
        &library.symbol("Device", "Crystal_GND24")?,
        Some(CRYSTAL_FOOTPRINT),
    );
    let c1 = passives.capacitor(circuit, "22p");
    let c2 = passives.capacitor(circuit, "22p");

    let xtal1 = circuit.net("mcu/XTAL1");
    circuit.connect(xtal1, c1, "1")?;
    circuit.connect(xtal1, crystal, "1")?;
    circuit.connect(xtal1, mcu, "XTAL1")?;
    let xtal2 = circuit.net("mcu/XTAL2");
    circuit.connect(xtal2, c2, "1")?;
    circuit.connect(xtal2, crystal, "3")?;
    circuit.connect(xtal2, mcu, "XTAL2")?;
    circuit.connect(gnd, c1, "2")?;
    circuit.connect(gnd, c2, "2")?;
    circuit.connect_all(gnd, crystal, &["2", "4"])?;

    // Decoupling
    let mut decoupling: Vec<PartId> = (0..4).map(|_| passives.capacitor(circuit, "0.1u")).collect();
    decoupling.push(passives.capacitor(circuit, "4.7u"));
    for capacitor in decoupling {
        circuit.connect(vcc, capacitor, "1")?;
        circuit.connect(gnd, capacitor, "2")?;
    }

    let c8 = passives.capacitor(circuit, "1u");
    let ucap = circuit.net("mcu/UCAP");
    circuit.connect(ucap, c8, "1")?;
    circuit.connect(ucap, mcu, "UCAP")?;
    circuit.connect(gnd, c8, "2")?;

    // USB with ESD protection and series resistors
    let usb = circuit.add_part(
        &library.symbol("Connector", "USB_C_Receptacle_USB2.0")?,
        Some(USB_FOOTPRINT),
    );
    let esd = circuit.add_part(
        &library.symbol("Power_Protection", "TPD2S017")?,
        Some(ESD_FOOTPRINT),
    );
    let r1 = passives.resistor(circuit, "22");
    let r2 = passives.resistor(circuit, "22");

    circuit.connect(vcc, usb, "VBUS")?;
    circuit.connect(vcc, esd, "VCC")?;
    circuit.connect_all(gnd, usb, &["GND", "SHIELD"])?;
    circuit.connect(gnd, esd, "GND")?;

    let usb_dm = circuit.net("usb/D-");
    circuit.connect(usb_dm, usb, "D-")?;
    circuit.connect(usb_dm, esd, "CH1In")?;
    // The library names this pin CH2Int, not CH2In.
    let usb_dp = circuit.net("usb/D+");
    circuit.connect(usb_dp, usb, "D+")?;
    circuit.connect(usb_dp, esd, "CH2Int")?;

    let esd_dm = circuit.net("u2/D-");
    circuit.connect(esd_dm, esd, "CH1Out")?;
    circuit.connect(esd_dm, r1, "2")?;
    let esd_dp = circuit.net("u2/D+");
    circuit.connect(esd_dp, esd, "CH2Out")?;
    circuit.connect(esd_dp, r2, "2")?;

    let mcu_dm = circuit.net("mcu/D-");
    circuit.connect(mcu_dm, r1, "1")?;
    circuit.connect(mcu_dm, mcu, "D-")?;
    let mcu_dp = circuit.net("mcu/D+");
    circuit.connect(mcu_dp, r2, "1")?;
    circuit.connect(mcu_dp, mcu, "D+")?;

    // Boot select and reset
    let r3 = passives.resistor(circuit, "10k");
    let r4 = passives.resistor(circuit, "10k");
    let button = circuit.add_part_with_ref(
        &library.symbol("Switch", "SW_SPST")?,
        Some(RESET_BUTTON_FOOTPRINT),
        "RST",
    )?;

    let hwb = circuit.net("mcu/~{HWB}/PE2");
    circuit.connect(hwb, mcu, "~{HWB}/PE2")?;
    circuit.connect(hwb, r3, "1")?;
    circuit.connect(gnd, r3, "2")?;

    let reset = circuit.net("mcu/~{RESET}");
    circuit.connect(reset, mcu, "~{RESET}")?;
    circuit.connect(reset, r4, "1")?;
    circuit.connect(reset, button, "2")?;
    circuit.connect(vcc, r4, "2")?;
    circuit.connect(gnd, button, "1")?;

    debug!("Added {} reference circuit as {}", VARIANT_NAME, circuit.reference(mcu));
    Ok(mcu)
}
