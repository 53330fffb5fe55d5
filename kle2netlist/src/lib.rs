//! kle2netlist - KiCad netlists for mechanical keyboards
//!
//! This library turns a keyboard-layout-editor (KLE) layout into a KiCad
//! netlist: one switch, diode and (for wide keys) stabilizer per key, wired
//! into a row/column matrix, optionally with an ATmega32U4 controller
//! circuit attached.
//!
//! # Quick Start
//!
//! ```no_run
//! use kle2netlist::{BuildOptions, Kle2NetlistCore, OutputOptions};
//! use std::path::Path;
//!
//! let result = Kle2NetlistCore::convert(
//!     Path::new("layout.json"),
//!     &BuildOptions::default(),
//!     &OutputOptions::default(),
//! ).unwrap();
//!
//! for path in &result.netlists {
//!     println!("wrote {}", path.display());
//! }
//! ```
//!
//! # Features
//!
//! - **Layouts**: raw KLE JSON and the kle-serial serialized form
//! - **Footprints**: switch and stabilizer footprints from known KiCad libraries
//! - **Symbols**: `.kicad_sym` libraries, with bundled fallbacks
//! - **Netlists**: KiCad s-expression and XML formats

pub mod circuit;
pub mod controller;
pub mod core;
pub mod footprint;
pub mod layout;
pub mod matrix;
pub mod netlist;
pub mod parser;
pub mod symbols;

// Re-export main types
pub use circuit::{Circuit, CircuitStats};
pub use controller::ControllerCircuit;
pub use crate::core::{
    BuildOptions, ConversionResult, Kle2NetlistCore, Kle2NetlistError, OutputOptions, Result,
};
pub use footprint::{FootprintSelector, FootprintTemplate};
pub use layout::{Key, Layout};
pub use netlist::NetlistFormat;

/// Parse a layout file (convenience wrapper).
pub fn parse_layout(path: &std::path::Path) -> Result<Layout> {
    Ok(Layout::from_path(path)?)
}

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::{
        BuildOptions, Circuit, ControllerCircuit, Kle2NetlistCore, Kle2NetlistError, Layout,
        NetlistFormat, OutputOptions,
    };
}
