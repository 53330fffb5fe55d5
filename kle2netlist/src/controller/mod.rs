//! Controller Circuits
//!
//! Microcontroller reference circuits that can be appended to a switch
//! matrix. The matrix rows and columns are wired to free MCU pins.

pub mod atmega32u4;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

use crate::circuit::{Circuit, CircuitError, PartId};
use crate::matrix::Matrix;
use crate::symbols::{SymbolError, SymbolLibrary};

#[derive(Debug, Error)]
pub enum ControllerError {
    #[error("Controller circuit '{variant}' can't handle requested matrix, available pins: {available}, required: {rows} (rows) + {columns} (columns)")]
    InsufficientPins {
        variant: String,
        available: usize,
        rows: usize,
        columns: usize,
    },

    #[error("Unsupported controller circuit '{0}'")]
    UnknownVariant(String),

    #[error(transparent)]
    Symbol(#[from] SymbolError),

    #[error(transparent)]
    Circuit(#[from] CircuitError),
}

/// Supported controller circuit variants
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ControllerCircuit {
    #[default]
    #[serde(rename = "atmega32u4_au_v1")]
    Atmega32u4AuV1,
}

impl ControllerCircuit {
    pub fn name(&self) -> &'static str {
        match self {
            ControllerCircuit::Atmega32u4AuV1 => atmega32u4::VARIANT_NAME,
        }
    }

    /// MCU pins available to the matrix, in assignment order
    pub fn matrix_pins(&self) -> &'static [&'static str] {
        match self {
            ControllerCircuit::Atmega32u4AuV1 => &atmega32u4::PIN_ASSIGN_ORDER,
        }
    }

    /// Add the controller circuit and wire the matrix to it.
    ///
    /// Rows take the first free pins, columns the following ones.
    pub fn add_to(
        &self,
        circuit: &mut Circuit,
        library: &mut SymbolLibrary,
        matrix: &Matrix,
    ) -> Result<PartId, ControllerError> {
        let pins = self.matrix_pins();
        let (rows, columns) = (matrix.row_count(), matrix.column_count());
        if rows + columns > pins.len() {
            return Err(ControllerError::InsufficientPins {
                variant: self.name().to_string(),
                available: pins.len(),
                rows,
                columns,
            });
        }

        let mcu = match self {
            ControllerCircuit::Atmega32u4AuV1 => atmega32u4::add_reference_circuit(circuit, library)?,
        };

        let nets = matrix.rows.values().chain(matrix.columns.values());
        for (net, pin) in nets.zip(pins) {
            circuit.connect(*net, mcu, pin)?;
        }

        info!(
            "Added controller circuit {} ({} of {} pins used)",
            self.name(),
            rows + columns,
            pins.len()
        );
        Ok(mcu)
    }
}

impl FromStr for ControllerCircuit {
    type Err = ControllerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            atmega32u4::VARIANT_NAME => Ok(ControllerCircuit::Atmega32u4AuV1),
            other => Err(ControllerError::UnknownVariant(other.to_string())),
        }
    }
}

impl fmt::Display for ControllerCircuit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}
