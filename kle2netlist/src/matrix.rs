//! Switch Matrix
//!
//! Creates one switch, one diode and (for wide keys) one stabilizer per key
//! and wires them into `ROW<r>` / `COL<c>` nets taken from each key's
//! `row,column` label.

use std::num::ParseIntError;
use std::sync::LazyLock;

use indexmap::IndexMap;
use regex::Regex;
use thiserror::Error;
use tracing::{debug, info};

use crate::circuit::{Circuit, CircuitError, NetId, PartId};
use crate::footprint::FootprintSelector;
use crate::layout::Key;
use crate::symbols::{SymbolError, SymbolLibrary};

static MATRIX_LABEL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[0-9]+,[0-9]+$").expect("valid matrix label pattern"));

#[derive(Debug, Error)]
pub enum MatrixError {
    #[error("Key labels missing")]
    LabelsMissing,

    #[error("Key label invalid: '{0}' - label needs to follow 'row,column' format, for example '1,2'")]
    InvalidLabel(String),

    #[error("Key label out of range: '{0}'")]
    LabelOutOfRange(String),

    #[error(transparent)]
    Symbol(#[from] SymbolError),

    #[error(transparent)]
    Circuit(#[from] CircuitError),
}

/// Row and column nets of a switch matrix, in order of first appearance
#[derive(Debug, Clone, Default)]
pub struct Matrix {
    pub rows: IndexMap<u64, NetId>,
    pub columns: IndexMap<u64, NetId>,
    /// Switch parts, in key order
    pub switches: Vec<PartId>,
}

impl Matrix {
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }
}

/// Parse a whitespace-free `row,column` label.
fn parse_label(label: &str) -> Result<(u64, u64), MatrixError> {
    let invalid = || MatrixError::InvalidLabel(label.to_string());
    if !MATRIX_LABEL.is_match(label) {
        return Err(invalid());
    }
    let (row, column) = label.split_once(',').ok_or_else(invalid)?;
    let out_of_range = |_: ParseIntError| MatrixError::LabelOutOfRange(label.to_string());
    let row = row.parse::<u64>().map_err(out_of_range)?;
    let column = column.parse::<u64>().map_err(out_of_range)?;
    Ok((row, column))
}

/// Add the switch matrix for `keys` to `circuit`.
pub fn build_matrix(
    circuit: &mut Circuit,
    library: &mut SymbolLibrary,
    keys: &[Key],
    footprints: &FootprintSelector,
) -> Result<Matrix, MatrixError> {
    let switch_symbol = library.symbol("Switch", "SW_Push")?;
    let diode_symbol = library.symbol("Device", "D")?;
    let stabilizer_symbol = library.symbol("Mechanical", "MountingHole")?;

    let mut matrix = Matrix::default();

    for key in keys {
        let label = key.matrix_label().ok_or(MatrixError::LabelsMissing)?;
        let (row, column) = parse_label(&label)?;

        let row_net = *matrix
            .rows
            .entry(row)
            .or_insert_with(|| circuit.net(&format!("ROW{}", row)));
        let column_net = *matrix
            .columns
            .entry(column)
            .or_insert_with(|| circuit.net(&format!("COL{}", column)));

        let iso_enter = key.is_iso_enter();
        let switch_footprint = footprints.switch_footprint(key.width, iso_enter);
        let switch = circuit.add_part(&switch_symbol, Some(&switch_footprint));
        let diode = circuit.add_part(&diode_symbol, Some(footprints.diode_footprint()));

        if let Some(stabilizer_footprint) = footprints.stabilizer_footprint(key.width, iso_enter) {
            let number = circuit
                .reference(switch)
                .trim_start_matches(|c: char| c.is_ascii_alphabetic())
                .to_string();
            circuit.add_part_with_ref(
                &stabilizer_symbol,
                Some(&stabilizer_footprint),
                &format!("ST{}", number),
            )?;
        }

        debug!(
            "Key {} -> {} ({})",
            label,
            circuit.reference(switch),
            switch_footprint
        );

        circuit.connect(row_net, diode, "1")?;
        circuit.connect(column_net, switch, "1")?;
        circuit.join((switch, "2"), (diode, "2"))?;

        matrix.switches.push(switch);
    }

    info!(
        "Built switch matrix: {} keys, {} rows, {} columns",
        matrix.switches.len(),
        matrix.row_count(),
        matrix.column_count()
    );

    Ok(matrix)
}
