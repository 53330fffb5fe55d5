//! Core conversion logic shared by the library API and the CLI.
//! Every call works on its own circuit; there is no global state.

use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::circuit::{Circuit, CircuitStats};
use crate::controller::{ControllerCircuit, ControllerError};
use crate::footprint::{
    self, FootprintError, FootprintSelector, FootprintTemplate, DEFAULT_DIODE_FOOTPRINT,
    DEFAULT_STABILIZER_TEMPLATE, DEFAULT_SWITCH_TEMPLATE,
};
use crate::layout::{Layout, LayoutError};
use crate::matrix::{build_matrix, MatrixError};
use crate::netlist::{self, NetlistError, NetlistFormat};
use crate::parser::ParseError;
use crate::symbols::{SymbolError, SymbolLibrary};

#[derive(Debug, thiserror::Error)]
pub enum Kle2NetlistError {
    #[error("invalid --layout option: {0} file not found")]
    LayoutNotFound(PathBuf),

    #[error("--output-dir pointing to an existing file: {0}")]
    OutputIsFile(PathBuf),

    #[error(transparent)]
    Layout(#[from] LayoutError),

    #[error(transparent)]
    Footprint(#[from] FootprintError),

    #[error(transparent)]
    Symbol(#[from] SymbolError),

    #[error("Parse error: {0}")]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Matrix(#[from] MatrixError),

    #[error(transparent)]
    Controller(#[from] ControllerError),

    #[error(transparent)]
    Netlist(#[from] NetlistError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Kle2NetlistError>;

/// Options for building a circuit from a layout.
#[derive(Clone, Debug)]
pub struct BuildOptions {
    /// Design name, written as the netlist source and used for file names
    pub name: String,
    /// Switch footprint template, e.g. `Lib:SW_{:.2f}u`
    pub switch_footprint: String,
    /// Stabilizer footprint template; `None` disables stabilizers
    pub stabilizer_footprint: Option<String>,
    pub diode_footprint: String,
    pub controller_circuit: Option<ControllerCircuit>,
    /// Extra directories searched for `.kicad_sym` libraries, in order
    pub lib_paths: Vec<PathBuf>,
}

impl Default for BuildOptions {
    fn default() -> Self {
        Self {
            name: "keyboard".to_string(),
            switch_footprint: DEFAULT_SWITCH_TEMPLATE.to_string(),
            stabilizer_footprint: Some(DEFAULT_STABILIZER_TEMPLATE.to_string()),
            diode_footprint: DEFAULT_DIODE_FOOTPRINT.to_string(),
            controller_circuit: None,
            lib_paths: vec![],
        }
    }
}

impl BuildOptions {
    /// Options using the footprints of a known switch library and module.
    pub fn for_switch_library(library: &str, module: &str) -> Result<Self> {
        let entry = footprint::lookup(library, module)?;
        Ok(Self {
            switch_footprint: entry.switch.to_string(),
            stabilizer_footprint: entry.stabilizer.map(str::to_string),
            ..Self::default()
        })
    }

    fn footprint_selector(&self) -> Result<FootprintSelector> {
        let switch = FootprintTemplate::parse(&self.switch_footprint)?;
        if !switch.has_placeholder() {
            warn!("Switch footprint {} has no width placeholder, all keys share it", switch);
        }
        let stabilizer = self
            .stabilizer_footprint
            .as_deref()
            .map(FootprintTemplate::parse)
            .transpose()?;
        Ok(FootprintSelector::new(switch, stabilizer).with_diode(&self.diode_footprint))
    }
}

/// Where and how netlists are written.
#[derive(Clone, Debug)]
pub struct OutputOptions {
    /// Output directory, created if missing
    pub dir: PathBuf,
    /// Also write the XML netlist next to the `.net` file
    pub xml: bool,
}

impl Default for OutputOptions {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("."),
            xml: true,
        }
    }
}

/// Result of a full layout-to-netlist conversion.
#[derive(Debug, Clone, Serialize)]
pub struct ConversionResult {
    /// Netlist files written, `.net` first
    pub netlists: Vec<PathBuf>,
    pub stats: CircuitStats,
}

/// Main entry point for conversions
pub struct Kle2NetlistCore;

impl Kle2NetlistCore {
    /// Build the circuit for `layout`: the switch matrix, then the optional
    /// controller circuit wired to it.
    pub fn build_circuit(layout: &Layout, options: &BuildOptions) -> Result<Circuit> {
        let selector = options.footprint_selector()?;
        let mut library = SymbolLibrary::with_search_paths(options.lib_paths.iter().cloned());

        let mut circuit = Circuit::new();
        circuit.metadata.name = options.name.clone();

        let matrix = build_matrix(&mut circuit, &mut library, &layout.keys, &selector)?;
        if let Some(controller) = options.controller_circuit {
            controller.add_to(&mut circuit, &mut library, &matrix)?;
        }

        let stats = circuit.stats();
        debug!(
            "Circuit has {} parts and {} connected nets",
            stats.part_count, stats.net_count
        );
        Ok(circuit)
    }

    /// Write `circuit` to `path` in `format`.
    pub fn generate_netlist(circuit: &Circuit, path: &Path, format: NetlistFormat) -> Result<()> {
        netlist::generate_netlist(circuit, path, format)?;
        Ok(())
    }

    /// Read a layout file, build its circuit and write `<name>.net` (and
    /// `<name>.xml`) into the output directory.
    pub fn convert(
        layout_path: &Path,
        options: &BuildOptions,
        output: &OutputOptions,
    ) -> Result<ConversionResult> {
        if output.dir.is_file() {
            return Err(Kle2NetlistError::OutputIsFile(output.dir.clone()));
        }
        std::fs::create_dir_all(&output.dir)?;

        if !layout_path.is_file() {
            return Err(Kle2NetlistError::LayoutNotFound(layout_path.to_path_buf()));
        }

        let layout = Layout::from_path(layout_path)?;
        info!(
            "Converting {} ({} keys)",
            layout_path.display(),
            layout.keys.len()
        );
        let circuit = Self::build_circuit(&layout, options)?;

        let mut formats = vec![NetlistFormat::Kicad];
        if output.xml {
            formats.push(NetlistFormat::Xml);
        }

        let mut netlists = Vec::new();
        for format in formats {
            let path = output
                .dir
                .join(format!("{}.{}", options.name, format.extension()));
            Self::generate_netlist(&circuit, &path, format)?;
            netlists.push(path);
        }

        Ok(ConversionResult {
            netlists,
            stats: circuit.stats(),
        })
    }
}
