//! Symbol Libraries
//!
//! Loads schematic symbols from KiCad `.kicad_sym` libraries. Libraries are
//! looked up by nickname on the user search paths first and then among the
//! bundled libraries; each library is parsed once and cached.

pub mod builtin;

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::circuit::schema::{ElectricalType, Pin};
use crate::parser::sexp::{ParseError, SExp, SExpParser};

/// Pins carried by a symbol are the same pins a part exposes.
pub type SymbolPin = Pin;

#[derive(Debug, Error)]
pub enum SymbolError {
    #[error("Symbol library '{lib}' not found (searched: {searched})")]
    LibraryNotFound { lib: String, searched: String },

    #[error("Symbol '{name}' not found in library '{lib}'")]
    SymbolNotFound { lib: String, name: String },

    #[error("Failed to parse symbol library {origin}: {source}")]
    Parse {
        origin: String,
        #[source]
        source: ParseError,
    },

    #[error("Invalid symbol library {origin}: {reason}")]
    Invalid { origin: String, reason: String },

    #[error("Failed to read symbol library {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// A schematic symbol with its units flattened into a single pin list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Symbol {
    /// Library nickname the symbol was loaded from
    pub lib: String,

    /// Symbol name inside the library
    pub name: String,

    /// Reference designator prefix (e.g., "D", "SW", "U")
    pub reference_prefix: String,

    /// Default value
    pub value: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    pub pins: Vec<SymbolPin>,
}

/// Symbol as read from the file, before `extends` is resolved
struct RawSymbol {
    extends: Option<String>,
    properties: HashMap<String, String>,
    pins: Vec<SymbolPin>,
}

/// Parse the source of a `.kicad_sym` library.
///
/// `origin` is only used in error messages.
pub fn parse_symbol_library(
    lib: &str,
    source: &str,
    origin: &str,
) -> Result<HashMap<String, Symbol>, SymbolError> {
    let root = SExpParser::new(source)
        .parse()
        .map_err(|source| SymbolError::Parse {
            origin: origin.to_string(),
            source,
        })?;

    if root.head() != Some("kicad_symbol_lib") {
        return Err(SymbolError::Invalid {
            origin: origin.to_string(),
            reason: "expected a (kicad_symbol_lib ...) expression".to_string(),
        });
    }

    let mut raw = HashMap::new();
    for node in root.children("symbol") {
        let Some(full_name) = node.atom_at(1) else {
            warn!("Skipping unnamed symbol in {}", origin);
            continue;
        };
        raw.insert(strip_lib_prefix(full_name).to_string(), read_raw_symbol(node));
    }

    let mut symbols = HashMap::new();
    for name in raw.keys() {
        let symbol = resolve_symbol(lib, name, &raw, origin)?;
        symbols.insert(name.clone(), symbol);
    }
    Ok(symbols)
}

fn strip_lib_prefix(name: &str) -> &str {
    name.rsplit_once(':').map(|(_, n)| n).unwrap_or(name)
}

fn read_raw_symbol(node: &SExp) -> RawSymbol {
    let properties = node
        .children("property")
        .filter_map(|p| Some((p.atom_at(1)?.to_string(), p.atom_at(2)?.to_string())))
        .collect();

    let mut pins: Vec<SymbolPin> = Vec::new();
    let mut collect = |pin_node: &SExp| {
        let Some(number) = pin_node.first_arg("number") else {
            return;
        };
        if pins.iter().any(|p| p.number == number) {
            return;
        }
        let mut pin = SymbolPin::new(number).with_type(ElectricalType::from_kicad(
            pin_node.atom_at(1).unwrap_or_default(),
        ));
        if let Some(name) = pin_node.first_arg("name") {
            pin = pin.with_name(name);
        }
        pins.push(pin);
    };

    // Pins live either directly on the symbol or in its unit sub-symbols.
    node.children("pin").for_each(&mut collect);
    for unit in node.children("symbol") {
        unit.children("pin").for_each(&mut collect);
    }

    RawSymbol {
        extends: node.first_arg("extends").map(|s| strip_lib_prefix(s).to_string()),
        properties,
        pins,
    }
}

fn resolve_symbol(
    lib: &str,
    name: &str,
    raw: &HashMap<String, RawSymbol>,
    origin: &str,
) -> Result<Symbol, SymbolError> {
    // Walk the `extends` chain; the derived symbol's properties win.
    let mut chain = vec![name];
    let mut current = &raw[name];
    while let Some(parent) = current.extends.as_deref() {
        if chain.contains(&parent) {
            return Err(SymbolError::Invalid {
                origin: origin.to_string(),
                reason: format!("symbol '{}' extends itself", name),
            });
        }
        current = raw.get(parent).ok_or_else(|| SymbolError::Invalid {
            origin: origin.to_string(),
            reason: format!("symbol '{}' extends unknown symbol '{}'", name, parent),
        })?;
        chain.push(parent);
    }

    let property = |key: &str| {
        chain
            .iter()
            .filter_map(|n| raw[*n].properties.get(key))
            .find(|v| !v.is_empty())
            .cloned()
    };

    Ok(Symbol {
        lib: lib.to_string(),
        name: name.to_string(),
        reference_prefix: property("Reference").unwrap_or_else(|| "U".to_string()),
        value: property("Value").unwrap_or_else(|| name.to_string()),
        description: property("Description").or_else(|| property("ki_description")),
        pins: current.pins.clone(),
    })
}

/// Symbol lookup across user search paths and the bundled libraries
#[derive(Debug, Default)]
pub struct SymbolLibrary {
    search_paths: Vec<PathBuf>,
    cache: HashMap<String, HashMap<String, Symbol>>,
}

impl SymbolLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_search_paths(paths: impl IntoIterator<Item = PathBuf>) -> Self {
        Self {
            search_paths: paths.into_iter().collect(),
            cache: HashMap::new(),
        }
    }

    /// Look up `name` in library `lib`.
    pub fn symbol(&mut self, lib: &str, name: &str) -> Result<Symbol, SymbolError> {
        let symbols = self.load_library(lib)?;
        symbols
            .get(name)
            .cloned()
            .ok_or_else(|| SymbolError::SymbolNotFound {
                lib: lib.to_string(),
                name: name.to_string(),
            })
    }

    fn load_library(&mut self, lib: &str) -> Result<&HashMap<String, Symbol>, SymbolError> {
        if !self.cache.contains_key(lib) {
            let symbols = self.read_library(lib)?;
            self.cache.insert(lib.to_string(), symbols);
        }
        Ok(&self.cache[lib])
    }

    fn read_library(&self, lib: &str) -> Result<HashMap<String, Symbol>, SymbolError> {
        let file_name = format!("{}.kicad_sym", lib);

        for dir in &self.search_paths {
            let candidate = if dir.file_name().map(|f| f == file_name.as_str()).unwrap_or(false) {
                dir.clone()
            } else {
                dir.join(&file_name)
            };
            if candidate.is_file() {
                debug!("Loading symbol library {} from {:?}", lib, candidate);
                return load_library_file(lib, &candidate);
            }
        }

        if let Some(source) = builtin::embedded_library(lib) {
            debug!("Loading bundled symbol library {}", lib);
            return parse_symbol_library(lib, source, &format!("<bundled {}>", file_name));
        }

        let mut searched: Vec<String> = self
            .search_paths
            .iter()
            .map(|p| p.display().to_string())
            .collect();
        searched.push("<bundled>".to_string());
        Err(SymbolError::LibraryNotFound {
            lib: lib.to_string(),
            searched: searched.join(", "),
        })
    }
}

fn load_library_file(lib: &str, path: &Path) -> Result<HashMap<String, Symbol>, SymbolError> {
    let source = std::fs::read_to_string(path).map_err(|source| SymbolError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_symbol_library(lib, &source, &path.display().to_string())
}
