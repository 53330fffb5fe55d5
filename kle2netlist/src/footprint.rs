//! Footprint Selection
//!
//! Maps a key (width, ISO-enter shape) to switch and stabilizer footprint
//! identifiers using a static table of known KiCad footprint libraries.

use std::fmt;

use serde::Serialize;
use thiserror::Error;

/// Widths every switch footprint library is assumed to provide.
pub const SUPPORTED_SWITCH_WIDTHS: [f64; 16] = [
    1.0, 1.25, 1.5, 1.75, 2.0, 2.25, 2.5, 2.75, 3.0, 4.0, 4.5, 5.5, 6.0, 6.25, 6.5, 7.0,
];

/// Stabilizer footprint sizes, ascending.
pub const SUPPORTED_STABILIZER_WIDTHS: [f64; 6] = [2.0, 3.0, 6.0, 6.25, 7.0, 8.0];

/// Width used for keys with an unsupported width and for ISO enter.
pub const DEFAULT_SWITCH_WIDTH: f64 = 1.0;

/// Keys narrower than this get no stabilizer.
pub const MIN_STABILIZED_WIDTH: f64 = 2.0;

pub const DEFAULT_SWITCH_LIBRARY: &str = "perigoso/keyswitch-kicad-library";
pub const DEFAULT_SWITCH_MODULE: &str = "MX";
pub const DEFAULT_DIODE_FOOTPRINT: &str = "Diode_SMD:D_SOD-323F";

#[derive(Debug, Error)]
pub enum FootprintError {
    #[error("Unsupported switch library '{library}', available: {available}")]
    UnknownLibrary { library: String, available: String },

    #[error("Unsupported switch footprint '{module}' for library '{library}', available: {available}")]
    UnknownModule {
        library: String,
        module: String,
        available: String,
    },

    #[error("Invalid footprint template '{template}': {reason}")]
    InvalidTemplate { template: String, reason: String },
}

/// One entry of the footprint library table
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LibraryModule {
    pub library: &'static str,
    pub module: &'static str,
    pub switch: &'static str,
    /// `None` when the switch footprints already include stabilizer holes
    pub stabilizer: Option<&'static str>,
}

/// Switch template of the default library and module
pub const DEFAULT_SWITCH_TEMPLATE: &str = "PCM_Switch_Keyboard_Cherry_MX:SW_Cherry_MX_PCB_{:.2f}u";

/// Stabilizer template shared by all modules of the default library
pub const DEFAULT_STABILIZER_TEMPLATE: &str =
    "PCM_Mounting_Keyboard_Stabilizer:Stabilizer_Cherry_MX_{:.2f}u";

pub const FOOTPRINT_LIBRARIES: &[LibraryModule] = &[
    LibraryModule {
        library: "perigoso/keyswitch-kicad-library",
        module: "MX",
        switch: DEFAULT_SWITCH_TEMPLATE,
        stabilizer: Some(DEFAULT_STABILIZER_TEMPLATE),
    },
    LibraryModule {
        library: "perigoso/keyswitch-kicad-library",
        module: "MX-Hotswap",
        switch: "PCM_Switch_Keyboard_Hotswap_Kailh:SW_Hotswap_Kailh_MX_{:.2f}u",
        stabilizer: Some(DEFAULT_STABILIZER_TEMPLATE),
    },
    LibraryModule {
        library: "perigoso/keyswitch-kicad-library",
        module: "Alps",
        switch: "PCM_Switch_Keyboard_Alps_Matias:SW_Alps_Matias_{:.2f}u",
        stabilizer: Some(DEFAULT_STABILIZER_TEMPLATE),
    },
    LibraryModule {
        library: "perigoso/keyswitch-kicad-library",
        module: "MX/Alps Hybrid",
        switch: "PCM_Switch_Keyboard_Hybrid:SW_Hybrid_Cherry_MX_Alps_{:.2f}u",
        stabilizer: Some(DEFAULT_STABILIZER_TEMPLATE),
    },
    LibraryModule {
        library: "perigoso/keyswitch-kicad-library",
        module: "Choc",
        switch: "PCM_Switch_Keyboard_Kailh:SW_Kailh_Choc_V1_{:.2f}u",
        stabilizer: Some(DEFAULT_STABILIZER_TEMPLATE),
    },
    LibraryModule {
        library: "ai03-2725/MX_Alps_Hybrid",
        module: "MX",
        switch: "MX_Only:MXOnly-{}U-NoLED",
        stabilizer: None,
    },
    LibraryModule {
        library: "ai03-2725/MX_Alps_Hybrid",
        module: "Alps",
        switch: "Alps_Only:ALPS-{}U",
        stabilizer: None,
    },
    LibraryModule {
        library: "ai03-2725/MX_Alps_Hybrid",
        module: "MX/Alps Hybrid",
        switch: "MX_Alps_Hybrid:MX-{}U-NoLED",
        stabilizer: None,
    },
];

/// Find the table entry for a switch library and module.
pub fn lookup(library: &str, module: &str) -> Result<&'static LibraryModule, FootprintError> {
    let modules: Vec<&'static LibraryModule> = FOOTPRINT_LIBRARIES
        .iter()
        .filter(|m| m.library == library)
        .collect();

    if modules.is_empty() {
        let mut libraries: Vec<&str> = FOOTPRINT_LIBRARIES.iter().map(|m| m.library).collect();
        libraries.dedup();
        return Err(FootprintError::UnknownLibrary {
            library: library.to_string(),
            available: libraries.join(", "),
        });
    }

    modules
        .iter()
        .find(|m| m.module == module)
        .copied()
        .ok_or_else(|| FootprintError::UnknownModule {
            library: library.to_string(),
            module: module.to_string(),
            available: modules
                .iter()
                .map(|m| m.module)
                .collect::<Vec<_>>()
                .join(", "),
        })
}

/// The largest value in ascending `list` that is not greater than `target`.
pub fn closest_smaller_or_equal(list: &[f64], target: f64) -> Option<f64> {
    let index = list.partition_point(|v| *v <= target);
    index.checked_sub(1).map(|i| list[i])
}

/// Width actually used for a switch footprint.
pub fn resolve_switch_width(width: f64) -> f64 {
    if SUPPORTED_SWITCH_WIDTHS.contains(&width) {
        width
    } else {
        DEFAULT_SWITCH_WIDTH
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Placeholder {
    /// `{:.Nf}`
    Fixed(usize),
    /// `{}`
    Shortest,
}

#[derive(Debug, Clone, PartialEq)]
enum Segment {
    Text(String),
    Width(Placeholder),
}

/// A footprint identifier with width placeholders, e.g.
/// `SW_Cherry_MX_PCB_{:.2f}u`
#[derive(Debug, Clone, PartialEq)]
pub struct FootprintTemplate {
    source: String,
    segments: Vec<Segment>,
}

impl FootprintTemplate {
    pub fn parse(template: &str) -> Result<Self, FootprintError> {
        let invalid = |reason: &str| FootprintError::InvalidTemplate {
            template: template.to_string(),
            reason: reason.to_string(),
        };

        let mut segments = Vec::new();
        let mut rest = template;
        while let Some(open) = rest.find('{') {
            if open > 0 {
                segments.push(Segment::Text(rest[..open].to_string()));
            }
            let close = rest[open..]
                .find('}')
                .map(|c| open + c)
                .ok_or_else(|| invalid("unclosed '{'"))?;
            let spec = &rest[open + 1..close];
            let placeholder = if spec.is_empty() {
                Placeholder::Shortest
            } else {
                let digits = spec
                    .strip_prefix(":.")
                    .and_then(|s| s.strip_suffix('f'))
                    .ok_or_else(|| invalid("expected '{}' or '{:.Nf}'"))?;
                Placeholder::Fixed(digits.parse().map_err(|_| invalid("bad precision"))?)
            };
            segments.push(Segment::Width(placeholder));
            rest = &rest[close + 1..];
        }
        if !rest.is_empty() {
            segments.push(Segment::Text(rest.to_string()));
        }

        Ok(Self {
            source: template.to_string(),
            segments,
        })
    }

    pub fn has_placeholder(&self) -> bool {
        self.segments.iter().any(|s| matches!(s, Segment::Width(_)))
    }

    pub fn render(&self, width: f64) -> String {
        self.segments
            .iter()
            .map(|segment| match segment {
                Segment::Text(text) => text.clone(),
                Segment::Width(Placeholder::Fixed(precision)) => {
                    format!("{:.*}", precision, width)
                }
                Segment::Width(Placeholder::Shortest) => format!("{}", width),
            })
            .collect()
    }
}

impl fmt::Display for FootprintTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.source)
    }
}

/// Chooses footprints for the parts of a single key
#[derive(Debug, Clone)]
pub struct FootprintSelector {
    switch: FootprintTemplate,
    stabilizer: Option<FootprintTemplate>,
    diode: String,
}

impl FootprintSelector {
    pub fn new(switch: FootprintTemplate, stabilizer: Option<FootprintTemplate>) -> Self {
        Self {
            switch,
            stabilizer,
            diode: DEFAULT_DIODE_FOOTPRINT.to_string(),
        }
    }

    /// Selector for a known switch library and module.
    pub fn from_library(library: &str, module: &str) -> Result<Self, FootprintError> {
        let entry = lookup(library, module)?;
        let stabilizer = entry.stabilizer.map(FootprintTemplate::parse).transpose()?;
        Ok(Self::new(FootprintTemplate::parse(entry.switch)?, stabilizer))
    }

    pub fn with_diode(mut self, footprint: impl Into<String>) -> Self {
        self.diode = footprint.into();
        self
    }

    pub fn switch_footprint(&self, width: f64, iso_enter: bool) -> String {
        let width = if iso_enter {
            DEFAULT_SWITCH_WIDTH
        } else {
            resolve_switch_width(width)
        };
        self.switch.render(width)
    }

    /// Stabilizer footprint for a key, `None` if it needs no stabilizer.
    pub fn stabilizer_footprint(&self, width: f64, iso_enter: bool) -> Option<String> {
        let template = self.stabilizer.as_ref()?;
        let width = if iso_enter {
            MIN_STABILIZED_WIDTH
        } else {
            resolve_switch_width(width)
        };
        if width < MIN_STABILIZED_WIDTH {
            return None;
        }
        closest_smaller_or_equal(&SUPPORTED_STABILIZER_WIDTHS, width).map(|w| template.render(w))
    }

    pub fn diode_footprint(&self) -> &str {
        &self.diode
    }
}
