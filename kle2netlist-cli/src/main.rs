//! kle2netlist CLI - KiCad netlists for keyboard-layout-editor layouts.

use anyhow::Context;
use clap::{ArgAction, Parser, ValueEnum};
use kle2netlist::footprint::{
    FOOTPRINT_LIBRARIES, DEFAULT_DIODE_FOOTPRINT, DEFAULT_SWITCH_LIBRARY, DEFAULT_SWITCH_MODULE,
};
use kle2netlist::{BuildOptions, ControllerCircuit, ConversionResult, Kle2NetlistCore, OutputOptions};
use std::io::IsTerminal;
use std::path::PathBuf;
use std::process;
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "kle2netlist")]
#[command(about = "KiCad netlist generator for mechanical keyboards", long_about = None)]
#[command(version, disable_version_flag = true)]
struct Cli {
    /// Path to kle layout file
    #[arg(long, value_name = "FILE", required_unless_present = "list_libraries")]
    layout: Option<PathBuf>,

    /// Output directory, created if not existing
    #[arg(long = "output-dir", value_name = "DIR", default_value = ".")]
    output_dir: PathBuf,

    /// Netlist name without file extension
    #[arg(long, default_value = "keyboard")]
    name: String,

    /// Switch footprint library
    #[arg(long = "switch-library", visible_alias = "swl", default_value = DEFAULT_SWITCH_LIBRARY)]
    switch_library: String,

    /// Switch footprint type within the library
    #[arg(long = "switch-footprint", visible_alias = "swf", default_value = DEFAULT_SWITCH_MODULE)]
    switch_footprint: String,

    /// Diode footprint
    #[arg(long, value_name = "FOOTPRINT", default_value = DEFAULT_DIODE_FOOTPRINT)]
    diode_footprint: String,

    /// Do not add stabilizer footprints for wide keys
    #[arg(long)]
    no_stabilizers: bool,

    /// Path to symbol library directory (repeatable)
    #[arg(short = 'l', long = "lib-path", value_name = "DIR")]
    lib_paths: Vec<PathBuf>,

    /// Add minimal controller circuitry
    #[arg(
        long,
        value_name = "VARIANT",
        num_args = 0..=1,
        default_missing_value = "atmega32u4_au_v1"
    )]
    controller_circuit: Option<ControllerCircuit>,

    /// Skip xml netlist generation
    #[arg(long)]
    no_xml: bool,

    /// Summary output format
    #[arg(long, value_enum, default_value = "human")]
    format: OutputFormat,

    /// Increase log verbosity (repeatable)
    #[arg(long, action = ArgAction::Count)]
    verbose: u8,

    /// List supported switch libraries and footprints, then exit
    #[arg(long)]
    list_libraries: bool,

    /// Print version
    #[arg(short = 'v', long = "version", action = ArgAction::Version)]
    version: Option<bool>,
}

#[derive(Clone, ValueEnum)]
enum OutputFormat {
    /// Human-readable output
    Human,
    /// JSON output for scripting
    Json,
}

fn init_logging(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(std::io::stderr().is_terminal())
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let exit_code = if cli.list_libraries {
        handle_list_libraries(&cli.format);
        0
    } else {
        handle_convert(&cli)
    };

    process::exit(exit_code);
}

fn build_options(cli: &Cli) -> anyhow::Result<BuildOptions> {
    let mut options = BuildOptions::for_switch_library(&cli.switch_library, &cli.switch_footprint)?;
    options.name = cli.name.clone();
    options.diode_footprint = cli.diode_footprint.clone();
    options.lib_paths = cli.lib_paths.clone();
    if cli.no_stabilizers {
        options.stabilizer_footprint = None;
    }
    options.controller_circuit = cli.controller_circuit;
    debug!(
        "Switch footprint {}, stabilizer footprint {:?}",
        options.switch_footprint, options.stabilizer_footprint
    );
    if let Some(controller) = options.controller_circuit {
        debug!("Controller circuit {}", controller);
    }
    Ok(options)
}

fn run(cli: &Cli) -> anyhow::Result<ConversionResult> {
    let layout = cli
        .layout
        .as_ref()
        .context("the --layout option is required")?;
    let options = build_options(cli)?;
    let output = OutputOptions {
        dir: cli.output_dir.clone(),
        xml: !cli.no_xml,
    };
    Ok(Kle2NetlistCore::convert(layout, &options, &output)?)
}

fn handle_convert(cli: &Cli) -> i32 {
    match run(cli) {
        Ok(result) => {
            output_result(&result, &cli.format);
            0
        }
        Err(e) => {
            eprintln!("error: {}", e);
            1
        }
    }
}

fn output_result(result: &ConversionResult, format: &OutputFormat) {
    match format {
        OutputFormat::Human => {
            for path in &result.netlists {
                println!("Generated {}", path.display());
            }
            println!(
                "  {} switches, {} diodes, {} stabilizers, {} nets",
                result.stats.switch_count,
                result.stats.diode_count,
                result.stats.stabilizer_count,
                result.stats.net_count
            );
        }
        OutputFormat::Json => match serde_json::to_string_pretty(result) {
            Ok(json) => println!("{}", json),
            Err(e) => eprintln!("error: {}", e),
        },
    }
}

fn handle_list_libraries(format: &OutputFormat) {
    match format {
        OutputFormat::Human => {
            println!("Supported switch libraries:\n");
            let mut current = "";
            for entry in FOOTPRINT_LIBRARIES {
                if entry.library != current {
                    println!("{}", entry.library);
                    current = entry.library;
                }
                println!("  {:<16} {}", entry.module, entry.switch);
                if let Some(stabilizer) = entry.stabilizer {
                    println!("  {:<16} {}", "", stabilizer);
                }
            }
        }
        OutputFormat::Json => match serde_json::to_string_pretty(FOOTPRINT_LIBRARIES) {
            Ok(json) => println!("{}", json),
            Err(e) => eprintln!("error: {}", e),
        },
    }
}
