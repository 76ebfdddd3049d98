use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};
use wadi_core::sections::custom_data_from_wasm;
use wadi_core::{DebugError, DebugFunction, DebugFunctions, DebugTranslator, Result as DebugResult, TranslatorConfig};
use wadi_utils::{info, init_logging_with, LogConfig, LogFormat, LogLevel};

/// Inspect DWARF debug information embedded in WebAssembly modules.
#[derive(Parser, Debug)]
#[command(name = "wadi")]
#[command(version)]
#[command(about = "Inspect DWARF debug information embedded in WebAssembly modules", long_about = None)]
struct Cli
{
    /// Path to the `.wasm` module
    module: PathBuf,

    /// Resolve sources against this directory instead of each unit's
    /// compilation directory (overrides `WADI_COMP_DIR`)
    #[arg(long, global = true)]
    comp_dir: Option<PathBuf>,

    /// Log level (error, warn, info, debug, trace); overrides `RUST_LOG`
    #[arg(long, global = true)]
    log_level: Option<LogLevel>,

    /// Log format (pretty or json); overrides `WADI_LOG_FORMAT`
    #[arg(long, global = true)]
    log_format: Option<LogFormat>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands
{
    /// List compilation units and whether their language is supported
    Units,
    /// List translated functions by code offset
    Functions,
    /// Show the function and source line for a code offset
    Line
    {
        /// Code offset (hex format: 0x1000 or decimal)
        pc: String,
    },
    /// Show parameters and scoped variables of the function covering a code offset
    Scope
    {
        /// Code offset (hex format: 0x1000 or decimal)
        pc: String,
    },
}

fn main()
{
    let cli = Cli::parse();

    let mut log_config = match LogConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to initialize logging: {e}");
            process::exit(1);
        }
    };
    if let Some(level) = cli.log_level {
        log_config = log_config.with_level(level);
    }
    if let Some(format) = cli.log_format {
        log_config = log_config.with_format(format);
    }
    let _guard = match init_logging_with(log_config) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Failed to initialize logging: {e}");
            process::exit(1);
        }
    };

    if let Err(e) = run_command(cli) {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

fn run_command(cli: Cli) -> DebugResult<()>
{
    let module = std::fs::read(&cli.module)?;
    let Some(custom) = custom_data_from_wasm(&module)? else {
        println!("{}: no DWARF debug information", cli.module.display());
        return Ok(());
    };
    info!(
        "Loaded {} ({} bytes of debug data)",
        cli.module.display(),
        custom.bytes.len()
    );

    let mut config = TranslatorConfig::from_env();
    if let Some(dir) = cli.comp_dir {
        config.comp_dir_override = Some(dir);
    }
    let translator = DebugTranslator::builder().with_config(config).build();

    match cli.command {
        Commands::Units => {
            let units = translator.compilation_units(&custom.bytes, custom.debug_info_offset)?;
            println!("{:<10} {:<4} {:<22} {:<9} Name", "Offset", "Ver", "Language", "Supported");
            for unit in units {
                let language = unit.language.map_or_else(|| "-".to_string(), |language| language.to_string());
                println!(
                    "0x{:08x} {:<4} {:<22} {:<9} {}",
                    unit.offset,
                    unit.version,
                    language,
                    if unit.supported { "yes" } else { "no" },
                    unit.name.as_deref().unwrap_or("<unnamed>")
                );
            }
        }
        Commands::Functions => {
            let functions = translator.read_compilation_units(&custom.bytes, custom.debug_info_offset)?;
            println!("{:<24} {:<6} Name", "Range", "Lang");
            for (_, function) in functions.iter() {
                println!(
                    "{:<24} {:<6} {}",
                    function.range.to_string(),
                    function.language,
                    function.display_name()
                );
            }
            println!("{} function(s)", functions.len());
        }
        Commands::Line { pc } => {
            let pc = parse_pc(&pc)?;
            let functions = translator.read_compilation_units(&custom.bytes, custom.debug_info_offset)?;
            print_line(&functions, pc);
        }
        Commands::Scope { pc } => {
            let pc = parse_pc(&pc)?;
            let functions = translator.read_compilation_units(&custom.bytes, custom.debug_info_offset)?;
            match functions.function_containing(pc) {
                Some(function) => print_scope(function, pc),
                None => println!("0x{pc:08x}: no function"),
            }
        }
    }
    Ok(())
}

fn print_line(functions: &DebugFunctions, pc: u32)
{
    let Some(function) = functions.function_containing(pc) else {
        println!("0x{pc:08x}: no function");
        return;
    };
    let file = function
        .line_map
        .as_ref()
        .map_or_else(|| "<unknown>".to_string(), |map| map.file_path().display().to_string());
    match function.line_at(pc) {
        Some(line) => {
            println!("0x{pc:08x}: {} at {file}:{line}", function.display_name());
            if let Some(text) = function.source.as_ref().and_then(|source| source.line(line)) {
                println!("    {}", text.trim_end());
            }
        }
        None => println!("0x{pc:08x}: {} ({file}, no line)", function.display_name()),
    }
}

fn print_scope(function: &DebugFunction, pc: u32)
{
    println!("{} {}", function.display_name(), function.range);
    for parameter in &function.parameters {
        println!(
            "  param {}: {}",
            parameter.name.as_deref().unwrap_or("_"),
            parameter.type_name
        );
    }
    for variable in function.scope.variables_at(pc) {
        println!(
            "  {:?} {}: {}",
            variable.kind,
            variable.name.as_deref().unwrap_or("_"),
            variable.type_name
        );
    }
}

/// Parse a code offset given in hex (`0x` prefix) or decimal.
fn parse_pc(text: &str) -> DebugResult<u32>
{
    let parsed = match text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
        Some(hex) => u32::from_str_radix(hex, 16),
        None => text.parse(),
    };
    parsed.map_err(|e| DebugError::InvalidArgument(format!("invalid code offset '{text}': {e}")))
}

#[cfg(test)]
mod tests
{
    use super::*;

    #[test]
    fn test_parse_pc()
    {
        assert_eq!(parse_pc("0x1f").unwrap(), 0x1f);
        assert_eq!(parse_pc("0X10").unwrap(), 0x10);
        assert_eq!(parse_pc("42").unwrap(), 42);
        assert!(parse_pc("0xzz").is_err());
        assert!(parse_pc("-1").is_err());
    }

    #[test]
    fn test_cli_parses_subcommands()
    {
        let cli = Cli::try_parse_from(["wadi", "app.wasm", "line", "0x40", "--comp-dir", "/src"]).unwrap();
        assert_eq!(cli.module, PathBuf::from("app.wasm"));
        assert_eq!(cli.comp_dir, Some(PathBuf::from("/src")));
        assert!(matches!(cli.command, Commands::Line { ref pc } if pc == "0x40"));

        let cli = Cli::try_parse_from(["wadi", "--log-level", "debug", "app.wasm", "units"]).unwrap();
        assert_eq!(cli.log_level, Some(LogLevel::Debug));
    }
}
