//! # wadi-core
//!
//! DWARF debug-information parsing and translation for WebAssembly modules.
//!
//! This crate provides:
//! - A bounded little-endian reader for the custom data buffer
//! - A parser for compilation units, abbreviation tables, entry trees and
//!   line-number programs (DWARF 2–5, 32-bit)
//! - A translator that turns units of registered languages into functions,
//!   scopes and line maps a debugger front-end can query
//!
//! ## Layout of the input
//!
//! The translator works on one byte buffer holding the `.debug_*` sections
//! plus a section table at a known offset. See [`sections`] for the table
//! format and [`sections::custom_data_from_wasm`] to extract it from a
//! module.
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use wadi_core::{DebugTranslator, TranslatorConfig};
//!
//! # fn example(custom_data: &[u8], debug_info_offset: usize) -> wadi_core::Result<()> {
//! let translator = DebugTranslator::builder()
//!     .with_config(TranslatorConfig::from_env())
//!     .build();
//! let functions = translator.read_compilation_units(custom_data, debug_info_offset)?;
//! if let Some(function) = functions.function_containing(0x1234) {
//!     println!("{} line {:?}", function.name, function.line_at(0x1234));
//! }
//! # Ok(())
//! # }
//! ```

pub mod context;
pub mod data;
pub mod diagnostics;
pub mod error;
pub mod languages;
pub mod objects;
pub mod parser;
pub mod reader;
pub mod sections;
pub mod source;
pub mod translator;

pub use context::{DebugParserContext, DebugParserScope};
pub use data::{AttributeValue, DebugData, DebugLineMap, DebugParseUnit};
pub use diagnostics::{DiagnosticEvent, DiagnosticSink, TracingSink};
// Re-export commonly used types
pub use error::{DebugError, Result};
pub use languages::LanguageRegistry;
pub use objects::{DebugFunction, DebugObjectFactory, DebugScope, DebugVariable, PcRange};
pub use parser::DebugParser;
pub use source::{DebugSource, FileSystemSourceLoader, MemorySourceLoader, SourceLoader};
pub use translator::{DebugFunctions, DebugTranslator, SkipReason, TranslatorConfig, UnitOutcome, UnitSummary};
