//! # Debug Translator
//!
//! Walks every compilation unit of the custom data and turns the ones written
//! in a registered language into [`DebugFunction`]s keyed by code offset.
//!
//! Each unit moves through `header read → language recognised → entries
//! parsed → sources resolved → scopes walked → merged`, and may leave early as
//! [`UnitOutcome::Skipped`]. Format errors are confined to the unit that
//! raised them: the unit is reported through the [`DiagnosticSink`] and the
//! walk continues with the next one.
//!
//! ## Example
//!
//! ```rust,no_run
//! use wadi_core::sections::custom_data_from_wasm;
//! use wadi_core::DebugTranslator;
//!
//! # fn example(module: &[u8]) -> wadi_core::Result<()> {
//! let Some(custom) = custom_data_from_wasm(module)? else {
//!     return Ok(());
//! };
//! let translator = DebugTranslator::builder().build();
//! let functions = translator.read_compilation_units(&custom.bytes, custom.debug_info_offset)?;
//! for (offset, function) in functions.iter() {
//!     println!("0x{offset:08x} {}", function.name);
//! }
//! # Ok(())
//! # }
//! ```

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use gimli::{constants, DwLang};

use crate::context::DebugParserContext;
use crate::data::DebugParseUnit;
use crate::diagnostics::{DiagnosticEvent, DiagnosticSink, TracingSink};
use crate::error::{DebugError, Result};
use crate::languages::LanguageRegistry;
use crate::objects::DebugFunction;
use crate::parser::DebugParser;
use crate::sections::{DebugSections, SECTION_TABLE_SIZE};
use crate::source::{FileSystemSourceLoader, SourceLoader};

/// Environment variable overriding the compilation directory.
pub const COMP_DIR_ENV: &str = "WADI_COMP_DIR";

/// Translator settings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TranslatorConfig
{
    /// Replaces every unit's `DW_AT_comp_dir` and puts source loading in
    /// test mode (relative paths accepted, content read eagerly).
    pub comp_dir_override: Option<PathBuf>,
}

impl TranslatorConfig
{
    /// Read settings from the environment (`WADI_COMP_DIR`).
    #[must_use]
    pub fn from_env() -> Self
    {
        Self {
            comp_dir_override: std::env::var_os(COMP_DIR_ENV)
                .filter(|value| !value.is_empty())
                .map(PathBuf::from),
        }
    }
}

/// Why a unit contributed nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason
{
    /// No factory for the unit's language; `None` when the root has no
    /// `DW_AT_language`.
    UnsupportedLanguage(Option<DwLang>),
    /// The root carries no `DW_AT_stmt_list`.
    MissingLineProgram,
    /// None of the line program's files could be loaded.
    NoSources,
}

impl fmt::Display for SkipReason
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        match self {
            Self::UnsupportedLanguage(Some(language)) => write!(f, "unsupported language {language}"),
            Self::UnsupportedLanguage(None) => write!(f, "no language attribute"),
            Self::MissingLineProgram => write!(f, "no line program"),
            Self::NoSources => write!(f, "no source file could be loaded"),
        }
    }
}

/// Result of translating one unit.
///
/// Units that fail with a format error have no outcome; they are reported
/// to the sink as [`DiagnosticEvent::UnitFailed`] instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnitOutcome
{
    /// The unit's factory ran over every top-level entry.
    Translated
    {
        /// Functions the unit produced. Offsets an earlier unit already
        /// claimed are counted here but keep the earlier function.
        functions: usize,
    },
    /// The unit was recognized but contributed nothing.
    ///
    /// This happens when:
    /// - No factory is registered for its language
    /// - Its root has no `DW_AT_stmt_list`
    /// - None of its source files could be loaded
    Skipped(SkipReason),
}

/// Header-level description of one compilation unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnitSummary
{
    /// Offset of the unit header within `.debug_info`.
    pub offset: usize,
    /// DWARF version from the unit header.
    pub version: u16,
    /// `DW_AT_language` of the root; `None` when absent.
    pub language: Option<DwLang>,
    /// `DW_AT_name` of the root, usually the primary source file.
    pub name: Option<String>,
    /// `DW_AT_comp_dir` of the root as recorded, before any override.
    pub comp_dir: Option<String>,
    /// Whether the registry has a factory for `language`.
    pub supported: bool,
}

/// Functions of every translated unit, keyed by code offset.
#[derive(Debug, Clone, Default)]
pub struct DebugFunctions
{
    functions: BTreeMap<u32, DebugFunction>,
}

impl DebugFunctions
{
    /// Function starting exactly at `offset`.
    #[must_use]
    pub fn get(&self, offset: u32) -> Option<&DebugFunction>
    {
        self.functions.get(&offset)
    }

    /// Function whose code range covers `pc`.
    #[must_use]
    pub fn function_containing(&self, pc: u32) -> Option<&DebugFunction>
    {
        self.functions
            .range(..=pc)
            .rev()
            .map(|(_, function)| function)
            .find(|function| function.range.contains(pc))
    }

    /// Source line of `pc` according to the covering function.
    #[must_use]
    pub fn line_at(&self, pc: u32) -> Option<u32>
    {
        self.function_containing(pc)?.line_at(pc)
    }

    pub fn iter(&self) -> impl Iterator<Item = (u32, &DebugFunction)>
    {
        self.functions.iter().map(|(offset, function)| (*offset, function))
    }

    #[must_use]
    pub fn len(&self) -> usize
    {
        self.functions.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool
    {
        self.functions.is_empty()
    }

    /// Add the functions of one unit; offsets already present are kept.
    fn merge(&mut self, functions: BTreeMap<u32, DebugFunction>)
    {
        for (offset, function) in functions {
            self.functions.entry(offset).or_insert(function);
        }
    }
}

impl IntoIterator for DebugFunctions
{
    type Item = (u32, DebugFunction);
    type IntoIter = std::collections::btree_map::IntoIter<u32, DebugFunction>;

    fn into_iter(self) -> Self::IntoIter
    {
        self.functions.into_iter()
    }
}

/// Translates debug information into [`DebugFunctions`].
///
/// Holds no per-call state, so one translator can serve any number of
/// modules; repeated calls on the same input give equal results.
#[derive(Clone)]
pub struct DebugTranslator
{
    config: TranslatorConfig,
    registry: Arc<LanguageRegistry>,
    loader: Arc<dyn SourceLoader>,
    sink: Arc<dyn DiagnosticSink>,
}

impl fmt::Debug for DebugTranslator
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        f.debug_struct("DebugTranslator")
            .field("config", &self.config)
            .field("registry", &self.registry)
            .field("loader", &self.loader)
            .finish_non_exhaustive()
    }
}

impl Default for DebugTranslator
{
    fn default() -> Self
    {
        Self::builder().build()
    }
}

impl DebugTranslator
{
    #[must_use]
    pub fn builder() -> DebugTranslatorBuilder
    {
        DebugTranslatorBuilder::default()
    }

    #[must_use]
    pub fn config(&self) -> &TranslatorConfig
    {
        &self.config
    }

    /// Translate every unit of `custom_data`.
    ///
    /// ## Errors
    ///
    /// [`DebugError::InvalidArgument`] when `debug_info_offset` leaves no room
    /// for the section table or the table does not describe the buffer.
    /// Errors inside individual units are reported to the diagnostic sink and
    /// never returned.
    pub fn read_compilation_units(&self, custom_data: &[u8], debug_info_offset: usize) -> Result<DebugFunctions>
    {
        let sections = validate(custom_data, debug_info_offset)?;
        let parser = DebugParser::new(custom_data);
        let mut output = DebugFunctions::default();

        let mut next = Some(0);
        while let Some(offset) = next {
            match self.translate_unit(&parser, &sections, debug_info_offset, offset, &mut output) {
                Ok(None) => break,
                Ok(Some(UnitOutcome::Translated { functions })) => {
                    self.sink.emit(DiagnosticEvent::UnitTranslated { offset, functions });
                }
                Ok(Some(UnitOutcome::Skipped(reason))) => {
                    self.sink.emit(DiagnosticEvent::UnitSkipped { offset, reason });
                }
                Err(err) if err.is_format_error() => {
                    self.sink.emit(DiagnosticEvent::UnitFailed {
                        offset,
                        error: err.to_string(),
                    });
                }
                Err(err) => return Err(err),
            }
            next = parser.next_compilation_unit_offset(debug_info_offset, offset);
        }

        tracing::debug!(functions = output.len(), "translated debug information");
        Ok(output)
    }

    /// List units with their header attributes, without translating them.
    ///
    /// Units whose header cannot be decoded are left out.
    ///
    /// ## Errors
    ///
    /// Same preconditions as [`read_compilation_units`](Self::read_compilation_units).
    pub fn compilation_units(&self, custom_data: &[u8], debug_info_offset: usize) -> Result<Vec<UnitSummary>>
    {
        validate(custom_data, debug_info_offset)?;
        let parser = DebugParser::new(custom_data);
        let mut summaries = Vec::new();

        let mut next = Some(0);
        while let Some(offset) = next {
            match parser.read_compilation_unit(debug_info_offset, offset) {
                Ok(None) => break,
                Ok(Some(unit)) => {
                    let root = unit.root();
                    let language = unit_language(&unit);
                    summaries.push(UnitSummary {
                        offset,
                        version: unit.header().version,
                        language,
                        name: root.try_as_str(constants::DW_AT_name).map(str::to_string),
                        comp_dir: root.try_as_str(constants::DW_AT_comp_dir).map(str::to_string),
                        supported: language.and_then(|language| self.registry.get(language)).is_some(),
                    });
                }
                Err(err) => {
                    tracing::debug!(unit = offset, error = %err, "unreadable unit header");
                }
            }
            next = parser.next_compilation_unit_offset(debug_info_offset, offset);
        }
        Ok(summaries)
    }

    /// Returns `Ok(None)` once `unit_offset` is past the last unit.
    fn translate_unit(
        &self,
        parser: &DebugParser<'_>,
        sections: &DebugSections,
        debug_info_offset: usize,
        unit_offset: usize,
        output: &mut DebugFunctions,
    ) -> Result<Option<UnitOutcome>>
    {
        let Some(header) = parser.read_compilation_unit(debug_info_offset, unit_offset)? else {
            return Ok(None);
        };
        let language = unit_language(&header);
        let Some(factory) = language.and_then(|language| self.registry.get(language)) else {
            return Ok(Some(UnitOutcome::Skipped(SkipReason::UnsupportedLanguage(language))));
        };

        let unit = parser.read_entries(debug_info_offset, unit_offset)?;
        let root = unit.root();
        let Some(stmt_list) = root.try_as_u64(constants::DW_AT_stmt_list) else {
            return Ok(Some(UnitOutcome::Skipped(SkipReason::MissingLineProgram)));
        };
        let stmt_list = usize::try_from(stmt_list)
            .map_err(|_| DebugError::UnsupportedFormat(format!("line program offset 0x{stmt_list:x}")))?;

        let test_mode = self.config.comp_dir_override.is_some();
        let comp_dir = match &self.config.comp_dir_override {
            Some(dir) => dir.clone(),
            None => root.try_as_str(constants::DW_AT_comp_dir).map(PathBuf::from).unwrap_or_default(),
        };
        let line_maps = parser.read_line_section(debug_info_offset, stmt_list, &comp_dir)?;

        let sources: Vec<_> = line_maps
            .iter()
            .map(|map| {
                map.as_ref()
                    .and_then(|map| self.loader.load(map.file_path(), factory.language_name(), test_mode))
            })
            .collect();
        if sources.iter().all(Option::is_none) {
            log_missing_sources(unit_offset, line_maps.iter().flatten().map(|map| map.file_path()));
            return Ok(Some(UnitOutcome::Skipped(SkipReason::NoSources)));
        }

        let mut context = DebugParserContext::new(parser.data(), sections.clone(), &unit, line_maps, sources)?;
        let scope = context.global_scope();
        for child in unit.children(root) {
            factory.parse(&mut context, &scope, child)?;
        }

        let functions = context.into_functions();
        let count = functions.len();
        output.merge(functions);
        Ok(Some(UnitOutcome::Translated { functions: count }))
    }
}

fn validate(custom_data: &[u8], debug_info_offset: usize) -> Result<DebugSections>
{
    let fits = debug_info_offset
        .checked_add(SECTION_TABLE_SIZE)
        .is_some_and(|end| end <= custom_data.len());
    if !fits {
        return Err(DebugError::InvalidArgument(format!(
            "debug info offset {debug_info_offset} leaves no room for the section table in {} bytes",
            custom_data.len()
        )));
    }
    DebugSections::read(custom_data, debug_info_offset)
        .map_err(|err| DebugError::InvalidArgument(format!("section table: {err}")))
}

fn unit_language(unit: &DebugParseUnit) -> Option<DwLang>
{
    unit.root()
        .try_as_u32(constants::DW_AT_language)
        .and_then(|language| u16::try_from(language).ok())
        .map(DwLang)
}

fn log_missing_sources<'p>(unit_offset: usize, paths: impl Iterator<Item = &'p Path>)
{
    for path in paths {
        tracing::trace!(unit = unit_offset, path = %path.display(), "source unavailable");
    }
}

/// Builder for [`DebugTranslator`].
pub struct DebugTranslatorBuilder
{
    config: TranslatorConfig,
    registry: Option<Arc<LanguageRegistry>>,
    loader: Arc<dyn SourceLoader>,
    sink: Arc<dyn DiagnosticSink>,
}

impl Default for DebugTranslatorBuilder
{
    fn default() -> Self
    {
        Self {
            config: TranslatorConfig::default(),
            registry: None,
            loader: Arc::new(FileSystemSourceLoader),
            sink: Arc::new(TracingSink),
        }
    }
}

impl fmt::Debug for DebugTranslatorBuilder
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        f.debug_struct("DebugTranslatorBuilder")
            .field("config", &self.config)
            .field("registry", &self.registry)
            .field("loader", &self.loader)
            .finish_non_exhaustive()
    }
}

impl DebugTranslatorBuilder
{
    #[must_use]
    pub fn with_config(mut self, config: TranslatorConfig) -> Self
    {
        self.config = config;
        self
    }

    /// Use `dir` instead of each unit's compilation directory.
    #[must_use]
    pub fn with_comp_dir(mut self, dir: impl Into<PathBuf>) -> Self
    {
        self.config.comp_dir_override = Some(dir.into());
        self
    }

    /// Replace the global language registry.
    #[must_use]
    pub fn with_registry(mut self, registry: Arc<LanguageRegistry>) -> Self
    {
        self.registry = Some(registry);
        self
    }

    #[must_use]
    pub fn with_source_loader<L>(mut self, loader: L) -> Self
    where
        L: SourceLoader + 'static,
    {
        self.loader = Arc::new(loader);
        self
    }

    #[must_use]
    pub fn with_sink<S>(mut self, sink: S) -> Self
    where
        S: DiagnosticSink + 'static,
    {
        self.sink = Arc::new(sink);
        self
    }

    #[must_use]
    pub fn build(self) -> DebugTranslator
    {
        DebugTranslator {
            config: self.config,
            registry: self.registry.unwrap_or_else(LanguageRegistry::global),
            loader: self.loader,
            sink: self.sink,
        }
    }
}
