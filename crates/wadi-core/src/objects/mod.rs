//! # Debug Objects
//!
//! The semantic view produced by the translator: functions with their code
//! ranges, lexical scopes and variables. Language factories build these from
//! the entry tree through a [`DebugParserContext`](crate::context::DebugParserContext).

pub mod factory;
pub mod pcs;
pub mod types;

use std::fmt;
use std::sync::Arc;

pub use self::factory::DebugObjectFactory;
pub use self::pcs::read_pcs;
pub use self::types::{type_name, MAX_TYPE_REF_DEPTH};
use crate::data::DebugLineMap;
use crate::source::DebugSource;

/// Half-open range `[start, end)` of code offsets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PcRange
{
    pub start: u32,
    pub end: u32,
}

impl PcRange
{
    /// Range covering every code offset.
    pub const FULL: Self = Self {
        start: 0,
        end: u32::MAX,
    };

    #[must_use]
    pub fn new(start: u32, end: u32) -> Self
    {
        Self { start, end }
    }

    #[must_use]
    pub fn contains(&self, pc: u32) -> bool
    {
        self.start <= pc && pc < self.end
    }

    #[must_use]
    pub fn len(&self) -> u32
    {
        self.end.saturating_sub(self.start)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool
    {
        self.end <= self.start
    }
}

impl fmt::Display for PcRange
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        write!(f, "[0x{:x}, 0x{:x})", self.start, self.end)
    }
}

/// How a variable is bound.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VariableKind
{
    Parameter,
    Local,
    /// Externally visible or static storage declared inside a function.
    Global,
}

/// One entry of a location list: the expression valid over `range`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocationListEntry
{
    pub range: PcRange,
    pub expression: Vec<u8>,
}

/// Where a variable lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VariableLocation
{
    /// Single location expression valid for the whole scope.
    Expression(Vec<u8>),
    /// Location expressions that vary with the pc.
    List(Vec<LocationListEntry>),
}

impl VariableLocation
{
    /// Expression bytes in effect at `pc`.
    #[must_use]
    pub fn expression_at(&self, pc: u32) -> Option<&[u8]>
    {
        match self {
            Self::Expression(bytes) => Some(bytes),
            Self::List(entries) => entries
                .iter()
                .find(|entry| entry.range.contains(pc))
                .map(|entry| entry.expression.as_slice()),
        }
    }
}

/// A parameter, local or static variable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DebugVariable
{
    pub name: Option<String>,
    /// Resolved type name, `void` when the entry carries no type.
    pub type_name: String,
    pub kind: VariableKind,
    pub location: Option<VariableLocation>,
    pub decl_line: Option<u32>,
}

/// A lexical scope with its variables and nested scopes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DebugScope
{
    pub range: PcRange,
    pub variables: Vec<DebugVariable>,
    pub children: Vec<DebugScope>,
}

impl DebugScope
{
    #[must_use]
    pub fn new(range: PcRange) -> Self
    {
        Self {
            range,
            variables: Vec::new(),
            children: Vec::new(),
        }
    }

    /// Variables visible at `pc`, innermost scope last.
    #[must_use]
    pub fn variables_at(&self, pc: u32) -> Vec<&DebugVariable>
    {
        let mut visible = Vec::new();
        self.collect_visible(pc, &mut visible);
        visible
    }

    fn collect_visible<'a>(&'a self, pc: u32, visible: &mut Vec<&'a DebugVariable>)
    {
        if !self.range.contains(pc) {
            return;
        }
        visible.extend(self.variables.iter());
        for child in &self.children {
            child.collect_visible(pc, visible);
        }
    }
}

/// A function with a code range, the unit of the translator's output.
#[derive(Debug, Clone)]
pub struct DebugFunction
{
    /// Name qualified with enclosing namespaces and types.
    pub name: String,
    pub linkage_name: Option<String>,
    pub demangled_name: Option<String>,
    /// Name of the language factory that built the function.
    pub language: &'static str,
    pub range: PcRange,
    /// Index of the declaring file in the unit's line program.
    pub file: usize,
    pub source: Option<Arc<DebugSource>>,
    pub line_map: Option<Arc<DebugLineMap>>,
    pub decl_line: Option<u32>,
    /// `DW_AT_frame_base` expression bytes.
    pub frame_base: Option<Vec<u8>>,
    pub parameters: Vec<DebugVariable>,
    pub scope: DebugScope,
}

impl DebugFunction
{
    /// Source line for `pc`, if the function has a line map and covers `pc`.
    #[must_use]
    pub fn line_at(&self, pc: u32) -> Option<u32>
    {
        if !self.range.contains(pc) {
            return None;
        }
        self.line_map.as_ref()?.line_at(pc)
    }

    /// Name to show users: the demangled linkage name when there is one.
    #[must_use]
    pub fn display_name(&self) -> &str
    {
        self.demangled_name.as_deref().unwrap_or(&self.name)
    }
}
