//! # Parser Context
//!
//! Everything a language factory needs while walking one compilation unit:
//! the raw custom data and section table, the parsed unit with its offset
//! map, per-file line maps and sources, a stack of lexical scopes and the
//! functions collected so far.
//!
//! A context lives for exactly one unit. The translator creates it after the
//! entries and line program are decoded and consumes it with
//! [`into_functions`](DebugParserContext::into_functions) once every
//! top-level entry has been handed to the factory.

use std::collections::BTreeMap;
use std::sync::Arc;

use gimli::{
    constants, DebugAddr, DebugAddrBase, DebugLoc, DebugLocLists, DebugRanges, DebugRngLists, DwAt, Encoding, Format,
    LocationLists, LocationListsOffset, Range, RangeLists, RangeListsOffset, SectionId,
};

use crate::data::{ByteRange, DebugData, DebugLineMap, DebugParseUnit};
use crate::error::{map_dwarf_error, Result};
use crate::objects::{read_pcs, DebugFunction, LocationListEntry, PcRange};
use crate::reader::DebugSlice;
use crate::sections::DebugSections;
use crate::source::DebugSource;

/// Naming and range environment for entries at one nesting level.
///
/// Scopes are values: deriving a child never changes the parent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DebugParserScope
{
    path: Vec<Arc<str>>,
    file: usize,
    range: PcRange,
}

impl DebugParserScope
{
    #[must_use]
    pub fn new(file: usize, range: PcRange) -> Self
    {
        Self {
            path: Vec::new(),
            file,
            range,
        }
    }

    /// Child scope covering `[start, end)`, with `name` appended to the
    /// qualified-name prefix when given.
    #[must_use]
    pub fn with(&self, name: Option<&str>, start: u32, end: u32) -> Self
    {
        let mut path = self.path.clone();
        if let Some(name) = name {
            path.push(Arc::from(name));
        }
        Self {
            path,
            file: self.file,
            range: PcRange::new(start, end),
        }
    }

    /// Copy of this scope bound to another file index.
    #[must_use]
    pub fn with_file(&self, file: usize) -> Self
    {
        Self {
            file,
            ..self.clone()
        }
    }

    /// `name` prefixed with the enclosing names, joined by `separator`.
    ///
    /// An empty separator means the language has no qualified names.
    #[must_use]
    pub fn qualify(&self, name: &str, separator: &str) -> String
    {
        if separator.is_empty() || self.path.is_empty() {
            return name.to_string();
        }
        let mut qualified = self.path.join(separator);
        qualified.push_str(separator);
        qualified.push_str(name);
        qualified
    }

    /// Enclosing names, outermost first.
    #[must_use]
    pub fn path(&self) -> &[Arc<str>]
    {
        &self.path
    }

    #[must_use]
    pub fn file(&self) -> usize
    {
        self.file
    }

    #[must_use]
    pub fn range(&self) -> PcRange
    {
        self.range
    }
}

/// Per-unit state handed to language factories.
#[derive(Debug)]
pub struct DebugParserContext<'a>
{
    data: &'a [u8],
    sections: DebugSections,
    unit: &'a DebugParseUnit,
    line_maps: Vec<Option<Arc<DebugLineMap>>>,
    sources: Vec<Option<Arc<DebugSource>>>,
    base_address: u64,
    global: DebugParserScope,
    scopes: Vec<DebugParserScope>,
    functions: BTreeMap<u32, DebugFunction>,
}

impl<'a> DebugParserContext<'a>
{
    /// Bind a parsed unit to its line maps and sources.
    ///
    /// `line_maps` and `sources` share the line program's file numbering.
    ///
    /// ## Errors
    ///
    /// Fails when the root entry's code range cannot be decoded.
    pub fn new(
        data: &'a [u8],
        sections: DebugSections,
        unit: &'a DebugParseUnit,
        line_maps: Vec<Option<DebugLineMap>>,
        sources: Vec<Option<Arc<DebugSource>>>,
    ) -> Result<Self>
    {
        let root = unit.root();
        let file = if unit.header().version >= 5 { 0 } else { 1 };
        let mut context = Self {
            data,
            sections,
            unit,
            line_maps: line_maps.into_iter().map(|map| map.map(Arc::new)).collect(),
            sources,
            base_address: root.try_as_u64(constants::DW_AT_low_pc).unwrap_or(0),
            global: DebugParserScope::new(file, PcRange::FULL),
            scopes: Vec::new(),
            functions: BTreeMap::new(),
        };
        if let Some(range) = read_pcs(root, &context)? {
            context.global = DebugParserScope::new(file, range);
        }
        Ok(context)
    }

    /// Root scope of the unit: its primary file and full code range.
    #[must_use]
    pub fn global_scope(&self) -> DebugParserScope
    {
        self.global.clone()
    }

    pub fn push_scope(&mut self, scope: DebugParserScope)
    {
        self.scopes.push(scope);
    }

    pub fn pop_scope(&mut self) -> Option<DebugParserScope>
    {
        self.scopes.pop()
    }

    /// Innermost pushed scope, or the global scope when the stack is empty.
    #[must_use]
    pub fn current_scope(&self) -> &DebugParserScope
    {
        self.scopes.last().unwrap_or(&self.global)
    }

    #[must_use]
    pub fn unit(&self) -> &'a DebugParseUnit
    {
        self.unit
    }

    /// DWARF version of the unit.
    #[must_use]
    pub fn version(&self) -> u16
    {
        self.unit.header().version
    }

    #[must_use]
    pub fn entry_at(&self, offset: usize) -> Option<&'a DebugData>
    {
        self.unit.entry_at(offset)
    }

    /// Target of the reference attribute `attribute` on `entry`.
    ///
    /// Absent attributes, non-reference encodings and references leaving the
    /// unit all yield `None`.
    #[must_use]
    pub fn resolve_reference(&self, entry: &DebugData, attribute: DwAt) -> Option<&'a DebugData>
    {
        self.entry_at(entry.try_as_reference(attribute)?)
    }

    #[must_use]
    pub fn line_map(&self, file: usize) -> Option<&Arc<DebugLineMap>>
    {
        self.line_maps.get(file)?.as_ref()
    }

    #[must_use]
    pub fn source(&self, file: usize) -> Option<&Arc<DebugSource>>
    {
        self.sources.get(file)?.as_ref()
    }

    #[must_use]
    pub fn block_bytes(&self, range: ByteRange) -> Option<&'a [u8]>
    {
        range.slice(self.data)
    }

    /// Decode the `.debug_ranges` list at `offset`.
    ///
    /// Base-address selection entries rebase the following pairs; empty
    /// ranges are dropped.
    pub fn read_ranges(&self, offset: u64) -> Result<Vec<PcRange>>
    {
        let (section, offset) = self.list_section(SectionId::DebugRanges, offset)?;
        let fail = |err| map_dwarf_error(".debug_ranges", offset, err);
        let lists = RangeLists::new(
            DebugRanges::from(section),
            DebugRngLists::from(self.absent(SectionId::DebugRngLists)?),
        );
        let mut iter = lists
            .ranges(
                RangeListsOffset(offset),
                self.encoding(),
                self.base_address,
                &DebugAddr::from(self.absent(SectionId::DebugAddr)?),
                DebugAddrBase(0),
            )
            .map_err(fail)?;

        let mut ranges = Vec::new();
        while let Some(range) = iter.next().map_err(fail)? {
            if let Some(range) = pc_range(range) {
                ranges.push(range);
            }
        }
        Ok(ranges)
    }

    /// Decode the `.debug_loc` list at `offset`.
    pub fn read_location_list(&self, offset: u64) -> Result<Vec<LocationListEntry>>
    {
        let (section, offset) = self.list_section(SectionId::DebugLoc, offset)?;
        let fail = |err| map_dwarf_error(".debug_loc", offset, err);
        let lists = LocationLists::new(
            DebugLoc::from(section),
            DebugLocLists::from(self.absent(SectionId::DebugLocLists)?),
        );
        let mut iter = lists
            .locations(
                LocationListsOffset(offset),
                self.encoding(),
                self.base_address,
                &DebugAddr::from(self.absent(SectionId::DebugAddr)?),
                DebugAddrBase(0),
            )
            .map_err(fail)?;

        let mut entries = Vec::new();
        while let Some(entry) = iter.next().map_err(fail)? {
            if let Some(range) = pc_range(entry.range) {
                entries.push(LocationListEntry {
                    range,
                    expression: entry.data.0.slice().to_vec(),
                });
            }
        }
        Ok(entries)
    }

    fn list_section(&self, id: SectionId, offset: u64) -> Result<(DebugSlice<'a>, usize)>
    {
        let section = self.sections.reader(self.data, id)?.window_slice();
        Ok((section, usize::try_from(offset).unwrap_or(usize::MAX)))
    }

    /// Sections the custom data never lists read as empty.
    fn absent(&self, id: SectionId) -> Result<DebugSlice<'a>>
    {
        self.sections.slice_or_empty(self.data, id)
    }

    /// Only pre-5 lists are carried by the custom data, so the lists are
    /// always read with the `.debug_ranges` / `.debug_loc` encoding.
    fn encoding(&self) -> Encoding
    {
        Encoding {
            format: Format::Dwarf32,
            version: self.unit.header().version.min(4),
            address_size: self.unit.header().address_size,
        }
    }

    /// Record `function` under its code offset. The first function recorded
    /// for an offset is kept.
    pub fn add_function(&mut self, code_offset: u32, function: DebugFunction)
    {
        self.functions.entry(code_offset).or_insert(function);
    }

    #[must_use]
    pub fn functions(&self) -> &BTreeMap<u32, DebugFunction>
    {
        &self.functions
    }

    #[must_use]
    pub fn into_functions(self) -> BTreeMap<u32, DebugFunction>
    {
        self.functions
    }
}

/// Ranges outside the 32-bit code space or without extent carry no code.
fn pc_range(range: Range) -> Option<PcRange>
{
    let start = u32::try_from(range.begin).ok()?;
    let end = u32::try_from(range.end).ok()?;
    (start < end).then(|| PcRange::new(start, end))
}
