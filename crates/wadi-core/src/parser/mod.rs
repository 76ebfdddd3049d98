//! # Debug Parser
//!
//! Turns the raw `.debug_info` / `.debug_abbrev` / `.debug_line` bytes of the
//! custom data into [`DebugParseUnit`]s and [`DebugLineMap`]s.
//!
//! Units are visited strictly in section order:
//!
//! ```rust,no_run
//! use wadi_core::parser::DebugParser;
//!
//! # fn example(data: &[u8], debug_info_offset: usize) -> wadi_core::Result<()> {
//! let parser = DebugParser::new(data);
//! let mut offset = Some(0);
//! while let Some(unit_offset) = offset {
//!     if let Some(unit) = parser.read_compilation_unit(debug_info_offset, unit_offset)? {
//!         println!("unit at 0x{unit_offset:x}: DWARF {}", unit.header().version);
//!     }
//!     offset = parser.next_compilation_unit_offset(debug_info_offset, unit_offset);
//! }
//! # Ok(())
//! # }
//! ```

pub mod abbrev;
pub mod line;

use std::path::Path;

use gimli::{
    constants, AttributeValue as RawValue, DebugInfo, DebugInfoOffset, DebugLineStr, DebugLineStrOffset, DebugStr,
    DebugStrOffset, DwForm, EndianSlice, LittleEndian, SectionId, UnitType,
};

pub use self::abbrev::{Abbreviation, AbbreviationTable, AttributeSpecification};
use crate::data::{AttributeValue, Attributes, ByteRange, DebugData, DebugLineMap, DebugParseUnit, EntryId, UnitHeader};
use crate::error::{map_dwarf_error, DebugError, Result};
use crate::reader::{DebugReader, DebugSlice};
use crate::sections::DebugSections;

type RawUnitHeader<'a> = gimli::UnitHeader<DebugSlice<'a>>;

/// Stateless parser over one custom data buffer.
///
/// Headers, abbreviations, entries and line programs are decoded with
/// `gimli`; this type lays the results out as [`DebugParseUnit`]s and
/// [`DebugLineMap`]s addressed by custom-data offsets.
#[derive(Debug, Clone, Copy)]
pub struct DebugParser<'a>
{
    data: &'a [u8],
}

impl<'a> DebugParser<'a>
{
    #[must_use]
    pub fn new(data: &'a [u8]) -> Self
    {
        Self { data }
    }

    /// The raw custom data.
    #[must_use]
    pub fn data(&self) -> &'a [u8]
    {
        self.data
    }

    /// Decode the section table at `debug_info_offset`.
    ///
    /// ## Errors
    ///
    /// Fails when the table does not fit in the custom data or lists a
    /// section outside it.
    pub fn sections(&self, debug_info_offset: usize) -> Result<DebugSections>
    {
        DebugSections::read(self.data, debug_info_offset)
    }

    /// Read the header of the unit at `unit_offset` and its root entry's
    /// attributes, without walking the rest of the tree.
    ///
    /// Returns `Ok(None)` when `unit_offset` is at or past the end of
    /// `.debug_info`.
    ///
    /// ## Errors
    ///
    /// Format errors from the header, the abbreviation table or the root
    /// entry.
    pub fn read_compilation_unit(&self, debug_info_offset: usize, unit_offset: usize) -> Result<Option<DebugParseUnit>>
    {
        let sections = self.sections(debug_info_offset)?;
        let info = sections.reader(self.data, SectionId::DebugInfo)?;
        if unit_offset >= info.len() {
            return Ok(None);
        }
        let unit = self.parse_unit(&sections, &info, unit_offset, true)?;
        Ok(Some(unit))
    }

    /// Offset of the unit following the one at `unit_offset`, or `None` if the
    /// section holds no further unit.
    ///
    /// Only the initial length field is read, so a unit with a damaged
    /// header can still be stepped over.
    #[must_use]
    pub fn next_compilation_unit_offset(&self, debug_info_offset: usize, unit_offset: usize) -> Option<usize>
    {
        let sections = self.sections(debug_info_offset).ok()?;
        let mut info = sections.reader(self.data, SectionId::DebugInfo).ok()?;
        info.seek(unit_offset).ok()?;
        let unit_length = usize::try_from(info.read_u32().ok()?).ok()?;
        let next = unit_offset.checked_add(4)?.checked_add(unit_length)?;
        (next < info.len()).then_some(next)
    }

    /// Read the unit at `unit_offset` with its complete entry tree.
    ///
    /// ## Errors
    ///
    /// Format errors from the header, the abbreviation table or any entry.
    pub fn read_entries(&self, debug_info_offset: usize, unit_offset: usize) -> Result<DebugParseUnit>
    {
        let sections = self.sections(debug_info_offset)?;
        let info = sections.reader(self.data, SectionId::DebugInfo)?;
        self.parse_unit(&sections, &info, unit_offset, false)
    }

    /// Decode the line-number program at `stmt_list` (an offset into
    /// `.debug_line`) into one line map per declared file.
    ///
    /// Relative paths are resolved against `comp_dir`.
    ///
    /// ## Errors
    ///
    /// [`DebugError::MissingSection`] without `.debug_line`, format errors
    /// from the program header or opcodes otherwise.
    pub fn read_line_section(
        &self,
        debug_info_offset: usize,
        stmt_list: usize,
        comp_dir: &Path,
    ) -> Result<Vec<Option<DebugLineMap>>>
    {
        let sections = self.sections(debug_info_offset)?;
        line::read_line_program(self.data, &sections, stmt_list, comp_dir)
    }

    fn parse_unit(
        &self,
        sections: &DebugSections,
        info: &DebugReader<'a>,
        unit_offset: usize,
        root_only: bool,
    ) -> Result<DebugParseUnit>
    {
        let (header, raw) = read_unit_header(info, unit_offset)?;
        let abbrev = sections.reader(self.data, SectionId::DebugAbbrev)?;
        let abbreviations = AbbreviationTable::parse(abbrev.window_slice(), header.abbrev_offset)?;

        let entries = self.parse_entries(sections, info, &header, &raw, &abbreviations, root_only)?;
        tracing::trace!(
            unit = header.offset,
            version = header.version,
            entries = entries.len(),
            root_only,
            "parsed compilation unit"
        );
        Ok(DebugParseUnit::new(header, entries))
    }

    /// Single forward pass; `parents` holds the chain of open entries.
    fn parse_entries(
        &self,
        sections: &DebugSections,
        info: &DebugReader<'a>,
        header: &UnitHeader,
        raw: &RawUnitHeader<'a>,
        abbreviations: &AbbreviationTable,
        root_only: bool,
    ) -> Result<Vec<DebugData>>
    {
        let fail = |offset: usize, err: gimli::Error| map_dwarf_error(".debug_info", info.base() + offset, err);
        let mut input = raw
            .entries_raw(abbreviations.abbreviations(), None)
            .map_err(|err| fail(header.entries_offset, err))?;
        let mut arena: Vec<DebugData> = Vec::new();
        let mut parents: Vec<EntryId> = Vec::new();

        while !input.is_empty() {
            let offset = header.offset + input.next_offset().0;
            let Some(abbreviation) = input.read_abbreviation().map_err(|err| fail(offset, err))? else {
                if parents.pop().is_some() && parents.is_empty() {
                    break;
                }
                continue;
            };

            let mut attributes = Attributes::new();
            for spec in abbreviation.attributes() {
                let value_offset = header.offset + input.next_offset().0;
                let attribute = input.read_attribute(*spec).map_err(|err| fail(value_offset, err))?;
                let value = self.convert_value(
                    sections,
                    header,
                    spec.form(),
                    attribute.raw_value(),
                    info.base() + value_offset,
                )?;
                attributes.push((spec.name(), value));
            }

            let id = EntryId::from_index(arena.len());
            arena.push(DebugData::new(offset, abbreviation.tag(), attributes));
            if let Some(parent) = parents.last() {
                arena[parent.index()].push_child(id);
            }

            if root_only {
                break;
            }
            if abbreviation.has_children() {
                parents.push(id);
            } else if parents.is_empty() {
                break;
            }
        }

        if arena.is_empty() {
            return Err(DebugError::UnsupportedFormat(format!(
                "compilation unit at 0x{:x} has no root entry",
                header.offset
            )));
        }
        Ok(arena)
    }

    /// Map a `gimli` value onto the attribute classes the factories read.
    fn convert_value(
        &self,
        sections: &DebugSections,
        header: &UnitHeader,
        form: DwForm,
        value: RawValue<DebugSlice<'a>>,
        offset: usize,
    ) -> Result<AttributeValue>
    {
        let value = match value {
            RawValue::Addr(address) => AttributeValue::Address(address),
            RawValue::Data1(value) => AttributeValue::Unsigned(u64::from(value)),
            RawValue::Data2(value) => AttributeValue::Unsigned(u64::from(value)),
            RawValue::Data4(value) => AttributeValue::Unsigned(u64::from(value)),
            RawValue::Data8(value) | RawValue::Udata(value) => AttributeValue::Unsigned(value),
            RawValue::DebugTypesRef(signature) => AttributeValue::Unsigned(signature.0),
            RawValue::Sdata(value) => AttributeValue::Signed(value),
            RawValue::Flag(value) => AttributeValue::Flag(value),
            RawValue::String(text) => AttributeValue::String(text.to_string_lossy().into_owned()),
            RawValue::DebugStrRef(DebugStrOffset(target)) => {
                let strings = DebugStr::from(sections.reader(self.data, SectionId::DebugStr)?.window_slice());
                let text = strings
                    .get_str(DebugStrOffset(target))
                    .map_err(|err| string_error(".debug_str", target, err))?;
                AttributeValue::String(text.to_string_lossy().into_owned())
            }
            RawValue::DebugLineStrRef(DebugLineStrOffset(target)) => {
                let strings = DebugLineStr::from(sections.reader(self.data, SectionId::DebugLineStr)?.window_slice());
                let text = strings
                    .get_str(DebugLineStrOffset(target))
                    .map_err(|err| string_error(".debug_line_str", target, err))?;
                AttributeValue::String(text.to_string_lossy().into_owned())
            }
            RawValue::Block(bytes) => AttributeValue::Block(self.byte_range(bytes)),
            RawValue::Exprloc(expression) => AttributeValue::Block(self.byte_range(expression.0)),
            RawValue::UnitRef(target) => AttributeValue::Reference(header.offset.saturating_add(target.0)),
            RawValue::DebugInfoRef(DebugInfoOffset(target)) => AttributeValue::Reference(target),
            RawValue::SecOffset(target) => AttributeValue::SectionOffset(target as u64),
            // Index forms need .debug_addr / .debug_str_offsets, which the custom data does not carry.
            _ => return Err(DebugError::UnsupportedForm { form, offset }),
        };
        Ok(value)
    }

    /// Position of a borrowed `gimli` slice within the custom data.
    fn byte_range(&self, bytes: DebugSlice<'a>) -> ByteRange
    {
        ByteRange {
            offset: bytes.offset_from(EndianSlice::new(self.data, LittleEndian)),
            len: bytes.len(),
        }
    }
}

fn string_error(section: &'static str, offset: usize, err: gimli::Error) -> DebugError
{
    match err {
        gimli::Error::UnexpectedEof(_) => DebugError::MissingTerminator(offset),
        other => map_dwarf_error(section, offset, other),
    }
}

/// Decode the unit header at `unit_offset` of `.debug_info`.
fn read_unit_header<'a>(info: &DebugReader<'a>, unit_offset: usize) -> Result<(UnitHeader, RawUnitHeader<'a>)>
{
    let mut length = info.clone();
    length.seek(unit_offset)?;
    if length.read_u32()? == 0xffff_ffff {
        return Err(DebugError::UnsupportedFormat(format!(
            "64-bit DWARF unit at 0x{unit_offset:x}"
        )));
    }

    let raw = DebugInfo::from(info.window_slice())
        .header_from_offset(DebugInfoOffset(unit_offset))
        .map_err(|err| map_dwarf_error(".debug_info", info.base() + unit_offset, err))?;
    let unit_type = match raw.type_() {
        UnitType::Compilation => constants::DW_UT_compile,
        UnitType::Type { .. } => constants::DW_UT_type,
        UnitType::Partial => constants::DW_UT_partial,
        UnitType::Skeleton(_) => constants::DW_UT_skeleton,
        UnitType::SplitCompilation(_) => constants::DW_UT_split_compile,
        UnitType::SplitType { .. } => constants::DW_UT_split_type,
    };

    let header = UnitHeader {
        offset: unit_offset,
        unit_length: raw.unit_length(),
        version: raw.version(),
        unit_type: unit_type.0,
        address_size: raw.address_size(),
        abbrev_offset: raw.debug_abbrev_offset().0,
        entries_offset: unit_offset + raw.header_size(),
    };
    Ok((header, raw))
}
