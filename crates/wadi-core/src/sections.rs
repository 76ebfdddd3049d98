//! # Custom Data Layout
//!
//! The translator does not locate sections itself. It is handed one byte
//! buffer (the "custom data") and the offset of a small section table inside
//! it. The table holds one little-endian `(offset, length)` pair of `i32`s per
//! DWARF section, in [`SECTION_ORDER`]; offsets are absolute positions in the
//! buffer and `-1` marks an absent section.
//!
//! [`CustomDataBuilder`] produces such a buffer from section payloads, and
//! [`custom_data_from_wasm`] fills the builder from a WebAssembly module's
//! `.debug_*` custom sections.

use gimli::{EndianSlice, LittleEndian, SectionId};
use object::{Object, ObjectSection};

use crate::error::{DebugError, Result};
use crate::reader::{DebugReader, DebugSlice};

/// Sections described by the table, in table order.
pub const SECTION_ORDER: [SectionId; 7] = [
    SectionId::DebugAbbrev,
    SectionId::DebugInfo,
    SectionId::DebugLine,
    SectionId::DebugLoc,
    SectionId::DebugRanges,
    SectionId::DebugStr,
    SectionId::DebugLineStr,
];

/// Size in bytes of the section table.
pub const SECTION_TABLE_SIZE: usize = SECTION_ORDER.len() * 8;

const ABSENT: i32 = -1;

/// Location of one section inside the custom data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SectionRange
{
    pub offset: usize,
    pub len: usize,
}

impl SectionRange
{
    #[must_use]
    pub fn end(&self) -> usize
    {
        self.offset + self.len
    }
}

/// Decoded section table.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DebugSections
{
    ranges: [Option<SectionRange>; SECTION_ORDER.len()],
}

impl DebugSections
{
    /// Decode the table at `debug_info_offset` and check every present section
    /// fits inside `data`.
    ///
    /// ## Errors
    ///
    /// - [`DebugError::Truncated`] if the table or a section runs past the buffer
    /// - [`DebugError::UnsupportedFormat`] for negative offsets or lengths
    pub fn read(data: &[u8], debug_info_offset: usize) -> Result<Self>
    {
        let mut reader = DebugReader::window(data, debug_info_offset, SECTION_TABLE_SIZE)?;
        let mut ranges = [None; SECTION_ORDER.len()];
        for (slot, id) in ranges.iter_mut().zip(SECTION_ORDER) {
            let offset = reader.read_i32()?;
            let len = reader.read_i32()?;
            if offset == ABSENT {
                continue;
            }
            let (Ok(offset), Ok(len)) = (usize::try_from(offset), usize::try_from(len)) else {
                return Err(DebugError::UnsupportedFormat(format!(
                    "negative bounds {offset}/{len} for {}",
                    id.name()
                )));
            };
            let range = SectionRange { offset, len };
            if range.end() > data.len() {
                return Err(DebugError::Truncated {
                    offset,
                    needed: range.end() - data.len(),
                });
            }
            *slot = Some(range);
        }
        Ok(Self { ranges })
    }

    /// Range of `id`, if the table lists it.
    #[must_use]
    pub fn get(&self, id: SectionId) -> Option<SectionRange>
    {
        SECTION_ORDER
            .iter()
            .position(|candidate| *candidate == id)
            .and_then(|index| self.ranges[index])
    }

    /// Range of `id`, failing with [`DebugError::MissingSection`] when absent.
    pub fn require(&self, id: SectionId) -> Result<SectionRange>
    {
        self.get(id).ok_or(DebugError::MissingSection(id.name()))
    }

    /// Reader whose window is exactly section `id`.
    ///
    /// ## Errors
    ///
    /// [`DebugError::MissingSection`] when the table does not list `id`,
    /// [`DebugError::Truncated`] when its range leaves `data`.
    pub fn reader<'a>(&self, data: &'a [u8], id: SectionId) -> Result<DebugReader<'a>>
    {
        let range = self.require(id)?;
        Ok(DebugReader::window(data, range.offset, range.len)?.named(id.name()))
    }

    /// Section `id` as a `gimli` slice; empty when the table does not list it.
    ///
    /// ## Errors
    ///
    /// [`DebugError::Truncated`] when a listed range leaves `data`.
    pub fn slice_or_empty<'a>(&self, data: &'a [u8], id: SectionId) -> Result<DebugSlice<'a>>
    {
        match self.get(id) {
            Some(range) => Ok(DebugReader::window(data, range.offset, range.len)?.window_slice()),
            None => Ok(EndianSlice::new(&[], LittleEndian)),
        }
    }
}

/// Custom data blob plus the offset of its section table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CustomData
{
    pub bytes: Vec<u8>,
    pub debug_info_offset: usize,
}

/// Assembles a custom data blob from section payloads.
///
/// ## Example
///
/// ```rust
/// use gimli::{EndianSlice, LittleEndian, SectionId};
/// use wadi_core::sections::{CustomDataBuilder, DebugSections};
///
/// let custom = CustomDataBuilder::new()
///     .with_prefix(vec![0xde, 0xad])
///     .section(SectionId::DebugInfo, vec![1, 2, 3])
///     .build()
///     .unwrap();
/// let sections = DebugSections::read(&custom.bytes, custom.debug_info_offset).unwrap();
/// assert_eq!(sections.get(SectionId::DebugInfo).unwrap().len, 3);
/// assert!(sections.get(SectionId::DebugLoc).is_none());
/// ```
#[derive(Debug, Clone, Default)]
pub struct CustomDataBuilder
{
    prefix: Vec<u8>,
    sections: Vec<(SectionId, Vec<u8>)>,
}

impl CustomDataBuilder
{
    #[must_use]
    pub fn new() -> Self
    {
        Self::default()
    }

    /// Bytes placed before the section table.
    #[must_use]
    pub fn with_prefix(mut self, prefix: Vec<u8>) -> Self
    {
        self.prefix = prefix;
        self
    }

    /// Add or replace the payload of section `id`.
    ///
    /// Sections outside [`SECTION_ORDER`] are ignored.
    #[must_use]
    pub fn section(mut self, id: SectionId, bytes: Vec<u8>) -> Self
    {
        if !SECTION_ORDER.contains(&id) {
            tracing::debug!(section = id.name(), "ignoring section without a table slot");
            return self;
        }
        self.sections.retain(|(existing, _)| *existing != id);
        self.sections.push((id, bytes));
        self
    }

    /// Lay out prefix, table and payloads.
    ///
    /// ## Errors
    ///
    /// Returns [`DebugError::InvalidArgument`] if an offset or length does not
    /// fit in the table's `i32` slots.
    pub fn build(self) -> Result<CustomData>
    {
        let debug_info_offset = self.prefix.len();
        let mut bytes = self.prefix;
        bytes.resize(debug_info_offset + SECTION_TABLE_SIZE, 0);

        let mut table = Vec::with_capacity(SECTION_TABLE_SIZE);
        let mut payloads = Vec::new();
        for id in SECTION_ORDER {
            match self.sections.iter().find(|(candidate, _)| *candidate == id) {
                Some((_, payload)) => {
                    let offset = bytes.len() + payloads.len();
                    table.extend_from_slice(&to_i32(offset, id)?.to_le_bytes());
                    table.extend_from_slice(&to_i32(payload.len(), id)?.to_le_bytes());
                    payloads.extend_from_slice(payload);
                }
                None => {
                    table.extend_from_slice(&ABSENT.to_le_bytes());
                    table.extend_from_slice(&0i32.to_le_bytes());
                }
            }
        }

        bytes[debug_info_offset..debug_info_offset + SECTION_TABLE_SIZE].copy_from_slice(&table);
        bytes.extend_from_slice(&payloads);
        Ok(CustomData {
            bytes,
            debug_info_offset,
        })
    }
}

fn to_i32(value: usize, id: SectionId) -> Result<i32>
{
    i32::try_from(value)
        .map_err(|_| DebugError::InvalidArgument(format!("{} exceeds the section table range", id.name())))
}

/// Extract the `.debug_*` custom sections of a WebAssembly module.
///
/// Returns `Ok(None)` when the module has no `.debug_info` section.
///
/// ## Errors
///
/// Returns [`DebugError::InvalidArgument`] if `module` is not a parseable
/// WebAssembly binary.
pub fn custom_data_from_wasm(module: &[u8]) -> Result<Option<CustomData>>
{
    let file = object::File::parse(module)
        .map_err(|err| DebugError::InvalidArgument(format!("failed to parse module: {err}")))?;
    if file.format() != object::BinaryFormat::Wasm {
        return Err(DebugError::InvalidArgument(format!(
            "expected a WebAssembly module, found {:?}",
            file.format()
        )));
    }

    let mut builder = CustomDataBuilder::new();
    let mut has_info = false;
    for id in SECTION_ORDER {
        let Some(section) = file.section_by_name(id.name()) else {
            continue;
        };
        let data = section
            .data()
            .map_err(|err| DebugError::InvalidArgument(format!("failed to read {}: {err}", id.name())))?;
        tracing::debug!(section = id.name(), size = data.len(), "found debug section");
        has_info |= id == SectionId::DebugInfo;
        builder = builder.section(id, data.to_vec());
    }

    if !has_info {
        return Ok(None);
    }
    builder.build().map(Some)
}
