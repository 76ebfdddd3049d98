//! Parsed compilation units.

use std::collections::HashMap;

use super::entry::{DebugData, EntryId};

/// Decoded compilation-unit header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnitHeader
{
    /// Offset of the unit within `.debug_info`.
    pub offset: usize,
    /// Value of the initial length field (bytes following it).
    pub unit_length: usize,
    pub version: u16,
    /// `DW_UT_*` for version 5 units, `DW_UT_compile` otherwise.
    pub unit_type: u8,
    pub address_size: u8,
    /// Offset of the unit's abbreviation table within `.debug_abbrev`.
    pub abbrev_offset: usize,
    /// Offset of the first entry within `.debug_info`.
    pub entries_offset: usize,
}

impl UnitHeader
{
    /// Offset one past the unit's last byte within `.debug_info`.
    #[must_use]
    pub fn end(&self) -> usize
    {
        self.offset + 4 + self.unit_length
    }
}

/// One compilation unit's entry tree.
///
/// Entries live in an arena indexed by [`EntryId`]; the offset map covers
/// every entry reachable from the root so `DW_FORM_ref*` attributes resolve
/// in constant time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DebugParseUnit
{
    header: UnitHeader,
    entries: Vec<DebugData>,
    by_offset: HashMap<usize, EntryId>,
}

impl DebugParseUnit
{
    /// Build from an arena whose first element is the root entry.
    pub(crate) fn new(header: UnitHeader, entries: Vec<DebugData>) -> Self
    {
        let by_offset = entries
            .iter()
            .enumerate()
            .map(|(index, entry)| (entry.offset(), EntryId::from_index(index)))
            .collect();
        Self {
            header,
            entries,
            by_offset,
        }
    }

    #[must_use]
    pub fn header(&self) -> &UnitHeader
    {
        &self.header
    }

    #[must_use]
    pub fn root_id(&self) -> EntryId
    {
        EntryId::from_index(0)
    }

    /// The unit's root entry (normally `DW_TAG_compile_unit`).
    #[must_use]
    pub fn root(&self) -> &DebugData
    {
        &self.entries[0]
    }

    #[must_use]
    pub fn entry(&self, id: EntryId) -> &DebugData
    {
        &self.entries[id.index()]
    }

    /// Entry starting at `offset` within `.debug_info`.
    #[must_use]
    pub fn entry_at(&self, offset: usize) -> Option<&DebugData>
    {
        self.by_offset.get(&offset).map(|id| self.entry(*id))
    }

    /// Children of `entry`, in encoding order.
    pub fn children<'a>(&'a self, entry: &'a DebugData) -> impl Iterator<Item = &'a DebugData> + 'a
    {
        entry.children().iter().map(move |id| self.entry(*id))
    }

    /// All entries in encoding order.
    pub fn entries(&self) -> impl Iterator<Item = &DebugData>
    {
        self.entries.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize
    {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool
    {
        self.entries.is_empty()
    }
}
