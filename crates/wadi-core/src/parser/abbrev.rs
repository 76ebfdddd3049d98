//! Abbreviation tables.

use gimli::{Abbreviations, DebugAbbrev, DebugAbbrevOffset};
pub use gimli::{Abbreviation, AttributeSpecification};

use crate::error::{map_dwarf_error, Result};
use crate::reader::DebugSlice;

/// Abbreviations of one unit, keyed by code.
///
/// Every entry in `.debug_info` starts with a code naming its shape here:
/// tag, children flag and the attribute/form list that follows.
#[derive(Debug, Clone)]
pub struct AbbreviationTable
{
    offset: usize,
    abbreviations: Abbreviations,
}

impl AbbreviationTable
{
    /// Decode the table starting at `offset` within `section`, up to its
    /// terminating zero code.
    ///
    /// ## Errors
    ///
    /// This happens when:
    /// - A declaration has a zero tag or form, a bad children flag, or
    ///   reuses a code ([`DebugError::MalformedAbbreviation`](crate::DebugError::MalformedAbbreviation))
    /// - The table runs off the end of `.debug_abbrev`
    ///   ([`DebugError::Truncated`](crate::DebugError::Truncated))
    pub fn parse(section: DebugSlice<'_>, offset: usize) -> Result<Self>
    {
        let abbreviations = DebugAbbrev::from(section)
            .abbreviations(DebugAbbrevOffset(offset))
            .map_err(|err| map_dwarf_error(".debug_abbrev", offset, err))?;
        Ok(Self { offset, abbreviations })
    }

    /// Offset of the table within `.debug_abbrev`.
    #[must_use]
    pub fn offset(&self) -> usize
    {
        self.offset
    }

    #[must_use]
    pub fn get(&self, code: u64) -> Option<&Abbreviation>
    {
        self.abbreviations.get(code)
    }

    /// The `gimli` table, as needed by its entry reader.
    #[must_use]
    pub fn abbreviations(&self) -> &Abbreviations
    {
        &self.abbreviations
    }
}
