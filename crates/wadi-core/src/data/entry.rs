//! One parsed debug-info entry.

use gimli::{DwAt, DwTag};
use smallvec::SmallVec;

use super::value::{AttributeValue, ByteRange};
use crate::error::{DebugError, Result};

/// Index of an entry in its unit's arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EntryId(u32);

impl EntryId
{
    pub(crate) fn from_index(index: usize) -> Self
    {
        // Units never approach 2^32 entries: every entry costs at least one byte.
        Self(u32::try_from(index).unwrap_or(u32::MAX))
    }

    #[must_use]
    pub fn index(self) -> usize
    {
        self.0 as usize
    }
}

/// Attribute list; most entries carry fewer than eight attributes.
pub type Attributes = SmallVec<[(DwAt, AttributeValue); 8]>;

/// A tagged entry with its attributes, in encoding order, and child ids.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DebugData
{
    offset: usize,
    tag: DwTag,
    attributes: Attributes,
    children: Vec<EntryId>,
}

impl DebugData
{
    pub(crate) fn new(offset: usize, tag: DwTag, attributes: Attributes) -> Self
    {
        Self {
            offset,
            tag,
            attributes,
            children: Vec::new(),
        }
    }

    pub(crate) fn push_child(&mut self, child: EntryId)
    {
        self.children.push(child);
    }

    /// Offset of the entry within `.debug_info`.
    #[must_use]
    pub fn offset(&self) -> usize
    {
        self.offset
    }

    #[must_use]
    pub fn tag(&self) -> DwTag
    {
        self.tag
    }

    #[must_use]
    pub fn children(&self) -> &[EntryId]
    {
        &self.children
    }

    #[must_use]
    pub fn attributes(&self) -> &[(DwAt, AttributeValue)]
    {
        &self.attributes
    }

    #[must_use]
    pub fn has(&self, attribute: DwAt) -> bool
    {
        self.attribute(attribute).is_some()
    }

    #[must_use]
    pub fn attribute(&self, attribute: DwAt) -> Option<&AttributeValue>
    {
        self.attributes
            .iter()
            .find(|(name, _)| *name == attribute)
            .map(|(_, value)| value)
    }

    fn require(&self, attribute: DwAt) -> Result<&AttributeValue>
    {
        self.attribute(attribute).ok_or(DebugError::MissingAttribute(attribute))
    }

    pub fn as_i32(&self, attribute: DwAt) -> Result<i32>
    {
        self.require(attribute)?.as_i32(attribute)
    }

    pub fn as_u32(&self, attribute: DwAt) -> Result<u32>
    {
        self.require(attribute)?.as_u32(attribute)
    }

    pub fn as_u64(&self, attribute: DwAt) -> Result<u64>
    {
        self.require(attribute)?.as_u64(attribute)
    }

    pub fn as_str(&self, attribute: DwAt) -> Result<&str>
    {
        self.require(attribute)?.as_str(attribute)
    }

    pub fn as_block(&self, attribute: DwAt) -> Result<ByteRange>
    {
        self.require(attribute)?.as_block(attribute)
    }

    pub fn as_reference(&self, attribute: DwAt) -> Result<usize>
    {
        self.require(attribute)?.as_reference(attribute)
    }

    #[must_use]
    pub fn try_as_i32(&self, attribute: DwAt) -> Option<i32>
    {
        self.attribute(attribute)?.as_i32(attribute).ok()
    }

    #[must_use]
    pub fn try_as_u32(&self, attribute: DwAt) -> Option<u32>
    {
        self.attribute(attribute)?.as_u32(attribute).ok()
    }

    #[must_use]
    pub fn try_as_u64(&self, attribute: DwAt) -> Option<u64>
    {
        self.attribute(attribute)?.as_u64(attribute).ok()
    }

    #[must_use]
    pub fn try_as_str(&self, attribute: DwAt) -> Option<&str>
    {
        self.attribute(attribute)?.as_str(attribute).ok()
    }

    #[must_use]
    pub fn try_as_block(&self, attribute: DwAt) -> Option<ByteRange>
    {
        self.attribute(attribute)?.as_block(attribute).ok()
    }

    #[must_use]
    pub fn try_as_reference(&self, attribute: DwAt) -> Option<usize>
    {
        self.attribute(attribute)?.as_reference(attribute).ok()
    }

    /// Flag lookup; absent or non-flag attributes read as `false`.
    #[must_use]
    pub fn is_set(&self, attribute: DwAt) -> bool
    {
        self.attribute(attribute)
            .and_then(|value| value.as_bool(attribute).ok())
            .unwrap_or(false)
    }
}
