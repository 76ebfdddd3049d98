//! Typed attribute values.

use std::fmt;

use gimli::DwAt;

use crate::error::{DebugError, Result};

/// Byte range inside the custom data (expression blocks, `data16`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ByteRange
{
    /// Absolute offset in the custom data.
    pub offset: usize,
    pub len: usize,
}

impl ByteRange
{
    /// Slice the range out of `data`, if it fits.
    #[must_use]
    pub fn slice<'a>(&self, data: &'a [u8]) -> Option<&'a [u8]>
    {
        data.get(self.offset..self.offset.checked_add(self.len)?)
    }
}

/// Decoded value of one attribute.
///
/// The variant records the physical encoding class of the form the value was
/// read with, which decides which coercions succeed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttributeValue
{
    /// `DW_FORM_addr`
    Address(u64),
    /// `data1/2/4/8`, `udata`, `ref_sig8`
    Unsigned(u64),
    /// `sdata`, `implicit_const`
    Signed(i64),
    /// `flag`, `flag_present`
    Flag(bool),
    /// `string`, `strp`, `line_strp`, resolved at parse time
    String(String),
    /// `block*`, `exprloc`, `data16`
    Block(ByteRange),
    /// `ref*`: offset of the target entry within `.debug_info`
    Reference(usize),
    /// `sec_offset`: offset into another section
    SectionOffset(u64),
}

impl AttributeValue
{
    fn kind(&self) -> &'static str
    {
        match self {
            Self::Address(_) => "address",
            Self::Unsigned(_) => "unsigned",
            Self::Signed(_) => "signed",
            Self::Flag(_) => "flag",
            Self::String(_) => "string",
            Self::Block(_) => "block",
            Self::Reference(_) => "reference",
            Self::SectionOffset(_) => "section offset",
        }
    }

    /// Numeric view as `u64`. Negative signed values do not coerce.
    pub fn as_u64(&self, attribute: DwAt) -> Result<u64>
    {
        match *self {
            Self::Address(value) | Self::Unsigned(value) | Self::SectionOffset(value) => Ok(value),
            Self::Signed(value) => u64::try_from(value).map_err(|_| type_error(attribute, "u64")),
            _ => Err(type_error(attribute, "u64")),
        }
    }

    /// Numeric view as `i64`.
    pub fn as_i64(&self, attribute: DwAt) -> Result<i64>
    {
        match *self {
            Self::Signed(value) => Ok(value),
            Self::Address(value) | Self::Unsigned(value) | Self::SectionOffset(value) => {
                i64::try_from(value).map_err(|_| type_error(attribute, "i64"))
            }
            _ => Err(type_error(attribute, "i64")),
        }
    }

    /// Numeric view as `i32`; fails when the value does not fit.
    pub fn as_i32(&self, attribute: DwAt) -> Result<i32>
    {
        let wide = self.as_i64(attribute)?;
        i32::try_from(wide).map_err(|_| type_error(attribute, "i32"))
    }

    /// Numeric view as `u32`; fails when the value does not fit.
    pub fn as_u32(&self, attribute: DwAt) -> Result<u32>
    {
        let wide = self.as_u64(attribute)?;
        u32::try_from(wide).map_err(|_| type_error(attribute, "u32"))
    }

    pub fn as_str(&self, attribute: DwAt) -> Result<&str>
    {
        match self {
            Self::String(value) => Ok(value),
            _ => Err(type_error(attribute, "string")),
        }
    }

    pub fn as_block(&self, attribute: DwAt) -> Result<ByteRange>
    {
        match *self {
            Self::Block(range) => Ok(range),
            _ => Err(type_error(attribute, "block")),
        }
    }

    /// Flags, plus constants interpreted as non-zero.
    pub fn as_bool(&self, attribute: DwAt) -> Result<bool>
    {
        match *self {
            Self::Flag(value) => Ok(value),
            Self::Unsigned(value) => Ok(value != 0),
            Self::Signed(value) => Ok(value != 0),
            _ => Err(type_error(attribute, "flag")),
        }
    }

    pub fn as_reference(&self, attribute: DwAt) -> Result<usize>
    {
        match *self {
            Self::Reference(offset) => Ok(offset),
            _ => Err(type_error(attribute, "reference")),
        }
    }

    /// Whether the value came from a constant-class form.
    ///
    /// `DW_AT_high_pc` is a length when constant-class and an address otherwise.
    #[must_use]
    pub fn is_constant(&self) -> bool
    {
        matches!(self, Self::Unsigned(_) | Self::Signed(_))
    }
}

impl fmt::Display for AttributeValue
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        match self {
            Self::Address(value) => write!(f, "0x{value:08x}"),
            Self::Unsigned(value) => write!(f, "{value}"),
            Self::Signed(value) => write!(f, "{value}"),
            Self::Flag(value) => write!(f, "{value}"),
            Self::String(value) => write!(f, "\"{value}\""),
            Self::Block(range) => write!(f, "<{} bytes @0x{:x}>", range.len, range.offset),
            Self::Reference(offset) => write!(f, "<0x{offset:08x}>"),
            Self::SectionOffset(value) => write!(f, "sec+0x{value:x}"),
        }
    }
}

fn type_error(attribute: DwAt, expected: &'static str) -> DebugError
{
    tracing::trace!(%attribute, expected, "attribute coercion failed");
    DebugError::AttributeType { attribute, expected }
}
