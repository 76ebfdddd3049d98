//! # Error Types
//!
//! Error handling for debug-information parsing and translation.
//!
//! We use `thiserror` to automatically generate `Error` trait implementations
//! and nice error messages.

use gimli::{DwAt, DwForm};
use thiserror::Error;

/// Main error type for debug-information operations
///
/// ## Error Categories
///
/// 1. **Format errors**: everything produced while decoding bytes. The
///    translator catches these per compilation unit and moves on.
/// 2. **Precondition errors**: `InvalidArgument`. These signal an
///    integration mistake and are returned to the caller immediately.
/// 3. **I/O errors**: `Io`, raised by tooling that reads modules from disk.
#[derive(Error, Debug)]
pub enum DebugError
{
    /// A read would run past the end of the current window
    ///
    /// This happens when:
    /// - A unit or line program declares a length beyond its section
    /// - A length-prefixed value (block, extended opcode) overruns its input
    /// - A section table entry points past the custom data
    #[error("Truncated data at offset 0x{offset:x}: needed {needed} more bytes")]
    Truncated
    {
        /// Absolute offset of the failed read
        offset: usize,
        /// Number of missing bytes; 1 when the decoder only knows input ran out
        needed: usize,
    },

    /// A NUL-terminated string ran into the end of the window
    #[error("Unterminated string at offset 0x{0:x}")]
    MissingTerminator(usize),

    /// A LEB128 value used more than 10 bytes or overflowed 64 bits
    #[error("LEB128 value at offset 0x{0:x} overflows 64 bits")]
    Leb128Overflow(usize),

    /// A unit or line-program header declared an unsupported version
    #[error("Unsupported {section} version {version}")]
    UnsupportedVersion
    {
        /// Section name (`.debug_info`, `.debug_line`)
        section: &'static str,
        /// Version found in the header
        version: u16,
    },

    /// Encoding features we do not decode (64-bit DWARF, odd address sizes)
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    /// An entry referenced an abbreviation code missing from the table
    #[error("Unknown abbreviation code {code} at offset 0x{offset:x}")]
    UnknownAbbreviation
    {
        /// Abbreviation code read from the entry
        code: u64,
        /// Absolute offset of the entry
        offset: usize,
    },

    /// The abbreviation table itself is inconsistent
    #[error("Malformed abbreviation table: {0}")]
    MalformedAbbreviation(String),

    /// An attribute used a form we cannot decode
    #[error("Unsupported attribute form {form} at offset 0x{offset:x}")]
    UnsupportedForm
    {
        /// Form code from the abbreviation
        form: DwForm,
        /// Absolute offset of the attribute value
        offset: usize,
    },

    /// The line-number program is inconsistent
    #[error("Invalid line program: {0}")]
    InvalidLineProgram(String),

    /// A section the data requires is absent from the section table
    #[error("Missing section {0}")]
    MissingSection(&'static str),

    /// A required attribute is absent on an entry
    #[error("Missing attribute {0}")]
    MissingAttribute(DwAt),

    /// An attribute's encoding cannot be read as the requested type
    #[error("Attribute {attribute} cannot be read as {expected}")]
    AttributeType
    {
        /// Attribute being coerced
        attribute: DwAt,
        /// Requested representation
        expected: &'static str,
    },

    /// Any other decoding failure reported by `gimli`
    #[error("Malformed {section}: {source}")]
    Dwarf
    {
        /// Section being decoded
        section: &'static str,
        /// Underlying reader error
        #[source]
        source: gimli::Error,
    },

    /// Invalid argument passed to a translator or parser function
    ///
    /// Examples:
    /// - A debug-info offset beyond the end of the custom data
    /// - A section table that points outside the buffer
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// I/O error (for file operations, etc.)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl DebugError
{
    /// Whether this error came from decoding malformed or unsupported bytes.
    ///
    /// Format errors are scoped to a single compilation unit; everything else
    /// aborts the current request.
    #[must_use]
    pub fn is_format_error(&self) -> bool
    {
        !matches!(self, Self::InvalidArgument(_) | Self::Io(_))
    }
}

/// Translate a `gimli` error raised while decoding `section` at `offset`
/// into the matching [`DebugError`] variant.
pub(crate) fn map_dwarf_error(section: &'static str, offset: usize, err: gimli::Error) -> DebugError
{
    use gimli::Error as G;

    match err {
        G::UnexpectedEof(_) => DebugError::Truncated { offset, needed: 1 },
        G::BadUnsignedLeb128 | G::BadSignedLeb128 => DebugError::Leb128Overflow(offset),
        G::UnknownVersion(version) => DebugError::UnsupportedVersion {
            section,
            version: u16::try_from(version).unwrap_or(u16::MAX),
        },
        G::UnknownReservedLength | G::UnsupportedOffsetSize(_) => {
            DebugError::UnsupportedFormat(format!("{section} at 0x{offset:x}: {err}"))
        }
        G::UnsupportedAddressSize(size) => DebugError::UnsupportedFormat(format!("address size {size}")),
        G::UnknownAbbreviation(code) => DebugError::UnknownAbbreviation { code, offset },
        G::AbbreviationTagZero | G::AttributeFormZero | G::BadHasChildren | G::DuplicateAbbreviationCode => {
            DebugError::MalformedAbbreviation(format!("at 0x{offset:x}: {err}"))
        }
        G::UnknownForm(form) => DebugError::UnsupportedForm { form, offset },
        G::LineRangeZero
        | G::MinimumInstructionLengthZero
        | G::MaximumOperationsPerInstructionZero
        | G::OpcodeBaseZero
        | G::MissingFileEntryFormatPath => DebugError::InvalidLineProgram(err.to_string()),
        other => DebugError::Dwarf { section, source: other },
    }
}

/// Convenience type alias for `Result<T, DebugError>`
///
/// ```rust
/// use wadi_core::error::Result;
/// fn foo() -> Result<()>
/// {
///     Ok(())
/// }
/// ```
pub type Result<T> = std::result::Result<T, DebugError>;
