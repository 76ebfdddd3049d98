//! # Binary Reader
//!
//! Forward-only little-endian decoding over a window of an immutable buffer,
//! built on `gimli`'s slice reader.
//!
//! Every DWARF section embedded in the custom data is read through a
//! [`DebugReader`] whose window covers exactly that section, so a read that
//! runs off the end of a section fails with [`DebugError::Truncated`] even if
//! more bytes follow in the buffer.

use gimli::{EndianSlice, LittleEndian, Reader as _};

use crate::error::{map_dwarf_error, DebugError, Result};

/// Little-endian `gimli` slice over part of the custom data.
pub type DebugSlice<'a> = EndianSlice<'a, LittleEndian>;

/// Cursor over `data[base..end]`.
///
/// Decoding is delegated to `gimli`'s [`Reader`](gimli::Reader) over the
/// unread part of the window. Positions handed to and returned from
/// [`seek`](Self::seek) and [`position`](Self::position) are relative to
/// `base`.
#[derive(Debug, Clone)]
pub struct DebugReader<'a>
{
    data: &'a [u8],
    base: usize,
    end: usize,
    input: DebugSlice<'a>,
    section: &'static str,
}

impl<'a> DebugReader<'a>
{
    /// Reader over the whole buffer.
    #[must_use]
    pub fn new(data: &'a [u8]) -> Self
    {
        Self {
            data,
            base: 0,
            end: data.len(),
            input: EndianSlice::new(data, LittleEndian),
            section: "custom data",
        }
    }

    /// Reader over `data[start..start + len]`.
    ///
    /// ## Errors
    ///
    /// Returns [`DebugError::Truncated`] if the window does not fit in `data`.
    pub fn window(data: &'a [u8], start: usize, len: usize) -> Result<Self>
    {
        let end = start.checked_add(len).ok_or(DebugError::Truncated {
            offset: start,
            needed: len,
        })?;
        let Some(bytes) = data.get(start..end) else {
            return Err(DebugError::Truncated {
                offset: start,
                needed: end.saturating_sub(data.len()),
            });
        };
        Ok(Self {
            data,
            base: start,
            end,
            input: EndianSlice::new(bytes, LittleEndian),
            section: "custom data",
        })
    }

    /// Name the section this reader covers; used in error reports.
    #[must_use]
    pub fn named(mut self, section: &'static str) -> Self
    {
        self.section = section;
        self
    }

    /// Sub-reader over `len` bytes starting `start` bytes into this window.
    ///
    /// ## Errors
    ///
    /// Returns [`DebugError::Truncated`] if the range leaves this window.
    pub fn sub_window(&self, start: usize, len: usize) -> Result<Self>
    {
        let absolute = self.base.checked_add(start).ok_or(DebugError::Truncated {
            offset: self.base,
            needed: start,
        })?;
        let reader = Self::window(self.data, absolute, len)?;
        if reader.end > self.end {
            return Err(DebugError::Truncated {
                offset: absolute,
                needed: reader.end - self.end,
            });
        }
        Ok(reader.named(self.section))
    }

    /// Move the cursor to `offset` relative to the window base.
    ///
    /// ## Errors
    ///
    /// Returns [`DebugError::Truncated`] if the offset lies past the window end.
    pub fn seek(&mut self, offset: usize) -> Result<()>
    {
        let target = self.base.saturating_add(offset);
        if target > self.end {
            return Err(DebugError::Truncated {
                offset: target,
                needed: target - self.end,
            });
        }
        self.input = EndianSlice::new(&self.data[target..self.end], LittleEndian);
        Ok(())
    }

    /// Cursor position relative to the window base.
    #[must_use]
    pub fn position(&self) -> usize
    {
        self.absolute_position() - self.base
    }

    /// Cursor position in the underlying buffer.
    #[must_use]
    pub fn absolute_position(&self) -> usize
    {
        self.end - self.input.len()
    }

    /// Absolute offset of the window start.
    #[must_use]
    pub fn base(&self) -> usize
    {
        self.base
    }

    /// Length of the window.
    #[must_use]
    pub fn len(&self) -> usize
    {
        self.end - self.base
    }

    /// Bytes left between the cursor and the window end.
    #[must_use]
    pub fn remaining(&self) -> usize
    {
        self.input.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool
    {
        self.input.is_empty()
    }

    /// The whole window as a `gimli` slice, for handing to `gimli` section
    /// types.
    #[must_use]
    pub fn window_slice(&self) -> DebugSlice<'a>
    {
        EndianSlice::new(&self.data[self.base..self.end], LittleEndian)
    }

    /// The unread part of the window.
    #[must_use]
    pub fn rest(&self) -> DebugSlice<'a>
    {
        self.input
    }

    fn ensure(&self, len: usize) -> Result<()>
    {
        if len > self.remaining() {
            return Err(DebugError::Truncated {
                offset: self.absolute_position(),
                needed: len - self.remaining(),
            });
        }
        Ok(())
    }

    fn error(&self, offset: usize, err: gimli::Error) -> DebugError
    {
        map_dwarf_error(self.section, offset, err)
    }

    /// Borrow the next `len` bytes and advance past them.
    ///
    /// ## Errors
    ///
    /// Returns [`DebugError::Truncated`] if fewer than `len` bytes remain.
    pub fn read_bytes(&mut self, len: usize) -> Result<&'a [u8]>
    {
        self.ensure(len)?;
        let offset = self.absolute_position();
        let bytes = self.input.split(len).map_err(|err| self.error(offset, err))?;
        Ok(bytes.slice())
    }

    /// Advance past `len` bytes.
    ///
    /// ## Errors
    ///
    /// Returns [`DebugError::Truncated`] if fewer than `len` bytes remain.
    pub fn skip(&mut self, len: usize) -> Result<()>
    {
        self.read_bytes(len).map(|_| ())
    }

    /// Read one byte.
    ///
    /// ## Errors
    ///
    /// Returns [`DebugError::Truncated`] at the window end.
    pub fn read_u8(&mut self) -> Result<u8>
    {
        self.ensure(1)?;
        let offset = self.absolute_position();
        self.input.read_u8().map_err(|err| self.error(offset, err))
    }

    /// Read a little-endian `u16`.
    ///
    /// ## Errors
    ///
    /// Returns [`DebugError::Truncated`] if fewer than 2 bytes remain.
    pub fn read_u16(&mut self) -> Result<u16>
    {
        self.ensure(2)?;
        let offset = self.absolute_position();
        self.input.read_u16().map_err(|err| self.error(offset, err))
    }

    /// Read a little-endian `u32`.
    ///
    /// ## Errors
    ///
    /// Returns [`DebugError::Truncated`] if fewer than 4 bytes remain.
    pub fn read_u32(&mut self) -> Result<u32>
    {
        self.ensure(4)?;
        let offset = self.absolute_position();
        self.input.read_u32().map_err(|err| self.error(offset, err))
    }

    /// Read a little-endian `u64`.
    ///
    /// ## Errors
    ///
    /// Returns [`DebugError::Truncated`] if fewer than 8 bytes remain.
    pub fn read_u64(&mut self) -> Result<u64>
    {
        self.ensure(8)?;
        let offset = self.absolute_position();
        self.input.read_u64().map_err(|err| self.error(offset, err))
    }

    /// Read a little-endian `i32`, as used by the section table.
    ///
    /// ## Errors
    ///
    /// Returns [`DebugError::Truncated`] if fewer than 4 bytes remain.
    pub fn read_i32(&mut self) -> Result<i32>
    {
        self.ensure(4)?;
        let offset = self.absolute_position();
        self.input.read_i32().map_err(|err| self.error(offset, err))
    }

    /// Read a target address of `size` bytes (1, 2, 4 or 8).
    ///
    /// ## Errors
    ///
    /// Returns [`DebugError::UnsupportedFormat`] for any other size.
    pub fn read_address(&mut self, size: u8) -> Result<u64>
    {
        let offset = self.absolute_position();
        self.input.read_address(size).map_err(|err| self.error(offset, err))
    }

    /// Read an unsigned LEB128 value.
    ///
    /// ## Errors
    ///
    /// [`DebugError::Leb128Overflow`] when the encoding does not fit in 64 bits,
    /// [`DebugError::Truncated`] when the window ends mid-value.
    pub fn read_uleb128(&mut self) -> Result<u64>
    {
        let offset = self.absolute_position();
        self.input.read_uleb128().map_err(|err| self.error(offset, err))
    }

    /// Read a signed LEB128 value, sign-extending from the last byte.
    ///
    /// ## Errors
    ///
    /// Same as [`read_uleb128`](Self::read_uleb128).
    pub fn read_sleb128(&mut self) -> Result<i64>
    {
        let offset = self.absolute_position();
        self.input.read_sleb128().map_err(|err| self.error(offset, err))
    }

    /// Read a NUL-terminated string, consuming the terminator.
    ///
    /// ## Errors
    ///
    /// Returns [`DebugError::MissingTerminator`] if no NUL byte occurs before
    /// the window end.
    pub fn read_cstr(&mut self) -> Result<String>
    {
        let offset = self.absolute_position();
        let text = self
            .input
            .read_null_terminated_slice()
            .map_err(|_| DebugError::MissingTerminator(offset))?;
        Ok(text.to_string_lossy().into_owned())
    }
}
