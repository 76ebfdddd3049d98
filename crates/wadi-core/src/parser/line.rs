//! Line-number program decoding.
//!
//! `gimli` runs the line state machine; every emitted row is sampled into
//! the line map of the row's file. Headers of versions 2–5 are understood.

use std::path::{Path, PathBuf};

use gimli::{
    AttributeValue as RawValue, DebugLine, DebugLineOffset, DebugLineStr, DebugLineStrOffset, DebugStr,
    DebugStrOffset, FileEntry, LineProgramHeader, LineRow, SectionId,
};

use crate::data::DebugLineMap;
use crate::error::{map_dwarf_error, DebugError, Result};
use crate::reader::DebugSlice;
use crate::sections::DebugSections;

/// Address size of every wasm32 line program before version 5.
const ADDRESS_SIZE: u8 = 4;

type Header<'a> = LineProgramHeader<DebugSlice<'a>>;

/// Decode the program at `stmt_list` and return one map per declared file,
/// indexed by the program's file numbers.
pub(crate) fn read_line_program(
    data: &[u8],
    sections: &DebugSections,
    stmt_list: usize,
    comp_dir: &Path,
) -> Result<Vec<Option<DebugLineMap>>>
{
    let mut section = sections.reader(data, SectionId::DebugLine)?;
    let base = section.base();
    section.seek(stmt_list)?;
    if section.read_u32()? == 0xffff_ffff {
        return Err(DebugError::UnsupportedFormat(format!(
            "64-bit line program at 0x{stmt_list:x}"
        )));
    }

    let fail = |err: gimli::Error| map_dwarf_error(".debug_line", base + stmt_list, err);
    let program = DebugLine::from(section.window_slice())
        .program(DebugLineOffset(stmt_list), ADDRESS_SIZE, None, None)
        .map_err(fail)?;
    let paths = PathResolver {
        data,
        sections,
        comp_dir,
    };

    let version = program.header().version();
    let mut maps = Vec::new();
    if version < 5 {
        // File 0 is implicit before version 5.
        maps.push(None);
    }
    let mut declared = paths.extend(&mut maps, program.header(), 0)?;

    let mut rows = program.rows();
    while let Some((header, row)) = rows.next_row().map_err(fail)? {
        // DW_LNE_define_file grows the file table mid-program.
        if header.file_names().len() > declared {
            declared = paths.extend(&mut maps, header, declared)?;
        }
        if !row.end_sequence() {
            sample_row(row, &mut maps);
        }
    }

    tracing::trace!(
        stmt_list,
        version,
        files = maps.iter().flatten().count(),
        "decoded line program"
    );
    Ok(maps)
}

/// Add `row` to its file's map when the line is known and both the line and
/// the address fit the wasm32 model.
fn sample_row(row: &LineRow, maps: &mut [Option<DebugLineMap>])
{
    let Some(line) = row.line().and_then(|line| u32::try_from(line.get()).ok()) else {
        return;
    };
    let Ok(pc) = u32::try_from(row.address()) else {
        return;
    };
    let Some(Some(map)) = usize::try_from(row.file_index()).ok().and_then(|file| maps.get_mut(file)) else {
        return;
    };
    map.add(pc, line);
}

struct PathResolver<'a, 'p>
{
    data: &'a [u8],
    sections: &'p DebugSections,
    comp_dir: &'p Path,
}

impl<'a> PathResolver<'a, '_>
{
    /// Push a map for every file of `header` past the first `declared`,
    /// returning the new count.
    fn extend(&self, maps: &mut Vec<Option<DebugLineMap>>, header: &Header<'a>, declared: usize) -> Result<usize>
    {
        for file in header.file_names().iter().skip(declared) {
            maps.push(Some(DebugLineMap::new(self.file_path(header, file)?)));
        }
        Ok(header.file_names().len())
    }

    /// Absolute names stand alone; others join their directory, and relative
    /// directories join the compilation directory.
    fn file_path(&self, header: &Header<'a>, file: &FileEntry<DebugSlice<'a>>) -> Result<PathBuf>
    {
        let name = PathBuf::from(self.string(file.path_name())?);
        if name.is_absolute() {
            return Ok(name);
        }

        // Directory 0 is the compilation directory, which callers may override.
        let index = file.directory_index();
        let directory = if index == 0 {
            None
        } else {
            let slot = if header.version() < 5 { index - 1 } else { index };
            usize::try_from(slot)
                .ok()
                .and_then(|slot| header.include_directories().get(slot))
                .map(|value| self.string(value.clone()))
                .transpose()?
        };
        let Some(directory) = directory.map(PathBuf::from) else {
            return Ok(self.comp_dir.join(name));
        };
        if directory.is_absolute() {
            Ok(directory.join(name))
        } else {
            Ok(self.comp_dir.join(directory).join(name))
        }
    }

    fn string(&self, value: RawValue<DebugSlice<'a>>) -> Result<String>
    {
        let text = match value {
            RawValue::String(text) => text,
            RawValue::DebugStrRef(DebugStrOffset(offset)) => {
                DebugStr::from(self.sections.reader(self.data, SectionId::DebugStr)?.window_slice())
                    .get_str(DebugStrOffset(offset))
                    .map_err(|_| DebugError::MissingTerminator(offset))?
            }
            RawValue::DebugLineStrRef(DebugLineStrOffset(offset)) => {
                DebugLineStr::from(self.sections.reader(self.data, SectionId::DebugLineStr)?.window_slice())
                    .get_str(DebugLineStrOffset(offset))
                    .map_err(|_| DebugError::MissingTerminator(offset))?
            }
            other => {
                return Err(DebugError::InvalidLineProgram(format!(
                    "path of unsupported class {other:?}"
                )))
            }
        };
        Ok(text.to_string_lossy().into_owned())
    }
}
