//! Tests for line-number program decoding

mod common;

use std::path::Path;

use common::{DwarfBuilder, LineProgram};
use wadi_core::error::DebugError;
use wadi_core::parser::DebugParser;

fn decode(program: &LineProgram, comp_dir: &str) -> wadi_core::Result<Vec<Option<wadi_core::DebugLineMap>>>
{
    let mut dwarf = DwarfBuilder::new();
    dwarf.line_program(&LineProgram::new(4).file("padding.c", 0).copy());
    let offset = dwarf.line_program(program);
    let custom = dwarf.build();
    DebugParser::new(&custom.bytes).read_line_section(custom.debug_info_offset, offset as usize, Path::new(comp_dir))
}

#[test]
fn test_samples_from_copy_and_special_opcodes()
{
    let program = LineProgram::new(4)
        .file("main.c", 0)
        .set_address(0)
        .advance_line(9)
        .copy()
        .special(8, 1)
        .special(12, 4)
        .end_sequence();
    let maps = decode(&program, "/src").unwrap();

    assert_eq!(maps.len(), 2);
    assert!(maps[0].is_none());
    let map = maps[1].as_ref().unwrap();
    assert_eq!(map.file_path(), Path::new("/src/main.c"));
    assert_eq!(map.samples().collect::<Vec<_>>(), vec![(0, 10), (8, 11), (20, 15)]);
    assert_eq!(map.line_at(5), Some(10));
    assert_eq!(map.line_at(8), Some(11));
    assert_eq!(map.line_at(19), Some(11));
    assert_eq!(map.line_at(100), Some(15));
}

#[test]
fn test_end_sequence_does_not_sample()
{
    let program = LineProgram::new(3)
        .file("a.c", 0)
        .set_address(0x40)
        .copy()
        .advance_pc(0x10)
        .end_sequence();
    let maps = decode(&program, "/src").unwrap();
    let map = maps[1].as_ref().unwrap();
    assert_eq!(map.samples().collect::<Vec<_>>(), vec![(0x40, 1)]);
}

#[test]
fn test_rows_go_to_their_file()
{
    let program = LineProgram::new(4)
        .dir("include")
        .dir("/usr/include")
        .file("main.c", 0)
        .file("util.h", 1)
        .file("stdio.h", 2)
        .file("/abs/gen.c", 1)
        .set_address(0x10)
        .copy()
        .set_file(2)
        .advance_line(4)
        .special(4, 0)
        .end_sequence();
    let maps = decode(&program, "/work").unwrap();

    assert_eq!(maps.len(), 5);
    assert_eq!(maps[1].as_ref().unwrap().file_path(), Path::new("/work/main.c"));
    assert_eq!(maps[2].as_ref().unwrap().file_path(), Path::new("/work/include/util.h"));
    assert_eq!(maps[3].as_ref().unwrap().file_path(), Path::new("/usr/include/stdio.h"));
    assert_eq!(maps[4].as_ref().unwrap().file_path(), Path::new("/abs/gen.c"));
    assert_eq!(maps[1].as_ref().unwrap().line_at(0x10), Some(1));
    assert_eq!(maps[2].as_ref().unwrap().line_at(0x14), Some(5));
    assert!(maps[2].as_ref().unwrap().line_at(0x10).is_none());
}

#[test]
fn test_version_5_file_table()
{
    let program = LineProgram::new(5)
        .dir("/build")
        .dir("lib")
        .file("main.rs", 0)
        .file("mod.rs", 1)
        .set_address(0x100)
        .set_file(0)
        .advance_line(2)
        .copy()
        .end_sequence();
    let maps = decode(&program, "/override").unwrap();

    assert_eq!(maps.len(), 2);
    // Directory 0 is the compilation directory handed to the parser.
    assert_eq!(maps[0].as_ref().unwrap().file_path(), Path::new("/override/main.rs"));
    assert_eq!(maps[1].as_ref().unwrap().file_path(), Path::new("/override/lib/mod.rs"));
    assert_eq!(maps[0].as_ref().unwrap().line_at(0x100), Some(3));
}

#[test]
fn test_zero_line_range_is_invalid()
{
    let program = LineProgram::new(4).file("a.c", 0).line_range(0).copy();
    assert!(matches!(decode(&program, "/"), Err(DebugError::InvalidLineProgram(_))));
}

#[test]
fn test_truncated_program()
{
    // set_address announces 5 bytes of operands but the program ends.
    let program = LineProgram::new(4).file("a.c", 0).raw(&[0, 5, 2, 0x10]);
    let err = decode(&program, "/").unwrap_err();
    assert!(err.is_format_error());
}

#[test]
fn test_line_advance_past_i64_does_not_sample()
{
    // The line register wraps instead of overflowing; no bogus line is recorded.
    let program = LineProgram::new(4)
        .file("a.c", 0)
        .set_address(0x10)
        .advance_line(i64::MAX)
        .copy()
        .special(4, 0)
        .end_sequence();
    let maps = decode(&program, "/src").unwrap();
    assert!(maps[1].as_ref().unwrap().is_empty());
}

#[test]
fn test_huge_extended_opcode_length_is_truncated()
{
    // An extended opcode announcing u64::MAX bytes of operands.
    let mut ops = vec![0];
    ops.extend_from_slice(&[0xff; 9]);
    ops.extend_from_slice(&[0x01, 0x80]);
    let program = LineProgram::new(4).file("a.c", 0).raw(&ops);
    let err = decode(&program, "/").unwrap_err();
    assert!(err.is_format_error());
    assert!(matches!(err, DebugError::Truncated { .. } | DebugError::Leb128Overflow(_)));
}

#[test]
fn test_missing_line_section()
{
    let custom = wadi_core::sections::CustomDataBuilder::new()
        .section(gimli::SectionId::DebugInfo, Vec::new())
        .build()
        .unwrap();
    let result = DebugParser::new(&custom.bytes).read_line_section(custom.debug_info_offset, 0, Path::new("/"));
    assert!(matches!(result, Err(DebugError::MissingSection(_))));
}
