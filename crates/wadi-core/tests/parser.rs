//! Tests for unit iteration and entry-tree parsing

mod common;

use common::{compile_unit, subprogram, Die, DwarfBuilder, Value};
use gimli::constants;
use wadi_core::data::AttributeValue;
use wadi_core::error::DebugError;
use wadi_core::parser::DebugParser;

fn three_units() -> (wadi_core::sections::CustomData, Vec<usize>)
{
    let mut dwarf = DwarfBuilder::new().prefix(&[0xaa; 13]);
    let mut offsets = Vec::new();
    for (index, version) in [4u16, 5, 2].into_iter().enumerate() {
        let root = compile_unit(constants::DW_LANG_C99, &format!("unit{index}.c"), "/src", None)
            .child(subprogram(&format!("f{index}"), 0x10 * index as u32, 8));
        offsets.push(dwarf.unit(version, &root).offset);
    }
    (dwarf.build(), offsets)
}

#[test]
fn test_unit_iteration_visits_every_unit_once()
{
    let (custom, expected) = three_units();
    let parser = DebugParser::new(&custom.bytes);

    let mut visited = Vec::new();
    let mut next = Some(0);
    while let Some(offset) = next {
        let Some(unit) = parser.read_compilation_unit(custom.debug_info_offset, offset).unwrap() else {
            break;
        };
        assert_eq!(unit.header().offset, offset);
        visited.push(offset);
        next = parser.next_compilation_unit_offset(custom.debug_info_offset, offset);
        assert!(visited.len() <= expected.len());
    }
    assert_eq!(visited, expected);
}

#[test]
fn test_header_read_only_decodes_root()
{
    let (custom, offsets) = three_units();
    let parser = DebugParser::new(&custom.bytes);
    let unit = parser
        .read_compilation_unit(custom.debug_info_offset, offsets[1])
        .unwrap()
        .unwrap();
    assert_eq!(unit.header().version, 5);
    assert_eq!(unit.len(), 1);
    assert_eq!(unit.root().as_str(constants::DW_AT_name).unwrap(), "unit1.c");
    assert_eq!(unit.root().as_u32(constants::DW_AT_language).unwrap(), u32::from(constants::DW_LANG_C99.0));
}

#[test]
fn test_offset_past_section_end_is_none()
{
    let (custom, _) = three_units();
    let parser = DebugParser::new(&custom.bytes);
    assert!(parser
        .read_compilation_unit(custom.debug_info_offset, 100_000)
        .unwrap()
        .is_none());
    assert!(parser.next_compilation_unit_offset(custom.debug_info_offset, 100_000).is_none());
}

#[test]
fn test_entry_tree_round_trip()
{
    let root = compile_unit(constants::DW_LANG_C11, "tree.c", "/src", None)
        .child(
            Die::new(constants::DW_TAG_namespace)
                .name("ns")
                .child(subprogram("first", 0x100, 0x20))
                .child(
                    subprogram("second", 0x120, 0x10)
                        .child(Die::new(constants::DW_TAG_formal_parameter).name("x"))
                        .child(
                            Die::new(constants::DW_TAG_variable)
                                .name("count")
                                .attr(constants::DW_AT_const_value, Value::Sdata(-42))
                                .attr(constants::DW_AT_decl_line, Value::ImplicitConst(7)),
                        ),
                ),
        )
        .child(Die::new(constants::DW_TAG_base_type).name("int").attr(constants::DW_AT_byte_size, Value::Data1(4)));

    let mut dwarf = DwarfBuilder::new();
    let layout = dwarf.unit(4, &root);
    let custom = dwarf.build();
    let unit = DebugParser::new(&custom.bytes)
        .read_entries(custom.debug_info_offset, layout.offset)
        .unwrap();

    let top: Vec<_> = unit.children(unit.root()).map(|entry| entry.tag()).collect();
    assert_eq!(top, vec![constants::DW_TAG_namespace, constants::DW_TAG_base_type]);

    let namespace = unit.children(unit.root()).next().unwrap();
    let functions: Vec<_> = unit
        .children(namespace)
        .map(|entry| entry.as_str(constants::DW_AT_name).unwrap().to_string())
        .collect();
    assert_eq!(functions, vec!["first", "second"]);

    let second = unit.children(namespace).nth(1).unwrap();
    assert_eq!(second.as_u64(constants::DW_AT_low_pc).unwrap(), 0x120);
    assert!(matches!(
        second.attribute(constants::DW_AT_high_pc),
        Some(AttributeValue::Unsigned(0x10))
    ));
    let children: Vec<_> = unit.children(second).collect();
    assert_eq!(children.len(), 2);
    assert_eq!(children[0].tag(), constants::DW_TAG_formal_parameter);
    assert_eq!(children[1].as_i32(constants::DW_AT_const_value).unwrap(), -42);
    assert_eq!(children[1].as_u32(constants::DW_AT_decl_line).unwrap(), 7);
    assert_eq!(unit.len(), 7);
}

#[test]
fn test_every_entry_is_indexed_by_offset()
{
    let root = compile_unit(constants::DW_LANG_C, "a.c", "/", None)
        .child(subprogram("f", 0, 4).child(Die::new(constants::DW_TAG_lexical_block)))
        .child(subprogram("g", 4, 4));
    let mut dwarf = DwarfBuilder::new();
    dwarf.unit(4, &compile_unit(constants::DW_LANG_C, "pad.c", "/", None));
    let layout = dwarf.unit(4, &root);
    let custom = dwarf.build();
    let unit = DebugParser::new(&custom.bytes)
        .read_entries(custom.debug_info_offset, layout.offset)
        .unwrap();

    for entry in unit.entries() {
        assert_eq!(unit.entry_at(entry.offset()).unwrap(), entry);
    }
}

#[test]
fn test_reference_resolves_to_exact_entry()
{
    let root = compile_unit(constants::DW_LANG_C, "refs.c", "/src", None)
        .child(Die::new(constants::DW_TAG_base_type).label("int").name("int"))
        .child(Die::new(constants::DW_TAG_pointer_type).label("ptr").attr(constants::DW_AT_type, Value::Ref("int")))
        .child(Die::new(constants::DW_TAG_variable).name("p").attr(constants::DW_AT_type, Value::Ref("ptr")));

    let mut dwarf = DwarfBuilder::new();
    dwarf.unit(4, &compile_unit(constants::DW_LANG_C, "first.c", "/src", None));
    let layout = dwarf.unit(4, &root);
    let custom = dwarf.build();
    let unit = DebugParser::new(&custom.bytes)
        .read_entries(custom.debug_info_offset, layout.offset)
        .unwrap();

    let variable = unit.children(unit.root()).nth(2).unwrap();
    let pointer = unit.entry_at(variable.as_reference(constants::DW_AT_type).unwrap()).unwrap();
    assert_eq!(pointer.offset(), layout.labels["ptr"]);
    assert_eq!(pointer.tag(), constants::DW_TAG_pointer_type);

    let base = unit.entry_at(pointer.as_reference(constants::DW_AT_type).unwrap()).unwrap();
    assert_eq!(base.offset(), layout.labels["int"]);
    assert_eq!(base.as_str(constants::DW_AT_name).unwrap(), "int");
}

#[test]
fn test_unknown_abbreviation_code()
{
    let mut dwarf = DwarfBuilder::new();
    dwarf.unit(4, &compile_unit(constants::DW_LANG_C, "ok.c", "/", None));
    // Version 4 header pointing at the first abbreviation table, then code 99.
    let bad = dwarf.raw_info(&[8, 0, 0, 0, 4, 0, 0, 0, 0, 0, 4, 99]);
    let custom = dwarf.build();
    let result = DebugParser::new(&custom.bytes).read_entries(custom.debug_info_offset, bad);
    assert!(matches!(result, Err(DebugError::UnknownAbbreviation { code: 99, .. })));
}

#[test]
fn test_unsupported_version_and_64_bit()
{
    let mut dwarf = DwarfBuilder::new();
    let v6 = dwarf.raw_info(&[7, 0, 0, 0, 6, 0, 0, 0, 0, 0, 4]);
    let wide = dwarf.raw_info(&[0xff, 0xff, 0xff, 0xff, 0, 0, 0, 0, 0, 0, 0, 0]);
    let custom = dwarf.build();
    let parser = DebugParser::new(&custom.bytes);

    let err = parser.read_entries(custom.debug_info_offset, v6).unwrap_err();
    assert!(matches!(err, DebugError::UnsupportedVersion { version: 6, .. }));
    assert!(err.is_format_error());
    assert!(matches!(
        parser.read_entries(custom.debug_info_offset, wide),
        Err(DebugError::UnsupportedFormat(_))
    ));
}

#[test]
fn test_truncated_unit()
{
    let mut dwarf = DwarfBuilder::new();
    // Declares 100 bytes but the section ends after the header.
    let bad = dwarf.raw_info(&[100, 0, 0, 0, 4, 0, 0, 0, 0, 0, 4]);
    let custom = dwarf.build();
    let result = DebugParser::new(&custom.bytes).read_entries(custom.debug_info_offset, bad);
    assert!(matches!(result, Err(DebugError::Truncated { .. })));
}
