//! Hand-written DWARF encoder shared by the integration tests.

#![allow(dead_code)]

use std::collections::HashMap;

use gimli::{constants, leb128, DwAt, DwForm, DwLang, DwTag, SectionId};
use wadi_core::sections::{CustomData, CustomDataBuilder};

pub fn uleb(buf: &mut Vec<u8>, value: u64)
{
    leb128::write::unsigned(buf, value).unwrap();
}

pub fn sleb(buf: &mut Vec<u8>, value: i64)
{
    leb128::write::signed(buf, value).unwrap();
}

pub fn cstr(buf: &mut Vec<u8>, value: &str)
{
    buf.extend_from_slice(value.as_bytes());
    buf.push(0);
}

/// Attribute value together with the form it is encoded with.
#[derive(Debug, Clone)]
pub enum Value
{
    String(String),
    Data1(u8),
    Data2(u16),
    Data4(u32),
    Data8(u64),
    Udata(u64),
    Sdata(i64),
    Addr(u32),
    /// `DW_FORM_ref4` to the entry carrying this label.
    Ref(&'static str),
    SecOffset(u32),
    FlagPresent,
    Exprloc(Vec<u8>),
    ImplicitConst(i64),
}

impl Value
{
    fn form(&self) -> DwForm
    {
        match self {
            Self::String(_) => constants::DW_FORM_string,
            Self::Data1(_) => constants::DW_FORM_data1,
            Self::Data2(_) => constants::DW_FORM_data2,
            Self::Data4(_) => constants::DW_FORM_data4,
            Self::Data8(_) => constants::DW_FORM_data8,
            Self::Udata(_) => constants::DW_FORM_udata,
            Self::Sdata(_) => constants::DW_FORM_sdata,
            Self::Addr(_) => constants::DW_FORM_addr,
            Self::Ref(_) => constants::DW_FORM_ref4,
            Self::SecOffset(_) => constants::DW_FORM_sec_offset,
            Self::FlagPresent => constants::DW_FORM_flag_present,
            Self::Exprloc(_) => constants::DW_FORM_exprloc,
            Self::ImplicitConst(_) => constants::DW_FORM_implicit_const,
        }
    }
}

/// One entry to encode; every entry gets its own abbreviation.
#[derive(Debug, Clone)]
pub struct Die
{
    pub tag: DwTag,
    pub label: Option<&'static str>,
    pub attributes: Vec<(DwAt, Value)>,
    pub children: Vec<Die>,
}

impl Die
{
    pub fn new(tag: DwTag) -> Self
    {
        Self {
            tag,
            label: None,
            attributes: Vec::new(),
            children: Vec::new(),
        }
    }

    pub fn label(mut self, label: &'static str) -> Self
    {
        self.label = Some(label);
        self
    }

    pub fn attr(mut self, name: DwAt, value: Value) -> Self
    {
        self.attributes.push((name, value));
        self
    }

    pub fn name(self, name: &str) -> Self
    {
        self.attr(constants::DW_AT_name, Value::String(name.to_string()))
    }

    pub fn pcs(self, low: u32, len: u32) -> Self
    {
        self.attr(constants::DW_AT_low_pc, Value::Addr(low))
            .attr(constants::DW_AT_high_pc, Value::Data4(len))
    }

    pub fn child(mut self, child: Die) -> Self
    {
        self.children.push(child);
        self
    }
}

/// Root entry of a compilation unit.
pub fn compile_unit(language: DwLang, name: &str, comp_dir: &str, stmt_list: Option<u32>) -> Die
{
    let mut root = Die::new(constants::DW_TAG_compile_unit)
        .name(name)
        .attr(constants::DW_AT_language, Value::Data2(language.0))
        .attr(constants::DW_AT_comp_dir, Value::String(comp_dir.to_string()));
    if let Some(offset) = stmt_list {
        root = root.attr(constants::DW_AT_stmt_list, Value::SecOffset(offset));
    }
    root
}

pub fn subprogram(name: &str, low: u32, len: u32) -> Die
{
    Die::new(constants::DW_TAG_subprogram)
        .name(name)
        .pcs(low, len)
        .attr(constants::DW_AT_decl_file, Value::Data1(1))
}

/// Where a unit landed in `.debug_info`.
#[derive(Debug, Clone, Default)]
pub struct UnitLayout
{
    pub offset: usize,
    /// Section offsets of labelled entries.
    pub labels: HashMap<&'static str, usize>,
}

/// Line-number program encoder.
///
/// For versions 2–4, `dirs` are the include directories (index 0 is implicit)
/// and file numbers start at 1. For version 5, `dirs[0]` is the compilation
/// directory and files are numbered from 0.
#[derive(Debug, Clone)]
pub struct LineProgram
{
    version: u16,
    dirs: Vec<String>,
    files: Vec<(String, u64)>,
    ops: Vec<u8>,
    line_range: u8,
}

pub const LINE_BASE: i8 = -5;
pub const LINE_RANGE: u8 = 14;
pub const OPCODE_BASE: u8 = 13;

impl LineProgram
{
    pub fn new(version: u16) -> Self
    {
        Self {
            version,
            dirs: Vec::new(),
            files: Vec::new(),
            ops: Vec::new(),
            line_range: LINE_RANGE,
        }
    }

    pub fn dir(mut self, dir: &str) -> Self
    {
        self.dirs.push(dir.to_string());
        self
    }

    pub fn file(mut self, name: &str, dir: u64) -> Self
    {
        self.files.push((name.to_string(), dir));
        self
    }

    /// Corrupt the header with an explicit `line_range`.
    pub fn line_range(mut self, line_range: u8) -> Self
    {
        self.line_range = line_range;
        self
    }

    pub fn set_address(mut self, address: u32) -> Self
    {
        self.ops.extend_from_slice(&[0, 5, constants::DW_LNE_set_address.0]);
        self.ops.extend_from_slice(&address.to_le_bytes());
        self
    }

    pub fn advance_pc(mut self, delta: u64) -> Self
    {
        self.ops.push(constants::DW_LNS_advance_pc.0);
        uleb(&mut self.ops, delta);
        self
    }

    pub fn advance_line(mut self, delta: i64) -> Self
    {
        self.ops.push(constants::DW_LNS_advance_line.0);
        sleb(&mut self.ops, delta);
        self
    }

    pub fn set_file(mut self, file: u64) -> Self
    {
        self.ops.push(constants::DW_LNS_set_file.0);
        uleb(&mut self.ops, file);
        self
    }

    pub fn copy(mut self) -> Self
    {
        self.ops.push(constants::DW_LNS_copy.0);
        self
    }

    /// Special opcode advancing `address` and `line` together, then sampling.
    pub fn special(mut self, address: u8, line: i8) -> Self
    {
        let opcode = (i16::from(line) - i16::from(LINE_BASE)) + i16::from(LINE_RANGE) * i16::from(address) + i16::from(OPCODE_BASE);
        self.ops.push(u8::try_from(opcode).unwrap());
        self
    }

    pub fn end_sequence(mut self) -> Self
    {
        self.ops.extend_from_slice(&[0, 1, constants::DW_LNE_end_sequence.0]);
        self
    }

    pub fn raw(mut self, bytes: &[u8]) -> Self
    {
        self.ops.extend_from_slice(bytes);
        self
    }

    pub fn encode(&self) -> Vec<u8>
    {
        let mut tables = Vec::new();
        if self.version >= 5 {
            tables.push(1);
            uleb(&mut tables, constants::DW_LNCT_path.0.into());
            uleb(&mut tables, constants::DW_FORM_string.0.into());
            uleb(&mut tables, self.dirs.len() as u64);
            for dir in &self.dirs {
                cstr(&mut tables, dir);
            }
            tables.push(2);
            uleb(&mut tables, constants::DW_LNCT_path.0.into());
            uleb(&mut tables, constants::DW_FORM_string.0.into());
            uleb(&mut tables, constants::DW_LNCT_directory_index.0.into());
            uleb(&mut tables, constants::DW_FORM_udata.0.into());
            uleb(&mut tables, self.files.len() as u64);
            for (name, dir) in &self.files {
                cstr(&mut tables, name);
                uleb(&mut tables, *dir);
            }
        } else {
            for dir in &self.dirs {
                cstr(&mut tables, dir);
            }
            tables.push(0);
            for (name, dir) in &self.files {
                cstr(&mut tables, name);
                uleb(&mut tables, *dir);
                uleb(&mut tables, 0);
                uleb(&mut tables, 0);
            }
            tables.push(0);
        }

        let mut params = vec![1];
        if self.version >= 4 {
            params.push(1);
        }
        params.push(1);
        params.push(LINE_BASE.to_le_bytes()[0]);
        params.push(self.line_range);
        params.push(OPCODE_BASE);
        params.extend_from_slice(&[0, 1, 1, 1, 1, 0, 0, 0, 1, 0, 0, 1]);
        params.extend_from_slice(&tables);

        let mut body = Vec::new();
        body.extend_from_slice(&self.version.to_le_bytes());
        if self.version >= 5 {
            body.extend_from_slice(&[4, 0]);
        }
        body.extend_from_slice(&(params.len() as u32).to_le_bytes());
        body.extend_from_slice(&params);
        body.extend_from_slice(&self.ops);

        let mut out = (body.len() as u32).to_le_bytes().to_vec();
        out.extend_from_slice(&body);
        out
    }
}

/// Accumulates sections and lays them out as custom data.
#[derive(Debug, Default)]
pub struct DwarfBuilder
{
    prefix: Vec<u8>,
    info: Vec<u8>,
    abbrev: Vec<u8>,
    line: Vec<u8>,
    ranges: Vec<u8>,
    loc: Vec<u8>,
}

impl DwarfBuilder
{
    pub fn new() -> Self
    {
        Self::default()
    }

    /// Bytes placed ahead of the section table.
    pub fn prefix(mut self, prefix: &[u8]) -> Self
    {
        self.prefix = prefix.to_vec();
        self
    }

    /// Append a line program; returns its `.debug_line` offset.
    pub fn line_program(&mut self, program: &LineProgram) -> u32
    {
        let offset = self.line.len() as u32;
        self.line.extend_from_slice(&program.encode());
        offset
    }

    /// Append a `.debug_ranges` list of `(start, end)` pairs.
    pub fn ranges(&mut self, pairs: &[(u32, u32)]) -> u32
    {
        let offset = self.ranges.len() as u32;
        for (start, end) in pairs {
            self.ranges.extend_from_slice(&start.to_le_bytes());
            self.ranges.extend_from_slice(&end.to_le_bytes());
        }
        self.ranges.extend_from_slice(&[0; 8]);
        offset
    }

    /// Append a `.debug_loc` list of `(start, end, expression)` entries.
    pub fn location_list(&mut self, entries: &[(u32, u32, Vec<u8>)]) -> u32
    {
        let offset = self.loc.len() as u32;
        for (start, end, expression) in entries {
            self.loc.extend_from_slice(&start.to_le_bytes());
            self.loc.extend_from_slice(&end.to_le_bytes());
            self.loc.extend_from_slice(&(expression.len() as u16).to_le_bytes());
            self.loc.extend_from_slice(expression);
        }
        self.loc.extend_from_slice(&[0; 8]);
        offset
    }

    /// Append raw `.debug_info` bytes.
    pub fn raw_info(&mut self, bytes: &[u8]) -> usize
    {
        let offset = self.info.len();
        self.info.extend_from_slice(bytes);
        offset
    }

    /// Encode a unit with 4-byte addresses.
    pub fn unit(&mut self, version: u16, root: &Die) -> UnitLayout
    {
        let unit_offset = self.info.len();
        let abbrev_offset = self.abbrev.len() as u32;
        let header_len = if version >= 5 { 12 } else { 11 };

        let mut body = Vec::new();
        let mut code = 0;
        let mut relative = HashMap::new();
        let mut patches = Vec::new();
        encode_die(root, header_len, &mut body, &mut self.abbrev, &mut code, &mut relative, &mut patches);
        uleb(&mut self.abbrev, 0);
        for (position, label) in patches {
            let target = relative[label] as u32;
            body[position..position + 4].copy_from_slice(&target.to_le_bytes());
        }

        let unit_length = (header_len - 4 + body.len()) as u32;
        self.info.extend_from_slice(&unit_length.to_le_bytes());
        self.info.extend_from_slice(&version.to_le_bytes());
        if version >= 5 {
            self.info.push(constants::DW_UT_compile.0);
            self.info.push(4);
            self.info.extend_from_slice(&abbrev_offset.to_le_bytes());
        } else {
            self.info.extend_from_slice(&abbrev_offset.to_le_bytes());
            self.info.push(4);
        }
        self.info.extend_from_slice(&body);

        UnitLayout {
            offset: unit_offset,
            labels: relative
                .into_iter()
                .map(|(label, offset)| (label, unit_offset + offset))
                .collect(),
        }
    }

    pub fn info_len(&self) -> usize
    {
        self.info.len()
    }

    pub fn build(self) -> CustomData
    {
        let mut builder = CustomDataBuilder::new()
            .with_prefix(self.prefix)
            .section(SectionId::DebugAbbrev, self.abbrev)
            .section(SectionId::DebugInfo, self.info)
            .section(SectionId::DebugLine, self.line);
        if !self.ranges.is_empty() {
            builder = builder.section(SectionId::DebugRanges, self.ranges);
        }
        if !self.loc.is_empty() {
            builder = builder.section(SectionId::DebugLoc, self.loc);
        }
        builder.build().unwrap()
    }
}

fn encode_die(
    die: &Die,
    header_len: usize,
    body: &mut Vec<u8>,
    abbrev: &mut Vec<u8>,
    code: &mut u64,
    labels: &mut HashMap<&'static str, usize>,
    patches: &mut Vec<(usize, &'static str)>,
)
{
    *code += 1;
    uleb(abbrev, *code);
    uleb(abbrev, die.tag.0.into());
    abbrev.push(if die.children.is_empty() { 0 } else { 1 });
    for (name, value) in &die.attributes {
        uleb(abbrev, name.0.into());
        uleb(abbrev, value.form().0.into());
        if let Value::ImplicitConst(constant) = value {
            sleb(abbrev, *constant);
        }
    }
    abbrev.extend_from_slice(&[0, 0]);

    if let Some(label) = die.label {
        labels.insert(label, header_len + body.len());
    }
    uleb(body, *code);
    for (_, value) in &die.attributes {
        match value {
            Value::String(text) => cstr(body, text),
            Value::Data1(v) => body.push(*v),
            Value::Data2(v) => body.extend_from_slice(&v.to_le_bytes()),
            Value::Data4(v) | Value::Addr(v) | Value::SecOffset(v) => body.extend_from_slice(&v.to_le_bytes()),
            Value::Data8(v) => body.extend_from_slice(&v.to_le_bytes()),
            Value::Udata(v) => uleb(body, *v),
            Value::Sdata(v) => sleb(body, *v),
            Value::Ref(label) => {
                patches.push((body.len(), *label));
                body.extend_from_slice(&[0; 4]);
            }
            Value::Exprloc(bytes) => {
                uleb(body, bytes.len() as u64);
                body.extend_from_slice(bytes);
            }
            Value::FlagPresent | Value::ImplicitConst(_) => {}
        }
    }
    if !die.children.is_empty() {
        for child in &die.children {
            encode_die(child, header_len, body, abbrev, code, labels, patches);
        }
        body.push(0);
    }
}
