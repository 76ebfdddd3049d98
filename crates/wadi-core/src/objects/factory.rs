//! Language object factories.
//!
//! A factory turns the entries of one unit into [`DebugFunction`]s. The
//! provided [`parse`](DebugObjectFactory::parse) covers the shapes C-like
//! compilers emit; languages customise naming through the other methods.

use std::fmt;

use gimli::constants;

use super::{read_pcs, type_name, DebugFunction, DebugScope, DebugVariable, PcRange, VariableKind, VariableLocation};
use crate::context::{DebugParserContext, DebugParserScope};
use crate::data::{AttributeValue, DebugData};
use crate::error::Result;

/// Builds semantic objects for one source language.
pub trait DebugObjectFactory: Send + Sync + fmt::Debug
{
    /// Human-readable language name.
    fn language_name(&self) -> &'static str;

    /// Separator for qualified names; empty for languages without namespaces.
    fn namespace_separator(&self) -> &'static str
    {
        "::"
    }

    /// Unqualified name to show for `entry`.
    fn display_name(&self, context: &DebugParserContext<'_>, entry: &DebugData) -> Option<String>
    {
        let _ = context;
        entry.try_as_str(constants::DW_AT_name).map(str::to_string)
    }

    /// Demangled form of a linkage name.
    fn demangle(&self, linkage_name: &str) -> Option<String>
    {
        let _ = linkage_name;
        None
    }

    /// Handle one entry found directly under `scope`.
    ///
    /// The default recognises subprograms, recurses into namespaces and
    /// aggregate types with an extended name prefix, and into lexical blocks
    /// with a narrowed range. Other entries are ignored.
    ///
    /// ## Errors
    ///
    /// Propagates format errors from reading ranges and location lists.
    fn parse(&self, context: &mut DebugParserContext<'_>, scope: &DebugParserScope, entry: &DebugData) -> Result<()>
    {
        parse_entry(self, context, scope, entry)
    }
}

fn parse_entry<F>(factory: &F, context: &mut DebugParserContext<'_>, scope: &DebugParserScope, entry: &DebugData) -> Result<()>
where
    F: DebugObjectFactory + ?Sized,
{
    let unit = context.unit();
    match entry.tag() {
        constants::DW_TAG_subprogram => parse_function(factory, context, scope, entry),
        constants::DW_TAG_namespace
        | constants::DW_TAG_structure_type
        | constants::DW_TAG_class_type
        | constants::DW_TAG_union_type => {
            let name = factory.display_name(context, entry);
            let range = scope.range();
            let inner = scope.with(name.as_deref(), range.start, range.end);
            for child in unit.children(entry) {
                factory.parse(context, &inner, child)?;
            }
            Ok(())
        }
        constants::DW_TAG_lexical_block => {
            let range = read_pcs(entry, context)?.unwrap_or_else(|| scope.range());
            let inner = scope.with(None, range.start, range.end);
            for child in unit.children(entry) {
                factory.parse(context, &inner, child)?;
            }
            Ok(())
        }
        _ => Ok(()),
    }
}

fn parse_function<F>(factory: &F, context: &mut DebugParserContext<'_>, scope: &DebugParserScope, entry: &DebugData) -> Result<()>
where
    F: DebugObjectFactory + ?Sized,
{
    if entry.is_set(constants::DW_AT_declaration) {
        return Ok(());
    }
    let Some(range) = read_pcs(entry, context)? else {
        return Ok(());
    };
    if range.is_empty() {
        return Ok(());
    }

    // Out-of-line definitions carry their name on the declaration.
    let declaration = context
        .resolve_reference(entry, constants::DW_AT_specification)
        .or_else(|| context.resolve_reference(entry, constants::DW_AT_abstract_origin));
    let name = factory
        .display_name(context, entry)
        .or_else(|| declaration.and_then(|decl| factory.display_name(context, decl)));
    let linkage_name = linkage_name(entry).or_else(|| declaration.and_then(linkage_name));
    let demangled_name = linkage_name.as_deref().and_then(|name| factory.demangle(name));
    let name = name
        .or_else(|| demangled_name.clone())
        .unwrap_or_else(|| format!("<fn@0x{:x}>", range.start));

    let file = entry
        .try_as_u32(constants::DW_AT_decl_file)
        .map_or(scope.file(), |file| file as usize);
    let line_map = context.line_map(file).or_else(|| context.line_map(scope.file())).cloned();
    let source = context.source(file).or_else(|| context.source(scope.file())).cloned();
    let frame_base = entry
        .try_as_block(constants::DW_AT_frame_base)
        .and_then(|bytes| context.block_bytes(bytes))
        .map(<[u8]>::to_vec);

    let qualified = scope.qualify(&name, factory.namespace_separator());
    let function_scope = scope.with(Some(&name), range.start, range.end).with_file(file);

    context.push_scope(function_scope);
    let body = walk_scope(factory, context, entry, range);
    context.pop_scope();
    let (parameters, body) = body?;

    tracing::trace!(name = %qualified, %range, "parsed function");
    context.add_function(
        range.start,
        DebugFunction {
            name: qualified,
            linkage_name,
            demangled_name,
            language: factory.language_name(),
            range,
            file,
            source,
            line_map,
            decl_line: entry.try_as_u32(constants::DW_AT_decl_line),
            frame_base,
            parameters,
            scope: body,
        },
    );
    Ok(())
}

/// Collect the variables and nested scopes under `entry`. The enclosing
/// scope must already be on the context's stack.
fn walk_scope<F>(
    factory: &F,
    context: &mut DebugParserContext<'_>,
    entry: &DebugData,
    range: PcRange,
) -> Result<(Vec<DebugVariable>, DebugScope)>
where
    F: DebugObjectFactory + ?Sized,
{
    let unit = context.unit();
    let mut parameters = Vec::new();
    let mut scope = DebugScope::new(range);

    for child in unit.children(entry) {
        match child.tag() {
            constants::DW_TAG_formal_parameter => parameters.push(read_variable(context, child, VariableKind::Parameter)?),
            constants::DW_TAG_variable => {
                let kind = if child.is_set(constants::DW_AT_external) {
                    VariableKind::Global
                } else {
                    VariableKind::Local
                };
                scope.variables.push(read_variable(context, child, kind)?);
            }
            constants::DW_TAG_lexical_block => {
                let block_range = read_pcs(child, context)?.unwrap_or(range);
                let block_scope = context.current_scope().with(None, block_range.start, block_range.end);
                context.push_scope(block_scope);
                let nested = walk_scope(factory, context, child, block_range);
                context.pop_scope();
                let (_, nested) = nested?;
                scope.children.push(nested);
            }
            constants::DW_TAG_subprogram => {
                let current = context.current_scope().clone();
                parse_function(factory, context, &current, child)?;
            }
            _ => {}
        }
    }
    Ok((parameters, scope))
}

fn read_variable(context: &DebugParserContext<'_>, entry: &DebugData, kind: VariableKind) -> Result<DebugVariable>
{
    let location = match entry.attribute(constants::DW_AT_location) {
        Some(AttributeValue::Block(bytes)) => context
            .block_bytes(*bytes)
            .map(|bytes| VariableLocation::Expression(bytes.to_vec())),
        Some(AttributeValue::SectionOffset(offset) | AttributeValue::Unsigned(offset)) if context.version() < 5 => {
            Some(VariableLocation::List(context.read_location_list(*offset)?))
        }
        _ => None,
    };

    Ok(DebugVariable {
        name: entry.try_as_str(constants::DW_AT_name).map(str::to_string),
        type_name: type_name(context, entry),
        kind,
        location,
        decl_line: entry.try_as_u32(constants::DW_AT_decl_line),
    })
}

fn linkage_name(entry: &DebugData) -> Option<String>
{
    entry
        .try_as_str(constants::DW_AT_linkage_name)
        .or_else(|| entry.try_as_str(constants::DW_AT_MIPS_linkage_name))
        .map(str::to_string)
}
