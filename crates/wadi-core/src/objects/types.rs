//! Type-name resolution through `DW_AT_type` chains.

use gimli::constants;

use crate::context::DebugParserContext;
use crate::data::DebugData;

/// Maximum depth when following type references; protects against cycles.
pub const MAX_TYPE_REF_DEPTH: usize = 32;

const UNKNOWN: &str = "<unknown>";

/// Name of the type `entry` refers to through `DW_AT_type`.
///
/// A named target wins; unnamed pointer, reference, `const` and `volatile`
/// types wrap the name of their own target. An entry without `DW_AT_type`
/// has type `void`. Dangling references and chains deeper than
/// [`MAX_TYPE_REF_DEPTH`] resolve to `<unknown>`.
#[must_use]
pub fn type_name(context: &DebugParserContext<'_>, entry: &DebugData) -> String
{
    resolve(context, entry, 0).unwrap_or_else(|| UNKNOWN.to_string())
}

fn resolve(context: &DebugParserContext<'_>, entry: &DebugData, depth: usize) -> Option<String>
{
    if !entry.has(constants::DW_AT_type) {
        return Some("void".to_string());
    }
    if depth >= MAX_TYPE_REF_DEPTH {
        return None;
    }
    let target = context.resolve_reference(entry, constants::DW_AT_type)?;
    if let Some(name) = target.try_as_str(constants::DW_AT_name) {
        return Some(name.to_string());
    }

    let inner = resolve(context, target, depth + 1)?;
    let name = match target.tag() {
        constants::DW_TAG_pointer_type => format!("{inner}*"),
        constants::DW_TAG_reference_type => format!("{inner}&"),
        constants::DW_TAG_rvalue_reference_type => format!("{inner}&&"),
        constants::DW_TAG_const_type => format!("const {inner}"),
        constants::DW_TAG_volatile_type => format!("volatile {inner}"),
        constants::DW_TAG_array_type => format!("{inner}[]"),
        _ => inner,
    };
    Some(name)
}
