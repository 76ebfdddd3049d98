//! Code ranges of entries.

use gimli::constants;

use super::PcRange;
use crate::context::DebugParserContext;
use crate::data::DebugData;
use crate::error::Result;

/// Code range covered by `entry`.
///
/// Uses `DW_AT_ranges` when present (the smallest start and largest end of
/// the list, units of version 2–4 only) and `DW_AT_low_pc`/`DW_AT_high_pc`
/// otherwise. A constant-class `high_pc` is a length from `low_pc`.
///
/// Returns `Ok(None)` when the entry has no usable range, including ranges
/// that do not fit in 32-bit code offsets.
///
/// ## Errors
///
/// Fails when the attributes carry the wrong encoding class or a range list
/// runs past its section.
pub fn read_pcs(entry: &DebugData, context: &DebugParserContext<'_>) -> Result<Option<PcRange>>
{
    if let Some(ranges) = entry.attribute(constants::DW_AT_ranges) {
        let offset = ranges.as_u64(constants::DW_AT_ranges)?;
        if context.version() < 5 {
            let list = context.read_ranges(offset)?;
            let start = list.iter().map(|range| range.start).min();
            let end = list.iter().map(|range| range.end).max();
            return Ok(start.zip(end).map(|(start, end)| PcRange::new(start, end)));
        }
    }

    let Some(low) = entry.attribute(constants::DW_AT_low_pc) else {
        return Ok(None);
    };
    let low = low.as_u64(constants::DW_AT_low_pc)?;
    let high = match entry.attribute(constants::DW_AT_high_pc) {
        Some(value) if value.is_constant() => low.checked_add(value.as_u64(constants::DW_AT_high_pc)?),
        Some(value) => Some(value.as_u64(constants::DW_AT_high_pc)?),
        None => None,
    };

    let range = high.and_then(|high| Some(PcRange::new(u32::try_from(low).ok()?, u32::try_from(high).ok()?)));
    Ok(range)
}
