//! Per-file pc→line tables.

use std::collections::BTreeMap;
use std::ops::Bound;
use std::path::{Path, PathBuf};

/// Line samples decoded from a line-number program for one source file.
///
/// Lookups answer with the greatest sample whose pc is `<=` the queried pc,
/// so a pc past the last sample maps to the last known line.
///
/// ## Example
///
/// ```rust
/// use wadi_core::data::DebugLineMap;
///
/// let mut map = DebugLineMap::new("/src/lib.c".into());
/// map.add(0, 10);
/// map.add(8, 11);
/// assert_eq!(map.line_at(5), Some(10));
/// assert_eq!(map.line_at(100), Some(11));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DebugLineMap
{
    file_path: PathBuf,
    samples: BTreeMap<u32, u32>,
}

impl DebugLineMap
{
    #[must_use]
    pub fn new(file_path: PathBuf) -> Self
    {
        Self {
            file_path,
            samples: BTreeMap::new(),
        }
    }

    /// Record `line` at `pc`. A later sample at the same pc replaces the earlier one.
    pub fn add(&mut self, pc: u32, line: u32)
    {
        self.samples.insert(pc, line);
    }

    #[must_use]
    pub fn file_path(&self) -> &Path
    {
        &self.file_path
    }

    /// Source line for `pc`, or `None` before the first sample.
    #[must_use]
    pub fn line_at(&self, pc: u32) -> Option<u32>
    {
        self.samples.range(..=pc).next_back().map(|(_, line)| *line)
    }

    /// Every sampled pc that maps to `line`, ascending.
    #[must_use]
    pub fn pcs_for_line(&self, line: u32) -> Vec<u32>
    {
        self.samples
            .iter()
            .filter(|(_, sample)| **sample == line)
            .map(|(pc, _)| *pc)
            .collect()
    }

    /// Smallest and largest line covering `[start, end)`.
    ///
    /// Includes the sample in effect at `start` even when it was recorded
    /// before `start`.
    #[must_use]
    pub fn line_range(&self, start: u32, end: u32) -> Option<(u32, u32)>
    {
        if start >= end {
            return None;
        }
        let leading = self.line_at(start);
        let inner = self
            .samples
            .range((Bound::Excluded(start), Bound::Excluded(end)))
            .map(|(_, line)| *line);
        leading.into_iter().chain(inner).fold(None, |acc, line| match acc {
            None => Some((line, line)),
            Some((lo, hi)) => Some((lo.min(line), hi.max(line))),
        })
    }

    /// Samples in pc order.
    pub fn samples(&self) -> impl Iterator<Item = (u32, u32)> + '_
    {
        self.samples.iter().map(|(pc, line)| (*pc, *line))
    }

    #[must_use]
    pub fn len(&self) -> usize
    {
        self.samples.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool
    {
        self.samples.is_empty()
    }
}
