//! Immutable, class-indexed view over a finished [`ResultBuffer`].
use std::ops::Range;

use crate::error::{Error, Result};
use crate::result::buffer::{PlacementElement, PlacementStats, ResultBuffer};

/// Finished placement with per-class sub-ranges.
///
/// Class offsets are derived once: `class_offsets()[i]` is the first element of class `i`
/// and the last entry equals [`PlacementResult::len`].
#[derive(Debug, Clone, PartialEq)]
pub struct PlacementResult {
    buffer: ResultBuffer,
    class_offsets: Vec<usize>,
}

impl PlacementResult {
    pub fn new(buffer: ResultBuffer) -> Self {
        let mut class_offsets = Vec::with_capacity(buffer.num_classes() + 1);
        let mut running = 0usize;
        class_offsets.push(running);
        for count in buffer.counts() {
            running += *count as usize;
            class_offsets.push(running);
        }
        Self {
            buffer,
            class_offsets,
        }
    }

    pub fn num_classes(&self) -> usize {
        self.buffer.num_classes()
    }

    /// Total number of placed elements.
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    pub fn counts(&self) -> &[u32] {
        self.buffer.counts()
    }

    /// Prefix sum over the counts, `num_classes + 1` entries.
    pub fn class_offsets(&self) -> &[usize] {
        &self.class_offsets
    }

    /// All elements, grouped by ascending class.
    pub fn elements(&self) -> &[PlacementElement] {
        self.buffer.values()
    }

    /// Index range of a class inside [`Self::elements`].
    pub fn class_range(&self, class_index: usize) -> Result<Range<usize>> {
        if class_index >= self.num_classes() {
            return Err(Error::IndexOutOfRange {
                index: class_index,
                len: self.num_classes(),
            });
        }
        Ok(self.class_offsets[class_index]..self.class_offsets[class_index + 1])
    }

    /// Elements of one class.
    pub fn class_elements(&self, class_index: usize) -> Result<&[PlacementElement]> {
        let range = self.class_range(class_index)?;
        Ok(&self.buffer.values()[range])
    }

    /// Number of elements of one class.
    pub fn class_count(&self, class_index: usize) -> Result<usize> {
        self.class_range(class_index).map(|r| r.len())
    }

    /// Iterates `(class_index, elements)` for every class, including empty ones.
    pub fn classes(&self) -> impl Iterator<Item = (usize, &[PlacementElement])> + '_ {
        self.class_offsets
            .windows(2)
            .enumerate()
            .map(move |(class, w)| (class, &self.buffer.values()[w[0]..w[1]]))
    }

    pub fn stats(&self) -> PlacementStats {
        self.buffer.stats()
    }

    pub fn buffer(&self) -> &ResultBuffer {
        &self.buffer
    }

    pub fn into_buffer(self) -> ResultBuffer {
        self.buffer
    }
}

impl From<ResultBuffer> for PlacementResult {
    fn from(buffer: ResultBuffer) -> Self {
        Self::new(buffer)
    }
}
