//! Splits the input into ordered, bounded-size chunks without copying records.

use crate::error::{LoaderError, Result};
use crate::models::Record;
use std::ops::Deref;

/// A contiguous slice of the input, committed as one batch
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Chunk<'a> {
    index: usize,
    offset: usize,
    records: &'a [Record],
}

impl<'a> Chunk<'a> {
    /// Zero-based position of this chunk in the run
    pub fn index(&self) -> usize {
        self.index
    }

    /// Position of the chunk's first record in the input
    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn records(&self) -> &'a [Record] {
        self.records
    }
}

impl Deref for Chunk<'_> {
    type Target = [Record];

    fn deref(&self) -> &Self::Target {
        self.records
    }
}

/// Partition `records` into `ceil(len / size)` chunks, preserving order
pub fn chunk(records: &[Record], size: usize) -> Result<Vec<Chunk<'_>>> {
    if size == 0 {
        return Err(LoaderError::invalid_configuration(
            "batch_size",
            "chunk size must be greater than zero",
        ));
    }

    Ok(records
        .chunks(size)
        .enumerate()
        .map(|(index, records)| Chunk {
            index,
            offset: index * size,
            records,
        })
        .collect())
}
