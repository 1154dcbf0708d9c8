use bfp_support::constants::{CHUNK_CAPACITY, MAX_SCRIPT_LEN};
use bfp_support::script::encode_metadata;
use bfp_support::{FileMetadata, Result};
use serde::{Deserialize, Serialize};
use std::ops::Range;

/// How a file of `total_bytes` is split across a transaction chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkPlan {
    pub total_bytes: u64,
    pub chunk_capacity: usize,
    pub whole_chunk_count: u64,
    pub last_chunk_size: usize,
    /// Length of the metadata script with every field but `chunk` populated.
    pub metadata_script_len: usize,
    pub last_chunk_fits_in_metadata: bool,
}

/// True when a chunk of `chunk_len` bytes can replace the empty chunk field
/// of a metadata script that is `script_len` bytes long.
pub fn chunk_can_fit_in_metadata(script_len: usize, chunk_len: usize) -> bool {
    if chunk_len == 0 {
        return true;
    }
    MAX_SCRIPT_LEN.saturating_sub(script_len) >= chunk_len
}

impl ChunkPlan {
    pub fn new(total_bytes: u64, template: &FileMetadata) -> Result<Self> {
        let capacity = CHUNK_CAPACITY as u64;
        let metadata_script_len = encode_metadata(&template.without_chunk())?.len();
        let last_chunk_size = (total_bytes % capacity) as usize;
        Ok(Self {
            total_bytes,
            chunk_capacity: CHUNK_CAPACITY,
            whole_chunk_count: total_bytes / capacity,
            last_chunk_size,
            metadata_script_len,
            last_chunk_fits_in_metadata: chunk_can_fit_in_metadata(
                metadata_script_len,
                last_chunk_size,
            ),
        })
    }

    /// Chunk transactions published before the metadata transaction.
    pub fn chunk_transaction_count(&self) -> u64 {
        self.whole_chunk_count + u64::from(self.needs_extra_chunk_transaction())
    }

    pub fn needs_extra_chunk_transaction(&self) -> bool {
        self.last_chunk_size > 0 && !self.last_chunk_fits_in_metadata
    }

    /// Chunk count written into the metadata, counting an inline chunk.
    pub fn declared_chunk_count(&self) -> u64 {
        self.whole_chunk_count + u64::from(self.last_chunk_size > 0)
    }

    pub fn transaction_count(&self) -> u64 {
        self.chunk_transaction_count() + 1
    }

    /// Byte range of each chunk in file order, the partial chunk last.
    pub fn chunk_ranges(&self) -> Vec<Range<usize>> {
        let whole = self.whole_chunk_count as usize;
        let mut ranges: Vec<Range<usize>> = (0..whole)
            .map(|i| i * self.chunk_capacity..(i + 1) * self.chunk_capacity)
            .collect();
        if self.last_chunk_size > 0 {
            let start = whole * self.chunk_capacity;
            ranges.push(start..start + self.last_chunk_size);
        }
        ranges
    }
}
