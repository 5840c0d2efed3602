use std::path::PathBuf;

use crate::cancellation::CancellationToken;

pub(crate) const DEFAULT_CHUNK_SIZE_BYTES: u64 = 2 * 1024 * 1024;
pub(crate) const MAX_CHUNK_SIZE_BYTES: u64 = 1024 * 1024 * 1024;
pub(crate) const DEFAULT_INTERMEDIATE_FILES: usize = 10;
pub(crate) const INPUT_BUFFER_SIZE: usize = 64 * 1024;
pub(crate) const OUTPUT_BUFFER_SIZE: usize = 64 * 1024;

#[derive(Clone)]
pub(crate) struct Config {
    tmp: PathBuf,
    chunk_size_bytes: u64,
    files: usize,
    cancellation: CancellationToken,
}

impl Config {
    pub(crate) fn new(
        tmp: PathBuf,
        chunk_size_bytes: u64,
        files: usize,
        cancellation: CancellationToken,
    ) -> Config {
        Config {
            tmp,
            chunk_size_bytes,
            files,
            cancellation,
        }
    }

    pub(crate) fn tmp(&self) -> &PathBuf {
        &self.tmp
    }

    pub(crate) fn chunk_size_bytes(&self) -> u64 {
        self.chunk_size_bytes
    }

    /// Maximum number of sorted files merged in one pass
    pub(crate) fn files(&self) -> usize {
        self.files
    }

    pub(crate) fn cancellation(&self) -> &CancellationToken {
        &self.cancellation
    }
}
