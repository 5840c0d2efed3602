use std::cmp::Ordering;
use std::path::PathBuf;

/// A sorted chunk file found in the scratch directory, ordered by its numeric name.
pub(crate) struct SortedChunkFile {
    path: PathBuf,
    index: u64,
}

impl SortedChunkFile {
    pub(crate) fn new(path: PathBuf, index: u64) -> SortedChunkFile {
        SortedChunkFile {
            path,
            index,
        }
    }

    pub(crate) fn path(self) -> PathBuf {
        self.path
    }
}

impl Eq for SortedChunkFile {}

impl PartialEq<Self> for SortedChunkFile {
    fn eq(&self, other: &Self) -> bool {
        self.index.eq(&other.index)
    }
}

impl PartialOrd<Self> for SortedChunkFile {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for SortedChunkFile {
    fn cmp(&self, other: &Self) -> Ordering {
        self.index.cmp(&other.index)
    }
}
