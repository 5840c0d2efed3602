use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context};

use crate::sorted_chunk_file::SortedChunkFile;

pub(crate) const SCRATCH_DIR_NAME: &str = "TempFiles";
const UNSORTED_EXTENSION: &str = "unsorted";
const SORTED_EXTENSION: &str = "sorted";
const TMP_EXTENSION: &str = "tmp";

/// Run scoped directory for chunk files.
///
/// Chunk files are named by an integer index: `1.unsorted`, `1.sorted`, `1.sorted.tmp`.
/// Indexes follow input order so that listing the sorted files numerically gives back the order
/// in which they must be merged.
#[derive(Debug)]
pub(crate) struct ScratchDir {
    path: PathBuf,
}

impl ScratchDir {
    /// Create `<working_dir>/TempFiles`, deleting whatever a previous run left there.
    pub(crate) fn create(working_dir: &Path) -> Result<ScratchDir, anyhow::Error> {
        let path = working_dir.join(SCRATCH_DIR_NAME);
        if path.exists() {
            log::info!("Remove scratch directory left by a previous run: {}", path.display());
            fs::remove_dir_all(&path)
                .with_context(|| anyhow!("path: {}", path.display()))?;
        }
        fs::create_dir_all(&path)
            .with_context(|| anyhow!("path: {}", path.display()))?;
        Ok(ScratchDir { path })
    }

    pub(crate) fn path(&self) -> &Path {
        &self.path
    }

    pub(crate) fn unsorted_path(&self, index: u64) -> PathBuf {
        self.path.join(format!("{index}.{UNSORTED_EXTENSION}"))
    }

    pub(crate) fn sorted_path(&self, index: u64) -> PathBuf {
        self.path.join(format!("{index}.{SORTED_EXTENSION}"))
    }

    pub(crate) fn sorted_tmp_path(&self, index: u64) -> PathBuf {
        self.path.join(format!("{index}.{SORTED_EXTENSION}.{TMP_EXTENSION}"))
    }

    /// Sorted chunk files currently in the directory, in numeric order of their names.
    pub(crate) fn sorted_files(&self) -> Result<Vec<PathBuf>, anyhow::Error> {
        let mut sorted_files = Vec::new();
        for entry in fs::read_dir(&self.path).with_context(|| anyhow!("path: {}", self.path.display()))? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some(SORTED_EXTENSION) {
                continue;
            }
            let index = path.file_stem()
                .and_then(|s| s.to_str())
                .and_then(|s| s.parse::<u64>().ok())
                .ok_or_else(|| anyhow!("Unexpected file in scratch directory: {}", path.display()))?;
            sorted_files.push(SortedChunkFile::new(path, index));
        }
        sorted_files.sort();
        Ok(sorted_files.into_iter().map(|f| f.path()).collect())
    }
}
