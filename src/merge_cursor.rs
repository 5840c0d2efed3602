use std::cmp::Ordering;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context};

use crate::config::INPUT_BUFFER_SIZE;
use crate::line_record::LineRecord;

/// Head of one sorted file taking part in a merge.
#[derive(Debug)]
pub(crate) struct MergeCursor {
    path: PathBuf,
    reader: BufReader<File>,
    head: Option<LineRecord>,
    source_index: usize,
    line_number: usize,
}

impl MergeCursor {
    pub(crate) fn new(path: &Path, source_index: usize) -> Result<MergeCursor, anyhow::Error> {
        let file = File::open(path)
            .with_context(|| anyhow!("path: {}", path.display()))?;
        let mut merge_cursor = MergeCursor {
            path: path.to_path_buf(),
            reader: BufReader::with_capacity(INPUT_BUFFER_SIZE, file),
            head: None,
            source_index,
            line_number: 0,
        };
        merge_cursor.head = merge_cursor.read_record()?;
        Ok(merge_cursor)
    }

    /// Take the current head and read the next line in its place.
    pub(crate) fn advance(&mut self) -> Result<Option<LineRecord>, anyhow::Error> {
        if self.head.is_none() {
            return Ok(None);
        }
        let next = self.read_record()?;
        Ok(std::mem::replace(&mut self.head, next))
    }

    pub(crate) fn is_finished(&self) -> bool {
        self.head.is_none()
    }

    fn read_record(&mut self) -> Result<Option<LineRecord>, anyhow::Error> {
        let mut line = String::new();
        let bytes = self.reader.read_line(&mut line)
            .with_context(|| anyhow!("path: {}, line: {}", self.path.display(), self.line_number + 1))?;
        if bytes == 0 {
            return Ok(None);
        }
        self.line_number += 1;
        let line_record = LineRecord::new(line)
            .with_context(|| anyhow!("path: {}, line: {}", self.path.display(), self.line_number))?;
        Ok(Some(line_record))
    }
}

impl Eq for MergeCursor {}

impl PartialEq<Self> for MergeCursor {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl PartialOrd<Self> for MergeCursor {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for MergeCursor {
    // reversed so that the cursor with the smallest head is the greatest in a BinaryHeap (Max Heap).
    // Equal heads fall back to the lowest source index.
    fn cmp(&self, other: &Self) -> Ordering {
        let heads = match (&self.head, &other.head) {
            (None, None) => Ordering::Equal,
            // finished cursors sort below active ones
            (None, Some(_)) => Ordering::Less,
            (Some(_), None) => Ordering::Greater,
            (Some(head), Some(other_head)) => other_head.cmp(head),
        };
        heads.then_with(|| other.source_index.cmp(&self.source_index))
    }
}
