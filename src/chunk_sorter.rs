use std::cmp::max;
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use anyhow::{anyhow, Context};

use crate::config::{Config, INPUT_BUFFER_SIZE, OUTPUT_BUFFER_SIZE};
use crate::line_record::LineRecord;

/// Sorts chunk files in memory, one at a time, reusing a single row buffer.
///
/// The row buffer is allocated once for the largest chunk reported by the splitter and is
/// emptied after every chunk.
pub(crate) struct ChunkSorter {
    rows: Vec<LineRecord>,
    line_capacity: usize,
}

impl ChunkSorter {
    pub(crate) fn new(max_lines: usize) -> ChunkSorter {
        ChunkSorter {
            rows: Vec::with_capacity(max_lines),
            line_capacity: 1,
        }
    }

    /// Sort `unsorted` into `sorted` and delete `unsorted`. Returns the number of lines sorted.
    pub(crate) fn sort_chunk(&mut self, unsorted: &Path, sorted: &Path, config: &Config) -> Result<usize, anyhow::Error> {
        self.rows.clear();
        self.read_records(unsorted, config)?;
        self.rows.sort();
        let lines = self.rows.len();
        self.write_records(sorted, config)?;
        std::fs::remove_file(unsorted)
            .with_context(|| anyhow!("path: {}", unsorted.display()))?;
        log::debug!("Sorted chunk {}, {} lines", sorted.display(), lines);
        Ok(lines)
    }

    fn read_records(&mut self, path: &Path, config: &Config) -> Result<(), anyhow::Error> {
        let capacity = self.rows.capacity();
        let file = File::open(path)
            .with_context(|| anyhow!("path: {}", path.display()))?;
        let mut reader = BufReader::with_capacity(INPUT_BUFFER_SIZE, file);

        let mut n = 0;
        let mut line = String::with_capacity(self.line_capacity);
        while reader.read_line(&mut line)
            .with_context(|| anyhow!("path: {}, line within chunk: {}", path.display(), n + 1))? != 0 {
            config.cancellation().check()?;
            n += 1;
            self.line_capacity = max(line.len(), self.line_capacity);
            let line_record = LineRecord::new(line)
                .with_context(|| anyhow!("path: {}, line within chunk: {}", path.display(), n))?;
            self.rows.push(line_record);
            line = String::with_capacity(self.line_capacity);
        }

        if self.rows.len() > capacity {
            log::warn!("Chunk {} has {} lines, more than the {} expected", path.display(), self.rows.len(), capacity);
        }
        Ok(())
    }

    fn write_records(&mut self, path: &Path, config: &Config) -> Result<(), anyhow::Error> {
        let file = File::create(path)
            .with_context(|| anyhow!("path: {}", path.display()))?;
        let mut writer = BufWriter::with_capacity(OUTPUT_BUFFER_SIZE, file);
        for line_record in self.rows.drain(..) {
            config.cancellation().check()?;
            writer.write_all(line_record.line().as_bytes())?;
            writer.write_all(b"\n")?;
        }
        writer.flush()
            .with_context(|| anyhow!("path: {}", path.display()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use crate::cancellation::CancellationToken;
    use crate::chunk_sorter::ChunkSorter;
    use crate::config::Config;
    use crate::error::SortError;

    fn config(dir: &std::path::Path) -> Config {
        Config::new(dir.to_path_buf(), 1024, 10, CancellationToken::new())
    }

    #[test]
    fn test_sort_chunk() -> Result<(), anyhow::Error> {
        let dir = tempfile::tempdir()?;
        let unsorted = dir.path().join("1.unsorted");
        let sorted = dir.path().join("1.sorted");
        fs::write(&unsorted, "5. banana\n2. apple\n9. cherry\n1. apple")?;

        let mut sorter = ChunkSorter::new(4);
        let lines = sorter.sort_chunk(&unsorted, &sorted, &config(dir.path()))?;
        assert_eq!(lines, 4);
        assert!(!unsorted.exists());
        assert_eq!(fs::read_to_string(&sorted)?, "1. apple\n2. apple\n5. banana\n9. cherry\n");
        assert!(sorter.rows.is_empty());
        assert!(sorter.rows.capacity() >= 4);
        Ok(())
    }

    #[test]
    fn test_buffer_reuse_does_not_leak_rows() -> Result<(), anyhow::Error> {
        let dir = tempfile::tempdir()?;
        let mut sorter = ChunkSorter::new(3);

        fs::write(dir.path().join("1.unsorted"), "3. c\n2. b\n1. a\n")?;
        sorter.sort_chunk(&dir.path().join("1.unsorted"), &dir.path().join("1.sorted"), &config(dir.path()))?;
        fs::write(dir.path().join("2.unsorted"), "4. d\n")?;
        sorter.sort_chunk(&dir.path().join("2.unsorted"), &dir.path().join("2.sorted"), &config(dir.path()))?;

        assert_eq!(fs::read_to_string(dir.path().join("1.sorted"))?, "1. a\n2. b\n3. c\n");
        assert_eq!(fs::read_to_string(dir.path().join("2.sorted"))?, "4. d\n");
        Ok(())
    }

    #[test]
    fn test_chunk_larger_than_estimate() -> Result<(), anyhow::Error> {
        let dir = tempfile::tempdir()?;
        let mut sorter = ChunkSorter::new(1);
        fs::write(dir.path().join("1.unsorted"), "3. c\n2. b\n1. a\n")?;
        let lines = sorter.sort_chunk(&dir.path().join("1.unsorted"), &dir.path().join("1.sorted"), &config(dir.path()))?;
        assert_eq!(lines, 3);
        Ok(())
    }

    #[test]
    fn test_malformed_line() -> Result<(), anyhow::Error> {
        let dir = tempfile::tempdir()?;
        let unsorted = dir.path().join("1.unsorted");
        fs::write(&unsorted, "2. b\nnot-a-number. oops\n")?;

        let mut sorter = ChunkSorter::new(2);
        let error = sorter.sort_chunk(&unsorted, &dir.path().join("1.sorted"), &config(dir.path())).unwrap_err();
        assert!(matches!(error.downcast_ref::<SortError>(), Some(SortError::MalformedLine { .. })));
        assert!(unsorted.exists());
        assert!(!dir.path().join("1.sorted").exists());
        Ok(())
    }
}
