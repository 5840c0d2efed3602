use std::cmp::max;
use std::fs::File;
use std::io::{BufRead, ErrorKind, Read, Write};
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context};

use crate::config::Config;
use crate::scratch_dir::ScratchDir;

const ENDL: u8 = b'\n';

/// Result of splitting the source: unsorted chunk files in source order and the largest number
/// of lines found in any one of them.
#[derive(Debug)]
pub(crate) struct SplitChunks {
    files: Vec<PathBuf>,
    max_lines: usize,
}

impl SplitChunks {
    pub(crate) fn files(&self) -> &Vec<PathBuf> {
        &self.files
    }

    pub(crate) fn max_lines(&self) -> usize {
        self.max_lines
    }
}

/// Reads a stream in line aligned chunks of at least `chunk_size` bytes.
///
/// Each chunk fills a reusable buffer of exactly `chunk_size` bytes. When the buffer ends inside
/// a line the rest of that line is read into an overflow buffer, so no line is split between two
/// chunks. The stream is read once, front to back.
pub(crate) struct ChunkSplitter<R: BufRead> {
    reader: R,
    buffer: Vec<u8>,
    overflow: Vec<u8>,
    filled: usize,
}

impl<R: BufRead> ChunkSplitter<R> {
    pub(crate) fn new(reader: R, chunk_size: usize) -> ChunkSplitter<R> {
        ChunkSplitter {
            reader,
            buffer: vec![0; chunk_size],
            overflow: Vec::new(),
            filled: 0,
        }
    }

    /// Read the next chunk and return the number of lines in it, or None at the end of the stream.
    /// The chunk content is available from [ChunkSplitter::write_chunk] until the next call.
    pub(crate) fn next_chunk(&mut self) -> Result<Option<usize>, std::io::Error> {
        self.overflow.clear();
        self.filled = Self::fill(&mut self.reader, &mut self.buffer)?;
        if self.filled == 0 {
            return Ok(None);
        }

        let mut lines = self.buffer[..self.filled].iter().filter(|b| **b == ENDL).count();
        if self.buffer[self.filled - 1] != ENDL {
            // the line under way is completed by the overflow or ends with the stream
            self.reader.read_until(ENDL, &mut self.overflow)?;
            lines += 1;
        }
        Ok(Some(lines))
    }

    pub(crate) fn chunk_len(&self) -> usize {
        self.filled + self.overflow.len()
    }

    pub(crate) fn write_chunk<W: Write>(&self, writer: &mut W) -> Result<(), std::io::Error> {
        writer.write_all(&self.buffer[..self.filled])?;
        writer.write_all(&self.overflow)?;
        Ok(())
    }

    fn fill(reader: &mut R, buffer: &mut [u8]) -> Result<usize, std::io::Error> {
        let mut filled = 0;
        while filled < buffer.len() {
            match reader.read(&mut buffer[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        }
        Ok(filled)
    }
}

/// Split `source` into unsorted chunk files in the scratch directory.
pub(crate) fn split(source: &Path, scratch: &ScratchDir, config: &Config) -> Result<SplitChunks, anyhow::Error> {
    log::info!("Start splitting {} into chunks of {} bytes", source.display(), config.chunk_size_bytes());
    let file = File::open(source)
        .with_context(|| anyhow!("path: {}", source.display()))?;
    let reader = std::io::BufReader::new(file);
    let mut splitter = ChunkSplitter::new(reader, config.chunk_size_bytes() as usize);

    let mut files = Vec::new();
    let mut max_lines = 0;
    loop {
        config.cancellation().check()?;
        let lines = match splitter.next_chunk()
            .with_context(|| anyhow!("path: {}, chunk: {}", source.display(), files.len() + 1))? {
            Some(lines) => lines,
            None => break,
        };

        let path = scratch.unsorted_path(files.len() as u64 + 1);
        let mut chunk_file = File::create(&path)
            .with_context(|| anyhow!("path: {}", path.display()))?;
        splitter.write_chunk(&mut chunk_file)
            .with_context(|| anyhow!("path: {}", path.display()))?;
        log::debug!("Wrote chunk {}, {} bytes, {} lines", path.display(), splitter.chunk_len(), lines);

        max_lines = max(max_lines, lines);
        files.push(path);
    }
    log::info!("Finish splitting {}, chunks: {}, max lines per chunk: {}", source.display(), files.len(), max_lines);
    Ok(SplitChunks { files, max_lines })
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::io::BufReader;

    use crate::cancellation::CancellationToken;
    use crate::chunk_splitter::{split, ChunkSplitter};
    use crate::config::Config;
    use crate::error::SortError;
    use crate::scratch_dir::ScratchDir;

    fn collect_chunks(input: &[u8], chunk_size: usize) -> Result<Vec<(String, usize)>, anyhow::Error> {
        let mut splitter = ChunkSplitter::new(BufReader::new(input), chunk_size);
        let mut chunks = Vec::new();
        while let Some(lines) = splitter.next_chunk()? {
            let mut content = Vec::new();
            splitter.write_chunk(&mut content)?;
            assert_eq!(content.len(), splitter.chunk_len());
            chunks.push((String::from_utf8(content)?, lines));
        }
        Ok(chunks)
    }

    #[test]
    fn test_empty_stream() -> Result<(), anyhow::Error> {
        assert!(collect_chunks(b"", 16)?.is_empty());
        Ok(())
    }

    #[test]
    fn test_chunk_larger_than_stream() -> Result<(), anyhow::Error> {
        let chunks = collect_chunks(b"1. a\n2. b\n", 1024)?;
        assert_eq!(chunks, vec![("1. a\n2. b\n".to_string(), 2)]);
        Ok(())
    }

    #[test]
    fn test_boundary_on_line_end() -> Result<(), anyhow::Error> {
        let chunks = collect_chunks(b"1. a\n2. b\n3. c\n", 5)?;
        assert_eq!(
            chunks,
            vec![
                ("1. a\n".to_string(), 1),
                ("2. b\n".to_string(), 1),
                ("3. c\n".to_string(), 1),
            ]
        );
        Ok(())
    }

    #[test]
    fn test_boundary_inside_line_is_pushed_to_line_end() -> Result<(), anyhow::Error> {
        let chunks = collect_chunks(b"1. apple\n2. banana\n3. cherry\n", 12)?;
        assert_eq!(
            chunks,
            vec![
                ("1. apple\n2. banana\n".to_string(), 2),
                ("3. cherry\n".to_string(), 1),
            ]
        );
        Ok(())
    }

    #[test]
    fn test_last_line_without_separator() -> Result<(), anyhow::Error> {
        let chunks = collect_chunks(b"1. a\n2. bbbbbb", 7)?;
        assert_eq!(
            chunks,
            vec![
                ("1. a\n2. bbbbbb".to_string(), 2),
            ]
        );

        let chunks = collect_chunks(b"1. a\n2. b", 5)?;
        assert_eq!(
            chunks,
            vec![
                ("1. a\n".to_string(), 1),
                ("2. b".to_string(), 1),
            ]
        );
        Ok(())
    }

    #[test]
    fn test_no_bytes_lost() -> Result<(), anyhow::Error> {
        let input: String = (0..500).map(|i| format!("{i}. {}\n", "x".repeat(i % 17))).collect();
        for chunk_size in [1, 3, 64, 1000, 4096] {
            let chunks = collect_chunks(input.as_bytes(), chunk_size)?;
            let joined: String = chunks.iter().map(|(c, _)| c.as_str()).collect();
            assert_eq!(joined, input);
            let lines: usize = chunks.iter().map(|(_, l)| l).sum();
            assert_eq!(lines, 500);
            for (chunk, lines) in chunks {
                assert!(chunk.ends_with('\n'));
                assert_eq!(chunk.lines().count(), lines);
            }
        }
        Ok(())
    }

    #[test]
    fn test_split_files() -> Result<(), anyhow::Error> {
        let working_dir = tempfile::tempdir()?;
        let source = working_dir.path().join("source.txt");
        fs::write(&source, "3. c\n1. a\n22. bb\n4. d\n5. e\n")?;
        let scratch = ScratchDir::create(working_dir.path())?;
        let config = Config::new(working_dir.path().to_path_buf(), 10, 10, CancellationToken::new());

        let split_chunks = split(&source, &scratch, &config)?;
        assert_eq!(split_chunks.files(), &vec![scratch.unsorted_path(1), scratch.unsorted_path(2), scratch.unsorted_path(3)]);
        assert_eq!(split_chunks.max_lines(), 2);
        assert_eq!(fs::read_to_string(scratch.unsorted_path(1))?, "3. c\n1. a\n");
        assert_eq!(fs::read_to_string(scratch.unsorted_path(2))?, "22. bb\n4. d\n");
        assert_eq!(fs::read_to_string(scratch.unsorted_path(3))?, "5. e\n");
        Ok(())
    }

    #[test]
    fn test_split_cancelled() -> Result<(), anyhow::Error> {
        let working_dir = tempfile::tempdir()?;
        let source = working_dir.path().join("source.txt");
        fs::write(&source, "3. c\n1. a\n")?;
        let scratch = ScratchDir::create(working_dir.path())?;
        let cancellation = CancellationToken::new();
        cancellation.cancel();
        let config = Config::new(working_dir.path().to_path_buf(), 4, 10, cancellation);

        let error = split(&source, &scratch, &config).unwrap_err();
        assert!(matches!(error.downcast_ref::<SortError>(), Some(SortError::Cancelled)));
        Ok(())
    }
}
