use std::cmp::{max, min};
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context};
use rlimit::{getrlimit, Resource, setrlimit};

use crate::cancellation::CancellationToken;
use crate::chunk_sorter::ChunkSorter;
use crate::chunk_splitter;
use crate::config::{Config, DEFAULT_CHUNK_SIZE_BYTES, DEFAULT_INTERMEDIATE_FILES, INPUT_BUFFER_SIZE, MAX_CHUNK_SIZE_BYTES, OUTPUT_BUFFER_SIZE};
use crate::error::SortError;
use crate::line_record::LineRecord;
use crate::merge;
use crate::scratch_dir::ScratchDir;

/// Sort `source` into `output` using `<working_dir>/TempFiles` for intermediate files.
///
/// Files up to `max_chunk_bytes` long are sorted in memory, larger files are split into chunks
/// of about `max_chunk_bytes`, sorted chunk by chunk and merged.
///
/// # Examples
/// ```
/// use std::path::Path;
/// use numbered_text_sort::cancellation::CancellationToken;
/// use numbered_text_sort::sort::run;
///
/// fn sort_file(source: &Path, output: &Path, work: &Path) -> Result<(), anyhow::Error> {
///     run(source, output, work, CancellationToken::new(), 2 * 1024 * 1024)
/// }
/// ```
pub fn run(
    source: &Path,
    output: &Path,
    working_dir: &Path,
    cancellation: CancellationToken,
    max_chunk_bytes: u64,
) -> Result<(), anyhow::Error> {
    let mut sort = Sort::new(source.to_path_buf(), output.to_path_buf());
    sort.with_tmp_dir(working_dir.to_path_buf());
    sort.with_cancellation(cancellation);
    sort.with_chunk_size_bytes(max_chunk_bytes);
    sort.sort()
}

/// Sort a text file of `<integer>. <text>` lines.
///
/// Lines are ordered by their text, compared byte by byte, and then by their number. Lines equal
/// on both keys keep their input order.
///
/// # Examples
/// ```
/// use std::path::PathBuf;
/// use numbered_text_sort::sort::Sort;
///
/// fn sort_lines(input: PathBuf, output: PathBuf, tmp: PathBuf) -> Result<(), anyhow::Error> {
///     let mut text_file_sort = Sort::new(input, output);
///     // the directory hosting the TempFiles scratch directory. The default is the system temp
///     // dir - std::env::temp_dir(). Two sorts must not share a directory.
///     text_file_sort.with_tmp_dir(tmp);
///     // files larger than this are sorted in chunks of about this size
///     text_file_sort.with_chunk_size_mib(16);
///     text_file_sort.sort()
/// }
/// ```
pub struct Sort {
    input: PathBuf,
    output: PathBuf,
    tmp: PathBuf,
    chunk_size_bytes: u64,
    files: usize,
    cancellation: CancellationToken,
}

impl Sort {
    /// Create a default Sort definition.
    ///
    /// * intermediate files are kept in `TempFiles` under std::env::temp_dir()
    /// * input longer than 2 MiB is sorted in chunks of 2 MiB
    /// * at most 10 sorted files are merged at a time
    /// * the sort cannot be cancelled unless a token is provided with [Sort::with_cancellation]
    ///
    /// The Sort implementation will increase the file descriptor rlimit to accommodate configured
    /// open files
    pub fn new(input: PathBuf, output: PathBuf) -> Sort {
        Sort {
            input,
            output,
            tmp: std::env::temp_dir(),
            chunk_size_bytes: DEFAULT_CHUNK_SIZE_BYTES,
            files: DEFAULT_INTERMEDIATE_FILES,
            cancellation: CancellationToken::new(),
        }
    }

    /// Set the directory hosting the `TempFiles` scratch directory. By default use
    /// std::env::temp_dir(). The scratch directory is deleted and recreated by every sort.
    pub fn with_tmp_dir(&mut self, tmp: PathBuf) {
        self.tmp = tmp;
    }

    /// Input longer than 'chunk_size_bytes' is read in chunks of 'chunk_size_bytes' respecting
    /// line boundaries
    pub fn with_chunk_size_bytes(&mut self, chunk_size_bytes: u64) {
        self.chunk_size_bytes = chunk_size_bytes;
    }

    /// Input longer than 'chunk_size_mib' MiB is read in chunks of 'chunk_size_mib' MiB
    /// respecting line boundaries
    pub fn with_chunk_size_mib(&mut self, chunk_size_mib: u64) {
        self.chunk_size_bytes = chunk_size_mib * 1024 * 1024;
    }

    /// Set the number of sorted files merged at a time. The default is 10.
    pub fn with_intermediate_files(&mut self, files: usize) {
        self.files = files;
    }

    /// Set the token used to cancel the sort from another thread.
    pub fn with_cancellation(&mut self, cancellation: CancellationToken) {
        self.cancellation = cancellation;
    }

    /// Sort the input file into the output file
    pub fn sort(&self) -> Result<(), anyhow::Error> {
        self.validate()?;
        let config = self.create_config();
        let (current_soft, current_hard) = Self::get_rlimits()?;
        log::info!("Current rlimit NOFILE, soft: {}, hard: {}", current_soft, current_hard);
        let new_soft = min(max((config.files() + 256) as u64, current_soft), current_hard);
        log::info!("Set new rlimit NOFILE, soft: {}, hard: {}", new_soft, current_hard);
        Self::set_rlimits(new_soft, current_hard)?;
        let result = Self::internal_sort(&self.input, &config, &self.output);
        log::info!("Restore rlimit NOFILE, soft: {}, hard: {}", current_soft, current_hard);
        Self::set_rlimits(current_soft, current_hard)?;
        result
    }

    /// Check whether the input file is sorted
    pub fn check(&self) -> Result<bool, anyhow::Error> {
        Self::internal_check(&self.input)
    }

    /// Check the settings and paths before anything is written.
    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if self.chunk_size_bytes == 0 || self.chunk_size_bytes > MAX_CHUNK_SIZE_BYTES {
            return Err(
                SortError::InvalidConfiguration(
                    format!("chunk size must be between 1 and {} bytes, got {}", MAX_CHUNK_SIZE_BYTES, self.chunk_size_bytes)
                ).into()
            );
        }

        if self.files < 2 {
            return Err(
                SortError::InvalidConfiguration(
                    format!("at least 2 files must be merged at a time, got {}", self.files)
                ).into()
            );
        }

        if !self.input.is_file() {
            return Err(
                SortError::InvalidConfiguration(
                    format!("input is not a file: {}", self.input.display())
                ).into()
            );
        }

        if let Some(parent) = self.output.parent() {
            if !parent.as_os_str().is_empty() && !parent.is_dir() {
                return Err(
                    SortError::InvalidConfiguration(
                        format!("output directory does not exist: {}", parent.display())
                    ).into()
                );
            }
        }
        Ok(())
    }

    fn get_rlimits() -> Result<(u64, u64), anyhow::Error> {
        getrlimit(Resource::NOFILE).with_context(|| "getrlimit")
    }

    fn set_rlimits(soft: u64, hard: u64) -> Result<(), anyhow::Error> {
        setrlimit(Resource::NOFILE, soft, hard)
            .with_context(|| format!("set rlimit NOFILE, soft: {}, hard: {}", soft, hard))?;
        Ok(())
    }

    fn create_config(&self) -> Config {
        Config::new(
            self.tmp.clone(),
            self.chunk_size_bytes,
            self.files,
            self.cancellation.clone(),
        )
    }

    pub(crate) fn internal_check(path: &Path) -> Result<bool, anyhow::Error> {
        let mut result = true;
        let mut n = 0;
        let mut line = String::new();
        let mut previous: Option<LineRecord> = None;
        let mut reader = BufReader::with_capacity(
            INPUT_BUFFER_SIZE,
            File::open(path).with_context(|| anyhow!("path: {}", path.display()))?,
        );
        while reader.read_line(&mut line)? != 0 {
            n += 1;
            let current_line_record = LineRecord::new(line)
                .with_context(|| anyhow!("path: {}, line: {}", path.display(), n))?;

            match previous {
                None => {
                    previous = Some(current_line_record);
                }
                Some(previous_line_record) => {
                    if previous_line_record <= current_line_record {
                        previous = Some(current_line_record);
                    } else {
                        log::info!("{} is not sorted at line {}: {}", path.display(), n, current_line_record.line());
                        result = false;
                        break;
                    }
                }
            }
            line = String::new();
        }
        Ok(result)
    }

    fn internal_sort(input: &Path, config: &Config, output: &Path) -> Result<(), anyhow::Error> {
        log::info!("Start sorting {} into {}", input.display(), output.display());
        let scratch = ScratchDir::create(config.tmp())?;
        log::info!("Scratch directory: {}", scratch.path().display());
        let length = input.metadata()
            .with_context(|| anyhow!("path: {}", input.display()))?
            .len();

        if length <= config.chunk_size_bytes() {
            log::info!("Input of {} bytes fits in one chunk, sorting in memory", length);
            Self::sort_in_memory(input, config, output)?;
        } else {
            log::info!("Input of {} bytes exceeds {} bytes, sorting in chunks", length, config.chunk_size_bytes());
            Self::sort_in_chunks(input, config, output, &scratch)?;
        }
        log::info!("Finish sorting {}", input.display());
        Ok(())
    }

    fn sort_in_memory(input: &Path, config: &Config, output: &Path) -> Result<(), anyhow::Error> {
        let mut reader = BufReader::with_capacity(
            INPUT_BUFFER_SIZE,
            File::open(input).with_context(|| anyhow!("path: {}", input.display()))?,
        );
        let mut line_records = Vec::new();
        let mut line = String::new();
        while reader.read_line(&mut line)
            .with_context(|| anyhow!("path: {}, line: {}", input.display(), line_records.len() + 1))? != 0 {
            config.cancellation().check()?;
            let line_record = LineRecord::new(line)
                .with_context(|| anyhow!("path: {}, line: {}", input.display(), line_records.len() + 1))?;
            line_records.push(line_record);
            line = String::new();
        }
        line_records.sort();

        let mut writer = BufWriter::with_capacity(
            OUTPUT_BUFFER_SIZE,
            File::create(output).with_context(|| anyhow!("path: {}", output.display()))?,
        );
        for line_record in &line_records {
            config.cancellation().check()?;
            writer.write_all(line_record.line().as_bytes())?;
            writer.write_all(b"\n")?;
        }
        writer.flush()
            .with_context(|| anyhow!("path: {}", output.display()))?;
        Ok(())
    }

    fn sort_in_chunks(input: &Path, config: &Config, output: &Path, scratch: &ScratchDir) -> Result<(), anyhow::Error> {
        let split_chunks = chunk_splitter::split(input, scratch, config)?;

        log::info!("Start sorting {} chunks", split_chunks.files().len());
        let mut chunk_sorter = ChunkSorter::new(split_chunks.max_lines());
        let mut sorted_files = Vec::with_capacity(split_chunks.files().len());
        for (i, unsorted) in split_chunks.files().iter().enumerate() {
            let sorted = scratch.sorted_path(i as u64 + 1);
            chunk_sorter.sort_chunk(unsorted, &sorted, config)?;
            sorted_files.push(sorted);
        }
        log::info!("Finish sorting {} chunks", sorted_files.len());

        merge::merge_sorted_files(sorted_files, output, scratch, config)?;
        Ok(())
    }
}
