//! This crate implements an external merge sort for text files of numbered lines, that is lines
//! in the `<integer>. <text>` format, for example
//!
//! ```text
//! 415. Apple
//! 30432. Something something something
//! 1. Apple
//! 32. Cherry is the best
//! 2. Banana is yellow
//! ```
//!
//! Lines are ordered by their text, compared byte by byte, and then by their number. The example
//! above sorts as
//!
//! ```text
//! 1. Apple
//! 415. Apple
//! 2. Banana is yellow
//! 32. Cherry is the best
//! 30432. Something something something
//! ```
//!
//! Files that fit in a single chunk are sorted in memory. Larger files are split on line
//! boundaries into chunk files, each chunk is sorted in memory, and the sorted chunks are merged
//! in passes of a bounded number of files until a single output remains. Memory use is bounded by
//! the chunk size, and at most one chunk is in memory at a time.
//!
//! # Examples
//! ```
//! use std::path::PathBuf;
//! use numbered_text_sort::cancellation::CancellationToken;
//! use numbered_text_sort::sort::Sort;
//!
//! fn sort_lines(input: PathBuf, output: PathBuf, tmp: PathBuf, cancellation: CancellationToken) -> Result<(), anyhow::Error> {
//!     let mut text_file_sort = Sort::new(input, output);
//!
//!     // set the directory for intermediate results. The sort creates, and on every run
//!     // recreates, a TempFiles directory inside it. The default is the system temp dir -
//!     // std::env::temp_dir(), however, for large files it is recommended to provide a dedicated
//!     // directory, preferably on the same file system as the output result.
//!     text_file_sort.with_tmp_dir(tmp);
//!
//!     // input larger than the chunk size is sorted in chunks. The default is 2 MiB.
//!     text_file_sort.with_chunk_size_mib(64);
//!
//!     // cancel() on a clone of the token stops the sort at the next line read or written
//!     text_file_sort.with_cancellation(cancellation);
//!
//!     text_file_sort.sort()
//! }
//! ```
//!

pub(crate) mod config;
pub(crate) mod chunk_splitter;
pub(crate) mod chunk_sorter;
pub(crate) mod merge;
pub(crate) mod merge_cursor;
pub(crate) mod scratch_dir;
pub(crate) mod sorted_chunk_file;

pub mod sort;
pub mod cancellation;
pub mod error;
pub mod line_record;
