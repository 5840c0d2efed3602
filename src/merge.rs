use std::collections::BinaryHeap;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context};

use crate::config::{Config, OUTPUT_BUFFER_SIZE};
use crate::merge_cursor::MergeCursor;
use crate::scratch_dir::ScratchDir;

/// Merge sorted chunk files into `output`.
///
/// While there are more files than the configured number of intermediate files, consecutive
/// groups are merged into `<n>.sorted` files, one per group, and the next pass works on those.
/// The final pass writes to `output`. Every merged input file is deleted. Returns the number of
/// lines written to `output`.
pub(crate) fn merge_sorted_files(sorted_files: Vec<PathBuf>, output: &Path, scratch: &ScratchDir, config: &Config) -> Result<usize, anyhow::Error> {
    let mut files = sorted_files;
    let mut pass = 0;
    while files.len() > config.files() {
        pass += 1;
        log::info!("Merge pass {}, {} files in groups of {}", pass, files.len(), config.files());
        for (i, group) in files.chunks(config.files()).enumerate() {
            let index = i as u64 + 1;
            let merged_path = scratch.sorted_path(index);
            if group.len() == 1 {
                std::fs::rename(&group[0], &merged_path)
                    .with_context(|| anyhow!("Rename {} to {}", group[0].display(), merged_path.display()))?;
                continue;
            }

            let tmp_path = scratch.sorted_tmp_path(index);
            let lines = merge_into(group, &tmp_path, config)?;
            std::fs::rename(&tmp_path, &merged_path)
                .with_context(|| anyhow!("Rename {} to {}", tmp_path.display(), merged_path.display()))?;
            log::debug!("Merged {} files into {}, {} lines", group.len(), merged_path.display(), lines);
        }
        files = scratch.sorted_files()?;
    }

    log::info!("Final merge of {} files into {}", files.len(), output.display());
    let lines = merge_into(&files, output, config)?;
    log::info!("Finished merging sorted files, merged length: {} lines", lines);
    Ok(lines)
}

fn merge_into(files: &[PathBuf], path: &Path, config: &Config) -> Result<usize, anyhow::Error> {
    let file = File::create(path)
        .with_context(|| anyhow!("path: {}", path.display()))?;
    let mut writer = BufWriter::with_capacity(OUTPUT_BUFFER_SIZE, file);
    let lines = merge(files, &mut writer, config)
        .with_context(|| anyhow!("Merging into {}", path.display()))?;
    writer.flush()
        .with_context(|| anyhow!("path: {}", path.display()))?;
    Ok(lines)
}

/// Single k-way merge pass of sorted files into `writer`. Deletes the files once all of them are
/// consumed and closed.
pub(crate) fn merge<W: Write>(files: &[PathBuf], writer: &mut W, config: &Config) -> Result<usize, anyhow::Error> {
    let mut merged_len: usize = 0;
    {
        let mut cursors = BinaryHeap::with_capacity(files.len());
        for (source_index, path) in files.iter().enumerate() {
            config.cancellation().check()?;
            let cursor = MergeCursor::new(path, source_index)?;
            if !cursor.is_finished() {
                cursors.push(cursor);
            }
        }

        while let Some(mut current_min) = cursors.pop() {
            // comparison operators are flipped to work with BinaryHeap (Max Heap)
            loop {
                config.cancellation().check()?;
                let line_record = match current_min.advance()? {
                    Some(line_record) => line_record,
                    None => break,
                };
                writer.write_all(line_record.line().as_bytes())?;
                writer.write_all(b"\n")?;
                merged_len += 1;

                if current_min.is_finished() {
                    break;
                }
                if let Some(next_min) = cursors.peek() {
                    if *next_min > current_min {
                        break;
                    }
                }
            }
            if !current_min.is_finished() {
                cursors.push(current_min);
            }
        }
    }

    for path in files {
        std::fs::remove_file(path)
            .with_context(|| anyhow!("path: {}", path.display()))?;
    }
    Ok(merged_len)
}
