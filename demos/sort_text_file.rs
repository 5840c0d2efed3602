use std::fs;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Error};
use rand::Rng;
use simple_logger::SimpleLogger;

use numbered_text_sort::cancellation::CancellationToken;
use numbered_text_sort::sort::{run, Sort};

use tikv_jemallocator::Jemalloc;
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

const SEED: [&str; 6] = [
    "415. Apple",
    "30432. Something something something",
    "1. Apple",
    "32. Cherry is the best",
    "2. Banana is yellow",
    "7. Something. Else",
];

// Each seed line is written twice, then random lines reusing the seed texts are appended until
// the file is `size` bytes long.
fn generate(output_path: &Path, size: u64) -> Result<(), Error> {
    let mut writer = BufWriter::new(
        File::create(output_path).with_context(|| anyhow!("path: {}", output_path.display()))?
    );
    let mut written = 0;
    for line in SEED {
        writeln!(writer, "{}", line)?;
        writeln!(writer, "{}", line)?;
        written += 2 * (line.len() as u64 + 1);
    }

    let texts: Vec<&str> = SEED.iter().filter_map(|line| line.split_once(". ").map(|(_, text)| text)).collect();
    let mut rng = rand::thread_rng();
    while written < size {
        let line = format!("{}. {}", rng.gen_range(0..i32::MAX), texts[rng.gen_range(0..texts.len())]);
        writeln!(writer, "{}", line)?;
        written += line.len() as u64 + 1;
    }
    writer.flush()?;
    Ok(())
}

fn sort_lines(input_path: &Path, output_path: &Path, work_dir: &Path) -> Result<(), Error> {
    let mut text_file = Sort::new(input_path.to_path_buf(), output_path.to_path_buf());
    text_file.with_tmp_dir(work_dir.to_path_buf());
    text_file.with_chunk_size_mib(1);
    text_file.sort()?;
    Ok(())
}

// cargo run -r --example sort_text_file
pub fn main() -> Result<(), Error> {
    SimpleLogger::new().with_level(log::LevelFilter::Info).init()?;

    let work_dir = PathBuf::from("./target/sort-text-file");
    fs::create_dir_all(&work_dir)?;
    let input_path = work_dir.join("random-16mib.txt");
    let output_path = work_dir.join("sorted-16mib.txt");
    let small_output_path = work_dir.join("sorted-16mib-direct.txt");

    generate(&input_path, 16 * 1024 * 1024)?;
    sort_lines(&input_path, &output_path, &work_dir)?;
    // the same input sorted in memory
    run(&input_path, &small_output_path, &work_dir, CancellationToken::new(), 32 * 1024 * 1024)?;

    let check = Sort::new(output_path.clone(), PathBuf::new());
    log::info!("{} sorted: {}", output_path.display(), check.check()?);
    log::info!("Outputs identical: {}", fs::read(&output_path)? == fs::read(&small_output_path)?);
    Ok(())
}
