use std::fs;
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::str::FromStr;

use data_encoding::HEXLOWER;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

pub const SEED_LINES: [&str; 8] = [
    "415. Apple",
    "30432. Something something something",
    "1. Apple",
    "32. Cherry is the best",
    "2. Banana is yellow",
    "7. Something. Else",
    "12. apple",
    "3. Zebra",
];

pub fn setup() {
    let results_dir_path = PathBuf::from_str("./target/results/").unwrap();

    if !results_dir_path.exists() {
        fs::create_dir_all(&results_dir_path).unwrap_or_else(|_|
            panic!("Failed to create results directory: {:?}", results_dir_path)
        );
    } else {
        println!("Results directory exists at {:?}", results_dir_path);
    }
}

#[allow(dead_code)]
pub fn read_lines(path: PathBuf) -> Result<Vec<String>, anyhow::Error> {
    let reader = BufReader::new(File::open(path)?);
    let lines = reader.lines().map(|x| x.unwrap()).collect();
    Ok(lines)
}

#[allow(dead_code)]
pub fn temp_file_name(dir: &str) -> PathBuf {
    let mut result = PathBuf::from(dir);
    let name = HEXLOWER.encode(&rand::random::<[u8; 16]>());
    result.push(name);
    result
}

/// A fresh directory under ./target/results/ to host one sort's scratch directory.
#[allow(dead_code)]
pub fn work_dir() -> PathBuf {
    let path = temp_file_name("./target/results/");
    fs::create_dir_all(&path).unwrap_or_else(|_|
        panic!("Failed to create work directory: {:?}", path)
    );
    path
}

/// Write every seed line twice, then append `<random>. <seed text>` lines until the file reaches
/// `size` bytes.
#[allow(dead_code)]
pub fn generate(path: &Path, size: u64, seed: u64) -> Result<(), anyhow::Error> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut writer = BufWriter::new(File::create(path)?);
    let mut written = 0;
    for line in SEED_LINES {
        for _ in 0..2 {
            writeln!(writer, "{}", line)?;
            written += line.len() as u64 + 1;
        }
    }

    let texts: Vec<&str> = SEED_LINES.iter().map(|l| l.split_once(". ").unwrap().1).collect();
    while written < size {
        let line = format!("{}. {}", rng.gen_range(0..i32::MAX), texts[rng.gen_range(0..texts.len())]);
        writeln!(writer, "{}", line)?;
        written += line.len() as u64 + 1;
    }
    writer.flush()?;
    Ok(())
}

/// Sort key of a line, the text compared bytewise and then the number.
#[allow(dead_code)]
pub fn key(line: &str) -> (Vec<u8>, i64) {
    let (number, text) = line.split_once(". ").unwrap();
    (text.as_bytes().to_vec(), number.parse().unwrap())
}
