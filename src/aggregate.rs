//! Join per-sample count files into one table
//!
//! Rows follow the library, columns follow the sorted count file names. Identifiers a sample
//! never saw are written as 0.

use std::collections::{HashMap, HashSet};
use std::fs::{self, File};
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::str;

use log::{info, warn};

use crate::error::AggregateError;

/// Suffixes of per-sample count files, longest first
static COUNT_SUFFIXES: [&str; 2] = [".counts.txt", ".counts"];
/// Name of the joined table inside the counts directory
pub static JOINED_NAME: &str = "all.counts.txt";
static ID_HEADER: &str = "Ag.ID";

/// Dense antigen x sample table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CountTable {
    pub ids: Vec<String>,
    pub samples: Vec<String>,
    counts: Vec<HashMap<String, u64>>,
}

impl CountTable {
    /// Count of `id` in the sample at column `column`, 0 when absent
    pub fn get(&self, id: &str, column: usize) -> u64 {
        self.counts.get(column).and_then(|c| c.get(id)).copied().unwrap_or(0)
    }

    /// Tab separated, header `Ag.ID` then one column per sample
    pub fn write<W: Write>(&self, mut out: W) -> io::Result<()> {
        write!(out, "{}", ID_HEADER)?;
        for sample in &self.samples {
            write!(out, "\t{}", sample)?;
        }
        writeln!(out)?;

        for id in &self.ids {
            write!(out, "{}", id)?;
            for column in 0..self.samples.len() {
                write!(out, "\t{}", self.get(id, column))?;
            }
            writeln!(out)?;
        }
        out.flush()
    }
}

/// Antigen identifiers, first tab separated field of every non-empty line
pub fn read_library(path: &Path) -> Result<Vec<String>, AggregateError> {
    let file = File::open(path).map_err(|err| match err.kind() {
        io::ErrorKind::NotFound => AggregateError::LibraryNotFound(path.to_path_buf()),
        _ => AggregateError::Read { path: path.to_path_buf(), source: err },
    })?;

    let mut ids = Vec::new();
    for line in BufReader::new(file).lines() {
        let line = line.map_err(|source| AggregateError::Read { path: path.to_path_buf(), source })?;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if let Some(id) = line.split('\t').next() {
            ids.push(id.to_string());
        }
    }

    match ids.is_empty() {
        true => Err(AggregateError::EmptyLibrary(path.to_path_buf())),
        false => Ok(ids),
    }
}

/// Sample name for a count file name, None when it is not one
fn sample_of(file_name: &str) -> Option<&str> {
    if file_name == JOINED_NAME {
        return None;
    }
    COUNT_SUFFIXES
        .iter()
        .find_map(|suffix| file_name.strip_suffix(*suffix))
        .filter(|sample| !sample.is_empty())
}

/// Count files in `dir` with their sample names, sorted by file name
pub fn discover_count_files(dir: &Path) -> Result<Vec<(String, PathBuf)>, AggregateError> {
    let read_err = |source| AggregateError::Read { path: dir.to_path_buf(), source };
    let mut found = Vec::new();
    for entry in fs::read_dir(dir).map_err(read_err)? {
        let path = entry.map_err(read_err)?.path();
        if !path.is_file() {
            continue;
        }
        let name = match path.file_name().and_then(|n| n.to_str()) {
            Some(name) => name,
            None => continue,
        };
        if let Some(sample) = sample_of(name) {
            found.push((sample.to_string(), path.clone()));
        }
    }
    // longest suffix first, so `A.counts.txt` wins over `A.counts`
    found.sort_by_key(|(_, path)| !path.to_string_lossy().ends_with(COUNT_SUFFIXES[0]));
    let mut seen = HashSet::new();
    found.retain(|(sample, path)| {
        let first = seen.insert(sample.clone());
        if !first {
            warn!("Sample {} has more than one count file, ignoring {}", sample, path.display());
        }
        first
    });
    found.sort_by(|a, b| a.1.cmp(&b.1));
    Ok(found)
}

/// Sparse `id<TAB>count` pairs; malformed lines are warned about and skipped
pub fn read_counts(path: &Path) -> Result<HashMap<String, u64>, AggregateError> {
    let file = File::open(path).map_err(|source| AggregateError::Read { path: path.to_path_buf(), source })?;
    let mut counts = HashMap::new();

    for (n, line) in BufReader::new(file).split(b'\n').enumerate() {
        let line = line.map_err(|source| AggregateError::Read { path: path.to_path_buf(), source })?;
        let line = match str::from_utf8(&line) {
            Ok(line) => line.trim(),
            Err(err) => {
                warn!("{}:{}: not valid UTF-8 ({}), skipping", path.display(), n + 1, err);
                continue;
            }
        };
        if line.is_empty() {
            continue;
        }
        let mut fields = line.split('\t');
        let (id, count) = match (fields.next(), fields.next()) {
            (Some(id), Some(count)) => (id, count),
            _ => {
                warn!("{}:{}: expected <id><TAB><count>, skipping '{}'", path.display(), n + 1, line);
                continue;
            }
        };
        match count.trim().parse::<u64>() {
            Ok(count) => {
                counts.insert(id.to_string(), count);
            }
            Err(err) => warn!("{}:{}: bad count '{}' ({}), skipping", path.display(), n + 1, count, err),
        }
    }
    Ok(counts)
}

/// Build the table for every count file in `counts_dir` against the library at `library`
pub fn aggregate(library: &Path, counts_dir: &Path) -> Result<CountTable, AggregateError> {
    if !counts_dir.is_dir() {
        return Err(AggregateError::DirectoryNotFound(counts_dir.to_path_buf()));
    }
    let ids = read_library(library)?;

    let files = discover_count_files(counts_dir)?;
    if files.is_empty() {
        return Err(AggregateError::NoCountFiles(counts_dir.to_path_buf()));
    }
    info!("Found {} count files", files.len());

    let mut samples = Vec::with_capacity(files.len());
    let mut counts = Vec::with_capacity(files.len());
    for (sample, path) in files {
        info!("Processing {} -> {}", path.display(), sample);
        counts.push(read_counts(&path)?);
        samples.push(sample);
    }

    Ok(CountTable { ids, samples, counts })
}

/// Write `table` to `<counts_dir>/all.counts.txt` and return that path
pub fn write_joined(table: &CountTable, counts_dir: &Path) -> Result<PathBuf, AggregateError> {
    let path = counts_dir.join(JOINED_NAME);
    let write_err = |source| AggregateError::Write { path: path.clone(), source };
    let file = File::create(&path).map_err(write_err)?;
    table.write(BufWriter::new(file)).map_err(write_err)?;
    Ok(path)
}
