//! Sample names and read file stems
//!
//! Every artifact of a run is named after the sample, so the derivation must only depend on the
//! read 1 file name: the same file always maps to the same output paths, which is what lets a
//! rerun find and skip finished stages.

use std::path::Path;
use std::sync::OnceLock;

use regex::Regex;

/// Read 1 suffix, e.g. `_1.fastq.gz` or `_1.fq`; everything from the match on is dropped
static READ1_SUFFIX: &str = r"_1\.f.*q*";

fn read1_suffix() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(READ1_SUFFIX).expect("Valid read 1 suffix pattern"))
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Sample name from the read 1 path; the whole file name when the suffix is absent
pub fn sample_name(read1: &Path) -> String {
    let name = file_name(read1);
    read1_suffix().replace(&name, "").into_owned()
}

/// File name up to its first dot, `S1_2.fastq.gz` -> `S1_2`
pub fn read_stem(read: &Path) -> String {
    let name = file_name(read);
    match name.split_once('.') {
        Some((stem, _)) => stem.to_string(),
        None => name,
    }
}
