//! Deduplicated, append-only sample output

use crate::error::Result;
use std::collections::HashSet;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// Unique samples seen so far and the sink they are written to
///
/// Each new sample is appended as `"<n>: <sample>"` where `n` is its
/// 1-based position among unique samples. Each line is flushed before the
/// set is updated, so the number of lines persisted always equals
/// [`SampleStore::unique_count`].
#[derive(Debug)]
pub struct SampleStore<W: Write> {
    writer: W,
    samples: HashSet<String>,
}

/// Path of the results file for an input formula: `<input>.samples`
pub fn results_path(input: &Path) -> PathBuf {
    let mut name = input.as_os_str().to_os_string();
    name.push(".samples");
    PathBuf::from(name)
}

impl SampleStore<BufWriter<File>> {
    /// Create (or truncate) the results file for `input`
    pub fn create(input: &Path) -> Result<Self> {
        let path = results_path(input);
        let file = File::create(&path)?;
        log::info!("Writing samples to {}", path.display());
        Ok(Self::new(BufWriter::new(file)))
    }
}

impl<W: Write> SampleStore<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            samples: HashSet::new(),
        }
    }

    /// Record `sample`; returns `true` if it was not seen before
    pub fn insert(&mut self, sample: String) -> Result<bool> {
        if self.samples.contains(&sample) {
            return Ok(false);
        }

        let line = format!("{}: {}\n", self.samples.len() + 1, sample);
        self.writer.write_all(line.as_bytes())?;
        self.writer.flush()?;
        self.samples.insert(sample);
        Ok(true)
    }

    pub fn contains(&self, sample: &str) -> bool {
        self.samples.contains(sample)
    }

    /// Number of unique samples, which is also the number of lines written
    pub fn unique_count(&self) -> u64 {
        self.samples.len() as u64
    }

    pub fn flush(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }

    pub fn writer(&self) -> &W {
        &self.writer
    }
}
