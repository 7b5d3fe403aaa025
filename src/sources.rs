// src/sources.rs
//
// Input side of a run: where identifiers come from and which of them get picked.

use crate::data_model::Identifier;
use crate::error::{PipelineError, Result};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use std::fs;
use std::io::Write;
use std::path::Path;
use tracing::{debug, info};

pub const DEFAULT_ID_COLUMN: &str = "acc";

/// Reads identifiers from `column` of a CSV file with a header row.
///
/// Blank cells are skipped; duplicates are kept.
pub fn load_identifiers<P: AsRef<Path>>(path: P, column: &str) -> Result<Vec<Identifier>> {
    let path = path.as_ref();
    let mut reader = csv::Reader::from_path(path)?;
    let headers = reader.headers()?.clone();
    let index = headers
        .iter()
        .position(|header| header.trim() == column)
        .ok_or_else(|| {
            PipelineError::ConfigError(format!(
                "Column '{}' not found in '{}' (available: {})",
                column,
                path.display(),
                headers.iter().collect::<Vec<_>>().join(", ")
            ))
        })?;

    let mut identifiers = Vec::new();
    for record in reader.records() {
        let record = record?;
        if let Some(value) = record.get(index).map(str::trim) {
            if !value.is_empty() {
                identifiers.push(value.to_string());
            }
        }
    }
    info!(count = identifiers.len(), file = %path.display(), "Loaded identifiers from CSV");
    Ok(identifiers)
}

/// Reads a plain list, one identifier per line; blank lines are ignored.
pub fn load_identifier_list<P: AsRef<Path>>(path: P) -> Result<Vec<Identifier>> {
    let path = path.as_ref();
    let content = fs::read_to_string(path)?;
    let identifiers: Vec<Identifier> = content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect();
    info!(count = identifiers.len(), file = %path.display(), "Loaded identifier list");
    Ok(identifiers)
}

/// Picks `sample_size` identifiers uniformly at random, without replacement.
///
/// Lists no longer than `sample_size` come back unchanged. A seed makes the
/// selection reproducible.
pub fn sample_identifiers(
    identifiers: Vec<Identifier>,
    sample_size: usize,
    seed: Option<u64>,
) -> Vec<Identifier> {
    if identifiers.len() <= sample_size {
        return identifiers;
    }
    let mut rng = match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    let sample: Vec<Identifier> = identifiers
        .choose_multiple(&mut rng, sample_size)
        .cloned()
        .collect();
    debug!(from = identifiers.len(), picked = sample.len(), "Sampled identifiers");
    sample
}

/// Writes identifiers one per line, creating parent directories as needed.
pub fn write_identifier_list<P: AsRef<Path>>(path: P, identifiers: &[Identifier]) -> Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    let mut file = fs::File::create(path)?;
    for identifier in identifiers {
        writeln!(file, "{}", identifier)?;
    }
    file.flush()?;
    Ok(())
}
