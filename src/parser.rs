use crate::types::*;
use anyhow::{Context, Result};
use flate2::read::MultiGzDecoder;
use serde::de::DeserializeOwned;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// Open a file for reading, decompressing it when it starts with the gzip magic bytes.
pub fn open_maybe_gzipped<P: AsRef<Path>>(path: P) -> Result<Box<dyn BufRead>> {
    let path = path.as_ref();
    let file = File::open(path)
        .with_context(|| format!("Failed to open input file: {}", path.display()))?;

    // 16MB buffer, inputs are typically whole-exome annotations
    let mut reader = BufReader::with_capacity(16 * 1024 * 1024, file);
    let is_gzipped = reader
        .fill_buf()
        .with_context(|| format!("Failed to read input file: {}", path.display()))?
        .starts_with(&GZIP_MAGIC);

    if is_gzipped {
        log::debug!("Reading {} as gzip stream", path.display());
        Ok(Box::new(BufReader::new(MultiGzDecoder::new(reader))))
    } else {
        Ok(Box::new(reader))
    }
}

fn parse_json_array<T: DeserializeOwned, P: AsRef<Path>>(path: P, what: &str) -> Result<Vec<T>> {
    let path = path.as_ref();
    let reader = open_maybe_gzipped(path)?;
    let values: Vec<T> = serde_json::from_reader(reader)
        .with_context(|| format!("Failed to parse {} from {}", what, path.display()))?;
    log::info!("Parsed {} {} from {}", values.len(), what, path.display());
    Ok(values)
}

/// VEP-annotated variant records, a JSON array.
pub fn parse_variant_records<P: AsRef<Path>>(path: P) -> Result<Vec<VariantRecord>> {
    parse_json_array(path, "variant records")
}

/// CIViC query results, a JSON array of hits.
pub fn parse_clinical_hits<P: AsRef<Path>>(path: P) -> Result<Vec<ClinicalHit>> {
    parse_json_array(path, "CIViC hits")
}

fn read_tsv<T: DeserializeOwned, P: AsRef<Path>>(path: P, what: &str) -> Result<Vec<T>> {
    let path = path.as_ref();
    let reader = open_maybe_gzipped(path)?;

    let mut tsv = csv::ReaderBuilder::new()
        .delimiter(b'\t')
        .has_headers(true)
        .flexible(true)
        .from_reader(reader);

    let mut records = Vec::new();
    for (idx, result) in tsv.deserialize().enumerate() {
        let record: T = result.with_context(|| {
            format!("Failed to parse {} row {} in {}", what, idx + 1, path.display())
        })?;
        records.push(record);
    }

    log::info!("Parsed {} {} from {}", records.len(), what, path.display());
    Ok(records)
}

/// CGI `alterations.tsv`, with or without the `CGI-` column prefix.
pub fn read_alterations<P: AsRef<Path>>(path: P) -> Result<Vec<AlterationRecord>> {
    read_tsv(path, "CGI alterations")
}

/// CGI `biomarkers.tsv`.
pub fn read_biomarkers<P: AsRef<Path>>(path: P) -> Result<Vec<BiomarkerRecord>> {
    read_tsv(path, "CGI biomarkers")
}
