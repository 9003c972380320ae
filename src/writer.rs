use crate::converter::ranked_to_record;
use crate::types::{RankedRecord, RankedVariant};
use anyhow::{Context, Result};
use csv::Writer;
use std::fs::File;
use std::path::Path;

pub struct RankingWriter {
    writer: Writer<File>,
    records_written: usize,
}

impl RankingWriter {
    pub fn new<P: AsRef<Path>>(output_path: P) -> Result<Self> {
        let output_path = output_path.as_ref();
        let file = File::create(output_path)
            .with_context(|| format!("Failed to create output file: {}", output_path.display()))?;

        // Header row comes from the serde field names on the first serialize()
        let writer = csv::WriterBuilder::new()
            .delimiter(b'\t')
            .has_headers(true)
            .from_writer(file);

        Ok(Self {
            writer,
            records_written: 0,
        })
    }

    pub fn write_record(&mut self, record: &RankedRecord) -> Result<()> {
        self.writer
            .serialize(record)
            .context("Failed to write ranked variant")?;
        self.records_written += 1;
        Ok(())
    }

    pub fn flush(&mut self) -> Result<()> {
        self.writer.flush().context("Failed to flush writer")?;
        Ok(())
    }

    pub fn records_written(&self) -> usize {
        self.records_written
    }
}

/// Write the ranked table in the given order.
pub fn write_ranked_table<P: AsRef<Path>>(output_path: P, ranked: &[RankedVariant]) -> Result<usize> {
    let mut writer = RankingWriter::new(output_path)?;
    for variant in ranked {
        writer.write_record(&ranked_to_record(variant))?;
    }
    writer.flush()?;
    Ok(writer.records_written())
}
