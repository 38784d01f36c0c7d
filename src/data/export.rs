//! CSV export of the processed dataset

use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::data::dataset::NormalizedDataset;
use crate::data::sources::DatasetSink;
use crate::Result;

/// Writes the merged dataset, one header line then one line per row
#[derive(Debug, Clone)]
pub struct CsvSink {
    path: PathBuf,
}

impl CsvSink {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        CsvSink {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn write_rows<W: Write>(writer: W, dataset: &NormalizedDataset) -> Result<usize> {
    let mut wtr = csv::Writer::from_writer(writer);
    wtr.write_record(NormalizedDataset::columns())?;

    let mut count = 0;
    for row in dataset.rows() {
        let record = row
            .scaled
            .iter()
            .map(|v| v.to_string())
            .chain(row.unscaled.iter().map(|v| v.to_string()));
        wtr.write_record(record)?;
        count += 1;
    }
    wtr.flush()?;
    Ok(count)
}

impl DatasetSink for CsvSink {
    fn write_dataset(&mut self, dataset: &NormalizedDataset) -> Result<usize> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let count = write_rows(File::create(&self.path)?, dataset)?;
        log::info!("Wrote {} rows to {}", count, self.path.display());
        Ok(count)
    }
}
