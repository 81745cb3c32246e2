use burn::data::dataset::Dataset;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use crate::data::record::TimeSeriesRecord;
use crate::error::DataError;

/// Immutable, in-memory list of records loaded from a JSON-lines file.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecordStore {
    records: Vec<TimeSeriesRecord>,
}

impl RecordStore {
    pub fn from_records(records: Vec<TimeSeriesRecord>) -> Result<Self, DataError> {
        for (index, record) in records.iter().enumerate() {
            record.validate(index)?;
        }
        Ok(Self { records })
    }

    /// Parses one record per line. Any malformed line fails the whole load.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, DataError> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|source| DataError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        let mut records = Vec::new();
        for (index, line) in BufReader::new(file).lines().enumerate() {
            let line = line.map_err(|source| DataError::Io {
                path: path.to_path_buf(),
                source,
            })?;
            if line.trim().is_empty() {
                continue;
            }

            let record =
                TimeSeriesRecord::from_json_line(&line).map_err(|source| DataError::Parse {
                    path: path.to_path_buf(),
                    line: index + 1,
                    source,
                })?;
            record.validate(records.len())?;
            records.push(record);
        }

        tracing::info!("loaded {} records from {}", records.len(), path.display());
        Ok(Self { records })
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> &[TimeSeriesRecord] {
        &self.records
    }

    pub fn record(&self, index: usize) -> Result<&TimeSeriesRecord, DataError> {
        self.records.get(index).ok_or(DataError::IndexOutOfRange {
            index,
            len: self.records.len(),
        })
    }
}

impl Dataset<TimeSeriesRecord> for RecordStore {
    fn get(&self, index: usize) -> Option<TimeSeriesRecord> {
        self.records.get(index).cloned()
    }

    fn len(&self) -> usize {
        self.records.len()
    }
}
