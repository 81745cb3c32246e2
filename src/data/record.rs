use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::error::DataError;

/// One time series entity as stored in a JSON-lines file.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct TimeSeriesRecord {
    #[serde(rename = "positive_time_series")]
    pub temporal_series: Vec<Vec<f32>>, // [T, F]
    #[serde(rename = "anchor_summary")]
    pub summary: String,
    pub sector: String, // ';' joined when multi-valued
    pub country: String,
    pub columns: Vec<String>, // [F]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub positive_sector: Option<Vec<i32>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub doc_id: Option<String>,
}

impl TimeSeriesRecord {
    /// `[time steps, features]`, with the feature count taken from the column names.
    pub fn temporal_shape(&self) -> [usize; 2] {
        [self.temporal_series.len(), self.columns.len()]
    }

    pub fn sectors(&self) -> impl Iterator<Item = &str> {
        self.sector.split(';').filter(|s| !s.is_empty())
    }

    /// Checks that every row is as wide as the column list. `record` is only
    /// used to label the error.
    pub fn validate(&self, record: usize) -> Result<(), DataError> {
        let columns = self.columns.len();
        match self
            .temporal_series
            .iter()
            .position(|row| row.len() != columns)
        {
            Some(row) => Err(DataError::ColumnWidth {
                record,
                row,
                width: self.temporal_series[row].len(),
                columns,
            }),
            None => Ok(()),
        }
    }

    pub fn to_json_line(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn from_json_line(line: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(line)
    }
}

/// Writes records one JSON object per line.
pub fn write_jsonl<P: AsRef<Path>>(path: P, records: &[TimeSeriesRecord]) -> Result<(), DataError> {
    let path = path.as_ref();
    let io_err = |source| DataError::Io {
        path: path.to_path_buf(),
        source,
    };

    let mut writer = BufWriter::new(File::create(path).map_err(io_err)?);
    for (line, record) in records.iter().enumerate() {
        let json = record.to_json_line().map_err(|source| DataError::Parse {
            path: path.to_path_buf(),
            line: line + 1,
            source,
        })?;
        writeln!(writer, "{json}").map_err(io_err)?;
    }
    writer.flush().map_err(io_err)?;

    tracing::info!("wrote {} records to {}", records.len(), path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record() -> TimeSeriesRecord {
        TimeSeriesRecord {
            temporal_series: vec![vec![1.5, 2.0], vec![3.25, 4.0]],
            summary: "Grid  upgrade\nplan".to_string(),
            sector: "Energy;Transport".to_string(),
            country: "Chile".to_string(),
            columns: vec!["temporal_0".to_string(), "temporal_1".to_string()],
            positive_sector: Some(vec![0, 1, 1]),
            doc_id: None,
        }
    }

    #[test]
    fn json_line_round_trip() {
        let original = record();
        let line = original.to_json_line().unwrap();

        assert!(!line.contains('\n'));
        assert!(!line.contains("doc_id"));
        assert!(line.contains("positive_time_series"));
        assert_eq!(TimeSeriesRecord::from_json_line(&line).unwrap(), original);
    }

    #[test]
    fn optional_fields_default_to_none() {
        let line = r#"{"positive_time_series":[[1.0]],"anchor_summary":"s","sector":"Health","country":"Peru","columns":["a"]}"#;
        let record = TimeSeriesRecord::from_json_line(line).unwrap();

        assert_eq!(record.positive_sector, None);
        assert_eq!(record.doc_id, None);
        assert_eq!(record.temporal_shape(), [1, 1]);
    }

    #[test]
    fn sectors_split_on_semicolon() {
        let record = record();
        let sectors: Vec<&str> = record.sectors().collect();
        assert_eq!(sectors, vec!["Energy", "Transport"]);
    }

    #[test]
    fn validate_reports_ragged_row() {
        let mut ragged = record();
        ragged.temporal_series[1].push(9.0);

        match ragged.validate(4) {
            Err(DataError::ColumnWidth {
                record,
                row,
                width,
                columns,
            }) => {
                assert_eq!((record, row, width, columns), (4, 1, 3, 2));
            }
            other => panic!("unexpected result: {other:?}"),
        }
        assert!(record().validate(0).is_ok());
    }
}
