use burn::config::Config;
use burn::data::dataset::Dataset;
use std::fmt;
use std::path::Path;
use std::sync::Arc;

use crate::data::record::TimeSeriesRecord;
use crate::data::store::RecordStore;
use crate::data::tokenizer::SummaryTokenizer;
use crate::error::DataError;

#[derive(Config, Debug, PartialEq)]
pub struct DatasetConfig {
    #[config(default = 512)]
    pub max_length: usize,

    /// Marks the records as already ordered; carried along, never acted on.
    #[config(default = false)]
    pub sorted: bool,

    #[config(default = true)]
    pub add_attention_mask: bool,
}

/// One record after the per-item transform: summary tokenized and unpadded.
#[derive(Debug, Clone, PartialEq)]
pub struct TimeSeriesItem {
    pub temporal_series: Vec<Vec<f32>>, // [T, F]
    pub sector: String,
    pub country: String,
    pub temporal_cols: Vec<String>,
    pub summary_input_ids: Vec<u32>,
    pub attention_mask: Option<Vec<u32>>,
}

impl TimeSeriesItem {
    pub fn temporal_shape(&self) -> [usize; 2] {
        let features = self
            .temporal_series
            .first()
            .map_or(self.temporal_cols.len(), Vec::len);
        [self.temporal_series.len(), features]
    }

    /// First row whose width differs from row 0, as `(row, width)`.
    pub fn ragged_row(&self) -> Option<(usize, usize)> {
        let [_, features] = self.temporal_shape();
        self.temporal_series
            .iter()
            .map(Vec::len)
            .enumerate()
            .find(|&(_, width)| width != features)
    }
}

/// Collapses whitespace runs, newlines included, to one space and trims the ends.
pub fn normalize_text(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Records plus the tokenizer that turns each one into a [TimeSeriesItem] on access.
#[derive(Clone)]
pub struct TimeSeriesDataset {
    store: Arc<RecordStore>,
    tokenizer: Arc<dyn SummaryTokenizer>,
    config: DatasetConfig,
}

impl TimeSeriesDataset {
    pub fn new(
        store: impl Into<Arc<RecordStore>>,
        tokenizer: Arc<dyn SummaryTokenizer>,
        config: DatasetConfig,
    ) -> Self {
        Self {
            store: store.into(),
            tokenizer,
            config,
        }
    }

    pub fn from_jsonl<P: AsRef<Path>>(
        path: P,
        tokenizer: Arc<dyn SummaryTokenizer>,
        config: DatasetConfig,
    ) -> Result<Self, DataError> {
        Ok(Self::new(RecordStore::load(path)?, tokenizer, config))
    }

    pub fn store(&self) -> &RecordStore {
        &self.store
    }

    pub fn tokenizer(&self) -> &Arc<dyn SummaryTokenizer> {
        &self.tokenizer
    }

    pub fn config(&self) -> &DatasetConfig {
        &self.config
    }

    pub fn len(&self) -> usize {
        self.store.len()
    }

    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }

    pub fn item(&self, index: usize) -> Result<TimeSeriesItem, DataError> {
        let record = self.store.record(index)?;
        self.transform(record)
    }

    pub fn transform(&self, record: &TimeSeriesRecord) -> Result<TimeSeriesItem, DataError> {
        let summary = normalize_text(&record.summary);
        let encoded = self.tokenizer.encode(&summary, self.config.max_length)?;

        let attention_mask = if self.config.add_attention_mask {
            Some(encoded.attention_mask)
        } else {
            None
        };

        Ok(TimeSeriesItem {
            temporal_series: record.temporal_series.clone(),
            sector: record.sector.clone(),
            country: record.country.clone(),
            temporal_cols: record.columns.clone(),
            summary_input_ids: encoded.ids,
            attention_mask,
        })
    }
}

impl Dataset<TimeSeriesItem> for TimeSeriesDataset {
    fn get(&self, index: usize) -> Option<TimeSeriesItem> {
        match self.item(index) {
            Ok(item) => Some(item),
            Err(DataError::IndexOutOfRange { .. }) => None,
            Err(err) => {
                tracing::warn!("skipping item {index}: {err}");
                None
            }
        }
    }

    fn len(&self) -> usize {
        self.store.len()
    }
}

impl PartialEq for TimeSeriesDataset {
    fn eq(&self, other: &Self) -> bool {
        self.store.records() == other.store.records()
            && self.config.max_length == other.config.max_length
            && self.config.sorted == other.config.sorted
    }
}

impl fmt::Debug for TimeSeriesDataset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TimeSeriesDataset")
            .field("records", &self.store.len())
            .field("config", &self.config)
            .finish()
    }
}

impl fmt::Display for TimeSeriesDataset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let n = group_thousands(self.store.len());
        write!(f, "TimeSeriesDataset(n_data={n}, n_groups={n})")
    }
}

fn group_thousands(n: usize) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}
