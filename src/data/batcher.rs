use burn::data::dataloader::batcher::Batcher;
use burn::tensor::backend::Backend;

use crate::data::batch::{CollatedBatch, TimeSeriesBatch};
use crate::data::dataset::TimeSeriesItem;
use crate::data::tokenizer::SummaryTokenizer;
use crate::error::DataError;

/// Pads tokenized summaries to the longest one in the batch and stacks the
/// temporal matrices.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TimeSeriesCollator {
    pad_token_id: u32,
    min_length: usize,
}

impl TimeSeriesCollator {
    pub fn new(pad_token_id: u32) -> Self {
        Self {
            pad_token_id,
            min_length: 0,
        }
    }

    /// Pads every batch to at least `min_length` tokens, even when all of its
    /// summaries are shorter.
    pub fn with_min_length(mut self, min_length: usize) -> Self {
        self.min_length = min_length;
        self
    }

    pub fn from_tokenizer(tokenizer: &dyn SummaryTokenizer) -> Self {
        Self::new(tokenizer.pad_token_id())
    }

    pub fn pad_token_id(&self) -> u32 {
        self.pad_token_id
    }

    pub fn min_length(&self) -> usize {
        self.min_length
    }

    /// The column list of the first item is used for the whole batch; callers
    /// must not mix column layouts.
    pub fn collate(&self, items: Vec<TimeSeriesItem>) -> Result<CollatedBatch, DataError> {
        let first = items.first().ok_or(DataError::EmptyBatch)?;
        let expected = first.temporal_shape();
        let batch_size = items.len();

        if let Some((index, found)) = items
            .iter()
            .map(TimeSeriesItem::temporal_shape)
            .enumerate()
            .find(|(_, shape)| *shape != expected)
        {
            return Err(DataError::ShapeMismatch {
                index,
                expected,
                found,
            });
        }

        for (index, item) in items.iter().enumerate() {
            if let Some((row, width)) = item.ragged_row() {
                return Err(DataError::RaggedSeries {
                    index,
                    row,
                    width,
                    expected: expected[1],
                });
            }
            let ids = item.summary_input_ids.len();
            match &item.attention_mask {
                Some(mask) if mask.len() != ids => {
                    return Err(DataError::MaskLength {
                        index,
                        ids,
                        mask: mask.len(),
                    });
                }
                _ => {}
            }
        }

        let max_length = items
            .iter()
            .map(|item| item.summary_input_ids.len())
            .max()
            .unwrap_or(0)
            .max(self.min_length);
        let with_mask = items.iter().all(|item| item.attention_mask.is_some());

        let [steps, features] = expected;
        let temporal_cols = first.temporal_cols.clone();

        let mut temporal_series = Vec::with_capacity(batch_size * steps * features);
        let mut summary_input_ids = Vec::with_capacity(batch_size * max_length);
        let mut attention_mask = with_mask.then(|| Vec::with_capacity(batch_size * max_length));
        let mut sector = Vec::with_capacity(batch_size);
        let mut country = Vec::with_capacity(batch_size);

        for item in items {
            temporal_series.extend(item.temporal_series.into_iter().flatten());

            let len = item.summary_input_ids.len();
            summary_input_ids.extend(item.summary_input_ids);
            summary_input_ids.resize(summary_input_ids.len() + max_length - len, self.pad_token_id);

            if let (Some(out), Some(mask)) = (attention_mask.as_mut(), item.attention_mask) {
                let len = mask.len();
                out.extend(mask);
                out.resize(out.len() + max_length - len, 0);
            }

            sector.push(item.sector);
            country.push(item.country);
        }

        Ok(CollatedBatch {
            temporal_series,
            temporal_shape: [batch_size, steps, features],
            summary_input_ids,
            attention_mask,
            max_length,
            sector,
            country,
            temporal_cols,
        })
    }
}

#[derive(Clone, Debug)]
pub struct TimeSeriesBatcher<B: Backend> {
    device: B::Device,
    collator: TimeSeriesCollator,
}

impl<B: Backend> TimeSeriesBatcher<B> {
    pub fn new(device: B::Device, collator: TimeSeriesCollator) -> Self {
        Self { device, collator }
    }

    pub fn collator(&self) -> &TimeSeriesCollator {
        &self.collator
    }

    pub fn try_batch(&self, items: Vec<TimeSeriesItem>) -> Result<TimeSeriesBatch<B>, DataError> {
        let collated = self.collator.collate(items)?;
        tracing::debug!(
            "collated batch of {} items, summary length {}",
            collated.batch_size(),
            collated.max_length
        );
        Ok(collated.into_tensors(&self.device))
    }
}

impl<B: Backend> Batcher<TimeSeriesItem, TimeSeriesBatch<B>> for TimeSeriesBatcher<B> {
    /// # Panics
    ///
    /// When the items cannot be collated, see [TimeSeriesBatcher::try_batch].
    fn batch(&self, items: Vec<TimeSeriesItem>) -> TimeSeriesBatch<B> {
        match self.try_batch(items) {
            Ok(batch) => batch,
            Err(err) => panic!("cannot assemble batch: {err}"),
        }
    }
}
