use burn::config::Config;
use burn::data::dataloader::{DataLoader, DataLoaderIterator, Progress};
use burn::tensor::backend::Backend;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::data::batch::TimeSeriesBatch;
use crate::data::batcher::{TimeSeriesBatcher, TimeSeriesCollator};
use crate::data::dataset::TimeSeriesDataset;
use crate::error::DataError;

#[derive(Config, Debug, PartialEq)]
pub struct LoaderConfig {
    #[config(default = 32)]
    pub batch_size: usize,

    /// Used for both validation and test loaders.
    #[config(default = 8)]
    pub valid_batch_size: usize,

    #[config(default = false)]
    pub drop_last: bool,

    #[config(default = true)]
    pub shuffle_train: bool,

    #[config(default = 42)]
    pub seed: u64,

    /// Shortest padded summary a batch may have. Next-token loss needs two
    /// positions.
    #[config(default = 2)]
    pub min_summary_length: usize,
}

/// Splits `0..len` into chunks of `batch_size` indices. With a seed the order
/// is shuffled, reseeded from `seed + pass` so every pass differs but stays
/// reproducible.
pub fn index_batches(
    len: usize,
    batch_size: usize,
    shuffle: Option<u64>,
    pass: u64,
    drop_last: bool,
) -> Vec<Vec<usize>> {
    if batch_size == 0 {
        return Vec::new();
    }

    let mut indices: Vec<usize> = (0..len).collect();
    if let Some(seed) = shuffle {
        let mut rng = StdRng::seed_from_u64(seed.wrapping_add(pass));
        indices.shuffle(&mut rng);
    }

    indices
        .chunks(batch_size)
        .filter(|chunk| !drop_last || chunk.len() == batch_size)
        .map(<[usize]>::to_vec)
        .collect()
}

/// Draws index batches from a dataset and hands the transformed items to the
/// batcher. Each call to `iter`/`try_iter` is one pass over the data.
pub struct TimeSeriesLoader<B: Backend> {
    dataset: Arc<TimeSeriesDataset>,
    batcher: TimeSeriesBatcher<B>,
    batch_size: usize,
    shuffle: Option<u64>,
    drop_last: bool,
    pass: AtomicU64,
}

impl<B: Backend> TimeSeriesLoader<B> {
    pub fn num_items(&self) -> usize {
        self.dataset.len()
    }

    pub fn new(
        dataset: Arc<TimeSeriesDataset>,
        batcher: TimeSeriesBatcher<B>,
        batch_size: usize,
    ) -> Self {
        Self {
            dataset,
            batcher,
            batch_size,
            shuffle: None,
            drop_last: false,
            pass: AtomicU64::new(0),
        }
    }

    pub fn with_shuffle(mut self, seed: u64) -> Self {
        self.shuffle = Some(seed);
        self
    }

    pub fn with_drop_last(mut self, drop_last: bool) -> Self {
        self.drop_last = drop_last;
        self
    }

    pub fn dataset(&self) -> &TimeSeriesDataset {
        &self.dataset
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    pub fn num_batches(&self) -> usize {
        let len = self.dataset.len();
        match (self.batch_size, self.drop_last) {
            (0, _) => 0,
            (size, true) => len / size,
            (size, false) => len.div_ceil(size),
        }
    }

    /// Starts a pass, failing up front when no batch can be drawn.
    pub fn try_iter(&self) -> Result<BatchIter<'_, B>, DataError> {
        if self.batch_size == 0 {
            return Err(DataError::InvalidBatchSize);
        }
        if self.dataset.is_empty() {
            return Err(DataError::EmptyDataset);
        }
        Ok(self.start_pass())
    }

    fn start_pass(&self) -> BatchIter<'_, B> {
        let pass = self.pass.fetch_add(1, Ordering::Relaxed);
        let batches = index_batches(
            self.dataset.len(),
            self.batch_size,
            self.shuffle,
            pass,
            self.drop_last,
        );
        let total = batches.iter().map(Vec::len).sum();

        BatchIter {
            loader: self,
            batches: batches.into_iter(),
            processed: 0,
            total,
        }
    }

    pub fn load_batch(&self, indices: &[usize]) -> Result<TimeSeriesBatch<B>, DataError> {
        let items = indices
            .iter()
            .map(|&index| self.dataset.item(index))
            .collect::<Result<Vec<_>, _>>()?;
        self.batcher.try_batch(items)
    }
}

pub struct BatchIter<'a, B: Backend> {
    loader: &'a TimeSeriesLoader<B>,
    batches: std::vec::IntoIter<Vec<usize>>,
    processed: usize,
    total: usize,
}

impl<'a, B: Backend> Iterator for BatchIter<'a, B> {
    type Item = Result<TimeSeriesBatch<B>, DataError>;

    fn next(&mut self) -> Option<Self::Item> {
        let indices = self.batches.next()?;
        self.processed += indices.len();
        Some(self.loader.load_batch(&indices))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.batches.size_hint()
    }
}

struct LearnerIter<'a, B: Backend> {
    inner: BatchIter<'a, B>,
}

impl<'a, B: Backend> Iterator for LearnerIter<'a, B> {
    type Item = TimeSeriesBatch<B>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.inner.next()? {
            Ok(batch) => Some(batch),
            Err(err) => panic!("cannot load batch: {err}"),
        }
    }
}

impl<'a, B: Backend> DataLoaderIterator<TimeSeriesBatch<B>> for LearnerIter<'a, B> {
    fn progress(&self) -> Progress {
        Progress {
            items_processed: self.inner.processed,
            items_total: self.inner.total,
        }
    }
}

impl<B: Backend> DataLoader<TimeSeriesBatch<B>> for TimeSeriesLoader<B> {
    /// # Panics
    ///
    /// While iterating, if an item cannot be tokenized or collated.
    fn iter<'a>(&'a self) -> Box<dyn DataLoaderIterator<TimeSeriesBatch<B>> + 'a> {
        Box::new(LearnerIter {
            inner: self.start_pass(),
        })
    }
}

/// Train, validation and optional test datasets sharing one loader configuration.
pub struct TimeSeriesDataModule {
    train: Arc<TimeSeriesDataset>,
    valid: Arc<TimeSeriesDataset>,
    test: Option<Arc<TimeSeriesDataset>>,
    config: LoaderConfig,
}

impl TimeSeriesDataModule {
    pub fn new(train: TimeSeriesDataset, valid: TimeSeriesDataset, config: LoaderConfig) -> Self {
        Self {
            train: Arc::new(train),
            valid: Arc::new(valid),
            test: None,
            config,
        }
    }

    pub fn with_test(mut self, test: TimeSeriesDataset) -> Self {
        self.test = Some(Arc::new(test));
        self
    }

    pub fn config(&self) -> &LoaderConfig {
        &self.config
    }

    fn batcher<B: Backend>(&self, dataset: &TimeSeriesDataset, device: &B::Device) -> TimeSeriesBatcher<B> {
        let collator = TimeSeriesCollator::from_tokenizer(dataset.tokenizer().as_ref())
            .with_min_length(self.config.min_summary_length);
        TimeSeriesBatcher::new(device.clone(), collator)
    }

    pub fn train_loader<B: Backend>(&self, device: &B::Device) -> TimeSeriesLoader<B> {
        let loader = TimeSeriesLoader::new(
            self.train.clone(),
            self.batcher(&self.train, device),
            self.config.batch_size,
        )
        .with_drop_last(self.config.drop_last);

        if self.config.shuffle_train {
            loader.with_shuffle(self.config.seed)
        } else {
            loader
        }
    }

    pub fn valid_loader<B: Backend>(&self, device: &B::Device) -> TimeSeriesLoader<B> {
        TimeSeriesLoader::new(
            self.valid.clone(),
            self.batcher(&self.valid, device),
            self.config.valid_batch_size,
        )
        .with_drop_last(self.config.drop_last)
    }

    pub fn test_loader<B: Backend>(&self, device: &B::Device) -> Option<TimeSeriesLoader<B>> {
        self.test.as_ref().map(|test| {
            TimeSeriesLoader::new(
                test.clone(),
                self.batcher(test, device),
                self.config.valid_batch_size,
            )
        })
    }
}
