use burn::config::Config;
use burn::data::dataloader::DataLoader;
use burn::module::AutodiffModule;
use burn::optim::AdamConfig;
use burn::record::CompactRecorder;
use burn::tensor::backend::AutodiffBackend;
use burn::train::metric::store::{Aggregate, Direction, Split};
use burn::train::metric::LossMetric;
use burn::train::renderer::{MetricState, MetricsRenderer, TrainingProgress};
use burn::train::{
    ClassificationOutput, LearnerBuilder, MetricEarlyStoppingStrategy, StoppingCondition,
    TrainStep, ValidStep,
};
use std::fmt::Display;
use std::path::PathBuf;
use std::sync::Arc;

use crate::data::batch::TimeSeriesBatch;
use crate::data::loader::TimeSeriesDataModule;
use crate::error::TrainingError;

#[derive(Config)]
pub struct TrainingConfig {
    pub optimizer: AdamConfig,

    #[config(default = 1e-3)]
    pub learning_rate: f64,

    #[config(default = 10)]
    pub num_epochs: usize,

    /// Epochs without validation loss improvement before stopping; 0 disables.
    #[config(default = 3)]
    pub early_stop_patience: usize,
}

/// Reports learner progress through `tracing` instead of the terminal dashboard.
#[derive(Debug, Default)]
pub struct TracingRenderer;

impl TracingRenderer {
    fn log_progress(split: &str, item: &TrainingProgress) {
        let progress = &item.progress;
        if progress.items_processed >= progress.items_total {
            tracing::info!(
                "{split} epoch {}/{} done, {} items",
                item.epoch,
                item.epoch_total,
                progress.items_total
            );
        } else {
            tracing::trace!(
                "{split} epoch {}/{}: {}/{} items",
                item.epoch,
                item.epoch_total,
                progress.items_processed,
                progress.items_total
            );
        }
    }
}

impl MetricsRenderer for TracingRenderer {
    fn update_train(&mut self, state: MetricState) {
        if let MetricState::Numeric(entry, value) = state {
            tracing::debug!("train {} = {value}", entry.name);
        }
    }

    fn update_valid(&mut self, state: MetricState) {
        if let MetricState::Numeric(entry, value) = state {
            tracing::debug!("valid {} = {value}", entry.name);
        }
    }

    fn render_train(&mut self, item: TrainingProgress) {
        Self::log_progress("train", &item);
    }

    fn render_valid(&mut self, item: TrainingProgress) {
        Self::log_progress("valid", &item);
    }
}

/// Fits `model` on the data module's train/validation loaders and returns the
/// trained model. Config, checkpoints and the final weights land in `artifact_dir`.
pub fn train<B, M>(
    artifact_dir: &str,
    config: &TrainingConfig,
    model: M,
    data: &TimeSeriesDataModule,
    device: B::Device,
) -> Result<M, TrainingError>
where
    B: AutodiffBackend,
    M: AutodiffModule<B> + TrainStep<TimeSeriesBatch<B>, ClassificationOutput<B>> + Display + 'static,
    M::InnerModule: ValidStep<
        TimeSeriesBatch<B::InnerBackend>,
        ClassificationOutput<B::InnerBackend>,
    >,
{
    std::fs::create_dir_all(artifact_dir).map_err(|source| TrainingError::ArtifactDir {
        path: PathBuf::from(artifact_dir),
        source,
    })?;
    config
        .save(format!("{artifact_dir}/config.json"))
        .map_err(TrainingError::Config)?;

    let train_loader = data.train_loader::<B>(&device);
    let valid_loader = data.valid_loader::<B::InnerBackend>(&device);

    tracing::info!(
        "training for {} epochs, {} train / {} valid items",
        config.num_epochs,
        train_loader.num_items(),
        valid_loader.num_items()
    );

    let dataloader_train: Arc<dyn DataLoader<TimeSeriesBatch<B>>> = Arc::new(train_loader);
    let dataloader_valid: Arc<dyn DataLoader<TimeSeriesBatch<B::InnerBackend>>> =
        Arc::new(valid_loader);

    let builder = LearnerBuilder::new(artifact_dir)
        .metric_train_numeric(LossMetric::new())
        .metric_valid_numeric(LossMetric::new())
        .with_file_checkpointer(CompactRecorder::new())
        .renderer(TracingRenderer)
        .devices(vec![device])
        .num_epochs(config.num_epochs);

    let builder = if config.early_stop_patience > 0 {
        builder.early_stopping(MetricEarlyStoppingStrategy::new::<LossMetric<B>>(
            Aggregate::Mean,
            Direction::Lowest,
            Split::Valid,
            StoppingCondition::NoImprovementSince {
                n_epochs: config.early_stop_patience,
            },
        ))
    } else {
        builder
    };

    let learner = builder.build(model, config.optimizer.init(), config.learning_rate);
    let trained = learner.fit(dataloader_train, dataloader_valid);

    trained
        .clone()
        .save_file(format!("{artifact_dir}/model"), &CompactRecorder::new())
        .map_err(|e| TrainingError::Record(e.to_string()))?;
    tracing::info!("saved trained model to {artifact_dir}/model");

    Ok(trained)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::dataset::{DatasetConfig, TimeSeriesDataset};
    use crate::data::loader::LoaderConfig;
    use crate::data::store::RecordStore;
    use crate::data::synthetic::{generate_fake_data, SyntheticConfig};
    use crate::data::tokenizer::testing::WordLengthTokenizer;
    use crate::models::baseline::BaselineSummarizerConfig;
    use burn::backend::ndarray::NdArrayDevice;
    use burn::backend::{Autodiff, NdArray};

    type B = Autodiff<NdArray>;

    // Word ids stay below 22 for the synthetic vocabulary, so 30 is free for eos.
    const EOS: u32 = 30;

    fn dataset(n_series: usize, seed: u64) -> TimeSeriesDataset {
        let config = SyntheticConfig::new(n_series)
            .with_min_length(4)
            .with_n_temporal_features(3);
        TimeSeriesDataset::new(
            RecordStore::from_records(generate_fake_data(&config, seed)).unwrap(),
            Arc::new(WordLengthTokenizer { eos: EOS }),
            DatasetConfig::new().with_max_length(6),
        )
    }

    #[test]
    fn one_epoch_saves_config_and_model() {
        let dir = tempfile::tempdir().unwrap();
        let artifact_dir = dir.path().to_str().unwrap();

        let data = TimeSeriesDataModule::new(
            dataset(6, 1),
            dataset(4, 2),
            LoaderConfig::new().with_batch_size(3).with_valid_batch_size(2),
        );
        let config = TrainingConfig::new(AdamConfig::new())
            .with_num_epochs(1)
            .with_early_stop_patience(1);
        let model = BaselineSummarizerConfig::new(3, EOS as usize + 1)
            .with_d_model(8)
            .init::<B>();

        train::<B, _>(artifact_dir, &config, model, &data, NdArrayDevice::Cpu).unwrap();

        let saved = TrainingConfig::load(dir.path().join("config.json")).unwrap();
        assert_eq!(saved.num_epochs, 1);
        assert_eq!(saved.early_stop_patience, 1);

        let model_files = std::fs::read_dir(dir.path())
            .unwrap()
            .filter_map(Result::ok)
            .filter(|entry| entry.file_name().to_string_lossy().starts_with("model."))
            .count();
        assert_eq!(model_files, 1);
    }

    #[test]
    fn unusable_artifact_dir_is_reported() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let artifact_dir = file.path().join("nested");
        let data = TimeSeriesDataModule::new(dataset(2, 1), dataset(2, 2), LoaderConfig::new());
        let model = BaselineSummarizerConfig::new(3, EOS as usize + 1)
            .with_d_model(8)
            .init::<B>();

        let result = train::<B, _>(
            artifact_dir.to_str().unwrap(),
            &TrainingConfig::new(AdamConfig::new()),
            model,
            &data,
            NdArrayDevice::Cpu,
        );

        assert!(matches!(result, Err(TrainingError::ArtifactDir { .. })));
    }
}
