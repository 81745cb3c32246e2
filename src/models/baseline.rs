use burn::config::Config;
use burn::module::Module;
use burn::nn::{Embedding, EmbeddingConfig, Linear, LinearConfig};
use burn::tensor::backend::AutodiffBackend;
use burn::tensor::{backend::Backend, Int, Tensor};
use burn::train::{ClassificationOutput, TrainOutput, TrainStep, ValidStep};

use crate::data::batch::TimeSeriesBatch;
use crate::utils::shifted_cross_entropy;

/// Smallest model that consumes a [TimeSeriesBatch]: the time-averaged
/// features condition every token embedding before the vocabulary projection.
#[derive(Module, Debug)]
pub struct BaselineSummarizer<B: Backend> {
    temporal_proj: Linear<B>,
    token_embedding: Embedding<B>,
    output_proj: Linear<B>,
}

impl<B: Backend> BaselineSummarizer<B> {
    pub fn forward(
        &self,
        temporal_series: Tensor<B, 3>,  // [N, T, F]
        summary_input_ids: Tensor<B, 2, Int>, // [N, L]
    ) -> Tensor<B, 3> {
        let [_, seq_len] = summary_input_ids.dims();

        let context = self.temporal_proj.forward(temporal_series.mean_dim(1)); // [N, 1, D]
        let tokens = self.token_embedding.forward(summary_input_ids); // [N, L, D]
        let hidden = (tokens + context.repeat(1, seq_len)).tanh();

        self.output_proj.forward(hidden) // [N, L, V]
    }

    pub fn forward_classification(&self, batch: TimeSeriesBatch<B>) -> ClassificationOutput<B> {
        let logits = self.forward(batch.temporal_series, batch.summary_input_ids.clone());
        shifted_cross_entropy(logits, batch.summary_input_ids)
    }
}

impl<B: AutodiffBackend> TrainStep<TimeSeriesBatch<B>, ClassificationOutput<B>>
    for BaselineSummarizer<B>
{
    fn step(&self, batch: TimeSeriesBatch<B>) -> TrainOutput<ClassificationOutput<B>> {
        let item = self.forward_classification(batch);
        TrainOutput::new(self, item.loss.backward(), item)
    }
}

impl<B: Backend> ValidStep<TimeSeriesBatch<B>, ClassificationOutput<B>> for BaselineSummarizer<B> {
    fn step(&self, batch: TimeSeriesBatch<B>) -> ClassificationOutput<B> {
        self.forward_classification(batch)
    }
}

#[derive(Config, Debug)]
pub struct BaselineSummarizerConfig {
    n_features: usize,
    vocab_size: usize,

    #[config(default = 64)]
    d_model: usize,
}

impl BaselineSummarizerConfig {
    pub fn init<B: Backend>(&self) -> BaselineSummarizer<B> {
        BaselineSummarizer {
            temporal_proj: LinearConfig::new(self.n_features, self.d_model).init(),
            token_embedding: EmbeddingConfig::new(self.vocab_size, self.d_model).init(),
            output_proj: LinearConfig::new(self.d_model, self.vocab_size).init(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::batch::CollatedBatch;
    use crate::data::batcher::TimeSeriesCollator;
    use crate::data::dataset::TimeSeriesItem;
    use burn::backend::ndarray::NdArrayDevice;
    use burn::backend::{Autodiff, NdArray};

    fn batch<B: Backend<Device = NdArrayDevice>>() -> TimeSeriesBatch<B> {
        CollatedBatch {
            temporal_series: (0..2 * 3 * 4).map(|v| v as f32 / 10.0).collect(),
            temporal_shape: [2, 3, 4],
            summary_input_ids: vec![1, 2, 3, 9, 4, 5, 9, 9],
            attention_mask: Some(vec![1, 1, 1, 0, 1, 1, 0, 0]),
            max_length: 4,
            sector: vec!["Energy".to_string(), "Health".to_string()],
            country: vec!["Chile".to_string(), "Peru".to_string()],
            temporal_cols: (0..4).map(|i| format!("temporal_{i}")).collect(),
        }
        .into_tensors(&NdArrayDevice::Cpu)
    }

    #[test]
    fn logits_cover_every_position() {
        let model = BaselineSummarizerConfig::new(4, 10)
            .with_d_model(8)
            .init::<NdArray>();
        let batch = batch::<NdArray>();

        let logits = model.forward(batch.temporal_series, batch.summary_input_ids);
        assert_eq!(logits.dims(), [2, 4, 10]);
    }

    #[test]
    fn train_step_produces_finite_loss() {
        let model = BaselineSummarizerConfig::new(4, 10)
            .with_d_model(8)
            .init::<Autodiff<NdArray>>();

        let output = TrainStep::step(&model, batch::<Autodiff<NdArray>>());
        let loss = output.item.loss.into_data().convert::<f32>().value[0];

        assert!(loss.is_finite() && loss > 0.0);
        assert_eq!(output.item.targets.dims(), [6]);
    }

    #[test]
    fn one_token_summaries_train_after_min_length_padding() {
        let items = (0..2u32)
            .map(|i| TimeSeriesItem {
                temporal_series: vec![vec![i as f32; 4]; 3],
                sector: "Energy".to_string(),
                country: "Chile".to_string(),
                temporal_cols: (0..4).map(|c| format!("temporal_{c}")).collect(),
                summary_input_ids: vec![i + 1],
                attention_mask: Some(vec![1]),
            })
            .collect();
        let batch = TimeSeriesCollator::new(9)
            .with_min_length(2)
            .collate(items)
            .unwrap()
            .into_tensors::<Autodiff<NdArray>>(&NdArrayDevice::Cpu);
        let model = BaselineSummarizerConfig::new(4, 10)
            .with_d_model(8)
            .init::<Autodiff<NdArray>>();

        let output = TrainStep::step(&model, batch);
        let loss = output.item.loss.into_data().convert::<f32>().value[0];

        assert!(loss.is_finite());
        assert_eq!(output.item.targets.dims(), [2]);
    }
}
