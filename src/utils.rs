use burn::nn::loss::CrossEntropyLoss;
use burn::tensor::{backend::Backend, Int, Tensor};
use burn::train::ClassificationOutput;

/// Next-token loss for teacher forced summaries.
///
/// `logits` is `[N, L, V]` and scores the token after each position, `targets`
/// is the padded summary `[N, L]`. The first target and the last prediction
/// have no partner and are dropped.
///
/// # Panics
///
/// When `L < 2`. Batches from [TimeSeriesDataModule](crate::data::loader::TimeSeriesDataModule)
/// loaders are padded to `LoaderConfig::min_summary_length`, 2 by default.
pub fn shifted_cross_entropy<B: Backend>(
    logits: Tensor<B, 3>,
    targets: Tensor<B, 2, Int>,
) -> ClassificationOutput<B> {
    let [batch_size, seq_len, vocab_size] = logits.dims();
    assert!(
        seq_len >= 2,
        "next-token loss needs summaries of at least 2 tokens, got {seq_len}"
    );
    let steps = seq_len - 1;

    let output = logits
        .slice([0..batch_size, 0..steps, 0..vocab_size])
        .reshape([batch_size * steps, vocab_size]);
    let targets = targets
        .slice([0..batch_size, 1..seq_len])
        .reshape([batch_size * steps]);

    let loss = CrossEntropyLoss::new(None).forward(output.clone(), targets.clone());

    ClassificationOutput::new(loss, output, targets)
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;
    use burn::tensor::{Data, Shape};

    type B = NdArray;

    #[test]
    fn drops_first_target_and_last_prediction() {
        let logits: Tensor<B, 3> = Tensor::zeros([2, 4, 6]);
        let targets: Tensor<B, 2, Int> =
            Tensor::from_data(Data::new(vec![1i64, 2, 3, 4, 5, 4, 3, 2], Shape::new([2, 4])).convert());

        let output = shifted_cross_entropy(logits, targets);

        assert_eq!(output.output.dims(), [6, 6]);
        let targets = output.targets.into_data().convert::<i64>().value;
        assert_eq!(targets, vec![2, 3, 4, 4, 3, 2]);
    }

    #[test]
    fn uniform_logits_give_log_vocab_loss() {
        let logits: Tensor<B, 3> = Tensor::zeros([1, 3, 8]);
        let targets: Tensor<B, 2, Int> =
            Tensor::from_data(Data::new(vec![0i64, 1, 2], Shape::new([1, 3])).convert());

        let loss = shifted_cross_entropy(logits, targets)
            .loss
            .into_data()
            .convert::<f32>()
            .value[0];

        assert!((loss - 8f32.ln()).abs() < 1e-4);
    }

    #[test]
    #[should_panic(expected = "at least 2 tokens")]
    fn single_token_summaries_are_refused() {
        let logits: Tensor<B, 3> = Tensor::zeros([2, 1, 6]);
        let targets: Tensor<B, 2, Int> =
            Tensor::from_data(Data::new(vec![1i64, 2], Shape::new([2, 1])).convert());

        shifted_cross_entropy(logits, targets);
    }
}
