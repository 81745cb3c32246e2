use burn::tensor::{backend::Backend, Data, Int, Shape, Tensor};

/// Host side result of collating a batch: flat row-major buffers plus shapes.
#[derive(Debug, Clone, PartialEq)]
pub struct CollatedBatch {
    pub temporal_series: Vec<f32>,        // [N * T * F]
    pub temporal_shape: [usize; 3],       // [N, T, F]
    pub summary_input_ids: Vec<u32>,      // [N * L]
    pub attention_mask: Option<Vec<u32>>, // [N * L]
    pub max_length: usize,                // L
    pub sector: Vec<String>,
    pub country: Vec<String>,
    pub temporal_cols: Vec<String>,
}

impl CollatedBatch {
    pub fn batch_size(&self) -> usize {
        self.temporal_shape[0]
    }

    /// Padded token ids of one item.
    pub fn input_ids_row(&self, row: usize) -> &[u32] {
        &self.summary_input_ids[row * self.max_length..(row + 1) * self.max_length]
    }

    pub fn attention_mask_row(&self, row: usize) -> Option<&[u32]> {
        self.attention_mask
            .as_deref()
            .map(|mask| &mask[row * self.max_length..(row + 1) * self.max_length])
    }

    pub fn into_tensors<B: Backend>(self, device: &B::Device) -> TimeSeriesBatch<B> {
        let [n, t, f] = self.temporal_shape;

        let data = Data::new(self.temporal_series, Shape::new([n, t, f]));
        let temporal_series: Tensor<B, 3> = Tensor::from_data(data.convert()).to_device(device);

        let summary_input_ids = int_tensor(self.summary_input_ids, n, self.max_length, device);
        let attention_mask = self
            .attention_mask
            .map(|mask| int_tensor(mask, n, self.max_length, device));

        TimeSeriesBatch {
            temporal_series,
            summary_input_ids,
            attention_mask,
            sector: self.sector,
            country: self.country,
            temporal_cols: self.temporal_cols,
        }
    }
}

fn int_tensor<B: Backend>(
    values: Vec<u32>,
    rows: usize,
    cols: usize,
    device: &B::Device,
) -> Tensor<B, 2, Int> {
    let values: Vec<i64> = values.into_iter().map(i64::from).collect();
    let data = Data::new(values, Shape::new([rows, cols]));
    let tensor: Tensor<B, 2, Int> = Tensor::from_data(data.convert());
    tensor.to_device(device)
}

#[derive(Clone, Debug)]
pub struct TimeSeriesBatch<B: Backend> {
    pub temporal_series: Tensor<B, 3>,                // [N, T, F]
    pub summary_input_ids: Tensor<B, 2, Int>,         // [N, L]
    pub attention_mask: Option<Tensor<B, 2, Int>>,    // [N, L]
    pub sector: Vec<String>,                          // [N]
    pub country: Vec<String>,                         // [N]
    pub temporal_cols: Vec<String>,                   // [F]
}
