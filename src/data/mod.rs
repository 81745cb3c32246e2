pub mod batch;
pub mod batcher;
pub mod dataset;
pub mod loader;
pub mod record;
pub mod store;
pub mod synthetic;
pub mod tokenizer;
