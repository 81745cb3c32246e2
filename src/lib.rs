pub mod data;
pub mod error;
pub mod models;
pub mod training;
pub mod utils;

pub use error::{DataError, TrainingError};
