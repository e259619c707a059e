//! Type definitions for the prediction service

pub mod label;
pub mod response;

pub use label::QualityLabel;
pub use response::{ComparisonResponse, PredictionResponse};
