pub mod centering_classifier;
pub mod position_normalizer;
