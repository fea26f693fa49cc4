/// Модуль предобработки данных

pub mod encoder;
pub mod feature_engineering;
pub mod normalization;

pub use encoder::{CategoricalVocabulary, FeatureEncoder};
pub use feature_engineering::FeatureEngineer;
pub use normalization::DataNormalizer;
