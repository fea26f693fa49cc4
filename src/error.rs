//! Ошибки ML модуля

use thiserror::Error;

pub type Result<T> = std::result::Result<T, ModelError>;

#[derive(Debug, Error)]
pub enum ModelError {
    /// Пустые, некорректные или неконечные обучающие данные
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("{0} not fitted")]
    NotFitted(&'static str),
    #[error("dimension mismatch: expected {expected} features, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },
    /// Неверные параметры (folds, alphas, число ресэмплов, квантили)
    #[error("invalid config: {0}")]
    InvalidConfig(String),
    #[error("insufficient data: need at least {required} samples, got {actual}")]
    InsufficientData { required: usize, actual: usize },
    #[error("serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for ModelError {
    fn from(err: serde_json::Error) -> Self {
        ModelError::Serialization(err.to_string())
    }
}

impl From<std::io::Error> for ModelError {
    fn from(err: std::io::Error) -> Self {
        ModelError::Serialization(err.to_string())
    }
}
