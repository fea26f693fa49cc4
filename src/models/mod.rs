/// ML модели

pub mod bootstrap;
pub mod cross_validation;
pub mod linalg;
pub mod metrics;
pub mod ridge;

pub use bootstrap::BootstrapEstimator;
pub use cross_validation::{resolve_folds, CrossValidator, Fold, KFold};
pub use ridge::{logspace, AlphaCriterion, RidgeModel, RidgeRegressor};
