//! Model definitions
//!
//! - Logistic win classifier
//! - Linear margin regressor

pub mod linear;

pub use linear::{LinearModel, MarginRegressor, Standardizer, WinClassifier};
