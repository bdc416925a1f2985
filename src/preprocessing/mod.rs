//! Data preprocessing module
//!
//! - Label encoding of categorical columns and of the target
//! - Min-max feature scaling fit on the training partition

mod encoder;
mod scaler;

pub use encoder::{CategoricalEncoder, EncodedDataset, LabelEncoder};
pub use scaler::MinMaxScaler;
