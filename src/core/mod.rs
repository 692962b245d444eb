pub mod engine;
pub mod pipeline;
pub mod summary;

pub use crate::domain::model::{Document, RunReport};
pub use crate::domain::ports::{ConfigProvider, Pipeline, Storage};
pub use crate::utils::error::Result;
