pub mod analysis;
pub mod api;
pub mod data_collector;
pub mod error;
pub mod models;
pub mod price_cache;
pub mod report;
pub mod utils;

pub use error::{AnalysisError, Result};
