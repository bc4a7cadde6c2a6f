pub mod clustering;
pub mod indicators;
pub mod preprocessing;
pub mod screener;

pub use clustering::{agglomerative, cluster_movements, cluster_stocks};
pub use preprocessing::{clean, standardize};
pub use screener::{rank_momentum, select_leaders, technical_snapshot, Screener};
