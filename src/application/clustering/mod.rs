pub mod kmeans;
pub mod selector;
pub mod silhouette;
pub mod standardizer;

pub use selector::ClusterSelector;
pub use standardizer::Standardizer;
