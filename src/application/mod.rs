// Feature engineering over minute bars
pub mod features;

// Scaling, k-means and model selection
pub mod clustering;

// Projection and cluster profiles
pub mod reporting;

// Stage orchestration
pub mod pipeline;
