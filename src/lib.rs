pub mod config;
pub mod corpus;
pub mod database;
pub mod labeling;
pub mod matcher;
pub mod report;
pub mod scan;
pub mod tally;

// Re-export vision types for convenience
pub use facebench_vision::{Detection, Detector, Embedding, Encoder};
