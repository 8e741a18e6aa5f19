pub mod cascade;
pub mod detector;
pub mod encoder;
pub mod face;
pub mod model;
pub mod yunet;

// Re-export commonly used types
pub use cascade::{CascadeDetector, CascadeParams};
pub use detector::{Detector, YuNetDetector, YuNetParams};
pub use encoder::{Encoder, SFaceEncoder};
pub use face::{Detection, Embedding};
