//! Face matching: embedding comparison plus temporal smoothing.
//!
//! Embeddings are produced client-side by a generic image feature extractor,
//! so a match is a similarity heuristic, not a biometric verification.

pub mod similarity;
pub mod stability;

pub use similarity::{EnrolledFace, FaceMatch, cosine_similarity, find_best_match, normalize};
pub use stability::StabilityBuffer;

pub type MemberId = i64;
