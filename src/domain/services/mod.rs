//! Deterministic analysis steps. Nothing here performs I/O except the
//! optional model call in `attestation`, which goes through `LlmClient`.

pub mod alignment;
pub mod attestation;
pub mod conflict;
pub mod crts;
pub mod network;
pub mod risk;
pub mod scoring;
pub mod tfidf;
