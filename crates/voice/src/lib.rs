//! Voice message transcription.
//!
//! Audio bytes go in, plain text comes out, reported with the same
//! [`AttemptResult`](onika_providers::AttemptResult) taxonomy the generation
//! backends use.

pub mod stt;

pub use stt::{AudioFormat, SttProvider, TranscribeRequest, WhisperApiStt};
