//! Speech engine implementations
//!
//! Contains concrete implementations of the `SpeechEngine` and `EngineHandle` traits.

pub mod espeak;

pub use espeak::{EspeakEngine, EspeakHandle};
