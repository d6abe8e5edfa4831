//! Speech Queue - non-blocking text-to-speech output
//!
//! Producers hand short strings to [`TextToSpeech`], which queues them and
//! returns immediately. A single background worker speaks them one at a time
//! through a pluggable speech engine, recreating the engine after every
//! utterance so a wedged engine never blocks the rest of the queue.
//!
//! # Architecture
//!
//! This crate follows the ports & adapters pattern:
//! - `ports` module defines the engine traits (ports)
//! - `providers` module contains concrete engines (adapters)
//! - `queue` and `worker` implement the single-consumer pipeline
//! - `facade` is the public entry point
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use speech_queue::{EspeakEngine, PropertyValue, TextToSpeech};
//!
//! let tts = TextToSpeech::new(Arc::new(EspeakEngine::default()), 100, 0)?;
//! tts.speak("Hello");
//! tts.set_property(PropertyValue::Rate(150));
//! tts.speak("This sentence should be faster.");
//! tts.stop();
//! ```

pub mod config;
pub mod error;
pub mod facade;
pub mod ports;
pub mod providers;
pub mod queue;
pub mod types;
pub mod worker;

pub use config::{EspeakConfig, SpeechQueueConfig};
pub use error::SpeechError;
pub use facade::TextToSpeech;
pub use ports::{EngineHandle, SpeechEngine};
pub use providers::EspeakEngine;
pub use queue::SpeechQueue;
pub use types::{EngineProperties, Property, PropertyValue, SpeechRequest, VoiceGender, VoiceInfo};
pub use worker::{WorkerState, WorkerStats, WorkerStatsSnapshot};
