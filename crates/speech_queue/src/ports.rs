//! Port definitions for the speech-engine capability
//!
//! The queue never renders audio itself. It drives whatever implements these
//! traits: a [`SpeechEngine`] hands out fresh [`EngineHandle`]s, and each
//! handle renders utterances synchronously.

#[cfg(test)]
use mockall::automock;
use tracing::{debug, warn};

use crate::error::SpeechError;
use crate::types::{EngineProperties, Property, PropertyValue, VoiceInfo};

/// Factory for speech engine instances
///
/// Shared between the facade and the worker thread, so it must be
/// `Send + Sync`. Every call to [`create`](Self::create) must return an
/// independent handle.
///
/// # Example
///
/// ```ignore
/// use speech_queue::{SpeechEngine, TextToSpeech};
///
/// let tts = TextToSpeech::new(Arc::new(EspeakEngine::default()), 100, 0)?;
/// tts.speak("hello");
/// ```
#[cfg_attr(test, automock)]
pub trait SpeechEngine: Send + Sync {
    /// Acquire a new engine handle
    ///
    /// # Errors
    ///
    /// Returns `SpeechError::EngineCreationFailed` if the engine is unavailable.
    fn create(&self) -> Result<Box<dyn EngineHandle>, SpeechError>;
}

/// One live instance of a speech engine
///
/// A handle is owned by exactly one thread at a time and is replaced rather
/// than repaired when it misbehaves.
#[cfg_attr(test, automock)]
pub trait EngineHandle: Send {
    /// Apply a property value to this instance
    ///
    /// # Errors
    ///
    /// Returns `SpeechError::Property` if the engine rejects the value.
    fn set_property(&mut self, value: &PropertyValue) -> Result<(), SpeechError>;

    /// Read a property from this instance
    ///
    /// # Errors
    ///
    /// Returns `SpeechError::Property` if the property cannot be read.
    fn get_property(&self, property: Property) -> Result<PropertyValue, SpeechError>;

    /// List the voices this instance can speak with, in engine order
    ///
    /// # Errors
    ///
    /// Returns `SpeechError` if the engine cannot enumerate its voices.
    fn list_voices(&self) -> Result<Vec<VoiceInfo>, SpeechError>;

    /// Render `text` and block until playback has finished
    ///
    /// # Errors
    ///
    /// Returns `SpeechError::SynthesisFailed` if rendering fails.
    fn speak_and_wait(&mut self, text: &str) -> Result<(), SpeechError>;

    /// Release the resources held by this instance
    ///
    /// # Errors
    ///
    /// Returns `SpeechError` if cleanup fails. Callers treat this as best effort.
    fn release(&mut self) -> Result<(), SpeechError>;
}

/// Push `props` into a freshly created handle
///
/// Failures are logged and skipped; a handle with a default rate still
/// speaks. Without an explicit voice the first listed voice is selected.
pub(crate) fn apply_properties(handle: &mut dyn EngineHandle, props: &EngineProperties) {
    let voice = match &props.voice_id {
        Some(id) => Some(id.clone()),
        None => match handle.list_voices() {
            Ok(voices) => voices.into_iter().next().map(|v| v.id),
            Err(e) => {
                warn!(error = %e, "Failed to list voices on new engine handle");
                None
            },
        },
    };

    let mut values = vec![
        PropertyValue::Rate(props.rate),
        PropertyValue::Volume(props.volume),
    ];
    values.extend(voice.map(PropertyValue::Voice));

    for value in &values {
        if let Err(e) = handle.set_property(value) {
            warn!(property = %value.property(), %value, error = %e, "Failed to apply engine property");
        }
    }

    debug!(rate = props.rate, volume = props.volume, "Engine properties applied");
}
