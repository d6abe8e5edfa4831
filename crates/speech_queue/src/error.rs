//! Speech queue errors

use thiserror::Error;

use crate::types::Property;

/// Errors that can occur while queueing or rendering speech
#[derive(Debug, Error)]
pub enum SpeechError {
    /// The speech engine could not be acquired
    #[error("Engine creation failed: {0}")]
    EngineCreationFailed(String),

    /// Reading or writing an engine property failed
    #[error("Property '{property}' error: {reason}")]
    Property {
        /// Property that was accessed
        property: Property,
        /// Why the access failed
        reason: String,
    },

    /// The engine failed to render an utterance
    #[error("Synthesis failed: {0}")]
    SynthesisFailed(String),

    /// The queue no longer accepts speech requests
    #[error("Speech queue is closed")]
    QueueClosed,

    /// Invalid configuration
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The engine handle was used after it was released
    #[error("Engine handle already released")]
    EngineReleased,

    /// The worker thread could not be started
    #[error("Failed to spawn speech worker: {0}")]
    WorkerSpawnFailed(String),
}

impl SpeechError {
    /// Shorthand for a [`SpeechError::Property`]
    pub fn property(property: Property, reason: impl Into<String>) -> Self {
        Self::Property {
            property,
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn engine_creation_failed_error_message() {
        let err = SpeechError::EngineCreationFailed("no audio device".to_string());
        assert_eq!(err.to_string(), "Engine creation failed: no audio device");
    }

    #[test]
    fn property_error_message() {
        let err = SpeechError::property(Property::Volume, "must be between 0.0 and 1.0");
        assert_eq!(
            err.to_string(),
            "Property 'volume' error: must be between 0.0 and 1.0"
        );
    }

    #[test]
    fn synthesis_failed_error_message() {
        let err = SpeechError::SynthesisFailed("device busy".to_string());
        assert_eq!(err.to_string(), "Synthesis failed: device busy");
    }

    #[test]
    fn queue_closed_error_message() {
        assert_eq!(SpeechError::QueueClosed.to_string(), "Speech queue is closed");
    }

    #[test]
    fn configuration_error_message() {
        let err = SpeechError::Configuration("rate must be positive".to_string());
        assert_eq!(err.to_string(), "Configuration error: rate must be positive");
    }

    #[test]
    fn worker_spawn_failed_error_message() {
        let err = SpeechError::WorkerSpawnFailed("out of threads".to_string());
        assert_eq!(
            err.to_string(),
            "Failed to spawn speech worker: out of threads"
        );
    }

    #[test]
    fn engine_released_error_message() {
        assert_eq!(
            SpeechError::EngineReleased.to_string(),
            "Engine handle already released"
        );
    }
}
