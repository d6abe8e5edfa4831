//! Configuration for the speech queue

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Configuration for a [`TextToSpeech`](crate::TextToSpeech) instance
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpeechQueueConfig {
    /// Initial speaking rate in words per minute
    #[serde(default = "default_rate")]
    pub rate: u32,

    /// Initial volume (0.0 to 1.0)
    #[serde(default = "default_volume")]
    pub volume: f32,

    /// Index into the engine's voice list; out of range keeps the engine default
    #[serde(default)]
    pub voice_index: usize,

    /// How long the worker waits on an empty queue before re-checking for shutdown
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Upper bound on how long `stop()` waits for the worker to finish
    #[serde(default = "default_stop_timeout_ms")]
    pub stop_timeout_ms: u64,

    /// Pause taken by `speak_and_wait_briefly()` after queueing
    #[serde(default = "default_head_start_ms")]
    pub head_start_ms: u64,

    /// Name given to the worker thread
    #[serde(default = "default_thread_name")]
    pub thread_name: String,
}

const fn default_rate() -> u32 {
    crate::types::DEFAULT_RATE
}

const fn default_volume() -> f32 {
    crate::types::DEFAULT_VOLUME
}

const fn default_poll_interval_ms() -> u64 {
    1000
}

const fn default_stop_timeout_ms() -> u64 {
    3000
}

const fn default_head_start_ms() -> u64 {
    500
}

fn default_thread_name() -> String {
    "tts-worker".to_string()
}

impl Default for SpeechQueueConfig {
    fn default() -> Self {
        Self {
            rate: default_rate(),
            volume: default_volume(),
            voice_index: 0,
            poll_interval_ms: default_poll_interval_ms(),
            stop_timeout_ms: default_stop_timeout_ms(),
            head_start_ms: default_head_start_ms(),
            thread_name: default_thread_name(),
        }
    }
}

impl SpeechQueueConfig {
    /// Config with the given rate and voice, everything else default
    #[must_use]
    pub fn new(rate: u32, voice_index: usize) -> Self {
        Self {
            rate,
            voice_index,
            ..Default::default()
        }
    }

    /// Worker poll interval
    #[must_use]
    pub const fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Shutdown wait bound
    #[must_use]
    pub const fn stop_timeout(&self) -> Duration {
        Duration::from_millis(self.stop_timeout_ms)
    }

    /// Pause after a brief-wait enqueue
    #[must_use]
    pub const fn head_start(&self) -> Duration {
        Duration::from_millis(self.head_start_ms)
    }

    /// Validate the configuration
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid.
    pub fn validate(&self) -> Result<(), String> {
        if self.rate == 0 {
            return Err("Rate must be greater than 0".to_string());
        }

        if !(0.0..=1.0).contains(&self.volume) {
            return Err(format!(
                "Volume must be between 0.0 and 1.0, got {}",
                self.volume
            ));
        }

        // A zero poll interval would spin the worker
        if self.poll_interval_ms == 0 {
            return Err("Poll interval must be greater than 0".to_string());
        }

        if self.thread_name.trim().is_empty() {
            return Err("Thread name must not be empty".to_string());
        }

        Ok(())
    }
}

/// Configuration for the `espeak-ng` engine adapter
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EspeakConfig {
    /// Path to the espeak-ng executable (looked up in PATH if not absolute)
    #[serde(default = "default_espeak_path")]
    pub executable_path: PathBuf,
}

fn default_espeak_path() -> PathBuf {
    PathBuf::from("espeak-ng")
}

impl Default for EspeakConfig {
    fn default() -> Self {
        Self {
            executable_path: default_espeak_path(),
        }
    }
}
