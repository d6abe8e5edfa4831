//! Public text-to-speech facade
//!
//! [`TextToSpeech`] is what producers talk to. It owns the queue, starts the
//! worker, and keeps a reference engine handle of its own for property
//! introspection. Property changes are recorded in a shared
//! [`EngineProperties`] value that the worker re-reads every time it builds a
//! new handle, so changes take effect from the next utterance onwards.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::Ordering;

use parking_lot::Mutex;
use tracing::{Dispatch, debug, error, info, instrument, warn};

use crate::config::SpeechQueueConfig;
use crate::error::SpeechError;
use crate::ports::{EngineHandle, SpeechEngine};
use crate::queue::SpeechQueue;
use crate::types::{
    EngineProperties, Property, PropertyValue, SpeechRequest, VoiceInfo, is_blank,
};
use crate::worker::{SpeechWorker, WorkerShared, WorkerState, WorkerStatsSnapshot, WorkerThread};

/// Non-blocking text-to-speech front end
///
/// All methods take `&self`, so the facade can be shared behind an `Arc`
/// by several producers.
pub struct TextToSpeech {
    reference: Mutex<Option<Box<dyn EngineHandle>>>,
    queue: SpeechQueue,
    shared: Arc<WorkerShared>,
    worker: Mutex<Option<WorkerThread>>,
    config: SpeechQueueConfig,
}

impl fmt::Debug for TextToSpeech {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TextToSpeech")
            .field("queue", &self.queue)
            .field("state", &self.shared.state())
            .field("properties", &*self.shared.properties.read())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl TextToSpeech {
    /// Create a facade speaking at `rate` words per minute with the voice at
    /// `voice_index`
    ///
    /// # Errors
    ///
    /// Returns `SpeechError::EngineCreationFailed` if no engine can be acquired.
    pub fn new(
        engine: Arc<dyn SpeechEngine>,
        rate: u32,
        voice_index: usize,
    ) -> Result<Self, SpeechError> {
        Self::with_config(engine, SpeechQueueConfig::new(rate, voice_index))
    }

    /// Create a facade from a full configuration
    ///
    /// The worker logs through the caller's current default dispatcher.
    ///
    /// # Errors
    ///
    /// Returns `SpeechError::Configuration` for an invalid config and
    /// `SpeechError::EngineCreationFailed` if no engine can be acquired.
    pub fn with_config(
        engine: Arc<dyn SpeechEngine>,
        config: SpeechQueueConfig,
    ) -> Result<Self, SpeechError> {
        let dispatch = tracing::dispatcher::get_default(Dispatch::clone);
        Self::with_dispatch(engine, config, dispatch)
    }

    /// Create a facade whose worker logs through `dispatch`
    ///
    /// # Errors
    ///
    /// Same as [`with_config`](Self::with_config), plus
    /// `SpeechError::WorkerSpawnFailed` if the worker thread cannot start.
    #[instrument(skip(engine, config, dispatch), fields(rate = config.rate, voice_index = config.voice_index))]
    pub fn with_dispatch(
        engine: Arc<dyn SpeechEngine>,
        config: SpeechQueueConfig,
        dispatch: Dispatch,
    ) -> Result<Self, SpeechError> {
        config.validate().map_err(SpeechError::Configuration)?;

        info!("Initializing speech engine");
        let mut reference = engine.create().map_err(|e| match e {
            SpeechError::EngineCreationFailed(_) => e,
            other => SpeechError::EngineCreationFailed(other.to_string()),
        })?;

        let properties = Self::configure_reference(reference.as_mut(), &config);
        let shared = Arc::new(WorkerShared::new(properties));
        let queue = SpeechQueue::new();

        let worker = SpeechWorker::new(
            engine,
            queue.clone(),
            Arc::clone(&shared),
            config.poll_interval(),
        );
        let thread = match worker.spawn(config.thread_name.clone(), dispatch) {
            Ok(thread) => thread,
            Err(e) => {
                if let Err(release_err) = reference.release() {
                    debug!(error = %release_err, "Ignoring engine release failure");
                }
                return Err(SpeechError::WorkerSpawnFailed(e.to_string()));
            },
        };

        info!("Text-to-speech initialized; background worker started");

        Ok(Self {
            reference: Mutex::new(Some(reference)),
            queue,
            shared,
            worker: Mutex::new(Some(thread)),
            config,
        })
    }

    /// Apply the configured rate, volume and voice to the reference handle
    /// and return the properties the worker should start from
    fn configure_reference(
        handle: &mut dyn EngineHandle,
        config: &SpeechQueueConfig,
    ) -> EngineProperties {
        let mut properties = EngineProperties {
            rate: config.rate,
            volume: config.volume,
            voice_id: None,
        };

        for value in [
            PropertyValue::Rate(config.rate),
            PropertyValue::Volume(config.volume),
        ] {
            match handle.set_property(&value) {
                Ok(()) => info!(property = %value.property(), %value, "Set engine property"),
                Err(e) => warn!(property = %value.property(), error = %e, "Failed to set engine property"),
            }
        }

        let voices = handle.list_voices().unwrap_or_else(|e| {
            warn!(error = %e, "Failed to list voices");
            Vec::new()
        });
        info!(count = voices.len(), "Available voices");
        for (index, voice) in voices.iter().enumerate() {
            info!(index, id = %voice.id, name = %voice.name, "Voice");
        }

        match voices.get(config.voice_index) {
            Some(voice) => {
                if let Err(e) = handle.set_property(&PropertyValue::Voice(voice.id.clone())) {
                    warn!(voice = %voice.id, error = %e, "Failed to select voice");
                }
                info!(voice = %voice.name, "Using voice");
                properties.voice_id = Some(voice.id.clone());
            },
            None => warn!(
                voice_index = config.voice_index,
                "Voice index not available; using default"
            ),
        }

        properties
    }

    /// Queue `text` to be spoken and return immediately
    ///
    /// Empty or whitespace-only text is ignored.
    pub fn speak(&self, text: &str) {
        if is_blank(text) {
            debug!("speak() called with empty text");
            return;
        }
        debug!(text, "Queueing text for speech");
        self.enqueue(text);
    }

    /// Queue `text`, then pause the calling thread briefly so playback can
    /// get going
    ///
    /// There is no guarantee the utterance has started, let alone finished,
    /// when this returns.
    #[instrument(skip(self, text), fields(text_len = text.len()))]
    pub fn speak_and_wait_briefly(&self, text: &str) {
        if is_blank(text) {
            debug!("speak_and_wait_briefly() called with empty text");
            return;
        }
        info!(text, "Queueing text for speech with head start");
        if self.enqueue(text) {
            std::thread::sleep(self.config.head_start());
        }
    }

    fn enqueue(&self, text: &str) -> bool {
        match self.queue.enqueue(SpeechRequest::text(text)) {
            Ok(()) => true,
            Err(e) => {
                warn!(text, error = %e, "Dropping speech request");
                false
            },
        }
    }

    /// Change an engine property
    ///
    /// The value is applied to the reference handle right away and to the
    /// worker's engine from its next reinitialization. Values that fail
    /// validation or that the reference engine rejects are logged and ignored.
    #[instrument(skip(self), fields(property = %value.property()))]
    pub fn set_property(&self, value: PropertyValue) {
        if let Err(e) = value.validate() {
            error!(error = %e, "Rejected property change");
            return;
        }

        if let Some(handle) = self.reference.lock().as_mut()
            && let Err(e) = handle.set_property(&value)
        {
            error!(error = %e, "Error setting property on reference engine");
            return;
        }

        self.shared.properties.write().apply(&value);
        info!(%value, "Property updated");
    }

    /// String-keyed form of [`set_property`](Self::set_property)
    pub fn set_named_property(&self, name: &str, value: &str) {
        let parsed = name
            .parse::<Property>()
            .map_err(SpeechError::Configuration)
            .and_then(|property| PropertyValue::parse(property, value));

        match parsed {
            Ok(value) => self.set_property(value),
            Err(e) => error!(name, value, error = %e, "Error setting property"),
        }
    }

    /// Read a property from the reference handle
    ///
    /// Returns `None` if the engine cannot report it.
    pub fn get_property(&self, property: Property) -> Option<PropertyValue> {
        let guard = self.reference.lock();
        let handle = guard.as_ref()?;
        match handle.get_property(property) {
            Ok(value) => Some(value),
            Err(e) => {
                error!(%property, error = %e, "Error getting property");
                None
            },
        }
    }

    /// String-keyed form of [`get_property`](Self::get_property)
    pub fn get_named_property(&self, name: &str) -> Option<PropertyValue> {
        match name.parse::<Property>() {
            Ok(property) => self.get_property(property),
            Err(e) => {
                error!(name, error = %e, "Error getting property");
                None
            },
        }
    }

    /// Voices offered by the engine, in engine order
    pub fn list_voices(&self) -> Vec<VoiceInfo> {
        let guard = self.reference.lock();
        let Some(handle) = guard.as_ref() else {
            return Vec::new();
        };
        handle.list_voices().unwrap_or_else(|e| {
            error!(error = %e, "Error listing voices");
            Vec::new()
        })
    }

    /// Properties the next worker engine will be created with
    pub fn properties(&self) -> EngineProperties {
        self.shared.properties.read().clone()
    }

    /// Current worker lifecycle state
    pub fn worker_state(&self) -> WorkerState {
        self.shared.state()
    }

    /// Worker counters
    pub fn stats(&self) -> WorkerStatsSnapshot {
        self.shared.stats.snapshot()
    }

    /// Number of requests waiting to be spoken
    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    /// Stop the worker
    ///
    /// Signals shutdown, then waits at most the configured stop timeout for
    /// the current utterance to finish. Returns regardless of whether the
    /// worker exited in time. Calling it again is a no-op.
    #[instrument(skip(self))]
    pub fn stop(&self) {
        let Some(worker) = self.worker.lock().take() else {
            debug!("Text-to-speech already stopped");
            return;
        };

        info!("Stopping text-to-speech");
        self.shared.should_stop.store(true, Ordering::Release);
        self.queue.close();

        let timeout = self.config.stop_timeout();
        if worker.join_timeout(timeout) {
            info!("Text-to-speech stopped successfully");
        } else {
            warn!(
                timeout_ms = self.config.stop_timeout_ms,
                "Speech worker still busy after timeout; detaching"
            );
        }
    }
}

impl Drop for TextToSpeech {
    fn drop(&mut self) {
        self.stop();
        if let Some(mut handle) = self.reference.get_mut().take()
            && let Err(e) = handle.release()
        {
            debug!(error = %e, "Ignoring reference engine release failure");
        }
    }
}
