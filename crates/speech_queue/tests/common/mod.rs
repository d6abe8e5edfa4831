//! Shared fixtures for integration tests
//!
//! `RecordingEngine` is a fake speech engine that logs every call it receives
//! and can be told to fail on demand.

#![allow(dead_code)]

use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use speech_queue::{
    EngineHandle, EngineProperties, Property, PropertyValue, SpeechEngine, SpeechError,
    SpeechQueueConfig, VoiceInfo,
};

/// One call observed by the fake engine
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Create { handle: usize },
    SetProperty { handle: usize, value: PropertyValue },
    Speak { handle: usize, text: String },
    Release { handle: usize },
}

#[derive(Debug, Default)]
struct Inner {
    calls: Mutex<Vec<Call>>,
    creates: AtomicUsize,
    failing_creates: Mutex<HashSet<usize>>,
    fail_creates_from: Mutex<Option<usize>>,
    speak_failures: AtomicUsize,
    speak_delay: Mutex<Duration>,
}

impl Inner {
    fn record(&self, call: Call) {
        self.calls.lock().push(call);
    }
}

/// Fake engine; clones share the same call log
#[derive(Debug, Clone, Default)]
pub struct RecordingEngine {
    inner: Arc<Inner>,
}

impl RecordingEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn shared(&self) -> Arc<dyn SpeechEngine> {
        Arc::new(self.clone())
    }

    /// Make the `index`-th `create()` call (0-based) fail
    pub fn fail_create(&self, index: usize) {
        self.inner.failing_creates.lock().insert(index);
    }

    /// Make every `create()` call from `index` onwards fail
    pub fn fail_creates_from(&self, index: usize) {
        *self.inner.fail_creates_from.lock() = Some(index);
    }

    /// Make the next `count` utterances fail
    pub fn fail_next_speaks(&self, count: usize) {
        self.inner.speak_failures.store(count, Ordering::SeqCst);
    }

    /// Make every utterance take `delay`
    pub fn set_speak_delay(&self, delay: Duration) {
        *self.inner.speak_delay.lock() = delay;
    }

    pub fn calls(&self) -> Vec<Call> {
        self.inner.calls.lock().clone()
    }

    /// Texts spoken, in order
    pub fn spoken(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::Speak { text, .. } => Some(text),
                _ => None,
            })
            .collect()
    }

    pub fn create_count(&self) -> usize {
        self.calls()
            .iter()
            .filter(|c| matches!(c, Call::Create { .. }))
            .count()
    }

    /// Rate last applied to `handle`
    pub fn rate_of(&self, handle: usize) -> Option<u32> {
        self.calls().into_iter().rev().find_map(|c| match c {
            Call::SetProperty {
                handle: h,
                value: PropertyValue::Rate(rate),
            } if h == handle => Some(rate),
            _ => None,
        })
    }
}

impl SpeechEngine for RecordingEngine {
    fn create(&self) -> Result<Box<dyn EngineHandle>, SpeechError> {
        let index = self.inner.creates.fetch_add(1, Ordering::SeqCst);
        let fails_from = self.inner.fail_creates_from.lock().is_some_and(|from| index >= from);
        if fails_from || self.inner.failing_creates.lock().contains(&index) {
            return Err(SpeechError::EngineCreationFailed(format!(
                "create #{index} refused"
            )));
        }

        self.inner.record(Call::Create { handle: index });
        Ok(Box::new(RecordingHandle {
            id: index,
            inner: Arc::clone(&self.inner),
            properties: EngineProperties::default(),
        }))
    }
}

#[derive(Debug)]
struct RecordingHandle {
    id: usize,
    inner: Arc<Inner>,
    properties: EngineProperties,
}

impl EngineHandle for RecordingHandle {
    fn set_property(&mut self, value: &PropertyValue) -> Result<(), SpeechError> {
        self.inner.record(Call::SetProperty {
            handle: self.id,
            value: value.clone(),
        });
        self.properties.apply(value);
        Ok(())
    }

    fn get_property(&self, property: Property) -> Result<PropertyValue, SpeechError> {
        self.properties
            .get(property)
            .ok_or_else(|| SpeechError::property(property, "not set"))
    }

    fn list_voices(&self) -> Result<Vec<VoiceInfo>, SpeechError> {
        Ok(vec![
            VoiceInfo::new("voice-a", "Voice A"),
            VoiceInfo::new("voice-b", "Voice B"),
        ])
    }

    fn speak_and_wait(&mut self, text: &str) -> Result<(), SpeechError> {
        self.inner.record(Call::Speak {
            handle: self.id,
            text: text.to_string(),
        });

        let delay = *self.inner.speak_delay.lock();
        if !delay.is_zero() {
            thread::sleep(delay);
        }

        let should_fail = self
            .inner
            .speak_failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if should_fail {
            return Err(SpeechError::SynthesisFailed("engine got stuck".to_string()));
        }
        Ok(())
    }

    fn release(&mut self) -> Result<(), SpeechError> {
        self.inner.record(Call::Release { handle: self.id });
        Ok(())
    }
}

/// Config with short timings so tests finish quickly
pub fn fast_config() -> SpeechQueueConfig {
    SpeechQueueConfig {
        poll_interval_ms: 10,
        stop_timeout_ms: 2000,
        head_start_ms: 20,
        ..Default::default()
    }
}

/// Poll `condition` until it holds or `timeout` passes
pub fn wait_until(timeout: Duration, mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        thread::sleep(Duration::from_millis(5));
    }
    condition()
}

pub const WAIT: Duration = Duration::from_secs(5);
