//! Types for the speech queue
//!
//! Contains the queued request type, engine properties and voice information.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::SpeechError;

/// Default speaking rate in words per minute
pub const DEFAULT_RATE: u32 = 100;

/// Default output volume
pub const DEFAULT_VOLUME: f32 = 1.0;

/// An item travelling through the speech queue
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpeechRequest {
    /// Text to be spoken
    Text(String),
    /// Shutdown sentinel for the worker
    Stop,
}

impl SpeechRequest {
    /// Create a text request
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text(text.into())
    }
}

/// Returns `true` if the text has nothing worth speaking
#[must_use]
pub fn is_blank(text: &str) -> bool {
    text.trim().is_empty()
}

/// Engine property names
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Property {
    /// Speaking rate in words per minute
    Rate,
    /// Output volume between 0.0 and 1.0
    Volume,
    /// Voice identifier
    Voice,
}

impl Property {
    /// The string key for this property
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Rate => "rate",
            Self::Volume => "volume",
            Self::Voice => "voice",
        }
    }
}

impl fmt::Display for Property {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Property {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "rate" => Ok(Self::Rate),
            "volume" => Ok(Self::Volume),
            "voice" => Ok(Self::Voice),
            other => Err(format!("Unknown engine property: {other}")),
        }
    }
}

/// A typed engine property value
#[derive(Debug, Clone, PartialEq)]
pub enum PropertyValue {
    /// Words per minute
    Rate(u32),
    /// Volume between 0.0 and 1.0
    Volume(f32),
    /// Voice identifier
    Voice(String),
}

impl PropertyValue {
    /// The property this value belongs to
    #[must_use]
    pub const fn property(&self) -> Property {
        match self {
            Self::Rate(_) => Property::Rate,
            Self::Volume(_) => Property::Volume,
            Self::Voice(_) => Property::Voice,
        }
    }

    /// Parse a raw string value for `property`
    ///
    /// # Errors
    ///
    /// Returns `SpeechError::Property` if the string is not a valid value.
    pub fn parse(property: Property, raw: &str) -> Result<Self, SpeechError> {
        let raw = raw.trim();
        let value = match property {
            Property::Rate => raw
                .parse::<u32>()
                .map(Self::Rate)
                .map_err(|e| SpeechError::property(property, format!("invalid rate '{raw}': {e}")))?,
            Property::Volume => raw
                .parse::<f32>()
                .map(Self::Volume)
                .map_err(|e| {
                    SpeechError::property(property, format!("invalid volume '{raw}': {e}"))
                })?,
            Property::Voice => Self::Voice(raw.to_string()),
        };
        value.validate()?;
        Ok(value)
    }

    /// Check the value against the property's allowed range
    ///
    /// # Errors
    ///
    /// Returns `SpeechError::Property` if the value is out of range.
    pub fn validate(&self) -> Result<(), SpeechError> {
        match self {
            Self::Rate(0) => Err(SpeechError::property(
                Property::Rate,
                "must be a positive number of words per minute",
            )),
            Self::Volume(v) if !(0.0..=1.0).contains(v) => Err(SpeechError::property(
                Property::Volume,
                format!("must be between 0.0 and 1.0, got {v}"),
            )),
            Self::Voice(id) if id.trim().is_empty() => {
                Err(SpeechError::property(Property::Voice, "voice id is empty"))
            },
            _ => Ok(()),
        }
    }
}

impl fmt::Display for PropertyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Rate(rate) => write!(f, "{rate}"),
            Self::Volume(volume) => write!(f, "{volume}"),
            Self::Voice(id) => f.write_str(id),
        }
    }
}

/// Properties applied to every engine handle the queue creates
#[derive(Debug, Clone, PartialEq)]
pub struct EngineProperties {
    /// Speaking rate in words per minute
    pub rate: u32,
    /// Output volume between 0.0 and 1.0
    pub volume: f32,
    /// Selected voice; `None` means the first voice the engine offers
    pub voice_id: Option<String>,
}

impl Default for EngineProperties {
    fn default() -> Self {
        Self {
            rate: DEFAULT_RATE,
            volume: DEFAULT_VOLUME,
            voice_id: None,
        }
    }
}

impl EngineProperties {
    /// Record a (validated) property value
    pub fn apply(&mut self, value: &PropertyValue) {
        match value {
            PropertyValue::Rate(rate) => self.rate = *rate,
            PropertyValue::Volume(volume) => self.volume = *volume,
            PropertyValue::Voice(id) => self.voice_id = Some(id.clone()),
        }
    }

    /// Current value of a property, if one is set
    #[must_use]
    pub fn get(&self, property: Property) -> Option<PropertyValue> {
        match property {
            Property::Rate => Some(PropertyValue::Rate(self.rate)),
            Property::Volume => Some(PropertyValue::Volume(self.volume)),
            Property::Voice => self.voice_id.clone().map(PropertyValue::Voice),
        }
    }
}

/// Information about an available voice
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoiceInfo {
    /// Voice identifier passed back to the engine
    pub id: String,
    /// Human-readable name
    pub name: String,
    /// Supported languages
    pub languages: Vec<String>,
    /// Voice gender (if known)
    pub gender: Option<VoiceGender>,
}

impl VoiceInfo {
    /// Create a new voice info
    #[must_use]
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            languages: Vec::new(),
            gender: None,
        }
    }
}

/// Voice gender classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VoiceGender {
    /// Male voice
    Male,
    /// Female voice
    Female,
    /// Neutral/androgynous voice
    Neutral,
}
