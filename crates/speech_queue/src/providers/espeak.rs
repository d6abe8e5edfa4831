//! espeak-ng Speech Engine
//!
//! Implements [`SpeechEngine`] by driving the `espeak-ng` CLI. Every utterance
//! runs one `espeak-ng` process that plays straight to the default audio
//! device and exits when playback is done, which gives the synchronous
//! speak-and-wait behaviour the worker expects.
//!
//! # Prerequisites
//!
//! ```bash
//! sudo apt install espeak-ng
//! ```
//!
//! # Property mapping
//!
//! | Property | espeak-ng flag | Notes |
//! |----------|----------------|-------|
//! | rate     | `-s`           | words per minute |
//! | volume   | `-a`           | amplitude, `volume * 100` |
//! | voice    | `-v`           | language/voice name from `--voices` |

use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use tracing::{debug, error};

use crate::config::EspeakConfig;
use crate::error::SpeechError;
use crate::ports::{EngineHandle, SpeechEngine};
use crate::types::{
    DEFAULT_RATE, DEFAULT_VOLUME, Property, PropertyValue, VoiceGender, VoiceInfo,
};

/// Engine factory for `espeak-ng`
#[derive(Debug, Clone, Default)]
pub struct EspeakEngine {
    config: EspeakConfig,
}

impl EspeakEngine {
    /// Create a new espeak-ng engine factory
    #[must_use]
    pub const fn new(config: EspeakConfig) -> Self {
        Self { config }
    }

    fn executable(&self) -> &Path {
        &self.config.executable_path
    }
}

impl SpeechEngine for EspeakEngine {
    fn create(&self) -> Result<Box<dyn EngineHandle>, SpeechError> {
        let status = Command::new(self.executable())
            .arg("--version")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    SpeechError::EngineCreationFailed(format!(
                        "espeak-ng not found at '{}'. Please install espeak-ng.",
                        self.executable().display()
                    ))
                } else {
                    SpeechError::EngineCreationFailed(format!("Failed to run espeak-ng: {e}"))
                }
            })?;

        if !status.success() {
            return Err(SpeechError::EngineCreationFailed(format!(
                "espeak-ng --version exited with status {status}"
            )));
        }

        debug!(executable = %self.executable().display(), "Created espeak-ng handle");
        Ok(Box::new(EspeakHandle::new(self.executable().to_path_buf())))
    }
}

/// One configured espeak-ng "instance"
///
/// espeak-ng keeps no state between runs, so the handle is just the settings
/// for the next process it starts.
#[derive(Debug)]
pub struct EspeakHandle {
    executable: PathBuf,
    rate: u32,
    volume: f32,
    voice: Option<String>,
    released: bool,
}

impl EspeakHandle {
    fn new(executable: PathBuf) -> Self {
        Self {
            executable,
            rate: DEFAULT_RATE,
            volume: DEFAULT_VOLUME,
            voice: None,
            released: false,
        }
    }

    const fn ensure_live(&self) -> Result<(), SpeechError> {
        if self.released {
            Err(SpeechError::EngineReleased)
        } else {
            Ok(())
        }
    }

    /// Command-line arguments for one utterance (text goes in on stdin)
    fn speak_args(&self) -> Vec<String> {
        let mut args = vec![
            "-s".to_string(),
            self.rate.to_string(),
            "-a".to_string(),
            amplitude(self.volume).to_string(),
        ];
        if let Some(voice) = &self.voice {
            args.push("-v".to_string());
            args.push(voice.clone());
        }
        args.push("--stdin".to_string());
        args
    }
}

impl EngineHandle for EspeakHandle {
    fn set_property(&mut self, value: &PropertyValue) -> Result<(), SpeechError> {
        self.ensure_live()?;
        value.validate()?;
        match value {
            PropertyValue::Rate(rate) => self.rate = *rate,
            PropertyValue::Volume(volume) => self.volume = *volume,
            PropertyValue::Voice(id) => self.voice = Some(id.clone()),
        }
        Ok(())
    }

    fn get_property(&self, property: Property) -> Result<PropertyValue, SpeechError> {
        self.ensure_live()?;
        match property {
            Property::Rate => Ok(PropertyValue::Rate(self.rate)),
            Property::Volume => Ok(PropertyValue::Volume(self.volume)),
            Property::Voice => self
                .voice
                .clone()
                .map(PropertyValue::Voice)
                .ok_or_else(|| SpeechError::property(property, "no voice selected")),
        }
    }

    fn list_voices(&self) -> Result<Vec<VoiceInfo>, SpeechError> {
        self.ensure_live()?;
        let output = Command::new(&self.executable)
            .arg("--voices")
            .output()
            .map_err(|e| SpeechError::property(Property::Voice, format!("Failed to list voices: {e}")))?;

        if !output.status.success() {
            return Err(SpeechError::property(
                Property::Voice,
                format!(
                    "espeak-ng --voices exited with status {}: {}",
                    output.status,
                    String::from_utf8_lossy(&output.stderr).trim()
                ),
            ));
        }

        Ok(parse_voice_list(&String::from_utf8_lossy(&output.stdout)))
    }

    fn speak_and_wait(&mut self, text: &str) -> Result<(), SpeechError> {
        self.ensure_live()?;

        let mut cmd = Command::new(&self.executable);
        cmd.args(self.speak_args())
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped());

        debug!("Running espeak-ng: {:?}", cmd);

        let mut child = cmd
            .spawn()
            .map_err(|e| SpeechError::SynthesisFailed(format!("Failed to run espeak-ng: {e}")))?;

        if let Some(mut stdin) = child.stdin.take()
            && let Err(e) = stdin.write_all(text.as_bytes())
        {
            drop(stdin);
            // Reap the child before bailing out
            let _ = child.kill();
            let _ = child.wait();
            return Err(SpeechError::SynthesisFailed(format!(
                "Failed to write to espeak-ng stdin: {e}"
            )));
        }

        let output = child.wait_with_output().map_err(|e| {
            SpeechError::SynthesisFailed(format!("Failed to wait for espeak-ng: {e}"))
        })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            error!("espeak-ng failed: {}", stderr);
            return Err(SpeechError::SynthesisFailed(format!(
                "espeak-ng exited with status {}: {}",
                output.status,
                stderr.trim()
            )));
        }

        Ok(())
    }

    fn release(&mut self) -> Result<(), SpeechError> {
        self.released = true;
        Ok(())
    }
}

/// espeak-ng amplitude (0-200, 100 is normal) for a 0.0-1.0 volume
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn amplitude(volume: f32) -> u32 {
    (volume * 100.0).round().clamp(0.0, 200.0) as u32
}

/// Parse the table printed by `espeak-ng --voices`
///
/// ```text
/// Pty Language       Age/Gender VoiceName          File                 Other Languages
///  5  af              --/M      Afrikaans          gmw/af
///  5  en-us           --/M      English_(America)  gmw/en-US            (en 10)
/// ```
fn parse_voice_list(output: &str) -> Vec<VoiceInfo> {
    output
        .lines()
        .filter(|line| !line.trim_start().starts_with("Pty"))
        .filter_map(|line| {
            let mut columns = line.split_whitespace();
            let _priority = columns.next()?;
            let language = columns.next()?;
            let age_gender = columns.next()?;
            let name = columns.next()?;

            let mut voice = VoiceInfo::new(language, name.replace('_', " "));
            voice.languages = vec![language.to_string()];
            voice.gender = match age_gender.rsplit('/').next() {
                Some("M") => Some(VoiceGender::Male),
                Some("F") => Some(VoiceGender::Female),
                _ => None,
            };
            Some(voice)
        })
        .collect()
}
