//! Speech synthesizer abstraction
//!
//! Provides a unified interface over the external text-to-speech engine.
//! The dispatcher owns exactly one of these on its worker thread and is
//! the only code that ever touches engine state.

use crate::platform::is_wsl;
use crate::{KairosError, Result};
use log::info;

/// Which engine backend to construct
///
/// Chosen at configuration time; there is no runtime lookup by name
/// beyond parsing the config value into this enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendKind {
    /// Detect the platform and pick the best available backend
    Auto,
    /// The `tts` crate (Speech Dispatcher on Linux, AVFoundation on macOS)
    Native,
    /// espeak-ng subprocess over PulseAudio
    Espeak,
}

impl BackendKind {
    /// Parse a config value (`auto` / `native` / `espeak`)
    pub fn parse(value: &str) -> Result<Self> {
        match value {
            "auto" => Ok(BackendKind::Auto),
            "native" => Ok(BackendKind::Native),
            "espeak" => Ok(BackendKind::Espeak),
            other => Err(KairosError::Config(format!(
                "Unknown speech backend '{}' (expected 'auto', 'native' or 'espeak')",
                other
            ))),
        }
    }
}

/// Speech synthesizer capability set
///
/// `speak` begins synthesis and returns once the engine has accepted the
/// text; it does not wait for audio to finish. The worker serializes
/// utterances by polling `is_speaking` until the engine goes idle, so
/// implementations never need their own queueing.
pub trait Synth: Send {
    /// Set speech rate (0-100, where 50 is normal)
    fn set_rate(&mut self, rate: u8) -> Result<()>;

    /// Set speech volume (0-100)
    fn set_volume(&mut self, volume: u8) -> Result<()>;

    /// Set voice by index (backend-specific)
    fn set_voice_idx(&mut self, idx: usize) -> Result<()>;

    /// Begin speaking text
    fn speak(&mut self, text: &str) -> Result<()>;

    /// Is the engine still producing audio?
    fn is_speaking(&mut self) -> Result<bool>;

    /// Stop the current utterance
    fn stop(&mut self) -> Result<()>;
}

/// Create a speech synthesizer for the configured backend
///
/// With `BackendKind::Auto` the environment decides:
///
/// **WSL (Windows Subsystem for Linux):**
/// 1. espeak-ng over the WSLg PulseAudio bridge (lowest latency)
/// 2. Native backend via the `tts` crate
///
/// **Native Linux:**
/// 1. Speech Dispatcher via the `tts` crate (respects system preferences)
/// 2. espeak-ng over PulseAudio as a fallback
///
/// **macOS and others:**
/// - Native backend (AVFoundation etc. via the `tts` crate)
///
/// All failures come back as `EngineInit` with install hints.
pub fn create_synth(kind: BackendKind) -> Result<Box<dyn Synth>> {
    use super::backends::espeak::EspeakSynth;
    use super::backends::native::NativeSynth;

    match kind {
        BackendKind::Native => {
            info!("Creating native TTS backend (pinned by config)");
            Ok(Box::new(NativeSynth::new()?))
        }
        BackendKind::Espeak => {
            info!("Creating espeak-ng backend (pinned by config)");
            Ok(Box::new(EspeakSynth::new()?))
        }
        BackendKind::Auto => create_auto_synth(),
    }
}

/// Platform-detecting backend selection for `BackendKind::Auto`
fn create_auto_synth() -> Result<Box<dyn Synth>> {
    use super::backends::espeak::EspeakSynth;
    use super::backends::native::NativeSynth;

    let platform = std::env::consts::OS;

    // Special case: WSL (Linux with Windows interop)
    if platform == "linux" && is_wsl() {
        info!("Detected WSL environment");

        info!("Trying espeak-ng + PulseAudio backend...");
        match EspeakSynth::new() {
            Ok(synth) => {
                info!("✓ Successfully initialized espeak-ng backend");
                return Ok(Box::new(synth));
            }
            Err(e) => {
                info!("✗ espeak-ng backend unavailable: {}", e);
            }
        }

        info!("Trying native TTS backend...");
        return match NativeSynth::new() {
            Ok(synth) => {
                info!("✓ Successfully initialized native TTS backend");
                Ok(Box::new(synth))
            }
            Err(e) => Err(KairosError::EngineInit(format!(
                "No speech backend available on WSL. Tried:\n\
                 1. espeak-ng + PulseAudio (install: sudo apt install espeak-ng)\n\
                 2. Speech Dispatcher (not configured)\n\
                 Error: {}",
                e
            ))),
        };
    }

    // Native Linux: prefer Speech Dispatcher, fall back to espeak-ng
    if platform == "linux" {
        info!("Detected native Linux environment");

        info!("Trying native TTS backend (Speech Dispatcher)...");
        match NativeSynth::new() {
            Ok(synth) => {
                info!("✓ Successfully initialized native TTS backend");
                return Ok(Box::new(synth));
            }
            Err(e) => {
                info!("✗ Speech Dispatcher unavailable: {}", e);
                info!("To install: sudo apt install speech-dispatcher");
            }
        }

        info!("Trying espeak-ng + PulseAudio backend...");
        return match EspeakSynth::new() {
            Ok(synth) => {
                info!("✓ Successfully initialized espeak-ng backend");
                Ok(Box::new(synth))
            }
            Err(e) => Err(KairosError::EngineInit(format!(
                "No speech backend available on Linux. Tried:\n\
                 1. Speech Dispatcher (install: sudo apt install speech-dispatcher)\n\
                 2. espeak-ng + PulseAudio (install: sudo apt install espeak-ng)\n\
                 Error: {}",
                e
            ))),
        };
    }

    // macOS and other platforms
    info!(
        "Creating native speech synthesizer for platform: {}",
        platform
    );
    match NativeSynth::new() {
        Ok(synth) => {
            info!("✓ Successfully initialized native TTS backend");
            Ok(Box::new(synth))
        }
        Err(e) => Err(KairosError::EngineInit(format!(
            "Failed to initialize speech backend for platform '{}': {}",
            platform, e
        ))),
    }
}
