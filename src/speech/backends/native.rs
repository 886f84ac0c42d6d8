//! Native TTS backend using the tts crate
//!
//! The `tts` crate provides a unified interface to:
//! - Speech Dispatcher on Linux (via native bindings)
//! - AVFoundation on macOS/iOS (via native bindings)
//! - Various other platforms

use crate::speech::Synth;
use crate::{KairosError, Result};
use log::{debug, error, warn};
use tts::Tts as TtsCrate;

/// Native TTS backend using the tts crate
pub struct NativeSynth {
    /// The tts crate's TTS instance
    tts: TtsCrate,

    /// Cached rate setting (0-100)
    rate: Option<u8>,

    /// Cached volume setting (0-100)
    volume: Option<u8>,

    /// Cached voice index
    voice_idx: Option<usize>,
}

impl NativeSynth {
    /// Create a new native TTS synthesizer
    pub fn new() -> Result<Self> {
        debug!("Creating native TTS backend");

        let tts = TtsCrate::default()
            .map_err(|e| KairosError::EngineInit(format!("Failed to initialize TTS: {}", e)))?;

        debug!("Native TTS backend created successfully");

        Ok(Self {
            tts,
            rate: None,
            volume: None,
            voice_idx: None,
        })
    }

    /// Convert Kairos rate (0-100) to tts crate rate
    ///
    /// The tts crate uses platform-specific rate ranges; the percentage
    /// scale maps through directly on the platforms we target.
    fn convert_rate(&self, rate: u8) -> f32 {
        rate as f32
    }

    /// Convert Kairos volume (0-100) to tts crate volume (0.0-1.0)
    fn convert_volume(&self, volume: u8) -> f32 {
        volume as f32 / 100.0
    }
}

impl Synth for NativeSynth {
    fn set_rate(&mut self, rate: u8) -> Result<()> {
        debug!("Setting rate to {}", rate);
        self.rate = Some(rate);

        let features = self.tts.supported_features();
        if !features.rate {
            warn!("Rate control not supported on this platform");
            return Ok(());
        }

        let converted_rate = self.convert_rate(rate);
        self.tts
            .set_rate(converted_rate)
            .map_err(|e| KairosError::Playback(format!("Failed to set rate: {}", e)))?;

        Ok(())
    }

    fn set_volume(&mut self, volume: u8) -> Result<()> {
        debug!("Setting volume to {}", volume);
        self.volume = Some(volume);

        let features = self.tts.supported_features();
        if !features.volume {
            warn!("Volume control not supported on this platform");
            return Ok(());
        }

        let converted_volume = self.convert_volume(volume);
        self.tts
            .set_volume(converted_volume)
            .map_err(|e| KairosError::Playback(format!("Failed to set volume: {}", e)))?;

        Ok(())
    }

    fn set_voice_idx(&mut self, idx: usize) -> Result<()> {
        debug!("Setting voice index to {}", idx);
        self.voice_idx = Some(idx);

        let voices = self
            .tts
            .voices()
            .map_err(|e| KairosError::Playback(format!("Failed to get voices: {}", e)))?;

        if let Some(voice) = voices.get(idx) {
            debug!("Selecting voice: {:?}", voice);
            self.tts
                .set_voice(voice)
                .map_err(|e| KairosError::Playback(format!("Failed to set voice: {}", e)))?;
        } else {
            warn!(
                "Voice index {} out of range (have {} voices)",
                idx,
                voices.len()
            );
        }

        Ok(())
    }

    fn speak(&mut self, text: &str) -> Result<()> {
        if text.is_empty() {
            return Ok(());
        }

        debug!("Speaking: {}", text);
        self.tts.speak(text, false).map_err(|e| {
            error!("Failed to speak: {}", e);
            KairosError::Playback(format!("Speak failed: {}", e))
        })?;

        Ok(())
    }

    fn is_speaking(&mut self) -> Result<bool> {
        let features = self.tts.supported_features();
        if !features.is_speaking {
            // No busy signal on this platform; report idle so the
            // worker moves on rather than spinning forever.
            return Ok(false);
        }

        self.tts
            .is_speaking()
            .map_err(|e| KairosError::Playback(format!("Busy query failed: {}", e)))
    }

    fn stop(&mut self) -> Result<()> {
        debug!("Stopping speech");

        let features = self.tts.supported_features();
        if !features.stop {
            warn!("Stop not supported on this platform");
            return Ok(());
        }

        self.tts.stop().map_err(|e| {
            error!("Failed to stop speech: {}", e);
            KairosError::Playback(format!("Stop failed: {}", e))
        })?;

        Ok(())
    }
}
