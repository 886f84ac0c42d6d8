//! espeak-ng backend over PulseAudio
//!
//! Speaks by spawning one espeak-ng process per utterance. Designed for
//! WSL with WSLg, where audio reaches Windows through the WSLg PulseAudio
//! bridge; also works on native Linux with a running PulseAudio server.
//!
//! Dependencies:
//! - espeak-ng (install with: sudo apt install espeak-ng)
//! - PulseAudio client libraries (usually pre-installed with WSLG)

use crate::platform::{is_wsl, wslg_pulse_server};
use crate::speech::Synth;
use crate::{KairosError, Result};
use log::{debug, error, info, warn};
use std::process::{Child, Command, Stdio};

/// espeak-ng synthesizer backend
pub struct EspeakSynth {
    /// Currently running espeak-ng process, if any
    current_process: Option<Child>,

    /// Cached rate setting (0-100)
    rate: u8,

    /// Cached volume setting (0-100)
    volume: u8,

    /// Voice name for espeak-ng
    voice: String,

    /// Path to espeak-ng
    espeak_path: String,
}

impl EspeakSynth {
    /// Setup PulseAudio server environment
    ///
    /// Auto-detects the WSLg PulseAudio server and sets PULSE_SERVER if
    /// needed. On native Linux the default socket is left alone.
    fn setup_pulseaudio() -> Result<()> {
        if std::env::var("PULSE_SERVER").is_ok() {
            debug!("PULSE_SERVER already set via environment");
            return Ok(());
        }

        if let Some(server) = wslg_pulse_server() {
            info!("Auto-detected WSLg PulseAudio server at {:?}", server);
            std::env::set_var("PULSE_SERVER", &server);
            return Ok(());
        }

        if is_wsl() {
            warn!("WSLg PulseAudio server not found");
            warn!("Make sure WSLg is installed and running");
            warn!("You can also set the PULSE_SERVER environment variable:");
            warn!("  export PULSE_SERVER=/path/to/pulseaudio");
            return Err(KairosError::EngineInit(
                "PulseAudio server not found. Install WSLg or set PULSE_SERVER environment variable."
                    .to_string(),
            ));
        }

        debug!("Running on native Linux - PulseAudio will use default configuration");
        Ok(())
    }

    /// Create a new espeak-ng synthesizer
    ///
    /// Verifies espeak-ng and PulseAudio are available
    pub fn new() -> Result<Self> {
        debug!("Creating espeak-ng backend");

        Self::setup_pulseaudio()?;

        let espeak_path = Self::find_espeak()?;
        debug!("Found espeak-ng at: {}", espeak_path);

        Ok(Self {
            current_process: None,
            rate: 50,
            volume: 100,
            voice: "en".to_string(),
            espeak_path,
        })
    }

    /// Find espeak-ng executable
    fn find_espeak() -> Result<String> {
        let paths = vec!["espeak-ng", "/usr/bin/espeak-ng"];

        for path in paths {
            if let Ok(status) = Command::new(path)
                .arg("--version")
                .stdout(Stdio::null())
                .stderr(Stdio::null())
                .status()
            {
                if status.success() {
                    return Ok(path.to_string());
                }
            }
        }

        Err(KairosError::EngineInit(
            "espeak-ng not found. Install with: sudo apt install espeak-ng".to_string(),
        ))
    }

    /// Convert Kairos rate (0-100) to espeak speed (80-450 wpm)
    fn rate_to_espeak_speed(rate: u8) -> u16 {
        // 0 = 80 wpm (very slow), 50 = 265 wpm, 100 = 450 wpm
        80 + ((rate as u16) * 370 / 100)
    }

    /// Convert Kairos volume (0-100) to espeak amplitude (0-200)
    fn volume_to_espeak_amplitude(volume: u8) -> u8 {
        ((volume as u16 * 200) / 100) as u8
    }

    /// Get voice name by index
    fn get_voice_by_idx(idx: usize) -> &'static str {
        const VOICES: &[&str] = &[
            "en",    // 0: Default English
            "en-us", // 1: US English
            "en-gb", // 2: British English
            "en-sc", // 3: Scottish English
            "es",    // 4: Spanish
            "fr",    // 5: French
            "de",    // 6: German
            "it",    // 7: Italian
            "pt",    // 8: Portuguese
            "ru",    // 9: Russian
        ];

        VOICES.get(idx).unwrap_or(&"en")
    }

    /// Kill any currently running espeak-ng process
    fn kill_current(&mut self) {
        if let Some(mut child) = self.current_process.take() {
            debug!("Killing espeak-ng process");
            match child.kill() {
                Ok(_) => {
                    let _ = child.wait(); // Clean up zombie
                }
                Err(e) => {
                    debug!("Failed to kill espeak-ng process: {}", e);
                }
            }
        }
    }
}

impl Synth for EspeakSynth {
    fn set_rate(&mut self, rate: u8) -> Result<()> {
        debug!("Setting rate to {}", rate);
        self.rate = rate;
        Ok(())
    }

    fn set_volume(&mut self, volume: u8) -> Result<()> {
        debug!("Setting volume to {}", volume);
        self.volume = volume;
        Ok(())
    }

    fn set_voice_idx(&mut self, idx: usize) -> Result<()> {
        let voice = Self::get_voice_by_idx(idx);
        debug!("Setting voice to {} (index {})", voice, idx);
        self.voice = voice.to_string();
        Ok(())
    }

    fn speak(&mut self, text: &str) -> Result<()> {
        if text.is_empty() {
            return Ok(());
        }

        // One utterance at a time on the audio device
        self.kill_current();

        let speed = Self::rate_to_espeak_speed(self.rate);
        let amplitude = Self::volume_to_espeak_amplitude(self.volume);

        let mut cmd = Command::new(&self.espeak_path);
        cmd.arg("-v").arg(&self.voice);
        cmd.arg("-s").arg(speed.to_string());
        cmd.arg("-a").arg(amplitude.to_string());
        cmd.arg(text);

        // PULSE_SERVER was exported in new() and is inherited here
        cmd.stdout(Stdio::null());
        cmd.stderr(Stdio::null());

        debug!("Speaking: {}", text);
        match cmd.spawn() {
            Ok(child) => {
                self.current_process = Some(child);
                debug!("espeak-ng process started");
                Ok(())
            }
            Err(e) => {
                error!("Failed to spawn espeak-ng: {}", e);
                Err(KairosError::Playback(format!(
                    "Failed to start espeak-ng: {}",
                    e
                )))
            }
        }
    }

    fn is_speaking(&mut self) -> Result<bool> {
        match self.current_process.as_mut() {
            None => Ok(false),
            Some(child) => match child.try_wait() {
                Ok(Some(status)) => {
                    debug!("espeak-ng exited with {}", status);
                    self.current_process = None;
                    if status.success() {
                        Ok(false)
                    } else {
                        Err(KairosError::Playback(format!(
                            "espeak-ng exited with {}",
                            status
                        )))
                    }
                }
                Ok(None) => Ok(true),
                Err(e) => {
                    self.current_process = None;
                    Err(KairosError::Playback(format!(
                        "Failed to poll espeak-ng: {}",
                        e
                    )))
                }
            },
        }
    }

    fn stop(&mut self) -> Result<()> {
        debug!("Stopping speech");
        self.kill_current();
        Ok(())
    }
}

impl Drop for EspeakSynth {
    fn drop(&mut self) {
        debug!("Shutting down espeak-ng backend");
        self.kill_current();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rate_conversion() {
        assert_eq!(EspeakSynth::rate_to_espeak_speed(0), 80); // Slowest
        assert_eq!(EspeakSynth::rate_to_espeak_speed(50), 265); // Normal
        assert_eq!(EspeakSynth::rate_to_espeak_speed(100), 450); // Fastest
    }

    #[test]
    fn test_volume_conversion() {
        assert_eq!(EspeakSynth::volume_to_espeak_amplitude(0), 0);
        assert_eq!(EspeakSynth::volume_to_espeak_amplitude(50), 100);
        assert_eq!(EspeakSynth::volume_to_espeak_amplitude(100), 200);
    }

    #[test]
    fn test_voice_selection() {
        assert_eq!(EspeakSynth::get_voice_by_idx(0), "en");
        assert_eq!(EspeakSynth::get_voice_by_idx(1), "en-us");
        assert_eq!(EspeakSynth::get_voice_by_idx(2), "en-gb");
        assert_eq!(EspeakSynth::get_voice_by_idx(999), "en"); // Out of range defaults to en
    }

    #[test]
    fn test_create_espeak_synth() {
        match EspeakSynth::new() {
            Ok(_) => println!("✓ espeak-ng backend available"),
            Err(e) => println!("⚠ espeak-ng backend not available: {}", e),
        }
    }
}
