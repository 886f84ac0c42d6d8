//! Speech engine backends

// Native TTS backend using the tts crate (cross-platform)
pub mod native;

// espeak-ng over PulseAudio, for WSL/WSLG and bare Linux setups
pub mod espeak;
