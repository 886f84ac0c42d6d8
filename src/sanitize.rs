//! Input sanitization
//!
//! Everything spoken by Kairos passes through here first. The engine is an
//! external process/library, so input is restricted to an allow-listed
//! character envelope before it can become a playback request: word
//! characters, whitespace, and basic sentence punctuation. Control bytes,
//! shell metacharacters, and anything else an engine might misread as a
//! command are stripped.

use crate::config::Config;
use crate::{KairosError, Result};
use once_cell::sync::Lazy;
use regex::Regex;

/// Matches every character outside the allow-list.
///
/// The envelope is word characters (Unicode-aware), whitespace, and
/// `. , ! ? -`. Anything matched here is removed from the input.
static DISALLOWED: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^\w\s.,!?-]").expect("disallowed-character pattern is valid"));

/// Default maximum utterance length, in characters
pub const DEFAULT_MAX_LENGTH: usize = 4096;

/// How input longer than the configured maximum is handled
///
/// The policy is explicit configuration, never an implicit middle ground:
/// either the text is rejected outright or it is cut at the limit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverflowPolicy {
    /// Fail with `InvalidInput`
    Reject,
    /// Keep the first `max_length` characters, cut on a char boundary
    Truncate,
}

impl OverflowPolicy {
    /// Parse a config value (`reject` / `truncate`)
    pub fn parse(value: &str) -> Result<Self> {
        match value {
            "reject" => Ok(OverflowPolicy::Reject),
            "truncate" => Ok(OverflowPolicy::Truncate),
            other => Err(KairosError::Config(format!(
                "Unknown overflow policy '{}' (expected 'reject' or 'truncate')",
                other
            ))),
        }
    }
}

/// A unit of text cleared for speech synthesis
///
/// The only way to obtain one is [`Sanitizer::sanitize`], so holding an
/// `Utterance` proves the text already passed the character and length
/// checks. Playback requests are built from these, never from raw strings.
#[derive(Debug, Clone)]
pub struct Utterance {
    raw: String,
    text: String,
}

impl Utterance {
    /// The sanitized text that will be handed to the engine
    pub fn text(&self) -> &str {
        &self.text
    }

    /// The original input, kept for reporting
    pub fn raw(&self) -> &str {
        &self.raw
    }
}

/// Validates and cleans input text before it may reach the engine
///
/// Pure: no I/O, no shared state. Construction captures the length policy
/// from configuration so callers cannot apply it inconsistently.
#[derive(Debug, Clone)]
pub struct Sanitizer {
    max_length: usize,
    overflow: OverflowPolicy,
}

impl Sanitizer {
    pub fn new(max_length: usize, overflow: OverflowPolicy) -> Self {
        Self {
            max_length,
            overflow,
        }
    }

    /// Build a sanitizer from the `[input]` section of the config
    pub fn from_config(config: &Config) -> Result<Self> {
        Ok(Self::new(config.max_length(), config.overflow()?))
    }

    /// Sanitize raw input into an [`Utterance`]
    ///
    /// Strips disallowed characters, rejects text that is empty (or
    /// whitespace-only) after stripping, and applies the overflow policy.
    /// Text already inside the envelope and under the limit passes through
    /// unchanged.
    pub fn sanitize(&self, raw: &str) -> Result<Utterance> {
        let cleaned = DISALLOWED.replace_all(raw, "");

        if cleaned.trim().is_empty() {
            return Err(KairosError::InvalidInput(
                "Input is empty after sanitization".to_string(),
            ));
        }

        let text = self.apply_length_policy(cleaned.as_ref())?;
        if text.trim().is_empty() {
            return Err(KairosError::InvalidInput(
                "Input is empty after truncation".to_string(),
            ));
        }

        Ok(Utterance {
            raw: raw.to_string(),
            text,
        })
    }

    /// Enforce the configured maximum length, in characters
    fn apply_length_policy(&self, cleaned: &str) -> Result<String> {
        let mut chars = cleaned.char_indices();
        let cut = chars.nth(self.max_length).map(|(idx, _)| idx);

        match cut {
            None => Ok(cleaned.to_string()),
            Some(idx) => match self.overflow {
                OverflowPolicy::Reject => Err(KairosError::InvalidInput(format!(
                    "Input exceeds maximum length of {} characters",
                    self.max_length
                ))),
                OverflowPolicy::Truncate => Ok(cleaned[..idx].to_string()),
            },
        }
    }
}

impl Default for Sanitizer {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_LENGTH, OverflowPolicy::Reject)
    }
}
