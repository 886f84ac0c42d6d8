//! Speech synthesis system

pub mod backends;
pub mod dispatcher;
pub mod synth;

pub use dispatcher::{
    Dispatcher, DrainMode, PlaybackEvent, PlaybackRequest, RequestId, SpeechParams,
};
pub use synth::{create_synth, BackendKind, Synth};
