//! Playback dispatcher integration tests
//!
//! These drive the dispatcher with a scripted engine stand-in so ordering,
//! cancellation, and failure recovery are observable without audio
//! hardware. The scripted engine records every utterance it is handed,
//! can hold an utterance "speaking" until the test releases it, and can
//! fail on demand.

use kairos::sanitize::{Sanitizer, Utterance};
use kairos::speech::{Dispatcher, DrainMode, PlaybackEvent, SpeechParams, Synth};
use kairos::{KairosError, Result};
use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::time::Duration;

const EVENT_TIMEOUT: Duration = Duration::from_secs(5);

/// Scripted engine stand-in
///
/// Clones share state, so tests keep one clone as a handle while the
/// dispatcher's worker owns the other.
#[derive(Clone, Default)]
struct ScriptedSynth {
    /// Every text successfully handed to the engine, in order
    spoken: Arc<Mutex<Vec<String>>>,
    /// Texts that stay "speaking" until removed from this set
    held: Arc<Mutex<HashSet<String>>>,
    /// Texts whose speak() call fails
    failing: Arc<Mutex<HashSet<String>>>,
    /// Texts cut off by stop()
    stopped: Arc<Mutex<Vec<String>>>,
    /// Rates applied via set_rate, in order
    rates: Arc<Mutex<Vec<u8>>>,
    /// Text currently "speaking" (worker-side only)
    active: Option<String>,
}

impl ScriptedSynth {
    fn new() -> Self {
        Default::default()
    }

    fn hold(&self, text: &str) {
        self.held.lock().unwrap().insert(text.to_string());
    }

    fn release(&self, text: &str) {
        self.held.lock().unwrap().remove(text);
    }

    fn fail_on(&self, text: &str) {
        self.failing.lock().unwrap().insert(text.to_string());
    }

    fn spoken(&self) -> Vec<String> {
        self.spoken.lock().unwrap().clone()
    }

    fn stopped(&self) -> Vec<String> {
        self.stopped.lock().unwrap().clone()
    }

    fn rates(&self) -> Vec<u8> {
        self.rates.lock().unwrap().clone()
    }
}

impl Synth for ScriptedSynth {
    fn set_rate(&mut self, rate: u8) -> Result<()> {
        self.rates.lock().unwrap().push(rate);
        Ok(())
    }

    fn set_volume(&mut self, _volume: u8) -> Result<()> {
        Ok(())
    }

    fn set_voice_idx(&mut self, _idx: usize) -> Result<()> {
        Ok(())
    }

    fn speak(&mut self, text: &str) -> Result<()> {
        if self.failing.lock().unwrap().contains(text) {
            return Err(KairosError::Playback(format!(
                "scripted failure for '{}'",
                text
            )));
        }
        self.spoken.lock().unwrap().push(text.to_string());
        self.active = Some(text.to_string());
        Ok(())
    }

    fn is_speaking(&mut self) -> Result<bool> {
        match &self.active {
            None => Ok(false),
            Some(text) => {
                if self.held.lock().unwrap().contains(text) {
                    Ok(true)
                } else {
                    self.active = None;
                    Ok(false)
                }
            }
        }
    }

    fn stop(&mut self) -> Result<()> {
        if let Some(text) = self.active.take() {
            self.stopped.lock().unwrap().push(text);
        }
        Ok(())
    }
}

fn utter(text: &str) -> Utterance {
    Sanitizer::default()
        .sanitize(text)
        .expect("test text is valid")
}

fn spawn_scripted() -> (ScriptedSynth, Dispatcher) {
    let synth = ScriptedSynth::new();
    let handle = synth.clone();
    let dispatcher = Dispatcher::spawn(Box::new(synth), SpeechParams::default())
        .expect("worker thread spawns");
    (handle, dispatcher)
}

fn next_event(dispatcher: &Dispatcher) -> PlaybackEvent {
    dispatcher
        .recv_event_timeout(EVENT_TIMEOUT)
        .expect("event channel open")
        .expect("timed out waiting for playback event")
}

/// Block until `count` terminal events have arrived, returning them in order
fn collect_terminal(dispatcher: &Dispatcher, count: usize) -> Vec<PlaybackEvent> {
    let mut terminal = Vec::new();
    while terminal.len() < count {
        let event = next_event(dispatcher);
        if event.is_terminal() {
            terminal.push(event);
        }
    }
    terminal
}

/// Block until the engine reports it started on the given request
fn wait_for_started(dispatcher: &Dispatcher, id: u64) {
    loop {
        if let PlaybackEvent::Started { id: started } = next_event(dispatcher) {
            if started == id {
                return;
            }
        }
    }
}

#[test]
fn test_requests_play_in_submission_order() {
    let (handle, mut dispatcher) = spawn_scripted();

    for text in ["one", "two", "three"] {
        dispatcher.speak(utter(text)).unwrap();
    }

    let events = collect_terminal(&dispatcher, 3);
    assert!(events
        .iter()
        .all(|e| matches!(e, PlaybackEvent::Finished { .. })));
    assert_eq!(handle.spoken(), vec!["one", "two", "three"]);

    dispatcher.shutdown(DrainMode::Drain).unwrap();
}

#[test]
fn test_failure_does_not_block_later_requests() {
    let (handle, mut dispatcher) = spawn_scripted();
    handle.fail_on("boom");

    let first = dispatcher.speak(utter("before")).unwrap();
    let failing = dispatcher.speak(utter("boom")).unwrap();
    let last = dispatcher.speak(utter("after")).unwrap();

    let events = collect_terminal(&dispatcher, 3);
    assert!(matches!(events[0], PlaybackEvent::Finished { id } if id == first));
    match &events[1] {
        PlaybackEvent::Failed { id, error } => {
            assert_eq!(*id, failing);
            assert!(error.contains("scripted failure"));
        }
        other => panic!("expected Failed, got {:?}", other),
    }
    assert!(matches!(events[2], PlaybackEvent::Finished { id } if id == last));

    // The failed text was offered to the engine; the one after it still played
    assert_eq!(handle.spoken(), vec!["before", "after"]);

    dispatcher.shutdown(DrainMode::Drain).unwrap();
}

#[test]
fn test_cancelled_queued_request_never_reaches_engine() {
    let (handle, mut dispatcher) = spawn_scripted();
    handle.hold("first");

    let first = dispatcher.speak(utter("first")).unwrap();
    wait_for_started(&dispatcher, first);

    // Queued behind the held request
    let second = dispatcher.speak(utter("second")).unwrap();
    let third = dispatcher.speak(utter("third")).unwrap();

    dispatcher.cancel(second);
    handle.release("first");

    let events = collect_terminal(&dispatcher, 3);
    assert!(matches!(events[0], PlaybackEvent::Finished { id } if id == first));
    assert!(matches!(events[1], PlaybackEvent::Cancelled { id } if id == second));
    assert!(matches!(events[2], PlaybackEvent::Finished { id } if id == third));

    assert_eq!(handle.spoken(), vec!["first", "third"]);

    dispatcher.shutdown(DrainMode::Drain).unwrap();
}

#[test]
fn test_cancel_interrupts_request_in_flight() {
    let (handle, mut dispatcher) = spawn_scripted();
    handle.hold("ongoing");

    let id = dispatcher.speak(utter("ongoing")).unwrap();
    wait_for_started(&dispatcher, id);

    dispatcher.cancel(id);

    let events = collect_terminal(&dispatcher, 1);
    assert!(matches!(events[0], PlaybackEvent::Cancelled { id: c } if c == id));
    assert_eq!(handle.stopped(), vec!["ongoing"]);

    dispatcher.shutdown(DrainMode::Drain).unwrap();
}

#[test]
fn test_clear_cancels_queue_and_current() {
    let (handle, mut dispatcher) = spawn_scripted();
    handle.hold("alpha");

    let alpha = dispatcher.speak(utter("alpha")).unwrap();
    wait_for_started(&dispatcher, alpha);
    let beta = dispatcher.speak(utter("beta")).unwrap();
    let gamma = dispatcher.speak(utter("gamma")).unwrap();

    dispatcher.clear();

    let events = collect_terminal(&dispatcher, 3);
    assert!(matches!(events[0], PlaybackEvent::Cancelled { id } if id == alpha));
    assert!(matches!(events[1], PlaybackEvent::Cancelled { id } if id == beta));
    assert!(matches!(events[2], PlaybackEvent::Cancelled { id } if id == gamma));

    assert_eq!(handle.spoken(), vec!["alpha"]);

    dispatcher.shutdown(DrainMode::Drain).unwrap();
}

#[test]
fn test_drain_shutdown_plays_out_queue() {
    let (handle, mut dispatcher) = spawn_scripted();

    for text in ["one", "two", "three", "four", "five"] {
        dispatcher.speak(utter(text)).unwrap();
    }

    // Shutdown is queued behind the requests; drain plays them all
    dispatcher.shutdown(DrainMode::Drain).unwrap();

    assert_eq!(handle.spoken(), vec!["one", "two", "three", "four", "five"]);
}

#[test]
fn test_discard_shutdown_drops_queue() {
    let (handle, mut dispatcher) = spawn_scripted();
    handle.hold("busy");

    let busy = dispatcher.speak(utter("busy")).unwrap();
    wait_for_started(&dispatcher, busy);
    dispatcher.speak(utter("queued one")).unwrap();
    dispatcher.speak(utter("queued two")).unwrap();

    dispatcher.shutdown(DrainMode::Discard).unwrap();

    // Only the in-flight request ever reached the engine, and it was cut off
    assert_eq!(handle.spoken(), vec!["busy"]);
    assert_eq!(handle.stopped(), vec!["busy"]);
}

#[test]
fn test_params_applied_once_per_change() {
    let (handle, mut dispatcher) = spawn_scripted();

    let slow = SpeechParams {
        rate: 30,
        ..SpeechParams::default()
    };
    let fast = SpeechParams {
        rate: 70,
        ..SpeechParams::default()
    };

    dispatcher.speak_with(utter("one"), slow).unwrap();
    dispatcher.speak_with(utter("two"), slow).unwrap();
    dispatcher.speak_with(utter("three"), fast).unwrap();

    collect_terminal(&dispatcher, 3);
    assert_eq!(handle.rates(), vec![30, 70]);

    dispatcher.shutdown(DrainMode::Drain).unwrap();
}
