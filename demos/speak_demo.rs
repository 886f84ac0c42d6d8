//! Demo program for end-to-end speech playback
//!
//! Run with: cargo run --example speak_demo

use kairos::sanitize::Sanitizer;
use kairos::speech::{create_synth, BackendKind, Dispatcher, DrainMode, SpeechParams};

fn main() {
    env_logger::init();

    println!("Creating synthesizer...");
    let synth = match create_synth(BackendKind::Auto) {
        Ok(s) => {
            println!("✓ Synthesizer created successfully");
            s
        }
        Err(e) => {
            eprintln!("✗ Failed to create synthesizer: {}", e);
            std::process::exit(1);
        }
    };

    let mut dispatcher = match Dispatcher::spawn(synth, SpeechParams::default()) {
        Ok(d) => d,
        Err(e) => {
            eprintln!("✗ Failed to start playback worker: {}", e);
            std::process::exit(1);
        }
    };

    let sanitizer = Sanitizer::default();

    println!("\nQueueing utterances at different rates...");
    let phrases = [
        (25, "This is slow speech"),
        (75, "This is fast speech"),
        (50, "Back to normal. Sanitized input only: $(this) |never| <reaches> the engine raw."),
    ];

    for (rate, phrase) in phrases {
        let utterance = sanitizer.sanitize(phrase).expect("demo phrases are valid");
        let params = SpeechParams {
            rate,
            ..SpeechParams::default()
        };
        match dispatcher.speak_with(utterance, params) {
            Ok(id) => println!("  queued request {} at rate {}", id, rate),
            Err(e) => eprintln!("  ✗ enqueue failed: {}", e),
        }
    }

    println!("\nWaiting for playback to finish...");
    let mut remaining = phrases.len();
    while remaining > 0 {
        match dispatcher.recv_event() {
            Ok(event) => {
                println!("  event: {:?}", event);
                if event.is_terminal() {
                    remaining -= 1;
                }
            }
            Err(e) => {
                eprintln!("✗ Event channel closed: {}", e);
                break;
            }
        }
    }

    if let Err(e) = dispatcher.shutdown(DrainMode::Drain) {
        eprintln!("✗ Shutdown failed: {}", e);
        std::process::exit(1);
    }

    println!("\n✓ Demo complete");
}
