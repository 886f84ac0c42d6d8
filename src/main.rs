//! Kairos main entry point
//!
//! Reads a text buffer (file argument or stdin), sanitizes it line by
//! line, and plays it back through the speech engine. Synthesis runs on
//! the dispatcher's worker thread; this thread only enqueues requests and
//! collects their outcomes.

use kairos::config::Config;
use kairos::sanitize::Sanitizer;
use kairos::speech::{create_synth, Dispatcher, DrainMode, PlaybackEvent, SpeechParams};
use kairos::{KairosError, Result};
use log::{debug, error, info, warn};
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process;

/// Command line options
struct Options {
    debug: bool,
    rate: Option<u8>,
    volume: Option<u8>,
    file: Option<PathBuf>,
}

fn main() {
    let options = match parse_args() {
        Ok(options) => options,
        Err(e) => {
            eprintln!("Error: {}", e);
            print_usage();
            process::exit(1);
        }
    };

    // Initialize logger
    if options.debug {
        // Debug mode: write to kairos.log file
        use std::fs::OpenOptions;
        match OpenOptions::new()
            .create(true)
            .append(true)
            .open("kairos.log")
        {
            Ok(log_file) => {
                env_logger::Builder::new()
                    .filter_level(log::LevelFilter::Debug)
                    .target(env_logger::Target::Pipe(Box::new(log_file)))
                    .init();
            }
            Err(e) => {
                eprintln!(
                    "Warning: Failed to open kairos.log for debug logging: {}",
                    e
                );
                eprintln!("Continuing without file logging...");
                env_logger::Builder::new()
                    .filter_level(log::LevelFilter::Warn)
                    .init();
            }
        }

        info!(
            "Kairos version {} starting (debug mode, logging to kairos.log)",
            kairos::VERSION
        );
    } else {
        // Normal mode: minimal logging to stderr, only errors
        env_logger::Builder::from_default_env()
            .filter_level(log::LevelFilter::Error)
            .init();
    }

    // Run the application
    if let Err(e) = run(&options) {
        error!("Fatal error: {}", e);
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

fn run(options: &Options) -> Result<()> {
    debug!("Initializing Kairos");

    let config = Config::load()?;
    info!("Configuration loaded from {:?}", config.path());

    let sanitizer = Sanitizer::from_config(&config)?;

    let mut params = SpeechParams::from_config(&config);
    if let Some(rate) = options.rate {
        params.rate = rate;
    }
    if let Some(volume) = options.volume {
        params.volume = volume;
    }

    // Engine init failures abort here, before anything is queued
    let synth = create_synth(config.backend()?)?;
    info!("Speech synthesizer initialized");

    let mut dispatcher = Dispatcher::spawn(synth, params)?;

    let buffer = read_input(options.file.as_deref())?;

    // One request per non-blank line, in buffer order
    let mut submitted = 0usize;
    for line in buffer.lines() {
        if line.trim().is_empty() {
            continue;
        }
        match sanitizer.sanitize(line) {
            Ok(utterance) => {
                dispatcher.speak(utterance)?;
                submitted += 1;
            }
            Err(KairosError::InvalidInput(reason)) => {
                warn!("Skipping line: {}", reason);
            }
            Err(e) => return Err(e),
        }
    }

    if submitted == 0 {
        return Err(KairosError::InvalidInput(
            "Input buffer is empty".to_string(),
        ));
    }
    info!("Submitted {} utterances", submitted);

    // Collect one terminal event per request; failures are reported, not fatal
    let mut remaining = submitted;
    let mut failed = 0usize;
    while remaining > 0 {
        let event = dispatcher.recv_event()?;
        match event {
            PlaybackEvent::Started { id } => debug!("Request {} started", id),
            PlaybackEvent::Finished { id } => {
                debug!("Request {} finished", id);
                remaining -= 1;
            }
            PlaybackEvent::Cancelled { id } => {
                debug!("Request {} cancelled", id);
                remaining -= 1;
            }
            PlaybackEvent::Failed { id, error } => {
                eprintln!("kairos: request {} failed: {}", id, error);
                failed += 1;
                remaining -= 1;
            }
        }
    }

    dispatcher.shutdown(DrainMode::Drain)?;

    if failed == submitted {
        return Err(KairosError::Playback(
            "All playback requests failed".to_string(),
        ));
    }

    Ok(())
}

/// Read the input buffer from a file or stdin
fn read_input(file: Option<&Path>) -> Result<String> {
    match file {
        Some(path) => {
            debug!("Reading input from {:?}", path);
            Ok(std::fs::read_to_string(path)?)
        }
        None => {
            debug!("Reading input from stdin");
            let mut buffer = String::new();
            std::io::stdin().read_to_string(&mut buffer)?;
            Ok(buffer)
        }
    }
}

fn parse_args() -> Result<Options> {
    let mut options = Options {
        debug: false,
        rate: None,
        volume: None,
        file: None,
    };

    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--debug" | "-d" => options.debug = true,
            "--rate" => options.rate = Some(parse_level(args.next(), "--rate")?),
            "--volume" => options.volume = Some(parse_level(args.next(), "--volume")?),
            "--help" | "-h" => {
                print_usage();
                process::exit(0);
            }
            "--version" | "-V" => {
                println!("{} {}", kairos::APP_NAME, kairos::VERSION);
                process::exit(0);
            }
            other if other.starts_with('-') => {
                return Err(KairosError::Config(format!("Unknown option '{}'", other)));
            }
            other => {
                if options.file.is_some() {
                    return Err(KairosError::Config(
                        "Only one input file may be given".to_string(),
                    ));
                }
                options.file = Some(PathBuf::from(other));
            }
        }
    }

    Ok(options)
}

/// Parse a 0-100 flag value
fn parse_level(value: Option<String>, flag: &str) -> Result<u8> {
    let value =
        value.ok_or_else(|| KairosError::Config(format!("{} requires a value (0-100)", flag)))?;
    value
        .parse::<u8>()
        .ok()
        .filter(|&v| v <= 100)
        .ok_or_else(|| {
            KairosError::Config(format!("{} must be a number between 0 and 100", flag))
        })
}

fn print_usage() {
    println!("Usage: kairos [OPTIONS] [FILE]");
    println!();
    println!("Reads FILE (or stdin) aloud through the speech engine.");
    println!();
    println!("Options:");
    println!("  -d, --debug       Log debug output to kairos.log");
    println!("      --rate N      Speech rate, 0-100 (default from ~/.kairos.cfg)");
    println!("      --volume N    Speech volume, 0-100 (default from ~/.kairos.cfg)");
    println!("  -h, --help        Show this help");
    println!("  -V, --version     Show version");
}
