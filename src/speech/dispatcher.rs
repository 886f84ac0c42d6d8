//! Background playback dispatcher
//!
//! The dispatcher owns the speech engine on a dedicated worker thread;
//! callers only enqueue sanitized utterances and never touch engine state.
//! Requests play strictly in submission order, one at a time, and their
//! outcomes come back on an event channel. An engine failure is reported
//! and the worker moves on to the next request.

use crate::config::Config;
use crate::sanitize::Utterance;
use crate::speech::Synth;
use crate::{KairosError, Result};
use log::{debug, error, warn};
use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender, TryRecvError};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread;
use std::time::Duration;

/// How often the worker polls the engine's busy signal
const POLL_INTERVAL: Duration = Duration::from_millis(20);

/// Identifier assigned to each playback request, monotonically increasing
pub type RequestId = u64;

/// Playback parameters for one request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpeechParams {
    /// Speech rate (0-100)
    pub rate: u8,
    /// Speech volume (0-100)
    pub volume: u8,
    /// Voice index, when the user pinned one
    pub voice_idx: Option<usize>,
}

impl SpeechParams {
    /// Read playback defaults from the `[speech]` config section
    pub fn from_config(config: &Config) -> Self {
        Self {
            rate: config.rate(),
            volume: config.volume(),
            voice_idx: config.voice_idx(),
        }
    }
}

impl Default for SpeechParams {
    fn default() -> Self {
        Self {
            rate: 50,
            volume: 100,
            voice_idx: None,
        }
    }
}

/// One queued synthesis job
///
/// Built only from an [`Utterance`], so the text is sanitized by
/// construction. Owned exclusively by the worker once submitted.
#[derive(Debug)]
pub struct PlaybackRequest {
    id: RequestId,
    utterance: Utterance,
    params: SpeechParams,
    /// Queue generation at submission; `clear` bumps the live generation
    /// so everything queued before it is skipped
    generation: u64,
}

impl PlaybackRequest {
    pub fn id(&self) -> RequestId {
        self.id
    }

    pub fn utterance(&self) -> &Utterance {
        &self.utterance
    }
}

/// Outcome notifications reported by the worker
#[derive(Debug, Clone)]
pub enum PlaybackEvent {
    /// The engine started on this request
    Started { id: RequestId },
    /// Synthesis completed
    Finished { id: RequestId },
    /// Synthesis failed; the worker stays up for the next request
    Failed { id: RequestId, error: String },
    /// The request was cancelled before or during playback
    Cancelled { id: RequestId },
}

impl PlaybackEvent {
    /// The request this event refers to
    pub fn id(&self) -> RequestId {
        match self {
            PlaybackEvent::Started { id }
            | PlaybackEvent::Finished { id }
            | PlaybackEvent::Failed { id, .. }
            | PlaybackEvent::Cancelled { id } => *id,
        }
    }

    /// Is this the last event the request will produce?
    pub fn is_terminal(&self) -> bool {
        !matches!(self, PlaybackEvent::Started { .. })
    }
}

/// What to do with queued requests on shutdown
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrainMode {
    /// Play out everything already queued, then stop
    Drain,
    /// Drop queued requests and interrupt the current one
    Discard,
}

enum Job {
    Play(PlaybackRequest),
    Shutdown,
}

/// State shared between callers and the worker for cancellation
///
/// The job queue itself is the only synchronization point for playback
/// order; this block exists solely so cancels can reach requests that are
/// already queued or in flight.
struct Shared {
    /// Ids cancelled while queued; the worker removes and skips them
    cancelled: Mutex<HashSet<RequestId>>,
    /// Live queue generation; requests stamped with an older one are stale
    generation: AtomicU64,
    /// Id currently at the engine (0 = idle)
    current: AtomicU64,
    /// Id the worker should interrupt (0 = none)
    interrupt: AtomicU64,
}

impl Shared {
    fn new() -> Self {
        Self {
            cancelled: Mutex::new(HashSet::new()),
            generation: AtomicU64::new(0),
            current: AtomicU64::new(0),
            interrupt: AtomicU64::new(0),
        }
    }

    fn mark_cancelled(&self, id: RequestId) {
        self.cancelled
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id);
    }

    fn take_cancelled(&self, id: RequestId) -> bool {
        self.cancelled
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&id)
    }
}

/// Hands sanitized utterances to the engine without blocking the caller
///
/// Construction spawns the worker and moves the engine handle into it;
/// dropping the dispatcher (or calling [`Dispatcher::shutdown`]) joins the
/// worker and releases the handle.
pub struct Dispatcher {
    jobs: Sender<Job>,
    events: Receiver<PlaybackEvent>,
    shared: Arc<Shared>,
    defaults: SpeechParams,
    next_id: RequestId,
    worker: Option<thread::JoinHandle<()>>,
}

impl Dispatcher {
    /// Spawn the playback worker around an engine handle
    ///
    /// The handle is moved into the worker thread and never visible to
    /// callers again. Engine construction errors belong to the caller
    /// (`create_synth`), so a dispatcher that exists is ready to play.
    pub fn spawn(synth: Box<dyn Synth>, defaults: SpeechParams) -> Result<Self> {
        let (jobs_tx, jobs_rx) = mpsc::channel();
        let (events_tx, events_rx) = mpsc::channel();
        let shared = Arc::new(Shared::new());

        let worker_shared = Arc::clone(&shared);
        let worker = thread::Builder::new()
            .name("kairos-playback".to_string())
            .spawn(move || worker_loop(synth, jobs_rx, events_tx, worker_shared))?;

        Ok(Self {
            jobs: jobs_tx,
            events: events_rx,
            shared,
            defaults,
            next_id: 1,
            worker: Some(worker),
        })
    }

    /// Enqueue an utterance with the default parameters
    ///
    /// Returns immediately with the request id; the outcome arrives as a
    /// [`PlaybackEvent`].
    pub fn speak(&mut self, utterance: Utterance) -> Result<RequestId> {
        self.speak_with(utterance, self.defaults)
    }

    /// Enqueue an utterance with explicit parameters
    pub fn speak_with(&mut self, utterance: Utterance, params: SpeechParams) -> Result<RequestId> {
        let id = self.next_id;
        self.next_id += 1;

        let request = PlaybackRequest {
            id,
            utterance,
            params,
            generation: self.shared.generation.load(Ordering::SeqCst),
        };

        debug!("Enqueueing request {}", id);
        self.jobs
            .send(Job::Play(request))
            .map_err(|_| KairosError::Playback("Playback worker has shut down".to_string()))?;

        Ok(id)
    }

    /// Cancel one request
    ///
    /// A request still in the queue is guaranteed never to reach the
    /// engine. If it is already playing, the worker stops it best-effort;
    /// audio already handed to the device may trail off.
    pub fn cancel(&self, id: RequestId) {
        debug!("Cancelling request {}", id);
        self.shared.mark_cancelled(id);
        if self.shared.current.load(Ordering::SeqCst) == id {
            self.shared.interrupt.store(id, Ordering::SeqCst);
        }
    }

    /// Cancel everything: queued requests and the one in flight
    pub fn clear(&self) {
        debug!("Clearing playback queue");
        self.shared.generation.fetch_add(1, Ordering::SeqCst);
        let current = self.shared.current.load(Ordering::SeqCst);
        if current != 0 {
            self.shared.interrupt.store(current, Ordering::SeqCst);
        }
    }

    /// Next pending event, if one is ready
    pub fn try_recv_event(&self) -> Option<PlaybackEvent> {
        match self.events.try_recv() {
            Ok(event) => Some(event),
            Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => None,
        }
    }

    /// Block until the next event
    pub fn recv_event(&self) -> Result<PlaybackEvent> {
        self.events
            .recv()
            .map_err(|_| KairosError::Playback("Playback worker has shut down".to_string()))
    }

    /// Block for the next event, up to `timeout`
    ///
    /// `Ok(None)` means the timeout elapsed with the worker still alive.
    pub fn recv_event_timeout(&self, timeout: Duration) -> Result<Option<PlaybackEvent>> {
        match self.events.recv_timeout(timeout) {
            Ok(event) => Ok(Some(event)),
            Err(RecvTimeoutError::Timeout) => Ok(None),
            Err(RecvTimeoutError::Disconnected) => Err(KairosError::Playback(
                "Playback worker has shut down".to_string(),
            )),
        }
    }

    /// Stop the worker and release the engine handle
    pub fn shutdown(mut self, mode: DrainMode) -> Result<()> {
        debug!("Dispatcher shutdown ({:?})", mode);

        if mode == DrainMode::Discard {
            self.clear();
        }

        let _ = self.jobs.send(Job::Shutdown);
        if let Some(worker) = self.worker.take() {
            worker
                .join()
                .map_err(|_| KairosError::Playback("Playback worker panicked".to_string()))?;
        }

        Ok(())
    }
}

impl Drop for Dispatcher {
    fn drop(&mut self) {
        // Best-effort discard shutdown when the caller didn't do it
        if let Some(worker) = self.worker.take() {
            self.clear();
            let _ = self.jobs.send(Job::Shutdown);
            let _ = worker.join();
        }
    }
}

/// Worker thread: exclusive owner of the engine handle
fn worker_loop(
    mut synth: Box<dyn Synth>,
    jobs: Receiver<Job>,
    events: Sender<PlaybackEvent>,
    shared: Arc<Shared>,
) {
    debug!("Playback worker started");
    let mut last_params: Option<SpeechParams> = None;

    while let Ok(job) = jobs.recv() {
        let request = match job {
            Job::Play(request) => request,
            Job::Shutdown => break,
        };

        shared.current.store(request.id, Ordering::SeqCst);

        // Anything cancelled or cleared while queued never reaches the engine
        let stale = request.generation < shared.generation.load(Ordering::SeqCst);
        if stale || shared.take_cancelled(request.id) {
            debug!("Skipping cancelled request {}", request.id);
            shared.current.store(0, Ordering::SeqCst);
            let _ = events.send(PlaybackEvent::Cancelled { id: request.id });
            continue;
        }

        play_one(synth.as_mut(), &request, &events, &shared, &mut last_params);

        shared.current.store(0, Ordering::SeqCst);
        // Drop any cancel mark that raced the end of this request
        shared.take_cancelled(request.id);
    }

    if let Err(e) = synth.stop() {
        debug!("Engine stop on shutdown failed: {}", e);
    }
    debug!("Playback worker stopped");
}

/// Play a single request to completion, failure, or cancellation
///
/// Never propagates: every outcome becomes an event and the worker stays
/// ready for the next request.
fn play_one(
    synth: &mut dyn Synth,
    request: &PlaybackRequest,
    events: &Sender<PlaybackEvent>,
    shared: &Shared,
    last_params: &mut Option<SpeechParams>,
) {
    let id = request.id;
    let _ = events.send(PlaybackEvent::Started { id });

    if let Err(e) = apply_params(synth, &request.params, last_params) {
        error!("Request {}: failed to apply parameters: {}", id, e);
        let _ = events.send(PlaybackEvent::Failed {
            id,
            error: e.to_string(),
        });
        return;
    }

    if let Err(e) = synth.speak(request.utterance.text()) {
        error!("Request {}: {}", id, e);
        let _ = events.send(PlaybackEvent::Failed {
            id,
            error: e.to_string(),
        });
        return;
    }

    // Hold the queue until the engine goes idle; no two syntheses overlap
    loop {
        if shared.interrupt.swap(0, Ordering::SeqCst) == id {
            debug!("Interrupting request {}", id);
            if let Err(e) = synth.stop() {
                warn!("Request {}: stop failed: {}", id, e);
            }
            let _ = events.send(PlaybackEvent::Cancelled { id });
            return;
        }

        match synth.is_speaking() {
            Ok(false) => {
                debug!("Request {} finished", id);
                let _ = events.send(PlaybackEvent::Finished { id });
                return;
            }
            Ok(true) => thread::sleep(POLL_INTERVAL),
            Err(e) => {
                error!("Request {}: {}", id, e);
                let _ = events.send(PlaybackEvent::Failed {
                    id,
                    error: e.to_string(),
                });
                return;
            }
        }
    }
}

/// Push request parameters to the engine, skipping no-op reapplication
fn apply_params(
    synth: &mut dyn Synth,
    params: &SpeechParams,
    last_params: &mut Option<SpeechParams>,
) -> Result<()> {
    if last_params.as_ref() == Some(params) {
        return Ok(());
    }

    synth.set_rate(params.rate)?;
    synth.set_volume(params.volume)?;
    if let Some(idx) = params.voice_idx {
        synth.set_voice_idx(idx)?;
    }

    *last_params = Some(*params);
    Ok(())
}
