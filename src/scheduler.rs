//! Acquisition scheduling.
//!
//! Two cadences run while a session is recording: a fixed-rate sampler tick
//! that pulls raw readings from the feed, and an operator-adjustable
//! frame-emission tick that reduces the buffered readings to one averaged
//! frame. Both run on a single background worker thread, so timer firings
//! and the re-arm decisions between them are naturally ordered; operator
//! transitions serialize on the session mutex, which means a firing that
//! races a pause observes the post-transition state and becomes a no-op.
//!
//! The emission timer is armed only while Recording. Pause, stop, and feed
//! disconnect disarm it and discard the partially accumulated buffer, so
//! resuming starts a fresh averaging window a full period after the resume
//! instant, with no catch-up firings and no blended pre/post-pause frames.

use crate::core::aggregate::FrameAggregator;
use crate::core::frame::{Frame, FrameDraft};
use crate::session::metadata::{MetadataDraft, SessionMetadata};
use crate::session::recording::{RecordingSession, SessionError, SessionState, StopDecision};
use crate::source::SampleSource;
use chrono::Utc;
use crossbeam_channel::{bounded, Receiver, Sender};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{debug, info, warn};

/// Fixed raw-sampling cadence. Not operator-adjustable.
pub const SAMPLE_PERIOD_MS: u64 = 50;

/// Lower bound of the operator-adjustable frame period.
pub const MIN_FRAME_PERIOD_MS: u64 = 20;

/// Upper bound of the operator-adjustable frame period.
pub const MAX_FRAME_PERIOD_MS: u64 = 5000;

/// Default frame period (matches the sampler cadence, 20 Hz).
pub const DEFAULT_FRAME_PERIOD_MS: u64 = 50;

/// Frames buffered on the stream before the slowest consumer drops copies.
const FRAME_STREAM_CAPACITY: usize = 1024;

/// Errors from scheduler configuration.
#[derive(Debug, Error, PartialEq)]
pub enum SchedulerError {
    #[error(
        "frame period {0} ms outside the allowed \
         {MIN_FRAME_PERIOD_MS}..={MAX_FRAME_PERIOD_MS} ms range"
    )]
    PeriodOutOfRange(u64),
}

/// State shared between the operator-facing API and the worker thread.
struct Shared {
    session: Mutex<RecordingSession>,
    aggregator: Mutex<FrameAggregator>,
    /// Current frame period; read at each firing, so live changes take
    /// effect at the next frame boundary.
    period_ms: AtomicU64,
    /// Whether the feed yielded a sample on the last tick.
    connected: AtomicBool,
    running: AtomicBool,
    /// Instant to arm the emission timer from, set on start and resume.
    arm_from: Mutex<Option<Instant>>,
}

/// Recover the guard even if a panicking thread poisoned the mutex; the
/// protected state stays consistent because every critical section finishes
/// its mutation before any fallible call.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Coordinates the sampler and frame-emission cadences over one session.
///
/// Owns the sample feed, the session, and the aggregator; emitted frames are
/// appended to the session and also published on a bounded stream for live
/// displays.
pub struct AcquisitionScheduler {
    shared: Arc<Shared>,
    frame_rx: Receiver<Frame>,
    worker: Option<JoinHandle<()>>,
}

impl AcquisitionScheduler {
    /// Spawn the worker thread over the given feed, session, and aggregator.
    pub fn new(
        source: Box<dyn SampleSource>,
        session: RecordingSession,
        aggregator: FrameAggregator,
        frame_period_ms: u64,
    ) -> Result<Self, SchedulerError> {
        validate_period(frame_period_ms)?;

        let shared = Arc::new(Shared {
            session: Mutex::new(session),
            aggregator: Mutex::new(aggregator),
            period_ms: AtomicU64::new(frame_period_ms),
            connected: AtomicBool::new(false),
            running: AtomicBool::new(true),
            arm_from: Mutex::new(None),
        });

        let (frame_tx, frame_rx) = bounded(FRAME_STREAM_CAPACITY);
        let worker_shared = shared.clone();
        let worker = thread::spawn(move || run_worker(source, worker_shared, frame_tx));

        Ok(Self {
            shared,
            frame_rx,
            worker: Some(worker),
        })
    }

    // ── Operator transitions ─────────────────────────────────────────

    /// Start a new session and arm the emission timer.
    pub fn start_session(&self, draft: MetadataDraft) -> Result<SessionMetadata, SessionError> {
        let mut session = lock(&self.shared.session);
        let metadata = session.start(draft)?.clone();
        lock(&self.shared.aggregator).discard();
        *lock(&self.shared.arm_from) = Some(Instant::now());
        info!(session_id = %metadata.session_id, "session started");
        Ok(metadata)
    }

    /// Pause recording: the emission timer is disarmed and the partial
    /// averaging window is discarded, not flushed as a short frame.
    pub fn pause(&self) -> Result<(), SessionError> {
        let mut session = lock(&self.shared.session);
        session.pause()?;
        lock(&self.shared.aggregator).discard();
        *lock(&self.shared.arm_from) = None;
        info!("recording paused");
        Ok(())
    }

    /// Resume recording; the next frame fires a full period from now.
    pub fn resume(&self) -> Result<(), SessionError> {
        let mut session = lock(&self.shared.session);
        session.resume()?;
        *lock(&self.shared.arm_from) = Some(Instant::now());
        info!("recording resumed");
        Ok(())
    }

    /// Close the session with the operator's decision.
    pub fn stop(&self, decision: StopDecision) -> Result<(), SessionError> {
        let mut session = lock(&self.shared.session);
        session.stop(decision)?;
        lock(&self.shared.aggregator).discard();
        *lock(&self.shared.arm_from) = None;
        info!(?decision, frames = session.frame_count(), "session stopped");
        Ok(())
    }

    // ── Configuration and queries ────────────────────────────────────

    /// Change the frame period. Takes effect at the next frame boundary
    /// without restarting the pipeline.
    pub fn set_frame_period(&self, period_ms: u64) -> Result<(), SchedulerError> {
        validate_period(period_ms)?;
        self.shared.period_ms.store(period_ms, Ordering::SeqCst);
        debug!(period_ms, "frame period changed");
        Ok(())
    }

    pub fn frame_period_ms(&self) -> u64 {
        self.shared.period_ms.load(Ordering::SeqCst)
    }

    /// Stream of emitted frames, for live displays.
    pub fn frames(&self) -> &Receiver<Frame> {
        &self.frame_rx
    }

    /// Whether the feed yielded a sample on its most recent tick.
    pub fn is_connected(&self) -> bool {
        self.shared.connected.load(Ordering::SeqCst)
    }

    pub fn session_state(&self) -> SessionState {
        lock(&self.shared.session).state()
    }

    /// Read the session under its lock.
    pub fn with_session<R>(&self, f: impl FnOnce(&RecordingSession) -> R) -> R {
        f(&lock(&self.shared.session))
    }

    /// Stop the worker thread. Idempotent; also runs on drop.
    pub fn shutdown(&mut self) {
        self.shared.running.store(false, Ordering::SeqCst);
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}

impl Drop for AcquisitionScheduler {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn validate_period(period_ms: u64) -> Result<(), SchedulerError> {
    if (MIN_FRAME_PERIOD_MS..=MAX_FRAME_PERIOD_MS).contains(&period_ms) {
        Ok(())
    } else {
        Err(SchedulerError::PeriodOutOfRange(period_ms))
    }
}

/// Worker loop: one thread drives both cadences.
fn run_worker(mut source: Box<dyn SampleSource>, shared: Arc<Shared>, frame_tx: Sender<Frame>) {
    let sample_period = Duration::from_millis(SAMPLE_PERIOD_MS);
    let mut next_sample_at = Instant::now();
    // None while the emission timer is disarmed.
    let mut next_frame_at: Option<Instant> = None;
    let mut frames_emitted: u64 = 0;

    while shared.running.load(Ordering::SeqCst) {
        let now = Instant::now();

        if now >= next_sample_at {
            sampler_tick(&mut source, &shared, &mut next_frame_at);
            next_sample_at += sample_period;
            if next_sample_at < now {
                // Fell behind (system sleep, debugger); realign instead of
                // firing a catch-up burst.
                next_sample_at = now + sample_period;
            }
        }

        emitter_tick(
            source.as_ref(),
            &shared,
            &frame_tx,
            now,
            &mut next_frame_at,
            &mut frames_emitted,
        );

        sleep_until_next(now, next_sample_at, next_frame_at);
    }
}

/// Pull one reading from the feed; push it only while Recording. A feed
/// that yields nothing is treated as pause-equivalent: the session stays
/// open, the timer disarms, the partial window is dropped.
fn sampler_tick(
    source: &mut Box<dyn SampleSource>,
    shared: &Shared,
    next_frame_at: &mut Option<Instant>,
) {
    match source.sample() {
        Some(sample) => {
            if !shared.connected.swap(true, Ordering::SeqCst) {
                info!("sample feed connected");
            }
            let session = lock(&shared.session);
            if session.is_recording() {
                lock(&shared.aggregator).push(sample);
            }
        }
        None => {
            let was_connected = shared.connected.swap(false, Ordering::SeqCst);
            let mut session = lock(&shared.session);
            if session.is_recording() {
                if session.pause().is_ok() {
                    lock(&shared.aggregator).discard();
                    *next_frame_at = None;
                    warn!("sample feed disconnected; recording paused");
                }
            } else if was_connected {
                debug!("sample feed disconnected");
            }
        }
    }
}

/// Arm, fire, or disarm the frame-emission timer.
///
/// The re-arm decision, not the firing itself, is contingent on session
/// state: a firing that was due before a pause landed simply finds the
/// session no longer Recording and disarms without appending.
fn emitter_tick(
    source: &dyn SampleSource,
    shared: &Shared,
    frame_tx: &Sender<Frame>,
    now: Instant,
    next_frame_at: &mut Option<Instant>,
    frames_emitted: &mut u64,
) {
    let mut session = lock(&shared.session);
    if !session.is_recording() {
        *next_frame_at = None;
        return;
    }

    // A pending start/resume instant supersedes whatever deadline is armed.
    // A pause..resume pair can complete between two worker iterations, so
    // the worker never observes Paused; without this, the pre-pause deadline
    // would fire a shortened window.
    if let Some(base) = lock(&shared.arm_from).take() {
        let period = Duration::from_millis(shared.period_ms.load(Ordering::SeqCst));
        *next_frame_at = Some(base + period);
    }

    match *next_frame_at {
        None => {
            // Recording with no transition instant recorded; arm a full
            // period from now.
            let period = Duration::from_millis(shared.period_ms.load(Ordering::SeqCst));
            *next_frame_at = Some(now + period);
        }
        Some(deadline) if now >= deadline => {
            let (channels, samples_averaged) = lock(&shared.aggregator).drain();
            let period_ms = shared.period_ms.load(Ordering::SeqCst);
            let draft = FrameDraft {
                timestamp: Utc::now(),
                channels,
                orientation: source.orientation(),
                pattern_tag: source.pattern_tag(),
                period_ms: period_ms as u32,
                samples_averaged,
            };
            let appended = session.append_frame(draft).map(Frame::clone);
            drop(session);

            match appended {
                Ok(frame) => {
                    *frames_emitted += 1;
                    if *frames_emitted % 10 == 0 {
                        debug!(
                            frames = *frames_emitted,
                            samples_averaged, period_ms, "frame captured"
                        );
                    }
                    if frame_tx.try_send(frame).is_err() {
                        // Stream consumer fell behind; the session still
                        // holds the frame, only the live copy is dropped.
                        warn!("frame stream full; dropping live copy");
                    }
                }
                Err(error) => warn!(%error, "frame append rejected"),
            }

            // Re-arm from the old deadline using the period in force now,
            // so a live period change applies at the next boundary.
            let period = Duration::from_millis(shared.period_ms.load(Ordering::SeqCst));
            let mut next = deadline + period;
            if next <= now {
                next = now + period;
            }
            *next_frame_at = Some(next);
        }
        Some(_) => {}
    }
}

/// Sleep until the earliest upcoming deadline, capped so operator
/// transitions are noticed promptly.
fn sleep_until_next(now: Instant, next_sample_at: Instant, next_frame_at: Option<Instant>) {
    let mut deadline = next_sample_at;
    if let Some(frame_at) = next_frame_at {
        if frame_at < deadline {
            deadline = frame_at;
        }
    }
    let wait = deadline
        .saturating_duration_since(now)
        .min(Duration::from_millis(10));
    if wait.is_zero() {
        thread::yield_now();
    } else {
        thread::sleep(wait);
    }
}
