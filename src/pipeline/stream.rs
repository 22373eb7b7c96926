//! Streaming mode: bounded cadence, single in-flight frame, smoothing.
//!
//! Frames that arrive before `min_interval` has elapsed since the last
//! admitted frame, or while a frame is still being processed, are dropped.
//! Nothing is ever queued; the next admitted frame is the newest one.

use crate::detection::DetectionSet;
use crate::pipeline::{DetectionPipeline, Frame, FrameStats, SessionTotals, StreamConfig};
use crate::stabilize::TemporalStabilizer;
use crate::trace::trace_event;
use crate::util::{DetectError, DetectResult};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

/// Why a streaming tick did not run the pipeline.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SkipReason {
    /// The cadence interval has not elapsed since the last admitted frame.
    TooSoon,
    /// The previous frame is still being processed.
    InFlight,
}

/// Admission control for streaming frames.
///
/// Shareable across threads: a camera callback can call
/// [`FrameThrottle::try_acquire`] and hand the guard to the worker that owns
/// the [`StreamSession`]. At most one guard exists at a time.
#[derive(Debug)]
pub struct FrameThrottle {
    min_interval: Duration,
    last_start: Mutex<Option<Instant>>,
    in_flight: AtomicBool,
    skipped_too_soon: AtomicU64,
    skipped_in_flight: AtomicU64,
}

impl FrameThrottle {
    /// Creates a throttle admitting at most one frame per `min_interval`.
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            last_start: Mutex::new(None),
            in_flight: AtomicBool::new(false),
            skipped_too_soon: AtomicU64::new(0),
            skipped_in_flight: AtomicU64::new(0),
        }
    }

    /// Returns the minimum interval between admitted frames.
    pub fn min_interval(&self) -> Duration {
        self.min_interval
    }

    /// Returns true while a guard is alive.
    pub fn is_in_flight(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    fn last_start(&self) -> MutexGuard<'_, Option<Instant>> {
        self.last_start
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Admits a frame arriving at `now`, or says why it is dropped.
    pub fn try_acquire(self: &Arc<Self>, now: Instant) -> Result<InFlightGuard, SkipReason> {
        if self
            .in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            self.skipped_in_flight.fetch_add(1, Ordering::Relaxed);
            return Err(SkipReason::InFlight);
        }

        {
            let mut last = self.last_start();
            if let Some(previous) = *last {
                if now.saturating_duration_since(previous) < self.min_interval {
                    drop(last);
                    self.in_flight.store(false, Ordering::Release);
                    self.skipped_too_soon.fetch_add(1, Ordering::Relaxed);
                    return Err(SkipReason::TooSoon);
                }
            }
            *last = Some(now);
        }

        Ok(InFlightGuard {
            throttle: Arc::clone(self),
        })
    }

    /// Forgets the last admitted frame so the next one is admitted at once.
    pub fn reset(&self) {
        *self.last_start() = None;
    }

    /// Returns `(too_soon, in_flight)` skip counts.
    pub fn skipped(&self) -> (u64, u64) {
        (
            self.skipped_too_soon.load(Ordering::Relaxed),
            self.skipped_in_flight.load(Ordering::Relaxed),
        )
    }
}

/// Proof that a frame was admitted; releases the in-flight flag on drop.
#[derive(Debug)]
pub struct InFlightGuard {
    throttle: Arc<FrameThrottle>,
}

impl InFlightGuard {
    fn belongs_to(&self, throttle: &Arc<FrameThrottle>) -> bool {
        Arc::ptr_eq(&self.throttle, throttle)
    }
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.throttle.in_flight.store(false, Ordering::Release);
    }
}

/// Result of offering one frame to a streaming session.
#[derive(Clone, Debug, PartialEq)]
pub enum StreamOutcome {
    /// The frame ran; `detections` are smoothed when labels were stable.
    Processed {
        detections: DetectionSet,
        stats: FrameStats,
    },
    /// The frame was dropped.
    Skipped(SkipReason),
}

/// Streaming wrapper owning a pipeline, a throttle and the stabilizer.
///
/// The stabilizer is only reached through an admitted frame, and only one
/// frame is admitted at a time, so its state needs no lock.
#[derive(Debug)]
pub struct StreamSession {
    pipeline: DetectionPipeline,
    throttle: Arc<FrameThrottle>,
    stabilizer: TemporalStabilizer,
    totals: SessionTotals,
}

impl StreamSession {
    /// Creates a session with a fresh stabilizer.
    pub fn new(pipeline: DetectionPipeline, cfg: StreamConfig) -> Self {
        let stabilizer = TemporalStabilizer::new(pipeline.config().smoothing_alpha);
        Self {
            pipeline,
            throttle: Arc::new(FrameThrottle::new(cfg.min_interval)),
            stabilizer,
            totals: SessionTotals::default(),
        }
    }

    /// Returns the shared throttle for admitting frames on another thread.
    pub fn throttle(&self) -> Arc<FrameThrottle> {
        Arc::clone(&self.throttle)
    }

    pub fn pipeline(&self) -> &DetectionPipeline {
        &self.pipeline
    }

    pub fn stabilizer(&self) -> &TemporalStabilizer {
        &self.stabilizer
    }

    /// Returns running totals, including skipped frames.
    pub fn totals(&self) -> SessionTotals {
        let (too_soon, in_flight) = self.throttle.skipped();
        SessionTotals {
            skipped_too_soon: too_soon,
            skipped_in_flight: in_flight,
            ..self.totals
        }
    }

    /// Offers a frame arriving at `now`.
    pub fn process(&mut self, now: Instant, frame: Frame<'_>) -> DetectResult<StreamOutcome> {
        let guard = match self.throttle.try_acquire(now) {
            Ok(guard) => guard,
            Err(reason) => {
                trace_event!("frame_skipped", too_soon = reason == SkipReason::TooSoon);
                return Ok(StreamOutcome::Skipped(reason));
            }
        };
        let (detections, stats) = self.process_admitted(guard, frame)?;
        Ok(StreamOutcome::Processed { detections, stats })
    }

    /// Runs a frame admitted through [`StreamSession::throttle`].
    ///
    /// A malformed frame, or a guard issued by another session's throttle,
    /// returns an error and leaves the stabilizer state unchanged.
    pub fn process_admitted(
        &mut self,
        guard: InFlightGuard,
        frame: Frame<'_>,
    ) -> DetectResult<(DetectionSet, FrameStats)> {
        if !guard.belongs_to(&self.throttle) {
            return Err(DetectError::ForeignGuard);
        }
        let (detections, mut stats) = self.pipeline.detect_with_stats(frame)?;
        let detections = self.stabilizer.stabilize(detections);
        stats.smoothed = self.stabilizer.smoothed_last();
        self.totals.absorb(&stats);
        drop(guard);
        Ok((detections, stats))
    }

    /// Starts over: clears the stabilizer and the cadence clock.
    pub fn reset(&mut self) {
        self.stabilizer.reset();
        self.throttle.reset();
    }

    /// Ends the session, returning the pipeline.
    pub fn into_pipeline(self) -> DetectionPipeline {
        self.pipeline
    }
}
