//! Circle tool: gap filling under a round cursor.
//!
//! Every press or drag applies one merge step. While the primary button is
//! held a [`HoldTicker`] keeps reapplying the add step at the cursor on a
//! fixed period, so holding over a noisy area progressively closes it.
//! Release stops the ticker and waits for it, so no step runs afterwards.

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam::channel::{self, RecvTimeoutError, Sender};
use log::{debug, warn};

use super::merge::{MergeMode, MergeOutcome};
use super::session::SharedSession;
use crate::error::Result;
use crate::selection::contour::Point;

fn pack(p: Point) -> u64 {
    ((p.x as u32 as u64) << 32) | p.y as u32 as u64
}

fn unpack(v: u64) -> Point {
    Point::new((v >> 32) as u32 as i32, v as u32 as i32)
}

// ============================================================================
// HoldTicker
// ============================================================================

/// Background worker reapplying one merge mode at a movable position.
pub struct HoldTicker {
    stop: Option<Sender<()>>,
    handle: Option<JoinHandle<()>>,
    target: Arc<AtomicU64>,
    ticks: Arc<AtomicUsize>,
}

impl HoldTicker {
    /// Start ticking at `at`; the first step runs one `interval` from now.
    ///
    /// Each step locks the session for the whole merge-and-redraw, so it
    /// serializes with every other session operation.
    pub fn start(session: SharedSession, at: Point, mode: MergeMode, interval: Duration) -> Self {
        let (stop_tx, stop_rx) = channel::bounded::<()>(1);
        let target = Arc::new(AtomicU64::new(pack(at)));
        let ticks = Arc::new(AtomicUsize::new(0));

        let worker_target = Arc::clone(&target);
        let worker_ticks = Arc::clone(&ticks);
        let handle = thread::spawn(move || loop {
            match stop_rx.recv_timeout(interval) {
                Err(RecvTimeoutError::Timeout) => {
                    let p = unpack(worker_target.load(Ordering::Acquire));
                    let outcome = session.lock().circle_apply(p.x, p.y, mode);
                    if let Err(e) = outcome {
                        warn!("hold tick at ({}, {}) failed: {e}", p.x, p.y);
                    }
                    worker_ticks.fetch_add(1, Ordering::Relaxed);
                }
                // Stop signal or the ticker was dropped
                Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
            }
        });

        debug!("hold ticker started at ({}, {}) every {:?}", at.x, at.y, interval);

        Self {
            stop: Some(stop_tx),
            handle: Some(handle),
            target,
            ticks,
        }
    }

    /// Move the position the next steps apply to.
    pub fn retarget(&self, p: Point) {
        self.target.store(pack(p), Ordering::Release);
    }

    pub fn position(&self) -> Point {
        unpack(self.target.load(Ordering::Acquire))
    }

    /// Steps run so far.
    pub fn ticks(&self) -> usize {
        self.ticks.load(Ordering::Relaxed)
    }

    /// Signal the worker and wait for it to exit.
    ///
    /// Must not be called while holding the session lock.
    pub fn stop(mut self) -> usize {
        self.shutdown();
        self.ticks()
    }

    fn shutdown(&mut self) {
        if let Some(stop) = self.stop.take() {
            let _ = stop.try_send(());
        }
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                warn!("hold ticker worker panicked");
            }
            debug!("hold ticker stopped after {} tick(s)", self.ticks());
        }
    }
}

impl Drop for HoldTicker {
    fn drop(&mut self) {
        self.shutdown();
    }
}

// ============================================================================
// CircleRegionProcessor
// ============================================================================

/// Pointer handling for the circle tool.
pub struct CircleRegionProcessor {
    session: SharedSession,
    ticker: Option<HoldTicker>,
}

impl CircleRegionProcessor {
    pub fn new(session: SharedSession) -> Self {
        Self {
            session,
            ticker: None,
        }
    }

    pub fn session(&self) -> &SharedSession {
        &self.session
    }

    /// Button press: one step now, and for [`MergeMode::Add`] keep
    /// reapplying until [`Self::release`].
    pub fn press(&mut self, x: i32, y: i32, mode: MergeMode) -> Result<MergeOutcome> {
        self.release();
        let (outcome, interval) = {
            let mut session = self.session.lock();
            let outcome = session.circle_apply(x, y, mode)?;
            (outcome, Duration::from_millis(session.config().tick_interval_ms))
        };

        if mode == MergeMode::Add {
            self.ticker = Some(HoldTicker::start(
                Arc::clone(&self.session),
                Point::new(x, y),
                mode,
                interval,
            ));
        }
        Ok(outcome)
    }

    /// Motion with a button down: one step at the new position; a running
    /// ticker follows the cursor.
    pub fn drag(&mut self, x: i32, y: i32, mode: MergeMode) -> Result<MergeOutcome> {
        if let Some(ticker) = &self.ticker {
            ticker.retarget(Point::new(x, y));
        }
        self.session.lock().circle_apply(x, y, mode)
    }

    /// Button release: stop any ticker before returning.
    pub fn release(&mut self) {
        if let Some(ticker) = self.ticker.take() {
            ticker.stop();
        }
    }

    pub fn is_holding(&self) -> bool {
        self.ticker.is_some()
    }
}

impl Drop for CircleRegionProcessor {
    fn drop(&mut self) {
        self.release();
    }
}

/// Outline pixels of the cursor ring, for hosts that draw the cursor.
pub fn cursor_ring(center: Point, radius: u32) -> Vec<Point> {
    let r = radius as i32;
    let mut points = Vec::new();
    let (mut x, mut y) = (r, 0);
    let mut err = 1 - r;

    // Midpoint circle, mirrored into all eight octants
    while x >= y {
        for (dx, dy) in [
            (x, y),
            (y, x),
            (-y, x),
            (-x, y),
            (-x, -y),
            (-y, -x),
            (y, -x),
            (x, -y),
        ] {
            points.push(Point::new(center.x + dx, center.y + dy));
        }
        y += 1;
        if err < 0 {
            err += 2 * y + 1;
        } else {
            x -= 1;
            err += 2 * (y - x) + 1;
        }
    }

    points.sort();
    points.dedup();
    points
}
