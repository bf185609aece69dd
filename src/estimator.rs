//! The flush state machine: wall-clock cursors, the whole-second catch-up
//! loop, the pending-second accumulator and the startup reporting policy.
//! Purely synchronous; the meter task drives it and dispatches what it emits.

use log::{debug, warn};

use crate::message::{Emit, Reading, Status};
use crate::window::{Cell, Window};
use crate::Config;

const SECOND_MS: i64 = 1000;

pub(crate) struct Estimator {
    window: Window,
    pending_count: u64,
    pending_statistic: f64,
    start_ms: Option<i64>,
    end_ms: Option<i64>,
    paused: bool,
    pause_at_startup: bool,
    estimation_startup: bool,
    ignore_startup: bool,
    // last notified (count, statistic, startup) triple
    reported: Option<(u64, f64, bool)>,
}

impl Estimator {
    pub fn new(cfg: &Config) -> Self {
        let interval = if cfg.interval == 0 {
            warn!("interval 0 is not usable, falling back to 1");
            1
        } else {
            cfg.interval
        };
        let capacity = cfg.frequency.seconds_per_unit() * interval;
        Estimator {
            window: Window::with_capacity(capacity),
            pending_count: 0,
            pending_statistic: 0.0,
            start_ms: None,
            end_ms: None,
            paused: cfg.pause_at_startup,
            pause_at_startup: cfg.pause_at_startup,
            estimation_startup: cfg.estimation_startup,
            ignore_startup: cfg.ignore_startup,
            reported: None,
        }
    }

    /// Folds one event into the estimate. Ignored while paused.
    pub fn record_at(&mut self, statistic: f64, now_ms: i64) -> Vec<Emit> {
        if self.paused {
            return Vec::new();
        }
        self.flush_at(Some(statistic), now_ms)
    }

    /// Closes any whole seconds elapsed since the last flush.
    pub fn tick_at(&mut self, now_ms: i64) -> Vec<Emit> {
        if self.paused {
            return Vec::new();
        }
        self.flush_at(None, now_ms)
    }

    fn flush_at(&mut self, event: Option<f64>, now_ms: i64) -> Vec<Emit> {
        let start = match self.start_ms {
            Some(start) => start,
            None => {
                // window opens on first activity
                self.start_ms = Some(now_ms);
                now_ms
            }
        };

        let mut elapsed = now_ms - start;
        if elapsed < 0 {
            warn!(
                "clock moved backwards, start_ms: {}, now_ms: {}",
                start, now_ms
            );
            elapsed = 0;
        }
        let elapsed_seconds = elapsed / SECOND_MS;
        let remainder = elapsed % SECOND_MS;
        // Pull the end cursor back onto the whole-second boundary; the
        // remainder stays part of the still-open second.
        self.end_ms = Some(now_ms - remainder);

        let mut out = Vec::new();
        for _ in 0..elapsed_seconds {
            self.window.roll(Cell {
                count: self.pending_count,
                statistic: self.pending_statistic,
            });
            self.pending_count = 0;
            self.pending_statistic = 0.0;

            let (count, statistic, startup) = self.reported_values();
            if self.reported != Some((count, statistic, startup)) {
                self.reported = Some((count, statistic, startup));
                out.push(Emit::Status(Status {
                    count,
                    statistic,
                    startup,
                    paused: false,
                }));
            }
            if !(self.ignore_startup && startup) {
                out.push(Emit::Reading(Reading { count, statistic }));
            }
        }

        if elapsed_seconds > 0 {
            if elapsed_seconds > 1 {
                debug!("caught up {} seconds in one flush", elapsed_seconds);
            }
            self.start_ms = self.end_ms;
        }

        if let Some(statistic) = event {
            // the triggering event lands in the still-open second
            self.pending_count += 1;
            self.pending_statistic += statistic;
        }

        out
    }

    pub fn pause(&mut self) {
        if self.paused {
            return;
        }
        self.paused = true;
    }

    /// Leaves the paused state, re-anchoring the open second to `now_ms` so
    /// the paused gap is never counted as elapsed time.
    pub fn resume_at(&mut self, now_ms: i64) {
        if !self.paused {
            return;
        }
        self.paused = false;
        self.start_ms = Some(now_ms);
        self.end_ms = Some(now_ms);
    }

    /// Restores the exact constructed state.
    pub fn reset(&mut self) {
        self.window.clear();
        self.pending_count = 0;
        self.pending_statistic = 0.0;
        self.start_ms = None;
        self.end_ms = None;
        self.paused = self.pause_at_startup;
        self.reported = None;
    }

    /// Live snapshot under the same reporting policy as flush emissions.
    pub fn status(&self) -> Status {
        let (count, statistic, startup) = self.reported_values();
        Status {
            count,
            statistic,
            startup,
            paused: self.paused,
        }
    }

    /// Milliseconds until the open second's boundary, non-positive once the
    /// boundary has passed. `None` while paused or before the window opens.
    #[inline]
    pub fn due_in_ms(&self, now_ms: i64) -> Option<i64> {
        if self.paused {
            return None;
        }
        self.start_ms.map(|start| start + SECOND_MS - now_ms)
    }

    fn reported_values(&self) -> (u64, f64, bool) {
        let len = self.window.len();
        let capacity = self.window.capacity();
        let startup = len < capacity;
        let mut count = self.window.count();
        let mut statistic = self.window.statistic();
        if startup && self.estimation_startup && len > 0 {
            // project the partial window out to a full one
            count = (count as u128 * capacity as u128 / len as u128) as u64;
            statistic = (statistic * capacity as f64 / len as f64).floor();
        }
        (count, statistic, startup)
    }
}
