// Playback Clock
// Tracks elapsed playback time with pause/resume support

use std::time::{Duration, Instant};

/// Playback clock state
///
/// Elapsed time is measured from `started` on the wall clock. Resuming shifts
/// `started` forward by the length of the pause, so paused intervals never
/// count toward elapsed time.
#[derive(Debug, Clone)]
pub struct PlaybackClock {
    started: Instant,
    paused_at: Option<Instant>,
}

impl PlaybackClock {
    /// Start a clock at the current instant
    pub fn start() -> Self {
        Self::start_at(Instant::now())
    }

    /// Start a clock at a specific instant
    pub fn start_at(now: Instant) -> Self {
        PlaybackClock {
            started: now,
            paused_at: None,
        }
    }

    pub fn is_paused(&self) -> bool {
        self.paused_at.is_some()
    }

    /// Elapsed playback time in seconds
    pub fn elapsed(&self) -> f64 {
        self.elapsed_at(Instant::now())
    }

    /// Elapsed playback time at `now`; frozen while paused
    pub fn elapsed_at(&self, now: Instant) -> f64 {
        let end = self.paused_at.unwrap_or(now);
        end.saturating_duration_since(self.started).as_secs_f64()
    }

    pub fn pause(&mut self) {
        self.pause_at(Instant::now());
    }

    /// Freeze the clock. Does nothing if already paused.
    pub fn pause_at(&mut self, now: Instant) {
        if self.paused_at.is_none() {
            self.paused_at = Some(now);
        }
    }

    pub fn resume(&mut self) {
        self.resume_at(Instant::now());
    }

    /// Unfreeze the clock, discounting the pause. Does nothing if running.
    pub fn resume_at(&mut self, now: Instant) {
        if let Some(paused_at) = self.paused_at.take() {
            self.started += now.saturating_duration_since(paused_at);
        }
    }

    /// Total time the clock has been shifted by pauses so far
    pub fn paused_total(&self, origin: Instant) -> Duration {
        self.started.saturating_duration_since(origin)
    }
}

/// Format whole seconds as `MM:SS`
pub fn format_mmss(seconds: f64) -> String {
    let total = if seconds.is_finite() && seconds > 0.0 {
        seconds as u64
    } else {
        0
    };
    format!("{:02}:{:02}", total / 60, total % 60)
}
