// Transport Controller
// Drives one playback session: status line, event dispatch and key commands

use std::io::Write;
use std::path::Path;
use std::thread;
use std::time::{Duration, Instant};

use crate::actuation::Actuator;
use crate::audio::AudioEngine;
use crate::clock::{format_mmss, PlaybackClock};
use crate::config::DEFAULT_TICK_MS;
use crate::input::{Command, KeySource};
use crate::player::PlayerError;
use crate::schedule::ScheduledEvent;

pub const INSTRUCTIONS: &str = "Enter 'p' to pause/unpause, 's' to stop.";
const DEFAULT_WIDTH: usize = 80;

/// Transport state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayerState {
    Playing,
    Paused,
    /// Stopped by the user or by a fault
    Stopped,
    /// Audio ran to the end
    Finished,
}

impl PlayerState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, PlayerState::Stopped | PlayerState::Finished)
    }

    fn label(&self) -> &'static str {
        match self {
            PlayerState::Paused => "Paused",
            PlayerState::Stopped => "Stopped",
            PlayerState::Finished => "Finished",
            PlayerState::Playing => "Playing",
        }
    }
}

/// Playback session controller
///
/// Owns the audio engine, the key source and the status output for the length
/// of one session. The schedule is read-only once the session is created and
/// `next_event` only ever moves forward, so each event fires at most once.
pub struct TransportController<A, D, K, W> {
    schedule: Vec<ScheduledEvent>,
    next_event: usize,
    clock: PlaybackClock,
    state: PlayerState,
    audio: A,
    actuator: D,
    keys: K,
    out: W,
    tick: Duration,
    width: usize,
    status_shown: bool,
}

impl<A, D, K, W> TransportController<A, D, K, W>
where
    A: AudioEngine,
    D: Actuator,
    K: KeySource,
    W: Write,
{
    pub fn new(schedule: Vec<ScheduledEvent>, audio: A, actuator: D, keys: K, out: W) -> Self {
        TransportController {
            schedule,
            next_event: 0,
            clock: PlaybackClock::start(),
            state: PlayerState::Stopped,
            audio,
            actuator,
            keys,
            out,
            tick: Duration::from_millis(DEFAULT_TICK_MS),
            width: DEFAULT_WIDTH,
            status_shown: false,
        }
    }

    pub fn with_tick(mut self, tick: Duration) -> Self {
        self.tick = tick;
        self
    }

    /// Width the status line is padded to
    pub fn with_width(mut self, width: usize) -> Self {
        self.width = width;
        self
    }

    pub fn state(&self) -> PlayerState {
        self.state
    }

    /// Number of events dispatched so far
    pub fn fired(&self) -> usize {
        self.next_event
    }

    pub fn audio(&self) -> &A {
        &self.audio
    }

    pub fn output(&self) -> &W {
        &self.out
    }

    /// Load and start the audio, then start the clock at `now`
    pub fn start(&mut self, path: &Path, now: Instant) -> Result<(), PlayerError> {
        self.audio.load(path)?;
        self.audio.play()?;

        let name = path.file_name().unwrap_or(path.as_os_str());
        tracing::info!("Now playing: {}", name.to_string_lossy());

        self.clock = PlaybackClock::start_at(now);
        self.next_event = 0;
        self.state = PlayerState::Playing;

        write!(self.out, "{}\r\n", INSTRUCTIONS).map_err(PlayerError::Terminal)?;
        self.out.flush().map_err(PlayerError::Terminal)?;
        Ok(())
    }

    /// Run a full session: start, then tick until a terminal state
    pub fn run(&mut self, path: &Path) -> Result<PlayerState, PlayerError> {
        let origin = Instant::now();
        self.start(path, origin)?;

        while !self.state.is_terminal() {
            let tick_start = Instant::now();
            self.advance(tick_start)?;
            if self.state.is_terminal() {
                break;
            }

            if let Some(command) = self.poll_command()? {
                self.apply(command, Instant::now());
            }
            if self.state.is_terminal() {
                break;
            }

            // Poll may return early on a keystroke; keep the tick period bounded
            if let Some(rest) = self.tick.checked_sub(tick_start.elapsed()) {
                thread::sleep(rest);
            }
        }

        tracing::debug!(
            "Session ended {:?} after {} of {} events, {:.1}s paused",
            self.state,
            self.next_event,
            self.schedule.len(),
            self.clock.paused_total(origin).as_secs_f64()
        );
        Ok(self.state)
    }

    /// One complete tick against an explicit instant
    pub fn step(&mut self, now: Instant) -> Result<PlayerState, PlayerError> {
        self.advance(now)?;
        if !self.state.is_terminal() {
            if let Some(command) = self.poll_command()? {
                self.apply(command, now);
            }
        }
        Ok(self.state)
    }

    /// Completion check, status line and due events
    fn advance(&mut self, now: Instant) -> Result<(), PlayerError> {
        match self.state {
            PlayerState::Playing if !self.audio.is_busy() => {
                self.end_status_line()?;
                self.state = PlayerState::Finished;
                tracing::info!("Playback finished");
                return Ok(());
            }
            PlayerState::Playing | PlayerState::Paused => {}
            PlayerState::Stopped | PlayerState::Finished => return Ok(()),
        }

        let elapsed = self.clock.elapsed_at(now);
        self.render_status(elapsed)?;

        if self.state == PlayerState::Playing {
            self.fire_due(elapsed)?;
        }
        Ok(())
    }

    fn fire_due(&mut self, elapsed: f64) -> Result<(), PlayerError> {
        while let Some(event) = self.schedule.get(self.next_event).copied() {
            if !event.is_due_by(elapsed) {
                break;
            }
            self.end_status_line()?;
            tracing::info!("Triggering {} at {:.2} seconds", event.kind.as_str().to_lowercase(), elapsed);

            let outcome = self.actuator.dispatch(event.intensity, event.duration_ms, event.kind);
            tracing::debug!("Event {} dispatch outcome: {:?}", self.next_event, outcome);
            self.next_event += 1;
        }
        Ok(())
    }

    fn poll_command(&mut self) -> Result<Option<Command>, PlayerError> {
        let key = self.keys.poll_key(self.tick).map_err(PlayerError::Input)?;
        Ok(key.and_then(Command::from_key))
    }

    /// Apply a command; audio and clock always change together
    pub fn apply(&mut self, command: Command, now: Instant) {
        match (command, self.state) {
            (Command::TogglePause, PlayerState::Playing) => {
                self.audio.pause();
                self.clock.pause_at(now);
                self.state = PlayerState::Paused;
                self.log_transition("Playback paused");
            }
            (Command::TogglePause, PlayerState::Paused) => {
                self.audio.unpause();
                self.clock.resume_at(now);
                self.state = PlayerState::Playing;
                self.log_transition("Playback resumed");
            }
            (Command::Stop, PlayerState::Playing | PlayerState::Paused) => {
                self.audio.stop();
                self.state = PlayerState::Stopped;
                self.log_transition("Playback stopped");
            }
            (_, PlayerState::Stopped | PlayerState::Finished) => {}
        }
    }

    fn log_transition(&mut self, message: &str) {
        if let Err(e) = self.end_status_line() {
            tracing::debug!("Status line write failed: {:?}", e);
        }
        tracing::info!("{}", message);
    }

    fn render_status(&mut self, elapsed: f64) -> Result<(), PlayerError> {
        let status = format!("Time: {} | {}", format_mmss(elapsed), self.state.label());
        write!(self.out, "\r{:<width$}", status, width = self.width).map_err(PlayerError::Terminal)?;
        self.out.flush().map_err(PlayerError::Terminal)?;
        self.status_shown = true;
        Ok(())
    }

    /// Move off the status line so log records start on a fresh line
    fn end_status_line(&mut self) -> Result<(), PlayerError> {
        if self.status_shown {
            self.out.write_all(b"\r\n").map_err(PlayerError::Terminal)?;
            self.out.flush().map_err(PlayerError::Terminal)?;
            self.status_shown = false;
        }
        Ok(())
    }
}
