//! Playback session boundary
//!
//! `play` performs the pre-flight checks, wires the real collaborators
//! together and contains every failure of the session: nothing escapes as an
//! error, and the terminal is restored before the outcome is reported.

use std::any::Any;
use std::io::{self, Write};
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::actuation::Actuator;
use crate::audio::{AudioEngine, AudioError, RodioEngine};
use crate::config::Options;
use crate::input::{terminal_width, with_terminal_mode, KeySource, RawTerminal, TerminalKeys, TerminalMode};
use crate::schedule::{load_schedule, sidecar_path, ScheduledEvent};
use crate::transport::{PlayerState, TransportController};

/// Errors that end a session
#[derive(Debug, thiserror::Error)]
pub enum PlayerError {
    #[error("File not found: {}", .0.display())]
    AudioMissing(PathBuf),

    #[error(transparent)]
    Audio(#[from] AudioError),

    #[error("terminal I/O failed: {0}")]
    Terminal(#[from] io::Error),

    #[error("keyboard input failed: {0}")]
    Input(#[source] io::Error),

    #[error("session aborted: {0}")]
    Panicked(String),
}

impl PlayerError {
    /// Describe a caught panic payload
    pub fn from_panic(payload: Box<dyn Any + Send>) -> Self {
        let message = if let Some(s) = payload.downcast_ref::<&str>() {
            (*s).to_string()
        } else if let Some(s) = payload.downcast_ref::<String>() {
            s.clone()
        } else {
            "unknown panic".to_string()
        };
        PlayerError::Panicked(message)
    }
}

/// How a session ended
#[derive(Debug)]
pub enum SessionOutcome {
    Finished,
    Stopped,
    AudioMissing,
    Failed(PlayerError),
}

impl SessionOutcome {
    pub fn exit_code(&self) -> i32 {
        match self {
            SessionOutcome::Finished | SessionOutcome::Stopped => 0,
            SessionOutcome::AudioMissing | SessionOutcome::Failed(_) => 1,
        }
    }
}

impl From<PlayerState> for SessionOutcome {
    fn from(state: PlayerState) -> Self {
        match state {
            PlayerState::Finished => SessionOutcome::Finished,
            _ => SessionOutcome::Stopped,
        }
    }
}

/// Event list for an audio file: explicit override or the sidecar file
pub fn events_path(audio_path: &Path, opts: &Options) -> PathBuf {
    opts.events_file
        .clone()
        .unwrap_or_else(|| sidecar_path(audio_path))
}

/// Play `audio_path` with its event schedule on the real terminal and device
pub fn play<D: Actuator>(audio_path: &Path, opts: &Options, actuator: D) -> SessionOutcome {
    if !audio_path.exists() {
        tracing::error!("{}", PlayerError::AudioMissing(audio_path.to_path_buf()));
        return SessionOutcome::AudioMissing;
    }

    let schedule = load_schedule(&events_path(audio_path, opts)).unwrap_or_else(|e| {
        tracing::error!("{}", e);
        Vec::new()
    });

    let engine = match RodioEngine::open() {
        Ok(engine) => engine,
        Err(e) => {
            tracing::error!("Error playing file: {}", e);
            return SessionOutcome::Failed(e.into());
        }
    };

    run_session(
        audio_path,
        schedule,
        engine,
        actuator,
        TerminalKeys::new(),
        io::stdout(),
        &mut RawTerminal::new(),
        opts.tick_interval,
    )
}

/// Run one session inside the terminal mode and report how it ended
#[allow(clippy::too_many_arguments)]
pub fn run_session<A, D, K, W, M>(
    audio_path: &Path,
    schedule: Vec<ScheduledEvent>,
    audio: A,
    actuator: D,
    keys: K,
    out: W,
    mode: &mut M,
    tick: Duration,
) -> SessionOutcome
where
    A: AudioEngine,
    D: Actuator,
    K: KeySource,
    W: Write,
    M: TerminalMode + ?Sized,
{
    let mut controller = TransportController::new(schedule, audio, actuator, keys, out)
        .with_tick(tick)
        .with_width(terminal_width());

    // with_terminal_mode restores before the panic reaches this point
    let result = panic::catch_unwind(AssertUnwindSafe(|| {
        with_terminal_mode(mode, || controller.run(audio_path))
    }))
    .unwrap_or_else(|payload| Err(PlayerError::from_panic(payload)));

    match result {
        Ok(state) => SessionOutcome::from(state),
        Err(e) => {
            tracing::error!("Error playing file: {}", e);
            SessionOutcome::Failed(e)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actuation::DispatchOutcome;
    use crate::schedule::ActuationKind;

    struct NoopActuator;

    impl Actuator for NoopActuator {
        fn dispatch(&self, _: u8, _: u32, _: ActuationKind) -> DispatchOutcome {
            DispatchOutcome::Disabled
        }
    }

    #[test]
    fn test_exit_codes() {
        assert_eq!(SessionOutcome::Finished.exit_code(), 0);
        assert_eq!(SessionOutcome::Stopped.exit_code(), 0);
        assert_eq!(SessionOutcome::AudioMissing.exit_code(), 1);
        assert_eq!(SessionOutcome::Failed(PlayerError::Input(io::ErrorKind::Other.into())).exit_code(), 1);
    }

    #[test]
    fn test_outcome_from_state() {
        assert!(matches!(SessionOutcome::from(PlayerState::Finished), SessionOutcome::Finished));
        assert!(matches!(SessionOutcome::from(PlayerState::Stopped), SessionOutcome::Stopped));
    }

    #[test]
    fn test_events_path_override() {
        let mut opts = Options::default();
        assert_eq!(events_path(Path::new("a/song.ogg"), &opts), PathBuf::from("a/song.txt"));

        opts.events_file = Some(PathBuf::from("other/cues.txt"));
        assert_eq!(events_path(Path::new("a/song.ogg"), &opts), PathBuf::from("other/cues.txt"));
    }

    #[test]
    fn test_missing_audio_aborts_before_playback() {
        let dir = tempfile::tempdir().unwrap();
        let outcome = play(&dir.path().join("missing.mp3"), &Options::default(), NoopActuator);
        assert!(matches!(outcome, SessionOutcome::AudioMissing));
    }

    #[test]
    fn test_panic_payload_message() {
        let err = PlayerError::from_panic(Box::new("decoder fault"));
        assert_eq!(err.to_string(), "session aborted: decoder fault");

        let err = PlayerError::from_panic(Box::new(format!("code {}", 7)));
        assert_eq!(err.to_string(), "session aborted: code 7");

        let err = PlayerError::from_panic(Box::new(42u32));
        assert_eq!(err.to_string(), "session aborted: unknown panic");
    }

    #[test]
    fn test_player_error_display() {
        let err = PlayerError::AudioMissing(PathBuf::from("song.mp3"));
        assert_eq!(err.to_string(), "File not found: song.mp3");
    }
}
