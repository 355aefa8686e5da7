//! Keyboard input and terminal mode handling
//!
//! Bridges crossterm's event polling into single keystrokes for the transport
//! loop, and scopes raw terminal mode around a playback session.
//!
//! - `KeySource` - non-blocking single key poll with timeout
//! - `Command` - transport command decoded from a key
//! - `TerminalMode` / `with_terminal_mode` - explicit enter/restore pair

use std::io::{self, IsTerminal};
use std::panic::{self, AssertUnwindSafe};
use std::time::Duration;

use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::terminal;

/// Key reported for Ctrl-C, which raw mode no longer turns into a signal
pub const CTRL_C: char = '\u{3}';

// =============================================================================
// KEY POLLING
// =============================================================================

/// Source of single keystrokes
pub trait KeySource {
    /// Return at most one pending key, waiting no longer than `timeout`
    fn poll_key(&mut self, timeout: Duration) -> io::Result<Option<char>>;
}

/// Reads keys from the controlling terminal via crossterm
///
/// When stdin is not a terminal, raw mode is never entered and key reads are
/// disabled: `poll_key` reports no key and the tick loop paces itself.
#[derive(Debug)]
pub struct TerminalKeys {
    enabled: bool,
}

impl TerminalKeys {
    /// Key input follows whether stdin is a terminal, as `RawTerminal` does
    pub fn new() -> Self {
        let enabled = io::stdin().is_terminal();
        if !enabled {
            tracing::info!("stdin is not a terminal; transport keys disabled");
        }
        TerminalKeys { enabled }
    }

    /// A key source that never reports a key
    pub fn disabled() -> Self {
        TerminalKeys { enabled: false }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }
}

impl Default for TerminalKeys {
    fn default() -> Self {
        Self::new()
    }
}

impl KeySource for TerminalKeys {
    fn poll_key(&mut self, timeout: Duration) -> io::Result<Option<char>> {
        if !self.enabled {
            return Ok(None);
        }
        if !event::poll(timeout)? {
            return Ok(None);
        }
        Ok(match event::read()? {
            Event::Key(key) => key_to_char(key),
            _ => None,
        })
    }
}

/// Convert a crossterm key press into a character; everything else is dropped
pub fn key_to_char(key: KeyEvent) -> Option<char> {
    if key.kind != KeyEventKind::Press {
        return None;
    }
    match key.code {
        KeyCode::Char('c') | KeyCode::Char('C') if key.modifiers.contains(KeyModifiers::CONTROL) => {
            Some(CTRL_C)
        }
        KeyCode::Char(c) => Some(c),
        _ => None,
    }
}

/// Transport command decoded from a keystroke
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    TogglePause,
    Stop,
}

impl Command {
    /// Case-insensitive; unknown keys map to `None`
    pub fn from_key(key: char) -> Option<Self> {
        match key.to_ascii_lowercase() {
            'p' => Some(Command::TogglePause),
            's' | CTRL_C => Some(Command::Stop),
            _ => None,
        }
    }
}

// =============================================================================
// TERMINAL MODE
// =============================================================================

/// A terminal input mode that can be entered and later restored
pub trait TerminalMode {
    fn enter(&mut self) -> io::Result<()>;
    fn restore(&mut self) -> io::Result<()>;
}

/// crossterm raw mode: unbuffered, unechoed single key reads
#[derive(Debug, Default)]
pub struct RawTerminal {
    active: bool,
}

impl RawTerminal {
    pub fn new() -> Self {
        RawTerminal { active: false }
    }
}

impl TerminalMode for RawTerminal {
    fn enter(&mut self) -> io::Result<()> {
        // Piped stdin: play on without key input rather than fail
        if !io::stdin().is_terminal() {
            tracing::debug!("stdin is not a terminal; raw mode skipped");
            return Ok(());
        }
        terminal::enable_raw_mode()?;
        self.active = true;
        Ok(())
    }

    fn restore(&mut self) -> io::Result<()> {
        if self.active {
            terminal::disable_raw_mode()?;
            self.active = false;
        }
        Ok(())
    }
}

/// Run `body` with the terminal mode entered, restoring it on every exit path.
///
/// A failure to enter is returned before `body` runs. A restore failure is
/// logged; it is only returned when `body` itself succeeded. A panic in `body`
/// is caught long enough to restore the terminal, then resumed.
pub fn with_terminal_mode<M, T, E, F>(mode: &mut M, body: F) -> Result<T, E>
where
    M: TerminalMode + ?Sized,
    E: From<io::Error>,
    F: FnOnce() -> Result<T, E>,
{
    mode.enter()?;
    let result = panic::catch_unwind(AssertUnwindSafe(body));
    let restored = mode.restore();

    let result = match result {
        Ok(result) => result,
        Err(payload) => {
            if let Err(e) = restored {
                tracing::error!("Failed to restore terminal mode: {}", e);
            }
            panic::resume_unwind(payload);
        }
    };

    match (result, restored) {
        (Ok(value), Ok(())) => Ok(value),
        (Ok(_), Err(e)) => {
            tracing::error!("Failed to restore terminal mode: {}", e);
            Err(e.into())
        }
        (Err(e), restored) => {
            if let Err(restore_err) = restored {
                tracing::error!("Failed to restore terminal mode: {}", restore_err);
            }
            Err(e)
        }
    }
}

/// Terminal width in columns, 80 when it cannot be queried
pub fn terminal_width() -> usize {
    terminal::size().map(|(cols, _)| cols as usize).unwrap_or(80)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::KeyEventState;

    #[derive(Default)]
    struct RecordingMode {
        calls: Vec<&'static str>,
        fail_enter: bool,
        fail_restore: bool,
    }

    impl TerminalMode for RecordingMode {
        fn enter(&mut self) -> io::Result<()> {
            self.calls.push("enter");
            if self.fail_enter {
                return Err(io::Error::new(io::ErrorKind::Other, "not a tty"));
            }
            Ok(())
        }

        fn restore(&mut self) -> io::Result<()> {
            self.calls.push("restore");
            if self.fail_restore {
                return Err(io::Error::new(io::ErrorKind::Other, "restore failed"));
            }
            Ok(())
        }
    }

    fn press(code: KeyCode, modifiers: KeyModifiers) -> KeyEvent {
        KeyEvent {
            code,
            modifiers,
            kind: KeyEventKind::Press,
            state: KeyEventState::NONE,
        }
    }

    #[test]
    fn test_command_from_key() {
        assert_eq!(Command::from_key('p'), Some(Command::TogglePause));
        assert_eq!(Command::from_key('P'), Some(Command::TogglePause));
        assert_eq!(Command::from_key('s'), Some(Command::Stop));
        assert_eq!(Command::from_key('S'), Some(Command::Stop));
        assert_eq!(Command::from_key(CTRL_C), Some(Command::Stop));
        assert_eq!(Command::from_key('q'), None);
        assert_eq!(Command::from_key(' '), None);
    }

    #[test]
    fn test_key_to_char() {
        assert_eq!(key_to_char(press(KeyCode::Char('p'), KeyModifiers::NONE)), Some('p'));
        assert_eq!(key_to_char(press(KeyCode::Char('S'), KeyModifiers::SHIFT)), Some('S'));
        assert_eq!(key_to_char(press(KeyCode::Char('c'), KeyModifiers::CONTROL)), Some(CTRL_C));
        assert_eq!(key_to_char(press(KeyCode::Enter, KeyModifiers::NONE)), None);

        let mut release = press(KeyCode::Char('p'), KeyModifiers::NONE);
        release.kind = KeyEventKind::Release;
        assert_eq!(key_to_char(release), None);
    }

    #[test]
    fn test_mode_restored_after_success() {
        let mut mode = RecordingMode::default();
        let result: Result<u32, io::Error> = with_terminal_mode(&mut mode, || Ok(7));
        assert_eq!(result.unwrap(), 7);
        assert_eq!(mode.calls, vec!["enter", "restore"]);
    }

    #[test]
    fn test_mode_restored_after_error() {
        let mut mode = RecordingMode::default();
        let result: Result<(), io::Error> = with_terminal_mode(&mut mode, || {
            Err(io::Error::new(io::ErrorKind::Other, "boom"))
        });
        assert_eq!(result.unwrap_err().to_string(), "boom");
        assert_eq!(mode.calls, vec!["enter", "restore"]);
    }

    #[test]
    fn test_enter_failure_skips_body() {
        let mut mode = RecordingMode {
            fail_enter: true,
            ..Default::default()
        };
        let mut ran = false;
        let result: Result<(), io::Error> = with_terminal_mode(&mut mode, || {
            ran = true;
            Ok(())
        });
        assert!(result.is_err());
        assert!(!ran);
        assert_eq!(mode.calls, vec!["enter"]);
    }

    #[test]
    fn test_body_error_wins_over_restore_error() {
        let mut mode = RecordingMode {
            fail_restore: true,
            ..Default::default()
        };
        let result: Result<(), io::Error> = with_terminal_mode(&mut mode, || {
            Err(io::Error::new(io::ErrorKind::Other, "body"))
        });
        assert_eq!(result.unwrap_err().to_string(), "body");

        let mut mode = RecordingMode {
            fail_restore: true,
            ..Default::default()
        };
        let result: Result<(), io::Error> = with_terminal_mode(&mut mode, || Ok(()));
        assert_eq!(result.unwrap_err().to_string(), "restore failed");
    }

    #[test]
    fn test_mode_restored_when_body_panics() {
        let mut mode = RecordingMode::default();
        let caught = panic::catch_unwind(AssertUnwindSafe(|| {
            let _: Result<(), io::Error> = with_terminal_mode(&mut mode, || panic!("actuator fault"));
        }));

        let payload = caught.unwrap_err();
        assert_eq!(payload.downcast_ref::<&str>(), Some(&"actuator fault"));
        assert_eq!(mode.calls, vec!["enter", "restore"]);
    }

    #[test]
    fn test_disabled_keys_report_nothing() {
        let mut keys = TerminalKeys::disabled();
        assert!(!keys.is_enabled());
        for _ in 0..3 {
            assert_eq!(keys.poll_key(Duration::from_millis(10)).unwrap(), None);
        }
    }

    #[test]
    fn test_raw_terminal_restore_without_enter_is_noop() {
        let mut raw = RawTerminal::new();
        assert!(raw.restore().is_ok());
    }
}
