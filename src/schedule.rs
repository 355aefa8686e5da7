// Event Schedule Loading
// Parses the sidecar event list that accompanies an audio file

use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Extension of the event list that sits next to the audio file
pub const SIDECAR_EXTENSION: &str = "txt";

/// Highest intensity the actuation service accepts
pub const MAX_INTENSITY: u8 = 100;

/// Kind of actuation requested from the remote device
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ActuationKind {
    #[default]
    Shock,
    Vibrate,
    Sound,
    Stop,
}

impl ActuationKind {
    /// Label used on the wire and in the event list
    pub fn as_str(&self) -> &'static str {
        match self {
            ActuationKind::Shock => "Shock",
            ActuationKind::Vibrate => "Vibrate",
            ActuationKind::Sound => "Sound",
            ActuationKind::Stop => "Stop",
        }
    }
}

impl fmt::Display for ActuationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ActuationKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "shock" => Ok(ActuationKind::Shock),
            "vibrate" | "vibration" => Ok(ActuationKind::Vibrate),
            "sound" | "beep" => Ok(ActuationKind::Sound),
            "stop" => Ok(ActuationKind::Stop),
            _ => Err(format!("unknown actuation kind: {}", s.trim())),
        }
    }
}

/// One timestamped actuation instruction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScheduledEvent {
    /// Offset from the start of playback, in whole seconds
    pub offset_secs: u32,
    pub kind: ActuationKind,
    /// 0..=MAX_INTENSITY
    pub intensity: u8,
    pub duration_ms: u32,
}

impl ScheduledEvent {
    pub fn new(offset_secs: u32, kind: ActuationKind, intensity: u8, duration_ms: u32) -> Self {
        Self {
            offset_secs,
            kind,
            intensity,
            duration_ms,
        }
    }

    /// Check whether the event is due at the given elapsed time
    pub fn is_due_by(&self, elapsed_secs: f64) -> bool {
        f64::from(self.offset_secs) <= elapsed_secs
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ScheduleError {
    #[error("failed to read event list {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Path of the event list for an audio file: same base name, `.txt` extension
pub fn sidecar_path(audio_path: &Path) -> PathBuf {
    audio_path.with_extension(SIDECAR_EXTENSION)
}

/// Convert a `MM:SS` timestamp into seconds.
///
/// Anything that is not two integer fields separated by a colon is logged and
/// treated as offset 0, so the entry still loads and fires at the start.
pub fn parse_timestamp(text: &str) -> u32 {
    let mut parts = text.trim().split(':');
    let parsed = match (parts.next(), parts.next(), parts.next()) {
        (Some(minutes), Some(seconds), None) => minutes
            .trim()
            .parse::<u32>()
            .ok()
            .zip(seconds.trim().parse::<u32>().ok()),
        _ => None,
    };

    match parsed {
        Some((minutes, seconds)) => minutes.saturating_mul(60).saturating_add(seconds),
        None => {
            tracing::error!("Invalid timestamp format: {}", text.trim());
            0
        }
    }
}

fn parse_line(line: &str) -> Option<ScheduledEvent> {
    let fields: Vec<&str> = line.split(',').map(str::trim).collect();
    let [time, kind, intensity, duration] = fields.as_slice() else {
        tracing::warn!("Invalid timestamp entry: {}", line);
        return None;
    };

    let intensity = match intensity.parse::<u8>() {
        Ok(v) if v <= MAX_INTENSITY => v,
        _ => {
            tracing::warn!(
                "Invalid intensity '{}' (expected 0-{}): {}",
                intensity,
                MAX_INTENSITY,
                line
            );
            return None;
        }
    };

    let duration_ms = match duration.parse::<u32>() {
        Ok(v) if v > 0 => v,
        _ => {
            tracing::warn!("Invalid duration '{}': {}", duration, line);
            return None;
        }
    };

    let kind = kind.parse::<ActuationKind>().unwrap_or_else(|e| {
        tracing::warn!("{}, using {}", e, ActuationKind::default());
        ActuationKind::default()
    });

    Some(ScheduledEvent {
        offset_secs: parse_timestamp(time),
        kind,
        intensity,
        duration_ms,
    })
}

/// Parse event list text into a schedule sorted by offset.
///
/// Equal offsets keep their order of appearance.
pub fn parse_schedule(text: &str) -> Vec<ScheduledEvent> {
    let mut events: Vec<ScheduledEvent> = text
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .filter_map(parse_line)
        .collect();

    // sort_by_key is stable
    events.sort_by_key(|e| e.offset_secs);
    events
}

/// Load the schedule at `path`.
///
/// A missing file is not an error: playback simply runs without events.
pub fn load_schedule(path: &Path) -> Result<Vec<ScheduledEvent>, ScheduleError> {
    if !path.exists() {
        tracing::warn!("Timestamp file not found: {}", path.display());
        return Ok(Vec::new());
    }

    tracing::info!("Loading timestamps from {}", path.display());
    let bytes = fs::read(path).map_err(|source| ScheduleError::Read {
        path: path.to_path_buf(),
        source,
    })?;

    // Invalid UTF-8 only spoils the lines it appears on
    let text = String::from_utf8_lossy(&bytes);
    let events = parse_schedule(&text);
    tracing::info!("Loaded {} timestamps", events.len());
    Ok(events)
}
