use crate::config::{parse_tick_ms, Options};
use crate::logging::LogLevel;
use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;

/// Play an audio file and fire timed actuation events alongside it
#[derive(Parser, Debug, Default)]
#[command(name = "shockplay")]
#[command(version)]
#[command(
    about = "Play audio with a synchronized actuation schedule",
    long_about = "Plays AUDIO_FILE and sends the actuation events listed in the \
                  matching .txt file (MM:SS,Kind,Intensity,DurationMs per line). \
                  Press 'p' to pause/unpause and 's' to stop."
)]
pub struct Cli {
    /// Audio file to play
    #[arg(value_name = "AUDIO_FILE")]
    pub audio_file: PathBuf,

    /// Event list to use instead of the file next to the audio
    #[arg(short, long, value_name = "PATH")]
    pub events: Option<PathBuf>,

    /// Env file holding SHOCK_API_KEY and SHOCK_ID
    #[arg(long = "env-file", value_name = "PATH")]
    pub env_file: Option<PathBuf>,

    /// Actuation API endpoint
    #[arg(long = "api-url", value_name = "URL")]
    pub api_url: Option<String>,

    /// Label sent with each actuation command
    #[arg(long, value_name = "TEXT")]
    pub label: Option<String>,

    /// Play without sending any actuation commands
    #[arg(long = "no-actuation")]
    pub no_actuation: bool,

    /// Tick period in milliseconds (10-1000)
    #[arg(long = "tick-ms", value_name = "MS")]
    pub tick_ms: Option<String>,

    /// More log output (repeatable)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Only log warnings and errors
    #[arg(short, long, conflicts_with = "verbose")]
    pub quiet: bool,
}

impl Cli {
    pub fn log_level(&self) -> LogLevel {
        LogLevel::from_verbosity(self.verbose, self.quiet)
    }

    /// Merge CLI arguments into the options struct
    pub fn merge_into_options(&self, mut opts: Options) -> Result<Options> {
        opts.log_level = self.log_level();

        if let Some(ref events) = self.events {
            opts.events_file = Some(events.clone());
        }

        if let Some(ref url) = self.api_url {
            opts.api_url = url.clone();
        }

        if let Some(ref label) = self.label {
            opts.label = label.clone();
        }

        if self.no_actuation {
            opts.actuation_enabled = false;
        }

        if let Some(ref tick) = self.tick_ms {
            opts.tick_interval = parse_tick_ms(tick)?;
        }

        Ok(opts)
    }
}
