// shockplay library
// Audio playback with a synchronized actuation schedule

pub mod actuation;
pub mod audio;
pub mod cli;
pub mod clock;
pub mod config;
pub mod input;
pub mod logging;
pub mod player;
pub mod schedule;
pub mod transport;

pub use cli::Cli;
pub use config::Options;
pub use logging::LogLevel;
pub use player::{play, PlayerError, SessionOutcome};
pub use schedule::{ActuationKind, ScheduledEvent};
pub use transport::{PlayerState, TransportController};
