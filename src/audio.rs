//! Rodio-based audio playback
//!
//! The player needs a single music channel: load a file, start it, pause,
//! resume, stop, and ask whether anything is still audible. [`AudioEngine`]
//! captures that surface so the transport loop can be driven by a fake in tests.
//!
//! rodio's `OutputStream` is not `Send`, so the engine lives on the thread that
//! runs the session.

use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use rodio::{Decoder, OutputStream, OutputStreamHandle, Sink};

/// Errors raised by the audio engine
#[derive(Debug, thiserror::Error)]
pub enum AudioError {
    #[error("failed to open audio output: {0}")]
    Output(#[from] rodio::StreamError),

    #[error("failed to create playback sink: {0}")]
    Sink(#[from] rodio::PlayError),

    #[error("failed to open {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to decode {path}: {source}")]
    Decode {
        path: PathBuf,
        #[source]
        source: rodio::decoder::DecoderError,
    },

    #[error("no audio loaded")]
    NotLoaded,
}

/// Music playback surface consumed by the transport
pub trait AudioEngine {
    fn load(&mut self, path: &Path) -> Result<(), AudioError>;
    fn play(&mut self) -> Result<(), AudioError>;
    fn pause(&mut self);
    fn unpause(&mut self);
    fn stop(&mut self);
    /// True while queued audio remains, including while paused
    fn is_busy(&self) -> bool;
}

/// Audio engine backed by the default rodio output device
pub struct RodioEngine {
    // Must outlive every sink created from `handle`
    _stream: OutputStream,
    handle: OutputStreamHandle,
    sink: Option<Sink>,
    pending: Option<Decoder<BufReader<File>>>,
}

impl RodioEngine {
    /// Open the default output device
    pub fn open() -> Result<Self, AudioError> {
        let (stream, handle) = OutputStream::try_default()?;
        tracing::debug!("Audio output stream opened");
        Ok(RodioEngine {
            _stream: stream,
            handle,
            sink: None,
            pending: None,
        })
    }
}

impl AudioEngine for RodioEngine {
    fn load(&mut self, path: &Path) -> Result<(), AudioError> {
        let file = File::open(path).map_err(|source| AudioError::Open {
            path: path.to_path_buf(),
            source,
        })?;
        let decoder = Decoder::new(BufReader::new(file)).map_err(|source| AudioError::Decode {
            path: path.to_path_buf(),
            source,
        })?;

        self.stop();
        self.pending = Some(decoder);
        tracing::debug!("Loaded {}", path.display());
        Ok(())
    }

    fn play(&mut self) -> Result<(), AudioError> {
        let source = self.pending.take().ok_or(AudioError::NotLoaded)?;
        let sink = Sink::try_new(&self.handle)?;
        sink.append(source);
        self.sink = Some(sink);
        Ok(())
    }

    fn pause(&mut self) {
        if let Some(sink) = &self.sink {
            sink.pause();
        }
    }

    fn unpause(&mut self) {
        if let Some(sink) = &self.sink {
            sink.play();
        }
    }

    fn stop(&mut self) {
        if let Some(sink) = self.sink.take() {
            sink.stop();
        }
    }

    fn is_busy(&self) -> bool {
        self.sink.as_ref().is_some_and(|sink| !sink.empty())
    }
}
