use std::fmt;
use std::path::PathBuf;

/// A file or line index that does not fit the current file table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IndexError {
    BadFileIndex { index: usize, len: usize },
    BadLineIndex { file: usize, index: usize, len: usize },
}

impl fmt::Display for IndexError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BadFileIndex { index, len } => write!(f, "bad file index: {index} len={len}"),
            Self::BadLineIndex { file, index, len } => {
                write!(f, "bad debug index: {index} len={len} (file {file})")
            }
        }
    }
}

impl std::error::Error for IndexError {}

/// Returned synchronously by [`crate::Session::start`]; no run is created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StartError {
    InvalidTarget(PathBuf),
}

impl fmt::Display for StartError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidTarget(path) => {
                write!(f, "can't run on this target: {}", path.display())
            }
        }
    }
}

impl std::error::Error for StartError {}

/// Anything that goes wrong while a run is ingesting.
///
/// These are written to the run's output, never returned to the UI layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunError {
    /// A single event referenced a slot outside the table. The event is dropped.
    Event(IndexError),
    /// The file table itself was malformed. Ends the run.
    Metadata(IndexError),
    /// The collaborator could not read or decode its stream. Ends the run.
    Transport(String),
    /// The collaborator failed to launch the program. Ends the run.
    Launch(String),
    Control {
        request: &'static str,
        reason: String,
    },
    UnhandledStatus(String),
    /// A message arrived after the index was cleared.
    NoIndex,
    /// The program exited with a failure after the stream closed.
    Exit(String),
}

impl RunError {
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::Metadata(_) | Self::Transport(_) | Self::Launch(_)
        )
    }
}

impl fmt::Display for RunError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Event(e) => write!(f, "{e}"),
            Self::Metadata(e) => write!(f, "{e} at init"),
            Self::Transport(e) => write!(f, "transport: {e}"),
            Self::Launch(e) => write!(f, "launch: {e}"),
            Self::Control { request, reason } => write!(f, "request {request}: {reason}"),
            Self::UnhandledStatus(s) => write!(f, "unhandled string: {s}"),
            Self::NoIndex => write!(f, "trace index is not installed"),
            Self::Exit(e) => write!(f, "program exited: {e}"),
        }
    }
}

impl std::error::Error for RunError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Event(e) | Self::Metadata(e) => Some(e),
            _ => None,
        }
    }
}
