//! What the session needs from the side that runs the instrumented program.

use std::path::PathBuf;

use async_trait::async_trait;
use linetrace_types::ClientMessage;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::ui::RunOutput;

pub struct LaunchRequest {
    /// Directory the program is built and run from.
    pub dir: PathBuf,
    pub args: Vec<String>,
    /// Where the program's stdout and stderr go.
    pub output: RunOutput,
}

pub enum Launch {
    /// The command completed without needing a trace session.
    Done,
    Running(RunChannel),
}

/// A live instrumented program.
pub struct RunChannel {
    pub messages: mpsc::Receiver<ClientMessage>,
    pub control: Box<dyn RunControl>,
}

/// Control requests sent back to the instrumented program.
///
/// Both are fire-and-forget; an error only means the request could not be
/// handed to the transport.
#[async_trait]
pub trait RunControl: Send {
    fn request_file_set_positions(&mut self) -> Result<(), String>;

    fn request_start(&mut self) -> Result<(), String>;

    /// Waits for the program to exit once the message stream is done.
    async fn wait(self: Box<Self>) -> Result<(), String>;
}

#[async_trait]
pub trait Collaborator: Send + Sync {
    /// Builds and starts the instrumented program.
    ///
    /// `cancel` fires when the session cancels the run; the collaborator is
    /// expected to stop the program and close the message channel.
    async fn launch(&self, request: LaunchRequest, cancel: CancellationToken)
    -> Result<Launch, String>;
}
