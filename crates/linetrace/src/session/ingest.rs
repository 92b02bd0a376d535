//! The ingestion loop: drains the run's message stream into the index.

use linetrace_types::{ClientMessage, STATUS_CONNECTED};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::collaborator::RunControl;
use crate::error::RunError;
use crate::ui::RunOutput;

use super::Shared;
use super::ui_sync::{self, UiSyncScheduler};

/// Runs until the stream closes, the run is cancelled, or a fatal message
/// arrives. The views are refreshed one last time on every exit path.
pub(crate) async fn ingest(
    shared: &Shared,
    mut messages: mpsc::Receiver<ClientMessage>,
    control: &mut dyn RunControl,
    cancel: &CancellationToken,
    output: &RunOutput,
) -> Result<(), RunError> {
    let mut sync = UiSyncScheduler::new(shared.config.refresh_interval(), || {
        ui_sync::refresh_all(shared)
    });
    let mut handled = 0u64;

    let result = loop {
        tokio::select! {
            // cancellation wins over queued messages, and a due refresh
            // fires even while a backlog keeps the channel ready
            biased;
            _ = cancel.cancelled() => {
                debug!(handled, "ingestion cancelled");
                break Ok(());
            }
            _ = sync.due() => sync.refresh_now(),
            msg = messages.recv() => {
                let Some(msg) = msg else {
                    debug!(handled, "message stream closed");
                    break Ok(());
                };
                handled += 1;
                match handle_message(shared, msg, control) {
                    Ok(()) => {}
                    Err(e) if e.is_fatal() => break Err(e),
                    Err(e) => {
                        warn!(%e, "message dropped");
                        output.write(&format!("error: {e}\n"));
                    }
                }
                sync.note_ingest();
            }
        }
    };

    sync.refresh_now();
    result
}

fn handle_message(
    shared: &Shared,
    msg: ClientMessage,
    control: &mut dyn RunControl,
) -> Result<(), RunError> {
    match msg {
        ClientMessage::Status(status) if status == STATUS_CONNECTED => {
            control
                .request_file_set_positions()
                .map_err(|reason| RunError::Control {
                    request: "file set positions",
                    reason,
                })
        }
        ClientMessage::Status(status) => Err(RunError::UnhandledStatus(status)),
        ClientMessage::FilesData(data) => {
            let files = data.files.len();
            shared
                .index
                .write(|index| index.apply_file_metadata(data.files))
                .ok_or(RunError::NoIndex)?
                .map_err(RunError::Metadata)?;
            info!(files, "file table received");
            control.request_start().map_err(|reason| RunError::Control {
                request: "start",
                reason,
            })
        }
        ClientMessage::Line(line) => shared
            .index
            .write(|index| index.apply_event(line).map(drop))
            .ok_or(RunError::NoIndex)?
            .map_err(RunError::Event),
        // a batch stops at its first bad element
        ClientMessage::Lines(lines) => shared
            .index
            .write(|index| {
                lines
                    .into_iter()
                    .try_for_each(|line| index.apply_event(line).map(drop))
            })
            .ok_or(RunError::NoIndex)?
            .map_err(RunError::Event),
        ClientMessage::Error(reason) => Err(RunError::Transport(reason)),
    }
}
