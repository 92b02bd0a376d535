//! The session controller.
//!
//! A [`Session`] owns at most one run at a time. Starting a run cancels the
//! previous one and clears every view right away; the new run's task then
//! waits on the run gate until the old task has fully exited before it
//! installs a fresh [`TraceIndex`]. That ordering keeps a slow-to-stop run
//! from writing into its successor's index.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use linetrace_types::{GlobalGesture, LineGesture, SelectionGesture};
use parking_lot::{Mutex, RwLock};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::collaborator::{Collaborator, Launch, LaunchRequest, RunChannel};
use crate::config::SessionConfig;
use crate::error::{RunError, StartError};
use crate::format::{ItemFormatter, JsonFormatter};
use crate::index::TraceIndex;
use crate::ui::{EditorUi, RunOutput};

mod gesture;
mod ingest;
pub mod ui_sync;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RunId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    /// Waiting for the previous run to exit, or for the program to launch.
    Starting,
    Running,
    /// The message stream ended; waiting for the program to exit.
    Finished,
    /// Cancellation requested; the run's task has not exited yet.
    Cancelled,
}

// ── Shared state ─────────────────────────────────────────────

/// The trace index behind its reader/writer lock.
///
/// `None` between a cancel and the next run's start; every accessor then
/// reports that nothing happened.
pub(crate) struct SharedIndex {
    data: RwLock<Option<TraceIndex>>,
}

impl SharedIndex {
    fn new() -> Self {
        Self {
            data: RwLock::new(None),
        }
    }

    pub(crate) fn read<R>(&self, f: impl FnOnce(&TraceIndex) -> R) -> Option<R> {
        self.data.read().as_ref().map(f)
    }

    pub(crate) fn write<R>(&self, f: impl FnOnce(&mut TraceIndex) -> R) -> Option<R> {
        self.data.write().as_mut().map(f)
    }

    fn install(&self, index: TraceIndex) {
        *self.data.write() = Some(index);
    }

    /// Drops the index and runs `on_cleared` before any reader can observe
    /// the empty state. Returns false if there was nothing to drop.
    fn clear_with(&self, on_cleared: impl FnOnce()) -> bool {
        let mut data = self.data.write();
        if data.take().is_none() {
            return false;
        }
        on_cleared();
        true
    }
}

struct ActiveRun {
    id: RunId,
    cancel: CancellationToken,
    task: Option<JoinHandle<()>>,
}

struct RunSlot {
    state: SessionState,
    current: Option<ActiveRun>,
}

pub(crate) struct Shared {
    pub(crate) config: SessionConfig,
    pub(crate) ui: Arc<dyn EditorUi>,
    collaborator: Arc<dyn Collaborator>,
    formatter: Arc<dyn ItemFormatter>,
    pub(crate) index: SharedIndex,
    // Held by a run's task for its whole lifetime.
    run_gate: tokio::sync::Mutex<()>,
    runs: Mutex<RunSlot>,
    root_cancel: CancellationToken,
    next_run_id: AtomicU64,
}

impl Shared {
    fn set_state(&self, id: RunId, state: SessionState) {
        let mut runs = self.runs.lock();
        let is_current = runs.current.as_ref().is_some_and(|run| run.id == id);
        if is_current && runs.state != SessionState::Cancelled {
            runs.state = state;
        }
    }

    fn finish_run(&self, id: RunId) {
        let mut runs = self.runs.lock();
        if runs.current.as_ref().is_some_and(|run| run.id == id) {
            runs.state = SessionState::Idle;
        }
    }
}

// ── Session ──────────────────────────────────────────────────

/// Single-owner handle on the debug session.
///
/// The application keeps exactly one of these. Must be used from within a
/// Tokio runtime.
pub struct Session {
    shared: Arc<Shared>,
}

impl Session {
    pub fn new(
        config: SessionConfig,
        ui: Arc<dyn EditorUi>,
        collaborator: Arc<dyn Collaborator>,
    ) -> Self {
        Self::with_formatter(config, ui, collaborator, Arc::new(JsonFormatter))
    }

    pub fn with_formatter(
        config: SessionConfig,
        ui: Arc<dyn EditorUi>,
        collaborator: Arc<dyn Collaborator>,
        formatter: Arc<dyn ItemFormatter>,
    ) -> Self {
        Self {
            shared: Arc::new(Shared {
                config,
                ui,
                collaborator,
                formatter,
                index: SharedIndex::new(),
                run_gate: tokio::sync::Mutex::new(()),
                runs: Mutex::new(RunSlot {
                    state: SessionState::Idle,
                    current: None,
                }),
                root_cancel: CancellationToken::new(),
                next_run_id: AtomicU64::new(1),
            }),
        }
    }

    pub fn state(&self) -> SessionState {
        self.shared.runs.lock().state
    }

    /// Read access to the live index, if a run has installed one.
    pub fn with_index<R>(&self, f: impl FnOnce(&TraceIndex) -> R) -> Option<R> {
        self.shared.index.read(f)
    }

    /// Starts a run in `target` (a directory, or a file whose directory is
    /// used), cancelling any run in progress.
    pub fn start(&self, target: &Path, args: Vec<String>) -> Result<RunId, StartError> {
        let dir = run_dir(target)?;

        // only one run at a time
        self.cancel();

        let id = RunId(self.shared.next_run_id.fetch_add(1, Ordering::Relaxed));
        let cancel = self.shared.root_cancel.child_token();
        info!(run = id.0, dir = %dir.display(), "starting run");

        let mut runs = self.shared.runs.lock();
        let task = tokio::spawn(run(Arc::clone(&self.shared), id, dir, args, cancel.clone()));
        runs.state = SessionState::Starting;
        runs.current = Some(ActiveRun {
            id,
            cancel,
            task: Some(task),
        });
        Ok(id)
    }

    /// Requests the active run to stop and clears every view immediately,
    /// whether or not the run has stopped yet.
    pub fn cancel(&self) {
        // the run slot stays locked while the index is dropped, so a run
        // task can't install its index in between
        let mut runs = self.shared.runs.lock();
        let stopped = runs
            .current
            .as_ref()
            .filter(|run| !run.cancel.is_cancelled())
            .map(|run| {
                run.cancel.cancel();
                run.id
            });
        if let Some(id) = stopped {
            info!(run = id.0, "run cancelled");
            if matches!(
                runs.state,
                SessionState::Starting | SessionState::Running | SessionState::Finished
            ) {
                runs.state = SessionState::Cancelled;
            }
        }

        let ui = &self.shared.ui;
        if self
            .shared
            .index
            .clear_with(|| ui_sync::clear_all_views(ui.as_ref()))
        {
            debug!("trace index cleared");
        }
    }

    /// Waits for the current run's task to exit.
    pub async fn wait(&self) {
        let task = self
            .shared
            .runs
            .lock()
            .current
            .as_mut()
            .and_then(|run| run.task.take());
        if let Some(task) = task {
            if let Err(e) = task.await {
                error!(%e, "run task failed");
            }
        }
    }

    /// Re-renders one file, e.g. after the editor opened a new view on it.
    pub fn refresh_view(&self, name: &str) {
        ui_sync::refresh_file(&self.shared, name);
    }

    pub fn on_selection_gesture(&self, gesture: &SelectionGesture) {
        match gesture {
            SelectionGesture::Line(g) => self.on_line_gesture(g),
            SelectionGesture::Global(g) => self.on_global_gesture(*g),
        }
    }

    pub fn on_line_gesture(&self, gesture: &LineGesture) {
        gesture::on_line_gesture(&self.shared, gesture);
    }

    pub fn on_global_gesture(&self, gesture: GlobalGesture) {
        gesture::on_global_gesture(&self.shared, gesture);
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.shared.root_cancel.cancel();
    }
}

fn run_dir(target: &Path) -> Result<PathBuf, StartError> {
    let dir = if target.is_file() {
        target.parent().map(Path::to_path_buf).unwrap_or_default()
    } else {
        target.to_path_buf()
    };
    if !dir.is_dir() {
        return Err(StartError::InvalidTarget(target.to_path_buf()));
    }
    Ok(dir)
}

// ── Run task ─────────────────────────────────────────────────

async fn run(
    shared: Arc<Shared>,
    id: RunId,
    dir: PathBuf,
    args: Vec<String>,
    cancel: CancellationToken,
) {
    // wait for the previous run to finish
    let _gate = shared.run_gate.lock().await;
    let installed = {
        // a cancel holds this lock while it drops the index
        let _runs = shared.runs.lock();
        let live = !cancel.is_cancelled();
        if live {
            shared.index.install(TraceIndex::new(
                Arc::clone(&shared.formatter),
                shared.config.case_insensitive_paths,
            ));
        }
        live
    };
    if !installed {
        debug!(run = id.0, "run cancelled before it started");
        shared.finish_run(id);
        return;
    }

    shared.ui.clear_output();
    ui_sync::refresh_all(&shared);

    let output = RunOutput::new(Arc::clone(&shared.ui));
    match drive(&shared, id, dir, args, &cancel, &output).await {
        Ok(()) => info!(run = id.0, cancelled = cancel.is_cancelled(), "run finished"),
        Err(e) => {
            error!(run = id.0, %e, "run failed");
            output.write(&format!("error: {e}\n"));
        }
    }
    shared.finish_run(id);
}

async fn drive(
    shared: &Shared,
    id: RunId,
    dir: PathBuf,
    args: Vec<String>,
    cancel: &CancellationToken,
    output: &RunOutput,
) -> Result<(), RunError> {
    if cancel.is_cancelled() {
        return Ok(());
    }
    let request = LaunchRequest {
        dir,
        args,
        output: output.clone(),
    };
    let launch = shared
        .collaborator
        .launch(request, cancel.clone())
        .await
        .map_err(RunError::Launch)?;
    let RunChannel {
        messages,
        mut control,
    } = match launch {
        Launch::Done => return Ok(()),
        Launch::Running(channel) => channel,
    };
    shared.set_state(id, SessionState::Running);

    let ingested = ingest::ingest(shared, messages, control.as_mut(), cancel, output).await;
    shared.set_state(id, SessionState::Finished);
    if ingested.is_err() {
        // a fatal stream error: stop the program too
        cancel.cancel();
    }
    let waited = control.wait().await;
    match (ingested, waited) {
        (Err(e), _) => Err(e),
        (Ok(()), Err(e)) if !cancel.is_cancelled() => Err(RunError::Exit(e)),
        _ => Ok(()),
    }
}
