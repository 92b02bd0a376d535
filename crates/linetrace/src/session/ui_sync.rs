//! Pushing index state into the editor.
//!
//! Ingestion can deliver thousands of events per second; re-rendering every
//! open file for each one would swamp the editor. [`UiSyncScheduler`] folds
//! bursts into at most one refresh per interval, with the first refresh of a
//! burst landing one interval after its first event.

use std::future::pending;
use std::pin::Pin;
use std::time::Duration;

use tokio::time::{Sleep, sleep};
use tracing::trace;

use crate::index::{SelectedLocation, TraceIndex};
use crate::ui::{EditorUi, OpenFile};

use super::Shared;

// ── Scheduler ────────────────────────────────────────────────

/// Coalesces ingestion activity into throttled refreshes.
///
/// At most one refresh is pending at a time. Ingesting while one is pending
/// does not push it back.
pub struct UiSyncScheduler<F> {
    interval: Duration,
    pending: Option<Pin<Box<Sleep>>>,
    refresh: F,
}

impl<F: FnMut()> UiSyncScheduler<F> {
    pub fn new(interval: Duration, refresh: F) -> Self {
        Self {
            interval,
            pending: None,
            refresh,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Records that the index changed; arms a refresh unless one is pending.
    pub fn note_ingest(&mut self) {
        if self.pending.is_none() {
            self.pending = Some(Box::pin(sleep(self.interval)));
        }
    }

    /// Resolves when the pending refresh is due. Never resolves while idle.
    ///
    /// Cancel-safe: dropping the future keeps the deadline armed.
    pub async fn due(&mut self) {
        match self.pending.as_mut() {
            Some(timer) => timer.as_mut().await,
            None => pending::<()>().await,
        }
    }

    /// Runs the refresh now and disarms any pending one.
    pub fn refresh_now(&mut self) {
        self.pending = None;
        (self.refresh)();
    }
}

// ── Rendering ────────────────────────────────────────────────

/// Re-renders every open file.
pub(crate) fn refresh_all(shared: &Shared) {
    let ui = shared.ui.as_ref();
    shared.index.read(|index| {
        for file in ui.open_files() {
            update_file(index, ui, &file);
        }
    });
}

pub(crate) fn refresh_file(shared: &Shared, name: &str) {
    let ui = shared.ui.as_ref();
    shared.index.read(|index| {
        for file in ui.open_files().iter().filter(|f| f.name == name) {
            update_file(index, ui, file);
        }
    });
}

/// Re-renders every open file, then brings the selected event into view.
pub(crate) fn refresh_and_reveal(shared: &Shared) {
    let ui = shared.ui.as_ref();
    shared.index.read(|index| {
        for file in ui.open_files() {
            update_file(index, ui, &file);
        }
        reveal_selected(index, ui);
    });
}

/// Removes every annotation from every open view.
pub(crate) fn clear_all_views(ui: &dyn EditorUi) {
    for file in ui.open_files() {
        clear_file(ui, &file);
    }
}

fn clear_file(ui: &dyn EditorUi, file: &OpenFile) {
    ui.set_annotations_state(&file.name, false, false);
    clear_views(ui, file);
}

fn clear_views(ui: &dyn EditorUi, file: &OpenFile) {
    for &view in &file.views {
        ui.set_annotations(view, false, 0, &[]);
    }
}

fn update_file(index: &TraceIndex, ui: &dyn EditorUi, file: &OpenFile) {
    let Some(fi) = index.file_index(&file.name) else {
        clear_file(ui, file);
        return;
    };
    let (Some(resolved), Some(descriptor)) =
        (index.resolve_selection_for_file(fi), index.descriptor(fi))
    else {
        clear_file(ui, file);
        return;
    };

    if !file
        .content
        .matches(descriptor.file_size, &descriptor.file_hash)
    {
        trace!(file = %file.name, "content changed since the run started");
        if resolved.selected.is_some() {
            index.mark_selection_edited();
        }
        ui.set_annotations_state(&file.name, true, true);
        clear_views(ui, file);
        return;
    }

    ui.set_annotations_state(&file.name, true, false);
    let selected = resolved.selected_line();
    for &view in &file.views {
        ui.set_annotations(view, true, selected, &resolved.entries);
    }
}

fn reveal_selected(index: &TraceIndex, ui: &dyn EditorUi) {
    match index.selected_location() {
        Some(SelectedLocation::Source { filename, offset }) => ui.reveal(&filename, offset),
        Some(SelectedLocation::Edited {
            filename,
            arrival_index,
        }) => ui.warning(&format!(
            "selection at edited row: {filename}: step {arrival_index}"
        )),
        None => {}
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;
    use std::rc::Rc;

    use super::*;

    const INTERVAL: Duration = Duration::from_millis(66);

    fn counting() -> (Rc<Cell<usize>>, impl FnMut()) {
        let count = Rc::new(Cell::new(0));
        let handle = Rc::clone(&count);
        (count, move || handle.set(handle.get() + 1))
    }

    #[tokio::test(start_paused = true)]
    async fn burst_refreshes_once_after_one_interval() {
        let (count, refresh) = counting();
        let mut sync = UiSyncScheduler::new(INTERVAL, refresh);
        let start = tokio::time::Instant::now();

        for _ in 0..1000 {
            sync.note_ingest();
        }
        sync.due().await;
        sync.refresh_now();

        assert_eq!(count.get(), 1);
        assert_eq!(start.elapsed(), INTERVAL);
        assert!(!sync.is_pending());
    }

    #[tokio::test(start_paused = true)]
    async fn ingest_while_pending_does_not_delay() {
        let (count, refresh) = counting();
        let mut sync = UiSyncScheduler::new(INTERVAL, refresh);
        let start = tokio::time::Instant::now();

        sync.note_ingest();
        tokio::time::advance(Duration::from_millis(50)).await;
        sync.note_ingest();
        sync.due().await;
        sync.refresh_now();

        assert_eq!(start.elapsed(), INTERVAL);
        assert_eq!(count.get(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn idle_scheduler_never_fires() {
        let (count, refresh) = counting();
        let mut sync = UiSyncScheduler::new(INTERVAL, refresh);
        let fired = tokio::time::timeout(Duration::from_secs(5), sync.due()).await;
        assert!(fired.is_err());
        assert_eq!(count.get(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn refresh_now_disarms() {
        let (count, refresh) = counting();
        let mut sync = UiSyncScheduler::new(INTERVAL, refresh);
        sync.note_ingest();
        sync.refresh_now();
        assert!(!sync.is_pending());
        assert_eq!(count.get(), 1);

        sync.note_ingest();
        assert!(sync.is_pending());
    }
}
