//! What the session needs from the editor that displays the trace.

use std::sync::Arc;

use linetrace_types::Annotation;

use crate::fingerprint::ContentFingerprint;

/// Identifies one text view. A file may be shown in several views.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ViewId(pub u64);

/// A file the editor currently has open.
#[derive(Debug, Clone)]
pub struct OpenFile {
    pub name: String,
    /// Fingerprint of the live buffer contents.
    pub content: ContentFingerprint,
    pub views: Vec<ViewId>,
}

/// The editor side of a session.
///
/// Calls arrive from the ingestion task as well as from gesture handling;
/// implementations hop onto their own UI thread if they need one.
pub trait EditorUi: Send + Sync {
    fn open_files(&self) -> Vec<OpenFile>;

    /// Replaces the annotations drawn in a view. `entries` has one element
    /// per line slot of the file.
    fn set_annotations(
        &self,
        view: ViewId,
        on: bool,
        selected: usize,
        entries: &[Option<Arc<Annotation>>],
    );

    /// Per-file indicators: whether trace data exists, and whether the
    /// content drifted from the traced version.
    fn set_annotations_state(&self, file: &str, has_data: bool, edited: bool);

    /// Opens (or scrolls to) `filename` at a byte offset.
    fn reveal(&self, filename: &str, offset: usize);

    fn message(&self, text: &str);

    fn warning(&self, text: &str);

    /// Empties the output area of the run.
    fn clear_output(&self);

    fn append_output(&self, text: &str);
}

/// Handle for writing into a run's output area.
#[derive(Clone)]
pub struct RunOutput {
    ui: Arc<dyn EditorUi>,
}

impl RunOutput {
    pub fn new(ui: Arc<dyn EditorUi>) -> Self {
        Self { ui }
    }

    pub fn write(&self, text: &str) {
        self.ui.append_output(text);
    }
}
