//! Data types exchanged between linetrace and the collaborators around it.
//!
//! The instrumented-program side produces [`ClientMessage`]s; the editor side
//! consumes [`Annotation`]s and produces [`LineGesture`]s and [`GlobalGesture`]s.

use facet::Facet;

/// Status string sent by the collaborator once its transport is ready.
pub const STATUS_CONNECTED: &str = "connected";

// ── Inbound messages ─────────────────────────────────────────

/// Per-file data recorded by the annotator when the run was built.
#[derive(Facet, Debug, Clone, PartialEq, Eq)]
pub struct FileDescriptor {
    /// Position of this file in the run's file table.
    pub file_index: usize,
    /// Path of the annotated source file.
    pub filename: String,
    /// Size of the file when it was annotated.
    pub file_size: u64,
    /// Content hash of the file when it was annotated.
    pub file_hash: Vec<u8>,
    /// Number of debug lines (line slots) declared for this file.
    pub debug_len: usize,
}

/// Declares the shape of the file table for a run.
#[derive(Facet, Debug, Clone, PartialEq, Eq)]
pub struct FilesData {
    pub files: Vec<FileDescriptor>,
}

/// One executed line, with the value it produced.
#[derive(Facet, Debug, Clone)]
pub struct LineMsg {
    pub file_index: usize,
    /// Line slot within the file (not a source line number).
    pub debug_index: usize,
    /// Byte offset in the source file where the value was observed.
    pub offset: usize,
    /// The instrumented value. Opaque to the index.
    pub item: facet_value::Value,
}

/// Everything the instrumented-program collaborator can deliver, in order.
#[derive(Facet, Debug, Clone)]
#[repr(u8)]
#[facet(rename_all = "snake_case")]
pub enum ClientMessage {
    /// Transport status. Only [`STATUS_CONNECTED`] is meaningful.
    Status(String),
    FilesData(FilesData),
    Line(LineMsg),
    Lines(Vec<LineMsg>),
    /// Terminal failure on the collaborator side (decode, read, process).
    Error(String),
}

impl ClientMessage {
    pub fn connected() -> Self {
        Self::Status(STATUS_CONNECTED.to_string())
    }
}

// ── Annotations ──────────────────────────────────────────────

/// Rendering-ready text attached to a source offset.
#[derive(Facet, Debug, Clone, PartialEq, Eq)]
pub struct Annotation {
    pub offset: usize,
    pub bytes: Vec<u8>,
}

impl Annotation {
    pub fn new(offset: usize, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            offset,
            bytes: bytes.into(),
        }
    }

    /// Text shown on a line whose events all arrived after the cursor.
    pub fn placeholder(offset: usize) -> Self {
        Self::new(offset, b" ".to_vec())
    }

    pub fn text(&self) -> std::borrow::Cow<'_, str> {
        String::from_utf8_lossy(&self.bytes)
    }
}

// ── Gestures ─────────────────────────────────────────────────

/// What a click on an inline annotation asks for.
#[derive(Facet, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
#[facet(rename_all = "snake_case")]
pub enum LineGestureKind {
    /// Select the event currently shown on the line.
    Current,
    /// Select the previous event of the same line.
    CurrentPrev,
    /// Select the next event of the same line.
    CurrentNext,
    /// Print the full value of the shown event.
    Print,
    /// Print every value of the line up to the shown event.
    PrintAll,
}

/// A gesture bound to one line of one file.
#[derive(Facet, Debug, Clone, PartialEq, Eq)]
pub struct LineGesture {
    pub filename: String,
    /// Line slot the clicked annotation belongs to.
    pub line: usize,
    /// Byte offset of the click inside the annotation text.
    pub offset: usize,
    pub kind: LineGestureKind,
}

/// A gesture not bound to any file.
#[derive(Facet, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
#[facet(rename_all = "snake_case")]
pub enum GlobalGesture {
    First,
    Last,
    Prev,
    Next,
    /// Drop every recorded event, keeping the file table.
    Clear,
}

/// Either kind of selection gesture, as delivered by the editor.
#[derive(Facet, Debug, Clone, PartialEq, Eq)]
#[repr(u8)]
#[facet(rename_all = "snake_case")]
pub enum SelectionGesture {
    Line(LineGesture),
    Global(GlobalGesture),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn placeholder_is_a_single_space() {
        let ann = Annotation::placeholder(17);
        assert_eq!(ann.offset, 17);
        assert_eq!(ann.text(), " ");
    }

    #[test]
    fn connected_status_uses_the_protocol_string() {
        let ClientMessage::Status(status) = ClientMessage::connected() else {
            panic!("connected() must build a status message");
        };
        assert_eq!(status, STATUS_CONNECTED);
    }
}
