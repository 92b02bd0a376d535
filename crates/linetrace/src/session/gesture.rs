//! Editor gestures that move or read the selection.

use linetrace_types::{GlobalGesture, LineGesture, LineGestureKind};
use tracing::debug;

use crate::index::{Direction, LineStep};

use super::Shared;
use super::ui_sync;

pub(super) fn on_line_gesture(shared: &Shared, gesture: &LineGesture) {
    debug!(
        file = %gesture.filename,
        line = gesture.line,
        offset = gesture.offset,
        kind = ?gesture.kind,
        "line gesture"
    );
    let step = match gesture.kind {
        LineGestureKind::Current => LineStep::Current,
        LineGestureKind::CurrentPrev => LineStep::Prev,
        LineGestureKind::CurrentNext => LineStep::Next,
        LineGestureKind::Print => return print_entry(shared, gesture),
        LineGestureKind::PrintAll => return print_entries(shared, gesture),
    };

    let moved = shared
        .index
        .write(|index| {
            index
                .file_index(&gesture.filename)
                .is_some_and(|fi| index.move_selection_within_line(fi, gesture.line, step))
        })
        .unwrap_or(false);
    if moved {
        ui_sync::refresh_and_reveal(shared);
    }
}

pub(super) fn on_global_gesture(shared: &Shared, gesture: GlobalGesture) {
    debug!(?gesture, "global gesture");
    let moved = shared
        .index
        .write(|index| match gesture {
            GlobalGesture::First => index.move_selection(Direction::First),
            GlobalGesture::Last => index.move_selection(Direction::Last),
            GlobalGesture::Prev => index.move_selection(Direction::Prev),
            GlobalGesture::Next => index.move_selection(Direction::Next),
            GlobalGesture::Clear => {
                index.clear_events();
                true
            }
        })
        .unwrap_or(false);
    if moved {
        ui_sync::refresh_and_reveal(shared);
    }
}

fn print_entry(shared: &Shared, gesture: &LineGesture) {
    let text = shared
        .index
        .read(|index| {
            let fi = index.file_index(&gesture.filename)?;
            index.shown_entry_text(fi, gesture.line)
        })
        .flatten();
    if let Some(s) = text {
        shared.ui.message(&format!("annotation:\n\t{s}\n"));
    }
}

fn print_entries(shared: &Shared, gesture: &LineGesture) {
    let texts = shared
        .index
        .read(|index| {
            let fi = index.file_index(&gesture.filename)?;
            index.shown_entries_text(fi, gesture.line)
        })
        .flatten();
    if let Some(texts) = texts {
        let mut out = format!("annotations ({} entries):\n", texts.len());
        for s in &texts {
            out.push_str(&format!("\t{s}\n"));
        }
        shared.ui.message(&out);
    }
}
