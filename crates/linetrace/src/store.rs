//! Per-line event storage.
//!
//! A [`FileRecord`] owns one [`LineSlot`] per debug line declared at run
//! start. Slots only ever grow at the end, and ingestion hands out arrival
//! indices in order, so every slot is sorted by arrival index and can be
//! binary-searched against the selection cursor.

use std::sync::{Arc, OnceLock};

use linetrace_types::{Annotation, LineMsg};
use parking_lot::Mutex;

use crate::format::ItemFormatter;

// ── Events ───────────────────────────────────────────────────

pub(crate) struct LineEvent {
    pub(crate) arrival: u64,
    pub(crate) msg: LineMsg,
    annotation: OnceLock<Arc<Annotation>>,
}

impl LineEvent {
    pub(crate) fn new(arrival: u64, msg: LineMsg) -> Self {
        Self {
            arrival,
            msg,
            annotation: OnceLock::new(),
        }
    }

    /// Display annotation, stringified on first use and reused afterwards.
    pub(crate) fn annotation(&self, formatter: &dyn ItemFormatter) -> Arc<Annotation> {
        self.annotation
            .get_or_init(|| {
                Arc::new(Annotation::new(
                    self.msg.offset,
                    formatter.inline(&self.msg.item).into_bytes(),
                ))
            })
            .clone()
    }

    fn placeholder(&self) -> Arc<Annotation> {
        Arc::new(Annotation::placeholder(self.msg.offset))
    }

    fn arrived_by(&self, cursor: i64) -> bool {
        i64::try_from(self.arrival).is_ok_and(|arrival| arrival <= cursor)
    }
}

// ── Line slots ───────────────────────────────────────────────

#[derive(Default)]
pub(crate) struct LineSlot {
    pub(crate) events: Vec<LineEvent>,
}

impl LineSlot {
    /// Local position of the newest event that arrived at or before `cursor`.
    pub(crate) fn position_at(&self, cursor: i64) -> Option<usize> {
        self.events
            .partition_point(|event| event.arrived_by(cursor))
            .checked_sub(1)
    }

    /// Local position of the event with exactly this arrival index.
    pub(crate) fn position_of(&self, arrival: u64) -> Option<usize> {
        self.events
            .binary_search_by_key(&arrival, |event| event.arrival)
            .ok()
    }
}

// ── Files ────────────────────────────────────────────────────

/// Which event a file's lines currently display.
#[derive(Default)]
struct ShownLines {
    entries: Vec<Option<Arc<Annotation>>>,
    steps: Vec<Option<usize>>,
}

pub(crate) struct FileRecord {
    pub(crate) lines: Vec<LineSlot>,
    // Written while rendering, which only holds the index's shared lock.
    shown: Mutex<ShownLines>,
}

/// The event a line shows when that event is the one under the cursor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SelectedEntry {
    pub line: usize,
    pub step: usize,
}

/// Result of resolving a file against the cursor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedFile {
    /// Set when one of the file's lines shows exactly the cursor's event.
    pub selected: Option<SelectedEntry>,
    /// One entry per line slot; `None` for lines without any event.
    pub entries: Vec<Option<Arc<Annotation>>>,
}

impl ResolvedFile {
    /// Index handed to the UI as the highlighted entry.
    pub fn selected_line(&self) -> usize {
        self.selected.map_or(0, |entry| entry.line)
    }
}

impl FileRecord {
    pub(crate) fn new(line_count: usize) -> Self {
        let mut lines = Vec::with_capacity(line_count);
        lines.resize_with(line_count, LineSlot::default);
        Self {
            lines,
            shown: Mutex::new(ShownLines {
                entries: vec![None; line_count],
                steps: vec![None; line_count],
            }),
        }
    }

    pub(crate) fn line_count(&self) -> usize {
        self.lines.len()
    }

    pub(crate) fn resolve(&self, cursor: i64, formatter: &dyn ItemFormatter) -> ResolvedFile {
        let mut shown = self.shown.lock();
        let mut selected = None;
        for (line, slot) in self.lines.iter().enumerate() {
            let step = slot.position_at(cursor);
            shown.entries[line] = match step {
                Some(k) => {
                    let event = &slot.events[k];
                    if i64::try_from(event.arrival).is_ok_and(|arrival| arrival == cursor) {
                        selected = Some(SelectedEntry { line, step: k });
                    }
                    Some(event.annotation(formatter))
                }
                None => slot.events.first().map(LineEvent::placeholder),
            };
            shown.steps[line] = step;
        }
        ResolvedFile {
            selected,
            entries: shown.entries.clone(),
        }
    }

    /// Local position the line displayed at the last resolve.
    pub(crate) fn shown_step(&self, line: usize) -> Option<usize> {
        self.shown.lock().steps.get(line).copied().flatten()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::JsonFormatter;

    fn event(arrival: u64, debug_index: usize) -> LineEvent {
        LineEvent::new(
            arrival,
            LineMsg {
                file_index: 0,
                debug_index,
                offset: debug_index * 10,
                item: (arrival as i64).into(),
            },
        )
    }

    fn slot(arrivals: &[u64]) -> LineSlot {
        LineSlot {
            events: arrivals.iter().map(|&a| event(a, 0)).collect(),
        }
    }

    #[test]
    fn position_is_rightmost_event_at_or_before_cursor() {
        let slot = slot(&[2, 5, 9]);
        assert_eq!(slot.position_at(-1), None);
        assert_eq!(slot.position_at(1), None);
        assert_eq!(slot.position_at(2), Some(0));
        assert_eq!(slot.position_at(4), Some(0));
        assert_eq!(slot.position_at(5), Some(1));
        assert_eq!(slot.position_at(100), Some(2));
        assert_eq!(LineSlot::default().position_at(100), None);
    }

    #[test]
    fn annotation_is_built_once() {
        let ev = event(3, 1);
        let a = ev.annotation(&JsonFormatter);
        let b = ev.annotation(&JsonFormatter);
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(a.offset, 10);
        assert_eq!(a.text(), "3");
    }

    #[test]
    fn lines_with_only_future_events_show_a_placeholder() {
        let mut file = FileRecord::new(2);
        file.lines[0].events.push(event(4, 0));
        let resolved = file.resolve(1, &JsonFormatter);
        assert_eq!(resolved.selected, None);
        assert_eq!(resolved.entries[0].as_deref(), Some(&Annotation::placeholder(0)));
        assert_eq!(resolved.entries[1], None);
        assert_eq!(file.shown_step(0), None);
    }
}
