//! The trace index: file table, arrival counter, and selection.

use std::collections::HashMap;
use std::sync::Arc;

use linetrace_types::{FileDescriptor, LineMsg};
use parking_lot::Mutex;
use tracing::debug;

use crate::error::IndexError;
use crate::format::ItemFormatter;
use crate::store::{FileRecord, LineEvent, LineSlot, ResolvedFile};

/// Arrival counter value before any event was ingested.
const NO_EVENT: i64 = -1;

/// Global cursor moves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    First,
    Last,
    Prev,
    Next,
}

/// Cursor moves restricted to the events of one line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineStep {
    Current,
    Prev,
    Next,
}

/// Snapshot of the selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Selection {
    pub arrival_index: Option<u64>,
    /// Set once a resolve has found the event under the cursor.
    pub resolved: Option<ResolvedEvent>,
}

/// Coordinates of the selected event, as found by a resolve.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedEvent {
    pub file_index: usize,
    pub line_index: usize,
    pub step: usize,
    /// The event lives in a file whose content changed since the run began.
    pub edited: bool,
}

/// Where the selected event was recorded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectedLocation {
    Source { filename: String, offset: usize },
    /// The selection lives in a file whose content changed since the run began.
    Edited { filename: String, arrival_index: u64 },
}

#[derive(Debug, Clone, Copy)]
struct Resolved {
    /// Cursor value these coordinates were resolved for.
    arrival: i64,
    file: usize,
    line: usize,
    step: usize,
    edited: bool,
}

impl Default for Resolved {
    fn default() -> Self {
        Self {
            arrival: NO_EVENT,
            file: 0,
            line: 0,
            step: 0,
            edited: false,
        }
    }
}

pub struct TraceIndex {
    formatter: Arc<dyn ItemFormatter>,
    case_insensitive: bool,

    files_index: HashMap<String, usize>,
    descriptors: Vec<FileDescriptor>,
    files: Vec<FileRecord>,

    last_arrival: i64,
    cursor: i64,
    // Written while rendering, which only holds the shared lock.
    resolved: Mutex<Resolved>,
}

impl TraceIndex {
    pub fn new(formatter: Arc<dyn ItemFormatter>, case_insensitive: bool) -> Self {
        Self {
            formatter,
            case_insensitive,
            files_index: HashMap::new(),
            descriptors: Vec::new(),
            files: Vec::new(),
            last_arrival: NO_EVENT,
            cursor: NO_EVENT,
            resolved: Mutex::new(Resolved::default()),
        }
    }

    // ── Lookup ───────────────────────────────────────────────

    fn key(&self, name: &str) -> String {
        if self.case_insensitive {
            name.to_lowercase()
        } else {
            name.to_string()
        }
    }

    pub fn file_index(&self, name: &str) -> Option<usize> {
        self.files_index.get(&self.key(name)).copied()
    }

    pub fn descriptor(&self, file_index: usize) -> Option<&FileDescriptor> {
        self.descriptors.iter().find(|d| d.file_index == file_index)
    }

    pub fn file_count(&self) -> usize {
        self.files.len()
    }

    pub fn line_count(&self, file_index: usize) -> Option<usize> {
        self.files.get(file_index).map(FileRecord::line_count)
    }

    /// Number of events recorded on one line.
    pub fn event_count(&self, file_index: usize, line: usize) -> Option<usize> {
        self.slot(file_index, line).map(|slot| slot.events.len())
    }

    /// Arrival indices recorded on one line, oldest first.
    pub fn line_arrivals(&self, file_index: usize, line: usize) -> Option<Vec<u64>> {
        self.slot(file_index, line)
            .map(|slot| slot.events.iter().map(|e| e.arrival).collect())
    }

    pub fn last_arrival_index(&self) -> Option<u64> {
        u64::try_from(self.last_arrival).ok()
    }

    pub fn cursor(&self) -> Option<u64> {
        u64::try_from(self.cursor).ok()
    }

    fn slot(&self, file_index: usize, line: usize) -> Option<&LineSlot> {
        self.files.get(file_index)?.lines.get(line)
    }

    // ── Ingestion ────────────────────────────────────────────

    /// Replaces the whole file table.
    ///
    /// The table is sized by the number of descriptors; a descriptor whose
    /// index falls outside it is rejected and the previous table is kept.
    pub fn apply_file_metadata(&mut self, descriptors: Vec<FileDescriptor>) -> Result<(), IndexError> {
        let len = descriptors.len();
        let mut line_counts = vec![0usize; len];
        for d in &descriptors {
            let slot = line_counts.get_mut(d.file_index).ok_or(IndexError::BadFileIndex {
                index: d.file_index,
                len,
            })?;
            *slot = d.debug_len;
        }

        self.files_index = descriptors
            .iter()
            .map(|d| (self.key(&d.filename), d.file_index))
            .collect();
        self.files = line_counts.into_iter().map(FileRecord::new).collect();
        self.descriptors = descriptors;
        self.last_arrival = NO_EVENT;
        self.cursor = NO_EVENT;
        *self.resolved.get_mut() = Resolved::default();
        debug!(files = len, "file table replaced");
        Ok(())
    }

    /// Appends one event and returns its arrival index.
    pub fn apply_event(&mut self, msg: LineMsg) -> Result<u64, IndexError> {
        let files_len = self.files.len();
        let file = self
            .files
            .get_mut(msg.file_index)
            .ok_or(IndexError::BadFileIndex {
                index: msg.file_index,
                len: files_len,
            })?;
        let lines_len = file.lines.len();
        let slot = file
            .lines
            .get_mut(msg.debug_index)
            .ok_or(IndexError::BadLineIndex {
                file: msg.file_index,
                index: msg.debug_index,
                len: lines_len,
            })?;

        self.last_arrival += 1;
        let arrival = self.last_arrival as u64;
        slot.events.push(LineEvent::new(arrival, msg));

        // follow latest
        if self.cursor == self.last_arrival - 1 {
            self.cursor = self.last_arrival;
        }
        Ok(arrival)
    }

    /// Drops every event but keeps the file table and its slot counts.
    pub fn clear_events(&mut self) {
        for file in &mut self.files {
            *file = FileRecord::new(file.line_count());
        }
        self.last_arrival = NO_EVENT;
        self.cursor = NO_EVENT;
        *self.resolved.get_mut() = Resolved::default();
    }

    // ── Resolution ───────────────────────────────────────────

    /// Picks, for every line of the file, the newest event not after the
    /// cursor, and caches the result as the file's shown entries.
    ///
    /// When one of those events is the cursor's own, it becomes the
    /// resolved selection. Returns `None` for an unknown file index.
    pub fn resolve_selection_for_file(&self, file_index: usize) -> Option<ResolvedFile> {
        let file = self.files.get(file_index)?;
        let resolved = file.resolve(self.cursor, self.formatter.as_ref());
        if let Some(entry) = resolved.selected {
            *self.resolved.lock() = Resolved {
                arrival: self.cursor,
                file: file_index,
                line: entry.line,
                step: entry.step,
                edited: false,
            };
        }
        Some(resolved)
    }

    /// Flags the resolved selection as pointing into a stale file.
    pub fn mark_selection_edited(&self) {
        self.resolved.lock().edited = true;
    }

    pub fn selection(&self) -> Selection {
        let resolved = *self.resolved.lock();
        let current = self.cursor != NO_EVENT && resolved.arrival == self.cursor;
        Selection {
            arrival_index: self.cursor(),
            resolved: current.then_some(ResolvedEvent {
                file_index: resolved.file,
                line_index: resolved.line,
                step: resolved.step,
                edited: resolved.edited,
            }),
        }
    }

    /// Source location of the event under the cursor.
    ///
    /// Uses the coordinates found by the last resolve when they belong to the
    /// current cursor, otherwise searches every file for the event.
    pub fn selected_location(&self) -> Option<SelectedLocation> {
        let cursor = self.cursor()?;
        let resolved = *self.resolved.lock();
        let (file_index, line, step) = if resolved.arrival == self.cursor {
            if resolved.edited {
                let filename = self.descriptor(resolved.file)?.filename.clone();
                return Some(SelectedLocation::Edited {
                    filename,
                    arrival_index: cursor,
                });
            }
            (resolved.file, resolved.line, resolved.step)
        } else {
            self.locate(cursor)?
        };

        // events might not have been received yet
        let event = self.slot(file_index, line)?.events.get(step)?;
        Some(SelectedLocation::Source {
            filename: self.descriptor(file_index)?.filename.clone(),
            offset: event.msg.offset,
        })
    }

    fn locate(&self, arrival: u64) -> Option<(usize, usize, usize)> {
        self.files.iter().enumerate().find_map(|(fi, file)| {
            file.lines
                .iter()
                .enumerate()
                .find_map(|(line, slot)| slot.position_of(arrival).map(|step| (fi, line, step)))
        })
    }

    // ── Selection moves ──────────────────────────────────────

    /// Moves the global cursor. Returns whether the UI should refresh.
    pub fn move_selection(&mut self, direction: Direction) -> bool {
        match direction {
            Direction::First => {
                self.cursor = 0;
                true
            }
            Direction::Last => {
                if self.cursor < self.last_arrival {
                    self.cursor = self.last_arrival;
                }
                true
            }
            Direction::Prev => {
                if self.cursor > 0 {
                    self.cursor -= 1;
                    true
                } else {
                    false
                }
            }
            Direction::Next => {
                if self.cursor < self.last_arrival {
                    self.cursor += 1;
                    true
                } else {
                    false
                }
            }
        }
    }

    /// Moves the cursor among the events of one line, starting from the event
    /// the line currently shows (its first event if nothing is shown).
    pub fn move_selection_within_line(&mut self, file_index: usize, line: usize, step: LineStep) -> bool {
        let Some(file) = self.files.get(file_index) else {
            return false;
        };
        let Some(slot) = file.lines.get(line) else {
            return false;
        };
        if slot.events.is_empty() {
            return false;
        }

        let mut k = file.shown_step(line).unwrap_or(0);
        match step {
            LineStep::Current => {}
            LineStep::Prev => {
                if k == 0 {
                    return false;
                }
                k -= 1;
            }
            LineStep::Next => {
                if k + 1 >= slot.events.len() {
                    return false;
                }
                k += 1;
            }
        }
        let Some(event) = slot.events.get(k) else {
            return false;
        };
        self.cursor = event.arrival as i64;
        true
    }

    pub fn clear_selection(&mut self) {
        self.cursor = NO_EVENT;
    }

    // ── Printing ─────────────────────────────────────────────

    /// Full text of the event a line currently shows.
    pub fn shown_entry_text(&self, file_index: usize, line: usize) -> Option<String> {
        let file = self.files.get(file_index)?;
        let k = file.shown_step(line)?;
        let event = file.lines.get(line)?.events.get(k)?;
        Some(self.formatter.full(&event.msg.item))
    }

    /// Full text of every event of a line up to and including the shown one.
    pub fn shown_entries_text(&self, file_index: usize, line: usize) -> Option<Vec<String>> {
        let file = self.files.get(file_index)?;
        let k = file.shown_step(line)?;
        let events = file.lines.get(line)?.events.get(..=k)?;
        Some(
            events
                .iter()
                .map(|event| self.formatter.full(&event.msg.item))
                .collect(),
        )
    }
}
