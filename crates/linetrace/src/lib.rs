//! Live per-line execution trace index.
//!
//! An instrumented program streams one [`LineMsg`](linetrace_types::LineMsg)
//! per executed line. linetrace files each event under its source line, stamps
//! it with a global arrival index, and keeps a cursor over that history so the
//! editor can show, for every line of an open file, the value it produced most
//! recently *as of the cursor*. Moving the cursor backwards replays the run.
//!
//! # Using this crate
//!
//! The host implements two seams and hands them to a [`Session`]:
//!
//! - [`EditorUi`] draws annotations, reveals source locations, and receives
//!   run output.
//! - [`Collaborator`] builds and launches the instrumented program and hands
//!   back its message stream (see `linetrace-wire` for a framed transport).
//!
//! ```rust,no_run
//! # use std::sync::Arc;
//! # async fn demo(ui: Arc<dyn linetrace::EditorUi>, program: Arc<dyn linetrace::Collaborator>) {
//! let session = linetrace::Session::new(linetrace::SessionConfig::from_env(), ui, program);
//! session.start("./cmd/server".as_ref(), vec![]).unwrap();
//! session.on_global_gesture(linetrace_types::GlobalGesture::Prev);
//! session.wait().await;
//! # }
//! ```
//!
//! The library only emits `tracing` events; installing a subscriber is up to
//! the hosting binary.
//!
//! While events stream in, open views are refreshed at most
//! [`SessionConfig::updates_per_second`] times per second. Gestures refresh
//! immediately.

pub mod collaborator;
pub mod config;
pub mod error;
pub mod fingerprint;
pub mod format;
pub mod index;
pub mod session;
mod store;
pub mod ui;

pub use collaborator::{Collaborator, Launch, LaunchRequest, RunChannel, RunControl};
pub use config::SessionConfig;
pub use error::{IndexError, RunError, StartError};
pub use fingerprint::ContentFingerprint;
pub use format::{ItemFormatter, JsonFormatter};
pub use index::{Direction, LineStep, ResolvedEvent, SelectedLocation, Selection, TraceIndex};
pub use session::{RunId, Session, SessionState};
pub use store::{ResolvedFile, SelectedEntry};
pub use ui::{EditorUi, OpenFile, RunOutput, ViewId};
