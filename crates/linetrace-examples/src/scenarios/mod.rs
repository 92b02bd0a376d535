pub mod replay;
pub mod restart;
pub mod stale_file;

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use linetrace::{
    Collaborator, ContentFingerprint, EditorUi, Launch, LaunchRequest, OpenFile, RunChannel,
    RunControl, ViewId,
};
use linetrace_types::{Annotation, ClientMessage, FileDescriptor, FilesData, LineMsg};
use linetrace_wire::{spawn_frame_reader, write_frame};
use tokio::io::DuplexStream;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::debug;

pub(crate) const FIB_FILE: &str = "fib.go";

pub(crate) const FIB_SOURCE: &str = "package main

func fib(n int) int {
\ta, b := 0, 1
\tfor i := 0; i < n; i++ {
\t\ta, b = b, a+b
\t}
\treturn a
}
";

pub(crate) fn scenario_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
}

// ── Console editor ───────────────────────────────────────────

/// Prints every UI call to stdout.
pub(crate) struct ConsoleUi {
    files: Vec<OpenFile>,
    renders: AtomicUsize,
}

impl ConsoleUi {
    pub(crate) fn new(name: &str, content: &str) -> Arc<Self> {
        Arc::new(Self {
            files: vec![OpenFile {
                name: name.to_owned(),
                content: ContentFingerprint::of(content.as_bytes()),
                views: vec![ViewId(1)],
            }],
            renders: AtomicUsize::new(0),
        })
    }

    pub(crate) fn renders(&self) -> usize {
        self.renders.load(Ordering::Relaxed)
    }
}

impl EditorUi for ConsoleUi {
    fn open_files(&self) -> Vec<OpenFile> {
        self.files.clone()
    }

    fn set_annotations(
        &self,
        view: ViewId,
        on: bool,
        selected: usize,
        entries: &[Option<Arc<Annotation>>],
    ) {
        if !on {
            println!("[view {}] annotations off", view.0);
            return;
        }
        self.renders.fetch_add(1, Ordering::Relaxed);
        let shown: Vec<String> = entries
            .iter()
            .enumerate()
            .map(|(line, entry)| {
                let marker = if line == selected { ">" } else { " " };
                match entry {
                    Some(a) => format!("{marker}{line}:{}", a.text()),
                    None => format!("{marker}{line}:-"),
                }
            })
            .collect();
        println!("[view {}] {}", view.0, shown.join(" | "));
    }

    fn set_annotations_state(&self, file: &str, has_data: bool, edited: bool) {
        debug!(file, has_data, edited, "annotations state");
    }

    fn reveal(&self, filename: &str, offset: usize) {
        println!("reveal {filename} @ {offset}");
    }

    fn message(&self, text: &str) {
        print!("{text}");
    }

    fn warning(&self, text: &str) {
        println!("warning: {text}");
    }

    fn clear_output(&self) {
        println!("--- output cleared ---");
    }

    fn append_output(&self, text: &str) {
        print!("| {text}");
    }
}

// ── Scripted program ─────────────────────────────────────────

/// A canned trace, replayed over a framed in-memory pipe as if an
/// instrumented program were producing it.
#[derive(Clone)]
pub(crate) struct Trace {
    pub(crate) filename: String,
    pub(crate) source: String,
    pub(crate) debug_offsets: Vec<usize>,
    pub(crate) lines: Vec<LineMsg>,
    /// Events per frame.
    pub(crate) batch: usize,
    /// Delay between frames.
    pub(crate) pace: Duration,
}

impl Trace {
    /// Traces `fib(n)`: one event per executed statement.
    pub(crate) fn fib(n: u64, pace: Duration) -> Self {
        let offsets: Vec<usize> = ["a, b := 0, 1", "a, b = b, a+b", "return a"]
            .iter()
            .map(|stmt| FIB_SOURCE.find(stmt).unwrap_or(0))
            .collect();
        let event = |debug_index: usize, text: String| LineMsg {
            file_index: 0,
            debug_index,
            offset: offsets[debug_index],
            item: text.into(),
        };

        let (mut a, mut b) = (0u64, 1u64);
        let mut lines = vec![event(0, format!("a={a}, b={b}"))];
        for _ in 0..n {
            (a, b) = (b, a + b);
            lines.push(event(1, format!("a={a}, b={b}")));
        }
        lines.push(event(2, format!("{a}")));

        Self {
            filename: FIB_FILE.to_owned(),
            source: FIB_SOURCE.to_owned(),
            debug_offsets: offsets,
            lines,
            batch: 1,
            pace,
        }
    }

    fn files_data(&self) -> ClientMessage {
        let fp = ContentFingerprint::of(self.source.as_bytes());
        ClientMessage::FilesData(FilesData {
            files: vec![FileDescriptor {
                file_index: 0,
                filename: self.filename.clone(),
                file_size: fp.size,
                file_hash: fp.hash,
                debug_len: self.debug_offsets.len(),
            }],
        })
    }
}

pub(crate) struct ScriptedProgram {
    trace: Trace,
    capacity: usize,
}

impl ScriptedProgram {
    pub(crate) fn new(trace: Trace, capacity: usize) -> Arc<Self> {
        Arc::new(Self { trace, capacity })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ControlRequest {
    FileSetPositions,
    Start,
}

struct ScriptedControl {
    requests: mpsc::UnboundedSender<ControlRequest>,
    program: JoinHandle<Result<(), String>>,
}

#[async_trait]
impl RunControl for ScriptedControl {
    fn request_file_set_positions(&mut self) -> Result<(), String> {
        self.requests
            .send(ControlRequest::FileSetPositions)
            .map_err(|_| "program is gone".to_owned())
    }

    fn request_start(&mut self) -> Result<(), String> {
        self.requests
            .send(ControlRequest::Start)
            .map_err(|_| "program is gone".to_owned())
    }

    async fn wait(self: Box<Self>) -> Result<(), String> {
        let Self { requests, program } = *self;
        // a program still waiting for a request gives up
        drop(requests);
        program.await.map_err(|e| e.to_string())?
    }
}

#[async_trait]
impl Collaborator for ScriptedProgram {
    async fn launch(
        &self,
        request: LaunchRequest,
        cancel: CancellationToken,
    ) -> Result<Launch, String> {
        request.output.write(&format!(
            "running {} in {}\n",
            self.trace.filename,
            request.dir.display()
        ));
        let (client, server) = tokio::io::duplex(64 * 1024);
        let messages = spawn_frame_reader(server, self.capacity);
        let (requests, control_rx) = mpsc::unbounded_channel();
        let program = tokio::spawn(play(self.trace.clone(), client, control_rx, cancel));
        Ok(Launch::Running(RunChannel {
            messages,
            control: Box::new(ScriptedControl { requests, program }),
        }))
    }
}

async fn play(
    trace: Trace,
    mut client: DuplexStream,
    mut control: mpsc::UnboundedReceiver<ControlRequest>,
    cancel: CancellationToken,
) -> Result<(), String> {
    send(&mut client, &ClientMessage::connected()).await?;
    expect(&mut control, ControlRequest::FileSetPositions).await?;
    send(&mut client, &trace.files_data()).await?;
    expect(&mut control, ControlRequest::Start).await?;

    for chunk in trace.lines.chunks(trace.batch.max(1)) {
        tokio::select! {
            _ = cancel.cancelled() => return Err("killed".to_owned()),
            _ = tokio::time::sleep(trace.pace) => {}
        }
        let msg = match chunk {
            [line] => ClientMessage::Line(line.clone()),
            _ => ClientMessage::Lines(chunk.to_vec()),
        };
        send(&mut client, &msg).await?;
    }
    Ok(())
}

async fn send(client: &mut DuplexStream, msg: &ClientMessage) -> Result<(), String> {
    write_frame(client, msg)
        .await
        .map(drop)
        .map_err(|e| e.to_string())
}

async fn expect(
    control: &mut mpsc::UnboundedReceiver<ControlRequest>,
    want: ControlRequest,
) -> Result<(), String> {
    match control.recv().await {
        Some(got) if got == want => Ok(()),
        Some(got) => Err(format!("expected {want:?}, got {got:?}")),
        None => Err(format!("control closed while waiting for {want:?}")),
    }
}
