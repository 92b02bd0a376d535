use std::time::Duration;

use linetrace::{Session, SessionConfig};
use linetrace_types::{GlobalGesture, LineGesture, LineGestureKind};

use super::{ConsoleUi, FIB_FILE, FIB_SOURCE, ScriptedProgram, Trace, scenario_dir};

/// Streams a fib(12) trace, then walks back through it.
pub async fn run(config: SessionConfig) -> Result<(), String> {
    let ui = ConsoleUi::new(FIB_FILE, FIB_SOURCE);
    let program = ScriptedProgram::new(
        Trace::fib(12, Duration::from_millis(5)),
        config.message_capacity,
    );
    let session = Session::new(config, ui.clone(), program);

    session
        .start(&scenario_dir(), vec!["12".to_owned()])
        .map_err(|e| e.to_string())?;
    session.wait().await;
    println!("{} throttled renders for the whole run", ui.renders());

    println!("\n== stepping back through the loop body ==");
    session.on_line_gesture(&LineGesture {
        filename: FIB_FILE.to_owned(),
        line: 1,
        offset: 0,
        kind: LineGestureKind::Current,
    });
    for _ in 0..3 {
        session.on_global_gesture(GlobalGesture::Prev);
    }

    println!("\n== printing the loop line ==");
    for kind in [LineGestureKind::Print, LineGestureKind::PrintAll] {
        session.on_line_gesture(&LineGesture {
            filename: FIB_FILE.to_owned(),
            line: 1,
            offset: 0,
            kind,
        });
    }

    println!("\n== back to the first event ==");
    session.on_global_gesture(GlobalGesture::First);
    Ok(())
}
