use std::time::Duration;

use linetrace::{Session, SessionConfig};
use linetrace_types::GlobalGesture;

use super::{ConsoleUi, FIB_FILE, FIB_SOURCE, ScriptedProgram, Trace, scenario_dir};

/// The editor's copy of the file was changed after the run was built, so
/// none of its annotations can be trusted.
pub async fn run(config: SessionConfig) -> Result<(), String> {
    let edited = FIB_SOURCE.replace("return a", "return b");
    let ui = ConsoleUi::new(FIB_FILE, &edited);
    let program = ScriptedProgram::new(
        Trace::fib(5, Duration::from_millis(5)),
        config.message_capacity,
    );
    let session = Session::new(config, ui.clone(), program);

    session
        .start(&scenario_dir(), vec![])
        .map_err(|e| e.to_string())?;
    session.wait().await;

    println!("\n== moving the selection inside the edited file ==");
    session.on_global_gesture(GlobalGesture::Prev);
    println!("{} renders with annotations on", ui.renders());
    Ok(())
}
