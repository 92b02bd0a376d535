use std::time::Duration;

use linetrace::{Session, SessionConfig};

use super::{ConsoleUi, FIB_FILE, FIB_SOURCE, ScriptedProgram, Trace, scenario_dir};

/// Starts a slow run and restarts it halfway: the views are cleared before
/// the second run's first event shows up.
pub async fn run(config: SessionConfig) -> Result<(), String> {
    let ui = ConsoleUi::new(FIB_FILE, FIB_SOURCE);
    let program = ScriptedProgram::new(
        Trace::fib(40, Duration::from_millis(20)),
        config.message_capacity,
    );
    let session = Session::new(config, ui.clone(), program);
    let dir = scenario_dir();

    let first = session
        .start(&dir, vec!["40".to_owned()])
        .map_err(|e| e.to_string())?;
    tokio::time::sleep(Duration::from_millis(300)).await;

    println!("\n== restarting (run {} -> next) ==", first.0);
    let second = session
        .start(&dir, vec!["40".to_owned()])
        .map_err(|e| e.to_string())?;
    println!("run {} started, state {:?}", second.0, session.state());

    tokio::time::sleep(Duration::from_millis(300)).await;
    println!("\n== cancelling run {} ==", second.0);
    session.cancel();
    session.wait().await;
    println!("state after cancel: {:?}", session.state());
    Ok(())
}
