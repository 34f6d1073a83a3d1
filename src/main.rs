use anyhow::Context;
use clap::Parser;
use serialkit::cli::{Action, Args, Console, Output};
use serialkit::{
    init_logging, list_ports, runtime_config, SessionCommand, SessionController, SessionRuntime,
    SystemSerialBackend,
};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast::error::RecvError;

fn emit(output: Option<Output>) {
    match output {
        Some(Output::Display(line)) => println!("{}", line),
        Some(Output::Notice(text)) => eprintln!("{}", text),
        None => {}
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_logging()?;

    if args.list {
        let ports = list_ports().context("Failed to enumerate serial ports")?;
        for port in ports {
            println!("{}\t{}", port.port_name, port.description);
        }
        return Ok(());
    }

    let config = args.resolve_config().context("Failed to load settings")?;
    tracing::info!(
        "SerialKit {} ({} build, {}), {}",
        serialkit::VERSION,
        serialkit::BUILD_PROFILE,
        serialkit::BUILD_DATE,
        config.connection
    );

    let mut controller = SessionController::new(Arc::new(SystemSerialBackend::new()))
        .with_monitor_interval(config.monitor.poll_interval());
    controller.set_port_config(config.connection.clone())?;
    controller.set_send_options(config.send.options());
    controller.set_display_mode(config.display.mode());

    let (handle, task) = SessionRuntime::spawn(controller, runtime_config(&config));
    let mut events = handle.subscribe();
    let mut console = Console::new(config.send.options(), config.display.mode());

    if !config.connection.port_name.is_empty() {
        handle.send(SessionCommand::Open)?;
        if config.send.timed_enabled {
            handle.send(SessionCommand::EnableTimed {
                interval_ms: config.send.interval_ms,
            })?;
        }
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line.context("Failed to read stdin")? else {
                    break;
                };
                match console.handle_line(&line) {
                    Ok(Action::Commands(commands)) => {
                        for command in commands {
                            handle.send(command)?;
                        }
                    }
                    Ok(Action::Show(text)) => eprintln!("{}", text),
                    Ok(Action::Quit) => break,
                    Err(e) => eprintln!("{}", e),
                }
            }
            event = events.recv() => match event {
                Ok(event) => emit(console.observe(&event)),
                Err(RecvError::Lagged(missed)) => {
                    tracing::warn!("Display fell behind, {} events dropped", missed);
                }
                Err(RecvError::Closed) => break,
            },
        }
    }

    handle.send(SessionCommand::Shutdown).ok();
    task.await.context("Session loop panicked")?;

    while let Ok(event) = events.try_recv() {
        emit(console.observe(&event));
    }

    Ok(())
}
