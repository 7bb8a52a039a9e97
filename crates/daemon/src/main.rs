// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Odd Jobs Daemon (ojd)
//!
//! Background process that brings up a `Supervisor` and serves the control
//! protocol over a Unix domain socket at `${TE_FRAMEWORK_DIR}/control.sock`.
//! The (non-goal) HTTP layer is expected to speak this same protocol over
//! its own transport; this binary only owns the socket and the subsystems.

#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

use std::path::Path;

use tokio::net::{UnixListener, UnixStream};
use tokio::signal::unix::{signal, SignalKind};
use tracing::{error, info, warn};

use oj_daemon::protocol::{read_request, write_response, DEFAULT_TIMEOUT};
use oj_daemon::{env, Supervisor};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    if let Some(arg) = std::env::args().nth(1) {
        match arg.as_str() {
            "--version" | "-V" | "-v" => {
                println!("ojd {}", env!("CARGO_PKG_VERSION"));
                return Ok(());
            }
            "--help" | "-h" | "help" => {
                println!("ojd - Termux framework supervisor");
                println!();
                println!("USAGE:");
                println!("    ojd");
                println!();
                println!("The supervisor listens on a Unix socket under TE_FRAMEWORK_DIR for");
                println!("the control protocol; it is typically fronted by an HTTP server.");
                println!();
                println!("OPTIONS:");
                println!("    -h, --help       Print help information");
                println!("    -v, --version    Print version information");
                return Ok(());
            }
            _ => {
                eprintln!("error: unexpected argument '{arg}'");
                eprintln!("Usage: ojd [--help | --version]");
                std::process::exit(1);
            }
        }
    }

    let framework_dir = oj_engine::env::framework_dir();
    let _log_guard = setup_logging(&framework_dir);

    let run_id = env::run_id();
    let bind_mode = env::run_mode();
    let extensions_dir = oj_engine::env::extensions_dir();

    info!(run_id = %run_id, host = %bind_mode.host(), "starting supervisor");

    let supervisor = match Supervisor::start(framework_dir.clone(), extensions_dir, run_id, bind_mode) {
        Ok(supervisor) => supervisor,
        Err(e) => {
            error!(error = %e, "failed to start supervisor");
            return Err(e.into());
        }
    };

    let socket_path = framework_dir.join("control.sock");
    if socket_path.exists() {
        let _ = std::fs::remove_file(&socket_path);
    }
    let listener = UnixListener::bind(&socket_path)?;
    info!(socket = %socket_path.display(), "listening for control connections");
    println!("READY");

    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigint = signal(SignalKind::interrupt())?;

    loop {
        tokio::select! {
            accepted = listener.accept() => {
                match accepted {
                    Ok((stream, _addr)) => {
                        let supervisor = supervisor.clone();
                        tokio::spawn(async move {
                            if let Err(e) = handle_connection(stream, supervisor).await {
                                warn!(error = %e, "control connection ended with an error");
                            }
                        });
                    }
                    Err(e) => error!(error = %e, "failed to accept control connection"),
                }
            }
            _ = sigterm.recv() => {
                info!("received SIGTERM, shutting down");
                break;
            }
            _ = sigint.recv() => {
                info!("received SIGINT, shutting down");
                break;
            }
        }
    }

    supervisor.shutdown().await;
    let _ = std::fs::remove_file(&socket_path);
    info!("supervisor stopped");
    Ok(())
}

async fn handle_connection(mut stream: UnixStream, supervisor: Supervisor) -> std::io::Result<()> {
    loop {
        let request = match read_request(&mut stream, DEFAULT_TIMEOUT).await {
            Ok(request) => request,
            Err(_) => return Ok(()),
        };
        let response = supervisor.dispatch(request).await;
        if write_response(&mut stream, &response, DEFAULT_TIMEOUT).await.is_err() {
            return Ok(());
        }
    }
}

/// Logs to `${TE_FRAMEWORK_DIR}/daemon.log`, filtered by `TE_LOG_LEVEL`
/// (`RUST_LOG` takes precedence when set).
fn setup_logging(framework_dir: &Path) -> Option<tracing_appender::non_blocking::WorkerGuard> {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    std::fs::create_dir_all(framework_dir).ok()?;
    let file_appender = tracing_appender::rolling::never(framework_dir, "daemon.log");
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(env::log_level()));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(non_blocking))
        .init();

    Some(guard)
}
