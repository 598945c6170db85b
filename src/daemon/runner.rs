//! Daemon entry point: wires the tracker, status writer and IPC server
//! together and runs until a shutdown signal arrives.

use anyhow::{Context, Result};
use tokio::net::UnixStream;
use tokio::signal::unix::{signal, SignalKind};

use crate::prefs::PreferenceStore;
use crate::surface::{StatusFileWriter, StatusSurface};
use crate::types::AppPaths;

use super::boot::apply_boot_plan;
use super::ipc::{IpcServer, RequestHandler};
use super::service::TrackerService;
use super::timer::TimerEngine;

/// Runs the daemon.
///
/// With `boot` set, the launch plan from preferences is applied once the
/// server is listening.
///
/// # Errors
///
/// Returns an error if another daemon is already listening, or if the
/// preferences, status writer or socket cannot be set up.
pub async fn run_daemon(paths: &AppPaths, boot: bool) -> Result<()> {
    let socket_path = paths.socket_path();
    if UnixStream::connect(&socket_path).await.is_ok() {
        anyhow::bail!("デーモンは既に起動しています: {:?}", socket_path);
    }

    let store = PreferenceStore::open(paths.prefs_dir()).context("Failed to open preferences")?;
    let (status, status_thread) =
        StatusFileWriter::spawn(paths.status_file()).context("Failed to start status writer")?;

    let engine = TimerEngine::new(Box::new(status.clone()));
    let (service, tracker) = TrackerService::new(engine, Some(store.clone()));
    let service_task = tokio::spawn(service.run());

    let server = IpcServer::new(&socket_path)?;
    tracing::info!(socket = ?server.socket_path(), boot, "Daemon listening");

    if boot {
        apply_boot_plan(&tracker, &store.load())
            .await
            .context("Failed to apply boot plan")?;
    }

    let handler = RequestHandler::new(tracker.clone());
    let shutdown = shutdown_signal();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            accepted = server.accept() => match accepted {
                Ok(stream) => {
                    let handler = handler.clone();
                    tokio::spawn(async move {
                        if let Err(e) = handler.serve(stream).await {
                            tracing::debug!("Connection ended: {}", e);
                        }
                    });
                }
                Err(e) => tracing::warn!("{:#}", e),
            },
            result = &mut shutdown => {
                if let Err(e) = result {
                    tracing::error!("Failed to listen for shutdown signals: {}", e);
                }
                break;
            }
        }
    }

    tracing::info!("Shutting down");
    drop(server);

    if let Err(e) = tracker.shutdown().await {
        tracing::warn!("{}", e);
    }
    if let Err(e) = service_task.await {
        tracing::warn!("Tracker task failed: {}", e);
    }

    // Cleared again in case the tracker never got to it.
    status.clear();
    status.shutdown();
    if status_thread.join().is_err() {
        tracing::warn!("Status writer thread panicked");
    }

    Ok(())
}

/// Resolves on Ctrl-C or SIGTERM.
async fn shutdown_signal() -> std::io::Result<()> {
    let mut terminate = signal(SignalKind::terminate())?;
    tokio::select! {
        result = tokio::signal::ctrl_c() => result,
        _ = terminate.recv() => Ok(()),
    }
}
