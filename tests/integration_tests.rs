//! Integration tests for daemon-CLI IPC communication.
//!
//! A real tracker service, IPC server and request handler run in-process on a
//! temporary socket; the CLI's `IpcClient` talks to them the way the binary
//! would.

use std::path::Path;

use tempfile::TempDir;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::UnixStream;
use tokio::task::JoinHandle;
use tokio::time::{sleep, timeout, Duration};

use stopwatch::cli::{IpcClient, UpdateStream};
use stopwatch::daemon::{IpcServer, RequestHandler, TimerEngine, TrackerHandle, TrackerService};
use stopwatch::prefs::PreferenceStore;
use stopwatch::surface::MockStatusSurface;
use stopwatch::types::{AppPaths, IpcResponse, TimeUpdate};

// ============================================================================
// Test Helpers
// ============================================================================

struct TestDaemon {
    _dir: TempDir,
    paths: AppPaths,
    tracker: TrackerHandle,
    status: MockStatusSurface,
    service: JoinHandle<()>,
    accept_loop: JoinHandle<()>,
}

impl TestDaemon {
    fn client(&self) -> IpcClient {
        IpcClient::new(&self.paths)
    }

    fn prefs(&self) -> PreferenceStore {
        PreferenceStore::open(self.paths.prefs_dir()).unwrap()
    }

    async fn shutdown(self) -> Option<u64> {
        self.accept_loop.abort();
        let persisted = self.tracker.shutdown().await.unwrap();
        self.service.await.unwrap();
        persisted
    }
}

/// Starts the daemon pieces on a socket inside a fresh temp directory.
fn spawn_daemon() -> TestDaemon {
    let dir = tempfile::tempdir().unwrap();
    let paths = AppPaths::new(dir.path());

    let prefs = PreferenceStore::open(paths.prefs_dir()).unwrap();
    let status = MockStatusSurface::new();
    let engine = TimerEngine::new(Box::new(status.clone()));
    let (service, tracker) = TrackerService::new(engine, Some(prefs));
    let service = tokio::spawn(service.run());

    let server = IpcServer::new(&paths.socket_path()).unwrap();
    let handler = RequestHandler::new(tracker.clone());
    let accept_loop = tokio::spawn(async move {
        while let Ok(stream) = server.accept().await {
            let handler = handler.clone();
            tokio::spawn(async move {
                let _ = handler.serve(stream).await;
            });
        }
    });

    TestDaemon {
        _dir: dir,
        paths,
        tracker,
        status,
        service,
        accept_loop,
    }
}

fn state_of(response: &IpcResponse) -> Option<&str> {
    response.data.as_ref()?.state.as_deref()
}

fn elapsed_of(response: &IpcResponse) -> u64 {
    response
        .data
        .as_ref()
        .and_then(|data| data.elapsed_ms)
        .unwrap()
}

async fn next(updates: &mut UpdateStream) -> Option<TimeUpdate> {
    timeout(Duration::from_secs(3), updates.next())
        .await
        .unwrap()
        .unwrap()
}

async fn raw_exchange(socket: &Path, line: &str) -> String {
    let mut stream = UnixStream::connect(socket).await.unwrap();
    stream.write_all(line.as_bytes()).await.unwrap();
    stream.shutdown().await.unwrap();

    let mut reader = BufReader::new(stream);
    let mut reply = String::new();
    timeout(Duration::from_secs(2), reader.read_line(&mut reply))
        .await
        .unwrap()
        .unwrap();
    reply
}

// ============================================================================
// Commands
// ============================================================================

#[tokio::test]
async fn test_command_flow_over_socket() {
    let daemon = spawn_daemon();
    let client = daemon.client();

    let response = client.status().await.unwrap();
    assert_eq!(state_of(&response), Some("stopped"));
    assert_eq!(elapsed_of(&response), 0);

    let response = client.start().await.unwrap();
    assert_eq!(response.message, "タイマーを開始しました");
    assert_eq!(state_of(&response), Some("running"));
    assert_eq!(response.data.as_ref().unwrap().is_running, Some(true));

    sleep(Duration::from_millis(200)).await;

    let paused = client.pause().await.unwrap();
    assert_eq!(state_of(&paused), Some("paused"));
    assert!(elapsed_of(&paused) >= 200);

    let resumed = client.resume().await.unwrap();
    assert_eq!(state_of(&resumed), Some("running"));
    assert!(elapsed_of(&resumed) >= elapsed_of(&paused));

    let stopped = client.stop().await.unwrap();
    assert_eq!(state_of(&stopped), Some("stopped"));
    assert_eq!(elapsed_of(&stopped), 0);

    daemon.shutdown().await;
}

#[tokio::test]
async fn test_paused_time_is_frozen() {
    let daemon = spawn_daemon();
    let client = daemon.client();

    client.start().await.unwrap();
    sleep(Duration::from_millis(100)).await;
    let paused = client.pause().await.unwrap();

    sleep(Duration::from_millis(300)).await;
    let status = client.status().await.unwrap();

    assert_eq!(state_of(&status), Some("paused"));
    assert_eq!(elapsed_of(&status), elapsed_of(&paused));

    daemon.shutdown().await;
}

#[tokio::test]
async fn test_status_line_follows_commands() {
    let daemon = spawn_daemon();
    let client = daemon.client();

    client.start().await.unwrap();
    let line = daemon.status.current().unwrap();
    assert!(line.state.is_running());

    client.stop().await.unwrap();
    let line = daemon.status.current().unwrap();
    assert_eq!(line.text, "00:00:00");

    daemon.shutdown().await;
}

// ============================================================================
// Subscriptions
// ============================================================================

#[tokio::test]
async fn test_subscribe_streams_updates() {
    let daemon = spawn_daemon();
    let client = daemon.client();

    let (response, mut updates) = client.subscribe().await.unwrap();
    assert_eq!(response.message, "購読を開始しました");
    assert_eq!(response.data.as_ref().unwrap().is_running, Some(false));

    // The subscribe status call is broadcast as well.
    assert_eq!(next(&mut updates).await, Some(TimeUpdate::with_state(0, false)));

    client.start().await.unwrap();
    let started = next(&mut updates).await.unwrap();
    assert_eq!(started.is_running, Some(true));

    let tick = next(&mut updates).await.unwrap();
    assert_eq!(tick.is_running, None);
    assert!(tick.time >= 1_000);

    client.stop().await.unwrap();
    let stopped = next(&mut updates).await.unwrap();
    assert_eq!(stopped, TimeUpdate::with_state(0, false));

    daemon.shutdown().await;
}

#[tokio::test]
async fn test_every_subscriber_sees_stop() {
    let daemon = spawn_daemon();
    let client = daemon.client();

    let (_, mut first) = client.subscribe().await.unwrap();
    let (_, mut second) = client.subscribe().await.unwrap();

    client.start().await.unwrap();
    client.stop().await.unwrap();

    for updates in [&mut first, &mut second] {
        while next(updates).await.unwrap().is_running != Some(true) {}
        while next(updates).await.unwrap() != TimeUpdate::with_state(0, false) {}
    }

    daemon.shutdown().await;
}

// ============================================================================
// Shutdown
// ============================================================================

#[tokio::test]
async fn test_shutdown_saves_elapsed_time_while_running() {
    let daemon = spawn_daemon();
    daemon.client().start().await.unwrap();
    sleep(Duration::from_millis(100)).await;

    let prefs = daemon.prefs();
    let persisted = daemon.shutdown().await;

    let saved = prefs.load().last_elapsed_time();
    assert!(persisted.unwrap() >= 100);
    assert_eq!(saved, persisted.map(|ms| ms as i64));
}

#[tokio::test]
async fn test_shutdown_while_stopped_saves_nothing() {
    let daemon = spawn_daemon();
    let prefs = daemon.prefs();

    assert_eq!(daemon.shutdown().await, None);
    assert_eq!(prefs.load().last_elapsed_time(), None);
}

// ============================================================================
// Errors
// ============================================================================

#[tokio::test]
async fn test_malformed_request_gets_error_response() {
    let daemon = spawn_daemon();

    let reply = raw_exchange(&daemon.paths.socket_path(), "not json\n").await;
    let response: IpcResponse = serde_json::from_str(reply.trim_end()).unwrap();
    assert!(!response.is_success());

    let reply = raw_exchange(&daemon.paths.socket_path(), "{\"action\":\"lap\"}\n").await;
    let response: IpcResponse = serde_json::from_str(reply.trim_end()).unwrap();
    assert!(!response.is_success());

    daemon.shutdown().await;
}

#[tokio::test]
async fn test_raw_wire_format() {
    let daemon = spawn_daemon();

    let reply = raw_exchange(&daemon.paths.socket_path(), "{\"action\":\"get_status\"}\n").await;
    let value: serde_json::Value = serde_json::from_str(reply.trim_end()).unwrap();
    assert_eq!(value["status"], "success");
    assert_eq!(value["data"]["state"], "stopped");
    assert_eq!(value["data"]["elapsed_ms"], 0);
    assert_eq!(value["data"]["is_running"], false);

    daemon.shutdown().await;
}

#[tokio::test]
async fn test_client_fails_without_daemon() {
    let dir = tempfile::tempdir().unwrap();
    let client = IpcClient::new(&AppPaths::new(dir.path()));

    let err = client.status().await.unwrap_err();
    assert!(format!("{:#}", err).contains("デーモンに接続できません"));
}
