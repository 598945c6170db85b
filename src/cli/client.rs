//! IPC Client for communicating with the stopwatch daemon.
//!
//! This module provides:
//! - Unix Domain Socket client
//! - Request/response handling
//! - Connection retry logic
//! - Timeout handling
//! - Subscription to the daemon's time updates

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::unix::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::UnixStream;
use tokio::time::timeout;

use crate::types::{AppPaths, IpcRequest, IpcResponse, TimeUpdate};

// ============================================================================
// Constants
// ============================================================================

/// Connection timeout in seconds
const CONNECTION_TIMEOUT_SECS: u64 = 5;

/// Read/write timeout in seconds
const IO_TIMEOUT_SECS: u64 = 5;

/// Maximum retry attempts
const MAX_RETRIES: u32 = 3;

/// Retry delay in milliseconds (base delay, multiplied by attempt number)
const RETRY_DELAY_MS: u64 = 500;

// ============================================================================
// IpcClient
// ============================================================================

/// IPC client for daemon communication.
pub struct IpcClient {
    /// Socket path
    socket_path: PathBuf,
    /// Connection timeout
    timeout: Duration,
}

impl IpcClient {
    /// Creates a new IPC client for the daemon at `paths`.
    pub fn new(paths: &AppPaths) -> Self {
        Self::with_socket_path(paths.socket_path())
    }

    /// Creates a new IPC client with a custom socket path.
    pub fn with_socket_path(socket_path: PathBuf) -> Self {
        Self {
            socket_path,
            timeout: Duration::from_secs(CONNECTION_TIMEOUT_SECS),
        }
    }

    /// Returns the socket path.
    pub fn socket_path(&self) -> &Path {
        &self.socket_path
    }

    /// Sends a start command to the daemon.
    pub async fn start(&self) -> Result<IpcResponse> {
        self.send_request_with_retry(IpcRequest::Start).await
    }

    /// Sends a pause command to the daemon.
    pub async fn pause(&self) -> Result<IpcResponse> {
        self.send_request_with_retry(IpcRequest::Pause).await
    }

    /// Sends a resume command to the daemon.
    pub async fn resume(&self) -> Result<IpcResponse> {
        self.send_request_with_retry(IpcRequest::Resume).await
    }

    /// Sends a stop command to the daemon.
    pub async fn stop(&self) -> Result<IpcResponse> {
        self.send_request_with_retry(IpcRequest::Stop).await
    }

    /// Sends a status query to the daemon.
    pub async fn status(&self) -> Result<IpcResponse> {
        self.send_request_with_retry(IpcRequest::GetStatus).await
    }

    /// Sends any unary request to the daemon.
    pub async fn send(&self, request: IpcRequest) -> Result<IpcResponse> {
        self.send_request_with_retry(request).await
    }

    /// Opens a subscription to the daemon's time updates.
    ///
    /// Returns the initial status response and a stream of updates. Dropping
    /// the stream unsubscribes.
    pub async fn subscribe(&self) -> Result<(IpcResponse, UpdateStream)> {
        let stream = self.connect().await?;
        let (read_half, mut writer) = stream.into_split();
        let mut reader = BufReader::new(read_half);

        write_request(&mut writer, IpcRequest::Subscribe).await?;
        let response = read_response(&mut reader).await?;

        Ok((
            response,
            UpdateStream {
                reader,
                _writer: writer,
                line: String::new(),
            },
        ))
    }

    /// Sends a request to the daemon with retry logic.
    async fn send_request_with_retry(&self, request: IpcRequest) -> Result<IpcResponse> {
        let mut last_error = None;

        for attempt in 1..=MAX_RETRIES {
            match self.send_request(request).await {
                Ok(response) => return Ok(response),
                Err(e) => {
                    tracing::warn!("リクエスト失敗 (試行 {}/{}): {:#}", attempt, MAX_RETRIES, e);
                    last_error = Some(e);

                    if attempt < MAX_RETRIES {
                        let delay = Duration::from_millis(RETRY_DELAY_MS * u64::from(attempt));
                        tokio::time::sleep(delay).await;
                    }
                }
            }
        }

        Err(last_error.unwrap_or_else(|| anyhow::anyhow!("リクエストを送信できませんでした")))
    }

    /// Sends a single request to the daemon.
    async fn send_request(&self, request: IpcRequest) -> Result<IpcResponse> {
        let stream = self.connect().await?;
        let (read_half, mut writer) = stream.into_split();
        let mut reader = BufReader::new(read_half);

        write_request(&mut writer, request).await?;

        // Shutdown write side to signal end of request
        writer
            .shutdown()
            .await
            .context("シャットダウンに失敗しました")?;

        read_response(&mut reader).await
    }

    async fn connect(&self) -> Result<UnixStream> {
        timeout(self.timeout, UnixStream::connect(&self.socket_path))
            .await
            .context("接続がタイムアウトしました")?
            .context("デーモンに接続できません。'stopwatch daemon' を起動してください")
    }
}

async fn write_request(writer: &mut OwnedWriteHalf, request: IpcRequest) -> Result<()> {
    let mut json = serde_json::to_vec(&request).context("リクエストのシリアライズに失敗しました")?;
    json.push(b'\n');

    timeout(Duration::from_secs(IO_TIMEOUT_SECS), writer.write_all(&json))
        .await
        .context("書き込みがタイムアウトしました")?
        .context("リクエストの送信に失敗しました")?;

    timeout(Duration::from_secs(IO_TIMEOUT_SECS), writer.flush())
        .await
        .context("フラッシュがタイムアウトしました")?
        .context("フラッシュに失敗しました")?;

    Ok(())
}

async fn read_response(reader: &mut BufReader<OwnedReadHalf>) -> Result<IpcResponse> {
    let mut line = String::new();
    let n = timeout(
        Duration::from_secs(IO_TIMEOUT_SECS),
        reader.read_line(&mut line),
    )
    .await
    .context("読み込みがタイムアウトしました")?
    .context("レスポンスの受信に失敗しました")?;

    if n == 0 {
        anyhow::bail!("デーモンからの応答がありませんでした");
    }

    let response: IpcResponse =
        serde_json::from_str(line.trim_end()).context("レスポンスのパースに失敗しました")?;

    if !response.is_success() {
        anyhow::bail!("{}", response.message);
    }

    Ok(response)
}

// ============================================================================
// UpdateStream
// ============================================================================

/// Time updates pushed by the daemon after [`IpcClient::subscribe`].
pub struct UpdateStream {
    reader: BufReader<OwnedReadHalf>,
    // Closing the write half would end the subscription.
    _writer: OwnedWriteHalf,
    line: String,
}

impl UpdateStream {
    /// Waits for the next update.
    ///
    /// Returns `Ok(None)` once the daemon closes the connection. There is no
    /// timeout: a stopped timer sends nothing.
    ///
    /// Safe to use in `tokio::select!`: a partially read line is kept and
    /// completed by the next call.
    pub async fn next(&mut self) -> Result<Option<TimeUpdate>> {
        let n = self
            .reader
            .read_line(&mut self.line)
            .await
            .context("更新の受信に失敗しました")?;

        if n == 0 {
            return Ok(None);
        }

        let parsed = serde_json::from_str(self.line.trim_end());
        self.line.clear();
        Ok(Some(parsed.context("更新のパースに失敗しました")?))
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ResponseData, StatusSnapshot, TimerState};
    use std::sync::Arc;
    use tokio::net::UnixListener;
    use tokio::sync::Mutex;

    // ------------------------------------------------------------------------
    // Helper functions
    // ------------------------------------------------------------------------

    fn create_temp_socket_path() -> (tempfile::TempDir, PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("test.sock");
        (dir, path)
    }

    fn running_data(elapsed_ms: u64) -> Option<ResponseData> {
        Some(ResponseData::from_snapshot(&StatusSnapshot {
            state: TimerState::Running,
            elapsed_ms,
        }))
    }

    /// Accepts one connection, records the request and replies with `lines`.
    fn spawn_mock_server(
        listener: UnixListener,
        lines: Vec<String>,
    ) -> (
        Arc<Mutex<Option<IpcRequest>>>,
        tokio::task::JoinHandle<()>,
    ) {
        let received = Arc::new(Mutex::new(None));
        let received_clone = received.clone();

        let handle = tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            let (read_half, mut write_half) = stream.into_split();
            let mut reader = BufReader::new(read_half);

            let mut request = String::new();
            reader.read_line(&mut request).await.unwrap();
            *received_clone.lock().await = Some(serde_json::from_str(request.trim()).unwrap());

            for line in lines {
                write_half.write_all(line.as_bytes()).await.unwrap();
                write_half.write_all(b"\n").await.unwrap();
            }
            write_half.flush().await.unwrap();
        });

        (received, handle)
    }

    fn json<T: serde::Serialize>(value: &T) -> String {
        serde_json::to_string(value).unwrap()
    }

    // ------------------------------------------------------------------------
    // IpcClient Tests
    // ------------------------------------------------------------------------

    mod client_tests {
        use super::*;

        #[test]
        fn test_with_socket_path() {
            let path = PathBuf::from("/tmp/test.sock");
            let client = IpcClient::with_socket_path(path.clone());
            assert_eq!(client.socket_path(), path);
        }

        #[test]
        fn test_new_uses_app_paths() {
            let paths = AppPaths::new("/tmp/sw");
            let client = IpcClient::new(&paths);
            assert_eq!(client.socket_path(), paths.socket_path());
        }

        #[tokio::test(start_paused = true)]
        async fn test_connection_failure_after_retries() {
            let (_dir, socket_path) = create_temp_socket_path();
            let client = IpcClient::with_socket_path(socket_path);

            let result = client.status().await;

            let message = format!("{:#}", result.unwrap_err());
            assert!(message.contains("stopwatch daemon"));
        }

        #[tokio::test]
        async fn test_send_status_request() {
            let (_dir, socket_path) = create_temp_socket_path();
            let listener = UnixListener::bind(&socket_path).unwrap();
            let response = IpcResponse::success("", running_data(1_500));
            let (received, server) = spawn_mock_server(listener, vec![json(&response)]);

            let client = IpcClient::with_socket_path(socket_path);
            let response = client.status().await.unwrap();

            assert_eq!(response.data.unwrap().elapsed_ms, Some(1_500));
            server.await.unwrap();
            assert_eq!(*received.lock().await, Some(IpcRequest::GetStatus));
        }

        #[tokio::test]
        async fn test_send_start_request() {
            let (_dir, socket_path) = create_temp_socket_path();
            let listener = UnixListener::bind(&socket_path).unwrap();
            let response = IpcResponse::success("タイマーを開始しました", running_data(0));
            let (received, server) = spawn_mock_server(listener, vec![json(&response)]);

            let client = IpcClient::with_socket_path(socket_path);
            let response = client.start().await.unwrap();

            assert_eq!(response.message, "タイマーを開始しました");
            server.await.unwrap();
            assert_eq!(*received.lock().await, Some(IpcRequest::Start));
        }

        #[tokio::test]
        async fn test_error_response_becomes_error() {
            let (_dir, socket_path) = create_temp_socket_path();
            let listener = UnixListener::bind(&socket_path).unwrap();
            let response = IpcResponse::error("Tracker is no longer running");
            let (_received, server) = spawn_mock_server(listener, vec![json(&response)]);

            let client = IpcClient::with_socket_path(socket_path);
            let result = client.send_request(IpcRequest::Stop).await;

            assert!(result
                .unwrap_err()
                .to_string()
                .contains("Tracker is no longer running"));
            server.await.unwrap();
        }

        #[tokio::test]
        async fn test_empty_reply_is_error() {
            let (_dir, socket_path) = create_temp_socket_path();
            let listener = UnixListener::bind(&socket_path).unwrap();
            let (_received, server) = spawn_mock_server(listener, Vec::new());

            let client = IpcClient::with_socket_path(socket_path);
            let result = client.send_request(IpcRequest::Pause).await;

            assert!(result.is_err());
            server.await.unwrap();
        }
    }

    // ------------------------------------------------------------------------
    // Subscription Tests
    // ------------------------------------------------------------------------

    mod subscription_tests {
        use super::*;

        #[tokio::test]
        async fn test_subscribe_reads_updates_until_close() {
            let (_dir, socket_path) = create_temp_socket_path();
            let listener = UnixListener::bind(&socket_path).unwrap();
            let lines = vec![
                json(&IpcResponse::success("購読を開始しました", running_data(2_000))),
                json(&TimeUpdate::with_state(2_000, true)),
                json(&TimeUpdate::tick(3_000)),
            ];
            let (received, server) = spawn_mock_server(listener, lines);

            let client = IpcClient::with_socket_path(socket_path);
            let (response, mut updates) = client.subscribe().await.unwrap();

            assert_eq!(response.data.unwrap().is_running, Some(true));
            assert_eq!(
                updates.next().await.unwrap(),
                Some(TimeUpdate::with_state(2_000, true))
            );
            assert_eq!(updates.next().await.unwrap(), Some(TimeUpdate::tick(3_000)));

            server.await.unwrap();
            assert_eq!(updates.next().await.unwrap(), None);
            assert_eq!(*received.lock().await, Some(IpcRequest::Subscribe));
        }

        #[tokio::test]
        async fn test_subscribe_malformed_update() {
            let (_dir, socket_path) = create_temp_socket_path();
            let listener = UnixListener::bind(&socket_path).unwrap();
            let lines = vec![
                json(&IpcResponse::success("購読を開始しました", running_data(0))),
                "garbage".to_string(),
            ];
            let (_received, server) = spawn_mock_server(listener, lines);

            let client = IpcClient::with_socket_path(socket_path);
            let (_response, mut updates) = client.subscribe().await.unwrap();

            assert!(updates.next().await.is_err());
            server.await.unwrap();
        }
    }
}
