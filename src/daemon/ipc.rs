//! IPC server for the stopwatch daemon.
//!
//! This module provides Unix Domain Socket IPC functionality:
//! - Server that listens on a Unix socket
//! - Newline-delimited JSON requests and responses
//! - Dispatch of tracker commands through a [`TrackerHandle`]
//! - Streaming of time updates to subscribed clients

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Serialize;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::net::unix::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::{UnixListener, UnixStream};
use tokio::sync::broadcast::error::RecvError;
use tokio::time::{timeout, Duration};

use crate::types::{IpcRequest, IpcResponse, ResponseData};

use super::service::TrackerHandle;

// ============================================================================
// Constants
// ============================================================================

/// Maximum request size in bytes (4KB), excluding the newline
const MAX_REQUEST_SIZE: usize = 4096;

/// Read timeout in seconds
const READ_TIMEOUT_SECS: u64 = 5;

// ============================================================================
// IpcError
// ============================================================================

/// IPC-specific error types.
#[derive(Debug, thiserror::Error)]
pub enum IpcError {
    /// Read error
    #[error("Failed to read request: {0}")]
    Read(#[source] std::io::Error),

    /// Write error
    #[error("Failed to write response: {0}")]
    Write(#[source] std::io::Error),

    /// Malformed request or unserializable response
    #[error("Invalid message: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Timeout error
    #[error("Operation timed out")]
    Timeout,

    /// Request too large
    #[error("Request too large (max {MAX_REQUEST_SIZE} bytes)")]
    RequestTooLarge,

    /// Peer closed the connection before sending a request
    #[error("Connection closed by client")]
    ConnectionClosed,
}

// ============================================================================
// IpcServer
// ============================================================================

/// Unix Domain Socket IPC server.
pub struct IpcServer {
    /// Unix socket listener
    listener: UnixListener,
    /// Socket path (for cleanup)
    socket_path: PathBuf,
}

impl IpcServer {
    /// Creates a new IPC server bound to the specified socket path.
    ///
    /// If the socket file already exists, it will be removed before binding.
    ///
    /// # Errors
    ///
    /// Returns an error if the socket cannot be bound.
    pub fn new(socket_path: &Path) -> Result<Self> {
        // A previous daemon that crashed leaves its socket behind
        if socket_path.exists() {
            std::fs::remove_file(socket_path)
                .with_context(|| format!("Failed to remove existing socket: {:?}", socket_path))?;
        }

        if let Some(parent) = socket_path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create socket directory: {:?}", parent))?;
        }

        let listener = UnixListener::bind(socket_path)
            .with_context(|| format!("Failed to bind Unix socket: {:?}", socket_path))?;

        Ok(Self {
            listener,
            socket_path: socket_path.to_path_buf(),
        })
    }

    /// Accepts an incoming client connection.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection cannot be accepted.
    pub async fn accept(&self) -> Result<UnixStream> {
        let (stream, _addr) = self
            .listener
            .accept()
            .await
            .context("Failed to accept connection")?;
        Ok(stream)
    }

    /// Reads one request line and deserializes it.
    ///
    /// Applies a read timeout and a size limit.
    ///
    /// # Errors
    ///
    /// Returns an error if reading times out, the line is too long, the peer
    /// closed the connection, or the JSON is invalid.
    pub async fn receive_request<R>(reader: &mut R) -> Result<IpcRequest, IpcError>
    where
        R: AsyncBufRead + Unpin,
    {
        let mut line = String::new();
        let limit = (MAX_REQUEST_SIZE + 1) as u64;

        let read_result = timeout(
            Duration::from_secs(READ_TIMEOUT_SECS),
            (&mut *reader).take(limit).read_line(&mut line),
        )
        .await;

        let n = match read_result {
            Ok(Ok(n)) => n,
            Ok(Err(e)) => return Err(IpcError::Read(e)),
            Err(_) => return Err(IpcError::Timeout),
        };

        if n == 0 {
            return Err(IpcError::ConnectionClosed);
        }

        let payload = line.trim_end_matches(['\r', '\n']);
        if payload.len() > MAX_REQUEST_SIZE {
            return Err(IpcError::RequestTooLarge);
        }

        Ok(serde_json::from_str(payload)?)
    }

    /// Serializes `message` as one JSON line and flushes it.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or writing fails.
    pub async fn send_line<W, T>(writer: &mut W, message: &T) -> Result<(), IpcError>
    where
        W: AsyncWrite + Unpin,
        T: Serialize,
    {
        let mut json = serde_json::to_vec(message)?;
        json.push(b'\n');

        writer.write_all(&json).await.map_err(IpcError::Write)?;
        writer.flush().await.map_err(IpcError::Write)?;

        Ok(())
    }

    /// Returns the socket path.
    pub fn socket_path(&self) -> &Path {
        &self.socket_path
    }
}

impl Drop for IpcServer {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.socket_path);
    }
}

// ============================================================================
// RequestHandler
// ============================================================================

/// Handles IPC requests by forwarding them to the tracker.
#[derive(Clone)]
pub struct RequestHandler {
    tracker: TrackerHandle,
}

impl RequestHandler {
    /// Creates a new request handler for the given tracker.
    pub fn new(tracker: TrackerHandle) -> Self {
        Self { tracker }
    }

    /// Handles a single request and returns the response.
    ///
    /// `Subscribe` is answered with the current status; the streaming part is
    /// done by [`serve`](Self::serve).
    pub async fn handle(&self, request: IpcRequest) -> IpcResponse {
        let (result, message) = match request {
            IpcRequest::Start => (self.tracker.start().await, "タイマーを開始しました"),
            IpcRequest::Pause => (self.tracker.pause().await, "タイマーを一時停止しました"),
            IpcRequest::Resume => (self.tracker.resume().await, "タイマーを再開しました"),
            IpcRequest::Stop => (self.tracker.stop().await, "タイマーを停止しました"),
            IpcRequest::GetStatus => (self.tracker.status().await, ""),
            IpcRequest::Subscribe => (self.tracker.status().await, "購読を開始しました"),
        };

        match result {
            Ok(snapshot) => {
                IpcResponse::success(message, Some(ResponseData::from_snapshot(&snapshot)))
            }
            Err(e) => IpcResponse::error(e.to_string()),
        }
    }

    /// Serves one connection until its request is answered, or until the
    /// subscriber disconnects.
    ///
    /// # Errors
    ///
    /// Returns an error if the request cannot be read or the reply cannot be
    /// written. Malformed requests still get an error response first.
    pub async fn serve(&self, stream: UnixStream) -> Result<(), IpcError> {
        let (read_half, mut writer) = stream.into_split();
        let mut reader = BufReader::new(read_half);

        let request = match IpcServer::receive_request(&mut reader).await {
            Ok(request) => request,
            Err(e) => {
                if matches!(e, IpcError::Serialization(_) | IpcError::RequestTooLarge) {
                    let response = IpcResponse::error(e.to_string());
                    IpcServer::send_line(&mut writer, &response).await?;
                }
                return Err(e);
            }
        };

        tracing::debug!(action = request.as_str(), "Received request");

        if request == IpcRequest::Subscribe {
            return self.stream_updates(reader, writer).await;
        }

        let response = self.handle(request).await;
        IpcServer::send_line(&mut writer, &response).await
    }

    async fn stream_updates(
        &self,
        mut reader: BufReader<OwnedReadHalf>,
        mut writer: OwnedWriteHalf,
    ) -> Result<(), IpcError> {
        // Subscribe before asking for status so its emission is delivered too.
        let mut updates = self.tracker.subscribe();
        let response = self.handle(IpcRequest::Subscribe).await;
        let subscribed = response.is_success();
        IpcServer::send_line(&mut writer, &response).await?;
        if !subscribed {
            return Ok(());
        }

        tracing::debug!("Subscriber connected");
        // Anything a subscriber sends is ignored; only EOF matters.
        let mut discard = [0u8; 512];

        loop {
            tokio::select! {
                update = updates.recv() => match update {
                    Ok(update) => IpcServer::send_line(&mut writer, &update).await?,
                    Err(RecvError::Lagged(skipped)) => {
                        tracing::debug!(skipped, "Subscriber lagged, skipping updates");
                    }
                    Err(RecvError::Closed) => break,
                },
                read = reader.read(&mut discard) => match read {
                    Ok(0) | Err(_) => break,
                    Ok(_) => {}
                },
            }
        }

        tracing::debug!("Subscriber disconnected");
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================
