/*!
 * IPC Server for BLUEDECK Daemon
 * JSON lines protocol over Unix socket
 */

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::io::ErrorKind;
use std::os::unix::fs::FileTypeExt;
use std::path::Path;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::net::{UnixListener, UnixStream};

use bluedeck_facade::{CommandRunner, DeviceFacade, FacadeError};

/// Longest accepted request line, newline included.
pub const MAX_REQUEST_BYTES: usize = 64 * 1024;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "method", rename_all = "snake_case")]
pub enum Request {
    GetAdapterStatus,
    ListPairedDevices,
    GetDeviceInfo { device: String },
    ToggleDeviceConnection { device: String, connected: bool },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Response {
    Output { text: String },
    Error { kind: String, message: String },
}

impl Response {
    fn bad_request(message: impl Into<String>) -> Self {
        Response::Error {
            kind: "bad_request".to_string(),
            message: message.into(),
        }
    }
}

impl From<FacadeError> for Response {
    fn from(err: FacadeError) -> Self {
        Response::Error {
            kind: err.kind().to_string(),
            message: err.to_string(),
        }
    }
}

pub async fn dispatch<R: CommandRunner>(facade: &DeviceFacade<R>, request: Request) -> Response {
    let result = match request {
        Request::GetAdapterStatus => facade.get_adapter_status().await,
        Request::ListPairedDevices => facade.list_paired_devices().await,
        Request::GetDeviceInfo { device } => facade.get_device_info(&device).await,
        Request::ToggleDeviceConnection { device, connected } => {
            facade.toggle_device_connection(&device, connected).await
        }
    };

    match result {
        Ok(text) => Response::Output { text },
        Err(e) => {
            tracing::error!("Request failed: {}", e);
            e.into()
        }
    }
}

pub struct IpcServer<R> {
    listener: UnixListener,
    facade: Arc<DeviceFacade<R>>,
}

impl<R: CommandRunner + 'static> IpcServer<R> {
    pub fn new(listener: UnixListener, facade: DeviceFacade<R>) -> Self {
        Self {
            listener,
            facade: Arc::new(facade),
        }
    }

    pub async fn run(self) -> Result<()> {
        tracing::info!("IPC server listening for connections...");

        loop {
            match self.listener.accept().await {
                Ok((stream, _)) => {
                    tracing::debug!("New client connected");
                    let facade = Arc::clone(&self.facade);

                    tokio::spawn(async move {
                        if let Err(e) = handle_client(stream, &facade).await {
                            tracing::error!("Client error: {}", e);
                        }
                    });
                }
                Err(e) => {
                    tracing::error!("Failed to accept connection: {}", e);
                }
            }
        }
    }
}

pub async fn handle_client<R: CommandRunner>(stream: UnixStream, facade: &DeviceFacade<R>) -> Result<()> {
    let (read_half, mut write_half) = stream.into_split();
    let mut reader = BufReader::new(read_half);
    let mut buf = Vec::new();

    loop {
        buf.clear();
        let read = (&mut reader)
            .take(MAX_REQUEST_BYTES as u64)
            .read_until(b'\n', &mut buf)
            .await?;
        if read == 0 {
            break;
        }

        if buf.len() >= MAX_REQUEST_BYTES && buf.last() != Some(&b'\n') {
            tracing::warn!("Dropping client after oversized request");
            let response = Response::bad_request(format!("request exceeds {} bytes", MAX_REQUEST_BYTES));
            write_response(&mut write_half, &response).await?;
            return Ok(());
        }

        let response = match std::str::from_utf8(&buf) {
            Ok(line) => {
                let request = line.trim();
                if request.is_empty() {
                    continue;
                }
                tracing::debug!("Received request: {}", request);

                match serde_json::from_str::<Request>(request) {
                    Ok(request) => dispatch(facade, request).await,
                    Err(e) => Response::bad_request(e.to_string()),
                }
            }
            Err(e) => Response::bad_request(e.to_string()),
        };

        write_response(&mut write_half, &response).await?;
    }

    tracing::debug!("Client disconnected");
    Ok(())
}

async fn write_response<W: AsyncWrite + Unpin>(writer: &mut W, response: &Response) -> Result<()> {
    let mut payload = serde_json::to_vec(response)?;
    payload.push(b'\n');
    writer.write_all(&payload).await?;
    Ok(())
}

/// Removes a socket left behind by a previous run. Refuses to touch
/// anything that is not a socket, or a socket another daemon still serves.
pub fn clear_stale_socket(path: &Path) -> Result<()> {
    let metadata = match std::fs::symlink_metadata(path) {
        Ok(metadata) => metadata,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(()),
        Err(e) => return Err(e).with_context(|| format!("cannot inspect {}", path.display())),
    };

    if !metadata.file_type().is_socket() {
        bail!("{} exists and is not a socket", path.display());
    }
    if std::os::unix::net::UnixStream::connect(path).is_ok() {
        bail!("another daemon is already listening on {}", path.display());
    }

    tracing::info!("Removing stale socket {}", path.display());
    std::fs::remove_file(path).with_context(|| format!("cannot remove {}", path.display()))
}
