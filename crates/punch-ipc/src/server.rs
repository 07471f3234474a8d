//! IPC server implementation

use punch_api::{
    ClientInfo, Command, ErrorCode, ErrorInfo, Event, Request, Response,
};
use punch_util::ClientId;
use std::collections::HashMap;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{UnixListener, UnixStream};
use tokio::sync::{Mutex, RwLock, broadcast, mpsc};
use tracing::{debug, error, info, warn};

use crate::{IpcError, IpcResult, peer_uid, role_for_uid};

/// Message from the connection tasks to the service
pub enum ServerMessage {
    Request {
        client_id: ClientId,
        request: Request,
    },
    ClientConnected {
        client_id: ClientId,
        info: ClientInfo,
    },
    ClientDisconnected {
        client_id: ClientId,
    },
}

/// NDJSON server on a Unix domain socket.
///
/// Requests are forwarded to the service over an mpsc channel; responses are
/// routed back per client and notices are fanned out to subscribed clients.
pub struct IpcServer {
    socket_path: PathBuf,
    listener: Option<UnixListener>,
    clients: Arc<RwLock<HashMap<ClientId, ClientHandle>>>,
    event_tx: broadcast::Sender<Event>,
    message_tx: mpsc::UnboundedSender<ServerMessage>,
    message_rx: Arc<Mutex<Option<mpsc::UnboundedReceiver<ServerMessage>>>>,
}

struct ClientHandle {
    info: ClientInfo,
    response_tx: mpsc::UnboundedSender<String>,
    subscribed: bool,
}

impl IpcServer {
    pub fn new(socket_path: impl AsRef<Path>) -> Self {
        let (event_tx, _) = broadcast::channel(256);
        let (message_tx, message_rx) = mpsc::unbounded_channel();

        Self {
            socket_path: socket_path.as_ref().to_path_buf(),
            listener: None,
            clients: Arc::new(RwLock::new(HashMap::new())),
            event_tx,
            message_tx,
            message_rx: Arc::new(Mutex::new(Some(message_rx))),
        }
    }

    /// Bind the socket, replacing a stale one from a previous run
    pub async fn start(&mut self) -> IpcResult<()> {
        if self.socket_path.exists() {
            std::fs::remove_file(&self.socket_path)?;
        }

        if let Some(parent) = self.socket_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let listener = UnixListener::bind(&self.socket_path)?;

        // Owner and group (the bridge's group) may connect
        std::fs::set_permissions(&self.socket_path, std::fs::Permissions::from_mode(0o660))?;

        info!(path = %self.socket_path.display(), "IPC server listening");

        self.listener = Some(listener);
        Ok(())
    }

    /// Take the receiver for server messages; only the first call gets it
    pub async fn take_message_receiver(&self) -> Option<mpsc::UnboundedReceiver<ServerMessage>> {
        self.message_rx.lock().await.take()
    }

    /// Accept connections until the task is dropped
    pub async fn run(&self) -> IpcResult<()> {
        let listener = self
            .listener
            .as_ref()
            .ok_or_else(|| IpcError::ServerError("Server not started".into()))?;
        let service_uid = nix::unistd::getuid().as_raw();

        loop {
            match listener.accept().await {
                Ok((stream, _)) => {
                    let uid = peer_uid(&stream);
                    let role = role_for_uid(uid, service_uid);

                    let mut info = ClientInfo::new(role);
                    if let Some(u) = uid {
                        info = info.with_uid(u);
                    }

                    info!(client_id = %info.client_id, uid = ?uid, role = ?role, "Client connected");

                    self.handle_client(stream, info).await;
                }
                Err(e) => {
                    error!(error = %e, "Failed to accept connection");
                }
            }
        }
    }

    async fn handle_client(&self, stream: UnixStream, info: ClientInfo) {
        let client_id = info.client_id.clone();
        let (read_half, write_half) = stream.into_split();
        let (response_tx, mut response_rx) = mpsc::unbounded_channel::<String>();

        self.clients.write().await.insert(
            client_id.clone(),
            ClientHandle {
                info: info.clone(),
                response_tx: response_tx.clone(),
                subscribed: false,
            },
        );

        let _ = self.message_tx.send(ServerMessage::ClientConnected {
            client_id: client_id.clone(),
            info,
        });

        // Reader: parse requests, track subscription state, forward the rest
        let clients = self.clients.clone();
        let message_tx = self.message_tx.clone();
        let reader_id = client_id.clone();

        tokio::spawn(async move {
            let mut reader = BufReader::new(read_half);
            let mut line = String::new();

            loop {
                line.clear();
                match reader.read_line(&mut line).await {
                    Ok(0) => {
                        debug!(client_id = %reader_id, "Client disconnected (EOF)");
                        break;
                    }
                    Ok(_) => {
                        let line = line.trim();
                        if line.is_empty() {
                            continue;
                        }

                        match serde_json::from_str::<Request>(line) {
                            Ok(request) => {
                                let subscribe = match request.command {
                                    Command::SubscribeEvents => Some(true),
                                    Command::UnsubscribeEvents => Some(false),
                                    _ => None,
                                };
                                if let Some(subscribed) = subscribe
                                    && let Some(handle) = clients.write().await.get_mut(&reader_id)
                                {
                                    handle.subscribed = subscribed;
                                }

                                let _ = message_tx.send(ServerMessage::Request {
                                    client_id: reader_id.clone(),
                                    request,
                                });
                            }
                            Err(e) => {
                                warn!(client_id = %reader_id, error = %e, "Invalid request");

                                let response = Response::error(
                                    0,
                                    ErrorInfo::new(ErrorCode::InvalidRequest, e.to_string()),
                                );
                                if let Ok(json) = serde_json::to_string(&response) {
                                    let _ = response_tx.send(json);
                                }
                            }
                        }
                    }
                    Err(e) => {
                        debug!(client_id = %reader_id, error = %e, "Read error");
                        break;
                    }
                }
            }

            // Dropping the handle closes the response channel and ends the writer
            clients.write().await.remove(&reader_id);
        });

        // Writer: responses for this client plus notices if subscribed
        let mut event_rx = self.event_tx.subscribe();
        let clients = self.clients.clone();
        let message_tx = self.message_tx.clone();

        tokio::spawn(async move {
            let mut writer = write_half;

            loop {
                let msg = tokio::select! {
                    response = response_rx.recv() => match response {
                        Some(response) => response,
                        None => break,
                    },

                    event = event_rx.recv() => match event {
                        Ok(event) => {
                            let subscribed = clients
                                .read()
                                .await
                                .get(&client_id)
                                .is_some_and(|h| h.subscribed);
                            if !subscribed {
                                continue;
                            }
                            match serde_json::to_string(&event) {
                                Ok(json) => json,
                                Err(_) => continue,
                            }
                        }
                        Err(broadcast::error::RecvError::Lagged(skipped)) => {
                            warn!(client_id = %client_id, skipped, "Client lagging, events dropped");
                            continue;
                        }
                        Err(broadcast::error::RecvError::Closed) => break,
                    },
                };

                let mut msg = msg;
                msg.push('\n');
                if let Err(e) = writer.write_all(msg.as_bytes()).await {
                    debug!(client_id = %client_id, error = %e, "Write error");
                    break;
                }
            }

            let _ = message_tx.send(ServerMessage::ClientDisconnected {
                client_id: client_id.clone(),
            });
            clients.write().await.remove(&client_id);
        });
    }

    /// Send a response to a specific client
    pub async fn send_response(&self, client_id: &ClientId, response: Response) -> IpcResult<()> {
        let json = serde_json::to_string(&response)?;

        let clients = self.clients.read().await;
        let handle = clients.get(client_id).ok_or(IpcError::ConnectionClosed)?;
        handle
            .response_tx
            .send(json)
            .map_err(|_| IpcError::ConnectionClosed)
    }

    /// Broadcast an event; returns how many connections may receive it
    pub fn broadcast_event(&self, event: Event) -> usize {
        self.event_tx.send(event).unwrap_or(0)
    }

    pub async fn get_client_info(&self, client_id: &ClientId) -> Option<ClientInfo> {
        self.clients.read().await.get(client_id).map(|h| h.info.clone())
    }

    /// Remove the socket file
    pub fn shutdown(&self) {
        if self.socket_path.exists() {
            let _ = std::fs::remove_file(&self.socket_path);
        }
    }
}

impl Drop for IpcServer {
    fn drop(&mut self) {
        self.shutdown();
    }
}
