use crate::error::{MaError, Result};
use crate::protocol::{map_remote_error, Incoming, Request, ServerInfo};
use futures_util::{SinkExt, StreamExt};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot, Mutex};
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::{HeaderValue, StatusCode};
use tokio_tungstenite::{connect_async, tungstenite::Message};

type Reply = std::result::Result<Value, MaError>;

/// Request waiting for its (possibly chunked) result
struct Pending {
    tx: oneshot::Sender<Reply>,
    /// Accumulated `partial` result chunks
    chunks: Vec<Value>,
}

/// WebSocket connection state
struct ConnectionState {
    pending_requests: HashMap<String, Pending>,
    /// Channel for sending outgoing messages
    ws_tx: mpsc::UnboundedSender<Message>,
    /// Handshake waiter, taken by the first server-info frame
    server_info_tx: Option<oneshot::Sender<ServerInfo>>,
}

/// Low-level WebSocket connection to a Music Assistant server
pub struct Connection {
    state: Arc<Mutex<ConnectionState>>,
    connected: Arc<AtomicBool>,
    request_timeout: Duration,
    server_info: ServerInfo,
}

impl Connection {
    /// Open the socket, wait for the server greeting and authenticate
    pub async fn connect(url: &str, token: Option<&str>, request_timeout: Duration) -> Result<Self> {
        tracing::info!("Connecting to {}", url);

        let mut request = url.into_client_request()?;
        if let Some(token) = token {
            let header = HeaderValue::from_str(&format!("Bearer {}", token))
                .map_err(|_| MaError::Config("token contains characters not allowed in a header".to_string()))?;
            request.headers_mut().insert("Authorization", header);
        }

        let (ws_stream, _) = match connect_async(request).await {
            Ok(ok) => ok,
            Err(tokio_tungstenite::tungstenite::Error::Http(response))
                if response.status() == StatusCode::UNAUTHORIZED
                    || response.status() == StatusCode::FORBIDDEN =>
            {
                return Err(MaError::Auth(format!("server answered {}", response.status())));
            }
            Err(e) => return Err(e.into()),
        };
        let (mut write, mut read) = ws_stream.split();

        let (ws_tx, mut ws_rx) = mpsc::unbounded_channel::<Message>();
        let (info_tx, info_rx) = oneshot::channel();
        let connected = Arc::new(AtomicBool::new(true));

        let state = Arc::new(Mutex::new(ConnectionState {
            pending_requests: HashMap::new(),
            ws_tx,
            server_info_tx: Some(info_tx),
        }));

        // Forward outgoing messages to the socket
        let write_connected = connected.clone();
        let write_handle = tokio::spawn(async move {
            while let Some(msg) = ws_rx.recv().await {
                let closing = matches!(msg, Message::Close(_));
                if let Err(e) = write.send(msg).await {
                    tracing::error!("Failed to send message: {}", e);
                    write_connected.store(false, Ordering::SeqCst);
                    break;
                }
                if closing {
                    break;
                }
            }
        });

        // Receive and route incoming messages
        let state_clone = state.clone();
        let read_connected = connected.clone();
        tokio::spawn(async move {
            while let Some(msg_result) = read.next().await {
                match msg_result {
                    Ok(Message::Text(text)) => {
                        if let Err(e) = Self::handle_message(&state_clone, &text).await {
                            tracing::error!("Error handling message: {}", e);
                        }
                    }
                    Ok(Message::Close(_)) => {
                        tracing::info!("WebSocket connection closed by server");
                        break;
                    }
                    Err(e) => {
                        tracing::error!("WebSocket error: {}", e);
                        break;
                    }
                    _ => {}
                }
            }

            // Connection closed, fail all pending requests and a handshake still waiting
            read_connected.store(false, Ordering::SeqCst);
            let mut state = state_clone.lock().await;
            state.server_info_tx.take();
            for (_, pending) in state.pending_requests.drain() {
                let _ = pending.tx.send(Err(MaError::ConnectionClosed));
            }
            write_handle.abort();
        });

        let server_info = match timeout(request_timeout, info_rx).await {
            Ok(Ok(info)) => info,
            Ok(Err(_)) => {
                tracing::warn!("Server closed the socket before its greeting");
                let _ = state.lock().await.ws_tx.send(Message::Close(None));
                return Err(MaError::ConnectionClosed);
            }
            Err(_) => {
                let _ = state.lock().await.ws_tx.send(Message::Close(None));
                return Err(MaError::Timeout(request_timeout));
            }
        };
        tracing::info!(
            "Connected to Music Assistant {} (schema {})",
            server_info.server_version,
            server_info.schema_version
        );

        let connection = Self {
            state,
            connected,
            request_timeout,
            server_info,
        };

        if let Some(token) = token {
            let auth = Request::new("auth").with_args(json!({ "token": token }));
            match connection.send_request(auth).await {
                Ok(_) => tracing::debug!("Authenticated"),
                Err(MaError::Rejected { detail, .. }) | Err(MaError::Auth(detail)) => {
                    connection.close().await;
                    return Err(MaError::Auth(detail));
                }
                Err(e) => {
                    connection.close().await;
                    return Err(e);
                }
            }
        }

        Ok(connection)
    }

    /// Handle an incoming message
    async fn handle_message(state: &Arc<Mutex<ConnectionState>>, text: &str) -> Result<()> {
        tracing::debug!("Received: {}", text);

        let incoming = Incoming::parse(text)?;
        let mut state = state.lock().await;

        match incoming {
            Incoming::ServerInfo(info) => {
                if let Some(tx) = state.server_info_tx.take() {
                    let _ = tx.send(info);
                }
            }
            Incoming::Result {
                message_id,
                result,
                partial,
            } => {
                if partial {
                    match state.pending_requests.get_mut(&message_id) {
                        Some(pending) => pending.chunks.push(result),
                        None => tracing::debug!("Dropping partial result for unknown request {}", message_id),
                    }
                    return Ok(());
                }
                match state.pending_requests.remove(&message_id) {
                    Some(pending) => {
                        let _ = pending.tx.send(Ok(merge_chunks(pending.chunks, result)));
                    }
                    // Caller gave up (timeout or cancellation); the command still ran
                    None => tracing::debug!("Discarding result for request {}", message_id),
                }
            }
            Incoming::Error {
                message_id,
                code,
                details,
            } => {
                if let Some(pending) = state.pending_requests.remove(&message_id) {
                    let _ = pending.tx.send(Err(map_remote_error(code, details)));
                }
            }
            Incoming::Event { event, object_id } => {
                tracing::trace!("Event {} for {:?}", event, object_id);
            }
        }

        Ok(())
    }

    /// Send a request and wait for the result
    pub async fn send_request(&self, request: Request) -> Result<Value> {
        if !self.is_connected() {
            return Err(MaError::ConnectionClosed);
        }

        let request_id = request.id().to_string();
        let (tx, rx) = oneshot::channel();

        // Register the pending request
        {
            let mut state = self.state.lock().await;
            state.pending_requests.insert(
                request_id.clone(),
                Pending {
                    tx,
                    chunks: Vec::new(),
                },
            );

            let json = serde_json::to_string(&request)?;
            tracing::debug!("Sending: {}", json);

            if state.ws_tx.send(Message::Text(json)).is_err() {
                state.pending_requests.remove(&request_id);
                return Err(MaError::ConnectionClosed);
            }
        }

        // Wait for response with timeout
        match timeout(self.request_timeout, rx).await {
            Ok(Ok(reply)) => reply,
            Ok(Err(_)) => Err(MaError::ConnectionClosed),
            Err(_) => {
                let mut state = self.state.lock().await;
                state.pending_requests.remove(&request_id);
                Err(MaError::Timeout(self.request_timeout))
            }
        }
    }

    /// Whether the reader task still sees an open socket
    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    pub fn server_info(&self) -> &ServerInfo {
        &self.server_info
    }

    /// Politely close the socket
    pub async fn close(&self) {
        self.connected.store(false, Ordering::SeqCst);
        let state = self.state.lock().await;
        let _ = state.ws_tx.send(Message::Close(None));
    }
}

/// Join partial list chunks with the final chunk
fn merge_chunks(chunks: Vec<Value>, last: Value) -> Value {
    if chunks.is_empty() {
        return last;
    }
    let mut merged = Vec::new();
    for chunk in chunks.into_iter().chain(std::iter::once(last)) {
        match chunk {
            Value::Array(items) => merged.extend(items),
            Value::Null => {}
            other => merged.push(other),
        }
    }
    Value::Array(merged)
}
