//! MCP transport: newline-delimited JSON-RPC 2.0 over stdio
//!
//! Each `tools/call` runs on its own task so a slow call does not hold up
//! `ping` or cancellation. Responses are written by a single writer task in
//! completion order.

use crate::session::SessionEvent;
use crate::tools::{failure_body, tool_definitions, Dispatcher};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::sync::{broadcast, mpsc, Mutex};
use tokio::task::JoinSet;

pub const PROTOCOL_VERSION: &str = "2024-11-05";
pub const SERVER_NAME: &str = "music-assistant-mcp";

const PARSE_ERROR: i64 = -32700;
const METHOD_NOT_FOUND: i64 = -32601;

/// Request id -> cancelled flag, for calls still running
type InFlight = Arc<Mutex<HashMap<String, bool>>>;

fn response(id: Value, result: Value) -> Value {
    json!({ "jsonrpc": "2.0", "id": id, "result": result })
}

fn error_response(id: Value, code: i64, message: String) -> Value {
    json!({
        "jsonrpc": "2.0",
        "id": id,
        "error": { "code": code, "message": message }
    })
}

/// MCP server over a shared dispatcher
pub struct McpServer {
    dispatcher: Arc<Dispatcher>,
    in_flight: InFlight,
}

impl McpServer {
    pub fn new(dispatcher: Dispatcher) -> Self {
        Self {
            dispatcher: Arc::new(dispatcher),
            in_flight: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    /// Serve on the process's stdin/stdout until stdin closes
    pub async fn run_stdio(&self) -> std::io::Result<()> {
        let events = tokio::spawn(log_session_events(self.dispatcher.sessions().subscribe()));
        let result = self
            .serve(BufReader::new(tokio::io::stdin()), tokio::io::stdout())
            .await;
        events.abort();
        result
    }

    /// Serve one connection; returns after the reader hits EOF and every
    /// running call has been answered
    pub async fn serve<R, W>(&self, reader: R, writer: W) -> std::io::Result<()>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin + Send + 'static,
    {
        let (tx, rx) = mpsc::unbounded_channel::<Value>();
        let writer_task = tokio::spawn(write_responses(writer, rx));

        let mut calls = JoinSet::new();
        let mut lines = reader.lines();
        while let Some(line) = lines.next_line().await? {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            if let Some(reply) = self.handle_line(line, &tx, &mut calls).await {
                if tx.send(reply).is_err() {
                    break;
                }
            }
        }

        tracing::debug!("Input closed; waiting for {} running call(s)", calls.len());
        while calls.join_next().await.is_some() {}
        drop(tx);

        match writer_task.await {
            Ok(result) => result,
            Err(e) => Err(std::io::Error::new(std::io::ErrorKind::Other, e)),
        }
    }

    /// Handle a single JSON-RPC line; returns the immediate reply, if any
    async fn handle_line(
        &self,
        line: &str,
        tx: &mpsc::UnboundedSender<Value>,
        calls: &mut JoinSet<()>,
    ) -> Option<Value> {
        let request: Value = match serde_json::from_str(line) {
            Ok(v) => v,
            Err(e) => {
                tracing::warn!("Unparseable request: {}", e);
                return Some(error_response(Value::Null, PARSE_ERROR, format!("Parse error: {}", e)));
            }
        };

        let id = request.get("id").cloned();
        let method = request.get("method").and_then(|m| m.as_str()).unwrap_or("");
        let params = request.get("params").cloned().unwrap_or_else(|| json!({}));
        tracing::debug!("<- {} (id {:?})", method, id);

        match method {
            "initialize" => Some(response(
                id.unwrap_or(Value::Null),
                json!({
                    "protocolVersion": PROTOCOL_VERSION,
                    "capabilities": { "tools": {} },
                    "serverInfo": {
                        "name": SERVER_NAME,
                        "version": env!("CARGO_PKG_VERSION")
                    }
                }),
            )),
            "ping" => Some(response(id.unwrap_or(Value::Null), json!({}))),
            "tools/list" => Some(response(id.unwrap_or(Value::Null), tool_definitions())),
            "tools/call" => {
                let id = id.unwrap_or(Value::Null);
                let name = params
                    .get("name")
                    .and_then(|n| n.as_str())
                    .unwrap_or("")
                    .to_string();
                let arguments = params.get("arguments").cloned().unwrap_or_else(|| json!({}));

                let key = id.to_string();
                self.in_flight.lock().await.insert(key.clone(), false);

                let dispatcher = self.dispatcher.clone();
                let in_flight = self.in_flight.clone();
                let tx = tx.clone();
                calls.spawn(async move {
                    let result = call_result(&dispatcher, &name, arguments).await;
                    let cancelled = in_flight.lock().await.remove(&key).unwrap_or(false);
                    if cancelled {
                        tracing::info!("Dropping response to cancelled call {} ({})", key, name);
                        return;
                    }
                    let _ = tx.send(response(id, result));
                });
                None
            }
            "notifications/initialized" => None,
            "notifications/cancelled" => {
                if let Some(target) = params.get("requestId") {
                    if let Some(flag) = self.in_flight.lock().await.get_mut(&target.to_string()) {
                        tracing::debug!("Call {} cancelled by client", target);
                        *flag = true;
                    }
                }
                None
            }
            other if id.is_none() => {
                tracing::debug!("Ignoring notification {}", other);
                None
            }
            other => Some(error_response(
                id.unwrap_or(Value::Null),
                METHOD_NOT_FOUND,
                format!("Method not found: {}", other),
            )),
        }
    }
}

/// Run a tool and shape the MCP `tools/call` result
async fn call_result(dispatcher: &Dispatcher, name: &str, arguments: Value) -> Value {
    match dispatcher.call(name, arguments).await {
        Ok(output) => json!({
            "content": [{
                "type": "text",
                "text": serde_json::to_string_pretty(&output).unwrap_or_default()
            }],
            "isError": false
        }),
        Err(e) => json!({
            "content": [{
                "type": "text",
                "text": serde_json::to_string_pretty(&failure_body(&e)).unwrap_or_default()
            }],
            "isError": true
        }),
    }
}

async fn write_responses<W>(mut writer: W, mut rx: mpsc::UnboundedReceiver<Value>) -> std::io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    while let Some(message) = rx.recv().await {
        let mut line = message.to_string();
        line.push('\n');
        writer.write_all(line.as_bytes()).await?;
        writer.flush().await?;
    }
    writer.shutdown().await
}

async fn log_session_events(mut events: broadcast::Receiver<SessionEvent>) {
    loop {
        match events.recv().await {
            Ok(SessionEvent::Connected { generation }) => {
                tracing::info!("Connected to Music Assistant (session {})", generation);
            }
            Ok(SessionEvent::Disconnected { generation, reason }) => {
                tracing::warn!("Session {} ended: {}", generation, reason);
            }
            Err(broadcast::error::RecvError::Lagged(n)) => {
                tracing::debug!("Missed {} session event(s)", n);
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}
