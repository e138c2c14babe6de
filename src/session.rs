use crate::client::{MusicApi, RemoteClient};
use crate::config::Config;
use crate::error::{MaError, Result};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, Mutex, OwnedMutexGuard};
use tokio::time::sleep;

const INITIAL_BACKOFF: Duration = Duration::from_millis(250);
const MAX_BACKOFF: Duration = Duration::from_secs(2);

/// Opens new API sessions
#[async_trait]
pub trait Connector: Send + Sync {
    async fn connect(&self, config: &Config) -> Result<Arc<dyn MusicApi>>;
}

/// Connector for a real Music Assistant server
pub struct WsConnector;

#[async_trait]
impl Connector for WsConnector {
    async fn connect(&self, config: &Config) -> Result<Arc<dyn MusicApi>> {
        let client = RemoteClient::connect(config).await?;
        Ok(Arc::new(client))
    }
}

/// Connection state of the managed session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
    /// Session was lost or a reconnect failed; the next acquisition reconnects
    Degraded,
}

/// Lifecycle event, observable by subscribers
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    Connected { generation: u64 },
    Disconnected { generation: u64, reason: String },
}

struct Inner {
    state: ConnectionState,
    api: Option<Arc<dyn MusicApi>>,
    /// Incremented on every successful connect
    generation: u64,
    command_lock: Arc<Mutex<()>>,
}

/// Owns the single live session to the server
///
/// Tool calls borrow a [`Session`] for the length of one logical operation.
/// A transport failure observed through that session invalidates it, so the
/// next acquisition reconnects instead of reusing a dead socket.
pub struct SessionManager {
    config: Config,
    connector: Box<dyn Connector>,
    inner: Mutex<Inner>,
    events: broadcast::Sender<SessionEvent>,
}

impl SessionManager {
    pub fn new(config: Config, connector: impl Connector + 'static) -> Self {
        let (events, _) = broadcast::channel(16);
        Self {
            config,
            connector: Box::new(connector),
            inner: Mutex::new(Inner {
                state: ConnectionState::Disconnected,
                api: None,
                generation: 0,
                command_lock: Arc::new(Mutex::new(())),
            }),
            events,
        }
    }

    pub async fn state(&self) -> ConnectionState {
        self.inner.lock().await.state
    }

    /// Subscribe to connect/disconnect events
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    /// Get a usable session, connecting or reconnecting as needed
    pub async fn acquire(&self) -> Result<Session<'_>> {
        let mut inner = self.inner.lock().await;

        if let Some(api) = inner.api.clone() {
            if api.is_connected() {
                return Ok(Session {
                    api,
                    generation: inner.generation,
                    command_lock: inner.command_lock.clone(),
                    manager: self,
                });
            }
            tracing::warn!("Session {} lost its connection", inner.generation);
            self.drop_session(&mut inner, "connection dropped".to_string()).await;
        }

        inner.state = ConnectionState::Connecting;
        let attempts = self.config.connect_retries.max(1);
        let mut backoff = INITIAL_BACKOFF;
        let mut last_error = None;

        for attempt in 1..=attempts {
            if attempt > 1 {
                tracing::info!("Reconnecting in {:?} (attempt {}/{})", backoff, attempt, attempts);
                sleep(backoff).await;
                backoff = (backoff * 2).min(MAX_BACKOFF);
            }

            match self.connector.connect(&self.config).await {
                Ok(api) => {
                    inner.generation += 1;
                    inner.api = Some(api.clone());
                    inner.state = ConnectionState::Connected;
                    inner.command_lock = Arc::new(Mutex::new(()));
                    tracing::info!("Session {} established", inner.generation);
                    let _ = self.events.send(SessionEvent::Connected {
                        generation: inner.generation,
                    });
                    return Ok(Session {
                        api,
                        generation: inner.generation,
                        command_lock: inner.command_lock.clone(),
                        manager: self,
                    });
                }
                // Credentials do not fix themselves
                Err(e @ MaError::Auth(_)) | Err(e @ MaError::Config(_)) => {
                    tracing::error!("Connection refused: {}", e);
                    inner.state = ConnectionState::Disconnected;
                    return Err(e);
                }
                Err(e) => {
                    tracing::warn!("Connection attempt {}/{} failed: {}", attempt, attempts, e);
                    last_error = Some(e);
                }
            }
        }

        inner.state = ConnectionState::Degraded;
        Err(MaError::ConnectFailed {
            attempts,
            last: last_error.map(|e| e.to_string()).unwrap_or_default(),
        })
    }

    /// Mark the current session unusable; the next `acquire` reconnects
    pub async fn invalidate(&self) {
        let mut inner = self.inner.lock().await;
        if inner.api.is_some() {
            self.drop_session(&mut inner, "invalidated".to_string()).await;
        }
    }

    async fn invalidate_generation(&self, generation: u64, reason: String) {
        let mut inner = self.inner.lock().await;
        // A late failure from an older session must not tear down a newer one
        if inner.generation == generation && inner.api.is_some() {
            tracing::warn!("Invalidating session {}: {}", generation, reason);
            self.drop_session(&mut inner, reason).await;
        }
    }

    async fn drop_session(&self, inner: &mut Inner, reason: String) {
        if let Some(api) = inner.api.take() {
            api.disconnect().await;
        }
        inner.state = ConnectionState::Degraded;
        let _ = self.events.send(SessionEvent::Disconnected {
            generation: inner.generation,
            reason,
        });
    }

    /// Close the session on process exit
    pub async fn shutdown(&self) {
        let mut inner = self.inner.lock().await;
        if let Some(api) = inner.api.take() {
            api.disconnect().await;
            let _ = self.events.send(SessionEvent::Disconnected {
                generation: inner.generation,
                reason: "shutdown".to_string(),
            });
        }
        inner.state = ConnectionState::Disconnected;
    }
}

/// Borrowed handle to the live session, valid for one tool call
pub struct Session<'a> {
    api: Arc<dyn MusicApi>,
    generation: u64,
    command_lock: Arc<Mutex<()>>,
    manager: &'a SessionManager,
}

impl Session<'_> {
    pub fn api(&self) -> &dyn MusicApi {
        self.api.as_ref()
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Serialise state-changing commands issued through this session
    pub async fn lock_commands(&self) -> OwnedMutexGuard<()> {
        self.command_lock.clone().lock_owned().await
    }

    /// Pass a result through, invalidating the session on transport failure
    pub async fn observe<T>(&self, result: Result<T>) -> Result<T> {
        if let Err(e) = &result {
            if e.is_transport() {
                self.manager
                    .invalidate_generation(self.generation, e.to_string())
                    .await;
            }
        }
        result
    }
}
