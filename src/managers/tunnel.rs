//! Tunnel lifecycle management
//!
//! A tunnel runs as two tasks on the tokio runtime: a connect task that drives
//! [`Tunnel::serve`] and a stop watcher that cancels it once the controller asks.
//! The controller only talks to them through two oneshot channels: *ready*,
//! resolved with `Ok` once forwarding works or with the error that prevented
//! it, and *stop*, sent once the dump is done.

use crate::config::DatabaseConfig;
use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use thiserror::Error;
use tokio::runtime::Handle;
use tokio::sync::{oneshot, watch};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, Instrument};

const DEFAULT_SSH_PORT: u16 = 22;
const DEFAULT_SSH_USER: &str = "root";
const DEFAULT_TUNNEL_DB_HOST: &str = "localhost";

/// Lifecycle of a single tunnel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TunnelState {
    Idle,
    Starting,
    Started,
    Stopping,
    Stopped,
    /// The tunnel gave up before or while forwarding
    Failed,
}

#[derive(Debug, Error)]
pub enum TunnelError {
    #[error("Failed to load SSH key {path}: {message}")]
    KeyFile { path: String, message: String },

    #[error("SSH authentication rejected for user '{0}'")]
    AuthRejected(String),

    #[error("Tunnel connection failed: {0}")]
    Connect(String),

    #[error("Tunnel was not ready after {0:?}")]
    ReadyTimeout(Duration),

    #[error("Tunnel stopped before it became ready")]
    Closed,
}

/// Everything needed to open one tunnel
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TunnelSettings {
    pub ssh_host: String,
    pub ssh_port: u16,
    pub ssh_user: String,
    pub ssh_password: Option<String>,
    pub ssh_key_file: Option<PathBuf>,
    /// Database host as seen from the SSH server
    pub db_host: String,
    pub remote_port: u16,
    pub local_port: u16,
}

impl TunnelSettings {
    /// Tunnel settings for a target, or `None` when it has no SSH host
    pub fn from_config(db: &DatabaseConfig) -> Option<Self> {
        if !db.uses_tunnel() {
            return None;
        }

        let remote_port = db.tunnel_remote_port.unwrap_or_default();
        let ssh_password = db.ssh_password.clone().filter(|p| !p.is_empty());

        // Without any credentials fall back to the user's default key
        let ssh_key_file = match db.ssh_key_file {
            Some(ref path) => Some(crate::config::expand_tilde(path)),
            None if ssh_password.is_none() => {
                dirs::home_dir().map(|home| home.join(".ssh").join("id_rsa"))
            }
            None => None,
        };

        Some(Self {
            ssh_host: db.ssh_host.clone().unwrap_or_default(),
            ssh_port: db.ssh_port.unwrap_or(DEFAULT_SSH_PORT),
            ssh_user: db
                .ssh_user
                .clone()
                .filter(|u| !u.is_empty())
                .unwrap_or_else(|| DEFAULT_SSH_USER.to_string()),
            ssh_password,
            ssh_key_file,
            db_host: db
                .tunnel_db_host
                .clone()
                .filter(|h| !h.is_empty())
                .unwrap_or_else(|| DEFAULT_TUNNEL_DB_HOST.to_string()),
            remote_port,
            local_port: db.tunnel_local_port.unwrap_or(remote_port),
        })
    }
}

/// A secure forwarding session
#[async_trait]
pub trait Tunnel: Send + Sync {
    /// Connect and forward until `shutdown` is cancelled
    ///
    /// Implementations report [`TunnelState::Started`] once the local port
    /// accepts connections. Returning an error before that fails the
    /// controller's wait.
    async fn serve(
        &self,
        reporter: StateReporter,
        shutdown: CancellationToken,
    ) -> Result<(), TunnelError>;
}

/// Creates tunnels from settings
pub trait TunnelFactory: Send + Sync {
    fn create(&self, settings: &TunnelSettings) -> Arc<dyn Tunnel>;
}

type ReadySender = oneshot::Sender<Result<(), TunnelError>>;

/// State-change callback handed to a running tunnel
#[derive(Clone)]
pub struct StateReporter {
    state: Arc<watch::Sender<TunnelState>>,
    ready: Arc<Mutex<Option<ReadySender>>>,
}

impl StateReporter {
    /// Record a state transition; `Started` resolves the ready signal
    pub fn report(&self, state: TunnelState) {
        match state {
            TunnelState::Starting => info!("Tunneling is Starting"),
            TunnelState::Started => info!("Tunneling is Started"),
            TunnelState::Stopping => info!("Tunneling is Stopping"),
            TunnelState::Stopped => info!("Tunneling is Stopped"),
            TunnelState::Failed => error!("Tunneling failed"),
            TunnelState::Idle => {}
        }

        self.state.send_replace(state);

        if state == TunnelState::Started {
            self.resolve_ready(Ok(()));
        }
    }

    fn current(&self) -> TunnelState {
        *self.state.borrow()
    }

    /// Resolve the ready signal if nobody has yet
    fn resolve_ready(&self, result: Result<(), TunnelError>) {
        let sender = self.ready.lock().ok().and_then(|mut slot| slot.take());
        if let Some(tx) = sender {
            // The controller may have given up waiting
            let _ = tx.send(result);
        }
    }
}

/// Controller side of an open tunnel
pub struct TunnelHandle {
    ready: Option<oneshot::Receiver<Result<(), TunnelError>>>,
    stop: oneshot::Sender<()>,
    state: watch::Receiver<TunnelState>,
}

impl TunnelHandle {
    /// Current lifecycle state
    pub fn state(&self) -> TunnelState {
        *self.state.borrow()
    }

    /// Subscribe to state changes
    pub fn watch_state(&self) -> watch::Receiver<TunnelState> {
        self.state.clone()
    }

    /// Ask the tunnel to stop. Consumes the handle so the signal is sent once.
    pub fn close(self) {
        if self.stop.send(()).is_err() {
            debug!("Tunnel stop watcher already gone");
        }
    }
}

/// Opens tunnels on a runtime and waits for them to come up
#[derive(Clone)]
pub struct TunnelManager {
    runtime: Handle,
    factory: Arc<dyn TunnelFactory>,
    ready_timeout: Duration,
}

impl TunnelManager {
    pub fn new(runtime: Handle, factory: Arc<dyn TunnelFactory>, ready_timeout: Duration) -> Self {
        Self {
            runtime,
            factory,
            ready_timeout,
        }
    }

    /// Launch the connect task and the stop watcher for a tunnel
    pub fn open(&self, settings: &TunnelSettings) -> TunnelHandle {
        info!(
            "Opening tunnel localhost:{} -> {}:{} via {}@{}:{}",
            settings.local_port,
            settings.db_host,
            settings.remote_port,
            settings.ssh_user,
            settings.ssh_host,
            settings.ssh_port
        );

        let tunnel = self.factory.create(settings);

        let (ready_tx, ready_rx) = oneshot::channel();
        let (stop_tx, stop_rx) = oneshot::channel::<()>();
        let (state_tx, state_rx) = watch::channel(TunnelState::Idle);
        let shutdown = CancellationToken::new();

        let reporter = StateReporter {
            state: Arc::new(state_tx),
            ready: Arc::new(Mutex::new(Some(ready_tx))),
        };

        // Connect/forward task
        let connect_reporter = reporter.clone();
        let connect_shutdown = shutdown.clone();
        self.runtime.spawn(
            async move {
                connect_reporter.report(TunnelState::Starting);
                match tunnel.serve(connect_reporter.clone(), connect_shutdown).await {
                    Ok(()) => {
                        connect_reporter.report(TunnelState::Stopped);
                        connect_reporter.resolve_ready(Err(TunnelError::Closed));
                    }
                    Err(e) => {
                        error!("error tunneling: {}", e);
                        connect_reporter.report(TunnelState::Failed);
                        connect_reporter.resolve_ready(Err(e));
                    }
                }
            }
            .in_current_span(),
        );

        // Stop watcher; a dropped handle counts as a stop request
        self.runtime.spawn(
            async move {
                let _ = stop_rx.await;
                info!("Tunneling stop requested");
                if matches!(
                    reporter.current(),
                    TunnelState::Starting | TunnelState::Started
                ) {
                    reporter.report(TunnelState::Stopping);
                }
                shutdown.cancel();
            }
            .in_current_span(),
        );

        TunnelHandle {
            ready: Some(ready_rx),
            stop: stop_tx,
            state: state_rx,
        }
    }

    /// Block until the tunnel is forwarding, failed, or the timeout passed
    pub fn wait_ready(&self, handle: &mut TunnelHandle) -> Result<(), TunnelError> {
        let ready = handle.ready.take().ok_or(TunnelError::Closed)?;
        let timeout = self.ready_timeout;

        self.runtime.block_on(async move {
            match tokio::time::timeout(timeout, ready).await {
                Ok(Ok(result)) => result,
                Ok(Err(_)) => Err(TunnelError::Closed),
                Err(_) => Err(TunnelError::ReadyTimeout(timeout)),
            }
        })
    }
}

/// Scriptable tunnels for tests
/// Available for use in external test crates
pub mod mock {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// How a mock tunnel behaves once started
    #[derive(Debug, Clone)]
    pub enum MockTunnelBehavior {
        /// Report `Started` and forward until stopped
        Ready,
        /// Fail before reaching `Started`
        FailConnect(String),
        /// Never become ready; exit only when stopped
        NeverReady,
    }

    /// Shared record of what the mock tunnels did
    #[derive(Debug, Clone, Default)]
    pub struct TunnelLog {
        events: Arc<Mutex<Vec<String>>>,
        shutdowns: Arc<AtomicUsize>,
    }

    impl TunnelLog {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn push(&self, event: &str) {
            self.events.lock().unwrap().push(event.to_string());
        }

        pub fn events(&self) -> Vec<String> {
            self.events.lock().unwrap().clone()
        }

        /// Number of tunnels that observed a shutdown request
        pub fn shutdowns(&self) -> usize {
            self.shutdowns.load(Ordering::SeqCst)
        }

        /// Poll until `count` shutdowns were observed or `timeout` passes
        pub fn wait_for_shutdowns(&self, count: usize, timeout: Duration) -> bool {
            let deadline = std::time::Instant::now() + timeout;
            while std::time::Instant::now() < deadline {
                if self.shutdowns() >= count {
                    return true;
                }
                std::thread::sleep(Duration::from_millis(5));
            }
            self.shutdowns() >= count
        }
    }

    pub struct MockTunnel {
        behavior: MockTunnelBehavior,
        log: TunnelLog,
    }

    #[async_trait]
    impl Tunnel for MockTunnel {
        async fn serve(
            &self,
            reporter: StateReporter,
            shutdown: CancellationToken,
        ) -> Result<(), TunnelError> {
            match self.behavior {
                MockTunnelBehavior::Ready => {
                    self.log.push("tunnel:started");
                    reporter.report(TunnelState::Started);
                }
                MockTunnelBehavior::FailConnect(ref reason) => {
                    self.log.push("tunnel:failed");
                    return Err(TunnelError::Connect(reason.clone()));
                }
                MockTunnelBehavior::NeverReady => {
                    self.log.push("tunnel:stalled");
                }
            }

            shutdown.cancelled().await;
            self.log.push("tunnel:shutdown");
            self.log.shutdowns.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    /// Factory handing out mock tunnels and recording their settings
    #[derive(Clone)]
    pub struct MockTunnelFactory {
        behavior: MockTunnelBehavior,
        log: TunnelLog,
        created: Arc<Mutex<Vec<TunnelSettings>>>,
    }

    impl MockTunnelFactory {
        pub fn new(behavior: MockTunnelBehavior, log: TunnelLog) -> Self {
            Self {
                behavior,
                log,
                created: Arc::new(Mutex::new(Vec::new())),
            }
        }

        /// Settings of every tunnel created so far
        pub fn created(&self) -> Vec<TunnelSettings> {
            self.created.lock().unwrap().clone()
        }
    }

    impl TunnelFactory for MockTunnelFactory {
        fn create(&self, settings: &TunnelSettings) -> Arc<dyn Tunnel> {
            self.created.lock().unwrap().push(settings.clone());
            Arc::new(MockTunnel {
                behavior: self.behavior.clone(),
                log: self.log.clone(),
            })
        }
    }
}
