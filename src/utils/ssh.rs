//! SSH local port forwarding on top of russh
//!
//! Listens on `127.0.0.1:<local_port>` and forwards every accepted
//! connection through a `direct-tcpip` channel to `db_host:remote_port`
//! as seen from the SSH server.

use crate::managers::tunnel::{
    StateReporter, Tunnel, TunnelError, TunnelFactory, TunnelSettings, TunnelState,
};
use anyhow::Result;
use async_trait::async_trait;
use russh::client::{self, Config, Handle};
use russh::Disconnect;
use russh_keys::key::PublicKey;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::{TcpListener, TcpStream};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn, Instrument};

/// Builds [`SshTunnel`]s
#[derive(Debug, Clone, Default)]
pub struct SshTunnelFactory;

impl TunnelFactory for SshTunnelFactory {
    fn create(&self, settings: &TunnelSettings) -> Arc<dyn Tunnel> {
        Arc::new(SshTunnel::new(settings.clone()))
    }
}

pub struct SshTunnel {
    settings: TunnelSettings,
}

impl SshTunnel {
    pub fn new(settings: TunnelSettings) -> Self {
        Self { settings }
    }

    /// Open and authenticate the SSH session
    async fn connect(&self) -> Result<Handle<ClientHandler>, TunnelError> {
        let settings = &self.settings;
        let config = Arc::new(Config::default());
        let handler = ClientHandler {
            host: settings.ssh_host.clone(),
        };

        debug!("Connecting to {}:{}", settings.ssh_host, settings.ssh_port);
        let mut session = client::connect(
            config,
            (settings.ssh_host.as_str(), settings.ssh_port),
            handler,
        )
        .await
        .map_err(|e| {
            TunnelError::Connect(format!(
                "{}:{}: {}",
                settings.ssh_host, settings.ssh_port, e
            ))
        })?;

        let mut authenticated = false;

        if let Some(ref key_path) = settings.ssh_key_file {
            match russh_keys::load_secret_key(key_path, None) {
                Ok(key) => {
                    debug!("Authenticating as '{}' with key {:?}", settings.ssh_user, key_path);
                    authenticated = session
                        .authenticate_publickey(&settings.ssh_user, Arc::new(key))
                        .await
                        .map_err(|e| TunnelError::Connect(format!("authentication error: {}", e)))?;
                }
                // A password may still get us in
                Err(e) if settings.ssh_password.is_some() => {
                    warn!("Cannot load SSH key {:?}: {}", key_path, e);
                }
                Err(e) => {
                    return Err(TunnelError::KeyFile {
                        path: key_path.display().to_string(),
                        message: e.to_string(),
                    });
                }
            }
        }

        if !authenticated {
            if let Some(ref password) = settings.ssh_password {
                debug!("Authenticating as '{}' with password", settings.ssh_user);
                authenticated = session
                    .authenticate_password(&settings.ssh_user, password)
                    .await
                    .map_err(|e| TunnelError::Connect(format!("authentication error: {}", e)))?;
            }
        }

        if !authenticated {
            return Err(TunnelError::AuthRejected(settings.ssh_user.clone()));
        }

        Ok(session)
    }
}

#[async_trait]
impl Tunnel for SshTunnel {
    async fn serve(
        &self,
        reporter: StateReporter,
        shutdown: CancellationToken,
    ) -> Result<(), TunnelError> {
        let session = tokio::select! {
            session = self.connect() => Arc::new(session?),
            _ = shutdown.cancelled() => return Ok(()),
        };

        let local_port = self.settings.local_port;
        let listener = TcpListener::bind(("127.0.0.1", local_port))
            .await
            .map_err(|e| {
                TunnelError::Connect(format!("cannot bind 127.0.0.1:{}: {}", local_port, e))
            })?;

        reporter.report(TunnelState::Started);

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                accepted = listener.accept() => {
                    let (stream, peer) = match accepted {
                        Ok(conn) => conn,
                        Err(e) => {
                            warn!("Tunnel accept failed: {}", e);
                            continue;
                        }
                    };

                    let session = Arc::clone(&session);
                    let settings = self.settings.clone();
                    tokio::spawn(
                        async move {
                            if let Err(e) = forward(&session, stream, peer, &settings).await {
                                warn!("Tunneled connection from {} failed: {}", peer, e);
                            }
                        }
                        .in_current_span(),
                    );
                }
            }
        }

        if let Err(e) = session
            .disconnect(Disconnect::ByApplication, "closing", "en")
            .await
        {
            debug!("SSH disconnect failed: {}", e);
        }

        Ok(())
    }
}

/// Pipe one local connection through a direct-tcpip channel
async fn forward(
    session: &Handle<ClientHandler>,
    mut stream: TcpStream,
    peer: SocketAddr,
    settings: &TunnelSettings,
) -> Result<()> {
    info!(
        "tunneling {} -> {}:{}",
        peer, settings.db_host, settings.remote_port
    );

    let channel = session
        .channel_open_direct_tcpip(
            settings.db_host.clone(),
            u32::from(settings.remote_port),
            peer.ip().to_string(),
            u32::from(peer.port()),
        )
        .await?;

    let mut remote = Box::pin(channel.into_stream());
    let (sent, received) = tokio::io::copy_bidirectional(&mut stream, &mut remote).await?;
    debug!("tunneled connection from {} closed ({} bytes out, {} bytes in)", peer, sent, received);

    Ok(())
}

/// SSH client handler
struct ClientHandler {
    host: String,
}

#[async_trait]
impl client::Handler for ClientHandler {
    type Error = russh::Error;

    /// Host keys are not pinned; the fingerprint is logged for auditing
    async fn check_server_key(
        &mut self,
        server_public_key: &PublicKey,
    ) -> Result<bool, Self::Error> {
        debug!(
            "Server host key for {}: {}",
            self.host,
            server_public_key.fingerprint()
        );
        Ok(true)
    }
}
