//! Session ownership and server lifecycle control
//!
//! The connection manager owns the single `Session` of a dashboard: which
//! endpoint it talks to, whether the handshake completed, and the last known
//! lifecycle state of the server. Outgoing packets are queued on the outbox
//! channel; the network task drains it.

use crate::dispatcher::{CommandDispatcher, RequestKind};
use crate::error::{DashboardError, Result};
use crate::log_buffer::LogBuffer;
use log::{debug, info, warn};
use shared::{LogLevel, Packet, ServerStatus, DEFAULT_PORT, PROTOCOL_VERSION};
use std::net::{SocketAddr, ToSocketAddrs};
use std::time::{Duration, Instant};
use tokio::sync::mpsc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
    Error,
}

/// Messages sent from the dashboard core to the network task
#[derive(Debug, Clone, PartialEq)]
pub enum OutboundMessage {
    SendPacket { packet: Packet, addr: SocketAddr },
}

#[derive(Debug, Clone)]
pub struct Session {
    pub endpoint: String,
    pub addr: Option<SocketAddr>,
    pub connection: ConnectionState,
    pub status: ServerStatus,
    pub server_version: Option<String>,
    pub port: Option<u16>,
}

pub struct ConnectionManager {
    session: Session,
    outbox: mpsc::UnboundedSender<OutboundMessage>,
    connect_timeout: Duration,
    connect_deadline: Option<Instant>,
}

impl ConnectionManager {
    pub fn new(
        endpoint: impl Into<String>,
        connect_timeout: Duration,
        outbox: mpsc::UnboundedSender<OutboundMessage>,
    ) -> Self {
        Self {
            session: Session {
                endpoint: endpoint.into(),
                addr: None,
                connection: ConnectionState::Disconnected,
                status: ServerStatus::Offline,
                server_version: None,
                port: None,
            },
            outbox,
            connect_timeout,
            connect_deadline: None,
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn is_connected(&self) -> bool {
        self.session.connection == ConnectionState::Connected
    }

    pub fn status(&self) -> ServerStatus {
        self.session.status
    }

    /// Queues a packet for the current endpoint
    pub fn send(&self, packet: Packet) -> Result<()> {
        let addr = self
            .session
            .addr
            .ok_or_else(|| DashboardError::Connection("no endpoint selected".to_string()))?;

        self.outbox
            .send(OutboundMessage::SendPacket { packet, addr })
            .map_err(|_| DashboardError::Connection("network task is not running".to_string()))
    }

    /// Begins the handshake with `endpoint`.
    ///
    /// Resolution failures are reported immediately and leave the session in
    /// the error state. Completion arrives later through `handle_connected`;
    /// a missing reply is detected by `check_connect_timeout`. There is no
    /// automatic retry.
    pub fn connect(
        &mut self,
        endpoint: &str,
        log: &mut LogBuffer,
        now: Instant,
    ) -> Result<&Session> {
        let endpoint = endpoint.trim();

        if self.session.connection == ConnectionState::Connected {
            let _ = self.send(Packet::Disconnect);
        }

        self.session.endpoint = endpoint.to_string();
        self.session.addr = None;
        self.session.server_version = None;
        self.session.port = None;

        let addr = match resolve_endpoint(endpoint) {
            Ok(addr) => addr,
            Err(e) => {
                self.fail(format!("Failed to connect to {}: {}", endpoint, e), log);
                return Err(e);
            }
        };

        self.session.addr = Some(addr);
        self.session.connection = ConnectionState::Connecting;
        self.connect_deadline = Some(now + self.connect_timeout);

        if let Err(e) = self.send(Packet::Connect {
            client_version: PROTOCOL_VERSION,
        }) {
            self.fail(format!("Failed to connect to {}: {}", endpoint, e), log);
            return Err(e);
        }

        info!("Connecting to {} ({})", endpoint, addr);
        log.append(LogLevel::Info, format!("Connecting to {}...", endpoint));
        Ok(&self.session)
    }

    /// Applies the server's handshake reply. Returns false if no handshake was pending.
    pub fn handle_connected(
        &mut self,
        server_version: String,
        port: u16,
        status: ServerStatus,
        log: &mut LogBuffer,
    ) -> bool {
        if self.session.connection != ConnectionState::Connecting {
            debug!("Ignoring handshake reply while {:?}", self.session.connection);
            return false;
        }

        self.session.connection = ConnectionState::Connected;
        self.session.status = status;
        self.session.port = Some(port);
        self.connect_deadline = None;

        log.append(LogLevel::Info, "Dashboard connected to Nukkit server");
        log.append(LogLevel::Info, format!("Server version: {}", server_version));
        self.session.server_version = Some(server_version);
        true
    }

    /// The server closed the session or refused the handshake
    pub fn handle_disconnected(&mut self, reason: &str, log: &mut LogBuffer) {
        match self.session.connection {
            ConnectionState::Connecting => {
                self.fail(format!("Connection refused: {}", reason), log);
            }
            ConnectionState::Connected => {
                warn!("Server closed the session: {}", reason);
                self.session.connection = ConnectionState::Disconnected;
                self.session.status = ServerStatus::Offline;
                log.append(LogLevel::Warn, format!("Disconnected from server: {}", reason));
            }
            _ => debug!("Ignoring disconnect while not connected: {}", reason),
        }
    }

    pub fn disconnect(&mut self, log: &mut LogBuffer) {
        if matches!(
            self.session.connection,
            ConnectionState::Connected | ConnectionState::Connecting
        ) {
            let _ = self.send(Packet::Disconnect);
            log.append(
                LogLevel::Info,
                format!("Disconnected from {}", self.session.endpoint),
            );
        }
        self.session.connection = ConnectionState::Disconnected;
        self.session.status = ServerStatus::Offline;
        self.connect_deadline = None;
    }

    /// Moves a stalled handshake into the error state
    pub fn check_connect_timeout(
        &mut self,
        now: Instant,
        log: &mut LogBuffer,
    ) -> Option<DashboardError> {
        let deadline = self.connect_deadline?;
        if self.session.connection != ConnectionState::Connecting || now < deadline {
            return None;
        }

        let message = format!("Connection to {} timed out", self.session.endpoint);
        self.fail(message.clone(), log);
        Some(DashboardError::Connection(message))
    }

    /// Requests a server start.
    ///
    /// Requires a connected session. Rejected without any state change if the
    /// server is already starting or online.
    pub fn start_server(
        &mut self,
        dispatcher: &mut CommandDispatcher,
        now: Instant,
    ) -> Result<u64> {
        self.require_connected()?;
        let previous = self.session.status;
        if !previous.accepts_start() {
            return Err(DashboardError::LifecycleConflict {
                action: "start",
                status: previous,
            });
        }

        let request_id =
            dispatcher.submit(RequestKind::StartServer { previous }, &*self, now, |id| {
                Packet::StartServer { request_id: id }
            })?;
        self.session.status = ServerStatus::Starting;
        Ok(request_id)
    }

    /// Requests a server stop.
    ///
    /// Requires a connected session. Rejected without any state change if the
    /// server is already stopping or offline.
    pub fn stop_server(
        &mut self,
        dispatcher: &mut CommandDispatcher,
        now: Instant,
    ) -> Result<u64> {
        self.require_connected()?;
        let previous = self.session.status;
        if !previous.accepts_stop() {
            return Err(DashboardError::LifecycleConflict {
                action: "stop",
                status: previous,
            });
        }

        let request_id =
            dispatcher.submit(RequestKind::StopServer { previous }, &*self, now, |id| {
                Packet::StopServer { request_id: id }
            })?;
        self.session.status = ServerStatus::Stopping;
        Ok(request_id)
    }

    /// Applies a lifecycle state reported by the server
    pub fn apply_status(&mut self, status: ServerStatus, log: &mut LogBuffer) {
        if self.session.status == status {
            return;
        }
        self.session.status = status;

        let message = match status {
            ServerStatus::Online => format!(
                "Server started successfully on port {}",
                self.session.port.unwrap_or(DEFAULT_PORT)
            ),
            ServerStatus::Offline => "Server stopped".to_string(),
            ServerStatus::Starting => "Server is starting".to_string(),
            ServerStatus::Stopping => "Server is stopping".to_string(),
        };
        log.append(LogLevel::Info, message);
    }

    /// Rolls back an optimistic lifecycle change after a rejected or expired request.
    ///
    /// Ignored once the session is gone; a lost session always reads offline.
    pub fn restore_status(&mut self, previous: ServerStatus) {
        if self.is_connected() {
            self.session.status = previous;
        }
    }

    fn require_connected(&self) -> Result<()> {
        if self.is_connected() {
            Ok(())
        } else {
            Err(DashboardError::Connection(
                "not connected to a server".to_string(),
            ))
        }
    }

    fn fail(&mut self, message: String, log: &mut LogBuffer) {
        warn!("{}", message);
        self.session.connection = ConnectionState::Error;
        self.connect_deadline = None;
        log.append(LogLevel::Error, message);
    }
}

/// Resolves `host:port`, bare `host`, or URL-like `scheme://host:port/path`
pub fn resolve_endpoint(endpoint: &str) -> Result<SocketAddr> {
    let endpoint = endpoint.trim();
    if endpoint.is_empty() {
        return Err(DashboardError::Connection("endpoint is empty".to_string()));
    }

    let without_scheme = endpoint
        .split_once("://")
        .map(|(_, rest)| rest)
        .unwrap_or(endpoint);
    let authority = without_scheme.split('/').next().unwrap_or_default();
    if authority.is_empty() {
        return Err(DashboardError::Connection(format!(
            "no host in endpoint '{}'",
            endpoint
        )));
    }

    let has_port = authority
        .rsplit_once(':')
        .map(|(_, port)| port.parse::<u16>().is_ok())
        .unwrap_or(false);
    let target = if has_port {
        authority.to_string()
    } else {
        format!("{}:{}", authority, DEFAULT_PORT)
    };

    target
        .to_socket_addrs()
        .map_err(|e| DashboardError::Connection(format!("cannot resolve '{}': {}", target, e)))?
        .next()
        .ok_or_else(|| DashboardError::Connection(format!("no address for '{}'", target)))
}
