//! The dashboard session object
//!
//! `Dashboard` is constructed once and owns every piece of canonical state:
//! the connection, pending requests, console log, property editor, worlds,
//! command catalog, game settings and history. It performs no I/O itself.
//! Outgoing packets are queued on the outbox channel, incoming packets are
//! fed to `handle_packet`, and `poll` drives timers (simulated replies,
//! request deadlines, heartbeats). User-facing outcomes are emitted as
//! `Notification`s; every error produces exactly one error notification.

use crate::catalog::CommandCatalog;
use crate::config::DashboardConfig;
use crate::connection::{ConnectionManager, ConnectionState, OutboundMessage, Session};
use crate::dispatcher::{CommandDispatcher, PendingRequest, RequestKind};
use crate::error::{DashboardError, Result};
use crate::history::CommandHistory;
use crate::log_buffer::LogBuffer;
use crate::properties::{PropertyStore, PropertyValue};
use crate::settings::{self, GameMode, GameSettings};
use crate::worlds::{WorldConfig, WorldRecord, WorldRegistry};
use log::{debug, error, info};
use shared::{LogLevel, Packet};
use std::collections::BTreeMap;
use std::time::Instant;
use tokio::sync::mpsc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Info,
    Error,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Notification {
    pub title: String,
    pub description: String,
    pub severity: Severity,
}

impl Notification {
    pub fn info(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
            severity: Severity::Info,
        }
    }

    pub fn error(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
            severity: Severity::Error,
        }
    }

    fn from_error(err: &DashboardError) -> Self {
        let title = match err {
            DashboardError::Connection(_) => "Connection Error",
            DashboardError::LifecycleConflict { .. } => "Lifecycle Conflict",
            DashboardError::DispatchRejected => "Command Rejected",
            DashboardError::PropertyParse { .. } => "Import Failed",
            DashboardError::InvalidProperty { .. } => "Invalid Property",
            DashboardError::WorldConflict(_) => "World Conflict",
            DashboardError::Unavailable(_) => "Command Unavailable",
        };
        Self::error(title, err.to_string())
    }
}

pub struct Dashboard {
    config: DashboardConfig,
    link: ConnectionManager,
    dispatcher: CommandDispatcher,
    log: LogBuffer,
    properties: PropertyStore,
    worlds: WorldRegistry,
    catalog: CommandCatalog,
    settings: GameSettings,
    history: CommandHistory,
    notifications: mpsc::UnboundedSender<Notification>,
    last_heartbeat: Option<Instant>,
}

impl Dashboard {
    pub fn new(
        config: DashboardConfig,
        outbox: mpsc::UnboundedSender<OutboundMessage>,
        notifications: mpsc::UnboundedSender<Notification>,
    ) -> Self {
        Self {
            link: ConnectionManager::new(config.endpoint.clone(), config.connect_timeout, outbox),
            dispatcher: CommandDispatcher::new(config.command_timeout, config.offline_ack_delay),
            log: LogBuffer::new(config.log_capacity),
            properties: PropertyStore::default(),
            worlds: WorldRegistry::default(),
            catalog: CommandCatalog::new(),
            settings: GameSettings::default(),
            history: CommandHistory::new(config.history_limit),
            notifications,
            last_heartbeat: None,
            config,
        }
    }

    pub fn config(&self) -> &DashboardConfig {
        &self.config
    }

    pub fn session(&self) -> &Session {
        self.link.session()
    }

    pub fn is_connected(&self) -> bool {
        self.link.is_connected()
    }

    pub fn log(&self) -> &LogBuffer {
        &self.log
    }

    pub fn properties(&self) -> &PropertyStore {
        &self.properties
    }

    pub fn worlds(&self) -> &WorldRegistry {
        &self.worlds
    }

    pub fn catalog(&self) -> &CommandCatalog {
        &self.catalog
    }

    pub fn settings(&self) -> &GameSettings {
        &self.settings
    }

    pub fn history(&self) -> &CommandHistory {
        &self.history
    }

    pub fn history_mut(&mut self) -> &mut CommandHistory {
        &mut self.history
    }

    pub fn pending_requests(&self) -> usize {
        self.dispatcher.pending()
    }

    // Session

    /// Starts the handshake with `endpoint`, or the configured endpoint
    pub fn connect(&mut self, endpoint: Option<&str>) -> Result<Session> {
        let endpoint = endpoint
            .map(str::to_string)
            .unwrap_or_else(|| self.session().endpoint.clone());

        if self.link.is_connected() {
            self.release_remote_requests();
        }

        let result = self
            .link
            .connect(&endpoint, &mut self.log, Instant::now())
            .map(|session| session.clone());
        self.last_heartbeat = None;
        self.report(result)
    }

    pub fn disconnect(&mut self) {
        let was_active = matches!(
            self.session().connection,
            ConnectionState::Connected | ConnectionState::Connecting
        );
        self.link.disconnect(&mut self.log);
        self.release_remote_requests();

        if was_active {
            let endpoint = self.session().endpoint.clone();
            self.notify(Notification::info(
                "Disconnected",
                format!("Disconnected from {}", endpoint),
            ));
        }
    }

    pub fn start_server(&mut self) -> Result<u64> {
        let result = self.link.start_server(&mut self.dispatcher, Instant::now());
        self.report(result)
    }

    pub fn stop_server(&mut self) -> Result<u64> {
        let result = self.link.stop_server(&mut self.dispatcher, Instant::now());
        self.report(result)
    }

    // Console

    /// Echoes and dispatches a command; its result is appended later
    pub fn execute(&mut self, text: &str) -> Result<u64> {
        self.history.push(text);
        let result = self
            .dispatcher
            .execute(text, &self.link, &mut self.log, Instant::now());
        self.report(result)
    }

    /// Dispatches the syntax template of a catalog command
    pub fn run_catalog_command(&mut self, name: &str) -> Result<u64> {
        match self.catalog.find(name) {
            Some(command) => self.execute(command.syntax),
            None => self.report(Err(DashboardError::Unavailable(format!(
                "no command named '{}'",
                name
            )))),
        }
    }

    pub fn toggle_favorite(&mut self, name: &str) -> bool {
        self.catalog.toggle_favorite(name)
    }

    pub fn clear_logs(&mut self) {
        self.log.clear();
        self.notify(Notification::info(
            "Logs Cleared",
            "Console logs have been cleared",
        ));
    }

    pub fn export_logs(&self) -> String {
        self.log.export()
    }

    // Game settings

    pub fn change_game_mode(&mut self, mode: GameMode) -> Result<u64> {
        let command = self.settings.change_mode(mode);
        self.notify(Notification::info(
            "Game Mode Changed",
            format!("Game mode set to {}", mode),
        ));
        self.execute(&command)
    }

    pub fn set_cheats(&mut self, enabled: bool) {
        self.settings.cheats = enabled;
        let notification = if enabled {
            Notification::info("Cheats Enabled", "Cheats are now enabled on the server")
        } else {
            Notification::info("Cheats Disabled", "Cheats have been disabled")
        };
        self.notify(notification);
    }

    pub fn set_target(&mut self, target: settings::TargetSelector) {
        self.settings.target = target;
    }

    /// Dispatches a quick command; all but world commands need cheats enabled
    pub fn run_quick_command(&mut self, name: &str) -> Result<u64> {
        let quick = match settings::quick_command(name) {
            Some(quick) => quick,
            None => {
                return self.report(Err(DashboardError::Unavailable(format!(
                    "no quick command named '{}'",
                    name
                ))))
            }
        };
        if !self.settings.is_available(quick) {
            return self.report(Err(DashboardError::Unavailable(format!(
                "'{}' requires cheats to be enabled",
                quick.name
            ))));
        }
        self.execute(quick.command)
    }

    pub fn set_difficulty(&mut self, level: &str) -> Result<u64> {
        match settings::difficulty_command(level) {
            Some(command) => self.execute(&command),
            None => self.report(Err(DashboardError::Unavailable(format!(
                "unknown difficulty '{}'",
                level
            )))),
        }
    }

    pub fn list_players(&mut self) -> Result<u64> {
        self.execute(settings::LIST_PLAYERS)
    }

    pub fn show_whitelist(&mut self) -> Result<u64> {
        self.execute(settings::SHOW_WHITELIST)
    }

    // Worlds

    /// Switches to `name` and teleports players there.
    ///
    /// Loading the active world does nothing. While connected the switch is
    /// applied once the server accepts it; offline it is applied at once.
    pub fn load_world(&mut self, name: &str) -> Result<()> {
        let name = name.trim();
        match self.worlds.get(name) {
            None => {
                return self.report(Err(DashboardError::WorldConflict(format!(
                    "world '{}' does not exist",
                    name
                ))))
            }
            Some(world) if world.active => {
                debug!("World {} is already active", name);
                return Ok(());
            }
            Some(_) => {}
        }

        self.log.append(LogLevel::Info, format!("Loading world: {}", name));

        if self.link.is_connected() {
            let request = self.dispatcher.submit(
                RequestKind::LoadWorld {
                    name: name.to_string(),
                },
                &self.link,
                Instant::now(),
                |id| Packet::LoadWorld {
                    request_id: id,
                    name: name.to_string(),
                },
            );
            self.report(request)?;
        } else {
            let activated = self.worlds.activate(name);
            self.report(activated)?;
            self.notify_world_changed(name);
        }

        // Teleport failures are reported by the command itself
        let _ = self.execute(&format!("/mv tp {}", name));
        Ok(())
    }

    /// Registers a new world, provisionally while the server confirms it
    pub fn create_world(&mut self, config: WorldConfig) -> Result<WorldRecord> {
        let created = self.worlds.create(&config);
        let record = self.report(created)?;

        if self.link.is_connected() {
            let request = self.dispatcher.submit(
                RequestKind::CreateWorld {
                    name: record.name.clone(),
                    kind: record.kind,
                },
                &self.link,
                Instant::now(),
                |id| Packet::CreateWorld {
                    request_id: id,
                    name: record.name.clone(),
                    kind: record.kind,
                    seed: config.seed.clone().filter(|s| !s.trim().is_empty()),
                    generate_structures: config.generate_structures,
                },
            );
            if let Err(e) = request {
                self.worlds.remove(&record.name);
                return self.report(Err(e));
            }
        } else {
            self.world_created(&record.name, record.kind);
        }

        Ok(record)
    }

    // Properties

    pub fn set_property(&mut self, key: &str, raw: &str) -> PropertyValue {
        self.properties.set_raw(key, raw)
    }

    /// Commits pending edits and sends them to the server.
    ///
    /// Returns the number of changed keys.
    pub fn save_properties(&mut self) -> Result<usize> {
        let changed = self.properties.diff().len();
        let previous = self.properties.committed().clone();
        let committed = self.properties.commit();
        let snapshot = self.report(committed)?;

        if self.link.is_connected() {
            let request = self.dispatcher.submit(
                RequestKind::SaveProperties {
                    changed,
                    previous: previous.clone(),
                },
                &self.link,
                Instant::now(),
                |id| Packet::SaveProperties {
                    request_id: id,
                    properties: snapshot,
                },
            );
            if let Err(e) = request {
                self.properties.restore_committed(previous);
                return self.report(Err(e));
            }
        } else {
            self.properties_saved();
        }
        Ok(changed)
    }

    pub fn reset_properties(&mut self) {
        self.properties.reset();
    }

    pub fn import_properties(&mut self, text: &str) -> Result<BTreeMap<String, String>> {
        let imported = self.properties.import_raw(text);
        let mapping = self.report(imported)?;
        self.notify(Notification::info(
            "Config Imported",
            format!("Loaded {} properties", mapping.len()),
        ));
        Ok(mapping)
    }

    pub fn export_properties(&self) -> String {
        self.properties.export_raw()
    }

    // Events

    /// Applies one packet received from the server
    pub fn handle_packet(&mut self, packet: Packet, now: Instant) {
        match packet {
            Packet::Connected {
                server_version,
                port,
                status,
                worlds,
                properties,
            } => {
                if self
                    .link
                    .handle_connected(server_version, port, status, &mut self.log)
                {
                    self.worlds.replace_all(&worlds);
                    if !properties.is_empty() {
                        self.properties.load_committed(properties);
                    }
                    self.last_heartbeat = Some(now);
                    let endpoint = self.session().endpoint.clone();
                    self.notify(Notification::info(
                        "Connected to Server",
                        format!("Successfully connected to {}", endpoint),
                    ));
                }
            }

            Packet::Disconnected { reason } => {
                let state = self.session().connection;
                self.link.handle_disconnected(&reason, &mut self.log);
                match state {
                    ConnectionState::Connecting => self.notify(Notification::from_error(
                        &DashboardError::Connection(format!("Connection refused: {}", reason)),
                    )),
                    ConnectionState::Connected => {
                        self.release_remote_requests();
                        self.notify(Notification::error("Disconnected", reason));
                    }
                    _ => {}
                }
            }

            Packet::StatusChanged { status } => {
                self.link.apply_status(status, &mut self.log);
            }

            Packet::Log { level, message } => {
                self.log.append(level, message);
            }

            Packet::CommandResult {
                request_id,
                level,
                message,
            } => {
                self.dispatcher
                    .handle_result(request_id, level, message, &mut self.log);
            }

            Packet::Accepted { request_id } => {
                if let Some(pending) = self.dispatcher.complete(request_id) {
                    self.request_accepted(pending);
                }
            }

            Packet::Rejected { request_id, reason } => {
                if let Some(pending) = self.dispatcher.complete(request_id) {
                    self.request_failed(pending, &reason);
                }
            }

            other => debug!("Ignoring unexpected packet from server: {:?}", other),
        }
    }

    /// Drives timers: connect timeout, simulated replies, request deadlines
    /// and heartbeats
    pub fn poll(&mut self, now: Instant) {
        if let Some(err) = self.link.check_connect_timeout(now, &mut self.log) {
            self.notify(Notification::from_error(&err));
        }

        for expired in self.dispatcher.poll(now, &mut self.log) {
            self.request_failed(expired, "no response from server");
        }

        if self.link.is_connected() {
            let due = self
                .last_heartbeat
                .map(|last| now.duration_since(last) >= self.config.heartbeat_interval)
                .unwrap_or(true);
            if due {
                if let Err(e) = self.link.send(Packet::Heartbeat) {
                    debug!("Heartbeat not sent: {}", e);
                }
                self.last_heartbeat = Some(now);
            }
        }
    }

    fn request_accepted(&mut self, pending: PendingRequest) {
        match pending.kind {
            RequestKind::LoadWorld { name } => {
                let activated = self.worlds.activate(&name);
                if self.report(activated).is_ok() {
                    self.notify_world_changed(&name);
                }
            }
            RequestKind::CreateWorld { name, kind } => self.world_created(&name, kind),
            RequestKind::SaveProperties { .. } => self.properties_saved(),
            RequestKind::StartServer { .. } | RequestKind::StopServer { .. } => {
                debug!("Server accepted lifecycle request {}", pending.id);
            }
            RequestKind::Command { .. } => {}
        }
    }

    /// Rolls back optimistic state of a rejected or expired request
    fn request_failed(&mut self, pending: PendingRequest, reason: &str) {
        match &pending.kind {
            RequestKind::StartServer { previous } | RequestKind::StopServer { previous } => {
                self.link.restore_status(*previous);
            }
            RequestKind::SaveProperties { previous, .. } => {
                self.properties.restore_committed(previous.clone());
            }
            RequestKind::CreateWorld { name, .. } => {
                self.worlds.remove(name);
            }
            RequestKind::LoadWorld { .. } => {}
            RequestKind::Command { .. } => {
                self.log.append_for_request(
                    pending.id,
                    LogLevel::Error,
                    format!("Command rejected: {}", reason),
                );
                return;
            }
        }

        let description = format!("{} failed: {}", capitalize(&pending.kind.describe()), reason);
        error!("{}", description);
        self.notify(Notification::error("Request Failed", description));
    }

    fn release_remote_requests(&mut self) {
        for abandoned in self.dispatcher.abandon_remote(&mut self.log) {
            self.request_failed(abandoned, "connection lost");
        }
    }

    fn world_created(&mut self, name: &str, kind: shared::WorldKind) {
        self.log.append(
            LogLevel::Info,
            format!("Created world \"{}\" with type: {}", name, kind),
        );
        self.notify(Notification::info(
            "World Created",
            format!("Created new world: {}", name),
        ));
    }

    fn notify_world_changed(&mut self, name: &str) {
        info!("Active world is now {}", name);
        self.notify(Notification::info(
            "World Changed",
            format!("Switching to world: {}", name),
        ));
    }

    fn properties_saved(&mut self) {
        self.log.append(LogLevel::Info, "Server properties updated");
        self.notify(Notification::info(
            "Properties Saved",
            "Server properties updated. Restart server to apply changes.",
        ));
    }

    /// Emits the error notification for a failed operation
    fn report<T>(&self, result: Result<T>) -> Result<T> {
        if let Err(err) = &result {
            debug!("Operation failed: {}", err);
            self.notify(Notification::from_error(err));
        }
        result
    }

    fn notify(&self, notification: Notification) {
        if self.notifications.send(notification).is_err() {
            debug!("Notification dropped, no listener");
        }
    }
}

fn capitalize(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
