//! Simulated game server instance behind the control endpoint
//!
//! Holds the state a real server would own: lifecycle status with timed
//! transitions, the world list, persisted properties and the online players.
//! Requests are turned into reply packets; the network layer decides where
//! each reply goes.

use log::{info, warn};
use rand::Rng;
use shared::{CommandAck, LogLevel, Packet, ServerStatus, WorldKind, WorldSummary};
use std::collections::BTreeMap;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

pub const SERVER_VERSION: &str = "Nukkit 1.0.0";

/// Where a reply produced by the instance should be delivered
#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    /// Only to the dashboard that sent the request
    Direct(Packet),
    /// To every connected dashboard
    Broadcast(Packet),
}

#[derive(Debug, Clone)]
pub struct InstanceConfig {
    pub port: u16,
    pub startup_delay: Duration,
    pub shutdown_delay: Duration,
}

impl Default for InstanceConfig {
    fn default() -> Self {
        Self {
            port: shared::DEFAULT_PORT,
            startup_delay: Duration::from_millis(2000),
            shutdown_delay: Duration::from_millis(1500),
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Transition {
    target: ServerStatus,
    due: Instant,
}

pub struct ServerInstance {
    config: InstanceConfig,
    status: ServerStatus,
    transition: Option<Transition>,
    worlds: Vec<WorldSummary>,
    properties: BTreeMap<String, String>,
    players: Vec<String>,
}

impl ServerInstance {
    pub fn new(config: InstanceConfig) -> Self {
        let hour_ms = 60 * 60 * 1000;
        let now = now_millis();

        let worlds = vec![
            WorldSummary {
                name: "world".to_string(),
                kind: WorldKind::Normal,
                size_mb: 125.0,
                last_played: Some(now.saturating_sub(2 * hour_ms)),
                active: true,
            },
            WorldSummary {
                name: "creative_world".to_string(),
                kind: WorldKind::Flat,
                size_mb: 45.0,
                last_played: Some(now.saturating_sub(24 * hour_ms)),
                active: false,
            },
            WorldSummary {
                name: "adventure_map".to_string(),
                kind: WorldKind::Normal,
                size_mb: 89.0,
                last_played: Some(now.saturating_sub(72 * hour_ms)),
                active: false,
            },
        ];

        let properties = [
            ("server-name", "Nukkit Server".to_string()),
            ("server-port", config.port.to_string()),
            ("max-players", "20".to_string()),
            ("gamemode", "survival".to_string()),
            ("difficulty", "easy".to_string()),
            ("level-name", "world".to_string()),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect();

        Self {
            config,
            status: ServerStatus::Offline,
            transition: None,
            worlds,
            properties,
            players: vec![
                "Player1".to_string(),
                "Player2".to_string(),
                "Player3".to_string(),
            ],
        }
    }

    pub fn status(&self) -> ServerStatus {
        self.status
    }

    pub fn worlds(&self) -> &[WorldSummary] {
        &self.worlds
    }

    pub fn active_world(&self) -> Option<&WorldSummary> {
        self.worlds.iter().find(|w| w.active)
    }

    pub fn property(&self, key: &str) -> Option<&str> {
        self.properties.get(key).map(String::as_str)
    }

    /// Handshake reply describing the current server state
    pub fn connected_packet(&self) -> Packet {
        Packet::Connected {
            server_version: SERVER_VERSION.to_string(),
            port: self.config.port,
            status: self.status,
            worlds: self.worlds.clone(),
            properties: self
                .properties
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
        }
    }

    /// Processes one dashboard request and returns the replies it produces
    pub fn handle_request(&mut self, packet: Packet, now: Instant) -> Vec<Reply> {
        match packet {
            Packet::StartServer { request_id } => match self.start(now) {
                Ok(mut replies) => {
                    replies.insert(0, Reply::Direct(Packet::Accepted { request_id }));
                    replies
                }
                Err(reason) => vec![Reply::Direct(Packet::Rejected { request_id, reason })],
            },

            Packet::StopServer { request_id } => match self.stop(now) {
                Ok(mut replies) => {
                    replies.insert(0, Reply::Direct(Packet::Accepted { request_id }));
                    replies
                }
                Err(reason) => vec![Reply::Direct(Packet::Rejected { request_id, reason })],
            },

            Packet::Command { request_id, text } => self.execute(request_id, &text, now),

            Packet::SaveProperties {
                request_id,
                properties,
            } => {
                self.properties = properties.into_iter().collect();
                info!("Saved {} server properties", self.properties.len());
                vec![Reply::Direct(Packet::Accepted { request_id })]
            }

            Packet::LoadWorld { request_id, name } => match self.load_world(&name) {
                Ok(()) => vec![
                    Reply::Direct(Packet::Accepted { request_id }),
                    Reply::Broadcast(Packet::Log {
                        level: LogLevel::Info,
                        message: format!("Loaded world: {}", name),
                    }),
                ],
                Err(reason) => vec![Reply::Direct(Packet::Rejected { request_id, reason })],
            },

            Packet::CreateWorld {
                request_id,
                name,
                kind,
                seed,
                generate_structures,
            } => match self.create_world(&name, kind, seed.as_deref(), generate_structures) {
                Ok(()) => vec![Reply::Direct(Packet::Accepted { request_id })],
                Err(reason) => vec![Reply::Direct(Packet::Rejected { request_id, reason })],
            },

            other => {
                warn!("Instance cannot handle packet {:?}", other);
                Vec::new()
            }
        }
    }

    /// Completes a pending lifecycle transition once its delay has elapsed
    pub fn tick(&mut self, now: Instant) -> Vec<Reply> {
        let Some(transition) = self.transition else {
            return Vec::new();
        };
        if now < transition.due {
            return Vec::new();
        }

        self.transition = None;
        self.status = transition.target;
        info!("Server is now {}", self.status);

        let mut replies = vec![Reply::Broadcast(Packet::StatusChanged {
            status: self.status,
        })];
        if self.status == ServerStatus::Online {
            replies.push(Reply::Broadcast(Packet::Log {
                level: LogLevel::Info,
                message: "Done! For help, type \"help\" or \"?\"".to_string(),
            }));
        }
        replies
    }

    fn start(&mut self, now: Instant) -> Result<Vec<Reply>, String> {
        if !self.status.accepts_start() {
            return Err(format!("Server is already {}", self.status));
        }

        self.status = ServerStatus::Starting;
        self.transition = Some(Transition {
            target: ServerStatus::Online,
            due: now + self.config.startup_delay,
        });

        let level = self.property("level-name").unwrap_or("world").to_string();
        Ok(vec![
            Reply::Broadcast(Packet::StatusChanged {
                status: self.status,
            }),
            Reply::Broadcast(Packet::Log {
                level: LogLevel::Info,
                message: format!("Preparing level \"{}\"", level),
            }),
        ])
    }

    fn stop(&mut self, now: Instant) -> Result<Vec<Reply>, String> {
        if !self.status.accepts_stop() {
            return Err(format!("Server is already {}", self.status));
        }

        self.status = ServerStatus::Stopping;
        self.transition = Some(Transition {
            target: ServerStatus::Offline,
            due: now + self.config.shutdown_delay,
        });

        Ok(vec![
            Reply::Broadcast(Packet::StatusChanged {
                status: self.status,
            }),
            Reply::Broadcast(Packet::Log {
                level: LogLevel::Info,
                message: "Stopping server...".to_string(),
            }),
        ])
    }

    fn execute(&mut self, request_id: u64, text: &str, now: Instant) -> Vec<Reply> {
        let text = text.trim();
        if text.is_empty() {
            return vec![Reply::Direct(Packet::CommandResult {
                request_id,
                level: LogLevel::Warn,
                message: "Empty command".to_string(),
            })];
        }

        if self.status != ServerStatus::Online {
            return vec![Reply::Direct(Packet::CommandResult {
                request_id,
                level: LogLevel::Error,
                message: format!("Server is {}; command not executed", self.status),
            })];
        }

        let mut words = text.trim_start_matches('/').split_whitespace();
        let verb = words.next().unwrap_or_default();
        let argument = words.next();

        let mut replies = Vec::new();
        let message = match (verb, argument) {
            ("difficulty", Some(level)) => {
                self.properties
                    .insert("difficulty".to_string(), level.to_string());
                format!("Set game difficulty to {}", level)
            }
            ("save-all", _) => "Saved the world".to_string(),
            ("stop", _) => {
                if let Ok(mut lifecycle) = self.stop(now) {
                    replies.append(&mut lifecycle);
                }
                "Stopping the server".to_string()
            }
            _ => match CommandAck::classify(text) {
                CommandAck::PlayerList => format!(
                    "There are {}/{} players online: {}",
                    self.players.len(),
                    self.property("max-players").unwrap_or("20"),
                    self.players.join(", ")
                ),
                ack => ack.default_message().to_string(),
            },
        };

        replies.insert(
            0,
            Reply::Direct(Packet::CommandResult {
                request_id,
                level: LogLevel::Info,
                message,
            }),
        );
        replies
    }

    /// Switches the active world; the previous world stays active on failure
    fn load_world(&mut self, name: &str) -> Result<(), String> {
        let target = self
            .worlds
            .iter()
            .position(|w| w.name == name)
            .ok_or_else(|| format!("World '{}' does not exist", name))?;

        if self.worlds[target].active {
            return Ok(());
        }

        for world in &mut self.worlds {
            world.active = false;
        }
        let world = &mut self.worlds[target];
        world.active = true;
        world.last_played = Some(now_millis());

        self.properties
            .insert("level-name".to_string(), name.to_string());
        info!("Active world is now {}", name);
        Ok(())
    }

    fn create_world(
        &mut self,
        name: &str,
        kind: WorldKind,
        seed: Option<&str>,
        generate_structures: bool,
    ) -> Result<(), String> {
        let name = name.trim();
        if name.is_empty() {
            return Err("World name must not be empty".to_string());
        }
        if self.worlds.iter().any(|w| w.name == name) {
            return Err(format!("World '{}' already exists", name));
        }

        let size_mb = rand::thread_rng().gen_range(1.0..5.0);
        info!(
            "Created world {} ({}, seed: {}, structures: {})",
            name,
            kind,
            seed.unwrap_or("random"),
            generate_structures
        );
        self.worlds.push(WorldSummary {
            name: name.to_string(),
            kind,
            size_mb,
            last_played: None,
            active: false,
        });
        Ok(())
    }
}

impl Default for ServerInstance {
    fn default() -> Self {
        Self::new(InstanceConfig::default())
    }
}

fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or(Duration::from_secs(0))
        .as_millis() as u64
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;

    fn fast_instance() -> ServerInstance {
        ServerInstance::new(InstanceConfig {
            port: 19132,
            startup_delay: Duration::from_millis(100),
            shutdown_delay: Duration::from_millis(50),
        })
    }

    fn online_instance(now: Instant) -> ServerInstance {
        let mut instance = fast_instance();
        instance.handle_request(Packet::StartServer { request_id: 1 }, now);
        instance.tick(now + Duration::from_millis(100));
        assert_eq!(instance.status(), ServerStatus::Online);
        instance
    }

    fn command_message(replies: &[Reply]) -> (LogLevel, String) {
        match &replies[0] {
            Reply::Direct(Packet::CommandResult { level, message, .. }) => {
                (*level, message.clone())
            }
            other => panic!("Expected command result, got {:?}", other),
        }
    }

    #[test]
    fn test_default_worlds() {
        let instance = ServerInstance::default();
        assert_eq!(instance.worlds().len(), 3);
        assert_eq!(instance.active_world().unwrap().name, "world");
        assert_approx_eq!(instance.worlds()[1].size_mb, 45.0, 0.001);
        assert_eq!(instance.worlds().iter().filter(|w| w.active).count(), 1);
    }

    #[test]
    fn test_start_transitions_after_delay() {
        let now = Instant::now();
        let mut instance = fast_instance();

        let replies = instance.handle_request(Packet::StartServer { request_id: 4 }, now);
        assert_eq!(replies[0], Reply::Direct(Packet::Accepted { request_id: 4 }));
        assert_eq!(instance.status(), ServerStatus::Starting);

        assert!(instance.tick(now + Duration::from_millis(10)).is_empty());
        assert_eq!(instance.status(), ServerStatus::Starting);

        let replies = instance.tick(now + Duration::from_millis(100));
        assert_eq!(
            replies[0],
            Reply::Broadcast(Packet::StatusChanged {
                status: ServerStatus::Online
            })
        );
        assert_eq!(replies.len(), 2);
        assert_eq!(instance.status(), ServerStatus::Online);
    }

    #[test]
    fn test_start_rejected_when_online() {
        let now = Instant::now();
        let mut instance = online_instance(now);

        let replies = instance.handle_request(Packet::StartServer { request_id: 2 }, now);
        assert!(matches!(
            &replies[0],
            Reply::Direct(Packet::Rejected { request_id: 2, .. })
        ));
        assert_eq!(instance.status(), ServerStatus::Online);
    }

    #[test]
    fn test_stop_rejected_when_offline() {
        let mut instance = fast_instance();
        let replies = instance.handle_request(Packet::StopServer { request_id: 3 }, Instant::now());
        assert!(matches!(
            &replies[0],
            Reply::Direct(Packet::Rejected { request_id: 3, .. })
        ));
        assert_eq!(instance.status(), ServerStatus::Offline);
    }

    #[test]
    fn test_command_requires_online_server() {
        let mut instance = fast_instance();
        let replies = instance.handle_request(
            Packet::Command {
                request_id: 1,
                text: "/list".to_string(),
            },
            Instant::now(),
        );
        let (level, _) = command_message(&replies);
        assert_eq!(level, LogLevel::Error);
    }

    #[test]
    fn test_command_results() {
        let now = Instant::now();
        let mut instance = online_instance(now);

        let replies = instance.handle_request(
            Packet::Command {
                request_id: 5,
                text: "/gamemode creative @p".to_string(),
            },
            now,
        );
        assert_eq!(
            command_message(&replies),
            (LogLevel::Info, "Game mode updated for player".to_string())
        );

        let replies = instance.handle_request(
            Packet::Command {
                request_id: 6,
                text: "/list".to_string(),
            },
            now,
        );
        let (_, message) = command_message(&replies);
        assert_eq!(
            message,
            "There are 3/20 players online: Player1, Player2, Player3"
        );
    }

    #[test]
    fn test_difficulty_command_updates_property() {
        let now = Instant::now();
        let mut instance = online_instance(now);
        instance.handle_request(
            Packet::Command {
                request_id: 7,
                text: "/difficulty hard".to_string(),
            },
            now,
        );
        assert_eq!(instance.property("difficulty"), Some("hard"));
    }

    #[test]
    fn test_stop_command_initiates_shutdown() {
        let now = Instant::now();
        let mut instance = online_instance(now);
        let replies = instance.handle_request(
            Packet::Command {
                request_id: 8,
                text: "/stop".to_string(),
            },
            now,
        );
        assert_eq!(instance.status(), ServerStatus::Stopping);
        assert!(replies.contains(&Reply::Broadcast(Packet::StatusChanged {
            status: ServerStatus::Stopping
        })));

        instance.tick(now + Duration::from_millis(50));
        assert_eq!(instance.status(), ServerStatus::Offline);
    }

    #[test]
    fn test_load_world_exclusive() {
        let mut instance = fast_instance();
        let replies = instance.handle_request(
            Packet::LoadWorld {
                request_id: 1,
                name: "creative_world".to_string(),
            },
            Instant::now(),
        );
        assert_eq!(replies[0], Reply::Direct(Packet::Accepted { request_id: 1 }));
        assert_eq!(instance.active_world().unwrap().name, "creative_world");
        assert_eq!(instance.worlds().iter().filter(|w| w.active).count(), 1);
        assert_eq!(instance.property("level-name"), Some("creative_world"));
    }

    #[test]
    fn test_load_missing_world_keeps_active() {
        let mut instance = fast_instance();
        let replies = instance.handle_request(
            Packet::LoadWorld {
                request_id: 1,
                name: "missing".to_string(),
            },
            Instant::now(),
        );
        assert!(matches!(&replies[0], Reply::Direct(Packet::Rejected { .. })));
        assert_eq!(instance.active_world().unwrap().name, "world");
    }

    #[test]
    fn test_create_world_rejects_duplicates() {
        let mut instance = fast_instance();
        let create = |name: &str| Packet::CreateWorld {
            request_id: 1,
            name: name.to_string(),
            kind: WorldKind::Flat,
            seed: None,
            generate_structures: true,
        };

        let replies = instance.handle_request(create("skyblock"), Instant::now());
        assert_eq!(replies[0], Reply::Direct(Packet::Accepted { request_id: 1 }));
        assert_eq!(instance.worlds().len(), 4);
        let created = &instance.worlds()[3];
        assert!(created.size_mb >= 1.0 && created.size_mb < 5.0);
        assert!(!created.active);

        let replies = instance.handle_request(create("skyblock"), Instant::now());
        assert!(matches!(&replies[0], Reply::Direct(Packet::Rejected { .. })));
        assert_eq!(instance.worlds().len(), 4);
    }

    #[test]
    fn test_save_properties_replaces_map() {
        let mut instance = fast_instance();
        instance.handle_request(
            Packet::SaveProperties {
                request_id: 1,
                properties: vec![("motd".to_string(), "hi".to_string())],
            },
            Instant::now(),
        );
        assert_eq!(instance.property("motd"), Some("hi"));
        assert_eq!(instance.property("difficulty"), None);

        match instance.connected_packet() {
            Packet::Connected { properties, .. } => assert_eq!(properties.len(), 1),
            _ => panic!("Wrong packet type"),
        }
    }
}
