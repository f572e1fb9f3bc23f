use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub const PROTOCOL_VERSION: u32 = 1;
pub const DEFAULT_PORT: u16 = 19132;
pub const MAX_PACKET_SIZE: usize = 8192;

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub enum Packet {
    Connect {
        client_version: u32,
    },
    Heartbeat,
    StartServer {
        request_id: u64,
    },
    StopServer {
        request_id: u64,
    },
    Command {
        request_id: u64,
        text: String,
    },
    SaveProperties {
        request_id: u64,
        properties: Vec<(String, String)>,
    },
    LoadWorld {
        request_id: u64,
        name: String,
    },
    CreateWorld {
        request_id: u64,
        name: String,
        kind: WorldKind,
        seed: Option<String>,
        generate_structures: bool,
    },
    Disconnect,

    Connected {
        server_version: String,
        port: u16,
        status: ServerStatus,
        worlds: Vec<WorldSummary>,
        properties: Vec<(String, String)>,
    },
    StatusChanged {
        status: ServerStatus,
    },
    Log {
        level: LogLevel,
        message: String,
    },
    CommandResult {
        request_id: u64,
        level: LogLevel,
        message: String,
    },
    Accepted {
        request_id: u64,
    },
    Rejected {
        request_id: u64,
        reason: String,
    },
    Disconnected {
        reason: String,
    },
}

impl Packet {
    /// Request id carried by packets that expect (or are) a correlated reply
    pub fn request_id(&self) -> Option<u64> {
        match self {
            Packet::StartServer { request_id }
            | Packet::StopServer { request_id }
            | Packet::Command { request_id, .. }
            | Packet::SaveProperties { request_id, .. }
            | Packet::LoadWorld { request_id, .. }
            | Packet::CreateWorld { request_id, .. }
            | Packet::CommandResult { request_id, .. }
            | Packet::Accepted { request_id }
            | Packet::Rejected { request_id, .. } => Some(*request_id),
            _ => None,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LogLevel {
    Info,
    Warn,
    Error,
    Debug,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Info => "INFO",
            LogLevel::Warn => "WARN",
            LogLevel::Error => "ERROR",
            LogLevel::Debug => "DEBUG",
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle of the game server process behind the control endpoint
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
pub enum ServerStatus {
    Offline,
    Starting,
    Online,
    Stopping,
}

impl ServerStatus {
    /// Start is only meaningful from a fully stopped server
    pub fn accepts_start(&self) -> bool {
        !matches!(self, ServerStatus::Starting | ServerStatus::Online)
    }

    pub fn accepts_stop(&self) -> bool {
        !matches!(self, ServerStatus::Stopping | ServerStatus::Offline)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ServerStatus::Offline => "offline",
            ServerStatus::Starting => "starting",
            ServerStatus::Online => "online",
            ServerStatus::Stopping => "stopping",
        }
    }
}

impl fmt::Display for ServerStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
pub enum WorldKind {
    Normal,
    Nether,
    End,
    Flat,
}

impl WorldKind {
    pub const ALL: [WorldKind; 4] = [
        WorldKind::Normal,
        WorldKind::Flat,
        WorldKind::Nether,
        WorldKind::End,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            WorldKind::Normal => "normal",
            WorldKind::Nether => "nether",
            WorldKind::End => "end",
            WorldKind::Flat => "flat",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            WorldKind::Normal => "Standard overworld generation",
            WorldKind::Flat => "Superflat world",
            WorldKind::Nether => "Nether dimension",
            WorldKind::End => "End dimension",
        }
    }
}

impl fmt::Display for WorldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for WorldKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        WorldKind::ALL
            .iter()
            .find(|kind| kind.as_str().eq_ignore_ascii_case(s.trim()))
            .copied()
            .ok_or_else(|| format!("unknown world type '{}'", s))
    }
}

/// World as reported by the server on connect
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct WorldSummary {
    pub name: String,
    pub kind: WorldKind,
    pub size_mb: f32,
    /// Milliseconds since the Unix epoch
    pub last_played: Option<u64>,
    pub active: bool,
}

/// Best-effort classification of a command acknowledgement.
///
/// This is a substring heuristic over the command text, not a parsed server reply.
/// The first matching rule wins, so `/gamemode` is checked before the others.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandAck {
    GameModeUpdated,
    ItemGiven,
    Teleported,
    PlayerList,
    WeatherChanged,
    TimeSet,
    Executed,
}

impl CommandAck {
    const RULES: [(&'static str, CommandAck); 6] = [
        ("/gamemode", CommandAck::GameModeUpdated),
        ("/give", CommandAck::ItemGiven),
        ("/tp", CommandAck::Teleported),
        ("/list", CommandAck::PlayerList),
        ("/weather", CommandAck::WeatherChanged),
        ("/time", CommandAck::TimeSet),
    ];

    pub fn classify(command: &str) -> Self {
        Self::RULES
            .iter()
            .find(|(needle, _)| command.contains(needle))
            .map(|(_, ack)| *ack)
            .unwrap_or(CommandAck::Executed)
    }

    /// Message used when no live server renders a more specific reply
    pub fn default_message(&self) -> &'static str {
        match self {
            CommandAck::GameModeUpdated => "Game mode updated for player",
            CommandAck::ItemGiven => "Given item to player",
            CommandAck::Teleported => "Teleported player",
            CommandAck::PlayerList => "There are 3/20 players online: Player1, Player2, Player3",
            CommandAck::WeatherChanged => "Weather changed",
            CommandAck::TimeSet => "Time set",
            CommandAck::Executed => "Command executed successfully",
        }
    }
}
