//! Game mode, cheats and quick command shortcuts

use std::fmt;
use std::str::FromStr;

/// Player game mode applied through `/gamemode`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameMode {
    Survival,
    Creative,
    Adventure,
    Spectator,
}

impl GameMode {
    pub const ALL: [GameMode; 4] = [
        GameMode::Survival,
        GameMode::Creative,
        GameMode::Adventure,
        GameMode::Spectator,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            GameMode::Survival => "survival",
            GameMode::Creative => "creative",
            GameMode::Adventure => "adventure",
            GameMode::Spectator => "spectator",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            GameMode::Survival => "Default survival experience",
            GameMode::Creative => "Unlimited resources and flight",
            GameMode::Adventure => "Exploration focused gameplay",
            GameMode::Spectator => "Observe without interaction",
        }
    }
}

impl fmt::Display for GameMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for GameMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        GameMode::ALL
            .iter()
            .find(|mode| mode.as_str().eq_ignore_ascii_case(s.trim()))
            .copied()
            .ok_or_else(|| format!("unknown game mode '{}'", s))
    }
}

/// Who a mode change applies to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TargetSelector {
    #[default]
    NearestPlayer,
    AllPlayers,
    Myself,
}

impl TargetSelector {
    pub fn as_str(&self) -> &'static str {
        match self {
            TargetSelector::NearestPlayer => "@p",
            TargetSelector::AllPlayers => "@a",
            TargetSelector::Myself => "@s",
        }
    }
}

impl FromStr for TargetSelector {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "@p" => Ok(TargetSelector::NearestPlayer),
            "@a" => Ok(TargetSelector::AllPlayers),
            "@s" => Ok(TargetSelector::Myself),
            other => Err(format!("unknown target selector '{}'", other)),
        }
    }
}

/// Grouping for quick commands; only `World` works with cheats off
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuickCategory {
    Items,
    World,
    Teleport,
    Effects,
}

/// A one-click command shortcut
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuickCommand {
    /// Display name, e.g. "Give Elytra"
    pub name: &'static str,
    /// Full command text sent as-is
    pub command: &'static str,
    pub category: QuickCategory,
}

impl QuickCommand {
    /// World commands stay available with cheats off
    pub fn requires_cheats(&self) -> bool {
        self.category != QuickCategory::World
    }
}

pub static QUICK_COMMANDS: [QuickCommand; 8] = [
    QuickCommand {
        name: "Give Diamond Sword",
        command: "/give @p diamond_sword 1",
        category: QuickCategory::Items,
    },
    QuickCommand {
        name: "Give Elytra",
        command: "/give @p elytra 1",
        category: QuickCategory::Items,
    },
    QuickCommand {
        name: "Set Day",
        command: "/time set day",
        category: QuickCategory::World,
    },
    QuickCommand {
        name: "Set Night",
        command: "/time set night",
        category: QuickCategory::World,
    },
    QuickCommand {
        name: "Clear Weather",
        command: "/weather clear",
        category: QuickCategory::World,
    },
    QuickCommand {
        name: "Rain",
        command: "/weather rain",
        category: QuickCategory::World,
    },
    QuickCommand {
        name: "Teleport Spawn",
        command: "/tp @p ~ ~100 ~",
        category: QuickCategory::Teleport,
    },
    QuickCommand {
        name: "Heal Player",
        command: "/effect @p instant_health 1 255",
        category: QuickCategory::Effects,
    },
];

/// Looks a quick command up by display name, ignoring case and spacing
pub fn quick_command(name: &str) -> Option<&'static QuickCommand> {
    let wanted: String = name
        .chars()
        .filter(|c| c.is_alphanumeric())
        .collect::<String>()
        .to_lowercase();
    QUICK_COMMANDS.iter().find(|q| {
        q.name
            .chars()
            .filter(|c| c.is_alphanumeric())
            .collect::<String>()
            .to_lowercase()
            == wanted
    })
}

pub const DIFFICULTIES: [&str; 4] = ["peaceful", "easy", "normal", "hard"];

/// Builds `/difficulty <level>` for a known level, ignoring case.
///
/// Unknown levels return `None` so nothing is sent.
pub fn difficulty_command(level: &str) -> Option<String> {
    let level = level.trim().to_lowercase();
    DIFFICULTIES
        .contains(&level.as_str())
        .then(|| format!("/difficulty {}", level))
}

pub const LIST_PLAYERS: &str = "/list";
pub const SHOW_WHITELIST: &str = "/whitelist list";

/// Game mode, cheats toggle and target selector held by the dashboard.
///
/// Defaults to survival with cheats off, targeting the nearest player.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameSettings {
    pub mode: GameMode,
    pub cheats: bool,
    pub target: TargetSelector,
}

impl Default for GameSettings {
    fn default() -> Self {
        Self {
            mode: GameMode::Survival,
            cheats: false,
            target: TargetSelector::default(),
        }
    }
}

impl GameSettings {
    /// Records the new mode and returns the command that applies it to the target
    pub fn change_mode(&mut self, mode: GameMode) -> String {
        self.mode = mode;
        format!("/gamemode {} {}", mode, self.target.as_str())
    }

    /// Whether the shortcut may run under the current cheats setting
    pub fn is_available(&self, quick: &QuickCommand) -> bool {
        self.cheats || !quick.requires_cheats()
    }

    pub fn available_quick_commands(&self) -> impl Iterator<Item = &'static QuickCommand> + '_ {
        QUICK_COMMANDS.iter().filter(move |q| self.is_available(q))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_change_mode_builds_command() {
        let mut settings = GameSettings::default();
        assert_eq!(settings.change_mode(GameMode::Creative), "/gamemode creative @p");
        assert_eq!(settings.mode, GameMode::Creative);

        settings.target = "@a".parse().unwrap();
        assert_eq!(settings.change_mode(GameMode::Spectator), "/gamemode spectator @a");
    }

    #[test]
    fn test_game_mode_parsing() {
        assert_eq!("Adventure".parse::<GameMode>(), Ok(GameMode::Adventure));
        assert!("hardcore".parse::<GameMode>().is_err());
        assert!("@x".parse::<TargetSelector>().is_err());
    }

    #[test]
    fn test_quick_commands_gated_by_cheats() {
        let mut settings = GameSettings::default();
        let names: Vec<&str> = settings.available_quick_commands().map(|q| q.name).collect();
        assert_eq!(names, vec!["Set Day", "Set Night", "Clear Weather", "Rain"]);

        settings.cheats = true;
        assert_eq!(settings.available_quick_commands().count(), QUICK_COMMANDS.len());
    }

    #[test]
    fn test_quick_command_lookup() {
        assert_eq!(quick_command("set-day").unwrap().command, "/time set day");
        assert_eq!(
            quick_command("give diamond sword").unwrap().command,
            "/give @p diamond_sword 1"
        );
        assert!(quick_command("fly").is_none());
    }

    #[test]
    fn test_difficulty_command() {
        assert_eq!(difficulty_command("Hard").as_deref(), Some("/difficulty hard"));
        assert_eq!(difficulty_command("impossible"), None);
    }
}
