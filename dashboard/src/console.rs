//! Operator input for the text console
//!
//! Lines starting with `:` are dashboard actions; anything else is sent to
//! the server as a command.

use crate::dashboard::Dashboard;
use crate::properties::PropertyStore;
use crate::settings::GameMode;
use crate::worlds::WorldConfig;
use chrono::Utc;
use shared::WorldKind;
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq)]
pub enum ConsoleAction {
    Connect(Option<String>),
    Disconnect,
    Start,
    Stop,
    Worlds,
    Load(String),
    Create {
        name: String,
        kind: WorldKind,
        seed: Option<String>,
    },
    Props,
    Set { key: String, value: String },
    Save,
    Reset,
    Import(PathBuf),
    Export,
    Clear,
    Commands(Option<String>),
    Favorite(String),
    Run(String),
    GameMode(GameMode),
    Cheats(bool),
    Quick(String),
    History,
    Help,
    Quit,
    Command(String),
}

pub const HELP: &str = "\
:connect [endpoint]            connect to a server
:disconnect                    close the session
:start | :stop                 start or stop the server
:worlds                        list worlds
:load <name>                   switch the active world
:create <name> [kind] [seed]   create a world (normal, flat, nether, end)
:props                         show server properties
:set <key> <value>             edit a property
:save | :reset                 commit or discard property edits
:import <path>                 load key=value properties from a file
:export                        print properties as key=value
:clear                         clear the console
:commands [search]             browse the command catalog
:fav <name>                    toggle a favorite command
:run <name>                    run a catalog command
:gamemode <mode>               change the game mode
:cheats on|off                 toggle cheats
:quick <name>                  run a quick command
:history                       show recent commands
:quit                          exit
anything else                  sent to the server as a command";

/// Parses one input line. Blank lines yield `Ok(None)`.
pub fn parse_line(line: &str) -> Result<Option<ConsoleAction>, String> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }

    let Some(action) = line.strip_prefix(':') else {
        return Ok(Some(ConsoleAction::Command(line.to_string())));
    };

    let (verb, rest) = match action.split_once(char::is_whitespace) {
        Some((verb, rest)) => (verb, rest.trim()),
        None => (action, ""),
    };
    let argument = |usage: &str| {
        if rest.is_empty() {
            Err(format!("usage: {}", usage))
        } else {
            Ok(rest.to_string())
        }
    };
    let optional = (!rest.is_empty()).then(|| rest.to_string());

    let parsed = match verb {
        "connect" => ConsoleAction::Connect(optional),
        "disconnect" => ConsoleAction::Disconnect,
        "start" => ConsoleAction::Start,
        "stop" => ConsoleAction::Stop,
        "worlds" => ConsoleAction::Worlds,
        "load" => ConsoleAction::Load(argument(":load <name>")?),
        "create" => {
            let mut words = rest.split_whitespace();
            let name = words
                .next()
                .ok_or_else(|| "usage: :create <name> [kind] [seed]".to_string())?;
            let kind = match words.next() {
                Some(kind) => kind.parse::<WorldKind>()?,
                None => WorldKind::Normal,
            };
            ConsoleAction::Create {
                name: name.to_string(),
                kind,
                seed: words.next().map(str::to_string),
            }
        }
        "props" => ConsoleAction::Props,
        "set" => {
            let (key, value) = rest
                .split_once(char::is_whitespace)
                .map(|(k, v)| (k, v.trim()))
                .unwrap_or((rest, ""));
            if key.is_empty() {
                return Err("usage: :set <key> <value>".to_string());
            }
            ConsoleAction::Set {
                key: key.to_string(),
                value: value.to_string(),
            }
        }
        "save" => ConsoleAction::Save,
        "reset" => ConsoleAction::Reset,
        "import" => ConsoleAction::Import(PathBuf::from(argument(":import <path>")?)),
        "export" => ConsoleAction::Export,
        "clear" => ConsoleAction::Clear,
        "commands" => ConsoleAction::Commands(optional),
        "fav" => ConsoleAction::Favorite(argument(":fav <name>")?),
        "run" => ConsoleAction::Run(argument(":run <name>")?),
        "gamemode" => ConsoleAction::GameMode(argument(":gamemode <mode>")?.parse()?),
        "cheats" => match rest {
            "on" => ConsoleAction::Cheats(true),
            "off" => ConsoleAction::Cheats(false),
            _ => return Err("usage: :cheats on|off".to_string()),
        },
        "quick" => ConsoleAction::Quick(argument(":quick <name>")?),
        "history" => ConsoleAction::History,
        "help" => ConsoleAction::Help,
        "quit" | "exit" => ConsoleAction::Quit,
        other => return Err(format!("unknown action ':{}', try :help", other)),
    };
    Ok(Some(parsed))
}

#[derive(Debug, PartialEq)]
pub enum Outcome {
    /// Lines to print before the next prompt
    Continue(Vec<String>),
    Quit,
}

/// Runs an action against the dashboard.
///
/// Failures are already surfaced as notifications by the dashboard, so only
/// listings are returned here.
pub fn apply(dashboard: &mut Dashboard, action: ConsoleAction) -> Outcome {
    let mut out = Vec::new();

    match action {
        ConsoleAction::Connect(endpoint) => {
            let _ = dashboard.connect(endpoint.as_deref());
        }
        ConsoleAction::Disconnect => dashboard.disconnect(),
        ConsoleAction::Start => {
            let _ = dashboard.start_server();
        }
        ConsoleAction::Stop => {
            let _ = dashboard.stop_server();
        }
        ConsoleAction::Worlds => {
            let now = Utc::now();
            for world in dashboard.worlds().list() {
                out.push(format!(
                    "{} {:<16} {:<7} {:>7.1} MB  {}",
                    if world.active { "*" } else { " " },
                    world.name,
                    world.kind.as_str(),
                    world.size_mb,
                    world.last_played_label(now)
                ));
            }
        }
        ConsoleAction::Load(name) => {
            let _ = dashboard.load_world(&name);
        }
        ConsoleAction::Create { name, kind, seed } => {
            let mut config = WorldConfig::new(name, kind);
            config.seed = seed;
            let _ = dashboard.create_world(config);
        }
        ConsoleAction::Props => {
            let properties = dashboard.properties();
            for category in PropertyStore::categories() {
                out.push(format!("[{}]", category.as_str()));
                for descriptor in PropertyStore::descriptors_in(*category) {
                    let value = properties
                        .get_or_default(descriptor.key)
                        .map(|v| v.to_string())
                        .unwrap_or_default();
                    out.push(format!(
                        "  {:<30} {:<16} {}",
                        descriptor.key, value, descriptor.description
                    ));
                }
            }
            if properties.is_dirty() {
                out.push(format!("Unsaved changes: {}", properties.diff().join(", ")));
            }
        }
        ConsoleAction::Set { key, value } => {
            let stored = dashboard.set_property(&key, &value);
            out.push(format!("{} = {}", key, stored));
        }
        ConsoleAction::Save => {
            let _ = dashboard.save_properties();
        }
        ConsoleAction::Reset => dashboard.reset_properties(),
        ConsoleAction::Import(path) => match std::fs::read_to_string(&path) {
            Ok(text) => {
                let _ = dashboard.import_properties(&text);
            }
            Err(e) => out.push(format!("Cannot read {}: {}", path.display(), e)),
        },
        ConsoleAction::Export => out.push(dashboard.export_properties()),
        ConsoleAction::Clear => dashboard.clear_logs(),
        ConsoleAction::Commands(search) => {
            let catalog = dashboard.catalog();
            for command in catalog.search(search.as_deref().unwrap_or("")) {
                out.push(format!(
                    "{} {:<11} {:<11} {:<42} {}",
                    if catalog.is_favorite(command.name) { "*" } else { " " },
                    command.name,
                    command.category.as_str(),
                    command.syntax,
                    command.description
                ));
            }
        }
        ConsoleAction::Favorite(name) => {
            let state = if dashboard.toggle_favorite(&name) {
                "added to"
            } else {
                "removed from"
            };
            out.push(format!("{} {} favorites", name, state));
        }
        ConsoleAction::Run(name) => {
            let _ = dashboard.run_catalog_command(&name);
        }
        ConsoleAction::GameMode(mode) => {
            let _ = dashboard.change_game_mode(mode);
        }
        ConsoleAction::Cheats(enabled) => dashboard.set_cheats(enabled),
        ConsoleAction::Quick(name) => {
            let _ = dashboard.run_quick_command(&name);
        }
        ConsoleAction::History => {
            out.extend(dashboard.history().entries().map(str::to_string));
        }
        ConsoleAction::Help => out.extend(HELP.lines().map(str::to_string)),
        ConsoleAction::Quit => return Outcome::Quit,
        ConsoleAction::Command(text) => {
            let _ = dashboard.execute(&text);
        }
    }

    Outcome::Continue(out)
}
