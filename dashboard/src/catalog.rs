//! Built-in command catalog and the operator's favorites

use std::collections::HashSet;

/// Grouping used to filter the catalog
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommandCategory {
    Server,
    Moderation,
    World,
}

impl CommandCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            CommandCategory::Server => "server",
            CommandCategory::Moderation => "moderation",
            CommandCategory::World => "world",
        }
    }
}

/// A server command the operator can look up
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandDescriptor {
    /// Name without the leading slash, also the favorites key
    pub name: &'static str,
    pub description: &'static str,
    /// Usage line with `<required>` and `[optional]` arguments
    pub syntax: &'static str,
    pub category: CommandCategory,
}

/// Built-in commands in display order
pub static COMMANDS: [CommandDescriptor; 11] = [
    CommandDescriptor {
        name: "gamemode",
        description: "Change game mode",
        syntax: "/gamemode <mode> [player]",
        category: CommandCategory::Server,
    },
    CommandDescriptor {
        name: "tp",
        description: "Teleport player",
        syntax: "/tp <player> [target]",
        category: CommandCategory::Server,
    },
    CommandDescriptor {
        name: "give",
        description: "Give items to player",
        syntax: "/give <player> <item> [amount]",
        category: CommandCategory::Server,
    },
    CommandDescriptor {
        name: "kick",
        description: "Kick a player",
        syntax: "/kick <player> [reason]",
        category: CommandCategory::Moderation,
    },
    CommandDescriptor {
        name: "ban",
        description: "Ban a player",
        syntax: "/ban <player> [reason]",
        category: CommandCategory::Moderation,
    },
    CommandDescriptor {
        name: "whitelist",
        description: "Manage whitelist",
        syntax: "/whitelist <add|remove|list> [player]",
        category: CommandCategory::Server,
    },
    CommandDescriptor {
        name: "weather",
        description: "Change weather",
        syntax: "/weather <clear|rain|thunder>",
        category: CommandCategory::World,
    },
    CommandDescriptor {
        name: "time",
        description: "Change time",
        syntax: "/time set <time>",
        category: CommandCategory::World,
    },
    CommandDescriptor {
        name: "difficulty",
        description: "Change difficulty",
        syntax: "/difficulty <peaceful|easy|normal|hard>",
        category: CommandCategory::World,
    },
    CommandDescriptor {
        name: "save-all",
        description: "Save the world",
        syntax: "/save-all",
        category: CommandCategory::Server,
    },
    CommandDescriptor {
        name: "stop",
        description: "Stop the server",
        syntax: "/stop",
        category: CommandCategory::Server,
    },
];

/// The static catalog plus a favorites set keyed by command name.
///
/// Favorites are independent of the catalog, so any name may be marked.
#[derive(Debug, Default)]
pub struct CommandCatalog {
    favorites: HashSet<String>,
}

impl CommandCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn all(&self) -> &'static [CommandDescriptor] {
        &COMMANDS
    }

    /// Exact, case-sensitive lookup by name
    pub fn find(&self, name: &str) -> Option<&'static CommandDescriptor> {
        COMMANDS.iter().find(|c| c.name == name)
    }

    /// Case-insensitive match on name or description; an empty term matches everything
    pub fn search(&self, term: &str) -> impl Iterator<Item = &'static CommandDescriptor> {
        let term = term.trim().to_lowercase();
        COMMANDS.iter().filter(move |c| {
            c.name.to_lowercase().contains(&term) || c.description.to_lowercase().contains(&term)
        })
    }

    /// Catalog entries in one category, in catalog order
    pub fn by_category(
        &self,
        category: CommandCategory,
    ) -> impl Iterator<Item = &'static CommandDescriptor> {
        COMMANDS.iter().filter(move |c| c.category == category)
    }

    /// Flips the favorite flag, returning the new state
    pub fn toggle_favorite(&mut self, name: &str) -> bool {
        if self.favorites.remove(name) {
            false
        } else {
            self.favorites.insert(name.to_string());
            true
        }
    }

    pub fn is_favorite(&self, name: &str) -> bool {
        self.favorites.contains(name)
    }

    /// Favorite catalog entries in catalog order
    pub fn favorites(&self) -> impl Iterator<Item = &'static CommandDescriptor> + '_ {
        COMMANDS.iter().filter(move |c| self.favorites.contains(c.name))
    }

    pub fn favorite_count(&self) -> usize {
        self.favorites.len()
    }
}
