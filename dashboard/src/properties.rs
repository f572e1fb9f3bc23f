//! Editable mirror of the server's `server.properties`
//!
//! Values live in a key -> value map separate from the static descriptor
//! table. Edits mark the store dirty until they are committed or reset.
//! Text input is coerced by the declared type of its key: numbers follow a
//! lenient leading-integer parse that falls back to 0, so a half-typed value
//! never makes the editor unrenderable.

use crate::error::{DashboardError, Result};
use std::collections::BTreeMap;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PropertyKind {
    Text,
    Number,
    Boolean,
    Choice(&'static [&'static str]),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PropertyCategory {
    Server,
    World,
    Gameplay,
    Performance,
}

impl PropertyCategory {
    pub const ALL: [PropertyCategory; 4] = [
        PropertyCategory::Server,
        PropertyCategory::World,
        PropertyCategory::Gameplay,
        PropertyCategory::Performance,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PropertyCategory::Server => "server",
            PropertyCategory::World => "world",
            PropertyCategory::Gameplay => "gameplay",
            PropertyCategory::Performance => "performance",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum PropertyValue {
    Text(String),
    Number(i64),
    Boolean(bool),
}

impl fmt::Display for PropertyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PropertyValue::Text(text) => f.write_str(text),
            PropertyValue::Number(n) => write!(f, "{}", n),
            PropertyValue::Boolean(b) => write!(f, "{}", b),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct PropertyDescriptor {
    pub key: &'static str,
    pub kind: PropertyKind,
    pub default: DefaultValue,
    pub description: &'static str,
    pub category: PropertyCategory,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DefaultValue {
    Text(&'static str),
    Number(i64),
    Boolean(bool),
}

impl From<DefaultValue> for PropertyValue {
    fn from(value: DefaultValue) -> Self {
        match value {
            DefaultValue::Text(text) => PropertyValue::Text(text.to_string()),
            DefaultValue::Number(n) => PropertyValue::Number(n),
            DefaultValue::Boolean(b) => PropertyValue::Boolean(b),
        }
    }
}

const LEVEL_TYPES: &[&str] = &["DEFAULT", "FLAT", "NORMAL"];
const GAME_MODES: &[&str] = &["survival", "creative", "adventure", "spectator"];
const DIFFICULTIES: &[&str] = &["peaceful", "easy", "normal", "hard"];

macro_rules! property {
    ($key:expr, $kind:expr, $default:expr, $category:ident, $description:expr $(,)?) => {
        PropertyDescriptor {
            key: $key,
            kind: $kind,
            default: $default,
            description: $description,
            category: PropertyCategory::$category,
        }
    };
}

pub static SERVER_PROPERTIES: [PropertyDescriptor; 18] = [
    property!(
        "server-name",
        PropertyKind::Text,
        DefaultValue::Text("Nukkit Server"),
        Server,
        "Server name displayed in server list",
    ),
    property!(
        "server-port",
        PropertyKind::Number,
        DefaultValue::Number(19132),
        Server,
        "Server port",
    ),
    property!(
        "server-ip",
        PropertyKind::Text,
        DefaultValue::Text("0.0.0.0"),
        Server,
        "Server IP address",
    ),
    property!(
        "max-players",
        PropertyKind::Number,
        DefaultValue::Number(20),
        Server,
        "Maximum number of players",
    ),
    property!(
        "white-list",
        PropertyKind::Boolean,
        DefaultValue::Boolean(false),
        Server,
        "Enable whitelist",
    ),
    property!(
        "announce-player-achievements",
        PropertyKind::Boolean,
        DefaultValue::Boolean(true),
        Server,
        "Announce player achievements",
    ),
    property!(
        "level-name",
        PropertyKind::Text,
        DefaultValue::Text("world"),
        World,
        "World folder name",
    ),
    property!(
        "level-type",
        PropertyKind::Choice(LEVEL_TYPES),
        DefaultValue::Text("DEFAULT"),
        World,
        "World generation type",
    ),
    property!("level-seed", PropertyKind::Text, DefaultValue::Text(""), World, "World seed"),
    property!(
        "generate-structures",
        PropertyKind::Boolean,
        DefaultValue::Boolean(true),
        World,
        "Generate structures",
    ),
    property!(
        "spawn-protection",
        PropertyKind::Number,
        DefaultValue::Number(16),
        World,
        "Spawn protection radius",
    ),
    property!(
        "gamemode",
        PropertyKind::Choice(GAME_MODES),
        DefaultValue::Text("survival"),
        Gameplay,
        "Default game mode",
    ),
    property!(
        "difficulty",
        PropertyKind::Choice(DIFFICULTIES),
        DefaultValue::Text("easy"),
        Gameplay,
        "Difficulty level",
    ),
    property!(
        "allow-cheats",
        PropertyKind::Boolean,
        DefaultValue::Boolean(false),
        Gameplay,
        "Allow cheats",
    ),
    property!(
        "allow-flight",
        PropertyKind::Boolean,
        DefaultValue::Boolean(false),
        Gameplay,
        "Allow flight in survival",
    ),
    property!(
        "view-distance",
        PropertyKind::Number,
        DefaultValue::Number(10),
        Performance,
        "View distance in chunks",
    ),
    property!(
        "max-threads",
        PropertyKind::Number,
        DefaultValue::Number(8),
        Performance,
        "Maximum threads",
    ),
    property!(
        "auto-save",
        PropertyKind::Boolean,
        DefaultValue::Boolean(true),
        Performance,
        "Enable auto-save",
    ),
];

/// Properties a freshly started dashboard knows before any server reports its own
pub const INITIAL_PROPERTIES: [(&str, &str); 6] = [
    ("server-name", "Nukkit Server"),
    ("server-port", "19132"),
    ("max-players", "20"),
    ("gamemode", "survival"),
    ("difficulty", "easy"),
    ("level-name", "world"),
];

pub fn descriptor(key: &str) -> Option<&'static PropertyDescriptor> {
    SERVER_PROPERTIES.iter().find(|d| d.key == key)
}

/// Converts operator text into a value of the key's declared type.
///
/// Keys without a descriptor are kept as text.
pub fn coerce(key: &str, raw: &str) -> PropertyValue {
    let kind = descriptor(key).map(|d| d.kind).unwrap_or(PropertyKind::Text);
    match kind {
        PropertyKind::Number => PropertyValue::Number(parse_leading_int(raw)),
        PropertyKind::Boolean => PropertyValue::Boolean(parse_flag(raw)),
        PropertyKind::Choice(_) => PropertyValue::Text(raw.trim().to_string()),
        PropertyKind::Text => PropertyValue::Text(raw.to_string()),
    }
}

/// Integer prefix of `raw` after leading whitespace; 0 when there is none
fn parse_leading_int(raw: &str) -> i64 {
    let trimmed = raw.trim_start();
    let (sign, digits) = match trimmed.as_bytes().first() {
        Some(b'-') => (-1, &trimmed[1..]),
        Some(b'+') => (1, &trimmed[1..]),
        _ => (1, trimmed),
    };

    let end = digits
        .char_indices()
        .find(|(_, c)| !c.is_ascii_digit())
        .map(|(i, _)| i)
        .unwrap_or(digits.len());

    digits[..end]
        .parse::<i64>()
        .map(|n| sign * n)
        .unwrap_or(0)
}

fn parse_flag(raw: &str) -> bool {
    matches!(
        raw.trim().to_ascii_lowercase().as_str(),
        "true" | "on" | "yes" | "1"
    )
}

/// Parses newline-delimited `key=value` text.
///
/// Blank lines and lines starting with `#` are skipped. Each line is split at
/// its first `=`; both sides are trimmed and the key must be non-empty.
/// Line numbers in errors are 1-based.
pub fn parse_raw(text: &str) -> Result<BTreeMap<String, String>> {
    let mut mapping = BTreeMap::new();

    for (index, line) in text.lines().enumerate() {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }

        let malformed = || DashboardError::PropertyParse {
            line: index + 1,
            content: line.to_string(),
        };

        let (key, value) = trimmed.split_once('=').ok_or_else(malformed)?;
        let key = key.trim();
        if key.is_empty() {
            return Err(malformed());
        }
        mapping.insert(key.to_string(), value.trim().to_string());
    }

    Ok(mapping)
}

/// Typed values keyed by property name
pub type PropertySnapshot = BTreeMap<String, PropertyValue>;

#[derive(Debug, Clone)]
pub struct PropertyStore {
    values: PropertySnapshot,
    committed: PropertySnapshot,
    dirty: bool,
}

impl Default for PropertyStore {
    fn default() -> Self {
        Self::with_values(INITIAL_PROPERTIES.iter().map(|(k, v)| (*k, *v)))
    }
}

impl PropertyStore {
    /// An empty store; lookups fall back to descriptor defaults
    pub fn new() -> Self {
        Self {
            values: BTreeMap::new(),
            committed: BTreeMap::new(),
            dirty: false,
        }
    }

    pub fn with_values<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut store = Self::new();
        store.load_committed(pairs);
        store
    }

    pub fn get(&self, key: &str) -> Option<&PropertyValue> {
        self.values.get(key)
    }

    /// The stored value, or the descriptor default for known keys
    pub fn get_or_default(&self, key: &str) -> Option<PropertyValue> {
        self.values
            .get(key)
            .cloned()
            .or_else(|| descriptor(key).map(|d| d.default.into()))
    }

    pub fn set(&mut self, key: impl Into<String>, value: PropertyValue) {
        self.values.insert(key.into(), value);
        self.dirty = true;
    }

    /// Coerces `raw` per the key's declared type and stores it
    pub fn set_raw(&mut self, key: &str, raw: &str) -> PropertyValue {
        let value = coerce(key, raw);
        self.set(key, value.clone());
        value
    }

    /// Validates pending edits and makes them the committed snapshot.
    ///
    /// Returns the full snapshot as `(key, value)` text pairs sorted by key.
    /// A value outside its enumerated choices fails the commit and leaves the
    /// store dirty and unchanged.
    pub fn commit(&mut self) -> Result<Vec<(String, String)>> {
        for (key, value) in &self.values {
            if let Some(PropertyDescriptor {
                kind: PropertyKind::Choice(choices),
                ..
            }) = descriptor(key)
            {
                let text = value.to_string();
                if !choices.contains(&text.as_str()) {
                    return Err(DashboardError::InvalidProperty {
                        key: key.clone(),
                        value: text,
                        reason: format!("expected one of {}", choices.join(", ")),
                    });
                }
            }
        }

        self.committed = self.values.clone();
        self.dirty = false;
        Ok(self.snapshot())
    }

    /// Reverts to the last committed snapshot
    pub fn reset(&mut self) {
        self.values = self.committed.clone();
        self.dirty = false;
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// The last committed values
    pub fn committed(&self) -> &PropertySnapshot {
        &self.committed
    }

    /// Reinstates the committed values from before a save the server refused.
    ///
    /// Current edits are kept, so `diff` lists them again and `reset` returns
    /// to what the server still holds.
    pub fn restore_committed(&mut self, previous: PropertySnapshot) {
        self.committed = previous;
        self.dirty = self.values != self.committed;
    }

    /// Keys whose current value differs from the committed snapshot
    pub fn diff(&self) -> Vec<String> {
        let mut changed: Vec<String> = self
            .values
            .iter()
            .filter(|(key, value)| self.committed.get(*key) != Some(*value))
            .map(|(key, _)| key.clone())
            .collect();
        changed.extend(
            self.committed
                .keys()
                .filter(|key| !self.values.contains_key(*key))
                .cloned(),
        );
        changed.sort();
        changed
    }

    /// Parses `text` and applies every assignment as an edit.
    ///
    /// Nothing is applied unless the whole text parses.
    pub fn import_raw(&mut self, text: &str) -> Result<BTreeMap<String, String>> {
        let mapping = parse_raw(text)?;
        for (key, raw) in &mapping {
            self.set_raw(key, raw);
        }
        Ok(mapping)
    }

    /// `key=value` lines sorted by key
    pub fn export_raw(&self) -> String {
        self.values
            .iter()
            .map(|(key, value)| format!("{}={}", key, value))
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Replaces both the working values and the committed snapshot
    pub fn load_committed<K, V>(&mut self, pairs: impl IntoIterator<Item = (K, V)>)
    where
        K: AsRef<str>,
        V: AsRef<str>,
    {
        self.values = pairs
            .into_iter()
            .map(|(k, v)| (k.as_ref().to_string(), coerce(k.as_ref(), v.as_ref())))
            .collect();
        self.committed = self.values.clone();
        self.dirty = false;
    }

    pub fn snapshot(&self) -> Vec<(String, String)> {
        self.values
            .iter()
            .map(|(key, value)| (key.clone(), value.to_string()))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn descriptors_in(
        category: PropertyCategory,
    ) -> impl Iterator<Item = &'static PropertyDescriptor> {
        SERVER_PROPERTIES
            .iter()
            .filter(move |d| d.category == category)
    }

    pub fn categories() -> &'static [PropertyCategory] {
        &PropertyCategory::ALL
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_descriptor_table() {
        assert_eq!(SERVER_PROPERTIES.len(), 18);
        let total: usize = PropertyStore::categories()
            .iter()
            .map(|c| PropertyStore::descriptors_in(*c).count())
            .sum();
        assert_eq!(total, SERVER_PROPERTIES.len());

        let mut keys: Vec<&str> = SERVER_PROPERTIES.iter().map(|d| d.key).collect();
        keys.sort_unstable();
        keys.dedup();
        assert_eq!(keys.len(), SERVER_PROPERTIES.len());
    }

    #[test]
    fn test_lenient_number_coercion() {
        assert_eq!(coerce("max-players", "42"), PropertyValue::Number(42));
        assert_eq!(coerce("max-players", "  12abc"), PropertyValue::Number(12));
        assert_eq!(coerce("max-players", "-5"), PropertyValue::Number(-5));
        assert_eq!(coerce("max-players", "abc"), PropertyValue::Number(0));
        assert_eq!(coerce("max-players", ""), PropertyValue::Number(0));
        assert_eq!(coerce("max-players", "-"), PropertyValue::Number(0));
    }

    #[test]
    fn test_boolean_coercion() {
        for truthy in ["true", "ON", "yes", "1", " True "] {
            assert_eq!(coerce("white-list", truthy), PropertyValue::Boolean(true));
        }
        for falsy in ["false", "off", "no", "0", "maybe"] {
            assert_eq!(coerce("white-list", falsy), PropertyValue::Boolean(false));
        }
    }

    #[test]
    fn test_unknown_keys_stay_text() {
        assert_eq!(coerce("motd", " hi "), PropertyValue::Text(" hi ".to_string()));
    }

    #[test]
    fn test_set_marks_dirty_and_commit_clears() {
        let mut store = PropertyStore::default();
        assert!(!store.is_dirty());

        store.set_raw("max-players", "50");
        assert!(store.is_dirty());
        assert_eq!(store.diff(), vec!["max-players".to_string()]);

        let snapshot = store.commit().unwrap();
        assert!(!store.is_dirty());
        assert!(store.diff().is_empty());
        assert!(snapshot.contains(&("max-players".to_string(), "50".to_string())));
    }

    #[test]
    fn test_reset_restores_committed() {
        let mut store = PropertyStore::default();
        store.set_raw("difficulty", "hard");
        store.set_raw("motd", "hello");
        store.reset();

        assert!(!store.is_dirty());
        assert_eq!(
            store.get("difficulty"),
            Some(&PropertyValue::Text("easy".to_string()))
        );
        assert_eq!(store.get("motd"), None);
    }

    #[test]
    fn test_commit_rejects_invalid_choice() {
        let mut store = PropertyStore::default();
        store.set_raw("difficulty", "nightmare");

        let result = store.commit();
        assert!(matches!(
            result,
            Err(DashboardError::InvalidProperty { ref key, .. }) if key == "difficulty"
        ));
        assert!(store.is_dirty());
        assert_eq!(store.diff(), vec!["difficulty".to_string()]);
    }

    #[test]
    fn test_get_or_default() {
        let store = PropertyStore::default();
        assert_eq!(
            store.get_or_default("view-distance"),
            Some(PropertyValue::Number(10))
        );
        assert_eq!(store.get("view-distance"), None);
        assert_eq!(store.get_or_default("nope"), None);
    }

    #[test]
    fn test_parse_raw() {
        let mapping = parse_raw("a=1\nb=2\n").unwrap();
        let expected: BTreeMap<String, String> = [("a", "1"), ("b", "2")]
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        assert_eq!(mapping, expected);
    }

    #[test]
    fn test_parse_raw_tolerates_blanks_and_comments() {
        let mapping = parse_raw("\n# comment\n  \nmotd = a=b \n").unwrap();
        assert_eq!(mapping.len(), 1);
        assert_eq!(mapping["motd"], "a=b");
    }

    #[test]
    fn test_parse_raw_reports_line() {
        assert_eq!(
            parse_raw("malformed\n"),
            Err(DashboardError::PropertyParse {
                line: 1,
                content: "malformed".to_string()
            })
        );
        assert!(matches!(
            parse_raw("a=1\n\n=2\n"),
            Err(DashboardError::PropertyParse { line: 3, .. })
        ));
    }

    #[test]
    fn test_failed_import_changes_nothing() {
        let mut store = PropertyStore::default();
        let before = store.export_raw();

        assert!(store.import_raw("max-players=30\nbroken line\n").is_err());
        assert_eq!(store.export_raw(), before);
        assert!(!store.is_dirty());
    }

    #[test]
    fn test_import_applies_coercion() {
        let mut store = PropertyStore::new();
        let mapping = store.import_raw("max-players=abc\nwhite-list=on\n").unwrap();

        assert_eq!(mapping["max-players"], "abc");
        assert_eq!(store.get("max-players"), Some(&PropertyValue::Number(0)));
        assert_eq!(store.get("white-list"), Some(&PropertyValue::Boolean(true)));
        assert!(store.is_dirty());
    }

    #[test]
    fn test_export_raw_sorted() {
        let store = PropertyStore::with_values([("b", "2"), ("a", "1")]);
        assert_eq!(store.export_raw(), "a=1\nb=2");
    }

    #[test]
    fn test_restore_committed_after_refused_save() {
        let mut store = PropertyStore::default();
        let before = store.committed().clone();
        store.set_raw("max-players", "40");
        store.commit().unwrap();
        assert!(!store.is_dirty());

        store.restore_committed(before);
        assert!(store.is_dirty());
        assert_eq!(store.diff(), vec!["max-players".to_string()]);

        store.reset();
        assert_eq!(store.get("max-players"), Some(&PropertyValue::Number(20)));
        assert!(!store.is_dirty());
    }
}
