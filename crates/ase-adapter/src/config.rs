//! Adapter configuration and connection-string handling.
//!
//! Connection strings are semicolon-delimited key/value lists. The `Provider`
//! part names the registered driver; everything else is passed through to it.
//! Values containing delimiters are double-quoted with embedded quotes
//! doubled, and [`ConnectionStringParser`] understands that quoting when
//! reading parts back out.

use serde::{Deserialize, Serialize};

/// Connection-string key that names the registered driver.
pub const PROVIDER_KEY: &str = "Provider";

/// Driver name this adapter targets by default.
pub const PROVIDER_NAME: &str = "AseClient";

fn default_port() -> u16 {
    5000
}

/// Connection settings used to compose an adapter connection string.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectionSettings {
    /// Database host.
    pub server: String,

    /// Database port (default: 5000).
    #[serde(default = "default_port")]
    pub port: u16,

    /// Database name.
    pub database: String,

    /// Username.
    pub user: String,

    /// Password.
    pub password: String,
}

impl ConnectionSettings {
    /// Create settings for the default port.
    pub fn new(
        server: impl Into<String>,
        database: impl Into<String>,
        user: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            server: server.into(),
            port: default_port(),
            database: database.into(),
            user: user.into(),
            password: password.into(),
        }
    }

    /// Compose the full connection string, including the provider marker and
    /// the fixed parts the adapter relies on. Pooling stays off; the adapter
    /// owns its connection exclusively.
    pub fn connection_string(&self) -> String {
        format!(
            "{}={};Port={};Data Source={};User ID={};Password={};Initial Catalog={};persist security info=true;Pooling=false",
            PROVIDER_KEY,
            PROVIDER_NAME,
            self.port,
            escape_connection_string_argument(&self.server),
            escape_connection_string_argument(&self.user),
            escape_connection_string_argument(&self.password),
            escape_connection_string_argument(&self.database),
        )
    }
}

/// Quote a connection-string value when it would break the part syntax.
pub fn escape_connection_string_argument(value: &str) -> String {
    let needs_quoting = value.contains(';')
        || value.contains('"')
        || value.starts_with(' ')
        || value.ends_with(' ');
    if needs_quoting {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

/// What the adapter may create when the target database or schema is missing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AutoCreateOption {
    /// Touch nothing; a missing database or schema is an error.
    None,

    /// Assume the schema already exists and matches.
    SchemaAlreadyExists,

    /// Create missing schema objects, but never the database itself.
    SchemaOnly,

    /// Create the database and any missing schema objects.
    DatabaseAndSchema,
}

impl AutoCreateOption {
    /// Whether a missing database may be created on open.
    pub fn can_create_database(self) -> bool {
        matches!(self, AutoCreateOption::DatabaseAndSchema)
    }

    /// Whether missing schema objects may be created.
    pub fn can_create_schema(self) -> bool {
        matches!(
            self,
            AutoCreateOption::DatabaseAndSchema | AutoCreateOption::SchemaOnly
        )
    }
}

/// Behavior switches passed to the adapter at construction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdapterOptions {
    /// Database/schema auto-creation policy (default: DatabaseAndSchema).
    pub auto_create: AutoCreateOption,

    /// Whether schema DDL runs inside an explicit transaction.
    ///
    /// Unset defers to `schema_update_in_transaction_fallback`.
    pub schema_update_in_transaction: Option<bool>,

    /// Caller-supplied fallback for `schema_update_in_transaction`.
    ///
    /// When both are unset, schema DDL runs without a transaction.
    pub schema_update_in_transaction_fallback: Option<bool>,
}

impl Default for AdapterOptions {
    fn default() -> Self {
        Self {
            auto_create: AutoCreateOption::DatabaseAndSchema,
            schema_update_in_transaction: Some(true),
            schema_update_in_transaction_fallback: None,
        }
    }
}

impl AdapterOptions {
    /// Resolve the schema-DDL transaction choice: the instance setting wins,
    /// then the fallback, then no transaction.
    pub fn schema_update_runs_in_transaction(&self) -> bool {
        self.schema_update_in_transaction
            .or(self.schema_update_in_transaction_fallback)
            .unwrap_or(false)
    }
}

/// Order-preserving connection-string part list.
///
/// Part names compare case-insensitively; values are stored unquoted and
/// re-escaped on composition.
#[derive(Debug, Clone)]
pub struct ConnectionStringParser {
    parts: Vec<(String, String)>,
}

impl ConnectionStringParser {
    /// Parse a connection string into its parts.
    pub fn parse(connection_string: &str) -> Self {
        let mut parts = Vec::new();
        for segment in split_segments(connection_string) {
            let segment = segment.trim();
            if segment.is_empty() {
                continue;
            }
            let (name, value) = match segment.split_once('=') {
                Some((name, value)) => (name.trim(), value.trim()),
                None => (segment, ""),
            };
            parts.push((name.to_string(), unquote(value)));
        }
        Self { parts }
    }

    /// Look up a part's value by name.
    pub fn get_part(&self, name: &str) -> Option<&str> {
        self.parts
            .iter()
            .find(|(part, _)| part.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    /// Remove every part with the given name, returning the first removed
    /// value if any.
    pub fn remove_part(&mut self, name: &str) -> Option<String> {
        let mut removed = None;
        self.parts.retain(|(part, value)| {
            if part.eq_ignore_ascii_case(name) {
                if removed.is_none() {
                    removed = Some(value.clone());
                }
                false
            } else {
                true
            }
        });
        removed
    }

    /// Compose the remaining parts back into a connection string.
    pub fn compose(&self) -> String {
        self.parts
            .iter()
            .map(|(name, value)| {
                format!("{}={}", name, escape_connection_string_argument(value))
            })
            .collect::<Vec<_>>()
            .join(";")
    }
}

/// Split on `;` outside double quotes. Doubled quotes inside a quoted run
/// stay in place for [`unquote`] to collapse.
fn split_segments(s: &str) -> Vec<String> {
    let mut segments = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    for c in s.chars() {
        match c {
            '"' => {
                in_quotes = !in_quotes;
                current.push('"');
            }
            ';' if !in_quotes => segments.push(std::mem::take(&mut current)),
            c => current.push(c),
        }
    }
    segments.push(current);
    segments
}

fn unquote(value: &str) -> String {
    if value.len() >= 2 && value.starts_with('"') && value.ends_with('"') {
        value[1..value.len() - 1].replace("\"\"", "\"")
    } else {
        value.to_string()
    }
}
