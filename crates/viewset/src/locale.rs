//! Localization lookups for templates.
//!
//! [`View::bind_locale`](crate::View::bind_locale) wires a [`LocaleResolver`]
//! into two helpers:
//!
//! - `lang(file, key)`: lookup in the resolver's default namespace
//! - `langset(set, file, key)`: lookup in a named namespace
//!
//! Resolvers always answer with a string. Missing entries are the resolver's
//! concern; nothing is reported back through the template.
//!
//! [`Catalog`] is a ready-made resolver backed by nested string maps, usually
//! loaded from YAML:
//!
//! ```rust
//! use viewset::{Catalog, LocaleResolver};
//!
//! let catalog = Catalog::from_yaml_str("en", r#"
//! en:
//!   home:
//!     greeting: Hello
//! vi:
//!   home:
//!     greeting: Xin chào
//! "#).unwrap();
//!
//! assert_eq!(catalog.load("home", "greeting"), "Hello");
//! assert_eq!(catalog.load_set("vi", "home", "greeting"), "Xin chào");
//! assert_eq!(catalog.load("home", "missing"), "missing");
//! ```

use std::collections::HashMap;
use std::path::Path;

use crate::error::{Result, ViewError};

/// Resolves localized strings by file and key.
pub trait LocaleResolver: Send + Sync {
    /// Looks up `key` in `file` of the default namespace.
    fn load(&self, file: &str, key: &str) -> String;

    /// Looks up `key` in `file` of the namespace `set`.
    fn load_set(&self, set: &str, file: &str, key: &str) -> String;
}

type Messages = HashMap<String, HashMap<String, HashMap<String, String>>>;

/// In-memory resolver: `set -> file -> key -> message`.
///
/// Lookups that miss return the key itself.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    default_set: String,
    messages: Messages,
}

impl Catalog {
    /// Creates an empty catalog whose default namespace is `default_set`.
    pub fn new(default_set: impl Into<String>) -> Self {
        Self {
            default_set: default_set.into(),
            messages: HashMap::new(),
        }
    }

    /// Parses a catalog from a YAML document shaped `set: file: key: message`.
    ///
    /// # Errors
    ///
    /// Returns [`ViewError::Config`] if the document does not have that shape.
    pub fn from_yaml_str(default_set: impl Into<String>, yaml: &str) -> Result<Self> {
        let messages: Messages = serde_yaml::from_str(yaml)?;
        Ok(Self {
            default_set: default_set.into(),
            messages,
        })
    }

    /// Reads a YAML catalog file.
    ///
    /// # Errors
    ///
    /// Returns [`ViewError::Io`] if the file cannot be read and
    /// [`ViewError::Config`] if it cannot be parsed.
    pub fn from_file(default_set: impl Into<String>, path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| ViewError::io(path, e))?;
        Self::from_yaml_str(default_set, &content)
    }

    /// Adds or replaces one message.
    pub fn insert(
        &mut self,
        set: impl Into<String>,
        file: impl Into<String>,
        key: impl Into<String>,
        message: impl Into<String>,
    ) -> &mut Self {
        self.messages
            .entry(set.into())
            .or_default()
            .entry(file.into())
            .or_default()
            .insert(key.into(), message.into());
        self
    }

    pub fn default_set(&self) -> &str {
        &self.default_set
    }

    fn lookup(&self, set: &str, file: &str, key: &str) -> Option<&str> {
        self.messages
            .get(set)?
            .get(file)?
            .get(key)
            .map(|s| s.as_str())
    }
}

impl LocaleResolver for Catalog {
    fn load(&self, file: &str, key: &str) -> String {
        self.load_set(&self.default_set, file, key)
    }

    fn load_set(&self, set: &str, file: &str, key: &str) -> String {
        match self.lookup(set, file, key) {
            Some(message) => message.to_string(),
            None => {
                tracing::trace!(set, file, key, "missing localized message");
                key.to_string()
            }
        }
    }
}
