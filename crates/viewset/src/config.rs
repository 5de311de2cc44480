//! View configuration.
//!
//! [`ViewConfig`] describes a whole view (root directory, default set,
//! resource mounts and engine options) and can be read from YAML or JSON:
//!
//! ```yaml
//! root: ./views
//! default_set: default
//! engine:
//!   auto_escape: true
//!   strict_undefined: false
//! resources:
//!   - prefix: /static/
//!     dir: ./public
//! ```
//!
//! [`EngineOptions`] alone can be passed to [`View::with_options`](crate::View::with_options).

use std::path::{Path, PathBuf};

use minijinja::{AutoEscape, Environment, UndefinedBehavior};
use serde::{Deserialize, Serialize};

use crate::error::{Result, ViewError};

/// Options applied to the engine environment of every compiled set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineOptions {
    /// HTML-escape every `{{ ... }}` output unless marked safe.
    pub auto_escape: bool,
    /// Fail rendering when a template uses an undefined value.
    pub strict_undefined: bool,
    /// Drop the first newline after a block tag.
    pub trim_blocks: bool,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            auto_escape: true,
            strict_undefined: true,
            trim_blocks: false,
        }
    }
}

impl EngineOptions {
    /// Creates an empty engine environment configured with these options.
    pub(crate) fn environment(&self) -> Environment<'static> {
        let mut env = Environment::new();

        if self.auto_escape {
            env.set_auto_escape_callback(|_name: &str| AutoEscape::Html);
        } else {
            env.set_auto_escape_callback(|_name: &str| AutoEscape::None);
        }

        env.set_undefined_behavior(if self.strict_undefined {
            UndefinedBehavior::Strict
        } else {
            UndefinedBehavior::Lenient
        });

        env.set_trim_blocks(self.trim_blocks);
        env
    }
}

/// A static directory served under a URL prefix.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MountConfig {
    pub prefix: String,
    pub dir: PathBuf,
}

/// Configuration for building a [`View`](crate::View).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewConfig {
    /// Directory containing one subdirectory per template set.
    pub root: PathBuf,

    /// Set activated when the view is built.
    #[serde(default)]
    pub default_set: Option<String>,

    #[serde(default)]
    pub engine: EngineOptions,

    /// Mounted in order; the last prefix becomes the `resource` prefix.
    #[serde(default)]
    pub resources: Vec<MountConfig>,
}

impl ViewConfig {
    /// Creates a configuration with only a root directory.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            default_set: None,
            engine: EngineOptions::default(),
            resources: Vec::new(),
        }
    }

    /// Parses a configuration from YAML.
    ///
    /// # Errors
    ///
    /// Returns [`ViewError::Config`] if the document is not a valid configuration.
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    /// Parses a configuration from JSON.
    ///
    /// # Errors
    ///
    /// Returns [`ViewError::Config`] if the document is not a valid configuration.
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Reads a configuration file, choosing the format by extension.
    ///
    /// `.json` files are parsed as JSON, everything else as YAML.
    ///
    /// # Errors
    ///
    /// Returns [`ViewError::Io`] if the file cannot be read and
    /// [`ViewError::Config`] if it cannot be parsed.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| ViewError::io(path, e))?;

        match path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => Self::from_json_str(&content),
            _ => Self::from_yaml_str(&content),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_engine_options_defaults() {
        let options = EngineOptions::default();
        assert!(options.auto_escape);
        assert!(options.strict_undefined);
        assert!(!options.trim_blocks);
    }

    #[test]
    fn test_environment_escapes_html() {
        let env = EngineOptions::default().environment();
        let out = env
            .render_str("{{ v }}", minijinja::context! { v => "<b>" })
            .unwrap();
        assert_eq!(out, "&lt;b&gt;");
    }

    #[test]
    fn test_environment_without_escape() {
        let options = EngineOptions {
            auto_escape: false,
            ..EngineOptions::default()
        };
        let out = options
            .environment()
            .render_str("{{ v }}", minijinja::context! { v => "<b>" })
            .unwrap();
        assert_eq!(out, "<b>");
    }

    #[test]
    fn test_environment_strict_undefined() {
        let strict = EngineOptions::default().environment();
        assert!(strict.render_str("{{ missing }}", ()).is_err());

        let lenient = EngineOptions {
            strict_undefined: false,
            ..EngineOptions::default()
        }
        .environment();
        assert_eq!(lenient.render_str("{{ missing }}", ()).unwrap(), "");
    }

    #[test]
    fn test_view_config_from_yaml_applies_defaults() {
        let config = ViewConfig::from_yaml_str("root: ./views\n").unwrap();
        assert_eq!(config.root, PathBuf::from("./views"));
        assert_eq!(config.default_set, None);
        assert_eq!(config.engine, EngineOptions::default());
        assert!(config.resources.is_empty());
    }

    #[test]
    fn test_view_config_from_yaml_full() {
        let config = ViewConfig::from_yaml_str(
            r#"
root: /srv/views
default_set: mobile
engine:
  auto_escape: false
resources:
  - prefix: /static/
    dir: /srv/public
"#,
        )
        .unwrap();

        assert_eq!(config.default_set.as_deref(), Some("mobile"));
        assert!(!config.engine.auto_escape);
        assert!(config.engine.strict_undefined);
        assert_eq!(
            config.resources,
            vec![MountConfig {
                prefix: "/static/".into(),
                dir: PathBuf::from("/srv/public"),
            }]
        );
    }

    #[test]
    fn test_view_config_from_json() {
        let config =
            ViewConfig::from_json_str(r#"{"root": "views", "default_set": "default"}"#).unwrap();
        assert_eq!(config.root, PathBuf::from("views"));
        assert_eq!(config.default_set.as_deref(), Some("default"));
    }

    #[test]
    fn test_view_config_missing_root() {
        let result = ViewConfig::from_yaml_str("default_set: x\n");
        assert!(matches!(result, Err(ViewError::Config(_))));
    }

    #[test]
    fn test_view_config_from_file_by_extension() {
        let dir = tempfile::tempdir().unwrap();

        let json_path = dir.path().join("views.json");
        let mut f = std::fs::File::create(&json_path).unwrap();
        write!(f, r#"{{"root": "json-views"}}"#).unwrap();

        let yaml_path = dir.path().join("views.yaml");
        std::fs::write(&yaml_path, "root: yaml-views\n").unwrap();

        assert_eq!(
            ViewConfig::from_file(&json_path).unwrap().root,
            PathBuf::from("json-views")
        );
        assert_eq!(
            ViewConfig::from_file(&yaml_path).unwrap().root,
            PathBuf::from("yaml-views")
        );
    }

    #[test]
    fn test_view_config_from_missing_file() {
        let result = ViewConfig::from_file("/definitely/not/here.yaml");
        assert!(matches!(result, Err(ViewError::Io { .. })));
    }
}
