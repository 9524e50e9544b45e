//! Engine options
//!
//! Loaded with priority: ENV (`MAPSQL_*`) > config file > defaults.

use config::{Config, Environment, File};
use serde::Deserialize;
use std::path::Path;

use super::error::{MapperError, Result};

const DEFAULT_CONFIG_PATHS: [&str; 2] = ["/etc/mapsql/mapsql.toml", "./mapsql.toml"];

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct MapperOptions {
    /// Parameter names are matched case-insensitively
    #[serde(default)]
    pub ignore_parameter_case: bool,
    /// Characters that introduce a bound placeholder in SQL text
    #[serde(default = "default_parameter_prefixes")]
    pub parameter_prefixes: String,
    /// Template deriving a scope from a contract name, e.g. `I{Scope}Repository`
    #[serde(default = "default_scope_template")]
    pub scope_template: String,
    /// Suffix stripped from async method names when deriving statement ids
    #[serde(default = "default_async_suffix")]
    pub async_suffix: String,
    #[serde(default = "default_max_include_depth")]
    pub max_include_depth: usize,
}

fn default_parameter_prefixes() -> String { ":@?".to_string() }
fn default_scope_template() -> String { "I{Scope}Repository".to_string() }
fn default_async_suffix() -> String { "Async".to_string() }
const fn default_max_include_depth() -> usize { 16 }

impl Default for MapperOptions {
    fn default() -> Self {
        Self {
            ignore_parameter_case: false,
            parameter_prefixes: default_parameter_prefixes(),
            scope_template: default_scope_template(),
            async_suffix: default_async_suffix(),
            max_include_depth: default_max_include_depth(),
        }
    }
}

impl MapperOptions {
    /// Load options from `path` (or the first default location that exists) and the environment
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder = Config::builder();

        if let Some(path) = path {
            builder = builder.add_source(File::from(path));
        } else if let Some(found) = DEFAULT_CONFIG_PATHS.iter().find(|p| Path::new(p).exists()) {
            builder = builder.add_source(File::with_name(found));
        }

        builder = builder.add_source(
            Environment::with_prefix("MAPSQL")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let options: Self = builder.build()?.try_deserialize()?;
        options.validate()?;
        Ok(options)
    }

    pub fn validate(&self) -> Result<()> {
        if self.parameter_prefixes.is_empty() {
            return Err(MapperError::InvalidOptions(
                "parameter_prefixes must not be empty".to_string(),
            ));
        }
        if let Some(c) = self
            .parameter_prefixes
            .chars()
            .find(|c| c.is_alphanumeric() || c.is_whitespace() || *c == '_')
        {
            return Err(MapperError::InvalidOptions(format!(
                "'{c}' cannot introduce a placeholder"
            )));
        }
        if !self.scope_template.is_empty() && !self.scope_template.contains("{Scope}") {
            return Err(MapperError::InvalidOptions(format!(
                "scope_template '{}' has no {{Scope}} marker",
                self.scope_template
            )));
        }
        Ok(())
    }

    #[must_use]
    pub fn is_parameter_prefix(&self, c: char) -> bool {
        self.parameter_prefixes.contains(c)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults_are_valid() {
        let options = MapperOptions::default();
        assert!(options.validate().is_ok());
        assert!(options.is_parameter_prefix(':'));
        assert!(options.is_parameter_prefix('@'));
        assert!(!options.is_parameter_prefix('#'));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "ignore_parameter_case = true").unwrap();
        writeln!(file, "parameter_prefixes = \"#\"").unwrap();
        writeln!(file, "scope_template = \"{{Scope}}Dao\"").unwrap();

        let options = MapperOptions::load(Some(file.path())).unwrap();
        assert!(options.ignore_parameter_case);
        assert_eq!(options.parameter_prefixes, "#");
        assert_eq!(options.scope_template, "{Scope}Dao");
        assert_eq!(options.async_suffix, "Async");
        assert_eq!(options.max_include_depth, 16);
    }

    #[test]
    fn test_invalid_template_rejected() {
        let options = MapperOptions {
            scope_template: "Repository".to_string(),
            ..MapperOptions::default()
        };
        assert!(matches!(options.validate(), Err(MapperError::InvalidOptions(_))));
    }
}
