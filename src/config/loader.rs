//! Load model definitions from JSON and admin settings from the environment.

use crate::codec::DEFAULT_TIME_FORMAT;
use crate::config::{validate, ModelDef, ModelFile};
use crate::error::ConfigError;
use std::path::{Path, PathBuf};

pub const DEFAULT_FORM_PREFIX: &str = "QorResource";
pub const DEFAULT_BODY_LIMIT: usize = 2 * 1024 * 1024;
pub const DEFAULT_MAX_CONNECTIONS: u32 = 5;

/// Parse and validate a model file: either `{"models": [...]}` or a bare array.
pub fn parse_models(json: &str) -> Result<Vec<ModelDef>, ConfigError> {
    let value: serde_json::Value =
        serde_json::from_str(json).map_err(|e| ConfigError::Load(e.to_string()))?;
    let models = if value.is_array() {
        serde_json::from_value::<Vec<ModelDef>>(value)
    } else {
        serde_json::from_value::<ModelFile>(value).map(|f| f.models)
    }
    .map_err(|e| ConfigError::Load(e.to_string()))?;
    validate(&models)?;
    Ok(models)
}

pub fn load_models(path: &Path) -> Result<Vec<ModelDef>, ConfigError> {
    let json = std::fs::read_to_string(path)
        .map_err(|e| ConfigError::Load(format!("{}: {}", path.display(), e)))?;
    parse_models(&json)
}

#[derive(Clone, Debug)]
pub struct AdminConfig {
    pub database_url: String,
    pub max_connections: u32,
    /// strftime format for submitted times.
    pub time_format: String,
    /// Form key prefix, e.g. `QorResource.Name`.
    pub form_prefix: String,
    pub body_limit: usize,
    pub models_path: Option<PathBuf>,
}

impl Default for AdminConfig {
    fn default() -> Self {
        AdminConfig {
            database_url: "sqlite::memory:".into(),
            max_connections: DEFAULT_MAX_CONNECTIONS,
            time_format: DEFAULT_TIME_FORMAT.into(),
            form_prefix: DEFAULT_FORM_PREFIX.into(),
            body_limit: DEFAULT_BODY_LIMIT,
            models_path: None,
        }
    }
}

impl AdminConfig {
    /// Reads `DATABASE_URL`, `ADMIN_MAX_CONNECTIONS`, `ADMIN_TIME_FORMAT`, `ADMIN_FORM_PREFIX`,
    /// `ADMIN_BODY_LIMIT` and `ADMIN_MODELS`. Call `dotenvy::dotenv()` first to pick up `.env`.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = AdminConfig::default();
        let max_connections = match lookup("ADMIN_MAX_CONNECTIONS") {
            Some(v) => v.parse().map_err(|_| ConfigError::Env {
                key: "ADMIN_MAX_CONNECTIONS",
                reason: format!("'{}' is not a number", v),
            })?,
            None => defaults.max_connections,
        };
        let body_limit = match lookup("ADMIN_BODY_LIMIT") {
            Some(v) => v.parse().map_err(|_| ConfigError::Env {
                key: "ADMIN_BODY_LIMIT",
                reason: format!("'{}' is not a number", v),
            })?,
            None => defaults.body_limit,
        };
        Ok(AdminConfig {
            database_url: lookup("DATABASE_URL").unwrap_or(defaults.database_url),
            max_connections,
            time_format: lookup("ADMIN_TIME_FORMAT").unwrap_or(defaults.time_format),
            form_prefix: lookup("ADMIN_FORM_PREFIX").unwrap_or(defaults.form_prefix),
            body_limit,
            models_path: lookup("ADMIN_MODELS").map(PathBuf::from),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_both_file_shapes() {
        let wrapped = r#"{"models": [{"name": "Company", "fields": [
            {"name": "ID", "type": "uint", "tag": "primaryKey"},
            {"name": "Name", "type": "string", "valid": "required"}
        ]}]}"#;
        let models = parse_models(wrapped).unwrap();
        assert_eq!(models[0].name, "Company");
        assert_eq!(models[0].fields[1].valid, "required");

        let bare = r#"[{"name": "Language", "primary_key": ["ID"], "fields": [{"name": "ID", "type": "uint"}]}]"#;
        let models = parse_models(bare).unwrap();
        assert_eq!(models[0].primary_key.as_ref().unwrap().names(), vec!["ID"]);

        assert!(matches!(parse_models("{"), Err(ConfigError::Load(_))));
    }

    #[test]
    fn env_defaults_and_overrides() {
        let cfg = AdminConfig::from_lookup(|_| None).unwrap();
        assert_eq!(cfg.time_format, DEFAULT_TIME_FORMAT);
        assert_eq!(cfg.form_prefix, "QorResource");

        let cfg = AdminConfig::from_lookup(|k| match k {
            "ADMIN_MAX_CONNECTIONS" => Some("9".into()),
            "DATABASE_URL" => Some("postgres://localhost/admin".into()),
            _ => None,
        })
        .unwrap();
        assert_eq!(cfg.max_connections, 9);
        assert_eq!(cfg.database_url, "postgres://localhost/admin");

        let bad = AdminConfig::from_lookup(|k| (k == "ADMIN_BODY_LIMIT").then(|| "lots".to_string()));
        assert!(matches!(bad, Err(ConfigError::Env { key: "ADMIN_BODY_LIMIT", .. })));
    }
}
