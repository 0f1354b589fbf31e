use crate::error::AppResult;
use serde::{Deserialize, Serialize};

/// Settings an [`App`](crate::App) is built from.
///
/// Every field is optional in serialized form:
///
/// ```json
/// { "name": "breakout", "debug": true }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Shown in log spans.
    pub name: String,
    /// Without a default scene, components can only be added to scenes
    /// created explicitly.
    pub sceneless: bool,
    /// Logs every frame at `debug` level.
    pub debug: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            name: "kite".to_string(),
            sceneless: false,
            debug: false,
        }
    }
}

impl AppConfig {
    pub fn from_json(json: &str) -> AppResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json(&self) -> AppResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_sceneless(mut self, sceneless: bool) -> Self {
        self.sceneless = sceneless;
        self
    }

    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.name, "kite");
        assert!(!config.sceneless);
        assert!(!config.debug);
    }

    #[test]
    fn test_partial_json() {
        let config = AppConfig::from_json(r#"{ "debug": true }"#).unwrap();
        assert!(config.debug);
        assert_eq!(config.name, "kite");
    }

    #[test]
    fn test_json_roundtrip() {
        let config = AppConfig::default().with_name("breakout").with_sceneless(true);
        let json = config.to_json().unwrap();
        assert_eq!(AppConfig::from_json(&json).unwrap(), config);
    }

    #[test]
    fn test_bad_json() {
        assert!(AppConfig::from_json(r#"{ "debug": "yes" }"#).is_err());
    }
}
