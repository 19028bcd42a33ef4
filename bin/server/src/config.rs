//! Centralized server configuration.
//!
//! This module provides strongly-typed configuration for the server,
//! loaded via the `config` crate from environment variables. Nested keys use
//! `__` as the separator, e.g. `PERSONAS__HAPPY__ASSISTANT_ID`.
//!
//! See [`OpenAiConfig`], [`PlacesConfig`] and [`PollConfig`] for the library
//! sections.

use persona_gateway_conversation::{
    OpenAiConfig, Persona, PollConfig, ReplyFormat, ToolDefinition,
};
use persona_gateway_core::AssistantId;
use persona_gateway_places::PlacesConfig;
use serde::Deserialize;
use std::collections::BTreeMap;

/// Server configuration composed from library configs.
#[derive(Debug, Deserialize)]
pub struct ServerConfig {
    /// Socket address to listen on.
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,

    /// Assistants API client configuration.
    pub openai: OpenAiConfig,

    /// Places client configuration. Required when a persona uses Places tools.
    #[serde(default)]
    pub places: Option<PlacesConfig>,

    /// Run polling configuration.
    #[serde(default)]
    pub poll: PollConfig,

    /// Enabled personas by name.
    #[serde(default)]
    pub personas: BTreeMap<String, PersonaSettings>,
}

fn default_listen_addr() -> String {
    "0.0.0.0:8000".to_string()
}

/// Which tools a persona offers its assistant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToolSet {
    None,
    Places,
}

/// Per-persona settings. Unset fields fall back to the persona's defaults.
#[derive(Debug, Clone, Deserialize)]
pub struct PersonaSettings {
    pub assistant_id: String,
    #[serde(default)]
    pub instructions: Option<String>,
    #[serde(default)]
    pub tools: Option<ToolSet>,
    #[serde(default)]
    pub reply_format: Option<ReplyFormat>,
    #[serde(default)]
    pub include_thread_id: Option<bool>,
}

/// Built-in behaviour of a persona when its settings leave a field unset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PersonaDefaults {
    pub tools: ToolSet,
    pub reply_format: ReplyFormat,
    pub include_thread_id: bool,
}

impl PersonaDefaults {
    /// Returns the defaults for a persona name. Unknown names get a plain text persona.
    #[must_use]
    pub fn for_name(name: &str) -> Self {
        match name {
            "jarvis_sigma" => Self {
                tools: ToolSet::Places,
                reply_format: ReplyFormat::Json,
                include_thread_id: true,
            },
            _ => Self {
                tools: ToolSet::None,
                reply_format: ReplyFormat::Text,
                include_thread_id: false,
            },
        }
    }
}

impl PersonaSettings {
    /// The tool set after applying the persona's defaults.
    #[must_use]
    pub fn tool_set(&self, name: &str) -> ToolSet {
        self.tools
            .unwrap_or_else(|| PersonaDefaults::for_name(name).tools)
    }

    /// Builds the persona, offering `tools` to its assistant.
    #[must_use]
    pub fn into_persona(self, name: &str, tools: Vec<ToolDefinition>) -> Persona {
        let defaults = PersonaDefaults::for_name(name);
        let mut persona = Persona::new(name, AssistantId::new(self.assistant_id))
            .with_tools(tools)
            .with_reply_format(self.reply_format.unwrap_or(defaults.reply_format))
            .with_thread_id(self.include_thread_id.unwrap_or(defaults.include_thread_id));
        if let Some(instructions) = self.instructions {
            persona = persona.with_instructions(instructions);
        }
        persona
    }
}

impl ServerConfig {
    /// Loads configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if required configuration is missing or invalid.
    pub fn from_env() -> Result<Self, config::ConfigError> {
        Self::from_environment(config::Environment::default())
    }

    fn from_environment(environment: config::Environment) -> Result<Self, config::ConfigError> {
        let config: Self = config::Config::builder()
            .add_source(environment.separator("__").try_parsing(true))
            .build()?
            .try_deserialize()?;
        config
            .poll
            .validate()
            .map_err(|e| config::ConfigError::Message(e.to_string()))?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn load(vars: &[(&str, &str)]) -> Result<ServerConfig, config::ConfigError> {
        let source = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        ServerConfig::from_environment(config::Environment::default().source(Some(source)))
    }

    #[test]
    fn loads_nested_sections() {
        let config = load(&[
            ("OPENAI__API_KEY", "sk-test"),
            ("PLACES__API_KEY", "places-key"),
            ("POLL__MAX_WAIT_SECONDS", "30"),
            ("PERSONAS__HAPPY__ASSISTANT_ID", "asst_happy"),
            ("PERSONAS__JARVIS_SIGMA__ASSISTANT_ID", "asst_sigma"),
            ("PERSONAS__JARVIS_SIGMA__INCLUDE_THREAD_ID", "false"),
        ])
        .expect("config loads");

        assert_eq!(config.listen_addr, "0.0.0.0:8000");
        assert_eq!(config.openai.api_key, "sk-test");
        assert_eq!(config.openai.base_url, "https://api.openai.com/v1");
        assert_eq!(config.poll.max_wait_seconds, 30);
        assert_eq!(config.poll.max_tool_rounds, 8);
        assert!(config.places.is_some());
        assert_eq!(
            config.personas.keys().collect::<Vec<_>>(),
            vec!["happy", "jarvis_sigma"]
        );
        assert_eq!(
            config.personas["jarvis_sigma"].include_thread_id,
            Some(false)
        );
    }

    #[test]
    fn unusable_poll_settings_are_rejected() {
        for (key, value) in [
            ("POLL__MAX_WAIT_SECONDS", "7200"),
            ("POLL__MULTIPLIER", "inf"),
        ] {
            let err = load(&[
                ("OPENAI__API_KEY", "sk-test"),
                ("PERSONAS__HAPPY__ASSISTANT_ID", "asst_happy"),
                (key, value),
            ])
            .err()
            .expect("invalid poll config");
            assert!(err.to_string().contains("poll."), "{key}: {err}");
        }
    }

    #[test]
    fn missing_api_key_is_an_error() {
        assert!(load(&[("PERSONAS__HAPPY__ASSISTANT_ID", "asst_happy")]).is_err());
    }

    #[test]
    fn persona_defaults() {
        let sigma = PersonaDefaults::for_name("jarvis_sigma");
        assert_eq!(sigma.tools, ToolSet::Places);
        assert_eq!(sigma.reply_format, ReplyFormat::Json);
        assert!(sigma.include_thread_id);

        for name in ["happy", "jarvis_alpha"] {
            let defaults = PersonaDefaults::for_name(name);
            assert_eq!(defaults.tools, ToolSet::None);
            assert_eq!(defaults.reply_format, ReplyFormat::Text);
            assert!(!defaults.include_thread_id);
        }
    }

    #[test]
    fn settings_override_defaults() {
        let settings = PersonaSettings {
            assistant_id: "asst_alpha".to_string(),
            instructions: Some("be terse".to_string()),
            tools: Some(ToolSet::Places),
            reply_format: Some(ReplyFormat::Json),
            include_thread_id: None,
        };
        assert_eq!(settings.tool_set("jarvis_alpha"), ToolSet::Places);

        let persona = settings.into_persona("jarvis_alpha", Vec::new());
        assert_eq!(persona.assistant_id.as_str(), "asst_alpha");
        assert_eq!(persona.instructions.as_deref(), Some("be terse"));
        assert_eq!(persona.reply_format, ReplyFormat::Json);
        assert!(!persona.include_thread_id);
    }
}
