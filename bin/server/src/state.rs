//! Shared application state.

use crate::config::{ServerConfig, ToolSet};
use crate::error::ServerError;
use persona_gateway_conversation::{
    ConversationLoop, ConversationService, NoTools, OpenAiAssistants, PersonaGateway,
    ToolDispatcher,
};
use persona_gateway_places::{PlacesClient, PlacesDispatcher, tool_definitions};
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::info;

/// State shared by every request handler.
///
/// Built once at start-up; read-only afterwards.
pub struct AppState {
    personas: BTreeMap<String, PersonaGateway>,
    shutdown: CancellationToken,
}

impl AppState {
    /// Creates state serving `personas`; `shutdown` cancels in-flight chats.
    #[must_use]
    pub fn new(personas: BTreeMap<String, PersonaGateway>, shutdown: CancellationToken) -> Self {
        Self { personas, shutdown }
    }

    /// Builds every configured persona over one shared conversation client.
    ///
    /// # Errors
    ///
    /// Returns an error if no persona is configured, the poll settings are
    /// unusable, a client cannot be built, or a persona needs Places without
    /// Places configuration.
    pub fn from_config(
        config: ServerConfig,
        shutdown: CancellationToken,
    ) -> Result<Self, ServerError> {
        if config.personas.is_empty() {
            return Err(ServerError::NoPersonas);
        }
        config.poll.validate().map_err(|e| ServerError::Config {
            details: e.to_string(),
        })?;

        let service: Arc<dyn ConversationService> = Arc::new(
            OpenAiAssistants::new(config.openai).map_err(|e| {
                ServerError::ConversationClient {
                    details: e.to_string(),
                }
            })?,
        );

        let places: Option<Arc<dyn ToolDispatcher>> = match config.places {
            Some(places) => {
                let client =
                    PlacesClient::new(places).map_err(|e| ServerError::PlacesClient {
                        details: e.to_string(),
                    })?;
                Some(Arc::new(PlacesDispatcher::new(client)))
            }
            None => None,
        };

        let mut personas = BTreeMap::new();
        for (name, settings) in config.personas {
            let (dispatcher, tools) = match settings.tool_set(&name) {
                ToolSet::None => (Arc::new(NoTools) as Arc<dyn ToolDispatcher>, Vec::new()),
                ToolSet::Places => {
                    let dispatcher = places.clone().ok_or_else(|| {
                        ServerError::PlacesNotConfigured {
                            persona: name.clone(),
                        }
                    })?;
                    (dispatcher, tool_definitions())
                }
            };

            let persona = settings.into_persona(&name, tools);
            info!(
                persona = %name,
                assistant_id = %persona.assistant_id,
                tools = persona.tools.len(),
                "persona enabled"
            );
            let conversation =
                ConversationLoop::new(service.clone(), dispatcher, config.poll.clone());
            personas.insert(name, PersonaGateway::new(persona, conversation));
        }

        Ok(Self::new(personas, shutdown))
    }

    /// Returns the gateway serving `name`.
    #[must_use]
    pub fn persona(&self, name: &str) -> Option<&PersonaGateway> {
        self.personas.get(name)
    }

    /// Names of the enabled personas, sorted.
    pub fn persona_names(&self) -> impl Iterator<Item = &str> {
        self.personas.keys().map(String::as_str)
    }

    /// Token cancelled when the server shuts down.
    #[must_use]
    pub fn shutdown(&self) -> &CancellationToken {
        &self.shutdown
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PersonaSettings;
    use persona_gateway_conversation::{OpenAiConfig, PollConfig, ReplyFormat};
    use persona_gateway_places::PlacesConfig;

    fn settings(assistant_id: &str) -> PersonaSettings {
        PersonaSettings {
            assistant_id: assistant_id.to_string(),
            instructions: None,
            tools: None,
            reply_format: None,
            include_thread_id: None,
        }
    }

    fn config(places: Option<PlacesConfig>) -> ServerConfig {
        ServerConfig {
            listen_addr: "127.0.0.1:0".to_string(),
            openai: OpenAiConfig::new("sk-test"),
            places,
            poll: PollConfig::default(),
            personas: BTreeMap::from([
                ("happy".to_string(), settings("asst_happy")),
                ("jarvis_sigma".to_string(), settings("asst_sigma")),
            ]),
        }
    }

    #[test]
    fn builds_personas_with_defaults() {
        let state = AppState::from_config(
            config(Some(PlacesConfig::new("places-key"))),
            CancellationToken::new(),
        )
        .expect("state builds");

        assert_eq!(
            state.persona_names().collect::<Vec<_>>(),
            vec!["happy", "jarvis_sigma"]
        );
        let sigma = state.persona("jarvis_sigma").expect("sigma").persona();
        assert_eq!(sigma.tools.len(), 6);
        assert_eq!(sigma.reply_format, ReplyFormat::Json);
        assert!(sigma.include_thread_id);
        assert!(state.persona("happy").expect("happy").persona().tools.is_empty());
    }

    #[test]
    fn places_persona_requires_places_config() {
        let err = AppState::from_config(config(None), CancellationToken::new())
            .err()
            .expect("missing places config");
        assert!(matches!(
            err,
            ServerError::PlacesNotConfigured { ref persona } if persona == "jarvis_sigma"
        ));
    }

    #[test]
    fn infinite_backoff_is_a_config_error() {
        let mut config = config(Some(PlacesConfig::new("places-key")));
        config.poll.multiplier = f64::INFINITY;
        assert!(matches!(
            AppState::from_config(config, CancellationToken::new()),
            Err(ServerError::Config { .. })
        ));
    }

    #[test]
    fn no_personas_is_an_error() {
        let mut config = config(None);
        config.personas.clear();
        assert!(matches!(
            AppState::from_config(config, CancellationToken::new()),
            Err(ServerError::NoPersonas)
        ));
    }
}
