//! Message handling: one inbound message in, one reply out.
//!
//! interpret → (lock user session) → override + dispatch → (unlock) → format

use crate::client::{CartService, Catalog, OpenRouterClient, StoreClient};
use crate::engine::{Dispatcher, Interpreter, LlmInterpreter, SessionStore, format_result};
use crate::models::{ActionResult, Config, ConfigError, Intent, Result};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{Instrument, info, info_span};
use uuid::Uuid;

/// Inbound chat message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InboundMessage {
    /// User identity (phone number, chat id, ...)
    pub from: String,
    pub body: String,
}

impl InboundMessage {
    pub fn new(from: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            from: from.into(),
            body: body.into(),
        }
    }
}

/// Everything produced while handling one message.
#[derive(Debug, Clone, Serialize)]
pub struct AgentReply {
    pub request_id: Uuid,
    /// Intent as decoded, before the session override
    pub intent: Intent,
    pub result: ActionResult,
    /// Text to send back to the user
    pub text: String,
}

/// The conversational agent.
pub struct Agent {
    interpreter: Arc<dyn Interpreter>,
    dispatcher: Dispatcher,
    sessions: Arc<SessionStore>,
}

impl Agent {
    pub fn new(
        interpreter: Arc<dyn Interpreter>,
        catalog: Arc<dyn Catalog>,
        carts: Arc<dyn CartService>,
        sessions: Arc<SessionStore>,
    ) -> Self {
        Self {
            interpreter,
            dispatcher: Dispatcher::new(catalog, carts),
            sessions,
        }
    }

    /// Build an agent with HTTP collaborators from configuration.
    pub fn from_config(config: &Config) -> Result<Self> {
        let api_key = config.resolve_api_key()?;
        let mut interpreter =
            LlmInterpreter::new(OpenRouterClient::new(api_key, &config.openrouter)?);
        if let Some(path) = &config.openrouter.system_prompt {
            let prompt = std::fs::read_to_string(path).map_err(|e| ConfigError::FileRead {
                path: path.clone(),
                source: e,
            })?;
            interpreter = interpreter.with_system_prompt(prompt);
        }
        let store = Arc::new(StoreClient::new(&config.catalog)?);

        info!(
            model = %config.openrouter.model,
            catalog = %store.base_url(),
            custom_prompt = config.openrouter.system_prompt.is_some(),
            "Agent configured"
        );

        Ok(Self::new(
            Arc::new(interpreter),
            store.clone(),
            store,
            Arc::new(SessionStore::new()),
        ))
    }

    pub fn sessions(&self) -> &Arc<SessionStore> {
        &self.sessions
    }

    /// Handle one inbound message. Never fails.
    pub async fn handle(&self, message: &InboundMessage) -> AgentReply {
        let request_id = Uuid::new_v4();
        let span = info_span!("message", %request_id, user = %message.from);

        async move {
            let intent = self.interpreter.interpret(&message.body).await;

            let result = {
                let mut session = self.sessions.lock(&message.from).await;
                self.dispatcher.dispatch(intent.clone(), &mut session).await
            };

            let text = format_result(&result);
            info!(
                intent = %intent.action(),
                action = %result.action,
                "Message handled"
            );

            AgentReply {
                request_id,
                intent,
                result,
                text,
            }
        }
        .instrument(span)
        .await
    }
}
