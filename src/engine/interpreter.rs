//! Interpreter adapter: raw user text → [`Intent`].
//!
//! Never fails. Every interpreter fault (transport, status, malformed envelope,
//! content that is not an intent) becomes an `Unknown` intent whose `message`
//! param carries the diagnostic. No retries here; one failed call is one
//! `Unknown` intent for that turn.

use crate::client::{Message, OpenRouterClient};
use crate::models::{Intent, InterpretError};
use async_trait::async_trait;
use tracing::{debug, warn};

/// Fixed system instruction: action vocabulary and field names.
pub const SYSTEM_PROMPT: &str = r#"Eres un asistente que interpreta mensajes de clientes de una tienda de ropa.
Devuelve SOLO un objeto JSON, sin texto adicional, con este formato:
{"action": "<accion>", "params": { ... }}

Acciones posibles:
- "list_products": listar productos. params puede incluir: q (texto libre), tipo_prenda, color, talla, categoria, descripcion, disponible ("si"/"no"), cantidad_disponible, precio50_u, precio100_u, precio200_u.
- "get_product": ver un producto. params: {"id": <número>}.
- "create_cart": crear un carrito. params: {"items": [{"garmentType": "<tipo de prenda en singular>", "color": "<color>", "size": "<talla>", "priceTier": <precio>, "quantity": <cantidad>}]}.
- "update_cart": agregar productos a un carrito existente. params: {"id": <id del carrito>, "items": [ ...igual que create_cart... ]}.
- "get_cart": mostrar un carrito. params: {"id": <id del carrito>}.
- "ask_specifications": cuando el pedido es demasiado vago para saber qué producto quiere. params: {"message": "<pregunta para el cliente>", "options": ["<opción>", ...], "items": [{"garmentType": "<producto genérico>"}]}.

Reglas:
- garmentType va en singular y sin color ni talla (ej: "pantalón", "remera").
- Incluye color, size y priceTier solo si el cliente los mencionó.
- quantity es 1 si el cliente no indicó cantidad.
- Si no entiendes el pedido, usa {"action": "unknown", "params": {"message": "<motivo>"}}."#;

/// Turns user text into a structured intent.
#[async_trait]
pub trait Interpreter: Send + Sync {
    async fn interpret(&self, text: &str) -> Intent;
}

/// Interpreter backed by an LLM chat completion endpoint.
pub struct LlmInterpreter {
    client: OpenRouterClient,
    system_prompt: String,
}

impl LlmInterpreter {
    pub fn new(client: OpenRouterClient) -> Self {
        Self {
            client,
            system_prompt: SYSTEM_PROMPT.to_string(),
        }
    }

    /// Replace the built-in system instruction.
    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = prompt.into();
        self
    }
}

#[async_trait]
impl Interpreter for LlmInterpreter {
    async fn interpret(&self, text: &str) -> Intent {
        let messages = [Message::system(&self.system_prompt), Message::user(text)];
        debug!(model = %self.client.model(), chars = text.chars().count(), "Interpreting message");
        let reply = self.client.chat(&messages).await;
        intent_from_reply(reply)
    }
}

/// Decode the interpreter's reply, falling back to `Unknown` on any fault.
pub fn intent_from_reply(reply: Result<String, InterpretError>) -> Intent {
    match reply.and_then(|content| Intent::from_content(&content)) {
        Ok(intent) => {
            debug!(action = %intent.action(), "Intent decoded");
            intent
        }
        Err(e) => {
            let kind = match &e {
                InterpretError::Transport(_) => "transport",
                InterpretError::Status { .. } => "status",
                InterpretError::NotStructured(_) => "not_structured",
                InterpretError::NotIntent(_) => "not_intent",
            };
            warn!(kind, error = %e, "Interpreter fallback to unknown intent");
            Intent::unknown(e.to_string())
        }
    }
}
