//! HTTP surface: WhatsApp (Twilio) webhook, JSON agent endpoint, health check.

use crate::engine::{Agent, AgentReply, InboundMessage};
use crate::models::{ActionResult, Intent};
use axum::{
    Json, Router,
    extract::{FromRequest, Request, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{info, warn};

/// Sent when handling a message panics.
pub const APOLOGY_TEXT: &str = "⚠️ Ocurrió un error procesando tu mensaje. Intenta de nuevo.";

/// Webhook body. Twilio posts form fields `From` and `Body`.
#[derive(Debug, Default, Deserialize)]
pub struct WebhookPayload {
    #[serde(default, alias = "From")]
    pub from: Option<String>,
    #[serde(default, alias = "Body")]
    pub body: Option<String>,
}

impl WebhookPayload {
    fn into_message(self) -> Option<InboundMessage> {
        let from = self.from.filter(|s| !s.trim().is_empty())?;
        let body = self.body.filter(|s| !s.trim().is_empty())?;
        Some(InboundMessage::new(from, body))
    }
}

#[derive(Debug, Deserialize)]
pub struct AgentRequest {
    pub text: String,
    #[serde(default)]
    pub from: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct AgentResponse {
    pub intent: Intent,
    pub result: ActionResult,
    pub reply: String,
}

impl From<AgentReply> for AgentResponse {
    fn from(reply: AgentReply) -> Self {
        Self {
            intent: reply.intent,
            result: reply.result,
            reply: reply.text,
        }
    }
}

/// Build the application router.
pub fn router(agent: Arc<Agent>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/whatsapp", post(whatsapp))
        .route("/agent", post(agent_endpoint))
        .with_state(agent)
}

/// Bind and serve until the process is stopped.
pub async fn serve(agent: Arc<Agent>, bind: &str) -> std::io::Result<()> {
    let listener = TcpListener::bind(bind).await?;
    info!("Listening on {}", listener.local_addr()?);
    axum::serve(listener, router(agent)).await
}

async fn health() -> &'static str {
    "ok"
}

/// Handle in a separate task so a panic becomes a reply instead of a dropped connection.
async fn run(agent: Arc<Agent>, message: InboundMessage) -> Option<AgentReply> {
    match tokio::spawn(async move { agent.handle(&message).await }).await {
        Ok(reply) => Some(reply),
        Err(e) => {
            warn!(error = %e, "Message handling aborted");
            None
        }
    }
}

async fn whatsapp(State(agent): State<Arc<Agent>>, request: Request) -> Response {
    let is_json = request
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|ct| ct.starts_with("application/json"));

    let payload = if is_json {
        Json::<WebhookPayload>::from_request(request, &())
            .await
            .map(|Json(p)| p)
            .ok()
    } else {
        axum::Form::<WebhookPayload>::from_request(request, &())
            .await
            .map(|axum::Form(p)| p)
            .ok()
    };

    let Some(message) = payload.and_then(WebhookPayload::into_message) else {
        return (StatusCode::BAD_REQUEST, "Missing From or Body").into_response();
    };

    let text = match run(agent, message).await {
        Some(reply) => reply.text,
        None => APOLOGY_TEXT.to_string(),
    };
    twiml(&text)
}

async fn agent_endpoint(
    State(agent): State<Arc<Agent>>,
    Json(request): Json<AgentRequest>,
) -> Response {
    let from = request.from.unwrap_or_else(|| "api".to_string());
    match run(agent, InboundMessage::new(from, request.text)).await {
        Some(reply) => Json(AgentResponse::from(reply)).into_response(),
        None => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(serde_json::json!({ "error": APOLOGY_TEXT })),
        )
            .into_response(),
    }
}

fn twiml(text: &str) -> Response {
    let body = format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?><Response><Message>{}</Message></Response>",
        xml_escape(text)
    );
    ([(header::CONTENT_TYPE, "text/xml")], body).into_response()
}

pub fn xml_escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(c),
        }
    }
    out
}
