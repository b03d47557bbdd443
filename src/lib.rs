//! cartbot - Conversational commerce agent over a catalog/cart service.
//!
//! ## Architecture
//!
//! One inbound chat message flows through:
//! - **Interpreter**: OpenRouter chat completion → structured `Intent`
//! - **Session override**: a create-cart request continues the user's active cart
//! - **Dispatcher**: resolves line items against the catalog, then reads or writes carts
//! - **Formatter**: `ActionResult` → plain chat text
//!
//! ## Guarantees
//!
//! - Interpretation never fails: malformed upstream output becomes `Intent::Unknown`
//! - Messages from one user are serialized from session read to session write
//! - Ambiguous line items never reach the cart service

pub mod client;
pub mod engine;
pub mod models;
pub mod server;

// Re-exports for convenience
pub use client::{OpenRouterClient, StoreClient};
pub use engine::{Agent, AgentReply, InboundMessage, SessionStore};
pub use models::{ActionResult, CartbotError, Config, Intent, Result};
