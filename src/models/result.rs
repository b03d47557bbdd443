//! Resolution and dispatch outcomes.

use super::{ActionKind, Cart, CatalogProduct};
use serde::Serialize;
use serde_json::Value;

/// Outcome of matching one line item against the catalog.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ResolvedLineItem {
    /// Exactly one product matched.
    Unique { product_id: u64, quantity: u32 },
    /// Two or more products matched, in catalog order.
    Ambiguous {
        garment_type: String,
        candidates: Vec<CatalogProduct>,
    },
    NotFound { garment_type: String },
}

impl ResolvedLineItem {
    pub fn is_unique(&self) -> bool {
        matches!(self, Self::Unique { .. })
    }

    pub fn is_ambiguous(&self) -> bool {
        matches!(self, Self::Ambiguous { .. })
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

/// One line item that needs the user to pick among candidates.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AmbiguousItem {
    pub garment_type: String,
    pub candidates: Vec<CatalogProduct>,
}

/// Result data carried alongside the summary text.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "data", rename_all = "snake_case")]
pub enum Payload {
    ProductList(Vec<CatalogProduct>),
    Product(CatalogProduct),
    Cart(Cart),
    /// Ambiguous items discovered while resolving a cart request.
    Ambiguity(Vec<AmbiguousItem>),
    /// Clarification requested by the interpreter itself.
    Clarification { options: Vec<String> },
    /// Raw params of an intent that could not be handled.
    Diagnostic(Value),
    Empty,
}

/// Channel-agnostic result of dispatching one intent.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActionResult {
    /// Mirrors the dispatched action, except for explicit ambiguity escalation.
    pub action: ActionKind,
    /// Human-readable summary
    pub text: String,
    pub payload: Payload,
}

impl ActionResult {
    pub fn new(action: ActionKind, text: impl Into<String>, payload: Payload) -> Self {
        Self {
            action,
            text: text.into(),
            payload,
        }
    }

    /// Result with no payload (validation messages, faults).
    pub fn text_only(action: ActionKind, text: impl Into<String>) -> Self {
        Self::new(action, text, Payload::Empty)
    }
}
