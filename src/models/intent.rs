//! Intent types: what the user asked for, decoded from the interpreter.
//!
//! The interpreter speaks loosely-typed JSON (`{action, params}`); this module
//! is the only place that looks at those untyped fields. Everything downstream
//! works on [`Intent`].

use super::catalog::scalar_to_string;
use super::{CatalogQuery, InterpretError, truncate};
use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// The kinds of action the agent understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    ListProducts,
    GetProduct,
    CreateCart,
    UpdateCart,
    GetCart,
    AskSpecifications,
    Unknown,
}

impl ActionKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ListProducts => "list_products",
            Self::GetProduct => "get_product",
            Self::CreateCart => "create_cart",
            Self::UpdateCart => "update_cart",
            Self::GetCart => "get_cart",
            Self::AskSpecifications => "ask_specifications",
            Self::Unknown => "unknown",
        }
    }

    /// Parse an action name as produced by the interpreter.
    pub fn parse(name: &str) -> Option<Self> {
        let kind = match name.trim() {
            "list_products" => Self::ListProducts,
            "get_product" => Self::GetProduct,
            "create_cart" => Self::CreateCart,
            "update_cart" => Self::UpdateCart,
            "get_cart" => Self::GetCart,
            "ask_specifications" => Self::AskSpecifications,
            "unknown" => Self::Unknown,
            _ => return None,
        };
        Some(kind)
    }
}

impl std::fmt::Display for ActionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One requested product mention within a cart-affecting intent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineItemRequest {
    #[serde(
        rename = "garmentType",
        alias = "garment_type",
        alias = "tipo_prenda",
        alias = "name"
    )]
    pub garment_type: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,

    #[serde(default, alias = "talla", skip_serializing_if = "Option::is_none")]
    pub size: Option<String>,

    #[serde(
        rename = "priceTier",
        alias = "price_tier",
        alias = "precio",
        default,
        deserialize_with = "de_opt_number",
        skip_serializing_if = "Option::is_none"
    )]
    pub price_tier: Option<f64>,

    #[serde(
        alias = "qty",
        alias = "cantidad",
        default = "default_quantity",
        deserialize_with = "de_quantity"
    )]
    pub quantity: u32,
}

fn default_quantity() -> u32 {
    1
}

impl LineItemRequest {
    pub fn new(garment_type: impl Into<String>) -> Self {
        Self {
            garment_type: garment_type.into(),
            color: None,
            size: None,
            price_tier: None,
            quantity: 1,
        }
    }

    pub fn color(mut self, color: impl Into<String>) -> Self {
        self.color = Some(color.into());
        self
    }

    pub fn size(mut self, size: impl Into<String>) -> Self {
        self.size = Some(size.into());
        self
    }

    pub fn price_tier(mut self, price: f64) -> Self {
        self.price_tier = Some(price);
        self
    }

    pub fn quantity(mut self, quantity: u32) -> Self {
        self.quantity = quantity.max(1);
        self
    }

    /// Trim text fields and drop blank optional attributes.
    fn normalized(mut self) -> Self {
        self.garment_type = self.garment_type.trim().to_string();
        self.color = non_blank(self.color);
        self.size = non_blank(self.size);
        self
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Accepts `2`, `2.0` or `"2"`; zero and missing values become 1. Fractions are rejected.
fn de_quantity<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u32, D::Error> {
    let value = Value::deserialize(deserializer)?;
    let n = match &value {
        Value::Null => return Ok(1),
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
    .ok_or_else(|| de::Error::custom(format!("invalid quantity: {value}")))?;

    if n.fract() != 0.0 {
        return Err(de::Error::custom(format!("quantity must be a whole number: {n}")));
    }
    if n < 0.0 || n > f64::from(u32::MAX) {
        return Err(de::Error::custom(format!("quantity out of range: {n}")));
    }
    Ok((n as u32).max(1))
}

fn de_opt_number<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<f64>, D::Error> {
    let value = Value::deserialize(deserializer)?;
    match &value {
        Value::Null => Ok(None),
        Value::Number(n) => Ok(n.as_f64()),
        Value::String(s) if s.trim().is_empty() => Ok(None),
        Value::String(s) => s
            .trim()
            .parse::<f64>()
            .map(Some)
            .map_err(|_| de::Error::custom(format!("invalid price: {s}"))),
        _ => Err(de::Error::custom(format!("invalid price: {value}"))),
    }
}

/// Decoded structured representation of what the user wants.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "action", content = "params", rename_all = "snake_case")]
pub enum Intent {
    ListProducts {
        query: CatalogQuery,
    },
    GetProduct {
        id: Option<u64>,
    },
    CreateCart {
        items: Vec<LineItemRequest>,
    },
    UpdateCart {
        id: Option<u64>,
        items: Vec<LineItemRequest>,
    },
    GetCart {
        id: Option<u64>,
    },
    /// The interpreter itself decided it needs clarification.
    AskSpecifications {
        message: Option<String>,
        options: Vec<String>,
        items: Vec<LineItemRequest>,
    },
    /// Raw params of an action that could not be decoded or is not handled.
    Unknown(Value),
}

/// Envelope shape produced by the interpreter.
#[derive(Debug, Deserialize)]
struct RawIntent {
    action: String,
    #[serde(default)]
    params: Value,
}

impl Intent {
    /// Fallback intent carrying a diagnostic message.
    pub fn unknown(message: impl Into<String>) -> Self {
        let mut params = Map::new();
        params.insert("message".to_string(), Value::String(message.into()));
        Self::Unknown(Value::Object(params))
    }

    pub fn action(&self) -> ActionKind {
        match self {
            Self::ListProducts { .. } => ActionKind::ListProducts,
            Self::GetProduct { .. } => ActionKind::GetProduct,
            Self::CreateCart { .. } => ActionKind::CreateCart,
            Self::UpdateCart { .. } => ActionKind::UpdateCart,
            Self::GetCart { .. } => ActionKind::GetCart,
            Self::AskSpecifications { .. } => ActionKind::AskSpecifications,
            Self::Unknown(_) => ActionKind::Unknown,
        }
    }

    /// Rewrite a create request into a continuation of an existing cart.
    ///
    /// Other intents are returned unchanged.
    pub fn continue_cart(self, cart_id: u64) -> Self {
        match self {
            Self::CreateCart { items } => Self::UpdateCart {
                id: Some(cart_id),
                items,
            },
            other => other,
        }
    }

    /// Decode the interpreter's message content.
    ///
    /// Accepts bare JSON or JSON wrapped in a single Markdown code fence.
    pub fn from_content(content: &str) -> Result<Self, InterpretError> {
        let json = strip_code_fence(content);
        let raw: RawIntent = serde_json::from_str(json)
            .map_err(|e| InterpretError::NotIntent(format!("{e}: {}", truncate(content, 200))))?;
        Self::from_raw(raw)
    }

    fn from_raw(raw: RawIntent) -> Result<Self, InterpretError> {
        let params = match raw.params {
            Value::Object(map) => map,
            Value::Null => Map::new(),
            other => {
                return Err(InterpretError::NotIntent(format!(
                    "params must be an object, got {other}"
                )));
            }
        };

        let Some(kind) = ActionKind::parse(&raw.action) else {
            let mut params = params;
            params
                .entry("action".to_string())
                .or_insert(Value::String(raw.action));
            return Ok(Self::Unknown(Value::Object(params)));
        };

        let intent = match kind {
            ActionKind::ListProducts => Self::ListProducts {
                query: CatalogQuery::from_params(&params),
            },
            ActionKind::GetProduct => Self::GetProduct {
                id: id_param(&params)?,
            },
            ActionKind::CreateCart => Self::CreateCart {
                items: items_param(&params)?,
            },
            ActionKind::UpdateCart => Self::UpdateCart {
                id: id_param(&params)?,
                items: items_param(&params)?,
            },
            ActionKind::GetCart => Self::GetCart {
                id: id_param(&params)?,
            },
            ActionKind::AskSpecifications => Self::AskSpecifications {
                message: params
                    .get("message")
                    .or_else(|| params.get("text"))
                    .and_then(scalar_to_string),
                options: params
                    .get("options")
                    .and_then(Value::as_array)
                    .map(|opts| opts.iter().filter_map(option_label).collect())
                    .unwrap_or_default(),
                items: items_param(&params)?,
            },
            ActionKind::Unknown => Self::Unknown(Value::Object(params)),
        };
        Ok(intent)
    }
}

fn id_param(params: &Map<String, Value>) -> Result<Option<u64>, InterpretError> {
    match params.get("id") {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Number(n)) => n
            .as_u64()
            .map(Some)
            .ok_or_else(|| InterpretError::NotIntent(format!("invalid id: {n}"))),
        Some(Value::String(s)) if s.trim().is_empty() => Ok(None),
        Some(Value::String(s)) => s
            .trim()
            .parse::<u64>()
            .map(Some)
            .map_err(|_| InterpretError::NotIntent(format!("invalid id: {s}"))),
        Some(other) => Err(InterpretError::NotIntent(format!("invalid id: {other}"))),
    }
}

fn items_param(params: &Map<String, Value>) -> Result<Vec<LineItemRequest>, InterpretError> {
    let Some(items) = params.get("items") else {
        return Ok(Vec::new());
    };
    let items = match items {
        Value::Null => return Ok(Vec::new()),
        Value::Array(items) => items,
        other => {
            return Err(InterpretError::NotIntent(format!(
                "items must be an array, got {other}"
            )));
        }
    };

    items
        .iter()
        .map(|item| {
            LineItemRequest::deserialize(item)
                .map(LineItemRequest::normalized)
                .map_err(|e| InterpretError::NotIntent(format!("invalid item {item}: {e}")))
        })
        .filter(|item| !matches!(item, Ok(i) if i.garment_type.is_empty()))
        .collect()
}

/// Options may be plain strings or objects with a name-like field.
fn option_label(option: &Value) -> Option<String> {
    match option {
        Value::Object(map) => ["label", "name", "tipoPrenda", "garmentType"]
            .iter()
            .find_map(|key| map.get(*key).and_then(scalar_to_string)),
        other => scalar_to_string(other),
    }
}

fn strip_code_fence(content: &str) -> &str {
    let trimmed = content.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let Some(body) = rest.strip_suffix("```") else {
        return trimmed;
    };
    // drop the language tag line, if any
    match body.split_once('\n') {
        Some((tag, inner)) if !tag.trim_start().starts_with('{') => inner.trim(),
        _ => body.trim(),
    }
}
