//! Catalog and cart types as seen on the wire.
//!
//! The catalog service owns these records; this crate only reads them.
//! Field names follow the catalog API's JSON (Spanish, camelCase).

use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use serde_json::{Map, Value};
use tracing::debug;

/// A product as returned by the catalog service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogProduct {
    pub id: u64,

    /// Display name (older catalog records only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(rename = "tipoPrenda", alias = "tipo_prenda", default)]
    pub garment_type: String,

    #[serde(rename = "talla", alias = "size", default)]
    pub size: String,

    #[serde(default)]
    pub color: String,

    #[serde(default)]
    pub stock: i64,

    /// Unit price when buying 50 units (the base price)
    #[serde(default)]
    pub price50: Option<f64>,

    #[serde(default)]
    pub price100: Option<f64>,

    #[serde(default)]
    pub price200: Option<f64>,

    #[serde(rename = "categoria", alias = "category", default)]
    pub category: Option<String>,

    #[serde(rename = "descripcion", alias = "description", default)]
    pub description: Option<String>,

    #[serde(rename = "disponible", alias = "available", default)]
    pub availability: Option<Availability>,
}

impl CatalogProduct {
    /// Name shown to users: explicit name, else the garment type.
    pub fn display_name(&self) -> &str {
        match self.name.as_deref() {
            Some(name) if !name.trim().is_empty() => name,
            _ => &self.garment_type,
        }
    }

    /// Base price (the 50-unit tier).
    pub fn base_price(&self) -> Option<f64> {
        self.price50
    }

    /// All tier prices that are set.
    pub fn tier_prices(&self) -> impl Iterator<Item = f64> + '_ {
        [self.price50, self.price100, self.price200]
            .into_iter()
            .flatten()
    }
}

/// Availability flag. Older records store a boolean, newer ones `"Sí"`/`"No"`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Availability {
    Flag(bool),
    Label(String),
}

impl Availability {
    pub fn is_available(&self) -> bool {
        match self {
            Self::Flag(flag) => *flag,
            Self::Label(label) => is_affirmative(label),
        }
    }
}

fn is_affirmative(value: &str) -> bool {
    matches!(
        value.trim().to_lowercase().as_str(),
        "si" | "sí" | "yes" | "true" | "1"
    )
}

/// A cart as returned by the cart service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cart {
    pub id: u64,
    #[serde(default)]
    pub items: Vec<CartItem>,
}

impl Cart {
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// One line of a cart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CartItem {
    #[serde(rename = "productId", alias = "product_id")]
    pub product_id: u64,

    pub qty: u32,

    /// Product details, when the service includes them
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub product: Option<CatalogProduct>,
}

/// A line sent to the cart service on create/update.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartLine {
    pub product_id: u64,
    pub qty: u32,
}

/// A filterable catalog attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CatalogField {
    /// Token search across garment type, color, size, category and description
    Text,
    GarmentType,
    Size,
    Color,
    Category,
    Description,
    Stock,
    PriceTier50,
    PriceTier100,
    PriceTier200,
    Availability,
}

impl CatalogField {
    /// Query-string key understood by the catalog service.
    pub fn query_key(self) -> &'static str {
        match self {
            Self::Text => "q",
            Self::GarmentType => "tipo_prenda",
            Self::Size => "talla",
            Self::Color => "color",
            Self::Category => "categoria",
            Self::Description => "descripcion",
            Self::Stock => "cantidad_disponible",
            Self::PriceTier50 => "precio50_u",
            Self::PriceTier100 => "precio100_u",
            Self::PriceTier200 => "precio200_u",
            Self::Availability => "disponible",
        }
    }

    /// Normalize a raw value for this field. `None` means the value is unusable.
    pub fn normalize(self, raw: &str) -> Option<String> {
        let raw = raw.trim();
        if raw.is_empty() {
            return None;
        }
        match self {
            Self::Stock => raw.parse::<i64>().ok().map(|n| n.to_string()),
            Self::PriceTier50 | Self::PriceTier100 | Self::PriceTier200 => {
                raw.parse::<f64>().ok().map(|n| n.to_string())
            }
            Self::Availability => {
                let flag = if is_affirmative(raw) { "si" } else { "no" };
                Some(flag.to_string())
            }
            _ => Some(raw.to_string()),
        }
    }
}

/// Intent parameter name → catalog field.
///
/// Adding a filterable attribute is a new row here, nothing else.
pub const PARAM_FILTERS: &[(&str, CatalogField)] = &[
    ("q", CatalogField::Text),
    ("tipo_prenda", CatalogField::GarmentType),
    ("garmentType", CatalogField::GarmentType),
    ("talla", CatalogField::Size),
    ("size", CatalogField::Size),
    ("color", CatalogField::Color),
    ("categoria", CatalogField::Category),
    ("category", CatalogField::Category),
    ("descripcion", CatalogField::Description),
    ("description", CatalogField::Description),
    ("cantidad_disponible", CatalogField::Stock),
    ("stock", CatalogField::Stock),
    ("precio50_u", CatalogField::PriceTier50),
    ("precio100_u", CatalogField::PriceTier100),
    ("precio200_u", CatalogField::PriceTier200),
    ("disponible", CatalogField::Availability),
    ("available", CatalogField::Availability),
];

/// Look up the catalog field for an intent parameter name.
pub fn field_for_param(name: &str) -> Option<CatalogField> {
    PARAM_FILTERS
        .iter()
        .find(|(param, _)| *param == name)
        .map(|(_, field)| *field)
}

/// Filters for a catalog search, in insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CatalogQuery {
    filters: Vec<(CatalogField, String)>,
}

impl CatalogQuery {
    pub fn new() -> Self {
        Self::default()
    }

    /// Token search only.
    pub fn text(q: impl Into<String>) -> Self {
        Self::new().with(CatalogField::Text, q)
    }

    /// Add a filter. A later value for the same field replaces the earlier one.
    pub fn with(mut self, field: CatalogField, value: impl Into<String>) -> Self {
        self.set(field, value.into());
        self
    }

    fn set(&mut self, field: CatalogField, value: String) {
        match self.filters.iter_mut().find(|(f, _)| *f == field) {
            Some(slot) => slot.1 = value,
            None => self.filters.push((field, value)),
        }
    }

    /// Build filters from loosely-typed intent parameters.
    ///
    /// Empty values and unknown keys are skipped.
    pub fn from_params(params: &Map<String, Value>) -> Self {
        let mut query = Self::new();
        for (key, value) in params {
            let Some(field) = field_for_param(key) else {
                debug!(param = %key, "Ignoring unknown list filter");
                continue;
            };
            let Some(raw) = scalar_to_string(value) else {
                continue;
            };
            if let Some(normalized) = field.normalize(&raw) {
                query.set(field, normalized);
            }
        }
        query
    }

    pub fn get(&self, field: CatalogField) -> Option<&str> {
        self.filters
            .iter()
            .find(|(f, _)| *f == field)
            .map(|(_, v)| v.as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }

    pub fn len(&self) -> usize {
        self.filters.len()
    }

    /// Query-string pairs for the catalog service.
    pub fn to_query_pairs(&self) -> Vec<(&'static str, String)> {
        self.filters
            .iter()
            .map(|(field, value)| (field.query_key(), value.clone()))
            .collect()
    }
}

impl Serialize for CatalogQuery {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.filters.len()))?;
        for (field, value) in &self.filters {
            map.serialize_entry(field.query_key(), value)?;
        }
        map.end()
    }
}

/// Render a scalar JSON value as a string. Objects, arrays and null yield `None`.
pub(crate) fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}
