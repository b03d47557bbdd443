//! Catalog resolver: matches one requested line item against the catalog.
//!
//! The catalog does a coarse token search on the garment type; exact attribute
//! filters (color, size, price tier) are applied here so ambiguity detection does
//! not depend on how the interpreter phrased the request.

use crate::client::Catalog;
use crate::models::{CatalogProduct, CatalogQuery, LineItemRequest, ResolvedLineItem, Result};
use std::sync::Arc;
use tracing::debug;

/// Prices closer than this are considered equal.
const PRICE_EPSILON: f64 = 0.005;

pub struct Resolver {
    catalog: Arc<dyn Catalog>,
}

impl Resolver {
    pub fn new(catalog: Arc<dyn Catalog>) -> Self {
        Self { catalog }
    }

    /// Resolve a line item. Errors are catalog faults only.
    pub async fn resolve(&self, item: &LineItemRequest) -> Result<ResolvedLineItem> {
        let found = self
            .catalog
            .search(&CatalogQuery::text(&item.garment_type))
            .await?;
        let searched = found.len();
        let resolved = classify(item, found);

        debug!(
            garment_type = %item.garment_type,
            searched,
            unique = resolved.is_unique(),
            ambiguous = resolved.is_ambiguous(),
            "Line item resolved"
        );
        Ok(resolved)
    }
}

/// Filter search results by the item's attributes and classify what is left.
///
/// Candidates keep catalog order and are not truncated.
pub fn classify(item: &LineItemRequest, found: Vec<CatalogProduct>) -> ResolvedLineItem {
    let mut matches: Vec<CatalogProduct> = found
        .into_iter()
        .filter(|product| matches_attributes(item, product))
        .collect();

    match matches.len() {
        0 => ResolvedLineItem::NotFound {
            garment_type: item.garment_type.clone(),
        },
        1 => ResolvedLineItem::Unique {
            product_id: matches.remove(0).id,
            quantity: item.quantity,
        },
        _ => ResolvedLineItem::Ambiguous {
            garment_type: item.garment_type.clone(),
            candidates: matches,
        },
    }
}

fn matches_attributes(item: &LineItemRequest, product: &CatalogProduct) -> bool {
    let color_ok = item
        .color
        .as_deref()
        .is_none_or(|color| same_text(color, &product.color));
    let size_ok = item
        .size
        .as_deref()
        .is_none_or(|size| same_text(size, &product.size));
    let price_ok = item.price_tier.is_none_or(|price| {
        product
            .tier_prices()
            .any(|tier| (tier - price).abs() < PRICE_EPSILON)
    });
    color_ok && size_ok && price_ok
}

fn same_text(a: &str, b: &str) -> bool {
    a.trim().to_lowercase() == b.trim().to_lowercase()
}
