//! Action dispatcher: executes a decoded intent against the store.
//!
//! Every path ends in a well-formed [`ActionResult`]. User-input problems
//! (missing ids, nothing found) and ambiguity are ordinary results; collaborator
//! faults are logged and turned into a generic retryable message.

use crate::client::{CartService, Catalog};
use crate::engine::{Resolver, SessionGuard};
use crate::models::{
    ActionKind, ActionResult, AmbiguousItem, Cart, CartLine, CatalogQuery, Intent,
    LineItemRequest, Payload, ResolvedLineItem, Result,
};
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info, warn};

pub const MISSING_PRODUCT_ID_TEXT: &str = "Necesito el id del producto.";
pub const MISSING_CART_ID_FOR_UPDATE_TEXT: &str =
    "Necesito el id de tu carrito para agregar productos.";
pub const MISSING_CART_ID_TEXT: &str = "Necesito el id de tu carrito para mostrarlo.";
pub const QUANTITY_TOO_LARGE_TEXT: &str =
    "La cantidad pedida es demasiado grande. ¿Podés indicar una cantidad menor?";
pub const NOTHING_FOUND_TEXT: &str =
    "No pude encontrar ninguno de los productos que mencionaste.";

/// Executes intents against the catalog and cart collaborators.
pub struct Dispatcher {
    catalog: Arc<dyn Catalog>,
    carts: Arc<dyn CartService>,
    resolver: Resolver,
}

/// Aggregated resolver outcomes for one cart request.
enum CartResolution {
    Ambiguous(Vec<AmbiguousItem>),
    NothingFound,
    /// Merged quantity for one product does not fit in a cart line.
    QuantityTooLarge(u64),
    Lines(Vec<CartLine>),
}

impl Dispatcher {
    pub fn new(catalog: Arc<dyn Catalog>, carts: Arc<dyn CartService>) -> Self {
        Self {
            resolver: Resolver::new(Arc::clone(&catalog)),
            catalog,
            carts,
        }
    }

    /// A create request from a user who already has a cart continues that cart.
    pub fn apply_session(intent: Intent, session_cart: Option<u64>) -> Intent {
        match (intent, session_cart) {
            (intent @ Intent::CreateCart { .. }, Some(cart_id)) => {
                debug!(cart_id, "Continuing existing cart instead of creating one");
                intent.continue_cart(cart_id)
            }
            (intent, _) => intent,
        }
    }

    /// Dispatch an intent for the user holding `session`.
    ///
    /// The caller holds the session lock for the whole call.
    pub async fn dispatch(&self, intent: Intent, session: &mut SessionGuard) -> ActionResult {
        let intent = Self::apply_session(intent, session.cart_id());
        let action = intent.action();

        match self.execute(intent, session).await {
            Ok(result) => result,
            Err(e) => {
                warn!(
                    action = %action,
                    retryable = e.is_retryable(),
                    error = %e,
                    "Collaborator fault"
                );
                ActionResult::text_only(action, e.user_message())
            }
        }
    }

    async fn execute(&self, intent: Intent, session: &mut SessionGuard) -> Result<ActionResult> {
        match intent {
            Intent::ListProducts { query } => self.list_products(&query).await,
            Intent::GetProduct { id } => self.get_product(id).await,
            Intent::CreateCart { items } => self.create_cart(&items, session).await,
            Intent::UpdateCart { id, items } => self.update_cart(id, &items).await,
            Intent::GetCart { id } => self.get_cart(id).await,
            Intent::AskSpecifications {
                message,
                options,
                items,
            } => Ok(ask_specifications(message, options, &items)),
            Intent::Unknown(params) => Ok(unknown(params)),
        }
    }

    async fn list_products(&self, query: &CatalogQuery) -> Result<ActionResult> {
        let products = self.catalog.search(query).await?;
        Ok(ActionResult::new(
            ActionKind::ListProducts,
            format!("Encontré {} productos.", products.len()),
            Payload::ProductList(products),
        ))
    }

    async fn get_product(&self, id: Option<u64>) -> Result<ActionResult> {
        let Some(id) = id else {
            return Ok(ActionResult::text_only(
                ActionKind::GetProduct,
                MISSING_PRODUCT_ID_TEXT,
            ));
        };

        let result = match self.catalog.get_by_id(id).await? {
            Some(product) => ActionResult::new(
                ActionKind::GetProduct,
                format!("Producto: {}", product.display_name()),
                Payload::Product(product),
            ),
            None => ActionResult::text_only(
                ActionKind::GetProduct,
                format!("No encontré el producto con id {id}."),
            ),
        };
        Ok(result)
    }

    async fn create_cart(
        &self,
        items: &[LineItemRequest],
        session: &mut SessionGuard,
    ) -> Result<ActionResult> {
        let lines = match self.resolve_items(items).await? {
            CartResolution::Lines(lines) => lines,
            CartResolution::Ambiguous(ambiguous) => return Ok(ambiguity(ambiguous)),
            CartResolution::NothingFound => {
                return Ok(ActionResult::text_only(
                    ActionKind::CreateCart,
                    NOTHING_FOUND_TEXT,
                ));
            }
            CartResolution::QuantityTooLarge(product_id) => {
                return Ok(quantity_too_large(ActionKind::CreateCart, product_id));
            }
        };

        let cart = self.carts.create(&lines).await?;
        session.set_cart(cart.id);
        info!(user = %session.user_id(), cart_id = cart.id, lines = lines.len(), "Cart created");

        Ok(cart_result(
            ActionKind::CreateCart,
            format!("Carrito creado (id {}) con {} items", cart.id, item_count(&cart, &lines)),
            cart,
        ))
    }

    async fn update_cart(
        &self,
        id: Option<u64>,
        items: &[LineItemRequest],
    ) -> Result<ActionResult> {
        let Some(cart_id) = id else {
            return Ok(ActionResult::text_only(
                ActionKind::UpdateCart,
                MISSING_CART_ID_FOR_UPDATE_TEXT,
            ));
        };

        let lines = match self.resolve_items(items).await? {
            CartResolution::Lines(lines) => lines,
            CartResolution::Ambiguous(ambiguous) => return Ok(ambiguity(ambiguous)),
            CartResolution::NothingFound => {
                return Ok(ActionResult::text_only(
                    ActionKind::UpdateCart,
                    "No encontré productos para agregar.",
                ));
            }
            CartResolution::QuantityTooLarge(product_id) => {
                return Ok(quantity_too_large(ActionKind::UpdateCart, product_id));
            }
        };

        let cart = self.carts.update(cart_id, &lines).await?;
        info!(cart_id, lines = lines.len(), "Cart updated");

        Ok(cart_result(
            ActionKind::UpdateCart,
            format!(
                "Carrito (id {cart_id}) actualizado con {} productos más",
                lines.len()
            ),
            cart,
        ))
    }

    async fn get_cart(&self, id: Option<u64>) -> Result<ActionResult> {
        let Some(cart_id) = id else {
            return Ok(ActionResult::text_only(
                ActionKind::GetCart,
                MISSING_CART_ID_TEXT,
            ));
        };

        let cart = self.carts.get(cart_id).await?.unwrap_or(Cart {
            id: cart_id,
            items: Vec::new(),
        });

        let text = if cart.is_empty() {
            format!("Tu carrito (id {cart_id}) está vacío.")
        } else {
            format!(
                "Tu carrito (id {cart_id}) tiene {} productos.",
                cart.items.len()
            )
        };
        Ok(ActionResult::new(ActionKind::GetCart, text, Payload::Cart(cart)))
    }

    /// Resolve every item, one at a time, and partition the outcomes.
    async fn resolve_items(&self, items: &[LineItemRequest]) -> Result<CartResolution> {
        let mut ambiguous = Vec::new();
        let mut lines: Vec<CartLine> = Vec::new();
        let mut overflow = None;

        for item in items {
            match self.resolver.resolve(item).await? {
                ResolvedLineItem::Unique {
                    product_id,
                    quantity,
                } => match lines.iter_mut().find(|l| l.product_id == product_id) {
                    Some(line) => match line.qty.checked_add(quantity) {
                        Some(qty) => line.qty = qty,
                        None => overflow = Some(product_id),
                    },
                    None => lines.push(CartLine {
                        product_id,
                        qty: quantity,
                    }),
                },
                ResolvedLineItem::Ambiguous {
                    garment_type,
                    candidates,
                } => ambiguous.push(AmbiguousItem {
                    garment_type,
                    candidates,
                }),
                ResolvedLineItem::NotFound { garment_type } => {
                    debug!(garment_type = %garment_type, "Dropping item with no catalog match");
                }
            }
        }

        Ok(if !ambiguous.is_empty() {
            CartResolution::Ambiguous(ambiguous)
        } else if let Some(product_id) = overflow {
            CartResolution::QuantityTooLarge(product_id)
        } else if lines.is_empty() {
            CartResolution::NothingFound
        } else {
            CartResolution::Lines(lines)
        })
    }
}

fn item_count(cart: &Cart, lines: &[CartLine]) -> usize {
    if cart.items.is_empty() {
        lines.len()
    } else {
        cart.items.len()
    }
}

fn quantity_too_large(action: ActionKind, product_id: u64) -> ActionResult {
    debug!(product_id, "Merged quantity overflows a cart line");
    ActionResult::text_only(action, QUANTITY_TOO_LARGE_TEXT)
}

fn cart_result(action: ActionKind, text: String, cart: Cart) -> ActionResult {
    ActionResult::new(action, text, Payload::Cart(cart))
}

/// Escalate to a clarification request covering every ambiguous item.
fn ambiguity(items: Vec<AmbiguousItem>) -> ActionResult {
    let names = items
        .iter()
        .map(|i| i.garment_type.as_str())
        .collect::<Vec<_>>()
        .join(", ");
    ActionResult::new(
        ActionKind::AskSpecifications,
        format!("Encontré varias opciones para {names}. ¿Podés aclarar modelo, color o talla?"),
        Payload::Ambiguity(items),
    )
}

fn ask_specifications(
    message: Option<String>,
    options: Vec<String>,
    items: &[LineItemRequest],
) -> ActionResult {
    let text = message.unwrap_or_else(|| {
        if items.is_empty() {
            "¿Podés darme más detalles de lo que buscás?".to_string()
        } else {
            let names = items
                .iter()
                .map(|i| i.garment_type.as_str())
                .collect::<Vec<_>>()
                .join(", ");
            format!("¿Podés aclarar modelo, color o talla de {names}?")
        }
    });
    ActionResult::new(
        ActionKind::AskSpecifications,
        text,
        Payload::Clarification { options },
    )
}

fn unknown(params: Value) -> ActionResult {
    ActionResult::new(
        ActionKind::Unknown,
        format!("No pude entender la acción. Detalle: {params}"),
        Payload::Diagnostic(params),
    )
}
